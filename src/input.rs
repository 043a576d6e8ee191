use anyhow::{Result, bail};
use std::io::{self, BufRead, IsTerminal};
use zeroize::Zeroizing;

/// Resolves the text a command operates on.
///
/// Order: the positional argument, then one line of piped stdin, then a
/// hidden prompt on a terminal.
pub fn read_text(arg: Option<String>, prompt: &str) -> Result<Zeroizing<String>> {
    //  Argument
    //  keycrypt encrypt "hello world"
    if let Some(text) = arg {
        return Ok(Zeroizing::new(text));
    }

    //  stdin (Pipeline)
    //  echo "hello world" | keycrypt encrypt
    let stdin = io::stdin();
    if !stdin.is_terminal() {
        let mut buf = Zeroizing::new(String::new());
        if stdin.lock().read_line(&mut buf)? == 0 {
            bail!("no input provided on stdin");
        }
        trim_newline(&mut buf);
        return Ok(buf);
    }

    //  Interactive (TTY)
    let text = rpassword::prompt_password(prompt)?;
    Ok(Zeroizing::new(text))
}

fn trim_newline(s: &mut String) {
    while s.ends_with('\n') || s.ends_with('\r') {
        s.pop();
    }
}
