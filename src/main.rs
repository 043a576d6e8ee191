use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod input;
mod logging;
use keycrypt::{EXIT_OTHER, KeyCrypt, KeyStore, default_key_path, generate_key};
use logging::LogFormat;
use std::path::PathBuf;
use std::process::ExitCode;

fn resolve_store(path: Option<PathBuf>) -> Result<KeyStore> {
    match path {
        Some(p) => Ok(KeyStore::new(p)),
        None => Ok(KeyStore::new(
            default_key_path().context("no --key-file given")?,
        )),
    }
}

#[derive(Debug, Parser)]
#[command(name = "keycrypt")]
#[command(
    version,
    about = "Encrypt short strings with a locally stored AES-256 key."
)]
struct Cli {
    /// Path to the secret key file (default: ~/.secret/keyfile)
    #[arg(long, global = true, value_name = "PATH", env = "KEYCRYPT_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, env = "KEYCRYPT_LOG", default_value = "warn")]
    log_level: String,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts text, generating the key on first use
    Encrypt {
        /// Text to encrypt; read from stdin when omitted
        text: Option<String>,
    },

    /// Decrypts text produced by `encrypt`
    Decrypt {
        /// Encoded envelope; read from stdin when omitted
        text: Option<String>,
    },

    /// Generates the key file; refuses to overwrite an existing one
    Keygen,

    /// Shows information about the key file
    Info {
        #[arg(long, default_value_t = false)]
        /// Print as JSON
        json: bool,
    },
}

fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let args = Cli::parse();
    logging::init(&args.log_level, args.log_format);

    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            let code = e
                .downcast_ref::<keycrypt::Error>()
                .map_or(EXIT_OTHER, keycrypt::Error::exit_code);
            ExitCode::from(code)
        }
    }
}

fn run(args: Cli) -> Result<()> {
    let store = resolve_store(args.key_file)?;

    match args.command {
        Commands::Encrypt { text } => {
            let plaintext = input::read_text(text, "Text to encrypt: ")?;
            let kc = KeyCrypt::new(store);
            println!("{}", kc.encrypt(&plaintext)?);
        }
        Commands::Decrypt { text } => {
            let encoded = input::read_text(text, "Text to decrypt: ")?;
            let kc = KeyCrypt::new(store);
            println!("{}", kc.decrypt(encoded.trim())?);
        }
        Commands::Keygen => {
            generate_key(&store)?;
            println!("key generated at {}", store.path().display());
        }
        Commands::Info { json } => {
            let info = KeyCrypt::new(store).info()?;
            if json {
                println!("{}", serde_json::to_string_pretty(&info)?);
            } else {
                println!("{info}");
            }
        }
    }

    Ok(())
}
