//! dotvault CLI - Password-based encryption of secrets files
//!
//! Seals a plaintext file (by default `.env`) into a hex envelope file (by
//! default `.env.enc`) and back, using scrypt key derivation and AES-256-GCM.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

use dotvault::file_ops::{self, DEFAULT_ENVELOPE_PATH, DEFAULT_PLAIN_PATH};
use dotvault::passphrase::{
    DEFAULT_PASSWORD_ENV, EnvPasswordReader, PasswordReader, ReaderPasswordReader,
    TerminalPasswordReader,
};

#[derive(Parser)]
#[command(name = "dotvault")]
#[command(version)]
#[command(about = "Password-based encryption of secrets files.", long_about = None)]
struct Cli {
    /// Environment variable holding the password
    #[arg(long, global = true, value_name = "NAME", default_value = DEFAULT_PASSWORD_ENV)]
    password_env: String,

    /// Read password from stdin instead of from the environment
    #[arg(long, global = true, conflicts_with = "prompt")]
    passphrase_stdin: bool,

    /// Prompt for the password on the terminal instead of reading the environment
    #[arg(long, global = true)]
    prompt: bool,

    /// Log operation details to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file
    #[command(visible_alias = "seal", alias = "e")]
    Encrypt {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_PLAIN_PATH)]
        input: PathBuf,

        /// Path to the file to write the envelope to
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_ENVELOPE_PATH)]
        output: PathBuf,
    },

    /// Decrypt a file
    #[command(visible_alias = "open", alias = "d")]
    Decrypt {
        /// Path to the envelope file to be decrypted
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_ENVELOPE_PATH)]
        input: PathBuf,

        /// Path to the file to write the decrypted text to
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_PLAIN_PATH)]
        output: PathBuf,
    },

    /// Update an encrypted file with new content, while validating
    /// that the password is not accidentally changed.
    #[command(alias = "u")]
    Update {
        /// Path to the file whose contents is to be encrypted
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_PLAIN_PATH)]
        input: PathBuf,

        /// Path to the existing envelope file to replace
        #[arg(short, long, value_name = "FILE", default_value = DEFAULT_ENVELOPE_PATH)]
        output: PathBuf,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut reader = get_password_reader(&cli);

    let (verb, input, output, result) = match &cli.command {
        Commands::Encrypt { input, output } => (
            "encrypted",
            input,
            output,
            file_ops::encrypt_file(input, output, &mut *reader),
        ),
        Commands::Decrypt { input, output } => (
            "decrypted",
            input,
            output,
            file_ops::decrypt_file(input, output, &mut *reader),
        ),
        Commands::Update { input, output } => (
            "updated",
            input,
            output,
            file_ops::update_file(input, output, &mut *reader),
        ),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e.chain_message());
        process::exit(1);
    }

    println!("{} {} -> {}", verb, input.display(), output.display());
}

fn get_password_reader(cli: &Cli) -> Box<dyn PasswordReader> {
    if cli.passphrase_stdin {
        Box::new(ReaderPasswordReader::new(Box::new(std::io::stdin())))
    } else if cli.prompt {
        Box::new(TerminalPasswordReader)
    } else {
        Box::new(EnvPasswordReader::new(cli.password_env.clone()))
    }
}

fn init_tracing(verbose: bool) {
    let default_directive = if verbose { "debug" } else { "warn" };
    let default_filter = EnvFilter::new(default_directive);
    let filter = EnvFilter::try_from_default_env().unwrap_or(default_filter);
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
