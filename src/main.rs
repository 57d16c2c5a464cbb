use anyhow::{Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
mod auth;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vaultseal::{
    Argon2Params, DecryptOutcome, Pbkdf2Params, RecordFile, Scheme, SealOutcome, VaultConfig,
    VaultCrypto, looks_encrypted,
};

#[derive(Debug, Clone, Copy, ValueEnum)]
enum SchemeArg {
    /// PBKDF2-SHA256, unprefixed tokens
    V1,
    /// Argon2id, `v2:` prefixed tokens
    V2,
}

#[derive(Debug, clap::Args)]
struct KdfArgs {
    /// Token format written by `encrypt` and `migrate`
    #[arg(long, global = true, value_enum, default_value = "v1")]
    scheme: SchemeArg,

    /// PBKDF2 iteration count (default: 100000)
    #[arg(long, global = true, env = "VAULTSEAL_ITERATIONS")]
    iterations: Option<u32>,

    /// Argon2 memory cost in KiB for v2 tokens (default: 65536)
    #[arg(long = "argon-mem", global = true)]
    mem_cost_kib: Option<u32>,

    /// Argon2 time cost for v2 tokens (default: 3)
    #[arg(long = "argon-time", global = true)]
    time_cost: Option<u32>,

    /// Argon2 parallelism for v2 tokens (default: 1)
    #[arg(long = "argon-parallelism", global = true)]
    parallelism: Option<u32>,
}

impl KdfArgs {
    fn to_vault(&self) -> Result<VaultCrypto> {
        let pbkdf2 = Pbkdf2Params::default();
        let argon2 = Argon2Params::default();

        let config = VaultConfig {
            scheme: match self.scheme {
                SchemeArg::V1 => Scheme::V1,
                SchemeArg::V2 => Scheme::V2,
            },
            pbkdf2: Pbkdf2Params::new(self.iterations.unwrap_or(pbkdf2.iterations()))?,
            argon2: Argon2Params::new(
                self.mem_cost_kib.unwrap_or(argon2.mem_cost_kib()),
                self.time_cost.unwrap_or(argon2.time_cost()),
                self.parallelism.unwrap_or(argon2.parallelism()),
            )?,
        };
        Ok(VaultCrypto::new(config)?)
    }
}

#[derive(Debug, Parser)]
#[command(name = "vaultseal")]
#[command(
    version,
    about = "Encrypts password vault fields before they reach untrusted storage."
)]
struct Cli {
    #[command(flatten)]
    kdf: KdfArgs,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a value and prints the token
    #[command(arg_required_else_help = true)]
    Encrypt { value: String },

    /// Decrypts a token; non-tokens and failures print the input unchanged
    #[command(arg_required_else_help = true)]
    Decrypt {
        token: String,

        /// Fail instead of falling back to the input
        #[arg(long, default_value_t = false)]
        strict: bool,
    },

    /// Reports whether a value looks like a ciphertext token
    #[command(arg_required_else_help = true)]
    Sniff { value: String },

    /// Lists records in a JSON records file
    List {
        /// Path to the records file
        #[arg(long, value_name = "PATH", env = "VAULTSEAL_RECORDS")]
        records: PathBuf,

        /// Decrypt and print passwords
        #[arg(short, long, default_value_t = false)]
        reveal: bool,
    },

    /// Encrypts every legacy plaintext password in a records file
    Migrate {
        /// Path to the records file
        #[arg(long, value_name = "PATH", env = "VAULTSEAL_RECORDS")]
        records: PathBuf,

        /// Also encrypt passwords that look like tokens but do not decrypt
        #[arg(long, default_value_t = false)]
        seal_unverified: bool,
    },
}

fn init_logging() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .try_init();
}

fn main() -> Result<()> {
    init_logging();
    let args = Cli::parse();

    match args.command {
        Commands::Encrypt { value } => {
            let vault = args.kdf.to_vault()?;
            let passphrase = auth::read_passphrase()?;
            println!("{}", vault.encrypt_field(&value, &passphrase)?);
        }
        Commands::Decrypt { token, strict } => {
            let vault = args.kdf.to_vault()?;
            let passphrase = auth::read_passphrase()?;
            if strict {
                match vault.try_decrypt_field(&token, &passphrase)? {
                    DecryptOutcome::Decrypted(plaintext) => println!("{plaintext}"),
                    DecryptOutcome::NoPassphrase => println!("{token}"),
                    DecryptOutcome::NotCiphertext => bail!("value is not a ciphertext token"),
                    DecryptOutcome::AuthenticationFailed => {
                        bail!("wrong passphrase or corrupted data")
                    }
                }
            } else {
                println!("{}", vault.decrypt_field(&token, &passphrase)?);
            }
        }
        Commands::Sniff { value } => {
            if looks_encrypted(&value) {
                println!("encrypted");
            } else {
                println!("plaintext");
            }
        }
        Commands::List { records, reveal } => {
            let file = RecordFile::new(records);
            let entries = file.load()?;

            if entries.is_empty() {
                println!("No records stored.");
                return Ok(());
            }

            let (vault, passphrase) = if reveal {
                (Some(args.kdf.to_vault()?), Some(auth::read_passphrase()?))
            } else {
                (None, None)
            };

            let site_width = entries
                .iter()
                .map(|r| r.site().len())
                .chain(std::iter::once("Site".len()))
                .max()
                .unwrap_or(0);
            let user_width = entries
                .iter()
                .map(|r| r.username().len())
                .chain(std::iter::once("Username".len()))
                .max()
                .unwrap_or(0);

            println!("{:<site_width$}  {:<user_width$}  Password", "Site", "Username");
            println!("{:-<site_width$}  {:-<user_width$}  --------", "", "");

            for record in &entries {
                let shown = match (&vault, &passphrase) {
                    (Some(vault), Some(passphrase)) => record.reveal(vault, passphrase)?,
                    _ if record.is_legacy() => "(legacy plaintext)".to_string(),
                    _ => "(looks encrypted)".to_string(),
                };
                println!(
                    "{:<site_width$}  {:<user_width$}  {shown}",
                    record.site(),
                    record.username()
                );
            }
        }
        Commands::Migrate {
            records,
            seal_unverified,
        } => {
            let vault = args.kdf.to_vault()?;
            let passphrase = auth::read_passphrase()?;

            let file = RecordFile::new(records);
            let mut entries = file.load()?;

            let mut sealed = 0usize;
            let mut unverified = 0usize;
            for record in entries.iter_mut() {
                let outcome = if seal_unverified {
                    record.seal_unverified(&vault, &passphrase)?
                } else {
                    record.seal(&vault, &passphrase)?
                };
                match outcome {
                    SealOutcome::Sealed => sealed += 1,
                    SealOutcome::Unverified => unverified += 1,
                    SealOutcome::AlreadySealed | SealOutcome::Skipped => {}
                }
            }

            if sealed > 0 {
                file.save(&entries)?;
            }
            println!("encrypted {sealed} legacy password(s)");
            if unverified > 0 {
                println!(
                    "{unverified} password(s) look encrypted but do not decrypt with this \
                     passphrase; rerun with --seal-unverified to encrypt them"
                );
            }
        }
    }

    Ok(())
}
