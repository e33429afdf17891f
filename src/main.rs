//! pki-envelope command-line front end
//!
//! ```bash
//! pki-envelope init-ca --algorithm ecdsa
//! pki-envelope issue --name web --cn web.internal --dns web.internal --usage server-auth
//! pki-envelope verify --name web
//! pki-envelope encrypt --key k --iv v --mode ga256 "hello world"
//! pki-envelope decrypt --key k --iv v "{GA256}{AES256}..."
//! ```
//!
//! Settings come from `pki-envelope.toml` (or `--config`); `RUST_LOG`
//! overrides the configured log level.

use std::io::Read;
use std::net::IpAddr;
use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use pki_envelope::cert_config::{CertConfig, ExtKeyUsage, KeyAlgorithm};
use pki_envelope::configs::{AppConfig, LogFormat, LoggingConfig};
use pki_envelope::generate_root_ca::new_certificate_authority;
use pki_envelope::generate_signed_cert::{new_cert_and_key, new_intermediate_certificate_authority};
use pki_envelope::keys::SystemKeyGenerator;
use pki_envelope::{aes, compressed, salt, storage, verify};

#[derive(Parser, Debug)]
#[command(name = "pki-envelope")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a self-signed root CA in the PKI directory
    InitCa {
        /// File name stem for the CA certificate and key
        #[arg(long, default_value = "ca")]
        name: String,
        /// Common name (defaults to the configured one)
        #[arg(long)]
        cn: Option<String>,
        #[arg(long)]
        algorithm: Option<KeyAlgorithm>,
    },

    /// Issue a leaf or intermediate certificate signed by a CA
    Issue {
        /// File name stem for the new certificate and key
        #[arg(long)]
        name: String,
        #[arg(long)]
        cn: String,
        /// Issuing CA file name stem
        #[arg(long, default_value = "ca")]
        ca: String,
        #[arg(long)]
        org: Vec<String>,
        #[arg(long)]
        dns: Vec<String>,
        #[arg(long)]
        ip: Vec<IpAddr>,
        /// Extended key usage, e.g. server-auth, client-auth
        #[arg(long)]
        usage: Vec<ExtKeyUsage>,
        /// Issue an intermediate CA instead of a leaf
        #[arg(long)]
        intermediate: bool,
        #[arg(long)]
        algorithm: Option<KeyAlgorithm>,
    },

    /// Verify a stored certificate against the root CA
    Verify {
        #[arg(long)]
        name: String,
        /// Root CA file name stem
        #[arg(long, default_value = "ca")]
        ca: String,
        /// Check validity this many days from now
        #[arg(long, default_value_t = 0, allow_negative_numbers = true)]
        offset_days: i64,
    },

    /// Encrypt text (argument or stdin) into an envelope
    Encrypt {
        #[arg(long)]
        key: String,
        #[arg(long)]
        iv: String,
        #[arg(long, value_enum, default_value_t = Mode::Aes256)]
        mode: Mode,
        text: Option<String>,
    },

    /// Decrypt an envelope (argument or stdin); the format is read from its tag
    Decrypt {
        #[arg(long)]
        key: String,
        #[arg(long)]
        iv: String,
        ctext: Option<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
    Aes256,
    Aes128,
    Salt256,
    Salt128,
    Sa256,
    Sa128,
    Ga256,
    Ga128,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::load()?,
    };
    init_logging(&config.logging);

    match cli.command {
        Commands::InitCa { name, cn, algorithm } => init_ca(&config, &name, cn, algorithm),
        Commands::Issue {
            name,
            cn,
            ca,
            org,
            dns,
            ip,
            usage,
            intermediate,
            algorithm,
        } => {
            let mut cert_cfg =
                CertConfig::new(cn).algorithm(algorithm.unwrap_or(config.ca_defaults.algorithm));
            cert_cfg.organization = org;
            cert_cfg.alt_names.dns_names = dns;
            cert_cfg.alt_names.ips = ip;
            cert_cfg.usages = usage;
            issue(&config, &name, &ca, &cert_cfg, intermediate)
        }
        Commands::Verify {
            name,
            ca,
            offset_days,
        } => verify_stored(&config, &name, &ca, offset_days),
        Commands::Encrypt {
            key,
            iv,
            mode,
            text,
        } => {
            let text = arg_or_stdin(text)?;
            println!("{}", encrypt(mode, &key, &iv, &text)?);
            Ok(())
        }
        Commands::Decrypt { key, iv, ctext } => {
            let ctext = arg_or_stdin(ctext)?;
            print!("{}", decrypt(&key, &iv, ctext.trim_end())?);
            Ok(())
        }
    }
}

fn init_logging(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match logging.format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Text => registry
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .try_init(),
    };
    result.ok();
}

fn arg_or_stdin(arg: Option<String>) -> Result<String> {
    match arg {
        Some(text) => Ok(text),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("Failed to read stdin")?;
            Ok(buf)
        }
    }
}

fn init_ca(
    config: &AppConfig,
    name: &str,
    cn: Option<String>,
    algorithm: Option<KeyAlgorithm>,
) -> Result<()> {
    let dir = &config.pki.directory;
    if storage::cert_or_key_exist(dir, name) {
        bail!("{} already holds a certificate or key named '{}'", dir.display(), name);
    }

    let mut cert_cfg = config.ca_defaults.to_cert_config();
    if let Some(cn) = cn {
        cert_cfg.common_name = cn;
    }
    if let Some(algorithm) = algorithm {
        cert_cfg.algorithm = algorithm;
    }

    let (cert, key) = new_certificate_authority(&cert_cfg, &SystemKeyGenerator)
        .context("Failed to generate root CA")?;
    storage::write_cert_and_key(dir, name, &cert, &key).context("Failed to store root CA")?;
    info!(common_name = %cert_cfg.common_name, dir = %dir.display(), "root CA created");
    println!("✓ Root CA '{}' written to {}", cert_cfg.common_name, dir.display());
    Ok(())
}

fn issue(
    config: &AppConfig,
    name: &str,
    ca: &str,
    cert_cfg: &CertConfig,
    intermediate: bool,
) -> Result<()> {
    let dir = &config.pki.directory;
    if storage::cert_or_key_exist(dir, name) {
        bail!("{} already holds a certificate or key named '{}'", dir.display(), name);
    }

    let (ca_cert, mut ca_chain) = storage::try_load_cert_chain_from_disk(dir, ca)
        .with_context(|| format!("Failed to load CA certificate '{ca}'"))?;
    let ca_key = storage::try_load_key_from_disk(dir, ca)
        .with_context(|| format!("Failed to load CA key '{ca}'"))?;

    let (cert, key) = if intermediate {
        new_intermediate_certificate_authority(&ca_cert, &ca_key, cert_cfg, &SystemKeyGenerator)
    } else {
        new_cert_and_key(&ca_cert, &ca_key, cert_cfg, &SystemKeyGenerator)
    }
    .context("Failed to issue certificate")?;

    // Store the leaf with its issuing chain so it can be verified on its own
    let mut bundle = vec![cert, ca_cert];
    bundle.append(&mut ca_chain);
    storage::write_key(dir, name, &key).context("Failed to store key")?;
    storage::write_cert_bundle(dir, name, &bundle).context("Failed to store certificate")?;

    info!(name, issuer = ca, intermediate, "certificate issued");
    println!("✓ Certificate '{}' issued by '{}'", cert_cfg.common_name, ca);
    Ok(())
}

fn verify_stored(config: &AppConfig, name: &str, ca: &str, offset_days: i64) -> Result<()> {
    let dir = &config.pki.directory;
    let (cert, intermediates) = storage::try_load_cert_chain_from_disk(dir, name)
        .with_context(|| format!("Failed to load certificate '{name}'"))?;
    let root = storage::try_load_cert_from_disk(dir, ca)
        .with_context(|| format!("Failed to load root certificate '{ca}'"))?;

    verify::verify_cert_chain(&cert, &intermediates, &root)?;
    verify::validate_cert_period(&cert, offset_from_days(offset_days)?)?;
    println!("✓ '{}' chains to '{}' and is within its validity period", name, ca);
    Ok(())
}

fn offset_from_days(days: i64) -> Result<chrono::Duration> {
    chrono::Duration::try_days(days).with_context(|| format!("--offset-days {days} is out of range"))
}

fn encrypt(mode: Mode, key: &str, iv: &str, text: &str) -> Result<String> {
    let ctext = match mode {
        Mode::Aes256 => aes::aes256_encrypt(key, iv, text)?,
        Mode::Aes128 => aes::aes128_encrypt(key, iv, text)?,
        Mode::Salt256 => salt::aes256_salt_encrypt(key, iv, text)?,
        Mode::Salt128 => salt::aes128_salt_encrypt(key, iv, text)?,
        Mode::Sa256 => compressed::sa256_encode(key, iv, text)?,
        Mode::Sa128 => compressed::sa128_encode(key, iv, text)?,
        Mode::Ga256 => compressed::ga256_encode(key, iv, text)?,
        Mode::Ga128 => compressed::ga128_encode(key, iv, text)?,
    };
    Ok(ctext)
}

fn decrypt(key: &str, iv: &str, ctext: &str) -> Result<String> {
    let text = if compressed::parse_sa256_text(ctext).is_some() {
        compressed::sa256_decode(key, iv, ctext)?
    } else if compressed::parse_sa128_text(ctext).is_some() {
        compressed::sa128_decode(key, iv, ctext)?
    } else if compressed::parse_ga256_text(ctext).is_some() {
        compressed::ga256_decode(key, iv, ctext)?
    } else if compressed::parse_ga128_text(ctext).is_some() {
        compressed::ga128_decode(key, iv, ctext)?
    } else if salt::is_aes256_salt_text(ctext) {
        salt::aes256_salt_decrypt(key, iv, ctext)?
    } else if salt::is_aes128_salt_text(ctext) {
        salt::aes128_salt_decrypt(key, iv, ctext)?
    } else if aes::is_aes256_text(ctext) {
        aes::aes256_decrypt(key, iv, ctext)?
    } else if aes::is_aes128_text(ctext) {
        aes::aes128_decrypt(key, iv, ctext)?
    } else {
        bail!("input does not start with a known envelope tag");
    };
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offset_from_days_bounds() {
        assert_eq!(offset_from_days(30).unwrap(), chrono::Duration::days(30));
        assert_eq!(offset_from_days(-1).unwrap(), chrono::Duration::days(-1));
        assert!(offset_from_days(i64::MAX).is_err());
        assert!(offset_from_days(i64::MIN).is_err());
    }
}
