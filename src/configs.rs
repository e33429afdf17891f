use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::cert_config::{CertConfig, KeyAlgorithm};

/// Default configuration file name, looked up in the working directory
pub const DEFAULT_CONFIG_FILE: &str = "pki-envelope.toml";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct AppConfig {
    #[serde(default)]
    pub pki: PkiConfig,
    #[serde(default)]
    pub ca_defaults: CADefaults,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PkiConfig {
    #[serde(default = "default_pki_directory")]
    pub directory: PathBuf,
}

impl Default for PkiConfig {
    fn default() -> Self {
        Self {
            directory: default_pki_directory(),
        }
    }
}

fn default_pki_directory() -> PathBuf {
    PathBuf::from("pki")
}

#[derive(Debug, Deserialize, Clone)]
pub struct CADefaults {
    #[serde(default = "default_ca_cn")]
    pub common_name: String,
    #[serde(default = "default_ca_org")]
    pub organization: String,
    #[serde(default)]
    pub algorithm: KeyAlgorithm,
}

impl Default for CADefaults {
    fn default() -> Self {
        Self {
            common_name: default_ca_cn(),
            organization: default_ca_org(),
            algorithm: KeyAlgorithm::default(),
        }
    }
}

impl CADefaults {
    /// Certificate parameters for a new root CA.
    pub fn to_cert_config(&self) -> CertConfig {
        let mut cfg = CertConfig::new(self.common_name.clone()).algorithm(self.algorithm);
        if !self.organization.is_empty() {
            cfg = cfg.organization(self.organization.clone());
        }
        cfg
    }
}

fn default_ca_cn() -> String {
    "PKI Envelope Root CA".to_string()
}

fn default_ca_org() -> String {
    "PKI Envelope".to_string()
}

/// Log output format for the binary
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

impl AppConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let config_str = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: AppConfig =
            toml::from_str(&config_str).context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load `pki-envelope.toml` if present, otherwise built-in defaults
    pub fn load() -> Result<Self> {
        if Path::new(DEFAULT_CONFIG_FILE).exists() {
            Self::from_file(DEFAULT_CONFIG_FILE)
        } else {
            Ok(Self::default())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_defaults_from_empty_file() {
        let config: AppConfig = toml::from_str("").unwrap();
        assert_eq!(config.pki.directory, PathBuf::from("pki"));
        assert_eq!(config.ca_defaults.algorithm, KeyAlgorithm::Rsa);
        assert_eq!(config.logging.level, "info");
        assert_eq!(config.logging.format, LogFormat::Text);
    }

    #[test]
    fn test_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"
[pki]
directory = "/var/lib/pki"

[ca_defaults]
common_name = "Acme Root"
organization = "Acme"
algorithm = "ecdsa"

[logging]
level = "debug"
format = "json"
"#
        )
        .unwrap();

        let config = AppConfig::from_file(file.path()).unwrap();
        assert_eq!(config.pki.directory, PathBuf::from("/var/lib/pki"));
        assert_eq!(config.logging.format, LogFormat::Json);

        let cert_cfg = config.ca_defaults.to_cert_config();
        assert_eq!(cert_cfg.common_name, "Acme Root");
        assert_eq!(cert_cfg.organization, vec!["Acme"]);
        assert_eq!(cert_cfg.algorithm, KeyAlgorithm::Ecdsa);
    }

    #[test]
    fn test_missing_file_is_error() {
        let err = AppConfig::from_file("/nonexistent/pki-envelope.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }

    #[test]
    fn test_bad_algorithm_rejected() {
        let parsed: std::result::Result<AppConfig, _> =
            toml::from_str("[ca_defaults]\nalgorithm = \"dsa\"");
        assert!(parsed.is_err());
    }
}
