//! Certificate request parameters shared by every issuance path.

use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::net::IpAddr;
use std::str::FromStr;

use openssl::x509::extension::ExtendedKeyUsage;
use openssl::x509::X509Ref;
use serde::Deserialize;

/// Public key algorithm for generated keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyAlgorithm {
    /// RSA, 2048-bit modulus
    #[default]
    Rsa,
    /// ECDSA on P-256
    Ecdsa,
}

impl FromStr for KeyAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rsa" => Ok(Self::Rsa),
            "ecdsa" | "ec" => Ok(Self::Ecdsa),
            other => Err(format!("unknown key algorithm: {other}")),
        }
    }
}

/// Extended key usages that can be requested for a certificate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExtKeyUsage {
    Any,
    ServerAuth,
    ClientAuth,
    CodeSigning,
    EmailProtection,
    TimeStamping,
    OcspSigning,
}

impl ExtKeyUsage {
    /// OpenSSL short name for the usage OID.
    pub fn short_name(self) -> &'static str {
        match self {
            Self::Any => "anyExtendedKeyUsage",
            Self::ServerAuth => "serverAuth",
            Self::ClientAuth => "clientAuth",
            Self::CodeSigning => "codeSigning",
            Self::EmailProtection => "emailProtection",
            Self::TimeStamping => "timeStamping",
            Self::OcspSigning => "OCSPSigning",
        }
    }

    /// Add this usage to an extension builder.
    pub(crate) fn apply(self, eku: &mut ExtendedKeyUsage) {
        match self {
            Self::ServerAuth => eku.server_auth(),
            Self::ClientAuth => eku.client_auth(),
            Self::CodeSigning => eku.code_signing(),
            Self::EmailProtection => eku.email_protection(),
            Self::TimeStamping => eku.time_stamping(),
            Self::Any | Self::OcspSigning => eku.other(self.short_name()),
        };
    }
}

impl fmt::Display for ExtKeyUsage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

impl FromStr for ExtKeyUsage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().replace(['-', '_'], "").as_str() {
            "any" | "anyextendedkeyusage" => Ok(Self::Any),
            "serverauth" | "server" => Ok(Self::ServerAuth),
            "clientauth" | "client" => Ok(Self::ClientAuth),
            "codesigning" => Ok(Self::CodeSigning),
            "emailprotection" => Ok(Self::EmailProtection),
            "timestamping" => Ok(Self::TimeStamping),
            "ocspsigning" => Ok(Self::OcspSigning),
            other => Err(format!("unknown extended key usage: {other}")),
        }
    }
}

/// Subject alternative names: DNS names and IP addresses.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AltNames {
    pub dns_names: Vec<String>,
    pub ips: Vec<IpAddr>,
}

impl AltNames {
    pub fn is_empty(&self) -> bool {
        self.dns_names.is_empty() && self.ips.is_empty()
    }

    /// Remove duplicate entries.
    ///
    /// DNS names are treated as a set and come back sorted; IP addresses keep
    /// the order of their first occurrence.
    pub fn remove_duplicates(&mut self) {
        let dns: BTreeSet<String> = self.dns_names.drain(..).collect();
        self.dns_names = dns.into_iter().collect();

        let mut seen = HashSet::new();
        self.ips.retain(|ip| seen.insert(*ip));
    }
}

/// Parameters for a certificate, CA or CSR.
#[derive(Debug, Clone, Default)]
pub struct CertConfig {
    pub common_name: String,
    pub organization: Vec<String>,
    pub alt_names: AltNames,
    pub usages: Vec<ExtKeyUsage>,
    pub algorithm: KeyAlgorithm,
}

impl CertConfig {
    pub fn new(common_name: impl Into<String>) -> Self {
        Self {
            common_name: common_name.into(),
            ..Self::default()
        }
    }

    pub fn organization(mut self, org: impl Into<String>) -> Self {
        self.organization.push(org.into());
        self
    }

    pub fn dns_name(mut self, name: impl Into<String>) -> Self {
        self.alt_names.dns_names.push(name.into());
        self
    }

    pub fn ip(mut self, ip: IpAddr) -> Self {
        self.alt_names.ips.push(ip);
        self
    }

    pub fn usage(mut self, usage: ExtKeyUsage) -> Self {
        self.usages.push(usage);
        self
    }

    pub fn algorithm(mut self, algorithm: KeyAlgorithm) -> Self {
        self.algorithm = algorithm;
        self
    }
}

/// Whether `cert` lists `serverAuth` among its extended key usages.
///
/// The openssl crate has no EKU accessor, so this reads `X509_print` output:
/// the "X509v3 Extended Key Usage" header followed by one line of
/// comma-separated usage names. A change to that print format breaks this.
pub fn has_server_auth(cert: &X509Ref) -> bool {
    let text = match cert.to_text() {
        Ok(text) => String::from_utf8_lossy(&text).into_owned(),
        Err(_) => return false,
    };
    let mut lines = text.lines();
    while let Some(line) = lines.next() {
        if line.trim_start().starts_with("X509v3 Extended Key Usage") {
            return lines
                .next()
                .map(|usages| usages.contains("TLS Web Server Authentication"))
                .unwrap_or(false);
        }
    }
    false
}
