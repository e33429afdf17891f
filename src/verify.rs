//! Chain and validity-period checks for issued certificates.

use chrono::{Duration, Utc};
use openssl::asn1::{Asn1Time, Asn1TimeRef};
use openssl::stack::Stack;
use openssl::x509::store::X509StoreBuilder;
use openssl::x509::{X509Ref, X509StoreContext, X509};
use std::cmp::Ordering;
use tracing::debug;

use crate::error::{Error, Result};

/// Verify that `cert` chains to `root` through `intermediates`.
///
/// Only `root` is trusted; intermediates are supplied as untrusted chain
/// material. No extended key usage is enforced.
pub fn verify_cert_chain(cert: &X509Ref, intermediates: &[X509], root: &X509Ref) -> Result<()> {
    let mut store = X509StoreBuilder::new()?;
    store.add_cert(root.to_owned())?;
    let store = store.build();

    let mut chain = Stack::new()?;
    for intermediate in intermediates {
        chain.push(intermediate.clone())?;
    }

    let mut ctx = X509StoreContext::new()?;
    let (ok, result) = ctx.init(&store, cert, &chain, |c| Ok((c.verify_cert()?, c.error())))?;
    if !ok {
        return Err(Error::ChainVerificationFailed(result.error_string().to_string()));
    }
    debug!(intermediates = intermediates.len(), "certificate chain verified");
    Ok(())
}

/// Check that `cert` is within its validity window at `now + offset`.
///
/// A positive offset asks "will it still be valid then", a negative one
/// "was it already valid then". Offsets beyond the representable time range
/// resolve to `Expired` (future) or `NotYetValid` (past).
pub fn validate_cert_period(cert: &X509Ref, offset: Duration) -> Result<()> {
    let check = match Utc::now()
        .checked_add_signed(offset)
        .and_then(|at| Asn1Time::from_unix(at.timestamp()).ok())
    {
        Some(check) => check,
        None if offset < Duration::zero() => {
            return Err(Error::NotYetValid(format!(
                "offset {offset} is before {}",
                cert.not_before()
            )));
        }
        None => {
            return Err(Error::Expired(format!(
                "offset {offset} is after {}",
                cert.not_after()
            )));
        }
    };
    let check: &Asn1TimeRef = &check;
    if check.compare(cert.not_before())? == Ordering::Less {
        return Err(Error::NotYetValid(format!(
            "current time {} is before {}",
            check,
            cert.not_before()
        )));
    }
    if check.compare(cert.not_after())? == Ordering::Greater {
        return Err(Error::Expired(format!(
            "current time {} is after {}",
            check,
            cert.not_after()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cert_config::{CertConfig, ExtKeyUsage, KeyAlgorithm};
    use crate::generate_root_ca::new_certificate_authority;
    use crate::generate_signed_cert::{new_cert_and_key, new_intermediate_certificate_authority};
    use crate::keys::SystemKeyGenerator;

    fn ca(name: &str) -> (X509, openssl::pkey::PKey<openssl::pkey::Private>) {
        let cfg = CertConfig::new(name).algorithm(KeyAlgorithm::Ecdsa);
        new_certificate_authority(&cfg, &SystemKeyGenerator).unwrap()
    }

    fn leaf_cfg() -> CertConfig {
        CertConfig::new("leaf")
            .dns_name("leaf.example")
            .usage(ExtKeyUsage::ClientAuth)
            .algorithm(KeyAlgorithm::Ecdsa)
    }

    #[test]
    fn test_leaf_verifies_against_root() {
        let (root, root_key) = ca("Root");
        let (leaf, _) = new_cert_and_key(&root, &root_key, &leaf_cfg(), &SystemKeyGenerator).unwrap();
        verify_cert_chain(&leaf, &[], &root).unwrap();
    }

    #[test]
    fn test_unrelated_root_fails() {
        let (root, root_key) = ca("Root");
        let (other, _) = ca("Other Root");
        let (leaf, _) = new_cert_and_key(&root, &root_key, &leaf_cfg(), &SystemKeyGenerator).unwrap();
        assert!(matches!(
            verify_cert_chain(&leaf, &[], &other),
            Err(Error::ChainVerificationFailed(_))
        ));
    }

    #[test]
    fn test_chain_through_intermediate() {
        let (root, root_key) = ca("Root");
        let int_cfg = CertConfig::new("Intermediate").algorithm(KeyAlgorithm::Ecdsa);
        let (int_cert, int_key) =
            new_intermediate_certificate_authority(&root, &root_key, &int_cfg, &SystemKeyGenerator)
                .unwrap();
        let (leaf, _) =
            new_cert_and_key(&int_cert, &int_key, &leaf_cfg(), &SystemKeyGenerator).unwrap();

        verify_cert_chain(&leaf, &[int_cert.clone()], &root).unwrap();
        verify_cert_chain(&int_cert, &[], &root).unwrap();
        // Without the intermediate the leaf has no path to the root
        assert!(verify_cert_chain(&leaf, &[], &root).is_err());
    }

    #[test]
    fn test_validity_period() {
        let (root, _) = ca("Root");
        validate_cert_period(&root, Duration::zero()).unwrap();
        validate_cert_period(&root, Duration::days(3000)).unwrap();
        assert!(matches!(
            validate_cert_period(&root, Duration::days(3651)),
            Err(Error::Expired(_))
        ));
        assert!(matches!(
            validate_cert_period(&root, Duration::days(-1)),
            Err(Error::NotYetValid(_))
        ));
    }

    #[test]
    fn test_validity_period_out_of_range_offsets() {
        let (root, _) = ca("Root");
        assert!(matches!(
            validate_cert_period(&root, Duration::days(1_000_000_000)),
            Err(Error::Expired(_))
        ));
        assert!(matches!(
            validate_cert_period(&root, Duration::days(-1_000_000_000)),
            Err(Error::NotYetValid(_))
        ));
        // Representable in chrono but past what ASN.1 time encodes
        assert!(matches!(
            validate_cert_period(&root, Duration::days(10_000_000)),
            Err(Error::Expired(_))
        ));
    }
}
