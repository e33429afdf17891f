//! Bounded random integers for salts.
//!
//! Draws from OpenSSL's CSPRNG. If that source fails the call falls back to a
//! time-seeded `StdRng`, which is a degraded-security path: values are then
//! predictable to anyone who can guess the call time. A `warn!` is emitted
//! whenever the fallback is taken.

use std::time::{SystemTime, UNIX_EPOCH};

use openssl::bn::BigNum;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::warn;

use crate::error::{Error, Result};

/// Strong random integer in `[0, max)`.
pub fn secure_random_int(max: i64) -> Result<i64> {
    if max <= 0 {
        return Ok(0);
    }
    let bound = BigNum::from_dec_str(&max.to_string())?;
    let mut value = BigNum::new()?;
    bound
        .rand_range(&mut value)
        .map_err(|e| Error::Entropy(e.to_string()))?;
    value
        .to_dec_str()?
        .parse::<i64>()
        .map_err(|e| Error::Entropy(e.to_string()))
}

/// Random integer in `[0, max)`, falling back to a time-seeded generator
/// when the secure source is unavailable.
pub fn random_int(max: i64) -> i64 {
    if max <= 0 {
        return 0;
    }
    match secure_random_int(max) {
        Ok(n) => n,
        Err(e) => {
            warn!(error = %e, "secure random source failed, using time-seeded fallback");
            let seed = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_nanos() as u64)
                .unwrap_or_default();
            StdRng::seed_from_u64(seed).gen_range(0..max)
        }
    }
}
