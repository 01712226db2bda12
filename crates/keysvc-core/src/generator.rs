//! Credential generation.
//!
//! Every credential is a string of ASCII letters drawn uniformly from a
//! 52-symbol alphabet. Uniformity comes from rejection sampling: random bytes
//! at or above [`ACCEPT_BELOW`] (the largest multiple of 52 that fits in a
//! byte) are discarded, the rest are reduced modulo 52.

use std::sync::Arc;

use rand_core::{OsRng, RngCore};

use crate::error::GenerationError;
use crate::principal::{CredentialBundle, KeyPair};

/// The credential alphabet: lowercase then uppercase ASCII letters.
pub const ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Length of a single-pair key or secret.
pub const PAIR_LENGTH: usize = 32;

/// Length of each bundle field.
pub const BUNDLE_FIELD_LENGTH: usize = 25;

/// Bytes `>= ACCEPT_BELOW` are rejected (`52 * 4 = 208`).
pub const ACCEPT_BELOW: u8 = 208;

/// Consecutive draws with no usable byte before the source is declared broken.
const MAX_EMPTY_DRAWS: usize = 8;

const DRAW_SIZE: usize = 64;

/// A source of cryptographically secure random bytes.
pub trait RandomSource: Send + Sync {
    /// Fill `buf` entirely with random bytes.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError::Unavailable`] if the source cannot deliver.
    fn fill(&self, buf: &mut [u8]) -> Result<(), GenerationError>;
}

/// The operating system CSPRNG.
#[derive(Debug, Clone, Copy, Default)]
pub struct OsRandom;

impl RandomSource for OsRandom {
    fn fill(&self, buf: &mut [u8]) -> Result<(), GenerationError> {
        OsRng
            .try_fill_bytes(buf)
            .map_err(|e| GenerationError::Unavailable {
                reason: e.to_string(),
            })
    }
}

/// Produces credential strings, key pairs, and bundles.
#[derive(Clone)]
pub struct CredentialGenerator {
    source: Arc<dyn RandomSource>,
}

impl std::fmt::Debug for CredentialGenerator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGenerator").finish_non_exhaustive()
    }
}

impl Default for CredentialGenerator {
    fn default() -> Self {
        Self::new(Arc::new(OsRandom))
    }
}

impl CredentialGenerator {
    /// Create a generator over the given random source.
    #[must_use]
    pub fn new(source: Arc<dyn RandomSource>) -> Self {
        Self { source }
    }

    /// Generate a string of exactly `n` letters.
    ///
    /// # Errors
    ///
    /// - [`GenerationError::InvalidLength`] if `n == 0`.
    /// - [`GenerationError::Unavailable`] if the random source fails.
    pub fn random_string(&self, n: usize) -> Result<String, GenerationError> {
        if n == 0 {
            return Err(GenerationError::InvalidLength);
        }

        let mut out = String::with_capacity(n);
        let mut buf = [0u8; DRAW_SIZE];
        let mut empty_draws = 0;

        while out.len() < n {
            self.source.fill(&mut buf)?;
            let before = out.len();
            for &b in buf.iter().filter(|b| **b < ACCEPT_BELOW) {
                out.push(char::from(ALPHABET[usize::from(b % 52)]));
                if out.len() == n {
                    break;
                }
            }
            if out.len() == before {
                empty_draws += 1;
                if empty_draws >= MAX_EMPTY_DRAWS {
                    return Err(GenerationError::Unavailable {
                        reason: "random source produced no usable bytes".to_owned(),
                    });
                }
            } else {
                empty_draws = 0;
            }
        }

        Ok(out)
    }

    /// Generate a [`PAIR_LENGTH`] key and secret.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] if either half cannot be generated.
    pub fn key_pair(&self) -> Result<KeyPair, GenerationError> {
        Ok(KeyPair {
            key: self.random_string(PAIR_LENGTH)?,
            secret: self.random_string(PAIR_LENGTH)?,
        })
    }

    /// Generate all five bundle fields, or fail on the first field that
    /// cannot be generated. Nothing partial is ever returned.
    ///
    /// # Errors
    ///
    /// Returns the first [`GenerationError`] encountered.
    pub fn bundle(&self) -> Result<CredentialBundle, GenerationError> {
        Ok(CredentialBundle {
            user_service: self.random_string(BUNDLE_FIELD_LENGTH)?,
            hooks_service: self.random_string(BUNDLE_FIELD_LENGTH)?,
            company_service: self.random_string(BUNDLE_FIELD_LENGTH)?,
            billing_service: self.random_string(BUNDLE_FIELD_LENGTH)?,
            permissions_service: self.random_string(BUNDLE_FIELD_LENGTH)?,
        })
    }
}

/// Generate `n` letters from the OS random source.
///
/// # Errors
///
/// See [`CredentialGenerator::random_string`].
pub fn generate_random_string(n: usize) -> Result<String, GenerationError> {
    CredentialGenerator::default().random_string(n)
}
