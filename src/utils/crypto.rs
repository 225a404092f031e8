//! Cryptographic utility functions.
//!
//! This module provides:
//! - Operating-system backed random number generation
//! - Constant-time comparison of secret-dependent data

use crate::{HdError, Result};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Fill `dest` from `rng`, surfacing generator failure instead of panicking.
pub fn fill_random<R: RngCore + CryptoRng + ?Sized>(rng: &mut R, dest: &mut [u8]) -> Result<()> {
    rng.try_fill_bytes(dest)
        .map_err(|e| HdError::EntropySourceFailure(e.to_string()))
}

/// Secure random number generator backed by the operating system.
#[derive(Debug, Default, Clone, Copy)]
pub struct SecureRng {
    rng: OsRng,
}

impl SecureRng {
    /// Create a new secure random number generator
    pub fn new() -> Self {
        Self { rng: OsRng }
    }

    /// Fill `dest` with random bytes.
    pub fn fill(&mut self, dest: &mut [u8]) -> Result<()> {
        fill_random(&mut self.rng, dest)
    }

    /// Generate `len` random bytes, wiped when dropped.
    pub fn random_bytes(&mut self, len: usize) -> Result<Zeroizing<Vec<u8>>> {
        let mut bytes = Zeroizing::new(vec![0u8; len]);
        self.fill(&mut bytes)?;
        Ok(bytes)
    }
}

/// Constant-time operations
pub struct ConstantTime;

impl ConstantTime {
    /// Compare two byte slices in constant time. Only the length check is
    /// allowed to short-circuit.
    pub fn eq(a: &[u8], b: &[u8]) -> bool {
        if a.len() != b.len() {
            return false;
        }
        a.ct_eq(b).into()
    }

    /// Compare two arrays in constant time
    pub fn eq_arrays<const N: usize>(a: &[u8; N], b: &[u8; N]) -> bool {
        a.ct_eq(b).into()
    }
}
