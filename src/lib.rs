//! # hdkey-rs
//!
//! Hierarchical deterministic keys for secp256k1.
//!
//! This crate derives a tree of key pairs from a single seed (BIP32), turns
//! mnemonic phrases into seeds (BIP39) and reads and writes the checksummed
//! base58 extended-key format across networks and script purposes.
//!
//! ## Quick Start
//!
//! ```rust
//! use hdkey_rs::{HdKey, Mnemonic, Network, Purpose};
//!
//! # fn main() -> hdkey_rs::Result<()> {
//! let mnemonic = Mnemonic::from_phrase(
//!     "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
//! )?;
//! let root = HdKey::from_mnemonic(&mnemonic, "", Network::Mainnet)?;
//!
//! let account = root.derive_path("m/84'/0'/0'")?;
//! let zpub = account.to_base58_public(Purpose::NativeSegwit)?;
//! assert!(zpub.starts_with("zpub"));
//!
//! let (restored, purpose) = HdKey::from_base58(&zpub, Some(Network::Mainnet))?;
//! assert_eq!(purpose, Purpose::NativeSegwit);
//! assert_eq!(restored, account.to_public());
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture Overview
//!
//! - [`primitives::bip32`]: child-key derivation and derivation paths
//! - [`primitives::codec`]: the 78-byte extended-key payload and its base58check wrapper
//! - [`primitives::network`]: version prefixes per network and purpose
//! - [`bip39`]: mnemonic generation, validation and seed stretching
//! - [`hdkey`]: the [`HdKey`] facade tying a key to its network
//! - [`utils`]: configuration, logging and crypto helpers
//!
//! ## Error Handling
//!
//! All fallible APIs return [`Result<T, HdError>`](error::HdError). Nothing is
//! retried internally; in particular an invalid child index is reported to the
//! caller, who decides whether to try the next one.

pub mod bip39;
pub mod error;
pub mod hdkey;
pub mod primitives;
pub mod utils;

pub use bip39::{Mnemonic, Seed};
pub use error::{HdError, Result};
pub use hdkey::{ExtendedKeyParts, HdKey};
pub use primitives::bip32::{ChildNumber, DerivationPath, ExtendedKey};
pub use primitives::codec::{DecodedKey, ExtendedKeyCodec};
pub use primitives::network::{KeyKind, Network, NetworkRegistry, Purpose};
pub use utils::config::HdConfig;

/// Initializes logging from `config`. Safe to call more than once; only the
/// first call installs a logger.
///
/// Library code logs nothing above `debug`, so the configured level mainly
/// matters for hosts that share the logger.
pub fn init(config: &HdConfig) -> Result<()> {
    // It's ok if this fails, it just means logging was already initialized.
    let _ = utils::logging::init_logging(config.log_level);

    log::debug!(
        "hdkey-rs initialized: network={}, purpose={}",
        config.network,
        config.purpose
    );
    Ok(())
}
