//! Key-tree primitives: hashing, base58, network parameters, derivation and
//! extended-key serialization.

pub mod base58;
pub mod bip32;
pub mod codec;
pub mod hash;
pub mod network;
