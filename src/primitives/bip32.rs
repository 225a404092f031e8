//! BIP32 Hierarchical Deterministic Keys.

use crate::primitives::hash;
use crate::{HdError, Result};
use secp256k1::{PublicKey, Scalar, SecretKey, SECP256K1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, Zeroizing};

const BIP32_MASTER_KEY: &[u8] = b"Bitcoin seed";

/// Top bit of a child number, set for hardened derivation.
pub const HARDENED_BIT: u32 = 0x8000_0000;

/// Shortest seed accepted for master key generation (128 bits).
pub const MIN_SEED_LEN: usize = 16;
/// Longest seed accepted for master key generation (512 bits).
pub const MAX_SEED_LEN: usize = 64;

/// Chain code for BIP32 key derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChainCode(pub [u8; 32]);

impl ChainCode {
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

/// Key fingerprint (first 4 bytes of HASH160 of public key)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Fingerprint(pub [u8; 4]);

impl Fingerprint {
    pub fn as_bytes(&self) -> &[u8; 4] {
        &self.0
    }

    /// Calculate fingerprint from public key
    pub fn from_public_key(public_key: &PublicKey) -> Self {
        let id = hash::hash160(&public_key.serialize());
        Fingerprint([id[0], id[1], id[2], id[3]])
    }

    pub fn to_u32(&self) -> u32 {
        u32::from_be_bytes(self.0)
    }

    pub fn from_u32(value: u32) -> Self {
        Fingerprint(value.to_be_bytes())
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0; 4]
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&hex::encode(self.0))
    }
}

/// Child number of a derivation step, stored in its raw 32-bit encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChildNumber(u32);

impl ChildNumber {
    /// Build a child number from a 31-bit index and the hardened flag.
    pub fn new(index: u32, hardened: bool) -> Result<Self> {
        if index >= HARDENED_BIT {
            return Err(HdError::InvalidPath(format!(
                "Child index {} out of range",
                index
            )));
        }
        Ok(ChildNumber(if hardened { index | HARDENED_BIT } else { index }))
    }

    pub fn normal(index: u32) -> Result<Self> {
        Self::new(index, false)
    }

    pub fn hardened(index: u32) -> Result<Self> {
        Self::new(index, true)
    }

    /// Interpret a raw encoded value; the top bit selects hardened derivation.
    pub const fn from_raw(raw: u32) -> Self {
        ChildNumber(raw)
    }

    pub const fn raw(&self) -> u32 {
        self.0
    }

    /// Index without the hardened bit.
    pub const fn index(&self) -> u32 {
        self.0 & !HARDENED_BIT
    }

    pub const fn is_hardened(&self) -> bool {
        self.0 & HARDENED_BIT != 0
    }
}

impl From<u32> for ChildNumber {
    fn from(raw: u32) -> Self {
        ChildNumber::from_raw(raw)
    }
}

impl From<ChildNumber> for u32 {
    fn from(child: ChildNumber) -> Self {
        child.raw()
    }
}

impl fmt::Display for ChildNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_hardened() {
            write!(f, "{}'", self.index())
        } else {
            write!(f, "{}", self.index())
        }
    }
}

impl FromStr for ChildNumber {
    type Err = HdError;

    /// Parse one path segment: decimal digits optionally followed by `'`, `h` or `H`.
    fn from_str(s: &str) -> Result<Self> {
        let (digits, hardened) = match s.chars().last() {
            Some('\'') | Some('h') | Some('H') => (&s[..s.len() - 1], true),
            _ => (s, false),
        };

        if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(HdError::InvalidPath(format!(
                "Invalid path component: {:?}",
                s
            )));
        }

        let index: u32 = digits.parse().map_err(|_| {
            HdError::InvalidPath(format!("Path component index too large: {}", digits))
        })?;

        ChildNumber::new(index, hardened)
    }
}

/// Root marker of a derivation path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum PathRoot {
    /// `m`
    #[default]
    Private,
    /// `M`
    Public,
}

/// Derivation path for BIP32 key derivation
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct DerivationPath {
    root: PathRoot,
    steps: Vec<ChildNumber>,
}

impl DerivationPath {
    /// Create a new derivation path rooted at `m`
    pub fn new(steps: Vec<ChildNumber>) -> Self {
        DerivationPath {
            root: PathRoot::Private,
            steps,
        }
    }

    /// Create master path (empty)
    pub fn master() -> Self {
        DerivationPath::default()
    }

    pub fn with_root(mut self, root: PathRoot) -> Self {
        self.root = root;
        self
    }

    pub fn root(&self) -> PathRoot {
        self.root
    }

    /// Get the path components
    pub fn steps(&self) -> &[ChildNumber] {
        &self.steps
    }

    pub fn is_master(&self) -> bool {
        self.steps.is_empty()
    }

    /// Number of derivation steps
    pub fn depth(&self) -> usize {
        self.steps.len()
    }

    /// Get the last child number, or None for master
    pub fn child_number(&self) -> Option<ChildNumber> {
        self.steps.last().copied()
    }

    /// Get parent path
    pub fn parent(&self) -> Option<DerivationPath> {
        if self.steps.is_empty() {
            None
        } else {
            let mut parent = self.clone();
            parent.steps.pop();
            Some(parent)
        }
    }

    /// Extend path with child
    pub fn child(&self, child_number: ChildNumber) -> DerivationPath {
        let mut child = self.clone();
        child.steps.push(child_number);
        child
    }

    /// Append the steps of another path, ignoring its root marker.
    pub fn extend(&self, other: &DerivationPath) -> DerivationPath {
        let mut extended = self.clone();
        extended.steps.extend_from_slice(&other.steps);
        extended
    }

    /// Check whether a string parses as a derivation path.
    pub fn is_valid(path: &str) -> bool {
        path.parse::<DerivationPath>().is_ok()
    }
}

impl FromStr for DerivationPath {
    type Err = HdError;

    fn from_str(s: &str) -> Result<Self> {
        let mut components = s.split('/');
        let root = match components.next() {
            Some("m") => PathRoot::Private,
            Some("M") => PathRoot::Public,
            _ => {
                return Err(HdError::InvalidPath(format!(
                    "Derivation path must start with 'm' or 'M': {:?}",
                    s
                )))
            }
        };

        let steps = components
            .map(ChildNumber::from_str)
            .collect::<Result<Vec<_>>>()?;

        Ok(DerivationPath { root, steps })
    }
}

impl fmt::Display for DerivationPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.root {
            PathRoot::Private => write!(f, "m")?,
            PathRoot::Public => write!(f, "M")?,
        }
        for child_number in &self.steps {
            write!(f, "/{}", child_number)?;
        }
        Ok(())
    }
}

fn next_depth(depth: u8) -> Result<u8> {
    depth
        .checked_add(1)
        .ok_or_else(|| HdError::InvalidDerivation("Maximum derivation depth of 255 reached".to_string()))
}

/// Split HMAC output into the tweak scalar (IL) and the child chain code (IR).
fn split_tweak(mut i: [u8; 64], child_number: ChildNumber) -> Result<(Scalar, ChainCode)> {
    let mut il = Zeroizing::new([0u8; 32]);
    il.copy_from_slice(&i[..32]);
    let mut chain_code = [0u8; 32];
    chain_code.copy_from_slice(&i[32..]);
    i.zeroize();

    // IL >= n makes this index unusable.
    let tweak = Scalar::from_be_bytes(*il).map_err(|_| HdError::InvalidChildKey(child_number.raw()))?;
    Ok((tweak, ChainCode(chain_code)))
}

/// Extended private key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtendedPrivateKey {
    pub depth: u8,
    pub parent_fingerprint: Fingerprint,
    pub child_number: ChildNumber,
    pub private_key: SecretKey,
    pub chain_code: ChainCode,
}

impl ExtendedPrivateKey {
    /// Create a new master key from a seed
    pub fn new_master(seed: &[u8]) -> Result<Self> {
        if seed.len() < MIN_SEED_LEN || seed.len() > MAX_SEED_LEN {
            return Err(HdError::InvalidSeed(format!(
                "Seed must be between {} and {} bytes, got {}",
                MIN_SEED_LEN,
                MAX_SEED_LEN,
                seed.len()
            )));
        }

        let mut i = hash::hmac_sha512(BIP32_MASTER_KEY, &[seed])?;
        let (key_bytes, chain_code_bytes) = i.split_at(32);

        let private_key = SecretKey::from_slice(key_bytes)
            .map_err(|e| HdError::InvalidSeed(format!("Invalid master key from seed: {}", e)));

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(chain_code_bytes);
        i.zeroize();

        Ok(ExtendedPrivateKey {
            depth: 0,
            parent_fingerprint: Fingerprint::default(),
            child_number: ChildNumber::default(),
            private_key: private_key?,
            chain_code: ChainCode(chain_code),
        })
    }

    pub fn public_key(&self) -> PublicKey {
        PublicKey::from_secret_key(SECP256K1, &self.private_key)
    }

    /// Derive a child private key
    pub fn derive_child(&self, child_number: ChildNumber) -> Result<ExtendedPrivateKey> {
        let depth = next_depth(self.depth)?;
        let public_key = self.public_key();
        let index_bytes = child_number.raw().to_be_bytes();

        let i = if child_number.is_hardened() {
            // Hardened derivation: use private key
            let secret = Zeroizing::new(self.private_key.secret_bytes());
            hash::hmac_sha512(&self.chain_code.0, &[&[0u8][..], &secret[..], &index_bytes[..]])?
        } else {
            // Non-hardened derivation: use public key
            hash::hmac_sha512(&self.chain_code.0, &[&public_key.serialize()[..], &index_bytes[..]])?
        };

        let (tweak, chain_code) = split_tweak(i, child_number)?;
        let private_key = self
            .private_key
            .add_tweak(&tweak)
            .map_err(|_| HdError::InvalidChildKey(child_number.raw()))?;

        Ok(ExtendedPrivateKey {
            depth,
            parent_fingerprint: Fingerprint::from_public_key(&public_key),
            child_number,
            private_key,
            chain_code,
        })
    }

    /// Derive a key from a derivation path
    pub fn derive_path(&self, path: &DerivationPath) -> Result<ExtendedPrivateKey> {
        let mut current_key = self.clone();
        for &child_number in path.steps() {
            current_key = current_key.derive_child(child_number)?;
        }
        Ok(current_key)
    }

    /// Get the corresponding extended public key
    pub fn to_public(&self) -> ExtendedPublicKey {
        ExtendedPublicKey {
            depth: self.depth,
            parent_fingerprint: self.parent_fingerprint,
            child_number: self.child_number,
            public_key: self.public_key(),
            chain_code: self.chain_code,
        }
    }

    /// Get the fingerprint of this key
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_public_key(&self.public_key())
    }

    /// HASH160 of the compressed public key
    pub fn identifier(&self) -> [u8; 20] {
        hash::hash160(&self.public_key().serialize())
    }
}

impl Drop for ExtendedPrivateKey {
    fn drop(&mut self) {
        self.private_key.non_secure_erase();
    }
}

/// Extended public key
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ExtendedPublicKey {
    pub depth: u8,
    pub parent_fingerprint: Fingerprint,
    pub child_number: ChildNumber,
    pub public_key: PublicKey,
    pub chain_code: ChainCode,
}

impl ExtendedPublicKey {
    /// Derive a child public key (non-hardened only)
    pub fn derive_child(&self, child_number: ChildNumber) -> Result<ExtendedPublicKey> {
        if child_number.is_hardened() {
            return Err(HdError::InvalidDerivation(
                "Cannot derive hardened child from public key".to_string(),
            ));
        }
        let depth = next_depth(self.depth)?;

        let i = hash::hmac_sha512(
            &self.chain_code.0,
            &[&self.public_key.serialize()[..], &child_number.raw().to_be_bytes()[..]],
        )?;

        let (tweak, chain_code) = split_tweak(i, child_number)?;
        // IL*G + parent; fails on the point at infinity
        let public_key = self
            .public_key
            .add_exp_tweak(SECP256K1, &tweak)
            .map_err(|_| HdError::InvalidChildKey(child_number.raw()))?;

        Ok(ExtendedPublicKey {
            depth,
            parent_fingerprint: self.fingerprint(),
            child_number,
            public_key,
            chain_code,
        })
    }

    /// Derive a key from a derivation path
    pub fn derive_path(&self, path: &DerivationPath) -> Result<ExtendedPublicKey> {
        let mut current_key = self.clone();
        for &child_number in path.steps() {
            current_key = current_key.derive_child(child_number)?;
        }
        Ok(current_key)
    }

    /// Get the fingerprint of this key
    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_public_key(&self.public_key)
    }

    /// HASH160 of the compressed public key
    pub fn identifier(&self) -> [u8; 20] {
        hash::hash160(&self.public_key.serialize())
    }
}

/// A node of the key tree: either private (public derivable) or public-only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExtendedKey {
    Private(ExtendedPrivateKey),
    Public(ExtendedPublicKey),
}

impl ExtendedKey {
    pub fn is_private(&self) -> bool {
        matches!(self, ExtendedKey::Private(_))
    }

    pub fn depth(&self) -> u8 {
        match self {
            ExtendedKey::Private(k) => k.depth,
            ExtendedKey::Public(k) => k.depth,
        }
    }

    pub fn parent_fingerprint(&self) -> Fingerprint {
        match self {
            ExtendedKey::Private(k) => k.parent_fingerprint,
            ExtendedKey::Public(k) => k.parent_fingerprint,
        }
    }

    pub fn child_number(&self) -> ChildNumber {
        match self {
            ExtendedKey::Private(k) => k.child_number,
            ExtendedKey::Public(k) => k.child_number,
        }
    }

    pub fn chain_code(&self) -> ChainCode {
        match self {
            ExtendedKey::Private(k) => k.chain_code,
            ExtendedKey::Public(k) => k.chain_code,
        }
    }

    pub fn private_key(&self) -> Option<&SecretKey> {
        match self {
            ExtendedKey::Private(k) => Some(&k.private_key),
            ExtendedKey::Public(_) => None,
        }
    }

    pub fn public_key(&self) -> PublicKey {
        match self {
            ExtendedKey::Private(k) => k.public_key(),
            ExtendedKey::Public(k) => k.public_key,
        }
    }

    pub fn fingerprint(&self) -> Fingerprint {
        Fingerprint::from_public_key(&self.public_key())
    }

    pub fn identifier(&self) -> [u8; 20] {
        hash::hash160(&self.public_key().serialize())
    }

    pub fn derive_child(&self, child_number: ChildNumber) -> Result<ExtendedKey> {
        match self {
            ExtendedKey::Private(k) => k.derive_child(child_number).map(ExtendedKey::Private),
            ExtendedKey::Public(k) => k.derive_child(child_number).map(ExtendedKey::Public),
        }
    }

    /// Fold `derive_child` over the path; the master path returns the node unchanged.
    pub fn derive_path(&self, path: &DerivationPath) -> Result<ExtendedKey> {
        log::trace!("deriving {} from depth {}", path, self.depth());
        match self {
            ExtendedKey::Private(k) => k.derive_path(path).map(ExtendedKey::Private),
            ExtendedKey::Public(k) => k.derive_path(path).map(ExtendedKey::Public),
        }
    }

    /// Drop the private scalar. Public nodes are returned as they are.
    pub fn to_public(&self) -> ExtendedKey {
        match self {
            ExtendedKey::Private(k) => ExtendedKey::Public(k.to_public()),
            ExtendedKey::Public(k) => ExtendedKey::Public(k.clone()),
        }
    }
}

impl From<ExtendedPrivateKey> for ExtendedKey {
    fn from(key: ExtendedPrivateKey) -> Self {
        ExtendedKey::Private(key)
    }
}

impl From<ExtendedPublicKey> for ExtendedKey {
    fn from(key: ExtendedPublicKey) -> Self {
        ExtendedKey::Public(key)
    }
}
