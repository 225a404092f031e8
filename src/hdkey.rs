//! The user-facing HD key: a tree node paired with the network it belongs to.

use crate::bip39::Mnemonic;
use crate::primitives::bip32::{
    ChainCode, ChildNumber, DerivationPath, ExtendedKey, ExtendedPrivateKey, ExtendedPublicKey,
    Fingerprint,
};
use crate::primitives::codec::ExtendedKeyCodec;
use crate::primitives::network::{KeyKind, Network, Purpose};
use crate::{HdError, Result};
use secp256k1::{PublicKey, SecretKey, SECP256K1};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// An extended key bound to a network.
///
/// Derivation never mutates `self`; every operation returns a new key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HdKey {
    key: ExtendedKey,
    network: Network,
}

impl HdKey {
    pub fn new(key: ExtendedKey, network: Network) -> Self {
        HdKey { key, network }
    }

    /// Master key from raw seed bytes (16 to 64 bytes).
    pub fn from_seed(seed: &[u8], network: Network) -> Result<Self> {
        let master = ExtendedPrivateKey::new_master(seed)?;
        log::debug!("created {} master key", network);
        Ok(HdKey::new(ExtendedKey::Private(master), network))
    }

    /// Master key from a mnemonic and optional passphrase.
    pub fn from_mnemonic(mnemonic: &Mnemonic, passphrase: &str, network: Network) -> Result<Self> {
        let seed = mnemonic.to_seed(passphrase);
        Self::from_seed(seed.as_bytes(), network)
    }

    pub fn key(&self) -> &ExtendedKey {
        &self.key
    }

    pub fn into_key(self) -> ExtendedKey {
        self.key
    }

    pub fn network(&self) -> Network {
        self.network
    }

    pub fn is_private(&self) -> bool {
        self.key.is_private()
    }

    pub fn depth(&self) -> u8 {
        self.key.depth()
    }

    pub fn parent_fingerprint(&self) -> Fingerprint {
        self.key.parent_fingerprint()
    }

    pub fn child_number(&self) -> ChildNumber {
        self.key.child_number()
    }

    pub fn chain_code(&self) -> ChainCode {
        self.key.chain_code()
    }

    pub fn private_key(&self) -> Option<&SecretKey> {
        self.key.private_key()
    }

    pub fn public_key(&self) -> PublicKey {
        self.key.public_key()
    }

    pub fn fingerprint(&self) -> Fingerprint {
        self.key.fingerprint()
    }

    pub fn identifier(&self) -> [u8; 20] {
        self.key.identifier()
    }

    /// Derive by raw child number; the top bit selects hardened derivation.
    pub fn derive(&self, raw: u32) -> Result<Self> {
        self.derive_child(ChildNumber::from_raw(raw))
    }

    pub fn derive_child(&self, child_number: ChildNumber) -> Result<Self> {
        Ok(HdKey::new(self.key.derive_child(child_number)?, self.network))
    }

    /// Parse `path` ("m/44'/0'/0'/0/1") and derive along it.
    pub fn derive_path(&self, path: &str) -> Result<Self> {
        let path: DerivationPath = path.parse()?;
        self.derive_along(&path)
    }

    pub fn derive_along(&self, path: &DerivationPath) -> Result<Self> {
        Ok(HdKey::new(self.key.derive_path(path)?, self.network))
    }

    /// Public-only copy of this key.
    pub fn to_public(&self) -> Self {
        HdKey::new(self.key.to_public(), self.network)
    }

    /// Serialize with this key's own kind: private keys export private material.
    pub fn to_base58(&self, purpose: Purpose) -> Result<String> {
        let kind = if self.is_private() {
            KeyKind::Private
        } else {
            KeyKind::Public
        };
        ExtendedKeyCodec::default().encode(&self.key, self.network, purpose, kind)
    }

    /// Serialize the public half.
    pub fn to_base58_public(&self, purpose: Purpose) -> Result<String> {
        ExtendedKeyCodec::default().encode(&self.key, self.network, purpose, KeyKind::Public)
    }

    /// Decode a serialized key, returning the purpose its version encodes.
    pub fn from_base58(s: &str, expected_network: Option<Network>) -> Result<(Self, Purpose)> {
        let decoded = ExtendedKeyCodec::default().decode(s, expected_network)?;
        Ok((HdKey::new(decoded.key, decoded.network), decoded.purpose))
    }

    /// Break the key into hex fields for a JSON layer.
    pub fn to_parts(&self) -> ExtendedKeyParts {
        ExtendedKeyParts {
            network: self.network,
            depth: self.depth(),
            fingerprint: self.fingerprint().to_string(),
            parent_fingerprint: self.parent_fingerprint().to_string(),
            child_index: self.child_number().raw(),
            chain_code: hex::encode(self.chain_code().as_bytes()),
            private_key: self
                .private_key()
                .map(|k| hex::encode(Zeroizing::new(k.secret_bytes()).as_slice())),
            public_key: hex::encode(self.public_key().serialize()),
        }
    }

    /// Rebuild a key from its parts, checking them as strictly as a decode.
    pub fn from_parts(parts: &ExtendedKeyParts) -> Result<Self> {
        let parent_fingerprint = Fingerprint(decode_field::<4>("parent_fingerprint", &parts.parent_fingerprint)?);
        let child_number = ChildNumber::from_raw(parts.child_index);

        if parts.depth == 0 && (!parent_fingerprint.is_zero() || child_number.raw() != 0) {
            return Err(HdError::InvalidMaster(
                "Zero depth with non-zero parent fingerprint or child number".to_string(),
            ));
        }

        let chain_code = ChainCode(decode_field::<32>("chain_code", &parts.chain_code)?);
        let public_key = PublicKey::from_slice(&decode_field::<33>("public_key", &parts.public_key)?)
            .map_err(|e| HdError::InvalidKeyData(format!("Invalid public key: {}", e)))?;

        let key = match &parts.private_key {
            Some(private_hex) => {
                let bytes = Zeroizing::new(decode_field::<32>("private_key", private_hex)?);
                let private_key = SecretKey::from_slice(&bytes[..])
                    .map_err(|e| HdError::InvalidKeyData(format!("Invalid private key: {}", e)))?;
                if PublicKey::from_secret_key(SECP256K1, &private_key) != public_key {
                    return Err(HdError::InvalidKeyData(
                        "public_key does not match private_key".to_string(),
                    ));
                }
                ExtendedKey::Private(ExtendedPrivateKey {
                    depth: parts.depth,
                    parent_fingerprint,
                    child_number,
                    private_key,
                    chain_code,
                })
            }
            None => ExtendedKey::Public(ExtendedPublicKey {
                depth: parts.depth,
                parent_fingerprint,
                child_number,
                public_key,
                chain_code,
            }),
        };

        let fingerprint = Fingerprint(decode_field::<4>("fingerprint", &parts.fingerprint)?);
        if fingerprint != key.fingerprint() {
            return Err(HdError::InvalidKeyData(
                "fingerprint does not match public_key".to_string(),
            ));
        }

        Ok(HdKey::new(key, parts.network))
    }
}

fn decode_field<const N: usize>(field: &str, value: &str) -> Result<[u8; N]> {
    let bytes = Zeroizing::new(hex::decode(value)?);
    if bytes.len() != N {
        return Err(HdError::InvalidLength(format!(
            "{} must be {} bytes, got {}",
            field,
            N,
            bytes.len()
        )));
    }
    let mut out = [0u8; N];
    out.copy_from_slice(&bytes);
    Ok(out)
}

impl fmt::Display for HdKey {
    /// Legacy-format base58 of this key's own kind.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let encoded = self.to_base58(Purpose::Legacy).map_err(|_| fmt::Error)?;
        f.write_str(&encoded)
    }
}

impl FromStr for HdKey {
    type Err = HdError;

    /// Accepts any registered prefix; the purpose is discarded.
    fn from_str(s: &str) -> Result<Self> {
        Self::from_base58(s, None).map(|(key, _)| key)
    }
}

/// Flat field view of an [`HdKey`], hex-encoded for JSON.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize, Zeroize, ZeroizeOnDrop)]
pub struct ExtendedKeyParts {
    #[zeroize(skip)]
    pub network: Network,
    pub depth: u8,
    pub fingerprint: String,
    pub parent_fingerprint: String,
    pub child_index: u32,
    pub chain_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub private_key: Option<String>,
    pub public_key: String,
}

impl fmt::Debug for ExtendedKeyParts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExtendedKeyParts")
            .field("network", &self.network)
            .field("depth", &self.depth)
            .field("fingerprint", &self.fingerprint)
            .field("parent_fingerprint", &self.parent_fingerprint)
            .field("child_index", &self.child_index)
            .field("chain_code", &self.chain_code)
            .field("private_key", &self.private_key.as_ref().map(|_| "<redacted>"))
            .field("public_key", &self.public_key)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const V1_SEED: &str = "000102030405060708090a0b0c0d0e0f";

    fn master() -> HdKey {
        HdKey::from_seed(&hex::decode(V1_SEED).unwrap(), Network::Mainnet).unwrap()
    }

    #[test]
    fn test_from_seed_and_display() {
        let key = master();
        assert!(key.is_private());
        assert_eq!(key.depth(), 0);
        assert_eq!(
            key.to_string(),
            "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi"
        );
        assert_eq!(
            key.to_public().to_string(),
            "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8"
        );
    }

    #[test]
    fn test_derive_raw_index() {
        let key = master();
        let hardened = key.derive(0x8000_0000).unwrap();
        assert_eq!(hardened, key.derive_path("m/0'").unwrap());
        assert_eq!(hardened, key.derive_child(ChildNumber::hardened(0).unwrap()).unwrap());
        assert_ne!(hardened.chain_code(), key.derive(0).unwrap().chain_code());
        assert_eq!(hardened.network(), Network::Mainnet);
    }

    #[test]
    fn test_public_key_rejects_hardened() {
        let public = master().to_public();
        assert!(matches!(public.derive(0x8000_0000), Err(HdError::InvalidDerivation(_))));
        assert!(public.derive(1).is_ok());
    }

    #[test]
    fn test_from_str_roundtrip() {
        let key = master().derive_path("m/1/2'").unwrap();
        let parsed: HdKey = key.to_string().parse().unwrap();
        assert_eq!(parsed, key);
    }

    #[test]
    fn test_from_base58_reports_purpose() {
        let key = master();
        let zprv = key.to_base58(Purpose::NativeSegwit).unwrap();
        assert!(zprv.starts_with("zprv"));
        let (decoded, purpose) = HdKey::from_base58(&zprv, Some(Network::Mainnet)).unwrap();
        assert_eq!(purpose, Purpose::NativeSegwit);
        assert_eq!(decoded, key);

        let zpub = key.to_base58_public(Purpose::NativeSegwit).unwrap();
        assert!(zpub.starts_with("zpub"));
    }

    #[test]
    fn test_parts_roundtrip() {
        let key = master().derive_path("m/44'/0'/0'").unwrap();
        let parts = key.to_parts();
        assert_eq!(parts.depth, 3);
        assert_eq!(parts.child_index, 0x8000_0000);
        assert_eq!(parts.fingerprint, key.fingerprint().to_string());
        assert!(parts.private_key.is_some());
        assert_eq!(HdKey::from_parts(&parts).unwrap(), key);

        let public_parts = key.to_public().to_parts();
        assert!(public_parts.private_key.is_none());
        assert_eq!(HdKey::from_parts(&public_parts).unwrap(), key.to_public());
    }

    #[test]
    fn test_parts_json() {
        let parts = master().to_public().to_parts();
        let json = serde_json::to_value(&parts).unwrap();
        assert_eq!(json["network"], "mainnet");
        assert_eq!(json["fingerprint"], "3442193e");
        assert_eq!(json["parent_fingerprint"], "00000000");
        assert!(json.get("private_key").is_none());

        let back: ExtendedKeyParts = serde_json::from_value(json).unwrap();
        assert_eq!(back, parts);
    }

    #[test]
    fn test_parts_validation() {
        let key = master();
        let other = key.derive(5).unwrap();

        let mut mismatched = key.to_parts();
        mismatched.public_key = hex::encode(other.public_key().serialize());
        assert!(matches!(HdKey::from_parts(&mismatched), Err(HdError::InvalidKeyData(_))));

        let mut bad_master = key.to_parts();
        bad_master.child_index = 1;
        assert!(matches!(HdKey::from_parts(&bad_master), Err(HdError::InvalidMaster(_))));

        let mut short_chain = key.to_parts();
        short_chain.chain_code.truncate(62);
        assert!(matches!(HdKey::from_parts(&short_chain), Err(HdError::InvalidLength(_))));

        let mut not_hex = key.to_parts();
        not_hex.chain_code = "zz".repeat(32);
        assert!(matches!(HdKey::from_parts(&not_hex), Err(HdError::Hex(_))));

        let mut wrong_fingerprint = key.to_parts();
        wrong_fingerprint.fingerprint = "00000000".to_string();
        assert!(matches!(HdKey::from_parts(&wrong_fingerprint), Err(HdError::InvalidKeyData(_))));
    }

    #[test]
    fn test_parts_debug_redacts_private_key() {
        let parts = master().to_parts();
        let secret = parts.private_key.clone().unwrap();
        let debug = format!("{:?}", parts);
        assert!(!debug.contains(&secret));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_from_mnemonic() {
        let mnemonic = Mnemonic::from_phrase(
            "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about",
        )
        .unwrap();
        let key = HdKey::from_mnemonic(&mnemonic, "", Network::Mainnet).unwrap();
        assert_eq!(
            key.to_string(),
            "xprv9s21ZrQH143K3GJpoapnV8SFfukcVBSfeCficPSGfubmSFDxo1kuHnLisriDvSnRRuL2Qrg5ggqHKNVpxR86QEC8w35uxmGoggxtQTPvfUu"
        );
    }
}
