//! Extended-key serialization.
//!
//! The wire form is base58check over a fixed 78-byte payload:
//!
//! ```text
//! version(4) || depth(1) || parent_fingerprint(4) || child_number(4) || chain_code(32) || key(33)
//! ```
//!
//! A private key field is `0x00 || scalar`, a public key field is the
//! compressed point.

use crate::primitives::base58;
use crate::primitives::bip32::{
    ChainCode, ChildNumber, ExtendedKey, ExtendedPrivateKey, ExtendedPublicKey, Fingerprint,
};
use crate::primitives::network::{KeyKind, Network, NetworkRegistry, Purpose};
use crate::{HdError, Result};
use secp256k1::{PublicKey, SecretKey};
use zeroize::Zeroizing;

/// Length of the serialized payload, excluding the checksum.
pub const PAYLOAD_LEN: usize = 78;

const KEY_OFFSET: usize = 45;

/// Result of decoding an extended-key string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedKey {
    pub key: ExtendedKey,
    pub network: Network,
    pub purpose: Purpose,
}

impl DecodedKey {
    pub fn kind(&self) -> KeyKind {
        if self.key.is_private() {
            KeyKind::Private
        } else {
            KeyKind::Public
        }
    }
}

/// Encoder/decoder bound to a version-prefix table.
#[derive(Debug, Clone, Copy)]
pub struct ExtendedKeyCodec<'a> {
    registry: &'a NetworkRegistry,
}

impl<'a> ExtendedKeyCodec<'a> {
    pub fn new(registry: &'a NetworkRegistry) -> Self {
        ExtendedKeyCodec { registry }
    }

    pub fn registry(&self) -> &'a NetworkRegistry {
        self.registry
    }

    /// Serialize `key` for `network` and `purpose`.
    ///
    /// `kind` selects which half is exported. A private export of a
    /// public-only node fails with [`HdError::PrivateKeyRequired`].
    pub fn encode(
        &self,
        key: &ExtendedKey,
        network: Network,
        purpose: Purpose,
        kind: KeyKind,
    ) -> Result<String> {
        let version = self.registry.version(network, purpose, kind)?;

        let mut payload = Zeroizing::new(Vec::with_capacity(PAYLOAD_LEN));
        payload.extend_from_slice(&version);
        payload.push(key.depth());
        payload.extend_from_slice(key.parent_fingerprint().as_bytes());
        payload.extend_from_slice(&key.child_number().raw().to_be_bytes());
        payload.extend_from_slice(key.chain_code().as_bytes());

        match kind {
            KeyKind::Private => {
                let private_key = key.private_key().ok_or(HdError::PrivateKeyRequired)?;
                let secret = Zeroizing::new(private_key.secret_bytes());
                payload.push(0x00);
                payload.extend_from_slice(&secret[..]);
            }
            KeyKind::Public => {
                payload.extend_from_slice(&key.public_key().serialize());
            }
        }

        Ok(base58::encode_check(&payload))
    }

    /// Parse and validate an extended-key string.
    ///
    /// With `expected_network` set, only versions registered for that network
    /// are accepted. Without it the first registry entry carrying the version
    /// wins, so testnet prefixes resolve to [`Network::Testnet`].
    pub fn decode(&self, s: &str, expected_network: Option<Network>) -> Result<DecodedKey> {
        let data = Zeroizing::new(base58::decode_check(s)?);
        if data.len() != PAYLOAD_LEN {
            return Err(HdError::InvalidLength(format!(
                "Extended key payload must be {} bytes, got {}",
                PAYLOAD_LEN,
                data.len()
            )));
        }

        let mut version = [0u8; 4];
        version.copy_from_slice(&data[0..4]);
        let key_field = &data[KEY_OFFSET..PAYLOAD_LEN];

        let matched = match self.registry.lookup(version, expected_network) {
            Some(matched) => matched,
            None => {
                let kind = match self.registry.lookup(version, None) {
                    Some(other) => other.kind,
                    None if key_field[0] == 0x00 => KeyKind::Private,
                    None => KeyKind::Public,
                };
                log::debug!(
                    "version {} not registered for {:?}",
                    hex::encode(version),
                    expected_network
                );
                return Err(HdError::NetworkMismatch(kind.field_name()));
            }
        };

        match (matched.kind, key_field[0]) {
            (KeyKind::Private, 0x00) | (KeyKind::Public, 0x02) | (KeyKind::Public, 0x03) => {}
            (kind, prefix) => {
                return Err(HdError::InvalidKeyData(format!(
                    "Key field prefix {:#04x} does not match {} version",
                    prefix,
                    kind.field_name()
                )))
            }
        }

        let depth = data[4];
        let mut fingerprint = [0u8; 4];
        fingerprint.copy_from_slice(&data[5..9]);
        let parent_fingerprint = Fingerprint(fingerprint);
        let mut child_bytes = [0u8; 4];
        child_bytes.copy_from_slice(&data[9..13]);
        let child_number = ChildNumber::from_raw(u32::from_be_bytes(child_bytes));

        if depth == 0 && (!parent_fingerprint.is_zero() || child_number.raw() != 0) {
            return Err(HdError::InvalidMaster(
                "Zero depth with non-zero parent fingerprint or child number".to_string(),
            ));
        }

        let mut chain_code = [0u8; 32];
        chain_code.copy_from_slice(&data[13..KEY_OFFSET]);
        let chain_code = ChainCode(chain_code);

        let key = match matched.kind {
            KeyKind::Private => {
                let private_key = SecretKey::from_slice(&key_field[1..]).map_err(|e| {
                    HdError::InvalidKeyData(format!("Invalid private key: {}", e))
                })?;
                ExtendedKey::Private(ExtendedPrivateKey {
                    depth,
                    parent_fingerprint,
                    child_number,
                    private_key,
                    chain_code,
                })
            }
            KeyKind::Public => {
                let public_key = PublicKey::from_slice(key_field).map_err(|e| {
                    HdError::InvalidKeyData(format!("Invalid public key: {}", e))
                })?;
                ExtendedKey::Public(ExtendedPublicKey {
                    depth,
                    parent_fingerprint,
                    child_number,
                    public_key,
                    chain_code,
                })
            }
        };

        log::trace!(
            "decoded {} key for {}/{} at depth {}",
            matched.kind.field_name(),
            matched.network,
            matched.purpose,
            depth
        );

        Ok(DecodedKey {
            key,
            network: matched.network,
            purpose: matched.purpose,
        })
    }

    /// Run every decode check without keeping the key.
    pub fn validate(&self, s: &str, expected_network: Option<Network>) -> Result<()> {
        self.decode(s, expected_network).map(|_| ())
    }

    pub fn is_valid(&self, s: &str, expected_network: Option<Network>) -> bool {
        self.validate(s, expected_network).is_ok()
    }
}

impl Default for ExtendedKeyCodec<'static> {
    fn default() -> Self {
        ExtendedKeyCodec::new(NetworkRegistry::global())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::primitives::hash;

    const V1_XPRV: &str = "xprv9s21ZrQH143K3QTDL4LXw2F7HEK3wJUD2nW2nRk4stbPy6cq3jPPqjiChkVvvNKmPGJxWUtg6LnF5kejMRNNU3TGtRBeJgk33yuGBxrMPHi";
    const V1_XPUB: &str = "xpub661MyMwAqRbcFtXgS5sYJABqqG9YLmC4Q1Rdap9gSE8NqtwybGhePY2gZ29ESFjqJoCu1Rupje8YtGqsefD265TMg7usUDFdp6W1EGMcet8";

    fn master() -> ExtendedKey {
        let seed = hex::decode("000102030405060708090a0b0c0d0e0f").unwrap();
        ExtendedKey::Private(ExtendedPrivateKey::new_master(&seed).unwrap())
    }

    /// Re-wrap a payload with a valid checksum.
    fn rewrap(s: &str, edit: impl FnOnce(&mut Vec<u8>)) -> String {
        let mut payload = base58::decode_check(s).unwrap();
        edit(&mut payload);
        base58::encode_check(&payload)
    }

    #[test]
    fn test_encode_vector1_master() {
        let codec = ExtendedKeyCodec::default();
        let key = master();
        assert_eq!(
            codec.encode(&key, Network::Mainnet, Purpose::Legacy, KeyKind::Private).unwrap(),
            V1_XPRV
        );
        assert_eq!(
            codec.encode(&key, Network::Mainnet, Purpose::Legacy, KeyKind::Public).unwrap(),
            V1_XPUB
        );
    }

    #[test]
    fn test_decode_vector1_master() {
        let codec = ExtendedKeyCodec::default();
        let decoded = codec.decode(V1_XPRV, Some(Network::Mainnet)).unwrap();
        assert_eq!(decoded.key, master());
        assert_eq!(decoded.network, Network::Mainnet);
        assert_eq!(decoded.purpose, Purpose::Legacy);
        assert_eq!(decoded.kind(), KeyKind::Private);

        let decoded = codec.decode(V1_XPUB, None).unwrap();
        assert_eq!(decoded.key, master().to_public());
        assert_eq!(decoded.kind(), KeyKind::Public);
    }

    #[test]
    fn test_roundtrip_every_registered_prefix() {
        let codec = ExtendedKeyCodec::default();
        let key = master()
            .derive_child(ChildNumber::hardened(3).unwrap())
            .unwrap();
        for params in codec.registry().entries() {
            for kind in [KeyKind::Private, KeyKind::Public] {
                let encoded = codec.encode(&key, params.network, params.purpose, kind).unwrap();
                let expected_prefix = match kind {
                    KeyKind::Private => params.private_prefix,
                    KeyKind::Public => params.public_prefix,
                };
                assert!(encoded.starts_with(expected_prefix), "{} vs {}", encoded, expected_prefix);

                let decoded = codec.decode(&encoded, Some(params.network)).unwrap();
                assert_eq!(decoded.network, params.network);
                assert_eq!(decoded.purpose, params.purpose);
                assert_eq!(decoded.kind(), kind);
                assert_eq!(decoded.key.depth(), 1);
                assert_eq!(decoded.key.chain_code(), key.chain_code());
                assert_eq!(decoded.key.child_number(), key.child_number());
                assert_eq!(decoded.key.parent_fingerprint(), key.parent_fingerprint());
                assert_eq!(decoded.key.public_key(), key.public_key());
            }
        }
    }

    #[test]
    fn test_private_export_requires_private_node() {
        let codec = ExtendedKeyCodec::default();
        let public = master().to_public();
        assert!(matches!(
            codec.encode(&public, Network::Mainnet, Purpose::Legacy, KeyKind::Private),
            Err(HdError::PrivateKeyRequired)
        ));
    }

    #[test]
    fn test_unsupported_purpose() {
        let codec = ExtendedKeyCodec::default();
        assert!(matches!(
            codec.encode(&master(), Network::Simnet, Purpose::NativeSegwit, KeyKind::Public),
            Err(HdError::UnsupportedPurpose { .. })
        ));
    }

    #[test]
    fn test_network_mismatch_names_key_kind() {
        let codec = ExtendedKeyCodec::default();
        let tprv = codec
            .encode(&master(), Network::Testnet, Purpose::Legacy, KeyKind::Private)
            .unwrap();
        let tpub = codec
            .encode(&master(), Network::Testnet, Purpose::Legacy, KeyKind::Public)
            .unwrap();

        let err = codec.decode(&tprv, Some(Network::Mainnet)).unwrap_err();
        assert!(matches!(err, HdError::NetworkMismatch("xprivkey")));
        assert_eq!(err.to_string(), "Network mismatch for xprivkey.");

        let err = codec.decode(&tpub, Some(Network::Mainnet)).unwrap_err();
        assert_eq!(err.to_string(), "Network mismatch for xpubkey.");

        assert_eq!(codec.decode(&tprv, Some(Network::Testnet)).unwrap().network, Network::Testnet);
        assert_eq!(codec.decode(&tprv, None).unwrap().network, Network::Testnet);
        assert!(matches!(
            codec.decode(&tprv, Some(Network::Regtest)),
            Err(HdError::NetworkMismatch("xprivkey"))
        ));
    }

    #[test]
    fn test_regtest_has_own_prefixes() {
        let codec = ExtendedKeyCodec::default();
        let rprv = codec
            .encode(&master(), Network::Regtest, Purpose::Legacy, KeyKind::Private)
            .unwrap();
        let rpub = codec
            .encode(&master(), Network::Regtest, Purpose::Legacy, KeyKind::Public)
            .unwrap();
        assert!(rprv.starts_with("rprv"));
        assert!(rpub.starts_with("rpub"));

        let decoded = codec.decode(&rprv, None).unwrap();
        assert_eq!(decoded.network, Network::Regtest);
        assert_eq!(decoded.kind(), KeyKind::Private);
        assert_eq!(codec.decode(&rpub, None).unwrap().network, Network::Regtest);

        assert!(matches!(
            codec.decode(&rpub, Some(Network::Testnet)),
            Err(HdError::NetworkMismatch("xpubkey"))
        ));
    }

    #[test]
    fn test_unknown_version_kind_from_key_field() {
        let codec = ExtendedKeyCodec::default();
        let unknown_private = rewrap(V1_XPRV, |p| p[0..4].copy_from_slice(&[1, 2, 3, 4]));
        let unknown_public = rewrap(V1_XPUB, |p| p[0..4].copy_from_slice(&[1, 2, 3, 4]));

        assert!(matches!(
            codec.decode(&unknown_private, None),
            Err(HdError::NetworkMismatch("xprivkey"))
        ));
        assert!(matches!(
            codec.decode(&unknown_public, None),
            Err(HdError::NetworkMismatch("xpubkey"))
        ));
    }

    #[test]
    fn test_checksum_tamper() {
        let codec = ExtendedKeyCodec::default();
        let mut chars: Vec<char> = V1_XPUB.chars().collect();
        let last = chars.len() - 1;
        chars[last] = if chars[last] == '9' { '8' } else { '9' };
        let tampered: String = chars.into_iter().collect();
        assert!(matches!(codec.decode(&tampered, None), Err(HdError::ChecksumMismatch)));
    }

    #[test]
    fn test_bad_character() {
        let codec = ExtendedKeyCodec::default();
        let bad = V1_XPUB.replacen('M', "0", 1);
        assert!(matches!(codec.decode(&bad, None), Err(HdError::InvalidBase58Character('0'))));
    }

    #[test]
    fn test_wrong_payload_length() {
        let codec = ExtendedKeyCodec::default();
        let short = rewrap(V1_XPUB, |p| {
            p.pop();
        });
        let long = rewrap(V1_XPUB, |p| p.push(0));
        assert!(matches!(codec.decode(&short, None), Err(HdError::InvalidLength(_))));
        assert!(matches!(codec.decode(&long, None), Err(HdError::InvalidLength(_))));
        assert!(matches!(codec.decode("", None), Err(HdError::InvalidLength(_))));
    }

    #[test]
    fn test_key_field_must_match_version_kind() {
        let codec = ExtendedKeyCodec::default();
        // xpub version over a private key field
        let private_as_public = rewrap(V1_XPRV, |p| {
            p[0..4].copy_from_slice(&[0x04, 0x88, 0xB2, 0x1E]);
        });
        // xprv version over a public key field
        let public_as_private = rewrap(V1_XPUB, |p| {
            p[0..4].copy_from_slice(&[0x04, 0x88, 0xAD, 0xE4]);
        });
        assert!(matches!(codec.decode(&private_as_public, None), Err(HdError::InvalidKeyData(_))));
        assert!(matches!(codec.decode(&public_as_private, None), Err(HdError::InvalidKeyData(_))));
    }

    #[test]
    fn test_invalid_master_metadata() {
        let codec = ExtendedKeyCodec::default();
        let nonzero_fingerprint = rewrap(V1_XPUB, |p| p[5] = 1);
        let nonzero_index = rewrap(V1_XPUB, |p| p[12] = 1);
        assert!(matches!(codec.decode(&nonzero_fingerprint, None), Err(HdError::InvalidMaster(_))));
        assert!(matches!(codec.decode(&nonzero_index, None), Err(HdError::InvalidMaster(_))));
    }

    #[test]
    fn test_out_of_range_key_material() {
        let codec = ExtendedKeyCodec::default();
        let zero_scalar = rewrap(V1_XPRV, |p| {
            for b in &mut p[46..78] {
                *b = 0;
            }
        });
        let order = hex::decode("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141").unwrap();
        let scalar_at_order = rewrap(V1_XPRV, |p| p[46..78].copy_from_slice(&order));
        // no curve point has x = 0
        let off_curve = rewrap(V1_XPUB, |p| {
            for b in &mut p[46..78] {
                *b = 0;
            }
        });

        assert!(matches!(codec.decode(&zero_scalar, None), Err(HdError::InvalidKeyData(_))));
        assert!(matches!(codec.decode(&scalar_at_order, None), Err(HdError::InvalidKeyData(_))));
        assert!(matches!(codec.decode(&off_curve, None), Err(HdError::InvalidKeyData(_))));
    }

    #[test]
    fn test_validate_helpers() {
        let codec = ExtendedKeyCodec::default();
        assert!(codec.validate(V1_XPRV, Some(Network::Mainnet)).is_ok());
        assert!(codec.is_valid(V1_XPUB, None));
        assert!(!codec.is_valid(V1_XPUB, Some(Network::Testnet)));
        assert!(!codec.is_valid("xpub", None));
    }

    #[test]
    fn test_payload_checksum_is_sha256d() {
        let data = base58::decode(V1_XPUB).unwrap();
        assert_eq!(data.len(), PAYLOAD_LEN + 4);
        assert_eq!(&data[PAYLOAD_LEN..], &hash::checksum(&data[..PAYLOAD_LEN])[..]);
    }
}
