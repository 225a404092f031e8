//! Network and purpose parameters for extended-key serialization.
//!
//! Every (network, purpose) pair maps to a pair of 4-byte version prefixes,
//! one for private and one for public extended keys. The prefixes decide the
//! leading characters of the base58 text ("xprv", "zpub", "tprv", ...).

use crate::{HdError, Result};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Network a key is serialized for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Testnet,
    Regtest,
    Simnet,
}

impl Network {
    pub const ALL: [Network; 4] = [
        Network::Mainnet,
        Network::Testnet,
        Network::Regtest,
        Network::Simnet,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Network::Mainnet => "mainnet",
            Network::Testnet => "testnet",
            Network::Regtest => "regtest",
            Network::Simnet => "simnet",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Network {
    type Err = HdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" | "livenet" | "bitcoin" => Ok(Network::Mainnet),
            "testnet" | "test" | "testnet3" => Ok(Network::Testnet),
            "regtest" => Ok(Network::Regtest),
            "simnet" => Ok(Network::Simnet),
            other => Err(HdError::Config(format!("Unknown network: {}", other))),
        }
    }
}

/// Serialization-format tag for the script convention the keys are meant for.
/// Does not change derivation.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Purpose {
    /// x-family prefixes (BIP44).
    #[default]
    Legacy,
    /// y-family prefixes, P2WPKH nested in P2SH (BIP49).
    SegwitCompatible,
    /// z-family prefixes, native P2WPKH (BIP84).
    NativeSegwit,
}

impl Purpose {
    pub const ALL: [Purpose; 3] = [
        Purpose::Legacy,
        Purpose::SegwitCompatible,
        Purpose::NativeSegwit,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Purpose::Legacy => "legacy",
            Purpose::SegwitCompatible => "segwit-compatible",
            Purpose::NativeSegwit => "native-segwit",
        }
    }
}

impl fmt::Display for Purpose {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Purpose {
    type Err = HdError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "legacy" | "x" | "bip44" => Ok(Purpose::Legacy),
            "segwit-compatible" | "p2sh-segwit" | "y" | "bip49" => Ok(Purpose::SegwitCompatible),
            "native-segwit" | "segwit" | "z" | "bip84" => Ok(Purpose::NativeSegwit),
            other => Err(HdError::Config(format!("Unknown purpose: {}", other))),
        }
    }
}

/// Whether an extended key carries private or only public material.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeyKind {
    Private,
    Public,
}

impl KeyKind {
    /// Name used in error messages.
    pub fn field_name(&self) -> &'static str {
        match self {
            KeyKind::Private => "xprivkey",
            KeyKind::Public => "xpubkey",
        }
    }
}

/// Version prefixes for one (network, purpose) pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkParams {
    pub network: Network,
    pub purpose: Purpose,
    pub private_version: [u8; 4],
    pub public_version: [u8; 4],
    /// Leading characters of serialized private keys, for reference only.
    pub private_prefix: &'static str,
    /// Leading characters of serialized public keys, for reference only.
    pub public_prefix: &'static str,
}

impl NetworkParams {
    pub fn version(&self, kind: KeyKind) -> [u8; 4] {
        match kind {
            KeyKind::Private => self.private_version,
            KeyKind::Public => self.public_version,
        }
    }

    /// Which key kind `version` designates under these parameters, if any.
    pub fn kind_of(&self, version: [u8; 4]) -> Option<KeyKind> {
        if version == self.private_version {
            Some(KeyKind::Private)
        } else if version == self.public_version {
            Some(KeyKind::Public)
        } else {
            None
        }
    }
}

/// A resolved version prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VersionMatch {
    pub network: Network,
    pub purpose: Purpose,
    pub kind: KeyKind,
}

const fn params(
    network: Network,
    purpose: Purpose,
    private_version: u32,
    public_version: u32,
    private_prefix: &'static str,
    public_prefix: &'static str,
) -> NetworkParams {
    NetworkParams {
        network,
        purpose,
        private_version: private_version.to_be_bytes(),
        public_version: public_version.to_be_bytes(),
        private_prefix,
        public_prefix,
    }
}

// Every version is unique across the table, so a prefix names exactly one
// (network, purpose, kind).
const STANDARD_PARAMS: [NetworkParams; 10] = [
    params(Network::Mainnet, Purpose::Legacy, 0x0488_ADE4, 0x0488_B21E, "xprv", "xpub"),
    params(Network::Mainnet, Purpose::SegwitCompatible, 0x049D_7878, 0x049D_7CB2, "yprv", "ypub"),
    params(Network::Mainnet, Purpose::NativeSegwit, 0x04B2_430C, 0x04B2_4746, "zprv", "zpub"),
    params(Network::Testnet, Purpose::Legacy, 0x0435_8394, 0x0435_87CF, "tprv", "tpub"),
    params(Network::Testnet, Purpose::SegwitCompatible, 0x044A_4E28, 0x044A_5262, "uprv", "upub"),
    params(Network::Testnet, Purpose::NativeSegwit, 0x045F_18BC, 0x045F_1CF6, "vprv", "vpub"),
    params(Network::Regtest, Purpose::Legacy, 0xEAB4_04C7, 0xEAB4_FA05, "rprv", "rpub"),
    params(Network::Regtest, Purpose::SegwitCompatible, 0x03F7_23D8, 0x03F7_2812, "qprv", "qpub"),
    params(Network::Regtest, Purpose::NativeSegwit, 0x03E2_5944, 0x03E2_5D7E, "pprv", "ppub"),
    params(Network::Simnet, Purpose::Legacy, 0x0420_B900, 0x0420_BD3A, "sprv", "spub"),
];

static STANDARD: Lazy<NetworkRegistry> = Lazy::new(NetworkRegistry::standard);

/// Immutable table of version prefixes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkRegistry {
    entries: Vec<NetworkParams>,
}

impl NetworkRegistry {
    /// Build the standard Bitcoin table.
    pub fn standard() -> Self {
        Self::from_entries(STANDARD_PARAMS.to_vec())
    }

    /// Build a registry from explicit entries. Later duplicates of a
    /// (network, purpose) pair are ignored.
    pub fn from_entries(entries: Vec<NetworkParams>) -> Self {
        let mut deduped: Vec<NetworkParams> = Vec::with_capacity(entries.len());
        for entry in entries {
            if deduped
                .iter()
                .any(|e| e.network == entry.network && e.purpose == entry.purpose)
            {
                log::debug!(
                    "ignoring duplicate registry entry for {}/{}",
                    entry.network,
                    entry.purpose
                );
                continue;
            }
            deduped.push(entry);
        }
        NetworkRegistry { entries: deduped }
    }

    /// The process-wide standard registry, built on first use.
    pub fn global() -> &'static NetworkRegistry {
        &STANDARD
    }

    pub fn entries(&self) -> &[NetworkParams] {
        &self.entries
    }

    pub fn get(&self, network: Network, purpose: Purpose) -> Option<&NetworkParams> {
        self.entries
            .iter()
            .find(|e| e.network == network && e.purpose == purpose)
    }

    /// Version prefix for (network, purpose, kind).
    pub fn version(&self, network: Network, purpose: Purpose, kind: KeyKind) -> Result<[u8; 4]> {
        self.get(network, purpose)
            .map(|p| p.version(kind))
            .ok_or_else(|| HdError::UnsupportedPurpose {
                network: network.to_string(),
                purpose: purpose.to_string(),
            })
    }

    /// Resolve a version prefix, optionally restricted to one network.
    pub fn lookup(&self, version: [u8; 4], network: Option<Network>) -> Option<VersionMatch> {
        self.entries
            .iter()
            .filter(|e| network.map_or(true, |n| e.network == n))
            .find_map(|e| {
                e.kind_of(version).map(|kind| VersionMatch {
                    network: e.network,
                    purpose: e.purpose,
                    kind,
                })
            })
    }

    pub fn purposes(&self, network: Network) -> impl Iterator<Item = Purpose> + '_ {
        self.entries
            .iter()
            .filter(move |e| e.network == network)
            .map(|e| e.purpose)
    }
}

impl Default for NetworkRegistry {
    fn default() -> Self {
        Self::standard()
    }
}
