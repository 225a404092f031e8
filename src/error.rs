use thiserror::Error;

#[derive(Error, Debug)]
pub enum HdError {
    /// A derivation step the node cannot perform, e.g. a hardened child of a public-only key.
    #[error("Invalid derivation: {0}")]
    InvalidDerivation(String),

    /// The candidate child index produced an out-of-range scalar or the point at infinity.
    /// The caller decides whether to move on to the next index.
    #[error("Invalid child key at index {0:#010x}")]
    InvalidChildKey(u32),

    #[error("Checksum mismatch")]
    ChecksumMismatch,

    #[error("Invalid length: {0}")]
    InvalidLength(String),

    /// Carries the key kind, "xprivkey" or "xpubkey".
    #[error("Network mismatch for {0}.")]
    NetworkMismatch(&'static str),

    #[error("Invalid master key: {0}")]
    InvalidMaster(String),

    #[error("Invalid key data: {0}")]
    InvalidKeyData(String),

    #[error("Invalid word: {0}")]
    InvalidWord(String),

    #[error("Invalid mnemonic checksum")]
    InvalidChecksum,

    #[error("Invalid seed: {0}")]
    InvalidSeed(String),

    #[error("Invalid path: {0}")]
    InvalidPath(String),

    #[error("Entropy source failure: {0}")]
    EntropySourceFailure(String),

    #[error("Invalid base58 character: {0:?}")]
    InvalidBase58Character(char),

    #[error("Purpose {purpose} is not registered for network {network}")]
    UnsupportedPurpose { network: String, purpose: String },

    #[error("Private key required for this operation")]
    PrivateKeyRequired,

    #[error("Cryptographic primitive failure: {0}")]
    Crypto(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("JSON serialization/deserialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Hex decoding error: {0}")]
    Hex(#[from] hex::FromHexError),
}

impl HdError {
    /// True for failures caused by malformed untrusted input rather than by the caller's
    /// use of the API or the environment.
    pub fn is_input_error(&self) -> bool {
        matches!(
            self,
            HdError::ChecksumMismatch
                | HdError::InvalidLength(_)
                | HdError::NetworkMismatch(_)
                | HdError::InvalidMaster(_)
                | HdError::InvalidKeyData(_)
                | HdError::InvalidWord(_)
                | HdError::InvalidChecksum
                | HdError::InvalidPath(_)
                | HdError::InvalidBase58Character(_)
                | HdError::Hex(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, HdError>;
