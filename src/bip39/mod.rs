//! BIP39 Mnemonic code for generating deterministic keys.

pub mod wordlist;

pub use self::wordlist::Language;

use crate::utils::crypto::{self, ConstantTime, SecureRng};
use crate::{HdError, Result};
use rand::{CryptoRng, RngCore};
use sha2::{Digest, Sha256, Sha512};
use std::fmt;
use std::str::FromStr;
use unicode_normalization::UnicodeNormalization;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

/// Valid entropy sizes in bits, giving 12, 15, 18, 21 and 24 words.
pub const ENTROPY_BITS: [usize; 5] = [128, 160, 192, 224, 256];

/// Entropy size used by [`Mnemonic::generate_default`].
pub const DEFAULT_ENTROPY_BITS: usize = 256;

/// Valid mnemonic lengths in words.
pub const WORD_COUNTS: [usize; 5] = [12, 15, 18, 21, 24];

/// Number of PBKDF2 iterations for mnemonic-to-seed conversion
const PBKDF2_ITERATIONS: u32 = 2048;

/// Length of the stretched seed in bytes.
pub const SEED_LEN: usize = 64;

const BITS_PER_WORD: usize = 11;

fn check_entropy_bits(entropy_bits: usize) -> Result<()> {
    if ENTROPY_BITS.contains(&entropy_bits) {
        Ok(())
    } else {
        Err(HdError::InvalidLength(format!(
            "Invalid entropy length: {} bits. Must be one of: 128, 160, 192, 224, 256",
            entropy_bits
        )))
    }
}

/// Represents a BIP39 mnemonic phrase
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct Mnemonic {
    words: Vec<String>,
    #[zeroize(skip)]
    language: Language,
}

impl Mnemonic {
    /// Generate a new mnemonic from `entropy_bits` of OS randomness.
    pub fn generate(entropy_bits: usize) -> Result<Self> {
        check_entropy_bits(entropy_bits)?;
        let entropy = SecureRng::new().random_bytes(entropy_bits / 8)?;
        log::debug!("generated {} bits of mnemonic entropy", entropy_bits);

        Self::from_entropy(&entropy)
    }

    /// Generate a 24-word mnemonic.
    pub fn generate_default() -> Result<Self> {
        Self::generate(DEFAULT_ENTROPY_BITS)
    }

    /// Generate a new mnemonic drawing entropy from `rng`.
    pub fn generate_with_rng<R: RngCore + CryptoRng + ?Sized>(
        entropy_bits: usize,
        rng: &mut R,
    ) -> Result<Self> {
        check_entropy_bits(entropy_bits)?;
        let mut entropy = Zeroizing::new(vec![0u8; entropy_bits / 8]);
        crypto::fill_random(rng, &mut entropy)?;

        Self::from_entropy(&entropy)
    }

    /// Create a mnemonic from entropy bytes
    pub fn from_entropy(entropy: &[u8]) -> Result<Self> {
        Self::from_entropy_with_language(entropy, Language::English)
    }

    /// Create a mnemonic from entropy bytes with specified language
    pub fn from_entropy_with_language(entropy: &[u8], language: Language) -> Result<Self> {
        let entropy_bits = entropy.len() * 8;
        if !ENTROPY_BITS.contains(&entropy_bits) {
            return Err(HdError::InvalidLength(format!(
                "Invalid entropy length: {} bytes. Must be one of: 16, 20, 24, 28, 32 bytes",
                entropy.len()
            )));
        }

        // The checksum is the leading ENT/32 bits of the hash, at most one byte.
        let checksum = Sha256::digest(entropy)[0];
        let word_count = (entropy_bits + entropy_bits / 32) / BITS_PER_WORD;

        let mut words = Vec::with_capacity(word_count);
        let mut bit_buffer = 0u32;
        let mut bits_in_buffer = 0usize;

        for &byte in entropy.iter().chain(std::iter::once(&checksum)) {
            bit_buffer = (bit_buffer << 8) | u32::from(byte);
            bits_in_buffer += 8;

            while bits_in_buffer >= BITS_PER_WORD && words.len() < word_count {
                bits_in_buffer -= BITS_PER_WORD;
                let index = (bit_buffer >> bits_in_buffer) & 0x7FF;
                words.push(language.word(index as u16).to_string());
            }
            bit_buffer &= (1 << bits_in_buffer) - 1;
        }
        bit_buffer.zeroize();

        Ok(Mnemonic { words, language })
    }

    /// Parse and validate a phrase.
    ///
    /// The phrase is NFKD-normalized and lowercased, and words may be
    /// separated by any whitespace.
    pub fn from_phrase(phrase: &str) -> Result<Self> {
        Self::from_phrase_with_language(phrase, Language::English)
    }

    /// Parse a mnemonic from a string with specified language
    pub fn from_phrase_with_language(phrase: &str, language: Language) -> Result<Self> {
        let normalized = Zeroizing::new(phrase.nfkd().collect::<String>().to_lowercase());
        let words: Vec<String> = normalized.split_whitespace().map(str::to_string).collect();

        // Validate word count
        if !WORD_COUNTS.contains(&words.len()) {
            return Err(HdError::InvalidLength(format!(
                "Invalid mnemonic length: {} words. Must be 12, 15, 18, 21, or 24 words",
                words.len()
            )));
        }

        let mnemonic = Mnemonic { words, language };
        mnemonic.to_entropy()?;
        Ok(mnemonic)
    }

    /// Check whether `phrase` is a valid mnemonic.
    pub fn is_valid(phrase: &str) -> bool {
        Self::from_phrase(phrase).is_ok()
    }

    /// Recover the entropy bytes, verifying the checksum.
    pub fn to_entropy(&self) -> Result<Zeroizing<Vec<u8>>> {
        let mut indices = Zeroizing::new(Vec::with_capacity(self.words.len()));
        for word in &self.words {
            let index = self
                .language
                .find_word(word)
                .ok_or_else(|| HdError::InvalidWord(word.clone()))?;
            indices.push(index);
        }

        let total_bits = indices.len() * BITS_PER_WORD;
        let checksum_bits = total_bits / 33;
        let entropy_len = (total_bits - checksum_bits) / 8;

        let mut bytes = Zeroizing::new(Vec::with_capacity(total_bits / 8));
        let mut bit_buffer = 0u32;
        let mut bits_in_buffer = 0usize;

        for &index in indices.iter() {
            bit_buffer = (bit_buffer << BITS_PER_WORD) | u32::from(index);
            bits_in_buffer += BITS_PER_WORD;

            while bits_in_buffer >= 8 {
                bits_in_buffer -= 8;
                bytes.push((bit_buffer >> bits_in_buffer) as u8);
            }
            bit_buffer &= (1 << bits_in_buffer) - 1;
        }

        // Checksum bits are whatever follows the entropy: a whole byte for
        // 24 words, otherwise the bits left in the buffer.
        let mut provided = 0u32;
        for &byte in &bytes[entropy_len..] {
            provided = (provided << 8) | u32::from(byte);
        }
        provided = (provided << bits_in_buffer) | bit_buffer;

        let mut entropy = bytes;
        entropy.truncate(entropy_len);

        let expected = u32::from(Sha256::digest(&entropy[..])[0] >> (8 - checksum_bits));
        if !ConstantTime::eq(&provided.to_be_bytes(), &expected.to_be_bytes()) {
            return Err(HdError::InvalidChecksum);
        }

        Ok(entropy)
    }

    /// Stretch the phrase into a 64-byte seed.
    ///
    /// Both phrase and passphrase are NFKD-normalized. An empty passphrase is
    /// the BIP39 default.
    pub fn to_seed(&self, passphrase: &str) -> Seed {
        let phrase = Zeroizing::new(self.words.join(" ").nfkd().collect::<String>());
        let salt = Zeroizing::new(format!("mnemonic{}", passphrase.nfkd().collect::<String>()));

        let mut seed = [0u8; SEED_LEN];
        pbkdf2::pbkdf2_hmac::<Sha512>(
            phrase.as_bytes(),
            salt.as_bytes(),
            PBKDF2_ITERATIONS,
            &mut seed,
        );

        Seed(seed)
    }

    /// Get the words as a slice
    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn word_count(&self) -> usize {
        self.words.len()
    }

    /// Get the language
    pub fn language(&self) -> Language {
        self.language
    }

    /// The space-joined phrase.
    pub fn phrase(&self) -> Zeroizing<String> {
        Zeroizing::new(self.words.join(" "))
    }
}

impl fmt::Display for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, word) in self.words.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            f.write_str(word)?;
        }
        Ok(())
    }
}

impl fmt::Debug for Mnemonic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mnemonic")
            .field("words", &format_args!("<{} words redacted>", self.words.len()))
            .field("language", &self.language)
            .finish()
    }
}

impl FromStr for Mnemonic {
    type Err = HdError;

    fn from_str(s: &str) -> Result<Self> {
        Self::from_phrase(s)
    }
}

/// Represents a BIP39 seed derived from a mnemonic
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct Seed([u8; SEED_LEN]);

impl Seed {
    pub fn from_bytes(bytes: [u8; SEED_LEN]) -> Self {
        Seed(bytes)
    }

    /// Get the seed bytes
    pub fn as_bytes(&self) -> &[u8; SEED_LEN] {
        &self.0
    }

    /// Copy into a buffer that is wiped on drop.
    pub fn to_vec(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.0.to_vec())
    }
}

impl AsRef<[u8]> for Seed {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl PartialEq for Seed {
    fn eq(&self, other: &Self) -> bool {
        ConstantTime::eq_arrays(&self.0, &other.0)
    }
}

impl Eq for Seed {}

impl fmt::Debug for Seed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Seed(<redacted>)")
    }
}
