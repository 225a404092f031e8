//! BIP39 word lists.

/// Number of words in every BIP39 list.
pub const WORDLIST_LEN: usize = 2048;

/// Supported languages for BIP39 mnemonics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum Language {
    #[default]
    English,
}

impl Language {
    /// Get the word list for this language
    pub fn word_list(self) -> &'static [&'static str; WORDLIST_LEN] {
        match self {
            Language::English => ::bip39::Language::English.word_list(),
        }
    }

    /// Index of `word`, which must already be normalized and lowercase.
    pub fn find_word(self, word: &str) -> Option<u16> {
        // The English list is sorted, so a binary search suffices.
        self.word_list()
            .binary_search_by(|probe| (*probe).cmp(word))
            .ok()
            .map(|index| index as u16)
    }

    /// Word at an 11-bit index.
    pub fn word(self, index: u16) -> &'static str {
        self.word_list()[usize::from(index) & (WORDLIST_LEN - 1)]
    }
}
