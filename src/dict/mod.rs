//! Static-dictionary word tables.
//!
//! The dictionary is a read-only corpus of short words grouped by length,
//! addressed as `(word_length, word_index)`. Copies whose distance lies
//! beyond the sliding window address this corpus instead, with an implicit
//! *omit-last-N* cutoff transform encoded in the distance (see
//! [`CUTOFF_TRANSFORMS`]). The word data itself is supplied by the caller;
//! this crate only indexes and references it.

pub mod hash;

pub use hash::{DictionaryIndex, DictionarySearchStats};

/// Shortest word the dictionary may contain.
pub const MIN_DICTIONARY_WORD_LENGTH: usize = 4;
/// Longest word the dictionary may contain (word lengths are coded in 5
/// bits alongside an 11-bit word index).
pub const MAX_DICTIONARY_WORD_LENGTH: usize = 24;

/// Number of cutoff transforms: a dictionary match may fall short of the
/// full word by up to `CUTOFF_TRANSFORMS_COUNT - 1` bytes.
pub const CUTOFF_TRANSFORMS_COUNT: usize = 10;

/// Transform identifier for each cutoff depth; index 0 is the identity
/// transform, index `k` omits the last `k` bytes of the word.
pub const CUTOFF_TRANSFORMS: [usize; CUTOFF_TRANSFORMS_COUNT] =
    [0, 12, 27, 23, 42, 63, 56, 48, 59, 64];

// size_bits must leave room for the transform id in the distance encoding
// and for the packed (word_idx << 5 | len) index entries.
const MAX_SIZE_BITS: u8 = 11;

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Validation errors for caller-supplied dictionary tables.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DictionaryError {
    /// A word group extends past the end of the word data.
    DataOutOfBounds { word_length: usize },
    /// `size_bits_by_length` exceeds the representable word-index width.
    SizeBitsTooLarge { word_length: usize },
    /// No length bucket contains any words.
    Empty,
}

impl core::fmt::Display for DictionaryError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::DataOutOfBounds { word_length } => {
                write!(f, "words of length {word_length} extend past the dictionary data")
            }
            Self::SizeBitsTooLarge { word_length } => {
                write!(f, "size_bits for length {word_length} exceeds {MAX_SIZE_BITS}")
            }
            Self::Empty => write!(f, "dictionary contains no words"),
        }
    }
}

impl std::error::Error for DictionaryError {}

// ─────────────────────────────────────────────────────────────────────────────
// Dictionary
// ─────────────────────────────────────────────────────────────────────────────

/// A validated, read-only dictionary: concatenated word data plus per-length
/// group offsets and sizes.
///
/// Length bucket `len` holds `2^size_bits_by_length[len]` words of exactly
/// `len` bytes each, stored back to back at `offsets_by_length[len]`;
/// `size_bits_by_length[len] == 0` marks an empty bucket.
#[derive(Debug, Clone)]
pub struct Dictionary {
    data: Box<[u8]>,
    offsets_by_length: [u32; MAX_DICTIONARY_WORD_LENGTH + 1],
    size_bits_by_length: [u8; MAX_DICTIONARY_WORD_LENGTH + 1],
}

impl Dictionary {
    /// Validate and take ownership of raw dictionary tables.
    pub fn new(
        data: Vec<u8>,
        offsets_by_length: [u32; MAX_DICTIONARY_WORD_LENGTH + 1],
        size_bits_by_length: [u8; MAX_DICTIONARY_WORD_LENGTH + 1],
    ) -> Result<Self, DictionaryError> {
        let mut any = false;
        for len in MIN_DICTIONARY_WORD_LENGTH..=MAX_DICTIONARY_WORD_LENGTH {
            let bits = size_bits_by_length[len];
            if bits == 0 {
                continue;
            }
            if bits > MAX_SIZE_BITS {
                return Err(DictionaryError::SizeBitsTooLarge { word_length: len });
            }
            let n = 1usize << bits;
            let end = offsets_by_length[len] as usize + len * n;
            if end > data.len() {
                return Err(DictionaryError::DataOutOfBounds { word_length: len });
            }
            any = true;
        }
        if !any {
            return Err(DictionaryError::Empty);
        }
        Ok(Self {
            data: data.into_boxed_slice(),
            offsets_by_length,
            size_bits_by_length,
        })
    }

    /// Number of words in the bucket for `word_length`.
    #[inline]
    pub fn n_words(&self, word_length: usize) -> usize {
        match self.size_bits_by_length[word_length] {
            0 => 0,
            bits => 1usize << bits,
        }
    }

    /// Word-index width of the bucket for `word_length`.
    #[inline]
    pub fn size_bits(&self, word_length: usize) -> u8 {
        self.size_bits_by_length[word_length]
    }

    /// The bytes of word `word_idx` in the bucket for `word_length`.
    #[inline]
    pub fn word(&self, word_length: usize, word_idx: usize) -> &[u8] {
        debug_assert!(word_idx < self.n_words(word_length));
        let start = self.offsets_by_length[word_length] as usize + word_length * word_idx;
        &self.data[start..start + word_length]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tiny_dict() -> Dictionary {
        // One bucket: two 4-byte words.
        let mut offsets = [0u32; 25];
        let mut size_bits = [0u8; 25];
        offsets[4] = 0;
        size_bits[4] = 1;
        Dictionary::new(b"timezone".to_vec(), offsets, size_bits).unwrap()
    }

    #[test]
    fn word_addressing() {
        let d = tiny_dict();
        assert_eq!(d.n_words(4), 2);
        assert_eq!(d.word(4, 0), b"time");
        assert_eq!(d.word(4, 1), b"zone");
        assert_eq!(d.n_words(5), 0);
    }

    #[test]
    fn rejects_short_data() {
        let mut size_bits = [0u8; 25];
        size_bits[4] = 2; // wants 4 words = 16 bytes
        let err = Dictionary::new(b"short".to_vec(), [0; 25], size_bits).unwrap_err();
        assert_eq!(err, DictionaryError::DataOutOfBounds { word_length: 4 });
    }

    #[test]
    fn rejects_oversized_size_bits() {
        let mut size_bits = [0u8; 25];
        size_bits[4] = 12;
        let err = Dictionary::new(vec![0; 1 << 16], [0; 25], size_bits).unwrap_err();
        assert_eq!(err, DictionaryError::SizeBitsTooLarge { word_length: 4 });
    }

    #[test]
    fn rejects_empty() {
        let err = Dictionary::new(vec![0; 8], [0; 25], [0; 25]).unwrap_err();
        assert_eq!(err, DictionaryError::Empty);
    }
}
