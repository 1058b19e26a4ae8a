//! Match-finder engines and the capability set they share.
//!
//! Three engines implement [`MatchFinder`], selected by quality level:
//!
//! - [`QuicklyHasher`] — a plain hash map with a small bucket sweep
//!   (qualities 0–3).
//! - [`ForgetfulChain`] — banked hash chains with FIFO slot replacement
//!   (qualities 4–9).
//! - [`LongestMatchHasher`] — a per-bucket ring of recent positions walked
//!   newest-first (qualities 10–11).
//!
//! All engines index 4- or 8-byte prefixes of the window, verify every
//! candidate with [`match_length`](crate::matchlen::match_length) (no false
//! positives), and fall back to the static dictionary when the window yields
//! nothing. [`Hasher`] dispatches among them from a [`HasherConfig`].

pub mod forgetful_chain;
pub mod longest_match;
pub mod quickly;

pub use forgetful_chain::ForgetfulChain;
pub use longest_match::LongestMatchHasher;
pub use quickly::QuicklyHasher;

use crate::dict::DictionaryIndex;
use crate::params::HasherConfig;

/// Multiplier for the 4-byte multiplicative hash. The high bits of the
/// product carry the most mixture, so keys are taken from there.
pub const HASH_MUL32: u32 = 0x1E35_A7BD;

/// 4-byte key: `(load32_le * HASH_MUL32) >> (32 - bucket_bits)`.
#[inline(always)]
pub(crate) fn hash_bytes32(data: &[u8], bucket_bits: u32) -> usize {
    (crate::matchlen::load32_le(data).wrapping_mul(HASH_MUL32) >> (32 - bucket_bits)) as usize
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Errors surfaced while building an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineError {
    /// The table allocation failed; the stream cannot proceed.
    Allocation,
}

impl core::fmt::Display for EngineError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Allocation => write!(f, "hash table allocation failed"),
        }
    }
}

impl std::error::Error for EngineError {}

/// Fallibly allocate a zero-initialised boxed slice.
pub(crate) fn try_alloc_slice<T: Clone + Default>(len: usize) -> Result<Box<[T]>, EngineError> {
    let mut v: Vec<T> = Vec::new();
    v.try_reserve_exact(len).map_err(|_| EngineError::Allocation)?;
    v.resize(len, T::default());
    Ok(v.into_boxed_slice())
}

// ─────────────────────────────────────────────────────────────────────────────
// Search result
// ─────────────────────────────────────────────────────────────────────────────

/// In/out value for [`MatchFinder::find_longest_match`].
///
/// On entry, `len` is a lower bound used for cheap candidate rejection and
/// `score` is the threshold a candidate must beat. On return (when the call
/// reports a match) all fields describe the best candidate found.
#[derive(Clone, Copy, Debug)]
pub struct SearchResult {
    /// Match length in bytes.
    pub len: usize,
    /// Coded length: the dictionary word length for cutoff matches,
    /// otherwise equal to `len`.
    pub len_code: usize,
    /// Backward distance; beyond `max_backward` it addresses the dictionary.
    pub distance: usize,
    /// Score of the candidate (see [`crate::score`]).
    pub score: f64,
}

impl SearchResult {
    /// Seed a search with a length lower bound and score threshold.
    #[inline]
    pub fn with_floor(min_len: usize, min_score: f64) -> Self {
        Self { len: min_len, len_code: 0, distance: 0, score: min_score }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Capability set
// ─────────────────────────────────────────────────────────────────────────────

/// The operations the backward-reference generator needs from an engine.
///
/// Positions are absolute; all window reads go through `position & mask`,
/// additionally bounded by the data slice. Callers that wrap a ring buffer
/// must provide the customary duplicated tail so matches can run across the
/// seam.
pub trait MatchFinder {
    /// Bytes hashed per key.
    fn hash_type_length(&self) -> usize;

    /// How far past a position `store` reads (equals the key width).
    fn store_lookahead(&self) -> usize;

    /// Clear the structure for a new stream. Called once, by the stream
    /// owner, before the first block. When `position == 0`, `is_last` is
    /// set, and `bytes` is small, engines may seed only the buckets the
    /// input will touch instead of wiping the whole table.
    fn prepare(&mut self, position: usize, bytes: usize, is_last: bool, data: &[u8]);

    /// Index the key at `ix`, making it discoverable by later searches.
    fn store(&mut self, data: &[u8], mask: usize, ix: usize);

    /// [`store`](Self::store) every position in `[ix_start, ix_end)`.
    fn store_range(&mut self, data: &[u8], mask: usize, ix_start: usize, ix_end: usize) {
        for ix in ix_start..ix_end {
            self.store(data, mask, ix);
        }
    }

    /// Store the last three positions of the previous block, whose keys
    /// straddled the block boundary and could not be hashed earlier.
    fn stitch_to_previous_block(
        &mut self,
        num_bytes: usize,
        position: usize,
        data: &[u8],
        mask: usize,
    ) {
        if num_bytes >= self.hash_type_length() - 1 && position >= 3 {
            self.store(data, mask, position - 3);
            self.store(data, mask, position - 2);
            self.store(data, mask, position - 1);
        }
    }

    /// Search for the best match of `data[cur_ix..]` no longer than
    /// `max_length` and no farther back than `max_backward`, consulting the
    /// distance cache, the engine's own structure, and (when provided and
    /// nothing better was found) the static dictionary. Stores `cur_ix` as a
    /// side effect. Returns `true` and fills `out` when a candidate beat the
    /// incoming `out.score`.
    ///
    /// `max_backward` must not exceed `cur_ix` (the generator passes
    /// `min(position, window_limit)`); otherwise a chain could reach
    /// positions before the start of the stream.
    #[allow(clippy::too_many_arguments)]
    fn find_longest_match(
        &mut self,
        dictionary: Option<&DictionaryIndex>,
        data: &[u8],
        mask: usize,
        distance_cache: &[i32; 4],
        cur_ix: usize,
        max_length: usize,
        max_backward: usize,
        out: &mut SearchResult,
    ) -> bool;
}

// ─────────────────────────────────────────────────────────────────────────────
// Dispatch
// ─────────────────────────────────────────────────────────────────────────────

/// An engine chosen at run time from a [`HasherConfig`].
pub enum Hasher {
    Quickly(QuicklyHasher),
    ForgetfulChain(ForgetfulChain),
    LongestMatch(LongestMatchHasher),
}

impl Hasher {
    /// Allocate the engine described by `config`.
    pub fn new(config: &HasherConfig) -> Result<Self, EngineError> {
        Ok(match *config {
            HasherConfig::Quickly { bucket_bits, sweep, use_dictionary } => {
                Hasher::Quickly(QuicklyHasher::new(bucket_bits, sweep, use_dictionary)?)
            }
            HasherConfig::ForgetfulChain {
                bucket_bits,
                bank_bits,
                num_banks,
                num_last_distances_to_check,
                max_hops,
            } => Hasher::ForgetfulChain(ForgetfulChain::new(
                bucket_bits,
                bank_bits,
                num_banks,
                num_last_distances_to_check,
                max_hops,
            )?),
            HasherConfig::LongestMatch { bucket_bits, block_bits, num_last_distances_to_check } => {
                Hasher::LongestMatch(LongestMatchHasher::new(
                    bucket_bits,
                    block_bits,
                    num_last_distances_to_check,
                )?)
            }
        })
    }
}

macro_rules! delegate {
    ($self:ident, $h:ident => $body:expr) => {
        match $self {
            Hasher::Quickly($h) => $body,
            Hasher::ForgetfulChain($h) => $body,
            Hasher::LongestMatch($h) => $body,
        }
    };
}

impl MatchFinder for Hasher {
    fn hash_type_length(&self) -> usize {
        delegate!(self, h => h.hash_type_length())
    }

    fn store_lookahead(&self) -> usize {
        delegate!(self, h => h.store_lookahead())
    }

    fn prepare(&mut self, position: usize, bytes: usize, is_last: bool, data: &[u8]) {
        delegate!(self, h => h.prepare(position, bytes, is_last, data))
    }

    fn store(&mut self, data: &[u8], mask: usize, ix: usize) {
        delegate!(self, h => h.store(data, mask, ix))
    }

    fn store_range(&mut self, data: &[u8], mask: usize, ix_start: usize, ix_end: usize) {
        delegate!(self, h => h.store_range(data, mask, ix_start, ix_end))
    }

    fn stitch_to_previous_block(
        &mut self,
        num_bytes: usize,
        position: usize,
        data: &[u8],
        mask: usize,
    ) {
        delegate!(self, h => h.stitch_to_previous_block(num_bytes, position, data, mask))
    }

    fn find_longest_match(
        &mut self,
        dictionary: Option<&DictionaryIndex>,
        data: &[u8],
        mask: usize,
        distance_cache: &[i32; 4],
        cur_ix: usize,
        max_length: usize,
        max_backward: usize,
        out: &mut SearchResult,
    ) -> bool {
        delegate!(self, h => h.find_longest_match(
            dictionary, data, mask, distance_cache, cur_ix, max_length, max_backward, out))
    }
}
