//! Plain hash-map match finder with a small bucket sweep (qualities 0–3).
//!
//! Hashes 5 of 8 loaded bytes into a single table of recent positions;
//! `sweep` adjacent slots per key spread candidates so consecutive stores do
//! not always evict each other. No chains: at most `sweep` candidates plus
//! the freshest cached distance are examined per position, which makes this
//! the fastest and least thorough of the engines.

use crate::dict::{DictionaryIndex, DictionarySearchStats};
use crate::matchlen::match_length;
use crate::score::{backward_reference_score, backward_reference_score_using_last_distance};

use super::{try_alloc_slice, EngineError, MatchFinder, SearchResult, HASH_MUL32};

/// Quick match finder. See the module docs.
pub struct QuicklyHasher {
    /// `bucket_count + sweep` slots so a sweep never wraps the table edge.
    buckets: Box<[u32]>,
    bucket_bits: u32,
    sweep: usize,
    use_dictionary: bool,
    dict_stats: DictionarySearchStats,
}

impl QuicklyHasher {
    pub fn new(bucket_bits: u32, sweep: usize, use_dictionary: bool) -> Result<Self, EngineError> {
        debug_assert!(matches!(sweep, 1 | 2 | 4));
        debug_assert!(bucket_bits <= 24);
        Ok(Self {
            buckets: try_alloc_slice((1usize << bucket_bits) + sweep)?,
            bucket_bits,
            sweep,
            use_dictionary,
            dict_stats: DictionarySearchStats::new(),
        })
    }

    #[inline(always)]
    fn bucket_count(&self) -> usize {
        1 << self.bucket_bits
    }

    /// Hashing 5 bytes (the low 40 bits of an 8-byte load) works much
    /// better than 4 at the sweep-1 and sweep-2 levels, where the next
    /// store is likely to replace the slot.
    #[inline(always)]
    fn hash(&self, data: &[u8]) -> usize {
        let h = (u64::from_le_bytes(data[..8].try_into().unwrap()) << 24)
            .wrapping_mul(u64::from(HASH_MUL32));
        (h >> (64 - self.bucket_bits)) as usize
    }

    /// Byte used for cheap rejection, or -1 past the end of the window.
    #[inline(always)]
    fn byte_at(data: &[u8], ix: usize) -> i32 {
        data.get(ix).map_or(-1, |b| i32::from(*b))
    }
}

impl MatchFinder for QuicklyHasher {
    fn hash_type_length(&self) -> usize {
        8
    }

    fn store_lookahead(&self) -> usize {
        8
    }

    fn prepare(&mut self, position: usize, bytes: usize, is_last: bool, data: &[u8]) {
        let partial = position == 0 && is_last && bytes <= (self.bucket_count() * 4) >> 7;
        if partial {
            let end = bytes.min(data.len()).saturating_sub(7);
            for i in 0..end {
                let key = self.hash(&data[i..]);
                self.buckets[key..key + self.sweep].fill(0);
            }
        } else {
            self.buckets.fill(0);
        }
        self.dict_stats = DictionarySearchStats::new();
        log::debug!(
            "quickly prepare: {} init, sweep {}",
            if partial { "partial" } else { "full" },
            self.sweep,
        );
    }

    #[inline]
    fn store(&mut self, data: &[u8], mask: usize, ix: usize) {
        let off = ix & mask;
        if off + 8 > data.len() {
            return;
        }
        let key = self.hash(&data[off..]);
        // Wiggle the write position within the sweep range.
        let wiggle = (ix >> 3) % self.sweep;
        self.buckets[key + wiggle] = ix as u32;
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
        let best_len_in = out.len;
        let cur_ix_masked = cur_ix & mask;
        let key = self.hash(&data[cur_ix_masked..]);
        let mut compare_char = Self::byte_at(data, cur_ix_masked + best_len_in);
        let mut best_score = out.score;
        let mut best_len = best_len_in;
        let mut is_match_found = false;

        // Freshest cached distance first.
        let cached_backward = distance_cache[0];
        if cached_backward > 0 && (cached_backward as usize) <= cur_ix {
            let backward = cached_backward as usize;
            let prev_ix = (cur_ix - backward) & mask;
            if compare_char == Self::byte_at(data, prev_ix + best_len) {
                let len = match_length(&data[prev_ix..], &data[cur_ix_masked..], max_length);
                if len >= 4 {
                    best_score = backward_reference_score_using_last_distance(len, 0);
                    best_len = len;
                    out.len = len;
                    out.len_code = len;
                    out.distance = backward;
                    out.score = best_score;
                    compare_char = Self::byte_at(data, cur_ix_masked + best_len);
                    if self.sweep == 1 {
                        self.buckets[key] = cur_ix as u32;
                        return true;
                    }
                    is_match_found = true;
                }
            }
        }

        if self.sweep == 1 {
            // Only one candidate slot; no loop needed.
            let prev = self.buckets[key] as usize;
            self.buckets[key] = cur_ix as u32;
            let backward = cur_ix.wrapping_sub(prev);
            let prev_ix = prev & mask;
            if compare_char != Self::byte_at(data, prev_ix + best_len_in) {
                return false;
            }
            if backward == 0 || backward > max_backward {
                return false;
            }
            let len = match_length(&data[prev_ix..], &data[cur_ix_masked..], max_length);
            if len >= 4 {
                out.len = len;
                out.len_code = len;
                out.distance = backward;
                out.score = backward_reference_score(len, backward);
                return true;
            }
        } else {
            for i in 0..self.sweep {
                let prev = self.buckets[key + i] as usize;
                let backward = cur_ix.wrapping_sub(prev);
                let prev_ix = prev & mask;
                if compare_char != Self::byte_at(data, prev_ix + best_len) {
                    continue;
                }
                if backward == 0 || backward > max_backward {
                    continue;
                }
                let len = match_length(&data[prev_ix..], &data[cur_ix_masked..], max_length);
                if len >= 4 {
                    let score = backward_reference_score(len, backward);
                    if best_score < score {
                        best_score = score;
                        best_len = len;
                        out.len = len;
                        out.len_code = len;
                        out.distance = backward;
                        out.score = score;
                        compare_char = Self::byte_at(data, cur_ix_masked + best_len);
                        is_match_found = true;
                    }
                }
            }
        }

        if self.use_dictionary && !is_match_found {
            if let Some(index) = dictionary {
                is_match_found = index.find_match(
                    &mut self.dict_stats,
                    &data[cur_ix_masked..],
                    max_length,
                    max_backward,
                    true,
                    out,
                );
            }
        }

        self.buckets[key + ((cur_ix >> 3) % self.sweep)] = cur_ix as u32;
        is_match_found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::MIN_SCORE;

    const CACHE: [i32; 4] = [4, 11, 15, 16];

    fn mask_for(data: &[u8]) -> usize {
        data.len().next_power_of_two() - 1
    }

    #[test]
    fn finds_stored_occurrence_each_sweep() {
        for sweep in [1usize, 2, 4] {
            let mut h = QuicklyHasher::new(16, sweep, false).unwrap();
            h.prepare(0, 0, false, &[]);
            let data = b"abcdefghij0123456789abcdefghij______";
            let mask = mask_for(data);
            h.store_range(data, mask, 0, 12);
            let mut out = SearchResult::with_floor(0, MIN_SCORE);
            assert!(
                h.find_longest_match(None, data, mask, &CACHE, 20, 10, 20, &mut out),
                "sweep {sweep}"
            );
            assert_eq!(out.distance, 20, "sweep {sweep}");
            assert_eq!(out.len, 10, "sweep {sweep}");
        }
    }

    #[test]
    fn reuses_freshest_cached_distance() {
        let mut h = QuicklyHasher::new(16, 2, false).unwrap();
        h.prepare(0, 0, false, &[]);
        let data = b"deadbeefXXdeadbeefXX________________";
        let mask = mask_for(data);
        let cache = [10, 11, 15, 16];
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        // Nothing stored: only the cached distance can produce this match.
        assert!(h.find_longest_match(None, data, mask, &cache, 10, 10, 10, &mut out));
        assert_eq!(out.distance, 10);
        assert_eq!(out.len, 10);
    }

    #[test]
    fn zero_backward_is_rejected() {
        let mut h = QuicklyHasher::new(16, 1, false).unwrap();
        h.prepare(0, 0, false, &[]);
        let data = b"qwertyuiopqwertyuiop____";
        let mask = mask_for(data);
        let cache = [100, 101, 102, 103];
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        // First visit stores the position; an immediate re-query must not
        // match itself (backward == 0).
        h.find_longest_match(None, data, mask, &cache, 10, 10, 10, &mut out);
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        assert!(!h.find_longest_match(None, data, mask, &cache, 10, 10, 10, &mut out));
    }
}
