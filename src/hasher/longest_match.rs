//! Per-bucket ring of recent positions, walked newest-first (qualities
//! 10–11).
//!
//! Each bucket remembers the last `2^block_bits` positions of its key in a
//! small ring; a search examines all of them, newest first, stopping as soon
//! as a candidate falls out of the window. Thorough and correspondingly
//! slow — reserved for the top quality levels.

use crate::dict::{DictionaryIndex, DictionarySearchStats};
use crate::distance_code::{DISTANCE_CACHE_INDEX, DISTANCE_CACHE_OFFSET};
use crate::matchlen::match_length;
use crate::score::{backward_reference_score, backward_reference_score_using_last_distance};

use super::{hash_bytes32, try_alloc_slice, EngineError, MatchFinder, SearchResult};

/// Exhaustive-sweep match finder. See the module docs.
pub struct LongestMatchHasher {
    /// Total stores per bucket (wrapping); the ring cursor.
    num: Box<[u16]>,
    /// Position rings, `2^block_bits` entries per bucket, flattened.
    buckets: Box<[u32]>,
    bucket_bits: u32,
    block_bits: u32,
    block_mask: usize,
    num_last_distances_to_check: usize,
    dict_stats: DictionarySearchStats,
}

impl LongestMatchHasher {
    pub fn new(
        bucket_bits: u32,
        block_bits: u32,
        num_last_distances_to_check: usize,
    ) -> Result<Self, EngineError> {
        debug_assert!(bucket_bits <= 24);
        debug_assert!(block_bits <= 12);
        debug_assert!(num_last_distances_to_check <= DISTANCE_CACHE_INDEX.len());
        let bucket_count = 1usize << bucket_bits;
        Ok(Self {
            num: try_alloc_slice(bucket_count)?,
            buckets: try_alloc_slice(bucket_count << block_bits)?,
            bucket_bits,
            block_bits,
            block_mask: (1 << block_bits) - 1,
            num_last_distances_to_check,
            dict_stats: DictionarySearchStats::new(),
        })
    }

    #[inline(always)]
    fn bucket_count(&self) -> usize {
        1 << self.bucket_bits
    }
}

impl MatchFinder for LongestMatchHasher {
    fn hash_type_length(&self) -> usize {
        4
    }

    fn store_lookahead(&self) -> usize {
        4
    }

    fn prepare(&mut self, position: usize, bytes: usize, is_last: bool, data: &[u8]) {
        // Only the ring cursors need clearing; stale ring contents are
        // unreachable once `num` is zero.
        let partial = position == 0 && is_last && bytes <= self.bucket_count() >> 6;
        if partial {
            let end = bytes.min(data.len()).saturating_sub(3);
            for i in 0..end {
                let key = hash_bytes32(&data[i..], self.bucket_bits);
                self.num[key] = 0;
            }
        } else {
            self.num.fill(0);
        }
        self.dict_stats = DictionarySearchStats::new();
        log::debug!(
            "longest-match prepare: {} init, block {}",
            if partial { "partial" } else { "full" },
            self.block_mask + 1,
        );
    }

    #[inline]
    fn store(&mut self, data: &[u8], mask: usize, ix: usize) {
        let off = ix & mask;
        if off + 4 > data.len() {
            return;
        }
        let key = hash_bytes32(&data[off..], self.bucket_bits);
        let minor = self.num[key] as usize & self.block_mask;
        self.buckets[(key << self.block_bits) + minor] = ix as u32;
        self.num[key] = self.num[key].wrapping_add(1);
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
        let cur_ix_masked = cur_ix & mask;
        let mut is_match_found = false;
        let mut best_score = out.score;
        let mut best_len = out.len;
        out.len = 0;
        out.len_code = 0;

        // Try the cached distances (and their perturbations) first.
        for i in 0..self.num_last_distances_to_check {
            let candidate =
                distance_cache[DISTANCE_CACHE_INDEX[i]] + DISTANCE_CACHE_OFFSET[i];
            if candidate <= 0 {
                continue;
            }
            let backward = candidate as usize;
            if backward > max_backward || backward > cur_ix {
                continue;
            }
            let prev_ix = (cur_ix - backward) & mask;
            if cur_ix_masked + best_len > mask
                || prev_ix + best_len > mask
                || cur_ix_masked + best_len >= data.len()
                || prev_ix + best_len >= data.len()
                || data[cur_ix_masked + best_len] != data[prev_ix + best_len]
            {
                continue;
            }
            let len = match_length(&data[prev_ix..], &data[cur_ix_masked..], max_length);
            if len >= 3 || (len == 2 && i < 2) {
                let score = backward_reference_score_using_last_distance(len, i);
                if best_score < score {
                    best_score = score;
                    best_len = len;
                    out.len = len;
                    out.len_code = len;
                    out.distance = backward;
                    out.score = score;
                    is_match_found = true;
                }
            }
        }

        // Sweep the bucket ring, newest first.
        {
            let key = hash_bytes32(&data[cur_ix_masked..], self.bucket_bits);
            let base = key << self.block_bits;
            let n = self.num[key] as usize;
            let down = n.saturating_sub(self.block_mask + 1);
            let mut i = n;
            while i > down {
                i -= 1;
                let prev = self.buckets[base + (i & self.block_mask)] as usize;
                let backward = cur_ix.wrapping_sub(prev);
                if backward == 0 || backward > max_backward {
                    break;
                }
                let prev_ix = prev & mask;
                if cur_ix_masked + best_len > mask
                    || prev_ix + best_len > mask
                    || cur_ix_masked + best_len >= data.len()
                    || prev_ix + best_len >= data.len()
                    || data[cur_ix_masked + best_len] != data[prev_ix + best_len]
                {
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
                        is_match_found = true;
                    }
                }
            }
            self.store(data, mask, cur_ix);
        }

        if !is_match_found {
            if let Some(index) = dictionary {
                is_match_found = index.find_match(
                    &mut self.dict_stats,
                    &data[cur_ix_masked..],
                    max_length,
                    max_backward,
                    false,
                    out,
                );
            }
        }
        is_match_found
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::score::MIN_SCORE;

    fn mask_for(data: &[u8]) -> usize {
        data.len().next_power_of_two() - 1
    }

    #[test]
    fn sweep_prefers_longer_match_over_nearer_entry() {
        let mut h = LongestMatchHasher::new(14, 2, 16).unwrap();
        h.prepare(0, 0, false, &[]);
        // "word" recurs with different continuations; the sweep must pick
        // the longest extension, not merely the newest ring entry.
        let data = b"wordAA..wordBB..wordAA..........";
        let mask = mask_for(data);
        h.store_range(data, mask, 0, 14);
        let cache = [100, 101, 102, 103];
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        assert!(h.find_longest_match(None, data, mask, &cache, 16, 6, 16, &mut out));
        assert_eq!(out.distance, 16, "full-length match at distance 16 beats len-4 at 8");
        assert_eq!(out.len, 6);
    }

    #[test]
    fn two_byte_match_only_for_first_probes() {
        let data = b"abXY....abQR....";
        let mask = mask_for(data);
        // Probe 0 (exact d0) may accept a 2-byte match...
        let mut h = LongestMatchHasher::new(14, 4, 16).unwrap();
        h.prepare(0, 0, false, &[]);
        h.store_range(data, mask, 0, 10);
        let cache = [8, 11, 15, 16];
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        assert!(h.find_longest_match(None, data, mask, &cache, 8, 6, 8, &mut out));
        assert_eq!(out.len, 2);
        // ...but the same candidate reachable only through probe index >= 2
        // must be rejected.
        let mut h = LongestMatchHasher::new(14, 4, 16).unwrap();
        h.prepare(0, 0, false, &[]);
        h.store_range(data, mask, 0, 10);
        let cache = [3, 5, 8, 16];
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        assert!(!h.find_longest_match(None, data, mask, &cache, 8, 6, 8, &mut out));
    }

    #[test]
    fn ring_eviction_forgets_oldest() {
        // block_bits = 1: the ring keeps only the 2 newest occurrences.
        let mut h = LongestMatchHasher::new(14, 1, 16).unwrap();
        h.prepare(0, 0, false, &[]);
        let data = b"quuxAAAAquuxBBBBquuxCCCCquuxDDDD";
        let mask = mask_for(data);
        for ix in [0usize, 8, 16] {
            h.store(data, mask, ix);
        }
        let cache = [100, 101, 102, 103];
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        assert!(h.find_longest_match(None, data, mask, &cache, 24, 8, 24, &mut out));
        // The occurrence at 0 was evicted; of the two reachable candidates
        // (positions 8 and 16) both match 4 bytes, so the nearer one wins.
        assert_eq!(out.distance, 8);
        assert_eq!(out.len, 4);
    }
}
