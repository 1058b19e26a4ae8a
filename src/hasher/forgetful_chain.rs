//! Banked hash chains with FIFO slot replacement (qualities 4–9).
//!
//! Chains are bucketed by a 4-byte key; chain nodes live in fixed-size banks
//! and hold `(delta, next)` pairs, where `delta` is the gap back to the
//! previous occurrence of the key (saturating at `0xFFFF`) and `next` the
//! bank slot holding that occurrence. Once a bank wraps, the oldest nodes
//! are overwritten and any chain passing through them silently ends — the
//! *forgetful* property that bounds memory regardless of input size.
//!
//! Searches probe the distance cache first (with a one-byte `tiny_hash`
//! fingerprint to reject stale candidates cheaply), then walk the chain for
//! up to `max_hops` nodes, then fall back to the static dictionary.

use crate::dict::{DictionaryIndex, DictionarySearchStats};
use crate::distance_code::{DISTANCE_CACHE_INDEX, DISTANCE_CACHE_OFFSET};
use crate::matchlen::match_length;
use crate::score::{backward_reference_score, backward_reference_score_using_last_distance};

use super::{hash_bytes32, try_alloc_slice, EngineError, MatchFinder, SearchResult};

/// Initial `addr` value. Positions handled by the engine stay far below
/// `0xCCCCCCCC`, so the first delta computed against a fresh bucket is
/// enormous and terminates the chain immediately.
const SENTINEL_ADDR: u32 = 0xCCCC_CCCC;

const TINY_HASH_SIZE: usize = 1 << 16;

/// One chain node: gap to the previous occurrence and its slot index.
#[derive(Clone, Copy, Default)]
struct Slot {
    delta: u16,
    next: u16,
}

/// Forgetful-chain match finder. See the module docs.
pub struct ForgetfulChain {
    /// Most recently stored position per bucket.
    addr: Box<[u32]>,
    /// Newest chain slot per bucket.
    head: Box<[u16]>,
    /// Low byte of the last key stored at each (low 16 bits of) position.
    tiny_hash: Box<[u8]>,
    /// All banks, flattened; bank `b` occupies `b << bank_bits ..`.
    slots: Box<[Slot]>,
    /// Monotonic per-bank write cursor; the written slot is its low
    /// `bank_bits` bits (circular overwrite).
    free_slot_idx: Box<[u16]>,
    bucket_bits: u32,
    bank_bits: u32,
    num_banks: usize,
    num_last_distances_to_check: usize,
    max_hops: usize,
    dict_stats: DictionarySearchStats,
}

impl ForgetfulChain {
    /// Allocate a table. `num_banks` must be a power of two; chains with
    /// different low key bits then use disjoint banks.
    pub fn new(
        bucket_bits: u32,
        bank_bits: u32,
        num_banks: usize,
        num_last_distances_to_check: usize,
        max_hops: usize,
    ) -> Result<Self, EngineError> {
        debug_assert!(bucket_bits <= 24);
        debug_assert!(bank_bits <= 16);
        debug_assert!(num_banks.is_power_of_two());
        debug_assert!(num_last_distances_to_check <= DISTANCE_CACHE_INDEX.len());
        let bucket_count = 1usize << bucket_bits;
        let mut addr = try_alloc_slice::<u32>(bucket_count)?;
        addr.fill(SENTINEL_ADDR);
        Ok(Self {
            addr,
            head: try_alloc_slice(bucket_count)?,
            tiny_hash: try_alloc_slice(TINY_HASH_SIZE)?,
            slots: try_alloc_slice(num_banks << bank_bits)?,
            free_slot_idx: try_alloc_slice(num_banks)?,
            bucket_bits,
            bank_bits,
            num_banks,
            num_last_distances_to_check,
            max_hops,
        dict_stats: DictionarySearchStats::new(),
        })
    }

    #[inline(always)]
    fn bucket_count(&self) -> usize {
        1 << self.bucket_bits
    }

    #[inline(always)]
    fn bank_of(&self, key: usize) -> usize {
        key & (self.num_banks - 1)
    }
}

impl MatchFinder for ForgetfulChain {
    fn hash_type_length(&self) -> usize {
        4
    }

    fn store_lookahead(&self) -> usize {
        4
    }

    fn prepare(&mut self, position: usize, bytes: usize, is_last: bool, data: &[u8]) {
        // Seeding just the buckets a small one-shot input will touch is about
        // two orders of magnitude cheaper than wiping the whole table.
        let partial = position == 0 && is_last && bytes <= self.bucket_count() >> 6;
        if partial {
            let end = bytes.min(data.len()).saturating_sub(3);
            for i in 0..end {
                let bucket = hash_bytes32(&data[i..], self.bucket_bits);
                self.addr[bucket] = SENTINEL_ADDR;
                self.head[bucket] = 0xCCCC;
            }
        } else {
            self.addr.fill(SENTINEL_ADDR);
            self.head.fill(0);
        }
        self.tiny_hash.fill(0);
        self.free_slot_idx.fill(0);
        self.dict_stats = DictionarySearchStats::new();
        log::debug!(
            "forgetful-chain prepare: {} init, {} buckets, {} hops",
            if partial { "partial" } else { "full" },
            self.bucket_count(),
            self.max_hops,
        );
    }

    #[inline]
    fn store(&mut self, data: &[u8], mask: usize, ix: usize) {
        let off = ix & mask;
        debug_assert!(off + 4 <= data.len());
        if off + 4 > data.len() {
            return;
        }
        let key = hash_bytes32(&data[off..], self.bucket_bits);
        let bank = self.bank_of(key);
        let idx = (self.free_slot_idx[bank] as usize) & ((1 << self.bank_bits) - 1);
        self.free_slot_idx[bank] = self.free_slot_idx[bank].wrapping_add(1);
        let gap = ix.wrapping_sub(self.addr[key] as usize);
        self.tiny_hash[ix & 0xFFFF] = key as u8;
        let delta = if gap > 0xFFFF {
            if cfg!(feature = "capped-chains") { 0 } else { 0xFFFF }
        } else {
            gap
        };
        let slot = &mut self.slots[(bank << self.bank_bits) | idx];
        slot.delta = delta as u16;
        slot.next = self.head[key];
        self.addr[key] = ix as u32;
        self.head[key] = idx as u16;
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
        let key = hash_bytes32(&data[cur_ix_masked..], self.bucket_bits);
        let tiny = key as u8;
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
            let prev_ix = cur_ix - backward;
            if i > 0 && self.tiny_hash[prev_ix & 0xFFFF] != tiny {
                continue;
            }
            let prev_ix = prev_ix & mask;
            let len = match_length(&data[prev_ix..], &data[cur_ix_masked..], max_length);
            if len >= 2 {
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

        // Walk the chain, newest first.
        {
            let bank = self.bank_of(key);
            let mut backward = 0usize;
            let mut delta = cur_ix.wrapping_sub(self.addr[key] as usize);
            let mut slot = self.head[key] as usize;
            for _ in 0..self.max_hops {
                let last = slot;
                backward = backward.wrapping_add(delta);
                if backward == 0 || backward > max_backward {
                    break;
                }
                if cfg!(feature = "capped-chains") && delta == 0 {
                    break;
                }
                let prev_ix = cur_ix.wrapping_sub(backward) & mask;
                let node = self.slots[(bank << self.bank_bits) | last];
                slot = node.next as usize;
                delta = node.delta as usize;
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

    const NO_CACHE: [i32; 4] = [4, 11, 15, 16];

    fn new_chain() -> ForgetfulChain {
        let mut h = ForgetfulChain::new(15, 9, 1, 16, 16).unwrap();
        h.prepare(0, 0, false, &[]);
        h
    }

    fn mask_for(data: &[u8]) -> usize {
        data.len().next_power_of_two() - 1
    }

    #[test]
    fn fresh_table_finds_nothing() {
        let mut h = new_chain();
        let data = b"abcdefghabcdefgh";
        let mask = mask_for(data);
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        // Nothing stored yet: the sentinel terminates every chain.
        assert!(!h.find_longest_match(None, data, mask, &NO_CACHE, 0, 12, 0, &mut out));
    }

    #[test]
    fn chain_walk_finds_stored_occurrence() {
        let mut h = new_chain();
        let data = b"the quick fox and the quick dog";
        let mask = mask_for(data);
        h.store_range(data, mask, 0, 15);
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        // "the quick " recurs at distance 18.
        assert!(h.find_longest_match(None, data, mask, &NO_CACHE, 18, 13, 18, &mut out));
        assert_eq!(out.distance, 18);
        assert!(out.len >= 10, "len = {}", out.len);
        // Every reported candidate must be verifiable byte-for-byte.
        assert_eq!(&data[18 - out.distance..18 - out.distance + out.len], &data[18..18 + out.len]);
    }

    #[test]
    fn candidates_beyond_max_backward_are_ignored() {
        let mut h = new_chain();
        let data = b"pattern....................pattern....";
        let mask = mask_for(data);
        h.store_range(data, mask, 0, 20);
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        assert!(!h.find_longest_match(None, data, mask, &NO_CACHE, 27, 8, 16, &mut out));
    }

    #[test]
    fn last_distance_probe_accepts_two_byte_match() {
        let mut h = new_chain();
        // Two-byte recurrence "ab" at distance 8; too short for the chain
        // (needs >= 4) but probe 0 accepts len >= 2.
        let data = b"abXXXXXXabYYYYYY";
        let mask = mask_for(data);
        h.store_range(data, mask, 0, data.len() - 3);
        let cache = [8, 11, 15, 16];
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        assert!(h.find_longest_match(None, data, mask, &cache, 8, 8, 8, &mut out));
        assert_eq!(out.distance, 8);
        assert_eq!(out.len, 2);
    }

    #[test]
    fn store_is_unconditional_after_search() {
        let mut h = new_chain();
        let data = b"abcdefgh0123abcdefgh";
        let mask = mask_for(data);
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        // Searching position 0 stores it even though nothing is found...
        assert!(!h.find_longest_match(None, data, mask, &NO_CACHE, 0, 8, 0, &mut out));
        // ...so the recurrence at position 12 can reference it.
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        assert!(h.find_longest_match(None, data, mask, &NO_CACHE, 12, 8, 12, &mut out));
        assert_eq!(out.distance, 12);
        assert_eq!(out.len, 8);
    }

    #[test]
    fn nearest_occurrence_wins_on_equal_length() {
        let mut h = new_chain();
        let data = b"rustrustrustrust....";
        let mask = mask_for(data);
        h.store_range(data, mask, 0, 12);
        // Cache distances that cannot apply at position 12, so only the
        // chain contributes candidates.
        let cache = [100, 101, 102, 103];
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        assert!(h.find_longest_match(None, data, mask, &cache, 12, 4, 12, &mut out));
        // Distance 4, 8 and 12 all yield a 4-byte match; the smallest
        // distance scores highest.
        assert_eq!(out.distance, 4);
        assert_eq!(out.len, 4);
    }

    #[test]
    fn dictionary_is_consulted_only_without_window_match() {
        use crate::dict::Dictionary;

        let mut data_vec = Vec::new();
        data_vec.extend_from_slice(b"functionabsolute");
        let mut offsets = [0u32; 25];
        let mut size_bits = [0u8; 25];
        offsets[8] = 0;
        size_bits[8] = 1;
        let index = DictionaryIndex::new(Dictionary::new(data_vec, offsets, size_bits).unwrap());

        let mut h = new_chain();
        let data = b"XXXXXXXXfunction";
        let mask = mask_for(data);
        let mut out = SearchResult::with_floor(0, MIN_SCORE);
        let max_backward = 8;
        assert!(h.find_longest_match(
            Some(&index), data, mask, &NO_CACHE, 8, 8, max_backward, &mut out
        ));
        assert_eq!(out.len, 8);
        assert_eq!(out.len_code, 8);
        assert!(out.distance > max_backward, "dictionary reference expected");
    }
}
