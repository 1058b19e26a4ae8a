//! Distance cache probe tables and distance short-code mapping.
//!
//! The format reserves 16 *short codes* for distances expressible in terms of
//! the four most recently used distances: the four cached values themselves,
//! plus small perturbations of the two freshest (`d0 ± {1,2,3}`,
//! `d1 ± {1,2,3}`). The matcher probes exactly these 16 candidates, in short
//! code order, before walking the hash chain.

/// Number of distance short codes / last-distance probes.
pub const NUM_DISTANCE_SHORT_CODES: usize = 16;

/// Which cache slot each probe reads.
pub const DISTANCE_CACHE_INDEX: [usize; NUM_DISTANCE_SHORT_CODES] =
    [0, 1, 2, 3, 0, 0, 0, 0, 0, 0, 1, 1, 1, 1, 1, 1];

/// Perturbation added to the cached distance for each probe.
pub const DISTANCE_CACHE_OFFSET: [i32; NUM_DISTANCE_SHORT_CODES] =
    [0, 0, 0, 0, -1, 1, -2, 2, -3, 3, -1, 1, -2, 2, -3, 3];

/// Distance cache seed for a fresh stream.
pub const INITIAL_DISTANCE_CACHE: [i32; 4] = [4, 11, 15, 16];

// Short codes for d0-3 .. d0+3 and d1-3 .. d1+3, packed one nibble per
// offset. Offset 3 (the exact cached value) is resolved before these tables
// are consulted.
const CODES_NEAR_D0: u32 = 0x0975_0468;
const CODES_NEAR_D1: u32 = 0x0FDB_1ACE;

/// Map an accepted distance to its distance code.
///
/// Returns a short code in `0..16` when `distance` equals a cached distance
/// or a probed perturbation of `cache[0]` / `cache[1]`; otherwise the direct
/// code `distance + 15`. Distances beyond `max_distance` (dictionary
/// references) always map to a direct code.
pub fn compute_distance_code(distance: usize, max_distance: usize, cache: &[i32; 4]) -> usize {
    if distance <= max_distance {
        let dist_plus_3 = distance + 3;
        let off0 = dist_plus_3.wrapping_sub(cache[0] as usize);
        let off1 = dist_plus_3.wrapping_sub(cache[1] as usize);
        if distance == cache[0] as usize {
            return 0;
        } else if distance == cache[1] as usize {
            return 1;
        } else if off0 < 7 {
            return ((CODES_NEAR_D0 >> (4 * off0)) & 0xF) as usize;
        } else if off1 < 7 {
            return ((CODES_NEAR_D1 >> (4 * off1)) & 0xF) as usize;
        } else if distance == cache[2] as usize {
            return 2;
        } else if distance == cache[3] as usize {
            return 3;
        }
    }
    distance + NUM_DISTANCE_SHORT_CODES - 1
}

/// `true` when a distance maps to a direct (non-short) code, i.e. the
/// distance is none of the 16 probed candidates. Only such distances enter
/// the cache.
#[inline]
pub fn is_direct_distance(distance: usize, max_distance: usize, cache: &[i32; 4]) -> bool {
    compute_distance_code(distance, max_distance, cache) >= NUM_DISTANCE_SHORT_CODES
}

#[cfg(test)]
mod tests {
    use super::*;

    const CACHE: [i32; 4] = [100, 200, 300, 400];

    #[test]
    fn exact_cache_hits() {
        assert_eq!(compute_distance_code(100, 1 << 20, &CACHE), 0);
        assert_eq!(compute_distance_code(200, 1 << 20, &CACHE), 1);
        assert_eq!(compute_distance_code(300, 1 << 20, &CACHE), 2);
        assert_eq!(compute_distance_code(400, 1 << 20, &CACHE), 3);
    }

    #[test]
    fn perturbations_match_probe_tables() {
        // Every probe i with a non-zero offset must map back to code i.
        for (i, (&idx, &off)) in DISTANCE_CACHE_INDEX
            .iter()
            .zip(DISTANCE_CACHE_OFFSET.iter())
            .enumerate()
            .skip(4)
        {
            let d = (CACHE[idx] + off) as usize;
            assert_eq!(compute_distance_code(d, 1 << 20, &CACHE), i, "probe {i}");
        }
    }

    #[test]
    fn unrelated_distance_is_direct() {
        assert_eq!(compute_distance_code(777, 1 << 20, &CACHE), 777 + 15);
        assert!(is_direct_distance(777, 1 << 20, &CACHE));
        assert!(!is_direct_distance(101, 1 << 20, &CACHE)); // d0 + 1
    }

    #[test]
    fn beyond_window_is_always_direct() {
        // Even an exact cache value is direct once past max_distance.
        assert_eq!(compute_distance_code(100, 50, &CACHE), 100 + 15);
    }

    #[test]
    fn perturbation_codes_win_over_older_cache_slots() {
        // With cache [1,2,3,4], distance 4 is both d3 and d0+3; the d0
        // perturbation is resolved first, so code 9 wins over code 3.
        let cache = [1, 2, 3, 4];
        assert_eq!(compute_distance_code(4, 1 << 20, &cache), 9);
        assert_eq!(compute_distance_code(1, 1 << 20, &cache), 0);
    }

    #[test]
    fn small_cache_values_do_not_underflow() {
        // d0 - 1 would be zero and d0 - 3 negative; the wrapped offsets must
        // fall outside 0..7 rather than alias another code.
        let cache = [1, 20, 30, 40];
        assert_eq!(compute_distance_code(5, 1 << 20, &cache), 5 + 15);
    }
}
