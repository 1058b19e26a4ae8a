//! Backward-reference generation: the outer loop that turns a block of input
//! into a command stream.
//!
//! At each position the generator asks the engine for its best match. A
//! found match is not taken immediately: up to four times in a row, a match
//! starting one byte later may displace it if it scores at least
//! [`COST_DIFF_LAZY`] higher (lazy matching). Emitted copies re-index only
//! from their third byte onward — overlapping keys inside a fresh copy
//! rarely pay for themselves. Long matchless stretches trigger a two-tier
//! skip heuristic that hashes every 2nd, then every 4th position, which
//! keeps incompressible data cheap and the table unpolluted.
//!
//! The trailing literal run and the distance cache are carried across
//! blocks; the caller closes the stream by flushing `last_insert_len` into a
//! final insert-only command.

use crate::command::Command;
use crate::dict::DictionaryIndex;
use crate::distance_code::{
    compute_distance_code, INITIAL_DISTANCE_CACHE, NUM_DISTANCE_SHORT_CODES,
};
use crate::hasher::{EngineError, MatchFinder, SearchResult};
use crate::params::{Params, MAX_ALLOWED_DISTANCE};
use crate::score::{COST_DIFF_LAZY, MIN_SCORE};

/// Maximum consecutive lazy deferrals before a match is taken
/// unconditionally.
const MAX_DELAYED_IN_ROW: usize = 4;

/// Generate backward references for one block.
///
/// `position` is the absolute position of the block's first byte;
/// `data`/`mask` address the window (see [`MatchFinder`] for the masking
/// contract). `dist_cache` and `last_insert_len` carry state between blocks
/// and must be preserved by the caller; commands are appended to `commands`
/// and literal counts accumulated into `num_literals`.
///
/// The engine must have been [`prepare`](MatchFinder::prepare)d once for the
/// stream before the first block.
#[allow(clippy::too_many_arguments)]
pub fn create_backward_references<H: MatchFinder>(
    num_bytes: usize,
    position: usize,
    data: &[u8],
    mask: usize,
    params: &Params,
    hasher: &mut H,
    dictionary: Option<&DictionaryIndex>,
    dist_cache: &mut [i32; 4],
    last_insert_len: &mut usize,
    commands: &mut Vec<Command>,
    num_literals: &mut usize,
) {
    let max_backward_limit = params.max_backward_limit();
    let mut insert_length = *last_insert_len;
    let pos_end = position + num_bytes;
    let store_end = if num_bytes >= hasher.store_lookahead() {
        position + num_bytes - hasher.store_lookahead() + 1
    } else {
        position
    };
    let mut position = position;

    // Window for the incompressible-data heuristic.
    let random_heuristics_window_size: usize = if params.quality < 9 { 64 } else { 512 };
    let mut apply_random_heuristics = position + random_heuristics_window_size;

    hasher.stitch_to_previous_block(num_bytes, position, data, mask);

    while position + hasher.hash_type_length() < pos_end {
        let mut max_length = pos_end - position;
        let mut max_distance = position.min(max_backward_limit);
        let mut best = SearchResult::with_floor(0, MIN_SCORE);
        let mut is_match_found = hasher.find_longest_match(
            dictionary, data, mask, dist_cache, position, max_length, max_distance, &mut best,
        );
        if is_match_found {
            // Found a match; look for something even better one byte ahead.
            let mut delayed_in_row = 0;
            loop {
                max_length -= 1;
                // Below quality 5 only strictly longer matches may displace
                // the current one; above, the score bias alone gates it.
                let len_floor =
                    if params.quality < 5 { (best.len - 1).min(max_length) } else { 0 };
                let mut best_next = SearchResult::with_floor(len_floor, MIN_SCORE);
                max_distance = (position + 1).min(max_backward_limit);
                is_match_found = hasher.find_longest_match(
                    dictionary,
                    data,
                    mask,
                    dist_cache,
                    position + 1,
                    max_length,
                    max_distance,
                    &mut best_next,
                );
                if is_match_found && best_next.score >= best.score + COST_DIFF_LAZY {
                    // Write one literal and restart the match a byte later.
                    position += 1;
                    insert_length += 1;
                    best = best_next;
                    delayed_in_row += 1;
                    if delayed_in_row < MAX_DELAYED_IN_ROW
                        && position + hasher.hash_type_length() < pos_end
                    {
                        continue;
                    }
                }
                break;
            }
            apply_random_heuristics =
                position + 2 * best.len + random_heuristics_window_size;
            max_distance = position.min(max_backward_limit);

            debug_assert!(
                best.distance <= MAX_ALLOWED_DISTANCE,
                "illegal distance {}",
                best.distance
            );
            if best.distance > MAX_ALLOWED_DISTANCE {
                // Engine bug; drop the match rather than emit an illegal
                // reference.
                insert_length += 1;
                position += 1;
                continue;
            }

            let distance_code = compute_distance_code(best.distance, max_distance, dist_cache);
            if best.distance <= max_distance && distance_code >= NUM_DISTANCE_SHORT_CODES {
                // A genuinely new distance; cached ones keep their slots.
                dist_cache[3] = dist_cache[2];
                dist_cache[2] = dist_cache[1];
                dist_cache[1] = dist_cache[0];
                dist_cache[0] = best.distance as i32;
            }
            commands.push(Command::new(
                insert_length,
                best.len,
                best.len_code,
                best.distance,
                distance_code,
            ));
            *num_literals += insert_length;
            insert_length = 0;
            // Re-index the copied region, skipping its first byte: keys
            // overlapping a fresh copy rarely help later searches.
            hasher.store_range(
                data,
                mask,
                position + 2,
                (position + best.len).min(store_end),
            );
            position += best.len;
        } else {
            insert_length += 1;
            position += 1;
            // Match lookups on data that has produced none for a while are
            // almost always wasted work; stride ahead, storing sparsely.
            if position > apply_random_heuristics {
                if position > apply_random_heuristics + 4 * random_heuristics_window_size {
                    let margin = (hasher.store_lookahead() - 1).max(4);
                    let pos_jump = (position + 16).min(pos_end.saturating_sub(margin));
                    while position < pos_jump {
                        hasher.store(data, mask, position);
                        insert_length += 4;
                        position += 4;
                    }
                } else {
                    let margin = (hasher.store_lookahead() - 1).max(2);
                    let pos_jump = (position + 8).min(pos_end.saturating_sub(margin));
                    while position < pos_jump {
                        hasher.store(data, mask, position);
                        insert_length += 2;
                        position += 2;
                    }
                }
            }
        }
    }
    insert_length += pos_end - position;
    *last_insert_len = insert_length;
}

// ─────────────────────────────────────────────────────────────────────────────
// One-shot convenience
// ─────────────────────────────────────────────────────────────────────────────

/// Run the generator over `data` as a single final block and close the
/// stream. Returns the complete command stream.
pub fn encode_one_shot(
    data: &[u8],
    params: &Params,
    dictionary: Option<&DictionaryIndex>,
) -> Result<Vec<Command>, EngineError> {
    let mut hasher = params.new_hasher()?;
    hasher.prepare(0, data.len(), true, data);
    let mask = mask_for(data);
    let mut dist_cache = INITIAL_DISTANCE_CACHE;
    let mut last_insert_len = 0usize;
    let mut commands = Vec::new();
    let mut num_literals = 0usize;
    create_backward_references(
        data.len(),
        0,
        data,
        mask,
        params,
        &mut hasher,
        dictionary,
        &mut dist_cache,
        &mut last_insert_len,
        &mut commands,
        &mut num_literals,
    );
    if last_insert_len > 0 {
        commands.push(Command::insert_only(last_insert_len));
    }
    Ok(commands)
}

/// Identity-preserving mask for a one-shot buffer.
pub fn mask_for(data: &[u8]) -> usize {
    data.len().next_power_of_two().max(1) - 1
}

#[cfg(test)]
mod tests {
    use super::*;

    fn total_coverage(commands: &[Command]) -> usize {
        commands
            .iter()
            .map(|c| c.insert_len as usize + c.copy_len as usize)
            .sum()
    }

    #[test]
    fn distinct_bytes_become_one_insert() {
        let params = Params::new(5, 16, 0).unwrap();
        let commands = encode_one_shot(b"abcdefghij", &params, None).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].insert_len, 10);
        assert_eq!(commands[0].copy_len, 0);
    }

    #[test]
    fn short_period_repeat_becomes_one_copy() {
        let params = Params::new(5, 16, 0).unwrap();
        let commands = encode_one_shot(b"abcabcabcabcabc", &params, None).unwrap();
        assert_eq!(total_coverage(&commands), 15);
        // First period as literals, the rest as a single distance-3 copy.
        let copy = commands.iter().find(|c| c.copy_len > 0).expect("copy expected");
        assert_eq!(copy.distance, 3);
        assert_eq!(copy.insert_len, 3);
        assert_eq!(copy.copy_len, 12);
    }

    #[test]
    fn coverage_is_exhaustive_at_every_quality() {
        let data = b"the quick brown fox jumps over the quick brown fox";
        for quality in 0..=11 {
            let params = Params::new(quality, 16, 0).unwrap();
            let commands = encode_one_shot(data, &params, None).unwrap();
            assert_eq!(total_coverage(&commands), data.len(), "quality {quality}");
        }
    }

    #[test]
    fn repeated_phrase_is_copied() {
        let data = b"the quick brown fox jumps over the quick brown fox";
        let params = Params::new(7, 16, 0).unwrap();
        let commands = encode_one_shot(data, &params, None).unwrap();
        let copy = commands.iter().find(|c| c.distance == 31).expect("copy expected");
        assert!(copy.copy_len >= 19, "copy_len = {}", copy.copy_len);
    }

    #[test]
    fn fresh_distance_rotates_cache_short_code_does_not() {
        let params = Params::new(5, 16, 0).unwrap();
        // Distance 20 — outside every probed perturbation of the initial
        // cache, so the first copy's distance is genuinely fresh. The last
        // 20 bytes repeat bytes 24..44 so the second copy reuses d = 20.
        let data = b"ABCDEFGHIJKLMNOPQRSTABCDEFGHIJKLMNOPQRST0123EFGHIJKLMNOPQRST0123";
        let mut hasher = params.new_hasher().unwrap();
        hasher.prepare(0, data.len(), true, data);
        let mask = mask_for(data);
        let mut dist_cache = INITIAL_DISTANCE_CACHE;
        let mut last_insert_len = 0;
        let mut commands = Vec::new();
        let mut num_literals = 0;
        create_backward_references(
            data.len(),
            0,
            data,
            mask,
            &params,
            &mut hasher,
            None,
            &mut dist_cache,
            &mut last_insert_len,
            &mut commands,
            &mut num_literals,
        );
        let copies: Vec<_> = commands.iter().filter(|c| c.copy_len > 0).collect();
        assert_eq!(copies.len(), 2);
        // First copy: fresh distance 20, coded directly, rotated in.
        assert_eq!(copies[0].distance, 20);
        assert!(copies[0].has_direct_distance());
        // Second copy reuses it as short code 0, which must not rotate.
        assert_eq!(copies[1].distance, 20);
        assert!(copies[1].uses_last_distance());
        assert_eq!(dist_cache, [20, 4, 11, 15]);
    }

    #[test]
    fn tail_shorter_than_key_width_is_carried() {
        let params = Params::new(5, 16, 0).unwrap();
        let commands = encode_one_shot(b"abc", &params, None).unwrap();
        assert_eq!(commands.len(), 1);
        assert_eq!(commands[0].insert_len, 3);
        assert_eq!(commands[0].copy_len, 0);
    }

    #[test]
    fn empty_input_yields_no_commands() {
        let params = Params::new(5, 16, 0).unwrap();
        assert!(encode_one_shot(b"", &params, None).unwrap().is_empty());
    }

    #[test]
    fn runs_of_one_byte_use_distance_one() {
        let params = Params::new(6, 16, 0).unwrap();
        let data = vec![0u8; 4096];
        let commands = encode_one_shot(&data, &params, None).unwrap();
        assert_eq!(total_coverage(&commands), 4096);
        let copy = commands.iter().find(|c| c.copy_len > 0).expect("copy expected");
        assert_eq!(copy.distance, 1);
    }
}
