//! E2E Suite 01: reference scenarios for the backward-reference engine.
//!
//! Exercises the documented end-to-end behaviors on concrete inputs:
//! pure-literal streams, run-length-style copies, phrase reuse, random
//! (incompressible) data with the skip heuristic, and dictionary
//! references — each validated by full invariant checks and byte-exact
//! reconstruction of the input from the command stream.

mod common;

use common::{check_stream, copied_bytes};

use rand::{Rng, RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

use brotr::dict::Dictionary;
use brotr::hasher::MatchFinder;
use brotr::{
    create_backward_references, encode_one_shot, mask_for, Command, DictionaryIndex, Hasher,
    Params, SearchResult, INITIAL_DISTANCE_CACHE,
};

// ─────────────────────────────────────────────────────────────────────────────
// S1: all-distinct bytes — one pure insert
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn s1_distinct_bytes_single_insert() {
    let data = b"abcdefghij";
    for quality in [0, 2, 5, 9, 11] {
        let params = Params::new(quality, 16, 0).unwrap();
        let commands = encode_one_shot(data, &params, None).unwrap();
        assert_eq!(commands.len(), 1, "quality {quality}");
        assert_eq!(commands[0].insert_len, 10);
        assert_eq!(commands[0].copy_len, 0);
        check_stream(data, &commands, &params, None);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// S2: three-byte period — RLE-style overlapping copy
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn s2_short_period_copy() {
    let data = b"abcabcabcabcabc";
    let params = Params::new(5, 16, 0).unwrap();
    let commands = encode_one_shot(data, &params, None).unwrap();
    let copy = commands.iter().find(|c| c.copy_len > 0).expect("copy expected");
    assert_eq!(copy.insert_len, 3);
    assert_eq!(copy.copy_len, 12);
    assert_eq!(copy.distance, 3);
    check_stream(data, &commands, &params, None);
}

// ─────────────────────────────────────────────────────────────────────────────
// S3: repeated phrase — long copy at the phrase distance
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn s3_repeated_phrase() {
    let data = b"the quick brown fox jumps over the quick brown fox";
    for quality in 4..=9 {
        let params = Params::new(quality, 16, 0).unwrap();
        let commands = encode_one_shot(data, &params, None).unwrap();
        let copy = commands.iter().find(|c| c.distance == 31).expect("copy expected");
        assert!(copy.copy_len >= 19, "quality {quality}: copy_len {}", copy.copy_len);
        check_stream(data, &commands, &params, None);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// S4: uniform random data — sparse stores, almost no copies
// ─────────────────────────────────────────────────────────────────────────────

/// Wrapper that counts how often the underlying engine touches its table:
/// explicit stores plus the store every `find_longest_match` performs.
struct CountingHasher {
    inner: Hasher,
    stores: usize,
}

impl MatchFinder for CountingHasher {
    fn hash_type_length(&self) -> usize {
        self.inner.hash_type_length()
    }

    fn store_lookahead(&self) -> usize {
        self.inner.store_lookahead()
    }

    fn prepare(&mut self, position: usize, bytes: usize, is_last: bool, data: &[u8]) {
        self.inner.prepare(position, bytes, is_last, data)
    }

    fn store(&mut self, data: &[u8], mask: usize, ix: usize) {
        self.stores += 1;
        self.inner.store(data, mask, ix)
    }

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
    ) -> bool {
        self.stores += 1; // the search itself stores cur_ix
        self.inner.find_longest_match(
            dictionary, data, mask, distance_cache, cur_ix, max_length, max_backward, out,
        )
    }
}

#[test]
fn s4_random_data_is_left_alone() {
    let mut rng = ChaCha8Rng::seed_from_u64(0x5eed);
    let mut data = vec![0u8; 65536];
    rng.fill_bytes(&mut data);

    let params = Params::new(5, 16, 0).unwrap();
    let mut hasher = CountingHasher { inner: params.new_hasher().unwrap(), stores: 0 };
    hasher.prepare(0, data.len(), true, &data);
    let mask = mask_for(&data);
    let mut dist_cache = INITIAL_DISTANCE_CACHE;
    let mut last_insert_len = 0;
    let mut commands = Vec::new();
    let mut num_literals = 0;
    create_backward_references(
        data.len(),
        0,
        &data,
        mask,
        &params,
        &mut hasher,
        None,
        &mut dist_cache,
        &mut last_insert_len,
        &mut commands,
        &mut num_literals,
    );
    if last_insert_len > 0 {
        commands.push(Command::insert_only(last_insert_len));
    }

    // Copies gain at most a sliver on random data.
    assert!(
        copied_bytes(&commands) < data.len() / 20,
        "copied {} of {} random bytes",
        copied_bytes(&commands),
        data.len()
    );
    // The skip heuristic must leave most positions unhashed.
    assert!(
        hasher.stores < data.len() / 2,
        "{} stores for {} bytes",
        hasher.stores,
        data.len()
    );
    check_stream(&data, &commands, &params, None);
}

// ─────────────────────────────────────────────────────────────────────────────
// S5: megabyte of zeroes — one overlapping distance-1 copy
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn s5_zero_run_distance_one() {
    let data = vec![0u8; 1 << 20];
    let params = Params::new(5, 22, 0).unwrap();
    let commands = encode_one_shot(&data, &params, None).unwrap();
    let copy = commands.iter().find(|c| c.copy_len > 0).expect("copy expected");
    assert!(copy.insert_len <= 4);
    assert_eq!(copy.distance, 1);
    assert!(copy.copy_len as usize >= data.len() - 4);
    check_stream(&data, &commands, &params, None);
}

// ─────────────────────────────────────────────────────────────────────────────
// S6: twin blocks — long copy across a separator
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn s6_twin_blocks_copy_across_separator() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    // Block bytes and separator bytes use disjoint alphabets so no match
    // straddles the boundary.
    let block: Vec<u8> = (0..512).map(|_| rng.gen_range(b'a'..=b'p')).collect();
    let separator: Vec<u8> = (0..32).map(|_| rng.gen_range(b'0'..=b'9')).collect();
    let mut data = block.clone();
    data.extend_from_slice(&separator);
    data.extend_from_slice(&block);

    let params = Params::new(5, 16, 0).unwrap();
    let commands = encode_one_shot(&data, &params, None).unwrap();
    assert!(
        commands.iter().any(|c| c.distance == 544 && c.copy_len >= 256),
        "second block should be one long copy at distance 544: {commands:?}"
    );
    check_stream(&data, &commands, &params, None);
}

// ─────────────────────────────────────────────────────────────────────────────
// Boundary behaviors
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn inputs_shorter_than_key_width_are_pure_inserts() {
    for len in 0..4usize {
        let data = vec![b'x'; len];
        let params = Params::new(5, 16, 0).unwrap();
        let commands = encode_one_shot(&data, &params, None).unwrap();
        if len == 0 {
            assert!(commands.is_empty());
        } else {
            assert_eq!(commands.len(), 1);
            assert_eq!(commands[0].insert_len as usize, len);
            assert_eq!(commands[0].copy_len, 0);
        }
        check_stream(&data, &commands, &params, None);
    }
}

#[test]
fn length_four_self_similarity_cannot_copy() {
    // First four bytes equal the last four, but nothing was stored before
    // the (only) searchable position, so no copy can be emitted.
    let data = b"abab";
    let params = Params::new(5, 16, 0).unwrap();
    let commands = encode_one_shot(data, &params, None).unwrap();
    assert_eq!(commands.len(), 1);
    assert_eq!(commands[0].insert_len, 4);
    assert_eq!(commands[0].copy_len, 0);
}

#[test]
fn repeated_byte_run_emits_distance_one_copy() {
    // Six is the shortest run that can self-reference: the generator stops
    // searching four bytes before the end, and position 0 has no history.
    let data = b"aaaaaa";
    let params = Params::new(5, 16, 0).unwrap();
    let commands = encode_one_shot(data, &params, None).unwrap();
    let copy = commands.iter().find(|c| c.copy_len > 0).expect("copy expected");
    assert_eq!(copy.distance, 1);
    check_stream(data, &commands, &params, None);

    let five = encode_one_shot(b"aaaaa", &params, None).unwrap();
    assert!(five.iter().all(|c| c.copy_len == 0), "length 5 leaves no searchable position");
}

// ─────────────────────────────────────────────────────────────────────────────
// Multi-block streams: stitch + carried state
// ─────────────────────────────────────────────────────────────────────────────

#[test]
fn split_blocks_match_across_the_boundary() {
    let data = b"some reasonably long text. some reasonably long text.";
    let params = Params::new(5, 16, 0).unwrap();
    let mut hasher = params.new_hasher().unwrap();
    hasher.prepare(0, data.len(), true, data);
    let mask = mask_for(data);
    let mut dist_cache = INITIAL_DISTANCE_CACHE;
    let mut last_insert_len = 0;
    let mut commands = Vec::new();
    let mut num_literals = 0;
    let split = 20;
    create_backward_references(
        split,
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
    create_backward_references(
        data.len() - split,
        split,
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
    if last_insert_len > 0 {
        commands.push(Command::insert_only(last_insert_len));
    }
    // The repeat starts at 27 with distance 27; the boundary at 20 must not
    // hide it.
    let copy = commands.iter().find(|c| c.distance == 27).expect("copy expected");
    assert!(copy.copy_len >= 20, "copy_len = {}", copy.copy_len);
    check_stream(data, &commands, &params, None);
}

// ─────────────────────────────────────────────────────────────────────────────
// Dictionary references
// ─────────────────────────────────────────────────────────────────────────────

fn words_dictionary() -> DictionaryIndex {
    let mut data = Vec::new();
    let words: [&[u8; 8]; 8] = [
        b"although", b"business", b"children", b"complete",
        b"document", b"interest", b"question", b"standard",
    ];
    for w in words {
        data.extend_from_slice(w);
    }
    let mut offsets = [0u32; 25];
    let mut size_bits = [0u8; 25];
    offsets[8] = 0;
    size_bits[8] = 3;
    DictionaryIndex::new(Dictionary::new(data, offsets, size_bits).unwrap())
}

#[test]
fn dictionary_word_is_referenced_beyond_the_window() {
    let index = words_dictionary();
    let data = b"XY......question....";
    let params = Params::new(5, 16, 0).unwrap();
    let commands = encode_one_shot(data, &params, Some(&index)).unwrap();
    let limit = params.max_backward_limit();
    let copy = commands
        .iter()
        .find(|c| c.copy_len > 0 && c.distance as usize > 8)
        .expect("dictionary copy expected");
    assert_eq!(copy.copy_len, 8);
    assert_eq!(copy.copy_len_code, 8);
    assert!((copy.distance as usize) <= limit + 1 + 8 * (1 << 3));
    check_stream(data, &commands, &params, Some(&index));
}

#[test]
fn dictionary_cutoff_match_reconstructs() {
    let index = words_dictionary();
    // "standar" is 7 of 8 bytes of "standard": omit-last-1 cutoff.
    let data = b"ABCDEFGHstandarZ....";
    let params = Params::new(5, 16, 0).unwrap();
    let commands = encode_one_shot(data, &params, Some(&index)).unwrap();
    let copy = commands.iter().find(|c| c.copy_len == 7).expect("cutoff copy expected");
    assert_eq!(copy.copy_len_code, 8);
    check_stream(data, &commands, &params, Some(&index));
}
