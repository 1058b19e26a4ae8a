//! Shared helpers for the e2e suites: a reference reconstruction of the
//! command stream (window copies plus dictionary words with omit-last-N
//! cutoff transforms) and the invariant checks every emitted stream must
//! satisfy.
#![allow(dead_code)]

use brotr::dict::CUTOFF_TRANSFORMS;
use brotr::distance_code::NUM_DISTANCE_SHORT_CODES;
use brotr::{Command, DictionaryIndex, Params};

/// Rebuild the input from its command stream. Literal bytes are read from
/// `original` (the engine emits counts, not bytes); copies come from the
/// already-reconstructed output or, for distances beyond the window, from
/// the dictionary with the cutoff transform applied.
pub fn reconstruct(
    original: &[u8],
    commands: &[Command],
    params: &Params,
    dict: Option<&DictionaryIndex>,
) -> Vec<u8> {
    let limit = params.max_backward_limit();
    let mut out: Vec<u8> = Vec::with_capacity(original.len());
    for c in commands {
        let insert_len = c.insert_len as usize;
        let start = out.len();
        assert!(start + insert_len <= original.len(), "insert overruns input");
        out.extend_from_slice(&original[start..start + insert_len]);
        if c.copy_len == 0 {
            continue;
        }
        let copy_len = c.copy_len as usize;
        let distance = c.distance as usize;
        let max_backward = out.len().min(limit);
        if distance <= max_backward {
            // In-window copy; byte-at-a-time so overlapping sources
            // (distance < length) replicate runs correctly.
            let start = out.len() - distance;
            for i in 0..copy_len {
                let b = out[start + i];
                out.push(b);
            }
        } else {
            // Dictionary reference: split the address into word index and
            // transform id, then take the word minus its omitted tail.
            let index = dict.expect("dictionary reference without a dictionary");
            let word_len = c.copy_len_code as usize;
            let address = distance - max_backward - 1;
            let size_bits = index.dictionary().size_bits(word_len);
            let word_idx = address & ((1usize << size_bits) - 1);
            let transform_id = address >> size_bits;
            let cut = word_len - copy_len;
            assert_eq!(
                transform_id, CUTOFF_TRANSFORMS[cut],
                "transform id does not encode the cutoff depth"
            );
            assert!(word_idx < index.dictionary().n_words(word_len), "word index out of range");
            let word = index.dictionary().word(word_len, word_idx);
            out.extend_from_slice(&word[..copy_len]);
        }
    }
    out
}

/// Check the universal invariants of an emitted stream:
/// legal distances, correct in-window matches, insert/copy exhaustiveness,
/// and byte-exact reconstruction.
pub fn check_stream(
    data: &[u8],
    commands: &[Command],
    params: &Params,
    dict: Option<&DictionaryIndex>,
) {
    let limit = params.max_backward_limit();
    let mut position = 0usize;
    for c in commands {
        position += c.insert_len as usize;
        if c.copy_len == 0 {
            assert_eq!(c.distance, 0);
            continue;
        }
        let copy_len = c.copy_len as usize;
        let distance = c.distance as usize;
        assert!(distance >= 1, "zero distance");
        let max_backward = position.min(limit);
        if distance <= max_backward {
            // In-window: the referenced bytes must equal the copied ones.
            assert_eq!(c.copy_len, c.copy_len_code);
            let src = position - distance;
            for i in 0..copy_len {
                assert_eq!(
                    data[src + i],
                    data[position + i],
                    "copy mismatch at position {position}, distance {distance}, offset {i}"
                );
            }
            // Distance short codes must agree with the probe tables.
            if (c.distance_code as usize) >= NUM_DISTANCE_SHORT_CODES {
                assert_eq!(c.distance_code as usize, distance + NUM_DISTANCE_SHORT_CODES - 1);
            }
        } else {
            assert!(dict.is_some(), "out-of-window distance without a dictionary");
            let word_len = c.copy_len_code as usize;
            assert!((4..=24).contains(&word_len));
            assert!(copy_len <= word_len);
        }
        position += copy_len;
    }
    assert_eq!(position, data.len(), "insert/copy lengths must cover the input exactly");
    assert_eq!(reconstruct(data, commands, params, dict), data, "reconstruction mismatch");
}

/// Sum of all copy lengths in a stream.
pub fn copied_bytes(commands: &[Command]) -> usize {
    commands.iter().map(|c| c.copy_len as usize).sum()
}
