//! Encoder parameters and the quality → engine mapping.
//!
//! Quality 0–11 selects one of three engine families and its sizing; window
//! and block sizes are log2 values with fixed legal ranges. Everything here
//! is validated once per stream, before any engine is built.

use crate::hasher::Hasher;

pub const MIN_QUALITY: u32 = 0;
pub const MAX_QUALITY: u32 = 11;
pub const MIN_WINDOW_BITS: u32 = 10;
pub const MAX_WINDOW_BITS: u32 = 24;
pub const MIN_INPUT_BLOCK_BITS: u32 = 16;
pub const MAX_INPUT_BLOCK_BITS: u32 = 24;

/// Bytes at the far edge of the window that stay unreferenced.
pub const WINDOW_GAP: usize = 16;

/// Hard ceiling on any emitted distance, window and dictionary references
/// included. Exceeding it is a bug in the engine, not bad input.
pub const MAX_ALLOWED_DISTANCE: usize = 0x3FFF_FFFC;

/// Furthest backward distance a window reference may use.
#[inline]
pub fn max_backward_limit(lgwin: u32) -> usize {
    (1usize << lgwin) - WINDOW_GAP
}

// ─────────────────────────────────────────────────────────────────────────────
// Errors
// ─────────────────────────────────────────────────────────────────────────────

/// Parameter validation errors, reported before a stream starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamError {
    /// `quality` outside `0..=11`.
    InvalidQuality(u32),
    /// `lgwin` outside `10..=24`.
    InvalidWindowBits(u32),
    /// `lgblock` neither 0 (auto) nor within `16..=24`.
    InvalidBlockBits(u32),
}

impl core::fmt::Display for ParamError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::InvalidQuality(q) => {
                write!(f, "quality {q} outside {MIN_QUALITY}..={MAX_QUALITY}")
            }
            Self::InvalidWindowBits(w) => {
                write!(f, "lgwin {w} outside {MIN_WINDOW_BITS}..={MAX_WINDOW_BITS}")
            }
            Self::InvalidBlockBits(b) => write!(
                f,
                "lgblock {b} neither 0 nor within {MIN_INPUT_BLOCK_BITS}..={MAX_INPUT_BLOCK_BITS}"
            ),
        }
    }
}

impl std::error::Error for ParamError {}

// ─────────────────────────────────────────────────────────────────────────────
// Params
// ─────────────────────────────────────────────────────────────────────────────

/// Validated per-stream parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Params {
    pub quality: u32,
    pub lgwin: u32,
    pub lgblock: u32,
}

impl Params {
    /// Validate raw parameters. `lgblock == 0` auto-selects a block size
    /// from the quality: 16, widening to `min(18, lgwin)` at quality ≥ 9.
    pub fn new(quality: u32, lgwin: u32, lgblock: u32) -> Result<Self, ParamError> {
        if quality > MAX_QUALITY {
            return Err(ParamError::InvalidQuality(quality));
        }
        if !(MIN_WINDOW_BITS..=MAX_WINDOW_BITS).contains(&lgwin) {
            return Err(ParamError::InvalidWindowBits(lgwin));
        }
        let lgblock = match lgblock {
            0 => {
                if quality >= 9 && lgwin > MIN_INPUT_BLOCK_BITS {
                    lgwin.min(18)
                } else {
                    MIN_INPUT_BLOCK_BITS
                }
            }
            b if (MIN_INPUT_BLOCK_BITS..=MAX_INPUT_BLOCK_BITS).contains(&b) => b,
            b => return Err(ParamError::InvalidBlockBits(b)),
        };
        Ok(Self { quality, lgwin, lgblock })
    }

    /// Furthest backward distance a window reference may use at this window
    /// size.
    #[inline]
    pub fn max_backward_limit(&self) -> usize {
        max_backward_limit(self.lgwin)
    }

    /// Engine family and sizing for this quality.
    pub fn hasher_config(&self) -> HasherConfig {
        let config = match self.quality {
            0 => HasherConfig::Quickly { bucket_bits: 16, sweep: 1, use_dictionary: true },
            1 => HasherConfig::Quickly { bucket_bits: 16, sweep: 2, use_dictionary: false },
            2 | 3 => HasherConfig::Quickly { bucket_bits: 17, sweep: 4, use_dictionary: true },
            q @ 4..=9 => HasherConfig::ForgetfulChain {
                bucket_bits: 15,
                bank_bits: 16,
                num_banks: 1,
                num_last_distances_to_check: 16,
                max_hops: (if q > 6 { 7 } else { 8 }) << (q - 4),
            },
            10 => HasherConfig::LongestMatch {
                bucket_bits: 17,
                block_bits: 6,
                num_last_distances_to_check: 16,
            },
            _ => HasherConfig::LongestMatch {
                bucket_bits: 17,
                block_bits: 8,
                num_last_distances_to_check: 16,
            },
        };
        log::debug!("quality {} -> {config:?}", self.quality);
        config
    }

    /// Build the engine for this quality.
    pub fn new_hasher(&self) -> Result<Hasher, crate::hasher::EngineError> {
        Hasher::new(&self.hasher_config())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Engine sizing
// ─────────────────────────────────────────────────────────────────────────────

/// Sizing for one concrete engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HasherConfig {
    /// Hash map with a small bucket sweep (qualities 0–3).
    Quickly { bucket_bits: u32, sweep: usize, use_dictionary: bool },
    /// Banked FIFO chains (qualities 4–9).
    ForgetfulChain {
        bucket_bits: u32,
        bank_bits: u32,
        num_banks: usize,
        num_last_distances_to_check: usize,
        max_hops: usize,
    },
    /// Per-bucket ring, full sweep (qualities 10–11).
    LongestMatch { bucket_bits: u32, block_bits: u32, num_last_distances_to_check: usize },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_out_of_range() {
        assert_eq!(Params::new(12, 22, 0), Err(ParamError::InvalidQuality(12)));
        assert_eq!(Params::new(5, 9, 0), Err(ParamError::InvalidWindowBits(9)));
        assert_eq!(Params::new(5, 25, 0), Err(ParamError::InvalidWindowBits(25)));
        assert_eq!(Params::new(5, 22, 15), Err(ParamError::InvalidBlockBits(15)));
        assert_eq!(Params::new(5, 22, 25), Err(ParamError::InvalidBlockBits(25)));
    }

    #[test]
    fn auto_block_size() {
        assert_eq!(Params::new(5, 22, 0).unwrap().lgblock, 16);
        assert_eq!(Params::new(9, 22, 0).unwrap().lgblock, 18);
        assert_eq!(Params::new(9, 17, 0).unwrap().lgblock, 17);
        assert_eq!(Params::new(11, 24, 20).unwrap().lgblock, 20);
    }

    #[test]
    fn engine_family_per_quality() {
        for q in 0..=3 {
            assert!(matches!(
                Params::new(q, 22, 0).unwrap().hasher_config(),
                HasherConfig::Quickly { .. }
            ));
        }
        for q in 4..=9 {
            assert!(matches!(
                Params::new(q, 22, 0).unwrap().hasher_config(),
                HasherConfig::ForgetfulChain { .. }
            ));
        }
        for q in 10..=11 {
            assert!(matches!(
                Params::new(q, 22, 0).unwrap().hasher_config(),
                HasherConfig::LongestMatch { .. }
            ));
        }
    }

    #[test]
    fn hops_budget_scales_with_quality() {
        let hops = |q| match Params::new(q, 22, 0).unwrap().hasher_config() {
            HasherConfig::ForgetfulChain { max_hops, .. } => max_hops,
            _ => unreachable!(),
        };
        assert_eq!(hops(4), 8);
        assert_eq!(hops(5), 16);
        assert_eq!(hops(6), 32);
        assert_eq!(hops(7), 56);
        assert_eq!(hops(8), 112);
        assert_eq!(hops(9), 224);
    }

    #[test]
    fn window_limit_leaves_gap() {
        assert_eq!(max_backward_limit(16), (1 << 16) - 16);
        assert_eq!(max_backward_limit(24), (1 << 24) - 16);
    }
}
