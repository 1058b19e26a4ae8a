// brotr — Brotli-style LZ77 match engine

pub mod backward_references;
pub mod command;
pub mod dict;
pub mod distance_code;
pub mod hasher;
pub mod matchlen;
pub mod params;
pub mod score;

// ─────────────────────────────────────────────────────────────────────────────
// Top-level re-exports for the common entry points.
// ─────────────────────────────────────────────────────────────────────────────

/// Per-block backward-reference generation over a caller-owned window.
pub use backward_references::create_backward_references;
/// One-shot convenience: encode a whole buffer as a single final block.
pub use backward_references::encode_one_shot;
/// Identity-preserving window mask for a one-shot buffer.
pub use backward_references::mask_for;

/// One `(insert, copy)` step of the emitted command stream.
pub use command::Command;

/// Validated per-stream parameters and the quality → engine mapping.
pub use params::{HasherConfig, ParamError, Params};

/// Engine capability set and run-time dispatch.
pub use hasher::{EngineError, Hasher, MatchFinder, SearchResult};

/// Static-dictionary handle and its encoder-side index.
pub use dict::{Dictionary, DictionaryError, DictionaryIndex};

/// Distance cache seed for a fresh stream.
pub use distance_code::INITIAL_DISTANCE_CACHE;
