// brcat — streaming brotli decompressor for pipes.

//! Decodes a brotli-compressed byte stream incrementally through
//! fixed-size chunks, so memory use stays proportional to the chunk
//! capacities rather than to the decoded size.
//!
//! The decoding algorithm itself lives in the external
//! `brotli-decompressor` crate; this crate only drives it:
//!
//! * [`alloc`] — heap allocators that charge every engine allocation
//!   against an explicit accounting token.
//! * [`engine`] — the narrow seam over the external decoder: an opaque
//!   [`Session`](engine::Session) plus the four-way
//!   [`StepStatus`](engine::StepStatus).
//! * [`pump`] — the chunked read → decode → write loop.

pub mod alloc;
pub mod config;
pub mod engine;
pub mod pump;

// ── Top-level re-exports ──────────────────────────────────────────────────────
pub use alloc::{AllocToken, TrackingAlloc};
pub use engine::{Session, StepStatus};
pub use pump::{decompress, decompress_with_buffer_sizes, UNEXPECTED_EOF_MSG};
