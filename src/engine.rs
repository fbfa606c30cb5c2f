// engine.rs — Narrow seam over the external decoder engine.
//
// This is the only module that names `brotli_decompressor` types.  The
// session is an opaque resource: created once, stepped until a terminal
// status, and cleaned up exactly once when dropped (the engine state
// frees its cells on drop), whichever way the pump exits.

use std::rc::Rc;

use brotli_decompressor::{BrotliDecompressStream, BrotliResult, BrotliState, HuffmanCode};

use crate::alloc::{AllocToken, TrackingAlloc};
use crate::pump::{InputChunk, OutputChunk};

/// Outcome of one incremental decode step.
///
/// `Success` and `Failure` are terminal; the two back-pressure variants
/// drive further pump iterations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepStatus {
    /// The engine consumed the input it was given and needs more.
    NeedsMoreInput,
    /// The engine filled the output chunk and still has buffered work.
    NeedsMoreOutput,
    /// The stream decoded completely.
    Success,
    /// The stream is malformed; no further progress is possible.
    Failure,
}

impl StepStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, StepStatus::Success | StepStatus::Failure)
    }
}

type EngineState = BrotliState<TrackingAlloc<u8>, TrackingAlloc<u32>, TrackingAlloc<HuffmanCode>>;

/// One decode context, exclusively owned by the pump for its lifetime.
///
/// Dropping the session drops the engine state, whose own cleanup
/// returns every internal buffer through the tracking allocators, so
/// the [`AllocToken`] balances to zero on every exit path.
pub struct Session {
    state: EngineState,
    total_out: usize,
}

impl Session {
    /// Creates a session whose internal buffers are all charged against
    /// `token`.  The three typed allocators share that token by `Rc`
    /// identity.
    pub fn new(token: &Rc<AllocToken>) -> Session {
        let alloc_u8 = TrackingAlloc::new(token.clone(), 0u8);
        let alloc_u32 = TrackingAlloc::new(token.clone(), 0u32);
        let alloc_hc = TrackingAlloc::new(token.clone(), HuffmanCode::default());
        debug_assert!(Rc::ptr_eq(alloc_u8.token(), alloc_u32.token()));
        debug_assert!(Rc::ptr_eq(alloc_u8.token(), alloc_hc.token()));
        Session {
            state: BrotliState::new(alloc_u8, alloc_u32, alloc_hc),
            total_out: 0,
        }
    }

    /// Runs one incremental decode step: consumes as much of `input` as
    /// the engine can take, produces as much into `output` as fits, and
    /// advances both cursors in place.
    pub fn step(&mut self, input: &mut InputChunk, output: &mut OutputChunk) -> StepStatus {
        let result = BrotliDecompressStream(
            &mut input.avail,
            &mut input.pos,
            &input.buf,
            &mut output.avail,
            &mut output.pos,
            &mut output.buf,
            &mut self.total_out,
            &mut self.state,
        );
        match result {
            BrotliResult::NeedsMoreInput => StepStatus::NeedsMoreInput,
            BrotliResult::NeedsMoreOutput => StepStatus::NeedsMoreOutput,
            BrotliResult::ResultSuccess => StepStatus::Success,
            BrotliResult::ResultFailure => StepStatus::Failure,
        }
    }

    /// Running count of bytes produced across the session, as reported
    /// by the engine.  Monotonically non-decreasing; informational.
    pub fn total_out(&self) -> u64 {
        self.total_out as u64
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
