// pump.rs — The stream pump: chunked read → decode → write loop.
//
// Moves bytes from a source through a decode session to a sink,
// respecting the engine's back-pressure signals.  Memory use is bounded
// by the two chunk capacities regardless of how large the decoded
// stream is: every output chunk is flushed to the sink before the next
// decode step reuses it.
//
// Fault taxonomy (all terminal, nothing is retried):
//   * truncation — source exhausted while the engine still needs input;
//     surfaced as `ErrorKind::UnexpectedEof` with message
//     "Unexpected EOF".
//   * decode     — the engine reports a malformed stream; surfaced as
//     `ErrorKind::InvalidData`.
//   * I/O        — a read or write on the source/sink fails; the error
//     is propagated as-is (a short write surfaces as
//     `ErrorKind::WriteZero` out of `write_all`).

use std::io::{self, ErrorKind, Read, Write};

use crate::alloc::AllocToken;
use crate::config::{INPUT_CHUNK_SIZE, OUTPUT_CHUNK_SIZE};
use crate::engine::{Session, StepStatus};

/// Message printed to stderr by the CLI on a truncation fault; also the
/// payload of the `UnexpectedEof` error the pump returns.
pub const UNEXPECTED_EOF_MSG: &str = "Unexpected EOF";

// ---------------------------------------------------------------------------
// Chunks
// ---------------------------------------------------------------------------

/// Fixed-capacity input buffer with a cursor and a remaining count.
///
/// Refilled from the source whenever the engine has drained it.
pub struct InputChunk {
    pub(crate) buf: Box<[u8]>,
    pub(crate) pos: usize,
    pub(crate) avail: usize,
}

impl InputChunk {
    pub fn with_capacity(capacity: usize) -> InputChunk {
        assert!(capacity != 0);
        InputChunk {
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            avail: 0,
        }
    }

    /// Reads up to one chunk capacity from `src`, resetting the cursor.
    ///
    /// Retries on `ErrorKind::Interrupted`.  Returns the number of
    /// bytes now available; `0` means the source has no more bytes.
    pub fn refill(&mut self, src: &mut impl Read) -> io::Result<usize> {
        self.pos = 0;
        loop {
            match src.read(&mut self.buf) {
                Ok(n) => {
                    self.avail = n;
                    return Ok(n);
                }
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e),
            }
        }
    }

    /// Bytes read into the chunk but not yet consumed by the engine.
    pub fn remaining(&self) -> usize {
        self.avail
    }
}

/// Fixed-capacity output buffer, reset and re-drained every inner
/// iteration of the pump.
pub struct OutputChunk {
    pub(crate) buf: Box<[u8]>,
    pub(crate) pos: usize,
    pub(crate) avail: usize,
}

impl OutputChunk {
    pub fn with_capacity(capacity: usize) -> OutputChunk {
        assert!(capacity != 0);
        OutputChunk {
            buf: vec![0u8; capacity].into_boxed_slice(),
            pos: 0,
            avail: capacity,
        }
    }

    /// Makes the whole capacity available to the next decode step.
    pub fn reset(&mut self) {
        self.pos = 0;
        self.avail = self.buf.len();
    }

    /// The portion the engine has produced since the last reset.
    pub fn filled(&self) -> &[u8] {
        &self.buf[..self.pos]
    }

    /// Writes the filled portion to `sink` and resets the chunk.
    ///
    /// `write_all` turns a short write into `ErrorKind::WriteZero`,
    /// which the caller treats as fatal.
    pub fn flush(&mut self, sink: &mut impl Write) -> io::Result<usize> {
        let produced = self.pos;
        if produced != 0 {
            sink.write_all(&self.buf[..produced])?;
        }
        self.reset();
        Ok(produced)
    }
}

// ---------------------------------------------------------------------------
// Driver loop
// ---------------------------------------------------------------------------

/// Decompresses `src` into `sink` with the default chunk sizes.
///
/// Returns the total number of decompressed bytes written.
pub fn decompress(src: &mut impl Read, sink: &mut impl Write) -> io::Result<u64> {
    decompress_with_buffer_sizes(src, sink, INPUT_CHUNK_SIZE, OUTPUT_CHUNK_SIZE)
}

/// Decompresses `src` into `sink` through chunks of the given
/// capacities.  Output bytes are identical for any capacities; only
/// I/O granularity changes.
///
/// # Errors
///
/// * `ErrorKind::UnexpectedEof` — the source ended while the engine
///   still needed input (truncation fault).
/// * `ErrorKind::InvalidData` — the engine reported a malformed stream.
/// * any error returned by `src.read` or `sink.write_all`.
pub fn decompress_with_buffer_sizes(
    src: &mut impl Read,
    sink: &mut impl Write,
    input_capacity: usize,
    output_capacity: usize,
) -> io::Result<u64> {
    let token = AllocToken::new();
    let mut session = Session::new(&token);
    let mut input = InputChunk::with_capacity(input_capacity);
    let mut output = OutputChunk::with_capacity(output_capacity);
    let mut total_written: u64 = 0;

    // Outer cycle: one source refill per iteration.  The session is
    // dropped (and its memory released) on every exit path below.
    let status = loop {
        let at_eof = input.refill(src)? == 0;

        // Inner cycle: keep stepping against the same input until the
        // engine asks for more or reaches a terminal status.  The
        // output chunk is flushed after every step, terminal or not.
        let status = loop {
            output.reset();
            let status = session.step(&mut input, &mut output);
            total_written += output.flush(sink)? as u64;
            if status != StepStatus::NeedsMoreOutput {
                break status;
            }
        };

        match status {
            StepStatus::NeedsMoreInput if at_eof => {
                return Err(io::Error::new(ErrorKind::UnexpectedEof, UNEXPECTED_EOF_MSG));
            }
            StepStatus::NeedsMoreInput => continue,
            terminal => break terminal,
        }
    };

    match status {
        StepStatus::Success => Ok(total_written),
        StepStatus::Failure => Err(io::Error::new(
            ErrorKind::InvalidData,
            "corrupt brotli stream",
        )),
        StepStatus::NeedsMoreInput | StepStatus::NeedsMoreOutput => unreachable!(),
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn brotli_fixture(data: &[u8]) -> Vec<u8> {
        let mut out = Vec::new();
        let params = brotli::enc::BrotliEncoderParams::default();
        brotli::BrotliCompress(&mut &data[..], &mut out, &params).unwrap();
        out
    }

    // -- chunk mechanics ----------------------------------------------------

    /// Reader that fails once with `Interrupted`, then yields its data.
    struct InterruptedOnce<'a> {
        data: &'a [u8],
        tripped: bool,
    }

    impl Read for InterruptedOnce<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            if !self.tripped {
                self.tripped = true;
                return Err(io::Error::new(ErrorKind::Interrupted, "signal"));
            }
            self.data.read(buf)
        }
    }

    #[test]
    fn refill_retries_on_interrupted() {
        let mut chunk = InputChunk::with_capacity(16);
        let mut src = InterruptedOnce {
            data: b"abc",
            tripped: false,
        };
        assert_eq!(chunk.refill(&mut src).unwrap(), 3);
        assert_eq!(chunk.remaining(), 3);
    }

    #[test]
    fn refill_reports_end_of_input() {
        let mut chunk = InputChunk::with_capacity(16);
        let mut src: &[u8] = b"";
        assert_eq!(chunk.refill(&mut src).unwrap(), 0);
        assert_eq!(chunk.remaining(), 0);
    }

    #[test]
    fn flush_writes_filled_prefix_and_resets() {
        let mut chunk = OutputChunk::with_capacity(8);
        chunk.buf[..5].copy_from_slice(b"hello");
        chunk.pos = 5;
        chunk.avail = 3;

        let mut sink = Vec::new();
        assert_eq!(chunk.flush(&mut sink).unwrap(), 5);
        assert_eq!(sink, b"hello");
        assert_eq!(chunk.pos, 0);
        assert_eq!(chunk.avail, 8);
        assert!(chunk.filled().is_empty());
    }

    #[test]
    fn flush_of_empty_chunk_writes_nothing() {
        let mut chunk = OutputChunk::with_capacity(8);
        let mut sink = Vec::new();
        assert_eq!(chunk.flush(&mut sink).unwrap(), 0);
        assert!(sink.is_empty());
    }

    /// Sink whose `write` returns `Ok(0)`, forcing `write_all` into
    /// `WriteZero`.
    struct FullSink;

    impl Write for FullSink {
        fn write(&mut self, _buf: &[u8]) -> io::Result<usize> {
            Ok(0)
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn short_write_surfaces_as_write_zero() {
        let mut chunk = OutputChunk::with_capacity(8);
        chunk.pos = 4;
        let err = chunk.flush(&mut FullSink).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::WriteZero);
    }

    // -- driver loop --------------------------------------------------------

    #[test]
    fn round_trip_small() {
        let original = b"stream pump round trip".to_vec();
        let compressed = brotli_fixture(&original);

        let mut out = Vec::new();
        let n = decompress(&mut &compressed[..], &mut out).unwrap();
        assert_eq!(out, original);
        assert_eq!(n, original.len() as u64);
    }

    #[test]
    fn empty_payload_stream_decodes_to_empty_output() {
        // A valid brotli encoding of zero bytes must succeed with empty
        // output (distinct from an empty *input*, which truncates).
        let compressed = brotli_fixture(b"");

        let mut out = Vec::new();
        let n = decompress(&mut &compressed[..], &mut out).unwrap();
        assert_eq!(n, 0);
        assert!(out.is_empty());
    }

    #[test]
    fn empty_input_is_a_truncation_fault() {
        let mut out = Vec::new();
        let err = decompress(&mut io::empty(), &mut out).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
        assert_eq!(err.to_string(), UNEXPECTED_EOF_MSG);
        assert!(out.is_empty());
    }

    #[test]
    fn truncated_stream_is_a_truncation_fault_never_success() {
        let original: Vec<u8> = (0u8..=255).cycle().take(64 * 1024).collect();
        let compressed = brotli_fixture(&original);
        assert!(compressed.len() > 8);

        for k in [1usize, 2, compressed.len() / 2, compressed.len() - 1] {
            let mut out = Vec::new();
            let result = decompress(&mut &compressed[..k], &mut out);
            let err = result.expect_err("prefix must never decode successfully");
            assert_eq!(err.kind(), ErrorKind::UnexpectedEof, "prefix len {k}");
        }
    }

    #[test]
    fn malformed_stream_terminates_with_an_error() {
        // Corrupt bytes must terminate with a fault, not hang or
        // silently succeed.  Depending on where the corruption lands the
        // engine reports either a decode fault or an input request that
        // EOF turns into truncation.
        let garbage = vec![0xffu8; 4096];
        let mut out = Vec::new();
        let err = decompress(&mut &garbage[..], &mut out).unwrap_err();
        assert!(
            err.kind() == ErrorKind::InvalidData || err.kind() == ErrorKind::UnexpectedEof,
            "unexpected kind: {:?}",
            err.kind()
        );
    }

    #[test]
    fn corrupted_valid_stream_terminates_with_an_error() {
        let original: Vec<u8> = b"payload ".iter().copied().cycle().take(8192).collect();
        let mut compressed = brotli_fixture(&original);
        for b in compressed.iter_mut().skip(4) {
            *b ^= 0xa5;
        }

        let mut out = Vec::new();
        assert!(decompress(&mut &compressed[..], &mut out).is_err());
    }

    #[test]
    fn chunk_size_does_not_change_output() {
        let original: Vec<u8> = (0u8..=255)
            .cycle()
            .enumerate()
            .map(|(i, b)| b.wrapping_mul((i >> 6) as u8))
            .take(128 * 1024)
            .collect();
        let compressed = brotli_fixture(&original);

        let mut reference = Vec::new();
        decompress_with_buffer_sizes(&mut &compressed[..], &mut reference, 4096, 4096).unwrap();
        assert_eq!(reference, original);

        for (in_cap, out_cap) in [(1usize, 1usize), (1, 4096), (4096, 1), (1 << 20, 1 << 20)] {
            let mut out = Vec::new();
            let n =
                decompress_with_buffer_sizes(&mut &compressed[..], &mut out, in_cap, out_cap)
                    .unwrap();
            assert_eq!(out, reference, "in_cap={in_cap} out_cap={out_cap}");
            assert_eq!(n, original.len() as u64);
        }
    }

    /// Sink that only counts, so large-stream tests stay O(chunk) in
    /// memory on the output side.
    struct CountingSink(u64);

    impl Write for CountingSink {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0 += buf.len() as u64;
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn large_stream_through_small_chunks() {
        // 32 MiB of highly compressible data pushed through 512-byte
        // chunks; the pump itself never buffers more than one chunk.
        let original = vec![0u8; 32 << 20];
        let mut params = brotli::enc::BrotliEncoderParams::default();
        params.quality = 5;
        let mut compressed = Vec::new();
        brotli::BrotliCompress(&mut &original[..], &mut compressed, &params).unwrap();

        let mut sink = CountingSink(0);
        let n =
            decompress_with_buffer_sizes(&mut &compressed[..], &mut sink, 512, 512).unwrap();
        assert_eq!(n, original.len() as u64);
        assert_eq!(sink.0, original.len() as u64);
    }

    #[test]
    #[should_panic]
    fn zero_input_capacity_is_rejected() {
        InputChunk::with_capacity(0);
    }

    #[test]
    #[should_panic]
    fn zero_output_capacity_is_rejected() {
        OutputChunk::with_capacity(0);
    }
}
