// e2e/pump_streaming.rs — black-box tests of the stream pump through
// the public library API.
//
// Fixtures are produced with the `brotli` encoder crate; the pump is
// exercised the way the binary drives it, over in-memory sources and
// sinks.

use std::io::{self, ErrorKind, Read, Write};

use brcat::alloc::AllocToken;
use brcat::engine::{Session, StepStatus};
use brcat::pump::{decompress, decompress_with_buffer_sizes, InputChunk, OutputChunk};

fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let params = brotli::enc::BrotliEncoderParams::default();
    brotli::BrotliCompress(&mut &data[..], &mut out, &params).unwrap();
    out
}

/// Deterministic mixed-entropy payload: compressible runs interleaved
/// with a byte counter.
fn payload(len: usize) -> Vec<u8> {
    (0..len)
        .map(|i| {
            if (i / 64) % 2 == 0 {
                b'x'
            } else {
                (i % 251) as u8
            }
        })
        .collect()
}

// ── Round trip ────────────────────────────────────────────────────────────────

#[test]
fn round_trip_various_sizes() {
    for len in [0usize, 1, 2, 4095, 4096, 4097, 1 << 18] {
        let original = payload(len);
        let compressed = compress(&original);

        let mut out = Vec::new();
        let n = decompress(&mut &compressed[..], &mut out)
            .unwrap_or_else(|e| panic!("len {len}: {e}"));
        assert_eq!(out, original, "len {len}");
        assert_eq!(n, len as u64, "len {len}");
    }
}

// ── Chunk-size independence ──────────────────────────────────────────────────

#[test]
fn output_is_independent_of_chunk_capacities() {
    let original = payload(200_000);
    let compressed = compress(&original);

    for in_cap in [1usize, 7, 4096, 1 << 20] {
        for out_cap in [1usize, 7, 4096, 1 << 20] {
            let mut out = Vec::new();
            let n = decompress_with_buffer_sizes(&mut &compressed[..], &mut out, in_cap, out_cap)
                .unwrap_or_else(|e| panic!("in={in_cap} out={out_cap}: {e}"));
            assert_eq!(out, original, "in={in_cap} out={out_cap}");
            assert_eq!(n, original.len() as u64);
        }
    }
}

// ── Truncation ───────────────────────────────────────────────────────────────

#[test]
fn every_proper_prefix_of_a_short_stream_truncates() {
    let compressed = compress(&payload(3000));

    for k in 1..compressed.len() {
        let mut out = Vec::new();
        let err = decompress(&mut &compressed[..k], &mut out)
            .expect_err("a proper prefix must never succeed");
        assert_eq!(err.kind(), ErrorKind::UnexpectedEof, "prefix len {k}");
    }
}

#[test]
fn empty_input_truncates_deterministically() {
    let mut out = Vec::new();
    let err = decompress(&mut io::empty(), &mut out).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedEof);
    assert_eq!(err.to_string(), "Unexpected EOF");
}

// ── Malformed input ──────────────────────────────────────────────────────────

#[test]
fn malformed_streams_terminate_with_an_error() {
    // A spread of corruption shapes; every one must terminate with a
    // fault, never hang and never produce a false success.
    let mut candidates: Vec<Vec<u8>> = vec![
        vec![0xff; 1024],
        vec![0x00; 1024],
        (0u8..=255).rev().cycle().take(2048).collect(),
    ];
    let mut flipped = compress(&payload(5000));
    for b in flipped.iter_mut().skip(2) {
        *b = !*b;
    }
    candidates.push(flipped);

    for (i, bad) in candidates.iter().enumerate() {
        let mut out = Vec::new();
        let result = decompress(&mut &bad[..], &mut out);
        assert!(result.is_err(), "candidate {i} must fail");
    }
}

#[test]
fn trailing_garbage_after_a_complete_stream_still_succeeds() {
    // The engine reports Success at the end of the stream; bytes after
    // it are never consumed.
    let original = payload(1000);
    let mut compressed = compress(&original);
    compressed.extend_from_slice(b"garbage past the end");

    let mut out = Vec::new();
    let n = decompress(&mut &compressed[..], &mut out).unwrap();
    assert_eq!(out, original);
    assert_eq!(n, original.len() as u64);
}

// ── Memory bound ─────────────────────────────────────────────────────────────

/// Write sink that counts and checksums without storing.
struct DigestSink {
    len: u64,
    sum: u64,
}

impl Write for DigestSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.len += buf.len() as u64;
        for &b in buf {
            self.sum = self.sum.wrapping_mul(31).wrapping_add(b as u64);
        }
        Ok(buf.len())
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn large_stream_decodes_through_constant_sized_chunks() {
    // 256 MiB of zeroes compresses to a sliver; decoding it through
    // 4 KiB chunks proves the pump never scales its own buffers with
    // the decoded size.
    let decoded_len: u64 = 256 << 20;
    let mut params = brotli::enc::BrotliEncoderParams::default();
    params.quality = 5;
    let mut compressed = Vec::new();
    brotli::BrotliCompress(
        &mut io::repeat(0).take(decoded_len),
        &mut compressed,
        &params,
    )
    .unwrap();
    assert!(compressed.len() < 1 << 20);

    let mut sink = DigestSink { len: 0, sum: 0 };
    let n = decompress(&mut &compressed[..], &mut sink).unwrap();
    assert_eq!(n, decoded_len);
    assert_eq!(sink.len, decoded_len);
    assert_eq!(sink.sum, 0, "a stream of zeroes digests to zero");
}

#[test]
fn session_memory_balances_after_success_and_failure() {
    let compressed = compress(&payload(10_000));

    // Success path.
    let token = AllocToken::new();
    {
        let mut session = Session::new(&token);
        let mut input = InputChunk::with_capacity(4096);
        let mut output = OutputChunk::with_capacity(4096);
        let mut src = &compressed[..];
        let mut sink = Vec::new();
        'outer: loop {
            let at_eof = input.refill(&mut src).unwrap() == 0;
            loop {
                output.reset();
                let st = session.step(&mut input, &mut output);
                output.flush(&mut sink).unwrap();
                match st {
                    StepStatus::NeedsMoreOutput => continue,
                    StepStatus::NeedsMoreInput => break,
                    _ => break 'outer,
                }
            }
            assert!(!at_eof, "fixture must be complete");
        }
        assert!(token.peak_live_bytes() > 0, "engine must have allocated");
    }
    assert_eq!(token.live_cells(), 0);
    assert_eq!(token.live_bytes(), 0);

    // Failure path: abandon a session mid-stream.
    let token = AllocToken::new();
    {
        let mut session = Session::new(&token);
        let mut input = InputChunk::with_capacity(64);
        let mut output = OutputChunk::with_capacity(64);
        let mut src = &compressed[..64.min(compressed.len())];
        input.refill(&mut src).unwrap();
        let _ = session.step(&mut input, &mut output);
        // dropped while the engine still holds internal state
    }
    assert_eq!(token.live_cells(), 0);
    assert_eq!(token.live_bytes(), 0);
}

// ── Fault propagation ────────────────────────────────────────────────────────

/// Source that fails with a real I/O error after a few bytes.
struct FailingSource<'a> {
    head: &'a [u8],
}

impl Read for FailingSource<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if self.head.is_empty() {
            return Err(io::Error::new(ErrorKind::BrokenPipe, "source went away"));
        }
        self.head.read(buf)
    }
}

#[test]
fn read_errors_propagate_unchanged() {
    let compressed = compress(&payload(100_000));
    let mut src = FailingSource {
        head: &compressed[..16],
    };
    let mut out = Vec::new();
    let err = decompress(&mut src, &mut out).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BrokenPipe);
}

/// Sink that accepts a bounded number of bytes, then reports `Ok(0)`.
struct CloggedSink {
    budget: usize,
}

impl Write for CloggedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        if self.budget == 0 {
            return Ok(0);
        }
        let n = buf.len().min(self.budget);
        self.budget -= n;
        Ok(n)
    }
    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

#[test]
fn short_writes_are_fatal() {
    let compressed = compress(&payload(100_000));
    let mut sink = CloggedSink { budget: 100 };
    let err = decompress(&mut &compressed[..], &mut sink).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteZero);
}
