// e2e/cli_integration.rs — CLI integration tests.
//
// Tests the `brcat` binary as a black-box filter using
// std::process::Command: stdin in, stdout out, exit codes and the
// stderr diagnostic line.

use std::fs;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use tempfile::TempDir;

/// Locate the `brcat` binary produced by Cargo.
fn brcat_bin() -> PathBuf {
    // CARGO_BIN_EXE_brcat is set by Cargo when running integration tests.
    // Fall back to walking up from the test binary location.
    if let Ok(p) = std::env::var("CARGO_BIN_EXE_brcat") {
        return PathBuf::from(p);
    }
    let mut p = std::env::current_exe().unwrap();
    p.pop(); // remove test binary filename
    if p.ends_with("deps") {
        p.pop();
    }
    p.push("brcat");
    p
}

fn compress(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::new();
    let params = brotli::enc::BrotliEncoderParams::default();
    brotli::BrotliCompress(&mut &data[..], &mut out, &params).unwrap();
    out
}

/// Run the binary with `input` piped to stdin; returns the Output.
fn run_with_stdin(input: &[u8]) -> std::process::Output {
    let mut child = Command::new(brcat_bin())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("failed to spawn brcat");
    child
        .stdin
        .as_mut()
        .unwrap()
        .write_all(input)
        .expect("failed to write to brcat stdin");
    child.wait_with_output().expect("failed to wait for brcat")
}

// ── 1. Round trip through the pipe ───────────────────────────────────────────

#[test]
fn test_cli_round_trip() {
    let original = "Hello, brotli!\n".repeat(341).into_bytes(); // ~5 KB
    let output = run_with_stdin(&compress(&original));

    assert!(output.status.success(), "decode should exit 0");
    assert_eq!(output.stdout, original, "stdout must match original bytes");
    assert!(
        output.stderr.is_empty(),
        "nothing on stderr for a clean decode"
    );
}

// ── 2. Binary payloads pass through unmangled ────────────────────────────────

#[test]
fn test_cli_round_trip_binary() {
    let original: Vec<u8> = (0u8..=255).cycle().take(100_000).collect();
    let output = run_with_stdin(&compress(&original));

    assert!(output.status.success());
    assert_eq!(output.stdout, original);
}

// ── 3. Empty compressed payload ──────────────────────────────────────────────

#[test]
fn test_cli_empty_payload() {
    // A valid encoding of zero bytes decodes to empty output, exit 0.
    let output = run_with_stdin(&compress(b""));

    assert!(output.status.success(), "empty payload should exit 0");
    assert!(output.stdout.is_empty());
}

// ── 4. Empty stdin is a truncation fault ─────────────────────────────────────

#[test]
fn test_cli_empty_input() {
    let output = run_with_stdin(b"");

    assert_eq!(output.status.code(), Some(1), "empty stdin should exit 1");
    assert!(output.stdout.is_empty());
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "Unexpected EOF"
    );
}

// ── 5. Truncated stream ──────────────────────────────────────────────────────

#[test]
fn test_cli_truncated_stream() {
    let compressed = compress(&vec![0x42u8; 1 << 16]);
    assert!(compressed.len() > 4);

    let output = run_with_stdin(&compressed[..compressed.len() / 2]);

    assert_eq!(
        output.status.code(),
        Some(1),
        "truncated stream should exit 1"
    );
    assert_eq!(
        String::from_utf8_lossy(&output.stderr).trim(),
        "Unexpected EOF"
    );
}

// ── 6. Corrupt stream exits non-zero ─────────────────────────────────────────

#[test]
fn test_cli_corrupt_stream() {
    let mut bad = compress(&vec![0x42u8; 1 << 16]);
    for b in bad.iter_mut().skip(2) {
        *b = !*b;
    }

    let output = run_with_stdin(&bad);

    assert!(
        !output.status.success(),
        "corrupt stream should exit non-zero"
    );
    assert!(
        !output.stderr.is_empty(),
        "a diagnostic should be printed on stderr"
    );
}

// ── 7. Stdin redirected from a file ──────────────────────────────────────────

#[test]
fn test_cli_stdin_from_file() {
    let dir = TempDir::new().unwrap();
    let original = b"file-redirect round trip".repeat(512);
    let path = dir.path().join("input.br");
    fs::write(&path, compress(&original)).unwrap();

    let output = Command::new(brcat_bin())
        .stdin(fs::File::open(&path).unwrap())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("failed to run brcat");

    assert!(output.status.success());
    assert_eq!(output.stdout, original);
}
