//! Binary entry point for the `brcat` command-line tool.
//!
//! No flags, no arguments: stdin is the compressed stream, stdout the
//! decoded stream.  All resources (the decode session included) are
//! released via RAII on every exit path.
//!
//! # Exit codes
//!
//! * `0` — the stream decoded completely.
//! * `1` — truncation fault (stderr: `Unexpected EOF`), decode fault,
//!   or a read failure on stdin.
//! * abort — the sink accepted fewer bytes than requested
//!   (`WriteZero`); an invariant violation, not a recoverable state.

use std::io::{self, ErrorKind, Write};

use brcat::pump::{decompress, UNEXPECTED_EOF_MSG};

/// Maps the pump outcome to a process exit code, printing diagnostics.
///
/// `WriteZero` aborts whichever write surfaced it — the in-loop chunk
/// flushes and the final stdout flush follow the same policy.
fn exit_code(result: io::Result<u64>) -> i32 {
    match result {
        Ok(_total) => 0,
        Err(e) if e.kind() == ErrorKind::UnexpectedEof => {
            eprintln!("{}", UNEXPECTED_EOF_MSG);
            1
        }
        Err(e) if e.kind() == ErrorKind::WriteZero => {
            eprintln!("brcat: {}", e);
            std::process::abort()
        }
        Err(e) => {
            eprintln!("brcat: {}", e);
            1
        }
    }
}

/// Pump stdin to stdout and map the outcome to a process exit code.
fn run() -> i32 {
    let stdin = io::stdin();
    let stdout = io::stdout();
    let mut src = stdin.lock();
    let mut sink = stdout.lock();

    let result = decompress(&mut src, &mut sink).and_then(|total| {
        sink.flush()?;
        Ok(total)
    });
    exit_code(result)
}

fn main() {
    std::process::exit(run());
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
