//! Feeds arbitrary bytes to the stream pump.  The pump must terminate
//! with Success or a fault for any input — never panic, hang, or leak.

#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut out = std::io::sink();
    let _ = brcat::pump::decompress(&mut &data[..], &mut out);

    // Tiny chunks stress the cursor bookkeeping on the same input.
    let mut out = std::io::sink();
    let _ = brcat::pump::decompress_with_buffer_sizes(&mut &data[..], &mut out, 3, 3);
});
