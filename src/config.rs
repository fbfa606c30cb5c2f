// config.rs — Compile-time configuration constants.
//
// The chunk capacities bound the driver's memory use: decoding an
// arbitrarily large stream never holds more than one input chunk plus
// one output chunk in addition to the engine's own session state.

/// Capacity of the input chunk refilled from the source each outer cycle.
pub const INPUT_CHUNK_SIZE: usize = 4096;

/// Capacity of the output chunk drained to the sink each inner cycle.
pub const OUTPUT_CHUNK_SIZE: usize = 4096;
