/// Shared core types: frame rate, canvas, frame buffers, pixel math.
pub mod core;
/// Error taxonomy and result alias.
pub mod error;
