/// Frame pacing boundary and implementations.
pub mod pacer;
/// The compose session: sequencer loop and production wiring.
pub mod session;
