/// Caption shaping and measurement.
pub mod shape;
/// Greedy caption word wrap.
pub mod wrap;
