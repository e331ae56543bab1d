/// Background-audio monitor boundary and implementations.
pub mod monitor;
