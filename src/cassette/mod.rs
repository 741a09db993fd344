//! Cassettes: YAML recordings of model interactions, replayed in order.

pub mod format;
pub mod loader;
pub mod recorder;
pub mod replayer;
