//! Implementations of the [`GenerativeModel`](crate::ports::GenerativeModel) port.
//!
//! `live` talks to Gemini over HTTPS. `recording` wraps any model and writes
//! its interactions to a cassette, and `replaying` serves them back offline.

pub mod live;
pub mod recording;
pub mod replaying;
