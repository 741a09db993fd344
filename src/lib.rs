//! Gemini relay - HTTP façade over the Gemini API.
//!
//! Summarizes media by URL, answers search-grounded queries, extracts the
//! content of uploaded documents, and generates or edits images that are
//! stored locally for download.

pub mod adapters;
pub mod cassette;
pub mod cli;
pub mod config;
pub mod context;
pub mod credential;
pub mod error;
pub mod gateway;
pub mod http;
pub mod model;
pub mod params;
pub mod ports;
pub mod storage;
pub mod upload;
