//! On-disk cassette layout.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A recorded session of upstream interactions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cassette {
    /// Human-readable name of the recording.
    pub name: String,
    /// When the recording was written.
    pub recorded_at: DateTime<Utc>,
    /// Git commit the recording was made from.
    pub commit: String,
    /// Interactions in the order they happened.
    #[serde(default)]
    pub interactions: Vec<Interaction>,
}

/// A single call through a port.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Interaction {
    /// Global sequence number within the cassette.
    pub seq: u64,
    /// Port name (e.g. `generative_model`).
    pub port: String,
    /// Method name on the port.
    pub method: String,
    /// Serialized call input.
    pub input: serde_json::Value,
    /// Serialized `{"Ok": ..}` or `{"Err": ".."}` output.
    pub output: serde_json::Value,
}
