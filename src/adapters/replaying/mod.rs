//! Replaying adapters that serve recorded interactions from cassettes.

pub mod generative_model;

use std::sync::{Mutex, PoisonError};

use crate::cassette::replayer::CassetteReplayer;

/// Retrieve the next recorded output for a given port and method.
pub(crate) fn next_output(
    replayer: &Mutex<CassetteReplayer>,
    port: &str,
    method: &str,
) -> Result<serde_json::Value, String> {
    let mut guard = replayer.lock().unwrap_or_else(PoisonError::into_inner);
    guard.next_interaction(port, method).map(|i| i.output)
}

/// Deserialize a replayed output as `Result<T, String>`.
pub(crate) fn replay_result<T: serde::de::DeserializeOwned>(
    output: serde_json::Value,
) -> Result<T, String> {
    if let Some(err_val) = output.get("Err").or_else(|| output.get("err")) {
        return Err(err_val.as_str().unwrap_or("replayed error").to_string());
    }
    let ok_val = output.get("Ok").or_else(|| output.get("ok")).cloned().unwrap_or(output);
    serde_json::from_value(ok_val).map_err(|e| format!("Malformed recorded output: {e}"))
}
