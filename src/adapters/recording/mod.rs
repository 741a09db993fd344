//! Recording adapters that capture interactions to cassettes.

pub mod generative_model;

use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;

use crate::cassette::recorder::CassetteRecorder;

/// Record a `Result<T, E>` interaction using the Ok/Err JSON convention.
pub(crate) fn record_result<T, E, I>(
    recorder: &Arc<Mutex<CassetteRecorder>>,
    port: &str,
    method: &str,
    input: &I,
    result: &Result<T, E>,
) where
    T: Serialize,
    E: std::fmt::Display,
    I: Serialize,
{
    let output = match result {
        Ok(v) => serde_json::to_value(v).map(|inner| serde_json::json!({ "Ok": inner })),
        Err(e) => Ok(serde_json::json!({ "Err": e.to_string() })),
    };

    match (serde_json::to_value(input), output) {
        (Ok(input_json), Ok(output_json)) => {
            let mut guard = recorder.lock().unwrap_or_else(PoisonError::into_inner);
            guard.record(port, method, input_json, output_json);
        }
        (Err(e), _) | (_, Err(e)) => {
            tracing::warn!(port, method, "Skipping unserializable interaction: {e}");
        }
    }
}
