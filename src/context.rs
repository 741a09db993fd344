//! Service context that bundles the model port and its credential gate.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use crate::adapters::live::gemini::GeminiClient;
use crate::adapters::recording::generative_model::RecordingGenerativeModel;
use crate::adapters::replaying::generative_model::ReplayingGenerativeModel;
use crate::cassette::loader::load_cassette;
use crate::cassette::recorder::CassetteRecorder;
use crate::config::Config;
use crate::credential::CredentialGate;
use crate::error::RelayError;
use crate::gateway::Gateway;
use crate::model::ModelRoles;
use crate::ports::GenerativeModel;

/// How the relay reaches the model.
pub struct ServiceContext {
    /// Generative model port.
    pub model: Arc<dyn GenerativeModel>,
    /// Credential gate checked before every upstream call.
    pub gate: CredentialGate,
}

/// Handle to a recording session; flush it before exiting.
pub struct RecordingSession {
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingSession {
    /// Write the cassette recorded so far to disk.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be written.
    pub fn flush(&self) -> Result<PathBuf, String> {
        let recorder = self.recorder.lock().unwrap_or_else(PoisonError::into_inner);
        recorder.flush().map_err(|e| format!("Failed to write cassette: {e}"))
    }
}

impl ServiceContext {
    /// Create a live context. A missing key is not fatal here: the gate
    /// rejects protected calls instead.
    #[must_use]
    pub fn live(config: &Config) -> Self {
        let gate = CredentialGate::new(config.gemini_key());
        let model = Arc::new(GeminiClient::new(gate.clone()));
        Self { model, gate }
    }

    /// Create a recording context that wraps the live client with a recorder.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingApiKey`]: recording without a key would
    /// only capture credential errors.
    pub fn recording(config: &Config) -> Result<(Self, RecordingSession), RelayError> {
        let live = Self::live(config);
        live.gate.verify()?;

        let timestamp = chrono::Utc::now().format("%Y-%m-%dT%H-%M-%S").to_string();
        let path = PathBuf::from(".gemini-relay/cassettes")
            .join(&timestamp)
            .join("generative_model.cassette.yaml");
        let recorder = Arc::new(Mutex::new(CassetteRecorder::new(
            path,
            format!("{timestamp}-generative_model"),
            get_commit_hash(),
        )));

        let model = Arc::new(RecordingGenerativeModel::new(live.model, Arc::clone(&recorder)));
        Ok((Self { model, gate: live.gate }, RecordingSession { recorder }))
    }

    /// Create a replaying context from a cassette file.
    ///
    /// Replayed interactions never reach the network, so the gate is
    /// satisfied with a placeholder key.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette file cannot be loaded.
    pub fn replaying(path: &Path) -> Result<Self, RelayError> {
        let replayer = load_cassette(path)
            .map_err(|e| RelayError::Config(format!("Failed to load cassette: {e}")))?;
        let model = Arc::new(ReplayingGenerativeModel::new(Arc::new(Mutex::new(replayer))));
        Ok(Self { model, gate: CredentialGate::new(Some("replay".to_string())) })
    }

    /// Build the gateway handlers share.
    #[must_use]
    pub fn into_gateway(self, models: ModelRoles) -> Gateway {
        Gateway::new(self.model, self.gate, models)
    }
}

/// Get the current git commit hash, or "unknown" if unavailable.
fn get_commit_hash() -> String {
    std::process::Command::new("git")
        .args(["rev-parse", "HEAD"])
        .output()
        .ok()
        .filter(|o| o.status.success())
        .and_then(|o| String::from_utf8(o.stdout).ok())
        .map_or_else(|| "unknown".to_string(), |s| s.trim().to_string())
}
