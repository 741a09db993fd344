//! Upstream credential check shared by every protected operation.

use std::sync::Arc;

use crate::config::GEMINI_KEY_ENV;
use crate::error::RelayError;

/// Holds the Gemini API key read once at startup.
///
/// Cloning is cheap; all clones observe the same key.
#[derive(Clone)]
pub struct CredentialGate {
    api_key: Option<Arc<str>>,
}

impl CredentialGate {
    /// Create a gate from an optional key. Blank keys count as absent.
    #[must_use]
    pub fn new(api_key: Option<String>) -> Self {
        Self { api_key: api_key.filter(|k| !k.trim().is_empty()).map(Arc::from) }
    }

    /// Whether a key is present.
    #[must_use]
    pub fn is_configured(&self) -> bool {
        self.api_key.is_some()
    }

    /// Return the key, or the fixed missing-credential error.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::MissingApiKey`] when no key was configured.
    pub fn verify(&self) -> Result<&str, RelayError> {
        self.api_key
            .as_deref()
            .ok_or_else(|| RelayError::MissingApiKey { env_var: GEMINI_KEY_ENV.to_string() })
    }
}

impl std::fmt::Debug for CredentialGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialGate").field("configured", &self.is_configured()).finish()
    }
}
