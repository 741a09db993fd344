//! Replaying adapter for the `GenerativeModel` port.

use std::sync::{Arc, Mutex};

use super::{next_output, replay_result};
use crate::cassette::replayer::CassetteReplayer;
use crate::error::RelayError;
use crate::ports::generative_model::{
    ContentRequest, FileUpload, GenerativeModel, ModelFuture, ModelResponse, RemoteFile,
};

const PORT: &str = "generative_model";

/// Serves recorded model results from a cassette.
pub struct ReplayingGenerativeModel {
    replayer: Arc<Mutex<CassetteReplayer>>,
}

impl ReplayingGenerativeModel {
    /// Create a replaying model backed by the given replayer.
    #[must_use]
    pub fn new(replayer: Arc<Mutex<CassetteReplayer>>) -> Self {
        Self { replayer }
    }

    fn replay<T: serde::de::DeserializeOwned>(&self, method: &str) -> Result<T, RelayError> {
        let output = next_output(&self.replayer, PORT, method).map_err(RelayError::Replay)?;
        replay_result(output).map_err(RelayError::Replay)
    }
}

impl GenerativeModel for ReplayingGenerativeModel {
    fn generate_content(&self, _request: &ContentRequest) -> ModelFuture<'_, ModelResponse> {
        let result = self.replay("generate_content");
        Box::pin(async move { result })
    }

    fn upload_file(&self, _upload: &FileUpload) -> ModelFuture<'_, RemoteFile> {
        let result = self.replay("upload_file");
        Box::pin(async move { result })
    }

    fn delete_file(&self, _name: &str) -> ModelFuture<'_, ()> {
        let result = self.replay("delete_file");
        Box::pin(async move { result })
    }
}
