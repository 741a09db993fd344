//! Recording adapter for the `GenerativeModel` port.

use std::sync::{Arc, Mutex};

use super::record_result;
use crate::cassette::recorder::CassetteRecorder;
use crate::ports::generative_model::{
    ContentRequest, FileUpload, GenerativeModel, ModelFuture, ModelResponse, RemoteFile,
};

const PORT: &str = "generative_model";

/// Records model interactions while delegating to an inner implementation.
pub struct RecordingGenerativeModel {
    inner: Arc<dyn GenerativeModel>,
    recorder: Arc<Mutex<CassetteRecorder>>,
}

impl RecordingGenerativeModel {
    /// Creates a new recording model wrapping the given implementation.
    pub fn new(inner: Arc<dyn GenerativeModel>, recorder: Arc<Mutex<CassetteRecorder>>) -> Self {
        Self { inner, recorder }
    }
}

impl GenerativeModel for RecordingGenerativeModel {
    fn generate_content(&self, request: &ContentRequest) -> ModelFuture<'_, ModelResponse> {
        let request = request.clone();
        Box::pin(async move {
            let result = self.inner.generate_content(&request).await;
            record_result(&self.recorder, PORT, "generate_content", &request, &result);
            result
        })
    }

    fn upload_file(&self, upload: &FileUpload) -> ModelFuture<'_, RemoteFile> {
        let upload = upload.clone();
        Box::pin(async move {
            let result = self.inner.upload_file(&upload).await;
            record_result(&self.recorder, PORT, "upload_file", &upload, &result);
            result
        })
    }

    fn delete_file(&self, name: &str) -> ModelFuture<'_, ()> {
        let name = name.to_string();
        Box::pin(async move {
            let result = self.inner.delete_file(&name).await;
            let input = serde_json::json!({ "name": name });
            record_result(&self.recorder, PORT, "delete_file", &input, &result);
            result
        })
    }
}
