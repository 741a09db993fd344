//! Generative model port for the upstream Gemini API.

use std::future::Future;
use std::path::PathBuf;
use std::pin::Pin;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// One piece of content sent to the model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RequestPart {
    /// Plain text instruction or query.
    Text {
        /// The text.
        text: String,
    },
    /// Reference to media the model fetches itself (a video URL or an uploaded file).
    FileData {
        /// URI of the media.
        file_uri: String,
        /// MIME type, when known.
        #[serde(default)]
        mime_type: Option<String>,
    },
    /// Media sent inline with the request.
    InlineData {
        /// MIME type of the data.
        mime_type: String,
        /// Raw bytes (base64 on the wire and in cassettes).
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
}

impl RequestPart {
    /// Convenience constructor for a text part.
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }
}

/// Tools the model may use while answering.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Tool {
    /// Google Search grounding.
    GoogleSearch,
    /// Fetch and read URLs mentioned in the prompt.
    UrlContext,
}

/// Output modalities requested from the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Modality {
    /// Text output.
    Text,
    /// Image output.
    Image,
}

/// A single `generateContent` call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentRequest {
    /// The resolved model identifier (e.g., `"gemini-2.5-flash"`).
    pub model: String,
    /// Content parts, in order.
    pub parts: Vec<RequestPart>,
    /// Tools attached to the call.
    #[serde(default)]
    pub tools: Vec<Tool>,
    /// Requested output modalities; empty means the model default.
    #[serde(default)]
    pub response_modalities: Vec<Modality>,
}

impl ContentRequest {
    /// Create a request with no tools and default modalities.
    pub fn new(model: impl Into<String>, parts: Vec<RequestPart>) -> Self {
        Self { model: model.into(), parts, tools: Vec::new(), response_modalities: Vec::new() }
    }

    /// Attach tools.
    #[must_use]
    pub fn with_tools(mut self, tools: Vec<Tool>) -> Self {
        self.tools = tools;
        self
    }

    /// Request specific output modalities.
    #[must_use]
    pub fn with_modalities(mut self, modalities: Vec<Modality>) -> Self {
        self.response_modalities = modalities;
        self
    }
}

/// One part of a model response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Part {
    /// Text output.
    Text {
        /// The text.
        text: String,
    },
    /// Binary output, usually an image.
    InlineData {
        /// MIME type of the data.
        mime_type: String,
        /// Decoded bytes.
        #[serde(with = "base64_bytes")]
        data: Vec<u8>,
    },
    /// Anything else (function calls, executable code, ...).
    Other,
}

/// Parts of the first candidate of a model response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ModelResponse {
    /// Response parts in the order the model produced them.
    pub parts: Vec<Part>,
}

impl ModelResponse {
    /// Concatenate every text-bearing part in order, skipping the rest.
    #[must_use]
    pub fn concat_text(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                Part::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Index of the first part carrying binary data.
    #[must_use]
    pub fn first_inline_data(&self) -> Option<usize> {
        self.parts.iter().position(|part| matches!(part, Part::InlineData { .. }))
    }
}

/// A local file to push to the upstream Files API.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileUpload {
    /// Path of the local copy.
    pub path: PathBuf,
    /// MIME type of the file.
    pub mime_type: String,
    /// Name shown in the upstream file listing.
    pub display_name: String,
}

/// Handle to a file stored by the upstream Files API.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteFile {
    /// Resource name (`files/abc123`).
    pub name: String,
    /// URI to reference the file from a content part.
    pub uri: String,
    /// MIME type recorded upstream.
    pub mime_type: String,
}

/// Boxed future returned by [`GenerativeModel`] methods.
pub type ModelFuture<'a, T> = Pin<Box<dyn Future<Output = Result<T, RelayError>> + Send + 'a>>;

/// The upstream generative model.
pub trait GenerativeModel: Send + Sync {
    /// Run a `generateContent` call and return the first candidate's parts.
    fn generate_content(&self, request: &ContentRequest) -> ModelFuture<'_, ModelResponse>;

    /// Upload a local file and wait until it can be referenced.
    fn upload_file(&self, upload: &FileUpload) -> ModelFuture<'_, RemoteFile>;

    /// Delete a previously uploaded file.
    fn delete_file(&self, name: &str) -> ModelFuture<'_, ()>;
}

/// Serde helper for serializing `Vec<u8>` as base64 strings in cassettes.
mod base64_bytes {
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(data: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        let encoded = base64::engine::general_purpose::STANDARD.encode(data);
        serializer.serialize_str(&encoded)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let s = String::deserialize(deserializer)?;
        base64::engine::general_purpose::STANDARD.decode(&s).map_err(serde::de::Error::custom)
    }
}
