//! Relay operations built on the generative model port.
//!
//! Each operation checks the credential gate, builds one upstream request and
//! normalizes the response into text or image bytes.

use std::sync::Arc;

use crate::credential::CredentialGate;
use crate::error::RelayError;
use crate::model::ModelRoles;
use crate::ports::generative_model::{
    ContentRequest, GenerativeModel, Modality, ModelResponse, Part, RequestPart, Tool,
};
use crate::upload::StagedAsset;

/// Instruction used when a summary request carries no prompt.
pub const DEFAULT_SUMMARY_PROMPT: &str = "Please summarize the video. 輸出繁體中文";

/// Instruction used for document extraction when the client sends none.
pub const DOCUMENT_INSTRUCTION: &str = "Extract the complete textual content of the attached \
file. Preserve the reading order, headings, lists and tables (as Markdown tables). For images, \
transcribe any visible text and then describe the image in one short paragraph. Return only the \
extracted content without commentary.";

/// Which retrieval tools to attach to a grounded query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroundingOptions {
    /// Attach Google Search.
    pub use_search: bool,
    /// Attach URL context retrieval.
    pub use_url_context: bool,
}

impl Default for GroundingOptions {
    fn default() -> Self {
        Self { use_search: true, use_url_context: true }
    }
}

impl GroundingOptions {
    fn tools(self) -> Vec<Tool> {
        let mut tools = Vec::new();
        if self.use_url_context {
            tools.push(Tool::UrlContext);
        }
        if self.use_search {
            tools.push(Tool::GoogleSearch);
        }
        tools
    }
}

/// Image produced from a text prompt.
#[derive(Debug, Clone)]
pub struct GeneratedImage {
    /// Raw image bytes as returned by the model.
    pub data: Vec<u8>,
    /// MIME type reported by the model.
    pub mime_type: String,
    /// Text parts the model emitted before the image.
    pub commentary: Vec<String>,
}

/// Image produced by editing a client image.
#[derive(Debug, Clone)]
pub struct EditedImage {
    /// Raw image bytes as returned by the model.
    pub data: Vec<u8>,
    /// MIME type reported by the model.
    pub mime_type: String,
    /// First text part following the image, if any.
    pub message: Option<String>,
}

/// Model client shared by all handlers. Read-only after construction.
pub struct Gateway {
    model: Arc<dyn GenerativeModel>,
    gate: CredentialGate,
    models: ModelRoles,
}

impl Gateway {
    /// Create a gateway over a model implementation.
    #[must_use]
    pub fn new(model: Arc<dyn GenerativeModel>, gate: CredentialGate, models: ModelRoles) -> Self {
        Self { model, gate, models }
    }

    /// The credential gate protecting upstream calls.
    #[must_use]
    pub fn gate(&self) -> &CredentialGate {
        &self.gate
    }

    /// Summarize media the model can fetch by URI (e.g. a `YouTube` video).
    ///
    /// # Errors
    ///
    /// Returns the credential error or the upstream failure.
    pub async fn summarize_media(&self, media_uri: &str, prompt: &str) -> Result<String, RelayError> {
        self.gate.verify()?;
        let request = ContentRequest::new(
            &self.models.text,
            vec![
                RequestPart::FileData { file_uri: media_uri.to_string(), mime_type: None },
                RequestPart::text(prompt),
            ],
        );
        let response = self.model.generate_content(&request).await?;
        tracing::info!(media_uri, "Summarized media");
        Ok(response.concat_text())
    }

    /// Answer a query, optionally grounded with search and URL context.
    ///
    /// Text parts are concatenated in response order; other parts are skipped.
    ///
    /// # Errors
    ///
    /// Returns the credential error or the upstream failure.
    pub async fn grounded_query(
        &self,
        query: &str,
        options: GroundingOptions,
    ) -> Result<String, RelayError> {
        self.gate.verify()?;
        let request = ContentRequest::new(&self.models.text, vec![RequestPart::text(query)])
            .with_tools(options.tools())
            .with_modalities(vec![Modality::Text]);
        let response = self.model.generate_content(&request).await?;
        tracing::info!(search = options.use_search, url_context = options.use_url_context, "Answered grounded query");
        Ok(response.concat_text())
    }

    /// Upload a staged asset, extract its content, then delete the remote copy.
    ///
    /// Remote deletion is best-effort: a failure is logged and does not
    /// affect the result.
    ///
    /// # Errors
    ///
    /// Returns the credential error, the upload or generation failure, or
    /// [`RelayError::Generation`] when the model returns no text.
    pub async fn generate_from_asset(
        &self,
        asset: &StagedAsset,
        instruction: &str,
    ) -> Result<String, RelayError> {
        self.gate.verify()?;
        let remote = self.model.upload_file(&asset.to_upload()).await?;
        tracing::debug!(remote = %remote.name, original = asset.original_name(), "Uploaded asset");

        let request = ContentRequest::new(
            &self.models.text,
            vec![
                RequestPart::FileData {
                    file_uri: remote.uri.clone(),
                    mime_type: Some(remote.mime_type.clone()),
                },
                RequestPart::text(instruction),
            ],
        );
        let result = self.model.generate_content(&request).await;

        if let Err(e) = self.model.delete_file(&remote.name).await {
            tracing::warn!(remote = %remote.name, "Failed to delete uploaded file: {e}");
        }

        let text = result?.concat_text();
        if text.trim().is_empty() {
            return Err(RelayError::Generation(format!(
                "The model returned no text for '{}'",
                asset.original_name()
            )));
        }
        tracing::info!(original = asset.original_name(), chars = text.len(), "Extracted asset content");
        Ok(text)
    }

    /// Generate an image from a text prompt.
    ///
    /// # Errors
    ///
    /// Returns the credential error, the upstream failure, or
    /// [`RelayError::Generation`] when no part carries image data.
    pub async fn generate_image(&self, prompt: &str) -> Result<GeneratedImage, RelayError> {
        self.gate.verify()?;
        let request = ContentRequest::new(&self.models.image, vec![RequestPart::text(prompt)])
            .with_modalities(vec![Modality::Text, Modality::Image]);
        let response = self.model.generate_content(&request).await?;

        let (index, data, mime_type) = first_image(&response)?;
        let commentary = texts(&response.parts[..index]);
        for text in &commentary {
            tracing::debug!(model_output = %text, "Model commentary");
        }
        Ok(GeneratedImage { data, mime_type, commentary })
    }

    /// Edit a client image according to a prompt.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Decode`] when the source is not an image, the
    /// credential error, the upstream failure, or [`RelayError::Generation`]
    /// when no part carries image data.
    pub async fn edit_image(&self, prompt: &str, source: &[u8]) -> Result<EditedImage, RelayError> {
        self.gate.verify()?;
        let format = image::guess_format(source)
            .map_err(|e| RelayError::Decode(format!("Unrecognized source image: {e}")))?;
        image::load_from_memory_with_format(source, format)
            .map_err(|e| RelayError::Decode(format!("Failed to decode source image: {e}")))?;

        let request = ContentRequest::new(
            &self.models.image,
            vec![
                RequestPart::text(prompt),
                RequestPart::InlineData {
                    mime_type: format.to_mime_type().to_string(),
                    data: source.to_vec(),
                },
            ],
        )
        .with_modalities(vec![Modality::Text, Modality::Image]);
        let response = self.model.generate_content(&request).await?;

        let (index, data, mime_type) = first_image(&response)?;
        for text in texts(&response.parts[..index]) {
            tracing::debug!(model_output = %text, "Model commentary");
        }
        let message = texts(&response.parts[index + 1..]).into_iter().next();
        Ok(EditedImage { data, mime_type, message })
    }
}

/// The first part carrying binary data, with its index.
fn first_image(response: &ModelResponse) -> Result<(usize, Vec<u8>, String), RelayError> {
    let index = response.first_inline_data().ok_or_else(|| {
        let said = response.concat_text();
        if said.trim().is_empty() {
            RelayError::Generation("The model did not return an image".to_string())
        } else {
            RelayError::Generation(format!("The model did not return an image: {}", said.trim()))
        }
    })?;
    match &response.parts[index] {
        Part::InlineData { mime_type, data } => Ok((index, data.clone(), mime_type.clone())),
        _ => Err(RelayError::Generation("The model did not return an image".to_string())),
    }
}

fn texts(parts: &[Part]) -> Vec<String> {
    parts
        .iter()
        .filter_map(|part| match part {
            Part::Text { text } if !text.trim().is_empty() => Some(text.trim().to_string()),
            _ => None,
        })
        .collect()
}
