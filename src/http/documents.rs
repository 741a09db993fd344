//! Document content extraction endpoint.

use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::Json;
use serde::Serialize;

use super::form::UploadForm;
use super::AppState;
use crate::error::RelayError;
use crate::gateway::DOCUMENT_INSTRUCTION;
use crate::upload::StagedAsset;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct DocumentResponse {
    content: String,
    file_name: String,
}

pub(super) async fn extract(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DocumentResponse>, RelayError> {
    state.gateway.gate().verify()?;
    let multipart = multipart.map_err(|e| RelayError::InvalidArgument(e.body_text()))?;

    let mut form = UploadForm::read(multipart).await?;
    let upload = form.take_file()?;
    let instruction = form
        .field(&["prompt", "instruction"])
        .filter(|p| !p.trim().is_empty())
        .unwrap_or(DOCUMENT_INSTRUCTION)
        .to_string();

    let asset = StagedAsset::stage(&upload.bytes, &upload.file_name)?;
    let result = match asset.inspect() {
        Ok(()) => state.gateway.generate_from_asset(&asset, &instruction).await,
        Err(e) => Err(e),
    };
    if let Err(e) = asset.close() {
        tracing::warn!(file = %upload.file_name, "Failed to remove staged upload: {e}");
    }

    Ok(Json(DocumentResponse { content: result?, file_name: upload.file_name }))
}
