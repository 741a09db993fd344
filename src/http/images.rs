//! Image generation, editing and download endpoints.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::JsonRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use base64::Engine;
use serde::{Deserialize, Serialize};

use super::form::UploadForm;
use super::AppState;
use crate::error::RelayError;
use crate::params::{parse_form_bool, validate_required};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct TextToImageRequest {
    prompt: String,
    #[serde(default, alias = "return_base64")]
    return_base64: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ImageResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    image_base64: Option<String>,
    message: String,
    filename: String,
}

pub(super) async fn text_to_image(
    State(state): State<AppState>,
    payload: Result<Json<TextToImageRequest>, JsonRejection>,
) -> Result<Json<ImageResponse>, RelayError> {
    state.gateway.gate().verify()?;
    let Json(request) = payload.map_err(|e| RelayError::InvalidArgument(e.body_text()))?;
    validate_required("prompt", &request.prompt).map_err(RelayError::InvalidArgument)?;

    let image = state.gateway.generate_image(&request.prompt).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&image.data);
    let stored = state.images.persist(&encoded, request.return_base64)?;

    Ok(Json(ImageResponse {
        image_base64: stored.image_base64,
        message: "Image generated successfully".to_string(),
        filename: stored.filename,
    }))
}

pub(super) async fn edit_image(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImageResponse>, RelayError> {
    state.gateway.gate().verify()?;
    let multipart = multipart.map_err(|e| RelayError::InvalidArgument(e.body_text()))?;

    let mut form = UploadForm::read(multipart).await?;
    let prompt = form.field(&["prompt"]).unwrap_or_default().to_string();
    validate_required("prompt", &prompt).map_err(RelayError::InvalidArgument)?;
    let return_base64 = form
        .field(&["returnBase64", "return_base64"])
        .map(|v| parse_form_bool("returnBase64", v))
        .transpose()
        .map_err(RelayError::InvalidArgument)?
        .unwrap_or(false);
    let source = form.take_file()?;

    let edited = state.gateway.edit_image(&prompt, &source.bytes).await?;
    let encoded = base64::engine::general_purpose::STANDARD.encode(&edited.data);
    let stored = state.images.persist(&encoded, return_base64)?;

    let message = match edited.message {
        Some(note) => format!("Image edited successfully. {note}"),
        None => "Image edited successfully.".to_string(),
    };

    Ok(Json(ImageResponse { image_base64: stored.image_base64, message, filename: stored.filename }))
}

pub(super) async fn download(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, RelayError> {
    serve_png(&state, &filename, "attachment").await
}

pub(super) async fn view(
    State(state): State<AppState>,
    Path(filename): Path<String>,
) -> Result<Response, RelayError> {
    serve_png(&state, &filename, "inline").await
}

async fn serve_png(state: &AppState, filename: &str, disposition: &str) -> Result<Response, RelayError> {
    let path = state.images.resolve(filename)?;
    let bytes = tokio::fs::read(&path).await.map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            RelayError::NotFound(format!("Image '{filename}' does not exist"))
        }
        _ => RelayError::Io(e),
    })?;

    Ok((
        [
            (header::CONTENT_TYPE, "image/png".to_string()),
            (header::CONTENT_DISPOSITION, format!("{disposition}; filename=\"{filename}\"")),
        ],
        bytes,
    )
        .into_response())
}
