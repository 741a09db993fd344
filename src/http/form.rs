//! Multipart form collection.

use std::collections::HashMap;

use axum::extract::multipart::MultipartError;
use axum::extract::Multipart;
use axum::http::StatusCode;

use crate::error::RelayError;

/// File part of a multipart form.
pub(super) struct FormFile {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

/// Text fields plus the `file` part of a multipart form.
pub(super) struct UploadForm {
    fields: HashMap<String, String>,
    file: Option<FormFile>,
}

impl UploadForm {
    /// Drain the multipart stream. Only the part named `file` is kept as bytes.
    pub async fn read(mut multipart: Multipart) -> Result<Self, RelayError> {
        let mut fields = HashMap::new();
        let mut file = None;

        while let Some(field) = multipart.next_field().await.map_err(invalid)? {
            let name = field.name().unwrap_or_default().to_string();
            if name == "file" {
                let file_name = field.file_name().unwrap_or("upload").to_string();
                let bytes = field.bytes().await.map_err(invalid)?.to_vec();
                file = Some(FormFile { file_name, bytes });
            } else {
                let value = field.text().await.map_err(invalid)?;
                fields.insert(name, value);
            }
        }

        Ok(Self { fields, file })
    }

    /// A text field by any of its accepted names.
    pub fn field(&self, names: &[&str]) -> Option<&str> {
        names.iter().find_map(|name| self.fields.get(*name)).map(String::as_str)
    }

    /// Take the required `file` part.
    pub fn take_file(&mut self) -> Result<FormFile, RelayError> {
        self.file
            .take()
            .ok_or_else(|| RelayError::InvalidArgument("Missing 'file' form field".to_string()))
    }
}

fn invalid(e: MultipartError) -> RelayError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        RelayError::PayloadTooLarge(e.body_text())
    } else {
        RelayError::InvalidArgument(format!("Malformed multipart body: {e}"))
    }
}
