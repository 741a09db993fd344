//! Request parameter validation and MIME type mapping.

use std::path::Path;

use url::Url;

/// Validate a media reference: an absolute `http(s)` URL with a host.
///
/// # Errors
///
/// Returns an error if the URI does not parse or uses another scheme.
pub fn validate_media_uri(uri: &str) -> Result<Url, String> {
    let url = Url::parse(uri.trim()).map_err(|e| format!("Invalid media URL '{uri}': {e}"))?;
    match url.scheme() {
        "http" | "https" if url.host_str().is_some() => Ok(url),
        scheme => Err(format!("Unsupported media URL scheme '{scheme}'. Expected http or https")),
    }
}

/// Validate a required free-text field.
///
/// # Errors
///
/// Returns an error if the value is empty or whitespace.
pub fn validate_required(field: &str, value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        Err(format!("'{field}' must not be empty"))
    } else {
        Ok(())
    }
}

/// Map a file name to the MIME type the upstream Files API expects.
///
/// Only document and image types the model can read are accepted.
#[must_use]
pub fn mime_for_filename(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "pdf" => "application/pdf",
        "txt" => "text/plain",
        "md" | "markdown" => "text/markdown",
        "csv" => "text/csv",
        "html" | "htm" => "text/html",
        "xml" => "text/xml",
        "json" => "application/json",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "heic" => "image/heic",
        _ => return None,
    };
    Some(mime)
}

/// File extension (with leading dot) to keep on a staged copy, or empty.
#[must_use]
pub fn suffix_for_filename(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| ext.chars().all(|c| c.is_ascii_alphanumeric()))
        .map_or_else(String::new, |ext| format!(".{ext}"))
}

/// Parse a form boolean (`true`/`false`/`1`/`0`/`on`/`off`).
///
/// # Errors
///
/// Returns an error for any other value.
pub fn parse_form_bool(field: &str, value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "on" | "yes" => Ok(true),
        "false" | "0" | "off" | "no" | "" => Ok(false),
        other => Err(format!("'{field}' must be a boolean, got '{other}'")),
    }
}
