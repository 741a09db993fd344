//! Generated image persistence and lookup.
//!
//! Images land in a flat directory as `generated_image_<YYYYMMDD_HHMMSS>.png`.
//! The directory listing is the only inventory; nothing is tracked in memory.

use std::path::{Path, PathBuf};

use base64::Engine;
use chrono::{Local, NaiveDateTime};

use crate::error::RelayError;

const PREFIX: &str = "generated_image_";
const SUFFIX: &str = ".png";
const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Result of persisting an image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredImage {
    /// Bare file name, usable with the download route.
    pub filename: String,
    /// Full path of the written file.
    pub path: PathBuf,
    /// The original base64 payload, when the caller asked for it.
    pub image_base64: Option<String>,
}

/// Writes generated images into a local directory.
#[derive(Debug, Clone)]
pub struct ImageStore {
    dir: PathBuf,
}

impl ImageStore {
    /// Create a store rooted at `dir`. The directory is created lazily.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory the store writes to.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Decode a base64 image, re-encode it as PNG and write it with a
    /// timestamped name.
    ///
    /// Two images persisted within the same second share a name; the later
    /// write replaces the earlier one.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Decode`] for malformed base64 or image data, and
    /// an I/O or conversion error if the file cannot be written.
    pub fn persist(&self, payload: &str, return_encoded: bool) -> Result<StoredImage, RelayError> {
        self.persist_at(payload, return_encoded, Local::now().naive_local())
    }

    fn persist_at(
        &self,
        payload: &str,
        return_encoded: bool,
        at: NaiveDateTime,
    ) -> Result<StoredImage, RelayError> {
        let bytes = base64::engine::general_purpose::STANDARD
            .decode(payload.trim())
            .map_err(|e| RelayError::Decode(format!("Invalid base64 image payload: {e}")))?;
        let img = image::load_from_memory(&bytes)
            .map_err(|e| RelayError::Decode(format!("Failed to decode image: {e}")))?;

        std::fs::create_dir_all(&self.dir)?;

        let filename = generated_filename(at);
        let path = self.dir.join(&filename);
        img.save_with_format(&path, image::ImageFormat::Png).map_err(|e| {
            RelayError::Io(std::io::Error::other(format!("Failed to save {}: {e}", path.display())))
        })?;

        tracing::info!(path = %path.display(), "Stored generated image");

        Ok(StoredImage {
            filename,
            path,
            image_base64: return_encoded.then(|| payload.to_string()),
        })
    }

    /// Resolve a stored image by name.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::NotFound`] if the name is not a generated-image
    /// name or the file does not exist.
    pub fn resolve(&self, filename: &str) -> Result<PathBuf, RelayError> {
        if !is_generated_filename(filename) {
            return Err(RelayError::NotFound(format!("'{filename}' is not a generated image")));
        }
        let path = self.dir.join(filename);
        if path.is_file() {
            Ok(path)
        } else {
            Err(RelayError::NotFound(format!("Image '{filename}' does not exist")))
        }
    }
}

/// Compose the stored name for an image generated at `at`.
#[must_use]
pub fn generated_filename(at: NaiveDateTime) -> String {
    format!("{PREFIX}{}{SUFFIX}", at.format(TIMESTAMP_FORMAT))
}

/// Whether `name` matches `generated_image_<YYYYMMDD_HHMMSS>.png` exactly.
///
/// Parsing the timestamp also rules out separators, so a matching name can
/// never escape the image directory.
#[must_use]
pub fn is_generated_filename(name: &str) -> bool {
    name.strip_prefix(PREFIX)
        .and_then(|rest| rest.strip_suffix(SUFFIX))
        .is_some_and(|stamp| {
            stamp.len() == 15 && NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).is_ok()
        })
}
