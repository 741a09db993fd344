//! Scoped staging of client uploads on local disk.

use std::io::Write;
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;

use crate::error::RelayError;
use crate::params::{mime_for_filename, suffix_for_filename};
use crate::ports::generative_model::FileUpload;

/// A client upload copied to a uniquely named temporary file.
///
/// The file is removed when the handle is dropped, on every exit path of the
/// request that created it.
#[derive(Debug)]
pub struct StagedAsset {
    file: NamedTempFile,
    original_name: String,
    mime_type: &'static str,
}

impl StagedAsset {
    /// Stage `bytes` in the system temp directory.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::InvalidArgument`] for unsupported file types and
    /// an I/O error if the file cannot be written.
    pub fn stage(bytes: &[u8], original_name: &str) -> Result<Self, RelayError> {
        Self::stage_in(&std::env::temp_dir(), bytes, original_name)
    }

    /// Stage `bytes` in `dir`, keeping the original extension.
    ///
    /// # Errors
    ///
    /// Same as [`StagedAsset::stage`].
    pub fn stage_in(dir: &Path, bytes: &[u8], original_name: &str) -> Result<Self, RelayError> {
        let mime_type = mime_for_filename(original_name).ok_or_else(|| {
            RelayError::InvalidArgument(format!("Unsupported file type: '{original_name}'"))
        })?;

        let mut file = tempfile::Builder::new()
            .prefix("upload-")
            .suffix(&suffix_for_filename(original_name))
            .tempfile_in(dir)?;
        file.write_all(bytes)?;
        file.flush()?;

        tracing::debug!(
            path = %file.path().display(),
            original = original_name,
            size = bytes.len(),
            "Staged upload"
        );

        Ok(Self { file, original_name: original_name.to_string(), mime_type })
    }

    /// Local path of the staged copy.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.file.path()
    }

    /// File name as supplied by the client.
    #[must_use]
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Describe the staged copy for the upstream Files API.
    #[must_use]
    pub fn to_upload(&self) -> FileUpload {
        FileUpload {
            path: PathBuf::from(self.path()),
            mime_type: self.mime_type.to_string(),
            display_name: self.original_name.clone(),
        }
    }

    /// Cheap local check that the content is readable for its type.
    ///
    /// # Errors
    ///
    /// Returns [`RelayError::Decode`] for empty files, undecodable images,
    /// PDFs without a PDF header and text that is not UTF-8.
    pub fn inspect(&self) -> Result<(), RelayError> {
        let bytes = std::fs::read(self.path())?;
        let corrupt = |why: String| {
            RelayError::Decode(format!("'{}' is not readable: {why}", self.original_name))
        };

        if bytes.is_empty() {
            return Err(corrupt("file is empty".to_string()));
        }
        match self.mime_type {
            "application/pdf" if !bytes.starts_with(b"%PDF-") => {
                Err(corrupt("missing PDF header".to_string()))
            }
            mime if mime.starts_with("image/") && mime != "image/heic" => {
                image::load_from_memory(&bytes).map(|_| ()).map_err(|e| corrupt(e.to_string()))
            }
            mime if mime.starts_with("text/") || mime == "application/json" => {
                std::str::from_utf8(&bytes).map(|_| ()).map_err(|e| corrupt(e.to_string()))
            }
            _ => Ok(()),
        }
    }

    /// Remove the staged file now. A file that is already gone is not an error.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if removal fails for another reason.
    pub fn close(self) -> Result<(), RelayError> {
        match self.file.close() {
            Err(e) if e.kind() != std::io::ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(name);
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn stage_keeps_extension_and_content() {
        let dir = scratch("gemini_relay_upload_stage");
        let asset = StagedAsset::stage_in(&dir, b"hello", "notes.txt").unwrap();
        assert_eq!(asset.path().extension().unwrap(), "txt");
        assert_eq!(std::fs::read(asset.path()).unwrap(), b"hello");
        assert_eq!(asset.to_upload().mime_type, "text/plain");
        assert_eq!(asset.original_name(), "notes.txt");
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unique_names_per_stage() {
        let dir = scratch("gemini_relay_upload_unique");
        let a = StagedAsset::stage_in(&dir, b"a", "same.txt").unwrap();
        let b = StagedAsset::stage_in(&dir, b"b", "same.txt").unwrap();
        assert_ne!(a.path(), b.path());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn drop_removes_file() {
        let dir = scratch("gemini_relay_upload_drop");
        let path = {
            let asset = StagedAsset::stage_in(&dir, b"bye", "a.txt").unwrap();
            asset.path().to_path_buf()
        };
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn error_path_removes_file() {
        fn process(dir: &Path, seen: &mut Option<PathBuf>) -> Result<(), RelayError> {
            let asset = StagedAsset::stage_in(dir, b"", "empty.txt")?;
            *seen = Some(asset.path().to_path_buf());
            asset.inspect()?;
            Ok(())
        }

        let dir = scratch("gemini_relay_upload_err");
        let mut seen = None;
        assert!(process(&dir, &mut seen).is_err());
        assert!(!seen.unwrap().exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn panic_removes_file() {
        let dir = scratch("gemini_relay_upload_panic");
        let asset = StagedAsset::stage_in(&dir, b"boom", "a.txt").unwrap();
        let path = asset.path().to_path_buf();

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(move || {
            let _held = asset;
            panic!("handler blew up");
        }));
        assert!(result.is_err());
        assert!(!path.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn close_tolerates_missing_file() {
        let dir = scratch("gemini_relay_upload_double");
        let asset = StagedAsset::stage_in(&dir, b"x", "a.txt").unwrap();
        std::fs::remove_file(asset.path()).unwrap();
        assert!(asset.close().is_ok());
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn unsupported_type_rejected() {
        let dir = scratch("gemini_relay_upload_zip");
        let err = StagedAsset::stage_in(&dir, b"PK", "a.zip").unwrap_err();
        assert!(matches!(err, RelayError::InvalidArgument(_)));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn inspect_detects_corruption() {
        let dir = scratch("gemini_relay_upload_inspect");
        let pdf = StagedAsset::stage_in(&dir, b"garbage", "doc.pdf").unwrap();
        assert!(matches!(pdf.inspect(), Err(RelayError::Decode(_))));

        let good_pdf = StagedAsset::stage_in(&dir, b"%PDF-1.7\n...", "doc.pdf").unwrap();
        assert!(good_pdf.inspect().is_ok());

        let png = StagedAsset::stage_in(&dir, b"\x89PNG broken", "pic.png").unwrap();
        assert!(matches!(png.inspect(), Err(RelayError::Decode(_))));

        let text = StagedAsset::stage_in(&dir, &[0xFF, 0xFE, 0x00], "notes.txt").unwrap();
        assert!(matches!(text.inspect(), Err(RelayError::Decode(_))));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
