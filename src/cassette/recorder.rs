//! Records interactions into a cassette file.

use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::Utc;

use super::format::{Cassette, Interaction};

/// Accumulates interactions and writes them as a YAML cassette.
#[derive(Debug)]
pub struct CassetteRecorder {
    path: PathBuf,
    name: String,
    commit: String,
    interactions: Vec<Interaction>,
}

impl CassetteRecorder {
    /// Create a recorder that writes to `path` on [`flush`](Self::flush).
    pub fn new(path: impl Into<PathBuf>, name: impl Into<String>, commit: impl Into<String>) -> Self {
        Self { path: path.into(), name: name.into(), commit: commit.into(), interactions: Vec::new() }
    }

    /// Append an interaction; its `seq` is its position in the cassette.
    pub fn record(
        &mut self,
        port: impl Into<String>,
        method: impl Into<String>,
        input: serde_json::Value,
        output: serde_json::Value,
    ) {
        let seq = self.interactions.len() as u64;
        self.interactions.push(Interaction {
            seq,
            port: port.into(),
            method: method.into(),
            input,
            output,
        });
    }

    /// Write everything recorded so far. The recorder stays usable and a
    /// later flush rewrites the whole file.
    ///
    /// The YAML is staged in a sibling temp file and renamed into place.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn flush(&self) -> Result<PathBuf, std::io::Error> {
        let cassette = Cassette {
            name: self.name.clone(),
            recorded_at: Utc::now(),
            commit: self.commit.clone(),
            interactions: self.interactions.clone(),
        };
        let yaml = serde_yaml::to_string(&cassette).map_err(std::io::Error::other)?;

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(dir)?;
        let mut staged = tempfile::NamedTempFile::new_in(dir)?;
        staged.write_all(yaml.as_bytes())?;
        staged.persist(&self.path).map_err(|e| e.error)?;
        Ok(self.path.clone())
    }
}
