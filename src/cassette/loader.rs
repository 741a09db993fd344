//! Reading cassette files from disk.

use std::path::Path;

use super::format::Cassette;
use super::replayer::CassetteReplayer;

/// Parse a cassette file without preparing it for replay.
///
/// # Errors
///
/// Returns an error if the file cannot be read or is not a cassette.
pub fn read_cassette(path: &Path) -> Result<Cassette, String> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read cassette file {}: {e}", path.display()))?;
    serde_yaml::from_str(&content)
        .map_err(|e| format!("Failed to parse cassette file {}: {e}", path.display()))
}

/// Load a cassette file into a replayer.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed.
pub fn load_cassette(path: &Path) -> Result<CassetteReplayer, String> {
    let cassette = read_cassette(path)?;
    tracing::debug!(
        name = %cassette.name,
        commit = %cassette.commit,
        interactions = cassette.interactions.len(),
        "Loaded cassette"
    );
    Ok(CassetteReplayer::new(&cassette))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cassette::format::Interaction;
    use chrono::Utc;
    use serde_json::json;

    #[test]
    fn load_valid_cassette() {
        let dir = std::env::temp_dir().join("gemini_relay_cassette_loader_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("test.cassette.yaml");

        let cassette = Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            commit: "abc".into(),
            interactions: vec![Interaction {
                seq: 0,
                port: "generative_model".into(),
                method: "generate_content".into(),
                input: json!({}),
                output: json!({"Ok": {"parts": []}}),
            }],
        };
        std::fs::write(&path, serde_yaml::to_string(&cassette).unwrap()).unwrap();

        let mut replayer = load_cassette(&path).unwrap();
        let i = replayer.next_interaction("generative_model", "generate_content").unwrap();
        assert_eq!(i.seq, 0);

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn load_nonexistent_fails() {
        assert!(load_cassette(Path::new("/nonexistent/cassette.yaml")).is_err());
    }

    #[test]
    fn load_garbage_fails() {
        let dir = std::env::temp_dir().join("gemini_relay_cassette_garbage_test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("bad.cassette.yaml");
        std::fs::write(&path, "interactions: [[[").unwrap();

        let err = load_cassette(&path).err().unwrap();
        assert!(err.contains("Failed to parse"));

        let _ = std::fs::remove_dir_all(&dir);
    }
}
