//! Replays recorded interactions from a cassette.

use std::collections::{HashMap, VecDeque};

use super::format::{Cassette, Interaction};

/// Serves a cassette's interactions in recorded order, with one queue per
/// port/method pair.
pub struct CassetteReplayer {
    queues: HashMap<(String, String), VecDeque<Interaction>>,
}

impl CassetteReplayer {
    /// Create a new replayer from a loaded cassette.
    #[must_use]
    pub fn new(cassette: &Cassette) -> Self {
        let mut queues: HashMap<(String, String), VecDeque<Interaction>> = HashMap::new();
        for interaction in &cassette.interactions {
            queues
                .entry((interaction.port.clone(), interaction.method.clone()))
                .or_default()
                .push_back(interaction.clone());
        }
        Self { queues }
    }

    /// Take the next interaction recorded for `port::method`.
    ///
    /// # Errors
    ///
    /// Returns an error if the cassette has no (more) interactions for the
    /// given port/method combination.
    pub fn next_interaction(&mut self, port: &str, method: &str) -> Result<Interaction, String> {
        let Some(queue) = self.queues.get_mut(&(port.to_string(), method.to_string())) else {
            let mut available: Vec<String> =
                self.queues.keys().map(|(p, m)| format!("{p}::{m}")).collect();
            available.sort();
            return Err(format!(
                "Cassette exhausted: no interactions recorded for {port}::{method}. \
                 Recorded pairs: [{}]",
                available.join(", ")
            ));
        };

        queue.pop_front().ok_or_else(|| {
            format!("Cassette exhausted: every {port}::{method} interaction has been served")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn make_cassette(interactions: Vec<Interaction>) -> Cassette {
        Cassette {
            name: "test".into(),
            recorded_at: Utc::now(),
            commit: "abc".into(),
            interactions,
        }
    }

    fn interaction(seq: u64, method: &str) -> Interaction {
        Interaction {
            seq,
            port: "generative_model".into(),
            method: method.into(),
            input: json!({}),
            output: json!({"Ok": {"parts": []}}),
        }
    }

    #[test]
    fn replay_in_order() {
        let cassette = make_cassette(vec![interaction(0, "generate_content"), interaction(1, "generate_content")]);
        let mut replayer = CassetteReplayer::new(&cassette);

        assert_eq!(replayer.next_interaction("generative_model", "generate_content").unwrap().seq, 0);
        assert_eq!(replayer.next_interaction("generative_model", "generate_content").unwrap().seq, 1);
    }

    #[test]
    fn methods_have_independent_queues() {
        let cassette = make_cassette(vec![
            interaction(0, "upload_file"),
            interaction(1, "generate_content"),
            interaction(2, "delete_file"),
        ]);
        let mut replayer = CassetteReplayer::new(&cassette);

        assert_eq!(replayer.next_interaction("generative_model", "generate_content").unwrap().seq, 1);
        assert_eq!(replayer.next_interaction("generative_model", "upload_file").unwrap().seq, 0);
        assert_eq!(replayer.next_interaction("generative_model", "delete_file").unwrap().seq, 2);
    }

    #[test]
    fn exhausted_replayer_errors() {
        let cassette = make_cassette(vec![interaction(0, "generate_content")]);
        let mut replayer = CassetteReplayer::new(&cassette);
        assert!(replayer.next_interaction("generative_model", "generate_content").is_ok());
        let err = replayer.next_interaction("generative_model", "generate_content").unwrap_err();
        assert!(err.contains("Cassette exhausted"));
    }

    #[test]
    fn unknown_port_errors() {
        let cassette = make_cassette(vec![]);
        let mut replayer = CassetteReplayer::new(&cassette);
        let err = replayer.next_interaction("unknown", "method").unwrap_err();
        assert!(err.contains("no interactions recorded"));
    }
}
