use crate::error::{FixlabError, Result};
use crate::types::{GazeSample, RawSample, SessionKey};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// All samples of one (participant, recording) pair, ordered by time
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub key: SessionKey,
    pub samples: Vec<GazeSample>,
}

impl Session {
    pub fn label(&self) -> String {
        self.key.label()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Order in which sessions are handed to the detector
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionOrder {
    /// Order of first appearance in the input
    #[default]
    FirstSeen,
    /// Sorted by participant, then recording
    Sorted,
}

/// Group raw rows into sessions.
///
/// Samples inside a session are stably sorted by time, so rows sharing a
/// timestamp keep their input order.
pub fn partition(raw: Vec<RawSample>, order: SessionOrder) -> Vec<Session> {
    let mut index: HashMap<SessionKey, usize> = HashMap::new();
    let mut sessions: Vec<Session> = Vec::new();

    for row in raw {
        let key = SessionKey {
            participant_id: row.participant_id,
            recording_id: row.recording_id,
        };
        let slot = match index.get(&key) {
            Some(&slot) => slot,
            None => {
                let slot = sessions.len();
                index.insert(key.clone(), slot);
                sessions.push(Session {
                    key,
                    samples: Vec::new(),
                });
                slot
            }
        };
        sessions[slot].samples.push(row.sample);
    }

    for session in &mut sessions {
        session.samples.sort_by(|a, b| a.time.total_cmp(&b.time));
    }

    if order == SessionOrder::Sorted {
        sessions.sort_by(|a, b| a.key.cmp(&b.key));
    }

    sessions
}

/// Reject inputs where two distinct sessions map to the same label, since
/// their fixations could no longer be told apart in the result table.
pub fn check_label_collisions(sessions: &[Session]) -> Result<()> {
    let mut seen: HashMap<String, &SessionKey> = HashMap::new();
    for session in sessions {
        let label = session.label();
        if let Some(first) = seen.get(&label) {
            return Err(FixlabError::LabelCollision {
                label,
                first: first.to_string(),
                second: session.key.to_string(),
            });
        }
        seen.insert(label, &session.key);
    }
    Ok(())
}

/// Every label shared by more than one session, with the keys involved
pub fn find_label_collisions(sessions: &[Session]) -> Vec<(String, Vec<SessionKey>)> {
    let mut by_label: HashMap<String, Vec<SessionKey>> = HashMap::new();
    let mut labels: Vec<String> = Vec::new();
    for session in sessions {
        let label = session.label();
        let keys = by_label.entry(label.clone()).or_default();
        if keys.is_empty() {
            labels.push(label);
        }
        keys.push(session.key.clone());
    }

    labels
        .into_iter()
        .filter_map(|label| {
            let keys = by_label.remove(&label)?;
            (keys.len() > 1).then_some((label, keys))
        })
        .collect()
}
