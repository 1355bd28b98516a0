use crate::types::{Fixation, LabeledFixation};

/// Fixations of all processed sessions, in processing order.
///
/// Rows are only ever appended, one whole session at a time, so any snapshot
/// of the table is a prefix of the final table at session granularity.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResultTable {
    rows: Vec<LabeledFixation>,
    sessions: usize,
}

impl ResultTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Tag a session's fixations with its label and append them in order
    pub fn append_session(&mut self, session_label: &str, fixations: Vec<Fixation>) {
        self.rows.reserve(fixations.len());
        self.rows
            .extend(fixations.into_iter().map(|fixation| LabeledFixation {
                session_label: session_label.to_string(),
                fixation,
            }));
        self.sessions += 1;
    }

    pub fn rows(&self) -> &[LabeledFixation] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of sessions appended so far, including ones without fixations
    pub fn sessions(&self) -> usize {
        self.sessions
    }

    pub fn into_rows(self) -> Vec<LabeledFixation> {
        self.rows
    }
}
