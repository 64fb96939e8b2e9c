//! Per-session symptom evidence.
//!
//! A session only ever grows its confirmed symptoms. A symptom is either confirmed or denied,
//! never both: confirming a previously denied symptom moves it across, while denying a confirmed
//! one is ignored.

use std::collections::{BTreeMap, BTreeSet};
use triage_types::{Severity, SymptomKey};

/// Confirmed symptoms with their severities.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CollectedSymptoms(BTreeMap<SymptomKey, Severity>);

impl CollectedSymptoms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key` at `severity`, replacing any earlier severity for the same key.
    pub fn insert(&mut self, key: SymptomKey, severity: Severity) {
        self.0.insert(key, severity);
    }

    pub fn get(&self, key: &SymptomKey) -> Option<Severity> {
        self.0.get(key).copied()
    }

    pub fn contains(&self, key: &SymptomKey) -> bool {
        self.0.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &SymptomKey> {
        self.0.keys()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&SymptomKey, Severity)> {
        self.0.iter().map(|(k, s)| (k, *s))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn key_set(&self) -> BTreeSet<SymptomKey> {
        self.0.keys().cloned().collect()
    }
}

impl FromIterator<(SymptomKey, Severity)> for CollectedSymptoms {
    fn from_iter<I: IntoIterator<Item = (SymptomKey, Severity)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Mutable state of one questioning session.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionState {
    collected: CollectedSymptoms,
    denied: BTreeSet<SymptomKey>,
    question_counter: u32,
    last_question: Option<SymptomKey>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collected(&self) -> &CollectedSymptoms {
        &self.collected
    }

    pub fn denied(&self) -> &BTreeSet<SymptomKey> {
        &self.denied
    }

    /// Number of confirmed follow-up answers. Denials never count.
    pub fn question_counter(&self) -> u32 {
        self.question_counter
    }

    pub fn last_question(&self) -> Option<&SymptomKey> {
        self.last_question.as_ref()
    }

    pub(crate) fn set_last_question(&mut self, question: Option<SymptomKey>) {
        self.last_question = question;
    }

    /// Adds initial symptoms without touching the question counter.
    pub fn add_initial(&mut self, key: SymptomKey, severity: Severity) {
        self.denied.remove(&key);
        self.collected.insert(key, severity);
    }

    /// Records a confirmed follow-up answer and counts it.
    pub fn confirm(&mut self, key: SymptomKey, severity: Severity) {
        self.denied.remove(&key);
        self.collected.insert(key, severity);
        self.question_counter += 1;
        self.last_question = None;
    }

    /// Records a denied follow-up answer. Returns false if the symptom was already confirmed.
    pub fn deny(&mut self, key: SymptomKey) -> bool {
        self.last_question = None;
        if self.collected.contains(&key) {
            return false;
        }
        self.denied.insert(key);
        true
    }
}
