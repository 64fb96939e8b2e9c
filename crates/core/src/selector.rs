//! Next-question selection.
//!
//! A greedy one-step heuristic: compare the two leading labels, ask about the highest-priority
//! unasked symptom that belongs to exactly one of their profiles, and fall back to the leading
//! label's own unasked symptoms once nothing separates them. Priorities come from the severity
//! table; equal priorities resolve to the lexically smallest symptom key.

use crate::distribution::Distribution;
use crate::knowledge::{DiseaseSymptomMap, SeverityTable};
use crate::state::CollectedSymptoms;
use serde::Serialize;
use std::collections::BTreeSet;
use triage_types::SymptomKey;

/// Where the chosen question came from.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    /// In exactly one of the two leading labels' profiles.
    Differentiating,
    /// Fallback from the leading label's profile.
    TopLabelProfile,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct QuestionPick {
    pub token: SymptomKey,
    pub source: QuestionSource,
    pub priority: u8,
}

fn highest_priority<'a>(
    candidates: impl Iterator<Item = &'a SymptomKey>,
    severity_table: &SeverityTable,
) -> Option<(&'a SymptomKey, u8)> {
    let mut best: Option<(&SymptomKey, u8)> = None;
    for candidate in candidates {
        let priority = severity_table.priority(candidate);
        if best.map_or(true, |(_, p)| priority > p) {
            best = Some((candidate, priority));
        }
    }
    best
}

/// Picks the next symptom to ask about, or `None` when no useful question is left.
///
/// The returned symptom is never confirmed or denied already.
pub fn next_question(
    distribution: &Distribution,
    collected: &CollectedSymptoms,
    denied: &BTreeSet<SymptomKey>,
    disease_map: &DiseaseSymptomMap,
    severity_table: &SeverityTable,
) -> Option<QuestionPick> {
    let leading = distribution.ranked(2);
    let [first, second] = leading.as_slice() else {
        return None;
    };

    let empty = BTreeSet::new();
    let first_profile = disease_map.profile(first.label).unwrap_or(&empty);
    let second_profile = disease_map.profile(second.label).unwrap_or(&empty);
    let unasked = |s: &&SymptomKey| !collected.contains(s) && !denied.contains(*s);

    // BTreeSet::symmetric_difference yields keys in ascending order.
    let differentiating = first_profile
        .symmetric_difference(second_profile)
        .filter(unasked);
    if let Some((token, priority)) = highest_priority(differentiating, severity_table) {
        return Some(QuestionPick {
            token: token.clone(),
            source: QuestionSource::Differentiating,
            priority,
        });
    }

    let fallback = first_profile.iter().filter(unasked);
    highest_priority(fallback, severity_table).map(|(token, priority)| QuestionPick {
        token: token.clone(),
        source: QuestionSource::TopLabelProfile,
        priority,
    })
}
