//! Emergency symptom screening.
//!
//! Confirmed symptoms are screened against a fixed list of emergency phrases. A symptom matches
//! when either text contains the other, so `chest_pain`, `severe chest pain` and the bare word
//! `chest` all flag. Symptoms shorter than three characters are never compared.

use serde::Serialize;
use triage_types::SymptomKey;

/// Phrases that call for immediate attention.
pub const EMERGENCY_PHRASES: &[&str] = &[
    "chest pain",
    "severe chest pain",
    "breathlessness",
    "severe breathlessness",
    "unconscious",
    "unconsciousness",
    "severe bleeding",
    "blood in sputum",
    "altered sensorium",
    "paralysis",
    "stroke",
    "seizure",
    "cardiac arrest",
    "heart attack",
    "difficulty breathing",
    "cannot breathe",
];

const MIN_COMPARED_LEN: usize = 3;

/// Confirmed symptoms that matched an emergency phrase.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmergencyFlag {
    pub matched: Vec<SymptomKey>,
}

fn is_emergency(symptom: &SymptomKey) -> bool {
    let text = symptom.display_text();
    if text.len() < MIN_COMPARED_LEN {
        return false;
    }
    EMERGENCY_PHRASES
        .iter()
        .any(|phrase| text.contains(phrase) || phrase.contains(text.as_str()))
}

/// Returns the matching symptoms, or `None` if nothing matched.
pub fn screen_emergency<'a>(symptoms: impl IntoIterator<Item = &'a SymptomKey>) -> Option<EmergencyFlag> {
    let matched: Vec<SymptomKey> = symptoms
        .into_iter()
        .filter(|s| is_emergency(s))
        .cloned()
        .collect();
    if matched.is_empty() {
        None
    } else {
        Some(EmergencyFlag { matched })
    }
}
