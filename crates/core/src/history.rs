//! History boost: raise labels that coincide with a matching chronic or genetic condition.
//!
//! A condition matches when at least [`HISTORY_MIN_OVERLAP`] of its profile symptoms are
//! confirmed and they cover at least [`HISTORY_MIN_MATCH_RATIO`] of the profile. Every label
//! whose normalised name equals a matching condition's name gains
//! `p * HISTORY_BOOST_FACTOR * match_score`, after which the distribution is renormalised.
//! With no matching condition the input distribution is returned untouched.

use crate::catalog::{normalize_condition_name, HistoryCatalog, HistoryCondition};
use crate::config::HistoryScope;
use crate::constants::{HISTORY_BOOST_FACTOR, HISTORY_MIN_MATCH_RATIO, HISTORY_MIN_OVERLAP};
use crate::distribution::Distribution;
use crate::TriageResult;
use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;
use triage_types::SymptomKey;

/// A history condition whose profile overlaps the confirmed symptoms enough to count.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct HistoryMatch {
    pub condition: String,
    pub overlap: usize,
    pub profile_size: usize,
    /// `overlap / profile_size`
    pub score: f64,
}

/// Informational note when the top-ranked label is itself a matching history condition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HistoryNote {
    pub condition: String,
    pub overlap_percent: u32,
}

impl fmt::Display for HistoryNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Symptoms show a {}% overlap with the chronic/genetic condition '{}'.",
            self.overlap_percent, self.condition
        )
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct BoostOutcome {
    pub distribution: Distribution,
    pub matches: Vec<HistoryMatch>,
    pub note: Option<HistoryNote>,
}

fn evaluate_condition(
    collected: &BTreeSet<SymptomKey>,
    condition: &HistoryCondition,
) -> Option<HistoryMatch> {
    let profile_size = condition.profile.len();
    if profile_size == 0 {
        return None;
    }
    let overlap = condition.profile.intersection(collected).count();
    let score = overlap as f64 / profile_size as f64;
    (overlap >= HISTORY_MIN_OVERLAP && score >= HISTORY_MIN_MATCH_RATIO).then(|| HistoryMatch {
        condition: condition.name.clone(),
        overlap,
        profile_size,
        score,
    })
}

/// Conditions in scope that match the confirmed symptoms, in scan order.
///
/// With [`HistoryScope::PatientOnly`] the patient's declarations are scanned in the order given;
/// names missing from the catalog are skipped and repeated names count once.
pub fn match_history(
    collected: &BTreeSet<SymptomKey>,
    patient_history: &[String],
    catalog: &HistoryCatalog,
    scope: HistoryScope,
) -> Vec<HistoryMatch> {
    let in_scope: Vec<&HistoryCondition> = match scope {
        HistoryScope::AllKnown => catalog.iter().collect(),
        HistoryScope::PatientOnly => {
            let mut seen = BTreeSet::new();
            patient_history
                .iter()
                .filter_map(|name| {
                    let found = catalog.find(name);
                    if found.is_none() {
                        tracing::warn!(condition = %name, "history condition not in catalog, skipped");
                    }
                    found
                })
                .filter(|condition| seen.insert(normalize_condition_name(&condition.name)))
                .collect()
        }
    };

    in_scope
        .into_iter()
        .filter_map(|condition| evaluate_condition(collected, condition))
        .collect()
}

/// Applies the history boost to `distribution`.
pub fn boost(
    distribution: &Distribution,
    collected: &BTreeSet<SymptomKey>,
    patient_history: &[String],
    catalog: &HistoryCatalog,
    scope: HistoryScope,
) -> TriageResult<BoostOutcome> {
    let matches = match_history(collected, patient_history, catalog, scope);
    if matches.is_empty() {
        return Ok(BoostOutcome {
            distribution: distribution.clone(),
            matches,
            note: None,
        });
    }

    let boosted = distribution
        .map_probabilities(|_, label, mut p| {
            let label_name = normalize_condition_name(label);
            for m in matches
                .iter()
                .filter(|m| normalize_condition_name(&m.condition) == label_name)
            {
                p += p * HISTORY_BOOST_FACTOR * m.score;
                tracing::debug!(label, condition = %m.condition, score = m.score, "history boost applied");
            }
            p
        })?
        .normalized()?;

    let note = boosted.top().and_then(|top| {
        let top_name = normalize_condition_name(top.label);
        matches
            .iter()
            .find(|m| normalize_condition_name(&m.condition) == top_name)
            .map(|m| HistoryNote {
                condition: m.condition.clone(),
                overlap_percent: (m.score * 100.0).round_ties_even() as u32,
            })
    });

    Ok(BoostOutcome {
        distribution: boosted,
        matches,
        note,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keys(items: &[&str]) -> BTreeSet<SymptomKey> {
        items.iter().map(|s| SymptomKey::new(s).unwrap()).collect()
    }

    fn dist(pairs: &[(&str, f64)]) -> Distribution {
        Distribution::new(pairs.iter().map(|(l, p)| (l.to_string(), *p)).collect()).unwrap()
    }

    fn history(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_heart_attack_history_boosts_matching_label() {
        let catalog = HistoryCatalog::builtin();
        let collected = keys(&["chest_pain", "breathlessness"]);
        let before = dist(&[("Heart attack", 0.4), ("GERD", 0.35), ("Pneumonia", 0.25)]);

        let outcome = boost(
            &before,
            &collected,
            &history(&["Heart attack"]),
            &catalog,
            HistoryScope::PatientOnly,
        )
        .unwrap();

        assert_eq!(outcome.matches.len(), 1);
        assert_eq!(outcome.matches[0].overlap, 2);
        assert_eq!(outcome.matches[0].score, 0.5);

        let after = &outcome.distribution;
        assert!((after.sum() - 1.0).abs() < 1e-6);
        let boosted = 0.4 * (1.0 + 0.15 * 0.5);
        let total = boosted + 0.35 + 0.25;
        assert!((after.probability_of("Heart attack").unwrap() - boosted / total).abs() < 1e-12);
        assert!(after.probability_of("GERD").unwrap() < 0.35);

        let note = outcome.note.unwrap();
        assert_eq!(note.overlap_percent, 50);
        assert_eq!(
            note.to_string(),
            "Symptoms show a 50% overlap with the chronic/genetic condition 'Heart attack'."
        );
    }

    #[test]
    fn test_no_match_leaves_distribution_untouched() {
        let catalog = HistoryCatalog::builtin();
        let before = dist(&[("Heart attack", 0.3), ("GERD", 0.7)]);
        let outcome = boost(
            &before,
            &keys(&["chest_pain"]),
            &history(&["Heart attack"]),
            &catalog,
            HistoryScope::PatientOnly,
        )
        .unwrap();
        assert!(outcome.matches.is_empty());
        assert_eq!(outcome.distribution, before);
        assert!(outcome.note.is_none());
    }

    #[test]
    fn test_ratio_threshold_requires_forty_percent() {
        // Hypothyroidism has 13 profile symptoms; 3 confirmed is below 40%.
        let catalog = HistoryCatalog::builtin();
        let collected = keys(&["fatigue", "lethargy", "dizziness"]);
        let matches = match_history(
            &collected,
            &history(&["Hypothyroidism"]),
            &catalog,
            HistoryScope::PatientOnly,
        );
        assert!(matches.is_empty());
    }

    #[test]
    fn test_patient_only_ignores_undeclared_conditions() {
        let catalog = HistoryCatalog::builtin();
        let collected = keys(&["chest_pain", "breathlessness"]);
        let patient_only =
            match_history(&collected, &history(&["Diabetes", "Unknown"]), &catalog, HistoryScope::PatientOnly);
        assert!(patient_only.is_empty());

        let all_known = match_history(&collected, &[], &catalog, HistoryScope::AllKnown);
        let names: Vec<&str> = all_known.iter().map(|m| m.condition.as_str()).collect();
        assert_eq!(names, vec!["Heart attack"]);
    }

    #[test]
    fn test_repeated_declarations_boost_once() {
        let catalog = HistoryCatalog::builtin();
        let matches = match_history(
            &keys(&["chest_pain", "breathlessness"]),
            &history(&["Heart attack", "heart_attack"]),
            &catalog,
            HistoryScope::PatientOnly,
        );
        assert_eq!(matches.len(), 1);
    }

    #[test]
    fn test_match_without_label_still_renormalises_without_note() {
        let catalog = HistoryCatalog::builtin();
        let before = dist(&[("Flu", 0.6), ("Cold", 0.4)]);
        let outcome = boost(
            &before,
            &keys(&["chest_pain", "breathlessness"]),
            &[],
            &catalog,
            HistoryScope::AllKnown,
        )
        .unwrap();
        assert_eq!(outcome.matches.len(), 1);
        assert!((outcome.distribution.sum() - 1.0).abs() < 1e-6);
        assert!(outcome.note.is_none());
    }

    #[test]
    fn test_note_only_when_top_label_is_the_condition() {
        let catalog = HistoryCatalog::builtin();
        let outcome = boost(
            &dist(&[("GERD", 0.9), ("Heart_attack", 0.1)]),
            &keys(&["chest_pain", "breathlessness"]),
            &history(&["Heart attack"]),
            &catalog,
            HistoryScope::PatientOnly,
        )
        .unwrap();
        assert!(outcome.distribution.probability_of("Heart_attack").unwrap() > 0.1);
        assert!(outcome.note.is_none());
    }
}
