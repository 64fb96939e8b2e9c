//! Probability distributions over the classifier's label set.

use crate::constants::DISTRIBUTION_TOLERANCE;
use crate::{TriageError, TriageResult};
use serde::Serialize;

/// One label and its probability.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LabelProbability {
    pub label: String,
    pub probability: f64,
}

/// Ordered (label, probability) pairs in the classifier's label order.
///
/// Probabilities are always finite and non-negative. Whether they sum to one depends on where the
/// distribution came from; [`Distribution::normalized`] restores the invariant.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Distribution {
    entries: Vec<LabelProbability>,
}

/// A label's position in the ranking, with its index in label order.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RankedLabel<'a> {
    pub index: usize,
    pub label: &'a str,
    pub probability: f64,
}

impl Distribution {
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` if there are no entries or any probability is
    /// negative or not finite.
    pub fn new(entries: Vec<(String, f64)>) -> TriageResult<Self> {
        if entries.is_empty() {
            return Err(TriageError::InvalidInput(
                "distribution needs at least one label".into(),
            ));
        }
        if let Some((label, p)) = entries
            .iter()
            .find(|(_, p)| !p.is_finite() || *p < 0.0)
        {
            return Err(TriageError::InvalidInput(format!(
                "probability for '{}' must be finite and non-negative, got {}",
                label, p
            )));
        }

        Ok(Self {
            entries: entries
                .into_iter()
                .map(|(label, probability)| LabelProbability { label, probability })
                .collect(),
        })
    }

    /// Pairs `labels` with `probabilities` positionally.
    pub fn from_parts(labels: &[String], probabilities: Vec<f64>) -> TriageResult<Self> {
        if labels.len() != probabilities.len() {
            return Err(TriageError::InvalidInput(format!(
                "{} labels but {} probabilities",
                labels.len(),
                probabilities.len()
            )));
        }
        Self::new(labels.iter().cloned().zip(probabilities).collect())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LabelProbability> {
        self.entries.iter()
    }

    pub fn probability_of(&self, label: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.label == label)
            .map(|e| e.probability)
    }

    pub fn sum(&self) -> f64 {
        self.entries.iter().map(|e| e.probability).sum()
    }

    pub fn is_normalized(&self) -> bool {
        (self.sum() - 1.0).abs() <= DISTRIBUTION_TOLERANCE
    }

    /// Divides every probability by the total.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::InvalidInput` if the total is zero.
    pub fn normalized(mut self) -> TriageResult<Self> {
        let total = self.sum();
        if total <= 0.0 {
            return Err(TriageError::InvalidInput(
                "cannot normalise a distribution with zero mass".into(),
            ));
        }
        for entry in &mut self.entries {
            entry.probability /= total;
        }
        Ok(self)
    }

    /// Replaces every probability with `f(index, label, probability)`.
    pub(crate) fn map_probabilities(
        &self,
        mut f: impl FnMut(usize, &str, f64) -> f64,
    ) -> TriageResult<Self> {
        Self::new(
            self.entries
                .iter()
                .enumerate()
                .map(|(i, e)| (e.label.clone(), f(i, &e.label, e.probability)))
                .collect(),
        )
    }

    /// The `k` most probable labels, highest first. Equal probabilities keep label order.
    pub fn ranked(&self, k: usize) -> Vec<RankedLabel<'_>> {
        let mut ranked: Vec<RankedLabel<'_>> = self
            .entries
            .iter()
            .enumerate()
            .map(|(index, e)| RankedLabel {
                index,
                label: &e.label,
                probability: e.probability,
            })
            .collect();
        ranked.sort_by(|a, b| {
            b.probability
                .total_cmp(&a.probability)
                .then(a.index.cmp(&b.index))
        });
        ranked.truncate(k);
        ranked
    }

    pub fn top(&self) -> Option<RankedLabel<'_>> {
        self.ranked(1).into_iter().next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dist(pairs: &[(&str, f64)]) -> Distribution {
        Distribution::new(pairs.iter().map(|(l, p)| (l.to_string(), *p)).collect()).unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_probabilities() {
        assert!(Distribution::new(vec![]).is_err());
        assert!(Distribution::new(vec![("a".into(), -0.1)]).is_err());
        assert!(Distribution::new(vec![("a".into(), f64::NAN)]).is_err());
    }

    #[test]
    fn test_from_parts_requires_matching_lengths() {
        let labels = vec!["a".to_string(), "b".to_string()];
        assert!(Distribution::from_parts(&labels, vec![1.0]).is_err());
        let d = Distribution::from_parts(&labels, vec![0.25, 0.75]).unwrap();
        assert_eq!(d.probability_of("b"), Some(0.75));
    }

    #[test]
    fn test_ranked_orders_by_probability_then_label_index() {
        let d = dist(&[("a", 0.2), ("b", 0.4), ("c", 0.4)]);
        let ranked = d.ranked(5);
        let labels: Vec<&str> = ranked.iter().map(|r| r.label).collect();
        assert_eq!(labels, vec!["b", "c", "a"]);
        assert_eq!(d.ranked(1)[0].index, 1);
        assert_eq!(d.top().unwrap().label, "b");
    }

    #[test]
    fn test_normalized_sums_to_one() {
        let d = dist(&[("a", 2.0), ("b", 6.0)]).normalized().unwrap();
        assert!(d.is_normalized());
        assert_eq!(d.probability_of("a"), Some(0.25));
    }

    #[test]
    fn test_normalized_rejects_zero_mass() {
        assert!(dist(&[("a", 0.0)]).normalized().is_err());
    }
}
