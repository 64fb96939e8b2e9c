//! Sparse feature vectors and severity weighting.

use crate::state::CollectedSymptoms;
use std::collections::{BTreeMap, HashMap};

/// Sparse vector over a fixed vocabulary dimension. Absent entries are zero.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct FeatureVector {
    dimension: usize,
    entries: BTreeMap<usize, f64>,
}

impl FeatureVector {
    pub fn zeros(dimension: usize) -> Self {
        Self {
            dimension,
            entries: BTreeMap::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn get(&self, index: usize) -> f64 {
        self.entries.get(&index).copied().unwrap_or(0.0)
    }

    /// Sets `index` to `value`. Indices outside the dimension are ignored.
    pub fn set(&mut self, index: usize, value: f64) {
        if index >= self.dimension {
            return;
        }
        if value == 0.0 {
            self.entries.remove(&index);
        } else {
            self.entries.insert(index, value);
        }
    }

    /// Multiplies the entry at `index` by `factor`. Zero entries stay zero.
    pub fn scale(&mut self, index: usize, factor: f64) {
        if let Some(value) = self.entries.get_mut(&index) {
            *value *= factor;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, f64)> + '_ {
        self.entries.iter().map(|(i, v)| (*i, *v))
    }

    pub fn non_zero(&self) -> usize {
        self.entries.len()
    }

    pub fn to_dense(&self) -> Vec<f64> {
        let mut dense = vec![0.0; self.dimension];
        for (i, v) in self.iter() {
            dense[i] = v;
        }
        dense
    }
}

/// Amplifies the base weight of every confirmed symptom found in `vocabulary`.
///
/// Each matching entry is multiplied by `1 + (severity - 1) * 0.5`. Symptoms outside the
/// vocabulary contribute nothing and are not an error. `base` is left untouched.
pub fn weight(
    base: &FeatureVector,
    vocabulary: &HashMap<String, usize>,
    symptoms: &CollectedSymptoms,
) -> FeatureVector {
    let mut weighted = base.clone();
    for (key, severity) in symptoms.iter() {
        match vocabulary.get(key.as_str()) {
            Some(&index) => weighted.scale(index, severity.amplification()),
            None => tracing::trace!(symptom = %key, "symptom outside vocabulary"),
        }
    }
    weighted
}
