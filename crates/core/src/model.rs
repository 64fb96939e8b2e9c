//! Classifier and vectorizer collaborators.
//!
//! The engine only depends on the [`Vectorizer`] and [`Classifier`] traits. The reference
//! implementations here reproduce the feature builder and network the trained artifacts come
//! from: a TF-IDF vectorizer with L2 normalisation and a small fully connected network with
//! ReLU activations and a temperature-scaled softmax.

use crate::constants::DEFAULT_TEMPERATURE;
use crate::distribution::Distribution;
use crate::features::FeatureVector;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Builds feature vectors from normalised tokens.
pub trait Vectorizer: Send + Sync {
    /// Token to feature index.
    fn vocabulary(&self) -> &HashMap<String, usize>;

    fn vectorize(&self, tokens: &[String]) -> FeatureVector;

    /// Width of the vectors produced by [`Vectorizer::vectorize`].
    fn dimension(&self) -> usize {
        self.vocabulary().len()
    }

    /// Stop-word policy the vocabulary was built with, when recorded.
    fn stopword_filtered(&self) -> Option<bool> {
        None
    }
}

/// Maps a feature vector to a distribution over a fixed label set. Must be deterministic.
pub trait Classifier: Send + Sync {
    fn labels(&self) -> &[String];

    fn input_width(&self) -> usize;

    fn infer(&self, features: &FeatureVector) -> TriageResult<Distribution>;
}

/// TF-IDF feature builder over a fixed vocabulary.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TfidfVectorizer {
    vocabulary: HashMap<String, usize>,
    idf: Vec<f64>,
    #[serde(default)]
    stopword_filtered: Option<bool>,
}

impl TfidfVectorizer {
    pub fn new(
        vocabulary: HashMap<String, usize>,
        idf: Vec<f64>,
        stopword_filtered: Option<bool>,
    ) -> TriageResult<Self> {
        let vectorizer = Self {
            vocabulary,
            idf,
            stopword_filtered,
        };
        vectorizer.validate()?;
        Ok(vectorizer)
    }

    /// Checks that every vocabulary index has an idf weight.
    pub fn validate(&self) -> TriageResult<()> {
        if self.idf.len() != self.vocabulary.len() {
            return Err(TriageError::InvalidArtifact(format!(
                "vectorizer has {} vocabulary entries but {} idf weights",
                self.vocabulary.len(),
                self.idf.len()
            )));
        }
        if let Some((token, index)) = self
            .vocabulary
            .iter()
            .find(|(_, index)| **index >= self.idf.len())
        {
            return Err(TriageError::InvalidArtifact(format!(
                "vocabulary token '{}' has out of range index {}",
                token, index
            )));
        }
        Ok(())
    }
}

impl Vectorizer for TfidfVectorizer {
    fn vocabulary(&self) -> &HashMap<String, usize> {
        &self.vocabulary
    }

    fn vectorize(&self, tokens: &[String]) -> FeatureVector {
        let mut counts: HashMap<usize, f64> = HashMap::new();
        for token in tokens {
            if let Some(&index) = self.vocabulary.get(token) {
                *counts.entry(index).or_insert(0.0) += 1.0;
            }
        }

        let weights: Vec<(usize, f64)> = counts
            .into_iter()
            .filter_map(|(index, tf)| self.idf.get(index).map(|idf| (index, tf * idf)))
            .collect();
        let norm = weights.iter().map(|(_, w)| w * w).sum::<f64>().sqrt();

        let mut vector = FeatureVector::zeros(self.dimension());
        if norm == 0.0 {
            return vector;
        }
        for (index, w) in weights {
            vector.set(index, w / norm);
        }
        vector
    }

    fn dimension(&self) -> usize {
        self.idf.len()
    }

    fn stopword_filtered(&self) -> Option<bool> {
        self.stopword_filtered
    }
}

/// Fully connected layer; `weights` has one row per output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DenseLayer {
    pub weights: Vec<Vec<f64>>,
    pub bias: Vec<f64>,
}

impl DenseLayer {
    fn input_width(&self) -> usize {
        self.weights.first().map_or(0, Vec::len)
    }

    fn output_width(&self) -> usize {
        self.bias.len()
    }

    fn forward(&self, input: &[f64]) -> Vec<f64> {
        self.weights
            .iter()
            .zip(&self.bias)
            .map(|(row, b)| row.iter().zip(input).map(|(w, x)| w * x).sum::<f64>() + b)
            .collect()
    }
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

/// Feed-forward classifier with ReLU hidden layers and temperature-scaled softmax output.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MlpClassifier {
    labels: Vec<String>,
    layers: Vec<DenseLayer>,
    #[serde(default = "default_temperature")]
    temperature: f64,
}

impl MlpClassifier {
    pub fn new(labels: Vec<String>, layers: Vec<DenseLayer>, temperature: f64) -> TriageResult<Self> {
        let classifier = Self {
            labels,
            layers,
            temperature,
        };
        classifier.validate()?;
        Ok(classifier)
    }

    /// Checks layer shapes chain from the input width to one output per label.
    pub fn validate(&self) -> TriageResult<()> {
        if self.labels.is_empty() {
            return Err(TriageError::InvalidArtifact("classifier has no labels".into()));
        }
        if !(self.temperature.is_finite() && self.temperature > 0.0) {
            return Err(TriageError::InvalidArtifact(format!(
                "temperature must be positive, got {}",
                self.temperature
            )));
        }
        let Some(last) = self.layers.last() else {
            return Err(TriageError::InvalidArtifact("classifier has no layers".into()));
        };

        for (i, layer) in self.layers.iter().enumerate() {
            let width = layer.input_width();
            if layer.weights.len() != layer.output_width()
                || layer.weights.iter().any(|row| row.len() != width)
            {
                return Err(TriageError::InvalidArtifact(format!(
                    "layer {} has inconsistent weight and bias shapes",
                    i
                )));
            }
            if let Some(next) = self.layers.get(i + 1) {
                if next.input_width() != layer.output_width() {
                    return Err(TriageError::InvalidArtifact(format!(
                        "layer {} outputs {} values but layer {} expects {}",
                        i,
                        layer.output_width(),
                        i + 1,
                        next.input_width()
                    )));
                }
            }
        }

        if last.output_width() != self.labels.len() {
            return Err(TriageError::InvalidArtifact(format!(
                "output layer has {} units for {} labels",
                last.output_width(),
                self.labels.len()
            )));
        }
        Ok(())
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }
}

/// Softmax of `logits / temperature`, shifted by the maximum for numerical stability.
pub fn softmax(logits: &[f64], temperature: f64) -> Vec<f64> {
    let scaled: Vec<f64> = logits.iter().map(|l| l / temperature).collect();
    let max = scaled.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let exps: Vec<f64> = scaled.iter().map(|s| (s - max).exp()).collect();
    let total: f64 = exps.iter().sum();
    exps.into_iter().map(|e| e / total).collect()
}

impl Classifier for MlpClassifier {
    fn labels(&self) -> &[String] {
        &self.labels
    }

    fn input_width(&self) -> usize {
        self.layers.first().map_or(0, DenseLayer::input_width)
    }

    fn infer(&self, features: &FeatureVector) -> TriageResult<Distribution> {
        if features.dimension() != self.input_width() {
            return Err(TriageError::InvalidArtifact(format!(
                "feature vector has dimension {} but classifier expects {}",
                features.dimension(),
                self.input_width()
            )));
        }

        let mut activations = features.to_dense();
        let hidden = self.layers.len().saturating_sub(1);
        for (i, layer) in self.layers.iter().enumerate() {
            activations = layer.forward(&activations);
            if i < hidden {
                activations.iter_mut().for_each(|a| *a = a.max(0.0));
            }
        }

        Distribution::from_parts(&self.labels, softmax(&activations, self.temperature))
    }
}

/// Serialised form of the reference collaborators, as stored in `model.json`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ModelBundle {
    pub vectorizer: TfidfVectorizer,
    pub classifier: MlpClassifier,
}

impl ModelBundle {
    pub fn from_json(json: &str) -> TriageResult<Self> {
        let bundle: Self = serde_json::from_str(json).map_err(TriageError::Deserialization)?;
        bundle.vectorizer.validate()?;
        bundle.classifier.validate()?;
        Ok(bundle)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vectorizer() -> TfidfVectorizer {
        let vocabulary = [("cough", 0), ("fever", 1), ("rash", 2)]
            .into_iter()
            .map(|(k, v)| (k.to_string(), v))
            .collect();
        TfidfVectorizer::new(vocabulary, vec![1.0, 2.0, 3.0], Some(false)).unwrap()
    }

    fn tokens(words: &[&str]) -> Vec<String> {
        words.iter().map(|w| w.to_string()).collect()
    }

    #[test]
    fn test_tfidf_is_l2_normalised_and_skips_unknown_tokens() {
        let v = vectorizer().vectorize(&tokens(&["cough", "fever", "sneeze"]));
        let norm: f64 = v.iter().map(|(_, x)| x * x).sum::<f64>().sqrt();
        assert!((norm - 1.0).abs() < 1e-12);
        assert!(v.get(1) > v.get(0));
        assert_eq!(v.get(2), 0.0);
    }

    #[test]
    fn test_tfidf_all_unknown_tokens_yield_zero_vector() {
        let v = vectorizer().vectorize(&tokens(&["sneeze"]));
        assert_eq!(v.non_zero(), 0);
        assert_eq!(v.dimension(), 3);
    }

    #[test]
    fn test_tfidf_rejects_mismatched_idf() {
        let vocabulary = [("cough".to_string(), 0)].into_iter().collect();
        assert!(matches!(
            TfidfVectorizer::new(vocabulary, vec![], None),
            Err(TriageError::InvalidArtifact(_))
        ));
    }

    fn identity_classifier() -> MlpClassifier {
        MlpClassifier::new(
            vec!["a".into(), "b".into()],
            vec![
                DenseLayer {
                    weights: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                    bias: vec![0.0, 0.0],
                },
                DenseLayer {
                    weights: vec![vec![4.0, 0.0], vec![0.0, 4.0]],
                    bias: vec![0.0, 0.0],
                },
            ],
            2.0,
        )
        .unwrap()
    }

    #[test]
    fn test_mlp_infer_is_deterministic_softmax() {
        let classifier = identity_classifier();
        let mut features = FeatureVector::zeros(2);
        features.set(0, 1.0);

        let first = classifier.infer(&features).unwrap();
        let second = classifier.infer(&features).unwrap();
        assert_eq!(first, second);
        assert!(first.is_normalized());

        // logits (4, 0) at temperature 2 give softmax(2, 0)
        let expected = 1.0 / (1.0 + (-2.0f64).exp());
        assert!((first.probability_of("a").unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn test_mlp_relu_clamps_hidden_layer() {
        let classifier = identity_classifier();
        let mut features = FeatureVector::zeros(2);
        features.set(0, -1.0);
        let d = classifier.infer(&features).unwrap();
        assert!((d.probability_of("a").unwrap() - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_mlp_rejects_wrong_feature_dimension() {
        let classifier = identity_classifier();
        assert!(classifier.infer(&FeatureVector::zeros(3)).is_err());
    }

    #[test]
    fn test_mlp_validate_shapes() {
        let bad = MlpClassifier::new(
            vec!["a".into()],
            vec![DenseLayer {
                weights: vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                bias: vec![0.0, 0.0],
            }],
            1.0,
        );
        assert!(matches!(bad, Err(TriageError::InvalidArtifact(_))));
        assert!(MlpClassifier::new(vec!["a".into()], vec![], 1.0).is_err());
    }

    #[test]
    fn test_softmax_is_stable_for_large_logits() {
        let p = softmax(&[1000.0, 1000.0], 1.0);
        assert_eq!(p, vec![0.5, 0.5]);
    }

    #[test]
    fn test_model_bundle_from_json_defaults_temperature() {
        let json = r#"{
            "vectorizer": {"vocabulary": {"fever": 0}, "idf": [1.0]},
            "classifier": {
                "labels": ["Flu", "Cold"],
                "layers": [{"weights": [[1.0], [-1.0]], "bias": [0.0, 0.0]}]
            }
        }"#;
        let bundle = ModelBundle::from_json(json).unwrap();
        assert_eq!(bundle.classifier.temperature(), DEFAULT_TEMPERATURE);
        assert_eq!(bundle.vectorizer.stopword_filtered(), None);
        assert_eq!(bundle.classifier.input_width(), 1);
    }
}
