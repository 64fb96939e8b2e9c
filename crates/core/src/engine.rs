//! Turn evaluation.
//!
//! One turn runs the whole pipeline over the evidence gathered so far:
//! normalise → vectorise → severity weighting → classify → history boost → stopping policy and
//! question selection. Every input arrives explicitly; the static tables and collaborators sit
//! in an [`EngineContext`] that is built once and shared read-only across sessions.

use crate::config::EngineConfig;
use crate::constants::MODEL_FILENAME;
use crate::distribution::Distribution;
use crate::emergency::{screen_emergency, EmergencyFlag};
use crate::features;
use crate::history::{self, HistoryMatch, HistoryNote};
use crate::knowledge::KnowledgeBase;
use crate::model::{Classifier, ModelBundle, Vectorizer};
use crate::normalizer::Normalizer;
use crate::policy::{self, FinalReason, PolicyDecision};
use crate::recommendation::{recommend, Recommendation};
use crate::selector;
use crate::state::CollectedSymptoms;
use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;
use triage_types::{Severity, SymptomKey};

/// Read-only collaborators and tables shared by every session.
#[derive(Clone)]
pub struct EngineContext {
    knowledge: Arc<KnowledgeBase>,
    vectorizer: Arc<dyn Vectorizer>,
    classifier: Arc<dyn Classifier>,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("labels", &self.classifier.labels().len())
            .field("vocabulary", &self.vectorizer.dimension())
            .finish()
    }
}

impl EngineContext {
    pub fn builder() -> EngineContextBuilder {
        EngineContextBuilder::default()
    }

    /// Loads the knowledge base and `model.json` from `dir`.
    pub fn load_dir(dir: &Path, config: &EngineConfig) -> TriageResult<Self> {
        let knowledge = KnowledgeBase::load_dir(dir)?;
        let model_path = dir.join(MODEL_FILENAME);
        if !model_path.is_file() {
            return Err(TriageError::ArtifactUnavailable(format!(
                "missing {}",
                model_path.display()
            )));
        }
        let bundle = ModelBundle::from_json(
            &std::fs::read_to_string(&model_path).map_err(TriageError::FileRead)?,
        )?;

        Self::builder()
            .knowledge(knowledge)
            .model_bundle(bundle)
            .build(config)
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    pub fn vectorizer(&self) -> &dyn Vectorizer {
        self.vectorizer.as_ref()
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }
}

/// Collects the pieces of an [`EngineContext`]; every piece is required.
#[derive(Default)]
pub struct EngineContextBuilder {
    knowledge: Option<Arc<KnowledgeBase>>,
    vectorizer: Option<Arc<dyn Vectorizer>>,
    classifier: Option<Arc<dyn Classifier>>,
}

impl EngineContextBuilder {
    pub fn knowledge(mut self, knowledge: impl Into<Arc<KnowledgeBase>>) -> Self {
        self.knowledge = Some(knowledge.into());
        self
    }

    pub fn vectorizer(mut self, vectorizer: Arc<dyn Vectorizer>) -> Self {
        self.vectorizer = Some(vectorizer);
        self
    }

    pub fn classifier(mut self, classifier: Arc<dyn Classifier>) -> Self {
        self.classifier = Some(classifier);
        self
    }

    pub fn model_bundle(self, bundle: ModelBundle) -> Self {
        self.vectorizer(Arc::new(bundle.vectorizer))
            .classifier(Arc::new(bundle.classifier))
    }

    /// # Errors
    ///
    /// - `TriageError::ArtifactUnavailable` if a piece was never supplied.
    /// - `TriageError::InvalidArtifact` if the classifier's input width differs from the
    ///   vectorizer's dimension.
    pub fn build(self, config: &EngineConfig) -> TriageResult<EngineContext> {
        let knowledge = self
            .knowledge
            .ok_or_else(|| TriageError::ArtifactUnavailable("knowledge base".into()))?;
        let vectorizer = self
            .vectorizer
            .ok_or_else(|| TriageError::ArtifactUnavailable("vectorizer".into()))?;
        let classifier = self
            .classifier
            .ok_or_else(|| TriageError::ArtifactUnavailable("classifier".into()))?;

        if classifier.input_width() != vectorizer.dimension() {
            return Err(TriageError::InvalidArtifact(format!(
                "classifier expects {} features but vectorizer produces {}",
                classifier.input_width(),
                vectorizer.dimension()
            )));
        }

        // Misaligned stop-word policies are reported, never corrected.
        if let Some(built_with) = vectorizer.stopword_filtered() {
            if built_with != config.filter_stopwords() {
                tracing::warn!(
                    vocabulary_filtered = built_with,
                    config_filtered = config.filter_stopwords(),
                    "stop-word policy differs from the one the vocabulary was built with; feature indices will not align"
                );
            }
        }

        let unmapped = classifier
            .labels()
            .iter()
            .filter(|label| knowledge.disease_map.profile(label).is_none())
            .count();
        if unmapped > 0 {
            tracing::debug!(unmapped, "labels without a symptom profile");
        }

        Ok(EngineContext {
            knowledge,
            vectorizer,
            classifier,
        })
    }
}

/// Wire form of one turn's input.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnRequest {
    pub collected_symptoms: BTreeMap<String, i64>,
    #[serde(default)]
    pub denied_symptoms: Vec<String>,
    #[serde(default)]
    pub question_counter: u32,
    #[serde(default)]
    pub patient_history: Vec<String>,
}

/// Validated turn input.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TurnInput {
    pub collected: CollectedSymptoms,
    pub denied: BTreeSet<SymptomKey>,
    pub question_counter: u32,
    pub patient_history: Vec<String>,
}

fn usable_key(symptom: &str) -> Option<SymptomKey> {
    match SymptomKey::new(symptom) {
        Ok(key) => Some(key),
        Err(e) => {
            tracing::warn!(symptom, "skipping symptom: {}", e);
            None
        }
    }
}

impl TurnRequest {
    /// Canonicalises symptom keys and checks severities.
    ///
    /// Blank or separator-only symptoms are skipped. Denied symptoms that are also confirmed are
    /// dropped from the denied set.
    ///
    /// # Errors
    ///
    /// Returns `TriageError::Types` for a severity outside 1 to 5.
    pub fn to_input(&self) -> TriageResult<TurnInput> {
        let collected = self
            .collected_symptoms
            .iter()
            .filter_map(|(symptom, severity)| {
                let key = usable_key(symptom)?;
                Some(Severity::new(*severity).map(|s| (key, s)))
            })
            .collect::<Result<CollectedSymptoms, _>>()?;
        let denied = self
            .denied_symptoms
            .iter()
            .filter_map(|symptom| usable_key(symptom))
            .filter(|key| !collected.contains(key))
            .collect();

        Ok(TurnInput {
            collected,
            denied,
            question_counter: self.question_counter,
            patient_history: self.patient_history.clone(),
        })
    }
}

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Prediction {
    pub label: String,
    /// Probability as a percentage.
    pub confidence: f64,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NextQuestion {
    pub token: SymptomKey,
    pub text: String,
}

impl NextQuestion {
    pub fn new(token: SymptomKey) -> Self {
        let text = format!("Are you experiencing '{}'?", token.display_text());
        Self { token, text }
    }
}

/// Wire form of one turn's result.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct TurnResponse {
    pub predictions: Vec<Prediction>,
    pub is_final: bool,
    pub final_reason: Option<FinalReason>,
    pub next_question: Option<NextQuestion>,
    pub history_note: Option<String>,
    pub emergency: Option<EmergencyFlag>,
    /// Present only on final responses.
    pub recommendation: Option<Recommendation>,
}

impl TurnResponse {
    pub fn top_confidence(&self) -> f64 {
        self.predictions.first().map_or(0.0, |p| p.confidence)
    }

    /// Marks the response final for `reason` and attaches the recommendation.
    pub fn finalize(&mut self, reason: FinalReason) {
        self.is_final = true;
        self.final_reason = Some(reason);
        self.next_question = None;
        self.recommendation = Some(recommend(
            self.predictions.first().map(|p| p.label.as_str()),
            self.top_confidence(),
            self.emergency.as_ref(),
        ));
    }

    pub fn to_json(&self) -> TriageResult<String> {
        serde_json::to_string_pretty(self).map_err(TriageError::Serialization)
    }
}

/// Everything one turn computed, before it is trimmed to the wire form.
#[derive(Clone, Debug, PartialEq)]
pub struct Evaluation {
    pub distribution: Distribution,
    pub history_matches: Vec<HistoryMatch>,
    pub history_note: Option<HistoryNote>,
    pub decision: PolicyDecision,
    pub emergency: Option<EmergencyFlag>,
}

fn top_percent(distribution: &Distribution) -> f64 {
    distribution.top().map_or(0.0, |t| t.probability * 100.0)
}

impl Evaluation {
    pub fn top_confidence(&self) -> f64 {
        top_percent(&self.distribution)
    }

    pub fn to_response(&self, top_k: usize) -> TurnResponse {
        let predictions = self
            .distribution
            .ranked(top_k)
            .into_iter()
            .map(|r| Prediction {
                label: r.label.to_string(),
                confidence: r.probability * 100.0,
            })
            .collect();

        let mut response = TurnResponse {
            predictions,
            is_final: false,
            final_reason: None,
            next_question: None,
            history_note: self.history_note.as_ref().map(ToString::to_string),
            emergency: self.emergency.clone(),
            recommendation: None,
        };
        match &self.decision {
            PolicyDecision::Final(reason) => response.finalize(*reason),
            PolicyDecision::Ask(pick) => {
                response.next_question = Some(NextQuestion::new(pick.token.clone()));
            }
        }
        response
    }
}

/// Runs one turn over validated input.
///
/// # Errors
///
/// Returns `TriageError::EmptySymptoms` if nothing has been confirmed, before any computation.
pub fn evaluate(
    ctx: &EngineContext,
    config: &EngineConfig,
    input: &TurnInput,
) -> TriageResult<Evaluation> {
    if input.collected.is_empty() {
        return Err(TriageError::EmptySymptoms);
    }

    let normalizer = Normalizer::new(config.filter_stopwords());
    let text = input
        .collected
        .keys()
        .map(SymptomKey::as_str)
        .collect::<Vec<_>>()
        .join(" ");
    let tokens = normalizer.normalize(&text);

    let base = ctx.vectorizer.vectorize(&tokens);
    let weighted = features::weight(&base, ctx.vectorizer.vocabulary(), &input.collected);
    let distribution = ctx.classifier.infer(&weighted)?;

    let knowledge = ctx.knowledge();
    let collected_keys = input.collected.key_set();
    let boosted = history::boost(
        &distribution,
        &collected_keys,
        &input.patient_history,
        &knowledge.history_catalog,
        config.history_scope(),
    )?;

    let top_confidence = top_percent(&boosted.distribution);
    let decision = policy::decide(
        top_confidence,
        input.question_counter,
        config.max_questions(),
        || {
            selector::next_question(
                &boosted.distribution,
                &input.collected,
                &input.denied,
                &knowledge.disease_map,
                &knowledge.severity_table,
            )
        },
    );

    match &decision {
        PolicyDecision::Ask(pick) => tracing::debug!(
            question = %pick.token,
            source = ?pick.source,
            top_confidence,
            question_counter = input.question_counter,
            "asking follow-up"
        ),
        PolicyDecision::Final(reason) => tracing::debug!(
            %reason,
            top_confidence,
            question_counter = input.question_counter,
            "session final"
        ),
    }

    Ok(Evaluation {
        distribution: boosted.distribution,
        history_matches: boosted.matches,
        history_note: boosted.note,
        decision,
        emergency: screen_emergency(input.collected.keys()),
    })
}

/// Validates a wire request and evaluates it.
pub fn evaluate_turn(
    ctx: &EngineContext,
    config: &EngineConfig,
    request: &TurnRequest,
) -> TriageResult<TurnResponse> {
    if request.collected_symptoms.is_empty() {
        return Err(TriageError::EmptySymptoms);
    }
    let input = request.to_input()?;
    Ok(evaluate(ctx, config, &input)?.to_response(config.top_k()))
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::features::FeatureVector;
    use crate::knowledge::DiseaseSymptomMap;
    use crate::model::TfidfVectorizer;
    use std::collections::HashMap;

    /// Classifier that ignores its input and returns fixed probabilities.
    pub struct FixedClassifier {
        pub labels: Vec<String>,
        pub probabilities: Vec<f64>,
        pub width: usize,
    }

    impl Classifier for FixedClassifier {
        fn labels(&self) -> &[String] {
            &self.labels
        }

        fn input_width(&self) -> usize {
            self.width
        }

        fn infer(&self, _features: &FeatureVector) -> TriageResult<Distribution> {
            Distribution::from_parts(&self.labels, self.probabilities.clone())
        }
    }

    pub fn vocabulary_vectorizer() -> TfidfVectorizer {
        let vocabulary: HashMap<String, usize> = ["fever", "cough", "chest", "pain", "breathlessness"]
            .iter()
            .enumerate()
            .map(|(i, w)| (w.to_string(), i))
            .collect();
        TfidfVectorizer::new(vocabulary, vec![1.0; 5], Some(false)).unwrap()
    }

    pub fn disease_map() -> DiseaseSymptomMap {
        DiseaseSymptomMap::new([
            ("Flu", vec!["high fever", "cough", "chills", "fatigue", "fever"]),
            ("Common Cold", vec!["cough", "runny nose", "continuous sneezing", "fever"]),
            ("Heart attack", vec!["vomiting", "breathlessness", "sweating", "chest pain"]),
            ("GERD", vec!["stomach pain", "acidity", "chest pain", "cough"]),
        ])
    }

    pub fn context(pairs: &[(&str, f64)], map: DiseaseSymptomMap) -> EngineContext {
        let vectorizer = vocabulary_vectorizer();
        let classifier = FixedClassifier {
            labels: pairs.iter().map(|(l, _)| l.to_string()).collect(),
            probabilities: pairs.iter().map(|(_, p)| *p).collect(),
            width: vectorizer.dimension(),
        };
        EngineContext::builder()
            .knowledge(KnowledgeBase::with_disease_map(map))
            .vectorizer(Arc::new(vectorizer))
            .classifier(Arc::new(classifier))
            .build(&EngineConfig::default())
            .unwrap()
    }

    pub fn request(collected: &[(&str, i64)], denied: &[&str], counter: u32) -> TurnRequest {
        TurnRequest {
            collected_symptoms: collected.iter().map(|(k, s)| (k.to_string(), *s)).collect(),
            denied_symptoms: denied.iter().map(|s| s.to_string()).collect(),
            question_counter: counter,
            patient_history: Vec::new(),
        }
    }
}
