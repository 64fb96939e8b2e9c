//! # Triage Core
//!
//! Decision engine for adaptive symptom questioning.
//!
//! Given the symptoms confirmed so far, each turn:
//! - normalises symptom text into vocabulary tokens,
//! - vectorises the tokens and amplifies features by reported severity,
//! - asks the classifier for a distribution over conditions,
//! - boosts conditions that coincide with the patient's chronic or genetic history,
//! - decides whether to stop, and if not, which symptom to ask about next.
//!
//! Every turn is a pure function of its inputs plus the read-only [`EngineContext`]. The
//! interactive [`Session`] wraps the turn loop for terminal front ends.
//!
//! **No transport concerns**: HTTP servers and model training live outside this crate.

pub mod catalog;
pub mod config;
pub mod constants;
pub mod distribution;
pub mod emergency;
pub mod engine;
pub mod error;
pub mod features;
pub mod history;
pub mod knowledge;
pub mod model;
pub mod normalizer;
pub mod policy;
pub mod recommendation;
pub mod selector;
pub mod session;
pub mod state;
pub mod validation;

pub use catalog::{ConditionKind, HistoryCatalog, HistoryCondition};
pub use config::{EngineConfig, HistoryScope};
pub use distribution::Distribution;
pub use emergency::{screen_emergency, EmergencyFlag};
pub use engine::{
    evaluate, evaluate_turn, EngineContext, EngineContextBuilder, NextQuestion, Prediction,
    TurnInput, TurnRequest, TurnResponse,
};
pub use error::{TriageError, TriageResult};
pub use knowledge::{DiseaseSymptomMap, KnowledgeBase, SeverityTable};
pub use model::{Classifier, MlpClassifier, ModelBundle, TfidfVectorizer, Vectorizer};
pub use normalizer::Normalizer;
pub use policy::{FinalReason, PolicyDecision};
pub use recommendation::{recommend, Recommendation, Urgency};
pub use selector::{QuestionPick, QuestionSource};
pub use session::{PresenceOutcome, Session, SessionOptions, SessionPhase};
pub use state::{CollectedSymptoms, SessionState};
pub use triage_types::{Severity, SymptomKey};
