//! Constants used throughout the triage core crate.
//!
//! Tuning values of the decision policy and the filenames of the knowledge directory live here
//! so that every module reads the same numbers.

/// Default number of confirmed follow-up symptoms before the session is forced to stop.
pub const DEFAULT_MAX_QUESTIONS: u32 = 7;

/// Default number of ranked predictions returned per turn.
pub const DEFAULT_TOP_K: usize = 5;

/// Confidence (percent) required to stop before any follow-up has been confirmed.
pub const INITIAL_CONFIDENCE_THRESHOLD: f64 = 98.0;

/// Confidence (percent) required to stop once at least one follow-up has been confirmed.
pub const FOLLOW_UP_CONFIDENCE_THRESHOLD: f64 = 85.0;

/// Proportional boost applied to a label matching a history condition, scaled by match score.
pub const HISTORY_BOOST_FACTOR: f64 = 0.15;

/// Minimum number of shared symptoms for a history condition to match.
pub const HISTORY_MIN_OVERLAP: usize = 2;

/// Minimum share of a history condition's profile that must be present for it to match.
pub const HISTORY_MIN_MATCH_RATIO: f64 = 0.4;

/// Priority of symptoms missing from the severity table.
pub const UNLISTED_SYMPTOM_PRIORITY: u8 = 0;

/// Softmax temperature of the reference classifier. Values above 1 soften the distribution.
pub const DEFAULT_TEMPERATURE: f64 = 2.0;

/// Tolerance used when checking that a distribution sums to one.
pub const DISTRIBUTION_TOLERANCE: f64 = 1e-6;

/// Directory searched for knowledge files when no explicit directory is configured.
pub const KNOWLEDGE_DIR: &str = "knowledge";

/// Filename of the label to symptom-profile map.
pub const DISEASE_SYMPTOM_MAP_FILENAME: &str = "disease_symptom_map.json";

/// Filename of an optional history catalog overriding the built-in one.
pub const HISTORY_CATALOG_FILENAME: &str = "history_catalog.yaml";

/// Filename of an optional severity table overriding the built-in one.
pub const SEVERITY_TABLE_FILENAME: &str = "severity_table.yaml";

/// Filename of the serialised reference vectorizer and classifier.
pub const MODEL_FILENAME: &str = "model.json";

/// Top confidence (percent) at or above which a non-emergency outcome is rated medium urgency.
pub const MEDIUM_URGENCY_CONFIDENCE: f64 = 80.0;

/// Department recommended when an emergency symptom was reported.
pub const EMERGENCY_DEPARTMENT: &str = "Emergency Medicine";

/// Department recommended when no specialised mapping applies.
pub const FALLBACK_DEPARTMENT: &str = "General Medicine";
