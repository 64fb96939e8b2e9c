//! Core runtime configuration.
//!
//! The question budget, stop-word filtering and the history scope are deployment choices.
//! They live in one struct that is resolved once at process startup and then passed into every
//! core call. Nothing in this module reads process-wide environment variables; the
//! `*_from_env_value` helpers take the raw value so callers decide where it comes from.

use crate::constants::{
    DEFAULT_MAX_QUESTIONS, DEFAULT_TOP_K, DISEASE_SYMPTOM_MAP_FILENAME, KNOWLEDGE_DIR,
};
use crate::{TriageError, TriageResult};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Which history conditions the booster scans.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HistoryScope {
    /// Only conditions the patient declared at intake.
    #[default]
    PatientOnly,
    /// Every condition in the catalog, regardless of the patient's declarations.
    AllKnown,
}

impl FromStr for HistoryScope {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('_', "-").as_str() {
            "patient-only" => Ok(Self::PatientOnly),
            "all-known" => Ok(Self::AllKnown),
            other => Err(TriageError::InvalidInput(format!(
                "unknown history scope '{}' (expected patient-only or all-known)",
                other
            ))),
        }
    }
}

impl fmt::Display for HistoryScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PatientOnly => write!(f, "patient-only"),
            Self::AllKnown => write!(f, "all-known"),
        }
    }
}

/// Engine configuration resolved at startup.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    max_questions: u32,
    filter_stopwords: bool,
    history_scope: HistoryScope,
    top_k: usize,
}

impl EngineConfig {
    /// Create a new `EngineConfig`.
    ///
    /// `filter_stopwords` must match the policy used when the classifier's vocabulary was built;
    /// a mismatch silently misaligns features and is not detected here.
    pub fn new(
        max_questions: u32,
        filter_stopwords: bool,
        history_scope: HistoryScope,
        top_k: usize,
    ) -> TriageResult<Self> {
        if max_questions == 0 {
            return Err(TriageError::InvalidInput(
                "max_questions must be at least 1".into(),
            ));
        }
        if top_k == 0 {
            return Err(TriageError::InvalidInput("top_k must be at least 1".into()));
        }

        Ok(Self {
            max_questions,
            filter_stopwords,
            history_scope,
            top_k,
        })
    }

    pub fn max_questions(&self) -> u32 {
        self.max_questions
    }

    pub fn filter_stopwords(&self) -> bool {
        self.filter_stopwords
    }

    pub fn history_scope(&self) -> HistoryScope {
        self.history_scope
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_questions: DEFAULT_MAX_QUESTIONS,
            filter_stopwords: false,
            history_scope: HistoryScope::PatientOnly,
            top_k: DEFAULT_TOP_K,
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the question budget from an optional string value.
///
/// If `value` is `None` or empty/whitespace, returns [`DEFAULT_MAX_QUESTIONS`].
pub fn max_questions_from_env_value(value: Option<String>) -> TriageResult<u32> {
    match non_blank(value) {
        None => Ok(DEFAULT_MAX_QUESTIONS),
        Some(v) => v.parse::<u32>().map_err(|_| {
            TriageError::InvalidInput(format!("max questions must be a positive integer, got '{}'", v))
        }),
    }
}

/// Parse the stop-word policy from an optional string value. Defaults to `false`.
pub fn filter_stopwords_from_env_value(value: Option<String>) -> TriageResult<bool> {
    match non_blank(value).map(|v| v.to_ascii_lowercase()) {
        None => Ok(false),
        Some(v) => match v.as_str() {
            "1" | "true" | "yes" | "on" => Ok(true),
            "0" | "false" | "no" | "off" => Ok(false),
            _ => Err(TriageError::InvalidInput(format!(
                "filter stopwords must be a boolean, got '{}'",
                v
            ))),
        },
    }
}

/// Parse the history scope from an optional string value. Defaults to patient-only.
pub fn history_scope_from_env_value(value: Option<String>) -> TriageResult<HistoryScope> {
    let parsed = non_blank(value).map(|v| v.parse::<HistoryScope>()).transpose()?;
    Ok(parsed.unwrap_or_default())
}

/// Resolve the knowledge directory without reading environment variables.
///
/// If `override_dir` is provided, it must be a directory containing the disease-symptom map.
/// Otherwise this searches for `knowledge/` relative to the current working directory and then
/// walks up from `CARGO_MANIFEST_DIR`.
pub fn resolve_knowledge_dir(override_dir: Option<PathBuf>) -> TriageResult<PathBuf> {
    fn looks_like_knowledge_dir(path: &Path) -> bool {
        path.join(DISEASE_SYMPTOM_MAP_FILENAME).is_file()
    }

    if let Some(dir) = override_dir {
        if dir.is_dir() && looks_like_knowledge_dir(&dir) {
            return Ok(dir);
        }
        return Err(TriageError::ArtifactUnavailable(format!(
            "knowledge directory {} must contain {}",
            dir.display(),
            DISEASE_SYMPTOM_MAP_FILENAME
        )));
    }

    let cwd_relative = PathBuf::from(KNOWLEDGE_DIR);
    if looks_like_knowledge_dir(&cwd_relative) {
        return Ok(cwd_relative);
    }

    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    for ancestor in manifest_dir.ancestors() {
        let candidate = ancestor.join(KNOWLEDGE_DIR);
        if looks_like_knowledge_dir(&candidate) {
            return Ok(candidate);
        }
    }

    Err(TriageError::ArtifactUnavailable(format!(
        "could not locate {}/ directory with {}",
        KNOWLEDGE_DIR, DISEASE_SYMPTOM_MAP_FILENAME
    )))
}
