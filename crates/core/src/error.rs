use triage_types::TypesError;

#[derive(Debug, thiserror::Error)]
pub enum TriageError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("at least one symptom is required")]
    EmptySymptoms,
    #[error("artifact unavailable: {0}")]
    ArtifactUnavailable(String),
    #[error("invalid artifact: {0}")]
    InvalidArtifact(String),
    #[error("invalid answer: {0}")]
    InvalidAnswer(String),
    #[error("unexpected session phase: expected {expected}, found {actual}")]
    UnexpectedPhase {
        expected: &'static str,
        actual: &'static str,
    },

    #[error("invalid symptom data: {0}")]
    Types(#[from] TypesError),

    #[error("failed to read knowledge file: {0}")]
    FileRead(std::io::Error),
    #[error("failed to serialize turn: {0}")]
    Serialization(serde_json::Error),
    #[error("failed to deserialize JSON: {0}")]
    Deserialization(serde_json::Error),
    #[error("failed to deserialize YAML: {0}")]
    YamlDeserialization(serde_yaml::Error),
}

pub type TriageResult<T> = std::result::Result<T, TriageError>;
