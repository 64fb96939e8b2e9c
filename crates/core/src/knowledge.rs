//! Static tables shared by every session.
//!
//! The knowledge base is loaded once at startup and never mutated afterwards, so it can be held
//! in an `Arc` and read concurrently by any number of sessions.

use crate::catalog::HistoryCatalog;
use crate::constants::{
    DISEASE_SYMPTOM_MAP_FILENAME, HISTORY_CATALOG_FILENAME, SEVERITY_TABLE_FILENAME,
    UNLISTED_SYMPTOM_PRIORITY,
};
use crate::{TriageError, TriageResult};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::path::Path;
use triage_types::SymptomKey;

/// Label to characteristic symptom profile.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DiseaseSymptomMap {
    profiles: BTreeMap<String, BTreeSet<SymptomKey>>,
}

impl DiseaseSymptomMap {
    /// Builds a map from raw phrases, canonicalising each one. Blank phrases are dropped.
    pub fn new<L, P, S>(profiles: impl IntoIterator<Item = (L, P)>) -> Self
    where
        L: Into<String>,
        P: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            profiles: profiles
                .into_iter()
                .map(|(label, phrases)| {
                    let profile = phrases
                        .into_iter()
                        .filter_map(|phrase| SymptomKey::new(phrase).ok())
                        .collect();
                    (label.into(), profile)
                })
                .collect(),
        }
    }

    /// Parses the JSON object written at training time (label to list of phrases).
    pub fn from_json(json: &str) -> TriageResult<Self> {
        let raw: HashMap<String, Vec<String>> =
            serde_json::from_str(json).map_err(TriageError::Deserialization)?;
        Ok(Self::new(raw))
    }

    /// Profile for `label`, or `None` if the map has no entry for it.
    pub fn profile(&self, label: &str) -> Option<&BTreeSet<SymptomKey>> {
        self.profiles.get(label)
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Closed lookup from symptom to question priority (1..=5). Unlisted symptoms rank 0.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SeverityTable {
    priorities: HashMap<SymptomKey, u8>,
}

impl SeverityTable {
    pub fn new(priorities: HashMap<SymptomKey, u8>) -> TriageResult<Self> {
        if let Some((key, value)) = priorities.iter().find(|(_, v)| !(1..=5).contains(*v)) {
            return Err(TriageError::InvalidArtifact(format!(
                "severity priority for '{}' must be 1..=5, got {}",
                key, value
            )));
        }
        Ok(Self { priorities })
    }

    /// Parses a YAML mapping of symptom to priority.
    pub fn from_yaml(yaml: &str) -> TriageResult<Self> {
        let priorities: HashMap<SymptomKey, u8> =
            serde_yaml::from_str(yaml).map_err(TriageError::YamlDeserialization)?;
        Self::new(priorities)
    }

    pub fn builtin() -> Self {
        let priorities = BUILTIN_SEVERITY
            .iter()
            .filter_map(|(symptom, priority)| {
                SymptomKey::new(symptom).ok().map(|key| (key, *priority))
            })
            .collect();
        Self { priorities }
    }

    pub fn priority(&self, key: &SymptomKey) -> u8 {
        self.priorities
            .get(key)
            .copied()
            .unwrap_or(UNLISTED_SYMPTOM_PRIORITY)
    }

    pub fn len(&self) -> usize {
        self.priorities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.priorities.is_empty()
    }
}

impl Default for SeverityTable {
    fn default() -> Self {
        Self::builtin()
    }
}

const BUILTIN_SEVERITY: &[(&str, u8)] = &[
    ("chest_pain", 5),
    ("breathlessness", 5),
    ("heart_attack", 5),
    ("paralysis_(brain_hemorrhage)", 5),
    ("coma", 5),
    ("blood_in_sputum", 5),
    ("acute_liver_failure", 5),
    ("altered_sensorium", 5),
    ("fast_heart_rate", 4),
    ("high_fever", 3),
    ("loss_of_balance", 3),
    ("unsteadiness", 3),
    ("weakness_of_one_body_side", 3),
    ("pain_behind_the_eyes", 3),
    ("dehydration", 3),
    ("vomiting", 3),
    ("chills", 3),
    ("joint_pain", 3),
    ("abdominal_pain", 3),
    ("diarrhoea", 3),
    ("yellowish_skin", 3),
    ("dark_urine", 3),
    ("swelling_joints", 3),
    ("painful_walking", 3),
    ("dizziness", 3),
    ("stiff_neck", 3),
    ("blurred_and_distorted_vision", 3),
    ("constipation", 3),
    ("sweating", 3),
    ("fatigue", 2),
    ("headache", 2),
    ("nausea", 2),
    ("cough", 2),
    ("skin_rash", 2),
    ("muscle_pain", 2),
    ("lethargy", 2),
    ("weight_loss", 2),
    ("loss_of_appetite", 2),
    ("restlessness", 2),
    ("mood_swings", 2),
    ("itching", 1),
    ("continuous_sneezing", 1),
    ("runny_nose", 1),
    ("acidity", 1),
    ("indigestion", 1),
];

/// Every static table the engine reads.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct KnowledgeBase {
    pub disease_map: DiseaseSymptomMap,
    pub history_catalog: HistoryCatalog,
    pub severity_table: SeverityTable,
}

impl KnowledgeBase {
    /// Knowledge base with the given disease map and built-in catalog and severity table.
    pub fn with_disease_map(disease_map: DiseaseSymptomMap) -> Self {
        Self {
            disease_map,
            history_catalog: HistoryCatalog::builtin(),
            severity_table: SeverityTable::builtin(),
        }
    }

    /// Loads the knowledge directory.
    ///
    /// `disease_symptom_map.json` is required. `history_catalog.yaml` and `severity_table.yaml`
    /// replace the built-in tables when present.
    pub fn load_dir(dir: &Path) -> TriageResult<Self> {
        let map_path = dir.join(DISEASE_SYMPTOM_MAP_FILENAME);
        if !map_path.is_file() {
            return Err(TriageError::ArtifactUnavailable(format!(
                "missing {}",
                map_path.display()
            )));
        }
        let disease_map =
            DiseaseSymptomMap::from_json(&std::fs::read_to_string(&map_path).map_err(TriageError::FileRead)?)?;

        let catalog_path = dir.join(HISTORY_CATALOG_FILENAME);
        let history_catalog = if catalog_path.is_file() {
            HistoryCatalog::from_yaml(
                &std::fs::read_to_string(&catalog_path).map_err(TriageError::FileRead)?,
            )?
        } else {
            HistoryCatalog::builtin()
        };

        let severity_path = dir.join(SEVERITY_TABLE_FILENAME);
        let severity_table = if severity_path.is_file() {
            SeverityTable::from_yaml(
                &std::fs::read_to_string(&severity_path).map_err(TriageError::FileRead)?,
            )?
        } else {
            SeverityTable::builtin()
        };

        tracing::info!(
            labels = disease_map.len(),
            conditions = history_catalog.len(),
            severities = severity_table.len(),
            "loaded knowledge base from {}",
            dir.display()
        );

        Ok(Self {
            disease_map,
            history_catalog,
            severity_table,
        })
    }
}
