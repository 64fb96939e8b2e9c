//! Catalog of chronic and genetic history conditions.
//!
//! Each condition carries the symptom profile the history booster compares against a patient's
//! confirmed symptoms. The built-in catalog lists the 17 chronic and 4 genetic conditions the
//! intake form offers, in that order.

use crate::{TriageError, TriageResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use triage_types::SymptomKey;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConditionKind {
    Chronic,
    Genetic,
}

impl std::fmt::Display for ConditionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Chronic => write!(f, "chronic"),
            Self::Genetic => write!(f, "genetic"),
        }
    }
}

/// A named history condition with its symptom profile.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryCondition {
    pub name: String,
    pub kind: ConditionKind,
    pub profile: BTreeSet<SymptomKey>,
}

/// Name comparison form: lowercase, underscores as spaces, trimmed.
pub fn normalize_condition_name(name: &str) -> String {
    name.replace('_', " ").trim().to_lowercase()
}

/// Ordered, read-only list of history conditions.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HistoryCatalog {
    conditions: Vec<HistoryCondition>,
}

impl HistoryCatalog {
    pub fn new(conditions: Vec<HistoryCondition>) -> TriageResult<Self> {
        let mut seen = BTreeSet::new();
        for condition in &conditions {
            if !seen.insert(normalize_condition_name(&condition.name)) {
                return Err(TriageError::InvalidArtifact(format!(
                    "history condition '{}' is listed twice",
                    condition.name
                )));
            }
        }
        Ok(Self { conditions })
    }

    /// Parses a YAML list of `{name, kind, profile}` entries.
    pub fn from_yaml(yaml: &str) -> TriageResult<Self> {
        let conditions: Vec<HistoryCondition> =
            serde_yaml::from_str(yaml).map_err(TriageError::YamlDeserialization)?;
        Self::new(conditions)
    }

    pub fn builtin() -> Self {
        let conditions = CHRONIC_CONDITIONS
            .iter()
            .map(|entry| (ConditionKind::Chronic, entry))
            .chain(
                GENETIC_CONDITIONS
                    .iter()
                    .map(|entry| (ConditionKind::Genetic, entry)),
            )
            .map(|(kind, (name, profile))| HistoryCondition {
                name: (*name).to_string(),
                kind,
                profile: profile
                    .iter()
                    .filter_map(|symptom| SymptomKey::new(symptom).ok())
                    .collect(),
            })
            .collect();
        Self { conditions }
    }

    pub fn iter(&self) -> impl Iterator<Item = &HistoryCondition> {
        self.conditions.iter()
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Finds a condition by name, ignoring case and `_`/space differences.
    pub fn find(&self, name: &str) -> Option<&HistoryCondition> {
        let wanted = normalize_condition_name(name);
        self.conditions
            .iter()
            .find(|c| normalize_condition_name(&c.name) == wanted)
    }
}

impl Default for HistoryCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

type CatalogEntry = (&'static str, &'static [&'static str]);

const CHRONIC_CONDITIONS: &[CatalogEntry] = &[
    ("Hypertension", &["headache", "chest_pain", "dizziness", "loss_of_balance", "lack_of_concentration"]),
    ("Migraine", &["acidity", "indigestion", "headache", "blurred_and_distorted_vision", "excessive_hunger", "stiff_neck", "depression", "irritability", "visual_disturbances"]),
    ("Cervical spondylosis", &["back_pain", "weakness_in_limbs", "neck_pain", "dizziness", "loss_of_balance"]),
    ("Diabetes", &["fatigue", "weight_loss", "restlessness", "lethargy", "irregular_sugar_level", "blurred_and_distorted_vision", "obesity", "excessive_hunger", "increased_appetite", "polyuria"]),
    ("Arthritis", &["muscle_weakness", "stiff_neck", "swelling_joints", "movement_stiffness", "spinning_movements", "loss_of_balance", "unsteadiness", "weakness_of_one_body_side"]),
    ("Chronic cholestasis", &["itching", "vomiting", "yellowish_skin", "nausea", "loss_of_appetite", "abdominal_pain", "yellowing_of_eyes"]),
    ("Heart attack", &["vomiting", "breathlessness", "sweating", "chest_pain"]),
    ("Bronchial Asthma", &["fatigue", "cough", "high_fever", "breathlessness", "family_history", "mucoid_sputum"]),
    ("GERD", &["stomach_pain", "acidity", "ulcers_on_tongue", "vomiting", "cough", "chest_pain"]),
    ("Peptic ulcer diseae", &["vomiting", "loss_of_appetite", "abdominal_pain", "passage_of_gases", "internal_itching"]),
    ("Osteoarthristis", &["joint_pain", "neck_pain", "knee_pain", "hip_joint_pain", "swelling_joints", "painful_walking"]),
    ("Hypothyroidism", &["fatigue", "weight_gain", "cold_hands_and_feets", "mood_swings", "lethargy", "dizziness", "puffy_face_and_eyes", "enlarged_thyroid", "brittle_nails", "swollen_extremeties", "depression", "irritability", "abnormal_menstruation"]),
    ("Hyperthyroidism", &["fatigue", "mood_swings", "weight_loss", "restlessness", "sweating", "diarrhoea", "fast_heart_rate", "excessive_hunger", "muscle_weakness", "irritability", "abnormal_menstruation"]),
    ("Hypoglycemia", &["vomiting", "fatigue", "anxiety", "sweating", "headache", "nausea", "blurred_and_distorted_vision", "excessive_hunger", "drying_and_tingling_lips", "slurred_speech", "irritability", "palpitations"]),
    ("Psoriasis", &["skin_rash", "joint_pain", "skin_peeling", "silver_like_dusting", "small_dents_in_nails", "inflammatory_nails"]),
    ("Varicose veins", &["fatigue", "cramps", "bruising", "obesity", "swollen_legs", "swollen_blood_vessels", "prominent_veins_on_calf"]),
    ("Paralysis (brain hemorrhage)", &["vomiting", "headache", "weakness_of_one_body_side", "altered_sensorium"]),
];

const GENETIC_CONDITIONS: &[CatalogEntry] = &[
    ("Hemochromatosis", &["joint_pain", "vomiting", "fatigue", "high_fever", "loss_of_appetite", "abdominal_pain", "yellowing_of_eyes"]),
    ("Thalassemia", &["fatigue", "weight_loss", "breathlessness", "yellowish_skin", "dark_urine", "loss_of_appetite", "abdominal_pain", "yellowing_of_eyes", "enlarged_spleen"]),
    ("Sickle cell anemia", &["joint_pain", "vomiting", "fatigue", "high_fever", "breathlessness", "swelling_joints", "pain_in_bones", "chest_pain", "swelling_extremeties"]),
    ("Cystic fibrosis", &["fatigue", "cough", "high_fever", "breathlessness", "mucoid_sputum", "rusty_sputum", "salty_taste_in_mouth", "weight_loss", "family_history"]),
];
