//! Validated value types shared across the triage workspace.
//!
//! Symptoms arrive from many places: free text typed by a patient, tokens echoed back by a
//! client, phrases in the disease-symptom map and keys in the severity table. They do not agree
//! on separators (`chest_pain`, `chest pain`, `Chest-Pain`). [`SymptomKey`] fixes one canonical
//! form so that set operations across those sources line up.
//!
//! ## Canonical symptom key
//! - Lowercase
//! - Fragments separated by `_`, `-`, `,` or whitespace are joined with a single `_`
//! - Never empty
//!
//! Example: `" Watering from-Eyes "` becomes `watering_from_eyes`.

use std::fmt;
use std::str::FromStr;

/// Errors that can occur when creating validated symptom types.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TypesError {
    /// The symptom text was empty or contained only separators
    #[error("symptom cannot be empty")]
    EmptySymptom,
    /// Severity outside the 1..=5 scale
    #[error("severity must be between 1 and 5, got {0}")]
    SeverityOutOfRange(i64),
    /// Severity text that is not an integer
    #[error("severity must be a whole number, got '{0}'")]
    SeverityNotANumber(String),
}

/// A symptom identifier in canonical form.
///
/// Once constructed the inner string is guaranteed to be canonical, so two keys built from
/// `"chest pain"` and `"CHEST_PAIN"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SymptomKey(String);

impl SymptomKey {
    /// Creates a canonical key from any symptom spelling.
    ///
    /// # Errors
    ///
    /// Returns [`TypesError::EmptySymptom`] if nothing but separators remain.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TypesError> {
        let canonical = Self::canonicalise(input.as_ref());
        if canonical.is_empty() {
            return Err(TypesError::EmptySymptom);
        }
        Ok(Self(canonical))
    }

    /// Returns the canonical form of `input` without validating it is non-empty.
    pub fn canonicalise(input: &str) -> String {
        input
            .to_lowercase()
            .split(|c: char| c == '_' || c == '-' || c == ',' || c.is_whitespace())
            .filter(|fragment| !fragment.is_empty())
            .collect::<Vec<_>>()
            .join("_")
    }

    /// Returns the inner key as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Human readable form with underscores shown as spaces.
    pub fn display_text(&self) -> String {
        self.0.replace('_', " ")
    }
}

impl fmt::Display for SymptomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SymptomKey {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for SymptomKey {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl serde::Serialize for SymptomKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SymptomKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SymptomKey::new(&s).map_err(serde::de::Error::custom)
    }
}

/// Patient-reported severity on a 1 (mild) to 5 (severe) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Severity(u8);

impl Severity {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    /// Severity assumed for symptoms whose severity was never elicited.
    pub const DEFAULT: Severity = Severity(2);

    /// # Errors
    ///
    /// Returns [`TypesError::SeverityOutOfRange`] outside 1..=5.
    pub fn new(value: i64) -> Result<Self, TypesError> {
        if (i64::from(Self::MIN)..=i64::from(Self::MAX)).contains(&value) {
            Ok(Self(value as u8))
        } else {
            Err(TypesError::SeverityOutOfRange(value))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }

    /// Feature multiplier `1 + (severity - 1) * 0.5`: 1.0 for mild up to 3.0 for severe.
    pub fn amplification(self) -> f64 {
        1.0 + f64::from(self.0 - 1) * 0.5
    }
}

impl Default for Severity {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Severity {
    type Err = TypesError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let value = trimmed
            .parse::<i64>()
            .map_err(|_| TypesError::SeverityNotANumber(trimmed.to_owned()))?;
        Self::new(value)
    }
}

impl serde::Serialize for Severity {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_u8(self.0)
    }
}

impl<'de> serde::Deserialize<'de> for Severity {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let value = i64::deserialize(deserializer)?;
        Severity::new(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_symptom_key_canonicalises_separators_and_case() {
        let key = SymptomKey::new(" Watering from-Eyes ").unwrap();
        assert_eq!(key.as_str(), "watering_from_eyes");
        assert_eq!(key.display_text(), "watering from eyes");
    }

    #[test]
    fn test_symptom_key_spellings_compare_equal() {
        let a = SymptomKey::new("chest pain").unwrap();
        let b = SymptomKey::new("CHEST_PAIN").unwrap();
        let c = SymptomKey::new("chest--pain").unwrap();
        assert_eq!(a, b);
        assert_eq!(b, c);
    }

    #[test]
    fn test_symptom_key_rejects_separator_only_input() {
        assert_eq!(SymptomKey::new(" _- , ").unwrap_err(), TypesError::EmptySymptom);
        assert!(SymptomKey::new("").is_err());
    }

    #[test]
    fn test_symptom_key_canonical_form_is_stable() {
        let once = SymptomKey::canonicalise("Paralysis (brain hemorrhage)");
        assert_eq!(once, "paralysis_(brain_hemorrhage)");
        assert_eq!(SymptomKey::canonicalise(&once), once);
    }

    #[test]
    fn test_symptom_key_deserialize_canonicalises() {
        let key: SymptomKey = serde_json::from_str("\"High Fever\"").unwrap();
        assert_eq!(key.as_str(), "high_fever");
        assert!(serde_json::from_str::<SymptomKey>("\"  \"").is_err());
    }

    #[test]
    fn test_severity_bounds() {
        assert!(Severity::new(0).is_err());
        assert!(Severity::new(6).is_err());
        assert_eq!(Severity::new(1).unwrap().value(), 1);
        assert_eq!(Severity::new(5).unwrap().value(), 5);
        assert_eq!(Severity::default().value(), 2);
    }

    #[test]
    fn test_severity_amplification_ratios() {
        let mild = Severity::new(1).unwrap().amplification();
        let moderate = Severity::new(3).unwrap().amplification();
        let severe = Severity::new(5).unwrap().amplification();
        assert_eq!(mild, 1.0);
        assert_eq!(moderate, 2.0);
        assert_eq!(severe, 3.0);
    }

    #[test]
    fn test_severity_parse() {
        assert_eq!(" 4 ".parse::<Severity>().unwrap().value(), 4);
        assert!(matches!(
            "four".parse::<Severity>(),
            Err(TypesError::SeverityNotANumber(_))
        ));
        assert!(matches!(
            "9".parse::<Severity>(),
            Err(TypesError::SeverityOutOfRange(9))
        ));
    }

    #[test]
    fn test_severity_deserialize_validates_range() {
        let severity: Severity = serde_json::from_str("3").unwrap();
        assert_eq!(severity.value(), 3);
        assert!(serde_json::from_str::<Severity>("7").is_err());
    }
}
