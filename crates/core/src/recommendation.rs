//! Final recommendation attached to a finished session.
//!
//! Urgency is `EMERGENCY` whenever emergency symptoms were reported, otherwise `MEDIUM` at a top
//! confidence of at least 80% and `LOW` below. Department routing beyond the emergency and
//! general departments is left to the caller.

use crate::constants::{EMERGENCY_DEPARTMENT, FALLBACK_DEPARTMENT, MEDIUM_URGENCY_CONFIDENCE};
use crate::emergency::EmergencyFlag;
use serde::Serialize;
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Urgency {
    Emergency,
    Medium,
    Low,
}

impl fmt::Display for Urgency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Emergency => write!(f, "EMERGENCY"),
            Self::Medium => write!(f, "MEDIUM"),
            Self::Low => write!(f, "LOW"),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Recommendation {
    pub urgency: Urgency,
    pub department: String,
    pub message: String,
}

/// Builds the recommendation for the leading label.
pub fn recommend(
    top_label: Option<&str>,
    top_confidence: f64,
    emergency: Option<&EmergencyFlag>,
) -> Recommendation {
    let (urgency, department) = if emergency.is_some() {
        (Urgency::Emergency, EMERGENCY_DEPARTMENT)
    } else if top_confidence >= MEDIUM_URGENCY_CONFIDENCE {
        (Urgency::Medium, FALLBACK_DEPARTMENT)
    } else {
        (Urgency::Low, FALLBACK_DEPARTMENT)
    };

    let message = match top_label {
        Some(label) => format!(
            "Our preliminary diagnosis is {}. We recommend consulting {}. Urgency level: {}.",
            label.replace('_', " "),
            department,
            urgency
        ),
        None => format!(
            "We recommend consulting {}. Urgency level: {}.",
            department, urgency
        ),
    };

    Recommendation {
        urgency,
        department: department.to_string(),
        message,
    }
}
