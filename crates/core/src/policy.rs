//! Stopping policy.
//!
//! After every prediction the session either stops or asks one more question:
//! - stop once the top confidence reaches the threshold and at least one follow-up was confirmed
//!   (98% before any follow-up, 85% after);
//! - stop once the question budget is spent;
//! - otherwise ask the selector's question, or stop if it has none.
//!
//! The counter only grows on confirmed answers, and every denial shrinks the pool of unasked
//! symptoms, so a session always ends.

use crate::constants::{FOLLOW_UP_CONFIDENCE_THRESHOLD, INITIAL_CONFIDENCE_THRESHOLD};
use crate::selector::QuestionPick;
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FinalReason {
    ConfidenceReached,
    QuestionLimit,
    QuestionsExhausted,
    Emergency,
}

impl std::fmt::Display for FinalReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            Self::ConfidenceReached => "confidence threshold reached",
            Self::QuestionLimit => "question limit reached",
            Self::QuestionsExhausted => "no more distinguishing questions",
            Self::Emergency => "emergency symptoms reported",
        };
        write!(f, "{}", text)
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PolicyDecision {
    Final(FinalReason),
    Ask(QuestionPick),
}

/// Confidence (percent) needed to stop at this point of the session.
pub fn confidence_threshold(question_counter: u32) -> f64 {
    if question_counter == 0 {
        INITIAL_CONFIDENCE_THRESHOLD
    } else {
        FOLLOW_UP_CONFIDENCE_THRESHOLD
    }
}

/// Decides whether to stop. `select` is only called when another question is allowed.
pub fn decide(
    top_confidence: f64,
    question_counter: u32,
    max_questions: u32,
    select: impl FnOnce() -> Option<QuestionPick>,
) -> PolicyDecision {
    if top_confidence >= confidence_threshold(question_counter) && question_counter > 0 {
        return PolicyDecision::Final(FinalReason::ConfidenceReached);
    }
    if question_counter >= max_questions {
        return PolicyDecision::Final(FinalReason::QuestionLimit);
    }
    match select() {
        Some(pick) => PolicyDecision::Ask(pick),
        None => PolicyDecision::Final(FinalReason::QuestionsExhausted),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::QuestionSource;
    use triage_types::SymptomKey;

    fn pick() -> Option<QuestionPick> {
        Some(QuestionPick {
            token: SymptomKey::new("chills").unwrap(),
            source: QuestionSource::Differentiating,
            priority: 3,
        })
    }

    #[test]
    fn test_thresholds() {
        assert_eq!(confidence_threshold(0), 98.0);
        assert_eq!(confidence_threshold(1), 85.0);
        assert_eq!(confidence_threshold(6), 85.0);
    }

    #[test]
    fn test_high_confidence_without_follow_up_keeps_asking() {
        assert!(matches!(decide(99.5, 0, 7, pick), PolicyDecision::Ask(_)));
    }

    #[test]
    fn test_confidence_reached_after_follow_up() {
        assert_eq!(
            decide(85.0, 1, 7, pick),
            PolicyDecision::Final(FinalReason::ConfidenceReached)
        );
        assert!(matches!(decide(84.9, 1, 7, pick), PolicyDecision::Ask(_)));
    }

    #[test]
    fn test_question_limit_forces_final_regardless_of_confidence() {
        assert_eq!(
            decide(10.0, 7, 7, pick),
            PolicyDecision::Final(FinalReason::QuestionLimit)
        );
        assert_eq!(
            decide(10.0, 5, 5, pick),
            PolicyDecision::Final(FinalReason::QuestionLimit)
        );
    }

    #[test]
    fn test_exhausted_selector_ends_session() {
        assert_eq!(
            decide(40.0, 2, 7, || None),
            PolicyDecision::Final(FinalReason::QuestionsExhausted)
        );
    }

    #[test]
    fn test_selector_not_called_when_stopping() {
        let decision = decide(90.0, 3, 7, || panic!("selector should not run"));
        assert_eq!(decision, PolicyDecision::Final(FinalReason::ConfidenceReached));
    }
}
