//! Interactive questioning session.
//!
//! A [`Session`] drives the turn loop one step at a time so any front end (the terminal chat,
//! a test) can feed it text:
//!
//! ```text
//! AwaitingInitialSymptoms --submit_initial_symptoms--> Predicting
//! Predicting --predict--> AwaitingPresenceAnswer(q) | Final(reason)
//! AwaitingPresenceAnswer(q) --yes--> AwaitingSeverityAnswer(q)
//! AwaitingPresenceAnswer(q) --no--> Predicting
//! AwaitingSeverityAnswer(q) --1..=5--> Predicting
//! any non-final phase --abort--> Aborted
//! ```

use crate::config::EngineConfig;
use crate::engine::{evaluate, EngineContext, TurnInput, TurnResponse};
use crate::normalizer::Normalizer;
use crate::policy::{FinalReason, PolicyDecision};
use crate::recommendation::Recommendation;
use crate::state::SessionState;
use crate::validation::{parse_presence_answer, parse_severity_answer};
use crate::{TriageError, TriageResult};
use chrono::{DateTime, Utc};
use triage_types::{Severity, SymptomKey};
use uuid::Uuid;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionPhase {
    AwaitingInitialSymptoms,
    Predicting,
    AwaitingPresenceAnswer(SymptomKey),
    AwaitingSeverityAnswer(SymptomKey),
    Final(FinalReason),
    Aborted,
}

impl SessionPhase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::AwaitingInitialSymptoms => "awaiting_initial_symptoms",
            Self::Predicting => "predicting",
            Self::AwaitingPresenceAnswer(_) => "awaiting_presence_answer",
            Self::AwaitingSeverityAnswer(_) => "awaiting_severity_answer",
            Self::Final(_) => "final",
            Self::Aborted => "aborted",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Final(_) | Self::Aborted)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SessionOptions {
    /// Conditions the patient declared, matched against the history catalog.
    pub patient_history: Vec<String>,
    /// End the session as soon as an emergency symptom is confirmed.
    pub stop_on_emergency: bool,
}

/// What a presence answer led to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PresenceOutcome {
    /// Ask for the severity of this symptom next.
    SeverityNeeded(SymptomKey),
    Denied(SymptomKey),
}

#[derive(Clone, Debug)]
pub struct Session {
    id: Uuid,
    started_at: DateTime<Utc>,
    state: SessionState,
    phase: SessionPhase,
    options: SessionOptions,
    last_response: Option<TurnResponse>,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        let session = Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            state: SessionState::new(),
            phase: SessionPhase::AwaitingInitialSymptoms,
            options,
            last_response: None,
        };
        tracing::info!(session_id = %session.id, "session started");
        session
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn phase(&self) -> &SessionPhase {
        &self.phase
    }

    /// Response of the most recent [`Session::predict`].
    pub fn last_response(&self) -> Option<&TurnResponse> {
        self.last_response.as_ref()
    }

    /// Urgency and department advice, once the session is final.
    pub fn recommendation(&self) -> Option<&Recommendation> {
        if !matches!(self.phase, SessionPhase::Final(_)) {
            return None;
        }
        self.last_response.as_ref()?.recommendation.as_ref()
    }

    fn unexpected(&self, expected: &'static str) -> TriageError {
        TriageError::UnexpectedPhase {
            expected,
            actual: self.phase.name(),
        }
    }

    /// Normalises free text into initial symptoms, each at the default severity.
    ///
    /// Returns the symptoms added. On `EmptySymptoms` the phase is unchanged so the caller can
    /// ask again.
    pub fn submit_initial_symptoms(
        &mut self,
        raw: &str,
        normalizer: &Normalizer,
    ) -> TriageResult<Vec<SymptomKey>> {
        if self.phase != SessionPhase::AwaitingInitialSymptoms {
            return Err(self.unexpected("awaiting_initial_symptoms"));
        }

        let keys = normalizer
            .normalize(raw)
            .iter()
            .filter_map(|token| SymptomKey::new(token).ok())
            .collect::<Vec<_>>();
        if keys.is_empty() {
            return Err(TriageError::EmptySymptoms);
        }

        for key in &keys {
            self.state.add_initial(key.clone(), Severity::DEFAULT);
        }
        tracing::debug!(session_id = %self.id, count = keys.len(), "initial symptoms recorded");
        self.phase = SessionPhase::Predicting;
        Ok(keys)
    }

    /// Runs one turn over the session's evidence.
    pub fn predict(
        &mut self,
        ctx: &EngineContext,
        config: &EngineConfig,
    ) -> TriageResult<&TurnResponse> {
        if self.phase != SessionPhase::Predicting {
            return Err(self.unexpected("predicting"));
        }

        let input = TurnInput {
            collected: self.state.collected().clone(),
            denied: self.state.denied().clone(),
            question_counter: self.state.question_counter(),
            patient_history: self.options.patient_history.clone(),
        };
        let evaluation = evaluate(ctx, config, &input)?;
        let mut response = evaluation.to_response(config.top_k());
        let top_confidence = evaluation.top_confidence();

        let decision = if self.options.stop_on_emergency && evaluation.emergency.is_some() {
            response.finalize(FinalReason::Emergency);
            PolicyDecision::Final(FinalReason::Emergency)
        } else {
            evaluation.decision
        };

        match decision {
            PolicyDecision::Final(reason) => {
                tracing::info!(
                    session_id = %self.id,
                    %reason,
                    top_confidence,
                    questions = self.state.question_counter(),
                    "session finished"
                );
                self.state.set_last_question(None);
                self.phase = SessionPhase::Final(reason);
            }
            PolicyDecision::Ask(pick) => {
                self.state.set_last_question(Some(pick.token.clone()));
                self.phase = SessionPhase::AwaitingPresenceAnswer(pick.token);
            }
        }

        Ok(self.last_response.insert(response))
    }

    /// Handles a yes/no answer to the pending question.
    ///
    /// An unrecognised answer returns `InvalidAnswer` and leaves the phase unchanged.
    pub fn answer_presence(&mut self, input: &str) -> TriageResult<PresenceOutcome> {
        let SessionPhase::AwaitingPresenceAnswer(question) = &self.phase else {
            return Err(self.unexpected("awaiting_presence_answer"));
        };
        let question = question.clone();

        if parse_presence_answer(input)? {
            self.phase = SessionPhase::AwaitingSeverityAnswer(question.clone());
            Ok(PresenceOutcome::SeverityNeeded(question))
        } else {
            self.state.deny(question.clone());
            self.phase = SessionPhase::Predicting;
            Ok(PresenceOutcome::Denied(question))
        }
    }

    /// Handles the severity of a confirmed symptom, counting it as an answered question.
    pub fn answer_severity(&mut self, input: &str) -> TriageResult<Severity> {
        let SessionPhase::AwaitingSeverityAnswer(question) = &self.phase else {
            return Err(self.unexpected("awaiting_severity_answer"));
        };
        let question = question.clone();

        let severity = parse_severity_answer(input)?;
        self.state.confirm(question, severity);
        self.phase = SessionPhase::Predicting;
        Ok(severity)
    }

    pub fn abort(&mut self) {
        if !self.phase.is_terminal() {
            tracing::info!(session_id = %self.id, phase = self.phase.name(), "session aborted");
            self.phase = SessionPhase::Aborted;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::test_support::{context, disease_map};
    use crate::knowledge::DiseaseSymptomMap;
    use crate::recommendation::Urgency;

    fn key(s: &str) -> SymptomKey {
        SymptomKey::new(s).unwrap()
    }

    fn low_confidence() -> EngineContext {
        context(
            &[("Flu", 0.4), ("Common Cold", 0.3), ("Heart attack", 0.2), ("GERD", 0.1)],
            disease_map(),
        )
    }

    fn started(ctx: &EngineContext, raw: &str) -> Session {
        let mut session = Session::new(SessionOptions::default());
        session
            .submit_initial_symptoms(raw, &Normalizer::new(false))
            .unwrap();
        session.predict(ctx, &EngineConfig::default()).unwrap();
        session
    }

    #[test]
    fn test_empty_initial_symptoms_keep_phase() {
        let mut session = Session::new(SessionOptions::default());
        let err = session
            .submit_initial_symptoms("  ,, ", &Normalizer::new(false))
            .unwrap_err();
        assert!(matches!(err, TriageError::EmptySymptoms));
        assert_eq!(session.phase(), &SessionPhase::AwaitingInitialSymptoms);
    }

    #[test]
    fn test_initial_symptoms_use_default_severity() {
        let mut session = Session::new(SessionOptions::default());
        let added = session
            .submit_initial_symptoms("Fever, COUGH", &Normalizer::new(false))
            .unwrap();
        assert_eq!(added, vec![key("fever"), key("cough")]);
        assert_eq!(
            session.state().collected().get(&key("fever")),
            Some(Severity::DEFAULT)
        );
        assert_eq!(session.state().question_counter(), 0);
        assert_eq!(session.phase(), &SessionPhase::Predicting);
    }

    #[test]
    fn test_yes_then_severity_counts_question() {
        let ctx = low_confidence();
        let mut session = started(&ctx, "fever cough");
        let SessionPhase::AwaitingPresenceAnswer(question) = session.phase().clone() else {
            panic!("expected a question, got {:?}", session.phase());
        };
        assert_eq!(question, key("chills"));

        assert_eq!(
            session.answer_presence("Yes").unwrap(),
            PresenceOutcome::SeverityNeeded(key("chills"))
        );
        assert!(matches!(
            session.answer_severity("7"),
            Err(TriageError::InvalidAnswer(_))
        ));
        assert_eq!(session.answer_severity("4").unwrap().value(), 4);
        assert_eq!(session.state().question_counter(), 1);
        assert_eq!(session.phase(), &SessionPhase::Predicting);
    }

    #[test]
    fn test_no_answer_denies_without_counting() {
        let ctx = low_confidence();
        let mut session = started(&ctx, "fever cough");
        assert!(matches!(
            session.answer_presence("perhaps"),
            Err(TriageError::InvalidAnswer(_))
        ));
        assert!(matches!(
            session.phase(),
            SessionPhase::AwaitingPresenceAnswer(_)
        ));

        session.answer_presence("n").unwrap();
        assert!(session.state().denied().contains(&key("chills")));
        assert_eq!(session.state().question_counter(), 0);

        session.predict(&ctx, &EngineConfig::default()).unwrap();
        assert_eq!(
            session.phase(),
            &SessionPhase::AwaitingPresenceAnswer(key("high_fever"))
        );
    }

    #[test]
    fn test_wrong_phase_is_rejected() {
        let ctx = low_confidence();
        let mut session = Session::new(SessionOptions::default());
        assert!(matches!(
            session.predict(&ctx, &EngineConfig::default()),
            Err(TriageError::UnexpectedPhase {
                expected: "predicting",
                actual: "awaiting_initial_symptoms"
            })
        ));
        assert!(session.answer_presence("yes").is_err());
        assert!(session.answer_severity("3").is_err());
    }

    #[test]
    fn test_always_yes_stops_at_question_limit() {
        let ctx = low_confidence();
        let config = EngineConfig::default();
        let mut session = started(&ctx, "fever");
        let mut asked = Vec::new();

        while let SessionPhase::AwaitingPresenceAnswer(question) = session.phase().clone() {
            assert!(!asked.contains(&question), "{} asked twice", question);
            asked.push(question);
            session.answer_presence("y").unwrap();
            session.answer_severity("3").unwrap();
            session.predict(&ctx, &config).unwrap();
        }

        assert!(session.state().question_counter() <= config.max_questions());
        assert!(matches!(session.phase(), SessionPhase::Final(_)));
        assert!(session.last_response().unwrap().is_final);
        let recommendation = session.recommendation().unwrap();
        assert_eq!(recommendation.urgency, Urgency::Low);
        assert_eq!(recommendation.department, "General Medicine");
    }

    #[test]
    fn test_no_recommendation_while_questioning() {
        let ctx = low_confidence();
        let session = started(&ctx, "fever cough");
        assert!(matches!(session.phase(), SessionPhase::AwaitingPresenceAnswer(_)));
        assert!(session.recommendation().is_none());
        assert!(session.last_response().unwrap().recommendation.is_none());
    }

    #[test]
    fn test_always_no_exhausts_questions() {
        let ctx = low_confidence();
        let config = EngineConfig::default();
        let mut session = started(&ctx, "fever");
        let mut turns = 0;

        while matches!(session.phase(), SessionPhase::AwaitingPresenceAnswer(_)) {
            turns += 1;
            assert!(turns < 100, "session did not terminate");
            session.answer_presence("no").unwrap();
            session.predict(&ctx, &config).unwrap();
        }

        assert_eq!(
            session.phase(),
            &SessionPhase::Final(FinalReason::QuestionsExhausted)
        );
        assert_eq!(session.state().question_counter(), 0);
    }

    #[test]
    fn test_stop_on_emergency() {
        let map = DiseaseSymptomMap::new([
            ("Heart attack", vec!["chest pain", "sweating"]),
            ("GERD", vec!["chest pain", "acidity"]),
        ]);
        let ctx = context(&[("Heart attack", 0.6), ("GERD", 0.4)], map);
        let options = SessionOptions {
            patient_history: Vec::new(),
            stop_on_emergency: true,
        };
        let mut session = Session::new(options);
        session
            .submit_initial_symptoms("chest_pain", &Normalizer::new(false))
            .unwrap();
        let response = session.predict(&ctx, &EngineConfig::default()).unwrap();
        assert_eq!(response.final_reason, Some(FinalReason::Emergency));
        assert!(response.next_question.is_none());
        assert_eq!(session.phase(), &SessionPhase::Final(FinalReason::Emergency));
        let recommendation = session.recommendation().unwrap();
        assert_eq!(recommendation.urgency, Urgency::Emergency);
        assert_eq!(recommendation.department, "Emergency Medicine");
    }

    #[test]
    fn test_abort_only_from_open_phases() {
        let ctx = low_confidence();
        let mut session = started(&ctx, "fever");
        session.abort();
        assert_eq!(session.phase(), &SessionPhase::Aborted);
        assert!(session.answer_presence("yes").is_err());
    }
}
