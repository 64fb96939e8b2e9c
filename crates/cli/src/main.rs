use anyhow::Context;
use clap::{ArgAction, Parser, Subcommand};
use std::io::{BufRead, Write};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use triage_core::config::{
    filter_stopwords_from_env_value, history_scope_from_env_value, max_questions_from_env_value,
    resolve_knowledge_dir,
};
use triage_core::constants::DEFAULT_TOP_K;
use triage_core::{
    evaluate_turn, EngineConfig, EngineContext, HistoryCatalog, HistoryScope, KnowledgeBase,
    Normalizer, PresenceOutcome, Session, SessionOptions, SessionPhase, TriageError, TurnRequest,
    TurnResponse,
};

#[derive(Parser)]
#[command(name = "triage")]
#[command(about = "Adaptive symptom questioning CLI")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Flags shared by commands that run the engine. Unset flags fall back to `TRIAGE_*` variables.
#[derive(clap::Args)]
struct EngineArgs {
    /// Directory holding disease_symptom_map.json and model.json
    #[arg(long)]
    knowledge_dir: Option<PathBuf>,
    /// Confirmed follow-ups before the session must stop
    #[arg(long)]
    max_questions: Option<u32>,
    /// Remove English stop words during normalisation (true or false)
    #[arg(long, action = ArgAction::Set)]
    filter_stopwords: Option<bool>,
    /// Which history conditions may boost predictions (patient-only or all-known)
    #[arg(long)]
    history_scope: Option<HistoryScope>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive questioning session
    Chat {
        #[command(flatten)]
        engine: EngineArgs,
        /// Declared chronic or genetic conditions (comma-separated)
        #[arg(long)]
        history: Option<String>,
        /// End the session when an emergency symptom is confirmed
        #[arg(long)]
        stop_on_emergency: bool,
    },
    /// Evaluate one turn request (JSON) and print the response
    Predict {
        #[command(flatten)]
        engine: EngineArgs,
        /// Path to a TurnRequest JSON file
        #[arg(long)]
        request: PathBuf,
    },
    /// Print the normalised tokens of some symptom text
    Normalize {
        text: String,
        /// Remove English stop words (true or false)
        #[arg(long, action = ArgAction::Set)]
        filter_stopwords: Option<bool>,
    },
    /// List the chronic and genetic history catalog
    Conditions {
        #[arg(long)]
        knowledge_dir: Option<PathBuf>,
    },
}

fn env_value(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

/// An explicit flag wins over the environment in both directions.
fn resolve_filter_stopwords(flag: Option<bool>, env: Option<String>) -> anyhow::Result<bool> {
    match flag {
        Some(value) => Ok(value),
        None => Ok(filter_stopwords_from_env_value(env)?),
    }
}

fn engine_config(args: &EngineArgs) -> anyhow::Result<EngineConfig> {
    let max_questions = match args.max_questions {
        Some(value) => value,
        None => max_questions_from_env_value(env_value("TRIAGE_MAX_QUESTIONS"))?,
    };
    let filter_stopwords =
        resolve_filter_stopwords(args.filter_stopwords, env_value("TRIAGE_FILTER_STOPWORDS"))?;
    let history_scope = match args.history_scope {
        Some(scope) => scope,
        None => history_scope_from_env_value(env_value("TRIAGE_HISTORY_SCOPE"))?,
    };
    Ok(EngineConfig::new(
        max_questions,
        filter_stopwords,
        history_scope,
        DEFAULT_TOP_K,
    )?)
}

fn knowledge_dir(flag: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    let override_dir = flag.or_else(|| env_value("TRIAGE_KNOWLEDGE_DIR").map(PathBuf::from));
    Ok(resolve_knowledge_dir(override_dir)?)
}

fn load_engine(args: &EngineArgs) -> anyhow::Result<(EngineContext, EngineConfig)> {
    let config = engine_config(args)?;
    let dir = knowledge_dir(args.knowledge_dir.clone())?;
    let ctx = EngineContext::load_dir(&dir, &config)
        .with_context(|| format!("failed to load engine from {}", dir.display()))?;
    Ok((ctx, config))
}

fn print_predictions(response: &TurnResponse) {
    println!("\nPredictions:");
    for (rank, prediction) in response.predictions.iter().enumerate() {
        println!(
            "  {}. {}: {:.2}%",
            rank + 1,
            prediction.label,
            prediction.confidence
        );
    }
    if let Some(note) = &response.history_note {
        println!("  Note: {}", note);
    }
    if let Some(emergency) = &response.emergency {
        let matched: Vec<String> = emergency.matched.iter().map(|s| s.display_text()).collect();
        println!(
            "  WARNING: emergency symptoms reported ({}). Seek immediate medical attention.",
            matched.join(", ")
        );
    }
}

/// Prompts until a non-empty line arrives. `None` on end of input or `quit`.
fn prompt(lines: &mut impl Iterator<Item = std::io::Result<String>>, text: &str) -> anyhow::Result<Option<String>> {
    loop {
        print!("{}", text);
        std::io::stdout().flush()?;
        let Some(line) = lines.next().transpose()? else {
            return Ok(None);
        };
        let line = line.trim().to_string();
        if line.eq_ignore_ascii_case("quit") {
            return Ok(None);
        }
        if !line.is_empty() {
            return Ok(Some(line));
        }
    }
}

fn run_chat(engine: &EngineArgs, history: Option<String>, stop_on_emergency: bool) -> anyhow::Result<()> {
    let (ctx, config) = load_engine(engine)?;
    let normalizer = Normalizer::new(config.filter_stopwords());
    let patient_history = history
        .map(|h| {
            h.split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default();

    let mut session = Session::new(SessionOptions {
        patient_history,
        stop_on_emergency,
    });
    let stdin = std::io::stdin();
    let mut lines = stdin.lock().lines();

    println!("Describe your symptoms (comma-separated). Type 'quit' to exit.");
    loop {
        match session.phase().clone() {
            SessionPhase::AwaitingInitialSymptoms => {
                let Some(line) = prompt(&mut lines, "Symptoms: ")? else {
                    session.abort();
                    continue;
                };
                match session.submit_initial_symptoms(&line, &normalizer) {
                    Ok(_) => {}
                    Err(TriageError::EmptySymptoms) => println!("Please enter at least one symptom."),
                    Err(e) => return Err(e.into()),
                }
            }
            SessionPhase::Predicting => {
                let response = session.predict(&ctx, &config)?;
                print_predictions(response);
            }
            SessionPhase::AwaitingPresenceAnswer(question) => {
                let text = format!(
                    "({}/{}) Are you experiencing '{}'? (yes/no): ",
                    session.state().question_counter() + 1,
                    config.max_questions(),
                    question.display_text()
                );
                let Some(line) = prompt(&mut lines, &text)? else {
                    session.abort();
                    continue;
                };
                match session.answer_presence(&line) {
                    Ok(PresenceOutcome::SeverityNeeded(_)) => {}
                    Ok(PresenceOutcome::Denied(symptom)) => {
                        tracing::debug!(%symptom, "symptom denied");
                    }
                    Err(TriageError::InvalidAnswer(msg)) => println!("{}", msg),
                    Err(e) => return Err(e.into()),
                }
            }
            SessionPhase::AwaitingSeverityAnswer(question) => {
                let text = format!(
                    "How severe is '{}'? (1-5): ",
                    question.display_text()
                );
                let Some(line) = prompt(&mut lines, &text)? else {
                    session.abort();
                    continue;
                };
                match session.answer_severity(&line) {
                    Ok(_) => {}
                    Err(TriageError::InvalidAnswer(msg)) => println!("{}", msg),
                    Err(e) => return Err(e.into()),
                }
            }
            SessionPhase::Final(reason) => {
                println!("\nFinal assessment ({}).", reason);
                if let Some(top) = session.last_response().and_then(|r| r.predictions.first()) {
                    println!("Most likely: {} ({:.2}%)", top.label, top.confidence);
                }
                if let Some(recommendation) = session.recommendation() {
                    println!("{}", recommendation.message);
                }
                return Ok(());
            }
            SessionPhase::Aborted => {
                println!("Session ended.");
                return Ok(());
            }
        }
    }
}

fn run_predict(engine: &EngineArgs, request: PathBuf) -> anyhow::Result<()> {
    let (ctx, config) = load_engine(engine)?;
    let raw = std::fs::read_to_string(&request)
        .with_context(|| format!("failed to read {}", request.display()))?;
    let request: TurnRequest = serde_json::from_str(&raw).context("invalid turn request")?;
    let response = evaluate_turn(&ctx, &config, &request)?;
    println!("{}", response.to_json()?);
    Ok(())
}

fn run_conditions(flag: Option<PathBuf>) -> anyhow::Result<()> {
    // The catalog falls back to the built-in one when no knowledge directory is found.
    let catalog = match knowledge_dir(flag) {
        Ok(dir) => KnowledgeBase::load_dir(&dir)?.history_catalog,
        Err(e) => {
            tracing::warn!("{}; using built-in history catalog", e);
            HistoryCatalog::builtin()
        }
    };
    for condition in catalog.iter() {
        println!(
            "{} ({}, {} symptoms)",
            condition.name,
            condition.kind,
            condition.profile.len()
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env().add_directive("triage=info".parse()?))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    match cli.command {
        Some(Commands::Chat {
            engine,
            history,
            stop_on_emergency,
        }) => run_chat(&engine, history, stop_on_emergency),
        Some(Commands::Predict { engine, request }) => run_predict(&engine, request),
        Some(Commands::Normalize {
            text,
            filter_stopwords,
        }) => {
            let filter =
                resolve_filter_stopwords(filter_stopwords, env_value("TRIAGE_FILTER_STOPWORDS"))?;
            for token in Normalizer::new(filter).normalize(&text) {
                println!("{}", token);
            }
            Ok(())
        }
        Some(Commands::Conditions { knowledge_dir }) => run_conditions(knowledge_dir),
        None => {
            println!("Use 'triage --help' for commands");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize_flag(args: &[&str]) -> Option<bool> {
        match Cli::try_parse_from(args).unwrap().command {
            Some(Commands::Normalize {
                filter_stopwords, ..
            }) => filter_stopwords,
            _ => panic!("expected normalize"),
        }
    }

    #[test]
    fn test_filter_stopwords_flag_takes_a_value() {
        assert_eq!(normalize_flag(&["triage", "normalize", "a cough"]), None);
        assert_eq!(
            normalize_flag(&["triage", "normalize", "a cough", "--filter-stopwords", "false"]),
            Some(false)
        );
        assert_eq!(
            normalize_flag(&["triage", "normalize", "a cough", "--filter-stopwords", "true"]),
            Some(true)
        );
        assert!(Cli::try_parse_from(["triage", "normalize", "x", "--filter-stopwords", "maybe"]).is_err());
    }

    #[test]
    fn test_flag_overrides_environment_both_ways() {
        assert!(!resolve_filter_stopwords(Some(false), Some("true".into())).unwrap());
        assert!(resolve_filter_stopwords(Some(true), Some("false".into())).unwrap());
        assert!(resolve_filter_stopwords(None, Some("true".into())).unwrap());
        assert!(!resolve_filter_stopwords(None, None).unwrap());
    }

    #[test]
    fn test_engine_args_accept_explicit_false() {
        let cli = Cli::try_parse_from([
            "triage",
            "predict",
            "--request",
            "req.json",
            "--filter-stopwords",
            "false",
            "--max-questions",
            "3",
        ])
        .unwrap();
        match cli.command {
            Some(Commands::Predict { engine, .. }) => {
                assert_eq!(engine.filter_stopwords, Some(false));
                assert_eq!(engine.max_questions, Some(3));
            }
            _ => panic!("expected predict"),
        }
    }
}
