//! Command-line front end for the decision engine.
//!
//! State lives under `--state-dir` (default `.sam`): `config.toml`,
//! `state.json` and the `traces.jsonl` audit log.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use serde_json::{Map, Value};

use sam::core::mental_health::{EmotionalEventKind, ThoughtPattern};
use sam::core::request::{DecisionRequest, DecisionResponse, PersonalityProfile};
use sam::core::types::{MaturityLevel, ResponseKind};
use sam::engine::{CONFIG_FILE, DecisionEngine, EngineStatus};
use sam::exit_codes;
use sam::io::config::{EngineConfig, write_config};
use sam::io::request::load_request;
use sam::io::state_store::MemoryStateStore;
use sam::logging;

#[derive(Parser)]
#[command(
    name = "sam",
    version,
    about = "Maturity-gated decision engine with mental-health monitoring"
)]
struct Cli {
    /// Directory holding config, persisted state and traces.
    #[arg(long, global = true, default_value = ".sam")]
    state_dir: PathBuf,

    /// Maturity level used when no state has been saved yet.
    #[arg(long, global = true)]
    maturity_level: Option<MaturityLevel>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Write `config.toml` with defaults if missing.
    Init {
        /// Overwrite an existing config.
        #[arg(short, long)]
        force: bool,
    },
    /// Run one decision cycle.
    Decide(DecideArgs),
    /// Show maturity, mental health and performance.
    Status {
        #[arg(long)]
        json: bool,
    },
    /// Run sample decisions against a throwaway in-memory engine.
    Demo,
    /// Record an observed thought pattern.
    Thought {
        #[arg(long = "type")]
        pattern_type: String,
        #[arg(long, default_value_t = 1)]
        repetition: u32,
        #[arg(long, default_value_t = 0.0)]
        similarity: f64,
        #[arg(long = "input")]
        inputs: Vec<String>,
        #[arg(long = "output")]
        outputs: Vec<String>,
    },
    /// Record an emotional event (success, failure, surprise, validation, rejection).
    Emotion {
        kind: EmotionalEventKind,
        #[arg(long, default_value_t = 0.5)]
        intensity: f64,
    },
    /// Reset mental-health metrics to a stable state.
    Reset,
    /// Apply maturity-level interventions to the current metrics.
    Reconcile,
    /// Age the profile and reassess progression.
    Age {
        #[arg(long)]
        months: u32,
    },
    /// Force progression to a later maturity level.
    Promote { level: MaturityLevel },
}

#[derive(Args)]
struct DecideArgs {
    /// Goal text. Required unless `--request` is given.
    goal: Option<String>,

    /// Read the whole request from a JSON file.
    #[arg(long, conflicts_with = "goal")]
    request: Option<PathBuf>,

    /// Context object as JSON.
    #[arg(long)]
    context: Option<String>,

    /// Constraints object as JSON (`budget`, `time_limit`).
    #[arg(long)]
    constraints: Option<String>,

    #[arg(long, default_value_t = 0.5)]
    urgency: f64,

    #[arg(long, default_value_t = 0.5)]
    complexity: f64,

    #[arg(long)]
    json: bool,

    #[command(flatten)]
    personality: PersonalityArgs,
}

#[derive(Args)]
struct PersonalityArgs {
    #[arg(long)]
    tone: Option<String>,
    #[arg(long)]
    assertiveness: Option<f64>,
    #[arg(long)]
    patience: Option<f64>,
    #[arg(long)]
    humor: Option<f64>,
    #[arg(long)]
    creativity: Option<f64>,
    #[arg(long)]
    analytical: Option<f64>,
    #[arg(long)]
    social: Option<f64>,
}

impl PersonalityArgs {
    /// `None` when no personality flag was given.
    fn profile(&self) -> Option<PersonalityProfile> {
        let given = self.tone.is_some()
            || [
                self.assertiveness,
                self.patience,
                self.humor,
                self.creativity,
                self.analytical,
                self.social,
            ]
            .iter()
            .any(Option::is_some);
        if !given {
            return None;
        }
        let defaults = PersonalityProfile::default();
        Some(PersonalityProfile {
            tone: self.tone.clone().unwrap_or(defaults.tone),
            assertiveness: self.assertiveness.unwrap_or(defaults.assertiveness),
            patience: self.patience.unwrap_or(defaults.patience),
            humor: self.humor.unwrap_or(defaults.humor),
            creativity: self.creativity.unwrap_or(defaults.creativity),
            analytical: self.analytical.unwrap_or(defaults.analytical),
            social: self.social.unwrap_or(defaults.social),
        })
    }
}

fn main() {
    logging::init();
    match run() {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("{:#}", err);
            std::process::exit(exit_codes::INVALID);
        }
    }
}

fn run() -> Result<i32> {
    let cli = Cli::parse();
    let state_dir = cli.state_dir.as_path();
    match cli.command {
        Command::Init { force } => cmd_init(state_dir, cli.maturity_level, force),
        Command::Decide(args) => cmd_decide(state_dir, cli.maturity_level, &args),
        Command::Status { json } => cmd_status(state_dir, cli.maturity_level, json),
        Command::Demo => cmd_demo(cli.maturity_level),
        Command::Thought {
            pattern_type,
            repetition,
            similarity,
            inputs,
            outputs,
        } => {
            let pattern = ThoughtPattern {
                pattern_type,
                repetition_count: repetition,
                similarity_score: similarity,
                inputs,
                outputs,
            };
            mutate(state_dir, cli.maturity_level, |engine| {
                engine.record_thought_pattern(pattern);
                Ok(())
            })
        }
        Command::Emotion { kind, intensity } => {
            mutate(state_dir, cli.maturity_level, |engine| {
                engine.record_emotional_event(kind, intensity, Map::new());
                Ok(())
            })
        }
        Command::Reset => mutate(state_dir, cli.maturity_level, |engine| {
            engine.reset_mental_health();
            Ok(())
        }),
        Command::Reconcile => mutate(state_dir, cli.maturity_level, |engine| {
            let applied = engine.reconcile_mental_health();
            if applied.is_empty() {
                println!("no interventions needed");
            }
            for intervention in applied {
                println!("applied {intervention:?}");
            }
            Ok(())
        }),
        Command::Age { months } => mutate(state_dir, cli.maturity_level, |engine| {
            if let Some(level) = engine.advance_age(months) {
                println!("progressed to {level}");
            }
            Ok(())
        }),
        Command::Promote { level } => mutate(state_dir, cli.maturity_level, |engine| {
            engine.force_progression(level)?;
            println!("promoted to {level}");
            Ok(())
        }),
    }
}

fn cmd_init(state_dir: &Path, level: Option<MaturityLevel>, force: bool) -> Result<i32> {
    let config_path = state_dir.join(CONFIG_FILE);
    if config_path.exists() && !force {
        println!("{} already exists", config_path.display());
        return Ok(exit_codes::OK);
    }
    let mut config = EngineConfig::default();
    if let Some(level) = level {
        config.initial_level = level;
    }
    write_config(&config_path, &config)
        .with_context(|| format!("write {}", config_path.display()))?;
    println!("wrote {}", config_path.display());
    Ok(exit_codes::OK)
}

fn cmd_decide(state_dir: &Path, level: Option<MaturityLevel>, args: &DecideArgs) -> Result<i32> {
    let request = build_request(args)?;
    let mut engine = DecisionEngine::open(state_dir, level)?;
    let response = engine.decide(request);
    engine.shutdown()?;
    if args.json {
        print_json(&response)?;
    } else {
        print_response(&response);
    }
    Ok(exit_code_for(response.kind))
}

fn build_request(args: &DecideArgs) -> Result<DecisionRequest> {
    if let Some(path) = &args.request {
        return load_request(path);
    }
    let Some(goal) = &args.goal else {
        bail!("missing goal (pass GOAL or --request FILE)");
    };
    let mut request = DecisionRequest::new(goal.as_str())
        .with_urgency(args.urgency)
        .with_complexity(args.complexity);
    if let Some(raw) = &args.context {
        request.context = parse_object(raw, "--context")?;
    }
    if let Some(raw) = &args.constraints {
        request.constraints = parse_object(raw, "--constraints")?;
    }
    if let Some(personality) = args.personality.profile() {
        request = request.with_personality(personality);
    }
    Ok(request)
}

fn parse_object(raw: &str, flag: &str) -> Result<Map<String, Value>> {
    serde_json::from_str(raw).with_context(|| format!("parse {flag} as a JSON object"))
}

fn cmd_status(state_dir: &Path, level: Option<MaturityLevel>, json: bool) -> Result<i32> {
    let engine = DecisionEngine::open(state_dir, level)?;
    let status = engine.status();
    if json {
        print_json(&status)?;
    } else {
        print_status(&status);
    }
    Ok(exit_codes::OK)
}

fn cmd_demo(level: Option<MaturityLevel>) -> Result<i32> {
    let config = EngineConfig {
        initial_level: level.unwrap_or(MaturityLevel::Adult),
        ..EngineConfig::default()
    };
    let mut engine = DecisionEngine::new(config, Box::new(MemoryStateStore::new()))?;

    let scenarios = [
        DecisionRequest::new("answer a basic question")
            .with_context("question", "What is 2+2?")
            .with_urgency(0.2)
            .with_complexity(0.1),
        DecisionRequest::new("analyze data and create report")
            .with_context("data_type", "numerical")
            .with_context("requires_analysis", true)
            .with_urgency(0.6)
            .with_complexity(0.7),
    ];
    for (idx, request) in scenarios.into_iter().enumerate() {
        println!("{}. {}", idx + 1, request.goal);
        let response = engine.decide(request);
        println!("   confidence: {:.3} ({:?})", response.confidence, response.kind);
    }

    let status = engine.status();
    println!("decisions: {}", status.performance.successful_decisions);
    println!("mental health: {}", status.mental_health.status);
    println!(
        "average confidence: {:.3}",
        status.performance.average_confidence
    );
    engine.shutdown()?;
    Ok(exit_codes::OK)
}

/// Open the engine, apply one mutation, save and report the new status.
fn mutate(
    state_dir: &Path,
    level: Option<MaturityLevel>,
    apply: impl FnOnce(&mut DecisionEngine) -> Result<()>,
) -> Result<i32> {
    let mut engine = DecisionEngine::open(state_dir, level)?;
    apply(&mut engine)?;
    let status = engine.status();
    println!(
        "level: {}  mental health: {}",
        status.maturity.level, status.mental_health.status
    );
    engine.shutdown()?;
    Ok(exit_codes::OK)
}

fn exit_code_for(kind: ResponseKind) -> i32 {
    match kind {
        ResponseKind::Decided => exit_codes::OK,
        ResponseKind::ConstraintViolation | ResponseKind::InterventionRequired => {
            exit_codes::REFUSED
        }
        ResponseKind::CycleFailed => exit_codes::DEGRADED,
    }
}

/// Serialize `value` to pretty-printed JSON on stdout.
fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let payload = serde_json::to_string_pretty(value).context("serialize json")?;
    println!("{payload}");
    Ok(())
}

fn print_response(response: &DecisionResponse) {
    println!("plan: {}", response.plan_id);
    println!("confidence: {:.3}", response.confidence);
    if let Some(mode) = response.mode {
        println!("mode: {mode}");
    }
    println!("maturity: {}", response.maturity_level);
    println!("mental health: {}", response.mental_health_status);
    println!("ready: {}", response.ready_for_execution);
    println!("trace: {}", response.trace_id);
    print_list("warnings", &response.warnings);
    print_list("recommendations", &response.recommendations);
}

fn print_status(status: &EngineStatus) {
    let maturity = &status.maturity;
    println!(
        "maturity: {} (age {} months, {} xp)",
        maturity.level, maturity.age_months, maturity.experience_points
    );
    println!("mental health: {}", status.mental_health.status);
    println!(
        "decisions: {} ok, {} failed, {} total requests",
        status.performance.successful_decisions,
        status.performance.failed_decisions,
        status.performance.total_requests
    );
    println!(
        "average confidence: {:.3}",
        status.performance.average_confidence
    );
    let limits = &status.current_constraints;
    println!(
        "limits: complexity <= {:.2}, urgency <= {:.2}, confidence threshold {:.2}",
        limits.max_complexity, limits.max_urgency, limits.confidence_threshold
    );
    print_list("recommendations", &status.mental_health.recommendations);
}

fn print_list(label: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    println!("{label}:");
    for item in items {
        println!("  - {item}");
    }
}
