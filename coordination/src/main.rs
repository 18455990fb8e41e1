//! CLI for the adversarial two-LLM debate pipeline.
//!
//! A thin boundary over the `coordination` library: loads configuration,
//! wires participant labels into concrete adapters, and dispatches to
//! the session store, parallel orchestrator, plan reviser, and
//! enforcement gate. Library code returns `DebateError`; this binary
//! wraps every call in `anyhow::Context` at the boundary, matching the
//! split already used elsewhere in this codebase (library crates use
//! `thiserror`, binaries use `anyhow`).
//!
//! # Usage
//!
//! ```bash
//! debate-coordination debate --file plan.md --request "review this plan"
//! debate-coordination revise --file plan.md --request "review this plan"
//! debate-coordination enforce --request "refactor the auth module" --file src/auth.rs
//! debate-coordination status --session my-session
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use coordination::{
    block_execution_until_consensus, check_debate_required, content_hash, infer_focus_areas,
    mark_user_override, score_issue, DebateConfig, Effort, HttpAdapter, Impact, Issue, LlmAdapter,
    Outcome, ParallelOrchestrator, ResponseCache, ScoredIssue, Severity, SessionMetadata,
    SessionState, SessionStore, SubprocessAdapter, SubprocessAdapterConfig,
};
use coordination::{revise_plan, DebateRecord, HistoryStore};

#[derive(Parser, Debug)]
#[command(author, version, about = "Adversarial two-LLM debate pipeline", long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one debate round against a file and print the consensus result.
    Debate {
        /// Plan or diff file to review.
        #[arg(long)]
        file: PathBuf,
        /// What the participants should evaluate.
        #[arg(long)]
        request: String,
        /// Session id to record this round under (created if missing).
        #[arg(long)]
        session: Option<String>,
    },
    /// Run a debate, then ask the first participant to revise the file in place.
    Revise {
        #[arg(long)]
        file: PathBuf,
        #[arg(long)]
        request: String,
    },
    /// Decide whether a change needs a debate, and gate on the session's consensus state.
    Enforce {
        #[arg(long)]
        request: String,
        /// Files the proposed change touches.
        #[arg(long = "file")]
        files: Vec<String>,
        #[arg(long)]
        session: String,
        /// Record a standing user override for this session before checking the gate.
        #[arg(long, default_value_t = false)]
        r#override: bool,
    },
    /// Print a session's current metadata.
    Status {
        #[arg(long)]
        session: String,
    },
}

/// Builds a concrete adapter for a participant label. `codex` is
/// invoked as a subprocess over stdin (grounded in
/// `codex_cli_invoker.py`); every other label is assumed to be served
/// by a local HTTP bridge (grounded in `copilot_invoker.py`'s VS Code
/// bridge pattern), whose endpoint defaults to `http://localhost:8765`
/// and can be overridden per-label with `DEBATE_<LABEL>_URL`.
fn build_adapter(label: &str) -> Arc<dyn LlmAdapter> {
    match label {
        "codex" => Arc::new(SubprocessAdapter::new(SubprocessAdapterConfig::codex_cli())),
        other => {
            let env_key = format!("DEBATE_{}_URL", other.to_uppercase());
            let base_url = std::env::var(&env_key).unwrap_or_else(|_| "http://localhost:8765".to_string());
            Arc::new(HttpAdapter::new(base_url, other.to_string(), other.to_string()))
        }
    }
}

/// Resolves the configured participant labels into two usable
/// `(label, adapter)` slots, duplicating the sole usable one if only
/// one responds, matching `ProviderRegistry::pick_two`'s behavior but
/// preserving the label each adapter was registered under (the
/// registry itself only tracks anonymous slots).
async fn pick_two_labeled(
    participants: &[String],
) -> Option<((String, Arc<dyn LlmAdapter>), (String, Arc<dyn LlmAdapter>))> {
    let mut usable = Vec::new();
    for label in participants {
        let adapter = build_adapter(label);
        if adapter.state().await.is_usable() {
            usable.push((label.clone(), adapter));
        } else {
            tracing::warn!(label = %label, "participant adapter unavailable, skipping");
        }
    }
    match usable.len() {
        0 => None,
        1 => {
            let (label, adapter) = usable.into_iter().next().unwrap();
            Some(((label.clone(), adapter.clone()), (label, adapter)))
        }
        _ => {
            let mut it = usable.into_iter();
            let first = it.next().unwrap();
            let second = it.next().unwrap();
            Some((first, second))
        }
    }
}

/// Turns a debate's free-form disagreements into scoreable issues so
/// the plan reviser has something to target, ordering them by the same
/// position-based severity heuristic used by the iterative engine (a
/// debate's disagreements are already ordered by how the moderator
/// surfaced them).
fn issues_from_disagreements(disagreements: &[String]) -> Vec<ScoredIssue> {
    disagreements
        .iter()
        .enumerate()
        .map(|(i, text)| {
            let severity = match i {
                0 => Severity::Critical,
                1 => Severity::High,
                2 => Severity::Medium,
                _ => Severity::Low,
            };
            let issue = Issue {
                title: text.chars().take(80).collect(),
                description: text.clone(),
                source: "debate".to_string(),
                proposed_fix: text.clone(),
                severity,
                impact: Impact::Medium,
                effort: Effort::Medium,
            };
            let (priority_score, priority_label) = score_issue(issue.severity, issue.impact, issue.effort);
            ScoredIssue {
                issue,
                priority_score,
                priority_label,
            }
        })
        .collect()
}

fn init_logging(config: &DebateConfig) {
    let directive = format!("coordination={}", config.log_level);
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(directive));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let config = DebateConfig::load().context("loading debate configuration")?;
    init_logging(&config);

    match args.command {
        Command::Debate { file, request, session } => run_debate_cmd(&config, file, request, session).await,
        Command::Revise { file, request } => run_revise_cmd(&config, file, request).await,
        Command::Enforce {
            request,
            files,
            session,
            r#override,
        } => run_enforce_cmd(&config, request, files, session, r#override),
        Command::Status { session } => run_status_cmd(&config, session),
    }
}

async fn run_debate_cmd(config: &DebateConfig, file: PathBuf, request: String, session: Option<String>) -> Result<()> {
    let content = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
    let focus_areas = infer_focus_areas(&request);

    let ((first_label, first_adapter), (second_label, second_adapter)) = pick_two_labeled(&config.participants)
        .await
        .context("no usable participant adapters")?;

    let cache = Arc::new(ResponseCache::new(config.temp_root(), config.cache_ttl));
    let orchestrator = ParallelOrchestrator::new(cache);

    tracing::info!(file = %file.display(), "starting debate round");
    let result = orchestrator
        .run_debate(
            &request,
            &content,
            focus_areas.clone(),
            (first_label.as_str(), first_adapter),
            (second_label.as_str(), second_adapter),
            false,
        )
        .await
        .context("running debate")?;

    println!("Consensus: {:.1}/100 ({})", result.consensus_score, result.interpretation);
    println!("Recommendation: {}", result.recommendation);
    for participant in &result.participants {
        println!("  {} scored {:.0}/100 (cache={})", participant.label, participant.score, participant.from_cache);
    }
    if !result.disagreements.is_empty() {
        println!("Disagreements:");
        for d in &result.disagreements {
            println!("  - {d}");
        }
    }

    let history = HistoryStore::new(config.temp_root());
    let mut participant_scores = std::collections::HashMap::new();
    for participant in &result.participants {
        participant_scores.insert(participant.label.clone(), participant.score);
    }
    let record = DebateRecord {
        id: String::new(),
        timestamp: chrono::Utc::now(),
        file_path: file.display().to_string(),
        content_hash: content_hash(&content),
        file_size: content.len(),
        request: request.clone(),
        focus_areas,
        consensus_score: result.consensus_score,
        interpretation: result.interpretation.clone(),
        recommendation: result.recommendation.clone(),
        score_difference: result.score_difference,
        participant_scores,
        disagreements: result.disagreements.clone(),
        agreements: result.agreements.clone(),
        analysis_time_ms: result.total_time_ms,
        patterns_detected: Vec::new(),
        outcome: Outcome::Pending,
        outcome_notes: None,
    };
    let id = history.save_debate(record).context("saving debate record")?;
    tracing::info!(debate_id = %id, "recorded debate outcome");

    if let Some(session_id) = session {
        let store = SessionStore::new(config.temp_root(), config.lock_timeout);
        store.create_session(&session_id).ok();
        let mut metadata = store.read_metadata(&session_id).context("reading session metadata")?;
        metadata.state = if result.consensus_score >= config.consensus_min as f64 {
            SessionState::Consensus
        } else {
            SessionState::Escalation
        };
        metadata.current_round += 1;
        metadata.request = Some(request);
        metadata.consensus_score = Some(result.consensus_score);
        store.write_metadata(&session_id, &metadata).context("writing session metadata")?;
    }

    Ok(())
}

async fn run_revise_cmd(config: &DebateConfig, file: PathBuf, request: String) -> Result<()> {
    let content = std::fs::read_to_string(&file).with_context(|| format!("reading {}", file.display()))?;
    let focus_areas = infer_focus_areas(&request);

    let ((first_label, first_adapter), (second_label, second_adapter)) = pick_two_labeled(&config.participants)
        .await
        .context("no usable participant adapters")?;
    let reviser_adapter = Arc::clone(&first_adapter);

    let cache = Arc::new(ResponseCache::new(config.temp_root(), config.cache_ttl));
    let orchestrator = ParallelOrchestrator::new(cache);

    let result = orchestrator
        .run_debate(
            &request,
            &content,
            focus_areas,
            (first_label.as_str(), first_adapter),
            (second_label.as_str(), second_adapter),
            false,
        )
        .await
        .context("running debate")?;

    println!("Consensus before revision: {:.1}/100", result.consensus_score);

    if result.consensus_score >= config.target_consensus as f64 {
        println!("Already at or above target consensus ({}); nothing to revise.", config.target_consensus);
        return Ok(());
    }

    let scored_issues = issues_from_disagreements(&result.disagreements);
    let revision = revise_plan(
        reviser_adapter.as_ref(),
        &file,
        &scored_issues,
        &result.disagreements,
        result.consensus_score,
        config.target_consensus,
    )
    .await
    .context("revising plan")?;

    if !revision.success {
        println!("Revision failed: {}", revision.error.unwrap_or_default());
        return Ok(());
    }

    std::fs::write(&file, &revision.revised_content).with_context(|| format!("writing {}", file.display()))?;
    println!("Revised {} ({} issue(s) addressed)", file.display(), revision.issues_addressed.len());
    println!("{}", revision.revision_summary);

    Ok(())
}

fn run_enforce_cmd(config: &DebateConfig, request: String, files: Vec<String>, session: String, set_override: bool) -> Result<()> {
    let requirement = check_debate_required(config, &request, &files);
    println!(
        "Complexity score: {} ({})",
        requirement.complexity_score, requirement.reason
    );

    if !requirement.required {
        println!("No debate required; execution allowed.");
        return Ok(());
    }

    let store = SessionStore::new(config.temp_root(), config.lock_timeout);
    store.create_session(&session).ok();

    if set_override {
        mark_user_override(&store, &session).context("marking user override")?;
        println!("User override recorded for session {session}.");
    }

    let decision = block_execution_until_consensus(config, &store, &session, config.max_rounds);
    if let Some(error) = &decision.error {
        println!("Gate error: {error}");
    }
    if decision.can_execute {
        println!("Execution allowed (consensus={:?}, override={}).", decision.consensus_score, decision.user_override);
    } else {
        println!("Execution blocked.");
        if let Some(pack) = decision.decision_pack {
            println!("{} (round {}/{})", pack.summary, pack.current_round, pack.max_rounds);
        }
        std::process::exit(1);
    }

    Ok(())
}

fn run_status_cmd(config: &DebateConfig, session: String) -> Result<()> {
    let store = SessionStore::new(config.temp_root(), config.lock_timeout);
    let metadata: SessionMetadata = store.read_metadata(&session).context("reading session metadata")?;

    println!("Session: {}", metadata.session_id);
    println!("State: {}", metadata.state);
    println!("Round: {}", metadata.current_round);
    if let Some(score) = metadata.consensus_score {
        println!("Consensus: {score:.1}/100");
    }
    if metadata.user_override {
        println!("User override: set");
    }

    Ok(())
}
