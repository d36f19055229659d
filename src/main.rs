use anyhow::Context;
use bracket_engine::engine::BracketEngine;
use bracket_engine::field::Field;
use bracket_engine::llm::LlmOracle;
use bracket_engine::oracle::{ChalkOracle, Oracle};
use bracket_engine::{Round, TournamentState};
use chrono::Local;
use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

const DEFAULT_YEAR: u16 = 2025;
const DEFAULT_MODEL: &str = "gpt-4o-mini";
const FALLBACK_TEAMS_JSON: &str = include_str!("../2025_teams.json");

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let Some(year) = handle_cli_args()? else {
        return Ok(());
    };

    let field = load_field(year)?;
    let oracle = build_oracle();

    info!("generating the {year} bracket...");
    let engine = BracketEngine::new(field);
    let mut state = TournamentState::new(year);
    let outcome = engine.run_into(Arc::clone(&oracle), &mut state).await;

    // Whatever completed is worth keeping, even when a matchup failed.
    let path = save_results(&state)?;
    info!("results written to {}", path.display());

    outcome.with_context(|| format!("bracket generation aborted for {year}"))?;

    print_summary(&state);
    Ok(())
}

/// Returns the tournament year to run, or None when the invocation was
/// handled entirely by the argument (help/version).
fn handle_cli_args() -> anyhow::Result<Option<u16>> {
    let mut args = std::env::args().skip(1);
    let Some(arg) = args.next() else {
        return Ok(Some(DEFAULT_YEAR));
    };

    match arg.as_str() {
        "-h" | "--help" => {
            println!("{}", usage_text());
            Ok(None)
        }
        "-V" | "--version" => {
            println!("mmbracket {}", env!("CARGO_PKG_VERSION"));
            Ok(None)
        }
        year => year
            .parse::<u16>()
            .map(Some)
            .with_context(|| format!("expected a tournament year, got {year:?}\n\n{}", usage_text())),
    }
}

fn usage_text() -> &'static str {
    "mmbracket - LLM-driven NCAA March Madness bracket generator

Usage:
  mmbracket [year]
  mmbracket --help
  mmbracket --version

Environment:
  MMBRACKET_TEAMS_JSON   Path to a team-field JSON file
                         ({\"Duke\": {\"seed\": 1, \"region\": \"East\"}, ...})
  MMBRACKET_ORACLE_URL   Chat-completions endpoint for the prediction oracle
  MMBRACKET_ORACLE_MODEL Model name sent to the endpoint (default gpt-4o-mini)
  MMBRACKET_API_KEY      Bearer token for the endpoint
  RUST_LOG               Log filter (default info)

Without MMBRACKET_ORACLE_URL the deterministic chalk oracle is used, which
always advances the better seed."
}

/// Field fallback chain: explicit file, then the embedded 2025 field, then
/// deterministic placeholders.
fn load_field(year: u16) -> anyhow::Result<Field> {
    if let Ok(path) = std::env::var("MMBRACKET_TEAMS_JSON")
        && !path.trim().is_empty()
    {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("could not read team field from {path}"))?;
        return Field::from_json_str(year, &content)
            .with_context(|| format!("invalid team field json at {path}"));
    }

    if year == DEFAULT_YEAR {
        return Field::from_json_str(year, FALLBACK_TEAMS_JSON)
            .context("embedded 2025 team field is invalid");
    }

    warn!("no team field for {year}; using placeholder seeds");
    Ok(Field::placeholders(year))
}

fn build_oracle() -> Arc<dyn Oracle> {
    match std::env::var("MMBRACKET_ORACLE_URL") {
        Ok(url) if !url.trim().is_empty() => {
            let model = std::env::var("MMBRACKET_ORACLE_MODEL")
                .unwrap_or_else(|_| DEFAULT_MODEL.to_owned());
            info!("using oracle {model} at {url}");
            let mut oracle = LlmOracle::new(url, model);
            if let Ok(key) = std::env::var("MMBRACKET_API_KEY") {
                oracle = oracle.with_api_key(key);
            }
            Arc::new(oracle)
        }
        _ => {
            warn!("MMBRACKET_ORACLE_URL not set; using the deterministic chalk oracle");
            Arc::new(ChalkOracle)
        }
    }
}

fn save_results(state: &TournamentState) -> anyhow::Result<PathBuf> {
    fs::create_dir_all("results").context("could not create results directory")?;
    let timestamp = Local::now().format("%Y%m%d_%H%M%S");
    let path = PathBuf::from(format!("results/bracket_{}_{timestamp}.json", state.year()));
    let json = serde_json::to_string_pretty(state).context("could not serialize results")?;
    fs::write(&path, json).with_context(|| format!("could not write {}", path.display()))?;
    Ok(path)
}

fn print_summary(state: &TournamentState) {
    let final_four = state
        .final_four()
        .iter()
        .map(|t| t.name.as_str())
        .collect::<Vec<_>>()
        .join(", ");
    info!("final four: {final_four}");
    if let Some(result) = state.round_results(Round::Championship).and_then(|r| r.first()) {
        info!(
            "championship: {} vs {}",
            result.matchup.team1.name, result.matchup.team2.name,
        );
    }
    if let Some(champion) = state.champion() {
        info!("champion: {} ({}, Seed {})", champion.name, champion.region, champion.seed);
    }
}
