//! The prediction oracle contract and the pieces shared by every
//! implementation: the structured verdict, the error taxonomy, and the
//! parser that carves a model's freeform answer into sections.

use crate::{Round, Team};
use async_trait::async_trait;
use std::fmt;

/// A structured prediction for one matchup. `prediction` SHOULD be one of
/// the two team names but is untrusted text — the resolver decides whether
/// it actually names a candidate.
#[derive(Debug, Clone, Default)]
pub struct Verdict {
    pub analysis: String,
    pub reasoning: String,
    pub prediction: String,
    pub raw_response: String,
}

#[derive(Debug, Clone)]
pub enum OracleError {
    /// Rate limiting or a transient upstream failure; worth retrying.
    Throttled(String),
    /// Could not reach the oracle at all; worth retrying.
    Network(String),
    /// The oracle rejected the request; retrying the same call cannot help.
    InvalidRequest(String),
    /// The oracle answered with something that is not a usable completion.
    InvalidResponse(String),
}

impl OracleError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, OracleError::Throttled(_) | OracleError::Network(_))
    }
}

impl fmt::Display for OracleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OracleError::Throttled(msg) => write!(f, "oracle throttled: {msg}"),
            OracleError::Network(msg) => write!(f, "oracle unreachable: {msg}"),
            OracleError::InvalidRequest(msg) => write!(f, "oracle rejected request: {msg}"),
            OracleError::InvalidResponse(msg) => write!(f, "unusable oracle response: {msg}"),
        }
    }
}

impl std::error::Error for OracleError {}

/// An external predictor asked to pick a winner for one matchup. Calls are
/// independent: implementations must not rely on prior-call context.
#[async_trait]
pub trait Oracle: Send + Sync {
    async fn predict(
        &self,
        team1: &Team,
        team2: &Team,
        round: Round,
    ) -> Result<Verdict, OracleError>;
}

const ANALYSIS_MARKER: &str = "ANALYSIS:";
const REASONING_MARKER: &str = "REASONING:";
const PREDICTION_MARKER: &str = "PREDICTION:";

fn section<'a>(text: &'a str, marker: &str, enders: &[&str]) -> Option<&'a str> {
    let start = text.find(marker)? + marker.len();
    let rest = &text[start..];
    let end = enders
        .iter()
        .filter_map(|e| rest.find(e))
        .min()
        .unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Split a model's raw answer on the ANALYSIS/REASONING/PREDICTION markers.
/// When the model ignored the format entirely, the last non-empty line is
/// taken as the prediction so a bare team-name answer still resolves.
pub fn parse_verdict(raw: &str) -> Verdict {
    let analysis = section(raw, ANALYSIS_MARKER, &[REASONING_MARKER, PREDICTION_MARKER])
        .unwrap_or_default()
        .to_owned();
    let reasoning = section(raw, REASONING_MARKER, &[PREDICTION_MARKER])
        .unwrap_or_default()
        .to_owned();
    let mut prediction = section(raw, PREDICTION_MARKER, &[]).unwrap_or_default().to_owned();

    if prediction.is_empty() {
        prediction = raw
            .lines()
            .rev()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .unwrap_or_default()
            .to_owned();
    }

    Verdict { analysis, reasoning, prediction, raw_response: raw.to_owned() }
}

/// Deterministic offline oracle: always advances the better (lower-numbered)
/// seed, team1 when the seeds are equal. Stands in for a live model when no
/// endpoint is configured, and scripts the no-upset bracket in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChalkOracle;

#[async_trait]
impl Oracle for ChalkOracle {
    async fn predict(
        &self,
        team1: &Team,
        team2: &Team,
        round: Round,
    ) -> Result<Verdict, OracleError> {
        let (winner, loser) =
            if team2.seed < team1.seed { (team2, team1) } else { (team1, team2) };
        let analysis = format!(
            "{} enters the {} as the {}-seed against {}-seed {}.",
            winner.name,
            round.label(),
            winner.seed,
            loser.seed,
            loser.name,
        );
        let reasoning =
            format!("{} holds the better seed line and advances.", winner.name);
        let raw_response = format!(
            "{ANALYSIS_MARKER}\n{analysis}\n\n{REASONING_MARKER}\n{reasoning}\n\n{PREDICTION_MARKER}\n{}",
            winner.name,
        );
        Ok(Verdict {
            analysis,
            reasoning,
            prediction: winner.name.clone(),
            raw_response,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegionName;

    fn team(name: &str, seed: u8) -> Team {
        Team::new(name, seed, RegionName::East)
    }

    #[test]
    fn parses_all_three_sections() {
        let raw = "ANALYSIS:\nDuke shoots better.\n\nREASONING:\nDepth wins.\n\nPREDICTION:\nDuke";
        let verdict = parse_verdict(raw);
        assert_eq!(verdict.analysis, "Duke shoots better.");
        assert_eq!(verdict.reasoning, "Depth wins.");
        assert_eq!(verdict.prediction, "Duke");
        assert_eq!(verdict.raw_response, raw);
    }

    #[test]
    fn missing_sections_are_empty_not_errors() {
        let verdict = parse_verdict("PREDICTION: Kansas");
        assert_eq!(verdict.analysis, "");
        assert_eq!(verdict.reasoning, "");
        assert_eq!(verdict.prediction, "Kansas");
    }

    #[test]
    fn falls_back_to_last_non_empty_line() {
        let verdict = parse_verdict("I think the winner is clear.\n\nDuke\n\n");
        assert_eq!(verdict.prediction, "Duke");
    }

    #[test]
    fn empty_response_yields_empty_prediction() {
        let verdict = parse_verdict("");
        assert_eq!(verdict.prediction, "");
    }

    #[test]
    fn retryable_classification() {
        assert!(OracleError::Throttled("429".into()).is_retryable());
        assert!(OracleError::Network("timeout".into()).is_retryable());
        assert!(!OracleError::InvalidRequest("400".into()).is_retryable());
        assert!(!OracleError::InvalidResponse("empty".into()).is_retryable());
    }

    #[tokio::test]
    async fn chalk_picks_the_better_seed() {
        let verdict = ChalkOracle
            .predict(&team("Duke", 1), &team("Norfolk State", 16), Round::First)
            .await
            .unwrap();
        assert_eq!(verdict.prediction, "Duke");

        let verdict = ChalkOracle
            .predict(&team("Norfolk State", 16), &team("Duke", 1), Round::First)
            .await
            .unwrap();
        assert_eq!(verdict.prediction, "Duke");
    }

    #[tokio::test]
    async fn chalk_prefers_team1_on_equal_seeds() {
        let verdict = ChalkOracle
            .predict(&team("Duke", 1), &team("Houston", 1), Round::FinalFour)
            .await
            .unwrap();
        assert_eq!(verdict.prediction, "Duke");
    }

    #[tokio::test]
    async fn chalk_output_round_trips_through_the_parser() {
        let verdict = ChalkOracle
            .predict(&team("Duke", 1), &team("Kansas", 2), Round::Sweet16)
            .await
            .unwrap();
        let reparsed = parse_verdict(&verdict.raw_response);
        assert_eq!(reparsed.prediction, verdict.prediction);
        assert_eq!(reparsed.analysis, verdict.analysis);
    }
}
