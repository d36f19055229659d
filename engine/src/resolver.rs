//! Matchup resolution: turn an oracle's untrusted text into a definitive
//! winner, retrying with exponential backoff when the answer is ambiguous.

use crate::normalize::normalize;
use crate::oracle::{Oracle, OracleError, Verdict};
use crate::{Round, Team};
use log::warn;
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;

pub const DEFAULT_MAX_ATTEMPTS: u32 = 5;

/// Which of the two candidates a prediction names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Team1,
    Team2,
}

/// Outcome of matching a prediction against the two candidates. Ambiguity is
/// a first-class value here, not a sentinel string.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Claim {
    Matched(Side),
    Ambiguous,
}

#[derive(Debug)]
pub enum ResolveError {
    /// Every attempt produced an answer that named neither candidate.
    Exhausted { attempts: u32 },
    /// The oracle failed in a way retrying cannot fix (or the retry budget
    /// ran out on transient faults).
    Oracle(OracleError),
}

impl fmt::Display for ResolveError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResolveError::Exhausted { attempts } => {
                write!(f, "no unambiguous prediction after {attempts} attempts")
            }
            ResolveError::Oracle(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for ResolveError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ResolveError::Exhausted { .. } => None,
            ResolveError::Oracle(err) => Some(err),
        }
    }
}

/// Match a prediction against the two candidate names.
///
/// A side matches when its normalized name and the normalized prediction
/// contain one another in either direction. An empty prediction never
/// matches. When both sides match, the claim is ambiguous unless the two
/// team names themselves overlap as substrings (near-duplicates like
/// "Miami" / "Miami Ohio") — then team1 takes precedence. That tie-break is
/// kept for compatibility with earlier behavior; it is arbitrary, not
/// principled.
pub fn interpret(prediction: &str, team1: &str, team2: &str) -> Claim {
    let p = normalize(prediction);
    if p.is_empty() {
        return Claim::Ambiguous;
    }
    let t1 = normalize(team1);
    let t2 = normalize(team2);
    let matches1 = !t1.is_empty() && (t1.contains(&p) || p.contains(&t1));
    let matches2 = !t2.is_empty() && (t2.contains(&p) || p.contains(&t2));

    match (matches1, matches2) {
        (true, false) => Claim::Matched(Side::Team1),
        (false, true) => Claim::Matched(Side::Team2),
        (true, true) if t1.contains(&t2) || t2.contains(&t1) => Claim::Matched(Side::Team1),
        _ => Claim::Ambiguous,
    }
}

/// Delay before attempt `n` (n >= 2): 0.5s, 1s, 2s, 4s, ...
fn backoff_delay(attempt: u32) -> Duration {
    Duration::from_millis(500u64 << (attempt - 2))
}

/// Resolve one matchup. Each attempt is a fresh oracle call, never a replay.
/// Ambiguous answers and retryable oracle faults share the attempt budget;
/// non-retryable faults propagate immediately. Exhausting the budget is a
/// hard failure — a winner is never defaulted.
pub async fn resolve(
    oracle: &dyn Oracle,
    team1: &Team,
    team2: &Team,
    round: Round,
    max_attempts: u32,
) -> Result<(Side, Verdict), ResolveError> {
    for attempt in 1..=max_attempts {
        if attempt > 1 {
            let delay = backoff_delay(attempt);
            warn!(
                "retry {attempt}/{max_attempts} for {} vs {} after {:.1}s",
                team1.name,
                team2.name,
                delay.as_secs_f64(),
            );
            sleep(delay).await;
        }

        let verdict = match oracle.predict(team1, team2, round).await {
            Ok(verdict) => verdict,
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!("oracle fault for {} vs {}: {err}", team1.name, team2.name);
                continue;
            }
            Err(err) => return Err(ResolveError::Oracle(err)),
        };

        match interpret(&verdict.prediction, &team1.name, &team2.name) {
            Claim::Matched(side) => return Ok((side, verdict)),
            Claim::Ambiguous => warn!(
                "could not map prediction {:?} to {} or {}",
                verdict.prediction, team1.name, team2.name,
            ),
        }
    }

    Err(ResolveError::Exhausted { attempts: max_attempts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RegionName;
    use crate::oracle::parse_verdict;
    use async_trait::async_trait;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::time::Instant;

    fn duke() -> Team {
        Team::new("Duke", 1, RegionName::East)
    }

    fn kansas() -> Team {
        Team::new("Kansas", 2, RegionName::East)
    }

    fn verdict(prediction: &str) -> Verdict {
        Verdict { prediction: prediction.to_owned(), ..Default::default() }
    }

    /// Plays back a fixed sequence of responses, counting calls.
    struct ScriptedOracle {
        responses: Mutex<VecDeque<Result<Verdict, OracleError>>>,
        calls: AtomicU32,
    }

    impl ScriptedOracle {
        fn new(responses: impl IntoIterator<Item = Result<Verdict, OracleError>>) -> Self {
            Self {
                responses: Mutex::new(responses.into_iter().collect()),
                calls: AtomicU32::new(0),
            }
        }

        fn calls(&self) -> u32 {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl Oracle for ScriptedOracle {
        async fn predict(
            &self,
            _team1: &Team,
            _team2: &Team,
            _round: Round,
        ) -> Result<Verdict, OracleError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .expect("oracle called more times than scripted")
        }
    }

    #[test]
    fn interpret_matches_either_direction() {
        assert_eq!(interpret("Duke", "Duke", "Kansas"), Claim::Matched(Side::Team1));
        assert_eq!(interpret("Kansas", "Duke", "Kansas"), Claim::Matched(Side::Team2));
        // Prediction with extra words still contains the candidate.
        assert_eq!(
            interpret("The Duke Blue Devils win", "Duke", "Kansas"),
            Claim::Matched(Side::Team1),
        );
        // Prediction that is a fragment of the candidate name.
        assert_eq!(
            interpret("Marys", "Saint Mary's", "Kansas"),
            Claim::Matched(Side::Team1),
        );
    }

    #[test]
    fn interpret_rejects_unrelated_and_empty_text() {
        assert_eq!(interpret("Pending", "Duke", "Kansas"), Claim::Ambiguous);
        assert_eq!(interpret("", "Duke", "Kansas"), Claim::Ambiguous);
        assert_eq!(interpret("   ", "Duke", "Kansas"), Claim::Ambiguous);
    }

    #[test]
    fn interpret_both_unrelated_matches_is_ambiguous() {
        // Mentioning both candidates is not a pick.
        assert_eq!(interpret("Duke or Kansas", "Duke", "Kansas"), Claim::Ambiguous);
    }

    #[test]
    fn interpret_near_duplicate_names_prefer_team1() {
        assert_eq!(
            interpret("Miami", "Miami", "Miami Ohio"),
            Claim::Matched(Side::Team1),
        );
        assert_eq!(
            interpret("Miami Ohio", "Miami", "Miami Ohio"),
            Claim::Matched(Side::Team1),
        );
    }

    #[tokio::test(start_paused = true)]
    async fn retries_with_backoff_until_unambiguous() {
        let oracle = ScriptedOracle::new([
            Ok(verdict("the committee is undecided")),
            Ok(verdict("too close to call")),
            Ok(verdict("no comment")),
            Ok(verdict("flip a coin")),
            Ok(verdict("Duke")),
        ]);

        let start = Instant::now();
        let (side, verdict) = resolve(&oracle, &duke(), &kansas(), Round::First, 5)
            .await
            .unwrap();

        assert_eq!(side, Side::Team1);
        assert_eq!(verdict.prediction, "Duke");
        assert_eq!(oracle.calls(), 5);
        // 0.5 + 1 + 2 + 4 seconds of backoff across attempts 2-5.
        assert_eq!(start.elapsed(), Duration::from_millis(7500));
    }

    #[tokio::test(start_paused = true)]
    async fn exhausts_after_max_attempts() {
        let oracle = ScriptedOracle::new(vec![Ok(verdict("Pending")); 5]);

        let err = resolve(&oracle, &duke(), &kansas(), Round::First, 5)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Exhausted { attempts: 5 }));
        assert_eq!(oracle.calls(), 5);
    }

    #[tokio::test(start_paused = true)]
    async fn transient_oracle_faults_share_the_retry_budget() {
        let oracle = ScriptedOracle::new([
            Err(OracleError::Throttled("429".into())),
            Ok(verdict("Kansas")),
        ]);

        let start = Instant::now();
        let (side, _) = resolve(&oracle, &duke(), &kansas(), Round::First, 5)
            .await
            .unwrap();

        assert_eq!(side, Side::Team2);
        assert_eq!(oracle.calls(), 2);
        assert_eq!(start.elapsed(), Duration::from_millis(500));
    }

    #[tokio::test(start_paused = true)]
    async fn fatal_oracle_faults_propagate_without_retry() {
        let oracle = ScriptedOracle::new([Err(OracleError::InvalidRequest("400".into()))]);

        let start = Instant::now();
        let err = resolve(&oracle, &duke(), &kansas(), Round::First, 5)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Oracle(OracleError::InvalidRequest(_))));
        assert_eq!(oracle.calls(), 1);
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn retryable_fault_on_final_attempt_propagates() {
        let oracle = ScriptedOracle::new([
            Ok(verdict("unclear")),
            Err(OracleError::Throttled("429".into())),
        ]);

        let err = resolve(&oracle, &duke(), &kansas(), Round::First, 2)
            .await
            .unwrap_err();

        assert!(matches!(err, ResolveError::Oracle(OracleError::Throttled(_))));
        assert_eq!(oracle.calls(), 2);
    }

    #[tokio::test]
    async fn resolve_keeps_the_winning_verdict() {
        let raw = "ANALYSIS:\nKansas rebounds better.\n\nREASONING:\nSize.\n\nPREDICTION:\nKansas";
        let oracle = ScriptedOracle::new([Ok(parse_verdict(raw))]);

        let (side, verdict) = resolve(&oracle, &duke(), &kansas(), Round::Second, 5)
            .await
            .unwrap();

        assert_eq!(side, Side::Team2);
        assert_eq!(verdict.analysis, "Kansas rebounds better.");
        assert_eq!(verdict.raw_response, raw);
    }
}
