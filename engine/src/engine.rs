//! Round-by-round bracket progression: derives each round's matchups from
//! the previous round's recorded winners, fans the four regions out as
//! concurrent pipelines, and joins at a barrier before the next round.

use crate::field::Field;
use crate::oracle::Oracle;
use crate::resolver::{self, DEFAULT_MAX_ATTEMPTS, ResolveError, Side};
use crate::{Matchup, MatchupResult, RegionName, Round, Team, TournamentState};
use futures_util::future::join_all;
use log::info;
use std::fmt;
use std::sync::Arc;

pub const SEMIFINAL_PAIRINGS: [(RegionName, RegionName); 2] = [
    (RegionName::East, RegionName::West),
    (RegionName::South, RegionName::Midwest),
];

#[derive(Debug)]
pub enum EngineError {
    /// A matchup could not be decided; carries enough context to name the
    /// exact game that failed.
    Resolve {
        round: Round,
        region: Option<RegionName>,
        matchup_index: usize,
        team1: String,
        team2: String,
        source: ResolveError,
    },
    /// A round referenced a prior-round result that was never recorded.
    /// This is a topology bug, never worked around.
    MissingResult {
        round: Round,
        region: Option<RegionName>,
        matchup_index: usize,
    },
    /// A spawned regional pipeline died before reporting a result.
    Task(String),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Resolve { round, region, matchup_index, team1, team2, source } => {
                match region {
                    Some(region) => write!(
                        f,
                        "{round}, {region} matchup {matchup_index} ({team1} vs {team2}): {source}",
                    ),
                    None => write!(
                        f,
                        "{round} matchup {matchup_index} ({team1} vs {team2}): {source}",
                    ),
                }
            }
            EngineError::MissingResult { round, region, matchup_index } => match region {
                Some(region) => write!(
                    f,
                    "missing result for {round}, {region} matchup {matchup_index}",
                ),
                None => write!(f, "missing result for {round} matchup {matchup_index}"),
            },
            EngineError::Task(msg) => write!(f, "regional pipeline failed: {msg}"),
        }
    }
}

impl std::error::Error for EngineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            EngineError::Resolve { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Owns the tournament topology and drives rounds 1 through 6 to completion.
pub struct BracketEngine {
    field: Field,
    semifinal_pairings: [(RegionName, RegionName); 2],
    max_attempts: u32,
}

impl BracketEngine {
    pub fn new(field: Field) -> Self {
        Self {
            field,
            semifinal_pairings: SEMIFINAL_PAIRINGS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
        }
    }

    /// Override the cross-region semifinal pairing (fixed per tournament).
    pub fn with_semifinal_pairings(mut self, pairings: [(RegionName, RegionName); 2]) -> Self {
        self.semifinal_pairings = pairings;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn field(&self) -> &Field {
        &self.field
    }

    /// Run the full tournament into a fresh state. Use [`Self::run_into`]
    /// when partial results must survive a failed run.
    pub async fn run(&self, oracle: Arc<dyn Oracle>) -> Result<TournamentState, EngineError> {
        let mut state = TournamentState::new(self.field.year());
        self.run_into(oracle, &mut state).await?;
        Ok(state)
    }

    /// Drive rounds 1-6 against the caller's state object. On failure every
    /// fully completed round is already committed and stays readable; no
    /// later round is attempted.
    pub async fn run_into(
        &self,
        oracle: Arc<dyn Oracle>,
        state: &mut TournamentState,
    ) -> Result<(), EngineError> {
        for round in Round::REGIONAL {
            self.play_regional_round(round, &oracle, state).await?;
        }
        self.play_semifinals(&oracle, state).await?;
        self.play_championship(&oracle, state).await
    }

    /// One regional round: slots are derived up front (so structural faults
    /// surface before any oracle call), then the four regions run as
    /// independent sequential pipelines. The join is a barrier; results
    /// commit in canonical region order, so the stored round is
    /// deterministic regardless of task interleaving.
    async fn play_regional_round(
        &self,
        round: Round,
        oracle: &Arc<dyn Oracle>,
        state: &mut TournamentState,
    ) -> Result<(), EngineError> {
        info!("processing {round}");

        let mut handles = Vec::with_capacity(RegionName::ALL.len());
        for region in RegionName::ALL {
            let slots = self.regional_slots(round, region, state)?;
            let oracle = Arc::clone(oracle);
            let max_attempts = self.max_attempts;
            handles.push(tokio::spawn(async move {
                play_region(oracle, round, region, slots, max_attempts).await
            }));
        }

        let mut results = Vec::with_capacity(round.matchups_per_region() * RegionName::ALL.len());
        for outcome in join_all(handles).await {
            let region_results = outcome.map_err(|e| EngineError::Task(e.to_string()))??;
            results.extend(region_results);
        }

        if round == Round::Elite8 {
            for result in &results {
                info!("{} advances to the Final Four", result.winner.name);
                state.push_final_four(result.winner.clone());
            }
        }
        state.commit_round(round, results);
        Ok(())
    }

    /// Matchup inputs for one region. Round 1 comes from the fixed seed
    /// pairings; round r matchup i consumes the winners of round r-1
    /// matchups 2i and 2i+1 in the same region.
    fn regional_slots(
        &self,
        round: Round,
        region: RegionName,
        state: &TournamentState,
    ) -> Result<Vec<(Team, Team)>, EngineError> {
        if round == Round::First {
            return Ok(self.field.first_round(region));
        }
        let prev = round.prev().expect("regional rounds past the first have a predecessor");

        let mut slots = Vec::with_capacity(round.matchups_per_region());
        for i in 0..round.matchups_per_region() {
            let feeder = |offset: usize| {
                state
                    .result(prev, Some(region), 2 * i + offset)
                    .map(|r| r.winner.clone())
                    .ok_or(EngineError::MissingResult {
                        round: prev,
                        region: Some(region),
                        matchup_index: 2 * i + offset,
                    })
            };
            slots.push((feeder(0)?, feeder(1)?));
        }
        Ok(slots)
    }

    async fn play_semifinals(
        &self,
        oracle: &Arc<dyn Oracle>,
        state: &mut TournamentState,
    ) -> Result<(), EngineError> {
        info!("processing {}", Round::FinalFour);

        let mut results = Vec::with_capacity(self.semifinal_pairings.len());
        for (i, (region1, region2)) in self.semifinal_pairings.iter().enumerate() {
            let team1 = self.regional_champion(*region1, state)?;
            let team2 = self.regional_champion(*region2, state)?;
            let result =
                play_matchup(oracle.as_ref(), Round::FinalFour, None, i, team1, team2, self.max_attempts)
                    .await?;
            results.push(result);
        }
        state.commit_round(Round::FinalFour, results);
        Ok(())
    }

    fn regional_champion(
        &self,
        region: RegionName,
        state: &TournamentState,
    ) -> Result<Team, EngineError> {
        state
            .result(Round::Elite8, Some(region), 0)
            .map(|r| r.winner.clone())
            .ok_or(EngineError::MissingResult {
                round: Round::Elite8,
                region: Some(region),
                matchup_index: 0,
            })
    }

    async fn play_championship(
        &self,
        oracle: &Arc<dyn Oracle>,
        state: &mut TournamentState,
    ) -> Result<(), EngineError> {
        info!("processing {}", Round::Championship);

        // The finalists are the two semifinal winners; their Team::region
        // tags say which side of the bracket each came from.
        let finalist = |index: usize| {
            state
                .result(Round::FinalFour, None, index)
                .map(|r| r.winner.clone())
                .ok_or(EngineError::MissingResult {
                    round: Round::FinalFour,
                    region: None,
                    matchup_index: index,
                })
        };
        let team1 = finalist(0)?;
        let team2 = finalist(1)?;

        let result =
            play_matchup(oracle.as_ref(), Round::Championship, None, 0, team1, team2, self.max_attempts)
                .await?;
        let champion = result.winner.clone();
        state.commit_round(Round::Championship, vec![result]);
        info!("champion: {} ({})", champion.name, champion.region);
        state.set_champion(champion);
        Ok(())
    }
}

/// Sequential pipeline for one region's share of a round. Later matchups in
/// a region never depend on this round's earlier ones, but running them in
/// order keeps oracle traffic and logs readable.
async fn play_region(
    oracle: Arc<dyn Oracle>,
    round: Round,
    region: RegionName,
    slots: Vec<(Team, Team)>,
    max_attempts: u32,
) -> Result<Vec<MatchupResult>, EngineError> {
    let mut results = Vec::with_capacity(slots.len());
    for (i, (team1, team2)) in slots.into_iter().enumerate() {
        let result =
            play_matchup(oracle.as_ref(), round, Some(region), i, team1, team2, max_attempts)
                .await?;
        results.push(result);
    }
    Ok(results)
}

async fn play_matchup(
    oracle: &dyn Oracle,
    round: Round,
    region: Option<RegionName>,
    matchup_index: usize,
    team1: Team,
    team2: Team,
    max_attempts: u32,
) -> Result<MatchupResult, EngineError> {
    info!("  {team1} vs {team2}");

    match resolver::resolve(oracle, &team1, &team2, round, max_attempts).await {
        Ok((side, verdict)) => {
            let winner = match side {
                Side::Team1 => team1.clone(),
                Side::Team2 => team2.clone(),
            };
            info!("    winner: {winner}");
            Ok(MatchupResult {
                matchup: Matchup { round, region, matchup_index, team1, team2 },
                winner,
                analysis: verdict.analysis,
                reasoning: verdict.reasoning,
                raw_response: verdict.raw_response,
            })
        }
        Err(source) => Err(EngineError::Resolve {
            round,
            region,
            matchup_index,
            team1: team1.name,
            team2: team2.name,
            source,
        }),
    }
}
