pub mod engine;
pub mod field;
pub mod llm;
pub mod normalize;
pub mod oracle;
pub mod resolver;

use serde::ser::SerializeSeq;
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Domain types — tournament topology, independent of any oracle wire format
// ---------------------------------------------------------------------------

/// One of the four 16-team sub-brackets. The order of `ALL` is the canonical
/// processing order; round results and the Final Four list follow it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RegionName {
    East,
    West,
    South,
    Midwest,
}

impl RegionName {
    pub const ALL: [RegionName; 4] = [
        RegionName::East,
        RegionName::West,
        RegionName::South,
        RegionName::Midwest,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            RegionName::East => "East",
            RegionName::West => "West",
            RegionName::South => "South",
            RegionName::Midwest => "Midwest",
        }
    }

    /// Position in canonical order, used for O(1) round-table offsets.
    pub fn index(self) -> usize {
        match self {
            RegionName::East => 0,
            RegionName::West => 1,
            RegionName::South => 2,
            RegionName::Midwest => 3,
        }
    }
}

impl fmt::Display for RegionName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Tournament rounds, earliest to latest. Rounds 1–4 are regional; the
/// Final Four and Championship cross regions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Round {
    First,
    Second,
    Sweet16,
    Elite8,
    FinalFour,
    Championship,
}

impl Round {
    pub const ALL: [Round; 6] = [
        Round::First,
        Round::Second,
        Round::Sweet16,
        Round::Elite8,
        Round::FinalFour,
        Round::Championship,
    ];

    pub const REGIONAL: [Round; 4] =
        [Round::First, Round::Second, Round::Sweet16, Round::Elite8];

    pub fn number(self) -> u8 {
        match self {
            Round::First => 1,
            Round::Second => 2,
            Round::Sweet16 => 3,
            Round::Elite8 => 4,
            Round::FinalFour => 5,
            Round::Championship => 6,
        }
    }

    pub fn from_number(number: u8) -> Option<Round> {
        Round::ALL.into_iter().find(|r| r.number() == number)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Round::First => "First Round",
            Round::Second => "Second Round",
            Round::Sweet16 => "Sweet 16",
            Round::Elite8 => "Elite 8",
            Round::FinalFour => "Final Four",
            Round::Championship => "Championship",
        }
    }

    pub fn prev(self) -> Option<Round> {
        match self {
            Round::First => None,
            Round::Second => Some(Round::First),
            Round::Sweet16 => Some(Round::Second),
            Round::Elite8 => Some(Round::Sweet16),
            Round::FinalFour => Some(Round::Elite8),
            Round::Championship => Some(Round::FinalFour),
        }
    }

    pub fn next(self) -> Option<Round> {
        match self {
            Round::First => Some(Round::Second),
            Round::Second => Some(Round::Sweet16),
            Round::Sweet16 => Some(Round::Elite8),
            Round::Elite8 => Some(Round::FinalFour),
            Round::FinalFour => Some(Round::Championship),
            Round::Championship => None,
        }
    }

    pub fn is_regional(self) -> bool {
        matches!(
            self,
            Round::First | Round::Second | Round::Sweet16 | Round::Elite8
        )
    }

    /// Matchups each region contributes to this round (0 for national rounds).
    pub fn matchups_per_region(self) -> usize {
        match self {
            Round::First => 8,
            Round::Second => 4,
            Round::Sweet16 => 2,
            Round::Elite8 => 1,
            Round::FinalFour | Round::Championship => 0,
        }
    }
}

impl fmt::Display for Round {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for Round {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.number())
    }
}

/// A tournament entrant. `region` is the originating region and stays with
/// the team through the Final Four and Championship, where it identifies
/// which side of the bracket the team came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Team {
    pub name: String,
    pub seed: u8,
    pub region: RegionName,
}

impl Team {
    pub fn new(name: impl Into<String>, seed: u8, region: RegionName) -> Self {
        Self { name: name.into(), seed, region }
    }
}

impl fmt::Display for Team {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (Seed {})", self.name, self.seed)
    }
}

/// A single game slot. `region` is `None` for the Final Four and
/// Championship; `matchup_index` is the position within the round (within
/// the region for regional rounds).
#[derive(Debug, Clone, Serialize)]
pub struct Matchup {
    pub round: Round,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub region: Option<RegionName>,
    pub matchup_index: usize,
    pub team1: Team,
    pub team2: Team,
}

/// A decided matchup. `winner` is always a copy of `team1` or `team2`;
/// written exactly once and never mutated.
#[derive(Debug, Clone, Serialize)]
pub struct MatchupResult {
    #[serde(flatten)]
    pub matchup: Matchup,
    pub winner: Team,
    pub analysis: String,
    pub reasoning: String,
    pub raw_response: String,
}

// ---------------------------------------------------------------------------
// Tournament state — the result sink consumers read
// ---------------------------------------------------------------------------

/// Accumulated results of a tournament run. Grows monotonically: a round's
/// entry appears only once every matchup in that round has been decided.
/// Serializes to `{year, rounds: {"1"..: [...]}, final_four: [names],
/// champion: name}`.
#[derive(Debug, Clone, Serialize)]
pub struct TournamentState {
    year: u16,
    rounds: BTreeMap<u8, Vec<MatchupResult>>,
    #[serde(serialize_with = "team_names")]
    final_four: Vec<Team>,
    #[serde(serialize_with = "optional_team_name")]
    champion: Option<Team>,
}

fn team_names<S: Serializer>(teams: &[Team], serializer: S) -> Result<S::Ok, S::Error> {
    let mut seq = serializer.serialize_seq(Some(teams.len()))?;
    for team in teams {
        seq.serialize_element(&team.name)?;
    }
    seq.end()
}

fn optional_team_name<S: Serializer>(
    champion: &Option<Team>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match champion {
        Some(team) => serializer.serialize_str(&team.name),
        None => serializer.serialize_none(),
    }
}

impl TournamentState {
    pub fn new(year: u16) -> Self {
        Self { year, rounds: BTreeMap::new(), final_four: Vec::new(), champion: None }
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    /// All results of a completed round, in storage order (canonical region
    /// order for regional rounds, matchup order within a region).
    pub fn round_results(&self, round: Round) -> Option<&[MatchupResult]> {
        self.rounds.get(&round.number()).map(Vec::as_slice)
    }

    /// O(1) lookup by (round, region, matchup index). Regional rounds are
    /// stored as four fixed-size partitions, so the offset is computed, not
    /// scanned.
    pub fn result(
        &self,
        round: Round,
        region: Option<RegionName>,
        matchup_index: usize,
    ) -> Option<&MatchupResult> {
        let results = self.rounds.get(&round.number())?;
        let offset = match region {
            Some(r) if round.is_regional() => {
                r.index() * round.matchups_per_region() + matchup_index
            }
            None if !round.is_regional() => matchup_index,
            _ => return None,
        };
        let entry = results.get(offset)?;
        (entry.matchup.region == region && entry.matchup.matchup_index == matchup_index)
            .then_some(entry)
    }

    /// The four regional champions, in canonical region-processing order.
    pub fn final_four(&self) -> &[Team] {
        &self.final_four
    }

    pub fn champion(&self) -> Option<&Team> {
        self.champion.as_ref()
    }

    pub fn champion_name(&self) -> Option<&str> {
        self.champion.as_ref().map(|t| t.name.as_str())
    }

    pub fn is_complete(&self) -> bool {
        self.champion.is_some()
    }

    pub(crate) fn commit_round(&mut self, round: Round, results: Vec<MatchupResult>) {
        self.rounds.insert(round.number(), results);
    }

    pub(crate) fn push_final_four(&mut self, team: Team) {
        self.final_four.push(team);
    }

    pub(crate) fn set_champion(&mut self, team: Team) {
        self.champion = Some(team);
    }
}
