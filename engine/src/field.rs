//! The 64-entrant field: seed/team source for one tournament year.

use crate::{RegionName, Team};
use serde::Deserialize;
use std::collections::BTreeMap;

/// Canonical first-round seed pairings within a region, in bracket order.
pub const FIRST_ROUND_PAIRINGS: [(u8, u8); 8] =
    [(1, 16), (8, 9), (5, 12), (4, 13), (6, 11), (3, 14), (7, 10), (2, 15)];

pub const SEEDS_PER_REGION: u8 = 16;

/// One entry of the `teams_{year}.json` shape: team name maps to this.
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    pub seed: u8,
    pub region: RegionName,
}

/// A complete, well-formed field: every region holds all 16 seed slots.
/// Slots the source did not supply are filled with deterministic
/// placeholder teams ("East Seed 12"), so bracket topology never depends on
/// how complete the input was.
#[derive(Debug, Clone)]
pub struct Field {
    year: u16,
    regions: BTreeMap<RegionName, BTreeMap<u8, Team>>,
}

impl Field {
    /// Build the field from a name -> seed/region mapping. Entries with
    /// out-of-range seeds are ignored; if two names claim the same slot the
    /// alphabetically first one wins (the input map is ordered).
    pub fn from_entries(year: u16, entries: BTreeMap<String, SeedEntry>) -> Self {
        let mut regions: BTreeMap<RegionName, BTreeMap<u8, Team>> = BTreeMap::new();

        for (name, entry) in entries {
            if !(1..=SEEDS_PER_REGION).contains(&entry.seed) {
                continue;
            }
            regions
                .entry(entry.region)
                .or_default()
                .entry(entry.seed)
                .or_insert_with(|| Team::new(name, entry.seed, entry.region));
        }

        for region in RegionName::ALL {
            let slots = regions.entry(region).or_default();
            for seed in 1..=SEEDS_PER_REGION {
                slots.entry(seed).or_insert_with(|| Team {
                    name: format!("{region} Seed {seed}"),
                    seed,
                    region,
                });
            }
        }

        Self { year, regions }
    }

    /// Parse the `teams_{year}.json` shape:
    /// `{"Duke": {"seed": 1, "region": "East"}, ...}`.
    pub fn from_json_str(year: u16, json: &str) -> Result<Self, serde_json::Error> {
        let entries: BTreeMap<String, SeedEntry> = serde_json::from_str(json)?;
        Ok(Self::from_entries(year, entries))
    }

    /// An all-placeholder field, useful before the real bracket is announced.
    pub fn placeholders(year: u16) -> Self {
        Self::from_entries(year, BTreeMap::new())
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn team(&self, region: RegionName, seed: u8) -> Option<&Team> {
        self.regions.get(&region)?.get(&seed)
    }

    /// The region's eight first-round matchups in canonical pairing order.
    pub fn first_round(&self, region: RegionName) -> Vec<(Team, Team)> {
        let slots = &self.regions[&region];
        FIRST_ROUND_PAIRINGS
            .into_iter()
            .map(|(high, low)| (slots[&high].clone(), slots[&low].clone()))
            .collect()
    }
}
