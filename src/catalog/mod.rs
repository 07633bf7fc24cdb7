// 📚 Boundary Table - the static catalog of subdivisions and territories
//
// Loaded once and shared read-only (usually behind an Arc) by every
// resolver and the validator. Nothing mutates it after construction.

pub mod subdivision;
pub mod territory;

pub use subdivision::{standard_subdivisions, BoundingBox, Subdivision};
pub use territory::{
    standard_partitions, standard_territories, PartitionBasis, PartitionDecision, PartitionRule,
    SubArea, Territory,
};

use crate::error::RegionError;
use anyhow::{Context as AnyhowContext, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Subdivision → territory outcome, shared by the coordinate and text paths
#[derive(Debug, Clone, PartialEq)]
pub struct TerritoryMatch {
    pub territory: String,
    pub subdivision: String,
    /// Present only when the subdivision is split
    pub partition: Option<PartitionDecision>,
}

impl TerritoryMatch {
    pub fn describe(&self) -> String {
        match &self.partition {
            Some(decision) => decision.describe(&self.subdivision),
            None => format!("{} belongs to {}", self.subdivision, self.territory),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Catalog {
    subdivisions: Vec<Subdivision>,
    territories: Vec<Territory>,
    #[serde(default)]
    partitions: Vec<PartitionRule>,
}

impl Catalog {
    /// Build from parts and check the table invariants
    pub fn new(
        subdivisions: Vec<Subdivision>,
        territories: Vec<Territory>,
        partitions: Vec<PartitionRule>,
    ) -> Result<Self, RegionError> {
        let catalog = Catalog {
            subdivisions,
            territories,
            partitions,
        };
        catalog
            .check_invariants()
            .map_err(|issues| RegionError::Catalog(issues.join("; ")))?;
        Ok(catalog)
    }

    /// The built-in table: 50 states + DC in 15 territories
    pub fn standard() -> Self {
        Catalog {
            subdivisions: standard_subdivisions(),
            territories: standard_territories(),
            partitions: standard_partitions(),
        }
    }

    /// Load an alternative table from JSON
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read catalog file: {:?}", path.as_ref()))?;

        let raw: Catalog = serde_json::from_str(&content).context("Failed to parse catalog JSON")?;

        let catalog = Catalog::new(raw.subdivisions, raw.territories, raw.partitions)?;
        Ok(catalog)
    }

    // ========================================================================
    // INVARIANTS
    // ========================================================================

    /// Every subdivision has a territory; every shared subdivision has exactly
    /// one partition rule whose outcomes are territories listing it.
    pub fn check_invariants(&self) -> Result<(), Vec<String>> {
        let mut issues = Vec::new();

        for sub in &self.subdivisions {
            if !sub.bounds.is_well_formed() {
                issues.push(format!("{}: bounding box min exceeds max", sub.name));
            }

            let owners = self.territories_for(&sub.name);
            let rules = self
                .partitions
                .iter()
                .filter(|p| p.subdivision == sub.name)
                .count();

            match owners.len() {
                0 => issues.push(format!("{}: not a member of any territory", sub.name)),
                1 if rules > 0 => {
                    issues.push(format!("{}: has a partition rule but only one territory", sub.name))
                }
                1 => {}
                n if rules != 1 => issues.push(format!(
                    "{}: shared by {} territories but has {} partition rules",
                    sub.name, n, rules
                )),
                _ => {}
            }
        }

        for territory in &self.territories {
            if territory.members.is_empty() {
                issues.push(format!("{}: territory has no members", territory.name));
            }
            for member in &territory.members {
                if self.subdivision(member).is_none() {
                    issues.push(format!("{}: unknown member subdivision {}", territory.name, member));
                }
            }
        }

        for rule in &self.partitions {
            for name in rule.territories() {
                let lists_it = self
                    .territory(name)
                    .map(|t| t.has_member(&rule.subdivision))
                    .unwrap_or(false);
                if !lists_it {
                    issues.push(format!(
                        "{}: partition outcome {} does not list the subdivision",
                        rule.subdivision, name
                    ));
                }
            }
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    // ========================================================================
    // LOOKUPS
    // ========================================================================

    pub fn subdivisions(&self) -> &[Subdivision] {
        &self.subdivisions
    }

    pub fn territories(&self) -> &[Territory] {
        &self.territories
    }

    pub fn partitions(&self) -> &[PartitionRule] {
        &self.partitions
    }

    /// Exact canonical-name lookup
    pub fn subdivision(&self, name: &str) -> Option<&Subdivision> {
        self.subdivisions.iter().find(|s| s.name == name)
    }

    /// Case-insensitive lookup by name, alias or abbreviation
    pub fn find_subdivision(&self, value: &str) -> Option<&Subdivision> {
        if value.trim().is_empty() {
            return None;
        }
        self.subdivisions.iter().find(|s| s.matches(value))
    }

    pub fn territory(&self, name: &str) -> Option<&Territory> {
        self.territories.iter().find(|t| t.name == name)
    }

    pub fn is_territory(&self, name: &str) -> bool {
        self.territory(name).is_some()
    }

    pub fn territories_for(&self, subdivision: &str) -> Vec<&Territory> {
        self.territories
            .iter()
            .filter(|t| t.has_member(subdivision))
            .collect()
    }

    pub fn partition_for(&self, subdivision: &str) -> Option<&PartitionRule> {
        self.partitions.iter().find(|p| p.subdivision == subdivision)
    }

    /// Map a subdivision to its territory.
    ///
    /// `sub_area_hint` is free text searched for county/city names and
    /// `latitude` feeds the threshold check; both only matter for split
    /// subdivisions.
    pub fn resolve_territory(
        &self,
        subdivision: &str,
        sub_area_hint: Option<&str>,
        latitude: Option<f64>,
    ) -> Option<TerritoryMatch> {
        if let Some(rule) = self.partition_for(subdivision) {
            let decision = rule.decide(sub_area_hint, latitude);
            return Some(TerritoryMatch {
                territory: decision.territory.clone(),
                subdivision: subdivision.to_string(),
                partition: Some(decision),
            });
        }

        self.territories_for(subdivision)
            .first()
            .map(|t| TerritoryMatch {
                territory: t.name.clone(),
                subdivision: subdivision.to_string(),
                partition: None,
            })
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

// ============================================================================
// TESTS
// ============================================================================
