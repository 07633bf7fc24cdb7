// 📐 Coordinate Resolver - (lat, lng) → subdivision → territory
//
// Containment is by bounding box. When boxes overlap near a border the
// subdivision whose box centroid is nearest wins, and an exact distance tie
// keeps the candidate met first in catalog order. This is an approximation,
// not polygon containment.

use crate::catalog::{Catalog, TerritoryMatch};
use crate::error::{check_coordinate, RegionResult};
use log::debug;
use std::sync::Arc;

/// Which subdivision a point landed in, and how
#[derive(Debug, Clone, PartialEq)]
pub struct SubdivisionHit {
    pub subdivision: String,
    /// Every subdivision whose box contains the point, in catalog order
    pub candidates: Vec<String>,
}

impl SubdivisionHit {
    pub fn was_ambiguous(&self) -> bool {
        self.candidates.len() > 1
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateResolution {
    pub latitude: f64,
    pub longitude: f64,
    pub hit: SubdivisionHit,
    pub territory: TerritoryMatch,
    pub reasoning: Vec<String>,
}

pub struct CoordinateResolver {
    catalog: Arc<Catalog>,
}

impl CoordinateResolver {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        CoordinateResolver { catalog }
    }

    /// Pick the subdivision for a point. `Ok(None)` means no box contains it.
    pub fn locate(&self, latitude: f64, longitude: f64) -> RegionResult<Option<SubdivisionHit>> {
        check_coordinate(latitude, longitude)?;

        let matches: Vec<_> = self
            .catalog
            .subdivisions()
            .iter()
            .filter(|s| s.bounds.contains(latitude, longitude))
            .collect();

        let mut best: Option<(&str, f64)> = None;
        for sub in &matches {
            let distance = sub.bounds.centroid_distance(latitude, longitude);
            if best.map(|(_, d)| distance < d).unwrap_or(true) {
                best = Some((sub.name.as_str(), distance));
            }
        }

        Ok(best.map(|(name, _)| SubdivisionHit {
            subdivision: name.to_string(),
            candidates: matches.iter().map(|s| s.name.clone()).collect(),
        }))
    }

    /// Resolve a point to a territory.
    ///
    /// `sub_area_hint` is optional text (an address) searched for county or
    /// city names when the subdivision is split.
    pub fn resolve(
        &self,
        latitude: f64,
        longitude: f64,
        sub_area_hint: Option<&str>,
    ) -> RegionResult<Option<CoordinateResolution>> {
        let Some(hit) = self.locate(latitude, longitude)? else {
            debug!("({}, {}) is outside every bounding box", latitude, longitude);
            return Ok(None);
        };

        let Some(territory) =
            self.catalog
                .resolve_territory(&hit.subdivision, sub_area_hint, Some(latitude))
        else {
            return Ok(None);
        };

        let mut reasoning = Vec::new();
        if hit.was_ambiguous() {
            reasoning.push(format!(
                "({:.4}, {:.4}) inside boxes of {}; nearest centroid is {}",
                latitude,
                longitude,
                hit.candidates.join(", "),
                hit.subdivision
            ));
        } else {
            reasoning.push(format!(
                "({:.4}, {:.4}) inside {} bounding box",
                latitude, longitude, hit.subdivision
            ));
        }
        reasoning.push(territory.describe());

        debug!(
            "({}, {}) -> {} / {}",
            latitude, longitude, hit.subdivision, territory.territory
        );

        Ok(Some(CoordinateResolution {
            latitude,
            longitude,
            hit,
            territory,
            reasoning,
        }))
    }
}

// ============================================================================
// TESTS
// ============================================================================
