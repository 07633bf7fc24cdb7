// 🪜 Assignment Cascade - ordered resolver strategies
//
// coordinates → address text → name pattern → historical majority.
// The first strategy that produces a territory wins; later strategies are
// still consulted, but only to corroborate it (agreement bonus).
// No strategy matching is a normal outcome, not an error.

use crate::catalog::Catalog;
use crate::coordinates::CoordinateResolver;
use crate::error::RegionResult;
use crate::historical::HistoricalIndex;
use crate::patterns::PatternResolver;
use crate::record::LocationRecord;
use crate::text::TextResolver;
use anyhow::{Context as AnyhowContext, Result};
use log::debug;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::Arc;

// ============================================================================
// METHOD & CONFIDENCE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Method {
    Coordinates,
    Address,
    NamePattern,
    Historical,
}

impl Method {
    pub fn as_str(&self) -> &'static str {
        match self {
            Method::Coordinates => "coordinates",
            Method::Address => "address",
            Method::NamePattern => "name-pattern",
            Method::Historical => "historical",
        }
    }
}

/// What the confidence table is keyed on (finer than `Method`)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConfidenceBasis {
    Coordinates,
    NamePatternRegion,
    Historical,
    Address,
    NamePatternState,
    /// Only the externally supplied subdivision string matched
    Fallback,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfidenceTable {
    pub coordinates: f64,
    pub name_pattern_region: f64,
    pub historical: f64,
    pub address: f64,
    pub name_pattern_state: f64,
    pub fallback: f64,
    /// Added once per later strategy that agrees, capped at 1.0
    pub agreement_bonus: f64,
}

impl Default for ConfidenceTable {
    fn default() -> Self {
        ConfidenceTable {
            coordinates: 0.95,
            name_pattern_region: 0.85,
            historical: 0.80,
            address: 0.75,
            name_pattern_state: 0.70,
            fallback: 0.50,
            agreement_bonus: 0.05,
        }
    }
}

impl ConfidenceTable {
    /// Load overrides from JSON; missing keys keep their defaults
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read confidence file: {:?}", path.as_ref()))?;

        serde_json::from_str(&content).context("Failed to parse confidence JSON")
    }

    pub fn confidence_for(&self, basis: ConfidenceBasis) -> f64 {
        match basis {
            ConfidenceBasis::Coordinates => self.coordinates,
            ConfidenceBasis::NamePatternRegion => self.name_pattern_region,
            ConfidenceBasis::Historical => self.historical,
            ConfidenceBasis::Address => self.address,
            ConfidenceBasis::NamePatternState => self.name_pattern_state,
            ConfidenceBasis::Fallback => self.fallback,
        }
    }
}

// ============================================================================
// RESOLVER STRATEGIES
// ============================================================================

/// One strategy's answer
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub territory: String,
    pub subdivision: Option<String>,
    pub method: Method,
    pub basis: ConfidenceBasis,
    pub reasoning: Vec<String>,
}

/// Read-only inputs shared across a batch
#[derive(Debug, Clone, Copy, Default)]
pub struct ResolveContext<'a> {
    /// Must be fully built before the batch starts
    pub historical: Option<&'a HistoricalIndex>,
}

pub trait Resolver: Send + Sync {
    fn method(&self) -> Method;

    /// `Ok(None)` when this strategy has nothing to say about the record
    fn try_resolve(
        &self,
        record: &LocationRecord,
        ctx: &ResolveContext<'_>,
    ) -> RegionResult<Option<Resolution>>;
}

pub struct CoordinateStrategy {
    resolver: CoordinateResolver,
}

impl CoordinateStrategy {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        CoordinateStrategy {
            resolver: CoordinateResolver::new(catalog),
        }
    }
}

impl Resolver for CoordinateStrategy {
    fn method(&self) -> Method {
        Method::Coordinates
    }

    fn try_resolve(
        &self,
        record: &LocationRecord,
        _ctx: &ResolveContext<'_>,
    ) -> RegionResult<Option<Resolution>> {
        let Some((lat, lng)) = record.coordinates() else {
            return Ok(None);
        };

        let hint = record.sub_area_hint();
        let resolution = self.resolver.resolve(lat, lng, hint.as_deref())?;

        Ok(resolution.map(|r| Resolution {
            territory: r.territory.territory,
            subdivision: Some(r.hit.subdivision),
            method: Method::Coordinates,
            basis: ConfidenceBasis::Coordinates,
            reasoning: r.reasoning,
        }))
    }
}

pub struct AddressStrategy {
    text: TextResolver,
}

impl AddressStrategy {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        AddressStrategy {
            text: TextResolver::new(catalog),
        }
    }
}

impl Resolver for AddressStrategy {
    fn method(&self) -> Method {
        Method::Address
    }

    fn try_resolve(
        &self,
        record: &LocationRecord,
        _ctx: &ResolveContext<'_>,
    ) -> RegionResult<Option<Resolution>> {
        let catalog = self.text.catalog();
        let hint = record.sub_area_hint();
        // Latitude still splits a subdivision when the point fell outside every box
        let latitude = record
            .coordinates()
            .map(|(lat, _)| lat)
            .filter(|lat| lat.is_finite() && (-90.0..=90.0).contains(lat));

        if let Some(m) = record
            .address_text()
            .and_then(|address| self.text.extract_subdivision(address))
        {
            if let Some(t) = catalog.resolve_territory(&m.subdivision, hint.as_deref(), latitude) {
                return Ok(Some(Resolution {
                    reasoning: vec![
                        format!("Address names {} ('{}')", m.subdivision, m.matched),
                        t.describe(),
                    ],
                    territory: t.territory,
                    subdivision: Some(m.subdivision),
                    method: Method::Address,
                    basis: ConfidenceBasis::Address,
                }));
            }
        }

        // Fallback: the subdivision string the source supplied
        let supplied = record
            .supplied_subdivision()
            .and_then(|s| catalog.find_subdivision(s).map(|sub| (s, sub)));

        if let Some((raw, sub)) = supplied {
            if let Some(t) = catalog.resolve_territory(&sub.name, hint.as_deref(), latitude) {
                return Ok(Some(Resolution {
                    reasoning: vec![
                        format!("Supplied subdivision '{}' is {}", raw, sub.name),
                        t.describe(),
                    ],
                    territory: t.territory,
                    subdivision: Some(sub.name.clone()),
                    method: Method::Address,
                    basis: ConfidenceBasis::Fallback,
                }));
            }
        }

        Ok(None)
    }
}

pub struct NamePatternStrategy {
    patterns: PatternResolver,
}

impl NamePatternStrategy {
    pub fn new(patterns: PatternResolver) -> Self {
        NamePatternStrategy { patterns }
    }
}

impl Resolver for NamePatternStrategy {
    fn method(&self) -> Method {
        Method::NamePattern
    }

    fn try_resolve(
        &self,
        record: &LocationRecord,
        _ctx: &ResolveContext<'_>,
    ) -> RegionResult<Option<Resolution>> {
        let found = record.name_text().and_then(|name| self.patterns.resolve(name));

        Ok(found.map(|m| Resolution {
            territory: m.territory,
            subdivision: m.subdivision,
            method: Method::NamePattern,
            basis: if m.regional {
                ConfidenceBasis::NamePatternRegion
            } else {
                ConfidenceBasis::NamePatternState
            },
            reasoning: m.reasoning,
        }))
    }
}

pub struct HistoricalStrategy {
    catalog: Arc<Catalog>,
}

impl HistoricalStrategy {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        HistoricalStrategy { catalog }
    }
}

impl Resolver for HistoricalStrategy {
    fn method(&self) -> Method {
        Method::Historical
    }

    fn try_resolve(
        &self,
        record: &LocationRecord,
        ctx: &ResolveContext<'_>,
    ) -> RegionResult<Option<Resolution>> {
        let (Some(index), Some(name)) = (ctx.historical, record.name_text()) else {
            return Ok(None);
        };
        let Some(entry) = index.lookup(name) else {
            return Ok(None);
        };

        // Stale labels from an older catalog are ignored
        if !self.catalog.is_territory(&entry.territory) {
            debug!("historical territory '{}' not in catalog", entry.territory);
            return Ok(None);
        }

        Ok(Some(Resolution {
            territory: entry.territory.clone(),
            subdivision: None,
            method: Method::Historical,
            basis: ConfidenceBasis::Historical,
            reasoning: vec![format!(
                "'{}' was previously filed under {} ({} of {} records)",
                name, entry.territory, entry.votes, entry.total
            )],
        }))
    }
}

// ============================================================================
// ASSIGNMENT RESULT
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentResult {
    /// None when no strategy succeeded
    pub territory: Option<String>,
    pub subdivision: Option<String>,
    pub method: Option<Method>,
    pub confidence: f64,
    pub reasoning: Vec<String>,
}

impl AssignmentResult {
    pub fn unassigned(reasoning: Vec<String>) -> Self {
        AssignmentResult {
            territory: None,
            subdivision: None,
            method: None,
            confidence: 0.0,
            reasoning,
        }
    }

    pub fn is_assigned(&self) -> bool {
        self.territory.is_some()
    }

    pub fn summary(&self) -> String {
        match (&self.territory, self.method) {
            (Some(t), Some(m)) => format!("{} via {} ({:.0}%)", t, m.as_str(), self.confidence * 100.0),
            _ => "unassigned".to_string(),
        }
    }
}

// ============================================================================
// CASCADE
// ============================================================================

pub struct AssignmentCascade {
    resolvers: Vec<Box<dyn Resolver>>,
    confidence: ConfidenceTable,
}

impl AssignmentCascade {
    /// Standard order with the built-in pattern table
    pub fn new(catalog: Arc<Catalog>) -> Self {
        let patterns = PatternResolver::standard(catalog.clone());
        Self::with_patterns(catalog, patterns)
    }

    /// Standard order with a custom pattern table
    pub fn with_patterns(catalog: Arc<Catalog>, patterns: PatternResolver) -> Self {
        AssignmentCascade {
            resolvers: vec![
                Box::new(CoordinateStrategy::new(catalog.clone())),
                Box::new(AddressStrategy::new(catalog.clone())),
                Box::new(NamePatternStrategy::new(patterns)),
                Box::new(HistoricalStrategy::new(catalog)),
            ],
            confidence: ConfidenceTable::default(),
        }
    }

    /// Arbitrary strategy list, tried in the given order
    pub fn from_resolvers(resolvers: Vec<Box<dyn Resolver>>) -> Self {
        AssignmentCascade {
            resolvers,
            confidence: ConfidenceTable::default(),
        }
    }

    pub fn with_confidence(mut self, confidence: ConfidenceTable) -> Self {
        self.confidence = confidence;
        self
    }

    pub fn methods(&self) -> Vec<Method> {
        self.resolvers.iter().map(|r| r.method()).collect()
    }

    /// Resolve one record. Only an invalid coordinate is an error.
    pub fn resolve(
        &self,
        record: &LocationRecord,
        historical: Option<&HistoricalIndex>,
    ) -> RegionResult<AssignmentResult> {
        let ctx = ResolveContext { historical };
        let mut trail = Vec::new();

        for (i, resolver) in self.resolvers.iter().enumerate() {
            let Some(winner) = resolver.try_resolve(record, &ctx)? else {
                trail.push(format!("{}: no match", resolver.method().as_str()));
                continue;
            };

            trail.extend(winner.reasoning.iter().cloned());
            let mut confidence = self.confidence.confidence_for(winner.basis);

            for other in &self.resolvers[i + 1..] {
                if let Ok(Some(r)) = other.try_resolve(record, &ctx) {
                    if r.territory == winner.territory {
                        confidence += self.confidence.agreement_bonus;
                        trail.push(format!("Corroborated by {}", other.method().as_str()));
                    }
                }
            }

            let result = AssignmentResult {
                territory: Some(winner.territory),
                subdivision: winner.subdivision,
                method: Some(winner.method),
                confidence: confidence.min(1.0),
                reasoning: trail,
            };
            debug!("record {} -> {}", record.id, result.summary());
            return Ok(result);
        }

        trail.push("No resolution method succeeded".to_string());
        debug!("record {} unassigned", record.id);
        Ok(AssignmentResult::unassigned(trail))
    }

    /// Resolve many records; one bad record does not stop the rest
    #[cfg(not(feature = "threading"))]
    pub fn resolve_batch(
        &self,
        records: &[LocationRecord],
        historical: Option<&HistoricalIndex>,
    ) -> Vec<RegionResult<AssignmentResult>> {
        records.iter().map(|r| self.resolve(r, historical)).collect()
    }

    /// Resolve many records in parallel; one bad record does not stop the rest
    #[cfg(feature = "threading")]
    pub fn resolve_batch(
        &self,
        records: &[LocationRecord],
        historical: Option<&HistoricalIndex>,
    ) -> Vec<RegionResult<AssignmentResult>> {
        use rayon::prelude::*;
        records.par_iter().map(|r| self.resolve(r, historical)).collect()
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegionError;
    use approx::assert_relative_eq;

    fn cascade() -> AssignmentCascade {
        AssignmentCascade::new(Arc::new(Catalog::standard()))
    }

    #[test]
    fn test_fixed_order() {
        assert_eq!(
            cascade().methods(),
            vec![Method::Coordinates, Method::Address, Method::NamePattern, Method::Historical]
        );
    }

    #[test]
    fn test_confidence_table_ordering() {
        let t = ConfidenceTable::default();
        assert!(t.coordinates > t.name_pattern_region);
        assert!(t.name_pattern_region > t.historical);
        assert!(t.historical > t.address);
        assert!(t.address > t.name_pattern_state);
        assert!(t.name_pattern_state > t.fallback);
    }

    #[test]
    fn test_coordinates_win() {
        let record = LocationRecord::new().with_coordinates(38.5, -98.0);
        let result = cascade().resolve(&record, None).unwrap();
        assert_eq!(result.territory.as_deref(), Some("Heartland"));
        assert_eq!(result.method, Some(Method::Coordinates));
        assert_relative_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_agreement_bonus_and_cap() {
        let record = LocationRecord::new()
            .with_coordinates(38.5, -98.0)
            .with_address("Wichita, Kansas");
        let result = cascade().resolve(&record, None).unwrap();
        assert_relative_eq!(result.confidence, 1.0);
        assert!(result.reasoning.iter().any(|r| r == "Corroborated by address"));

        let generous = ConfidenceTable {
            agreement_bonus: 0.5,
            ..ConfidenceTable::default()
        };
        let capped = cascade().with_confidence(generous).resolve(&record, None).unwrap();
        assert_relative_eq!(capped.confidence, 1.0);
    }

    #[test]
    fn test_disagreeing_signal_gets_no_bonus() {
        let record = LocationRecord::new()
            .with_coordinates(38.5, -98.0)
            .with_address("Boise, Idaho");
        let result = cascade().resolve(&record, None).unwrap();
        assert_eq!(result.territory.as_deref(), Some("Heartland"));
        assert_relative_eq!(result.confidence, 0.95);
    }

    #[test]
    fn test_address_used_when_no_coordinates() {
        let record = LocationRecord::new().with_address("Lincoln, NE 68508");
        let result = cascade().resolve(&record, None).unwrap();
        assert_eq!(result.territory.as_deref(), Some("Heartland"));
        assert_eq!(result.subdivision.as_deref(), Some("Nebraska"));
        assert_eq!(result.method, Some(Method::Address));
        assert_relative_eq!(result.confidence, 0.75);
        assert_eq!(result.reasoning[0], "coordinates: no match");
    }

    #[test]
    fn test_supplied_subdivision_fallback() {
        let record = LocationRecord::new().with_address("Main Hall").with_subdivision("tx");
        let result = cascade().resolve(&record, None).unwrap();
        assert_eq!(result.territory.as_deref(), Some("South Central"));
        assert_eq!(result.method, Some(Method::Address));
        assert_relative_eq!(result.confidence, 0.50);
    }

    #[test]
    fn test_name_pattern_region_and_state() {
        let region = LocationRecord::new().with_name("SoCal Winter Open");
        let r = cascade().resolve(&region, None).unwrap();
        assert_eq!(r.territory.as_deref(), Some("Southern California"));
        assert_eq!(r.method, Some(Method::NamePattern));
        assert_relative_eq!(r.confidence, 0.85);

        let state = LocationRecord::new().with_name("Buckeye Classic");
        let s = cascade().resolve(&state, None).unwrap();
        assert_eq!(s.territory.as_deref(), Some("Great Lakes"));
        assert_relative_eq!(s.confidence, 0.70);
    }

    #[test]
    fn test_historical_last_resort() {
        let index = HistoricalIndex::build(vec![
            ("Harvest Moon Jam", "Mid-South"),
            ("Harvest Moon Jam", "Mid-South"),
        ]);
        let record = LocationRecord::new().with_name("Harvest Moon Jam");

        let without = cascade().resolve(&record, None).unwrap();
        assert!(!without.is_assigned());

        let with = cascade().resolve(&record, Some(&index)).unwrap();
        assert_eq!(with.territory.as_deref(), Some("Mid-South"));
        assert_eq!(with.method, Some(Method::Historical));
        assert_relative_eq!(with.confidence, 0.80);
    }

    #[test]
    fn test_historical_corroborates_address() {
        let index = HistoricalIndex::build(vec![("Prairie Open", "Heartland")]);
        let record = LocationRecord::new()
            .with_address("Topeka, KS")
            .with_name("Prairie Open");
        let result = cascade().resolve(&record, Some(&index)).unwrap();
        assert_eq!(result.method, Some(Method::Address));
        assert_relative_eq!(result.confidence, 0.80);
    }

    #[test]
    fn test_stale_historical_territory_ignored() {
        let index = HistoricalIndex::build(vec![("Old Meet", "Region 9")]);
        let record = LocationRecord::new().with_name("Old Meet");
        assert!(!cascade().resolve(&record, Some(&index)).unwrap().is_assigned());
    }

    #[test]
    fn test_unassigned_result() {
        let record = LocationRecord::new().with_name("Members Meeting");
        let result = cascade().resolve(&record, None).unwrap();
        assert_eq!(result.territory, None);
        assert_eq!(result.method, None);
        assert_eq!(result.confidence, 0.0);
        assert_eq!(result.reasoning.last().unwrap(), "No resolution method succeeded");
        assert_eq!(result.summary(), "unassigned");
    }

    #[test]
    fn test_invalid_coordinate_fails_call() {
        let record = LocationRecord::new()
            .with_coordinates(120.0, -98.0)
            .with_address("Wichita, Kansas");
        let err = cascade().resolve(&record, None).unwrap_err();
        assert!(matches!(err, RegionError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_resolve_is_idempotent() {
        let record = LocationRecord::new()
            .with_coordinates(37.77, -122.42)
            .with_name("Bay Area Bash");
        let c = cascade();
        let a = c.resolve(&record, None).unwrap();
        let b = c.resolve(&record, None).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_batch_keeps_going_after_error() {
        let records = vec![
            LocationRecord::new().with_coordinates(f64::NAN, 0.0),
            LocationRecord::new().with_address("Omaha, NE"),
        ];
        let results = cascade().resolve_batch(&records, None);
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert_eq!(
            results[1].as_ref().unwrap().territory.as_deref(),
            Some("Heartland")
        );
    }

    #[test]
    fn test_confidence_json_partial_override() {
        let table: ConfidenceTable = serde_json::from_str(r#"{"historical": 0.6}"#).unwrap();
        assert_relative_eq!(table.historical, 0.6);
        assert_relative_eq!(table.coordinates, 0.95);
    }
}
