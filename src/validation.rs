// ✅ Contamination Validator - audit stored territory assignments
//
// Re-derives the territory from raw coordinates and compares it with what
// was stored. Two more checks always run, whatever the comparison says:
//   - placeholder coordinates (geocoder "no match" defaults)
//   - signs that the record is not a domestic one at all
// Disagreement is the output here, never an error.

use crate::catalog::Catalog;
use crate::coordinates::{CoordinateResolution, CoordinateResolver};
use crate::error::{check_coordinate, RegionResult};
use crate::record::{LocationRecord, RecordMetadata};
use crate::text::find_phrase;
use chrono::{DateTime, Utc};
use log::warn;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

// ============================================================================
// CONFIGURATION
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaceholderCoordinate {
    pub label: String,
    pub latitude: f64,
    pub longitude: f64,
}

impl PlaceholderCoordinate {
    pub fn new(label: &str, latitude: f64, longitude: f64) -> Self {
        PlaceholderCoordinate {
            label: label.to_string(),
            latitude,
            longitude,
        }
    }

    pub fn matches(&self, latitude: f64, longitude: f64, tolerance: f64) -> bool {
        (self.latitude - latitude).abs() <= tolerance && (self.longitude - longitude).abs() <= tolerance
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatorConfig {
    pub placeholders: Vec<PlaceholderCoordinate>,

    /// Degrees, applied to latitude and longitude separately
    pub placeholder_tolerance: f64,

    /// Lowercase phrases that mark an event as international
    pub international_keywords: Vec<String>,

    /// Lowercase spellings of the home country
    pub domestic_countries: Vec<String>,
}

impl Default for ValidatorConfig {
    fn default() -> Self {
        ValidatorConfig {
            placeholders: vec![
                PlaceholderCoordinate::new("null island", 0.0, 0.0),
                PlaceholderCoordinate::new("geographic center of the US", 39.8283, -98.5795),
                PlaceholderCoordinate::new("contiguous US centroid", 39.5, -98.35),
                PlaceholderCoordinate::new("IP geolocation US default", 37.751, -97.822),
            ],
            placeholder_tolerance: 0.01,
            international_keywords: [
                "world cup",
                "world championship",
                "world championships",
                "pan american",
                "european",
                "canada",
                "canadian",
                "mexico city",
                "toronto",
                "montreal",
                "calgary",
                "ottawa",
                "quebec",
                "british columbia",
                "japan",
                "australia",
                "united kingdom",
                "germany",
                "france",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            domestic_countries: [
                "us",
                "usa",
                "u.s.",
                "u.s.a.",
                "united states",
                "united states of america",
                "america",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

impl ValidatorConfig {
    pub fn with_placeholder(mut self, placeholder: PlaceholderCoordinate) -> Self {
        self.placeholders.push(placeholder);
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.placeholder_tolerance = tolerance;
        self
    }

    pub fn with_keyword(mut self, keyword: &str) -> Self {
        self.international_keywords.push(keyword.to_lowercase());
        self
    }
}

// ============================================================================
// FINDING
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FindingKind {
    BoundaryViolation,
    PlaceholderCoordinate,
    LikelyInternational,
    MissingSignal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RecommendedAction {
    Keep,
    /// Replace the stored territory with the recomputed one
    Correct { territory: String },
    /// International record: drop the domestic assignment
    Remove,
    /// Coordinates cannot be trusted or are missing
    Review,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidationFinding {
    pub is_valid: bool,
    pub stored_territory: String,
    pub recomputed_territory: Option<String>,
    pub recomputed_subdivision: Option<String>,
    pub kinds: Vec<FindingKind>,
    pub action: RecommendedAction,
    pub notes: Vec<String>,
    pub checked_at: DateTime<Utc>,
}

impl ValidationFinding {
    pub fn has(&self, kind: FindingKind) -> bool {
        self.kinds.contains(&kind)
    }

    pub fn corrected_territory(&self) -> Option<&str> {
        match &self.action {
            RecommendedAction::Correct { territory } => Some(territory),
            _ => None,
        }
    }

    pub fn summary(&self) -> String {
        if self.is_valid {
            return format!("valid: {}", self.stored_territory);
        }
        let kinds: Vec<String> = self.kinds.iter().map(|k| format!("{:?}", k)).collect();
        format!(
            "stored {}, recomputed {}: {} -> {:?}",
            self.stored_territory,
            self.recomputed_territory.as_deref().unwrap_or("none"),
            kinds.join(", "),
            self.action
        )
    }
}

// ============================================================================
// VALIDATOR
// ============================================================================

pub struct ContaminationValidator {
    resolver: CoordinateResolver,
    config: ValidatorConfig,
}

impl ContaminationValidator {
    pub fn new(catalog: Arc<Catalog>) -> Self {
        Self::with_config(catalog, ValidatorConfig::default())
    }

    pub fn with_config(catalog: Arc<Catalog>, config: ValidatorConfig) -> Self {
        ContaminationValidator {
            resolver: CoordinateResolver::new(catalog),
            config,
        }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    /// Audit one stored assignment against its coordinates. A sub-area in
    /// `metadata` splits shared subdivisions the same way the cascade does.
    pub fn validate(
        &self,
        stored_territory: &str,
        latitude: f64,
        longitude: f64,
        metadata: &RecordMetadata,
    ) -> RegionResult<ValidationFinding> {
        check_coordinate(latitude, longitude)?;
        let resolution = self
            .resolver
            .resolve(latitude, longitude, metadata.sub_area.as_deref())?;
        Ok(self.build_finding(stored_territory, Some((latitude, longitude)), resolution, metadata))
    }

    /// Audit a record carrying a stored territory. `Ok(None)` when there is
    /// no stored territory to audit; missing coordinates are a finding.
    pub fn validate_record(&self, record: &LocationRecord) -> RegionResult<Option<ValidationFinding>> {
        let Some(stored) = record.stored_territory() else {
            return Ok(None);
        };

        let metadata = record.metadata();
        match record.coordinates() {
            Some((lat, lng)) => self.validate(stored, lat, lng, &metadata).map(Some),
            None => Ok(Some(self.build_finding(stored, None, None, &metadata))),
        }
    }

    /// Audit many records; per-record errors stay with their record
    pub fn validate_batch(
        &self,
        records: &[LocationRecord],
    ) -> Vec<(String, RegionResult<Option<ValidationFinding>>)> {
        records
            .iter()
            .map(|r| (r.id.clone(), self.validate_record(r)))
            .collect()
    }

    /// Counts over a batch audit
    pub fn batch_summary(
        &self,
        results: &[(String, RegionResult<Option<ValidationFinding>>)],
    ) -> ValidationSummary {
        let mut summary = ValidationSummary::default();

        for (_, result) in results {
            summary.total += 1;
            match result {
                Err(_) => summary.errors += 1,
                Ok(None) => summary.skipped += 1,
                Ok(Some(finding)) => {
                    if finding.is_valid {
                        summary.valid += 1;
                    }
                    if finding.has(FindingKind::BoundaryViolation) {
                        summary.boundary_violations += 1;
                    }
                    if finding.has(FindingKind::PlaceholderCoordinate) {
                        summary.placeholders += 1;
                    }
                    if finding.has(FindingKind::LikelyInternational) {
                        summary.international += 1;
                    }
                    if finding.has(FindingKind::MissingSignal) {
                        summary.missing_signal += 1;
                    }
                    if finding.corrected_territory().is_some() {
                        summary.correctable += 1;
                    }
                }
            }
        }

        summary
    }

    // ========================================================================
    // CHECKS
    // ========================================================================

    fn build_finding(
        &self,
        stored: &str,
        coordinates: Option<(f64, f64)>,
        resolution: Option<CoordinateResolution>,
        metadata: &RecordMetadata,
    ) -> ValidationFinding {
        let stored = stored.trim();
        let mut kinds = Vec::new();
        let mut notes = Vec::new();

        let (recomputed_territory, recomputed_subdivision) = match resolution {
            Some(r) => {
                notes.extend(r.reasoning);
                (Some(r.territory.territory), Some(r.hit.subdivision))
            }
            None => (None, None),
        };

        match &recomputed_territory {
            None => {
                kinds.push(FindingKind::MissingSignal);
                notes.push(match coordinates {
                    Some((lat, lng)) => format!("({}, {}) is outside every known subdivision", lat, lng),
                    None => "No coordinates to check against".to_string(),
                });
            }
            Some(t) if !t.eq_ignore_ascii_case(stored) => {
                kinds.push(FindingKind::BoundaryViolation);
                notes.push(format!("Stored {} but coordinates say {}", stored, t));
            }
            Some(_) => {}
        }

        if let Some(label) = coordinates.and_then(|(lat, lng)| self.placeholder_label(lat, lng)) {
            kinds.push(FindingKind::PlaceholderCoordinate);
            notes.push(format!("Coordinates match placeholder '{}'", label));
        }

        if let Some(reason) = self.international_reason(metadata) {
            kinds.push(FindingKind::LikelyInternational);
            notes.push(reason);
        }

        let action = if kinds.contains(&FindingKind::LikelyInternational) {
            RecommendedAction::Remove
        } else if kinds.contains(&FindingKind::PlaceholderCoordinate)
            || kinds.contains(&FindingKind::MissingSignal)
        {
            RecommendedAction::Review
        } else if kinds.contains(&FindingKind::BoundaryViolation) {
            RecommendedAction::Correct {
                territory: recomputed_territory.clone().unwrap_or_default(),
            }
        } else {
            RecommendedAction::Keep
        };

        let is_valid = kinds.is_empty();
        if !is_valid {
            warn!("stored territory '{}' flagged: {:?} -> {:?}", stored, kinds, action);
        }

        ValidationFinding {
            is_valid,
            stored_territory: stored.to_string(),
            recomputed_territory,
            recomputed_subdivision,
            kinds,
            action,
            notes,
            checked_at: Utc::now(),
        }
    }

    pub fn placeholder_label(&self, latitude: f64, longitude: f64) -> Option<&str> {
        self.config
            .placeholders
            .iter()
            .find(|p| p.matches(latitude, longitude, self.config.placeholder_tolerance))
            .map(|p| p.label.as_str())
    }

    /// Why this record looks international, if it does
    pub fn international_reason(&self, metadata: &RecordMetadata) -> Option<String> {
        if let Some(country) = metadata.country.as_deref().map(str::trim) {
            let lower = country.to_lowercase();
            if !lower.is_empty() && !self.config.domestic_countries.contains(&lower) {
                return Some(format!("Country '{}' is not domestic", country));
            }
        }

        let fields = [("name", &metadata.name), ("city", &metadata.city)];
        for (field, value) in fields {
            let Some(text) = value.as_deref() else {
                continue;
            };
            if let Some(keyword) = self
                .config
                .international_keywords
                .iter()
                .find(|k| find_phrase(text, k).is_some())
            {
                return Some(format!("{} contains international keyword '{}'", field, keyword));
            }
        }

        None
    }
}

// ============================================================================
// BATCH SUMMARY
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationSummary {
    pub total: usize,
    pub valid: usize,
    pub boundary_violations: usize,
    pub placeholders: usize,
    pub international: usize,
    pub missing_signal: usize,
    pub correctable: usize,
    /// Records with no stored territory
    pub skipped: usize,
    /// Records whose coordinates were invalid
    pub errors: usize,
}

impl ValidationSummary {
    pub fn summary(&self) -> String {
        format!(
            "{} records: {} valid, {} boundary violations ({} correctable), {} placeholders, {} international, {} missing signal, {} skipped, {} errors",
            self.total,
            self.valid,
            self.boundary_violations,
            self.correctable,
            self.placeholders,
            self.international,
            self.missing_signal,
            self.skipped,
            self.errors
        )
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RegionError;

    fn validator() -> ContaminationValidator {
        ContaminationValidator::new(Arc::new(Catalog::standard()))
    }

    fn no_metadata() -> RecordMetadata {
        RecordMetadata::default()
    }

    #[test]
    fn test_correct_assignment_is_valid() {
        let f = validator()
            .validate("Northern California", 37.77, -122.42, &no_metadata())
            .unwrap();
        assert!(f.is_valid);
        assert!(f.kinds.is_empty());
        assert_eq!(f.action, RecommendedAction::Keep);
        assert_eq!(f.recomputed_subdivision.as_deref(), Some("California"));
    }

    #[test]
    fn test_boundary_violation_carries_both_territories() {
        let f = validator()
            .validate("Southern California", 37.77, -122.42, &no_metadata())
            .unwrap();
        assert!(!f.is_valid);
        assert_eq!(f.kinds, vec![FindingKind::BoundaryViolation]);
        assert_eq!(f.stored_territory, "Southern California");
        assert_eq!(f.recomputed_territory.as_deref(), Some("Northern California"));
        assert_eq!(f.corrected_territory(), Some("Northern California"));
    }

    #[test]
    fn test_stored_territory_compared_case_insensitively() {
        let f = validator().validate(" heartland ", 38.5, -98.0, &no_metadata()).unwrap();
        assert!(f.is_valid);
    }

    #[test]
    fn test_sub_area_splits_shared_subdivision() {
        // Northern latitude, southern county
        let kern = no_metadata().with_sub_area("Fairgrounds, Kern County");
        let f = validator().validate("Southern California", 37.0, -120.0, &kern).unwrap();
        assert!(f.is_valid);

        let f = validator().validate("Northern California", 37.0, -120.0, &kern).unwrap();
        assert_eq!(f.corrected_territory(), Some("Southern California"));
    }

    #[test]
    fn test_placeholder_flagged_even_when_territory_agrees() {
        let f = validator()
            .validate("Heartland", 39.8283, -98.5795, &no_metadata())
            .unwrap();
        assert_eq!(f.kinds, vec![FindingKind::PlaceholderCoordinate]);
        assert_eq!(f.action, RecommendedAction::Review);
    }

    #[test]
    fn test_placeholder_within_tolerance_and_disagreeing() {
        let f = validator()
            .validate("Southeast", 39.835, -98.575, &no_metadata())
            .unwrap();
        assert!(f.has(FindingKind::PlaceholderCoordinate));
        assert!(f.has(FindingKind::BoundaryViolation));
        // Placeholder coordinates are not trusted for auto-correction
        assert_eq!(f.corrected_territory(), None);
    }

    #[test]
    fn test_null_island_is_placeholder_and_missing_signal() {
        let f = validator().validate("Heartland", 0.0, 0.0, &no_metadata()).unwrap();
        assert!(f.has(FindingKind::MissingSignal));
        assert!(f.has(FindingKind::PlaceholderCoordinate));
        assert_eq!(f.recomputed_territory, None);
    }

    #[test]
    fn test_outside_boxes_is_missing_signal_not_error() {
        let f = validator().validate("Southeast", 30.0, -45.0, &no_metadata()).unwrap();
        assert_eq!(f.kinds, vec![FindingKind::MissingSignal]);
        assert_eq!(f.action, RecommendedAction::Review);
    }

    #[test]
    fn test_country_flags_international() {
        let metadata = no_metadata().with_country("Canada");
        let f = validator().validate("Pacific Northwest", 47.6, -122.3, &metadata).unwrap();
        assert_eq!(f.kinds, vec![FindingKind::LikelyInternational]);
        assert_eq!(f.action, RecommendedAction::Remove);
    }

    #[test]
    fn test_domestic_country_spellings_pass() {
        for country in ["USA", "United States", "us", ""] {
            let metadata = no_metadata().with_country(country);
            assert!(validator().international_reason(&metadata).is_none(), "{}", country);
        }
    }

    #[test]
    fn test_keyword_flags_international() {
        let metadata = no_metadata().with_name("Bouldering World Cup Salt Lake");
        let reason = validator().international_reason(&metadata).unwrap();
        assert!(reason.contains("world cup"));

        let city = no_metadata().with_city("Toronto");
        assert!(validator().international_reason(&city).is_some());
    }

    #[test]
    fn test_invalid_coordinate_is_error() {
        let err = validator().validate("Heartland", 38.5, 200.0, &no_metadata()).unwrap_err();
        assert!(matches!(err, RegionError::InvalidCoordinate { .. }));
    }

    #[test]
    fn test_custom_placeholder() {
        let config = ValidatorConfig::default()
            .with_placeholder(PlaceholderCoordinate::new("county seat default", 44.0, -120.5))
            .with_tolerance(0.001);
        let v = ContaminationValidator::with_config(Arc::new(Catalog::standard()), config);
        assert_eq!(v.placeholder_label(44.0005, -120.5), Some("county seat default"));
        assert_eq!(v.placeholder_label(44.01, -120.5), None);
    }

    #[test]
    fn test_batch_summary() {
        let records = vec![
            LocationRecord::new()
                .with_coordinates(37.77, -122.42)
                .with_territory("Northern California"),
            LocationRecord::new()
                .with_coordinates(37.77, -122.42)
                .with_territory("Southern California"),
            LocationRecord::new().with_territory("Heartland"),
            LocationRecord::new().with_coordinates(38.5, -98.0),
            LocationRecord::new()
                .with_coordinates(f64::NAN, -98.0)
                .with_territory("Heartland"),
        ];

        let v = validator();
        let results = v.validate_batch(&records);
        let summary = v.batch_summary(&results);

        assert_eq!(summary.total, 5);
        assert_eq!(summary.valid, 1);
        assert_eq!(summary.boundary_violations, 1);
        assert_eq!(summary.correctable, 1);
        assert_eq!(summary.missing_signal, 1);
        assert_eq!(summary.skipped, 1);
        assert_eq!(summary.errors, 1);
        assert!(!summary.summary().is_empty());
    }
}
