// End-to-end scenarios across cascade, validator and dissolve

use region_engine::{
    AssignmentCascade, Catalog, ContaminationValidator, DissolveOutcome, FindingKind,
    HistoricalIndex, LocationRecord, Method, PolygonPart, RecommendedAction, RecordMetadata,
    TerritoryDissolver, TerritoryGeometry,
};
use std::sync::Arc;

fn catalog() -> Arc<Catalog> {
    Arc::new(Catalog::standard())
}

#[test]
fn test_san_francisco_coordinates() {
    let cascade = AssignmentCascade::new(catalog());
    let record = LocationRecord::new().with_coordinates(37.77, -122.42);

    let result = cascade.resolve(&record, None).unwrap();

    assert_eq!(result.territory.as_deref(), Some("Northern California"));
    assert_eq!(result.subdivision.as_deref(), Some("California"));
    assert_eq!(result.method, Some(Method::Coordinates));
    assert!(result.confidence >= 0.9);
}

#[test]
fn test_directional_prefix_does_not_mean_nebraska() {
    let cascade = AssignmentCascade::new(catalog());
    let record = LocationRecord::new().with_address("5224 NE 42nd Ave, Portland, OR 97218");

    let result = cascade.resolve(&record, None).unwrap();

    assert_eq!(result.subdivision.as_deref(), Some("Oregon"));
    assert_eq!(result.territory.as_deref(), Some("Pacific Northwest"));
    assert_eq!(result.method, Some(Method::Address));
}

#[test]
fn test_canadian_event_flagged_and_unassigned() {
    let cascade = AssignmentCascade::new(catalog());
    let record = LocationRecord::new()
        .with_address("123 Queen St W, Toronto, ON, CA")
        .with_country("Canada");
    let result = cascade.resolve(&record, None).unwrap();
    assert!(!result.is_assigned());

    // Toronto sits inside the New York bounding box
    let validator = ContaminationValidator::new(catalog());
    let metadata = RecordMetadata::default().with_country("Canada").with_city("Toronto");
    let finding = validator
        .validate("Pacific Northwest", 43.65, -79.38, &metadata)
        .unwrap();

    assert!(finding.has(FindingKind::LikelyInternational));
    assert!(finding.has(FindingKind::BoundaryViolation));
    assert_eq!(finding.action, RecommendedAction::Remove);
}

#[test]
fn test_latitude_threshold_boundaries() {
    let cascade = AssignmentCascade::new(catalog());
    let territory = |lat: f64, lng: f64| {
        let record = LocationRecord::new().with_coordinates(lat, lng);
        cascade.resolve(&record, None).unwrap().territory
    };

    // California splits at 35.79, inclusive on the northern side
    assert_eq!(territory(35.79, -121.0).as_deref(), Some("Northern California"));
    assert_eq!(territory(35.7899, -121.0).as_deref(), Some("Southern California"));

    // New York splits at 41.3
    assert_eq!(territory(41.3, -73.8).as_deref(), Some("Upstate New York"));
    assert_eq!(territory(41.2999, -73.8).as_deref(), Some("Metro New York"));
}

#[test]
fn test_resolution_is_idempotent() {
    let cascade = AssignmentCascade::new(catalog());
    let index = HistoricalIndex::build(vec![("Harvest Moon Jam", "Mid-South")]);
    let records = vec![
        LocationRecord::new().with_coordinates(34.05, -118.24),
        LocationRecord::new().with_address("Topeka, KS").with_name("Prairie Open"),
        LocationRecord::new().with_name("Harvest Moon Jam"),
        LocationRecord::new().with_name("Members Meeting"),
    ];

    let first = cascade.resolve_batch(&records, Some(&index));
    let second = cascade.resolve_batch(&records, Some(&index));
    assert_eq!(first, second);
    assert_eq!(
        first[2].as_ref().unwrap().method,
        Some(Method::Historical)
    );
}

#[test]
fn test_validator_on_correct_and_placeholder_records() {
    let validator = ContaminationValidator::new(catalog());
    let none = RecordMetadata::default();

    let ok = validator.validate("Heartland", 38.5, -98.0, &none).unwrap();
    assert!(ok.is_valid);
    assert!(ok.kinds.is_empty());

    let placeholder = validator.validate("Heartland", 39.8283, -98.5795, &none).unwrap();
    assert!(!placeholder.is_valid);
    assert_eq!(placeholder.kinds, vec![FindingKind::PlaceholderCoordinate]);
}

#[test]
fn test_validator_agrees_with_cascade() {
    let cascade = AssignmentCascade::new(catalog());
    let validator = ContaminationValidator::new(catalog());

    for (lat, lng) in [(47.6, -122.3), (33.75, -84.39), (42.36, -71.06), (39.74, -104.99)] {
        let record = LocationRecord::new().with_coordinates(lat, lng);
        let assigned = cascade.resolve(&record, None).unwrap();
        let territory = assigned.territory.unwrap();

        let finding = validator
            .validate(&territory, lat, lng, &RecordMetadata::default())
            .unwrap();
        assert!(finding.is_valid, "{} at ({}, {})", territory, lat, lng);
    }
}

#[test]
fn test_dissolve_bordering_members() {
    let square = |x: f64, y: f64| {
        PolygonPart::new(vec![(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0), (x, y)])
    };
    let dissolver = TerritoryDissolver::new();
    let mut geometry = TerritoryGeometry::new("Heartland", vec![square(0.0, 0.0), square(0.0, 1.0)]);

    match dissolver.dissolve(&geometry).unwrap() {
        DissolveOutcome::Dissolved {
            boundary_before,
            boundary_after,
            ..
        } => assert!(boundary_after < boundary_before),
        DissolveOutcome::NothingToDo => panic!("expected a merge"),
    }

    assert!(dissolver.dissolve_in_place(&mut geometry).unwrap());
    assert_eq!(geometry.parts.len(), 1);
    assert_eq!(dissolver.dissolve(&geometry).unwrap(), DissolveOutcome::NothingToDo);
}

#[test]
fn test_validator_agrees_with_cascade_on_split_subdivision() {
    let cascade = AssignmentCascade::new(catalog());
    let validator = ContaminationValidator::new(catalog());

    // Northern latitude, southern county named in the address
    let record = LocationRecord::new()
        .with_coordinates(37.0, -120.0)
        .with_address("Fairgrounds, Kern County");
    let assigned = cascade.resolve(&record, None).unwrap();
    assert_eq!(assigned.method, Some(Method::Coordinates));
    let territory = assigned.territory.unwrap();
    assert_eq!(territory, "Southern California");

    let stored = record.with_territory(&territory);
    let finding = validator.validate_record(&stored).unwrap().unwrap();
    assert!(finding.is_valid, "{}", finding.summary());
    assert_eq!(finding.action, RecommendedAction::Keep);
}
