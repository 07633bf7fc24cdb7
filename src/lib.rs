// Region Engine - Core Library
// Territory assignment, contamination audits and territory dissolve.
// Exposes all modules for use in the audit CLI, batch jobs, and tests

pub mod error;
pub mod catalog;      // Boundary table: subdivisions, territories, partitions
pub mod text;         // Subdivision extraction from free text
pub mod patterns;     // Event/organization name patterns
pub mod historical;   // Majority territory per identifier
pub mod record;       // Location records + CSV loading
pub mod coordinates;  // Bounding-box containment
pub mod cascade;      // Ordered fallback with confidence
pub mod validation;   // Contamination audit of stored assignments
pub mod dissolve;     // Polygon union per territory

// Re-export commonly used types
pub use error::{check_coordinate, GeometryError, RegionError, RegionResult};
pub use catalog::{
    BoundingBox, Catalog, PartitionBasis, PartitionDecision, PartitionRule,
    SubArea, Subdivision, Territory, TerritoryMatch,
};
pub use text::{MatchKind, TextMatch, TextResolver};
pub use patterns::{NamePattern, PatternMatch, PatternResolver, PatternTarget};
pub use historical::{HistoricalEntry, HistoricalIndex};
pub use record::{load_records_csv, LocationRecord, RecordMetadata};
pub use coordinates::{CoordinateResolution, CoordinateResolver, SubdivisionHit};
pub use cascade::{
    AssignmentCascade, AssignmentResult, ConfidenceBasis, ConfidenceTable,
    Method, Resolution, ResolveContext, Resolver,
};
pub use validation::{
    ContaminationValidator, FindingKind, PlaceholderCoordinate, RecommendedAction,
    ValidationFinding, ValidationSummary, ValidatorConfig,
};
pub use dissolve::{
    load_geometries_json, DissolveOutcome, DissolveReport, PolygonPart,
    TerritoryDissolver, TerritoryGeometry,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
