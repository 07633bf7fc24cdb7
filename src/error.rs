// ⚠️ Error Taxonomy
// Only malformed input is an error. "No match" is a normal outcome.

use thiserror::Error;

/// Errors raised by resolution, validation and catalog loading.
#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    /// Latitude/longitude non-finite or outside [-90,90] / [-180,180]
    #[error("invalid coordinate: ({latitude}, {longitude})")]
    InvalidCoordinate { latitude: f64, longitude: f64 },

    /// Malformed or non-unionable territory geometry
    #[error("geometry error: {0}")]
    Geometry(#[from] GeometryError),

    /// A custom catalog breaks one of the table invariants
    #[error("catalog error: {0}")]
    Catalog(String),
}

/// Why a dissolve call could not produce a single polygon.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum GeometryError {
    #[error("territory has no polygon parts")]
    Empty,

    #[error("part {part}: ring {ring} is not closed")]
    OpenRing { part: usize, ring: usize },

    #[error("part {part}: ring {ring} has {points} points, need at least 4")]
    TooFewPoints { part: usize, ring: usize, points: usize },

    #[error("part {part}: non-finite coordinate")]
    NonFiniteCoordinate { part: usize },

    #[error("part {part}: ring {ring} intersects itself")]
    SelfIntersection { part: usize, ring: usize },

    /// Union left more than one piece (parts do not share a border)
    #[error("union produced {pieces} disconnected pieces")]
    Disconnected { pieces: usize },
}

pub type RegionResult<T> = Result<T, RegionError>;

/// Check a lat/lng pair before any lookup.
pub fn check_coordinate(latitude: f64, longitude: f64) -> RegionResult<()> {
    let in_range = latitude.is_finite()
        && longitude.is_finite()
        && (-90.0..=90.0).contains(&latitude)
        && (-180.0..=180.0).contains(&longitude);

    if in_range {
        Ok(())
    } else {
        Err(RegionError::InvalidCoordinate { latitude, longitude })
    }
}
