// 🗺️ Subdivision Entity - first-level political region
// One axis-aligned bounding box per subdivision, plus the names text can use for it.
//
// Boxes overlap along shared borders. The coordinate resolver breaks
// those ties by nearest box centroid, never by polygon containment.

use serde::{Deserialize, Serialize};

// ============================================================================
// BOUNDING BOX
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    pub const fn new(min_lat: f64, max_lat: f64, min_lng: f64, max_lng: f64) -> Self {
        BoundingBox {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    /// Inclusive containment on all four edges
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.min_lat && lat <= self.max_lat && lng >= self.min_lng && lng <= self.max_lng
    }

    /// (lat, lng) of the box center
    pub fn centroid(&self) -> (f64, f64) {
        (
            (self.min_lat + self.max_lat) / 2.0,
            (self.min_lng + self.max_lng) / 2.0,
        )
    }

    /// Planar distance in degrees from a point to the box centroid
    pub fn centroid_distance(&self, lat: f64, lng: f64) -> f64 {
        let (c_lat, c_lng) = self.centroid();
        ((lat - c_lat).powi(2) + (lng - c_lng).powi(2)).sqrt()
    }

    pub fn is_well_formed(&self) -> bool {
        self.min_lat <= self.max_lat && self.min_lng <= self.max_lng
    }
}

// ============================================================================
// SUBDIVISION ENTITY
// ============================================================================

/// A US state (or DC). Static: built once with the catalog, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subdivision {
    /// Canonical name, e.g. "Oregon"
    pub name: String,

    /// Postal abbreviations, e.g. ["OR"]
    pub abbreviations: Vec<String>,

    /// Longer alternate full names, e.g. "Washington, D.C."
    #[serde(default)]
    pub aliases: Vec<String>,

    pub bounds: BoundingBox,
}

impl Subdivision {
    pub fn new(name: &str, abbreviation: &str, bounds: BoundingBox) -> Self {
        Subdivision {
            name: name.to_string(),
            abbreviations: vec![abbreviation.to_string()],
            aliases: Vec::new(),
            bounds,
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        if !self.aliases.iter().any(|a| a == alias) && alias != self.name {
            self.aliases.push(alias.to_string());
        }
        self
    }

    /// Canonical name followed by aliases
    pub fn full_names(&self) -> impl Iterator<Item = &str> {
        std::iter::once(self.name.as_str()).chain(self.aliases.iter().map(String::as_str))
    }

    /// Case-insensitive match on canonical name, alias or abbreviation
    pub fn matches(&self, value: &str) -> bool {
        let value = value.trim();
        self.full_names().any(|n| n.eq_ignore_ascii_case(value))
            || self
                .abbreviations
                .iter()
                .any(|a| a.eq_ignore_ascii_case(value))
    }
}

// ============================================================================
// STANDARD TABLE
// ============================================================================

/// (name, abbreviation, min_lat, max_lat, min_lng, max_lng)
const STATE_BOUNDS: &[(&str, &str, f64, f64, f64, f64)] = &[
    ("Alabama", "AL", 30.14, 35.01, -88.47, -84.89),
    ("Alaska", "AK", 51.21, 71.39, -179.15, -129.98),
    ("Arizona", "AZ", 31.33, 37.00, -114.82, -109.05),
    ("Arkansas", "AR", 33.00, 36.50, -94.62, -89.64),
    ("California", "CA", 32.53, 42.01, -124.41, -114.13),
    ("Colorado", "CO", 36.99, 41.00, -109.06, -102.04),
    ("Connecticut", "CT", 40.98, 42.05, -73.73, -71.79),
    ("Delaware", "DE", 38.45, 39.84, -75.79, -75.05),
    ("District of Columbia", "DC", 38.79, 38.99, -77.12, -76.91),
    ("Florida", "FL", 24.52, 31.00, -87.63, -80.03),
    ("Georgia", "GA", 30.36, 35.00, -85.61, -80.84),
    ("Hawaii", "HI", 18.91, 22.24, -160.25, -154.81),
    ("Idaho", "ID", 41.99, 49.00, -117.24, -111.04),
    ("Illinois", "IL", 36.97, 42.51, -91.51, -87.02),
    ("Indiana", "IN", 37.77, 41.76, -88.10, -84.78),
    ("Iowa", "IA", 40.38, 43.50, -96.64, -90.14),
    ("Kansas", "KS", 36.99, 40.00, -102.05, -94.59),
    ("Kentucky", "KY", 36.50, 39.15, -89.57, -81.96),
    ("Louisiana", "LA", 28.93, 33.02, -94.04, -88.82),
    ("Maine", "ME", 43.06, 47.46, -71.08, -66.95),
    ("Maryland", "MD", 37.91, 39.72, -79.49, -75.05),
    ("Massachusetts", "MA", 41.24, 42.89, -73.51, -69.93),
    ("Michigan", "MI", 41.70, 48.31, -90.42, -82.41),
    ("Minnesota", "MN", 43.50, 49.38, -97.24, -89.49),
    ("Mississippi", "MS", 30.17, 35.00, -91.66, -88.10),
    ("Missouri", "MO", 35.99, 40.61, -95.77, -89.10),
    ("Montana", "MT", 44.36, 49.00, -116.05, -104.04),
    ("Nebraska", "NE", 40.00, 43.00, -104.05, -95.31),
    ("Nevada", "NV", 35.00, 42.00, -120.01, -114.04),
    ("New Hampshire", "NH", 42.70, 45.31, -72.56, -70.61),
    ("New Jersey", "NJ", 38.93, 41.36, -75.56, -73.89),
    ("New Mexico", "NM", 31.33, 37.00, -109.05, -103.00),
    ("New York", "NY", 40.50, 45.02, -79.76, -71.86),
    ("North Carolina", "NC", 33.84, 36.59, -84.32, -75.46),
    ("North Dakota", "ND", 45.94, 49.00, -104.05, -96.55),
    ("Ohio", "OH", 38.40, 41.98, -84.82, -80.52),
    ("Oklahoma", "OK", 33.62, 37.00, -103.00, -94.43),
    ("Oregon", "OR", 41.99, 46.29, -124.57, -116.46),
    ("Pennsylvania", "PA", 39.72, 42.27, -80.52, -74.69),
    ("Rhode Island", "RI", 41.15, 42.02, -71.86, -71.12),
    ("South Carolina", "SC", 32.03, 35.22, -83.35, -78.54),
    ("South Dakota", "SD", 42.48, 45.95, -104.06, -96.44),
    ("Tennessee", "TN", 34.98, 36.68, -90.31, -81.65),
    ("Texas", "TX", 25.84, 36.50, -106.65, -93.51),
    ("Utah", "UT", 37.00, 42.00, -114.05, -109.04),
    ("Vermont", "VT", 42.73, 45.02, -73.44, -71.46),
    ("Virginia", "VA", 36.54, 39.47, -83.68, -75.24),
    ("Washington", "WA", 45.54, 49.00, -124.85, -116.92),
    ("West Virginia", "WV", 37.20, 40.64, -82.64, -77.72),
    ("Wisconsin", "WI", 42.49, 47.31, -92.89, -86.25),
    ("Wyoming", "WY", 40.99, 45.01, -111.06, -104.05),
];

/// The 50 states plus DC, in alphabetical order.
pub fn standard_subdivisions() -> Vec<Subdivision> {
    STATE_BOUNDS
        .iter()
        .map(|&(name, abbr, min_lat, max_lat, min_lng, max_lng)| {
            let sub = Subdivision::new(name, abbr, BoundingBox::new(min_lat, max_lat, min_lng, max_lng));
            if abbr == "DC" {
                sub.with_alias("Washington, D.C.")
                    .with_alias("Washington D.C.")
                    .with_alias("Washington, DC")
                    .with_alias("Washington DC")
            } else {
                sub
            }
        })
        .collect()
}

// ============================================================================
// TESTS
// ============================================================================
