// 🧩 Territory Dissolve - merge a territory's member polygons into one outline
//
// Coordinates are (x, y) = (longitude, latitude). Each part is checked
// before the union; the first malformed ring fails the whole territory.
// Parts that do not touch cannot become one polygon, so that is an error too.
// Built-in territories with an offshore member (Alaska, Hawaii) always land
// there when given real member outlines.
// Holes in the merged outline are dropped.

use crate::error::GeometryError;
use anyhow::{Context, Result};
use geo::algorithm::line_intersection::line_intersection;
use geo::{BooleanOps, Line, LineString, MultiPolygon, Polygon};
use log::{debug, info, warn};
use serde::{Deserialize, Serialize};
use std::path::Path;

#[cfg(feature = "threading")]
use rayon::prelude::*;

pub type Ring = Vec<(f64, f64)>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolygonPart {
    /// Closed ring, first point repeated at the end
    pub exterior: Ring,

    #[serde(default)]
    pub holes: Vec<Ring>,
}

impl PolygonPart {
    pub fn new(exterior: Ring) -> Self {
        PolygonPart {
            exterior,
            holes: Vec::new(),
        }
    }

    pub fn with_hole(mut self, hole: Ring) -> Self {
        self.holes.push(hole);
        self
    }

    /// Exterior first, then holes
    fn rings(&self) -> impl Iterator<Item = &Ring> {
        std::iter::once(&self.exterior).chain(self.holes.iter())
    }

    /// Total length of every ring, in coordinate units
    pub fn boundary_length(&self) -> f64 {
        self.rings().map(|r| ring_length(r)).sum()
    }

    fn to_polygon(&self) -> Polygon<f64> {
        Polygon::new(
            LineString::from(self.exterior.clone()),
            self.holes.iter().map(|h| LineString::from(h.clone())).collect(),
        )
    }
}

/// A territory's outline as a set of polygon parts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerritoryGeometry {
    pub territory: String,
    pub parts: Vec<PolygonPart>,
}

impl TerritoryGeometry {
    pub fn new(territory: &str, parts: Vec<PolygonPart>) -> Self {
        TerritoryGeometry {
            territory: territory.to_string(),
            parts,
        }
    }

    pub fn boundary_length(&self) -> f64 {
        self.parts.iter().map(PolygonPart::boundary_length).sum()
    }
}

/// Load territory geometries from a JSON array
pub fn load_geometries_json(path: &Path) -> Result<Vec<TerritoryGeometry>> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read geometry file: {:?}", path))?;
    serde_json::from_str(&content).with_context(|| format!("Failed to parse geometry JSON: {:?}", path))
}

fn ring_length(ring: &[(f64, f64)]) -> f64 {
    ring.windows(2)
        .map(|w| (w[1].0 - w[0].0).hypot(w[1].1 - w[0].1))
        .sum()
}

// ============================================================================
// RING CHECKS
// ============================================================================

fn check_ring(ring: &[(f64, f64)], part: usize, index: usize) -> Result<(), GeometryError> {
    if ring.iter().any(|(x, y)| !x.is_finite() || !y.is_finite()) {
        return Err(GeometryError::NonFiniteCoordinate { part });
    }
    if ring.len() >= 2 && ring.first() != ring.last() {
        return Err(GeometryError::OpenRing { part, ring: index });
    }

    // Repeated vertices are common in exported outlines; they add no edge
    let mut vertices = ring.to_vec();
    vertices.dedup();

    if vertices.len() < 4 {
        return Err(GeometryError::TooFewPoints {
            part,
            ring: index,
            points: vertices.len(),
        });
    }
    if self_intersects(&vertices) {
        return Err(GeometryError::SelfIntersection { part, ring: index });
    }
    Ok(())
}

/// Any two non-adjacent edges touching means the ring crosses itself.
/// Edges are swept in order of their left x, so only edges whose x ranges
/// overlap get the exact intersection test.
fn self_intersects(ring: &[(f64, f64)]) -> bool {
    let edges: Vec<Line<f64>> = ring.windows(2).map(|w| Line::new(w[0], w[1])).collect();
    let n = edges.len();

    let span = |e: &Line<f64>| (e.start.x.min(e.end.x), e.start.x.max(e.end.x));
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| span(&edges[a]).0.total_cmp(&span(&edges[b]).0));

    for (k, &i) in order.iter().enumerate() {
        let (_, right) = span(&edges[i]);
        for &j in &order[k + 1..] {
            if span(&edges[j]).0 > right {
                break;
            }
            let (lo, hi) = if i < j { (i, j) } else { (j, i) };
            // Neighbours share a vertex, and so do the first and last edges
            if hi == lo + 1 || (lo == 0 && hi == n - 1) {
                continue;
            }
            if line_intersection(edges[i], edges[j]).is_some() {
                return true;
            }
        }
    }
    false
}

fn check_part(part: &PolygonPart, index: usize) -> Result<(), GeometryError> {
    for (ring_index, ring) in part.rings().enumerate() {
        check_ring(ring, index, ring_index)?;
    }
    Ok(())
}

// ============================================================================
// DISSOLVE
// ============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum DissolveOutcome {
    /// Several parts merged into one polygon
    Dissolved {
        polygon: PolygonPart,
        parts_merged: usize,
        boundary_before: f64,
        boundary_after: f64,
    },
    /// Already a single valid polygon
    NothingToDo,
}

#[derive(Debug, Clone, Default)]
pub struct DissolveReport {
    pub dissolved: Vec<String>,
    pub unchanged: Vec<String>,
    pub failures: Vec<(String, GeometryError)>,
}

impl DissolveReport {
    pub fn summary(&self) -> String {
        format!(
            "{} dissolved, {} unchanged, {} failed",
            self.dissolved.len(),
            self.unchanged.len(),
            self.failures.len()
        )
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TerritoryDissolver;

impl TerritoryDissolver {
    pub fn new() -> Self {
        TerritoryDissolver
    }

    /// Union every part of one territory into a single polygon
    pub fn dissolve(&self, geometry: &TerritoryGeometry) -> Result<DissolveOutcome, GeometryError> {
        if geometry.parts.is_empty() {
            return Err(GeometryError::Empty);
        }
        for (index, part) in geometry.parts.iter().enumerate() {
            check_part(part, index)?;
        }
        if geometry.parts.len() == 1 {
            return Ok(DissolveOutcome::NothingToDo);
        }

        let mut polygons = geometry.parts.iter().map(PolygonPart::to_polygon);
        let mut merged = MultiPolygon::new(polygons.next().into_iter().collect());
        for polygon in polygons {
            merged = merged.union(&MultiPolygon::new(vec![polygon]));
        }

        let pieces = merged.0.len();
        let Some(outline) = merged.0.into_iter().next().filter(|_| pieces == 1) else {
            return Err(GeometryError::Disconnected { pieces });
        };

        let polygon = PolygonPart::new(outline.exterior().coords().map(|c| (c.x, c.y)).collect());
        let boundary_before = geometry.boundary_length();
        let boundary_after = polygon.boundary_length();

        debug!(
            "{}: merged {} parts, boundary {:.4} -> {:.4}",
            geometry.territory,
            geometry.parts.len(),
            boundary_before,
            boundary_after
        );

        Ok(DissolveOutcome::Dissolved {
            polygon,
            parts_merged: geometry.parts.len(),
            boundary_before,
            boundary_after,
        })
    }

    /// Dissolve one territory and write the result back on success
    pub fn dissolve_in_place(&self, geometry: &mut TerritoryGeometry) -> Result<bool, GeometryError> {
        match self.dissolve(geometry)? {
            DissolveOutcome::Dissolved { polygon, .. } => {
                geometry.parts = vec![polygon];
                Ok(true)
            }
            DissolveOutcome::NothingToDo => Ok(false),
        }
    }

    /// Dissolve every territory. A failure is reported for its territory and
    /// leaves that geometry untouched; the others still go ahead.
    pub fn dissolve_all(&self, geometries: &mut [TerritoryGeometry]) -> DissolveReport {
        #[cfg(feature = "threading")]
        let outcomes: Vec<(String, Result<bool, GeometryError>)> = geometries
            .par_iter_mut()
            .map(|g| (g.territory.clone(), self.dissolve_in_place(g)))
            .collect();

        #[cfg(not(feature = "threading"))]
        let outcomes: Vec<(String, Result<bool, GeometryError>)> = geometries
            .iter_mut()
            .map(|g| (g.territory.clone(), self.dissolve_in_place(g)))
            .collect();

        let mut report = DissolveReport::default();
        for (territory, outcome) in outcomes {
            match outcome {
                Ok(true) => report.dissolved.push(territory),
                Ok(false) => report.unchanged.push(territory),
                Err(e) => {
                    warn!("dissolve failed for {}: {}", territory, e);
                    report.failures.push((territory, e));
                }
            }
        }

        info!("dissolve: {}", report.summary());
        report
    }
}

// ============================================================================
// TESTS
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn square(x: f64, y: f64) -> PolygonPart {
        PolygonPart::new(vec![(x, y), (x + 1.0, y), (x + 1.0, y + 1.0), (x, y + 1.0), (x, y)])
    }

    #[test]
    fn test_bordering_squares_merge() {
        let geometry = TerritoryGeometry::new("Heartland", vec![square(0.0, 0.0), square(1.0, 0.0)]);
        let outcome = TerritoryDissolver::new().dissolve(&geometry).unwrap();

        match outcome {
            DissolveOutcome::Dissolved {
                polygon,
                parts_merged,
                boundary_before,
                boundary_after,
            } => {
                assert_eq!(parts_merged, 2);
                assert!(polygon.holes.is_empty());
                assert_relative_eq!(boundary_before, 8.0);
                assert_relative_eq!(boundary_after, 6.0, epsilon = 1e-9);
                assert!(boundary_after < boundary_before);
            }
            DissolveOutcome::NothingToDo => panic!("expected a merge"),
        }
    }

    #[test]
    fn test_single_part_is_nothing_to_do() {
        let geometry = TerritoryGeometry::new("Heartland", vec![square(0.0, 0.0)]);
        assert_eq!(
            TerritoryDissolver::new().dissolve(&geometry).unwrap(),
            DissolveOutcome::NothingToDo
        );
    }

    #[test]
    fn test_dissolve_is_idempotent() {
        let dissolver = TerritoryDissolver::new();
        let mut geometry = TerritoryGeometry::new(
            "Great Lakes",
            vec![square(0.0, 0.0), square(1.0, 0.0), square(0.0, 1.0)],
        );

        assert!(dissolver.dissolve_in_place(&mut geometry).unwrap());
        assert_eq!(geometry.parts.len(), 1);
        let once = geometry.clone();

        assert!(!dissolver.dissolve_in_place(&mut geometry).unwrap());
        assert_eq!(geometry, once);
    }

    #[test]
    fn test_disjoint_parts_fail() {
        let geometry = TerritoryGeometry::new("Southeast", vec![square(0.0, 0.0), square(5.0, 5.0)]);
        assert_eq!(
            TerritoryDissolver::new().dissolve(&geometry).unwrap_err(),
            GeometryError::Disconnected { pieces: 2 }
        );
    }

    #[test]
    fn test_offshore_member_reports_disconnected() {
        // Contiguous mainland members plus a detached one
        let geometry = TerritoryGeometry::new(
            "Pacific Northwest",
            vec![square(0.0, 0.0), square(0.0, 1.0), square(1.0, 0.0), square(-20.0, 15.0)],
        );
        let mut all = vec![geometry];
        let report = TerritoryDissolver::new().dissolve_all(&mut all);

        assert_eq!(
            report.failures,
            vec![("Pacific Northwest".to_string(), GeometryError::Disconnected { pieces: 2 })]
        );
        assert_eq!(all[0].parts.len(), 4);
    }

    #[test]
    fn test_empty_territory_fails() {
        let geometry = TerritoryGeometry::new("Nowhere", Vec::new());
        assert_eq!(
            TerritoryDissolver::new().dissolve(&geometry).unwrap_err(),
            GeometryError::Empty
        );
    }

    #[test]
    fn test_open_ring_fails() {
        let open = PolygonPart::new(vec![(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)]);
        let geometry = TerritoryGeometry::new("Heartland", vec![square(1.0, 0.0), open]);
        assert_eq!(
            TerritoryDissolver::new().dissolve(&geometry).unwrap_err(),
            GeometryError::OpenRing { part: 1, ring: 0 }
        );
    }

    #[test]
    fn test_too_few_points_fails() {
        let line = PolygonPart::new(vec![(0.0, 0.0), (1.0, 0.0), (0.0, 0.0)]);
        let geometry = TerritoryGeometry::new("Heartland", vec![line]);
        assert!(matches!(
            TerritoryDissolver::new().dissolve(&geometry),
            Err(GeometryError::TooFewPoints { points: 3, .. })
        ));
    }

    #[test]
    fn test_self_intersecting_ring_fails() {
        let bowtie = PolygonPart::new(vec![(0.0, 0.0), (1.0, 1.0), (1.0, 0.0), (0.0, 1.0), (0.0, 0.0)]);
        let geometry = TerritoryGeometry::new("Heartland", vec![bowtie, square(1.0, 0.0)]);
        assert_eq!(
            TerritoryDissolver::new().dissolve(&geometry).unwrap_err(),
            GeometryError::SelfIntersection { part: 0, ring: 0 }
        );
    }

    #[test]
    fn test_repeated_vertex_is_not_self_intersection() {
        let ring = vec![(0.0, 0.0), (1.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0), (0.0, 0.0)];
        let geometry = TerritoryGeometry::new("Heartland", vec![PolygonPart::new(ring), square(1.0, 0.0)]);
        assert!(TerritoryDissolver::new().dissolve(&geometry).is_ok());
    }

    #[test]
    fn test_repeated_vertices_do_not_count_toward_minimum() {
        let ring = vec![(0.0, 0.0), (0.0, 0.0), (1.0, 0.0), (0.0, 0.0)];
        let geometry = TerritoryGeometry::new("Heartland", vec![PolygonPart::new(ring)]);
        assert!(matches!(
            TerritoryDissolver::new().dissolve(&geometry),
            Err(GeometryError::TooFewPoints { points: 3, .. })
        ));
    }

    #[test]
    fn test_detailed_outline_is_accepted() {
        let steps = 2000;
        let mut ring: Ring = (0..steps)
            .map(|k| {
                let angle = k as f64 * std::f64::consts::TAU / steps as f64;
                (angle.cos() * 10.0, angle.sin() * 10.0)
            })
            .collect();
        ring.push(ring[0]);

        assert!(!self_intersects(&ring));
        let geometry = TerritoryGeometry::new("Mid-South", vec![PolygonPart::new(ring)]);
        assert_eq!(
            TerritoryDissolver::new().dissolve(&geometry).unwrap(),
            DissolveOutcome::NothingToDo
        );
    }

    #[test]
    fn test_crossing_found_between_distant_edges() {
        // The ring touches itself at (3, 2), between edges far apart in ring order
        let ring = vec![
            (0.0, 0.0),
            (2.0, 0.0),
            (2.0, 1.0),
            (4.0, 3.0),
            (4.0, 4.0),
            (3.0, 4.0),
            (3.0, 2.0),
            (0.0, 2.0),
            (0.0, 0.0),
        ];
        assert!(self_intersects(&ring));
    }

    #[test]
    fn test_non_finite_coordinate_fails() {
        let bad = PolygonPart::new(vec![(0.0, 0.0), (f64::NAN, 0.0), (1.0, 1.0), (0.0, 0.0)]);
        let geometry = TerritoryGeometry::new("Heartland", vec![bad]);
        assert_eq!(
            TerritoryDissolver::new().dissolve(&geometry).unwrap_err(),
            GeometryError::NonFiniteCoordinate { part: 0 }
        );
    }

    #[test]
    fn test_dissolve_all_isolates_failures() {
        let mut geometries = vec![
            TerritoryGeometry::new("Heartland", vec![square(0.0, 0.0), square(1.0, 0.0)]),
            TerritoryGeometry::new("Southeast", vec![square(0.0, 0.0), square(5.0, 5.0)]),
            TerritoryGeometry::new("New England", vec![square(3.0, 3.0)]),
        ];
        let before_failed = geometries[1].clone();

        let report = TerritoryDissolver::new().dissolve_all(&mut geometries);

        assert_eq!(report.dissolved, vec!["Heartland".to_string()]);
        assert_eq!(report.unchanged, vec!["New England".to_string()]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "Southeast");
        assert_eq!(geometries[0].parts.len(), 1);
        assert_eq!(geometries[1], before_failed);
    }

    #[test]
    fn test_geometry_json_roundtrip() {
        let path = std::env::temp_dir().join(format!("geometry-{}.json", uuid::Uuid::new_v4()));
        let geometries = vec![TerritoryGeometry::new(
            "Heartland",
            vec![square(0.0, 0.0).with_hole(vec![(0.2, 0.2), (0.4, 0.2), (0.4, 0.4), (0.2, 0.2)])],
        )];
        std::fs::write(&path, serde_json::to_string(&geometries).unwrap()).unwrap();

        let loaded = load_geometries_json(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded, geometries);
    }
}
