//! Geometry helpers for the attributed graph.
//!
//! Geometry attributes travel as well-known text (WKT) in the exchange
//! format; this module owns that codec. Reprojection and line splitting
//! are external collaborators behind the [`GeometryService`] trait.

use geo_types::{Geometry, LineString, Point};
use wkt::{ToWkt, TryFromWkt};

use crate::error::{Error, Result};

/// Parse a WKT string into a geometry value.
pub fn parse_wkt(text: &str) -> Result<Geometry<f64>> {
    Geometry::try_from_wkt_str(text).map_err(|e| Error::Wkt(e.to_string()))
}

/// Encode a geometry value as WKT.
pub fn wkt_string(geom: &Geometry<f64>) -> String {
    geom.wkt_string()
}

/// External geometry collaborator.
///
/// Implementations reproject between the working (projected) and geographic
/// reference systems of [`crate::config::GraphConfig`] and partition edge
/// geometries, e.g. when snapping a route origin onto an edge.
pub trait GeometryService {
    /// Reproject a geographic geometry into the working CRS.
    fn to_working(&self, geom: &Geometry<f64>) -> Result<Geometry<f64>>;

    /// Reproject a working-CRS geometry into the geographic CRS.
    fn to_geographic(&self, geom: &Geometry<f64>) -> Result<Geometry<f64>>;

    /// Split a line into two parts at the nearest intersecting point.
    ///
    /// Must fail once snap tolerances are exhausted and the line still
    /// cannot be partitioned (the point was not on the line) instead of
    /// returning the line unsplit.
    fn split_line_at_point(
        &self,
        line: &LineString<f64>,
        point: &Point<f64>,
    ) -> Result<(LineString<f64>, LineString<f64>)>;
}
