//! Polygon and bounding-box geometry.

use thiserror::Error;

/// Errors raised when a vertex list cannot form a polygon.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PolygonError {
    /// No vertices at all
    #[error("polygon has no vertices")]
    Empty,

    /// A vertex is NaN/infinite or outside the geographic range
    #[error("vertex {index} ({lon}, {lat}) is not a valid longitude/latitude")]
    InvalidVertex { index: usize, lon: f64, lat: f64 },
}

/// A single polygon vertex in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub lon: f64,
    pub lat: f64,
}

impl Vertex {
    pub fn new(lon: f64, lat: f64) -> Self {
        Self { lon, lat }
    }
}

/// An ordered ring of vertices; the closing edge is implied.
///
/// Immutable once constructed.
#[derive(Debug, Clone, PartialEq)]
pub struct Polygon {
    vertices: Vec<Vertex>,
}

impl Polygon {
    /// Builds a polygon from `(lon, lat)` vertices.
    ///
    /// A single vertex is accepted; it plans as a degenerate one-tile region.
    pub fn new(vertices: Vec<Vertex>) -> Result<Self, PolygonError> {
        if vertices.is_empty() {
            return Err(PolygonError::Empty);
        }
        for (index, v) in vertices.iter().enumerate() {
            let lon_ok = v.lon.is_finite() && (-180.0..=180.0).contains(&v.lon);
            let lat_ok = v.lat.is_finite() && (-90.0..=90.0).contains(&v.lat);
            if !lon_ok || !lat_ok {
                return Err(PolygonError::InvalidVertex {
                    index,
                    lon: v.lon,
                    lat: v.lat,
                });
            }
        }
        Ok(Self { vertices })
    }

    /// Convenience constructor from `(lon, lat)` tuples.
    pub fn from_lon_lat(points: &[(f64, f64)]) -> Result<Self, PolygonError> {
        Self::new(points.iter().map(|&(lon, lat)| Vertex::new(lon, lat)).collect())
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    /// Minimal axis-aligned box enclosing every vertex.
    pub fn bounding_box(&self) -> BoundingBox {
        let first = self.vertices[0];
        let mut bbox = BoundingBox {
            north: first.lat,
            south: first.lat,
            east: first.lon,
            west: first.lon,
        };
        for v in &self.vertices[1..] {
            bbox.north = bbox.north.max(v.lat);
            bbox.south = bbox.south.min(v.lat);
            bbox.east = bbox.east.max(v.lon);
            bbox.west = bbox.west.min(v.lon);
        }
        bbox
    }
}

/// Latitude/longitude rectangle in degrees.
///
/// Always normalized (`north >= south`, `east >= west`); a polygon crossing
/// the antimeridian yields the wide box spanning the other way round.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    /// North-west corner as `(lat, lon)`.
    pub fn top_left(&self) -> (f64, f64) {
        (self.north, self.west)
    }

    /// South-east corner as `(lat, lon)`.
    pub fn bottom_right(&self) -> (f64, f64) {
        (self.south, self.east)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounding_box_from_square() {
        let polygon = Polygon::from_lon_lat(&[
            (10.0, 50.0),
            (11.0, 50.0),
            (11.0, 51.0),
            (10.0, 51.0),
            (10.0, 50.0),
        ])
        .unwrap();

        let bbox = polygon.bounding_box();
        assert_eq!(bbox.north, 51.0);
        assert_eq!(bbox.south, 50.0);
        assert_eq!(bbox.east, 11.0);
        assert_eq!(bbox.west, 10.0);
        assert_eq!(bbox.top_left(), (51.0, 10.0));
        assert_eq!(bbox.bottom_right(), (50.0, 11.0));
    }

    #[test]
    fn test_vertex_order_does_not_matter() {
        let a = Polygon::from_lon_lat(&[(1.0, 2.0), (3.0, -4.0), (-5.0, 6.0)]).unwrap();
        let b = Polygon::from_lon_lat(&[(-5.0, 6.0), (1.0, 2.0), (3.0, -4.0)]).unwrap();
        assert_eq!(a.bounding_box(), b.bounding_box());
    }

    #[test]
    fn test_single_point_polygon() {
        let polygon = Polygon::from_lon_lat(&[(7.5, 45.25)]).unwrap();
        let bbox = polygon.bounding_box();
        assert_eq!(bbox.north, bbox.south);
        assert_eq!(bbox.east, bbox.west);
    }

    #[test]
    fn test_empty_polygon_rejected() {
        assert_eq!(Polygon::new(vec![]), Err(PolygonError::Empty));
    }

    #[test]
    fn test_invalid_vertex_rejected() {
        let err = Polygon::from_lon_lat(&[(0.0, 0.0), (200.0, 0.0)]).unwrap_err();
        assert!(matches!(err, PolygonError::InvalidVertex { index: 1, .. }));

        let err = Polygon::from_lon_lat(&[(0.0, f64::NAN)]).unwrap_err();
        assert!(matches!(err, PolygonError::InvalidVertex { index: 0, .. }));
    }
}
