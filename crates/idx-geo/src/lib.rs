//! EWKT parsing and HTM-style range algebra for geospatial fields.
//!
//! ```
//! use idx_geo::parse_ewkt;
//!
//! let shape = parse_ewkt("POINT(13.4 52.5)").unwrap();
//! let idx = shape.index(8, true, 0.3).unwrap();
//! assert_eq!(idx.centroids.len(), 1);
//! ```

#![warn(missing_docs)]

mod ast;
mod error;
mod lexer;
mod parser;
mod range;

pub use ast::{Coord, Geometry};
pub use error::{EwktError, EwktErrorKind, GeoSpatialError, LexError, ParseError};
pub use range::{CellRange, Centroid, ShapeIndex, fingerprint, index_geometry, range_intersection, range_union};

/// A parsed EWKT value: an optional SRID and its geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct Shape {
    /// Spatial reference identifier, if an `SRID=n;` prefix was present.
    pub srid: Option<u32>,
    /// The parsed geometry.
    pub geometry: Geometry,
}

impl Shape {
    /// Computes the HTM-style cell ranges and centroids for this shape at
    /// the given subdivision level.
    pub fn index(&self, level: u8, partials: bool, error: f64) -> Result<ShapeIndex, GeoSpatialError> {
        range::index_geometry(&self.geometry, level, partials, error)
    }
}

/// Parses an EWKT string into a [`Shape`].
pub fn parse_ewkt(input: &str) -> Result<Shape, EwktError> {
    let tokens = lexer::tokenize(input)?;
    let (srid, geometry) = parser::parse(&tokens)?;
    Ok(Shape { srid, geometry })
}

/// True if `input` is syntactically valid EWKT.
pub fn is_ewkt(input: &str) -> bool {
    parse_ewkt(input).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_indexes_a_shape() {
        let shape = parse_ewkt("POLYGON((0 0, 1 0, 1 1, 0 1))").unwrap();
        let idx = shape.index(8, true, 0.3).unwrap();
        assert!(!idx.ranges.is_empty());
    }

    #[test]
    fn rejects_malformed_ewkt() {
        assert!(!is_ewkt("POLYGON((0 0, 1 0)"));
    }

    #[test]
    fn empty_geometry_round_trips() {
        let shape = parse_ewkt("GEOMETRYCOLLECTION EMPTY").unwrap();
        assert!(shape.geometry.is_empty());
    }
}
