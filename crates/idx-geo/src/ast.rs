//! EWKT geometry abstract syntax tree.

use std::fmt;

/// A single coordinate: longitude, latitude, and an optional height.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coord {
    /// Longitude in degrees.
    pub lon: f64,
    /// Latitude in degrees.
    pub lat: f64,
    /// Optional height in meters.
    pub height: Option<f64>,
}

impl Coord {
    /// Creates a coordinate with no height.
    pub fn flat(lon: f64, lat: f64) -> Self {
        Self { lon, lat, height: None }
    }
}

/// A parsed EWKT geometry.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// `POINT`
    Point(Coord),
    /// `MULTIPOINT`
    MultiPoint(Vec<Coord>),
    /// `CIRCLE`: center and radius in meters.
    Circle(Coord, f64),
    /// `MULTICIRCLE`
    MultiCircle(Vec<(Coord, f64)>),
    /// `CONVEX`: a ring of points forming a convex hull constraint.
    Convex(Vec<Coord>),
    /// `MULTICONVEX`
    MultiConvex(Vec<Vec<Coord>>),
    /// `POLYGON`: one outer ring followed by zero or more hole rings.
    Polygon(Vec<Vec<Coord>>),
    /// `MULTIPOLYGON`
    MultiPolygon(Vec<Vec<Vec<Coord>>>),
    /// `CHULL`: points whose convex hull defines the shape.
    Chull(Vec<Coord>),
    /// `MULTICHULL`
    MultiChull(Vec<Vec<Coord>>),
    /// `GEOMETRYCOLLECTION`: union of the member shapes.
    Collection(Vec<Self>),
    /// `GEOMETRYINTERSECTION`: intersection of the member shapes.
    Intersection(Vec<Self>),
    /// Any tag followed by the literal `EMPTY`.
    Empty,
}

impl Geometry {
    /// The uppercase EWKT tag name for this geometry's variant.
    pub fn tag(&self) -> &'static str {
        match self {
            Self::Point(_) => "POINT",
            Self::MultiPoint(_) => "MULTIPOINT",
            Self::Circle(..) => "CIRCLE",
            Self::MultiCircle(_) => "MULTICIRCLE",
            Self::Convex(_) => "CONVEX",
            Self::MultiConvex(_) => "MULTICONVEX",
            Self::Polygon(_) => "POLYGON",
            Self::MultiPolygon(_) => "MULTIPOLYGON",
            Self::Chull(_) => "CHULL",
            Self::MultiChull(_) => "MULTICHULL",
            Self::Collection(_) => "GEOMETRYCOLLECTION",
            Self::Intersection(_) => "GEOMETRYINTERSECTION",
            Self::Empty => "EMPTY",
        }
    }

    /// True if this geometry carries no coordinates.
    pub fn is_empty(&self) -> bool {
        matches!(self, Self::Empty)
    }
}

impl fmt::Display for Geometry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matches_variant() {
        assert_eq!(Geometry::Point(Coord::flat(1.0, 2.0)).tag(), "POINT");
        assert_eq!(Geometry::Empty.tag(), "EMPTY");
        assert!(Geometry::Empty.is_empty());
    }
}
