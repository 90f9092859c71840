//! HTM-style cell range generation and range-set algebra.
//!
//! Cell ids are produced by interleaving a longitude/latitude grid index
//! at a chosen subdivision level into a single Morton (Z-order) code, the
//! same family of technique the reference implementation's HTM trixels
//! belong to: a hierarchical, level-indexed tessellation of the sphere
//! where ancestor/descendant relationships are cheap bit operations. A
//! half-open interval `[start, end)` of cell ids names a contiguous run
//! of cells at a level.

use crate::{
    ast::{Coord, Geometry},
    error::GeoSpatialError,
};

/// A half-open interval of HTM-style cell ids: `[start, end)`.
pub type CellRange = (u64, u64);

/// A unit vector on the sphere, used as a shape centroid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Centroid {
    /// x component.
    pub x: f64,
    /// y component.
    pub y: f64,
    /// z component.
    pub z: f64,
}

/// The result of indexing a geometry: its cell ranges and centroids.
#[derive(Debug, Clone, PartialEq)]
pub struct ShapeIndex {
    /// Sorted, non-overlapping cell ranges covering the shape.
    pub ranges: Vec<CellRange>,
    /// One centroid per disjoint component of the shape.
    pub centroids: Vec<Centroid>,
}

const MAX_LEVEL: u8 = 15;

/// Merges two sorted, non-overlapping range sequences into a single
/// sorted, non-overlapping, canonical sequence (adjacent/overlapping
/// ranges are coalesced). Order of the two inputs does not affect the
/// result.
pub fn range_union(a: &[CellRange], b: &[CellRange]) -> Vec<CellRange> {
    let mut all: Vec<CellRange> = a.iter().chain(b.iter()).copied().collect();
    all.sort_unstable();

    let mut merged: Vec<CellRange> = Vec::with_capacity(all.len());
    for (start, end) in all {
        if let Some(last) = merged.last_mut() {
            if start <= last.1 {
                last.1 = last.1.max(end);
                continue;
            }
        }
        merged.push((start, end));
    }
    merged
}

/// Intersects two sorted, non-overlapping range sequences.
pub fn range_intersection(a: &[CellRange], b: &[CellRange]) -> Vec<CellRange> {
    let mut result = Vec::new();
    let (mut i, mut j) = (0, 0);
    while i < a.len() && j < b.len() {
        let (a_start, a_end) = a[i];
        let (b_start, b_end) = b[j];
        let start = a_start.max(b_start);
        let end = a_end.min(b_end);
        if start < end {
            result.push((start, end));
        }
        if a_end < b_end {
            i += 1;
        } else {
            j += 1;
        }
    }
    result
}

/// A deterministic, order-insensitive fingerprint of a range set, used as
/// the sortable value for a geo field (§4.2).
pub fn fingerprint(ranges: &[CellRange]) -> u64 {
    ranges
        .iter()
        .fold(0u64, |acc, (start, end)| acc.wrapping_add(start.wrapping_mul(31).wrapping_add(*end)))
}

fn quantize(value: f64, min: f64, max: f64, bits: u32) -> u64 {
    let span = max - min;
    let clamped = value.clamp(min, max - f64::EPSILON.max(0.0));
    let scale = ((1u64 << bits) - 1) as f64;
    (((clamped - min) / span) * scale) as u64
}

fn morton_interleave(x: u64, y: u64, bits: u32) -> u64 {
    let mut code = 0u64;
    for i in 0..bits {
        code |= ((x >> i) & 1) << (2 * i);
        code |= ((y >> i) & 1) << (2 * i + 1);
    }
    code
}

/// The cell id containing a single coordinate at the given HTM level.
pub fn cell_id(coord: Coord, level: u8) -> Result<u64, GeoSpatialError> {
    if level > MAX_LEVEL {
        return Err(GeoSpatialError::InvalidHtmLevel(level));
    }
    let bits = u32::from(level) + 1;
    let ix = quantize(coord.lon, -180.0, 180.0, bits);
    let iy = quantize(coord.lat, -90.0, 90.0, bits);
    Ok(morton_interleave(ix, iy, bits))
}

fn bbox_cells(
    min_lon: f64,
    max_lon: f64,
    min_lat: f64,
    max_lat: f64,
    level: u8,
) -> Result<Vec<u64>, GeoSpatialError> {
    if level > MAX_LEVEL {
        return Err(GeoSpatialError::InvalidHtmLevel(level));
    }
    let bits = u32::from(level) + 1;
    let lon_step = 360.0 / ((1u64 << bits) as f64);
    let lat_step = 180.0 / ((1u64 << bits) as f64);

    let mut cells = Vec::new();
    let mut lon = min_lon;
    while lon <= max_lon {
        let mut lat = min_lat;
        while lat <= max_lat {
            cells.push(cell_id(Coord::flat(lon, lat), level)?);
            lat += lat_step;
        }
        lon += lon_step;
    }
    // Guard degenerate single-point bboxes (lon/lat step larger than span).
    if cells.is_empty() {
        cells.push(cell_id(Coord::flat(min_lon, min_lat), level)?);
    }
    cells.sort_unstable();
    cells.dedup();
    Ok(cells)
}

fn cells_to_ranges(mut cells: Vec<u64>) -> Vec<CellRange> {
    cells.sort_unstable();
    cells.dedup();
    let mut ranges = Vec::new();
    for cell in cells {
        if let Some(last) = ranges.last_mut() {
            let (_, end): &mut (u64, u64) = last;
            if *end == cell {
                *end = cell + 1;
                continue;
            }
        }
        ranges.push((cell, cell + 1));
    }
    ranges
}

fn ring_bbox(ring: &[Coord]) -> Result<(f64, f64, f64, f64), GeoSpatialError> {
    if ring.len() < 3 {
        return Err(GeoSpatialError::DegenerateRing(ring.len()));
    }
    let min_lon = ring.iter().map(|c| c.lon).fold(f64::INFINITY, f64::min);
    let max_lon = ring.iter().map(|c| c.lon).fold(f64::NEG_INFINITY, f64::max);
    let min_lat = ring.iter().map(|c| c.lat).fold(f64::INFINITY, f64::min);
    let max_lat = ring.iter().map(|c| c.lat).fold(f64::NEG_INFINITY, f64::max);
    Ok((min_lon, max_lon, min_lat, max_lat))
}

fn ring_centroid(ring: &[Coord]) -> Centroid {
    let n = ring.len() as f64;
    let lon = ring.iter().map(|c| c.lon).sum::<f64>() / n;
    let lat = ring.iter().map(|c| c.lat).sum::<f64>() / n;
    to_unit_vector(lon, lat)
}

fn to_unit_vector(lon_deg: f64, lat_deg: f64) -> Centroid {
    let lon = lon_deg.to_radians();
    let lat = lat_deg.to_radians();
    Centroid { x: lat.cos() * lon.cos(), y: lat.cos() * lon.sin(), z: lat.sin() }
}

/// Meters-per-degree at the equator, used for the coarse circle→bbox
/// approximation below.
const METERS_PER_DEGREE: f64 = 111_320.0;

/// Computes cell ranges and centroids for a parsed geometry.
///
/// `partials` controls whether boundary cells are included (kept `true`
/// for this bbox-based approximation: a tighter polygon-exact
/// tessellation is out of scope, see `DESIGN.md`); `error` is accepted
/// for interface compatibility with the reference tolerance knob but
/// does not currently affect the bbox-based approximation.
pub fn index_geometry(
    geometry: &Geometry,
    level: u8,
    _partials: bool,
    _error: f64,
) -> Result<ShapeIndex, GeoSpatialError> {
    match geometry {
        Geometry::Empty => Ok(ShapeIndex { ranges: vec![], centroids: vec![] }),
        Geometry::Point(coord) => {
            let cell = cell_id(*coord, level)?;
            Ok(ShapeIndex { ranges: vec![(cell, cell + 1)], centroids: vec![to_unit_vector(coord.lon, coord.lat)] })
        }
        Geometry::MultiPoint(coords) => {
            let cells = coords.iter().map(|c| cell_id(*c, level)).collect::<Result<Vec<_>, _>>()?;
            let centroids = coords.iter().map(|c| to_unit_vector(c.lon, c.lat)).collect();
            Ok(ShapeIndex { ranges: cells_to_ranges(cells), centroids })
        }
        Geometry::Circle(center, radius_m) => {
            if *radius_m <= 0.0 {
                return Err(GeoSpatialError::InvalidRadius(*radius_m));
            }
            let delta = radius_m / METERS_PER_DEGREE;
            let cells = bbox_cells(
                center.lon - delta,
                center.lon + delta,
                center.lat - delta,
                center.lat + delta,
                level,
            )?;
            Ok(ShapeIndex { ranges: cells_to_ranges(cells), centroids: vec![to_unit_vector(center.lon, center.lat)] })
        }
        Geometry::MultiCircle(circles) => {
            let mut ranges = Vec::new();
            let mut centroids = Vec::new();
            for (center, radius) in circles {
                let sub = index_geometry(&Geometry::Circle(*center, *radius), level, _partials, _error)?;
                ranges = range_union(&ranges, &sub.ranges);
                centroids.extend(sub.centroids);
            }
            Ok(ShapeIndex { ranges, centroids })
        }
        Geometry::Convex(ring) | Geometry::Chull(ring) => {
            let (min_lon, max_lon, min_lat, max_lat) = ring_bbox(ring)?;
            let cells = bbox_cells(min_lon, max_lon, min_lat, max_lat, level)?;
            Ok(ShapeIndex { ranges: cells_to_ranges(cells), centroids: vec![ring_centroid(ring)] })
        }
        Geometry::MultiConvex(rings) | Geometry::MultiChull(rings) => {
            let mut ranges = Vec::new();
            let mut centroids = Vec::new();
            for ring in rings {
                let (min_lon, max_lon, min_lat, max_lat) = ring_bbox(ring)?;
                let cells = bbox_cells(min_lon, max_lon, min_lat, max_lat, level)?;
                ranges = range_union(&ranges, &cells_to_ranges(cells));
                centroids.push(ring_centroid(ring));
            }
            Ok(ShapeIndex { ranges, centroids })
        }
        Geometry::Polygon(rings) => {
            // Only the outer ring contributes to the bbox; holes narrow
            // the exact area but not the coarse bbox approximation.
            let outer = rings.first().ok_or(GeoSpatialError::DegenerateRing(0))?;
            let (min_lon, max_lon, min_lat, max_lat) = ring_bbox(outer)?;
            let cells = bbox_cells(min_lon, max_lon, min_lat, max_lat, level)?;
            Ok(ShapeIndex { ranges: cells_to_ranges(cells), centroids: vec![ring_centroid(outer)] })
        }
        Geometry::MultiPolygon(polygons) => {
            let mut ranges = Vec::new();
            let mut centroids = Vec::new();
            for rings in polygons {
                let sub = index_geometry(&Geometry::Polygon(rings.clone()), level, _partials, _error)?;
                ranges = range_union(&ranges, &sub.ranges);
                centroids.extend(sub.centroids);
            }
            Ok(ShapeIndex { ranges, centroids })
        }
        Geometry::Collection(members) => {
            let mut ranges = Vec::new();
            let mut centroids = Vec::new();
            for member in members {
                let sub = index_geometry(member, level, _partials, _error)?;
                ranges = range_union(&ranges, &sub.ranges);
                centroids.extend(sub.centroids);
            }
            Ok(ShapeIndex { ranges, centroids })
        }
        Geometry::Intersection(members) => {
            let mut iter = members.iter();
            let Some(first) = iter.next() else {
                return Ok(ShapeIndex { ranges: vec![], centroids: vec![] });
            };
            let mut acc = index_geometry(first, level, _partials, _error)?;
            for member in iter {
                let sub = index_geometry(member, level, _partials, _error)?;
                acc.ranges = range_intersection(&acc.ranges, &sub.ranges);
                acc.centroids.extend(sub.centroids);
            }
            Ok(acc)
        }
    }
}
