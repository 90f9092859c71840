//! Accuracy-bucketed term generation (C3): widens a single numeric, date,
//! time, or geo value into a set of coarser terms so that range queries at
//! any of the schema's configured granularities can be answered without a
//! full scan.

use idx_geo::{GeoSpatialError, Geometry, ShapeIndex, index_geometry};

/// Floors a signed integer to the nearest lower multiple of `width`
/// (floor division, matching the behaviour on negative values).
fn floor_to_width(value: i64, width: u64) -> i64 {
    let width = width as i64;
    value.div_euclid(width) * width
}

/// Produces one bucket floor per configured width, widest-last, matching
/// the width ordering the caller provides (§4.3).
pub fn numeric_buckets(value: i64, widths: &[u64]) -> Vec<i64> {
    widths.iter().map(|w| floor_to_width(value, *w)).collect()
}

const SECONDS_PER_DAY: i64 = 86_400;

fn days_from_civil(y: i64, m: i64, d: i64) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = y - era * 400;
    let mp = (m + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

fn civil_from_days(z: i64) -> (i64, i64, i64) {
    let z = z + 719_468;
    let era = if z >= 0 { z } else { z - 146_096 } / 146_097;
    let doe = z - era * 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let y = yoe + era * 400;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let d = doy - (153 * mp + 2) / 5 + 1;
    let m = if mp < 10 { mp + 3 } else { mp - 9 };
    (if m <= 2 { y + 1 } else { y }, m, d)
}

/// Truncates a Unix timestamp (seconds) to the start of the named
/// calendar unit: `hour`, `day`, `month`, `year`, `decade`, or `century`.
pub fn truncate_date(seconds: f64, unit: &str) -> Option<f64> {
    let total = seconds.floor() as i64;
    let days = total.div_euclid(SECONDS_PER_DAY);
    let time_of_day = total.rem_euclid(SECONDS_PER_DAY);
    let (y, m, d) = civil_from_days(days);

    match unit {
        "hour" => {
            let hour = time_of_day / 3600;
            Some((days * SECONDS_PER_DAY + hour * 3600) as f64)
        }
        "day" => Some((days * SECONDS_PER_DAY) as f64),
        "month" => Some((days_from_civil(y, m, 1) * SECONDS_PER_DAY) as f64),
        "year" => Some((days_from_civil(y, 1, 1) * SECONDS_PER_DAY) as f64),
        "decade" => Some((days_from_civil(y.div_euclid(10) * 10, 1, 1) * SECONDS_PER_DAY) as f64),
        "century" => Some((days_from_civil(y.div_euclid(100) * 100, 1, 1) * SECONDS_PER_DAY) as f64),
        _ => None,
    }
}

/// Produces one truncated timestamp per configured date-accuracy unit.
pub fn date_buckets(seconds: f64, units: &[String]) -> Vec<f64> {
    units.iter().filter_map(|unit| truncate_date(seconds, unit)).collect()
}

/// Truncates a seconds-of-day (or signed duration) value to the named
/// unit: `minute` or `hour`.
pub fn truncate_time(seconds_of_day: f64, unit: &str) -> Option<f64> {
    let step = match unit {
        "minute" => 60.0,
        "hour" => 3600.0,
        _ => return None,
    };
    Some((seconds_of_day / step).floor() * step)
}

/// Produces one truncated time-of-day value per configured time-accuracy unit.
pub fn time_buckets(seconds_of_day: f64, units: &[String]) -> Vec<f64> {
    units.iter().filter_map(|unit| truncate_time(seconds_of_day, unit)).collect()
}

/// Produces one [`ShapeIndex`] per configured HTM subdivision level,
/// coarsest buckets first following the level ordering provided.
pub fn geo_buckets(
    geometry: &Geometry,
    levels: &[u8],
    partials: bool,
    error: f64,
) -> Result<Vec<ShapeIndex>, GeoSpatialError> {
    levels.iter().map(|level| index_geometry(geometry, *level, partials, error)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_buckets_match_the_documented_scenario() {
        let widths = [100, 1_000, 10_000, 100_000, 1_000_000, 100_000_000];
        assert_eq!(numeric_buckets(123_456, &widths), vec![123_400, 123_000, 120_000, 100_000, 0, 0]);
    }

    #[test]
    fn numeric_buckets_floor_towards_negative_infinity() {
        assert_eq!(numeric_buckets(-50, &[100]), vec![-100]);
    }

    #[test]
    fn date_truncation_covers_every_unit() {
        // 2023-06-15T13:45:30Z
        let seconds = (days_from_civil(2023, 6, 15) * SECONDS_PER_DAY + 13 * 3600 + 45 * 60 + 30) as f64;
        assert_eq!(truncate_date(seconds, "hour"), Some((days_from_civil(2023, 6, 15) * SECONDS_PER_DAY + 13 * 3600) as f64));
        assert_eq!(truncate_date(seconds, "day"), Some((days_from_civil(2023, 6, 15) * SECONDS_PER_DAY) as f64));
        assert_eq!(truncate_date(seconds, "month"), Some((days_from_civil(2023, 6, 1) * SECONDS_PER_DAY) as f64));
        assert_eq!(truncate_date(seconds, "year"), Some((days_from_civil(2023, 1, 1) * SECONDS_PER_DAY) as f64));
        assert_eq!(truncate_date(seconds, "decade"), Some((days_from_civil(2020, 1, 1) * SECONDS_PER_DAY) as f64));
        assert_eq!(truncate_date(seconds, "century"), Some((days_from_civil(2000, 1, 1) * SECONDS_PER_DAY) as f64));
    }

    #[test]
    fn time_truncation_buckets_minute_and_hour() {
        let seconds_of_day = 3661.0; // 01:01:01
        assert_eq!(truncate_time(seconds_of_day, "minute"), Some(3660.0));
        assert_eq!(truncate_time(seconds_of_day, "hour"), Some(3600.0));
    }

    #[test]
    fn geo_buckets_produce_one_shape_index_per_level() {
        use idx_geo::Coord;
        let geometry = Geometry::Point(Coord::flat(10.0, 20.0));
        let levels = [3u8, 5, 8];
        let buckets = geo_buckets(&geometry, &levels, true, 0.3).unwrap();
        assert_eq!(buckets.len(), 3);
        assert!(buckets.iter().all(|b| b.ranges.len() == 1));
    }
}
