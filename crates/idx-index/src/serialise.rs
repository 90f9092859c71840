//! Sortable byte serialization for scalar values (C1), and free-text type
//! guessing for fields without an explicit cast.

use crate::error::SerialiseError;

/// Encodes a `positive` (u64) value as sortable big-endian bytes.
pub fn serialise_positive(value: u64) -> Vec<u8> {
    value.to_be_bytes().to_vec()
}

/// Decodes bytes produced by [`serialise_positive`].
pub fn deserialise_positive(bytes: &[u8]) -> Result<u64, SerialiseError> {
    let arr: [u8; 8] = bytes.try_into().map_err(|_| SerialiseError::Serialisation {
        kind: "positive",
        detail: format!("expected 8 bytes, got {}", bytes.len()),
    })?;
    Ok(u64::from_be_bytes(arr))
}

/// Encodes a signed `integer` value by flipping the sign bit so that
/// big-endian byte order matches numeric order across negative and
/// positive values.
pub fn serialise_integer(value: i64) -> Vec<u8> {
    let biased = (value as u64) ^ (1u64 << 63);
    biased.to_be_bytes().to_vec()
}

/// Decodes bytes produced by [`serialise_integer`].
pub fn deserialise_integer(bytes: &[u8]) -> Result<i64, SerialiseError> {
    let biased = deserialise_positive(bytes)?;
    Ok((biased ^ (1u64 << 63)) as i64)
}

/// Encodes an `f64` so that sortable byte order matches numeric order,
/// including across the positive/negative boundary: for non-negative
/// values the sign bit is set; for negative values every bit is flipped.
pub fn serialise_float(value: f64) -> Vec<u8> {
    let bits = value.to_bits();
    let sortable = if value.is_sign_negative() { !bits } else { bits | (1u64 << 63) };
    sortable.to_be_bytes().to_vec()
}

/// Decodes bytes produced by [`serialise_float`].
pub fn deserialise_float(bytes: &[u8]) -> Result<f64, SerialiseError> {
    let sortable = deserialise_positive(bytes)?;
    let bits = if sortable & (1u64 << 63) != 0 { sortable & !(1u64 << 63) } else { !sortable };
    Ok(f64::from_bits(bits))
}

/// Encodes a boolean as a single sortable byte (`'f'` < `'t'`).
pub fn serialise_boolean(value: bool) -> Vec<u8> {
    vec![if value { b't' } else { b'f' }]
}

/// Decodes bytes produced by [`serialise_boolean`].
pub fn deserialise_boolean(bytes: &[u8]) -> Result<bool, SerialiseError> {
    match bytes {
        [b't'] => Ok(true),
        [b'f'] => Ok(false),
        other => Err(SerialiseError::Serialisation {
            kind: "boolean",
            detail: format!("expected a single 't' or 'f' byte, got {other:?}"),
        }),
    }
}

/// Encodes a keyword: lowercased UTF-8 bytes unless `bool_term` is set, in
/// which case the original case is preserved (§4.1).
pub fn serialise_keyword(value: &str, bool_term: bool) -> Vec<u8> {
    if bool_term { value.as_bytes().to_vec() } else { value.to_lowercase().into_bytes() }
}

/// Encodes free text as its raw UTF-8 bytes.
pub fn serialise_text(value: &str) -> Vec<u8> {
    value.as_bytes().to_vec()
}

/// Parses a UUID in canonical, braced, URN, or semicolon-list form into
/// one 16-byte value per element.
pub fn parse_uuid_list(value: &str) -> Result<Vec<[u8; 16]>, SerialiseError> {
    value.split(';').map(str::trim).filter(|s| !s.is_empty()).map(parse_uuid).collect()
}

/// Parses a single UUID string into its 16-byte binary form.
pub fn parse_uuid(value: &str) -> Result<[u8; 16], SerialiseError> {
    let trimmed = value
        .strip_prefix("urn:uuid:")
        .or_else(|| value.strip_prefix('{').and_then(|s| s.strip_suffix('}')))
        .unwrap_or(value);

    let hex: String = trimmed.chars().filter(|c| *c != '-').collect();
    if hex.len() != 32 {
        return Err(SerialiseError::Serialisation {
            kind: "uuid",
            detail: format!("expected 32 hex digits, got {}", hex.len()),
        });
    }

    let mut bytes = [0u8; 16];
    for (i, chunk) in hex.as_bytes().chunks(2).enumerate() {
        let pair = std::str::from_utf8(chunk).unwrap();
        bytes[i] = u8::from_str_radix(pair, 16).map_err(|_| SerialiseError::Serialisation {
            kind: "uuid",
            detail: format!("invalid hex pair {pair:?}"),
        })?;
    }
    Ok(bytes)
}

/// Encodes bytes as a lowercase hex string, used to turn sortable byte
/// encodings into printable term tokens for the external index.
pub fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

/// Formats a 16-byte UUID back into canonical
/// `hhhhhhhh-hhhh-hhhh-hhhh-hhhhhhhhhhhh` form.
pub fn format_uuid(bytes: [u8; 16]) -> String {
    let hex: Vec<String> = bytes.iter().map(|b| format!("{b:02x}")).collect();
    let h = hex.join("");
    format!("{}-{}-{}-{}-{}", &h[0..8], &h[8..12], &h[12..16], &h[16..20], &h[20..32])
}

/// Converts a proleptic-Gregorian calendar date to days since the Unix
/// epoch (1970-01-01), using Howard Hinnant's `days_from_civil` algorithm.
fn days_from_civil(y: i64, m: u32, d: u32) -> i64 {
    let y = if m <= 2 { y - 1 } else { y };
    let era = if y >= 0 { y } else { y - 399 } / 400;
    let yoe = (y - era * 400) as i64;
    let mp = (m as i64 + 9) % 12;
    let doy = (153 * mp + 2) / 5 + d as i64 - 1;
    let doe = yoe * 365 + yoe / 4 - yoe / 100 + doy;
    era * 146_097 + doe - 719_468
}

/// Parses `"YYYY-MM-DD"` into seconds since the Unix epoch at midnight UTC.
pub fn parse_date_seconds(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.splitn(3, '-').collect();
    if parts.len() != 3 {
        return None;
    }
    let year: i64 = parts[0].parse().ok()?;
    let month: u32 = parts[1].parse().ok()?;
    let day: u32 = parts[2].parse().ok()?;
    if !(1..=12).contains(&month) || !(1..=31).contains(&day) {
        return None;
    }
    Some((days_from_civil(year, month, day) * 86_400) as f64)
}

/// Parses `"HH:MM:SS[.fff]"` into seconds-of-day.
pub fn parse_time_seconds(value: &str) -> Option<f64> {
    let parts: Vec<&str> = value.splitn(3, ':').collect();
    if parts.len() != 3 {
        return None;
    }
    let hour: f64 = parts[0].parse().ok()?;
    let minute: f64 = parts[1].parse().ok()?;
    let second: f64 = parts[2].parse().ok()?;
    if !(0.0..24.0).contains(&hour) || !(0.0..60.0).contains(&minute) || !(0.0..60.0).contains(&second) {
        return None;
    }
    Some(hour * 3600.0 + minute * 60.0 + second)
}

/// Parses an ISO-8601-ish `"YYYY-MM-DDTHH:MM:SS[.fff][Z]"` datetime into
/// seconds since the Unix epoch.
pub fn parse_datetime_seconds(value: &str) -> Option<f64> {
    let value = value.strip_suffix('Z').unwrap_or(value);
    let (date_part, time_part) = value.split_once('T')?;
    let date_secs = parse_date_seconds(date_part)?;
    let time_secs = parse_time_seconds(time_part)?;
    Some(date_secs + time_secs)
}

/// Parses a `"[-]HH:MM:SS"` duration into signed seconds.
pub fn parse_timedelta_seconds(value: &str) -> Option<f64> {
    let (sign, rest) = match value.strip_prefix('-') {
        Some(rest) => (-1.0, rest),
        None => (1.0, value),
    };
    parse_time_seconds(rest).map(|secs| sign * secs)
}

/// The concrete type guessed for a free-text value that has no explicit
/// cast tag, tried in the order described in §4.1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuessedKind {
    /// A parseable UUID.
    Uuid,
    /// An ISO datetime.
    Datetime,
    /// An ISO date.
    Date,
    /// A time-of-day.
    Time,
    /// A signed duration.
    Timedelta,
    /// Syntactically valid EWKT.
    Geo,
    /// A signed integer.
    Integer,
    /// A non-negative integer.
    Positive,
    /// A floating point number.
    Float,
    /// Free text (whitespace-containing or long).
    Text,
    /// A short, whitespace-free keyword.
    Keyword,
}

/// Flags controlling which guesses are attempted, mirroring
/// `idx_config::DetectionFlags`.
#[derive(Debug, Clone, Copy)]
pub struct GuessFlags {
    /// Attempt date detection.
    pub date: bool,
    /// Attempt datetime detection.
    pub datetime: bool,
    /// Attempt time detection.
    pub time: bool,
    /// Attempt timedelta detection.
    pub timedelta: bool,
    /// Attempt numeric (integer/positive/float) detection.
    pub numeric: bool,
    /// Attempt EWKT geo detection.
    pub geo: bool,
    /// Treat long/whitespace-containing strings as text.
    pub text: bool,
    /// Attempt UUID detection.
    pub uuid: bool,
}

const TEXT_LENGTH_THRESHOLD: usize = 128;

/// Guesses the concrete type of a free-text value, trying detectors in
/// the fixed order described in §4.1.
pub fn guess_kind(value: &str, flags: GuessFlags) -> GuessedKind {
    if flags.uuid && parse_uuid(value).is_ok() {
        return GuessedKind::Uuid;
    }
    if flags.datetime && parse_datetime_seconds(value).is_some() {
        return GuessedKind::Datetime;
    }
    if flags.date && parse_date_seconds(value).is_some() && !value.contains('T') {
        return GuessedKind::Date;
    }
    if flags.time && value.matches(':').count() == 2 && parse_time_seconds(value).is_some() {
        return GuessedKind::Time;
    }
    if flags.timedelta
        && value.starts_with('-')
        && parse_timedelta_seconds(value).is_some()
    {
        return GuessedKind::Timedelta;
    }
    if flags.geo && idx_geo::is_ewkt(value) {
        return GuessedKind::Geo;
    }
    if flags.numeric {
        if let Ok(n) = value.parse::<i64>() {
            return if n >= 0 { GuessedKind::Positive } else { GuessedKind::Integer };
        }
        if value.parse::<f64>().is_ok() {
            return GuessedKind::Float;
        }
    }
    if flags.text && (value.contains(char::is_whitespace) || value.len() >= TEXT_LENGTH_THRESHOLD) {
        return GuessedKind::Text;
    }
    GuessedKind::Keyword
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integers_sort_in_numeric_order() {
        let values = [-2i64, -1, 0, 1, 2];
        let mut encoded: Vec<Vec<u8>> = values.iter().map(|v| serialise_integer(*v)).collect();
        let sorted = {
            let mut s = encoded.clone();
            s.sort();
            s
        };
        assert_eq!(encoded, sorted);
        encoded.dedup();
        assert_eq!(encoded.len(), values.len());
    }

    #[test]
    fn integer_round_trips() {
        for v in [-2i64, -1, 0, 1, 2, i64::MIN, i64::MAX] {
            assert_eq!(deserialise_integer(&serialise_integer(v)).unwrap(), v);
        }
    }

    #[test]
    fn float_sort_order_matches_numeric_order() {
        let values = [-10.5f64, -1.0, -0.001, 0.0, 0.001, 1.0, 10.5];
        let mut pairs: Vec<(f64, Vec<u8>)> = values.iter().map(|v| (*v, serialise_float(*v))).collect();
        let original: Vec<Vec<u8>> = pairs.iter().map(|(_, b)| b.clone()).collect();
        pairs.sort_by(|a, b| a.1.cmp(&b.1));
        let resorted: Vec<Vec<u8>> = pairs.iter().map(|(_, b)| b.clone()).collect();
        assert_eq!(original, resorted);
    }

    #[test]
    fn float_round_trips() {
        for v in [-10.5f64, 0.0, 1.0, 123_456.789] {
            assert_eq!(deserialise_float(&serialise_float(v)).unwrap(), v);
        }
    }

    #[test]
    fn positive_round_trips() {
        assert_eq!(deserialise_positive(&serialise_positive(123_456)).unwrap(), 123_456);
    }

    #[test]
    fn boolean_round_trips_and_sorts_false_before_true() {
        assert!(serialise_boolean(false) < serialise_boolean(true));
        assert!(deserialise_boolean(&serialise_boolean(true)).unwrap());
    }

    #[test]
    fn uuid_round_trips_through_canonical_and_braced_forms() {
        let canonical = "550e8400-e29b-41d4-a716-446655440000";
        let braced = "{550e8400-e29b-41d4-a716-446655440000}";
        let bytes = parse_uuid(canonical).unwrap();
        assert_eq!(parse_uuid(braced).unwrap(), bytes);
        assert_eq!(format_uuid(bytes), canonical);
    }

    #[test]
    fn uuid_list_splits_on_semicolon() {
        let list = "550e8400-e29b-41d4-a716-446655440000;6ba7b810-9dad-11d1-80b4-00c04fd430c8";
        assert_eq!(parse_uuid_list(list).unwrap().len(), 2);
    }

    #[test]
    fn date_parses_to_midnight_seconds() {
        assert_eq!(parse_date_seconds("1970-01-01"), Some(0.0));
        assert_eq!(parse_date_seconds("1970-01-02"), Some(86_400.0));
    }

    #[test]
    fn datetime_parses_with_time_component() {
        assert_eq!(parse_datetime_seconds("1970-01-01T00:00:01"), Some(1.0));
        assert_eq!(parse_datetime_seconds("1970-01-01T00:00:01Z"), Some(1.0));
    }

    #[test]
    fn timedelta_parses_negative_durations() {
        assert_eq!(parse_timedelta_seconds("-01:00:00"), Some(-3600.0));
    }

    fn all_flags() -> GuessFlags {
        GuessFlags {
            date: true,
            datetime: true,
            time: true,
            timedelta: true,
            numeric: true,
            geo: true,
            text: true,
            uuid: true,
        }
    }

    #[test]
    fn guesses_uuid_before_anything_else() {
        assert_eq!(
            guess_kind("550e8400-e29b-41d4-a716-446655440000", all_flags()),
            GuessedKind::Uuid
        );
    }

    #[test]
    fn guesses_positive_and_integer() {
        assert_eq!(guess_kind("42", all_flags()), GuessedKind::Positive);
        assert_eq!(guess_kind("-42", all_flags()), GuessedKind::Integer);
    }

    #[test]
    fn guesses_float() {
        assert_eq!(guess_kind("3.14", all_flags()), GuessedKind::Float);
    }

    #[test]
    fn guesses_text_for_whitespace_and_keyword_otherwise() {
        assert_eq!(guess_kind("hello world", all_flags()), GuessedKind::Text);
        assert_eq!(guess_kind("hello", all_flags()), GuessedKind::Keyword);
    }

    #[test]
    fn guesses_geo_shape() {
        assert_eq!(guess_kind("POINT(1 2)", all_flags()), GuessedKind::Geo);
    }
}
