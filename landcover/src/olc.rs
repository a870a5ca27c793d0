//! Open Location Code ("plus code") encoding and decoding.
//!
//! A location code names a rectangular cell on the Earth's surface. The code
//! is built from pairs of base-20 digits, each pair narrowing the latitude and
//! longitude intervals by a factor of 20, followed by optional grid digits that
//! refine a cell into a 4-column × 5-row grid.
//!
//! # Code Format
//!
//! - Alphabet: `23456789CFGHJMPQRVWX` (no vowels, no easily confused glyphs)
//! - Separator: `+`, always placed after the 8th character
//! - Padding: `0`, used to fill codes shorter than 8 digits up to the separator
//! - Default length: 10 digits (cell of 1/8000° × 1/8000°, about 14m × 14m)
//! - Maximum length: 15 digits
//!
//! ```text
//! 8FQF2222+22     10 digits, full precision pairs
//! 8FQF0000+       4 digits, padded, 1° × 1° cell
//! 7FG49QCJ+2VX    11 digits, one grid refinement
//! ```
//!
//! URL query strings decode `+` to a space, so endpoints that receive a code
//! through a query parameter should pass it through [`normalize_query_code`]
//! before decoding.

use serde::Serialize;

use crate::error::{Result, TerrainError};

/// Digit alphabet, indexed by digit value.
pub const ALPHABET: &[u8; 20] = b"23456789CFGHJMPQRVWX";

/// Separator between the 8-digit prefix and the refinement suffix.
pub const SEPARATOR: char = '+';

/// Number of digits before the separator.
pub const SEPARATOR_POSITION: usize = 8;

/// Padding character for codes shorter than [`SEPARATOR_POSITION`].
pub const PADDING: char = '0';

/// Code length produced by [`encode`].
pub const DEFAULT_CODE_LENGTH: usize = 10;

const ENCODING_BASE: i64 = 20;
const LATITUDE_MAX: f64 = 90.0;
const LONGITUDE_MAX: f64 = 180.0;
const MIN_DIGIT_COUNT: usize = 2;
const MAX_DIGIT_COUNT: usize = 15;
const PAIR_CODE_LENGTH: usize = 10;
const GRID_CODE_LENGTH: usize = MAX_DIGIT_COUNT - PAIR_CODE_LENGTH;
const GRID_COLUMNS: i64 = 4;
const GRID_ROWS: i64 = 5;

/// Place value of the first pair digit, in pair-precision units.
const PAIR_FIRST_PLACE_VALUE: i64 = 160_000; // 20^4
/// Pair-precision units per degree.
const PAIR_PRECISION: i64 = 8_000; // 20^3
const GRID_LAT_FIRST_PLACE_VALUE: i64 = 625; // 5^4
const GRID_LON_FIRST_PLACE_VALUE: i64 = 256; // 4^4
/// Integer steps per degree of latitude at maximum precision.
const FINAL_LAT_PRECISION: i64 = PAIR_PRECISION * 3_125; // 5^5
/// Integer steps per degree of longitude at maximum precision.
const FINAL_LON_PRECISION: i64 = PAIR_PRECISION * 1_024; // 4^5

/// The cell a location code decodes to, in decimal degrees (WGS84).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeArea {
    /// Southern boundary.
    pub lat_lo: f64,
    /// Western boundary.
    pub lon_lo: f64,
    /// Northern boundary.
    pub lat_hi: f64,
    /// Eastern boundary.
    pub lon_hi: f64,
    /// Latitude of the cell center, clipped to 90.
    pub lat_center: f64,
    /// Longitude of the cell center, clipped to 180.
    pub lon_center: f64,
    /// Number of significant digits in the code.
    pub code_length: usize,
}

impl CodeArea {
    fn new(lat_lo: f64, lon_lo: f64, lat_hi: f64, lon_hi: f64, code_length: usize) -> Self {
        Self {
            lat_lo,
            lon_lo,
            lat_hi,
            lon_hi,
            lat_center: (lat_lo + (lat_hi - lat_lo) / 2.0).min(LATITUDE_MAX),
            lon_center: (lon_lo + (lon_hi - lon_lo) / 2.0).min(LONGITUDE_MAX),
            code_length,
        }
    }

    /// The cell center as `(lat, lon)`.
    pub fn center(&self) -> (f64, f64) {
        (self.lat_center, self.lon_center)
    }

    /// Cell height in degrees of latitude.
    pub fn height(&self) -> f64 {
        self.lat_hi - self.lat_lo
    }

    /// Cell width in degrees of longitude.
    pub fn width(&self) -> f64 {
        self.lon_hi - self.lon_lo
    }

    /// Check whether the point lies inside the cell (boundaries included).
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        lat >= self.lat_lo && lat <= self.lat_hi && lon >= self.lon_lo && lon <= self.lon_hi
    }
}

/// Encode a coordinate into a location code of [`DEFAULT_CODE_LENGTH`] digits.
///
/// # Examples
///
/// ```
/// use landcover::olc::encode;
///
/// assert_eq!(encode(45.0, 9.0).unwrap(), "8FQF2222+22");
/// assert!(encode(91.0, 9.0).is_err());
/// ```
pub fn encode(lat: f64, lon: f64) -> Result<String> {
    encode_with_length(lat, lon, DEFAULT_CODE_LENGTH)
}

/// Encode a coordinate into a location code with the given number of digits.
///
/// Valid lengths are 2, 4, 6, 8 and anything from 10 upwards; lengths above 15
/// are clamped to 15. Codes shorter than 8 digits are padded with `0`.
///
/// # Errors
///
/// Returns [`TerrainError::InvalidInput`] if the latitude is outside
/// `[-90, 90]`, the longitude is outside `[-180, 180]`, either value is not
/// finite, or the length is not a valid code length.
///
/// # Examples
///
/// ```
/// use landcover::olc::encode_with_length;
///
/// assert_eq!(encode_with_length(20.375, 2.775, 6).unwrap(), "7FG49Q00+");
/// assert_eq!(encode_with_length(20.3701125, 2.782234375, 11).unwrap(), "7FG49QCJ+2VX");
/// ```
pub fn encode_with_length(lat: f64, lon: f64, code_length: usize) -> Result<String> {
    validate_coordinates(lat, lon)?;
    if !is_valid_length(code_length) {
        return Err(TerrainError::invalid_input(
            lat,
            lon,
            format!("invalid code length {}", code_length),
        ));
    }
    let code_length = code_length.min(MAX_DIGIT_COUNT);

    // Work in integers at the finest precision so cell membership is exact.
    let mut lat_val = to_fixed_point(lat + LATITUDE_MAX, FINAL_LAT_PRECISION);
    let mut lon_val = to_fixed_point(lon + LONGITUDE_MAX, FINAL_LON_PRECISION);

    let lat_span = 2 * LATITUDE_MAX as i64 * FINAL_LAT_PRECISION;
    let lon_span = 2 * LONGITUDE_MAX as i64 * FINAL_LON_PRECISION;
    lat_val = lat_val.clamp(0, lat_span - 1);
    lon_val = lon_val.rem_euclid(lon_span);

    // Digits are produced least significant first.
    let mut reversed: Vec<u8> = Vec::with_capacity(MAX_DIGIT_COUNT);
    if code_length > PAIR_CODE_LENGTH {
        for _ in 0..GRID_CODE_LENGTH {
            let lat_digit = lat_val % GRID_ROWS;
            let lon_digit = lon_val % GRID_COLUMNS;
            reversed.push(ALPHABET[(lat_digit * GRID_COLUMNS + lon_digit) as usize]);
            lat_val /= GRID_ROWS;
            lon_val /= GRID_COLUMNS;
        }
    } else {
        lat_val /= GRID_ROWS.pow(GRID_CODE_LENGTH as u32);
        lon_val /= GRID_COLUMNS.pow(GRID_CODE_LENGTH as u32);
    }
    for _ in 0..PAIR_CODE_LENGTH / 2 {
        reversed.push(ALPHABET[(lon_val % ENCODING_BASE) as usize]);
        reversed.push(ALPHABET[(lat_val % ENCODING_BASE) as usize]);
        lat_val /= ENCODING_BASE;
        lon_val /= ENCODING_BASE;
    }
    let digits: String = reversed.iter().rev().map(|&b| b as char).collect();

    let mut code = String::with_capacity(MAX_DIGIT_COUNT + 1);
    if code_length >= SEPARATOR_POSITION {
        code.push_str(&digits[..SEPARATOR_POSITION]);
        code.push(SEPARATOR);
        code.push_str(&digits[SEPARATOR_POSITION..code_length]);
    } else {
        code.push_str(&digits[..code_length]);
        code.extend(std::iter::repeat(PADDING).take(SEPARATOR_POSITION - code_length));
        code.push(SEPARATOR);
    }
    Ok(code)
}

/// Check whether `code_length` can be passed to [`encode_with_length`].
///
/// Lengths of 2, 4, 6 and 8 produce padded codes; every length from 10 up is
/// accepted and clamped to 15.
pub fn is_valid_length(code_length: usize) -> bool {
    code_length >= MIN_DIGIT_COUNT && (code_length >= PAIR_CODE_LENGTH || code_length % 2 == 0)
}

/// Decode a full location code into the cell it represents.
///
/// Decoding is case-insensitive. Short codes (fewer than 8 digits before the
/// separator) are rejected because they only make sense relative to a
/// reference location.
///
/// # Errors
///
/// Returns [`TerrainError::InvalidCode`] if the code is not a valid full code.
///
/// # Examples
///
/// ```
/// use landcover::olc::decode;
///
/// let area = decode("8FQF2222+22").unwrap();
/// assert_eq!(area.lat_lo, 45.0);
/// assert_eq!(area.lon_hi, 9.000125);
/// assert!(decode("8FQF2222").is_err());
/// ```
pub fn decode(code: &str) -> Result<CodeArea> {
    if !is_valid(code) {
        return Err(TerrainError::invalid_code(
            code,
            "not a valid Open Location Code",
        ));
    }
    if is_short(code) {
        return Err(TerrainError::invalid_code(
            code,
            "short codes need a reference location and cannot be decoded",
        ));
    }
    if !is_full(code) {
        return Err(TerrainError::invalid_code(
            code,
            "leading digits are outside the latitude/longitude range",
        ));
    }

    let values = code
        .chars()
        .filter(|&c| c != SEPARATOR && c != PADDING)
        .map(|c| digit_value(c).ok_or_else(|| TerrainError::invalid_code(code, "bad digit")))
        .collect::<Result<Vec<i64>>>()?;

    let mut normal_lat = -(LATITUDE_MAX as i64) * PAIR_PRECISION;
    let mut normal_lon = -(LONGITUDE_MAX as i64) * PAIR_PRECISION;
    let pair_digits = values.len().min(PAIR_CODE_LENGTH);
    let pair_count = pair_digits / 2;
    let mut place_value = PAIR_FIRST_PLACE_VALUE;
    for (n, pair) in values[..pair_digits].chunks_exact(2).enumerate() {
        normal_lat += pair[0] * place_value;
        normal_lon += pair[1] * place_value;
        if n + 1 < pair_count {
            place_value /= ENCODING_BASE;
        }
    }
    let mut lat_precision = place_value as f64 / PAIR_PRECISION as f64;
    let mut lon_precision = place_value as f64 / PAIR_PRECISION as f64;

    let mut grid_lat = 0i64;
    let mut grid_lon = 0i64;
    if values.len() > PAIR_CODE_LENGTH {
        let end = values.len().min(MAX_DIGIT_COUNT);
        let mut row_value = GRID_LAT_FIRST_PLACE_VALUE;
        let mut col_value = GRID_LON_FIRST_PLACE_VALUE;
        for (i, digit) in values.iter().enumerate().take(end).skip(PAIR_CODE_LENGTH) {
            grid_lat += (digit / GRID_COLUMNS) * row_value;
            grid_lon += (digit % GRID_COLUMNS) * col_value;
            if i + 1 < end {
                row_value /= GRID_ROWS;
                col_value /= GRID_COLUMNS;
            }
        }
        lat_precision = row_value as f64 / FINAL_LAT_PRECISION as f64;
        lon_precision = col_value as f64 / FINAL_LON_PRECISION as f64;
    }

    let lat = normal_lat as f64 / PAIR_PRECISION as f64
        + grid_lat as f64 / FINAL_LAT_PRECISION as f64;
    let lon = normal_lon as f64 / PAIR_PRECISION as f64
        + grid_lon as f64 / FINAL_LON_PRECISION as f64;

    Ok(CodeArea::new(
        round_14(lat),
        round_14(lon),
        round_14(lat + lat_precision),
        round_14(lon + lon_precision),
        values.len().min(MAX_DIGIT_COUNT),
    ))
}

/// Check whether a string follows the location code grammar.
///
/// Both full and short codes are accepted.
///
/// # Examples
///
/// ```
/// use landcover::olc::is_valid;
///
/// assert!(is_valid("8FQF2222+22"));
/// assert!(is_valid("8FQF0000+"));
/// assert!(is_valid("2222+22"));
/// assert!(!is_valid("8FQF2222+2"));
/// assert!(!is_valid("8FQF2222"));
/// ```
pub fn is_valid(code: &str) -> bool {
    if code.is_empty() || !code.is_ascii() {
        return false;
    }

    let sep = match code.find(SEPARATOR) {
        Some(i) => i,
        None => return false,
    };
    if code.rfind(SEPARATOR) != Some(sep) || code.len() == 1 {
        return false;
    }
    if sep > SEPARATOR_POSITION || sep % 2 == 1 {
        return false;
    }

    if let Some(pad_start) = code.find(PADDING) {
        if sep < SEPARATOR_POSITION || pad_start == 0 {
            return false;
        }
        // Padding must be a single even-length run and the code must end at the separator.
        let pad_end = code.rfind(PADDING).unwrap_or(pad_start);
        let run = &code[pad_start..=pad_end];
        if run.chars().any(|c| c != PADDING) {
            return false;
        }
        if run.len() % 2 == 1 || run.len() > SEPARATOR_POSITION - 2 {
            return false;
        }
        if !code.ends_with(SEPARATOR) {
            return false;
        }
    }

    // A single digit after the separator is never valid.
    if code.len() - sep - 1 == 1 {
        return false;
    }

    code.chars()
        .filter(|&c| c != SEPARATOR && c != PADDING)
        .all(|c| digit_value(c).is_some())
}

/// Check whether a code is a valid short code (separator before position 8).
pub fn is_short(code: &str) -> bool {
    is_valid(code)
        && code
            .find(SEPARATOR)
            .is_some_and(|sep| sep < SEPARATOR_POSITION)
}

/// Check whether a code is a valid full code that can be decoded on its own.
pub fn is_full(code: &str) -> bool {
    if !is_valid(code) || is_short(code) {
        return false;
    }

    let mut chars = code.chars();
    let first_lat = chars.next().and_then(digit_value).unwrap_or(0);
    if first_lat * ENCODING_BASE >= 2 * LATITUDE_MAX as i64 {
        return false;
    }
    match chars.next().and_then(digit_value) {
        Some(first_lon) => first_lon * ENCODING_BASE < 2 * LONGITUDE_MAX as i64,
        None => true,
    }
}

/// Normalize a location code taken from a URL query parameter.
///
/// Form-encoded query strings turn `+` into a space, so when the code has no
/// [`SEPARATOR`] the first whitespace character after any leading whitespace
/// is replaced with it. That space may be the last character, as for padded
/// codes like `6FH56C22+`. Remaining trailing whitespace is trimmed.
///
/// # Examples
///
/// ```
/// use landcover::olc::normalize_query_code;
///
/// assert_eq!(normalize_query_code("8FQF2222 22"), "8FQF2222+22");
/// assert_eq!(normalize_query_code("6FH56C22 "), "6FH56C22+");
/// assert_eq!(normalize_query_code(" 8FQF2222+22 "), "8FQF2222+22");
/// ```
pub fn normalize_query_code(raw: &str) -> String {
    let code = raw.trim_start();
    if code.contains(SEPARATOR) {
        return code.trim_end().to_string();
    }
    match code.char_indices().find(|(_, c)| c.is_whitespace()) {
        Some((i, c)) => {
            let mut normalized = String::with_capacity(code.len());
            normalized.push_str(&code[..i]);
            normalized.push(SEPARATOR);
            normalized.push_str(code[i + c.len_utf8()..].trim_end());
            normalized
        }
        None => code.to_string(),
    }
}

fn validate_coordinates(lat: f64, lon: f64) -> Result<()> {
    if !lat.is_finite() || !lon.is_finite() {
        return Err(TerrainError::invalid_input(
            lat,
            lon,
            "coordinates must be finite",
        ));
    }
    if !(-LATITUDE_MAX..=LATITUDE_MAX).contains(&lat) {
        return Err(TerrainError::invalid_input(
            lat,
            lon,
            "latitude must be within [-90, 90]",
        ));
    }
    if !(-LONGITUDE_MAX..=LONGITUDE_MAX).contains(&lon) {
        return Err(TerrainError::invalid_input(
            lat,
            lon,
            "longitude must be within [-180, 180]",
        ));
    }
    Ok(())
}

/// Convert a non-negative degree offset to integer steps, absorbing float noise
/// below a millionth of a step.
fn to_fixed_point(degrees: f64, steps_per_degree: i64) -> i64 {
    ((degrees * steps_per_degree as f64 * 1e6).round() / 1e6).floor() as i64
}

fn digit_value(c: char) -> Option<i64> {
    let upper = c.to_ascii_uppercase() as u8;
    ALPHABET
        .iter()
        .position(|&d| d == upper)
        .map(|i| i as i64)
}

fn round_14(value: f64) -> f64 {
    (value * 1e14).round() / 1e14
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encode_known_codes() {
        assert_eq!(encode(45.0, 9.0).unwrap(), "8FQF2222+22");
        assert_eq!(encode(47.0000625, 8.0000625).unwrap(), "8FVC2222+22");
        assert_eq!(encode(20.3700625, 2.7821875).unwrap(), "7FG49QCJ+2V");
        assert_eq!(encode(-41.2730625, 174.7859375).unwrap(), "4VCPPQGP+Q9");
    }

    #[test]
    fn test_encode_grid_refinement() {
        assert_eq!(
            encode_with_length(20.3701125, 2.782234375, 11).unwrap(),
            "7FG49QCJ+2VX"
        );
        assert_eq!(
            encode_with_length(20.3701135, 2.78223535156, 13).unwrap(),
            "7FG49QCJ+2VXGJ"
        );
        assert_eq!(
            encode_with_length(51.3701125, -10.202665625, 12).unwrap(),
            "9C3F9QCW+2WWG"
        );
    }

    #[test]
    fn test_encode_padded_lengths() {
        assert_eq!(encode_with_length(1.2, 3.4, 2).unwrap(), "6F000000+");
        assert_eq!(encode_with_length(1.2, 3.4, 4).unwrap(), "6FH50000+");
        assert_eq!(encode_with_length(20.375, 2.775, 6).unwrap(), "7FG49Q00+");
        assert_eq!(encode_with_length(1.2, 3.4, 8).unwrap(), "6FH56C22+");
    }

    #[test]
    fn test_encode_length_clamped() {
        let max = encode_with_length(20.3701135, 2.78223535156, 15).unwrap();
        let over = encode_with_length(20.3701135, 2.78223535156, 20).unwrap();
        assert_eq!(max, over);
        assert_eq!(max.len(), 16);
    }

    #[test]
    fn test_encode_invalid_length() {
        assert!(encode_with_length(45.0, 9.0, 0).is_err());
        assert!(encode_with_length(45.0, 9.0, 1).is_err());
        assert!(encode_with_length(45.0, 9.0, 7).is_err());
        assert!(encode_with_length(45.0, 9.0, 11).is_ok());

        assert!(is_valid_length(2));
        assert!(is_valid_length(8));
        assert!(!is_valid_length(9));
        assert!(is_valid_length(10));
        assert!(is_valid_length(42));
    }

    #[test]
    fn test_encode_out_of_range() {
        for (lat, lon) in [(90.5, 0.0), (-91.0, 0.0), (0.0, 180.5), (0.0, -181.0)] {
            match encode(lat, lon) {
                Err(TerrainError::InvalidInput { .. }) => {}
                other => panic!("expected InvalidInput for ({lat}, {lon}), got {other:?}"),
            }
        }
        assert!(encode(f64::NAN, 0.0).is_err());
        assert!(encode(0.0, f64::INFINITY).is_err());
    }

    #[test]
    fn test_encode_boundaries() {
        // North pole is folded into the topmost row of cells
        assert_eq!(encode(90.0, 1.0).unwrap(), "CFX3X2X2+X2");
        assert_eq!(encode(-90.0, -180.0).unwrap(), "22222222+22");
        // Longitude 180 wraps to -180
        assert_eq!(encode(0.0, 180.0).unwrap(), "62G22222+22");
    }

    #[test]
    fn test_encode_deterministic() {
        let first = encode(35.6762, 139.6503).unwrap();
        for _ in 0..10 {
            assert_eq!(encode(35.6762, 139.6503).unwrap(), first);
        }
    }

    #[test]
    fn test_decode_known_codes() {
        let area = decode("8FQF2222+22").unwrap();
        assert_eq!(area.lat_lo, 45.0);
        assert_eq!(area.lon_lo, 9.0);
        assert_eq!(area.lat_hi, 45.000125);
        assert_eq!(area.lon_hi, 9.000125);
        assert_eq!(area.code_length, 10);

        let area = decode("7FG49Q00+").unwrap();
        assert_eq!(
            (area.lat_lo, area.lon_lo, area.lat_hi, area.lon_hi),
            (20.35, 2.75, 20.4, 2.8)
        );
        assert_eq!(area.code_length, 6);

        let area = decode("7FG49QCJ+2VX").unwrap();
        assert_eq!(area.lat_lo, 20.3701);
        assert_eq!(area.lon_lo, 2.78221875);
        assert_eq!(area.lat_hi, 20.370125);
        assert_eq!(area.lon_hi, 2.78225);
        assert_eq!(area.code_length, 11);
    }

    #[test]
    fn test_decode_case_insensitive() {
        assert_eq!(
            decode("8fqf2222+22").unwrap(),
            decode("8FQF2222+22").unwrap()
        );
    }

    #[test]
    fn test_decode_rejects_malformed() {
        let malformed = [
            "",
            "+",
            "8FQF2222",       // no separator
            "8FQF2222+2",     // single digit after separator
            "8FQF2222++22",   // two separators
            "8FQF222+22",     // separator at odd position
            "8FQF22222+22",   // separator too late
            "8FQA2222+22",    // 'A' not in alphabet
            "8FQF0000+22",    // padded code with digits after separator
            "0FQF0000+",      // padding at start
            "8F0F0000+",      // two padding runs
            "8FQF2000+",      // odd padding run
            "8FQF22é2+22",    // non-ascii
        ];
        for code in malformed {
            match decode(code) {
                Err(TerrainError::InvalidCode { .. }) => {}
                other => panic!("expected InvalidCode for {code:?}, got {other:?}"),
            }
        }
    }

    #[test]
    fn test_decode_rejects_short_and_out_of_range() {
        assert!(matches!(
            decode("2222+22"),
            Err(TerrainError::InvalidCode { .. })
        ));
        // First latitude digit 'F' (9) would start at 90°
        assert!(matches!(
            decode("F2222222+22"),
            Err(TerrainError::InvalidCode { .. })
        ));
        // First longitude digit 'W' (18) would start at 180°
        assert!(matches!(
            decode("2W222222+22"),
            Err(TerrainError::InvalidCode { .. })
        ));
    }

    #[test]
    fn test_grammar_predicates() {
        assert!(is_valid("8FQF2222+22"));
        assert!(is_full("8FQF2222+22"));
        assert!(!is_short("8FQF2222+22"));

        assert!(is_valid("2222+22"));
        assert!(is_short("2222+22"));
        assert!(!is_full("2222+22"));

        assert!(is_valid("8FQF2200+"));
        assert!(is_full("8FQF2200+"));
        assert!(!is_valid("8FQF2000+"));
    }

    #[test]
    fn test_encoded_cell_contains_point() {
        for i in 0..60 {
            for j in 0..60 {
                let lat = -89.5 + i as f64 * 2.9731;
                let lon = -179.9 + j as f64 * 5.9973;
                let area = decode(&encode(lat, lon).unwrap()).unwrap();
                assert!(area.contains(lat, lon), "({lat}, {lon}) not in {area:?}");
                assert!(area.lat_lo < area.lat_hi);
                assert!(area.lon_lo < area.lon_hi);
            }
        }
    }

    #[test]
    fn test_center_round_trip() {
        for i in 0..50 {
            for j in 0..50 {
                let lat = -88.0 + i as f64 * 3.517;
                let lon = -179.0 + j as f64 * 7.1113;
                for length in [4, 8, 10, 11, 13] {
                    let code = encode_with_length(lat, lon, length).unwrap();
                    let area = decode(&code).unwrap();
                    let (c_lat, c_lon) = area.center();
                    assert!(area.lat_lo <= c_lat && c_lat <= area.lat_hi);
                    assert!(area.lon_lo <= c_lon && c_lon <= area.lon_hi);
                    assert_eq!(encode_with_length(c_lat, c_lon, length).unwrap(), code);
                }
            }
        }
    }

    #[test]
    fn test_cells_aligned_to_grid() {
        // A 10 digit cell is exactly 1/8000 degree on each side
        let area = decode(&encode(12.3456789, -98.7654321).unwrap()).unwrap();
        assert!((area.height() - 0.000125).abs() < 1e-12);
        assert!((area.width() - 0.000125).abs() < 1e-12);
        assert!(((area.lat_lo * 8000.0).round() - area.lat_lo * 8000.0).abs() < 1e-6);
        assert!(((area.lon_lo * 8000.0).round() - area.lon_lo * 8000.0).abs() < 1e-6);
    }

    #[test]
    fn test_normalize_query_code() {
        assert_eq!(normalize_query_code("8FQF2222 22"), "8FQF2222+22");
        assert_eq!(normalize_query_code("8FQF2222+22"), "8FQF2222+22");
        assert_eq!(normalize_query_code("  8FQF2222 22\n"), "8FQF2222+22");
        // Only the first whitespace is replaced
        assert_eq!(normalize_query_code("8FQF2222 2 2"), "8FQF2222+2 2");
        // Existing separator is kept, stray whitespace dropped
        assert_eq!(normalize_query_code("8FQF2222+22 "), "8FQF2222+22");
        assert_eq!(normalize_query_code("   "), "");
    }

    #[test]
    fn test_normalize_restores_trailing_separator() {
        assert_eq!(normalize_query_code("8FQF0000 "), "8FQF0000+");
        assert_eq!(normalize_query_code(" 7FG49Q00 \n"), "7FG49Q00+");

        // Codes ending in the separator survive form decoding
        for length in [2, 4, 6, 8] {
            let code = encode_with_length(1.2, 3.4, length).unwrap();
            let form_decoded = code.replace(SEPARATOR, " ");
            let normalized = normalize_query_code(&form_decoded);
            assert_eq!(normalized, code);
            assert!(decode(&normalized).is_ok());
        }
    }
}
