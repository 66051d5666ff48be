//! Tagged little-endian binary flow format (`.flo`).
//!
//! Layout:
//!
//! | bytes  | contents                                                    |
//! |--------|-------------------------------------------------------------|
//! | 0–3    | tag `"PIEH"`, which read as a little-endian f32 is 202021.25 |
//! | 4–7    | width  (little-endian i32)                                  |
//! | 8–11   | height (little-endian i32)                                  |
//! | 12–    | `height * width * 2` little-endian f32, row-major,          |
//! |        | channel-interleaved: u, v, u, v, …                          |
//!
//! The tag doubles as an endianness sentinel. A component with an absolute
//! value above [`UNKNOWN_FLOW_THRESH`] is unknown; decoding maps it (and its
//! partner channel) to NaN, encoding writes [`UNKNOWN_FLOW`] in place of NaN.

use std::path::Path;

use crate::field::Field;
use crate::io::{format_error, io_error, CodecError, CodecResult, FormatReason};

/// Expected value of the header tag when read as a little-endian f32.
pub const TAG_FLOAT: f32 = 202021.25;

/// ASCII bytes written as the header tag.
pub const TAG_BYTES: [u8; 4] = *b"PIEH";

/// Components with a larger absolute value are unknown flow.
pub const UNKNOWN_FLOW_THRESH: f64 = 1e9;

/// Sentinel written in place of NaN components.
pub const UNKNOWN_FLOW: f32 = 1e10;

/// Dimension sanity bound shared by width and height.
const MAX_DIMENSION: i32 = 99_999;

const HEADER_LEN: usize = 12;

#[inline]
fn f32_le(b: &[u8]) -> f32 {
    f32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

#[inline]
fn i32_le(b: &[u8]) -> i32 {
    i32::from_le_bytes([b[0], b[1], b[2], b[3]])
}

/// Decode a `.flo` byte stream into a 2-channel field.
pub fn decode(bytes: &[u8]) -> Result<Field, FormatReason> {
    if bytes.len() < HEADER_LEN {
        return Err(FormatReason::HeaderTooShort { got: bytes.len() });
    }

    let tag = f32_le(&bytes[0..4]);
    if tag != TAG_FLOAT {
        return Err(FormatReason::TagMismatch { found: tag });
    }

    let width = i32_le(&bytes[4..8]);
    let height = i32_le(&bytes[8..12]);
    if !(1..=MAX_DIMENSION).contains(&width) || !(1..=MAX_DIMENSION).contains(&height) {
        return Err(FormatReason::IllegalDimensions { width, height });
    }

    let (w, h) = (width as usize, height as usize);
    let expected = h * w * 2 * 4;
    let got = bytes.len() - HEADER_LEN;
    if got < expected {
        return Err(FormatReason::PayloadTooShort { expected, got });
    }
    if got > expected {
        return Err(FormatReason::TrailingBytes {
            extra: got - expected,
        });
    }

    let mut data = Vec::with_capacity(h * w * 2);
    for px in bytes[HEADER_LEN..].chunks_exact(8) {
        let u = f32_le(&px[0..4]) as f64;
        let v = f32_le(&px[4..8]) as f64;
        if unknown_component(u) || unknown_component(v) {
            data.push(f64::NAN);
            data.push(f64::NAN);
        } else {
            data.push(u);
            data.push(v);
        }
    }

    Field::from_vec(h, w, 2, data).map_err(|e| FormatReason::Container(e.to_string()))
}

#[inline]
fn unknown_component(v: f64) -> bool {
    v.is_nan() || v.abs() > UNKNOWN_FLOW_THRESH
}

/// Encode a 2-channel field as a `.flo` byte stream.
///
/// NaN pixels are written as the [`UNKNOWN_FLOW`] sentinel in both channels;
/// the encoder never emits NaN bit patterns.
pub fn encode(field: &Field) -> CodecResult<Vec<u8>> {
    if field.channels() != 2 {
        return Err(CodecError::Validation {
            reason: format!(
                "flo encode needs a 2-channel flow field, got {} channels",
                field.channels()
            ),
        });
    }

    let (h, w) = (field.height(), field.width());
    if h > w {
        // Row-major landscape fields are the convention; a taller-than-wide
        // field usually means transposed axes somewhere upstream.
        tracing::warn!(height = h, width = w, "flo encode: height exceeds width");
    }

    let mut out = Vec::with_capacity(HEADER_LEN + h * w * 8);
    out.extend_from_slice(&TAG_BYTES);
    out.extend_from_slice(&(w as i32).to_le_bytes());
    out.extend_from_slice(&(h as i32).to_le_bytes());

    for y in 0..h {
        for x in 0..w {
            let px = field.pixel(y, x);
            let invalid = px.iter().any(|v| v.is_nan());
            for &v in px {
                let sample = if invalid { UNKNOWN_FLOW } else { v as f32 };
                out.extend_from_slice(&sample.to_le_bytes());
            }
        }
    }

    Ok(out)
}

/// Read a `.flo` file.
pub fn read_flo(path: &Path) -> CodecResult<Field> {
    let bytes = std::fs::read(path).map_err(|e| io_error(path, e))?;
    decode(&bytes).map_err(|reason| format_error(path, reason))
}

/// Write a field to a `.flo` file.
pub fn write_flo(field: &Field, path: &Path) -> CodecResult<()> {
    let bytes = encode(field)?;
    std::fs::write(path, bytes).map_err(|e| io_error(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::uniform_flow;

    fn header(width: i32, height: i32) -> Vec<u8> {
        let mut bytes = Vec::new();
        bytes.extend_from_slice(&TAG_BYTES);
        bytes.extend_from_slice(&width.to_le_bytes());
        bytes.extend_from_slice(&height.to_le_bytes());
        bytes
    }

    #[test]
    fn tag_bytes_reinterpret_as_tag_float() {
        assert_eq!(f32::from_le_bytes(TAG_BYTES), TAG_FLOAT);
    }

    #[test]
    fn round_trip_is_exact_for_finite_fields() {
        let field = uniform_flow(3, 4, 1.5, -2.25);
        let decoded = decode(&encode(&field).unwrap()).unwrap();
        assert_eq!(decoded, field);
    }

    #[test]
    fn nan_pixels_round_trip_through_the_sentinel() {
        let mut field = uniform_flow(2, 3, 0.5, 0.5);
        field.invalidate_pixel(1, 2);
        let bytes = encode(&field).unwrap();
        // no NaN bit pattern in the payload
        for px in bytes[12..].chunks_exact(4) {
            assert!(!f32::from_le_bytes([px[0], px[1], px[2], px[3]]).is_nan());
        }
        let decoded = decode(&bytes).unwrap();
        assert!(!decoded.is_valid(1, 2));
        assert_eq!(decoded.valid_count(), 5);
    }

    #[test]
    fn components_above_threshold_invalidate_the_whole_pixel() {
        let mut field = uniform_flow(1, 2, 1.0, 1.0);
        field.set(0, 0, 1, 2e9);
        let decoded = decode(&encode(&field).unwrap()).unwrap();
        // one oversized channel NaNs both
        assert!(decoded.get(0, 0, 0).is_nan());
        assert!(decoded.get(0, 0, 1).is_nan());
        assert!(decoded.is_valid(0, 1));
    }

    #[test]
    fn wrong_tag_is_rejected() {
        let mut bytes = header(1, 1);
        bytes[0] = b'X';
        bytes.extend_from_slice(&[0u8; 8]);
        assert!(matches!(
            decode(&bytes).unwrap_err(),
            FormatReason::TagMismatch { .. }
        ));
    }

    #[test]
    fn short_header_is_rejected() {
        assert_eq!(
            decode(&TAG_BYTES).unwrap_err(),
            FormatReason::HeaderTooShort { got: 4 }
        );
    }

    #[test]
    fn illegal_dimensions_are_rejected() {
        for (w, h) in [(0, 5), (5, 0), (-3, 5), (100_000, 5), (5, 100_000)] {
            let mut bytes = header(w, h);
            bytes.extend_from_slice(&[0u8; 16]);
            assert!(
                matches!(
                    decode(&bytes).unwrap_err(),
                    FormatReason::IllegalDimensions { .. }
                ),
                "{}x{} accepted",
                w,
                h
            );
        }
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let mut bytes = header(2, 2);
        bytes.extend_from_slice(&[0u8; 31]); // one byte short of 2*2*2*4
        assert_eq!(
            decode(&bytes).unwrap_err(),
            FormatReason::PayloadTooShort {
                expected: 32,
                got: 31
            }
        );
    }

    #[test]
    fn trailing_bytes_are_rejected() {
        let mut bytes = header(2, 2);
        bytes.extend_from_slice(&[0u8; 33]);
        assert_eq!(
            decode(&bytes).unwrap_err(),
            FormatReason::TrailingBytes { extra: 1 }
        );
    }

    #[test]
    fn encode_rejects_non_flow_fields() {
        let disp = Field::filled(2, 2, 1, 1.0);
        assert!(matches!(
            encode(&disp).unwrap_err(),
            CodecError::Validation { .. }
        ));
    }

    #[test]
    fn file_round_trip_attaches_paths_on_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.flo");
        let field = uniform_flow(2, 3, 0.25, -0.75);
        write_flo(&field, &path).unwrap();
        assert_eq!(read_flo(&path).unwrap(), field);

        let missing = dir.path().join("missing.flo");
        match read_flo(&missing).unwrap_err() {
            CodecError::Io { path: p, .. } => assert_eq!(p, missing),
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
