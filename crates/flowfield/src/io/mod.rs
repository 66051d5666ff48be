//! File I/O for flow and disparity fields.
//!
//! Formats:
//! - `.flo` — tagged little-endian binary flow ([`flo`]).
//! - `.png` — 16-bit fixed-point raster with explicit validity ([`png16`]).
//! - `.mat` — matrix files with named `u`/`v` arrays ([`mat`], read-only).
//!
//! The codec is selected purely by the lower-cased file-name suffix; an
//! unrecognized suffix is [`CodecError::UnsupportedFormat`]. Every error
//! names the offending path — a corrupt file must never be mistaken for an
//! all-invalid field.

pub mod flo;
pub mod mat;
pub mod png16;

use std::path::{Path, PathBuf};

use crate::field::Field;

// ── Error type ─────────────────────────────────────────────────────────────

/// Why a byte stream could not be decoded as a field.
#[derive(Debug, Clone, PartialEq)]
pub enum FormatReason {
    /// Fewer bytes than the fixed header needs.
    HeaderTooShort { got: usize },
    /// The self-check float tag did not match.
    TagMismatch { found: f32 },
    /// Width or height outside the sane range.
    IllegalDimensions { width: i32, height: i32 },
    /// Payload shorter than the header declares.
    PayloadTooShort { expected: usize, got: usize },
    /// Bytes left over after the declared payload.
    TrailingBytes { extra: usize },
    /// Raster channel layout does not match the format.
    ChannelLayout { expected: &'static str, found: String },
    /// A named matrix channel is absent.
    MissingChannel { name: &'static str },
    /// The underlying container could not be parsed.
    Container(String),
}

impl std::fmt::Display for FormatReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::HeaderTooShort { got } => {
                write!(f, "header too short: {} bytes", got)
            }
            Self::TagMismatch { found } => {
                write!(
                    f,
                    "wrong tag {} (expected {}; possibly a big-endian file)",
                    found,
                    flo::TAG_FLOAT
                )
            }
            Self::IllegalDimensions { width, height } => {
                write!(f, "illegal dimensions {}x{}", width, height)
            }
            Self::PayloadTooShort { expected, got } => {
                write!(f, "file too short: need {} payload bytes, got {}", expected, got)
            }
            Self::TrailingBytes { extra } => {
                write!(f, "file too long: {} trailing bytes", extra)
            }
            Self::ChannelLayout { expected, found } => {
                write!(f, "expected {} image, found {}", expected, found)
            }
            Self::MissingChannel { name } => {
                write!(f, "matrix channel {:?} not found", name)
            }
            Self::Container(msg) => write!(f, "{}", msg),
        }
    }
}

/// Errors surfaced by the codec, each carrying the offending path where
/// one exists.
#[derive(Debug)]
pub enum CodecError {
    /// File-system failure.
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    /// Malformed file contents.
    Format { path: PathBuf, reason: FormatReason },
    /// File-name suffix not handled by any codec.
    UnsupportedFormat { path: PathBuf },
    /// The field handed to an encoder does not fit the format.
    Validation { reason: String },
}

impl std::fmt::Display for CodecError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "{}: {}", path.display(), source),
            Self::Format { path, reason } => write!(f, "{}: {}", path.display(), reason),
            Self::UnsupportedFormat { path } => {
                write!(f, "unsupported file format: {}", path.display())
            }
            Self::Validation { reason } => write!(f, "{}", reason),
        }
    }
}

impl std::error::Error for CodecError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io { source, .. } => Some(source),
            _ => None,
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;

pub(crate) fn io_error(path: &Path, source: std::io::Error) -> CodecError {
    CodecError::Io {
        path: path.to_path_buf(),
        source,
    }
}

pub(crate) fn format_error(path: &Path, reason: FormatReason) -> CodecError {
    CodecError::Format {
        path: path.to_path_buf(),
        reason,
    }
}

// ── Suffix dispatch ────────────────────────────────────────────────────────

fn suffix(path: &Path) -> Option<String> {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
}

/// Read a flow field (2 channels), choosing the codec by file suffix.
pub fn read_flow(path: impl AsRef<Path>) -> CodecResult<Field> {
    let path = path.as_ref();
    match suffix(path).as_deref() {
        Some("flo") => flo::read_flo(path),
        Some("png") => png16::read_flow_png(path),
        Some("mat") => mat::read_mat_flow(path),
        _ => Err(CodecError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Write a flow field, choosing the codec by file suffix.
///
/// `.mat` output is not supported and reports `UnsupportedFormat`.
pub fn write_flow(field: &Field, path: impl AsRef<Path>) -> CodecResult<()> {
    let path = path.as_ref();
    match suffix(path).as_deref() {
        Some("flo") => flo::write_flo(field, path),
        Some("png") => png16::write_flow_png(field, path),
        _ => Err(CodecError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Read a disparity field (1 channel).
pub fn read_disparity(path: impl AsRef<Path>) -> CodecResult<Field> {
    let path = path.as_ref();
    match suffix(path).as_deref() {
        Some("png") => png16::read_disparity_png(path),
        _ => Err(CodecError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}

/// Write a disparity field (1 channel).
pub fn write_disparity(field: &Field, path: impl AsRef<Path>) -> CodecResult<()> {
    let path = path.as_ref();
    match suffix(path).as_deref() {
        Some("png") => png16::write_disparity_png(field, path),
        _ => Err(CodecError::UnsupportedFormat {
            path: path.to_path_buf(),
        }),
    }
}
