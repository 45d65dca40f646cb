//! Errors raised by data containers and representation conversion.

use crate::datastructures::representation::RepresentationKind;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur when reading, converting or editing data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataError {
    #[error("No converter path from {from} to {to}")]
    ConversionUnavailable {
        from: RepresentationKind,
        to: RepresentationKind,
    },

    #[error("Converter {from} -> {to} failed: {message}")]
    ConversionFailed {
        from: RepresentationKind,
        to: RepresentationKind,
        message: String,
    },

    #[error("Expected a {expected} representation, found {found}")]
    UnexpectedRepresentation {
        expected: RepresentationKind,
        found: RepresentationKind,
    },

    #[error("Byte length {len} is not a multiple of the element size {element_size}")]
    MisalignedBytes { len: usize, element_size: usize },

    #[error("Size mismatch: expected {expected} scalars, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    #[error("Channel count {0} is outside 1..=4")]
    InvalidChannels(u8),

    #[error("Format mismatch: {0}")]
    FormatMismatch(String),

    #[error("Failed to read {path:?}: {message}")]
    Io { path: PathBuf, message: String },

    #[error("Unknown data class: {0}")]
    UnknownClass(String),
}

pub type DataResult<T> = std::result::Result<T, DataError>;
