//! Core types for the UDS database decoder library
//!
//! This module defines the fundamental types shared by every layer: the
//! error enum, the row type produced by container extraction, the seven
//! dataset kinds and the decode kinds carried by a data type id.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Result type for decoder operations
pub type Result<T> = std::result::Result<T, UdsError>;

/// One comma-split line of a database segment
pub type Row = Vec<String>;

/// Errors that can occur while loading the database or building descriptors
///
/// Decoding a response buffer never produces one of these; decode failures
/// degrade to empty or "unknown" text instead.
#[derive(Debug, thiserror::Error)]
pub enum UdsError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Archive error: {0}")]
    ArchiveError(#[from] zip::result::ZipError),

    #[error("Invalid container {path:?}: {reason}")]
    InvalidContainer { path: PathBuf, reason: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Expected exactly one file matching {pattern}, found {found}")]
    AmbiguousFile { pattern: String, found: usize },

    #[error("Malformed row in segment {segment}: {reason}")]
    MalformedRow { segment: String, reason: String },

    #[error("Row too short: need {needed} fields, got {actual}")]
    RowTooShort { needed: usize, actual: usize },

    #[error("Invalid numeric field '{0}'")]
    InvalidNumber(String),

    #[error("Text key {0} not found")]
    TextNotFound(u32),

    #[error("Unit key {0} not found")]
    UnitNotFound(u32),

    #[error("Fixed converter id {0} not registered")]
    ConverterNotFound(u32),

    #[error("Row index {index} out of range 1..={len}")]
    IndexOutOfRange { index: u32, len: usize },

    #[error("Duplicate key {key} in segment {segment}")]
    DuplicateKey { segment: String, key: u32 },

    #[error("Unknown dataset kind: {0}")]
    UnknownSegment(String),

    #[error("Multiplexer group {0} references itself")]
    MuxCycle(u32),
}

/// The seven diagnostic dataset kinds, each backed by one master line table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SegmentType {
    /// Adaptation channels
    Adp,
    /// Diagnostic trouble codes
    Dtc,
    /// Freeze frame multiplexing
    Ffmux,
    /// Generic events
    Ges,
    /// Measurement blocks
    Mwb,
    /// System overview
    Sot,
    /// External parameters
    Xpl,
}

impl SegmentType {
    /// All dataset kinds in load order
    pub const ALL: [SegmentType; 7] = [
        SegmentType::Adp,
        SegmentType::Dtc,
        SegmentType::Ffmux,
        SegmentType::Ges,
        SegmentType::Mwb,
        SegmentType::Sot,
        SegmentType::Xpl,
    ];

    /// Segment marker name (`[MWB]` ... `[/MWB]`)
    pub fn segment_name(self) -> &'static str {
        match self {
            SegmentType::Adp => "ADP",
            SegmentType::Dtc => "DTC",
            SegmentType::Ffmux => "FFMUX",
            SegmentType::Ges => "GES",
            SegmentType::Mwb => "MWB",
            SegmentType::Sot => "SOT",
            SegmentType::Xpl => "XPL",
        }
    }

    /// Base name of the master file holding this dataset
    pub fn file_name(self) -> &'static str {
        match self {
            SegmentType::Adp => "RA",
            SegmentType::Dtc => "RD",
            SegmentType::Ffmux => "RF",
            SegmentType::Ges => "RG",
            SegmentType::Mwb => "RM",
            SegmentType::Sot => "RS",
            SegmentType::Xpl => "RX",
        }
    }
}

impl fmt::Display for SegmentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segment_name())
    }
}

impl std::str::FromStr for SegmentType {
    type Err = UdsError;

    fn from_str(s: &str) -> Result<Self> {
        SegmentType::ALL
            .into_iter()
            .find(|kind| kind.segment_name().eq_ignore_ascii_case(s))
            .ok_or_else(|| UdsError::UnknownSegment(s.to_string()))
    }
}

/// Decode kind stored in the low six bits of a data type id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    FloatScaled,
    Binary1,
    Integer1,
    ValueName,
    FixedEncoding,
    Binary2,
    MuxTable,
    HexBytes,
    String,
    HexScaled,
    Integer2,
    /// Explicitly invalid (0x3F) or any kind this decoder does not know
    Invalid,
}

impl DataType {
    /// Bit marking a little-endian (byte swapped) value
    pub const MASK_SWAPPED: u32 = 0x40;
    /// Bit marking a two's complement value
    pub const MASK_SIGNED: u32 = 0x80;
    /// Bits holding the kind itself
    pub const MASK_KIND: u32 = 0x3F;

    /// Map the kind bits of a data type id to a known kind
    pub fn from_kind(kind: u32) -> Option<DataType> {
        let data_type = match kind {
            0 => DataType::FloatScaled,
            1 => DataType::Binary1,
            2 => DataType::Integer1,
            3 => DataType::ValueName,
            4 => DataType::FixedEncoding,
            5 => DataType::Binary2,
            6 => DataType::MuxTable,
            7 => DataType::HexBytes,
            8 => DataType::String,
            9 => DataType::HexScaled,
            10 => DataType::Integer2,
            0x3F => DataType::Invalid,
            _ => return None,
        };
        Some(data_type)
    }

    /// Decode kind of a full data type id, unknown kinds become `Invalid`
    pub fn from_type_id(type_id: u32) -> DataType {
        DataType::from_kind(type_id & Self::MASK_KIND).unwrap_or(DataType::Invalid)
    }

    /// Human readable name of a data type id, including its flag bits
    pub fn name(type_id: u32) -> String {
        let kind = type_id & Self::MASK_KIND;
        let mut name = match DataType::from_kind(kind) {
            Some(data_type) => format!("{:?}", data_type),
            None => kind.to_string(),
        };
        if type_id & Self::MASK_SWAPPED != 0 {
            name.push_str(" (Swapped)");
        }
        if type_id & Self::MASK_SIGNED != 0 {
            name.push_str(" (Signed)");
        }
        name
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}
