//! UDS Database Decoder Library
//!
//! Reads the encrypted, segmented diagnostic database of a vehicle
//! diagnostic tool and renders raw ECU response payloads as display text.
//!
//! # Architecture
//!
//! - Containers are password protected zip archives holding one
//!   Windows-1252 text member split into `[NAME]` ... `[/NAME]` segments
//! - Lookup tables (texts, units, enumerations, multiplexers, fixed
//!   converters) are built once at load time
//! - A [`DataTypeEntry`] describes how to render one field; decoding is a
//!   pure function of descriptor and bytes that never fails
//!
//! The library does NOT:
//! - Talk to ECUs or send diagnostic requests
//! - Modify the database
//!
//! Command line access lives in the application layer (uds-cli).
//!
//! # Example Usage
//!
//! ```no_run
//! use uds_decoder::{ParseInfo, SegmentType, UdsReader};
//! use std::path::Path;
//!
//! let reader = UdsReader::open(Path::new("db")).unwrap();
//!
//! for info in reader.parse_file("EV_ECM20TDI01104L906018DQ", SegmentType::Mwb).unwrap() {
//!     if let ParseInfo::Mwb(mwb) = info {
//!         let text = reader.decode(&mwb.data_type, &[0x00, 0x64]);
//!         println!("{} ({:04X}): {}", mwb.display_name(), mwb.service_id, text);
//!     }
//! }
//! ```

// Public modules
pub mod config;
pub mod container;
pub mod descriptor;
pub mod encoding;
pub mod fixed;
pub mod reader;
pub mod resolve;
pub mod segments;
pub mod tables;
pub mod types;

// Re-export main types for convenience
pub use config::ReaderConfig;
pub use descriptor::{DataTypeEntry, MuxEntry, TypeDetail, ValueName};
pub use fixed::{FixedConverter, Formula};
pub use reader::{DatabaseStats, UdsReader};
pub use resolve::FileResolver;
pub use segments::{MwbInfo, ParseInfo, SegmentStore};
pub use tables::LookupTables;
pub use types::{DataType, Result, Row, SegmentType, UdsError};

// Internal modules (not exposed in public API)
mod decode;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
