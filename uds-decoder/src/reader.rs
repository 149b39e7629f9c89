//! Main reader API
//!
//! [`UdsReader`] owns a fully loaded database: redirections, lookup tables,
//! chassis codes and the master tables of every dataset kind. It is built in
//! one go by [`UdsReader::init`] and never changes afterwards, so a shared
//! reference can decode from any number of threads.

use crate::config::ReaderConfig;
use crate::descriptor::DataTypeEntry;
use crate::fixed::FIXED_CONVERTERS;
use crate::resolve::{load_chassis_map, FileResolver};
use crate::segments::{ParseInfo, SegmentStore};
use crate::tables::LookupTables;
use crate::types::{Result, SegmentType};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write;
use std::path::{Path, PathBuf};

/// Buffers fed to every converter by [`UdsReader::test_fixed_types`]
const PROBE_BUFFERS: [&[u8]; 6] = [
    &[0x10],
    &[0x10, 0x20],
    &[0xFF, 0x10],
    &[0xFF, 0x10, 0x20],
    &[0xFF, 0xAB, 0xCD],
    &[
        0xFF, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xBC, 0xDE, 0xF0, 0x12, 0x34, 0x56, 0x78, 0x9A, 0xCD, 0xEF, 0x01,
        0x23, 0x45, 0x67, 0x89,
    ],
];

/// A loaded UDS database
#[derive(Debug)]
pub struct UdsReader {
    dir: PathBuf,
    config: ReaderConfig,
    resolver: FileResolver,
    tables: LookupTables,
    chassis_map: HashMap<String, String>,
    segments: SegmentStore,
}

impl UdsReader {
    /// Load the database in `dir`
    ///
    /// Load order is redirections, text and unit maps, converter registry,
    /// enumerations, multiplexers, chassis codes and finally the seven
    /// master tables. Any failure aborts the load; there is no partially
    /// loaded reader.
    ///
    /// # Example
    /// ```no_run
    /// use uds_decoder::{ReaderConfig, UdsReader};
    /// use std::path::Path;
    ///
    /// let reader = UdsReader::init(Path::new("db"), ReaderConfig::default()).unwrap();
    /// println!("{:?}", reader.stats());
    /// ```
    pub fn init(dir: &Path, config: ReaderConfig) -> Result<Self> {
        log::info!("Loading UDS database from {:?}", dir);

        let resolver = FileResolver::load(dir, &config)?;
        let tables = LookupTables::load(dir, &config)?;
        let chassis_map = load_chassis_map(&dir.join(&config.chassis_file))?;
        let segments = SegmentStore::load(dir, &config)?;

        let reader = Self {
            dir: dir.to_path_buf(),
            config,
            resolver,
            tables,
            chassis_map,
            segments,
        };
        log::info!("UDS database loaded: {:?}", reader.stats());
        Ok(reader)
    }

    /// Load with the default configuration
    pub fn open(dir: &Path) -> Result<Self> {
        Self::init(dir, ReaderConfig::default())
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn config(&self) -> &ReaderConfig {
        &self.config
    }

    pub fn tables(&self) -> &LookupTables {
        &self.tables
    }

    pub fn segments(&self) -> &SegmentStore {
        &self.segments
    }

    /// Platform of a two character chassis code
    pub fn chassis_type(&self, code: &str) -> Option<&str> {
        self.chassis_map.get(code).map(String::as_str)
    }

    /// Containers making up the ECU file `name`, see [`FileResolver::file_list`]
    pub fn file_list(&self, name: &str) -> Result<Vec<PathBuf>> {
        self.resolver.file_list(name)
    }

    /// Resolve the `kind` references of `files` against the master tables
    pub fn extract_segment<P: AsRef<Path>>(&self, files: &[P], kind: SegmentType) -> Result<Vec<ParseInfo>> {
        self.segments.resolve(files, kind, &self.tables)
    }

    /// [`file_list`](Self::file_list) followed by [`extract_segment`](Self::extract_segment)
    pub fn parse_file(&self, name: &str, kind: SegmentType) -> Result<Vec<ParseInfo>> {
        let files = self.file_list(name)?;
        self.extract_segment(&files, kind)
    }

    /// Build a descriptor from `row` starting at `offset`
    pub fn data_type_entry(&self, row: &[String], offset: usize) -> Result<DataTypeEntry> {
        DataTypeEntry::from_row(row, offset, &self.tables)
    }

    /// Render an ECU response with a descriptor built from this database
    pub fn decode(&self, entry: &DataTypeEntry, data: &[u8]) -> String {
        entry.decode(&self.tables, data)
    }

    /// Render every registered converter against a fixed set of buffers
    ///
    /// One line per converter: its first id followed by the quoted results.
    pub fn test_fixed_types(&self) -> String {
        let mut out = String::new();
        for entry in FIXED_CONVERTERS {
            let id = entry.ids.first().copied().unwrap_or_default();
            let _ = write!(out, "{}:", id);
            for probe in PROBE_BUFFERS {
                let _ = write!(out, " \"{}\"", entry.converter.evaluate(&self.tables, probe));
            }
            out.push('\n');
        }
        out
    }

    /// Sizes of the loaded tables
    pub fn stats(&self) -> DatabaseStats {
        DatabaseStats {
            num_texts: self.tables.text_count(),
            num_units: self.tables.unit_count(),
            num_value_name_groups: self.tables.value_name_group_count(),
            num_mux_groups: self.tables.mux_group_count(),
            num_fixed_converters: self.tables.fixed_converter_count(),
            num_redirects: self.resolver.redirect_count(),
            num_chassis_codes: self.chassis_map.len(),
            master_rows: SegmentType::ALL
                .into_iter()
                .map(|kind| (kind, self.segments.row_count(kind)))
                .collect(),
        }
    }
}

/// Statistics about a loaded database
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DatabaseStats {
    pub num_texts: usize,
    pub num_units: usize,
    /// Enumeration groups (DOP)
    pub num_value_name_groups: usize,
    /// Multiplexer groups (MUX)
    pub num_mux_groups: usize,
    pub num_fixed_converters: usize,
    pub num_redirects: usize,
    pub num_chassis_codes: usize,
    /// Master table size per dataset kind
    pub master_rows: BTreeMap<SegmentType, usize>,
}
