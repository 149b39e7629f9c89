//! Shared lookup tables
//!
//! Text and unit maps, the enumeration (DOP) and multiplexer (MUX) row
//! groups and the fixed converter registry. Built once by the reader and
//! then only read; descriptors and converters borrow from it while
//! decoding.

use crate::config::ReaderConfig;
use crate::container::extract_file_segment;
use crate::fixed::{build_registry, FixedConverter, FIXED_CONVERTERS};
use crate::types::{Result, Row, UdsError};
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Lookup tables shared by all descriptors
#[derive(Debug)]
pub struct LookupTables {
    text_map: HashMap<u32, Vec<String>>,
    unit_map: HashMap<u32, Vec<String>>,
    value_name_groups: HashMap<u32, Vec<Row>>,
    mux_groups: HashMap<u32, Vec<Row>>,
    fixed_converters: HashMap<u32, &'static FixedConverter>,
    unknown_text_key: u32,
}

impl LookupTables {
    /// Load all tables from a database directory
    ///
    /// The text table is the single `TTText*` container (segment TXT), the
    /// unit table the single `Unit*` container (segment UNT). Enumerations
    /// come from `TTDOP` (segment DOP), multiplexers from `MUX` (segment MUX).
    pub fn load(dir: &Path, config: &ReaderConfig) -> Result<Self> {
        let text_file = find_unique_file(dir, "TTText", config.extension())?;
        log::info!("Loading text table: {:?}", text_file);
        let text_rows = extract_file_segment(&[&text_file], "TXT")?;

        let unit_file = find_unique_file(dir, "Unit", config.extension())?;
        log::info!("Loading unit table: {:?}", unit_file);
        let unit_rows = extract_file_segment(&[&unit_file], "UNT")?;

        let dop_file = dir.join("TTDOP").with_extension(config.extension());
        let dop_rows = extract_file_segment(&[&dop_file], "DOP")?;

        let mux_file = dir.join("MUX").with_extension(config.extension());
        let mux_rows = extract_file_segment(&[&mux_file], "MUX")?;

        Self::from_rows(text_rows, unit_rows, dop_rows, mux_rows, config)
    }

    /// Build the tables from already extracted segment rows
    pub fn from_rows(
        text_rows: Vec<Row>,
        unit_rows: Vec<Row>,
        dop_rows: Vec<Row>,
        mux_rows: Vec<Row>,
        config: &ReaderConfig,
    ) -> Result<Self> {
        let tables = Self {
            text_map: key_value_map(text_rows, "TXT", config.reject_duplicate_keys)?,
            unit_map: key_value_map(unit_rows, "UNT", config.reject_duplicate_keys)?,
            value_name_groups: group_rows(dop_rows, "DOP")?,
            mux_groups: group_rows(mux_rows, "MUX")?,
            fixed_converters: build_registry(FIXED_CONVERTERS),
            unknown_text_key: config.unknown_text_key,
        };

        log::info!(
            "Loaded {} texts, {} units, {} enumerations, {} multiplexers",
            tables.text_map.len(),
            tables.unit_map.len(),
            tables.value_name_groups.len(),
            tables.mux_groups.len()
        );
        Ok(tables)
    }

    /// Start an empty table set, mostly useful for tests and tools
    pub fn builder() -> LookupTablesBuilder {
        LookupTablesBuilder::default()
    }

    /// First column of a text entry
    pub fn text(&self, key: u32) -> Option<&str> {
        self.text_entry(key).and_then(|entry| entry.first()).map(String::as_str)
    }

    /// All columns of a text entry
    pub fn text_entry(&self, key: u32) -> Option<&[String]> {
        self.text_map.get(&key).map(Vec::as_slice)
    }

    /// First column of a unit entry
    pub fn unit(&self, key: u32) -> Option<&str> {
        self.unit_map
            .get(&key)
            .and_then(|entry| entry.first())
            .map(String::as_str)
    }

    /// Label used for raw values without a matching enumeration or multiplexer entry
    pub fn unknown_text(&self) -> &str {
        self.text(self.unknown_text_key).unwrap_or_default()
    }

    /// Enumeration rows of group `key`, in file order
    pub fn value_name_rows(&self, key: u32) -> &[Row] {
        self.value_name_groups.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Multiplexer rows of group `key`, in file order
    pub fn mux_rows(&self, key: u32) -> &[Row] {
        self.mux_groups.get(&key).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn fixed_converter(&self, id: u32) -> Option<&'static FixedConverter> {
        self.fixed_converters.get(&id).copied()
    }

    pub fn text_count(&self) -> usize {
        self.text_map.len()
    }

    pub fn unit_count(&self) -> usize {
        self.unit_map.len()
    }

    pub fn value_name_group_count(&self) -> usize {
        self.value_name_groups.len()
    }

    pub fn mux_group_count(&self) -> usize {
        self.mux_groups.len()
    }

    pub fn fixed_converter_count(&self) -> usize {
        self.fixed_converters.len()
    }
}

/// Incremental construction of [`LookupTables`]
pub struct LookupTablesBuilder {
    tables: LookupTables,
}

impl Default for LookupTablesBuilder {
    fn default() -> Self {
        Self {
            tables: LookupTables {
                text_map: HashMap::new(),
                unit_map: HashMap::new(),
                value_name_groups: HashMap::new(),
                mux_groups: HashMap::new(),
                fixed_converters: build_registry(FIXED_CONVERTERS),
                unknown_text_key: ReaderConfig::default().unknown_text_key,
            },
        }
    }
}

impl LookupTablesBuilder {
    pub fn text(mut self, key: u32, text: &str) -> Self {
        self.tables.text_map.insert(key, vec![text.to_string()]);
        self
    }

    pub fn text_entry(mut self, key: u32, columns: &[&str]) -> Self {
        let columns = columns.iter().map(|c| c.to_string()).collect();
        self.tables.text_map.insert(key, columns);
        self
    }

    pub fn unit(mut self, key: u32, unit: &str) -> Self {
        self.tables.unit_map.insert(key, vec![unit.to_string()]);
        self
    }

    /// Append an enumeration row; field 0 is the group key
    pub fn value_name_row(mut self, group: u32, row: &[&str]) -> Self {
        self.tables
            .value_name_groups
            .entry(group)
            .or_default()
            .push(to_row(group, row));
        self
    }

    /// Append a multiplexer row; field 0 is the group key
    pub fn mux_row(mut self, group: u32, row: &[&str]) -> Self {
        self.tables
            .mux_groups
            .entry(group)
            .or_default()
            .push(to_row(group, row));
        self
    }

    pub fn unknown_text_key(mut self, key: u32) -> Self {
        self.tables.unknown_text_key = key;
        self
    }

    pub fn build(self) -> LookupTables {
        self.tables
    }
}

fn to_row(group: u32, fields: &[&str]) -> Row {
    std::iter::once(group.to_string())
        .chain(fields.iter().map(|f| f.to_string()))
        .collect()
}

/// Key → remaining columns; every row needs a numeric key and one value
fn key_value_map(
    rows: Vec<Row>,
    segment: &str,
    reject_duplicates: bool,
) -> Result<HashMap<u32, Vec<String>>> {
    let mut map = HashMap::with_capacity(rows.len());
    for mut row in rows {
        if row.len() < 2 {
            return Err(UdsError::MalformedRow {
                segment: segment.to_string(),
                reason: format!("expected key and value, got {} fields", row.len()),
            });
        }
        let key = parse_key(&row[0], segment)?;
        let columns = row.split_off(1);

        if map.insert(key, columns).is_some() {
            if reject_duplicates {
                return Err(UdsError::DuplicateKey {
                    segment: segment.to_string(),
                    key,
                });
            }
            log::warn!("Duplicate key {} in segment {}, keeping the last one", key, segment);
        }
    }
    Ok(map)
}

/// Group rows by the numeric key in field 0, keeping file order per group
fn group_rows(rows: Vec<Row>, segment: &str) -> Result<HashMap<u32, Vec<Row>>> {
    let mut groups: HashMap<u32, Vec<Row>> = HashMap::new();
    for row in rows {
        let key = parse_key(row.first().map_or("", String::as_str), segment)?;
        groups.entry(key).or_default().push(row);
    }
    Ok(groups)
}

fn parse_key(field: &str, segment: &str) -> Result<u32> {
    field.trim().parse().map_err(|_| UdsError::MalformedRow {
        segment: segment.to_string(),
        reason: format!("invalid key '{}'", field),
    })
}

/// The single file in `dir` named `<prefix>*.<extension>`
///
/// Matching ignores ASCII case. Zero or several matches are an error.
pub(crate) fn find_unique_file(dir: &Path, prefix: &str, extension: &str) -> Result<PathBuf> {
    let mut matches = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if !path.is_file() {
            continue;
        }
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let stem_matches = name
            .get(..prefix.len())
            .map_or(false, |head| head.eq_ignore_ascii_case(prefix));
        let extension_matches = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case(extension));
        if stem_matches && extension_matches {
            matches.push(path);
        }
    }

    if matches.len() != 1 {
        return Err(UdsError::AmbiguousFile {
            pattern: format!("{}*.{}", prefix, extension),
            found: matches.len(),
        });
    }
    Ok(matches.remove(0))
}
