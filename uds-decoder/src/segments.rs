//! Master line tables of the seven dataset kinds
//!
//! Every dataset kind has one master file (`RA`, `RD`, ... `RX`). ECU
//! specific files only hold 1-based references into those tables, so
//! resolving an ECU file means extracting its segment and looking every
//! reference up here.

use crate::config::ReaderConfig;
use crate::container::extract_file_segment;
use crate::descriptor::{parse_u32, DataTypeEntry};
use crate::tables::LookupTables;
use crate::types::{Result, Row, SegmentType, UdsError};
use std::collections::HashMap;
use std::path::Path;

/// Minimum field count of a measurement block master row
const MWB_FIELDS: usize = 14;

/// Offset of the descriptor in a measurement block master row
const MWB_DESCRIPTOR_OFFSET: usize = 2;

/// A resolved master row
#[derive(Debug, Clone)]
pub enum ParseInfo {
    /// Any dataset kind without extra resolution
    Base(Row),
    /// Measurement block with name and descriptor
    Mwb(MwbInfo),
}

impl ParseInfo {
    /// The master row this entry was resolved from
    pub fn row(&self) -> &Row {
        match self {
            ParseInfo::Base(row) => row,
            ParseInfo::Mwb(info) => &info.row,
        }
    }

    pub fn as_mwb(&self) -> Option<&MwbInfo> {
        match self {
            ParseInfo::Mwb(info) => Some(info),
            ParseInfo::Base(_) => None,
        }
    }
}

/// Measurement block: service id, display name and decode descriptor
#[derive(Debug, Clone)]
pub struct MwbInfo {
    pub row: Row,
    pub service_id: u32,
    /// All language columns of the name text
    pub name: Vec<String>,
    pub data_type: DataTypeEntry,
}

impl MwbInfo {
    /// Build from a master row: `name key, service id, descriptor...`
    pub fn from_row(row: &[String], tables: &LookupTables) -> Result<Self> {
        if row.len() < MWB_FIELDS {
            return Err(UdsError::RowTooShort {
                needed: MWB_FIELDS,
                actual: row.len(),
            });
        }

        let name_key = parse_u32(&row[0]).ok_or_else(|| UdsError::InvalidNumber(row[0].clone()))?;
        let name = tables
            .text_entry(name_key)
            .ok_or(UdsError::TextNotFound(name_key))?
            .to_vec();
        let service_id = parse_u32(&row[1]).ok_or_else(|| UdsError::InvalidNumber(row[1].clone()))?;
        let data_type = DataTypeEntry::from_row(row, MWB_DESCRIPTOR_OFFSET, tables)?;

        Ok(Self {
            row: row.to_vec(),
            service_id,
            name,
            data_type,
        })
    }

    /// Default display name (first language column)
    pub fn display_name(&self) -> &str {
        self.name.first().map_or("", String::as_str)
    }
}

/// Master tables of all dataset kinds
#[derive(Debug, Default)]
pub struct SegmentStore {
    tables: HashMap<SegmentType, Vec<Row>>,
}

impl SegmentStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the master table of every dataset kind from `dir`
    pub fn load(dir: &Path, config: &ReaderConfig) -> Result<Self> {
        let mut store = Self::new();
        for kind in SegmentType::ALL {
            let file = dir.join(kind.file_name()).with_extension(config.extension());
            let rows = extract_file_segment(&[&file], kind.segment_name())?;
            log::info!("Loaded {} master rows for {} from {:?}", rows.len(), kind, file);
            store.insert(kind, rows);
        }
        Ok(store)
    }

    /// Replace the master table of `kind`
    pub fn insert(&mut self, kind: SegmentType, rows: Vec<Row>) {
        self.tables.insert(kind, rows);
    }

    /// Master rows of `kind`, empty when not loaded
    pub fn master_rows(&self, kind: SegmentType) -> &[Row] {
        self.tables.get(&kind).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn row_count(&self, kind: SegmentType) -> usize {
        self.master_rows(kind).len()
    }

    /// Extract the `kind` segment of `files` and resolve every reference
    pub fn resolve<P: AsRef<Path>>(
        &self,
        files: &[P],
        kind: SegmentType,
        tables: &LookupTables,
    ) -> Result<Vec<ParseInfo>> {
        let rows = extract_file_segment(files, kind.segment_name())?;
        self.resolve_rows(&rows, kind, tables)
    }

    /// Resolve already extracted reference rows
    ///
    /// Field 0 of each row is a 1-based index into the master table. Any bad
    /// reference fails the whole call.
    pub fn resolve_rows(&self, rows: &[Row], kind: SegmentType, tables: &LookupTables) -> Result<Vec<ParseInfo>> {
        let master = self.master_rows(kind);

        let resolved = rows
            .iter()
            .map(|row| {
                if row.len() < 2 {
                    return Err(UdsError::RowTooShort {
                        needed: 2,
                        actual: row.len(),
                    });
                }
                let index = parse_u32(&row[0]).ok_or_else(|| UdsError::InvalidNumber(row[0].clone()))?;
                let master_row = index
                    .checked_sub(1)
                    .and_then(|i| master.get(i as usize))
                    .ok_or(UdsError::IndexOutOfRange {
                        index,
                        len: master.len(),
                    })?;

                match kind {
                    SegmentType::Mwb => MwbInfo::from_row(master_row, tables).map(ParseInfo::Mwb),
                    _ => Ok(ParseInfo::Base(master_row.clone())),
                }
            })
            .collect::<Result<Vec<_>>>()?;

        log::debug!("Resolved {} {} references", resolved.len(), kind);
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str) -> Row {
        text.split(',').map(str::to_string).collect()
    }

    fn tables() -> LookupTables {
        LookupTables::builder()
            .text_entry(12, &["RPM", "Drehzahl"])
            .unit(50, "rpm")
            .build()
    }

    fn store() -> SegmentStore {
        let mut store = SegmentStore::new();
        store.insert(SegmentType::Mwb, vec![
            row("12,1,,0,0.25,,,50,0,0,16,,,"),
            row("99,2,,0,,,,,,,,,,"),
            row("12,3,,0"),
        ]);
        store.insert(SegmentType::Dtc, vec![row("a,b"), row("c,d")]);
        store
    }

    #[test]
    fn test_resolve_base_rows() {
        let store = store();
        let resolved = store
            .resolve_rows(&[row("2,x"), row("1,y")], SegmentType::Dtc, &tables())
            .unwrap();
        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].row(), &row("c,d"));
        assert_eq!(resolved[1].row(), &row("a,b"));
        assert!(resolved[0].as_mwb().is_none());
    }

    #[test]
    fn test_resolve_mwb_row() {
        let tables = tables();
        let resolved = store()
            .resolve_rows(&[row("1,0")], SegmentType::Mwb, &tables)
            .unwrap();
        let info = resolved[0].as_mwb().unwrap();

        assert_eq!(info.service_id, 1);
        assert_eq!(info.display_name(), "RPM");
        assert_eq!(info.name.len(), 2);
        assert_eq!(info.data_type.unit_text.as_deref(), Some("rpm"));
        assert_eq!(info.data_type.decode(&tables, &[0x00, 0x64]), "25 rpm");
    }

    #[test]
    fn test_index_out_of_range() {
        let store = store();
        let tables = tables();
        let err = store.resolve_rows(&[row("0,x")], SegmentType::Dtc, &tables).unwrap_err();
        assert!(matches!(err, UdsError::IndexOutOfRange { index: 0, len: 2 }));

        let err = store.resolve_rows(&[row("3,x")], SegmentType::Dtc, &tables).unwrap_err();
        assert!(matches!(err, UdsError::IndexOutOfRange { index: 3, len: 2 }));

        // nothing loaded for this kind
        let err = store.resolve_rows(&[row("1,x")], SegmentType::Sot, &tables).unwrap_err();
        assert!(matches!(err, UdsError::IndexOutOfRange { index: 1, len: 0 }));
    }

    #[test]
    fn test_malformed_reference_rows() {
        let store = store();
        let tables = tables();
        let err = store.resolve_rows(&[row("1")], SegmentType::Dtc, &tables).unwrap_err();
        assert!(matches!(err, UdsError::RowTooShort { needed: 2, actual: 1 }));

        let err = store.resolve_rows(&[row("one,x")], SegmentType::Dtc, &tables).unwrap_err();
        assert!(matches!(err, UdsError::InvalidNumber(_)));
    }

    #[test]
    fn test_bad_mwb_row_fails_call() {
        let store = store();
        let tables = tables();

        let err = store.resolve_rows(&[row("2,x")], SegmentType::Mwb, &tables).unwrap_err();
        assert!(matches!(err, UdsError::TextNotFound(99)));

        let err = store.resolve_rows(&[row("3,x")], SegmentType::Mwb, &tables).unwrap_err();
        assert!(matches!(err, UdsError::RowTooShort { needed: 14, .. }));

        // the store itself stays usable
        assert!(store.resolve_rows(&[row("1,x")], SegmentType::Mwb, &tables).is_ok());
    }

    #[test]
    fn test_row_count() {
        let store = store();
        assert_eq!(store.row_count(SegmentType::Mwb), 3);
        assert_eq!(store.row_count(SegmentType::Xpl), 0);
    }
}
