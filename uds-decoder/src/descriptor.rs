//! Decode descriptors
//!
//! A [`DataTypeEntry`] is the recipe for rendering one field of an ECU
//! response. It is built from a database row and owns everything it needs
//! apart from the shared [`LookupTables`]: its enumeration cases, its
//! multiplexer cases (each with a nested descriptor) or a reference to a
//! registered fixed converter.

use crate::fixed::FixedConverter;
use crate::tables::LookupTables;
use crate::types::{DataType, Result, Row, UdsError};

/// Number of fields a descriptor occupies in a row
pub const DESCRIPTOR_FIELDS: usize = 10;

/// Minimum row length of an enumeration case
const VALUE_NAME_FIELDS: usize = 5;

/// Minimum row length of a multiplexer case
const MUX_ENTRY_FIELDS: usize = 17;

/// Offset of the nested descriptor in a multiplexer row
const MUX_DESCRIPTOR_OFFSET: usize = 7;

/// Decimal bounds this long are not parsed
const MAX_BOUND_LENGTH: usize = 34;

/// Kind specific part of a descriptor
#[derive(Debug, Clone)]
pub enum TypeDetail {
    None,
    ValueNames(Vec<ValueName>),
    MuxEntries(Vec<MuxEntry>),
    Fixed {
        id: u32,
        converter: &'static FixedConverter,
    },
}

/// One enumeration case: inclusive bounds and a display name
#[derive(Debug, Clone, PartialEq)]
pub struct ValueName {
    pub row: Row,
    pub min: Option<i64>,
    pub max: Option<i64>,
    pub name: Option<Vec<String>>,
}

impl ValueName {
    /// Build an enumeration case from a DOP row
    ///
    /// Unparseable bounds are left open and an unresolved name key leaves
    /// the case without a name; neither is an error.
    pub fn from_row(row: &[String], tables: &LookupTables) -> Self {
        let mut value_name = Self {
            row: row.to_vec(),
            min: None,
            max: None,
            name: None,
        };
        if row.len() < VALUE_NAME_FIELDS {
            return value_name;
        }

        value_name.min = parse_bound(&row[1]);
        value_name.max = parse_bound(&row[2]);
        value_name.name = parse_u32(&row[3])
            .and_then(|key| tables.text_entry(key))
            .map(<[String]>::to_vec);
        value_name
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min.map_or(true, |min| value >= min) && self.max.map_or(true, |max| value <= max)
    }

    /// First column of the name, empty when the case has none
    pub fn display_name(&self) -> &str {
        self.name
            .as_ref()
            .and_then(|name| name.first())
            .map_or("", String::as_str)
    }
}

/// One multiplexer case: bounds or default, and the descriptor to apply
#[derive(Debug, Clone)]
pub struct MuxEntry {
    pub row: Row,
    pub is_default: bool,
    pub min: Option<i32>,
    pub max: Option<i32>,
    pub data_type: DataTypeEntry,
}

impl MuxEntry {
    /// Build a multiplexer case from a MUX row
    ///
    /// Fields 5 and 6 hold the bounds, `D` in either marks the default case.
    /// The nested descriptor starts at field 7; failing to build it fails
    /// the case.
    pub fn from_row(row: &[String], tables: &LookupTables) -> Result<Self> {
        Self::build(row, tables, &mut Vec::new())
    }

    fn build(row: &[String], tables: &LookupTables, open_groups: &mut Vec<u32>) -> Result<Self> {
        if row.len() < MUX_DESCRIPTOR_OFFSET + 1 {
            return Err(UdsError::RowTooShort {
                needed: MUX_DESCRIPTOR_OFFSET + 1,
                actual: row.len(),
            });
        }

        let mut is_default = false;
        let mut bound = |field: &str| {
            if field.eq_ignore_ascii_case("D") {
                is_default = true;
                None
            } else {
                field.trim().parse::<i32>().ok()
            }
        };
        let min = bound(&row[5]);
        let max = bound(&row[6]);

        Ok(Self {
            row: row.to_vec(),
            is_default,
            min,
            max,
            data_type: DataTypeEntry::build(row, MUX_DESCRIPTOR_OFFSET, tables, open_groups)?,
        })
    }

    pub fn contains(&self, value: i64) -> bool {
        self.min.map_or(true, |min| value >= i64::from(min))
            && self.max.map_or(true, |max| value <= i64::from(max))
    }
}

/// Decode descriptor for one response field
#[derive(Debug, Clone)]
pub struct DataTypeEntry {
    /// Source row the descriptor was built from
    pub row: Row,
    pub type_id: u32,
    pub data_type: DataType,
    pub swapped: bool,
    pub signed: bool,
    pub byte_offset: Option<u32>,
    pub bit_offset: Option<u32>,
    pub bit_length: Option<u32>,
    pub scale_mult: Option<f64>,
    pub scale_offset: Option<f64>,
    pub scale_div: Option<f64>,
    pub digits: Option<i64>,
    pub unit_text: Option<String>,
    pub name_detail: Option<Vec<String>>,
    pub detail: TypeDetail,
}

impl DataTypeEntry {
    /// Create a bare descriptor for a data type id
    pub fn new(type_id: u32) -> Self {
        Self {
            row: Row::new(),
            type_id,
            data_type: DataType::from_type_id(type_id),
            swapped: type_id & DataType::MASK_SWAPPED != 0,
            signed: type_id & DataType::MASK_SIGNED != 0,
            byte_offset: None,
            bit_offset: None,
            bit_length: None,
            scale_mult: None,
            scale_offset: None,
            scale_div: None,
            digits: None,
            unit_text: None,
            name_detail: None,
            detail: TypeDetail::None,
        }
    }

    /// Builder method: position of the field in the response
    pub fn with_position(mut self, byte_offset: u32, bit_offset: u32, bit_length: u32) -> Self {
        self.byte_offset = Some(byte_offset);
        self.bit_offset = Some(bit_offset);
        self.bit_length = Some(bit_length);
        self
    }

    /// Builder method: number of bits to decode
    pub fn with_bit_length(mut self, bit_length: u32) -> Self {
        self.bit_length = Some(bit_length);
        self
    }

    /// Builder method: scale pipeline (multiply, add offset, divide)
    pub fn with_scale(mut self, mult: Option<f64>, offset: Option<f64>, div: Option<f64>) -> Self {
        self.scale_mult = mult;
        self.scale_offset = offset;
        self.scale_div = div;
        self
    }

    /// Builder method: number of decimal digits
    pub fn with_digits(mut self, digits: i64) -> Self {
        self.digits = Some(digits);
        self
    }

    /// Builder method: unit appended to the rendered value
    pub fn with_unit(mut self, unit: impl Into<String>) -> Self {
        self.unit_text = Some(unit.into());
        self
    }

    /// Builder method: kind specific detail
    pub fn with_detail(mut self, detail: TypeDetail) -> Self {
        self.detail = detail;
        self
    }

    /// Build a descriptor from the ten fields of `row` starting at `offset`
    ///
    /// Field layout relative to `offset`:
    ///
    /// | field | content                                   |
    /// |-------|-------------------------------------------|
    /// | 0     | extra id (digits, DOP or MUX group)       |
    /// | 1     | data type id                              |
    /// | 2     | scale factor, or fixed converter id       |
    /// | 3     | scale offset                              |
    /// | 4     | scale divisor                             |
    /// | 5     | unit key (0 for none)                     |
    /// | 6-8   | byte offset, bit offset, bit length       |
    /// | 9     | name detail text key                      |
    ///
    /// A multiplexer group that is reached again through its own nested
    /// descriptors fails with [`UdsError::MuxCycle`].
    pub fn from_row(row: &[String], offset: usize, tables: &LookupTables) -> Result<Self> {
        Self::build(row, offset, tables, &mut Vec::new())
    }

    /// `open_groups` holds the multiplexer groups under construction
    fn build(row: &[String], offset: usize, tables: &LookupTables, open_groups: &mut Vec<u32>) -> Result<Self> {
        let needed = offset + DESCRIPTOR_FIELDS;
        if row.len() < needed {
            return Err(UdsError::RowTooShort {
                needed,
                actual: row.len(),
            });
        }
        let field = move |index: usize| row[offset + index].as_str();

        let type_id = parse_u32(field(1)).ok_or_else(|| UdsError::InvalidNumber(field(1).to_string()))?;
        let mut entry = Self::new(type_id);
        entry.row = row.to_vec();

        let extra = parse_int64(field(0));
        entry.byte_offset = parse_u32(field(6));
        entry.bit_offset = parse_u32(field(7));
        entry.bit_length = parse_u32(field(8));

        if let Some(key) = parse_u32(field(9)) {
            let detail = tables.text_entry(key).ok_or(UdsError::TextNotFound(key))?;
            entry.name_detail = Some(detail.to_vec());
        }

        if let Some(key) = parse_u32(field(5)).filter(|&key| key > 0) {
            entry.unit_text = Some(resolve_unit(tables, key)?);
        }

        match entry.data_type {
            DataType::FloatScaled | DataType::Integer1 => {
                entry.scale_mult = parse_f64(field(2));
                entry.scale_offset = parse_f64(field(3));
                entry.scale_div = parse_f64(field(4));
                entry.digits = extra;
            }
            DataType::ValueName => {
                let rows = group_id(extra).map_or(&[][..], |group| tables.value_name_rows(group));
                let value_names = rows
                    .iter()
                    .filter(|row| row.len() >= VALUE_NAME_FIELDS)
                    .map(|row| ValueName::from_row(row, tables))
                    .collect();
                entry.detail = TypeDetail::ValueNames(value_names);
            }
            DataType::FixedEncoding => {
                let id = parse_u32(field(2)).ok_or_else(|| UdsError::InvalidNumber(field(2).to_string()))?;
                let converter = tables.fixed_converter(id).ok_or(UdsError::ConverterNotFound(id))?;
                if let Some(formula) = converter.formula() {
                    entry.digits = formula.digits.map(i64::from);
                    entry.scale_offset = formula.offset;
                    entry.scale_mult = formula.mult;
                    if let Some(unit_key) = formula.unit_key {
                        entry.unit_text = Some(resolve_unit(tables, unit_key)?);
                    }
                }
                entry.detail = TypeDetail::Fixed { id, converter };
            }
            DataType::MuxTable => {
                let group = group_id(extra);
                if let Some(group) = group {
                    if open_groups.contains(&group) {
                        return Err(UdsError::MuxCycle(group));
                    }
                    open_groups.push(group);
                }

                let rows = group.map_or(&[][..], |group| tables.mux_rows(group));
                let mux_entries = rows
                    .iter()
                    .filter(|row| row.len() >= MUX_ENTRY_FIELDS)
                    .map(|row| MuxEntry::build(row, tables, open_groups))
                    .collect::<Result<Vec<_>>>();

                if group.is_some() {
                    open_groups.pop();
                }
                entry.detail = TypeDetail::MuxEntries(mux_entries?);
            }
            _ => {}
        }

        Ok(entry)
    }

    /// Human readable name of the data type id
    pub fn type_name(&self) -> String {
        DataType::name(self.type_id)
    }

    pub fn value_names(&self) -> &[ValueName] {
        match &self.detail {
            TypeDetail::ValueNames(value_names) => value_names,
            _ => &[],
        }
    }

    pub fn mux_entries(&self) -> &[MuxEntry] {
        match &self.detail {
            TypeDetail::MuxEntries(mux_entries) => mux_entries,
            _ => &[],
        }
    }

    pub fn fixed_converter(&self) -> Option<&'static FixedConverter> {
        match self.detail {
            TypeDetail::Fixed { converter, .. } => Some(converter),
            _ => None,
        }
    }
}

fn resolve_unit(tables: &LookupTables, key: u32) -> Result<String> {
    tables
        .unit(key)
        .map(str::to_string)
        .ok_or(UdsError::UnitNotFound(key))
}

fn group_id(extra: Option<i64>) -> Option<u32> {
    extra.and_then(|value| u32::try_from(value).ok())
}

/// Unsigned decimal field, `None` when empty or not a number
pub(crate) fn parse_u32(text: &str) -> Option<u32> {
    text.trim().parse().ok()
}

fn parse_f64(text: &str) -> Option<f64> {
    text.trim().parse().ok()
}

/// Signed integer field: decimal, or hex with `0x`, `&H` or `#` prefix
pub fn parse_int64(text: &str) -> Option<i64> {
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let hex = text
        .strip_prefix("0x")
        .or_else(|| text.strip_prefix("0X"))
        .or_else(|| text.strip_prefix("&h"))
        .or_else(|| text.strip_prefix("&H"))
        .or_else(|| text.strip_prefix('#'));
    match hex {
        Some(digits) => u64::from_str_radix(digits, 16).ok().map(|v| v as i64),
        None => text.parse().ok(),
    }
}

/// Enumeration bound
///
/// An even-length value with a leading zero and no `0x` prefix is bare hex
/// (`"0100"` is 256); anything else shorter than 34 characters goes
/// through [`parse_int64`].
fn parse_bound(text: &str) -> Option<i64> {
    if text.len() >= 2 && text.len() % 2 == 0 && !text.starts_with("0x") && text.starts_with('0') {
        return u64::from_str_radix(text.trim(), 16).ok().map(|v| v as i64);
    }
    if text.len() < MAX_BOUND_LENGTH {
        return parse_int64(text);
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(text: &str) -> Row {
        text.split(',').map(str::to_string).collect()
    }

    fn tables() -> LookupTables {
        LookupTables::builder()
            .text(12, "RPM")
            .text_entry(40, &["Off", "Aus"])
            .text(41, "On")
            .unit(1, "%")
            .unit(3, "°C")
            .unit(21, "/min")
            .unit(50, "rpm")
            .value_name_row(7, &["0", "0", "40", "x"])
            .value_name_row(7, &["1", "1", "41", "x"])
            .value_name_row(7, &["short"])
            .build()
    }

    #[test]
    fn test_parse_int64() {
        assert_eq!(parse_int64("42"), Some(42));
        assert_eq!(parse_int64("-7"), Some(-7));
        assert_eq!(parse_int64(" 0x1F "), Some(31));
        assert_eq!(parse_int64("&H10"), Some(16));
        assert_eq!(parse_int64("#FF"), Some(255));
        assert_eq!(parse_int64("0xFFFFFFFFFFFFFFFF"), Some(-1));
        assert_eq!(parse_int64(""), None);
        assert_eq!(parse_int64("1.5"), None);
    }

    #[test]
    fn test_parse_bound() {
        assert_eq!(parse_bound("10"), Some(10));
        assert_eq!(parse_bound("0100"), Some(256));
        assert_eq!(parse_bound("00"), Some(0));
        // odd length with a leading zero is decimal
        assert_eq!(parse_bound("010"), Some(10));
        assert_eq!(parse_bound("0x10"), Some(16));
        assert_eq!(parse_bound(""), None);
        assert_eq!(parse_bound(&"1".repeat(40)), None);
    }

    #[test]
    fn test_float_scaled_fields() {
        let tables = tables();
        let entry = DataTypeEntry::from_row(&row("2,0,0.25,10,2,50,1,0,16,12"), 0, &tables).unwrap();

        assert_eq!(entry.data_type, DataType::FloatScaled);
        assert_eq!(entry.scale_mult, Some(0.25));
        assert_eq!(entry.scale_offset, Some(10.0));
        assert_eq!(entry.scale_div, Some(2.0));
        assert_eq!(entry.digits, Some(2));
        assert_eq!(entry.unit_text.as_deref(), Some("rpm"));
        assert_eq!(entry.byte_offset, Some(1));
        assert_eq!(entry.bit_length, Some(16));
        assert_eq!(entry.name_detail, Some(vec!["RPM".to_string()]));
    }

    #[test]
    fn test_offset_into_row() {
        let tables = tables();
        let entry = DataTypeEntry::from_row(&row("12,1,,130,,,,0,,,8,"), 2, &tables).unwrap();
        assert_eq!(entry.type_id, 130);
        assert_eq!(entry.data_type, DataType::Integer1);
        assert!(entry.signed);
        assert!(!entry.swapped);
        assert_eq!(entry.unit_text, None);
        assert_eq!(entry.bit_length, Some(8));
    }

    #[test]
    fn test_row_too_short() {
        let tables = tables();
        let err = DataTypeEntry::from_row(&row("0,0,0"), 0, &tables).unwrap_err();
        assert!(matches!(err, UdsError::RowTooShort { needed: 10, actual: 3 }));
    }

    #[test]
    fn test_missing_type_id() {
        let tables = tables();
        let err = DataTypeEntry::from_row(&row(",,,,,,,,,"), 0, &tables).unwrap_err();
        assert!(matches!(err, UdsError::InvalidNumber(_)));
    }

    #[test]
    fn test_unresolved_references() {
        let tables = tables();
        let err = DataTypeEntry::from_row(&row(",0,,,,99,,,,"), 0, &tables).unwrap_err();
        assert!(matches!(err, UdsError::UnitNotFound(99)));

        let err = DataTypeEntry::from_row(&row(",0,,,,0,,,,77"), 0, &tables).unwrap_err();
        assert!(matches!(err, UdsError::TextNotFound(77)));

        // unparseable name detail key is ignored
        assert!(DataTypeEntry::from_row(&row(",0,,,,0,,,,x"), 0, &tables).is_ok());
    }

    #[test]
    fn test_value_name_list() {
        let tables = tables();
        let entry = DataTypeEntry::from_row(&row("7,3,,,,,,,,"), 0, &tables).unwrap();
        let value_names = entry.value_names();

        // the short row is skipped
        assert_eq!(value_names.len(), 2);
        assert_eq!(value_names[0].display_name(), "Off");
        assert_eq!(value_names[1].min, Some(1));
        assert!(value_names[1].contains(1));
        assert!(!value_names[1].contains(2));
    }

    #[test]
    fn test_value_name_without_group() {
        let tables = tables();
        let entry = DataTypeEntry::from_row(&row(",3,,,,,,,,"), 0, &tables).unwrap();
        assert!(entry.value_names().is_empty());
        assert!(matches!(entry.detail, TypeDetail::ValueNames(_)));
    }

    #[test]
    fn test_fixed_encoding_inherits_formula() {
        let tables = tables();
        let entry = DataTypeEntry::from_row(&row(",4,12,,,,,,,"), 0, &tables).unwrap();
        assert_eq!(entry.data_type, DataType::FixedEncoding);
        assert_eq!(entry.scale_mult, Some(0.25));
        assert_eq!(entry.unit_text.as_deref(), Some("/min"));
        assert!(entry.fixed_converter().is_some());
    }

    #[test]
    fn test_fixed_encoding_unknown_id() {
        let tables = tables();
        let err = DataTypeEntry::from_row(&row(",4,9999,,,,,,,"), 0, &tables).unwrap_err();
        assert!(matches!(err, UdsError::ConverterNotFound(9999)));

        // unit 26 of converter 16 is not in the table
        let err = DataTypeEntry::from_row(&row(",4,16,,,,,,,"), 0, &tables).unwrap_err();
        assert!(matches!(err, UdsError::UnitNotFound(26)));
    }

    #[test]
    fn test_mux_entries() {
        let tables = LookupTables::builder()
            .unit(3, "°C")
            .mux_row(
                5,
                &["", "", "", "", "1", "1", "", "2", "", "", "", "3", "", "", "8", ""],
            )
            .mux_row(
                5,
                &["", "", "", "", "d", "D", "", "7", "", "", "", "", "", "", "", ""],
            )
            .mux_row(5, &["too", "short"])
            .build();

        let entry = DataTypeEntry::from_row(&row("5,6,,,,,,,,"), 0, &tables).unwrap();
        let mux_entries = entry.mux_entries();
        assert_eq!(mux_entries.len(), 2);

        assert!(!mux_entries[0].is_default);
        assert_eq!(mux_entries[0].min, Some(1));
        assert_eq!(mux_entries[0].max, Some(1));
        assert_eq!(mux_entries[0].data_type.data_type, DataType::Integer1);
        assert_eq!(mux_entries[0].data_type.unit_text.as_deref(), Some("°C"));

        assert!(mux_entries[1].is_default);
        assert_eq!(mux_entries[1].data_type.data_type, DataType::HexBytes);
    }

    #[test]
    fn test_mux_nested_failure_propagates() {
        let tables = LookupTables::builder()
            .mux_row(
                5,
                &["", "", "", "", "1", "1", "", "2", "", "", "", "99", "", "", "", ""],
            )
            .build();
        let err = DataTypeEntry::from_row(&row("5,6,,,,,,,,"), 0, &tables).unwrap_err();
        assert!(matches!(err, UdsError::UnitNotFound(99)));
    }

    #[test]
    fn test_self_referencing_mux_group() {
        let tables = LookupTables::builder()
            .mux_row(
                1,
                &["", "", "", "", "0", "9", "1", "6", "", "", "", "", "", "", "8", ""],
            )
            .build();
        let err = DataTypeEntry::from_row(&row("1,6,,,,,,,,"), 0, &tables).unwrap_err();
        assert!(matches!(err, UdsError::MuxCycle(1)));
    }

    #[test]
    fn test_mux_cycle_through_other_group() {
        let tables = LookupTables::builder()
            .mux_row(
                1,
                &["", "", "", "", "0", "9", "2", "6", "", "", "", "", "", "", "8", ""],
            )
            .mux_row(
                2,
                &["", "", "", "", "0", "9", "1", "6", "", "", "", "", "", "", "8", ""],
            )
            .build();
        let err = DataTypeEntry::from_row(&row("1,6,,,,,,,,"), 0, &tables).unwrap_err();
        assert!(matches!(err, UdsError::MuxCycle(1)));
    }

    #[test]
    fn test_mux_group_reused_by_siblings() {
        // two cases nesting the same leaf group is not a cycle
        let tables = LookupTables::builder()
            .mux_row(
                1,
                &["", "", "", "", "0", "0", "2", "6", "", "", "", "", "", "", "8", ""],
            )
            .mux_row(
                1,
                &["", "", "", "", "1", "1", "2", "6", "", "", "", "", "", "", "8", ""],
            )
            .mux_row(
                2,
                &["", "", "", "", "D", "D", "", "7", "", "", "", "", "", "", "", ""],
            )
            .build();
        let entry = DataTypeEntry::from_row(&row("1,6,,,,,,,,"), 0, &tables).unwrap();
        assert_eq!(entry.mux_entries().len(), 2);
        assert_eq!(entry.mux_entries()[1].data_type.mux_entries().len(), 1);
    }

    #[test]
    fn test_type_name() {
        assert_eq!(DataTypeEntry::new(0x82).type_name(), "Integer1 (Signed)");
    }
}
