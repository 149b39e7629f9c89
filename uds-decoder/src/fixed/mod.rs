//! Fixed encoding converters
//!
//! A `FixedEncoding` data type delegates all decoding to a converter looked
//! up by id. Converters are either a small formula (one or two big-endian
//! bytes, offset, factor, unit) or a function rendering a multi-field
//! sensor readout. The registry is a static table; adding a converter means
//! adding a table entry, never touching the decode core.

mod converters;

use crate::decode::format_fixed;
use crate::tables::LookupTables;
use std::collections::HashMap;
use std::fmt;

/// Signature of a function converter
pub type ConvertFn = fn(&LookupTables, &[u8]) -> String;

/// Formula converter: `(raw + offset) * mult`, rendered with a digit count
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Formula {
    /// Number of raw bytes (0 renders nothing, 1 or 2 big-endian bytes)
    pub data_length: u32,
    pub unit_key: Option<u32>,
    pub digits: Option<u32>,
    pub offset: Option<f64>,
    pub mult: Option<f64>,
    /// Literal appended after the unit (e.g. "abs")
    pub suffix: Option<&'static str>,
}

impl Formula {
    pub const fn new(data_length: u32) -> Self {
        Self {
            data_length,
            unit_key: None,
            digits: None,
            offset: None,
            mult: None,
            suffix: None,
        }
    }

    pub const fn unit(mut self, unit_key: u32) -> Self {
        self.unit_key = Some(unit_key);
        self
    }

    pub const fn digits(mut self, digits: u32) -> Self {
        self.digits = Some(digits);
        self
    }

    pub const fn offset(mut self, offset: f64) -> Self {
        self.offset = Some(offset);
        self
    }

    pub const fn mult(mut self, mult: f64) -> Self {
        self.mult = Some(mult);
        self
    }

    pub const fn suffix(mut self, suffix: &'static str) -> Self {
        self.suffix = Some(suffix);
        self
    }

    fn evaluate(&self, tables: &LookupTables, data: &[u8]) -> String {
        if self.data_length == 0 || data.len() < self.data_length as usize {
            return String::new();
        }

        let raw = match self.data_length {
            1 => u32::from(data[0]),
            2 => (u32::from(data[0]) << 8) | u32::from(data[1]),
            _ => return String::new(),
        };

        let mut value = f64::from(raw);
        if let Some(offset) = self.offset {
            value += offset;
        }
        if let Some(mult) = self.mult {
            value *= mult;
        }

        let mut text = format_fixed(value, self.digits.unwrap_or(0) as usize);
        if let Some(unit_key) = self.unit_key {
            text.push(' ');
            text.push_str(tables.unit(unit_key).unwrap_or_default());
        }
        if let Some(suffix) = self.suffix {
            text.push(' ');
            text.push_str(suffix);
        }
        text
    }
}

/// A registered fixed encoding
#[derive(Clone, Copy)]
pub enum FixedConverter {
    Formula(Formula),
    Function(ConvertFn),
}

impl FixedConverter {
    /// Render raw bytes as display text
    pub fn evaluate(&self, tables: &LookupTables, data: &[u8]) -> String {
        match self {
            FixedConverter::Formula(formula) => formula.evaluate(tables, data),
            FixedConverter::Function(convert) => convert(tables, data),
        }
    }

    pub fn formula(&self) -> Option<&Formula> {
        match self {
            FixedConverter::Formula(formula) => Some(formula),
            FixedConverter::Function(_) => None,
        }
    }
}

impl fmt::Debug for FixedConverter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FixedConverter::Formula(formula) => f.debug_tuple("Formula").field(formula).finish(),
            FixedConverter::Function(_) => f.write_str("Function"),
        }
    }
}

/// One table entry: a converter and every id it applies to
#[derive(Debug)]
pub struct ConverterEntry {
    pub ids: &'static [u32],
    pub converter: FixedConverter,
}

const fn formula(ids: &'static [u32], formula: Formula) -> ConverterEntry {
    ConverterEntry {
        ids,
        converter: FixedConverter::Formula(formula),
    }
}

const fn function(ids: &'static [u32], convert: ConvertFn) -> ConverterEntry {
    ConverterEntry {
        ids,
        converter: FixedConverter::Function(convert),
    }
}

/// Registry id → converter, flattened from `entries`
///
/// A later entry overwrites an earlier one that declares the same id.
pub fn build_registry(entries: &'static [ConverterEntry]) -> HashMap<u32, &'static FixedConverter> {
    let mut registry = HashMap::new();
    for entry in entries {
        for &id in entry.ids {
            if registry.insert(id, &entry.converter).is_some() {
                log::warn!("Fixed converter id {} registered twice, later entry wins", id);
            }
        }
    }
    registry
}

use converters::*;

/// Every fixed encoding known to the decoder
pub static FIXED_CONVERTERS: &[ConverterEntry] = &[
    // ids without a defined encoding
    formula(&[1, 65, 79, 80, 109, 136, 139, 140, 141, 142, 143, 152, 153, 159], Formula::new(0)),
    function(&[2], dtc_code),
    function(&[3], fuel_system_status),
    formula(&[4, 17, 44, 46, 47, 91], Formula::new(1).unit(1).digits(1).offset(0.0).mult(100.0 / 255.0)),
    formula(&[5, 15, 70, 92, 132], Formula::new(1).unit(3).digits(0).offset(-40.0).mult(1.0)),
    formula(&[6, 7, 8, 9, 45], Formula::new(1).unit(1).digits(1).offset(-128.0).mult(100.0 / 128.0)),
    formula(&[10], Formula::new(1).unit(103).digits(0).offset(0.0).mult(3.0).suffix("rel")),
    formula(&[11, 51], Formula::new(1).unit(103).digits(0).suffix("abs")),
    formula(&[12], Formula::new(2).unit(21).digits(0).offset(0.0).mult(0.25)),
    formula(&[13], Formula::new(1).unit(109).digits(0)),
    formula(&[33, 49], Formula::new(2).unit(109).digits(0)),
    formula(&[14], Formula::new(1).unit(1).digits(1).offset(-128.0).mult(0.5)),
    formula(&[16], Formula::new(2).unit(26).digits(2).offset(0.0).mult(0.01)),
    function(&[18], o2_sensor_location),
    function(&[19], o2_sensors_four_banks),
    function(&[20], o2_voltage_trim),
    function(&[28], obd_standard),
    function(&[29], o2_sensors_two_banks),
    function(&[30], auxiliary_input_status),
    formula(&[31], Formula::new(2).unit(8).digits(0)),
    formula(&[34], Formula::new(2).unit(103).digits(2).offset(0.0).mult(0.8)),
    formula(&[35], Formula::new(2).unit(103).digits(0).offset(0.0).mult(10.0).suffix("rel")),
    function(
        &[36, 37, 38, 39, 40, 41, 42, 43, 52, 53, 54, 55, 56, 57, 58, 59],
        lambda_current,
    ),
    formula(&[48], Formula::new(1).digits(0)),
    function(&[50], evap_pressure_quarter),
    function(&[60, 61, 62, 63], catalyst_temperature),
    function(&[77, 78], minutes_elapsed),
    formula(&[66], Formula::new(2).unit(9).digits(3).offset(0.0).mult(0.001)),
    formula(&[67], Formula::new(2).unit(1).digits(0).offset(0.0).mult(100.0 / 255.0)),
    formula(&[68], Formula::new(2).unit(113).digits(3).offset(0.0).mult(1.0 / 32783.0)),
    formula(
        &[69, 71, 72, 73, 74, 75, 76, 82, 90],
        Formula::new(1).unit(1).digits(0).offset(0.0).mult(100.0 / 255.0),
    ),
    function(&[81], fuel_type),
    formula(&[83], Formula::new(2).unit(103).digits(0).offset(0.0).mult(5.0).suffix("abs")),
    function(&[84], evap_pressure),
    function(&[85, 86, 87, 88], fuel_trim_banks),
    formula(&[89], Formula::new(2).unit(103).digits(0).offset(0.0).mult(10.0).suffix("abs")),
    formula(&[93], Formula::new(2).unit(2).digits(2).offset(-26880.0).mult(1.0 / 128.0)),
    formula(&[94], Formula::new(2).unit(110).digits(2).offset(0.0).mult(1.0 / 20.0)),
    function(&[95], heavy_duty_standard),
    formula(&[97, 98], Formula::new(1).unit(1).digits(0).offset(-125.0).mult(1.0)),
    formula(&[99], Formula::new(1).unit(7).digits(0)),
    function(&[100], torque_limits),
    function(&[101], auxiliary_io_status),
    function(&[102], mass_air_flow),
    function(&[103], coolant_temperature),
    function(&[104], intake_air_temperature),
    function(&[105], egr_duty),
    function(&[106], intake_air_flow_control),
    function(&[107], egr_temperature),
    function(&[108], throttle_control),
    function(&[110], injection_pressure_control),
    function(&[111], turbo_inlet_pressure),
    function(&[112], boost_pressure_control),
    function(&[113], variable_geometry_turbo),
    function(&[114], wastegate_control),
    function(&[115], exhaust_pressure),
    function(&[116], turbo_speed),
    function(&[117, 118], charge_air_temperature),
    function(&[119], exhaust_gas_temperature_banks),
    function(&[120, 121], exhaust_gas_temperature_sensors),
    function(&[122, 123], particulate_filter_pressure),
    function(&[124], particulate_filter_temperature),
    function(&[125, 126], nte_control_area),
    function(&[127], engine_run_time),
    function(&[129, 130], control_area_run_time),
    function(&[131], nox_sensor),
    function(&[133], reagent_system),
    function(&[134], particulate_matter_sensor),
    function(&[135], manifold_pressure),
];
