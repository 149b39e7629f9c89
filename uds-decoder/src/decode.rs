//! Response decoding
//!
//! Renders a response buffer with a [`DataTypeEntry`]. Decoding never
//! fails: undersized buffers render as empty text and unmatched
//! enumeration or multiplexer values render as the "unknown" label
//! followed by the raw value.

use crate::descriptor::{DataTypeEntry, TypeDetail};
use crate::encoding::decode_text;
use crate::tables::LookupTables;
use crate::types::DataType;

/// Largest digit count honoured when rendering
const MAX_DIGITS: usize = 99;

impl DataTypeEntry {
    /// Render `data` as display text
    pub fn decode(&self, tables: &LookupTables, data: &[u8]) -> String {
        if data.is_empty() {
            return String::new();
        }

        let Some((sub, bit_length)) = self.extract(data) else {
            log::trace!(
                "Buffer of {} bytes too short for {} at byte {:?}",
                data.len(),
                self.type_name(),
                self.byte_offset
            );
            return String::new();
        };

        let mut text = match self.data_type {
            DataType::ValueName => return self.decode_value_name(tables, raw_value(&sub, self.swapped)),
            DataType::MuxTable => return self.decode_mux(tables, &sub),
            DataType::FixedEncoding => {
                return match self.detail {
                    TypeDetail::Fixed { converter, .. } => converter.evaluate(tables, &sub),
                    _ => String::new(),
                }
            }
            DataType::Integer1 | DataType::Integer2 => {
                let raw = raw_value(&sub, self.swapped);
                if self.signed {
                    sign_extend(raw, bit_length).to_string()
                } else {
                    raw.to_string()
                }
            }
            DataType::FloatScaled | DataType::HexScaled => {
                let raw = raw_value(&sub, self.swapped);
                let base = if self.signed {
                    sign_extend(raw, bit_length) as f64
                } else {
                    raw as f64
                };
                let scaled = self.apply_scale(base);
                if self.data_type == DataType::HexScaled {
                    format!("{:X}", scaled as u64)
                } else {
                    format_fixed(scaled, self.digit_count())
                }
            }
            DataType::Binary1 | DataType::Binary2 => sub
                .iter()
                .map(|byte| format!("{:08b}", byte))
                .collect::<Vec<_>>()
                .join(" "),
            DataType::HexBytes => sub
                .iter()
                .map(|byte| format!("{:02X}", byte))
                .collect::<Vec<_>>()
                .join(" "),
            DataType::String => decode_text(&sub),
            DataType::Invalid => return String::new(),
        };

        if let Some(unit) = self.unit_text.as_deref().filter(|unit| !unit.is_empty()) {
            if !text.is_empty() {
                text.push(' ');
            }
            text.push_str(unit);
        }
        text
    }

    /// Cut the addressed bits out of `data`
    ///
    /// Returns the sub buffer and the effective bit length, or `None` when
    /// the buffer is too short. Without an explicit bit length the whole
    /// buffer from the byte offset on is used.
    fn extract(&self, data: &[u8]) -> Option<(Vec<u8>, usize)> {
        let byte_offset = self.byte_offset.unwrap_or(0) as usize;
        let bit_offset = self.bit_offset.unwrap_or(0) as usize;
        let (bit_length, byte_length) = match self.bit_length {
            Some(bits) => {
                let bits = bits as usize;
                (bits, (bits + bit_offset + 7) / 8)
            }
            None => (data.len() * 8, data.len()),
        };

        if bit_length < 1 || data.len() < byte_offset.checked_add(byte_length)? {
            return None;
        }

        let mut sub = data[byte_offset..byte_offset + byte_length].to_vec();
        if bit_offset > 0 || bit_length % 8 != 0 {
            shift_bits(&mut sub, bit_offset, bit_length)?;
        }
        Some((sub, bit_length))
    }

    /// Multiply, add the offset, divide; a non-finite result falls back to `value`
    fn apply_scale(&self, value: f64) -> f64 {
        let mut scaled = value;
        if let Some(mult) = self.scale_mult {
            scaled *= mult;
        }
        if let Some(offset) = self.scale_offset {
            scaled += offset;
        }
        if let Some(div) = self.scale_div {
            scaled /= div;
        }

        if scaled.is_finite() {
            scaled
        } else {
            value
        }
    }

    fn digit_count(&self) -> usize {
        self.digits.unwrap_or(0).clamp(0, MAX_DIGITS as i64) as usize
    }

    fn decode_value_name(&self, tables: &LookupTables, raw: u64) -> String {
        let value = raw as i64;
        match self.value_names().iter().find(|case| case.contains(value)) {
            Some(case) => case.display_name().to_string(),
            None => unknown_value(tables, raw),
        }
    }

    /// First matching ranged case wins, the default case is tried last
    fn decode_mux(&self, tables: &LookupTables, sub: &[u8]) -> String {
        let raw = raw_value(sub, self.swapped);
        let value = raw as i64;

        let mut default_case = None;
        for case in self.mux_entries() {
            if case.is_default {
                default_case = Some(case);
                continue;
            }
            if case.contains(value) {
                return case.data_type.decode(tables, sub);
            }
        }

        match default_case {
            Some(case) => case.data_type.decode(tables, sub),
            None => unknown_value(tables, raw),
        }
    }
}

fn unknown_value(tables: &LookupTables, raw: u64) -> String {
    format!("{}: {}", tables.unknown_text(), raw)
}

/// Shift the bits of `sub` down by `bit_offset` and clear everything from
/// `bit_length` on
///
/// Bits are numbered least significant first within each byte, byte 0
/// first.
fn shift_bits(sub: &mut [u8], bit_offset: usize, bit_length: usize) -> Option<()> {
    let total_bits = sub.len() * 8;
    if bit_offset > total_bits {
        return None;
    }

    let get_bit = |data: &[u8], index: usize| (data[index / 8] >> (index % 8)) & 0x01 != 0;
    let set_bit = |data: &mut [u8], index: usize, value: bool| {
        if value {
            data[index / 8] |= 1 << (index % 8);
        } else {
            data[index / 8] &= !(1 << (index % 8));
        }
    };

    for i in 0..total_bits - bit_offset {
        let bit = get_bit(sub, i + bit_offset);
        set_bit(sub, i, bit);
    }
    for i in bit_length.min(total_bits)..total_bits {
        set_bit(sub, i, false);
    }
    Some(())
}

/// Assemble an unsigned value, most significant byte first unless swapped
///
/// Only the last eight bytes contribute.
fn raw_value(sub: &[u8], swapped: bool) -> u64 {
    let fold = |value: u64, byte: &u8| (value << 8) | u64::from(*byte);
    if swapped {
        sub.iter().rev().fold(0, fold)
    } else {
        sub.iter().fold(0, fold)
    }
}

/// Two's complement interpretation of the low `bit_length` bits
fn sign_extend(value: u64, bit_length: usize) -> i64 {
    if bit_length == 0 {
        return value as i64;
    }

    let sign_bit = 1u64 << ((bit_length - 1) % 64);
    if value & sign_bit != 0 {
        (value ^ sign_bit).wrapping_sub(sign_bit) as i64
    } else {
        value as i64
    }
}

/// Render `value` with exactly `digits` decimals
///
/// Midpoints round away from zero and a result that rounds to zero never
/// carries a minus sign.
pub(crate) fn format_fixed(value: f64, digits: usize) -> String {
    if !value.is_finite() {
        return value.to_string();
    }

    let rounded = if digits <= 15 {
        let factor = 10f64.powi(digits as i32);
        let shifted = (value * factor).round() / factor;
        if shifted.is_finite() {
            shifted
        } else {
            value
        }
    } else {
        value
    };

    if rounded == 0.0 {
        format!("{:.*}", digits, 0.0)
    } else {
        format!("{:.*}", digits, rounded)
    }
}
