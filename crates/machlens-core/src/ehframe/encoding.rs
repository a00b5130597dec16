//! LEB128 and `DW_EH_PE_*` pointer encodings.

use gimli::constants::{
    DW_EH_PE_aligned, DW_EH_PE_datarel, DW_EH_PE_funcrel, DW_EH_PE_indirect, DW_EH_PE_omit, DW_EH_PE_pcrel,
    DW_EH_PE_sdata2, DW_EH_PE_sdata4, DW_EH_PE_sdata8, DW_EH_PE_sleb128, DW_EH_PE_textrel,
    DW_EH_PE_udata2, DW_EH_PE_udata4, DW_EH_PE_udata8, DW_EH_PE_uleb128,
};
use gimli::{Endianity, RunTimeEndian};

use crate::error::{EngineError, Result};

/// Longest LEB128 value accepted, in bytes.
pub const MAX_LEB128_LEN: usize = 8;

const BASIC_MASK: u8 = 0x0f;
const MODIFIER_MASK: u8 = 0x70;

/// Decode an unsigned LEB128 at `data[offset..]`.
///
/// ## Returns
///
/// The value and the number of bytes consumed.
///
/// ## Errors
///
/// - `EngineError::Truncated` if the data ends before the last byte
/// - `EngineError::Overflow` if the value runs past [`MAX_LEB128_LEN`] bytes
///
/// ## Example
///
/// ```rust
/// use machlens_core::ehframe::encoding::read_uleb128;
///
/// assert_eq!(read_uleb128(&[0xe5, 0x8e, 0x26], 0).unwrap(), (624_485, 3));
/// ```
pub fn read_uleb128(data: &[u8], offset: usize) -> Result<(u64, usize)>
{
    let mut value = 0u64;
    let mut shift = 0;
    for i in 0..MAX_LEB128_LEN {
        let byte = *data
            .get(offset + i)
            .ok_or_else(|| EngineError::truncated("uleb128", offset, i + 1, data.len().saturating_sub(offset)))?;
        value |= u64::from(byte & 0x7f) << shift;
        if byte & 0x80 == 0 {
            return Ok((value, i + 1));
        }
        shift += 7;
    }
    Err(EngineError::Overflow {
        what: "uleb128",
        offset: offset as u64,
    })
}

/// Decode a signed LEB128 at `data[offset..]`.
///
/// ## Errors
///
/// Same as [`read_uleb128`].
pub fn read_sleb128(data: &[u8], offset: usize) -> Result<(i64, usize)>
{
    let mut value = 0u64;
    let mut shift = 0;
    for i in 0..MAX_LEB128_LEN {
        let byte = *data
            .get(offset + i)
            .ok_or_else(|| EngineError::truncated("sleb128", offset, i + 1, data.len().saturating_sub(offset)))?;
        value |= u64::from(byte & 0x7f) << shift;
        shift += 7;
        if byte & 0x80 == 0 {
            if byte & 0x40 != 0 {
                value |= u64::MAX << shift;
            }
            return Ok((value as i64, i + 1));
        }
    }
    Err(EngineError::Overflow {
        what: "sleb128",
        offset: offset as u64,
    })
}

fn basic_name(basic: u8) -> &'static str
{
    match basic {
        0x00 => "DW_EH_PE_ptr",
        x if x == DW_EH_PE_uleb128.0 => "DW_EH_PE_uleb128",
        x if x == DW_EH_PE_udata2.0 => "DW_EH_PE_udata2",
        x if x == DW_EH_PE_udata4.0 => "DW_EH_PE_udata4",
        x if x == DW_EH_PE_udata8.0 => "DW_EH_PE_udata8",
        0x08 => "DW_EH_PE_signed",
        x if x == DW_EH_PE_sleb128.0 => "DW_EH_PE_sleb128",
        x if x == DW_EH_PE_sdata2.0 => "DW_EH_PE_sdata2",
        x if x == DW_EH_PE_sdata4.0 => "DW_EH_PE_sdata4",
        x if x == DW_EH_PE_sdata8.0 => "DW_EH_PE_sdata8",
        _ => "?",
    }
}

fn modifier_name(modifier: u8) -> &'static str
{
    match modifier {
        0x00 => "DW_EH_PE_absptr",
        x if x == DW_EH_PE_pcrel.0 => "DW_EH_PE_pcrel",
        x if x == DW_EH_PE_textrel.0 => "DW_EH_PE_textrel",
        x if x == DW_EH_PE_datarel.0 => "DW_EH_PE_datarel",
        x if x == DW_EH_PE_funcrel.0 => "DW_EH_PE_funcrel",
        x if x == DW_EH_PE_aligned.0 => "DW_EH_PE_aligned",
        _ => "?",
    }
}

/// Describe an encoding byte, one component per line:
/// `0x0b (DW_EH_PE_sdata4)\n0x10 (DW_EH_PE_pcrel)`.
pub fn encoding_string(encoding: u8) -> String
{
    if encoding == DW_EH_PE_omit.0 {
        return "0xff (DW_EH_PE_omit)".to_string();
    }
    let basic = encoding & BASIC_MASK;
    let modifier = encoding & MODIFIER_MASK;
    let mut parts = vec![
        format!("{basic:#04x} ({})", basic_name(basic)),
        format!("{modifier:#04x} ({})", modifier_name(modifier)),
    ];
    if encoding & DW_EH_PE_indirect.0 != 0 {
        parts.push("0x80 (DW_EH_PE_indirect)".to_string());
    }
    parts.join("\n")
}

/// A pointer read through a `DW_EH_PE_*` encoding
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedPointer
{
    /// Stored value; signed forms are sign-extended
    pub raw: u64,
    /// Bytes consumed
    pub len: usize,
    /// Target address for `absptr` and `pcrel`; `None` for other modifiers,
    /// indirect pointers and omitted fields
    pub address: Option<u64>,
}

/// Read a pointer stored at `data[offset..]` with `encoding`.
///
/// ## Parameters
///
/// - `field_address`: address of the field, the base for `pcrel`
/// - `pointer_size`: width of `DW_EH_PE_ptr`, 4 or 8
///
/// `DW_EH_PE_omit` consumes nothing.
///
/// ## Errors
///
/// - `EngineError::Truncated` on a short read
/// - `EngineError::Overflow` from the LEB128 forms
/// - `EngineError::Unsupported` for an unknown base format
pub fn read_encoded_pointer(
    data: &[u8],
    offset: usize,
    encoding: u8,
    field_address: u64,
    pointer_size: u8,
    endian: RunTimeEndian,
) -> Result<EncodedPointer>
{
    if encoding == DW_EH_PE_omit.0 {
        return Ok(EncodedPointer {
            raw: 0,
            len: 0,
            address: None,
        });
    }

    let fixed = |size: usize| -> Result<&[u8]> {
        data.get(offset..offset + size).ok_or_else(|| {
            EngineError::truncated("encoded pointer", offset, size, data.len().saturating_sub(offset))
        })
    };

    let basic = encoding & BASIC_MASK;
    let (raw, len) = match basic {
        0x00 | 0x08 => match pointer_size {
            8 => (endian.read_u64(fixed(8)?), 8),
            _ => {
                let value = endian.read_u32(fixed(4)?);
                let value = if basic == 0x08 {
                    i64::from(value as i32) as u64
                } else {
                    u64::from(value)
                };
                (value, 4)
            }
        },
        x if x == DW_EH_PE_uleb128.0 => read_uleb128(data, offset)?,
        x if x == DW_EH_PE_sleb128.0 => {
            let (value, len) = read_sleb128(data, offset)?;
            (value as u64, len)
        }
        x if x == DW_EH_PE_udata2.0 => (u64::from(endian.read_u16(fixed(2)?)), 2),
        x if x == DW_EH_PE_udata4.0 => (u64::from(endian.read_u32(fixed(4)?)), 4),
        x if x == DW_EH_PE_udata8.0 => (endian.read_u64(fixed(8)?), 8),
        x if x == DW_EH_PE_sdata2.0 => (i64::from(endian.read_i16(fixed(2)?)) as u64, 2),
        x if x == DW_EH_PE_sdata4.0 => (i64::from(endian.read_i32(fixed(4)?)) as u64, 4),
        x if x == DW_EH_PE_sdata8.0 => (endian.read_u64(fixed(8)?), 8),
        other => return Err(EngineError::Unsupported(format!("pointer format {other:#04x}"))),
    };

    let address = if encoding & DW_EH_PE_indirect.0 != 0 {
        None
    } else {
        match encoding & MODIFIER_MASK {
            0x00 => Some(raw),
            x if x == DW_EH_PE_pcrel.0 => Some(field_address.wrapping_add(raw)),
            _ => None,
        }
    };
    Ok(EncodedPointer { raw, len, address })
}
