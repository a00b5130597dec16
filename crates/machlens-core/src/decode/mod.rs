//! # Value decoding
//!
//! Turns a section or a symbol's bytes into display rows. What each row
//! holds depends on the [`SemanticType`]: one instruction, one C string,
//! one pointer, eight bytes of ASCII, and so on. Rows that contain a
//! relocation get a child [`RelocRow`] describing it.
//!
//! Decoding never fails as a whole. Problems with individual rows are
//! rendered in place and collected in [`DecodedView::warnings`].

pub mod dwarf;
pub mod long_double;
pub mod scalar;

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use tracing::warn;

use self::dwarf::{decode_value, DwarfInfo, ValueEnv};
use self::long_double::decode_long_double;
use self::scalar::{
    decode_cstring, decode_float32, decode_float64, hex_bytes, read_signed, read_unsigned, signed_hex_value, to_ascii,
};
use crate::disasm::{self, Disassembler};
use crate::error::{EngineError, Result};
use crate::macho::constants::{
    S_4BYTE_LITERALS, S_8BYTE_LITERALS, S_16BYTE_LITERALS, S_ATTR_PURE_INSTRUCTIONS, S_ATTR_SOME_INSTRUCTIONS,
    S_CSTRING_LITERALS, S_LAZY_SYMBOL_POINTERS, S_LITERAL_POINTERS, S_MOD_INIT_FUNC_POINTERS, S_MOD_TERM_FUNC_POINTERS,
    S_NON_LAZY_SYMBOL_POINTERS, S_SYMBOL_STUBS,
};
use crate::macho::strings::reloc_type_string;
use crate::macho::{MachFile, Section};
use crate::relocs::{interpret, RelocTarget};
use crate::symbols::bind::is_pair;
use crate::symbols::SymbolTable;
use crate::types::{Architecture, LongDoubleLayout};

/// Width of a Data or zero-fill row.
const DATA_ROW_LEN: usize = 8;
/// Zero-fill rows before the rest of the range collapses into one row.
const ZERO_FILL_ROW_LIMIT: u64 = 4096;

/// How a byte range is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SemanticType
{
    Code,
    CString,
    Float32,
    Float64,
    /// C `long double`
    Float128,
    Int32,
    Int64,
    Pointer32,
    Pointer64,
    Data,
    EhFrame,
    /// The symbol's declared DWARF type
    DwarfType,
}

impl SemanticType
{
    pub const ALL: [SemanticType; 12] = [
        SemanticType::Code,
        SemanticType::CString,
        SemanticType::Float32,
        SemanticType::Float64,
        SemanticType::Float128,
        SemanticType::Int32,
        SemanticType::Int64,
        SemanticType::Pointer32,
        SemanticType::Pointer64,
        SemanticType::Data,
        SemanticType::EhFrame,
        SemanticType::DwarfType,
    ];

    /// Guess from the section name, type and attributes.
    pub fn guess_for_section(file: &MachFile, section: &Section) -> Self
    {
        if section.name == "__eh_frame" {
            return SemanticType::EhFrame;
        }
        if section.is_zero_fill() {
            return SemanticType::Data;
        }
        match section.section_type() {
            S_CSTRING_LITERALS => return SemanticType::CString,
            S_4BYTE_LITERALS => return SemanticType::Float32,
            S_8BYTE_LITERALS => return SemanticType::Float64,
            S_16BYTE_LITERALS => return SemanticType::Float128,
            S_LITERAL_POINTERS
            | S_NON_LAZY_SYMBOL_POINTERS
            | S_LAZY_SYMBOL_POINTERS
            | S_MOD_INIT_FUNC_POINTERS
            | S_MOD_TERM_FUNC_POINTERS => {
                return if file.architecture.is_64_bit() {
                    SemanticType::Pointer64
                } else {
                    SemanticType::Pointer32
                };
            }
            S_SYMBOL_STUBS => return SemanticType::Code,
            _ => {}
        }
        if section.flags & (S_ATTR_PURE_INSTRUCTIONS | S_ATTR_SOME_INSTRUCTIONS) != 0 {
            return SemanticType::Code;
        }
        SemanticType::Data
    }

    /// Guess for a symbol: the guess for its section, or `None` when the
    /// symbol is not defined in a section.
    pub fn guess_for_symbol(file: &MachFile, index: usize) -> Option<Self>
    {
        let symbol = file.symbols.get(index)?;
        if !symbol.is_section_defined() {
            return None;
        }
        let section = file.section(u32::from(symbol.sect))?;
        Some(Self::guess_for_section(file, section))
    }

    pub fn name(self) -> &'static str
    {
        match self {
            SemanticType::Code => "code",
            SemanticType::CString => "cstring",
            SemanticType::Float32 => "float32",
            SemanticType::Float64 => "float64",
            SemanticType::Float128 => "float128",
            SemanticType::Int32 => "int32",
            SemanticType::Int64 => "int64",
            SemanticType::Pointer32 => "pointer32",
            SemanticType::Pointer64 => "pointer64",
            SemanticType::Data => "data",
            SemanticType::EhFrame => "eh_frame",
            SemanticType::DwarfType => "dwarf",
        }
    }
}

impl fmt::Display for SemanticType
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        f.write_str(self.name())
    }
}

impl FromStr for SemanticType
{
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self>
    {
        let wanted = s.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|semantic| semantic.name() == wanted)
            .ok_or_else(|| EngineError::InvalidArgument(format!("unknown semantic type '{s}'")))
    }
}

/// A relocation shown under the row whose bytes it patches
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelocRow
{
    pub address: u64,
    pub bytes: Vec<u8>,
    pub value: String,
    pub kind: String,
    pub pcrel: bool,
    pub is_extern: bool,
    pub scattered: bool,
    pub target: RelocTarget,
    /// `_sym+0x10`, `_other`, `? (reason)`; empty for targetless entries
    pub target_text: String,
}

impl RelocRow
{
    /// Build the row for `section.relocs[position]`.
    pub fn new(table: &SymbolTable, section: &Section, position: usize) -> Option<Self>
    {
        let file = table.file();
        let reloc = section.relocs.get(position)?;
        let address = section.addr.wrapping_add(u64::from(reloc.address));
        let bytes = section
            .bytes_at(address, reloc.operand_size())
            .map(<[u8]>::to_vec)
            .unwrap_or_default();
        let target = interpret(file, section, position);
        Some(Self {
            address,
            bytes,
            value: file.reloc_value_string(reloc),
            kind: reloc_type_string(file.architecture, reloc.kind),
            pcrel: reloc.pcrel,
            is_extern: reloc.is_extern,
            scattered: reloc.scattered,
            target_text: target.describe(table),
            target,
        })
    }

    fn len(&self) -> u64
    {
        self.bytes.len().max(1) as u64
    }
}

/// One decoded unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Row
{
    pub address: u64,
    /// Raw bytes; empty for zero-fill rows
    pub bytes: Vec<u8>,
    /// Bytes covered by the row
    pub len: u64,
    pub text: String,
    pub relocations: Vec<RelocRow>,
    /// Overlaps the requested focus range
    pub focused: bool,
}

impl Row
{
    /// `0x0000000000001000`
    pub fn address_string(&self) -> String
    {
        format!("{:#018x}", self.address)
    }

    pub fn bytes_string(&self) -> String
    {
        hex_bytes(&self.bytes)
    }
}

/// Decoded rows for one section or symbol
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedView
{
    pub title: String,
    pub semantic: SemanticType,
    pub rows: Vec<Row>,
    pub warnings: Vec<String>,
}

impl DecodedView
{
    /// Index of the first focused row.
    pub fn first_focused(&self) -> Option<usize>
    {
        self.rows.iter().position(|row| row.focused)
    }

    /// Mark the rows overlapping `focus`, clearing any earlier focus.
    pub fn set_focus(&mut self, focus: Focus)
    {
        for row in &mut self.rows {
            row.focused = focus.overlaps(row.address, row.len);
        }
    }
}

/// Address range to highlight, usually from an anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Focus
{
    pub address: u64,
    pub size: u64,
}

impl Focus
{
    fn overlaps(&self, start: u64, len: u64) -> bool
    {
        let end = self.address.saturating_add(self.size.max(1));
        start < end && self.address < start.saturating_add(len.max(1))
    }
}

/// Shared inputs of every decoder call.
#[derive(Clone, Copy)]
pub struct DecodeContext<'a>
{
    pub table: &'a Arc<SymbolTable>,
    /// Decode `long double` even when the file's CPU is not the host's
    pub force_long_double: bool,
    pub dwarf: Option<&'a DwarfInfo>,
}

impl DecodeContext<'_>
{
    fn file(&self) -> &MachFile
    {
        self.table.file()
    }

    /// `long double` layout, when it can be trusted on this host.
    fn long_double_layout(&self) -> Option<LongDoubleLayout>
    {
        let architecture = self.file().architecture;
        if self.force_long_double || architecture == Architecture::current() {
            architecture.long_double_layout()
        } else {
            None
        }
    }
}

/// Bytes being decoded
struct Region<'a>
{
    address: u64,
    data: &'a [u8],
    /// Zero-fill: `len` bytes with no backing data
    zero_fill: Option<u64>,
}

/// Decode a whole section.
pub fn section_view(ctx: &DecodeContext<'_>, section: &Section, semantic: SemanticType) -> DecodedView
{
    let table = ctx.table;
    let file = ctx.file();
    let mut warnings = Vec::new();

    let relocations: Vec<RelocRow> = section
        .relocs
        .iter()
        .enumerate()
        .filter(|(_, reloc)| !is_pair(file.architecture, reloc))
        .filter_map(|(position, _)| RelocRow::new(table, section, position))
        .collect();

    let region = if section.is_zero_fill() {
        Region {
            address: section.addr,
            data: &[],
            zero_fill: Some(section.size),
        }
    } else {
        let len = usize::try_from(section.size).unwrap_or(usize::MAX).min(section.data.len());
        if (len as u64) < section.size {
            warnings.push(format!(
                "{}: only {len:#x} of {:#x} bytes present in the file",
                section.label(),
                section.size
            ));
        }
        Region {
            address: section.addr,
            data: &section.data[..len],
            zero_fill: None,
        }
    };

    let semantic = match semantic {
        SemanticType::DwarfType => {
            warnings.push("DWARF types apply to symbols, not sections; showing data".to_string());
            SemanticType::Data
        }
        other => other,
    };
    let rows = decode_region(ctx, &region, semantic, &relocations, &mut warnings);
    finish(section.label(), semantic, rows, warnings)
}

/// Decode the bytes of one symbol group, seen through symbol `index`.
///
/// ## Errors
///
/// - `EngineError::OutOfRange` if `index` is not in the symbol table
/// - `EngineError::InvalidArgument` if the symbol is not defined in a section
pub fn symbol_view(ctx: &DecodeContext<'_>, index: usize, semantic: SemanticType) -> Result<DecodedView>
{
    let table = ctx.table;
    let file = ctx.file();
    let symbol = file.symbols.get(index).ok_or(EngineError::OutOfRange {
        kind: "symbol",
        index: index as u64,
    })?;
    let info = table
        .info_for_symbol(index)
        .ok_or_else(|| EngineError::InvalidArgument(format!("{} is not defined in a section", symbol.name)))?;
    let section = file.section(u32::from(symbol.sect)).ok_or(EngineError::OutOfRange {
        kind: "section",
        index: u64::from(symbol.sect),
    })?;
    let title = format!("{} ({})", symbol.name, section.label());
    let mut warnings = Vec::new();

    let relocations: Vec<RelocRow> = info
        .relocations
        .iter()
        .filter_map(|bound| {
            let host = file.section(bound.section as u32)?;
            RelocRow::new(table, host, bound.position)
        })
        .collect();

    let region = if section.is_zero_fill() {
        Region {
            address: info.address,
            data: &[],
            zero_fill: Some(info.size),
        }
    } else {
        let data = section
            .bytes_at(info.address, info.size)
            .or_else(|| {
                let start = usize::try_from(info.address.checked_sub(section.addr)?).ok()?;
                section.data.get(start..)
            })
            .unwrap_or(&[]);
        if (data.len() as u64) < info.size {
            warnings.push(format!(
                "{}: only {:#x} of {:#x} bytes present in the file",
                symbol.name,
                data.len(),
                info.size
            ));
        }
        Region {
            address: info.address,
            data,
            zero_fill: None,
        }
    };

    let rows = if semantic == SemanticType::DwarfType {
        dwarf_rows(ctx, &symbol.name, &region, &relocations, &mut warnings)
    } else {
        decode_region(ctx, &region, semantic, &relocations, &mut warnings)
    };
    Ok(finish(title, semantic, rows, warnings))
}

fn finish(title: String, semantic: SemanticType, rows: Vec<Row>, warnings: Vec<String>) -> DecodedView
{
    if !warnings.is_empty() {
        warn!(view = %title, warnings = warnings.len(), "decoded view has warnings");
    }
    DecodedView {
        title,
        semantic,
        rows,
        warnings,
    }
}

fn row(address: u64, bytes: &[u8], text: String) -> Row
{
    Row {
        address,
        bytes: bytes.to_vec(),
        len: bytes.len() as u64,
        text,
        relocations: Vec::new(),
        focused: false,
    }
}

/// Attach every relocation lying entirely inside `[row.address, +len)`.
fn attach_relocations(row: &mut Row, len: u64, relocations: &[RelocRow])
{
    let end = row.address.saturating_add(len);
    row.relocations.extend(
        relocations
            .iter()
            .filter(|reloc| row.address <= reloc.address && reloc.address.saturating_add(reloc.len()) <= end)
            .cloned(),
    );
}

fn decode_region(
    ctx: &DecodeContext<'_>,
    region: &Region<'_>,
    semantic: SemanticType,
    relocations: &[RelocRow],
    warnings: &mut Vec<String>,
) -> Vec<Row>
{
    if let Some(len) = region.zero_fill {
        return zero_fill_rows(region.address, len);
    }

    match semantic {
        SemanticType::Code => match disasm::for_architecture(ctx.table) {
            Some(mut disassembler) => code_rows(disassembler.as_mut(), region, relocations),
            None => {
                warnings.push(format!("no disassembler for {}", ctx.file().architecture));
                data_rows(region, relocations)
            }
        },
        SemanticType::CString => cstring_rows(region),
        SemanticType::Float32 => fixed_rows(region, 4, |bytes| decode_float32(bytes, ctx.file().endian)),
        SemanticType::Float64 => fixed_rows(region, 8, |bytes| decode_float64(bytes, ctx.file().endian)),
        SemanticType::Float128 => match ctx.long_double_layout() {
            Some(layout) => fixed_rows(region, 16, |bytes| decode_long_double(bytes, layout, ctx.file().endian)),
            None => {
                warnings.push(format!(
                    "long double of {} is unsupported on this host",
                    ctx.file().architecture
                ));
                fixed_rows(region, 16, |_| "unsupported on this host".to_string())
            }
        },
        SemanticType::Int32 => fixed_rows(region, 4, |bytes| int_text(bytes, ctx.file())),
        SemanticType::Int64 => fixed_rows(region, 8, |bytes| int_text(bytes, ctx.file())),
        SemanticType::Pointer32 => fixed_rows(region, 4, |bytes| pointer_text(bytes, ctx.table)),
        SemanticType::Pointer64 => fixed_rows(region, 8, |bytes| pointer_text(bytes, ctx.table)),
        SemanticType::Data | SemanticType::EhFrame | SemanticType::DwarfType => data_rows(region, relocations),
    }
}

fn zero_fill_rows(address: u64, len: u64) -> Vec<Row>
{
    let step = DATA_ROW_LEN as u64;
    let mut rows = Vec::new();
    let mut offset = 0;
    while offset < len {
        let remaining = len - offset;
        let (chunk, text) = if rows.len() as u64 + 1 < ZERO_FILL_ROW_LIMIT || remaining <= step {
            (remaining.min(step), "zero-fill".to_string())
        } else {
            (remaining, format!("zero-fill ({remaining:#x} bytes)"))
        };
        let mut zero = row(address.wrapping_add(offset), &[], text);
        zero.len = chunk;
        rows.push(zero);
        offset += chunk;
    }
    rows
}

fn code_rows(disassembler: &mut dyn Disassembler, region: &Region<'_>, relocations: &[RelocRow]) -> Vec<Row>
{
    disasm::disassemble(disassembler, region.data, region.address)
        .into_iter()
        .map(|instruction| {
            let start = (instruction.address - region.address) as usize;
            let mut row = row(
                instruction.address,
                &region.data[start..start + instruction.len],
                instruction.text,
            );
            attach_relocations(&mut row, instruction.len as u64, relocations);
            row
        })
        .collect()
}

fn data_rows(region: &Region<'_>, relocations: &[RelocRow]) -> Vec<Row>
{
    region
        .data
        .chunks(DATA_ROW_LEN)
        .enumerate()
        .map(|(i, bytes)| {
            let mut row = row(region.address + (i * DATA_ROW_LEN) as u64, bytes, to_ascii(bytes));
            attach_relocations(&mut row, bytes.len() as u64, relocations);
            row
        })
        .collect()
}

fn cstring_rows(region: &Region<'_>) -> Vec<Row>
{
    let mut rows = Vec::new();
    let mut cursor = 0;
    while cursor < region.data.len() {
        let (text, len) = decode_cstring(&region.data[cursor..]);
        rows.push(row(
            region.address + cursor as u64,
            &region.data[cursor..cursor + len],
            text,
        ));
        cursor += len;
    }
    rows
}

/// Fixed-width rows; a short tail is shown as ASCII.
fn fixed_rows(region: &Region<'_>, width: usize, decode: impl Fn(&[u8]) -> String) -> Vec<Row>
{
    region
        .data
        .chunks(width)
        .enumerate()
        .map(|(i, bytes)| {
            let text = if bytes.len() == width {
                decode(bytes)
            } else {
                to_ascii(bytes)
            };
            row(region.address + (i * width) as u64, bytes, text)
        })
        .collect()
}

fn int_text(bytes: &[u8], file: &MachFile) -> String
{
    read_signed(bytes, file.endian).map(signed_hex_value).unwrap_or_default()
}

/// `0x0000000100003f50 (_main)`
fn pointer_text(bytes: &[u8], table: &SymbolTable) -> String
{
    let Some(value) = read_unsigned(bytes, table.file().endian) else {
        return String::new();
    };
    match table.lookup(value) {
        Some(hit) => format!("{value:#018x} ({})", hit.names),
        None => format!("{value:#018x}"),
    }
}

/// One row holding the whole value, decoded through its DWARF type.
fn dwarf_rows(
    ctx: &DecodeContext<'_>,
    name: &str,
    region: &Region<'_>,
    relocations: &[RelocRow],
    warnings: &mut Vec<String>,
) -> Vec<Row>
{
    let Some(dwarf) = ctx.dwarf else {
        warnings.push("no DWARF information loaded".to_string());
        return decode_region(ctx, region, SemanticType::Data, relocations, warnings);
    };
    let ty = match dwarf.variable_type(name) {
        Ok(Some(ty)) => ty,
        Ok(None) => {
            warnings.push(format!("no DWARF variable for {name}"));
            return decode_region(ctx, region, SemanticType::Data, relocations, warnings);
        }
        Err(err) => {
            warnings.push(format!("DWARF type of {name}: {err}"));
            return decode_region(ctx, region, SemanticType::Data, relocations, warnings);
        }
    };

    let env = ValueEnv {
        endian: ctx.file().endian,
        long_double: ctx.long_double_layout(),
    };
    let (data, zero, len) = match region.zero_fill {
        Some(len) => (vec![0u8; usize::try_from(len).unwrap_or(0)], true, len),
        None => (region.data.to_vec(), false, region.data.len() as u64),
    };
    let text = match decode_value(&data, &ty, zero, true, &env) {
        Ok(text) => text,
        Err(err) => {
            warnings.push(format!("{name} as {}: {err}", ty.name));
            to_ascii(&data)
        }
    };

    let bytes = if zero { &[][..] } else { region.data };
    let mut row = row(region.address, bytes, text);
    attach_relocations(&mut row, len, relocations);
    vec![row]
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_semantic_type_names()
    {
        for semantic in SemanticType::ALL {
            assert_eq!(semantic.name().parse::<SemanticType>().ok(), Some(semantic));
        }
        assert_eq!("CString".parse::<SemanticType>().ok(), Some(SemanticType::CString));
        assert!("words".parse::<SemanticType>().is_err());
    }

    #[test]
    fn test_focus_overlap()
    {
        let focus = Focus {
            address: 0x1008,
            size: 4,
        };
        assert!(focus.overlaps(0x1008, 8));
        assert!(focus.overlaps(0x1004, 8));
        assert!(!focus.overlaps(0x1000, 8));
        assert!(!focus.overlaps(0x100c, 4));
        let point = Focus {
            address: 0x1000,
            size: 0,
        };
        assert!(point.overlaps(0x1000, 0));
    }

    #[test]
    fn test_zero_fill_rows()
    {
        let rows = zero_fill_rows(0x2000, 20);
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[2].address, 0x2010);
        assert_eq!(rows[2].len, 4);
        assert!(rows.iter().all(|row| row.bytes.is_empty() && row.text == "zero-fill"));
    }

    #[test]
    fn test_large_zero_fill_collapses()
    {
        let size = 1u64 << 32;
        let rows = zero_fill_rows(0x10_0000, size);
        assert_eq!(rows.len() as u64, ZERO_FILL_ROW_LIMIT);
        let last = rows.last().expect("rows");
        let covered = (ZERO_FILL_ROW_LIMIT - 1) * DATA_ROW_LEN as u64;
        assert_eq!(last.address, 0x10_0000 + covered);
        assert_eq!(last.len, size - covered);
        assert_eq!(last.text, format!("zero-fill ({:#x} bytes)", size - covered));
        assert_eq!(rows.iter().map(|row| row.len).sum::<u64>(), size);
    }

    #[test]
    fn test_focus_covers_whole_zero_fill_row()
    {
        let mut view = DecodedView {
            title: "__DATA,__bss".into(),
            semantic: SemanticType::Data,
            rows: zero_fill_rows(0x2000, 16),
            warnings: Vec::new(),
        };
        view.set_focus(Focus {
            address: 0x2004,
            size: 4,
        });
        assert_eq!(view.first_focused(), Some(0));
        assert!(!view.rows[1].focused);
    }
}
