//! # `__eh_frame` parsing
//!
//! Streams a `__eh_frame` section record by record and lays every field out
//! as an `(address, bytes, name, interpretation)` row. Records are grouped
//! the way unwinders see them: each CIE starts a [`CfiGroup`] and the FDEs
//! that point back at it are collected under it.
//!
//! ## Record layout
//!
//! ```text
//! length        u32, or 0xffffffff followed by a u64
//! id            u32: 0 for a CIE, otherwise the distance back to the CIE
//! body          CIE or FDE fields
//! ```
//!
//! Records are padded to the CPU pointer width. A zero length ends the
//! section.
//!
//! ## Failures
//!
//! A record that cannot be decoded keeps the fields read so far, gets an
//! error string, and adds a warning to [`EhFrame::warnings`]. Parsing then
//! continues with the next record, since the record length is read first.

pub mod encoding;
pub mod registers;

use std::collections::HashMap;

use gimli::{Endianity, RunTimeEndian};
use tracing::{debug, warn};

use self::encoding::{encoding_string, read_encoded_pointer, read_sleb128, read_uleb128, EncodedPointer};
use self::registers::register_string;
use crate::decode::scalar::hex_bytes;
use crate::error::{EngineError, Result};
use crate::macho::Section;
use crate::relocs::signed_hex;
use crate::symbols::SymbolTable;
use crate::types::Architecture;

const EXTENDED_LENGTH: u32 = 0xffff_ffff;
const DW_EH_PE_OMIT: u8 = 0xff;
const DW_EH_PE_INDIRECT: u8 = 0x80;

/// One decoded field
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EhField
{
    pub address: u64,
    pub bytes: Vec<u8>,
    pub name: &'static str,
    pub value: String,
}

impl EhField
{
    /// Bytes as `de ad be ef`.
    pub fn bytes_string(&self) -> String
    {
        hex_bytes(&self.bytes)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EhRecordKind
{
    Cie,
    Fde,
}

/// A CIE or FDE
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EhRecord
{
    pub kind: EhRecordKind,
    /// CIE number, or FDE number within its group
    pub number: usize,
    /// Offset of the length field inside the section
    pub offset: usize,
    pub address: u64,
    pub fields: Vec<EhField>,
    /// Why decoding stopped early
    pub error: Option<String>,
}

impl EhRecord
{
    /// `CIE 0`, `FDE 3`
    pub fn title(&self) -> String
    {
        match self.kind {
            EhRecordKind::Cie => format!("CIE {}", self.number),
            EhRecordKind::Fde => format!("FDE {}", self.number),
        }
    }

    pub fn field(&self, name: &str) -> Option<&EhField>
    {
        self.fields.iter().find(|field| field.name == name)
    }
}

/// A CIE and the FDEs that reference it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CfiGroup
{
    pub number: usize,
    pub cie: EhRecord,
    pub fdes: Vec<EhRecord>,
}

impl CfiGroup
{
    /// `CFI 0`
    pub fn title(&self) -> String
    {
        format!("CFI {}", self.number)
    }
}

/// Parsed `__eh_frame` section
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EhFrame
{
    pub title: String,
    pub groups: Vec<CfiGroup>,
    pub warnings: Vec<String>,
}

impl EhFrame
{
    /// Every record in section order.
    pub fn records(&self) -> Vec<&EhRecord>
    {
        let mut records: Vec<&EhRecord> = self
            .groups
            .iter()
            .flat_map(|group| std::iter::once(&group.cie).chain(group.fdes.iter()))
            .collect();
        records.sort_by_key(|record| record.offset);
        records
    }
}

/// Encodings a CIE hands down to its FDEs.
#[derive(Debug, Clone)]
struct CieInfo
{
    group: usize,
    augmentation: String,
    fde_encoding: u8,
    lsda_encoding: u8,
}

/// Parse the call-frame records of `section`.
pub fn parse_eh_frame(table: &SymbolTable, section: &Section) -> EhFrame
{
    let file = table.file();
    let mut parser = Parser {
        table,
        data: &section.data,
        base: section.addr,
        endian: file.endian,
        architecture: file.architecture,
        pointer_size: file.pointer_size(),
        cies: HashMap::new(),
        frame: EhFrame {
            title: section.label(),
            ..EhFrame::default()
        },
    };

    let mut offset = 0;
    while offset < parser.data.len() {
        match parser.record(offset) {
            Some(next) => offset = next,
            None => break,
        }
    }

    let frame = parser.frame;
    if !frame.warnings.is_empty() {
        warn!(section = %frame.title, warnings = frame.warnings.len(), "eh_frame parsed with warnings");
    }
    debug!(section = %frame.title, groups = frame.groups.len(), "parsed eh_frame");
    frame
}

/// Bounded cursor over one record that records each field it reads.
struct RecordReader<'a>
{
    data: &'a [u8],
    base: u64,
    pos: usize,
    end: usize,
    fields: Vec<EhField>,
}

impl<'a> RecordReader<'a>
{
    fn address(&self) -> u64
    {
        self.base.wrapping_add(self.pos as u64)
    }

    fn take(&mut self, what: &'static str, len: usize) -> Result<&'a [u8]>
    {
        let data = self.data;
        let bytes = data
            .get(self.pos..self.pos + len)
            .filter(|_| self.pos + len <= self.end)
            .ok_or_else(|| EngineError::truncated(what, self.pos, len, self.end.saturating_sub(self.pos)))?;
        self.pos += len;
        Ok(bytes)
    }

    /// Add a field spanning `[start, pos)`.
    fn push(&mut self, start: usize, name: &'static str, value: String)
    {
        self.fields.push(EhField {
            address: self.base.wrapping_add(start as u64),
            bytes: self.data[start..self.pos].to_vec(),
            name,
            value,
        });
    }

    fn uleb(&mut self, name: &'static str) -> Result<u64>
    {
        let start = self.pos;
        let (value, len) = read_uleb128(&self.data[..self.end], start)?;
        self.pos += len;
        self.push(start, name, value.to_string());
        Ok(value)
    }

    fn u8(&mut self, what: &'static str) -> Result<u8>
    {
        Ok(self.take(what, 1)?[0])
    }

    /// Consume everything up to `until` as one field.
    fn rest(&mut self, until: usize, name: &'static str)
    {
        let start = self.pos;
        self.pos = until.min(self.end).max(start);
        let len = self.pos - start;
        self.push(start, name, format!("{len} bytes"));
    }
}

struct Parser<'a>
{
    table: &'a SymbolTable,
    data: &'a [u8],
    base: u64,
    endian: RunTimeEndian,
    architecture: Architecture,
    pointer_size: u8,
    /// Section offset of each CIE; `None` when the CIE failed to decode
    cies: HashMap<usize, Option<CieInfo>>,
    frame: EhFrame,
}

impl Parser<'_>
{
    fn warn(&mut self, message: String)
    {
        debug!(%message, "eh_frame record");
        self.frame.warnings.push(message);
    }

    /// Parse the record at `offset` and return the offset of the next one.
    fn record(&mut self, offset: usize) -> Option<usize>
    {
        let address = self.base.wrapping_add(offset as u64);
        let mut reader = RecordReader {
            data: self.data,
            base: self.base,
            pos: offset,
            end: self.data.len(),
            fields: Vec::new(),
        };

        let Ok(length) = reader.take("record length", 4).map(|b| self.endian.read_u32(b)) else {
            self.warn(format!("truncated record header at {address:#x}"));
            return None;
        };
        let length = if length == EXTENDED_LENGTH {
            reader.push(offset, "Length", "extended".to_string());
            let start = reader.pos;
            let Ok(length) = reader.take("extended length", 8).map(|b| self.endian.read_u64(b)) else {
                self.warn(format!("truncated extended length at {address:#x}"));
                return None;
            };
            reader.push(start, "Extended Length", length.to_string());
            length
        } else {
            reader.push(offset, "Length", length.to_string());
            u64::from(length)
        };
        if length == 0 {
            debug!(address = format_args!("{address:#x}"), "eh_frame terminator");
            return None;
        }

        let body = reader.pos;
        let declared_end = usize::try_from(length).ok().and_then(|len| body.checked_add(len));
        let Some(declared_end) = declared_end else {
            self.warn(format!("record at {address:#x}: length {length} overflows the section"));
            return None;
        };
        reader.end = declared_end.min(self.data.len());
        let align = usize::from(self.pointer_size);
        let next = declared_end.div_ceil(align).saturating_mul(align);

        let id_start = reader.pos;
        let Ok(id) = reader.take("CIE id", 4).map(|b| self.endian.read_u32(b)) else {
            self.warn(format!("record at {address:#x}: truncated CIE id"));
            return Some(next);
        };

        if id == 0 {
            reader.push(id_start, "CIE ID", "0".to_string());
            let group = self.frame.groups.len();
            let result = self.cie_body(&mut reader, group);
            if declared_end > self.data.len() && result.is_ok() {
                self.finish_cie(offset, address, group, reader, Err(truncated_record(declared_end, self.data.len())));
            } else {
                self.finish_cie(offset, address, group, reader, result);
            }
        } else {
            let cie_offset = id_start.checked_sub(id as usize);
            let cie_address = self.base.wrapping_add(id_start as u64).wrapping_sub(u64::from(id));
            reader.push(id_start, "CIE Pointer", format!("-{id:#x} = {cie_address:#x}"));

            let info = match cie_offset.and_then(|cie_offset| self.cies.get(&cie_offset).cloned()) {
                Some(Some(info)) => info,
                known => {
                    let reason = if known.is_some() { "an undecodable" } else { "no" };
                    self.warn(format!("FDE at {address:#x} refers to {reason} CIE at {cie_address:#x}"));
                    return Some(next);
                }
            };

            let mut result = self.fde_body(&mut reader, &info);
            if declared_end > self.data.len() && result.is_ok() {
                result = Err(truncated_record(declared_end, self.data.len()));
            }
            let group = &mut self.frame.groups[info.group];
            let record = EhRecord {
                kind: EhRecordKind::Fde,
                number: group.fdes.len(),
                offset,
                address,
                fields: reader.fields,
                error: result.as_ref().err().map(ToString::to_string),
            };
            let title = record.title();
            group.fdes.push(record);
            if let Err(err) = result {
                self.warn(format!("{title} at {address:#x}: {err}"));
            }
        }
        Some(next)
    }

    fn finish_cie(
        &mut self,
        offset: usize,
        address: u64,
        group: usize,
        reader: RecordReader<'_>,
        result: Result<CieInfo>,
    )
    {
        let cie = EhRecord {
            kind: EhRecordKind::Cie,
            number: group,
            offset,
            address,
            fields: reader.fields,
            error: result.as_ref().err().map(ToString::to_string),
        };
        let title = cie.title();
        self.frame.groups.push(CfiGroup {
            number: group,
            cie,
            fdes: Vec::new(),
        });
        match result {
            Ok(info) => {
                self.cies.insert(offset, Some(info));
            }
            Err(err) => {
                self.cies.insert(offset, None);
                self.warn(format!("{title} at {address:#x}: {err}"));
            }
        }
    }

    fn cie_body(&self, reader: &mut RecordReader<'_>, group: usize) -> Result<CieInfo>
    {
        let start = reader.pos;
        let version = reader.u8("CIE version")?;
        reader.push(start, "Version", version.to_string());

        let start = reader.pos;
        let nul = reader.data[start..reader.end]
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| EngineError::truncated("augmentation string", start, 1, reader.end - start))?;
        let augmentation = String::from_utf8_lossy(&reader.data[start..start + nul]).into_owned();
        reader.pos = start + nul + 1;
        reader.push(start, "Augmentation String", augmentation.clone());

        if augmentation == "eh" {
            let start = reader.pos;
            let bytes = reader.take("EH data", usize::from(self.pointer_size))?;
            let value = match bytes.len() {
                8 => self.endian.read_u64(bytes),
                _ => u64::from(self.endian.read_u32(bytes)),
            };
            reader.push(start, "EH Data", format!("{value:#x}"));
        }

        reader.uleb("Code Alignment Factor")?;

        let start = reader.pos;
        let (data_alignment, len) = read_sleb128(&reader.data[..reader.end], start)?;
        reader.pos += len;
        reader.push(start, "Data Alignment Factor", data_alignment.to_string());

        let start = reader.pos;
        let return_register = if version < 3 {
            u64::from(reader.u8("return address register")?)
        } else {
            let (value, len) = read_uleb128(&reader.data[..reader.end], start)?;
            reader.pos += len;
            value
        };
        reader.push(
            start,
            "Return Address Register",
            register_string(self.architecture, return_register),
        );

        let mut info = CieInfo {
            group,
            augmentation: augmentation.clone(),
            fde_encoding: 0,
            lsda_encoding: DW_EH_PE_OMIT,
        };

        if let Some(letters) = augmentation.strip_prefix('z') {
            let data_len = reader.uleb("Augmentation Data Length")?;
            let data_end = reader.pos.saturating_add(usize::try_from(data_len).unwrap_or(usize::MAX));
            for letter in letters.chars() {
                match letter {
                    'P' => {
                        let encoding = self.encoding_field(reader, "Augmentation Data (Personality Encoding)")?;
                        self.pointer_field(reader, encoding, "Augmentation Data (Personality Pointer)")?;
                    }
                    'R' => {
                        info.fde_encoding = self.encoding_field(reader, "Augmentation Data (FDE Encoding)")?;
                    }
                    'L' => {
                        info.lsda_encoding = self.encoding_field(reader, "Augmentation Data (LSDA Encoding)")?;
                    }
                    _ => {
                        unknown_augmentation(reader, data_end)?;
                        break;
                    }
                }
            }
            finish_augmentation(reader, data_end)?;
        }

        reader.rest(reader.end, "Initial Instructions");
        Ok(info)
    }

    fn fde_body(&self, reader: &mut RecordReader<'_>, cie: &CieInfo) -> Result<()>
    {
        self.pointer_field(reader, cie.fde_encoding, "PC Begin")?;

        let start = reader.pos;
        let range = read_encoded_pointer(
            &reader.data[..reader.end],
            start,
            cie.fde_encoding & 0x0f,
            reader.address(),
            self.pointer_size,
            self.endian,
        )?;
        reader.pos += range.len;
        reader.push(start, "PC Range", range.raw.to_string());

        if let Some(letters) = cie.augmentation.strip_prefix('z') {
            let data_len = reader.uleb("Augmentation Data Length")?;
            let data_end = reader.pos.saturating_add(usize::try_from(data_len).unwrap_or(usize::MAX));
            for letter in letters.chars() {
                match letter {
                    'P' | 'R' => {}
                    'L' => self.pointer_field(reader, cie.lsda_encoding, "Augmentation Data (LSDA Pointer)")?,
                    _ => {
                        unknown_augmentation(reader, data_end)?;
                        break;
                    }
                }
            }
            finish_augmentation(reader, data_end)?;
        }

        reader.rest(reader.end, "Call Frame Instructions");
        Ok(())
    }

    fn encoding_field(&self, reader: &mut RecordReader<'_>, name: &'static str) -> Result<u8>
    {
        let start = reader.pos;
        let encoding = reader.u8("pointer encoding")?;
        reader.push(start, name, encoding_string(encoding));
        Ok(encoding)
    }

    fn pointer_field(&self, reader: &mut RecordReader<'_>, encoding: u8, name: &'static str) -> Result<()>
    {
        let start = reader.pos;
        let pointer = read_encoded_pointer(
            &reader.data[..reader.end],
            start,
            encoding,
            reader.address(),
            self.pointer_size,
            self.endian,
        )?;
        reader.pos += pointer.len;
        reader.push(start, name, self.pointer_string(&pointer, encoding));
        Ok(())
    }

    fn pointer_string(&self, pointer: &EncodedPointer, encoding: u8) -> String
    {
        if encoding == DW_EH_PE_OMIT {
            return "omitted".to_string();
        }
        if encoding & DW_EH_PE_INDIRECT != 0 {
            return format!("{:#x} (indirect)", pointer.raw);
        }
        match (encoding & 0x70, pointer.address) {
            (0x00, Some(address)) => self.table.sym_addr_string(address, true),
            (0x10, Some(address)) => format!(
                "pc{} = {}",
                signed_hex(pointer.raw as i64),
                self.table.sym_addr_string(address, true)
            ),
            _ => format!("{:#x}", pointer.raw),
        }
    }
}

fn truncated_record(declared_end: usize, available: usize) -> EngineError
{
    EngineError::truncated("record", available, declared_end - available, 0)
}

/// Bytes of an augmentation letter this parser does not know.
fn unknown_augmentation(reader: &mut RecordReader<'_>, data_end: usize) -> Result<()>
{
    if reader.pos > data_end {
        return Err(EngineError::Overflow {
            what: "augmentation data",
            offset: reader.pos as u64,
        });
    }
    if reader.pos < data_end {
        reader.rest(data_end, "Augmentation Data (Unknown)");
    }
    Ok(())
}

/// Check the declared augmentation length and show any bytes left over.
fn finish_augmentation(reader: &mut RecordReader<'_>, data_end: usize) -> Result<()>
{
    if reader.pos > data_end {
        return Err(EngineError::Overflow {
            what: "augmentation data",
            offset: reader.pos as u64,
        });
    }
    if reader.pos < data_end {
        if data_end > reader.end {
            return Err(EngineError::truncated(
                "augmentation data",
                reader.pos,
                data_end - reader.pos,
                reader.end - reader.pos,
            ));
        }
        reader.rest(data_end, "Augmentation Data (Remains)");
    }
    Ok(())
}
