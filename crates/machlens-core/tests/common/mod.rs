//! In-memory Mach-O fixtures shared by the integration tests

#![allow(dead_code)]

use std::sync::Arc;

use gimli::RunTimeEndian;
use machlens_core::macho::constants::{MH_OBJECT, N_EXT, N_SECT, N_UNDF};
use machlens_core::macho::{MachFile, Reloc, Section, Symbol};
use machlens_core::SymbolTable;

pub fn section(segment: &str, name: &str, addr: u64, flags: u32, data: &[u8]) -> Section
{
    Section {
        index: 0,
        segment_name: segment.into(),
        name: name.into(),
        addr,
        size: data.len() as u64,
        offset: 0,
        align: 0,
        reloff: 0,
        nreloc: 0,
        flags,
        data: Arc::from(data),
        relocs: Vec::new(),
    }
}

pub fn zero_fill(segment: &str, name: &str, addr: u64, flags: u32, size: u64) -> Section
{
    Section {
        size,
        data: Arc::from(Vec::new()),
        ..section(segment, name, addr, flags, &[])
    }
}

pub fn defined(name: &str, sect: u8, value: u64) -> Symbol
{
    Symbol {
        name: name.into(),
        kind: N_SECT | N_EXT,
        sect,
        desc: 0,
        value,
    }
}

pub fn undefined(name: &str) -> Symbol
{
    Symbol {
        name: name.into(),
        kind: N_UNDF | N_EXT,
        sect: 0,
        desc: 0,
        value: 0,
    }
}

pub fn reloc(address: u32, value: u32, kind: u8, length: u8, pcrel: bool, is_extern: bool) -> Reloc
{
    Reloc {
        address,
        value,
        kind,
        length,
        pcrel,
        is_extern,
        scattered: false,
    }
}

pub fn scattered(address: u32, value: u32, kind: u8, length: u8) -> Reloc
{
    Reloc {
        address,
        value,
        kind,
        length,
        pcrel: false,
        is_extern: false,
        scattered: true,
    }
}

pub fn object(cputype: u32, sections: Vec<Section>, symbols: Vec<Symbol>) -> MachFile
{
    MachFile::from_parts(cputype, MH_OBJECT, RunTimeEndian::Little, sections, symbols)
}

pub fn table(file: MachFile) -> Arc<SymbolTable>
{
    Arc::new(SymbolTable::new(Arc::new(file)))
}

fn name16(name: &str) -> [u8; 16]
{
    let mut field = [0u8; 16];
    field[..name.len()].copy_from_slice(name.as_bytes());
    field
}

/// Raw x86_64 `MH_OBJECT` image: one `__TEXT,__text` section holding `ret`
/// and one symbol `_main`. The relocation and symbol table locations are
/// taken as given, so callers can point them outside the file.
pub fn raw_object(reloff: u32, nreloc: u32, symoff: u32, nsyms: u32) -> Vec<u8>
{
    const TEXT_OFFSET: u32 = 208;
    let mut out = Vec::new();

    // mach_header_64
    for word in [0xfeed_facf_u32, 0x0100_0007, 3, 1, 2, 176, 0, 0] {
        out.extend_from_slice(&word.to_le_bytes());
    }

    // LC_SEGMENT_64 with one section_64
    out.extend_from_slice(&0x19_u32.to_le_bytes());
    out.extend_from_slice(&152_u32.to_le_bytes());
    out.extend_from_slice(&name16(""));
    for value in [0_u64, 1, u64::from(TEXT_OFFSET), 1] {
        out.extend_from_slice(&value.to_le_bytes());
    }
    for word in [7_u32, 7, 1, 0] {
        out.extend_from_slice(&word.to_le_bytes());
    }
    out.extend_from_slice(&name16("__text"));
    out.extend_from_slice(&name16("__TEXT"));
    out.extend_from_slice(&0_u64.to_le_bytes());
    out.extend_from_slice(&1_u64.to_le_bytes());
    for word in [TEXT_OFFSET, 0, reloff, nreloc, 0x8000_0400, 0, 0, 0] {
        out.extend_from_slice(&word.to_le_bytes());
    }

    // LC_SYMTAB
    for word in [2_u32, 24, symoff, nsyms, 232, 7] {
        out.extend_from_slice(&word.to_le_bytes());
    }

    assert_eq!(out.len(), TEXT_OFFSET as usize);
    out.push(0xc3);
    out.resize(216, 0);

    // nlist_64 for _main
    out.extend_from_slice(&1_u32.to_le_bytes());
    out.extend_from_slice(&[N_SECT | N_EXT, 1]);
    out.extend_from_slice(&0_u16.to_le_bytes());
    out.extend_from_slice(&0_u64.to_le_bytes());

    out.extend_from_slice(b"\0_main\0");
    out
}
