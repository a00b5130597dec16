//! # Mach-O model
//!
//! Owned, immutable model of a parsed Mach-O file: header, load commands,
//! sections (with bytes and relocations) and the raw symbol table.
//!
//! [`MachFile::parse`] builds the model with the `object` crate's low-level
//! Mach-O reader; tests and callers that already hold the pieces can use
//! [`MachFile::from_parts`] instead.

pub mod constants;
mod loader;
pub mod strings;
pub mod structure;

use std::sync::Arc;

use gimli::RunTimeEndian;

use self::constants::{
    MH_OBJECT, N_EXT, N_SECT, N_STAB, N_TYPE, SECTION_TYPE, S_GB_ZEROFILL, S_THREAD_LOCAL_ZEROFILL, S_ZEROFILL,
};
use crate::types::Architecture;

/// Raw `mach_header` fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MachHeader
{
    pub magic: u32,
    pub cputype: u32,
    pub cpusubtype: u32,
    pub filetype: u32,
    pub ncmds: u32,
    pub sizeofcmds: u32,
    pub flags: u32,
}

/// A section, with its file bytes and relocation entries
#[derive(Debug, Clone)]
pub struct Section
{
    /// 1-based index in load-command order (the `n_sect` numbering)
    pub index: usize,
    pub segment_name: String,
    pub name: String,
    pub addr: u64,
    pub size: u64,
    pub offset: u32,
    pub align: u32,
    pub reloff: u32,
    pub nreloc: u32,
    pub flags: u32,
    /// File bytes; empty for zero-fill sections
    pub data: Arc<[u8]>,
    pub relocs: Vec<Reloc>,
}

impl Section
{
    /// Section type (`flags & SECTION_TYPE`).
    pub fn section_type(&self) -> u32
    {
        self.flags & SECTION_TYPE
    }

    /// Zero-fill sections occupy no bytes in the file.
    pub fn is_zero_fill(&self) -> bool
    {
        matches!(self.section_type(), S_ZEROFILL | S_GB_ZEROFILL | S_THREAD_LOCAL_ZEROFILL)
    }

    pub fn end(&self) -> u64
    {
        self.addr.saturating_add(self.size)
    }

    pub fn contains(&self, addr: u64) -> bool
    {
        self.addr <= addr && addr < self.end()
    }

    /// `__TEXT,__text`
    pub fn label(&self) -> String
    {
        format!("{},{}", self.segment_name, self.name)
    }

    /// Bytes of `[addr, addr + len)`, if the range lies inside the on-disk data.
    pub fn bytes_at(&self, addr: u64, len: u64) -> Option<&[u8]>
    {
        let start = usize::try_from(addr.checked_sub(self.addr)?).ok()?;
        let end = start.checked_add(usize::try_from(len).ok()?)?;
        self.data.get(start..end)
    }
}

/// One relocation entry, scattered or not
///
/// For scattered entries `value` is an address; for extern entries it is a
/// symbol table index; otherwise it is a 1-based section number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Reloc
{
    /// Offset of the patched bytes from the start of the section
    pub address: u32,
    pub value: u32,
    /// Architecture-specific `r_type`
    pub kind: u8,
    /// log2 of the operand size
    pub length: u8,
    pub pcrel: bool,
    pub is_extern: bool,
    pub scattered: bool,
}

impl Reloc
{
    /// Operand size in bytes (`1 << length`).
    pub fn operand_size(&self) -> u64
    {
        1u64 << (self.length & 3)
    }
}

/// Raw `nlist` entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol
{
    pub name: String,
    /// `n_type`: STAB, PEXT, TYPE and EXT bitfields
    pub kind: u8,
    /// `n_sect`: 1-based section number, 0 for none
    pub sect: u8,
    pub desc: u16,
    pub value: u64,
}

impl Symbol
{
    pub fn is_stab(&self) -> bool
    {
        self.kind & N_STAB != 0
    }

    pub fn is_external(&self) -> bool
    {
        self.kind & N_EXT != 0
    }

    /// Defined in a section (and not a debugger entry).
    pub fn is_section_defined(&self) -> bool
    {
        !self.is_stab() && self.kind & N_TYPE == N_SECT
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentCommand
{
    pub cmd: u32,
    pub cmdsize: u32,
    pub name: String,
    pub vmaddr: u64,
    pub vmsize: u64,
    pub fileoff: u64,
    pub filesize: u64,
    pub maxprot: u32,
    pub initprot: u32,
    pub nsects: u32,
    pub flags: u32,
    /// 1-based indices into [`MachFile::sections`]
    pub sections: Vec<usize>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SymtabCommand
{
    pub cmd: u32,
    pub cmdsize: u32,
    pub symoff: u32,
    pub nsyms: u32,
    pub stroff: u32,
    pub strsize: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DysymtabCommand
{
    pub cmd: u32,
    pub cmdsize: u32,
    pub ilocalsym: u32,
    pub nlocalsym: u32,
    pub iextdefsym: u32,
    pub nextdefsym: u32,
    pub iundefsym: u32,
    pub nundefsym: u32,
    pub tocoff: u32,
    pub ntoc: u32,
    pub modtaboff: u32,
    pub nmodtab: u32,
    pub extrefsymoff: u32,
    pub nextrefsyms: u32,
    pub indirectsymoff: u32,
    pub nindirectsyms: u32,
    pub extreloff: u32,
    pub nextrel: u32,
    pub locreloff: u32,
    pub nlocrel: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DylibCommand
{
    pub cmd: u32,
    pub cmdsize: u32,
    pub name: String,
    pub timestamp: u32,
    pub current_version: u32,
    pub compatibility_version: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RpathCommand
{
    pub cmd: u32,
    pub cmdsize: u32,
    pub path: String,
}

/// A load command, in file order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadCommand
{
    Segment(SegmentCommand),
    Symtab(SymtabCommand),
    Dysymtab(DysymtabCommand),
    Dylib(DylibCommand),
    Rpath(RpathCommand),
    Other
    {
        cmd: u32,
        cmdsize: u32,
    },
}

impl LoadCommand
{
    pub fn cmd(&self) -> u32
    {
        match self {
            LoadCommand::Segment(x) => x.cmd,
            LoadCommand::Symtab(x) => x.cmd,
            LoadCommand::Dysymtab(x) => x.cmd,
            LoadCommand::Dylib(x) => x.cmd,
            LoadCommand::Rpath(x) => x.cmd,
            LoadCommand::Other { cmd, .. } => *cmd,
        }
    }

    pub fn cmdsize(&self) -> u32
    {
        match self {
            LoadCommand::Segment(x) => x.cmdsize,
            LoadCommand::Symtab(x) => x.cmdsize,
            LoadCommand::Dysymtab(x) => x.cmdsize,
            LoadCommand::Dylib(x) => x.cmdsize,
            LoadCommand::Rpath(x) => x.cmdsize,
            LoadCommand::Other { cmdsize, .. } => *cmdsize,
        }
    }
}

/// A parsed Mach-O file
#[derive(Debug, Clone)]
pub struct MachFile
{
    pub header: MachHeader,
    pub architecture: Architecture,
    pub endian: RunTimeEndian,
    pub load_commands: Vec<LoadCommand>,
    /// All sections in load-command order; `sections[n - 1]` is section `n`
    pub sections: Vec<Section>,
    pub symbols: Vec<Symbol>,
}

impl MachFile
{
    /// Assemble a file from already-decoded parts.
    ///
    /// Section indices are renumbered to match their position. A synthetic
    /// header is derived from `cputype`/`filetype`; load commands are empty.
    pub fn from_parts(
        cputype: u32,
        filetype: u32,
        endian: RunTimeEndian,
        mut sections: Vec<Section>,
        symbols: Vec<Symbol>,
    ) -> Self
    {
        for (i, section) in sections.iter_mut().enumerate() {
            section.index = i + 1;
        }
        let architecture = Architecture::from_cpu_type(cputype);
        let magic = if architecture.is_64_bit() {
            constants::MH_MAGIC_64
        } else {
            constants::MH_MAGIC
        };
        Self {
            header: MachHeader {
                magic,
                cputype,
                cpusubtype: 0,
                filetype,
                ncmds: 0,
                sizeofcmds: 0,
                flags: 0,
            },
            architecture,
            endian,
            load_commands: Vec::new(),
            sections,
            symbols,
        }
    }

    /// Section by its 1-based number.
    pub fn section(&self, number: u32) -> Option<&Section>
    {
        let index = usize::try_from(number).ok()?.checked_sub(1)?;
        self.sections.get(index)
    }

    pub fn section_by_name(&self, segment: &str, name: &str) -> Option<&Section>
    {
        self.sections
            .iter()
            .find(|s| s.segment_name == segment && s.name == name)
    }

    pub fn symbol(&self, index: u32) -> Option<&Symbol>
    {
        self.symbols.get(usize::try_from(index).ok()?)
    }

    pub fn is_object(&self) -> bool
    {
        self.header.filetype == MH_OBJECT
    }

    pub fn pointer_size(&self) -> u8
    {
        self.architecture.pointer_size_bytes()
    }

    /// Symbol defined in a zero-fill section.
    pub fn is_zero_fill_symbol(&self, symbol: &Symbol) -> bool
    {
        self.section(u32::from(symbol.sect)).is_some_and(Section::is_zero_fill)
    }

    /// `Object (AMD64)` style summary.
    pub fn description(&self) -> String
    {
        let kind = match self.header.filetype {
            0x1 => "Object",
            0x2 => "Executable",
            0x6 => "Dynamic Library",
            0x7 => "Dynamic Linker",
            0x8 => "Bundle",
            0xa => "Debug Symbols",
            0xb => "Kernel Extension",
            _ => "Mach-O",
        };
        format!("{kind} ({})", self.architecture.machine_name())
    }
}
