//! Mach-O parsing on top of the `object` crate's low-level reader.

use std::sync::Arc;

use gimli::RunTimeEndian;
use object::macho::{MachHeader32 as RawHeader32, MachHeader64 as RawHeader64};
use object::read::macho::{
    FatArch, LoadCommandVariant, MachHeader as _, MachOFatFile32, MachOFatFile64, Nlist, Section as _, Segment as _,
};
use object::{Endianness, FileKind};
use tracing::{debug, warn};

use super::{
    DylibCommand, DysymtabCommand, LoadCommand, MachFile, MachHeader, Reloc, RpathCommand, Section, SegmentCommand,
    Symbol, SymtabCommand,
};
use crate::error::{EngineError, Result};
use crate::types::Architecture;

impl MachFile
{
    /// Parse a thin or fat Mach-O image.
    ///
    /// For fat files the slice matching the host architecture is used, or
    /// the first slice when there is no match.
    ///
    /// ## Errors
    ///
    /// Returns `EngineError::Parse` if the bytes are not a Mach-O file or the
    /// header/load commands are malformed. Sections whose bytes lie outside
    /// the file are kept with empty data.
    pub fn parse(data: &[u8]) -> Result<Self>
    {
        match FileKind::parse(data)? {
            FileKind::MachO32 => parse_image::<RawHeader32<Endianness>>(data),
            FileKind::MachO64 => parse_image::<RawHeader64<Endianness>>(data),
            FileKind::MachOFat32 => {
                let fat = MachOFatFile32::parse(data)?;
                parse_image_slice(select_arch(fat.arches())?.data(data)?)
            }
            FileKind::MachOFat64 => {
                let fat = MachOFatFile64::parse(data)?;
                parse_image_slice(select_arch(fat.arches())?.data(data)?)
            }
            other => Err(EngineError::Parse(format!("unsupported file kind {other:?}"))),
        }
    }
}

fn select_arch<A: FatArch>(arches: &[A]) -> Result<&A>
{
    let host = Architecture::current();
    arches
        .iter()
        .find(|arch| Architecture::from_cpu_type(arch.cputype()) == host)
        .or_else(|| arches.first())
        .ok_or_else(|| EngineError::Parse("fat file has no architectures".to_string()))
}

fn parse_image_slice(data: &[u8]) -> Result<MachFile>
{
    match FileKind::parse(data)? {
        FileKind::MachO32 => parse_image::<RawHeader32<Endianness>>(data),
        FileKind::MachO64 => parse_image::<RawHeader64<Endianness>>(data),
        other => Err(EngineError::Parse(format!("unsupported fat slice {other:?}"))),
    }
}

fn parse_image<Mach: object::read::macho::MachHeader<Endian = Endianness>>(data: &[u8]) -> Result<MachFile>
{
    let header = Mach::parse(data, 0)?;
    let endian = header.endian()?;
    let cputype = header.cputype(endian);

    let mut load_commands = Vec::new();
    let mut sections = Vec::new();
    let mut symbols = Vec::new();

    let mut commands = header.load_commands(endian, data, 0)?;
    while let Some(command) = commands.next()? {
        let (cmd, cmdsize) = (command.cmd(), command.cmdsize());
        let load_command = match command.variant()? {
            LoadCommandVariant::Segment32(segment, section_data) => {
                LoadCommand::Segment(read_segment(endian, data, cputype, segment, section_data, &mut sections)?)
            }
            LoadCommandVariant::Segment64(segment, section_data) => {
                LoadCommand::Segment(read_segment(endian, data, cputype, segment, section_data, &mut sections)?)
            }
            LoadCommandVariant::Symtab(symtab) => {
                match symtab.symbols::<Mach, _>(endian, data) {
                    Ok(table) => {
                        for nlist in table.iter() {
                            let name = nlist.name(endian, table.strings()).unwrap_or_default();
                            symbols.push(Symbol {
                                name: String::from_utf8_lossy(name).into_owned(),
                                kind: nlist.n_type(),
                                sect: nlist.n_sect(),
                                desc: nlist.n_desc(endian),
                                value: nlist.n_value(endian).into(),
                            });
                        }
                    }
                    Err(err) => warn!(%err, "symbol table lies outside the file"),
                }
                LoadCommand::Symtab(SymtabCommand {
                    cmd,
                    cmdsize,
                    symoff: symtab.symoff.get(endian),
                    nsyms: symtab.nsyms.get(endian),
                    stroff: symtab.stroff.get(endian),
                    strsize: symtab.strsize.get(endian),
                })
            }
            LoadCommandVariant::Dysymtab(x) => LoadCommand::Dysymtab(DysymtabCommand {
                cmd,
                cmdsize,
                ilocalsym: x.ilocalsym.get(endian),
                nlocalsym: x.nlocalsym.get(endian),
                iextdefsym: x.iextdefsym.get(endian),
                nextdefsym: x.nextdefsym.get(endian),
                iundefsym: x.iundefsym.get(endian),
                nundefsym: x.nundefsym.get(endian),
                tocoff: x.tocoff.get(endian),
                ntoc: x.ntoc.get(endian),
                modtaboff: x.modtaboff.get(endian),
                nmodtab: x.nmodtab.get(endian),
                extrefsymoff: x.extrefsymoff.get(endian),
                nextrefsyms: x.nextrefsyms.get(endian),
                indirectsymoff: x.indirectsymoff.get(endian),
                nindirectsyms: x.nindirectsyms.get(endian),
                extreloff: x.extreloff.get(endian),
                nextrel: x.nextrel.get(endian),
                locreloff: x.locreloff.get(endian),
                nlocrel: x.nlocrel.get(endian),
            }),
            LoadCommandVariant::Dylib(x) | LoadCommandVariant::IdDylib(x) => LoadCommand::Dylib(DylibCommand {
                cmd,
                cmdsize,
                name: String::from_utf8_lossy(command.string(endian, x.dylib.name).unwrap_or_default()).into_owned(),
                timestamp: x.dylib.timestamp.get(endian),
                current_version: x.dylib.current_version.get(endian),
                compatibility_version: x.dylib.compatibility_version.get(endian),
            }),
            LoadCommandVariant::Rpath(x) => LoadCommand::Rpath(RpathCommand {
                cmd,
                cmdsize,
                path: String::from_utf8_lossy(command.string(endian, x.path).unwrap_or_default()).into_owned(),
            }),
            _ => LoadCommand::Other { cmd, cmdsize },
        };
        load_commands.push(load_command);
    }

    debug!(
        cputype,
        sections = sections.len(),
        symbols = symbols.len(),
        "parsed Mach-O image"
    );

    Ok(MachFile {
        header: MachHeader {
            magic: header.magic(),
            cputype,
            cpusubtype: header.cpusubtype(endian),
            filetype: header.filetype(endian),
            ncmds: header.ncmds(endian),
            sizeofcmds: header.sizeofcmds(endian),
            flags: header.flags(endian),
        },
        architecture: Architecture::from_cpu_type(cputype),
        endian: match endian {
            Endianness::Little => RunTimeEndian::Little,
            Endianness::Big => RunTimeEndian::Big,
        },
        load_commands,
        sections,
        symbols,
    })
}

fn read_segment<S: object::read::macho::Segment<Endian = Endianness>>(
    endian: Endianness,
    data: &[u8],
    cputype: u32,
    segment: &S,
    section_data: &[u8],
    sections: &mut Vec<Section>,
) -> Result<SegmentCommand>
{
    let mut indices = Vec::new();
    for raw in segment.sections(endian, section_data)? {
        let index = sections.len() + 1;
        let size: u64 = raw.size(endian).into();
        let offset = raw.offset(endian);
        let section_type = raw.flags(endian) & super::constants::SECTION_TYPE;
        let zero_fill = matches!(
            section_type,
            super::constants::S_ZEROFILL | super::constants::S_GB_ZEROFILL | super::constants::S_THREAD_LOCAL_ZEROFILL
        );

        let bytes: Arc<[u8]> = if zero_fill {
            Arc::from(Vec::new())
        } else {
            let start = offset as usize;
            match usize::try_from(size).ok().and_then(|len| data.get(start..start.checked_add(len)?)) {
                Some(bytes) => Arc::from(bytes),
                None => {
                    warn!(index, "section data lies outside the file");
                    Arc::from(Vec::new())
                }
            }
        };

        let raw_relocs = match raw.relocations(endian, data) {
            Ok(relocs) => relocs,
            Err(err) => {
                warn!(index, %err, "relocation table lies outside the file");
                &[]
            }
        };
        let relocs = raw_relocs
            .iter()
            .map(|relocation| {
                if relocation.r_scattered(endian, cputype) {
                    let info = relocation.scattered_info(endian);
                    Reloc {
                        address: info.r_address,
                        value: info.r_value,
                        kind: info.r_type,
                        length: info.r_length,
                        pcrel: info.r_pcrel,
                        is_extern: false,
                        scattered: true,
                    }
                } else {
                    let info = relocation.info(endian);
                    Reloc {
                        address: info.r_address,
                        value: info.r_symbolnum,
                        kind: info.r_type,
                        length: info.r_length,
                        pcrel: info.r_pcrel,
                        is_extern: info.r_extern,
                        scattered: false,
                    }
                }
            })
            .collect();

        sections.push(Section {
            index,
            segment_name: fixed_name(raw.segment_name()),
            name: fixed_name(raw.name()),
            addr: raw.addr(endian).into(),
            size,
            offset,
            align: raw.align(endian),
            reloff: raw.reloff(endian),
            nreloc: raw.nreloc(endian),
            flags: raw.flags(endian),
            data: bytes,
            relocs,
        });
        indices.push(index);
    }

    Ok(SegmentCommand {
        cmd: segment.cmd(endian),
        cmdsize: segment.cmdsize(endian),
        name: fixed_name(segment.name()),
        vmaddr: segment.vmaddr(endian).into(),
        vmsize: segment.vmsize(endian).into(),
        fileoff: segment.fileoff(endian).into(),
        filesize: segment.filesize(endian).into(),
        maxprot: segment.maxprot(endian),
        initprot: segment.initprot(endian),
        nsects: segment.nsects(endian),
        flags: segment.flags(endian),
        sections: indices,
    })
}

/// Segment/section names are 16-byte fields, NUL-padded.
fn fixed_name(raw: &[u8]) -> String
{
    let end = raw.iter().position(|&b| b == 0).unwrap_or(raw.len());
    String::from_utf8_lossy(&raw[..end]).into_owned()
}
