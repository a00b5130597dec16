//! Human-readable renderings of Mach-O header, load command, section,
//! symbol and relocation fields.
//!
//! Multi-valued fields (flag sets) are rendered one flag per line.

use super::constants::{
    lookup_name, ARM64_RELOC_NAMES, ARM_RELOC_NAMES, CPU_SUBTYPE_ARM64_NAMES, CPU_SUBTYPE_ARM_NAMES, CPU_SUBTYPE_LIB64,
    CPU_SUBTYPE_POWERPC_NAMES, CPU_SUBTYPE_X86_64_NAMES, CPU_SUBTYPE_X86_NAMES, CPU_TYPE_ARM, CPU_TYPE_ARM64,
    CPU_TYPE_NAMES, CPU_TYPE_POWERPC, CPU_TYPE_POWERPC64, CPU_TYPE_X86, CPU_TYPE_X86_64, DYNAMIC_LOOKUP_ORDINAL,
    EXECUTABLE_ORDINAL, FILE_FLAG_NAMES, FILE_TYPE_NAMES, GENERIC_RELOC_NAMES, LC_ID_DYLIB, LOAD_COMMAND_NAMES,
    MAGIC_NAMES, N_ABS, N_ALT_ENTRY, N_ARM_THUMB_DEF, N_DESC_DISCARDED, N_EXT, N_INDR, N_NO_DEAD_STRIP, N_PBUD, N_PEXT,
    N_REF_TO_WEAK, N_SECT, N_STAB, N_SYMBOL_RESOLVER, N_TYPE, N_UNDF, N_WEAK_DEF, N_WEAK_REF, PPC_RELOC_NAMES,
    REFERENCED_DYNAMICALLY, REFERENCE_TYPE, REFERENCE_TYPE_NAMES, SECTION_ATTRIBUTE_NAMES, SECTION_TYPE,
    SECTION_TYPE_NAMES, SEGMENT_FLAG_NAMES, SELF_LIBRARY_ORDINAL, STAB_NAMES, SYMBOL_TYPE_NAMES, VM_PROT_EXECUTE,
    VM_PROT_READ, VM_PROT_WRITE, X86_64_RELOC_NAMES,
};
use super::{LoadCommand, MachFile, Reloc, Symbol};
use crate::types::Architecture;

const MH_TWOLEVEL: u32 = 0x80;

fn named32(value: u32, name: Option<&str>) -> String
{
    format!("{value:#010x} ({})", name.unwrap_or("?"))
}

pub fn magic_string(magic: u32) -> String
{
    named32(magic, lookup_name(MAGIC_NAMES, magic))
}

pub fn cpu_type_string(cputype: u32) -> String
{
    named32(cputype, lookup_name(CPU_TYPE_NAMES, cputype))
}

/// `cpusubtype`, with `CPU_SUBTYPE_LIB64` split out on its own line.
pub fn cpu_subtype_string(cputype: u32, cpusubtype: u32) -> String
{
    let mut lines = Vec::new();
    let mut sub = cpusubtype;
    if cputype != CPU_TYPE_X86 && cputype != CPU_TYPE_ARM && cputype != CPU_TYPE_POWERPC && sub & CPU_SUBTYPE_LIB64 != 0
    {
        lines.push(named32(CPU_SUBTYPE_LIB64, Some("CPU_SUBTYPE_LIB64")));
        sub ^= CPU_SUBTYPE_LIB64;
    }
    let table = match cputype {
        CPU_TYPE_X86 => CPU_SUBTYPE_X86_NAMES,
        CPU_TYPE_X86_64 => CPU_SUBTYPE_X86_64_NAMES,
        CPU_TYPE_ARM => CPU_SUBTYPE_ARM_NAMES,
        CPU_TYPE_ARM64 => CPU_SUBTYPE_ARM64_NAMES,
        CPU_TYPE_POWERPC | CPU_TYPE_POWERPC64 => CPU_SUBTYPE_POWERPC_NAMES,
        _ => &[],
    };
    lines.push(named32(sub, lookup_name(table, sub)));
    lines.join("\n")
}

pub fn file_type_string(filetype: u32) -> String
{
    named32(filetype, lookup_name(FILE_TYPE_NAMES, filetype))
}

/// One line per set bit, named from a bit-indexed table.
fn bit_flags_string(flags: u32, names: &[&str]) -> String
{
    let lines: Vec<String> = (0..32)
        .filter(|bit| flags & (1 << bit) != 0)
        .map(|bit| named32(1 << bit, names.get(bit).copied()))
        .collect();
    if lines.is_empty() {
        return "0x00000000".to_string();
    }
    lines.join("\n")
}

pub fn file_flags_string(flags: u32) -> String
{
    bit_flags_string(flags, FILE_FLAG_NAMES)
}

pub fn segment_flags_string(flags: u32) -> String
{
    bit_flags_string(flags, SEGMENT_FLAG_NAMES)
}

pub fn load_command_name(cmd: u32) -> &'static str
{
    lookup_name(LOAD_COMMAND_NAMES, cmd).unwrap_or("?")
}

pub fn load_command_string(cmd: u32) -> String
{
    named32(cmd, Some(load_command_name(cmd)))
}

/// Packed `xxxx.yy.zz` dylib version.
pub fn version_string(version: u32) -> String
{
    format!(
        "{version:#010x} ({}.{}.{})",
        version >> 16,
        (version >> 8) & 0xff,
        version & 0xff
    )
}

/// `0o5 (r-x)`
pub fn vmprot_string(prot: u32) -> String
{
    let r = if prot & VM_PROT_READ != 0 { 'r' } else { '-' };
    let w = if prot & VM_PROT_WRITE != 0 { 'w' } else { '-' };
    let x = if prot & VM_PROT_EXECUTE != 0 { 'x' } else { '-' };
    format!("{prot:#o} ({r}{w}{x})")
}

/// Section type followed by each attribute bit.
pub fn section_flags_string(flags: u32) -> String
{
    let section_type = flags & SECTION_TYPE;
    let mut lines = vec![named32(section_type, lookup_name(SECTION_TYPE_NAMES, section_type))];
    let mut rest = flags & !SECTION_TYPE;
    for &(bit, name) in SECTION_ATTRIBUTE_NAMES {
        if rest & bit != 0 {
            lines.push(named32(bit, Some(name)));
            rest &= !bit;
        }
    }
    if rest != 0 {
        lines.push(format!("{rest:#010x} (??)"));
    }
    lines.join("\n")
}

/// `n_type` broken into its fields: `0x0e (N_SECT)` then `0x01 (N_EXT)`.
pub fn symbol_type_string(kind: u8) -> String
{
    let mut lines = Vec::new();
    if kind & N_STAB != 0 {
        let name = lookup_name(STAB_NAMES, kind).unwrap_or("N_STAB");
        lines.push(format!("{kind:#04x} ({name})"));
        return lines.join("\n");
    }
    let ty = kind & N_TYPE;
    lines.push(format!("{ty:#04x} ({})", lookup_name(SYMBOL_TYPE_NAMES, ty).unwrap_or("?")));
    if kind & N_PEXT != 0 {
        lines.push("0x10 (N_PEXT)".to_string());
    }
    if kind & N_EXT != 0 {
        lines.push("0x01 (N_EXT)".to_string());
    }
    lines.join("\n")
}

/// Relocation `r_type` named per CPU: `2 (X86_64_RELOC_BRANCH)`.
pub fn reloc_type_string(architecture: Architecture, kind: u8) -> String
{
    let table = match architecture {
        Architecture::X86 => GENERIC_RELOC_NAMES,
        Architecture::X86_64 => X86_64_RELOC_NAMES,
        Architecture::Arm => ARM_RELOC_NAMES,
        Architecture::Arm64 => ARM64_RELOC_NAMES,
        Architecture::PowerPc | Architecture::PowerPc64 => PPC_RELOC_NAMES,
        Architecture::Unknown(_) => &[],
    };
    format!("{kind} ({})", lookup_name(table, kind).unwrap_or("?"))
}

pub fn reloc_length_string(length: u8) -> String
{
    match length {
        0 => "0 (byte)".to_string(),
        1 => "1 (word)".to_string(),
        2 => "2 (long)".to_string(),
        3 => "3 (quad)".to_string(),
        other => format!("{other} (?)"),
    }
}

impl MachFile
{
    /// `seg,sect` for a 1-based section number.
    pub fn section_label(&self, number: u32) -> Option<String>
    {
        self.section(number).map(super::Section::label)
    }

    /// `0 (NO_SECT)`, `1 (__TEXT,__text)` or `9 (?)`.
    pub fn section_number_string(&self, number: u8) -> String
    {
        if number == 0 {
            return "0 (NO_SECT)".to_string();
        }
        match self.section_label(u32::from(number)) {
            Some(label) => format!("{number} ({label})"),
            None => format!("{number} (?)"),
        }
    }

    /// Libraries referenced by two-level namespace ordinals (1-based).
    pub fn imported_libraries(&self) -> Vec<&str>
    {
        self.load_commands
            .iter()
            .filter_map(|lc| match lc {
                LoadCommand::Dylib(dylib) if dylib.cmd != LC_ID_DYLIB => Some(dylib.name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// `n_desc` broken into reference type, flags, library ordinal and
    /// common alignment, depending on the symbol kind and file type.
    pub fn symbol_desc_string(&self, symbol: &Symbol) -> String
    {
        if symbol.is_stab() {
            return format!("{:#06x}", symbol.desc);
        }

        let ty = symbol.kind & N_TYPE;
        let undefined = ty == N_UNDF || ty == N_PBUD;
        let external = symbol.kind & (N_EXT | N_PEXT) != 0;
        let mut desc = symbol.desc;
        let mut lines = Vec::new();

        if undefined {
            let v = desc & REFERENCE_TYPE;
            lines.push(format!("{v:#06x} ({})", lookup_name(REFERENCE_TYPE_NAMES, v).unwrap_or("?")));
            desc &= !v;
        }
        if desc & N_ARM_THUMB_DEF != 0 {
            lines.push("0x0008 (N_ARM_THUMB_DEF)".to_string());
            desc &= !N_ARM_THUMB_DEF;
        }
        if external && desc & REFERENCED_DYNAMICALLY != 0 {
            lines.push("0x0010 (REFERENCED_DYNAMICALLY)".to_string());
            desc &= !REFERENCED_DYNAMICALLY;
        }
        if self.is_object() {
            if desc & N_NO_DEAD_STRIP != 0 {
                lines.push("0x0020 (N_NO_DEAD_STRIP)".to_string());
                desc &= !N_NO_DEAD_STRIP;
            }
            if ty == N_UNDF && symbol.value != 0 {
                let v = desc & (0x0f << 8);
                lines.push(format!("{v:#06x} (alignment: {})", 1u32 << (v >> 8)));
                desc &= !v;
            }
        } else if desc & N_DESC_DISCARDED != 0 {
            lines.push("0x0020 (N_DESC_DISCARDED)".to_string());
            desc &= !N_DESC_DISCARDED;
        }

        if undefined {
            if desc & N_WEAK_REF != 0 {
                lines.push("0x0040 (N_WEAK_REF)".to_string());
                desc &= !N_WEAK_REF;
            }
            if desc & N_REF_TO_WEAK != 0 {
                lines.push("0x0080 (N_REF_TO_WEAK)".to_string());
                desc &= !N_REF_TO_WEAK;
            }
        } else if external && desc & N_WEAK_DEF != 0 {
            lines.push("0x0080 (N_WEAK_DEF)".to_string());
            desc &= !N_WEAK_DEF;
        }

        if self.is_object() {
            if desc & N_SYMBOL_RESOLVER != 0 {
                lines.push("0x0100 (N_SYMBOL_RESOLVER)".to_string());
                desc &= !N_SYMBOL_RESOLVER;
            }
            if desc & N_ALT_ENTRY != 0 {
                lines.push("0x0200 (N_ALT_ENTRY)".to_string());
                desc &= !N_ALT_ENTRY;
            }
        } else if self.header.flags & MH_TWOLEVEL != 0 && undefined {
            let v = desc & 0xff00;
            let ordinal = (v >> 8) as u8;
            let name = match ordinal {
                SELF_LIBRARY_ORDINAL => Some("SELF_LIBRARY_ORDINAL".to_string()),
                DYNAMIC_LOOKUP_ORDINAL => Some("DYNAMIC_LOOKUP_ORDINAL".to_string()),
                EXECUTABLE_ORDINAL => Some("EXECUTABLE_ORDINAL".to_string()),
                n => self
                    .imported_libraries()
                    .get(usize::from(n) - 1)
                    .map(|lib| (*lib).to_string()),
            };
            lines.push(format!("{v:#06x} ({})", name.as_deref().unwrap_or("?")));
            desc &= !v;
        }

        if desc != 0 {
            lines.push(format!("{desc:#06x} (??)"));
        }
        if lines.is_empty() {
            return "0x0000".to_string();
        }
        lines.join("\n")
    }

    /// Symbol value column: address, or the size of a common symbol.
    pub fn symbol_value_string(&self, symbol: &Symbol) -> String
    {
        let ty = symbol.kind & N_TYPE;
        if symbol.is_stab() {
            return format!("{:#018x}", symbol.value);
        }
        match ty {
            N_UNDF if symbol.value != 0 => format!("{} (size: {})", symbol.value, symbol.value),
            N_UNDF => String::new(),
            N_PBUD if symbol.value != 0 => format!("{} (?)", symbol.value),
            N_PBUD => String::new(),
            _ => format!("{:#018x}", symbol.value),
        }
    }

    /// `nm(1)` style type letter; upper case for external symbols.
    pub fn symbol_char(&self, symbol: &Symbol) -> char
    {
        if symbol.is_stab() {
            return '-';
        }
        let c = match symbol.kind & N_TYPE {
            N_UNDF if symbol.value == 0 => 'u',
            N_UNDF => 'c',
            N_ABS => 'a',
            N_SECT if symbol.sect == 0 => 'b',
            N_SECT => match self.section(u32::from(symbol.sect)) {
                Some(s) if s.segment_name == "__TEXT" && s.name == "__text" => 't',
                Some(s) if s.segment_name == "__DATA" && s.name == "__data" => 'd',
                _ => 's',
            },
            N_PBUD => 'u',
            N_INDR => 'i',
            _ => return '?',
        };
        if symbol.is_external() {
            c.to_ascii_uppercase()
        } else {
            c
        }
    }

    /// Relocation value column: `3 (_sym)`, `2 (__TEXT,__text)` or the
    /// scattered address.
    pub fn reloc_value_string(&self, reloc: &Reloc) -> String
    {
        if reloc.scattered {
            return format!("{:#018x} (?)", reloc.value);
        }
        if reloc.is_extern {
            return match self.symbol(reloc.value) {
                Some(symbol) => format!("{} ({})", reloc.value, symbol.name),
                None => format!("{} (?)", reloc.value),
            };
        }
        match self.section_label(reloc.value) {
            Some(label) => format!("{} ({label})", reloc.value),
            None => format!("{} (?)", reloc.value),
        }
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_symbol_type_string()
    {
        assert_eq!(symbol_type_string(N_SECT | N_EXT), "0x0e (N_SECT)\n0x01 (N_EXT)");
        assert_eq!(symbol_type_string(0), "0x00 (N_UNDF)");
        assert_eq!(symbol_type_string(N_SECT | N_PEXT), "0x0e (N_SECT)\n0x10 (N_PEXT)");
    }

    #[test]
    fn test_vmprot_string()
    {
        assert_eq!(vmprot_string(5), "0o5 (r-x)");
        assert_eq!(vmprot_string(7), "0o7 (rwx)");
        assert_eq!(vmprot_string(0), "0o0 (---)");
    }

    #[test]
    fn test_version_string()
    {
        assert_eq!(version_string(0x0001_0203), "0x00010203 (1.2.3)");
    }

    #[test]
    fn test_section_flags_string()
    {
        assert_eq!(
            section_flags_string(0x8000_0400),
            "0x00000000 (S_REGULAR)\n0x80000000 (S_ATTR_PURE_INSTRUCTIONS)\n0x00000400 (S_ATTR_SOME_INSTRUCTIONS)"
        );
    }

    #[test]
    fn test_file_flags_string()
    {
        assert_eq!(file_flags_string(0), "0x00000000");
        assert_eq!(
            file_flags_string(0x2000 | 0x1),
            "0x00000001 (MH_NOUNDEFS)\n0x00002000 (MH_SUBSECTIONS_VIA_SYMBOLS)"
        );
    }

    #[test]
    fn test_reloc_type_string()
    {
        assert_eq!(reloc_type_string(Architecture::X86_64, 2), "2 (X86_64_RELOC_BRANCH)");
        assert_eq!(reloc_type_string(Architecture::Unknown(3), 2), "2 (?)");
        assert_eq!(reloc_length_string(3), "3 (quad)");
    }

    #[test]
    fn test_cpu_subtype_lib64()
    {
        assert_eq!(
            cpu_subtype_string(CPU_TYPE_X86_64, 0x8000_0003),
            "0x80000000 (CPU_SUBTYPE_LIB64)\n0x00000003 (CPU_SUBTYPE_X86_64_ALL)"
        );
    }
}
