//! Relocation tables: one text row per raw relocation entry.

use crate::macho::strings::{reloc_length_string, reloc_type_string};
use crate::macho::{MachFile, Reloc, Section};
use crate::symbols::SymbolInfo;

/// Column headers, in row order.
pub const RELTAB_HEADER: [&str; 7] = ["Address", "Value", "Type", "Length", "PC Relative", "Extern", "Scattered"];

/// One relocation entry rendered as text columns
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReltabRow
{
    pub address: String,
    pub value: String,
    pub kind: String,
    pub length: String,
    pub pcrel: String,
    /// Empty for scattered entries
    pub is_extern: String,
    /// Empty for non-scattered entries
    pub scattered: String,
}

impl ReltabRow
{
    pub fn columns(&self) -> [&str; 7]
    {
        [
            &self.address,
            &self.value,
            &self.kind,
            &self.length,
            &self.pcrel,
            &self.is_extern,
            &self.scattered,
        ]
    }
}

fn row(file: &MachFile, reloc: &Reloc, address: String) -> ReltabRow
{
    ReltabRow {
        address,
        value: file.reloc_value_string(reloc),
        kind: reloc_type_string(file.architecture, reloc.kind),
        length: reloc_length_string(reloc.length),
        pcrel: reloc.pcrel.to_string(),
        is_extern: if reloc.scattered {
            String::new()
        } else {
            reloc.is_extern.to_string()
        },
        scattered: if reloc.scattered {
            reloc.scattered.to_string()
        } else {
            String::new()
        },
    }
}

/// `1 (__TEXT,__text) (12)`: section number, name and relocation count.
pub fn section_list(file: &MachFile) -> Vec<String>
{
    file.sections
        .iter()
        .map(|s| format!("{} ({}) ({})", s.index, s.label(), s.relocs.len()))
        .collect()
}

/// Every relocation of a section, addresses section-relative.
pub fn section_reltab(file: &MachFile, section: &Section) -> Vec<ReltabRow>
{
    section
        .relocs
        .iter()
        .map(|reloc| row(file, reloc, format!("{:#018x}", reloc.address)))
        .collect()
}

/// Relocations bound to a symbol group, with their host section.
pub fn symbol_reltab(file: &MachFile, info: &SymbolInfo) -> Vec<ReltabRow>
{
    info.relocations
        .iter()
        .map(|bound| {
            let address = match file.section(bound.section as u32) {
                Some(section) => format!(
                    "{:#018x}+{:#018x} ({})",
                    bound.reloc.address,
                    section.addr,
                    section.label()
                ),
                None => format!("{:#018x}", bound.reloc.address),
            };
            row(file, &bound.reloc, address)
        })
        .collect()
}
