//! Relocation binding.
//!
//! Every relocation is attached to the symbol group whose extent contains
//! the whole patched operand (`section.addr + r_address`, `1 << r_length`
//! bytes). The
//! lookup is the same upper-bound search [`SymbolTable::lookup`] uses, so a
//! relocation can only ever bind to the group that covers it.
//!
//! `PAIR` entries only carry the second operand of the preceding
//! `SECTDIFF` and are not bound on their own.

use std::sync::Arc;

use tracing::debug;

use super::SymbolTable;
use crate::macho::constants::{ARM_RELOC_PAIR, GENERIC_RELOC_PAIR, PPC_RELOC_PAIR};
use crate::macho::{MachFile, Reloc, Section};
use crate::types::Architecture;

/// A relocation bound to a symbol group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundReloc
{
    pub reloc: Reloc,
    /// 1-based number of the section that holds the relocation
    pub section: usize,
    /// Position in that section's relocation list
    pub position: usize,
}

impl BoundReloc
{
    /// Absolute address of the patched bytes.
    pub fn address(&self, file: &MachFile) -> u64
    {
        file.section(self.section as u32)
            .map_or(u64::from(self.reloc.address), |section| {
                section.addr.wrapping_add(u64::from(self.reloc.address))
            })
    }
}

/// True for `PAIR` records on CPUs that use them.
pub fn is_pair(architecture: Architecture, reloc: &Reloc) -> bool
{
    match architecture {
        Architecture::X86 => reloc.kind == GENERIC_RELOC_PAIR,
        Architecture::Arm => reloc.kind == ARM_RELOC_PAIR,
        Architecture::PowerPc | Architecture::PowerPc64 => reloc.kind == PPC_RELOC_PAIR,
        _ => false,
    }
}

pub(crate) fn bind_relocations(table: &mut SymbolTable)
{
    let file = Arc::clone(&table.file);
    for section in &file.sections {
        bind_section(table, &file, section);
    }
}

fn bind_section(table: &mut SymbolTable, file: &MachFile, section: &Section)
{
    for (position, reloc) in section.relocs.iter().enumerate() {
        if is_pair(file.architecture, reloc) {
            continue;
        }
        let addr = section.addr.wrapping_add(u64::from(reloc.address));
        let end = addr.saturating_add(reloc.operand_size());
        let target = table.candidate(addr).filter(|&group| {
            let info = &table.groups[group];
            info.contains(addr) && end <= info.address.saturating_add(info.size)
        });

        match target {
            Some(group) => table.groups[group].relocations.push(BoundReloc {
                reloc: *reloc,
                section: section.index,
                position,
            }),
            None => {
                debug!(
                    address = format_args!("{addr:#x}"),
                    section = %section.label(),
                    "unbound relocation"
                );
                table.push_warning(format!(
                    "relocation at {addr:#x} in {} is not covered by any symbol",
                    section.label()
                ));
            }
        }
    }
}
