//! # Symbols
//!
//! Address-ordered symbol index and address resolution.
//!
//! [`SymbolTable::new`] keeps every section-defined, non-debug symbol,
//! groups symbols that share an address, and gives each group a byte
//! extent: the distance to the next distinct address in the same section,
//! or to the end of the section. Relocations are then bound to the group
//! whose extent covers them (see [`bind`]).
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use machlens_core::macho::MachFile;
//! use machlens_core::symbols::SymbolTable;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>>
//! {
//!     let bytes = std::fs::read("a.out")?;
//!     let file = Arc::new(MachFile::parse(&bytes)?);
//!     let table = SymbolTable::new(file);
//!     if let Some(hit) = table.lookup(0x1_0000_3f50) {
//!         println!("{} (base {:#x})", hit.names, hit.base);
//!     }
//!     Ok(())
//! }
//! ```

pub mod bind;
pub mod demangle;
pub mod table;

use std::sync::Arc;

use smallvec::SmallVec;

use crate::macho::{MachFile, Symbol};

pub use bind::BoundReloc;
pub use table::{symtab_rows, SymtabRow};

/// Derived facts about one distinct symbol address.
#[derive(Debug, Clone, Default)]
pub struct SymbolInfo
{
    /// Address shared by every alias in the group
    pub address: u64,
    /// Byte extent; 0 when the owning section is unknown
    pub size: u64,
    /// Symbol table indices of the aliases, in address-sort order
    pub aliases: SmallVec<[usize; 2]>,
    /// Relocations whose address falls inside `[address, address + size)`
    pub relocations: Vec<BoundReloc>,
}

impl SymbolInfo
{
    pub fn contains(&self, addr: u64) -> bool
    {
        self.address <= addr && addr < self.address.saturating_add(self.size)
    }
}

/// Result of [`SymbolTable::lookup`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Lookup
{
    /// Alias names joined with `|`, each with `+0x..` when not at the base
    pub names: String,
    /// Address of the covering group
    pub base: u64,
}

/// Immutable symbol index for one file
#[derive(Debug)]
pub struct SymbolTable
{
    file: Arc<MachFile>,
    /// One entry per distinct address, sorted by address
    groups: Vec<SymbolInfo>,
    /// Symbol table index -> position in `groups`
    group_of: Vec<Option<usize>>,
    warnings: Vec<String>,
}

impl SymbolTable
{
    /// Build the index and bind every relocation of every section.
    pub fn new(file: Arc<MachFile>) -> Self
    {
        let groups = build_groups(&file);
        let mut group_of = vec![None; file.symbols.len()];
        for (position, group) in groups.iter().enumerate() {
            for &alias in &group.aliases {
                group_of[alias] = Some(position);
            }
        }

        let mut table = Self {
            file,
            groups,
            group_of,
            warnings: Vec::new(),
        };
        bind::bind_relocations(&mut table);
        table
    }

    pub fn file(&self) -> &Arc<MachFile>
    {
        &self.file
    }

    /// All groups in address order.
    pub fn groups(&self) -> &[SymbolInfo]
    {
        &self.groups
    }

    /// Diagnostics collected while building (unbound relocations).
    pub fn warnings(&self) -> &[String]
    {
        &self.warnings
    }

    /// Group for a symbol table index, if the symbol is section-defined.
    pub fn info_for_symbol(&self, index: usize) -> Option<&SymbolInfo>
    {
        let position = (*self.group_of.get(index)?)?;
        self.groups.get(position)
    }

    /// Group whose extent starts at or before `addr` (upper bound − 1).
    fn candidate(&self, addr: u64) -> Option<usize>
    {
        self.groups
            .partition_point(|group| group.address <= addr)
            .checked_sub(1)
    }

    /// Group whose extent covers `addr`.
    pub fn covering(&self, addr: u64) -> Option<&SymbolInfo>
    {
        let group = &self.groups[self.candidate(addr)?];
        (group.address != 0 && group.contains(addr)).then_some(group)
    }

    /// Resolve an address to the names of the covering group.
    ///
    /// ## Returns
    ///
    /// `None` when no group contains `addr`: below the first symbol, past
    /// the last symbol's extent, or in a gap between extents.
    pub fn lookup(&self, addr: u64) -> Option<Lookup>
    {
        let group = self.covering(addr)?;
        let offset = addr - group.address;
        let names: Vec<String> = group
            .aliases
            .iter()
            .filter_map(|&index| self.file.symbols.get(index))
            .map(|symbol| {
                if offset == 0 {
                    symbol.name.clone()
                } else {
                    format!("{}+{offset:#x}", symbol.name)
                }
            })
            .collect();
        Some(Lookup {
            names: names.join("|"),
            base: group.address,
        })
    }

    /// Symbolic text for `addr`; with `force`, falls back to `0x..`.
    pub fn sym_addr_string(&self, addr: u64, force: bool) -> String
    {
        match self.lookup(addr) {
            Some(hit) => hit.names,
            None if force => format!("{addr:#x}"),
            None => String::new(),
        }
    }

    /// First symbol whose name matches exactly.
    pub fn find_by_name(&self, name: &str) -> Option<usize>
    {
        self.file.symbols.iter().position(|symbol| symbol.name == name)
    }

    pub(crate) fn push_warning(&mut self, warning: String)
    {
        self.warnings.push(warning);
    }
}

/// Sort section-defined symbols by address and collapse aliases.
fn build_groups(file: &MachFile) -> Vec<SymbolInfo>
{
    let mut sorted: Vec<(usize, &Symbol)> = file
        .symbols
        .iter()
        .enumerate()
        .filter(|(_, symbol)| symbol.is_section_defined())
        .collect();
    // stable: aliases keep symbol table order
    sorted.sort_by_key(|(_, symbol)| symbol.value);

    let section_end = |symbol: &Symbol| {
        file.section(u32::from(symbol.sect))
            .map_or(0, |section| section.end().saturating_sub(symbol.value))
    };

    let mut groups: Vec<SymbolInfo> = Vec::new();
    let mut i = 0;
    while i < sorted.len() {
        let (index, symbol) = sorted[i];
        let mut group = SymbolInfo {
            address: symbol.value,
            ..SymbolInfo::default()
        };
        group.aliases.push(index);

        let mut j = i + 1;
        while j < sorted.len() && sorted[j].1.value == symbol.value {
            group.aliases.push(sorted[j].0);
            j += 1;
        }

        group.size = match sorted.get(j) {
            Some((_, next)) if next.sect == symbol.sect => next.value - symbol.value,
            _ => section_end(symbol),
        };
        groups.push(group);
        i = j;
    }
    groups
}
