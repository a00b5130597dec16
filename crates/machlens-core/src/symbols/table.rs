//! Symbol table listing (`nm`-style rows with decoded fields).

use super::demangle::make_symbol_name;
use crate::macho::strings::symbol_type_string;
use crate::macho::MachFile;
use crate::types::SymbolName;

/// One row of the symbol table listing.
#[derive(Debug, Clone)]
pub struct SymtabRow
{
    /// Index in the raw symbol table
    pub index: usize,
    pub name: SymbolName,
    /// `n_type`, e.g. `0x0e (N_SECT)\n0x01 (N_EXT)`
    pub kind: String,
    /// `n_sect`, e.g. `1 (__TEXT,__text)`
    pub section: String,
    /// `n_desc` flags
    pub desc: String,
    pub value: String,
    /// `nm(1)` type letter
    pub letter: char,
}

/// Describe every symbol in table order.
pub fn symtab_rows(file: &MachFile) -> Vec<SymtabRow>
{
    file.symbols
        .iter()
        .enumerate()
        .map(|(index, symbol)| SymtabRow {
            index,
            name: make_symbol_name(&symbol.name),
            kind: symbol_type_string(symbol.kind),
            section: file.section_number_string(symbol.sect),
            desc: file.symbol_desc_string(symbol),
            value: file.symbol_value_string(symbol),
            letter: file.symbol_char(symbol),
        })
        .collect()
}
