//! # Disassembly
//!
//! Architecture dispatch for single-instruction decoders.
//!
//! Every backend formats one instruction at a time and annotates branch
//! targets and memory or pc-relative operands with
//! [`SymbolTable::lookup`]. Immediates are left as numbers. A failed
//! decode yields `?` and a minimal length (1 byte, or 4 on fixed-width
//! ISAs) so callers always make progress.
//!
//! ## Backends
//!
//! - **x86 / x86_64**: `iced-x86` with the GNU assembler formatter
//! - **ARM / ARM64 / PowerPC**: `capstone`
//!
//! Any other CPU type has no disassembler; [`for_architecture`] returns
//! `None` and the caller falls back to a byte dump.

mod risc;
mod x86;

use std::sync::Arc;

use tracing::warn;

pub use self::risc::CapstoneDisassembler;
pub use self::x86::X86Disassembler;
use crate::symbols::SymbolTable;
use crate::types::Architecture;

/// One-instruction-at-a-time decoder.
pub trait Disassembler
{
    /// Decode the instruction at the start of `code`, located at `pc`.
    ///
    /// ## Returns
    ///
    /// The instruction text and its length in bytes. The length is never
    /// zero; on failure the text is `?`.
    fn decode(&mut self, code: &[u8], pc: u64) -> (String, usize);
}

/// Disassembler for the file behind `table`, if its CPU is supported.
pub fn for_architecture(table: &Arc<SymbolTable>) -> Option<Box<dyn Disassembler>>
{
    let file = table.file();
    match file.architecture {
        Architecture::X86 => Some(Box::new(X86Disassembler::new(32, Arc::clone(table)))),
        Architecture::X86_64 => Some(Box::new(X86Disassembler::new(64, Arc::clone(table)))),
        Architecture::Arm | Architecture::Arm64 | Architecture::PowerPc | Architecture::PowerPc64 => {
            match CapstoneDisassembler::new(file.architecture, Arc::clone(table)) {
                Ok(disassembler) => Some(Box::new(disassembler)),
                Err(err) => {
                    warn!(architecture = %file.architecture, error = %err, "capstone initialisation failed");
                    None
                }
            }
        }
        Architecture::Unknown(_) => None,
    }
}

/// A decoded instruction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instruction
{
    pub address: u64,
    pub len: usize,
    pub text: String,
}

/// Disassemble all of `code`, starting at `pc`.
///
/// The cursor always advances by at least one byte, and never past the
/// end of `code`.
pub fn disassemble(disassembler: &mut dyn Disassembler, code: &[u8], pc: u64) -> Vec<Instruction>
{
    let mut out = Vec::new();
    let mut cursor = 0;
    while cursor < code.len() {
        let address = pc.wrapping_add(cursor as u64);
        let (text, len) = disassembler.decode(&code[cursor..], address);
        let len = len.clamp(1, code.len() - cursor);
        out.push(Instruction { address, len, text });
        cursor += len;
    }
    out
}

/// Append ` <symbol>` for the last hex literal of an instruction whose
/// operand is known to be an address.
pub(crate) fn annotate(table: &SymbolTable, text: &mut String)
{
    let Some(start) = text.rfind("0x") else {
        return;
    };
    let digits: String = text[start + 2..]
        .chars()
        .take_while(char::is_ascii_hexdigit)
        .collect();
    let Ok(address) = u64::from_str_radix(&digits, 16) else {
        return;
    };
    if let Some(hit) = table.lookup(address) {
        text.push_str(&format!(" <{}>", hit.names));
    }
}
