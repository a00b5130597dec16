//! x86 and x86_64 through `iced-x86`.

use std::sync::Arc;

use iced_x86::{Decoder, DecoderOptions, Formatter, GasFormatter, Instruction, OpKind, SymbolResolver, SymbolResult};

use super::Disassembler;
use crate::symbols::SymbolTable;

/// Resolves branch targets and memory displacements to symbol names.
/// Immediates stay numeric.
struct TableResolver
{
    table: Arc<SymbolTable>,
}

impl SymbolResolver for TableResolver
{
    fn symbol(
        &mut self,
        instruction: &Instruction,
        _operand: u32,
        instruction_operand: Option<u32>,
        address: u64,
        _address_size: u32,
    ) -> Option<SymbolResult<'_>>
    {
        match instruction.op_kind(instruction_operand?) {
            OpKind::NearBranch16
            | OpKind::NearBranch32
            | OpKind::NearBranch64
            | OpKind::FarBranch16
            | OpKind::FarBranch32
            | OpKind::Memory => {}
            _ => return None,
        }
        let hit = self.table.lookup(address)?;
        Some(SymbolResult::with_string(address, hit.names))
    }
}

/// AT&T syntax disassembler for 32 or 64-bit code
pub struct X86Disassembler
{
    bitness: u32,
    formatter: GasFormatter,
    output: String,
}

impl X86Disassembler
{
    /// ## Parameters
    ///
    /// - `bitness`: 32 or 64
    /// - `table`: symbols used to name operands
    pub fn new(bitness: u32, table: Arc<SymbolTable>) -> Self
    {
        let formatter = GasFormatter::with_options(Some(Box::new(TableResolver { table })), None);
        Self {
            bitness,
            formatter,
            output: String::new(),
        }
    }
}

impl Disassembler for X86Disassembler
{
    fn decode(&mut self, code: &[u8], pc: u64) -> (String, usize)
    {
        let mut decoder = Decoder::with_ip(self.bitness, code, pc, DecoderOptions::NONE);
        let instruction = decoder.decode();
        if instruction.is_invalid() {
            return ("?".to_string(), 1);
        }
        self.output.clear();
        self.formatter.format(&instruction, &mut self.output);
        (self.output.clone(), instruction.len())
    }
}
