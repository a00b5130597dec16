//! ARM, ARM64 and PowerPC through `capstone`.

use std::sync::Arc;

use capstone::prelude::*;
use capstone::{Endian, Insn};

use super::{annotate, Disassembler};
use crate::error::{EngineError, Result};
use crate::symbols::SymbolTable;
use crate::types::Architecture;

pub struct CapstoneDisassembler
{
    engine: Capstone,
    /// Bytes skipped after a failed decode
    min_len: usize,
    table: Arc<SymbolTable>,
}

impl CapstoneDisassembler
{
    /// ## Errors
    ///
    /// `EngineError::Unsupported` for x86 and unknown CPUs, or when
    /// capstone cannot build an engine for the architecture.
    pub fn new(architecture: Architecture, table: Arc<SymbolTable>) -> Result<Self>
    {
        let built = match architecture {
            Architecture::Arm => Capstone::new()
                .arm()
                .mode(arch::arm::ArchMode::Arm)
                .detail(true)
                .build(),
            Architecture::Arm64 => Capstone::new()
                .arm64()
                .mode(arch::arm64::ArchMode::Arm)
                .detail(true)
                .build(),
            Architecture::PowerPc => Capstone::new()
                .ppc()
                .mode(arch::ppc::ArchMode::Mode32)
                .endian(Endian::Big)
                .detail(true)
                .build(),
            Architecture::PowerPc64 => Capstone::new()
                .ppc()
                .mode(arch::ppc::ArchMode::Mode64)
                .endian(Endian::Big)
                .detail(true)
                .build(),
            other => return Err(EngineError::Unsupported(format!("capstone backend for {other}"))),
        };
        let engine = built.map_err(|err| EngineError::Unsupported(format!("capstone: {err}")))?;
        let min_len = if architecture == Architecture::Arm64 { 4 } else { 1 };
        Ok(Self {
            engine,
            min_len,
            table,
        })
    }
}

impl CapstoneDisassembler
{
    /// Branches, calls and pc-relative address forms (`adr`, `adrp`,
    /// literal `ldr`) carry an address; other hex operands are plain
    /// immediates.
    fn has_address_operand(&self, instruction: &Insn<'_>) -> bool
    {
        let mnemonic = instruction.mnemonic().unwrap_or_default();
        let operands = instruction.op_str().unwrap_or_default();
        if matches!(mnemonic, "adr" | "adrp") || (mnemonic.starts_with("ldr") && !operands.contains('[')) {
            return true;
        }
        let Ok(detail) = self.engine.insn_detail(instruction) else {
            return false;
        };
        detail.groups().iter().any(|&group| {
            matches!(
                self.engine.group_name(group).as_deref(),
                Some("jump" | "call" | "branch_relative")
            )
        })
    }
}

impl Disassembler for CapstoneDisassembler
{
    fn decode(&mut self, code: &[u8], pc: u64) -> (String, usize)
    {
        let Ok(instructions) = self.engine.disasm_count(code, pc, 1) else {
            return ("?".to_string(), self.min_len);
        };
        let Some(instruction) = instructions.iter().next() else {
            return ("?".to_string(), self.min_len);
        };

        let mnemonic = instruction.mnemonic().unwrap_or("?");
        let mut text = match instruction.op_str() {
            Some(operands) if !operands.is_empty() => format!("{mnemonic} {operands}"),
            _ => mnemonic.to_string(),
        };
        if self.has_address_operand(instruction) {
            annotate(&self.table, &mut text);
        }
        (text, instruction.len().max(1))
    }
}
