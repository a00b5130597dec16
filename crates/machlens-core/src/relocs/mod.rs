//! # Relocations
//!
//! Per-architecture interpretation of relocation entries.
//!
//! [`interpret`] reads the patched operand out of the section bytes and
//! combines it with the relocation fields to produce a [`RelocTarget`]:
//! a symbol plus addend for extern entries, an absolute address otherwise.
//!
//! ## Rules
//!
//! - `pc` is the address just past the operand (`section.addr + r_address +
//!   width`) for x86; ARM uses the instruction address plus 8 (4 in Thumb),
//!   ARM64 and PowerPC the instruction address itself.
//! - `SECTDIFF`/`LOCAL_SECTDIFF` need the following entry to be a scattered
//!   `PAIR`; the target is `operand + pair.value`.
//! - x86_64 `SIGNED_1/2/4` add 1/2/4 to the addend for the immediate that
//!   follows the displacement.
//! - ARM64 `ADDEND` supplies the addend of the next entry at the same
//!   address.
//! - `PAIR`, `SUBTRACTOR` and `ADDEND` entries have no target of their own.

pub mod table;

use gimli::{Endianity, RunTimeEndian};

use crate::macho::constants::{
    ARM64_RELOC_ADDEND, ARM64_RELOC_BRANCH26, ARM64_RELOC_GOT_LOAD_PAGE21, ARM64_RELOC_GOT_LOAD_PAGEOFF12,
    ARM64_RELOC_PAGE21, ARM64_RELOC_PAGEOFF12, ARM64_RELOC_POINTER_TO_GOT, ARM64_RELOC_SUBTRACTOR,
    ARM64_RELOC_TLVP_LOAD_PAGE21, ARM64_RELOC_TLVP_LOAD_PAGEOFF12, ARM64_RELOC_UNSIGNED, ARM_RELOC_BR24,
    ARM_RELOC_LOCAL_SECTDIFF, ARM_RELOC_PAIR, ARM_RELOC_SECTDIFF, ARM_RELOC_VANILLA, ARM_THUMB_RELOC_BR22,
    GENERIC_RELOC_LOCAL_SECTDIFF, GENERIC_RELOC_PAIR, GENERIC_RELOC_SECTDIFF, GENERIC_RELOC_VANILLA, PPC_RELOC_BR14,
    PPC_RELOC_BR24, PPC_RELOC_LOCAL_SECTDIFF, PPC_RELOC_PAIR, PPC_RELOC_SECTDIFF, PPC_RELOC_VANILLA,
    X86_64_RELOC_SIGNED_1, X86_64_RELOC_SIGNED_2, X86_64_RELOC_SIGNED_4, X86_64_RELOC_SUBTRACTOR,
};
use crate::macho::{MachFile, Reloc, Section};
use crate::symbols::SymbolTable;
use crate::types::Architecture;

/// Where a relocation points.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelocTarget
{
    /// Extern entry: symbol table index plus addend
    Symbol
    {
        index: usize,
        addend: i64,
        size: u64,
    },
    /// Local or scattered entry: an address plus addend
    Address
    {
        address: u64,
        addend: i64,
        size: u64,
    },
    /// The entry only modifies a neighbour (`PAIR`, `SUBTRACTOR`, `ADDEND`)
    NoTarget,
    /// The combination is not decoded
    Unresolved(String),
}

impl RelocTarget
{
    /// Display text: `_sym+0x10`, `_sym-0x4`, `_other+0x8` or `? (reason)`.
    pub fn describe(&self, table: &SymbolTable) -> String
    {
        match self {
            RelocTarget::Symbol { index, addend, .. } => {
                let name = table
                    .file()
                    .symbols
                    .get(*index)
                    .map_or("?", |symbol| symbol.name.as_str());
                format!("{name}{}", signed_hex(*addend))
            }
            RelocTarget::Address { address, addend, .. } => {
                table.sym_addr_string(address.wrapping_add_signed(*addend), true)
            }
            RelocTarget::NoTarget => String::new(),
            RelocTarget::Unresolved(reason) => format!("? ({reason})"),
        }
    }
}

/// `+0x10`, `-0x4`, or nothing for zero.
pub fn signed_hex(value: i64) -> String
{
    match value {
        0 => String::new(),
        v if v < 0 => format!("-{:#x}", v.unsigned_abs()),
        v => format!("+{v:#x}"),
    }
}

/// Sign-extend the low `bits` bits of `value`.
pub fn sign_extend(value: u64, bits: u32) -> i64
{
    let shift = 64 - bits;
    ((value << shift) as i64) >> shift
}

fn read_operand(endian: RunTimeEndian, bytes: &[u8]) -> u64
{
    match bytes.len() {
        1 => u64::from(bytes[0]),
        2 => u64::from(endian.read_u16(bytes)),
        4 => u64::from(endian.read_u32(bytes)),
        _ => endian.read_u64(bytes),
    }
}

struct Operand
{
    /// Raw field value, zero-extended
    raw: u64,
    /// Field value sign-extended to its width
    ival: i64,
    /// Instruction/field address
    addr: u64,
    width: u64,
}

/// Interpret the relocation at `position` in `section`.
pub fn interpret(file: &MachFile, section: &Section, position: usize) -> RelocTarget
{
    let Some(reloc) = section.relocs.get(position) else {
        return RelocTarget::Unresolved("no such relocation".to_string());
    };
    let width = reloc.operand_size();
    let addr = section.addr.wrapping_add(u64::from(reloc.address));
    let Some(bytes) = section.bytes_at(addr, width) else {
        return RelocTarget::Unresolved("operand outside section data".to_string());
    };
    let raw = read_operand(file.endian, bytes);
    let operand = Operand {
        raw,
        ival: sign_extend(raw, (width * 8) as u32),
        addr,
        width,
    };
    let next = section.relocs.get(position + 1);

    match file.architecture {
        Architecture::X86 => interpret_generic(reloc, next, &operand),
        Architecture::X86_64 => interpret_x86_64(reloc, &operand),
        Architecture::Arm => interpret_arm(file.endian, bytes, reloc, next, &operand),
        Architecture::Arm64 => {
            let previous = position.checked_sub(1).and_then(|p| section.relocs.get(p));
            interpret_arm64(reloc, previous, &operand)
        }
        Architecture::PowerPc | Architecture::PowerPc64 => interpret_ppc(reloc, next, &operand),
        Architecture::Unknown(cputype) => RelocTarget::Unresolved(format!("cpu type {cputype:#x}")),
    }
}

fn symbol_target(reloc: &Reloc, addend: i64, size: u64) -> RelocTarget
{
    RelocTarget::Symbol {
        index: reloc.value as usize,
        addend,
        size,
    }
}

fn address_target(address: u64, addend: i64, size: u64) -> RelocTarget
{
    RelocTarget::Address { address, addend, size }
}

/// `SECTDIFF` with its trailing `PAIR`.
fn sectdiff(reloc: &Reloc, next: Option<&Reloc>, pair_kind: u8, op: &Operand) -> RelocTarget
{
    match next {
        Some(pair) if pair.scattered && pair.kind == pair_kind => {
            let this = i64::from(reloc.value);
            let addend = op.ival + i64::from(pair.value) - this;
            address_target(u64::from(reloc.value), addend, op.width)
        }
        _ => RelocTarget::Unresolved("SECTDIFF without PAIR".to_string()),
    }
}

/// Scattered, extern and local forms shared by every 32-bit CPU.
fn vanilla(reloc: &Reloc, op: &Operand, pc: u64) -> RelocTarget
{
    if reloc.scattered {
        let value = u64::from(reloc.value);
        let field = if reloc.pcrel {
            pc.wrapping_add_signed(op.ival)
        } else {
            op.raw
        };
        return address_target(value, field.wrapping_sub(value) as i64, op.width);
    }
    if reloc.is_extern {
        let addend = if reloc.pcrel {
            op.ival.wrapping_add(pc as i64)
        } else {
            op.ival
        };
        return symbol_target(reloc, addend, op.width);
    }
    let address = if reloc.pcrel {
        pc.wrapping_add_signed(op.ival)
    } else {
        op.raw
    };
    address_target(address, 0, op.width)
}

fn interpret_generic(reloc: &Reloc, next: Option<&Reloc>, op: &Operand) -> RelocTarget
{
    let pc = op.addr.wrapping_add(op.width);
    match reloc.kind {
        GENERIC_RELOC_PAIR => RelocTarget::NoTarget,
        GENERIC_RELOC_SECTDIFF | GENERIC_RELOC_LOCAL_SECTDIFF if reloc.scattered => {
            sectdiff(reloc, next, GENERIC_RELOC_PAIR, op)
        }
        GENERIC_RELOC_VANILLA => vanilla(reloc, op, pc),
        kind => RelocTarget::Unresolved(format!("type {kind}")),
    }
}

fn interpret_x86_64(reloc: &Reloc, op: &Operand) -> RelocTarget
{
    let correction = match reloc.kind {
        X86_64_RELOC_SUBTRACTOR => return RelocTarget::NoTarget,
        X86_64_RELOC_SIGNED_1 => 1,
        X86_64_RELOC_SIGNED_2 => 2,
        X86_64_RELOC_SIGNED_4 => 4,
        _ => 0,
    };
    if reloc.is_extern {
        return symbol_target(reloc, op.ival + correction, op.width);
    }
    if reloc.pcrel {
        let pc = op.addr.wrapping_add(op.width);
        return address_target(pc.wrapping_add_signed(op.ival + correction), 0, op.width);
    }
    address_target(op.raw, 0, op.width)
}

fn interpret_arm(
    endian: RunTimeEndian,
    bytes: &[u8],
    reloc: &Reloc,
    next: Option<&Reloc>,
    op: &Operand,
) -> RelocTarget
{
    match reloc.kind {
        ARM_RELOC_PAIR => RelocTarget::NoTarget,
        ARM_RELOC_SECTDIFF | ARM_RELOC_LOCAL_SECTDIFF if reloc.scattered => sectdiff(reloc, next, ARM_RELOC_PAIR, op),
        ARM_RELOC_VANILLA => vanilla(reloc, op, op.addr.wrapping_add(op.width)),
        ARM_RELOC_BR24 if op.width == 4 => {
            let disp = sign_extend(op.raw & 0x00ff_ffff, 24) << 2;
            branch(reloc, op, op.addr.wrapping_add(8), disp)
        }
        ARM_THUMB_RELOC_BR22 if op.width == 4 => {
            let first = u64::from(endian.read_u16(&bytes[..2]));
            let second = u64::from(endian.read_u16(&bytes[2..]));
            let disp = sign_extend(((first & 0x7ff) << 12) | ((second & 0x7ff) << 1), 23);
            branch(reloc, op, op.addr.wrapping_add(4), disp)
        }
        kind => RelocTarget::Unresolved(format!("type {kind}")),
    }
}

/// Relative branch: extern entries keep `pc + disp` as the addend.
fn branch(reloc: &Reloc, op: &Operand, pc: u64, disp: i64) -> RelocTarget
{
    if reloc.is_extern {
        return symbol_target(reloc, disp.wrapping_add(pc as i64), op.width);
    }
    address_target(pc.wrapping_add_signed(disp), 0, op.width)
}

fn interpret_arm64(reloc: &Reloc, previous: Option<&Reloc>, op: &Operand) -> RelocTarget
{
    let addend = match previous {
        Some(prev) if prev.kind == ARM64_RELOC_ADDEND && prev.address == reloc.address => {
            sign_extend(u64::from(prev.value), 24)
        }
        _ => 0,
    };

    match reloc.kind {
        ARM64_RELOC_SUBTRACTOR | ARM64_RELOC_ADDEND => RelocTarget::NoTarget,
        ARM64_RELOC_UNSIGNED => {
            if reloc.is_extern {
                symbol_target(reloc, op.ival + addend, op.width)
            } else {
                address_target(op.raw, 0, op.width)
            }
        }
        ARM64_RELOC_BRANCH26 => {
            if reloc.is_extern {
                return symbol_target(reloc, addend, op.width);
            }
            let disp = sign_extend(op.raw & 0x03ff_ffff, 26) << 2;
            address_target(op.addr.wrapping_add_signed(disp), 0, op.width)
        }
        ARM64_RELOC_PAGE21 | ARM64_RELOC_GOT_LOAD_PAGE21 | ARM64_RELOC_TLVP_LOAD_PAGE21 => {
            if reloc.is_extern {
                return symbol_target(reloc, addend, op.width);
            }
            let imm = ((op.raw >> 29) & 0x3) | (((op.raw >> 5) & 0x7_ffff) << 2);
            let page = (op.addr & !0xfff).wrapping_add_signed(sign_extend(imm, 21) << 12);
            address_target(page, 0, op.width)
        }
        ARM64_RELOC_PAGEOFF12 | ARM64_RELOC_GOT_LOAD_PAGEOFF12 | ARM64_RELOC_TLVP_LOAD_PAGEOFF12 => {
            if reloc.is_extern {
                symbol_target(reloc, addend, op.width)
            } else {
                RelocTarget::Unresolved("page offset of a local address".to_string())
            }
        }
        ARM64_RELOC_POINTER_TO_GOT if reloc.is_extern => symbol_target(reloc, 0, op.width),
        kind => RelocTarget::Unresolved(format!("type {kind}")),
    }
}

fn interpret_ppc(reloc: &Reloc, next: Option<&Reloc>, op: &Operand) -> RelocTarget
{
    match reloc.kind {
        PPC_RELOC_PAIR => RelocTarget::NoTarget,
        PPC_RELOC_SECTDIFF | PPC_RELOC_LOCAL_SECTDIFF if reloc.scattered => sectdiff(reloc, next, PPC_RELOC_PAIR, op),
        PPC_RELOC_VANILLA => vanilla(reloc, op, op.addr.wrapping_add(op.width)),
        PPC_RELOC_BR24 | PPC_RELOC_BR14 if op.width == 4 => {
            let disp = if reloc.kind == PPC_RELOC_BR24 {
                sign_extend(op.raw & 0x03ff_fffc, 26)
            } else {
                sign_extend(op.raw & 0xfffc, 16)
            };
            // AA: absolute branch
            let pc = if op.raw & 0x2 != 0 { 0 } else { op.addr };
            branch(reloc, op, pc, disp)
        }
        kind => RelocTarget::Unresolved(format!("type {kind}")),
    }
}
