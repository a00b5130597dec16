//! Tests for relocation interpretation and relocation tables

mod common;

use common::{defined, object, reloc, scattered, section, table, undefined};
use gimli::RunTimeEndian;
use machlens_core::macho::constants::{
    ARM64_RELOC_ADDEND, ARM64_RELOC_BRANCH26, ARM64_RELOC_PAGE21, ARM64_RELOC_PAGEOFF12, ARM_RELOC_BR24,
    ARM_THUMB_RELOC_BR22, CPU_TYPE_ARM, CPU_TYPE_ARM64, CPU_TYPE_POWERPC, CPU_TYPE_X86, CPU_TYPE_X86_64,
    GENERIC_RELOC_PAIR, GENERIC_RELOC_SECTDIFF, MH_OBJECT, PPC_RELOC_BR14, PPC_RELOC_BR24, S_ATTR_PURE_INSTRUCTIONS,
    S_CSTRING_LITERALS, X86_64_RELOC_BRANCH, X86_64_RELOC_SIGNED, X86_64_RELOC_SIGNED_1, X86_64_RELOC_SIGNED_2,
    X86_64_RELOC_SIGNED_4, X86_64_RELOC_SUBTRACTOR,
};
use machlens_core::macho::{MachFile, Section};
use machlens_core::relocs::table::{section_list, section_reltab, symbol_reltab};
use machlens_core::relocs::{interpret, signed_hex, RelocTarget};

#[test]
fn test_signed_hex()
{
    assert_eq!(signed_hex(0), "");
    assert_eq!(signed_hex(0x10), "+0x10");
    assert_eq!(signed_hex(-4), "-0x4");
}

#[test]
fn test_x86_64_extern_branch()
{
    // call _printf
    let mut text = section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &[0xe8, 0, 0, 0, 0, 0xc3]);
    text.relocs.push(reloc(1, 1, X86_64_RELOC_BRANCH, 2, true, true));
    let file = object(
        CPU_TYPE_X86_64,
        vec![text],
        vec![defined("_main", 1, 0x1000), undefined("_printf")],
    );
    let table = table(file);
    let section = &table.file().sections[0];

    let target = interpret(table.file(), section, 0);
    assert_eq!(
        target,
        RelocTarget::Symbol {
            index: 1,
            addend: 0,
            size: 4
        }
    );
    assert_eq!(target.describe(&table), "_printf");
}

#[test]
fn test_x86_64_extern_addend()
{
    // movq _table+8(%rip), %rax
    let mut text = section(
        "__TEXT",
        "__text",
        0x1000,
        S_ATTR_PURE_INSTRUCTIONS,
        &[0x48, 0x8b, 0x05, 0x08, 0, 0, 0],
    );
    text.relocs.push(reloc(3, 1, X86_64_RELOC_SIGNED, 2, true, true));
    let file = object(CPU_TYPE_X86_64, vec![text], vec![defined("_f", 1, 0x1000), undefined("_table")]);
    let table = table(file);

    let target = interpret(table.file(), &table.file().sections[0], 0);
    assert_eq!(target.describe(&table), "_table+0x8");
}

#[test]
fn test_x86_64_local_pcrel_resolves_to_string()
{
    // leaq L_.str+3(%rip), %rdi with the string section at 0x1020
    let disp: i32 = 0x1023 - 0x1007;
    let mut code = vec![0x48, 0x8d, 0x3d];
    code.extend_from_slice(&disp.to_le_bytes());
    let mut text = section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &code);
    text.relocs.push(reloc(3, 2, X86_64_RELOC_SIGNED, 2, true, false));
    let strings = section("__TEXT", "__cstring", 0x1020, S_CSTRING_LITERALS, b"hi\0yo\0");
    let file = object(
        CPU_TYPE_X86_64,
        vec![text, strings],
        vec![defined("_f", 1, 0x1000), defined("L_.str", 2, 0x1020)],
    );
    let table = table(file);

    let target = interpret(table.file(), &table.file().sections[0], 0);
    assert_eq!(
        target,
        RelocTarget::Address {
            address: 0x1023,
            addend: 0,
            size: 4
        }
    );
    assert_eq!(target.describe(&table), "L_.str+0x3");
}

#[test]
fn test_x86_64_subtractor_has_no_target()
{
    let mut data = section("__DATA", "__data", 0x2000, 0, &[0; 8]);
    data.relocs.push(reloc(0, 0, X86_64_RELOC_SUBTRACTOR, 3, false, true));
    let file = object(CPU_TYPE_X86_64, vec![data], vec![defined("_d", 1, 0x2000)]);
    let table = table(file);

    let target = interpret(table.file(), &table.file().sections[0], 0);
    assert_eq!(target, RelocTarget::NoTarget);
    assert_eq!(target.describe(&table), "");
}

#[test]
fn test_x86_sectdiff_uses_pair()
{
    // .long _end - _start, stored as 0x10
    let mut data = section("__DATA", "__data", 0x2000, 0, &[0x10, 0, 0, 0]);
    data.relocs.push(scattered(0, 0x2010, GENERIC_RELOC_SECTDIFF, 2));
    data.relocs.push(scattered(0, 0x2000, GENERIC_RELOC_PAIR, 2));
    let file = object(CPU_TYPE_X86, vec![data], vec![defined("_start", 1, 0x2000)]);
    let table = table(file);
    let section = &table.file().sections[0];

    assert_eq!(
        interpret(table.file(), section, 0),
        RelocTarget::Address {
            address: 0x2010,
            addend: 0,
            size: 4
        }
    );
    assert_eq!(interpret(table.file(), section, 1), RelocTarget::NoTarget);
}

#[test]
fn test_x86_sectdiff_without_pair_is_unresolved()
{
    let mut data = section("__DATA", "__data", 0x2000, 0, &[0x10, 0, 0, 0]);
    data.relocs.push(scattered(0, 0x2010, GENERIC_RELOC_SECTDIFF, 2));
    let file = object(CPU_TYPE_X86, vec![data], vec![defined("_start", 1, 0x2000)]);
    let table = table(file);

    let target = interpret(table.file(), &table.file().sections[0], 0);
    assert!(matches!(target, RelocTarget::Unresolved(_)));
    assert!(target.describe(&table).starts_with("? ("));
}

#[test]
fn test_unknown_type_is_unresolved()
{
    let mut data = section("__DATA", "__data", 0x2000, 0, &[0; 4]);
    data.relocs.push(reloc(0, 1, 5, 2, false, false));
    let file = object(CPU_TYPE_X86, vec![data], vec![defined("_d", 1, 0x2000)]);
    let table = table(file);

    assert_eq!(
        interpret(table.file(), &table.file().sections[0], 0),
        RelocTarget::Unresolved("type 5".to_string())
    );
}

#[test]
fn test_operand_outside_section_is_unresolved()
{
    let mut data = section("__DATA", "__data", 0x2000, 0, &[0; 4]);
    data.relocs.push(reloc(2, 1, 0, 2, false, false));
    let file = object(CPU_TYPE_X86, vec![data], Vec::new());
    let table = table(file);

    assert!(matches!(
        interpret(table.file(), &table.file().sections[0], 0),
        RelocTarget::Unresolved(_)
    ));
}

#[test]
fn test_arm64_local_branch()
{
    // bl .+16
    let mut text = section("__TEXT", "__text", 0x4000, S_ATTR_PURE_INSTRUCTIONS, &[0x04, 0, 0, 0x94]);
    text.relocs.push(reloc(0, 1, ARM64_RELOC_BRANCH26, 2, true, false));
    let file = object(CPU_TYPE_ARM64, vec![text], vec![defined("_f", 1, 0x4000)]);
    let table = table(file);

    assert_eq!(
        interpret(table.file(), &table.file().sections[0], 0),
        RelocTarget::Address {
            address: 0x4010,
            addend: 0,
            size: 4
        }
    );
}

#[test]
fn test_arm64_addend_applies_to_next_entry()
{
    // adrp x0, _buf@PAGE + 8
    let mut text = section("__TEXT", "__text", 0x4000, S_ATTR_PURE_INSTRUCTIONS, &[0x00, 0, 0, 0x90]);
    text.relocs.push(reloc(0, 8, ARM64_RELOC_ADDEND, 2, false, false));
    text.relocs.push(reloc(0, 1, ARM64_RELOC_PAGE21, 2, true, true));
    let file = object(CPU_TYPE_ARM64, vec![text], vec![defined("_f", 1, 0x4000), undefined("_buf")]);
    let table = table(file);
    let section = &table.file().sections[0];

    assert_eq!(interpret(table.file(), section, 0), RelocTarget::NoTarget);
    let target = interpret(table.file(), section, 1);
    assert_eq!(
        target,
        RelocTarget::Symbol {
            index: 1,
            addend: 8,
            size: 4
        }
    );
    assert_eq!(target.describe(&table), "_buf+0x8");
}

#[test]
fn test_reltab_rows()
{
    let mut text = section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &[0xe8, 0, 0, 0, 0, 0xc3]);
    text.relocs.push(reloc(1, 1, X86_64_RELOC_BRANCH, 2, true, true));
    let file = object(
        CPU_TYPE_X86_64,
        vec![text],
        vec![defined("_main", 1, 0x1000), undefined("_printf")],
    );
    let table = table(file);
    let file = table.file();

    assert_eq!(section_list(file), vec!["1 (__TEXT,__text) (1)".to_string()]);

    let rows = section_reltab(file, &file.sections[0]);
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0].address, "0x0000000000000001");
    assert_eq!(rows[0].value, "1 (_printf)");
    assert_eq!(rows[0].kind, "2 (X86_64_RELOC_BRANCH)");
    assert_eq!(rows[0].length, "2 (long)");
    assert_eq!(rows[0].pcrel, "true");
    assert_eq!(rows[0].is_extern, "true");
    assert_eq!(rows[0].scattered, "");

    let info = table.info_for_symbol(0).expect("main is defined");
    let rows = symbol_reltab(file, info);
    assert_eq!(rows.len(), 1);
    assert_eq!(
        rows[0].address,
        "0x0000000000000001+0x0000000000001000 (__TEXT,__text)"
    );
}

fn address(address: u64) -> RelocTarget
{
    RelocTarget::Address {
        address,
        addend: 0,
        size: 4,
    }
}

fn first_target(cputype: u32, text: Section) -> RelocTarget
{
    let file = object(cputype, vec![text], vec![defined("_f", 1, 0), undefined("_x")]);
    interpret(&file, &file.sections[0], 0)
}

#[test]
fn test_x86_64_signed_1_extern()
{
    // movb $0x12, _x(%rip): the displacement is stored as -1
    let mut text = section(
        "__TEXT",
        "__text",
        0,
        S_ATTR_PURE_INSTRUCTIONS,
        &[0xc6, 0x05, 0xff, 0xff, 0xff, 0xff, 0x12],
    );
    text.relocs.push(reloc(2, 1, X86_64_RELOC_SIGNED_1, 2, true, true));
    assert_eq!(
        first_target(CPU_TYPE_X86_64, text),
        RelocTarget::Symbol {
            index: 1,
            addend: 0,
            size: 4
        }
    );
}

#[test]
fn test_x86_64_signed_4_extern_addend()
{
    // movl $0x12345678, _x+8(%rip)
    let mut text = section(
        "__TEXT",
        "__text",
        0,
        S_ATTR_PURE_INSTRUCTIONS,
        &[0xc7, 0x05, 0x04, 0, 0, 0, 0x78, 0x56, 0x34, 0x12],
    );
    text.relocs.push(reloc(2, 1, X86_64_RELOC_SIGNED_4, 2, true, true));
    assert_eq!(
        first_target(CPU_TYPE_X86_64, text),
        RelocTarget::Symbol {
            index: 1,
            addend: 8,
            size: 4
        }
    );
}

#[test]
fn test_x86_64_signed_2_local()
{
    // movw $0x1234, 0x1020(%rip) at 0x1000; the instruction ends at 0x1009
    let mut text = section(
        "__TEXT",
        "__text",
        0x1000,
        S_ATTR_PURE_INSTRUCTIONS,
        &[0x66, 0xc7, 0x05, 0x17, 0, 0, 0, 0x34, 0x12],
    );
    text.relocs.push(reloc(3, 2, X86_64_RELOC_SIGNED_2, 2, true, false));
    assert_eq!(first_target(CPU_TYPE_X86_64, text), address(0x1020));
}

#[test]
fn test_arm_br24_local_uses_pc_plus_8()
{
    // bl with imm24 = 2 at 0x3000
    let mut text = section("__TEXT", "__text", 0x3000, S_ATTR_PURE_INSTRUCTIONS, &[0x02, 0, 0, 0xeb]);
    text.relocs.push(reloc(0, 1, ARM_RELOC_BR24, 2, true, false));
    assert_eq!(first_target(CPU_TYPE_ARM, text), address(0x3010));
}

#[test]
fn test_arm_br24_extern_addend()
{
    // bl _x: the displacement -8 cancels the pc bias
    let mut text = section("__TEXT", "__text", 0, S_ATTR_PURE_INSTRUCTIONS, &[0xfe, 0xff, 0xff, 0xeb]);
    text.relocs.push(reloc(0, 1, ARM_RELOC_BR24, 2, true, true));
    assert_eq!(
        first_target(CPU_TYPE_ARM, text),
        RelocTarget::Symbol {
            index: 1,
            addend: 0,
            size: 4
        }
    );
}

#[test]
fn test_thumb_br22_uses_pc_plus_4()
{
    // bl .+0x14 as two halfwords 0xf000 0xf808
    let mut text = section(
        "__TEXT",
        "__text",
        0x3000,
        S_ATTR_PURE_INSTRUCTIONS,
        &[0x00, 0xf0, 0x08, 0xf8],
    );
    text.relocs.push(reloc(0, 1, ARM_THUMB_RELOC_BR22, 2, true, false));
    assert_eq!(first_target(CPU_TYPE_ARM, text), address(0x3014));
}

fn ppc_target(code: &[u8], kind: u8) -> RelocTarget
{
    let mut text = section("__TEXT", "__text", 0x5000, S_ATTR_PURE_INSTRUCTIONS, code);
    text.relocs.push(reloc(0, 1, kind, 2, true, false));
    let file = MachFile::from_parts(
        CPU_TYPE_POWERPC,
        MH_OBJECT,
        RunTimeEndian::Big,
        vec![text],
        vec![defined("_f", 1, 0x5000)],
    );
    interpret(&file, &file.sections[0], 0)
}

#[test]
fn test_ppc_branches()
{
    // bl .+0x20
    assert_eq!(ppc_target(&[0x48, 0, 0, 0x21], PPC_RELOC_BR24), address(0x5020));
    // bla 0x20
    assert_eq!(ppc_target(&[0x48, 0, 0, 0x23], PPC_RELOC_BR24), address(0x20));
    // beq .+0x10
    assert_eq!(ppc_target(&[0x41, 0x82, 0, 0x10], PPC_RELOC_BR14), address(0x5010));
    // beq .-0x8
    assert_eq!(ppc_target(&[0x41, 0x82, 0xff, 0xf8], PPC_RELOC_BR14), address(0x4ff8));
}

#[test]
fn test_arm64_local_page21()
{
    // adrp x0, .+0x1000 page at 0x4004
    let mut text = section(
        "__TEXT",
        "__text",
        0x4000,
        S_ATTR_PURE_INSTRUCTIONS,
        &[0x1f, 0x20, 0x03, 0xd5, 0x00, 0, 0, 0xb0],
    );
    text.relocs.push(reloc(4, 1, ARM64_RELOC_PAGE21, 2, true, false));
    assert_eq!(first_target(CPU_TYPE_ARM64, text), address(0x5000));
}

#[test]
fn test_arm64_pageoff12()
{
    // add x0, x0, _x@PAGEOFF + 0x10
    let code = [0x00, 0x00, 0x00, 0x91];
    let mut text = section("__TEXT", "__text", 0x4000, S_ATTR_PURE_INSTRUCTIONS, &code);
    text.relocs.push(reloc(0, 0x10, ARM64_RELOC_ADDEND, 2, false, false));
    text.relocs.push(reloc(0, 1, ARM64_RELOC_PAGEOFF12, 2, false, true));
    let file = object(CPU_TYPE_ARM64, vec![text], vec![defined("_f", 1, 0x4000), undefined("_x")]);
    assert_eq!(
        interpret(&file, &file.sections[0], 1),
        RelocTarget::Symbol {
            index: 1,
            addend: 0x10,
            size: 4
        }
    );

    let mut local = section("__TEXT", "__text", 0x4000, S_ATTR_PURE_INSTRUCTIONS, &code);
    local.relocs.push(reloc(0, 1, ARM64_RELOC_PAGEOFF12, 2, false, false));
    assert!(matches!(first_target(CPU_TYPE_ARM64, local), RelocTarget::Unresolved(_)));
}
