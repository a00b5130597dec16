//! Tests for disassembly and symbolic operands

mod common;

use common::{defined, object, section, table};
use machlens_core::disasm::{disassemble, for_architecture, Disassembler};
use machlens_core::macho::constants::{CPU_TYPE_ARM64, CPU_TYPE_X86_64, S_ATTR_PURE_INSTRUCTIONS};

#[test]
fn test_x86_64_ret()
{
    let table = table(object(CPU_TYPE_X86_64, Vec::new(), Vec::new()));
    let mut disassembler = for_architecture(&table).expect("x86_64 is supported");

    let (text, len) = disassembler.decode(&[0xc3], 0x1000);
    assert_eq!(text, "ret");
    assert_eq!(len, 1);
}

#[test]
fn test_x86_64_call_names_its_target()
{
    // call .-0 back to _main
    let code = [0xe8, 0xfb, 0xff, 0xff, 0xff];
    let file = object(
        CPU_TYPE_X86_64,
        vec![section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &code)],
        vec![defined("_main", 1, 0x1000)],
    );
    let table = table(file);
    let mut disassembler = for_architecture(&table).expect("x86_64 is supported");

    let (text, len) = disassembler.decode(&code, 0x1000);
    assert_eq!(len, 5);
    assert!(text.starts_with("call"), "{text}");
    assert!(text.contains("_main"), "{text}");
}

#[test]
fn test_x86_64_immediates_stay_numeric()
{
    // movl $0x1000, %eax; leaq _main(%rip), %rax
    let code = [0xb8, 0x00, 0x10, 0x00, 0x00, 0x48, 0x8d, 0x05, 0xf4, 0xff, 0xff, 0xff];
    let file = object(
        CPU_TYPE_X86_64,
        vec![section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &code)],
        vec![defined("_main", 1, 0x1000)],
    );
    let table = table(file);
    let mut disassembler = for_architecture(&table).expect("x86_64 is supported");

    let (mov, len) = disassembler.decode(&code, 0x1000);
    assert_eq!(len, 5);
    assert!(!mov.contains("_main"), "{mov}");
    let (lea, len) = disassembler.decode(&code[5..], 0x1005);
    assert_eq!(len, 7);
    assert!(lea.contains("_main"), "{lea}");
}

#[test]
fn test_invalid_bytes_advance_one_byte()
{
    let table = table(object(CPU_TYPE_X86_64, Vec::new(), Vec::new()));
    let mut disassembler = for_architecture(&table).expect("x86_64 is supported");

    // push %es does not exist in 64-bit mode
    let instructions = disassemble(disassembler.as_mut(), &[0x06, 0xc3], 0x2000);
    assert_eq!(instructions.len(), 2);
    assert_eq!(instructions[0].text, "?");
    assert_eq!(instructions[0].len, 1);
    assert_eq!(instructions[1].address, 0x2001);
    assert_eq!(instructions[1].text, "ret");
}

#[test]
fn test_truncated_instruction_stays_in_bounds()
{
    let table = table(object(CPU_TYPE_X86_64, Vec::new(), Vec::new()));
    let mut disassembler = for_architecture(&table).expect("x86_64 is supported");

    let instructions = disassemble(disassembler.as_mut(), &[0xe8, 0x00], 0x3000);
    let total: usize = instructions.iter().map(|instruction| instruction.len).sum();
    assert_eq!(total, 2);
}

#[test]
fn test_arm64_ret()
{
    let table = table(object(CPU_TYPE_ARM64, Vec::new(), Vec::new()));
    let mut disassembler = for_architecture(&table).expect("arm64 is supported");

    let (text, len) = disassembler.decode(&[0xc0, 0x03, 0x5f, 0xd6], 0x4000);
    assert_eq!(text, "ret");
    assert_eq!(len, 4);
}

#[test]
fn test_arm64_only_branches_are_annotated()
{
    // mov x0, #0x4000; b 0x4000
    let code = [0x00, 0x00, 0x88, 0xd2, 0xff, 0xff, 0xff, 0x17];
    let file = object(
        CPU_TYPE_ARM64,
        vec![section("__TEXT", "__text", 0x4000, S_ATTR_PURE_INSTRUCTIONS, &code)],
        vec![defined("_f", 1, 0x4000)],
    );
    let table = table(file);
    let mut disassembler = for_architecture(&table).expect("arm64 is supported");

    let (mov, _) = disassembler.decode(&code, 0x4000);
    assert!(mov.contains("0x4000"), "{mov}");
    assert!(!mov.contains("<_f>"), "{mov}");
    let (branch, _) = disassembler.decode(&code[4..], 0x4004);
    assert!(branch.ends_with("<_f>"), "{branch}");
}

#[test]
fn test_unknown_cpu_has_no_disassembler()
{
    let table = table(object(0x1234, Vec::new(), Vec::new()));
    assert!(for_architecture(&table).is_none());
}
