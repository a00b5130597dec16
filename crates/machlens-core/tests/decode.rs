//! Tests for semantic-type guessing and typed decoding

mod common;

use std::sync::Arc;

use common::{defined, object, reloc, section, table, undefined, zero_fill};
use gimli::RunTimeEndian;
use machlens_core::decode::{section_view, symbol_view, DecodeContext, Focus, SemanticType};
use machlens_core::macho::constants::{
    CPU_TYPE_POWERPC, CPU_TYPE_X86_64, MH_OBJECT, S_4BYTE_LITERALS, S_ATTR_PURE_INSTRUCTIONS, S_CSTRING_LITERALS,
    S_ZEROFILL, X86_64_RELOC_BRANCH,
};
use machlens_core::macho::MachFile;
use machlens_core::{EngineError, SymbolTable};

fn context(table: &Arc<SymbolTable>) -> DecodeContext<'_>
{
    DecodeContext {
        table,
        force_long_double: false,
        dwarf: None,
    }
}

#[test]
fn test_guess_for_section()
{
    let file = object(
        CPU_TYPE_X86_64,
        vec![
            section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &[0xc3]),
            section("__TEXT", "__cstring", 0x1010, S_CSTRING_LITERALS, b"a\0"),
            section("__TEXT", "__literal4", 0x1020, S_4BYTE_LITERALS, &[0; 4]),
            section("__TEXT", "__eh_frame", 0x1030, 0, &[0; 4]),
            zero_fill("__DATA", "__bss", 0x2000, S_ZEROFILL, 16),
            section("__DATA", "__data", 0x3000, 0, &[0; 4]),
        ],
        Vec::new(),
    );
    let guesses: Vec<SemanticType> = file
        .sections
        .iter()
        .map(|s| SemanticType::guess_for_section(&file, s))
        .collect();
    assert_eq!(
        guesses,
        vec![
            SemanticType::Code,
            SemanticType::CString,
            SemanticType::Float32,
            SemanticType::EhFrame,
            SemanticType::Data,
            SemanticType::Data,
        ]
    );
}

#[test]
fn test_semantic_type_parses_by_name()
{
    assert_eq!("CString".parse::<SemanticType>().ok(), Some(SemanticType::CString));
    assert_eq!("eh_frame".parse::<SemanticType>().ok(), Some(SemanticType::EhFrame));
    assert!(matches!(
        "utf16".parse::<SemanticType>(),
        Err(EngineError::InvalidArgument(_))
    ));
}

#[test]
fn test_float32_literals()
{
    let mut bytes = 1.0f32.to_le_bytes().to_vec();
    bytes.extend_from_slice(&2.5f32.to_le_bytes());
    bytes.extend_from_slice(&[0x41, 0x42]);
    let file = object(
        CPU_TYPE_X86_64,
        vec![section("__TEXT", "__literal4", 0x1000, S_4BYTE_LITERALS, &bytes)],
        Vec::new(),
    );
    let table = table(file);

    let view = section_view(&context(&table), &table.file().sections[0], SemanticType::Float32);
    let texts: Vec<&str> = view.rows.iter().map(|row| row.text.as_str()).collect();
    // the 2-byte tail is shown as ASCII
    assert_eq!(texts, vec!["1", "2.5", "AB"]);
    assert_eq!(view.rows[1].address, 0x1004);
}

#[test]
fn test_cstring_rows()
{
    let file = object(
        CPU_TYPE_X86_64,
        vec![section("__TEXT", "__cstring", 0x1000, S_CSTRING_LITERALS, b"hi\0a\tb\0")],
        Vec::new(),
    );
    let table = table(file);

    let view = section_view(&context(&table), &table.file().sections[0], SemanticType::CString);
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.rows[0].text, "\"hi\"");
    assert_eq!(view.rows[0].bytes.len(), 3);
    assert_eq!(view.rows[1].text, "\"a\\tb\"");
    assert_eq!(view.rows[1].address, 0x1003);
}

#[test]
fn test_integers_and_pointers()
{
    let mut bytes = vec![0xff; 8];
    bytes.extend_from_slice(&0x1000u64.to_le_bytes());
    let file = object(
        CPU_TYPE_X86_64,
        vec![
            section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &[0xc3; 4]),
            section("__DATA", "__const", 0x2000, 0, &bytes),
        ],
        vec![defined("_main", 1, 0x1000)],
    );
    let table = table(file);
    let data = &table.file().sections[1];

    let ints = section_view(&context(&table), data, SemanticType::Int64);
    assert_eq!(ints.rows[0].text, "-0x1");
    assert_eq!(ints.rows[1].text, "0x1000");

    let pointers = section_view(&context(&table), data, SemanticType::Pointer64);
    assert_eq!(pointers.rows[1].text, "0x0000000000001000 (_main)");
    assert_eq!(pointers.rows[0].text, "0xffffffffffffffff");
}

#[test]
fn test_long_double_needs_matching_host()
{
    let file = MachFile::from_parts(
        CPU_TYPE_POWERPC,
        MH_OBJECT,
        RunTimeEndian::Big,
        vec![section("__TEXT", "__literal16", 0x1000, 0, &[0; 16])],
        Vec::new(),
    );
    let table = table(file);

    let view = section_view(&context(&table), &table.file().sections[0], SemanticType::Float128);
    assert_eq!(view.rows[0].text, "unsupported on this host");
    assert_eq!(view.warnings.len(), 1);

    let forced = DecodeContext {
        force_long_double: true,
        ..context(&table)
    };
    let view = section_view(&forced, &table.file().sections[0], SemanticType::Float128);
    assert_eq!(view.rows[0].text, "0");
    assert!(view.warnings.is_empty());
}

#[test]
fn test_x87_long_double_when_forced()
{
    let mut bytes = vec![0, 0, 0, 0, 0, 0, 0, 0x80, 0xff, 0x3f];
    bytes.resize(16, 0);
    let file = object(
        CPU_TYPE_X86_64,
        vec![section("__TEXT", "__literal16", 0x1000, 0, &bytes)],
        Vec::new(),
    );
    let table = table(file);
    let ctx = DecodeContext {
        force_long_double: true,
        ..context(&table)
    };

    let view = section_view(&ctx, &table.file().sections[0], SemanticType::Float128);
    assert_eq!(view.rows[0].text, "1");
}

#[test]
fn test_code_rows_carry_relocations()
{
    let mut text = section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &[0xe8, 0, 0, 0, 0, 0xc3]);
    text.relocs.push(reloc(1, 1, X86_64_RELOC_BRANCH, 2, true, true));
    let file = object(
        CPU_TYPE_X86_64,
        vec![text],
        vec![defined("_main", 1, 0x1000), undefined("_puts")],
    );
    let table = table(file);

    let view = symbol_view(&context(&table), 0, SemanticType::Code).expect("main decodes");
    assert_eq!(view.title, "_main (__TEXT,__text)");
    assert_eq!(view.rows.len(), 2);
    assert_eq!(view.rows[0].bytes.len(), 5);
    assert_eq!(view.rows[0].relocations.len(), 1);
    assert_eq!(view.rows[0].relocations[0].target_text, "_puts");
    assert_eq!(view.rows[1].text, "ret");
    assert!(view.rows[1].relocations.is_empty());
}

#[test]
fn test_zero_fill_symbol()
{
    let file = object(
        CPU_TYPE_X86_64,
        vec![zero_fill("__DATA", "__bss", 0x2000, S_ZEROFILL, 0x14)],
        vec![defined("_buffer", 1, 0x2000)],
    );
    let table = table(file);

    let view = symbol_view(&context(&table), 0, SemanticType::Data).expect("buffer decodes");
    assert_eq!(view.rows.len(), 3);
    assert!(view.rows.iter().all(|row| row.text == "zero-fill" && row.bytes.is_empty()));
    assert_eq!(view.rows[2].address, 0x2010);
}

#[test]
fn test_symbol_view_errors()
{
    let file = object(
        CPU_TYPE_X86_64,
        vec![section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &[0xc3])],
        vec![defined("_main", 1, 0x1000), undefined("_puts")],
    );
    let table = table(file);
    let ctx = context(&table);

    assert!(matches!(
        symbol_view(&ctx, 1, SemanticType::Data),
        Err(EngineError::InvalidArgument(_))
    ));
    assert!(matches!(
        symbol_view(&ctx, 9, SemanticType::Data),
        Err(EngineError::OutOfRange { kind: "symbol", index: 9 })
    ));
}

#[test]
fn test_dwarf_type_falls_back_to_data()
{
    let file = object(
        CPU_TYPE_X86_64,
        vec![section("__DATA", "__data", 0x2000, 0, b"abcdefgh")],
        vec![defined("_value", 1, 0x2000)],
    );
    let table = table(file);
    let ctx = context(&table);

    let view = section_view(&ctx, &table.file().sections[0], SemanticType::DwarfType);
    assert_eq!(view.semantic, SemanticType::Data);
    assert_eq!(view.rows[0].text, "abcdefgh");
    assert_eq!(view.warnings.len(), 1);

    let view = symbol_view(&ctx, 0, SemanticType::DwarfType).expect("value decodes");
    assert_eq!(view.rows[0].text, "abcdefgh");
    assert!(view.warnings[0].contains("no DWARF"));
}

#[test]
fn test_focus_marks_overlapping_rows()
{
    let file = object(
        CPU_TYPE_X86_64,
        vec![section("__DATA", "__data", 0x2000, 0, &[0x41; 24])],
        Vec::new(),
    );
    let table = table(file);

    let mut view = section_view(&context(&table), &table.file().sections[0], SemanticType::Data);
    view.set_focus(Focus {
        address: 0x2006,
        size: 4,
    });
    let focused: Vec<bool> = view.rows.iter().map(|row| row.focused).collect();
    assert_eq!(focused, vec![true, true, false]);
    assert_eq!(view.first_focused(), Some(0));
}
