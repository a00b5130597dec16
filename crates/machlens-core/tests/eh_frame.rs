//! Tests for `__eh_frame` parsing

mod common;

use common::{defined, object, section, table};
use machlens_core::ehframe::encoding::{encoding_string, read_sleb128, read_uleb128};
use machlens_core::ehframe::{parse_eh_frame, EhFrame, EhRecordKind};
use machlens_core::macho::constants::{CPU_TYPE_X86_64, S_ATTR_PURE_INSTRUCTIONS};
use machlens_core::EngineError;

const EH_FRAME_ADDR: u64 = 0x2000;

/// `zR` CIE with FDE encoding `0x1b` (pcrel sdata4), padded to 24 bytes.
/// `augmentation` holds the augmentation data length followed by the data.
fn cie(augmentation: &[u8], instructions: &[u8]) -> Vec<u8>
{
    let mut body = vec![0, 0, 0, 0, 1, b'z', b'R', 0, 0x01, 0x78, 0x10];
    body.extend_from_slice(augmentation);
    body.extend_from_slice(instructions);
    let mut record = (body.len() as u32).to_le_bytes().to_vec();
    record.extend_from_slice(&body);
    record
}

/// FDE at section offset `offset` covering `[begin, begin + 16)`.
fn fde(offset: usize, cie_offset: usize, begin: u64) -> Vec<u8>
{
    let id_start = offset + 4;
    let field = EH_FRAME_ADDR + id_start as u64 + 4;
    let pc_begin = begin.wrapping_sub(field) as i64 as i32;

    let mut body = ((id_start - cie_offset) as u32).to_le_bytes().to_vec();
    body.extend_from_slice(&pc_begin.to_le_bytes());
    body.extend_from_slice(&16i32.to_le_bytes());
    body.push(0);
    body.extend_from_slice(&[0x41, 0x0e, 0x10, 0x86, 0x02, 0x43, 0x0d]);
    let mut record = (body.len() as u32).to_le_bytes().to_vec();
    record.extend_from_slice(&body);
    record
}

fn parse(data: &[u8]) -> EhFrame
{
    let text = section("__TEXT", "__text", 0x1000, S_ATTR_PURE_INSTRUCTIONS, &[0x90; 0x10]);
    let eh_frame = section("__TEXT", "__eh_frame", EH_FRAME_ADDR, 0, data);
    let table = table(object(CPU_TYPE_X86_64, vec![text, eh_frame], vec![defined("_main", 1, 0x1000)]));
    parse_eh_frame(&table, &table.file().sections[1])
}

fn value<'a>(frame: &'a EhFrame, group: usize, fde: Option<usize>, name: &str) -> Option<&'a str>
{
    let group = frame.groups.get(group)?;
    let record = match fde {
        Some(i) => group.fdes.get(i)?,
        None => &group.cie,
    };
    record.field(name).map(|field| field.value.as_str())
}

#[test]
fn test_uleb128_and_sleb128()
{
    assert_eq!(read_uleb128(&[0xe5, 0x8e, 0x26], 0).unwrap(), (624_485, 3));
    assert_eq!(read_sleb128(&[0x7f], 0).unwrap(), (-1, 1));
    assert_eq!(read_sleb128(&[0x78], 0).unwrap(), (-8, 1));
    assert!(matches!(read_uleb128(&[0x80; 9], 0), Err(EngineError::Overflow { .. })));
    assert!(matches!(read_uleb128(&[0x80, 0x80], 0), Err(EngineError::Truncated { .. })));
}

#[test]
fn test_encoding_string()
{
    assert_eq!(encoding_string(0x1b), "0x0b (DW_EH_PE_sdata4)\n0x10 (DW_EH_PE_pcrel)");
    assert_eq!(encoding_string(0xff), "0xff (DW_EH_PE_omit)");
}

#[test]
fn test_cie_and_fde()
{
    let mut data = cie(&[0x01, 0x1b], &[0x0c, 0x07, 0x08, 0x90, 0x01, 0x00, 0x00]);
    assert_eq!(data.len(), 24);
    data.extend(fde(24, 0, 0x1000));
    assert_eq!(data.len(), 48);
    data.extend_from_slice(&[0, 0, 0, 0]);

    let frame = parse(&data);
    assert!(frame.warnings.is_empty(), "{:?}", frame.warnings);
    assert_eq!(frame.title, "__TEXT,__eh_frame");
    assert_eq!(frame.groups.len(), 1);
    assert_eq!(frame.groups[0].title(), "CFI 0");
    assert_eq!(frame.groups[0].cie.title(), "CIE 0");

    assert_eq!(value(&frame, 0, None, "Length"), Some("20"));
    assert_eq!(value(&frame, 0, None, "Augmentation String"), Some("zR"));
    assert_eq!(value(&frame, 0, None, "Code Alignment Factor"), Some("1"));
    assert_eq!(value(&frame, 0, None, "Data Alignment Factor"), Some("-8"));
    assert_eq!(value(&frame, 0, None, "Return Address Register"), Some("16 (RA)"));
    assert_eq!(
        value(&frame, 0, None, "Augmentation Data (FDE Encoding)"),
        Some("0x0b (DW_EH_PE_sdata4)\n0x10 (DW_EH_PE_pcrel)")
    );
    assert_eq!(value(&frame, 0, None, "Initial Instructions"), Some("7 bytes"));

    let fdes = &frame.groups[0].fdes;
    assert_eq!(fdes.len(), 1);
    assert_eq!(fdes[0].kind, EhRecordKind::Fde);
    assert_eq!(fdes[0].address, 0x2018);
    assert_eq!(value(&frame, 0, Some(0), "CIE Pointer"), Some("-0x1c = 0x2000"));
    assert_eq!(value(&frame, 0, Some(0), "PC Begin"), Some("pc-0x1020 = _main"));
    assert_eq!(value(&frame, 0, Some(0), "PC Range"), Some("16"));
    assert_eq!(value(&frame, 0, Some(0), "Call Frame Instructions"), Some("7 bytes"));

    let pc_begin = fdes[0].field("PC Begin").map(|field| field.address);
    assert_eq!(pc_begin, Some(0x2020));
    assert_eq!(frame.records().len(), 2);
}

#[test]
fn test_augmentation_remains()
{
    let data = cie(&[0x03, 0x1b, 0xaa, 0xbb], &[0x0c, 0x07, 0x08, 0x90, 0x01]);
    assert_eq!(data.len(), 24);

    let frame = parse(&data);
    assert!(frame.warnings.is_empty(), "{:?}", frame.warnings);
    let remains = frame.groups[0].cie.field("Augmentation Data (Remains)");
    assert_eq!(remains.map(|field| field.bytes.as_slice()), Some(&[0xaa, 0xbb][..]));
    assert_eq!(value(&frame, 0, None, "Initial Instructions"), Some("5 bytes"));
}

#[test]
fn test_augmentation_overflow_poisons_fdes()
{
    // declares no augmentation data but the R letter still reads a byte
    let mut data = cie(&[0x00, 0x1b], &[0x0c, 0x07, 0x08, 0x90, 0x01, 0x00, 0x00]);
    data.extend(fde(24, 0, 0x1000));

    let frame = parse(&data);
    let cie = &frame.groups[0].cie;
    assert!(cie.error.as_deref().is_some_and(|error| error.contains("overflow")));
    // fields decoded before the failure are kept
    assert!(cie.field("Augmentation Data (FDE Encoding)").is_some());
    assert!(frame.groups[0].fdes.is_empty());
    assert_eq!(frame.warnings.len(), 2);
    assert!(frame.warnings[0].starts_with("CIE 0 at 0x2000"));
    assert!(frame.warnings[1].contains("undecodable CIE"));
}

#[test]
fn test_fde_without_cie()
{
    let mut data = cie(&[0x01, 0x1b], &[0x0c, 0x07, 0x08, 0x90, 0x01, 0x00, 0x00]);
    // points 8 bytes back, into the middle of the CIE
    data.extend(fde(24, 20, 0x1000));

    let frame = parse(&data);
    assert_eq!(frame.groups.len(), 1);
    assert!(frame.groups[0].fdes.is_empty());
    assert_eq!(frame.warnings.len(), 1);
    assert!(frame.warnings[0].contains("no CIE"));
}

#[test]
fn test_truncated_record()
{
    let mut data = cie(&[0x01, 0x1b], &[0x0c, 0x07, 0x08, 0x90, 0x01, 0x00, 0x00]);
    data.extend(fde(24, 0, 0x1000));
    data.truncate(40);

    let frame = parse(&data);
    let fde = &frame.groups[0].fdes[0];
    assert!(fde.error.is_some());
    assert_eq!(value(&frame, 0, Some(0), "PC Begin"), Some("pc-0x1020 = _main"));
    assert_eq!(frame.warnings.len(), 1);
}
