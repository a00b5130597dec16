//! Mach-O constants (`<mach-o/loader.h>`, `<mach-o/nlist.h>`, `<mach-o/reloc.h>`).
//!
//! Name tables pair a value with its C identifier so the string helpers can
//! render `0x2 (MH_EXECUTE)` style descriptions.

// CPU types
pub const CPU_ARCH_ABI64: u32 = 0x0100_0000;
pub const CPU_TYPE_X86: u32 = 7;
pub const CPU_TYPE_X86_64: u32 = CPU_TYPE_X86 | CPU_ARCH_ABI64;
pub const CPU_TYPE_ARM: u32 = 12;
pub const CPU_TYPE_ARM64: u32 = CPU_TYPE_ARM | CPU_ARCH_ABI64;
pub const CPU_TYPE_POWERPC: u32 = 18;
pub const CPU_TYPE_POWERPC64: u32 = CPU_TYPE_POWERPC | CPU_ARCH_ABI64;

pub const CPU_SUBTYPE_MASK: u32 = 0xff00_0000;
pub const CPU_SUBTYPE_LIB64: u32 = 0x8000_0000;

pub const CPU_TYPE_NAMES: &[(u32, &str)] = &[
    (0x1, "CPU_TYPE_VAX"),
    (0x6, "CPU_TYPE_MC680x0"),
    (CPU_TYPE_X86, "CPU_TYPE_X86"),
    (CPU_TYPE_X86_64, "CPU_TYPE_X86_64"),
    (0xa, "CPU_TYPE_MC98000"),
    (0xb, "CPU_TYPE_HPPA"),
    (CPU_TYPE_ARM, "CPU_TYPE_ARM"),
    (CPU_TYPE_ARM64, "CPU_TYPE_ARM64"),
    (0xd, "CPU_TYPE_MC88000"),
    (0xe, "CPU_TYPE_SPARC"),
    (0xf, "CPU_TYPE_I860"),
    (CPU_TYPE_POWERPC, "CPU_TYPE_POWERPC"),
    (CPU_TYPE_POWERPC64, "CPU_TYPE_POWERPC64"),
];

pub const CPU_SUBTYPE_X86_NAMES: &[(u32, &str)] = &[(0x3, "CPU_SUBTYPE_X86_ALL"), (0x4, "CPU_SUBTYPE_X86_ARCH1")];

pub const CPU_SUBTYPE_X86_64_NAMES: &[(u32, &str)] = &[(0x3, "CPU_SUBTYPE_X86_64_ALL"), (0x8, "CPU_SUBTYPE_X86_64_H")];

pub const CPU_SUBTYPE_POWERPC_NAMES: &[(u32, &str)] = &[
    (0x0, "CPU_SUBTYPE_POWERPC_ALL"),
    (0x1, "CPU_SUBTYPE_POWERPC_601"),
    (0x2, "CPU_SUBTYPE_POWERPC_602"),
    (0x3, "CPU_SUBTYPE_POWERPC_603"),
    (0x4, "CPU_SUBTYPE_POWERPC_603e"),
    (0x5, "CPU_SUBTYPE_POWERPC_603ev"),
    (0x6, "CPU_SUBTYPE_POWERPC_604"),
    (0x7, "CPU_SUBTYPE_POWERPC_604e"),
    (0x8, "CPU_SUBTYPE_POWERPC_620"),
    (0x9, "CPU_SUBTYPE_POWERPC_750"),
    (0xa, "CPU_SUBTYPE_POWERPC_7400"),
    (0xb, "CPU_SUBTYPE_POWERPC_7450"),
    (0x64, "CPU_SUBTYPE_POWERPC_970"),
];

pub const CPU_SUBTYPE_ARM_NAMES: &[(u32, &str)] = &[
    (0x0, "CPU_SUBTYPE_ARM_ALL"),
    (0x5, "CPU_SUBTYPE_ARM_V4T"),
    (0x6, "CPU_SUBTYPE_ARM_V6"),
    (0x7, "CPU_SUBTYPE_ARM_V5TEJ"),
    (0x8, "CPU_SUBTYPE_ARM_XSCALE"),
    (0x9, "CPU_SUBTYPE_ARM_V7"),
    (0xa, "CPU_SUBTYPE_ARM_V7F"),
    (0xb, "CPU_SUBTYPE_ARM_V7S"),
    (0xc, "CPU_SUBTYPE_ARM_V7K"),
    (0xd, "CPU_SUBTYPE_ARM_V8"),
    (0xe, "CPU_SUBTYPE_ARM_V6M"),
    (0xf, "CPU_SUBTYPE_ARM_V7M"),
    (0x10, "CPU_SUBTYPE_ARM_V7EM"),
];

pub const CPU_SUBTYPE_ARM64_NAMES: &[(u32, &str)] = &[(0x0, "CPU_SUBTYPE_ARM64_ALL"), (0x1, "CPU_SUBTYPE_ARM64_V8")];

// Header
pub const MH_MAGIC: u32 = 0xfeed_face;
pub const MH_CIGAM: u32 = 0xcefa_edfe;
pub const MH_MAGIC_64: u32 = 0xfeed_facf;
pub const MH_CIGAM_64: u32 = 0xcffa_edfe;

pub const MAGIC_NAMES: &[(u32, &str)] = &[
    (MH_MAGIC, "MH_MAGIC"),
    (MH_CIGAM, "MH_CIGAM"),
    (MH_MAGIC_64, "MH_MAGIC_64"),
    (MH_CIGAM_64, "MH_CIGAM_64"),
];

pub const MH_OBJECT: u32 = 0x1;

pub const FILE_TYPE_NAMES: &[(u32, &str)] = &[
    (MH_OBJECT, "MH_OBJECT"),
    (0x2, "MH_EXECUTE"),
    (0x3, "MH_FVMLIB"),
    (0x4, "MH_CORE"),
    (0x5, "MH_PRELOAD"),
    (0x6, "MH_DYLIB"),
    (0x7, "MH_DYLINKER"),
    (0x8, "MH_BUNDLE"),
    (0x9, "MH_DYLIB_STUB"),
    (0xa, "MH_DSYM"),
    (0xb, "MH_KEXT_BUNDLE"),
];

/// One name per bit, starting at bit 0.
pub const FILE_FLAG_NAMES: &[&str] = &[
    "MH_NOUNDEFS",
    "MH_INCRLINK",
    "MH_DYLDLINK",
    "MH_BINDATLOAD",
    "MH_PREBOUND",
    "MH_SPLIT_SEGS",
    "MH_LAZY_INIT",
    "MH_TWOLEVEL",
    "MH_FORCE_FLAT",
    "MH_NOMULTIDEFS",
    "MH_NOFIXPREBINDING",
    "MH_PREBINDABLE",
    "MH_ALLMODSBOUND",
    "MH_SUBSECTIONS_VIA_SYMBOLS",
    "MH_CANONICAL",
    "MH_WEAK_DEFINES",
    "MH_BINDS_TO_WEAK",
    "MH_ALLOW_STACK_EXECUTION",
    "MH_ROOT_SAFE",
    "MH_SETUID_SAFE",
    "MH_NO_REEXPORTED_DYLIBS",
    "MH_PIE",
    "MH_DEAD_STRIPPABLE_DYLIB",
    "MH_HAS_TLV_DESCRIPTORS",
    "MH_NO_HEAP_EXECUTION",
    "MH_APP_EXTENSION_SAFE",
];

// Load commands
pub const LC_REQ_DYLD: u32 = 0x8000_0000;
pub const LC_SEGMENT: u32 = 0x1;
pub const LC_SYMTAB: u32 = 0x2;
pub const LC_DYSYMTAB: u32 = 0xb;
pub const LC_LOAD_DYLIB: u32 = 0xc;
pub const LC_ID_DYLIB: u32 = 0xd;
pub const LC_SEGMENT_64: u32 = 0x19;
pub const LC_RPATH: u32 = 0x1c | LC_REQ_DYLD;

pub const LOAD_COMMAND_NAMES: &[(u32, &str)] = &[
    (LC_SEGMENT, "LC_SEGMENT"),
    (LC_SYMTAB, "LC_SYMTAB"),
    (0x3, "LC_SYMSEG"),
    (0x4, "LC_THREAD"),
    (0x5, "LC_UNIXTHREAD"),
    (0x6, "LC_LOADFVMLIB"),
    (0x7, "LC_IDFVMLIB"),
    (0x8, "LC_IDENT"),
    (0x9, "LC_FVMFILE"),
    (0xa, "LC_PREPAGE"),
    (LC_DYSYMTAB, "LC_DYSYMTAB"),
    (LC_LOAD_DYLIB, "LC_LOAD_DYLIB"),
    (0xd, "LC_ID_DYLIB"),
    (0xe, "LC_LOAD_DYLINKER"),
    (0xf, "LC_ID_DYLINKER"),
    (0x10, "LC_PREBOUND_DYLIB"),
    (0x11, "LC_ROUTINES"),
    (0x12, "LC_SUB_FRAMEWORK"),
    (0x13, "LC_SUB_UMBRELLA"),
    (0x14, "LC_SUB_CLIENT"),
    (0x15, "LC_SUB_LIBRARY"),
    (0x16, "LC_TWOLEVEL_HINTS"),
    (0x17, "LC_PREBIND_CKSUM"),
    (0x18 | LC_REQ_DYLD, "LC_LOAD_WEAK_DYLIB"),
    (LC_SEGMENT_64, "LC_SEGMENT_64"),
    (0x1a, "LC_ROUTINES_64"),
    (0x1b, "LC_UUID"),
    (LC_RPATH, "LC_RPATH"),
    (0x1d, "LC_CODE_SIGNATURE"),
    (0x1e, "LC_SEGMENT_SPLIT_INFO"),
    (0x1f | LC_REQ_DYLD, "LC_REEXPORT_DYLIB"),
    (0x20, "LC_LAZY_LOAD_DYLIB"),
    (0x21, "LC_ENCRYPTION_INFO"),
    (0x22, "LC_DYLD_INFO"),
    (0x22 | LC_REQ_DYLD, "LC_DYLD_INFO_ONLY"),
    (0x23 | LC_REQ_DYLD, "LC_LOAD_UPWARD_DYLIB"),
    (0x24, "LC_VERSION_MIN_MACOSX"),
    (0x25, "LC_VERSION_MIN_IPHONEOS"),
    (0x26, "LC_FUNCTION_STARTS"),
    (0x27, "LC_DYLD_ENVIRONMENT"),
    (0x28 | LC_REQ_DYLD, "LC_MAIN"),
    (0x29, "LC_DATA_IN_CODE"),
    (0x2a, "LC_SOURCE_VERSION"),
    (0x2b, "LC_DYLIB_CODE_SIGN_DRS"),
    (0x2c, "LC_ENCRYPTION_INFO_64"),
    (0x2d, "LC_LINKER_OPTION"),
    (0x2e, "LC_LINKER_OPTIMIZATION_HINT"),
    (0x2f, "LC_VERSION_MIN_TVOS"),
    (0x30, "LC_VERSION_MIN_WATCHOS"),
    (0x31, "LC_NOTE"),
    (0x32, "LC_BUILD_VERSION"),
    (0x33 | LC_REQ_DYLD, "LC_DYLD_EXPORTS_TRIE"),
    (0x34 | LC_REQ_DYLD, "LC_DYLD_CHAINED_FIXUPS"),
];

/// One name per bit, starting at bit 0.
pub const SEGMENT_FLAG_NAMES: &[&str] = &["SG_HIGHVM", "SG_FVMLIB", "SG_NORELOC", "SG_PROTECTED_VERSION_1"];

pub const VM_PROT_READ: u32 = 0x1;
pub const VM_PROT_WRITE: u32 = 0x2;
pub const VM_PROT_EXECUTE: u32 = 0x4;

// Sections
pub const SECTION_TYPE: u32 = 0x0000_00ff;
pub const SECTION_ATTRIBUTES: u32 = 0xffff_ff00;

pub const S_REGULAR: u32 = 0x0;
pub const S_ZEROFILL: u32 = 0x1;
pub const S_CSTRING_LITERALS: u32 = 0x2;
pub const S_4BYTE_LITERALS: u32 = 0x3;
pub const S_8BYTE_LITERALS: u32 = 0x4;
pub const S_LITERAL_POINTERS: u32 = 0x5;
pub const S_NON_LAZY_SYMBOL_POINTERS: u32 = 0x6;
pub const S_LAZY_SYMBOL_POINTERS: u32 = 0x7;
pub const S_SYMBOL_STUBS: u32 = 0x8;
pub const S_MOD_INIT_FUNC_POINTERS: u32 = 0x9;
pub const S_MOD_TERM_FUNC_POINTERS: u32 = 0xa;
pub const S_COALESCED: u32 = 0xb;
pub const S_GB_ZEROFILL: u32 = 0xc;
pub const S_16BYTE_LITERALS: u32 = 0xe;
pub const S_THREAD_LOCAL_ZEROFILL: u32 = 0x12;

pub const SECTION_TYPE_NAMES: &[(u32, &str)] = &[
    (S_REGULAR, "S_REGULAR"),
    (S_ZEROFILL, "S_ZEROFILL"),
    (S_CSTRING_LITERALS, "S_CSTRING_LITERALS"),
    (S_4BYTE_LITERALS, "S_4BYTE_LITERALS"),
    (S_8BYTE_LITERALS, "S_8BYTE_LITERALS"),
    (S_LITERAL_POINTERS, "S_LITERAL_POINTERS"),
    (S_NON_LAZY_SYMBOL_POINTERS, "S_NON_LAZY_SYMBOL_POINTERS"),
    (S_LAZY_SYMBOL_POINTERS, "S_LAZY_SYMBOL_POINTERS"),
    (S_SYMBOL_STUBS, "S_SYMBOL_STUBS"),
    (S_MOD_INIT_FUNC_POINTERS, "S_MOD_INIT_FUNC_POINTERS"),
    (S_MOD_TERM_FUNC_POINTERS, "S_MOD_TERM_FUNC_POINTERS"),
    (S_COALESCED, "S_COALESCED"),
    (S_GB_ZEROFILL, "S_GB_ZEROFILL"),
    (0xd, "S_INTERPOSING"),
    (S_16BYTE_LITERALS, "S_16BYTE_LITERALS"),
    (0xf, "S_DTRACE_DOF"),
    (0x10, "S_LAZY_DYLIB_SYMBOL_POINTERS"),
    (0x11, "S_THREAD_LOCAL_REGULAR"),
    (S_THREAD_LOCAL_ZEROFILL, "S_THREAD_LOCAL_ZEROFILL"),
    (0x13, "S_THREAD_LOCAL_VARIABLES"),
    (0x14, "S_THREAD_LOCAL_VARIABLE_POINTERS"),
    (0x15, "S_THREAD_LOCAL_INIT_FUNCTION_POINTERS"),
    (0x16, "S_INIT_FUNC_OFFSETS"),
];

pub const S_ATTR_PURE_INSTRUCTIONS: u32 = 0x8000_0000;
pub const S_ATTR_SOME_INSTRUCTIONS: u32 = 0x0000_0400;

pub const SECTION_ATTRIBUTE_NAMES: &[(u32, &str)] = &[
    (S_ATTR_PURE_INSTRUCTIONS, "S_ATTR_PURE_INSTRUCTIONS"),
    (0x4000_0000, "S_ATTR_NO_TOC"),
    (0x2000_0000, "S_ATTR_STRIP_STATIC_SYMS"),
    (0x1000_0000, "S_ATTR_NO_DEAD_STRIP"),
    (0x0800_0000, "S_ATTR_LIVE_SUPPORT"),
    (0x0400_0000, "S_ATTR_SELF_MODIFYING_CODE"),
    (0x0200_0000, "S_ATTR_DEBUG"),
    (S_ATTR_SOME_INSTRUCTIONS, "S_ATTR_SOME_INSTRUCTIONS"),
    (0x0000_0200, "S_ATTR_EXT_RELOC"),
    (0x0000_0100, "S_ATTR_LOC_RELOC"),
];

// Symbols
pub const N_STAB: u8 = 0xe0;
pub const N_PEXT: u8 = 0x10;
pub const N_TYPE: u8 = 0x0e;
pub const N_EXT: u8 = 0x01;

pub const N_UNDF: u8 = 0x0;
pub const N_ABS: u8 = 0x2;
pub const N_SECT: u8 = 0xe;
pub const N_PBUD: u8 = 0xc;
pub const N_INDR: u8 = 0xa;

pub const NO_SECT: u8 = 0;

pub const SYMBOL_TYPE_NAMES: &[(u8, &str)] = &[
    (N_UNDF, "N_UNDF"),
    (N_ABS, "N_ABS"),
    (N_SECT, "N_SECT"),
    (N_PBUD, "N_PBUD"),
    (N_INDR, "N_INDR"),
];

pub const STAB_NAMES: &[(u8, &str)] = &[
    (0x20, "N_GSYM"),
    (0x22, "N_FNAME"),
    (0x24, "N_FUN"),
    (0x26, "N_STSYM"),
    (0x28, "N_LCSYM"),
    (0x2e, "N_BNSYM"),
    (0x30, "N_PC"),
    (0x32, "N_AST"),
    (0x3c, "N_OPT"),
    (0x40, "N_RSYM"),
    (0x44, "N_SLINE"),
    (0x4e, "N_ENSYM"),
    (0x60, "N_SSYM"),
    (0x64, "N_SO"),
    (0x66, "N_OSO"),
    (0x80, "N_LSYM"),
    (0x82, "N_BINCL"),
    (0x84, "N_SOL"),
    (0x86, "N_PARAMS"),
    (0x88, "N_VERSION"),
    (0x8a, "N_OLEVEL"),
    (0xa0, "N_PSYM"),
    (0xa2, "N_EINCL"),
    (0xa4, "N_ENTRY"),
    (0xc0, "N_LBRAC"),
    (0xc2, "N_EXCL"),
    (0xe0, "N_RBRAC"),
    (0xe2, "N_BCOMM"),
    (0xe4, "N_ECOMM"),
    (0xe8, "N_ECOML"),
    (0xfe, "N_LENG"),
];

pub const REFERENCE_TYPE: u16 = 0x7;

pub const REFERENCE_TYPE_NAMES: &[(u16, &str)] = &[
    (0, "REFERENCE_FLAG_UNDEFINED_NON_LAZY"),
    (1, "REFERENCE_FLAG_UNDEFINED_LAZY"),
    (2, "REFERENCE_FLAG_DEFINED"),
    (3, "REFERENCE_FLAG_PRIVATE_DEFINED"),
    (4, "REFERENCE_FLAG_PRIVATE_UNDEFINED_NON_LAZY"),
    (5, "REFERENCE_FLAG_PRIVATE_UNDEFINED_LAZY"),
];

pub const REFERENCED_DYNAMICALLY: u16 = 0x0010;
pub const N_NO_DEAD_STRIP: u16 = 0x0020;
pub const N_DESC_DISCARDED: u16 = 0x0020;
pub const N_WEAK_REF: u16 = 0x0040;
pub const N_WEAK_DEF: u16 = 0x0080;
pub const N_REF_TO_WEAK: u16 = 0x0080;
pub const N_ARM_THUMB_DEF: u16 = 0x0008;
pub const N_SYMBOL_RESOLVER: u16 = 0x0100;
pub const N_ALT_ENTRY: u16 = 0x0200;

pub const SELF_LIBRARY_ORDINAL: u8 = 0x0;
pub const MAX_LIBRARY_ORDINAL: u8 = 0xfd;
pub const DYNAMIC_LOOKUP_ORDINAL: u8 = 0xfe;
pub const EXECUTABLE_ORDINAL: u8 = 0xff;

// Relocations
pub const GENERIC_RELOC_VANILLA: u8 = 0;
pub const GENERIC_RELOC_PAIR: u8 = 1;
pub const GENERIC_RELOC_SECTDIFF: u8 = 2;
pub const GENERIC_RELOC_LOCAL_SECTDIFF: u8 = 4;

pub const GENERIC_RELOC_NAMES: &[(u8, &str)] = &[
    (GENERIC_RELOC_VANILLA, "GENERIC_RELOC_VANILLA"),
    (GENERIC_RELOC_PAIR, "GENERIC_RELOC_PAIR"),
    (GENERIC_RELOC_SECTDIFF, "GENERIC_RELOC_SECTDIFF"),
    (3, "GENERIC_RELOC_PB_LA_PTR"),
    (GENERIC_RELOC_LOCAL_SECTDIFF, "GENERIC_RELOC_LOCAL_SECTDIFF"),
    (5, "GENERIC_RELOC_TLV"),
];

pub const X86_64_RELOC_UNSIGNED: u8 = 0;
pub const X86_64_RELOC_SIGNED: u8 = 1;
pub const X86_64_RELOC_BRANCH: u8 = 2;
pub const X86_64_RELOC_GOT_LOAD: u8 = 3;
pub const X86_64_RELOC_GOT: u8 = 4;
pub const X86_64_RELOC_SUBTRACTOR: u8 = 5;
pub const X86_64_RELOC_SIGNED_1: u8 = 6;
pub const X86_64_RELOC_SIGNED_2: u8 = 7;
pub const X86_64_RELOC_SIGNED_4: u8 = 8;
pub const X86_64_RELOC_TLV: u8 = 9;

pub const X86_64_RELOC_NAMES: &[(u8, &str)] = &[
    (X86_64_RELOC_UNSIGNED, "X86_64_RELOC_UNSIGNED"),
    (X86_64_RELOC_SIGNED, "X86_64_RELOC_SIGNED"),
    (X86_64_RELOC_BRANCH, "X86_64_RELOC_BRANCH"),
    (X86_64_RELOC_GOT_LOAD, "X86_64_RELOC_GOT_LOAD"),
    (X86_64_RELOC_GOT, "X86_64_RELOC_GOT"),
    (X86_64_RELOC_SUBTRACTOR, "X86_64_RELOC_SUBTRACTOR"),
    (X86_64_RELOC_SIGNED_1, "X86_64_RELOC_SIGNED_1"),
    (X86_64_RELOC_SIGNED_2, "X86_64_RELOC_SIGNED_2"),
    (X86_64_RELOC_SIGNED_4, "X86_64_RELOC_SIGNED_4"),
    (X86_64_RELOC_TLV, "X86_64_RELOC_TLV"),
];

pub const ARM_RELOC_VANILLA: u8 = 0;
pub const ARM_RELOC_PAIR: u8 = 1;
pub const ARM_RELOC_SECTDIFF: u8 = 2;
pub const ARM_RELOC_LOCAL_SECTDIFF: u8 = 3;
pub const ARM_RELOC_BR24: u8 = 5;
pub const ARM_THUMB_RELOC_BR22: u8 = 6;

pub const ARM_RELOC_NAMES: &[(u8, &str)] = &[
    (ARM_RELOC_VANILLA, "ARM_RELOC_VANILLA"),
    (ARM_RELOC_PAIR, "ARM_RELOC_PAIR"),
    (ARM_RELOC_SECTDIFF, "ARM_RELOC_SECTDIFF"),
    (ARM_RELOC_LOCAL_SECTDIFF, "ARM_RELOC_LOCAL_SECTDIFF"),
    (4, "ARM_RELOC_PB_LA_PTR"),
    (ARM_RELOC_BR24, "ARM_RELOC_BR24"),
    (ARM_THUMB_RELOC_BR22, "ARM_THUMB_RELOC_BR22"),
    (7, "ARM_THUMB_32BIT_BRANCH"),
    (8, "ARM_RELOC_HALF"),
    (9, "ARM_RELOC_HALF_SECTDIFF"),
];

pub const ARM64_RELOC_UNSIGNED: u8 = 0;
pub const ARM64_RELOC_SUBTRACTOR: u8 = 1;
pub const ARM64_RELOC_BRANCH26: u8 = 2;
pub const ARM64_RELOC_PAGE21: u8 = 3;
pub const ARM64_RELOC_PAGEOFF12: u8 = 4;
pub const ARM64_RELOC_GOT_LOAD_PAGE21: u8 = 5;
pub const ARM64_RELOC_GOT_LOAD_PAGEOFF12: u8 = 6;
pub const ARM64_RELOC_POINTER_TO_GOT: u8 = 7;
pub const ARM64_RELOC_TLVP_LOAD_PAGE21: u8 = 8;
pub const ARM64_RELOC_TLVP_LOAD_PAGEOFF12: u8 = 9;
pub const ARM64_RELOC_ADDEND: u8 = 10;

pub const ARM64_RELOC_NAMES: &[(u8, &str)] = &[
    (ARM64_RELOC_UNSIGNED, "ARM64_RELOC_UNSIGNED"),
    (ARM64_RELOC_SUBTRACTOR, "ARM64_RELOC_SUBTRACTOR"),
    (ARM64_RELOC_BRANCH26, "ARM64_RELOC_BRANCH26"),
    (ARM64_RELOC_PAGE21, "ARM64_RELOC_PAGE21"),
    (ARM64_RELOC_PAGEOFF12, "ARM64_RELOC_PAGEOFF12"),
    (ARM64_RELOC_GOT_LOAD_PAGE21, "ARM64_RELOC_GOT_LOAD_PAGE21"),
    (ARM64_RELOC_GOT_LOAD_PAGEOFF12, "ARM64_RELOC_GOT_LOAD_PAGEOFF12"),
    (ARM64_RELOC_POINTER_TO_GOT, "ARM64_RELOC_POINTER_TO_GOT"),
    (ARM64_RELOC_TLVP_LOAD_PAGE21, "ARM64_RELOC_TLVP_LOAD_PAGE21"),
    (ARM64_RELOC_TLVP_LOAD_PAGEOFF12, "ARM64_RELOC_TLVP_LOAD_PAGEOFF12"),
    (ARM64_RELOC_ADDEND, "ARM64_RELOC_ADDEND"),
    (11, "ARM64_RELOC_AUTHENTICATED_POINTER"),
];

pub const PPC_RELOC_VANILLA: u8 = 0;
pub const PPC_RELOC_PAIR: u8 = 1;
pub const PPC_RELOC_BR14: u8 = 2;
pub const PPC_RELOC_BR24: u8 = 3;
pub const PPC_RELOC_SECTDIFF: u8 = 8;
pub const PPC_RELOC_LOCAL_SECTDIFF: u8 = 15;

pub const PPC_RELOC_NAMES: &[(u8, &str)] = &[
    (PPC_RELOC_VANILLA, "PPC_RELOC_VANILLA"),
    (PPC_RELOC_PAIR, "PPC_RELOC_PAIR"),
    (PPC_RELOC_BR14, "PPC_RELOC_BR14"),
    (PPC_RELOC_BR24, "PPC_RELOC_BR24"),
    (4, "PPC_RELOC_HI16"),
    (5, "PPC_RELOC_LO16"),
    (6, "PPC_RELOC_HA16"),
    (7, "PPC_RELOC_LO14"),
    (PPC_RELOC_SECTDIFF, "PPC_RELOC_SECTDIFF"),
    (9, "PPC_RELOC_PB_LA_PTR"),
    (10, "PPC_RELOC_HI16_SECTDIFF"),
    (11, "PPC_RELOC_LO16_SECTDIFF"),
    (12, "PPC_RELOC_HA16_SECTDIFF"),
    (13, "PPC_RELOC_JBSR"),
    (14, "PPC_RELOC_LO14_SECTDIFF"),
    (PPC_RELOC_LOCAL_SECTDIFF, "PPC_RELOC_LOCAL_SECTDIFF"),
];

/// Look up the C identifier for `value` in a name table.
pub fn lookup_name<T: PartialEq + Copy>(table: &[(T, &'static str)], value: T) -> Option<&'static str>
{
    table.iter().find(|(v, _)| *v == value).map(|(_, name)| *name)
}
