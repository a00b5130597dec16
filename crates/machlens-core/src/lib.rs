//! # machlens-core
//!
//! Analysis engine for Mach-O object files and executables.
//!
//! Given a parsed file, the engine provides:
//! - A sorted symbol index with sizes, aliases and address lookup
//! - Binding of relocation entries to the symbols that cover them
//! - Interpretation of relocation targets for x86, x86-64, ARM, ARM64 and PPC
//! - Typed decoding of section and symbol contents (integers, floats,
//!   strings, pointers and DWARF-described variables)
//! - Disassembly with symbolic operands
//! - A field-level breakdown of `__eh_frame` sections
//!
//! [`Session`] ties these together and memoizes decoded views.
//!
//! ## Example
//!
//! ```rust,no_run
//! use machlens_core::{Session, SessionOptions};
//!
//! fn main() -> machlens_core::Result<()>
//! {
//!     let session = Session::open("hello.o", SessionOptions::default())?;
//!     if let Some(hit) = session.lookup(0x10) {
//!         println!("{}", hit.names);
//!     }
//!     Ok(())
//! }
//! ```

pub mod anchor;
pub mod decode;
pub mod disasm;
pub mod ehframe;
pub mod error;
pub mod macho;
pub mod prelude;
pub mod relocs;
pub mod session;
pub mod symbols;
pub mod types;

pub use anchor::Anchor;
pub use decode::{DecodedView, Focus, Row, SemanticType};
pub use ehframe::EhFrame;
pub use error::{EngineError, Result};
pub use macho::MachFile;
pub use relocs::RelocTarget;
pub use session::{Session, SessionOptions, View};
pub use symbols::{Lookup, SymbolTable};
pub use types::arch::Architecture;
