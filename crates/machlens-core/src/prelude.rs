//! Common module for library exports

pub use crate::anchor::Anchor;
pub use crate::decode::{DecodedView, Row, SemanticType};
pub use crate::ehframe::{CfiGroup, EhFrame, EhRecord};
pub use crate::error::{EngineError, Result};
pub use crate::macho::{MachFile, Section, Symbol};
pub use crate::relocs::RelocTarget;
pub use crate::session::{Session, SessionOptions, View};
pub use crate::symbols::{Lookup, SymbolInfo, SymbolTable};
pub use crate::types::arch::Architecture;
