//! # Types
//!
//! Small shared types used throughout the engine.

pub mod arch;
pub mod symbols;

// Re-export all public types
pub use arch::{Architecture, LongDoubleLayout};
pub use symbols::SymbolName;
