//! # Error Types
//!
//! General error handling for the analysis engine.
//!
//! We use `thiserror` to automatically generate `Error` trait implementations
//! and nice error messages.
//!
//! Almost every failure in this crate is local: a single row, relocation or
//! call-frame record cannot be decoded, and the caller renders a placeholder
//! and moves on. Views collect those failures as warnings; `EngineError` is
//! what the individual decoders return so the caller can decide.

use thiserror::Error;

/// Main error type for engine operations
///
/// ## Error Categories
///
/// 1. **Read errors**: Truncated (not enough bytes for a field)
/// 2. **Reference errors**: OutOfRange (symbol/section index outside bounds)
/// 3. **Encoding errors**: Unsupported (DWARF shape, long double layout, relocation kind), Overflow (LEB128)
/// 4. **Container errors**: Parse (malformed Mach-O), Dwarf (gimli failures)
/// 5. **I/O errors**: Io (reading the input file)
#[derive(Error, Debug)]
pub enum EngineError
{
    /// Fewer bytes were available than a field requires
    #[error("Truncated read: {what} needs {needed} bytes at offset {offset:#x}, {available} available")]
    Truncated
    {
        /// Name of the field being read
        what: &'static str,
        /// Offset of the field inside its buffer
        offset: u64,
        /// Number of bytes the field needs
        needed: u64,
        /// Number of bytes left in the buffer
        available: u64,
    },

    /// A symbol or section index points outside its table
    #[error("{kind} index {index} out of range")]
    OutOfRange
    {
        /// What kind of table the index refers to
        kind: &'static str,
        /// The offending index
        index: u64,
    },

    /// The input uses an encoding or shape this engine does not decode
    ///
    /// Examples:
    /// - DWARF bit-fields
    /// - `long double` of a foreign CPU
    /// - A pointer encoding with an unknown base format
    #[error("Unsupported: {0}")]
    Unsupported(String),

    /// A variable-length value did not terminate within its byte limit
    #[error("{what} overflow at offset {offset:#x}")]
    Overflow
    {
        /// Name of the value being decoded
        what: &'static str,
        /// Offset where the value starts
        offset: u64,
    },

    /// Invalid argument passed to an engine function
    ///
    /// Examples:
    /// - Asking for the symbol view of an undefined symbol
    /// - A malformed anchor string
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The Mach-O container could not be parsed
    #[error("Failed to parse Mach-O: {0}")]
    Parse(String),

    /// DWARF debug information could not be read
    #[error("DWARF error while {context}: {message}")]
    Dwarf
    {
        /// What the engine was doing
        context: &'static str,
        /// The underlying gimli message
        message: String,
    },

    /// I/O error (for file operations, etc.)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl EngineError
{
    pub(crate) fn truncated(what: &'static str, offset: usize, needed: usize, available: usize) -> Self
    {
        EngineError::Truncated {
            what,
            offset: offset as u64,
            needed: needed as u64,
            available: available as u64,
        }
    }
}

impl From<object::read::Error> for EngineError
{
    fn from(err: object::read::Error) -> Self
    {
        EngineError::Parse(err.to_string())
    }
}

/// Wrap a gimli error with the operation that produced it.
pub(crate) fn map_dwarf_error(context: &'static str, err: gimli::Error) -> EngineError
{
    EngineError::Dwarf {
        context,
        message: err.to_string(),
    }
}

/// Convenience type alias for `Result<T, EngineError>`
///
/// ```rust
/// use machlens_core::error::Result;
/// fn foo() -> Result<()>
/// {
///     Ok(())
/// }
/// ```
pub type Result<T> = std::result::Result<T, EngineError>;
