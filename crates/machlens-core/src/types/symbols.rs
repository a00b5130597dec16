//! Symbol-table names.

use std::fmt;

/// A string-table entry plus its Rust demangling, when one exists.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolName
{
    raw: String,
    demangled: Option<String>,
}

impl SymbolName
{
    pub fn new(raw: String, demangled: Option<String>) -> Self
    {
        Self { raw, demangled }
    }

    /// Name exactly as stored in the string table.
    pub fn raw(&self) -> &str
    {
        &self.raw
    }

    pub fn demangled(&self) -> Option<&str>
    {
        self.demangled.as_deref()
    }
}

/// Symbol listing form: `raw (demangled)`, or just `raw`.
impl fmt::Display for SymbolName
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match &self.demangled {
            Some(demangled) => write!(f, "{} ({demangled})", self.raw),
            None => f.write_str(&self.raw),
        }
    }
}
