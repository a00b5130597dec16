//! Symbol demangling utilities.
//!
//! Mach-O prefixes every C-level name with an underscore, so a Rust legacy
//! symbol shows up as `__ZN...E` and a C function `main` as `_main`.
//! `rustc_demangle` accepts both the `_ZN` and `__ZN` forms.

use rustc_demangle::try_demangle;

use crate::types::SymbolName;

/// Create a `SymbolName` from a raw string table entry.
///
/// Only Rust manglings are expanded; C++ and C names keep `demangled`
/// empty.
pub fn make_symbol_name(raw: &str) -> SymbolName
{
    let demangled = try_demangle(raw).ok().map(|d| format!("{d:#}"));
    SymbolName::new(raw.to_string(), demangled)
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_make_symbol_name_rust()
    {
        let name = make_symbol_name("__ZN4core3fmt5write17h0123456789abcdefE");
        assert_eq!(name.demangled(), Some("core::fmt::write"));
        assert_eq!(
            name.to_string(),
            "__ZN4core3fmt5write17h0123456789abcdefE (core::fmt::write)"
        );
    }

    #[test]
    fn test_make_symbol_name_c()
    {
        let name = make_symbol_name("_main");
        assert_eq!(name.raw(), "_main");
        assert_eq!(name.to_string(), "_main");
    }

    #[test]
    fn test_make_symbol_name_cpp()
    {
        let name = make_symbol_name("__Z3fooi");
        assert!(name.demangled().is_none());
    }
}
