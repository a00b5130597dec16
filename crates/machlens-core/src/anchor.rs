//! Navigation anchors.
//!
//! Relocation targets are rendered as links of the form
//! `/symbol/N?addend=A&size=S` or `/address/N?size=S` (all decimal). A
//! front end parses them back with [`str::parse`] and opens them through
//! [`crate::session::Session::open_anchor`].

use std::fmt;
use std::str::FromStr;

use crate::error::EngineError;
use crate::relocs::RelocTarget;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Anchor
{
    Symbol
    {
        index: usize,
        addend: i64,
        size: u64,
    },
    Address
    {
        address: u64,
        size: u64,
    },
}

impl Anchor
{
    /// Link for a relocation target; `None` for targetless entries.
    pub fn for_target(target: &RelocTarget) -> Option<Self>
    {
        match *target {
            RelocTarget::Symbol { index, addend, size } => Some(Anchor::Symbol { index, addend, size }),
            RelocTarget::Address { address, addend, size } => Some(Anchor::Address {
                address: address.wrapping_add_signed(addend),
                size,
            }),
            RelocTarget::NoTarget | RelocTarget::Unresolved(_) => None,
        }
    }
}

impl fmt::Display for Anchor
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result
    {
        match self {
            Anchor::Symbol { index, addend, size } => write!(f, "/symbol/{index}?addend={addend}&size={size}"),
            Anchor::Address { address, size } => write!(f, "/address/{address}?size={size}"),
        }
    }
}

fn invalid(anchor: &str) -> EngineError
{
    EngineError::InvalidArgument(format!("malformed anchor '{anchor}'"))
}

/// Value of `key` in an `a=1&b=2` query, defaulting to zero when absent.
fn query_value<T: FromStr + Default>(anchor: &str, query: &str, key: &str) -> Result<T, EngineError>
{
    match query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(name, _)| *name == key)
    {
        Some((_, value)) => value.parse().map_err(|_| invalid(anchor)),
        None => Ok(T::default()),
    }
}

impl FromStr for Anchor
{
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err>
    {
        let (path, query) = s.split_once('?').unwrap_or((s, ""));
        if let Some(index) = path.strip_prefix("/symbol/") {
            return Ok(Anchor::Symbol {
                index: index.parse().map_err(|_| invalid(s))?,
                addend: query_value(s, query, "addend")?,
                size: query_value(s, query, "size")?,
            });
        }
        if let Some(address) = path.strip_prefix("/address/") {
            return Ok(Anchor::Address {
                address: address.parse().map_err(|_| invalid(s))?,
                size: query_value(s, query, "size")?,
            });
        }
        Err(invalid(s))
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    #[test]
    fn test_symbol_anchor_text()
    {
        let anchor = Anchor::Symbol {
            index: 3,
            addend: -4,
            size: 8,
        };
        assert_eq!(anchor.to_string(), "/symbol/3?addend=-4&size=8");
        assert_eq!("/symbol/3?addend=-4&size=8".parse::<Anchor>().ok(), Some(anchor));
    }

    #[test]
    fn test_address_anchor_defaults()
    {
        assert_eq!(
            "/address/4096".parse::<Anchor>().ok(),
            Some(Anchor::Address {
                address: 4096,
                size: 0
            })
        );
        assert!("/address/0x1000".parse::<Anchor>().is_err());
        assert!("/section/1".parse::<Anchor>().is_err());
    }

    #[test]
    fn test_anchor_for_target()
    {
        let target = RelocTarget::Address {
            address: 0x1000,
            addend: 0x10,
            size: 4,
        };
        assert_eq!(
            Anchor::for_target(&target),
            Some(Anchor::Address {
                address: 0x1010,
                size: 4
            })
        );
        assert_eq!(Anchor::for_target(&RelocTarget::NoTarget), None);
    }
}
