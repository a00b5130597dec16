//! DWARF-typed value decoding.
//!
//! [`DwarfInfo`] loads the `__DWARF` sections of a file with gimli and
//! resolves a global variable's declared type into a [`DwarfType`]. The
//! type is then used by [`decode_value`] to render the variable's bytes as
//! a C-like literal such as `struct point{.x = int(0x1); .y = int(0x2)}`.
//!
//! Only the shapes needed to print a value are modelled; anything else
//! (function types, bit-fields, incomplete types) is reported as
//! unsupported so the caller can fall back to a raw dump.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use gimli::{
    constants, AttributeValue, DebuggingInformationEntry, Dwarf, EndianArcSlice, Reader, RunTimeEndian, SectionId,
    Unit, UnitOffset, UnitSectionOffset,
};
use tracing::debug;

use super::long_double::decode_long_double;
use super::scalar::{format_float, quote_char, read_signed, read_unsigned, signed_hex_value};
use crate::error::{map_dwarf_error, EngineError, Result};
use crate::macho::MachFile;
use crate::types::LongDoubleLayout;

type OwnedReader = EndianArcSlice<RunTimeEndian>;
type OwnedDwarf = Dwarf<OwnedReader>;

const MAX_TYPE_REF_DEPTH: usize = 32;

/// A DWARF type, reduced to what value printing needs.
#[derive(Debug, Clone, PartialEq)]
pub struct DwarfType
{
    /// C spelling, e.g. `struct point`, `*char`, `[4]int`, `const int`
    pub name: String,
    /// Byte size; `None` for incomplete types
    pub size: Option<u64>,
    pub kind: DwarfKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DwarfKind
{
    /// Structures, classes and unions
    Struct(Vec<DwarfField>),
    Array
    {
        element: Box<DwarfType>,
        count: u64,
    },
    Pointer,
    Bool,
    Char,
    Uchar,
    Int,
    Uint,
    Float,
    Complex,
    Enum(Vec<(String, i64)>),
    Typedef(Box<DwarfType>),
    /// `const`, `volatile`, `restrict`, `_Atomic`
    Qualified(Box<DwarfType>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct DwarfField
{
    pub name: String,
    pub offset: u64,
    /// Set for bit-fields
    pub bit_size: Option<u64>,
    pub ty: DwarfType,
}

impl DwarfType
{
    fn new(name: impl Into<String>, size: Option<u64>, kind: DwarfKind) -> Self
    {
        Self {
            name: name.into(),
            size,
            kind,
        }
    }
}

/// Environment for value decoding.
#[derive(Debug, Clone, Copy)]
pub struct ValueEnv
{
    pub endian: RunTimeEndian,
    /// Layout of 16-byte floats, when they can be decoded on this host
    pub long_double: Option<LongDoubleLayout>,
}

/// Render `data` as a value of type `ty`.
///
/// With `zero`, the value is known to be all zeroes (zero-fill storage) and
/// the bytes are not read, but their length is still checked. With
/// `label`, the result is wrapped as `T(v)`/`T{..}` (or `(T)(v)` when the
/// type name contains a space).
///
/// ## Errors
///
/// - `EngineError::Truncated` if `data` is shorter than the type
/// - `EngineError::Unsupported` for bit-fields, incomplete types, odd
///   scalar sizes and `long double` on a foreign host
pub fn decode_value(data: &[u8], ty: &DwarfType, zero: bool, label: bool, env: &ValueEnv) -> Result<String>
{
    let value = match &ty.kind {
        DwarfKind::Typedef(inner) | DwarfKind::Qualified(inner) => decode_value(data, inner, zero, false, env)?,
        DwarfKind::Struct(fields) => {
            let size = sized(ty, data)?;
            if zero {
                "{0}".to_string()
            } else {
                let mut parts = Vec::with_capacity(fields.len());
                for field in fields {
                    if field.bit_size.is_some() {
                        return Err(EngineError::Unsupported(format!("bit-field {}", field.name)));
                    }
                    let field_size = field
                        .ty
                        .size
                        .ok_or_else(|| EngineError::Unsupported(format!("incomplete field {}", field.name)))?;
                    let end = field.offset.saturating_add(field_size);
                    if end > size {
                        return Err(EngineError::truncated(
                            "struct field",
                            field.offset as usize,
                            field_size as usize,
                            size.saturating_sub(field.offset) as usize,
                        ));
                    }
                    let bytes = &data[field.offset as usize..end as usize];
                    parts.push(format!(".{} = {}", field.name, decode_value(bytes, &field.ty, false, true, env)?));
                }
                format!("{{{}}}", parts.join("; "))
            }
        }
        DwarfKind::Array { element, count } => {
            sized(ty, data)?;
            let element_size = element
                .size
                .ok_or_else(|| EngineError::Unsupported("incomplete array element".to_string()))?
                as usize;
            if zero {
                "{0}".to_string()
            } else if element_size == 0 {
                "{}".to_string()
            } else {
                let parts = data
                    .chunks_exact(element_size)
                    .take(usize::try_from(*count).unwrap_or(usize::MAX))
                    .map(|bytes| decode_value(bytes, element, false, false, env))
                    .collect::<Result<Vec<_>>>()?;
                format!("{{{}}}", parts.join(", "))
            }
        }
        DwarfKind::Pointer | DwarfKind::Uint => {
            let size = sized(ty, data)?;
            let value = if zero { 0 } else { unsigned(data, size, env)? };
            format!("{value:#x}")
        }
        DwarfKind::Int => {
            let size = sized(ty, data)?;
            let value = if zero { 0 } else { signed(data, size, env)? };
            signed_hex_value(value)
        }
        DwarfKind::Bool | DwarfKind::Char | DwarfKind::Uchar => {
            let size = sized(ty, data)?;
            if size != 1 {
                return Err(EngineError::Unsupported(format!("{}-byte {}", size, ty.name)));
            }
            let byte = if zero { 0 } else { data[0] };
            match ty.kind {
                DwarfKind::Bool => byte.to_string(),
                DwarfKind::Char => quote_char(i64::from(byte as i8)),
                _ => quote_char(i64::from(byte)),
            }
        }
        DwarfKind::Float => {
            let size = sized(ty, data)?;
            if zero {
                "0".to_string()
            } else {
                decode_float(&data[..size as usize], env)?
            }
        }
        DwarfKind::Complex => {
            let size = sized(ty, data)?;
            if zero {
                "0".to_string()
            } else {
                let half = size as usize / 2;
                if half != 4 && half != 8 {
                    return Err(EngineError::Unsupported(format!("{size}-byte complex")));
                }
                let real = decode_float(&data[..half], env)?;
                let imaginary = decode_float(&data[half..2 * half], env)?;
                format!("{real} + {imaginary}i")
            }
        }
        DwarfKind::Enum(values) => {
            let size = sized(ty, data)?;
            let value = match (zero, size) {
                (true, _) => 0,
                (false, 1) => i64::from(data[0]),
                (false, _) => signed(data, size, env)?,
            };
            values
                .iter()
                .find(|(_, v)| *v == value)
                .map_or_else(|| signed_hex_value(value), |(name, _)| name.clone())
        }
    };

    if !label {
        return Ok(value);
    }
    let aggregate = value.starts_with('{');
    Ok(match (ty.name.contains(' '), aggregate) {
        (true, true) => format!("({}){value}", ty.name),
        (true, false) => format!("({})({value})", ty.name),
        (false, true) => format!("{}{value}", ty.name),
        (false, false) => format!("{}({value})", ty.name),
    })
}

/// Check `data` holds the whole type and return its size.
fn sized(ty: &DwarfType, data: &[u8]) -> Result<u64>
{
    let size = ty
        .size
        .ok_or_else(|| EngineError::Unsupported(format!("incomplete type {}", ty.name)))?;
    if (data.len() as u64) < size {
        return Err(EngineError::truncated("DWARF value", 0, size as usize, data.len()));
    }
    Ok(size)
}

fn unsigned(data: &[u8], size: u64, env: &ValueEnv) -> Result<u64>
{
    read_unsigned(&data[..size as usize], env.endian)
        .ok_or_else(|| EngineError::Unsupported(format!("{size}-byte integer")))
}

fn signed(data: &[u8], size: u64, env: &ValueEnv) -> Result<i64>
{
    read_signed(&data[..size as usize], env.endian).ok_or_else(|| EngineError::Unsupported(format!("{size}-byte integer")))
}

fn decode_float(data: &[u8], env: &ValueEnv) -> Result<String>
{
    use gimli::Endianity;

    match data.len() {
        4 => Ok(format_float(f64::from(env.endian.read_f32(data)), true)),
        8 => Ok(format_float(env.endian.read_f64(data), false)),
        16 => match env.long_double {
            Some(layout) => Ok(decode_long_double(data, layout, env.endian)),
            None => Err(EngineError::Unsupported("long double on this host".to_string())),
        },
        n => Err(EngineError::Unsupported(format!("{n}-byte float"))),
    }
}

/// Loaded DWARF sections of one file plus a per-variable type cache.
pub struct DwarfInfo
{
    dwarf: OwnedDwarf,
    units: Vec<Unit<OwnedReader>>,
    type_cache: RwLock<HashMap<String, Option<Arc<DwarfType>>>>,
}

impl std::fmt::Debug for DwarfInfo
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result
    {
        f.debug_struct("DwarfInfo").field("units", &self.units.len()).finish()
    }
}

impl DwarfInfo
{
    /// Load the `__DWARF` segment of `file`.
    ///
    /// ## Returns
    ///
    /// `Ok(None)` when the file carries no `__debug_info`.
    ///
    /// ## Errors
    ///
    /// Returns `EngineError::Dwarf` if a unit header cannot be parsed.
    pub fn load(file: &MachFile) -> Result<Option<Self>>
    {
        if dwarf_section(file, SectionId::DebugInfo).is_none() {
            return Ok(None);
        }

        let endian = file.endian;
        let dwarf = Dwarf::load(|id| {
            let data: Arc<[u8]> = dwarf_section(file, id).unwrap_or_else(|| Arc::from(Vec::new()));
            Ok::<_, gimli::Error>(EndianArcSlice::new(data, endian))
        })
        .map_err(|err| map_dwarf_error("loading DWARF sections", err))?;

        let mut units = Vec::new();
        let mut headers = dwarf.units();
        while let Some(header) = headers
            .next()
            .map_err(|err| map_dwarf_error("reading .debug_info unit header", err))?
        {
            units.push(
                dwarf
                    .unit(header)
                    .map_err(|err| map_dwarf_error("parsing compilation unit", err))?,
            );
        }
        debug!(units = units.len(), "loaded DWARF");

        Ok(Some(Self {
            dwarf,
            units,
            type_cache: RwLock::new(HashMap::new()),
        }))
    }

    /// Declared type of the global variable behind a symbol.
    ///
    /// The symbol's leading underscore is ignored when matching
    /// `DW_TAG_variable` names. Results are cached per symbol name.
    ///
    /// ## Errors
    ///
    /// DWARF read failures and unsupported type shapes.
    pub fn variable_type(&self, symbol_name: &str) -> Result<Option<Arc<DwarfType>>>
    {
        if let Some(cached) = self
            .type_cache
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(symbol_name)
        {
            return Ok(cached.clone());
        }

        let found = self.find_variable_type(symbol_name)?.map(Arc::new);
        self.type_cache
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(symbol_name.to_string(), found.clone());
        Ok(found)
    }

    fn find_variable_type(&self, symbol_name: &str) -> Result<Option<DwarfType>>
    {
        let stripped = symbol_name.strip_prefix('_');
        for (index, unit) in self.units.iter().enumerate() {
            let mut tree = unit
                .entries_tree(None)
                .map_err(|err| map_dwarf_error("building unit tree", err))?;
            let root = tree.root().map_err(|err| map_dwarf_error("navigating unit root", err))?;
            let mut children = root.children();
            while let Some(child) = children
                .next()
                .map_err(|err| map_dwarf_error("iterating unit children", err))?
            {
                let entry = child.entry();
                if entry.tag() != constants::DW_TAG_variable {
                    continue;
                }
                let Some(name) = self.entry_name(unit, entry)? else {
                    continue;
                };
                if Some(name.as_str()) != stripped && name != symbol_name {
                    continue;
                }
                let Some(attr) = entry
                    .attr(constants::DW_AT_type)
                    .map_err(|err| map_dwarf_error("reading variable type", err))?
                else {
                    return Ok(None);
                };
                return self.resolve_type(index, attr.value(), 0).map(Some);
            }
        }
        Ok(None)
    }

    fn entry_name(&self, unit: &Unit<OwnedReader>, entry: &DebuggingInformationEntry<'_, '_, OwnedReader>)
        -> Result<Option<String>>
    {
        let Some(attr) = entry
            .attr(constants::DW_AT_name)
            .map_err(|err| map_dwarf_error("reading DW_AT_name", err))?
        else {
            return Ok(None);
        };
        let reader = self
            .dwarf
            .attr_string(unit, attr.value())
            .map_err(|err| map_dwarf_error("resolving DWARF string", err))?;
        let name = reader
            .to_string_lossy()
            .map_err(|err| map_dwarf_error("decoding DWARF string", err))?
            .into_owned();
        Ok(Some(name))
    }

    /// Follow a `DW_AT_type` reference to `(unit index, offset)`.
    fn locate(&self, unit: usize, value: AttributeValue<OwnedReader>) -> Option<(usize, UnitOffset<usize>)>
    {
        match value {
            AttributeValue::UnitRef(offset) => Some((unit, offset)),
            AttributeValue::DebugInfoRef(offset) => {
                let target = UnitSectionOffset::from(offset);
                self.units
                    .iter()
                    .enumerate()
                    .find_map(|(i, u)| target.to_unit_offset(u).map(|offset| (i, offset)))
            }
            _ => None,
        }
    }

    fn resolve_type(&self, unit: usize, value: AttributeValue<OwnedReader>, depth: usize) -> Result<DwarfType>
    {
        if depth >= MAX_TYPE_REF_DEPTH {
            return Err(EngineError::Unsupported("type reference chain too deep".to_string()));
        }
        let (unit_index, offset) = self
            .locate(unit, value)
            .ok_or_else(|| EngineError::Unsupported("unresolvable type reference".to_string()))?;
        self.build_type(unit_index, offset, depth + 1)
    }

    /// Inner type of a typedef/qualifier/array, if any.
    fn inner_type(
        &self,
        unit: usize,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
        depth: usize,
    ) -> Result<Option<DwarfType>>
    {
        match entry
            .attr(constants::DW_AT_type)
            .map_err(|err| map_dwarf_error("reading DW_AT_type", err))?
        {
            Some(attr) => self.resolve_type(unit, attr.value(), depth).map(Some),
            None => Ok(None),
        }
    }

    fn build_type(&self, unit_index: usize, offset: UnitOffset<usize>, depth: usize) -> Result<DwarfType>
    {
        let unit = &self.units[unit_index];
        let entry = unit
            .entry(offset)
            .map_err(|err| map_dwarf_error("resolving type reference", err))?;
        let name = self.entry_name(unit, &entry)?;
        let size = udata(&entry, constants::DW_AT_byte_size)?;

        match entry.tag() {
            constants::DW_TAG_base_type => {
                let encoding = match entry
                    .attr_value(constants::DW_AT_encoding)
                    .map_err(|err| map_dwarf_error("reading DW_AT_encoding", err))?
                {
                    Some(AttributeValue::Encoding(encoding)) => encoding,
                    _ => return Err(EngineError::Unsupported("base type without encoding".to_string())),
                };
                let kind = match encoding {
                    constants::DW_ATE_boolean => DwarfKind::Bool,
                    constants::DW_ATE_float => DwarfKind::Float,
                    constants::DW_ATE_complex_float => DwarfKind::Complex,
                    constants::DW_ATE_signed => DwarfKind::Int,
                    constants::DW_ATE_signed_char => DwarfKind::Char,
                    constants::DW_ATE_unsigned | constants::DW_ATE_UTF => DwarfKind::Uint,
                    constants::DW_ATE_unsigned_char => DwarfKind::Uchar,
                    other => return Err(EngineError::Unsupported(format!("base type encoding {other}"))),
                };
                Ok(DwarfType::new(name.unwrap_or_default(), size, kind))
            }
            constants::DW_TAG_pointer_type
            | constants::DW_TAG_reference_type
            | constants::DW_TAG_rvalue_reference_type => {
                let pointee = self.pointee_name(unit_index, &entry, depth)?;
                let size = size.or(Some(u64::from(unit.encoding().address_size)));
                Ok(DwarfType::new(format!("*{pointee}"), size, DwarfKind::Pointer))
            }
            constants::DW_TAG_structure_type | constants::DW_TAG_class_type | constants::DW_TAG_union_type => {
                let keyword = match entry.tag() {
                    constants::DW_TAG_class_type => "class",
                    constants::DW_TAG_union_type => "union",
                    _ => "struct",
                };
                let fields = self.collect_fields(unit_index, offset, depth)?;
                let name = format!("{keyword} {}", name.as_deref().unwrap_or("{...}"));
                Ok(DwarfType::new(name, size, DwarfKind::Struct(fields)))
            }
            constants::DW_TAG_array_type => {
                let element = self
                    .inner_type(unit_index, &entry, depth)?
                    .ok_or_else(|| EngineError::Unsupported("array without element type".to_string()))?;
                let counts = self.collect_subranges(unit_index, offset)?;
                let mut ty = element;
                for count in counts.into_iter().rev() {
                    let count = count.ok_or_else(|| EngineError::Unsupported("array without bound".to_string()))?;
                    let size = ty.size.map(|s| s.saturating_mul(count));
                    ty = DwarfType::new(
                        format!("[{count}]{}", ty.name),
                        size,
                        DwarfKind::Array {
                            element: Box::new(ty),
                            count,
                        },
                    );
                }
                Ok(ty)
            }
            constants::DW_TAG_enumeration_type => {
                let values = self.collect_enumerators(unit_index, offset)?;
                let name = format!("enum {}", name.as_deref().unwrap_or("{...}"));
                Ok(DwarfType::new(name, size, DwarfKind::Enum(values)))
            }
            constants::DW_TAG_typedef => {
                let inner = self
                    .inner_type(unit_index, &entry, depth)?
                    .ok_or_else(|| EngineError::Unsupported("typedef of void".to_string()))?;
                Ok(DwarfType::new(name.unwrap_or_default(), inner.size, DwarfKind::Typedef(Box::new(inner))))
            }
            constants::DW_TAG_const_type
            | constants::DW_TAG_volatile_type
            | constants::DW_TAG_restrict_type
            | constants::DW_TAG_atomic_type => {
                let qualifier = match entry.tag() {
                    constants::DW_TAG_const_type => "const",
                    constants::DW_TAG_volatile_type => "volatile",
                    constants::DW_TAG_restrict_type => "restrict",
                    _ => "_Atomic",
                };
                let inner = self
                    .inner_type(unit_index, &entry, depth)?
                    .ok_or_else(|| EngineError::Unsupported(format!("{qualifier} void")))?;
                Ok(DwarfType::new(
                    format!("{qualifier} {}", inner.name),
                    inner.size,
                    DwarfKind::Qualified(Box::new(inner)),
                ))
            }
            other => Err(EngineError::Unsupported(format!("DWARF type tag {other}"))),
        }
    }

    /// Name of a pointer's target without building it (types may be
    /// self-referential through pointers).
    fn pointee_name(
        &self,
        unit_index: usize,
        entry: &DebuggingInformationEntry<'_, '_, OwnedReader>,
        depth: usize,
    ) -> Result<String>
    {
        if depth >= MAX_TYPE_REF_DEPTH {
            return Ok("?".to_string());
        }
        let Some(attr) = entry
            .attr(constants::DW_AT_type)
            .map_err(|err| map_dwarf_error("reading pointee type", err))?
        else {
            return Ok("void".to_string());
        };
        let Some((target_index, offset)) = self.locate(unit_index, attr.value()) else {
            return Ok("?".to_string());
        };
        let unit = &self.units[target_index];
        let target = unit
            .entry(offset)
            .map_err(|err| map_dwarf_error("resolving pointee", err))?;
        let name = self.entry_name(unit, &target)?;
        Ok(match (target.tag(), name) {
            (constants::DW_TAG_structure_type, Some(name)) => format!("struct {name}"),
            (constants::DW_TAG_class_type, Some(name)) => format!("class {name}"),
            (constants::DW_TAG_union_type, Some(name)) => format!("union {name}"),
            (constants::DW_TAG_enumeration_type, Some(name)) => format!("enum {name}"),
            (constants::DW_TAG_pointer_type, _) => format!("*{}", self.pointee_name(target_index, &target, depth + 1)?),
            (constants::DW_TAG_const_type, _) => format!("const {}", self.pointee_name(target_index, &target, depth + 1)?),
            (_, Some(name)) => name,
            (_, None) => "?".to_string(),
        })
    }

    fn collect_fields(&self, unit_index: usize, offset: UnitOffset<usize>, depth: usize) -> Result<Vec<DwarfField>>
    {
        let unit = &self.units[unit_index];
        let mut fields = Vec::new();
        let mut tree = unit
            .entries_tree(Some(offset))
            .map_err(|err| map_dwarf_error("building struct tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating struct root", err))?;
        let mut children = root.children();
        while let Some(child) = children
            .next()
            .map_err(|err| map_dwarf_error("iterating struct children", err))?
        {
            let entry = child.entry();
            if entry.tag() != constants::DW_TAG_member {
                continue;
            }
            let name = self.entry_name(unit, entry)?.unwrap_or_default();
            let ty = self
                .inner_type(unit_index, entry, depth)?
                .ok_or_else(|| EngineError::Unsupported(format!("member {name} without type")))?;
            let bit_size = match udata(entry, constants::DW_AT_bit_size)? {
                Some(bits) => Some(bits),
                None => udata(entry, constants::DW_AT_data_bit_offset)?.map(|_| 0),
            };
            fields.push(DwarfField {
                name,
                offset: member_offset(entry)?,
                bit_size,
                ty,
            });
        }
        Ok(fields)
    }

    /// Element counts of each `DW_TAG_subrange_type`, outermost first.
    fn collect_subranges(&self, unit_index: usize, offset: UnitOffset<usize>) -> Result<Vec<Option<u64>>>
    {
        let unit = &self.units[unit_index];
        let mut counts = Vec::new();
        let mut tree = unit
            .entries_tree(Some(offset))
            .map_err(|err| map_dwarf_error("building array tree", err))?;
        let root = tree.root().map_err(|err| map_dwarf_error("navigating array root", err))?;
        let mut children = root.children();
        while let Some(child) = children.next().map_err(|err| map_dwarf_error("iterating subranges", err))? {
            let entry = child.entry();
            if entry.tag() != constants::DW_TAG_subrange_type {
                continue;
            }
            let count = udata(entry, constants::DW_AT_count)?;
            let upper = udata(entry, constants::DW_AT_upper_bound)?;
            counts.push(subrange_count(count, upper));
        }
        Ok(counts)
    }

    fn collect_enumerators(&self, unit_index: usize, offset: UnitOffset<usize>) -> Result<Vec<(String, i64)>>
    {
        let unit = &self.units[unit_index];
        let mut values = Vec::new();
        let mut tree = unit
            .entries_tree(Some(offset))
            .map_err(|err| map_dwarf_error("building enumeration tree", err))?;
        let root = tree
            .root()
            .map_err(|err| map_dwarf_error("navigating enumeration root", err))?;
        let mut children = root.children();
        while let Some(child) = children.next().map_err(|err| map_dwarf_error("iterating enumerators", err))? {
            let entry = child.entry();
            if entry.tag() != constants::DW_TAG_enumerator {
                continue;
            }
            let Some(attr) = entry
                .attr(constants::DW_AT_const_value)
                .map_err(|err| map_dwarf_error("reading DW_AT_const_value", err))?
            else {
                continue;
            };
            let Some(value) = attr.sdata_value().or_else(|| attr.udata_value().map(|v| v as i64)) else {
                continue;
            };
            values.push((self.entry_name(unit, entry)?.unwrap_or_default(), value));
        }
        Ok(values)
    }
}

/// Element count from `DW_AT_count` or `DW_AT_upper_bound`. An upper
/// bound of all ones (`-1` stored unsigned) has no usable count.
fn subrange_count(count: Option<u64>, upper: Option<u64>) -> Option<u64>
{
    count.or_else(|| upper?.checked_add(1))
}

fn udata(entry: &DebuggingInformationEntry<'_, '_, OwnedReader>, name: gimli::DwAt) -> Result<Option<u64>>
{
    Ok(entry
        .attr(name)
        .map_err(|err| map_dwarf_error("reading attribute", err))?
        .and_then(|attr| attr.udata_value()))
}

/// `DW_AT_data_member_location` as a constant or a `DW_OP_plus_uconst`
/// expression; absent for union members.
fn member_offset(entry: &DebuggingInformationEntry<'_, '_, OwnedReader>) -> Result<u64>
{
    let Some(attr) = entry
        .attr(constants::DW_AT_data_member_location)
        .map_err(|err| map_dwarf_error("reading DW_AT_data_member_location", err))?
    else {
        return Ok(0);
    };
    if let Some(offset) = attr.udata_value() {
        return Ok(offset);
    }
    if let AttributeValue::Exprloc(expression) = attr.value() {
        let mut reader = expression.0;
        if reader.read_u8().map_err(|err| map_dwarf_error("reading member location", err))?
            == constants::DW_OP_plus_uconst.0
        {
            return reader
                .read_uleb128()
                .map_err(|err| map_dwarf_error("reading member location", err));
        }
    }
    Err(EngineError::Unsupported("computed member location".to_string()))
}

/// Bytes of `__DWARF,__debug_*` for a gimli section id. Mach-O section
/// names are limited to 16 bytes, so `__debug_str_offsets` is stored as
/// `__debug_str_offs`.
fn dwarf_section(file: &MachFile, id: SectionId) -> Option<Arc<[u8]>>
{
    let wanted: String = format!("__{}", id.name().trim_start_matches('.')).chars().take(16).collect();
    file.sections
        .iter()
        .find(|section| section.segment_name == "__DWARF" && section.name == wanted)
        .map(|section| Arc::clone(&section.data))
}

#[cfg(test)]
mod tests
{
    use super::*;

    fn env() -> ValueEnv
    {
        ValueEnv {
            endian: RunTimeEndian::Little,
            long_double: None,
        }
    }

    fn base(name: &str, size: u64, kind: DwarfKind) -> DwarfType
    {
        DwarfType::new(name, Some(size), kind)
    }

    #[test]
    fn test_decode_struct_with_labels()
    {
        let int = base("int", 4, DwarfKind::Int);
        let point = DwarfType::new(
            "struct point",
            Some(8),
            DwarfKind::Struct(vec![
                DwarfField {
                    name: "x".into(),
                    offset: 0,
                    bit_size: None,
                    ty: int.clone(),
                },
                DwarfField {
                    name: "y".into(),
                    offset: 4,
                    bit_size: None,
                    ty: int,
                },
            ]),
        );
        let data = [1, 0, 0, 0, 0xfe, 0xff, 0xff, 0xff];
        assert_eq!(
            decode_value(&data, &point, false, true, &env()).ok(),
            Some("(struct point){.x = int(0x1); .y = int(-0x2)}".to_string())
        );
        assert_eq!(
            decode_value(&data, &point, true, true, &env()).ok(),
            Some("(struct point){0}".to_string())
        );
    }

    #[test]
    fn test_decode_array_and_typedef()
    {
        let uchar = base("unsigned char", 1, DwarfKind::Uchar);
        let array = DwarfType::new(
            "[2]unsigned char",
            Some(2),
            DwarfKind::Array {
                element: Box::new(uchar),
                count: 2,
            },
        );
        let typedef = DwarfType::new("pair_t", Some(2), DwarfKind::Typedef(Box::new(array)));
        assert_eq!(
            decode_value(b"ab", &typedef, false, true, &env()).ok(),
            Some("pair_t{'a', 'b'}".to_string())
        );
    }

    #[test]
    fn test_decode_enum_and_bool()
    {
        let color = base("enum color", 4, DwarfKind::Enum(vec![("RED".into(), 0), ("BLUE".into(), 2)]));
        assert_eq!(
            decode_value(&[2, 0, 0, 0], &color, false, true, &env()).ok(),
            Some("(enum color)(BLUE)".to_string())
        );
        assert_eq!(
            decode_value(&[7, 0, 0, 0], &color, false, false, &env()).ok(),
            Some("0x7".to_string())
        );
        let flag = base("_Bool", 1, DwarfKind::Bool);
        assert_eq!(decode_value(&[1], &flag, false, true, &env()).ok(), Some("_Bool(1)".to_string()));
    }

    #[test]
    fn test_decode_rejects_bit_fields_and_short_data()
    {
        let int = base("int", 4, DwarfKind::Int);
        let flags = DwarfType::new(
            "struct flags",
            Some(4),
            DwarfKind::Struct(vec![DwarfField {
                name: "a".into(),
                offset: 0,
                bit_size: Some(3),
                ty: int.clone(),
            }]),
        );
        assert!(matches!(
            decode_value(&[0; 4], &flags, false, true, &env()),
            Err(EngineError::Unsupported(_))
        ));
        assert!(matches!(
            decode_value(&[0; 2], &int, false, true, &env()),
            Err(EngineError::Truncated { .. })
        ));
    }

    #[test]
    fn test_decode_complex_and_long_double()
    {
        let complex = base("complex float", 8, DwarfKind::Complex);
        let mut data = 1.5f32.to_le_bytes().to_vec();
        data.extend_from_slice(&(-2.0f32).to_le_bytes());
        assert_eq!(
            decode_value(&data, &complex, false, false, &env()).ok(),
            Some("1.5 + -2i".to_string())
        );
        let long_double = base("long double", 16, DwarfKind::Float);
        assert!(decode_value(&[0; 16], &long_double, false, false, &env()).is_err());
        assert_eq!(decode_value(&[0; 16], &long_double, true, false, &env()).ok(), Some("0".to_string()));
    }

    #[test]
    fn test_subrange_count()
    {
        assert_eq!(subrange_count(Some(3), None), Some(3));
        assert_eq!(subrange_count(None, Some(3)), Some(4));
        assert_eq!(subrange_count(None, Some(u64::MAX)), None);
        assert_eq!(subrange_count(None, None), None);
    }

    #[test]
    fn test_decode_array_of_empty_structs()
    {
        let empty = DwarfType::new("struct empty", Some(0), DwarfKind::Struct(Vec::new()));
        let array = DwarfType::new(
            "[huge]struct empty",
            Some(0),
            DwarfKind::Array {
                element: Box::new(empty),
                count: u64::MAX,
            },
        );
        assert_eq!(decode_value(&[], &array, false, false, &env()).ok(), Some("{}".to_string()));
    }
}
