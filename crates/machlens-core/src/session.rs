//! # Session
//!
//! One loaded file and everything derived from it.
//!
//! The symbol index (with bound relocations) is built once when the session
//! is created. DWARF sections are loaded on first use. Decoded views and
//! per-symbol relocation tables are memoized for the lifetime of the
//! session, keyed by section or symbol and semantic type; a reload means a
//! new session.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use machlens_core::session::{Session, SessionOptions, View};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>>
//! {
//!     let session = Session::open("a.out", SessionOptions::default())?;
//!     for (number, section) in session.file().sections.iter().enumerate() {
//!         if let View::Rows(view) = session.section_view(number + 1, None)? {
//!             println!("{}: {} rows", section.label(), view.rows.len());
//!         }
//!     }
//!     Ok(())
//! }
//! ```

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock};

use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

use crate::anchor::Anchor;
use crate::decode::dwarf::DwarfInfo;
use crate::decode::{section_view, symbol_view, DecodeContext, DecodedView, Focus, SemanticType};
use crate::ehframe::{parse_eh_frame, EhFrame};
use crate::error::{EngineError, Result};
use crate::macho::structure::{structure, StructNode};
use crate::macho::{MachFile, Section};
use crate::relocs::table::{section_reltab, symbol_reltab, ReltabRow};
use crate::symbols::{symtab_rows, Lookup, SymbolTable, SymtabRow};

/// Library-level configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionOptions
{
    /// Load `__DWARF` sections for typed symbol views
    pub load_dwarf: bool,
    /// Decode `long double` even when the file's CPU differs from the host's
    pub force_long_double: bool,
}

impl Default for SessionOptions
{
    fn default() -> Self
    {
        Self {
            load_dwarf: true,
            force_long_double: false,
        }
    }
}

/// A decoded section or symbol
#[derive(Debug, Clone)]
pub enum View
{
    Rows(Arc<DecodedView>),
    EhFrame(Arc<EhFrame>),
}

impl View
{
    pub fn title(&self) -> &str
    {
        match self {
            View::Rows(view) => &view.title,
            View::EhFrame(frame) => &frame.title,
        }
    }

    pub fn warnings(&self) -> &[String]
    {
        match self {
            View::Rows(view) => &view.warnings,
            View::EhFrame(frame) => &frame.warnings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum ViewKey
{
    Section(usize, SemanticType),
    Symbol(usize, SemanticType),
}

/// A loaded file with its symbol index and view caches
#[derive(Debug)]
pub struct Session
{
    table: Arc<SymbolTable>,
    options: SessionOptions,
    dwarf: OnceCell<Option<DwarfInfo>>,
    views: RwLock<HashMap<ViewKey, View>>,
    reltabs: RwLock<HashMap<usize, Arc<Vec<ReltabRow>>>>,
}

impl Session
{
    /// Read and parse a file.
    ///
    /// ## Errors
    ///
    /// - `EngineError::Io` if the file cannot be read
    /// - `EngineError::Parse` if it is not a Mach-O (or fat) file
    pub fn open(path: impl AsRef<Path>, options: SessionOptions) -> Result<Self>
    {
        let path = path.as_ref();
        let bytes = std::fs::read(path)?;
        let file = MachFile::parse(&bytes)?;
        info!(
            path = %path.display(),
            description = %file.description(),
            sections = file.sections.len(),
            symbols = file.symbols.len(),
            "loaded file"
        );
        Ok(Self::new(file, options))
    }

    /// Build a session over an already parsed file.
    pub fn new(file: MachFile, options: SessionOptions) -> Self
    {
        let table = SymbolTable::new(Arc::new(file));
        if !table.warnings().is_empty() {
            warn!(unbound = table.warnings().len(), "some relocations are not covered by any symbol");
        }
        Self {
            table: Arc::new(table),
            options,
            dwarf: OnceCell::new(),
            views: RwLock::new(HashMap::new()),
            reltabs: RwLock::new(HashMap::new()),
        }
    }

    pub fn file(&self) -> &MachFile
    {
        self.table.file()
    }

    pub fn table(&self) -> &Arc<SymbolTable>
    {
        &self.table
    }

    pub fn options(&self) -> SessionOptions
    {
        self.options
    }

    /// Diagnostics from building the index.
    pub fn warnings(&self) -> &[String]
    {
        self.table.warnings()
    }

    /// DWARF information, loaded on first call; `None` when disabled,
    /// absent or unreadable.
    pub fn dwarf(&self) -> Option<&DwarfInfo>
    {
        if !self.options.load_dwarf {
            return None;
        }
        self.dwarf
            .get_or_init(|| match DwarfInfo::load(self.file()) {
                Ok(info) => info,
                Err(err) => {
                    warn!(error = %err, "ignoring unreadable DWARF");
                    None
                }
            })
            .as_ref()
    }

    pub fn lookup(&self, address: u64) -> Option<Lookup>
    {
        self.table.lookup(address)
    }

    pub fn symtab(&self) -> Vec<SymtabRow>
    {
        symtab_rows(self.file())
    }

    pub fn structure(&self) -> Vec<StructNode>
    {
        structure(self.file())
    }

    fn section(&self, number: usize) -> Result<&Section>
    {
        self.file().section(number as u32).ok_or(EngineError::OutOfRange {
            kind: "section",
            index: number as u64,
        })
    }

    /// 1-based number of the section containing `address`.
    pub fn section_containing(&self, address: u64) -> Option<usize>
    {
        self.file()
            .sections
            .iter()
            .find(|section| section.contains(address))
            .map(|section| section.index)
    }

    /// Section by `seg,sect` label or 1-based number.
    pub fn find_section(&self, spec: &str) -> Option<usize>
    {
        if let Ok(number) = spec.parse::<usize>() {
            return self.file().section(number as u32).map(|section| section.index);
        }
        let (segment, name) = spec.split_once(',')?;
        self.file().section_by_name(segment, name).map(|section| section.index)
    }

    /// Symbol by name or symbol table index.
    pub fn find_symbol(&self, spec: &str) -> Option<usize>
    {
        match spec.parse::<usize>() {
            Ok(index) if index < self.file().symbols.len() => Some(index),
            _ => self.table.find_by_name(spec),
        }
    }

    /// True once DWARF loading has been attempted.
    pub fn dwarf_loaded(&self) -> bool
    {
        self.dwarf.get().is_some()
    }

    /// Only DWARF-typed views touch the debug sections.
    fn context(&self, semantic: SemanticType) -> DecodeContext<'_>
    {
        DecodeContext {
            table: &self.table,
            force_long_double: self.options.force_long_double,
            dwarf: if semantic == SemanticType::DwarfType { self.dwarf() } else { None },
        }
    }

    fn cached(&self, key: ViewKey, build: impl FnOnce() -> Result<View>) -> Result<View>
    {
        if let Some(view) = self.views.read().unwrap_or_else(PoisonError::into_inner).get(&key) {
            debug!(?key, "view cache hit");
            return Ok(view.clone());
        }
        let view = build()?;
        self.views
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key, view.clone());
        Ok(view)
    }

    /// Decode section `number` (1-based). Without a semantic type the
    /// section's guess is used.
    ///
    /// ## Errors
    ///
    /// `EngineError::OutOfRange` for an unknown section number.
    pub fn section_view(&self, number: usize, semantic: Option<SemanticType>) -> Result<View>
    {
        let section = self.section(number)?;
        let semantic = semantic.unwrap_or_else(|| SemanticType::guess_for_section(self.file(), section));
        self.cached(ViewKey::Section(number, semantic), || {
            Ok(match semantic {
                SemanticType::EhFrame => View::EhFrame(Arc::new(parse_eh_frame(&self.table, section))),
                other => View::Rows(Arc::new(section_view(&self.context(other), section, other))),
            })
        })
    }

    /// Decode the group of symbol `index`. Without a semantic type the
    /// guess for its section is used.
    ///
    /// ## Errors
    ///
    /// - `EngineError::OutOfRange` for an unknown index
    /// - `EngineError::InvalidArgument` if the symbol is not section-defined
    pub fn symbol_view(&self, index: usize, semantic: Option<SemanticType>) -> Result<View>
    {
        let semantic = match semantic.or_else(|| SemanticType::guess_for_symbol(self.file(), index)) {
            Some(SemanticType::EhFrame) | None => SemanticType::Data,
            Some(other) => other,
        };
        self.cached(ViewKey::Symbol(index, semantic), || {
            symbol_view(&self.context(semantic), index, semantic).map(|view| View::Rows(Arc::new(view)))
        })
    }

    /// Open an anchor: the target symbol or the section holding the target
    /// address, with the target range focused.
    ///
    /// ## Errors
    ///
    /// - `EngineError::OutOfRange` if the symbol does not exist or no
    ///   section contains the address
    /// - Any error of [`Session::symbol_view`]
    pub fn open_anchor(&self, anchor: &Anchor) -> Result<View>
    {
        let (view, focus) = match *anchor {
            Anchor::Symbol { index, addend, size } => {
                let symbol = self.file().symbol(index as u32).ok_or(EngineError::OutOfRange {
                    kind: "symbol",
                    index: index as u64,
                })?;
                let focus = Focus {
                    address: symbol.value.wrapping_add_signed(addend),
                    size,
                };
                (self.symbol_view(index, None)?, focus)
            }
            Anchor::Address { address, size } => {
                let number = self.section_containing(address).ok_or(EngineError::OutOfRange {
                    kind: "address",
                    index: address,
                })?;
                (self.section_view(number, None)?, Focus { address, size })
            }
        };
        Ok(match view {
            View::Rows(rows) => {
                let mut focused = rows.as_ref().clone();
                focused.set_focus(focus);
                View::Rows(Arc::new(focused))
            }
            eh_frame @ View::EhFrame(_) => eh_frame,
        })
    }

    /// Relocation table of section `number`.
    ///
    /// ## Errors
    ///
    /// `EngineError::OutOfRange` for an unknown section number.
    pub fn section_reltab(&self, number: usize) -> Result<Vec<ReltabRow>>
    {
        Ok(section_reltab(self.file(), self.section(number)?))
    }

    /// Relocations bound to the group of symbol `index`, memoized.
    ///
    /// ## Errors
    ///
    /// `EngineError::InvalidArgument` if the symbol is not section-defined.
    pub fn symbol_reltab(&self, index: usize) -> Result<Arc<Vec<ReltabRow>>>
    {
        if let Some(rows) = self.reltabs.read().unwrap_or_else(PoisonError::into_inner).get(&index) {
            return Ok(Arc::clone(rows));
        }
        let info = self
            .table
            .info_for_symbol(index)
            .ok_or_else(|| EngineError::InvalidArgument(format!("symbol {index} has no extent")))?;
        let rows = Arc::new(symbol_reltab(self.file(), info));
        self.reltabs
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(index, Arc::clone(&rows));
        Ok(rows)
    }
}
