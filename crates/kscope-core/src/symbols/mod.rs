//! # Symbol Tables
//!
//! Name → address maps for the target, independent of debug records. The
//! kernel synthetic finder uses these to locate variables such as
//! `jiffies_64` or `vmemmap_base` whose addresses are in the kernel's own
//! symbol table even when the debug records are missing or unreliable.
//!
//! ## Sources
//!
//! - `System.map` and `/proc/kallsyms` text (`address type name [module]`)
//! - ELF symbol tables (`vmlinux`, executables) through `object`
//!
//! ## Usage
//!
//! ```rust
//! use kscope_core::symbols::{SymbolKind, SymbolTable};
//! use kscope_core::types::Address;
//!
//! let table = SymbolTable::parse_system_map(
//!     "ffffffff81000000 T _text\n\
//!      ffffffff82a05000 D jiffies_64\n",
//! )?;
//! let jiffies = table.lookup("jiffies_64").unwrap();
//! assert_eq!(jiffies.address, Address::from(0xffffffff82a05000));
//! assert_eq!(jiffies.kind, SymbolKind::Data);
//! # Ok::<(), kscope_core::KscopeError>(())
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use object::{Object, ObjectSymbol};

use crate::error::{KscopeError, Result};
use crate::types::Address;

/// Broad classification of a symbol, from its `nm` type letter or ELF type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SymbolKind
{
    /// Code (`T`/`t`, `STT_FUNC`)
    Text,
    /// Initialized data (`D`/`d`, `STT_OBJECT`)
    Data,
    /// Read-only data (`R`/`r`)
    ReadOnly,
    /// Zero-initialized data (`B`/`b`)
    Bss,
    /// Absolute value, not an address in any section (`A`/`a`)
    Absolute,
    /// Anything else
    Other,
}

impl SymbolKind
{
    fn from_nm(letter: char) -> Self
    {
        match letter.to_ascii_lowercase() {
            't' | 'w' => SymbolKind::Text,
            'd' | 'g' => SymbolKind::Data,
            'r' => SymbolKind::ReadOnly,
            'b' | 's' => SymbolKind::Bss,
            'a' => SymbolKind::Absolute,
            _ => SymbolKind::Other,
        }
    }

    /// Data-like symbols that name a variable
    pub fn is_data(self) -> bool
    {
        matches!(self, SymbolKind::Data | SymbolKind::ReadOnly | SymbolKind::Bss)
    }
}

/// One symbol table entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol
{
    pub name: String,
    pub address: Address,
    pub size: Option<u64>,
    pub kind: SymbolKind,
    pub global: bool,
    /// Owning module for kallsyms entries of loadable modules
    pub module: Option<String>,
}

/// Symbol lookup by exact name
///
/// When a name appears more than once, a global definition replaces a local
/// one; otherwise the first definition wins.
#[derive(Debug, Clone, Default)]
pub struct SymbolTable
{
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable
{
    #[must_use]
    pub fn new() -> Self
    {
        Self::default()
    }

    /// Add a symbol, applying the duplicate rule
    pub fn insert(&mut self, symbol: Symbol)
    {
        match self.symbols.get(&symbol.name) {
            Some(existing) if existing.global || !symbol.global => {}
            _ => {
                self.symbols.insert(symbol.name.clone(), symbol);
            }
        }
    }

    /// Parse `System.map` / `/proc/kallsyms` text
    ///
    /// ## Errors
    ///
    /// `Parse` for lines that do not start with a hexadecimal address and a
    /// type letter.
    pub fn parse_system_map(text: &str) -> Result<Self>
    {
        let mut table = Self::new();
        for (lineno, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let bad = || KscopeError::Parse(format!("symbol map line {}: {line:?}", lineno + 1));
            let mut fields = line.split_whitespace();
            let address = fields
                .next()
                .and_then(|field| u64::from_str_radix(field, 16).ok())
                .ok_or_else(bad)?;
            let letter = fields
                .next()
                .filter(|field| field.len() == 1)
                .and_then(|field| field.chars().next())
                .ok_or_else(bad)?;
            let name = fields.next().ok_or_else(bad)?;
            let module = fields
                .next()
                .and_then(|field| field.strip_prefix('[')?.strip_suffix(']'))
                .map(str::to_string);
            table.insert(Symbol {
                name: name.to_string(),
                address: Address::from(address),
                size: None,
                kind: SymbolKind::from_nm(letter),
                global: letter.is_ascii_uppercase(),
                module,
            });
        }
        tracing::debug!(symbols = table.len(), "parsed symbol map");
        Ok(table)
    }

    /// Read a `System.map` or kallsyms file
    ///
    /// ## Errors
    ///
    /// `Io` if the file cannot be read, `Parse` for malformed content.
    pub fn from_system_map(path: impl AsRef<Path>) -> Result<Self>
    {
        Self::parse_system_map(&fs::read_to_string(path)?)
    }

    /// Extract the symbol table of an ELF file
    ///
    /// ## Errors
    ///
    /// `Parse` if the data is not a valid object file.
    pub fn from_elf(data: &[u8]) -> Result<Self>
    {
        let file = object::File::parse(data).map_err(|err| KscopeError::Parse(format!("object file: {err}")))?;
        let mut table = Self::new();
        for symbol in file.symbols() {
            let Ok(name) = symbol.name() else {
                continue;
            };
            if name.is_empty() || symbol.is_undefined() {
                continue;
            }
            let kind = match symbol.kind() {
                object::SymbolKind::Text => SymbolKind::Text,
                object::SymbolKind::Data => SymbolKind::Data,
                _ => SymbolKind::Other,
            };
            table.insert(Symbol {
                name: name.to_string(),
                address: Address::from(symbol.address()),
                size: Some(symbol.size()).filter(|size| *size > 0),
                kind,
                global: symbol.is_global(),
                module: None,
            });
        }
        tracing::debug!(symbols = table.len(), "loaded ELF symbol table");
        Ok(table)
    }

    pub fn lookup(&self, name: &str) -> Option<&Symbol>
    {
        self.symbols.get(name)
    }

    pub fn address_of(&self, name: &str) -> Option<Address>
    {
        self.lookup(name).map(|symbol| symbol.address)
    }

    /// Closest symbol at or below `address`
    pub fn symbolize(&self, address: Address) -> Option<&Symbol>
    {
        self.symbols
            .values()
            .filter(|symbol| symbol.kind != SymbolKind::Absolute && symbol.address <= address)
            .max_by_key(|symbol| symbol.address)
    }

    pub fn len(&self) -> usize
    {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool
    {
        self.symbols.is_empty()
    }
}

#[cfg(test)]
mod tests
{
    use super::*;

    const KALLSYMS: &str = "\
ffffffff81000000 T _text
ffffffff81001000 t local_helper
ffffffff82a05000 D jiffies_64
ffffffff82b00000 B vmemmap_base
0000000000000000 A fixed_percpu_data
ffffffffc0a01000 t ext4_fill_super\t[ext4]
";

    #[test]
    fn test_parse_kinds_and_modules()
    {
        let table = SymbolTable::parse_system_map(KALLSYMS).unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(table.lookup("vmemmap_base").unwrap().kind, SymbolKind::Bss);
        assert!(!table.lookup("local_helper").unwrap().global);
        assert_eq!(table.lookup("ext4_fill_super").unwrap().module.as_deref(), Some("ext4"));
        assert_eq!(table.lookup("fixed_percpu_data").unwrap().kind, SymbolKind::Absolute);
    }

    #[test]
    fn test_lookup_is_exact()
    {
        let table = SymbolTable::parse_system_map(KALLSYMS).unwrap();
        assert!(table.lookup("jiffies").is_none());
        assert!(table.lookup("JIFFIES_64").is_none());
        assert!(table.lookup("jiffies_64").is_some());
    }

    #[test]
    fn test_global_replaces_local()
    {
        let table = SymbolTable::parse_system_map(
            "ffffffff81000010 t dup\nffffffff81000020 T dup\nffffffff81000030 t dup\n",
        )
        .unwrap();
        assert_eq!(table.address_of("dup"), Some(Address::from(0xffffffff81000020)));
    }

    #[test]
    fn test_symbolize()
    {
        let table = SymbolTable::parse_system_map(KALLSYMS).unwrap();
        let symbol = table.symbolize(Address::from(0xffffffff81000800)).unwrap();
        assert_eq!(symbol.name, "_text");
    }

    #[test]
    fn test_malformed_line()
    {
        assert!(matches!(
            SymbolTable::parse_system_map("zzzz T foo\n"),
            Err(KscopeError::Parse(_))
        ));
        assert!(matches!(
            SymbolTable::parse_system_map("ffff TT foo\n"),
            Err(KscopeError::Parse(_))
        ));
    }
}
