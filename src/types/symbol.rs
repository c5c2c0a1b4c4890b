//! Symbol interning.
//!
//! Event streams repeat the same handful of ticker strings millions of
//! times. Symbols are interned to a dense [`SymbolId`] the first time they
//! are seen; every hot-path structure is keyed by the id and the string is
//! only resolved back at the reporting edge.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::RwLock;

/// Dense identifier for an interned symbol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SymbolId(pub u32);

impl fmt::Display for SymbolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Two-way symbol table: string to id and id back to string.
///
/// Lookups on the intern path use a concurrent map; the reverse table is an
/// append-only vector behind a read-write lock, touched only when a brand
/// new symbol arrives.
pub struct SymbolTable {
    ids: DashMap<String, SymbolId>,
    names: RwLock<Vec<String>>,
}

impl SymbolTable {
    /// Create an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self {
            ids: DashMap::new(),
            names: RwLock::new(Vec::new()),
        }
    }

    /// Intern a raw symbol, trimming surrounding whitespace (ITCH pads the
    /// stock field to eight bytes). Returns the existing id when the symbol
    /// has been seen before.
    pub fn intern(&self, raw: &str) -> SymbolId {
        let name = raw.trim();
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let mut names = self.names.write().expect("symbol table poisoned");
        // Re-check under the write lock so concurrent interners agree.
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        let id = SymbolId(names.len() as u32);
        names.push(name.to_string());
        self.ids.insert(name.to_string(), id);
        id
    }

    /// Look up a symbol without interning it.
    #[must_use]
    pub fn get(&self, raw: &str) -> Option<SymbolId> {
        self.ids.get(raw.trim()).map(|id| *id)
    }

    /// Resolve an id back to its symbol string.
    #[must_use]
    pub fn resolve(&self, id: SymbolId) -> Option<String> {
        self.names
            .read()
            .expect("symbol table poisoned")
            .get(id.0 as usize)
            .cloned()
    }

    /// Number of distinct symbols seen so far.
    #[must_use]
    pub fn len(&self) -> usize {
        self.names.read().expect("symbol table poisoned").len()
    }

    /// Whether no symbol has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// All interned symbols in id order.
    #[must_use]
    pub fn symbols(&self) -> Vec<String> {
        self.names.read().expect("symbol table poisoned").clone()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
