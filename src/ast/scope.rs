//! Reference resolution scopes.
//!
//! Declarations register themselves here immediately after construction, in
//! source order, which is what makes single-pass resolution work: a name is
//! visible to everything built after it. Resolution searches statement
//! locals first, then function parameters, then contract-level members by
//! category, then other source units' exported symbols. Not-found is not an
//! error; callers emit the node with a zero reference and continue.

use serde::{Deserialize, Serialize};

use crate::ast::types::TypeDescription;

// ============================================================================
// CROSS-FILE SYMBOLS
// ============================================================================

/// An exported name visible to importers of a source unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Symbol {
    pub id: i64,
    pub name: String,
    pub absolute_path: String,
}

/// The growing cross-file symbol table shared by all units of one build.
#[derive(Debug, Default)]
pub struct SymbolTable {
    symbols: Vec<Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a symbol; `(absolute_path, name)` pairs are unique within a
    /// build, later duplicates are ignored.
    pub fn register(&mut self, symbol: Symbol) {
        let exists = self
            .symbols
            .iter()
            .any(|s| s.absolute_path == symbol.absolute_path && s.name == symbol.name);
        if !exists {
            self.symbols.push(symbol);
        }
    }

    pub fn resolve(&self, name: &str) -> Option<&Symbol> {
        self.symbols.iter().find(|s| s.name == name)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Symbol> {
        self.symbols.iter()
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }
}

// ============================================================================
// IN-FILE SCOPES
// ============================================================================

/// What kind of declaration a scope entry came from; determines search
/// priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeKind {
    Local,
    Parameter,
    StateVariable,
    Struct,
    StructMember,
    Enum,
    EnumMember,
    Error,
    ErrorParameter,
    Event,
    Modifier,
    ModifierParameter,
}

#[derive(Debug, Clone)]
pub struct ScopeEntry {
    pub id: i64,
    pub name: String,
    pub kind: ScopeKind,
    pub type_description: Option<TypeDescription>,
}

/// Flat scope list for the file currently being built. Block scopes are
/// push/pop via marks; contract scope is cleared per file.
#[derive(Debug, Default)]
pub struct ScopeTable {
    entries: Vec<ScopeEntry>,
}

/// Category search order: first match within the earliest matching category
/// wins. Locals and parameters search nearest-declaration-first so shadowing
/// resolves to the innermost name.
const SEARCH_ORDER: &[&[ScopeKind]] = &[
    &[ScopeKind::Local],
    &[ScopeKind::Parameter],
    &[ScopeKind::StateVariable],
    &[ScopeKind::Struct, ScopeKind::StructMember],
    &[ScopeKind::Enum, ScopeKind::EnumMember],
    &[ScopeKind::Error, ScopeKind::ErrorParameter],
    &[ScopeKind::Event],
    &[ScopeKind::Modifier, ScopeKind::ModifierParameter],
];

impl ScopeTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn declare(&mut self, entry: ScopeEntry) {
        self.entries.push(entry);
    }

    /// Marks the current scope depth; `truncate` with the mark pops every
    /// declaration made since.
    pub fn mark(&self) -> usize {
        self.entries.len()
    }

    pub fn truncate(&mut self, mark: usize) {
        self.entries.truncate(mark);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Resolve a name to (declaring node ID, type description).
    pub fn resolve(&self, name: &str) -> Option<(i64, Option<TypeDescription>)> {
        for kinds in SEARCH_ORDER {
            let nearest_first =
                kinds.contains(&ScopeKind::Local) || kinds.contains(&ScopeKind::Parameter);
            let found = if nearest_first {
                self.entries
                    .iter()
                    .rev()
                    .find(|e| kinds.contains(&e.kind) && e.name == name)
            } else {
                self.entries
                    .iter()
                    .find(|e| kinds.contains(&e.kind) && e.name == name)
            };
            if let Some(entry) = found {
                return Some((entry.id, entry.type_description.clone()));
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::types::normalize_type_name;

    fn entry(id: i64, name: &str, kind: ScopeKind) -> ScopeEntry {
        ScopeEntry {
            id,
            name: name.to_string(),
            kind,
            type_description: normalize_type_name("uint").ok(),
        }
    }

    #[test]
    fn locals_shadow_state_variables() {
        let mut scope = ScopeTable::new();
        scope.declare(entry(10, "x", ScopeKind::StateVariable));
        scope.declare(entry(20, "x", ScopeKind::Local));

        let (id, _) = scope.resolve("x").unwrap();
        assert_eq!(id, 20);
    }

    #[test]
    fn nearest_local_wins() {
        let mut scope = ScopeTable::new();
        scope.declare(entry(1, "i", ScopeKind::Local));
        scope.declare(entry(2, "i", ScopeKind::Local));
        assert_eq!(scope.resolve("i").unwrap().0, 2);
    }

    #[test]
    fn parameters_beat_contract_members() {
        let mut scope = ScopeTable::new();
        scope.declare(entry(5, "owner", ScopeKind::StateVariable));
        scope.declare(entry(6, "owner", ScopeKind::Parameter));
        assert_eq!(scope.resolve("owner").unwrap().0, 6);
    }

    #[test]
    fn block_marks_pop_locals() {
        let mut scope = ScopeTable::new();
        scope.declare(entry(1, "a", ScopeKind::Local));
        let mark = scope.mark();
        scope.declare(entry(2, "b", ScopeKind::Local));
        assert!(scope.resolve("b").is_some());
        scope.truncate(mark);
        assert!(scope.resolve("b").is_none());
        assert!(scope.resolve("a").is_some());
    }

    #[test]
    fn unknown_name_is_not_found() {
        let scope = ScopeTable::new();
        assert!(scope.resolve("missing").is_none());
    }

    #[test]
    fn symbol_table_dedups_by_path_and_name() {
        let mut symbols = SymbolTable::new();
        symbols.register(Symbol {
            id: 1,
            name: "SafeMath".into(),
            absolute_path: "SafeMath.sol".into(),
        });
        symbols.register(Symbol {
            id: 9,
            name: "SafeMath".into(),
            absolute_path: "SafeMath.sol".into(),
        });
        assert_eq!(symbols.len(), 1);
        assert_eq!(symbols.resolve("SafeMath").unwrap().id, 1);
    }
}
