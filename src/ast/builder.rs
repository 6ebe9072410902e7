//! Whole-build orchestration.
//!
//! One builder call turns a source set into a root node. Files are built
//! strictly sequentially against one shared ID allocator and one growing
//! symbol table, so node IDs are deterministic for a fixed input order. A
//! second resolution pass runs after every unit completes its first pass,
//! backfilling cross-file references the sequential pass could not see.

use serde::Serialize;

use crate::ast::context::{BuildContext, BuilderConfig};
use crate::ast::ids::IdAllocator;
use crate::ast::node::{Comment, Node, NodeType};
use crate::ast::scope::SymbolTable;
use crate::ast::source_unit::{
    build_source_unit, resolve_import_target, CommentHarvester, SourceUnit,
};
use crate::ast::span::SourceSpan;
use crate::errors::{SolastError, SourceContext};
use crate::sources::SourceSet;

// ============================================================================
// ROOT NODE
// ============================================================================

/// The finished tree: all source units, harvested comments, and the entry
/// unit pointer. Terminal once `AstBuilder::build` returns it.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RootNode {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    pub source_units: Vec<SourceUnit>,
    pub comments: Vec<Comment>,
    pub entry_source_unit: i64,
}

impl RootNode {
    pub fn source_units(&self) -> impl Iterator<Item = &SourceUnit> {
        self.source_units.iter()
    }

    pub fn source_unit_by_id(&self, id: i64) -> Option<&SourceUnit> {
        self.source_units.iter().find(|unit| unit.id == id)
    }

    /// Lookup by unit name or full path.
    pub fn source_unit_by_name(&self, name: &str) -> Option<&SourceUnit> {
        self.source_units
            .iter()
            .find(|unit| unit.name == name || unit.absolute_path == name)
    }

    pub fn comments(&self) -> &[Comment] {
        &self.comments
    }

    pub fn entry_source_unit(&self) -> i64 {
        self.entry_source_unit
    }

    pub fn set_entry_source_unit(&mut self, id: i64) {
        self.entry_source_unit = id;
    }

    /// Total count of references still unresolved after the second pass.
    pub fn unresolved_references(&self) -> usize {
        self.source_units.iter().map(SourceUnit::count_unresolved).sum()
    }
}

// ============================================================================
// BUILDER
// ============================================================================

#[derive(Debug, Default)]
pub struct AstBuilder {
    config: BuilderConfig,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: BuilderConfig) -> Self {
        Self { config }
    }

    /// Build the full tree for a source set. Fatal errors abort the whole
    /// build; unresolved references do not.
    pub fn build(&self, sources: &SourceSet) -> Result<RootNode, SolastError> {
        let ids = IdAllocator::new();
        let root_id = ids.next_id();
        let mut symbols = SymbolTable::new();
        let mut units: Vec<SourceUnit> = Vec::new();
        let mut comments = Vec::new();

        for file in sources.iter() {
            let unit_id = ids.next_id();
            let unit = {
                let context = SourceContext::from_file(&file.name, &file.content);
                let mut ctx =
                    BuildContext::new(&ids, &self.config, &symbols, context, unit_id);
                build_source_unit(&mut ctx, file, unit_id, &units)?
            };
            let mut harvester = CommentHarvester::new();
            comments.extend(harvester.harvest(&ids, &file.content, unit_id));
            for symbol in &unit.exported_symbols {
                symbols.register(symbol.clone());
            }
            units.push(unit);
        }

        // Second pass: the full symbol table is now known.
        let index: Vec<(i64, String)> = units
            .iter()
            .map(|unit| (unit.id, unit.absolute_path.clone()))
            .collect();
        for unit in &mut units {
            backfill_imports(unit, &index);
            unit.resolve_pending(&symbols);
        }

        let entry_source_unit = entry_unit(&units, sources.entry());
        Ok(RootNode {
            id: root_id,
            node_type: NodeType::Root,
            src: root_span(),
            source_units: units,
            comments,
            entry_source_unit,
        })
    }
}

fn backfill_imports(unit: &mut SourceUnit, index: &[(i64, String)]) {
    let unit_id = unit.id;
    for node in &mut unit.nodes {
        if let Node::Import(import) = node {
            if import.source_unit == 0 {
                // A file never imports itself.
                import.source_unit = resolve_import_target(
                    &import.file,
                    index
                        .iter()
                        .filter(|(id, _)| *id != unit_id)
                        .map(|(id, path)| (*id, path.as_str())),
                );
            }
        }
    }
}

fn entry_unit(units: &[SourceUnit], entry: Option<&str>) -> i64 {
    if let Some(name) = entry {
        if let Some(unit) = units
            .iter()
            .find(|u| u.name == name || u.absolute_path == name || has_contract(u, name))
        {
            return unit.id;
        }
    }
    units.first().map(|u| u.id).unwrap_or(0)
}

fn has_contract(unit: &SourceUnit, name: &str) -> bool {
    unit.nodes.iter().any(|node| match node {
        Node::Contract(contract) => contract.name == name,
        _ => false,
    })
}

/// The synthetic root's span: zero-width, parented to itself.
fn root_span() -> SourceSpan {
    SourceSpan {
        line: 1,
        column: 1,
        start: 0,
        end: 0,
        length: 1,
        parent_index: 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::SourceFile;

    fn single(source: &str) -> RootNode {
        let mut set = SourceSet::new();
        set.push(SourceFile::new("Main.sol", "Main.sol", source));
        AstBuilder::new().build(&set).unwrap()
    }

    #[test]
    fn empty_source_set_yields_empty_root() {
        let root = AstBuilder::new().build(&SourceSet::new()).unwrap();
        assert_eq!(root.id, 0);
        assert!(root.source_units.is_empty());
        assert_eq!(root.entry_source_unit, 0);
    }

    #[test]
    fn root_and_unit_ids_are_deterministic() {
        let first = single("contract Empty {}");
        let second = single("contract Empty {}");
        assert_eq!(first.id, 0);
        assert_eq!(first.source_units[0].id, 1);
        assert_eq!(first.source_units[0].nodes[0].id(), 2);
        assert_eq!(first, second);
    }

    #[test]
    fn comments_are_harvested_onto_the_root() {
        let root = single("// SPDX-License-Identifier: MIT\ncontract C {}");
        assert_eq!(root.comments.len(), 1);
        assert_eq!(root.comments[0].node_type, NodeType::LicenseComment);
        assert_eq!(root.comments[0].src.parent_index, 1);
    }

    #[test]
    fn entry_matches_contract_name() {
        let mut set = SourceSet::new().with_entry("Token");
        set.push(SourceFile::new("A.sol", "A.sol", "library SafeMath {}"));
        set.push(SourceFile::new(
            "B.sol",
            "B.sol",
            "import \"./A.sol\";\ncontract Token {}",
        ));
        let root = AstBuilder::new().build(&set).unwrap();
        let entry = root.source_unit_by_id(root.entry_source_unit()).unwrap();
        assert_eq!(entry.name, "B");
    }
}
