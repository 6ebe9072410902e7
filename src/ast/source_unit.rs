//! Per-file assembly.
//!
//! One `SourceUnit` per input file: pragmas and imports are built first and
//! offered to each following contract through the proximity heuristic,
//! import targets are resolved against units finished earlier in the build,
//! and the unit's exported-symbol set is its own name, its contracts, and
//! everything re-exported through resolved imports.

use pest::iterators::Pair;
use serde::Serialize;

use crate::ast::context::BuildContext;
use crate::ast::contracts::{parse_contract, DirectiveRef};
use crate::ast::ids::IdAllocator;
use crate::ast::node::{BaseContract, Comment, Contract, Import, Node, NodeType, Pragma};
use crate::ast::scope::{Symbol, SymbolTable};
use crate::ast::span::SourceSpan;
use crate::errors::SolastError;
use crate::sources::SourceFile;
use crate::syntax::Rule;

// ============================================================================
// SOURCE UNIT
// ============================================================================

/// The AST representation of one input file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceUnit {
    pub id: i64,
    pub node_type: NodeType,
    pub src: SourceSpan,
    /// Base file name without extension.
    pub name: String,
    pub absolute_path: String,
    pub exported_symbols: Vec<Symbol>,
    pub nodes: Vec<Node>,
}

impl SourceUnit {
    /// The unit's first contract definition, if any.
    pub fn contract(&self) -> Option<&Contract> {
        self.nodes.iter().find_map(|node| match node {
            Node::Contract(contract) => Some(contract),
            _ => None,
        })
    }

    /// Base contracts of the unit's contract; empty when there is none.
    pub fn base_contracts(&self) -> &[BaseContract] {
        self.contract()
            .map(|contract| contract.base_contracts.as_slice())
            .unwrap_or(&[])
    }

    /// True iff every contract in the unit is fully implemented.
    pub fn fully_implemented(&self) -> bool {
        self.nodes.iter().all(|node| match node {
            Node::Contract(contract) => contract.fully_implemented,
            _ => true,
        })
    }

    pub fn resolve_pending(&mut self, symbols: &SymbolTable) {
        for node in &mut self.nodes {
            node.resolve_pending(symbols);
        }
    }

    pub fn count_unresolved(&self) -> usize {
        self.nodes.iter().map(Node::count_unresolved).sum()
    }
}

// ============================================================================
// ASSEMBLY
// ============================================================================

/// Build one file into a source unit. `known` holds the units completed
/// earlier in this build, used for import resolution by base filename.
pub fn build_source_unit(
    ctx: &mut BuildContext,
    source: &SourceFile,
    unit_id: i64,
    known: &[SourceUnit],
) -> Result<SourceUnit, SolastError> {
    let parsed = crate::syntax::parse_source(&source.content, &ctx.source)?;
    let src = file_span(&source.content, 0);
    let name = file_stem(&source.path);

    let mut exported_symbols = vec![Symbol {
        id: unit_id,
        name: name.clone(),
        absolute_path: source.path.clone(),
    }];
    let mut nodes = Vec::new();
    let mut pragma_refs: Vec<DirectiveRef> = Vec::new();
    let mut import_refs: Vec<DirectiveRef> = Vec::new();

    for element in parsed.clone().into_inner() {
        match element.as_rule() {
            Rule::pragma_directive => {
                let pragma = parse_pragma(ctx, &element, unit_id);
                pragma_refs.push(DirectiveRef {
                    id: pragma.id,
                    line: pragma.src.line,
                    resolved_unit: 0,
                });
                nodes.push(Node::Pragma(pragma));
            }
            Rule::import_directive => {
                let import = parse_import(ctx, &element, unit_id, known);
                if import.source_unit != 0 {
                    // Re-export the target's symbols to this unit's importers.
                    if let Some(target) = known.iter().find(|u| u.id == import.source_unit) {
                        exported_symbols.extend(target.exported_symbols.iter().cloned());
                    }
                }
                import_refs.push(DirectiveRef {
                    id: import.id,
                    line: import.src.line,
                    resolved_unit: import.source_unit,
                });
                nodes.push(Node::Import(import));
            }
            Rule::contract_definition => {
                let contract =
                    parse_contract(ctx, &element, unit_id, &pragma_refs, &import_refs)?;
                exported_symbols.push(Symbol {
                    id: contract.id,
                    name: contract.name.clone(),
                    absolute_path: source.path.clone(),
                });
                nodes.push(Node::Contract(contract));
            }
            _ => {}
        }
    }

    Ok(SourceUnit {
        id: unit_id,
        node_type: NodeType::SourceUnit,
        src,
        name,
        absolute_path: source.path.clone(),
        exported_symbols,
        nodes,
    })
}

fn parse_pragma(ctx: &mut BuildContext, pair: &Pair<Rule>, unit_id: i64) -> Pragma {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, unit_id);
    let name = crate::syntax::find(pair, Rule::pragma_name)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    let value = crate::syntax::find(pair, Rule::pragma_value)
        .map(|p| p.as_str().trim().to_string())
        .unwrap_or_default();
    Pragma {
        id,
        node_type: NodeType::Pragma,
        src,
        name,
        value,
        text: pair.as_str().trim().to_string(),
    }
}

fn parse_import(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    unit_id: i64,
    known: &[SourceUnit],
) -> Import {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, unit_id);
    let file = crate::syntax::find(pair, Rule::string_literal)
        .map(|p| p.as_str().trim_matches('"').to_string())
        .unwrap_or_default();
    let symbol_aliases = crate::syntax::find(pair, Rule::import_symbol_list)
        .map(|list| {
            list.into_inner()
                .filter(|p| p.as_rule() == Rule::identifier)
                .map(|p| p.as_str().to_string())
                .collect()
        })
        .unwrap_or_default();
    let unit_alias = crate::syntax::find(pair, Rule::identifier)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    let source_unit = resolve_import_target(
        &file,
        known.iter().map(|unit| (unit.id, unit.absolute_path.as_str())),
    );

    Import {
        id,
        node_type: NodeType::Import,
        src,
        file,
        unit_alias,
        symbol_aliases,
        source_unit,
    }
}

/// Match an import path against `(unit id, absolute path)` candidates by
/// base filename.
pub fn resolve_import_target<'a>(
    file: &str,
    targets: impl IntoIterator<Item = (i64, &'a str)>,
) -> i64 {
    let wanted = base_name(file);
    if wanted.is_empty() {
        return 0;
    }
    targets
        .into_iter()
        .find(|(_, path)| base_name(path) == wanted)
        .map(|(id, _)| id)
        .unwrap_or(0)
}

fn base_name(path: &str) -> &str {
    path.rsplit(['/', '\\']).next().unwrap_or(path)
}

fn file_stem(path: &str) -> String {
    let base = base_name(path);
    base.strip_suffix(".sol").unwrap_or(base).to_string()
}

/// Span covering a whole file, parented to the root node.
pub fn file_span(content: &str, parent: i64) -> SourceSpan {
    let end = content.len().saturating_sub(1);
    SourceSpan {
        line: 1,
        column: 1,
        start: 0,
        end,
        length: end + 1,
        parent_index: parent,
    }
}

// ============================================================================
// COMMENT HARVEST
// ============================================================================

/// Scans a file's raw text for comments exactly once; the guard flag keeps
/// repeated calls from producing duplicates.
#[derive(Debug, Default)]
pub struct CommentHarvester {
    parsed: bool,
}

impl CommentHarvester {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn harvest(&mut self, ids: &IdAllocator, content: &str, unit_id: i64) -> Vec<Comment> {
        if self.parsed {
            return Vec::new();
        }
        self.parsed = true;

        let bytes = content.as_bytes();
        let mut comments = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            match bytes[i] {
                b'"' => i = skip_string(bytes, i),
                b'/' if bytes.get(i + 1) == Some(&b'/') => {
                    let end = content[i..]
                        .find('\n')
                        .map(|offset| i + offset)
                        .unwrap_or(bytes.len());
                    comments.push(make_comment(ids, content, i, end, unit_id));
                    i = end;
                }
                b'/' if bytes.get(i + 1) == Some(&b'*') => {
                    let end = content[i + 2..]
                        .find("*/")
                        .map(|offset| i + 2 + offset + 2)
                        .unwrap_or(bytes.len());
                    comments.push(make_comment(ids, content, i, end, unit_id));
                    i = end;
                }
                _ => i += 1,
            }
        }
        comments
    }
}

fn skip_string(bytes: &[u8], start: usize) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        match bytes[i] {
            b'\\' => i += 2,
            b'"' => return i + 1,
            _ => i += 1,
        }
    }
    i
}

fn make_comment(
    ids: &IdAllocator,
    content: &str,
    start: usize,
    end: usize,
    unit_id: i64,
) -> Comment {
    let text = content[start..end].trim_end().to_string();
    let (line, column) = line_col(content, start);
    let last = end.saturating_sub(1).max(start);
    let node_type = if text.contains("SPDX-License-Identifier:") {
        NodeType::LicenseComment
    } else {
        NodeType::Comment
    };
    Comment {
        id: ids.next_id(),
        node_type,
        src: SourceSpan {
            line,
            column,
            start,
            end: last,
            length: last - start + 1,
            parent_index: unit_id,
        },
        text,
    }
}

fn line_col(content: &str, offset: usize) -> (usize, usize) {
    let before = &content[..offset.min(content.len())];
    let line = before.bytes().filter(|b| *b == b'\n').count() + 1;
    let column = match before.rfind('\n') {
        Some(newline) => offset - newline,
        None => offset + 1,
    };
    (line, column)
}
