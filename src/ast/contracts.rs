//! Contract, interface, and library assembly.
//!
//! The contract builder iterates body elements in source order and
//! dispatches each to its builder; declarations become visible to later
//! members through the scope table. The fully-implemented flag starts true
//! and sticks at false once any function member lacks a body or the grammar
//! yields an empty body element.

use pest::iterators::Pair;

use crate::ast::context::BuildContext;
use crate::ast::declarations::{
    parse_enum, parse_error_definition, parse_event, parse_state_variable, parse_struct,
    parse_using_directive,
};
use crate::ast::functions::{parse_function, parse_modifier_definition};
use crate::ast::node::{BaseContract, Contract, ContractKind, FunctionKind, Node, NodeType};
use crate::ast::span::SourceSpan;
use crate::errors::{ErrorReporting, SolastError};
use crate::syntax::Rule;

/// A pragma or import already built for the current source unit, as seen by
/// the proximity attribution heuristic.
#[derive(Debug, Clone, Copy)]
pub struct DirectiveRef {
    pub id: i64,
    pub line: usize,
    /// For imports, the exporting source unit's ID once known; zero
    /// otherwise. Always zero for pragmas.
    pub resolved_unit: i64,
}

pub fn parse_contract(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    unit_id: i64,
    pragmas: &[DirectiveRef],
    imports: &[DirectiveRef],
) -> Result<Contract, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, unit_id);
    let mark = ctx.scope.mark();

    let kind = crate::syntax::find(pair, Rule::contract_kind)
        .map(|p| contract_kind(p.as_str()))
        .unwrap_or(ContractKind::Contract);
    let is_abstract = crate::syntax::find(pair, Rule::abstract_kw).is_some();
    let name = crate::syntax::find(pair, Rule::identifier)
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| ctx.missing_element("contract name", ctx.span_of(pair)))?;

    let mut base_contracts = Vec::new();
    if let Some(list) = crate::syntax::find(pair, Rule::inheritance_specifier_list) {
        for specifier in crate::syntax::find_all(&list, Rule::inheritance_specifier) {
            base_contracts.push(parse_base_contract(ctx, &specifier, id));
        }
    }

    let mut nodes = Vec::new();
    let mut fully_implemented = true;
    for element in pair.clone().into_inner() {
        let node = match element.as_rule() {
            Rule::using_directive => parse_using_directive(ctx, &element, id)?,
            Rule::struct_definition => parse_struct(ctx, &element, id)?,
            Rule::enum_definition => parse_enum(ctx, &element, id)?,
            Rule::event_definition => parse_event(ctx, &element, id)?,
            Rule::error_definition => parse_error_definition(ctx, &element, id)?,
            Rule::modifier_definition => parse_modifier_definition(ctx, &element, id)?,
            Rule::state_variable_declaration => parse_state_variable(ctx, &element, id)?,
            Rule::function_definition => {
                parse_function(ctx, &element, id, FunctionKind::Function)?
            }
            Rule::constructor_definition => {
                parse_function(ctx, &element, id, FunctionKind::Constructor)?
            }
            Rule::fallback_definition => {
                parse_function(ctx, &element, id, FunctionKind::Fallback)?
            }
            Rule::receive_definition => {
                parse_function(ctx, &element, id, FunctionKind::Receive)?
            }
            Rule::empty_body_element => {
                // Error-recovered stray semicolon: sticky incompleteness.
                fully_implemented = false;
                continue;
            }
            _ => continue,
        };
        if let Node::Function(function) = &node {
            if !function.implemented {
                fully_implemented = false;
            }
        }
        if let Node::Modifier(modifier) = &node {
            if !modifier.implemented {
                fully_implemented = false;
            }
        }
        nodes.push(node);
    }
    ctx.scope.truncate(mark);

    let contract_line = src.line;
    let attributed_pragmas = attribute(pragmas, contract_line, ctx.config.pragma_window);
    let attributed_imports = attribute(imports, contract_line, ctx.config.import_window);

    let mut linearized_base_contracts = vec![id];
    let mut contract_dependencies = Vec::new();
    let depend = |dependency: i64, linearized: &mut Vec<i64>, dependencies: &mut Vec<i64>| {
        if dependency != 0 && !linearized.contains(&dependency) {
            linearized.push(dependency);
            dependencies.push(dependency);
        }
    };
    for base in &base_contracts {
        depend(
            base.referenced_declaration,
            &mut linearized_base_contracts,
            &mut contract_dependencies,
        );
    }
    for import in &attributed_imports {
        depend(
            import.resolved_unit,
            &mut linearized_base_contracts,
            &mut contract_dependencies,
        );
    }

    Ok(Contract {
        id,
        node_type: kind.node_type(),
        src,
        name,
        kind,
        is_abstract,
        base_contracts,
        nodes,
        fully_implemented,
        pragmas: attributed_pragmas.iter().map(|d| d.id).collect(),
        linearized_base_contracts,
        contract_dependencies,
        scope: unit_id,
    })
}

fn parse_base_contract(ctx: &mut BuildContext, pair: &Pair<Rule>, contract_id: i64) -> BaseContract {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, contract_id);
    let name = crate::syntax::find(pair, Rule::identifier_path)
        .map(|p| p.as_str().trim().to_string())
        .unwrap_or_default();
    let referenced_declaration = ctx
        .resolve(&name)
        .map(|(declaration, _)| declaration)
        .unwrap_or(0);
    BaseContract {
        id,
        node_type: NodeType::BaseContract,
        src,
        name,
        referenced_declaration,
    }
}

/// Directives within `window` lines directly above the contract are
/// attributed to it; anything further away (or below) is dropped from the
/// association.
fn attribute(directives: &[DirectiveRef], contract_line: usize, window: usize) -> Vec<DirectiveRef> {
    directives
        .iter()
        .filter(|d| d.line <= contract_line && contract_line - d.line <= window)
        .copied()
        .collect()
}

fn contract_kind(text: &str) -> ContractKind {
    match text {
        "interface" => ContractKind::Interface,
        "library" => ContractKind::Library,
        _ => ContractKind::Contract,
    }
}
