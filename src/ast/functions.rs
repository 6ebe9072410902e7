//! Function-family builders: functions, constructors, fallback/receive, and
//! modifiers.
//!
//! Attribute defaults follow Solidity's own: internal visibility, nonpayable
//! mutability. A function without a block (interface-style declaration) gets
//! a synthetic empty body and reports `implemented == false`, which the
//! contract builder folds into its fully-implemented status.

use pest::iterators::Pair;

use crate::ast::context::BuildContext;
use crate::ast::declarations::{
    empty_parameter_list, parse_mutability, parse_parameter_list, parse_visibility,
};
use crate::ast::expressions::parse_call_arguments;
use crate::ast::node::{
    Function, FunctionKind, ModifierDefinition, ModifierInvocation, Mutability, Node, NodeType,
    OverridePath, ParameterList, Visibility,
};
use crate::ast::scope::{ScopeEntry, ScopeKind};
use crate::ast::span::SourceSpan;
use crate::ast::statements::{absent_body, parse_block};
use crate::ast::types::modifier_description;
use crate::errors::SolastError;
use crate::syntax::Rule;

// ============================================================================
// FUNCTIONS
// ============================================================================

/// Build one of `function_definition`, `constructor_definition`,
/// `fallback_definition`, `receive_definition` into a function node.
pub fn parse_function(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    contract_id: i64,
    kind: FunctionKind,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, contract_id);
    let mark = ctx.scope.mark();

    let mut name = String::new();
    let mut visibility = Visibility::Internal;
    let mut state_mutability = Mutability::Nonpayable;
    let mut is_virtual = false;
    let mut overrides = Vec::new();
    let mut modifiers = Vec::new();
    let mut parameters = None;
    let mut return_parameters = None;
    let mut body = None;

    for part in pair.clone().into_inner() {
        match part.as_rule() {
            Rule::identifier => name = part.as_str().to_string(),
            Rule::parameter_list => {
                parameters = Some(parse_parameter_list(
                    ctx,
                    &part,
                    id,
                    id,
                    Some(ScopeKind::Parameter),
                )?);
            }
            Rule::visibility => visibility = parse_visibility(part.as_str()),
            Rule::state_mutability => state_mutability = parse_mutability(part.as_str()),
            Rule::virtual_kw => is_virtual = true,
            Rule::override_specifier => overrides.extend(parse_overrides(ctx, &part)),
            Rule::modifier_invocation => modifiers.push(parse_modifier_invocation(ctx, &part, id)?),
            Rule::returns_declaration => {
                if let Some(list) = crate::syntax::find(&part, Rule::parameter_list) {
                    return_parameters = Some(parse_parameter_list(
                        ctx,
                        &list,
                        id,
                        id,
                        Some(ScopeKind::Parameter),
                    )?);
                }
            }
            Rule::block => body = Some(parse_block(ctx, &part, id, NodeType::Block)?),
            _ => {}
        }
    }
    ctx.scope.truncate(mark);

    let parameters = parameters.unwrap_or_else(|| empty_parameter_list(ctx, &src, id));
    let return_parameters = return_parameters.unwrap_or_else(|| empty_parameter_list(ctx, &src, id));
    let body = body.unwrap_or_else(|| absent_body(ctx, &src, id));
    let implemented = body.implemented;

    Ok(Node::Function(Function {
        id,
        node_type: kind.node_type(),
        src,
        kind,
        name,
        visibility,
        state_mutability,
        is_virtual,
        overrides,
        modifiers,
        parameters,
        return_parameters,
        body,
        implemented,
        scope: contract_id,
    }))
}

// ============================================================================
// MODIFIERS
// ============================================================================

pub fn parse_modifier_definition(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    contract_id: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, contract_id);

    let name = crate::syntax::find(pair, Rule::identifier)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    // Visible to functions built after it in the same contract.
    if !name.is_empty() {
        ctx.scope.declare(ScopeEntry {
            id,
            name: name.clone(),
            kind: ScopeKind::Modifier,
            type_description: Some(modifier_description(&name)),
        });
    }

    let mark = ctx.scope.mark();
    let parameters = match crate::syntax::find(pair, Rule::parameter_list) {
        Some(list) => parse_parameter_list(ctx, &list, id, id, Some(ScopeKind::ModifierParameter))?,
        None => empty_parameter_list(ctx, &src, id),
    };
    let is_virtual = crate::syntax::find(pair, Rule::virtual_kw).is_some();
    let body = match crate::syntax::find(pair, Rule::block) {
        Some(block) => parse_block(ctx, &block, id, NodeType::Block)?,
        None => absent_body(ctx, &src, id),
    };
    ctx.scope.truncate(mark);
    let implemented = body.implemented;

    Ok(Node::Modifier(ModifierDefinition {
        id,
        node_type: NodeType::Modifier,
        src,
        name,
        is_virtual,
        parameters,
        body,
        implemented,
    }))
}

fn parse_modifier_invocation(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    function_id: i64,
) -> Result<ModifierInvocation, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, function_id);
    let name = crate::syntax::find(pair, Rule::identifier_path)
        .map(|p| p.as_str().trim().to_string())
        .unwrap_or_default();
    let referenced_declaration = ctx
        .resolve(&name)
        .map(|(declaration, _)| declaration)
        .unwrap_or(0);
    let arguments = match crate::syntax::find(pair, Rule::call_argument_list) {
        Some(list) => parse_call_arguments(ctx, &list, id)?,
        None => Vec::new(),
    };
    Ok(ModifierInvocation {
        id,
        node_type: NodeType::ModifierInvocation,
        src,
        name,
        referenced_declaration,
        arguments,
    })
}

fn parse_overrides(ctx: &BuildContext, pair: &Pair<Rule>) -> Vec<OverridePath> {
    crate::syntax::find_all(pair, Rule::identifier_path)
        .into_iter()
        .map(|path| {
            let name = path.as_str().trim().to_string();
            let referenced_declaration = ctx
                .resolve(&name)
                .map(|(declaration, _)| declaration)
                .unwrap_or(0);
            OverridePath {
                name,
                referenced_declaration,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::context::{BuildContext, BuilderConfig};
    use crate::ast::ids::IdAllocator;
    use crate::ast::scope::SymbolTable;
    use crate::errors::SourceContext;
    use crate::syntax::parse_source;

    fn build(source: &str, run: impl FnOnce(&mut BuildContext, &Pair<Rule>)) {
        let context = SourceContext::from_file("t.sol", source);
        let owned = source.to_string();
        let unit = parse_source(&owned, &context).unwrap();
        let ids = IdAllocator::new();
        let config = BuilderConfig::default();
        let symbols = SymbolTable::new();
        let mut ctx = BuildContext::new(&ids, &config, &symbols, context, 1);
        let contract = crate::syntax::find(&unit, Rule::contract_definition).unwrap();
        run(&mut ctx, &contract)
    }

    fn as_function(node: Node) -> Function {
        match node {
            Node::Function(function) => function,
            other => panic!("expected function, got {other:?}"),
        }
    }

    #[test]
    fn declaration_without_body_is_unimplemented() {
        build(
            "interface I { function total() external view returns (uint); }",
            |ctx, contract| {
                let definition =
                    crate::syntax::find(contract, Rule::function_definition).unwrap();
                let function =
                    as_function(parse_function(ctx, &definition, 2, FunctionKind::Function).unwrap());
                assert!(!function.implemented);
                assert_eq!(function.visibility, Visibility::External);
                assert_eq!(function.state_mutability, Mutability::View);
                assert_eq!(function.return_parameters.parameters.len(), 1);
            },
        );
    }

    #[test]
    fn defaults_are_internal_nonpayable() {
        build(
            "contract C { function f() { f(); } }",
            |ctx, contract| {
                let definition =
                    crate::syntax::find(contract, Rule::function_definition).unwrap();
                let function =
                    as_function(parse_function(ctx, &definition, 2, FunctionKind::Function).unwrap());
                assert_eq!(function.visibility, Visibility::Internal);
                assert_eq!(function.state_mutability, Mutability::Nonpayable);
                assert!(function.implemented);
            },
        );
    }

    #[test]
    fn parameters_resolve_inside_body_and_pop_after() {
        build(
            "contract C { function f(uint amount) public { amount += 1; } }",
            |ctx, contract| {
                let definition =
                    crate::syntax::find(contract, Rule::function_definition).unwrap();
                let function =
                    as_function(parse_function(ctx, &definition, 2, FunctionKind::Function).unwrap());
                assert_eq!(function.parameters.parameters.len(), 1);
                assert!(ctx.scope.resolve("amount").is_none());
            },
        );
    }

    #[test]
    fn modifier_invocation_arguments_are_parsed() {
        build(
            "contract C { modifier bound(uint limit) { } function f() public bound(2) { } }",
            |ctx, contract| {
                let modifier =
                    crate::syntax::find(contract, Rule::modifier_definition).unwrap();
                let modifier_node = parse_modifier_definition(ctx, &modifier, 2).unwrap();
                let definition =
                    crate::syntax::find(contract, Rule::function_definition).unwrap();
                let function =
                    as_function(parse_function(ctx, &definition, 2, FunctionKind::Function).unwrap());
                assert_eq!(function.modifiers.len(), 1);
                let invocation = &function.modifiers[0];
                assert_eq!(invocation.name, "bound");
                assert_eq!(invocation.referenced_declaration, modifier_node.id());
                assert_eq!(invocation.arguments.len(), 1);
            },
        );
    }

    #[test]
    fn virtual_and_override_are_captured() {
        build(
            "contract C { function f() public virtual override(Base) { f(); } }",
            |ctx, contract| {
                let definition =
                    crate::syntax::find(contract, Rule::function_definition).unwrap();
                let function =
                    as_function(parse_function(ctx, &definition, 2, FunctionKind::Function).unwrap());
                assert!(function.is_virtual);
                assert_eq!(function.overrides.len(), 1);
                assert_eq!(function.overrides[0].name, "Base");
                assert_eq!(function.overrides[0].referenced_declaration, 0);
            },
        );
    }
}
