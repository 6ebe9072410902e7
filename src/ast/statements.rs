//! Statement and body builders.
//!
//! A body is an ordered statement sequence behind a scope mark: locals
//! declared inside become invisible again when the block closes. Unchecked
//! blocks are structurally identical bodies with a distinct tag.

use pest::iterators::Pair;

use crate::ast::context::BuildContext;
use crate::ast::declarations::{parse_parameter, parse_parameter_list};
use crate::ast::expressions::parse_expression;
use crate::ast::node::{
    Body, CatchClause, EmitStatement, ExpressionStatement, ForStatement, IfStatement,
    JumpStatement, Node, NodeType, RevertStatement, ReturnStatement, StorageLocation,
    TryStatement, VariableDeclarationStatement, WhileStatement,
};
use crate::ast::scope::ScopeKind;
use crate::ast::span::SourceSpan;
use crate::errors::{ErrorReporting, SolastError};
use crate::syntax::Rule;

// ============================================================================
// BODIES
// ============================================================================

/// Build a `block` production into a body. `tag` distinguishes plain blocks
/// from unchecked regions; a body with no statements reports
/// `implemented == false`, which propagates to its owner.
pub fn parse_block(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
    tag: NodeType,
) -> Result<Body, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let mark = ctx.scope.mark();
    let mut statements = Vec::new();
    for statement in pair.clone().into_inner() {
        statements.push(parse_statement(ctx, &statement, id)?);
    }
    ctx.scope.truncate(mark);
    Ok(Body {
        id,
        node_type: tag,
        src,
        implemented: !statements.is_empty(),
        statements,
    })
}

/// Synthetic empty body for declaration-only functions (`function f();`).
pub fn absent_body(ctx: &BuildContext, owner_span: &SourceSpan, owner: i64) -> Body {
    Body {
        id: ctx.next_id(),
        node_type: NodeType::Block,
        src: SourceSpan::synthetic(owner_span, owner),
        statements: Vec::new(),
        implemented: false,
    }
}

// ============================================================================
// STATEMENTS
// ============================================================================

pub fn parse_statement(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    match pair.as_rule() {
        Rule::block => Ok(Node::Body(parse_block(ctx, pair, parent, NodeType::Block)?)),
        Rule::unchecked_block => {
            let inner = pair
                .clone()
                .into_inner()
                .next()
                .ok_or_else(|| ctx.missing_element("unchecked block body", ctx.span_of(pair)))?;
            Ok(Node::Body(parse_block(
                ctx,
                &inner,
                parent,
                NodeType::UncheckedBlock,
            )?))
        }
        Rule::if_statement => parse_if(ctx, pair, parent),
        Rule::while_statement => parse_while(ctx, pair, parent),
        Rule::for_statement => parse_for(ctx, pair, parent),
        Rule::try_statement => parse_try(ctx, pair, parent),
        Rule::return_statement => {
            let id = ctx.next_id();
            let src = SourceSpan::from_pair(pair, parent);
            let expression = match pair.clone().into_inner().next() {
                Some(inner) => Some(Box::new(parse_expression(ctx, &inner, id)?)),
                None => None,
            };
            Ok(Node::Return(ReturnStatement {
                id,
                node_type: NodeType::Return,
                src,
                expression,
            }))
        }
        Rule::break_statement => Ok(Node::Break(JumpStatement {
            id: ctx.next_id(),
            node_type: NodeType::Break,
            src: SourceSpan::from_pair(pair, parent),
        })),
        Rule::continue_statement => Ok(Node::Continue(JumpStatement {
            id: ctx.next_id(),
            node_type: NodeType::Continue,
            src: SourceSpan::from_pair(pair, parent),
        })),
        Rule::emit_statement => {
            let id = ctx.next_id();
            let src = SourceSpan::from_pair(pair, parent);
            let inner = pair
                .clone()
                .into_inner()
                .next()
                .ok_or_else(|| ctx.missing_element("emitted event call", ctx.span_of(pair)))?;
            let expression = Box::new(parse_expression(ctx, &inner, id)?);
            Ok(Node::Emit(EmitStatement {
                id,
                node_type: NodeType::Emit,
                src,
                expression,
            }))
        }
        Rule::revert_statement => {
            let id = ctx.next_id();
            let src = SourceSpan::from_pair(pair, parent);
            let expression = match pair.clone().into_inner().next() {
                Some(inner) => Some(Box::new(parse_expression(ctx, &inner, id)?)),
                None => None,
            };
            Ok(Node::Revert(RevertStatement {
                id,
                node_type: NodeType::Revert,
                src,
                expression,
            }))
        }
        Rule::variable_declaration_statement => parse_variable_declaration(ctx, pair, parent),
        Rule::expression_statement => {
            let id = ctx.next_id();
            let src = SourceSpan::from_pair(pair, parent);
            let inner = pair
                .clone()
                .into_inner()
                .next()
                .ok_or_else(|| ctx.missing_element("statement expression", ctx.span_of(pair)))?;
            let expression = Box::new(parse_expression(ctx, &inner, id)?);
            Ok(Node::ExpressionStatement(ExpressionStatement {
                id,
                node_type: NodeType::ExpressionStatement,
                src,
                expression,
            }))
        }
        other => Err(ctx.unsupported_production(&format!("{other:?}"), ctx.span_of(pair))),
    }
}

// ============================================================================
// CONTROL FLOW
// ============================================================================

fn parse_if(ctx: &mut BuildContext, pair: &Pair<Rule>, parent: i64) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let inner: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
    let condition = inner
        .first()
        .ok_or_else(|| ctx.missing_element("if condition", ctx.span_of(pair)))?;
    let true_pair = inner
        .get(1)
        .ok_or_else(|| ctx.missing_element("if body", ctx.span_of(pair)))?;

    let condition = Box::new(parse_expression(ctx, condition, id)?);
    let true_body = Box::new(parse_statement(ctx, true_pair, id)?);
    let false_body = match inner.get(2) {
        Some(else_pair) => Some(Box::new(parse_statement(ctx, else_pair, id)?)),
        None => None,
    };

    Ok(Node::If(IfStatement {
        id,
        node_type: NodeType::If,
        src,
        condition,
        true_body,
        false_body,
    }))
}

fn parse_while(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let inner: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
    let condition = inner
        .first()
        .ok_or_else(|| ctx.missing_element("while condition", ctx.span_of(pair)))?;
    let body_pair = inner
        .get(1)
        .ok_or_else(|| ctx.missing_element("while body", ctx.span_of(pair)))?;

    let condition = Box::new(parse_expression(ctx, condition, id)?);
    let body = Box::new(parse_statement(ctx, body_pair, id)?);
    Ok(Node::While(WhileStatement {
        id,
        node_type: NodeType::While,
        src,
        condition,
        body,
    }))
}

fn parse_for(ctx: &mut BuildContext, pair: &Pair<Rule>, parent: i64) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    // Loop-header locals stay visible through the body, then pop.
    let mark = ctx.scope.mark();

    let mut initialiser = None;
    let mut condition = None;
    let mut loop_expression = None;
    let mut body = None;

    for part in pair.clone().into_inner() {
        match part.as_rule() {
            Rule::for_init => {
                if let Some(inner) = part.clone().into_inner().next() {
                    initialiser = Some(Box::new(parse_statement(ctx, &inner, id)?));
                }
            }
            Rule::for_condition => {
                if let Some(inner) = part.clone().into_inner().next() {
                    condition = Some(Box::new(parse_expression(ctx, &inner, id)?));
                }
            }
            Rule::for_update => {
                if let Some(inner) = part.clone().into_inner().next() {
                    loop_expression = Some(Box::new(parse_expression(ctx, &inner, id)?));
                }
            }
            _ => body = Some(Box::new(parse_statement(ctx, &part, id)?)),
        }
    }

    ctx.scope.truncate(mark);
    let body = body.ok_or_else(|| ctx.missing_element("for body", ctx.span_of(pair)))?;
    Ok(Node::For(ForStatement {
        id,
        node_type: NodeType::For,
        src,
        initialiser,
        condition,
        loop_expression,
        body,
    }))
}

fn parse_try(ctx: &mut BuildContext, pair: &Pair<Rule>, parent: i64) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let mut expression = None;
    let mut return_parameters = None;
    let mut body = None;
    let mut clauses = Vec::new();
    let mark = ctx.scope.mark();

    for part in pair.clone().into_inner() {
        match part.as_rule() {
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
            Rule::block => {
                body = Some(parse_block(ctx, &part, id, NodeType::Block)?);
            }
            Rule::catch_clause => clauses.push(parse_catch(ctx, &part, id)?),
            _ => expression = Some(Box::new(parse_expression(ctx, &part, id)?)),
        }
    }
    ctx.scope.truncate(mark);

    let expression =
        expression.ok_or_else(|| ctx.missing_element("tried expression", ctx.span_of(pair)))?;
    let body = body.ok_or_else(|| ctx.missing_element("try body", ctx.span_of(pair)))?;
    Ok(Node::Try(TryStatement {
        id,
        node_type: NodeType::Try,
        src,
        expression,
        return_parameters,
        body,
        clauses,
    }))
}

fn parse_catch(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<CatchClause, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let mark = ctx.scope.mark();
    let error_name = crate::syntax::find(pair, Rule::identifier)
        .map(|p| p.as_str().to_string())
        .unwrap_or_default();
    let parameters = match crate::syntax::find(pair, Rule::parameter_list) {
        Some(list) => Some(parse_parameter_list(
            ctx,
            &list,
            id,
            id,
            Some(ScopeKind::Parameter),
        )?),
        None => None,
    };
    let block = crate::syntax::find(pair, Rule::block)
        .ok_or_else(|| ctx.missing_element("catch body", ctx.span_of(pair)))?;
    let body = parse_block(ctx, &block, id, NodeType::Block)?;
    ctx.scope.truncate(mark);

    Ok(CatchClause {
        id,
        node_type: NodeType::Catch,
        src,
        error_name,
        parameters,
        body,
    })
}

// ============================================================================
// LOCAL DECLARATIONS
// ============================================================================

fn parse_variable_declaration(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let mut declarations = Vec::new();
    let mut initial_value = None;

    for part in pair.clone().into_inner() {
        match part.as_rule() {
            Rule::variable_declaration => declarations.push(parse_parameter(
                ctx,
                &part,
                id,
                id,
                Some(ScopeKind::Local),
                StorageLocation::Memory,
            )?),
            _ => initial_value = Some(Box::new(parse_expression(ctx, &part, id)?)),
        }
    }

    Ok(Node::VariableDeclaration(VariableDeclarationStatement {
        id,
        node_type: NodeType::VariableDeclarationStatement,
        src,
        declarations,
        initial_value,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::context::{BuildContext, BuilderConfig};
    use crate::ast::ids::IdAllocator;
    use crate::ast::scope::SymbolTable;
    use crate::errors::SourceContext;
    use crate::syntax::parse_source;

    fn body_of(source: &str, run: impl FnOnce(&mut BuildContext, Body)) {
        let file = format!("contract T {{ function f() public {{ {} }} }}", source);
        let context = SourceContext::from_file("t.sol", &file);
        let unit = parse_source(&file, &context).unwrap();
        let ids = IdAllocator::new();
        let config = BuilderConfig::default();
        let symbols = SymbolTable::new();
        let mut ctx = BuildContext::new(&ids, &config, &symbols, context, 1);

        let contract = crate::syntax::find(&unit, Rule::contract_definition).unwrap();
        let function = crate::syntax::find(&contract, Rule::function_definition).unwrap();
        let block = crate::syntax::find(&function, Rule::block).unwrap();
        let body = parse_block(&mut ctx, &block, 0, NodeType::Block).unwrap();
        run(&mut ctx, body)
    }

    #[test]
    fn empty_block_is_not_implemented() {
        body_of("", |_, body| {
            assert!(body.statements.is_empty());
            assert!(!body.implemented);
        });
    }

    #[test]
    fn local_declaration_resolves_for_later_statements() {
        body_of("uint amount = 3; amount += 1;", |_, body| {
            assert_eq!(body.statements.len(), 2);
            let increment = &body.statements[1];
            match increment {
                Node::ExpressionStatement(statement) => match statement.expression.as_ref() {
                    Node::BinaryOperation(op) => match op.left.as_ref() {
                        Node::Identifier(identifier) => {
                            assert_ne!(identifier.referenced_declaration, 0);
                        }
                        other => panic!("expected identifier, got {other:?}"),
                    },
                    other => panic!("expected binary operation, got {other:?}"),
                },
                other => panic!("expected expression statement, got {other:?}"),
            }
        });
    }

    #[test]
    fn block_scope_pops_after_close() {
        body_of("{ uint inner = 1; } ", |ctx, _| {
            assert!(ctx.scope.resolve("inner").is_none());
        });
    }

    #[test]
    fn unchecked_block_keeps_distinct_tag() {
        body_of("unchecked { }", |_, body| {
            match &body.statements[0] {
                Node::Body(inner) => assert_eq!(inner.node_type, NodeType::UncheckedBlock),
                other => panic!("expected body, got {other:?}"),
            }
        });
    }

    #[test]
    fn for_loop_locals_do_not_escape() {
        body_of("for (uint i = 0; i < 3; i++) { }", |ctx, body| {
            assert_eq!(body.statements.len(), 1);
            assert!(ctx.scope.resolve("i").is_none());
        });
    }

    #[test]
    fn if_else_builds_both_branches() {
        body_of("if (true) { } else { }", |_, body| match &body.statements[0] {
            Node::If(statement) => {
                assert!(statement.false_body.is_some());
            }
            other => panic!("expected if, got {other:?}"),
        });
    }
}
