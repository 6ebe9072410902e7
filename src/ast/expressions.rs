//! Expression builder.
//!
//! Recursive-descent dispatch over the expression precedence ladder. Chain
//! productions with a single operand splice straight through to the next
//! level; chains with operators fold left-associatively into nested binary
//! operations, parent IDs assigned before children so every child span can
//! name its owner.
//!
//! Resolution is best-effort: identifiers that resolve get their declaring
//! node's ID and type, identifiers that don't are emitted with a zero
//! reference. The one fatal condition is an order comparison with other
//! than two operands, which can only mean the grammar and the builder have
//! drifted apart.

use pest::iterators::Pair;

use crate::ast::context::BuildContext;
use crate::ast::declarations::parse_type_name;
use crate::ast::node::{
    BinaryOperation, FunctionCall, Identifier, IndexAccess, InlineArray, Literal, LiteralKind,
    MemberAccess, NewExpression, Node, NodeType, OperatorCategory, TupleExpression,
    UnaryOperation,
};
use crate::ast::span::SourceSpan;
use crate::ast::types::{
    inline_array_description, normalize_type_name, ElementType, TypeDescription,
};
use crate::errors::{ErrorReporting, SolastError};
use crate::syntax::Rule;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Build one expression node from any production of the expression ladder.
pub fn parse_expression(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    match pair.as_rule() {
        Rule::assignment => parse_assignment(ctx, pair, parent),
        Rule::logical_or
        | Rule::logical_and
        | Rule::equality
        | Rule::comparison
        | Rule::bit_or
        | Rule::bit_xor
        | Rule::bit_and
        | Rule::shift
        | Rule::additive
        | Rule::multiplicative
        | Rule::exponent => parse_binary_chain(ctx, pair, parent),
        Rule::unary => parse_unary(ctx, pair, parent),
        Rule::postfix_expression => parse_postfix(ctx, pair, parent),
        Rule::identifier => Ok(parse_identifier(ctx, pair, parent)),
        Rule::string_literal => Ok(parse_string_literal(ctx, pair, parent)),
        Rule::number_literal => Ok(parse_number_literal(ctx, pair, parent)),
        Rule::hex_number => Ok(parse_hex_number(ctx, pair, parent)),
        Rule::boolean_literal => Ok(parse_boolean_literal(ctx, pair, parent)),
        Rule::elementary_type_expression => Ok(parse_elementary_cast(ctx, pair, parent)),
        Rule::new_expression => parse_new(ctx, pair, parent),
        Rule::tuple_expression => parse_tuple(ctx, pair, parent),
        Rule::inline_array_expression => parse_inline_array(ctx, pair, parent),
        other => Err(ctx.unsupported_production(&format!("{other:?}"), ctx.span_of(pair))),
    }
}

/// Build the expressions of a `call_argument_list` production.
pub fn parse_call_arguments(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Vec<Node>, SolastError> {
    pair.clone()
        .into_inner()
        .map(|argument| parse_expression(ctx, &argument, parent))
        .collect()
}

// ============================================================================
// BINARY OPERATIONS
// ============================================================================

fn parse_assignment(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let inner: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
    match inner.len() {
        1 => parse_expression(ctx, &inner[0], parent),
        3 => {
            let id = ctx.next_id();
            let src = SourceSpan::from_pair(pair, parent);
            let left = parse_expression(ctx, &inner[0], id)?;
            let right = parse_expression(ctx, &inner[2], id)?;
            let type_description = left.type_description().cloned();
            Ok(Node::BinaryOperation(BinaryOperation {
                id,
                node_type: NodeType::BinaryOperation,
                src,
                operator: inner[1].as_str().to_string(),
                category: OperatorCategory::Assignment,
                left: Box::new(left),
                right: Box::new(right),
                type_description,
            }))
        }
        count => Err(ctx.operand_arity("=", 2, count.saturating_sub(1), ctx.span_of(pair))),
    }
}

fn parse_binary_chain(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let items: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
    if items.len() == 1 {
        return parse_expression(ctx, &items[0], parent);
    }

    let category = operator_category(pair.as_rule());
    let operand_count = items.len() / 2 + 1;
    if category == OperatorCategory::OrderComparison && operand_count != 2 {
        let operator = items[1].as_str().to_string();
        return Err(ctx.operand_arity(&operator, 2, operand_count, ctx.span_of(pair)));
    }

    fold_chain(ctx, &items, items.len() - 1, parent, category)
}

/// Left-associative fold over `[operand, op, operand, op, operand, ...]`,
/// recursing on everything left of the last operator.
fn fold_chain(
    ctx: &mut BuildContext,
    items: &[Pair<Rule>],
    last_operand: usize,
    parent: i64,
    category: OperatorCategory,
) -> Result<Node, SolastError> {
    if last_operand == 0 {
        return parse_expression(ctx, &items[0], parent);
    }

    let id = ctx.next_id();
    let src = merged_span(&items[0], &items[last_operand], parent);
    let operator = items[last_operand - 1].as_str().to_string();
    let left = fold_chain(ctx, items, last_operand - 2, id, category)?;
    let right = parse_expression(ctx, &items[last_operand], id)?;

    let type_description = match category {
        OperatorCategory::Logical | OperatorCategory::Equality | OperatorCategory::OrderComparison => {
            normalize_type_name("bool").ok()
        }
        _ => left.type_description().cloned(),
    };

    Ok(Node::BinaryOperation(BinaryOperation {
        id,
        node_type: NodeType::BinaryOperation,
        src,
        operator,
        category,
        left: Box::new(left),
        right: Box::new(right),
        type_description,
    }))
}

fn operator_category(rule: Rule) -> OperatorCategory {
    match rule {
        Rule::logical_or | Rule::logical_and => OperatorCategory::Logical,
        Rule::equality => OperatorCategory::Equality,
        Rule::comparison => OperatorCategory::OrderComparison,
        Rule::bit_or | Rule::bit_xor | Rule::bit_and => OperatorCategory::Bitwise,
        Rule::shift => OperatorCategory::Shift,
        _ => OperatorCategory::Arithmetic,
    }
}

/// Span from the first to the last of a run of sibling productions.
fn merged_span(first: &Pair<Rule>, last: &Pair<Rule>, parent: i64) -> SourceSpan {
    let mut span = SourceSpan::from_pair(first, parent);
    let end = last.as_span().end();
    if end > span.start {
        span.end = end - 1;
        span.length = span.end - span.start + 1;
    }
    span
}

// ============================================================================
// UNARY AND POSTFIX
// ============================================================================

fn parse_unary(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let inner: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
    if inner.len() == 1 {
        return parse_expression(ctx, &inner[0], parent);
    }

    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let operator = inner[0].as_str().to_string();
    let sub_expression = parse_expression(ctx, &inner[1], id)?;
    let type_description = match operator.as_str() {
        "!" => normalize_type_name("bool").ok(),
        "delete" => None,
        _ => sub_expression.type_description().cloned(),
    };

    Ok(Node::UnaryOperation(UnaryOperation {
        id,
        node_type: NodeType::UnaryOperation,
        src,
        operator,
        prefix: true,
        sub_expression: Box::new(sub_expression),
        type_description,
    }))
}

fn parse_postfix(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let items: Vec<Pair<Rule>> = pair.clone().into_inner().collect();
    fold_postfix(ctx, &items, items.len() - 1, parent)
}

/// Postfix operators nest outermost-last: `a.b(c)` is a call whose callee is
/// a member access. Recursion peels operators off the right.
fn fold_postfix(
    ctx: &mut BuildContext,
    items: &[Pair<Rule>],
    last: usize,
    parent: i64,
) -> Result<Node, SolastError> {
    if last == 0 {
        return parse_expression(ctx, &items[0], parent);
    }

    let op = &items[last];
    match op.as_rule() {
        Rule::call_argument_list => {
            let id = ctx.next_id();
            let src = merged_span(&items[0], op, parent);
            let expression = fold_postfix(ctx, items, last - 1, id)?;
            let arguments = parse_call_arguments(ctx, op, id)?;
            let type_description = expression.type_description().cloned();
            Ok(Node::FunctionCall(FunctionCall {
                id,
                node_type: NodeType::FunctionCall,
                src,
                expression: Box::new(expression),
                arguments,
                type_description,
            }))
        }
        Rule::member_access => {
            let id = ctx.next_id();
            let src = merged_span(&items[0], op, parent);
            let expression = fold_postfix(ctx, items, last - 1, id)?;
            let member_name = op
                .clone()
                .into_inner()
                .next()
                .map(|p| p.as_str().to_string())
                .unwrap_or_default();
            Ok(Node::MemberAccess(MemberAccess {
                id,
                node_type: NodeType::MemberAccess,
                src,
                expression: Box::new(expression),
                member_name,
                referenced_declaration: 0,
                type_description: None,
            }))
        }
        Rule::index_access => {
            let id = ctx.next_id();
            let src = merged_span(&items[0], op, parent);
            let base = fold_postfix(ctx, items, last - 1, id)?;
            let index = match op.clone().into_inner().next() {
                Some(inner) => Some(Box::new(parse_expression(ctx, &inner, id)?)),
                None => None,
            };
            Ok(Node::IndexAccess(IndexAccess {
                id,
                node_type: NodeType::IndexAccess,
                src,
                base: Box::new(base),
                index,
                type_description: None,
            }))
        }
        Rule::inc_dec => {
            let id = ctx.next_id();
            let src = merged_span(&items[0], op, parent);
            let sub_expression = fold_postfix(ctx, items, last - 1, id)?;
            let type_description = sub_expression.type_description().cloned();
            Ok(Node::UnaryOperation(UnaryOperation {
                id,
                node_type: NodeType::UnaryOperation,
                src,
                operator: op.as_str().to_string(),
                prefix: false,
                sub_expression: Box::new(sub_expression),
                type_description,
            }))
        }
        other => Err(ctx.unsupported_production(&format!("{other:?}"), ctx.span_of(op))),
    }
}

// ============================================================================
// LEAVES
// ============================================================================

fn parse_identifier(ctx: &mut BuildContext, pair: &Pair<Rule>, parent: i64) -> Node {
    let id = ctx.next_id();
    let name = pair.as_str().to_string();
    let (referenced_declaration, type_description) = match ctx.resolve(&name) {
        Some((declaration, description)) => (declaration, description),
        None => (0, None),
    };
    Node::Identifier(Identifier {
        id,
        node_type: NodeType::Identifier,
        src: SourceSpan::from_pair(pair, parent),
        name,
        referenced_declaration,
        type_description,
    })
}

fn parse_string_literal(ctx: &mut BuildContext, pair: &Pair<Rule>, parent: i64) -> Node {
    let decoded = decode_string(pair.as_str());
    let hex_value = hex_encode(decoded.as_bytes());
    let type_description = Some(TypeDescription::new(
        "t_string_literal",
        format!("literal_string \"{}\"", decoded),
    ));
    Node::Literal(Literal {
        id: ctx.next_id(),
        node_type: NodeType::Literal,
        src: SourceSpan::from_pair(pair, parent),
        kind: LiteralKind::String,
        value: decoded,
        hex_value,
        type_description,
    })
}

fn parse_number_literal(ctx: &mut BuildContext, pair: &Pair<Rule>, parent: i64) -> Node {
    let text = pair.as_str().trim().to_string();
    let number = pair
        .clone()
        .into_inner()
        .next()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| text.clone());
    let type_description = Some(number_description(&number));
    Node::Literal(Literal {
        id: ctx.next_id(),
        node_type: NodeType::Literal,
        src: SourceSpan::from_pair(pair, parent),
        kind: LiteralKind::Number,
        hex_value: hex_encode(text.as_bytes()),
        value: text,
        type_description,
    })
}

fn parse_hex_number(ctx: &mut BuildContext, pair: &Pair<Rule>, parent: i64) -> Node {
    let text = pair.as_str().to_string();
    let digits = text.trim_start_matches("0x").to_lowercase();
    let type_description = Some(number_description(&text));
    Node::Literal(Literal {
        id: ctx.next_id(),
        node_type: NodeType::Literal,
        src: SourceSpan::from_pair(pair, parent),
        kind: LiteralKind::HexNumber,
        value: text,
        hex_value: digits,
        type_description,
    })
}

fn parse_boolean_literal(ctx: &mut BuildContext, pair: &Pair<Rule>, parent: i64) -> Node {
    let text = pair.as_str().to_string();
    Node::Literal(Literal {
        id: ctx.next_id(),
        node_type: NodeType::Literal,
        src: SourceSpan::from_pair(pair, parent),
        kind: LiteralKind::Bool,
        hex_value: hex_encode(text.as_bytes()),
        value: text,
        type_description: normalize_type_name("bool").ok(),
    })
}

/// An elementary type in expression position is a cast target; it is emitted
/// as an identifier carrying the type it converts to.
fn parse_elementary_cast(ctx: &mut BuildContext, pair: &Pair<Rule>, parent: i64) -> Node {
    let name = pair.as_str().to_string();
    Node::Identifier(Identifier {
        id: ctx.next_id(),
        node_type: NodeType::Identifier,
        src: SourceSpan::from_pair(pair, parent),
        type_description: normalize_type_name(&name).ok(),
        name,
        referenced_declaration: 0,
    })
}

// ============================================================================
// COMPOSITES
// ============================================================================

fn parse_new(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let type_pair = pair
        .clone()
        .into_inner()
        .next()
        .ok_or_else(|| ctx.missing_element("new-expression type name", ctx.span_of(pair)))?;
    let type_name = parse_type_name(ctx, &type_pair, id)?;
    let type_description = type_name.type_description.clone();
    Ok(Node::New(NewExpression {
        id,
        node_type: NodeType::NewExpression,
        src,
        type_name,
        type_description,
    }))
}

fn parse_tuple(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let mut components = Vec::new();
    for component in pair.clone().into_inner() {
        components.push(parse_expression(ctx, &component, id)?);
    }
    let type_description = match components.as_slice() {
        [single] => single.type_description().cloned(),
        _ => None,
    };
    Ok(Node::Tuple(TupleExpression {
        id,
        node_type: NodeType::Tuple,
        src,
        components,
        type_description,
    }))
}

fn parse_inline_array(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let mut expressions = Vec::new();
    for element in pair.clone().into_inner() {
        expressions.push(parse_expression(ctx, &element, id)?);
    }
    let elements: Vec<ElementType> = expressions
        .iter()
        .map(|e| ElementType::from_option(e.type_description().cloned()))
        .collect();
    Ok(Node::InlineArray(InlineArray {
        id,
        node_type: NodeType::InlineArray,
        src,
        expressions,
        type_description: Some(inline_array_description(&elements)),
    }))
}

// ============================================================================
// TEXT HELPERS
// ============================================================================

fn number_description(text: &str) -> TypeDescription {
    let sanitized: String = text
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    TypeDescription::new(
        format!("t_rational_{}_by_1", sanitized),
        format!("int_const {}", text),
    )
}

/// Strip quotes and resolve the escape sequences the grammar admits.
fn decode_string(raw: &str) -> String {
    let body = raw
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(raw);
    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('0') => out.push('\0'),
            Some(other) => out.push(other),
            None => {}
        }
    }
    out
}

pub(crate) fn hex_encode(bytes: &[u8]) -> String {
    use std::fmt::Write;
    let mut out = String::with_capacity(bytes.len() * 2);
    for byte in bytes {
        let _ = write!(out, "{:02x}", byte);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::context::{BuildContext, BuilderConfig};
    use crate::ast::ids::IdAllocator;
    use crate::ast::scope::SymbolTable;
    use crate::errors::{ErrorKind, SourceContext};
    use crate::syntax::parse_source;

    fn expression_in(source: &str) -> (String, String) {
        // Wraps an expression into a minimal function body for parsing.
        let file = format!("contract T {{ function f() public {{ x = {}; }} }}", source);
        (file, source.to_string())
    }

    fn build_expression(expr_src: &str) -> Result<Node, SolastError> {
        let (file, _) = expression_in(expr_src);
        let context = SourceContext::from_file("t.sol", &file);
        let unit = parse_source(&file, &context).unwrap();
        let ids = IdAllocator::new();
        let config = BuilderConfig::default();
        let symbols = SymbolTable::new();
        let mut ctx = BuildContext::new(&ids, &config, &symbols, context, 1);

        // Dig down to the assignment's right-hand side.
        let statement = first_of(&unit, Rule::expression_statement);
        let assignment = statement.into_inner().next().unwrap();
        let rhs = assignment.into_inner().last().unwrap();
        parse_expression(&mut ctx, &rhs, 0)
    }

    fn first_of<'a>(
        pair: &pest::iterators::Pair<'a, Rule>,
        rule: Rule,
    ) -> pest::iterators::Pair<'a, Rule> {
        fn walk<'a>(
            pair: pest::iterators::Pair<'a, Rule>,
            rule: Rule,
        ) -> Option<pest::iterators::Pair<'a, Rule>> {
            if pair.as_rule() == rule {
                return Some(pair);
            }
            for inner in pair.into_inner() {
                if let Some(found) = walk(inner, rule) {
                    return Some(found);
                }
            }
            None
        }
        walk(pair.clone(), rule).unwrap()
    }

    #[test]
    fn string_literal_is_decoded_and_hex_encoded() {
        let node = build_expression("\"hello\"").unwrap();
        match node {
            Node::Literal(literal) => {
                assert_eq!(literal.value, "hello");
                assert_eq!(literal.hex_value, "68656c6c6f");
                let desc = literal.type_description.unwrap();
                assert_eq!(desc.type_identifier, "t_string_literal");
                assert_eq!(desc.type_string, "literal_string \"hello\"");
            }
            other => panic!("expected literal, got {other:?}"),
        }
    }

    #[test]
    fn comparison_yields_bool_type() {
        let node = build_expression("1 < 2").unwrap();
        match node {
            Node::BinaryOperation(op) => {
                assert_eq!(op.category, OperatorCategory::OrderComparison);
                assert_eq!(op.type_description.unwrap().type_string, "bool");
            }
            other => panic!("expected binary operation, got {other:?}"),
        }
    }

    #[test]
    fn chained_order_comparison_is_fatal() {
        let error = build_expression("1 < 2 < 3").unwrap_err();
        match error.kind {
            ErrorKind::OperandArity {
                expected, actual, ..
            } => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 3);
            }
            other => panic!("expected operand arity error, got {other:?}"),
        }
    }

    #[test]
    fn arithmetic_chain_folds_left() {
        let node = build_expression("1 - 2 - 3").unwrap();
        match node {
            Node::BinaryOperation(outer) => {
                assert_eq!(outer.operator, "-");
                assert!(matches!(*outer.left, Node::BinaryOperation(_)));
                assert!(matches!(*outer.right, Node::Literal(_)));
            }
            other => panic!("expected binary operation, got {other:?}"),
        }
    }

    #[test]
    fn unresolved_identifier_keeps_zero_reference() {
        let node = build_expression("missing").unwrap();
        match node {
            Node::Identifier(identifier) => {
                assert_eq!(identifier.name, "missing");
                assert_eq!(identifier.referenced_declaration, 0);
                assert!(identifier.type_description.is_none());
            }
            other => panic!("expected identifier, got {other:?}"),
        }
    }

    #[test]
    fn call_with_member_access_nests_callee() {
        let node = build_expression("token.transfer(to, 1)").unwrap();
        match node {
            Node::FunctionCall(call) => {
                assert_eq!(call.arguments.len(), 2);
                match call.expression.as_ref() {
                    Node::MemberAccess(access) => assert_eq!(access.member_name, "transfer"),
                    other => panic!("expected member access callee, got {other:?}"),
                }
            }
            other => panic!("expected call, got {other:?}"),
        }
    }

    #[test]
    fn inline_array_aggregates_element_types() {
        let node = build_expression("[1, x]").unwrap();
        match node {
            Node::InlineArray(array) => {
                assert_eq!(array.expressions.len(), 2);
                let desc = array.type_description.unwrap();
                assert!(desc.type_identifier.starts_with("t_inline_array_"));
                assert!(desc.type_identifier.contains("unknown"));
            }
            other => panic!("expected inline array, got {other:?}"),
        }
    }

    #[test]
    fn ids_are_assigned_parent_before_children() {
        let node = build_expression("a + b").unwrap();
        match node {
            Node::BinaryOperation(op) => {
                assert!(op.id < op.left.id());
                assert!(op.left.id() < op.right.id());
            }
            other => panic!("expected binary operation, got {other:?}"),
        }
    }
}
