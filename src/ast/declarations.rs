//! Declaration and parameter builders.
//!
//! Everything variable-shaped funnels through `parse_parameter`: function
//! parameters, event/error fields, struct members, and statement locals all
//! have the same grammar skeleton (type, optional location/indexed flag,
//! optional name). Constructed declarations register themselves into the
//! scope table immediately, which is what makes single-pass resolution see
//! them from the next sibling onward.

use pest::iterators::Pair;

use crate::ast::context::BuildContext;
use crate::ast::node::{
    EnumDefinition, EnumValue, EventDefinition, ErrorDefinition, Mutability, Node, NodeType,
    Parameter, ParameterList, StateVariable, StorageLocation, StructDefinition, TypeName,
    UsingDirective, VariableMutability, Visibility,
};
use crate::ast::scope::{ScopeEntry, ScopeKind};
use crate::ast::span::SourceSpan;
use crate::ast::types::{
    array_description, enum_description, error_description, event_description,
    function_description, mapping_description, normalize_type_name, struct_description,
    ElementType, TypeDescription,
};
use crate::errors::{ErrorReporting, SolastError};
use crate::syntax::Rule;

// ============================================================================
// TYPE NAMES
// ============================================================================

/// Build a `TypeName` node from a `type_name` production. Elementary and
/// composite types synthesize their description structurally; user-defined
/// names resolve best-effort and may stay pending for the second pass.
pub fn parse_type_name(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<TypeName, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let name = pair.as_str().trim().to_string();
    let (referenced_declaration, type_description) = describe_type_name(ctx, pair);
    Ok(TypeName {
        id,
        node_type: NodeType::TypeName,
        src,
        name,
        referenced_declaration,
        type_description,
    })
}

/// Structural description synthesis for a `type_name` production. Allocates
/// no node IDs; composition happens over descriptions alone.
fn describe_type_name(ctx: &BuildContext, pair: &Pair<Rule>) -> (i64, Option<TypeDescription>) {
    let mut inner = pair.clone().into_inner();
    let base = match inner.next() {
        Some(base) => base,
        None => return (0, None),
    };

    let (referenced, mut description) = match base.as_rule() {
        Rule::elementary_type => (0, normalize_type_name(base.as_str()).ok()),
        Rule::identifier_path => match ctx.resolve(base.as_str().trim()) {
            Some((declaration, desc)) => (declaration, desc),
            None => (0, None),
        },
        Rule::mapping_type => {
            let mut parts = base.clone().into_inner();
            let key = parts
                .next()
                .map(|p| ElementType::from_option(describe_type_name(ctx, &p).1))
                .unwrap_or(ElementType::Unknown);
            let value = parts
                .next()
                .map(|p| ElementType::from_option(describe_type_name(ctx, &p).1))
                .unwrap_or(ElementType::Unknown);
            (0, Some(mapping_description(&key, &value)))
        }
        Rule::function_type => {
            let mut parameters = Vec::new();
            if let Some(list) = crate::syntax::find(&base, Rule::parameter_list) {
                for declaration in list.into_inner() {
                    let element = crate::syntax::find(&declaration, Rule::type_name)
                        .map(|t| ElementType::from_option(describe_type_name(ctx, &t).1))
                        .unwrap_or(ElementType::Unknown);
                    parameters.push(element);
                }
            }
            (0, Some(function_description(&parameters)))
        }
        _ => (0, None),
    };

    // Remaining children are array suffixes, innermost first.
    for suffix in inner {
        if suffix.as_rule() != Rule::array_suffix {
            continue;
        }
        let length = suffix.clone().into_inner().next();
        let length_text = length.as_ref().map(|p| p.as_str().trim());
        description = description.map(|element| array_description(&element, length_text));
    }

    (referenced, description)
}

// ============================================================================
// PARAMETERS
// ============================================================================

/// Build one variable-like declaration. `declare` names the scope category
/// the new declaration becomes visible under, or `None` to keep it out of
/// resolution (anonymous event fields and the like).
pub fn parse_parameter(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
    scope_owner: i64,
    declare: Option<ScopeKind>,
    default_location: StorageLocation,
) -> Result<Parameter, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let mut name = String::new();
    let mut type_name = None;
    let mut storage_location = default_location;
    let mut indexed = false;

    for part in pair.clone().into_inner() {
        match part.as_rule() {
            Rule::type_name => type_name = Some(parse_type_name(ctx, &part, id)?),
            Rule::storage_location => storage_location = parse_storage_location(part.as_str()),
            Rule::indexed_kw => indexed = true,
            Rule::identifier => name = part.as_str().to_string(),
            _ => {}
        }
    }

    let type_description = type_name
        .as_ref()
        .and_then(|t: &TypeName| t.type_description.clone());

    if !name.is_empty() {
        if let Some(kind) = declare {
            ctx.scope.declare(ScopeEntry {
                id,
                name: name.clone(),
                kind,
                type_description: type_description.clone(),
            });
        }
    }

    Ok(Parameter {
        id,
        node_type: NodeType::Parameter,
        src,
        name,
        type_name,
        storage_location,
        visibility: Visibility::Internal,
        state_mutability: Mutability::Nonpayable,
        indexed,
        scope: scope_owner,
        type_description,
    })
}

/// Build a parameter list node from any of the grammar's list productions
/// (`parameter_list`, `event_parameter_list`, `error_parameter_list`).
pub fn parse_parameter_list(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
    scope_owner: i64,
    declare: Option<ScopeKind>,
) -> Result<ParameterList, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let mut parameters = Vec::new();
    for declaration in pair.clone().into_inner() {
        parameters.push(parse_parameter(
            ctx,
            &declaration,
            id,
            scope_owner,
            declare,
            StorageLocation::Memory,
        )?);
    }
    Ok(ParameterList {
        id,
        node_type: NodeType::ParameterList,
        src,
        parameters,
    })
}

/// Synthetic empty list for functions without a returns clause; reuses the
/// owner's span with the owner as parent.
pub fn empty_parameter_list(ctx: &BuildContext, owner_span: &SourceSpan, owner: i64) -> ParameterList {
    ParameterList {
        id: ctx.next_id(),
        node_type: NodeType::ParameterList,
        src: SourceSpan::synthetic(owner_span, owner),
        parameters: Vec::new(),
    }
}

// ============================================================================
// CONTRACT-LEVEL DECLARATIONS
// ============================================================================

pub fn parse_struct(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let name = named_identifier(ctx, pair)?;
    let description = struct_description(&name);

    // Visible before its members so self-referential structs resolve.
    ctx.scope.declare(ScopeEntry {
        id,
        name: name.clone(),
        kind: ScopeKind::Struct,
        type_description: Some(description.clone()),
    });

    let mut members = Vec::new();
    for member in crate::syntax::find_all(pair, Rule::struct_member) {
        members.push(parse_parameter(
            ctx,
            &member,
            id,
            id,
            Some(ScopeKind::StructMember),
            StorageLocation::Memory,
        )?);
    }

    Ok(Node::Struct(StructDefinition {
        id,
        node_type: NodeType::Struct,
        src,
        name,
        members,
        type_description: Some(description),
    }))
}

pub fn parse_enum(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);

    let mut identifiers = crate::syntax::find_all(pair, Rule::identifier).into_iter();
    let name = identifiers
        .next()
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| ctx.missing_element("enum name", ctx.span_of(pair)))?;
    let description = enum_description(&name);

    ctx.scope.declare(ScopeEntry {
        id,
        name: name.clone(),
        kind: ScopeKind::Enum,
        type_description: Some(description.clone()),
    });

    let mut members = Vec::new();
    for identifier in identifiers {
        let member_id = ctx.next_id();
        let member_name = identifier.as_str().to_string();
        ctx.scope.declare(ScopeEntry {
            id: member_id,
            name: member_name.clone(),
            kind: ScopeKind::EnumMember,
            type_description: Some(description.clone()),
        });
        members.push(EnumValue {
            id: member_id,
            node_type: NodeType::EnumValue,
            src: SourceSpan::from_pair(&identifier, id),
            name: member_name,
        });
    }

    Ok(Node::Enum(EnumDefinition {
        id,
        node_type: NodeType::Enum,
        src,
        name,
        members,
        type_description: Some(description),
    }))
}

pub fn parse_event(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let name = named_identifier(ctx, pair)?;
    let description = event_description(&name);

    ctx.scope.declare(ScopeEntry {
        id,
        name: name.clone(),
        kind: ScopeKind::Event,
        type_description: Some(description.clone()),
    });

    let list = crate::syntax::find(pair, Rule::event_parameter_list)
        .ok_or_else(|| ctx.missing_element("event parameter list", ctx.span_of(pair)))?;
    // Event field names stay out of contract-level resolution.
    let parameters = parse_parameter_list(ctx, &list, id, id, None)?;
    let anonymous = crate::syntax::find(pair, Rule::anonymous_kw).is_some();

    Ok(Node::Event(EventDefinition {
        id,
        node_type: NodeType::Event,
        src,
        name,
        anonymous,
        parameters,
        type_description: Some(description),
    }))
}

pub fn parse_error_definition(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let name = named_identifier(ctx, pair)?;
    let description = error_description(&name);

    ctx.scope.declare(ScopeEntry {
        id,
        name: name.clone(),
        kind: ScopeKind::Error,
        type_description: Some(description.clone()),
    });

    let list = crate::syntax::find(pair, Rule::error_parameter_list)
        .ok_or_else(|| ctx.missing_element("error parameter list", ctx.span_of(pair)))?;
    let parameters = parse_parameter_list(ctx, &list, id, id, Some(ScopeKind::ErrorParameter))?;

    Ok(Node::ErrorDefinition(ErrorDefinition {
        id,
        node_type: NodeType::Error,
        src,
        name,
        parameters,
        type_description: Some(description),
    }))
}

pub fn parse_state_variable(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    contract_id: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, contract_id);
    let mut type_name = None;
    let mut name = String::new();
    let mut visibility = Visibility::Internal;
    let mut mutability = VariableMutability::Mutable;
    let mut initial_value = None;

    for part in pair.clone().into_inner() {
        match part.as_rule() {
            Rule::type_name => type_name = Some(parse_type_name(ctx, &part, id)?),
            Rule::state_variable_attribute => {
                if let Some(attribute) = part.clone().into_inner().next() {
                    match attribute.as_rule() {
                        Rule::visibility => visibility = parse_visibility(attribute.as_str()),
                        Rule::constant_kw => mutability = VariableMutability::Constant,
                        Rule::immutable_kw => mutability = VariableMutability::Immutable,
                        _ => {}
                    }
                }
            }
            Rule::identifier => name = part.as_str().to_string(),
            Rule::assignment => {
                let value = crate::ast::expressions::parse_expression(ctx, &part, id)?;
                initial_value = Some(Box::new(value));
            }
            _ => {}
        }
    }

    let type_description = type_name
        .as_ref()
        .and_then(|t: &TypeName| t.type_description.clone());

    // Visible to everything built after it in this contract.
    if !name.is_empty() {
        ctx.scope.declare(ScopeEntry {
            id,
            name: name.clone(),
            kind: ScopeKind::StateVariable,
            type_description: type_description.clone(),
        });
    }

    Ok(Node::StateVariable(StateVariable {
        id,
        node_type: NodeType::StateVariable,
        src,
        name,
        type_name,
        visibility,
        mutability,
        storage_location: StorageLocation::Storage,
        initial_value,
        type_description,
        scope: contract_id,
    }))
}

pub fn parse_using_directive(
    ctx: &mut BuildContext,
    pair: &Pair<Rule>,
    parent: i64,
) -> Result<Node, SolastError> {
    let id = ctx.next_id();
    let src = SourceSpan::from_pair(pair, parent);
    let library_name = crate::syntax::find(pair, Rule::identifier_path)
        .map(|p| p.as_str().trim().to_string())
        .ok_or_else(|| ctx.missing_element("using-directive library name", ctx.span_of(pair)))?;
    let referenced_declaration = ctx
        .resolve(&library_name)
        .map(|(declaration, _)| declaration)
        .unwrap_or(0);
    let type_name = match crate::syntax::find(pair, Rule::type_name) {
        Some(target) => Some(parse_type_name(ctx, &target, id)?),
        None => None,
    };

    Ok(Node::Using(UsingDirective {
        id,
        node_type: NodeType::Using,
        src,
        library_name,
        referenced_declaration,
        type_name,
    }))
}

// ============================================================================
// ATTRIBUTE PARSING
// ============================================================================

pub fn parse_visibility(text: &str) -> Visibility {
    match text {
        "public" => Visibility::Public,
        "private" => Visibility::Private,
        "external" => Visibility::External,
        _ => Visibility::Internal,
    }
}

pub fn parse_mutability(text: &str) -> Mutability {
    match text {
        "pure" => Mutability::Pure,
        "view" => Mutability::View,
        "payable" => Mutability::Payable,
        _ => Mutability::Nonpayable,
    }
}

pub fn parse_storage_location(text: &str) -> StorageLocation {
    match text {
        "storage" => StorageLocation::Storage,
        "calldata" => StorageLocation::Calldata,
        _ => StorageLocation::Memory,
    }
}

fn named_identifier(ctx: &BuildContext, pair: &Pair<Rule>) -> Result<String, SolastError> {
    crate::syntax::find(pair, Rule::identifier)
        .map(|p| p.as_str().to_string())
        .ok_or_else(|| ctx.missing_element("declaration name", ctx.span_of(pair)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::context::{BuildContext, BuilderConfig};
    use crate::ast::ids::IdAllocator;
    use crate::ast::scope::SymbolTable;
    use crate::errors::SourceContext;
    use crate::syntax::parse_source;

    fn with_context<R>(source: &str, run: impl FnOnce(&mut BuildContext, &Pair<Rule>) -> R) -> R {
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

    #[test]
    fn mapping_type_composes_structurally() {
        with_context(
            "contract C { mapping(address => uint) balances; }",
            |ctx, contract| {
                let declaration =
                    crate::syntax::find(contract, Rule::state_variable_declaration).unwrap();
                let node = parse_state_variable(ctx, &declaration, 2).unwrap();
                let desc = node.type_description().unwrap();
                assert_eq!(desc.type_string, "mapping(address => uint256)");
                assert_eq!(desc.type_identifier, "t_mapping_$_t_address_$_t_uint256_$");
            },
        );
    }

    #[test]
    fn array_suffix_wraps_element_description() {
        with_context("contract C { uint[3] slots; }", |ctx, contract| {
            let declaration =
                crate::syntax::find(contract, Rule::state_variable_declaration).unwrap();
            let node = parse_state_variable(ctx, &declaration, 2).unwrap();
            let desc = node.type_description().unwrap();
            assert_eq!(desc.type_string, "uint256[3]");
            assert_eq!(desc.type_identifier, "t_array_$_t_uint256_$3");
        });
    }

    #[test]
    fn state_variable_registers_in_scope() {
        with_context("contract C { uint total; }", |ctx, contract| {
            let declaration =
                crate::syntax::find(contract, Rule::state_variable_declaration).unwrap();
            let node = parse_state_variable(ctx, &declaration, 2).unwrap();
            let (resolved, desc) = ctx.scope.resolve("total").unwrap();
            assert_eq!(resolved, node.id());
            assert_eq!(desc.unwrap().type_string, "uint256");
        });
    }

    #[test]
    fn struct_is_visible_to_its_own_members() {
        with_context(
            "contract C { struct Item { uint value; } }",
            |ctx, contract| {
                let definition = crate::syntax::find(contract, Rule::struct_definition).unwrap();
                let node = parse_struct(ctx, &definition, 2).unwrap();
                assert_eq!(ctx.scope.resolve("Item").unwrap().0, node.id());
                assert!(ctx.scope.resolve("value").is_some());
            },
        );
    }

    #[test]
    fn event_fields_stay_out_of_contract_scope() {
        with_context(
            "contract C { event Transfer(address indexed from, uint amount); }",
            |ctx, contract| {
                let definition = crate::syntax::find(contract, Rule::event_definition).unwrap();
                let node = parse_event(ctx, &definition, 2).unwrap();
                match node {
                    Node::Event(event) => {
                        assert_eq!(event.parameters.parameters.len(), 2);
                        assert!(event.parameters.parameters[0].indexed);
                        assert!(!event.parameters.parameters[1].indexed);
                    }
                    other => panic!("expected event, got {other:?}"),
                }
                assert!(ctx.scope.resolve("Transfer").is_some());
                assert!(ctx.scope.resolve("from").is_none());
            },
        );
    }

    #[test]
    fn enum_members_resolve_to_enum_type() {
        with_context(
            "contract C { enum Phase { Open, Closed } }",
            |ctx, contract| {
                let definition = crate::syntax::find(contract, Rule::enum_definition).unwrap();
                let node = parse_enum(ctx, &definition, 2).unwrap();
                match &node {
                    Node::Enum(e) => assert_eq!(e.members.len(), 2),
                    other => panic!("expected enum, got {other:?}"),
                }
                let (_, desc) = ctx.scope.resolve("Open").unwrap();
                assert_eq!(desc.unwrap().type_string, "enum Phase");
            },
        );
    }
}
