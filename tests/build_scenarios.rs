//! End-to-end builds over the library API: whole-tree invariants (ID
//! uniqueness, span arithmetic, parent linkage) plus the cross-file
//! resolution scenarios the per-module tests cannot cover.

use std::collections::HashSet;

use serde_json::Value;
use solast::ast::serialize::root_envelope;
use solast::{AstBuilder, ErrorKind, Node, RootNode, SourceFile, SourceSet};

fn build(files: &[(&str, &str, &str)]) -> RootNode {
    let mut sources = SourceSet::new();
    for (name, path, content) in files {
        sources.push(SourceFile::new(*name, *path, *content));
    }
    AstBuilder::new()
        .build(&sources)
        .expect("fixture should build")
}

fn build_one(content: &str) -> RootNode {
    build(&[("Fixture.sol", "/tmp/Fixture.sol", content)])
}

#[test]
fn empty_contract_yields_minimal_tree() {
    let root = build(&[("Empty.sol", "/src/Empty.sol", "contract Empty {}")]);

    assert_eq!(root.id, 0);
    let units: Vec<_> = root.source_units().collect();
    assert_eq!(units.len(), 1);

    let unit = units[0];
    assert_eq!(unit.id, 1);
    assert_eq!(unit.name, "Empty");
    assert_eq!(unit.src.parent_index, 0);

    let contract = unit.contract().expect("one contract");
    assert_eq!(contract.id, 2);
    assert_eq!(contract.name, "Empty");
    assert!(contract.nodes.is_empty());
    assert!(contract.base_contracts.is_empty());
    assert!(contract.fully_implemented);
    assert_eq!(contract.linearized_base_contracts, vec![2]);
    assert_eq!(contract.scope, 1);
}

#[test]
fn cross_file_base_resolves_to_exported_unit_symbol() {
    let library = "library SafeMath {}\n";
    let token = "import \"./SafeMath.sol\";\n\
                 contract Token is SafeMath {}\n";
    let mut sources = SourceSet::new();
    sources.push(SourceFile::new("SafeMath.sol", "/src/SafeMath.sol", library));
    sources.push(SourceFile::new("Token.sol", "/src/Token.sol", token));
    let root = AstBuilder::new()
        .build(&sources.with_entry("Token"))
        .expect("two-file fixture should build");

    let safemath_unit = root.source_unit_by_name("SafeMath").unwrap();
    let token_unit = root.source_unit_by_name("Token").unwrap();
    assert_eq!(root.entry_source_unit(), token_unit.id);

    // The unit self-export is registered ahead of the contract symbol, so
    // the base reference lands on the unit-level exported symbol ID.
    let exported = safemath_unit
        .exported_symbols
        .iter()
        .find(|symbol| symbol.name == "SafeMath")
        .unwrap();
    assert_eq!(exported.id, safemath_unit.id);

    let token = token_unit.contract().unwrap();
    assert_eq!(token.base_contracts.len(), 1);
    assert_eq!(token.base_contracts[0].name, "SafeMath");
    assert_eq!(token.base_contracts[0].referenced_declaration, exported.id);

    // The base and the import both point at the SafeMath unit; dependency
    // lists record it once.
    assert_eq!(token.contract_dependencies, vec![safemath_unit.id]);
    assert_eq!(
        token.linearized_base_contracts,
        vec![token.id, safemath_unit.id]
    );
    assert_eq!(root.unresolved_references(), 0);
}

#[test]
fn import_backfill_covers_later_files() {
    // The importing file is built before its target exists; the second
    // resolution pass fills the unit reference in.
    let importer = "import \"./Target.sol\";\ncontract A {}\n";
    let target = "contract Target {}\n";
    let root = build(&[
        ("A.sol", "/src/A.sol", importer),
        ("Target.sol", "/src/Target.sol", target),
    ]);

    let target_unit_id = root.source_unit_by_name("Target").unwrap().id;
    let importer_unit = root.source_unit_by_name("A").unwrap();
    let import = importer_unit
        .nodes
        .iter()
        .find_map(|node| match node {
            Node::Import(import) => Some(import),
            _ => None,
        })
        .unwrap();
    assert_eq!(import.file, "./Target.sol");
    assert_eq!(import.source_unit, target_unit_id);
}

#[test]
fn string_literal_is_decoded_and_hex_encoded() {
    let root = build_one(
        "contract C {\n\
         \x20   string s;\n\
         \x20   function f() public {\n\
         \x20       s = \"hello\";\n\
         \x20   }\n\
         }\n",
    );

    let contract = root.source_units().next().unwrap().contract().unwrap();
    let function = contract
        .nodes
        .iter()
        .find_map(|node| match node {
            Node::Function(function) => Some(function),
            _ => None,
        })
        .unwrap();
    let assignment = match &function.body.statements[0] {
        Node::ExpressionStatement(statement) => match statement.expression.as_ref() {
            Node::BinaryOperation(op) => op,
            other => panic!("expected assignment, got {:?}", other.node_type()),
        },
        other => panic!("expected expression statement, got {:?}", other.node_type()),
    };
    assert_eq!(assignment.operator, "=");

    let literal = match assignment.right.as_ref() {
        Node::Literal(literal) => literal,
        other => panic!("expected literal, got {:?}", other.node_type()),
    };
    assert_eq!(literal.value, "hello");
    assert_eq!(literal.hex_value, "68656c6c6f");
    let description = literal.type_description.as_ref().unwrap();
    assert_eq!(description.type_identifier, "t_string_literal");
    assert_eq!(description.type_string, "literal_string \"hello\"");
}

#[test]
fn chained_order_comparison_is_fatal() {
    let mut sources = SourceSet::new();
    sources.push(SourceFile::new(
        "Bad.sol",
        "/src/Bad.sol",
        "contract Bad {\n\
         \x20   function f() public {\n\
         \x20       if (a < b < c) {}\n\
         \x20   }\n\
         }\n",
    ));
    let error = AstBuilder::new()
        .build(&sources)
        .expect_err("three-operand comparison must abort the build");
    match error.kind {
        ErrorKind::OperandArity {
            expected, actual, ..
        } => {
            assert_eq!(expected, 2);
            assert_eq!(actual, 3);
        }
        other => panic!("unexpected error kind: {other:?}"),
    }
}

#[test]
fn local_declaration_shadows_state_variable() {
    let root = build_one(
        "contract C {\n\
         \x20   uint256 x;\n\
         \x20   function f() public {\n\
         \x20       uint256 x = 1;\n\
         \x20       x = 2;\n\
         \x20   }\n\
         }\n",
    );

    let contract = root.source_units().next().unwrap().contract().unwrap();
    let state_id = contract
        .nodes
        .iter()
        .find_map(|node| match node {
            Node::StateVariable(variable) => Some(variable.id),
            _ => None,
        })
        .unwrap();
    let function = contract
        .nodes
        .iter()
        .find_map(|node| match node {
            Node::Function(function) => Some(function),
            _ => None,
        })
        .unwrap();

    let local_id = match &function.body.statements[0] {
        Node::VariableDeclaration(statement) => statement.declarations[0].id,
        other => panic!("expected declaration, got {:?}", other.node_type()),
    };
    let referenced = match &function.body.statements[1] {
        Node::ExpressionStatement(statement) => match statement.expression.as_ref() {
            Node::BinaryOperation(op) => match op.left.as_ref() {
                Node::Identifier(identifier) => identifier.referenced_declaration,
                other => panic!("expected identifier, got {:?}", other.node_type()),
            },
            other => panic!("expected assignment, got {:?}", other.node_type()),
        },
        other => panic!("expected expression statement, got {:?}", other.node_type()),
    };

    assert_ne!(local_id, state_id);
    assert_eq!(referenced, local_id);
}

#[test]
fn bodyless_function_marks_contract_unimplemented() {
    let root = build_one(
        "contract Partial {\n\
         \x20   function declared() public;\n\
         \x20   function defined() public { declared(); }\n\
         }\n\
         contract Whole {\n\
         \x20   function f() public { f(); }\n\
         }\n",
    );

    let unit = root.source_units().next().unwrap();
    let contracts: Vec<_> = unit
        .nodes
        .iter()
        .filter_map(|node| match node {
            Node::Contract(contract) => Some(contract),
            _ => None,
        })
        .collect();
    assert_eq!(contracts.len(), 2);
    assert!(!contracts[0].fully_implemented);
    assert!(contracts[1].fully_implemented);
}

#[test]
fn pragma_attribution_respects_proximity_window() {
    let gap = "\n".repeat(16);
    let source = format!(
        "pragma solidity ^0.8.0;\n\ncontract Near {{}}\n{gap}contract Far {{}}\n"
    );
    let root = build_one(&source);

    let unit = root.source_units().next().unwrap();
    let pragma_id = unit
        .nodes
        .iter()
        .find_map(|node| match node {
            Node::Pragma(pragma) => Some(pragma.id),
            _ => None,
        })
        .unwrap();
    let contracts: Vec<_> = unit
        .nodes
        .iter()
        .filter_map(|node| match node {
            Node::Contract(contract) => Some(contract),
            _ => None,
        })
        .collect();

    let near = contracts.iter().find(|c| c.name == "Near").unwrap();
    let far = contracts.iter().find(|c| c.name == "Far").unwrap();
    assert_eq!(near.pragmas, vec![pragma_id]);
    assert!(far.pragmas.is_empty());
}

const VAULT: &str = "\
// SPDX-License-Identifier: MIT
pragma solidity ^0.8.0;

contract Vault {
    uint256 public total;
    mapping(address => uint256) balances;

    event Deposited(address indexed from, uint256 amount);
    error Drained();

    modifier positive(uint256 amount) {
        require(amount > 0);
        _;
    }

    function deposit(uint256 amount) public payable positive(amount) returns (bool) {
        balances[msg.sender] = balances[msg.sender] + amount;
        total = total + amount;
        emit Deposited(msg.sender, amount);
        return true;
    }

    function drain() internal {
        if (total == 0) {
            revert Drained();
        }
        for (uint256 i = 0; i < 3; i = i + 1) {
            total = total - 1;
        }
    }
}
";

fn collect_identified(value: &Value, ids: &mut Vec<i64>, spans: &mut Vec<(i64, Value)>) {
    match value {
        Value::Object(map) => {
            if let (Some(id), Some(src)) = (map.get("id").and_then(Value::as_i64), map.get("src")) {
                ids.push(id);
                spans.push((id, src.clone()));
            }
            for child in map.values() {
                collect_identified(child, ids, spans);
            }
        }
        Value::Array(items) => {
            for child in items {
                collect_identified(child, ids, spans);
            }
        }
        _ => {}
    }
}

#[test]
fn every_node_has_a_unique_id_and_consistent_span() {
    let root = build_one(VAULT);
    let json = root_envelope(&root);

    let mut ids = Vec::new();
    let mut spans = Vec::new();
    collect_identified(&json, &mut ids, &mut spans);
    assert!(ids.len() > 30, "fixture should produce a rich tree");

    let unique: HashSet<_> = ids.iter().copied().collect();
    assert_eq!(unique.len(), ids.len(), "duplicate node IDs");

    for (id, src) in &spans {
        let start = src["start"].as_i64().unwrap();
        let end = src["end"].as_i64().unwrap();
        let length = src["length"].as_i64().unwrap();
        let parent = src["parentIndex"].as_i64().unwrap();
        assert!(end >= start, "node {id}: end before start");
        assert_eq!(length, end - start + 1, "node {id}: length mismatch");
        assert!(
            unique.contains(&parent),
            "node {id}: parent {parent} not in tree"
        );
    }
}

#[test]
fn comments_attach_to_their_unit() {
    let root = build_one(VAULT);
    let unit_id = root.source_units().next().unwrap().id;

    let license: Vec<_> = root
        .comments()
        .iter()
        .filter(|comment| comment.text.contains("SPDX-License-Identifier"))
        .collect();
    assert_eq!(license.len(), 1);
    assert_eq!(license[0].src.line, 1);
    for comment in root.comments() {
        assert_eq!(comment.src.parent_index, unit_id);
    }
}

#[test]
fn repeated_builds_are_identical() {
    let first = build_one(VAULT);
    let second = build_one(VAULT);
    assert_eq!(root_envelope(&first), root_envelope(&second));
}
