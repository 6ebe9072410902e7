//! Conversion to the generic serializable envelope.
//!
//! Every node converts to a `{"@type": "solast.<Tag>", "fields": {...}}`
//! value suitable for JSON or protobuf-Any style export. The conversion is
//! total: a node that cannot serialize (which would take a malformed float
//! or similar, impossible for these types) degrades to an envelope with
//! null fields instead of panicking.

use serde::Serialize;
use serde_json::{json, Value};

use crate::ast::builder::RootNode;
use crate::ast::node::{Comment, Node, NodeType};
use crate::ast::source_unit::SourceUnit;

pub const TYPE_URL_PREFIX: &str = "solast.";

/// Wrap any serializable payload under a node-type tag.
pub fn envelope<T: Serialize>(node_type: NodeType, payload: &T) -> Value {
    let fields = serde_json::to_value(payload).unwrap_or(Value::Null);
    json!({
        "@type": format!("{}{}", TYPE_URL_PREFIX, node_type.as_str()),
        "fields": fields,
    })
}

pub fn node_envelope(node: &Node) -> Value {
    envelope(node.node_type(), node)
}

pub fn comment_envelope(comment: &Comment) -> Value {
    envelope(comment.node_type, comment)
}

pub fn unit_envelope(unit: &SourceUnit) -> Value {
    envelope(unit.node_type, unit)
}

pub fn root_envelope(root: &RootNode) -> Value {
    envelope(root.node_type, root)
}

/// Pretty JSON for the whole tree.
pub fn root_to_json(root: &RootNode) -> Result<String, serde_json::Error> {
    serde_json::to_string_pretty(&root_envelope(root))
}
