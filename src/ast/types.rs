//! Canonical type descriptions.
//!
//! A `TypeDescription` is the (typeString, typeIdentifier) pair attached to
//! typed nodes. Synthesis is deterministic and idempotent: normalizing an
//! already-canonical type string is a fixpoint. Raw text the synthesizer
//! cannot canonicalize (mapping types, user-defined paths in elementary
//! position) is a hard `TypeError`; callers decide whether to propagate or
//! degrade to a placeholder.

use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TypeError {
    #[error("unsupported type text '{0}'")]
    Unsupported(String),
    #[error("malformed type text '{0}'")]
    Malformed(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypeDescription {
    pub type_identifier: String,
    pub type_string: String,
}

impl TypeDescription {
    pub fn new(type_identifier: impl Into<String>, type_string: impl Into<String>) -> Self {
        Self {
            type_identifier: type_identifier.into(),
            type_string: type_string.into(),
        }
    }
}

/// Best-effort element typing: an explicit variant instead of a magic
/// "unknown" string, so downstream consumers can branch on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ElementType {
    Resolved(TypeDescription),
    Unknown,
}

impl ElementType {
    pub fn from_option(desc: Option<TypeDescription>) -> Self {
        match desc {
            Some(d) => ElementType::Resolved(d),
            None => ElementType::Unknown,
        }
    }

    pub fn identifier_fragment(&self) -> &str {
        match self {
            ElementType::Resolved(d) => &d.type_identifier,
            ElementType::Unknown => "unknown",
        }
    }

    pub fn string_fragment(&self) -> &str {
        match self {
            ElementType::Resolved(d) => &d.type_string,
            ElementType::Unknown => "unknown",
        }
    }
}

// ============================================================================
// ELEMENTARY TYPES
// ============================================================================

/// Aliases that canonicalize to a sized elementary type.
static ELEMENTARY_ALIASES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("uint", "uint256");
    map.insert("int", "int256");
    map.insert("byte", "bytes1");
    map
});

fn is_elementary(name: &str) -> bool {
    match name {
        "address" | "address payable" | "bool" | "string" | "bytes" | "fixed" | "ufixed" => {
            return true
        }
        _ => {}
    }
    if let Some(bits) = name.strip_prefix("uint").or_else(|| name.strip_prefix("int")) {
        return matches!(bits.parse::<u32>(), Ok(n) if n >= 8 && n <= 256 && n % 8 == 0);
    }
    if let Some(count) = name.strip_prefix("bytes") {
        return matches!(count.parse::<u32>(), Ok(n) if (1..=32).contains(&n));
    }
    false
}

fn elementary_description(name: &str) -> TypeDescription {
    TypeDescription::new(format!("t_{}", name.replace(' ', "_")), name.to_string())
}

// ============================================================================
// NORMALIZATION
// ============================================================================

/// Canonicalize raw elementary/array type text into a description.
pub fn normalize_type_name(raw: &str) -> Result<TypeDescription, TypeError> {
    let raw = collapse_whitespace(raw.trim());
    if raw.is_empty() {
        return Err(TypeError::Malformed(raw));
    }

    // Arrays recurse on the element type; the suffix carries the length.
    if let Some(stripped) = raw.strip_suffix(']') {
        let open = stripped
            .rfind('[')
            .ok_or_else(|| TypeError::Malformed(raw.clone()))?;
        let element = normalize_type_name(&stripped[..open])?;
        let len = stripped[open + 1..].trim();
        return Ok(array_description(&element, if len.is_empty() {
            None
        } else {
            Some(len)
        }));
    }

    if raw.starts_with("mapping") || raw.starts_with("function") {
        // Structural composition only; raw text is not enough.
        return Err(TypeError::Unsupported(raw));
    }

    if let Some(canonical) = ELEMENTARY_ALIASES.get(raw.as_str()) {
        return Ok(elementary_description(canonical));
    }
    if is_elementary(&raw) {
        return Ok(elementary_description(&raw));
    }

    Err(TypeError::Unsupported(raw))
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

// ============================================================================
// COMPOSITE DESCRIPTIONS
// ============================================================================

/// `elem[]` / `elem[N]` composition.
pub fn array_description(element: &TypeDescription, len: Option<&str>) -> TypeDescription {
    let suffix = len.unwrap_or("dyn");
    TypeDescription::new(
        dedup_separators(format!("t_array_$_{}_${}", element.type_identifier, suffix)),
        format!("{}[{}]", element.type_string, len.unwrap_or("")),
    )
}

/// `mapping(key => value)` composition, built structurally by the TypeName
/// builder from its sub-descriptions.
pub fn mapping_description(key: &ElementType, value: &ElementType) -> TypeDescription {
    TypeDescription::new(
        dedup_separators(format!(
            "t_mapping_$_{}_$_{}_$",
            key.identifier_fragment(),
            value.identifier_fragment()
        )),
        format!(
            "mapping({} => {})",
            key.string_fragment(),
            value.string_fragment()
        ),
    )
}

/// Function type composition from its parameter types.
pub fn function_description(parameters: &[ElementType]) -> TypeDescription {
    let identifiers: Vec<&str> = parameters.iter().map(|p| p.identifier_fragment()).collect();
    let strings: Vec<&str> = parameters.iter().map(|p| p.string_fragment()).collect();
    TypeDescription::new(
        dedup_separators(format!("t_function_{}", identifiers.join("$"))),
        format!("function({})", strings.join(", ")),
    )
}

/// Aggregate type for inline arrays and tuples; unresolved elements keep an
/// explicit `unknown` slot rather than failing the aggregate.
pub fn inline_array_description(elements: &[ElementType]) -> TypeDescription {
    let identifiers: Vec<&str> = elements.iter().map(|e| e.identifier_fragment()).collect();
    let strings: Vec<&str> = elements.iter().map(|e| e.string_fragment()).collect();
    TypeDescription::new(
        dedup_separators(format!("t_inline_array_{}", identifiers.join("$"))),
        format!("[{}]", strings.join(", ")),
    )
}

/// Descriptions for user-defined declarations, used when a name resolves to
/// a contract-level or cross-file declaration.
pub fn struct_description(name: &str) -> TypeDescription {
    TypeDescription::new(format!("t_struct_$_{}", name), format!("struct {}", name))
}

pub fn enum_description(name: &str) -> TypeDescription {
    TypeDescription::new(format!("t_enum_$_{}", name), format!("enum {}", name))
}

pub fn contract_description(name: &str) -> TypeDescription {
    TypeDescription::new(
        format!("t_contract_$_{}", name),
        format!("contract {}", name),
    )
}

pub fn error_description(name: &str) -> TypeDescription {
    TypeDescription::new(format!("t_error_$_{}", name), format!("error {}", name))
}

pub fn event_description(name: &str) -> TypeDescription {
    TypeDescription::new(format!("t_event_$_{}", name), format!("event {}", name))
}

pub fn modifier_description(name: &str) -> TypeDescription {
    TypeDescription::new(
        format!("t_modifier_$_{}", name),
        format!("modifier {}", name),
    )
}

/// Collapses runs of `$` separators left by empty fragments.
fn dedup_separators(identifier: String) -> String {
    let mut out = String::with_capacity(identifier.len());
    let mut last_dollar = false;
    for ch in identifier.chars() {
        if ch == '$' {
            if last_dollar {
                continue;
            }
            last_dollar = true;
        } else {
            last_dollar = false;
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elementary_aliases_canonicalize() {
        assert_eq!(
            normalize_type_name("uint").unwrap(),
            TypeDescription::new("t_uint256", "uint256")
        );
        assert_eq!(
            normalize_type_name("int").unwrap(),
            TypeDescription::new("t_int256", "int256")
        );
        assert_eq!(
            normalize_type_name("byte").unwrap(),
            TypeDescription::new("t_bytes1", "bytes1")
        );
        assert_eq!(
            normalize_type_name("address payable").unwrap(),
            TypeDescription::new("t_address_payable", "address payable")
        );
    }

    #[test]
    fn normalization_is_idempotent() {
        for raw in ["uint", "uint256", "int", "byte", "bytes32", "bool", "string", "uint8[]"] {
            let once = normalize_type_name(raw).unwrap();
            let twice = normalize_type_name(&once.type_string).unwrap();
            assert_eq!(once, twice, "normalizing '{}' twice diverged", raw);
        }
    }

    #[test]
    fn alias_and_canonical_converge() {
        assert_eq!(
            normalize_type_name("uint").unwrap(),
            normalize_type_name("uint256").unwrap()
        );
    }

    #[test]
    fn array_identifiers() {
        let dynamic = normalize_type_name("uint[]").unwrap();
        assert_eq!(dynamic.type_identifier, "t_array_$_t_uint256_$dyn");
        assert_eq!(dynamic.type_string, "uint256[]");

        let sized = normalize_type_name("bytes32[4]").unwrap();
        assert_eq!(sized.type_identifier, "t_array_$_t_bytes32_$4");
        assert_eq!(sized.type_string, "bytes32[4]");
    }

    #[test]
    fn mapping_text_is_a_hard_failure() {
        assert!(matches!(
            normalize_type_name("mapping(address => uint256)"),
            Err(TypeError::Unsupported(_))
        ));
    }

    #[test]
    fn user_defined_text_is_a_hard_failure() {
        assert!(matches!(
            normalize_type_name("MyToken"),
            Err(TypeError::Unsupported(_))
        ));
    }

    #[test]
    fn mapping_composition() {
        let key = ElementType::Resolved(normalize_type_name("address").unwrap());
        let value = ElementType::Resolved(normalize_type_name("uint").unwrap());
        let desc = mapping_description(&key, &value);
        assert_eq!(desc.type_identifier, "t_mapping_$_t_address_$_t_uint256_$");
        assert_eq!(desc.type_string, "mapping(address => uint256)");
    }

    #[test]
    fn inline_array_with_unknown_slot() {
        let elems = vec![
            ElementType::Resolved(normalize_type_name("uint").unwrap()),
            ElementType::Unknown,
        ];
        let desc = inline_array_description(&elems);
        assert_eq!(desc.type_identifier, "t_inline_array_t_uint256$unknown");
        assert_eq!(desc.type_string, "[uint256, unknown]");
    }

    #[test]
    fn separator_runs_collapse() {
        assert_eq!(dedup_separators("t_a_$$_b$$$c".into()), "t_a_$_b$c");
    }
}
