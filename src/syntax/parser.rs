//! Pest entry point and parse-tree access helpers.
//!
//! `parse_source` produces the `source_unit` production for one file. The
//! `find`/`find_all` helpers implement the defensive child-access discipline:
//! absent productions come back as `None`/empty rather than panicking.

use pest::iterators::Pair;
use pest::Parser;
use pest_derive::Parser;

use crate::errors::{to_source_span, ErrorKind, SolastError, SourceContext};

#[derive(Parser)]
#[grammar = "syntax/grammar.pest"]
struct SolidityParser;

// ============================================================================
// PUBLIC API
// ============================================================================

/// Parse one file's source text into its `source_unit` production.
pub fn parse_source<'a>(
    source_text: &'a str,
    context: &SourceContext,
) -> Result<Pair<'a, Rule>, SolastError> {
    let mut pairs = SolidityParser::parse(Rule::source_unit, source_text)
        .map_err(|e| convert_parse_error(e, context))?;

    pairs.next().ok_or_else(|| {
        make_error(
            context,
            ErrorKind::MissingElement {
                element: "source unit".into(),
            },
            0,
            source_text.len(),
        )
    })
}

/// First direct child with the given rule, if any.
pub fn find<'a>(pair: &Pair<'a, Rule>, rule: Rule) -> Option<Pair<'a, Rule>> {
    pair.clone().into_inner().find(|p| p.as_rule() == rule)
}

/// All direct children with the given rule.
pub fn find_all<'a>(pair: &Pair<'a, Rule>, rule: Rule) -> Vec<Pair<'a, Rule>> {
    pair.clone()
        .into_inner()
        .filter(|p| p.as_rule() == rule)
        .collect()
}

// ============================================================================
// ERROR CONVERSION
// ============================================================================

fn convert_parse_error(error: pest::error::Error<Rule>, context: &SourceContext) -> SolastError {
    let (start, end) = match error.location {
        pest::error::InputLocation::Pos(pos) => (pos, pos),
        pest::error::InputLocation::Span((start, end)) => (start, end),
    };

    let message = if error.to_string().contains("expected \"}\"") {
        "missing closing brace"
    } else if error.to_string().contains("expected \")\"") {
        "missing closing parenthesis"
    } else {
        "syntax error"
    };

    make_error(
        context,
        ErrorKind::MalformedConstruct {
            construct: message.to_string(),
        },
        start,
        end,
    )
}

fn make_error(context: &SourceContext, kind: ErrorKind, start: usize, end: usize) -> SolastError {
    let error_code = format!("solast::parse::{}", kind.code_suffix());
    SolastError {
        kind,
        source_info: crate::errors::SourceInfo {
            source: context.to_named_source(),
            primary_span: to_source_span(start, end),
            phase: "parse".to_string(),
        },
        diagnostic_info: crate::errors::DiagnosticInfo {
            help: None,
            error_code,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_empty_contract() {
        let src = "contract Empty {}";
        let unit = parse_source(src, &SourceContext::from_file("Empty.sol", src)).unwrap();
        assert_eq!(unit.as_rule(), Rule::source_unit);
        let contract = find(&unit, Rule::contract_definition);
        assert!(contract.is_some());
    }

    #[test]
    fn parses_pragma_and_import() {
        let src = "pragma solidity ^0.8.19;\nimport \"./Lib.sol\";\ncontract C {}";
        let unit = parse_source(src, &SourceContext::from_file("C.sol", src)).unwrap();
        assert!(find(&unit, Rule::pragma_directive).is_some());
        assert!(find(&unit, Rule::import_directive).is_some());
    }

    #[test]
    fn rejects_unclosed_contract() {
        let src = "contract Broken {";
        let result = parse_source(src, &SourceContext::from_file("Broken.sol", src));
        assert!(result.is_err());
    }

    #[test]
    fn find_is_none_for_absent_children() {
        let src = "contract Empty {}";
        let unit = parse_source(src, &SourceContext::from_file("Empty.sol", src)).unwrap();
        assert!(find(&unit, Rule::import_directive).is_none());
        assert!(find_all(&unit, Rule::pragma_directive).is_empty());
    }
}
