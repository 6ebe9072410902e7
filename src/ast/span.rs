//! Source position metadata.
//!
//! Every AST node carries a `SourceSpan` locating it in the original text:
//! line and column of its first token, inclusive byte range, and the ID of
//! its owning node. Invariant: `end >= start` and
//! `length == end - start + 1`.

use pest::iterators::Pair;
use serde::{Deserialize, Serialize};

use crate::syntax::Rule;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub struct SourceSpan {
    pub line: usize,
    pub column: usize,
    pub start: usize,
    pub end: usize,
    pub length: usize,
    pub parent_index: i64,
}

impl SourceSpan {
    /// Span of a parse-tree production, owned by `parent`.
    ///
    /// pest byte ranges are end-exclusive; the stored `end` is the inclusive
    /// offset of the last byte.
    pub fn from_pair(pair: &Pair<Rule>, parent: i64) -> Self {
        let span = pair.as_span();
        let (line, column) = span.start_pos().line_col();
        let start = span.start();
        let end = if span.end() > start {
            span.end() - 1
        } else {
            start
        };
        Self {
            line,
            column,
            start,
            end,
            length: end - start + 1,
            parent_index: parent,
        }
    }

    /// Span for a synthetic or zero-width node: the owner's span is reused
    /// verbatim with `parent_index` pointing at the true owner.
    pub fn synthetic(owner_span: &SourceSpan, owner: i64) -> Self {
        let mut span = owner_span.clone();
        span.parent_index = owner;
        span
    }

    pub fn with_parent(mut self, parent: i64) -> Self {
        self.parent_index = parent;
        self
    }

    /// Checks the span arithmetic invariant.
    pub fn is_consistent(&self) -> bool {
        self.end >= self.start && self.length == self.end - self.start + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::SourceContext;
    use crate::syntax::parse_source;

    #[test]
    fn span_covers_contract_definition() {
        let src = "contract Empty {}";
        let unit = parse_source(src, &SourceContext::from_file("t", src)).unwrap();
        let contract = crate::syntax::find(&unit, Rule::contract_definition).unwrap();
        let span = SourceSpan::from_pair(&contract, 7);

        assert_eq!(span.line, 1);
        assert_eq!(span.column, 1);
        assert_eq!(span.start, 0);
        assert_eq!(span.end, src.len() - 1);
        assert_eq!(span.length, src.len());
        assert_eq!(span.parent_index, 7);
        assert!(span.is_consistent());
    }

    #[test]
    fn synthetic_span_reuses_owner_but_reparents() {
        let owner = SourceSpan {
            line: 3,
            column: 5,
            start: 40,
            end: 59,
            length: 20,
            parent_index: 2,
        };
        let synth = SourceSpan::synthetic(&owner, 11);
        assert_eq!(synth.start, owner.start);
        assert_eq!(synth.end, owner.end);
        assert_eq!(synth.length, owner.length);
        assert_eq!(synth.parent_index, 11);
        assert!(synth.is_consistent());
    }
}
