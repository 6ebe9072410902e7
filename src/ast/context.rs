//! Shared build context.
//!
//! Every builder call receives one `BuildContext`: the shared ID allocator,
//! the tunable configuration, the read snapshot of the cross-file symbol
//! table, and the mutable in-file scope. Builders never reach for globals.

use pest::iterators::Pair;

use crate::ast::ids::IdAllocator;
use crate::ast::scope::{ScopeTable, SymbolTable};
use crate::ast::types::{contract_description, TypeDescription};
use crate::errors::{
    ErrorKind, ErrorReporting, SolastError, SourceContext, SourceInfo, DiagnosticInfo,
};
use crate::syntax::Rule;

/// Tunable builder knobs.
#[derive(Debug, Clone)]
pub struct BuilderConfig {
    /// A pragma directive is attributed to a contract when it starts within
    /// this many lines above the contract definition.
    pub pragma_window: usize,
    /// Same heuristic for import directives, which conventionally sit
    /// further from the contract they serve.
    pub import_window: usize,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            pragma_window: 10,
            import_window: 20,
        }
    }
}

/// Per-file build state threaded through every builder.
pub struct BuildContext<'a> {
    pub ids: &'a IdAllocator,
    pub config: &'a BuilderConfig,
    /// Snapshot of symbols exported by units finished before this one.
    pub symbols: &'a SymbolTable,
    pub scope: ScopeTable,
    pub source: SourceContext,
    /// ID of the source unit under construction.
    pub unit_id: i64,
}

impl<'a> BuildContext<'a> {
    pub fn new(
        ids: &'a IdAllocator,
        config: &'a BuilderConfig,
        symbols: &'a SymbolTable,
        source: SourceContext,
        unit_id: i64,
    ) -> Self {
        Self {
            ids,
            config,
            symbols,
            scope: ScopeTable::new(),
            source,
            unit_id,
        }
    }

    pub fn next_id(&self) -> i64 {
        self.ids.next_id()
    }

    /// Name resolution: in-file scopes first, then cross-file exported
    /// symbols. Not-found is not an error.
    pub fn resolve(&self, name: &str) -> Option<(i64, Option<TypeDescription>)> {
        if let Some(hit) = self.scope.resolve(name) {
            return Some(hit);
        }
        self.symbols
            .resolve(name)
            .map(|symbol| (symbol.id, Some(contract_description(&symbol.name))))
    }

    /// Miette span of a parse-tree production, for fatal build errors.
    pub fn span_of(&self, pair: &Pair<Rule>) -> miette::SourceSpan {
        let span = pair.as_span();
        crate::errors::to_source_span(span.start(), span.end())
    }
}

impl ErrorReporting for BuildContext<'_> {
    fn report(&self, kind: ErrorKind, span: miette::SourceSpan) -> SolastError {
        let error_code = format!("solast::ast::{}", kind.code_suffix());
        SolastError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: "ast".to_string(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}
