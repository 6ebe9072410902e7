//! Solast error handling — unified diagnostic API.
//!
//! One error type carries what went wrong, where in the source it happened,
//! and how to help. Only programmer-error-class conditions (grammar/AST
//! contract violations) cross component boundaries; recoverable conditions
//! are absorbed where they are detected and the build continues with
//! placeholder data.

use std::fmt;
use std::sync::Arc;

use miette::{Diagnostic, LabeledSpan, NamedSource, SourceSpan};

// ============================================================================
// SOURCE CONTEXT - Error reporting infrastructure
// ============================================================================

/// Source context for error reporting: the file name and content a span
/// points into.
#[derive(Debug, Clone)]
pub struct SourceContext {
    pub name: String,
    pub content: String,
}

impl SourceContext {
    /// Create a source context from real file content.
    pub fn from_file(name: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            content: content.into(),
        }
    }

    /// Create a fallback when real source is unavailable.
    pub fn fallback(context: &str) -> Self {
        Self {
            name: "fallback".to_string(),
            content: format!("// {}", context),
        }
    }

    pub fn to_named_source(&self) -> Arc<NamedSource<String>> {
        Arc::new(NamedSource::new(self.name.clone(), self.content.clone()))
    }
}

impl Default for SourceContext {
    fn default() -> Self {
        Self::fallback("default context")
    }
}

// ============================================================================
// ERROR TYPE
// ============================================================================

/// The single error type - essential data only.
#[derive(Debug)]
pub struct SolastError {
    /// What went wrong.
    pub kind: ErrorKind,
    /// Where it happened.
    pub source_info: SourceInfo,
    /// How to help.
    pub diagnostic_info: DiagnosticInfo,
}

/// All error kinds as a clean enum.
#[derive(Debug, Clone, PartialEq)]
pub enum ErrorKind {
    // Parse errors - the grammar rejected the input
    MalformedConstruct {
        construct: String,
    },
    MissingElement {
        element: String,
    },
    InvalidLiteral {
        literal_type: String,
        value: String,
    },

    // Build errors - grammar/AST contract violations (programmer-error class)
    OperandArity {
        operator: String,
        expected: usize,
        actual: usize,
    },
    UnsupportedProduction {
        production: String,
    },

    // Type errors - raw type text the synthesizer cannot canonicalize
    UnsupportedType {
        raw: String,
    },

    // Input errors - source set problems surfaced before any build starts
    SourceNotFound {
        path: String,
        message: String,
    },
}

/// Context-specific source information.
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub source: Arc<NamedSource<String>>,
    pub primary_span: SourceSpan,
    pub phase: String,
}

/// Diagnostic enhancement data.
#[derive(Debug, Clone)]
pub struct DiagnosticInfo {
    pub help: Option<String>,
    pub error_code: String,
}

// ============================================================================
// ERROR CREATION
// ============================================================================

/// Context-aware error creation - each build context knows how to create
/// appropriately attributed errors.
pub trait ErrorReporting {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> SolastError;

    fn malformed_construct(&self, construct: &str, span: SourceSpan) -> SolastError {
        self.report(
            ErrorKind::MalformedConstruct {
                construct: construct.into(),
            },
            span,
        )
    }

    fn missing_element(&self, element: &str, span: SourceSpan) -> SolastError {
        self.report(
            ErrorKind::MissingElement {
                element: element.into(),
            },
            span,
        )
    }

    fn invalid_literal(&self, literal_type: &str, value: &str, span: SourceSpan) -> SolastError {
        self.report(
            ErrorKind::InvalidLiteral {
                literal_type: literal_type.into(),
                value: value.into(),
            },
            span,
        )
    }

    fn operand_arity(
        &self,
        operator: &str,
        expected: usize,
        actual: usize,
        span: SourceSpan,
    ) -> SolastError {
        self.report(
            ErrorKind::OperandArity {
                operator: operator.into(),
                expected,
                actual,
            },
            span,
        )
    }

    fn unsupported_production(&self, production: &str, span: SourceSpan) -> SolastError {
        self.report(
            ErrorKind::UnsupportedProduction {
                production: production.into(),
            },
            span,
        )
    }
}

impl ErrorKind {
    /// Error category, used by tests and diagnostic codes.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Self::MalformedConstruct { .. }
            | Self::MissingElement { .. }
            | Self::InvalidLiteral { .. } => ErrorCategory::Parse,
            Self::OperandArity { .. } | Self::UnsupportedProduction { .. } => ErrorCategory::Build,
            Self::UnsupportedType { .. } => ErrorCategory::Type,
            Self::SourceNotFound { .. } => ErrorCategory::Input,
        }
    }

    pub const fn code_suffix(&self) -> &'static str {
        match self {
            Self::MalformedConstruct { .. } => "malformed_construct",
            Self::MissingElement { .. } => "missing_element",
            Self::InvalidLiteral { .. } => "invalid_literal",
            Self::OperandArity { .. } => "operand_arity",
            Self::UnsupportedProduction { .. } => "unsupported_production",
            Self::UnsupportedType { .. } => "unsupported_type",
            Self::SourceNotFound { .. } => "source_not_found",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Parse,
    Build,
    Type,
    Input,
}

// ============================================================================
// DISPLAY AND DIAGNOSTIC IMPLEMENTATIONS
// ============================================================================

impl std::error::Error for SolastError {}

impl fmt::Display for SolastError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ErrorKind::MalformedConstruct { construct } => {
                write!(f, "Parse error: malformed {}", construct)
            }
            ErrorKind::MissingElement { element } => {
                write!(f, "Parse error: missing {}", element)
            }
            ErrorKind::InvalidLiteral {
                literal_type,
                value,
            } => {
                write!(f, "Parse error: invalid {} '{}'", literal_type, value)
            }
            ErrorKind::OperandArity {
                operator,
                expected,
                actual,
            } => {
                write!(
                    f,
                    "Build error: operator '{}' requires {} operands, found {}",
                    operator, expected, actual
                )
            }
            ErrorKind::UnsupportedProduction { production } => {
                write!(f, "Build error: unsupported production '{}'", production)
            }
            ErrorKind::UnsupportedType { raw } => {
                write!(f, "Type error: cannot canonicalize '{}'", raw)
            }
            ErrorKind::SourceNotFound { path, message } => {
                write!(f, "Input error: {} ({})", path, message)
            }
        }
    }
}

impl Diagnostic for SolastError {
    fn code<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        Some(Box::new(&self.diagnostic_info.error_code))
    }

    fn help<'a>(&'a self) -> Option<Box<dyn fmt::Display + 'a>> {
        self.diagnostic_info
            .help
            .as_ref()
            .map(|h| Box::new(h) as Box<dyn fmt::Display>)
    }

    fn labels(&self) -> Option<Box<dyn Iterator<Item = LabeledSpan> + '_>> {
        let labels = vec![LabeledSpan::new_with_span(
            Some(self.primary_label()),
            self.source_info.primary_span,
        )];
        Some(Box::new(labels.into_iter()))
    }

    fn source_code(&self) -> Option<&dyn miette::SourceCode> {
        Some(&*self.source_info.source)
    }
}

impl SolastError {
    fn primary_label(&self) -> String {
        match &self.kind {
            ErrorKind::MalformedConstruct { .. } => "malformed syntax".into(),
            ErrorKind::MissingElement { .. } => "missing here".into(),
            ErrorKind::InvalidLiteral { .. } => "invalid literal".into(),
            ErrorKind::OperandArity { .. } => "wrong operand count".into(),
            ErrorKind::UnsupportedProduction { .. } => "unsupported construct".into(),
            ErrorKind::UnsupportedType { .. } => "unsupported type".into(),
            ErrorKind::SourceNotFound { .. } => "missing source".into(),
        }
    }
}

// ============================================================================
// UTILITIES
// ============================================================================

/// Placeholder span for errors not tied to a source location (I/O failures,
/// internal state problems).
pub fn unspanned() -> SourceSpan {
    SourceSpan::from(0..0)
}

/// Bridges a pest span to the miette span format.
pub fn to_source_span(start: usize, end: usize) -> SourceSpan {
    SourceSpan::from(start..end)
}

/// General-purpose error creation context for a named build phase.
pub struct BuildPhase {
    pub source: SourceContext,
    pub phase: String,
}

impl BuildPhase {
    pub fn new(source: SourceContext, phase: impl Into<String>) -> Self {
        Self {
            source,
            phase: phase.into(),
        }
    }
}

impl ErrorReporting for BuildPhase {
    fn report(&self, kind: ErrorKind, span: SourceSpan) -> SolastError {
        let error_code = format!("solast::{}::{}", self.phase, kind.code_suffix());
        SolastError {
            kind,
            source_info: SourceInfo {
                source: self.source.to_named_source(),
                primary_span: span,
                phase: self.phase.clone(),
            },
            diagnostic_info: DiagnosticInfo {
                help: None,
                error_code,
            },
        }
    }
}

/// Prints a SolastError with full miette diagnostics.
pub fn print_error(error: SolastError) {
    use miette::Report;
    let report = Report::new(error);
    eprintln!("{report:?}");
}
