//! solast — a Solidity source-to-AST builder.
//!
//! The pipeline: a pest grammar parses each file into typed productions;
//! the AST builders walk those productions and produce a node graph with
//! unique monotonic IDs, exact source spans, parent linkage, canonical type
//! descriptions, and best-effort cross-file reference resolution; the
//! finished tree serializes to a tagged JSON envelope.
//!
//! ```no_run
//! use solast::{AstBuilder, SourceFile, SourceSet};
//!
//! let mut sources = SourceSet::new();
//! sources.push(SourceFile::new("Token.sol", "Token.sol", "contract Token {}"));
//! let root = AstBuilder::new().build(&sources)?;
//! assert_eq!(root.unresolved_references(), 0);
//! # Ok::<(), solast::SolastError>(())
//! ```

pub mod ast;
pub mod cli;
pub mod errors;
pub mod sources;
pub mod syntax;

pub use ast::{AstBuilder, BuilderConfig, Node, NodeType, RootNode, SourceSpan, SourceUnit};
pub use errors::{print_error, ErrorKind, SolastError};
pub use sources::{SourceFile, SourceSet};
