//! AST construction: node model, builders, and resolution.

pub mod builder;
pub mod context;
pub mod contracts;
pub mod declarations;
pub mod expressions;
pub mod functions;
pub mod ids;
pub mod node;
pub mod scope;
pub mod serialize;
pub mod source_unit;
pub mod span;
pub mod statements;
pub mod types;

pub use builder::{AstBuilder, RootNode};
pub use context::{BuildContext, BuilderConfig};
pub use ids::IdAllocator;
pub use node::{Node, NodeType};
pub use scope::{Symbol, SymbolTable};
pub use source_unit::SourceUnit;
pub use span::SourceSpan;
pub use types::TypeDescription;
