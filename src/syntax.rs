//! Syntax module for the Solidity subset grammar.
//!
//! The parser here is the AST builder's external collaborator: it turns raw
//! source text into a tree of typed productions carrying byte spans and
//! line/column positions. Everything downstream of this module treats the
//! parse tree as read-only input and guards every child access.

pub mod parser;

pub use parser::{find, find_all, parse_source, Rule};
