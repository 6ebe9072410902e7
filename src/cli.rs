//! Command-line interface.

use std::path::{Path, PathBuf};

use clap::{Parser, Subcommand};

use crate::ast::builder::{AstBuilder, RootNode};
use crate::ast::context::BuilderConfig;
use crate::ast::serialize;
use crate::errors::SolastError;
use crate::sources::{SourceFile, SourceSet};

#[derive(Parser, Debug)]
#[command(name = "solast", version, about = "Solidity source-to-AST builder")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Build the AST for a file or directory and print it as JSON.
    Ast {
        /// A `.sol` file or a directory scanned recursively.
        path: PathBuf,
        /// Entry source unit, by unit name or contract name.
        #[arg(long)]
        entry: Option<String>,
        /// Pragma attribution window, in lines.
        #[arg(long, default_value_t = 10)]
        pragma_window: usize,
        /// Import attribution window, in lines.
        #[arg(long, default_value_t = 20)]
        import_window: usize,
    },
    /// List harvested comments with their positions.
    Comments { path: PathBuf },
    /// List each source unit's exported symbols.
    Symbols { path: PathBuf },
}

pub fn run(cli: Cli) -> Result<(), SolastError> {
    match cli.command {
        Command::Ast {
            path,
            entry,
            pragma_window,
            import_window,
        } => {
            let config = BuilderConfig {
                pragma_window,
                import_window,
            };
            let root = build(&path, entry, config)?;
            match serialize::root_to_json(&root) {
                Ok(text) => println!("{text}"),
                Err(error) => eprintln!("serialization failed: {error}"),
            }
            Ok(())
        }
        Command::Comments { path } => {
            let root = build(&path, None, BuilderConfig::default())?;
            for comment in root.comments() {
                println!(
                    "{}:{}\t{}\t{}",
                    comment.src.line,
                    comment.src.column,
                    comment.node_type.as_str(),
                    comment.text
                );
            }
            Ok(())
        }
        Command::Symbols { path } => {
            let root = build(&path, None, BuilderConfig::default())?;
            for unit in root.source_units() {
                println!("{} ({})", unit.name, unit.absolute_path);
                for symbol in &unit.exported_symbols {
                    println!("  {}\t#{}", symbol.name, symbol.id);
                }
            }
            Ok(())
        }
    }
}

fn build(
    path: &Path,
    entry: Option<String>,
    config: BuilderConfig,
) -> Result<RootNode, SolastError> {
    let mut sources = if path.is_dir() {
        SourceSet::from_dir(path)?
    } else {
        let mut set = SourceSet::new();
        set.push(SourceFile::from_path(path)?);
        set
    };
    if let Some(entry) = entry {
        sources = sources.with_entry(entry);
    }
    AstBuilder::with_config(config).build(&sources)
}
