//! Source-set management.
//!
//! A build consumes an ordered collection of named, pre-loaded files plus an
//! optional entry unit name. File content is read up front; nothing touches
//! the filesystem mid-build.

use std::fs;
use std::path::Path;

use walkdir::WalkDir;

use crate::errors::{unspanned, DiagnosticInfo, ErrorKind, SolastError, SourceContext, SourceInfo};

/// One pre-loaded input file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub name: String,
    pub path: String,
    pub content: String,
}

impl SourceFile {
    pub fn new(
        name: impl Into<String>,
        path: impl Into<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            path: path.into(),
            content: content.into(),
        }
    }

    pub fn from_path(path: &Path) -> Result<Self, SolastError> {
        let content = fs::read_to_string(path).map_err(|e| read_error(path, &e.to_string()))?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| path.display().to_string());
        Ok(Self {
            name,
            path: path.display().to_string(),
            content,
        })
    }
}

/// The ordered inputs of one build.
#[derive(Debug, Clone, Default)]
pub struct SourceSet {
    files: Vec<SourceFile>,
    entry: Option<String>,
}

impl SourceSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, file: SourceFile) {
        self.files.push(file);
    }

    pub fn with_entry(mut self, entry: impl Into<String>) -> Self {
        self.entry = Some(entry.into());
        self
    }

    pub fn entry(&self) -> Option<&str> {
        self.entry.as_deref()
    }

    pub fn iter(&self) -> impl Iterator<Item = &SourceFile> {
        self.files.iter()
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Load every `.sol` file under a directory, sorted by path so builds
    /// are reproducible regardless of directory iteration order.
    pub fn from_dir(root: &Path) -> Result<Self, SolastError> {
        let mut paths = Vec::new();
        for entry in WalkDir::new(root).follow_links(false) {
            let entry = entry.map_err(|e| read_error(root, &e.to_string()))?;
            if entry.file_type().is_file()
                && entry.path().extension().is_some_and(|ext| ext == "sol")
            {
                paths.push(entry.into_path());
            }
        }
        paths.sort();

        let mut set = Self::new();
        for path in paths {
            set.push(SourceFile::from_path(&path)?);
        }
        Ok(set)
    }
}

fn read_error(path: &Path, message: &str) -> SolastError {
    SolastError {
        kind: ErrorKind::SourceNotFound {
            path: path.display().to_string(),
            message: message.to_string(),
        },
        source_info: SourceInfo {
            source: SourceContext::fallback(&path.display().to_string()).to_named_source(),
            primary_span: unspanned(),
            phase: "input".to_string(),
        },
        diagnostic_info: DiagnosticInfo {
            help: Some("check that the path exists and is readable".to_string()),
            error_code: "solast::input::source_not_found".to_string(),
        },
    }
}
