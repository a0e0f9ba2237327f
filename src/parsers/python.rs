use std::path::Path;

use super::common::{ParsedSource, TreeSitterParser};
use crate::error::Result;

/// Python front end. Holds one tree-sitter parser that is reused across files.
pub struct PythonParser {
    inner: TreeSitterParser,
}

impl PythonParser {
    pub fn new() -> Result<Self> {
        Ok(Self {
            inner: TreeSitterParser::new(tree_sitter_python::language())?,
        })
    }

    pub fn parse_file(&mut self, file_path: &Path) -> Result<ParsedSource> {
        self.inner.parse_file(file_path)
    }

    /// Parse in-memory source; `file_path` is only used in error messages.
    pub fn parse_source(
        &mut self,
        file_path: &Path,
        source: impl Into<String>,
    ) -> Result<ParsedSource> {
        self.inner.parse_source(file_path, source.into())
    }
}
