use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tree_sitter::{Language, Node as TSNode, Parser, Tree};

use crate::error::{AibomError, Result};

/// Source text together with its syntax tree.
pub struct ParsedSource {
    pub source: String,
    pub tree: Tree,
}

impl ParsedSource {
    pub fn source_bytes(&self) -> &[u8] {
        self.source.as_bytes()
    }
}

pub struct TreeSitterParser {
    parser: Parser,
}

impl TreeSitterParser {
    pub fn new(language: Language) -> Result<Self> {
        let mut parser = Parser::new();
        parser.set_language(language)?;
        Ok(Self { parser })
    }

    /// Parse a file, rejecting trees that contain syntax errors.
    pub fn parse_file(&mut self, file_path: &Path) -> Result<ParsedSource> {
        let source = self.read_file_optimized(file_path)?;
        self.parse_source(file_path, source)
    }

    pub fn parse_source(&mut self, file_path: &Path, source: String) -> Result<ParsedSource> {
        let tree = self
            .parser
            .parse(&source, None)
            .ok_or_else(|| AibomError::Parse {
                path: file_path.to_path_buf(),
                message: "parser produced no tree".to_string(),
            })?;

        if let Some(error) = first_error(&tree.root_node()) {
            let position = error.start_position();
            return Err(AibomError::Parse {
                path: file_path.to_path_buf(),
                message: format!(
                    "syntax error at line {}, column {}",
                    position.row + 1,
                    position.column + 1
                ),
            });
        }

        Ok(ParsedSource { source, tree })
    }

    /// Buffered read sized to the file.
    fn read_file_optimized(&self, file_path: &Path) -> Result<String> {
        let io_err = |e| AibomError::io(file_path, e);
        let file = File::open(file_path).map_err(io_err)?;
        let file_size = file.metadata().map_err(io_err)?.len() as usize;

        let mut reader = BufReader::with_capacity(file_size.clamp(1, 8192), file);
        let mut content = String::with_capacity(file_size);
        reader.read_to_string(&mut content).map_err(io_err)?;
        Ok(content)
    }
}

pub fn extract_text<'a>(node: &TSNode, source: &'a [u8]) -> &'a str {
    std::str::from_utf8(&source[node.byte_range()]).unwrap_or("")
}

/// First `ERROR` or missing node in document order.
pub fn first_error<'t>(node: &TSNode<'t>) -> Option<TSNode<'t>> {
    if !node.has_error() {
        return None;
    }
    let mut stack = vec![*node];
    while let Some(current) = stack.pop() {
        if current.is_error() || current.is_missing() {
            return Some(current);
        }
        let mut cursor = current.walk();
        let children: Vec<TSNode<'t>> = current
            .children(&mut cursor)
            .filter(|child| child.has_error())
            .collect();
        stack.extend(children.into_iter().rev());
    }
    Some(*node)
}
