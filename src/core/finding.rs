use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::literal::LiteralValue;
use super::signatures::Category;

/// Position of a match inside the scanned tree; `file` is relative to the
/// scan root with `/` separators, `line` and `column` are 1-based.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Location {
    pub file: String,
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(file: impl Into<String>, line: usize, column: usize) -> Self {
        Self {
            file: file.into(),
            line,
            column,
        }
    }
}

/// One detected usage occurrence, produced by the pattern matcher.
#[derive(Debug, Clone, PartialEq)]
pub struct Finding {
    pub category: Category,
    /// Symbol reported for the match, e.g. `ChatOpenAI` or `FAISS.from_documents`.
    pub symbol: String,
    /// Callee (or module) name after import-alias resolution.
    pub qualified_name: String,
    /// Callee (or module) text as written in the source.
    pub call: String,
    pub location: Location,
    pub arguments: BTreeMap<String, LiteralValue>,
    /// Name of the argument used for identity, when the signature has one.
    pub primary: Option<String>,
    pub provider: Option<String>,
}

impl Finding {
    /// Resolved identity value; `None` when the primary argument is missing
    /// or not fully resolved.
    pub fn primary_value(&self) -> Option<String> {
        let name = self.primary.as_ref()?;
        self.arguments.get(name).and_then(LiteralValue::render)
    }

    pub fn is_fully_resolved(&self) -> bool {
        self.arguments.values().all(LiteralValue::is_resolved)
    }
}
