pub mod common;
pub mod python;

pub use common::{ParsedSource, TreeSitterParser};
pub use python::PythonParser;
