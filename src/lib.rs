//! # AIBOM
//!
//! Static AI bill of materials for Python codebases.
//!
//! AIBOM walks a source tree with tree-sitter, recognizes AI/ML usage
//! (models, datasets, tools, frameworks and prompt templates) and turns it
//! into an inventory that can be validated, diffed against a baseline and
//! packed into a hash-manifested evidence bundle.
//!
//! ## Pipeline
//!
//! - **Scan**: [`core::scanner`] and [`parsers`] produce syntax trees
//! - **Match**: [`core::matcher`] checks imports and calls against a
//!   [`core::signatures::SignatureRegistry`]
//! - **Build**: [`core::inventory`] deduplicates findings by identity key
//! - **Use**: [`validation`], [`drift`], [`evidence`], [`risk`], [`formatters`]

pub mod config;
pub mod core;
pub mod drift;
pub mod error;
pub mod evidence;
pub mod formatters;
pub mod parsers;
pub mod provenance;
pub mod risk;
pub mod storage;
pub mod validation;

pub use crate::core::{CodebaseAnalyzer, Inventory};
pub use config::ScanConfig;
pub use error::{AibomError, Result};

/// Version of the inventory document contract.
pub const SCHEMA_VERSION: &str = "1.0";
pub const TOOL_NAME: &str = "aibom";
pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");
