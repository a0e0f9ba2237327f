pub mod analyzer;
pub mod finding;
pub mod inventory;
pub mod literal;
pub mod matcher;
pub mod scanner;
pub mod signatures;
pub mod versions;

pub use analyzer::CodebaseAnalyzer;
pub use finding::{Finding, Location};
pub use inventory::{IdentityKey, Inventory, InventoryBuilder, InventoryEntry, InventoryMetadata};
pub use literal::LiteralValue;
pub use matcher::PatternMatcher;
pub use scanner::FileScanner;
pub use signatures::{Category, SignatureRegistry};
