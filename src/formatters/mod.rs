pub mod cyclonedx;
pub mod json;
pub mod spdx;

pub use cyclonedx::CycloneDxFormatter;
pub use json::{to_stable_string, write_stable_json};
pub use spdx::SpdxFormatter;
