pub mod deletion;
pub mod loader;
pub mod orchestrator;
pub mod redaction;
pub mod rotation;
pub mod split;

pub use loader::{EditBundle, ValidationIssue};
pub use orchestrator::Pipeline;
