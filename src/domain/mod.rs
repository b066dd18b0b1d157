//! Domain layer: entities and business logic
//!
//! This layer is independent of external concerns (no I/O, no CLI, no config loading).

pub mod assembler;
pub mod entities;
pub mod error;
pub mod expander;
pub mod graph;
pub mod normalizer;
pub mod sanitizer;
pub mod subject;

pub use assembler::{AssemblyRules, PromptAssembler, BASE_NEGATIVE};
pub use entities::*;
pub use error::DomainError;
pub use graph::NodeGraph;
pub use sanitizer::{GrammarSanitizer, Sanitizer};

/// Expand `~`, `$VAR` and `${VAR}` in a path-like string.
///
/// Falls back to the input when a variable cannot be resolved.
pub fn expand_env_vars(path: &str) -> String {
    shellexpand::full(path)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| path.to_string())
}
