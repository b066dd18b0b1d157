//! Domain-level errors (no external dependencies)

use thiserror::Error;

/// Domain errors represent data-integrity violations in a question graph.
/// The interview engine never raises these; they surface when a graph is built or validated.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("root node not found: {0}")]
    MissingRoot(String),

    #[error("duplicate node id: {0}")]
    DuplicateNode(String),

    #[error("node {node} answer {answer} points to unknown node: {target}")]
    DanglingNext {
        node: String,
        answer: String,
        target: String,
    },

    #[error("node {node} refinement {refinement} collides with a different node definition")]
    RefinementConflict { node: String, refinement: String },

    #[error("invalid weight {weight} on node {node}: {message}")]
    InvalidWeight {
        node: String,
        weight: String,
        message: String,
    },

    #[error("graph has {} integrity defect(s): {}", .0.len(), join_defects(.0))]
    InvalidGraph(Vec<DomainError>),
}

fn join_defects(defects: &[DomainError]) -> String {
    defects
        .iter()
        .map(|d| d.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
