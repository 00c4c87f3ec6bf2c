use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZanzibarError {
    /// Intermediate node whose operation is not union, intersection or exclusion
    #[error("Internal error: unknown expand operation `{operation}` at {node}")]
    UnknownSetOperation { operation: String, node: String },

    /// Node that is neither intermediate nor leaf
    #[error("Internal error: unknown tree node type at {node}")]
    UnknownNodeType { node: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl ZanzibarError {
    /// True for faults caused by a structurally impossible expansion tree.
    /// These point at a bug upstream and must not be retried.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            ZanzibarError::UnknownSetOperation { .. } | ZanzibarError::UnknownNodeType { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, ZanzibarError>;
