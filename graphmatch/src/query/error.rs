//! Query error types.

use thiserror::Error;

use crate::store::StoreError;

/// Errors that can occur while compiling or running a query.
///
/// Absence of matching data is never an error: a query that matches nothing
/// produces an empty result stream.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    /// The pattern is structurally invalid.
    #[error("invalid query: {0}")]
    Format(String),

    /// The query cannot be executed as written.
    #[error("query execution failed: {0}")]
    Execution(String),

    /// The live branch set, or a single batched lookup, grew past the configured limit.
    #[error("query exceeded the limit of {limit} candidate branches")]
    BranchLimit { limit: usize },

    /// The run was cancelled through its cancellation token.
    #[error("query cancelled")]
    Cancelled,

    /// The join engine reached a state its classification rules out.
    #[error("internal query engine error: {0}")]
    Internal(String),

    /// The source failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl QueryError {
    pub fn format(message: impl Into<String>) -> Self {
        Self::Format(message.into())
    }

    pub fn execution(message: impl Into<String>) -> Self {
        Self::Execution(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }
}

/// Result type for query operations.
pub type QueryResult<T> = Result<T, QueryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(
            QueryError::format("no statements").to_string(),
            "invalid query: no statements"
        );
        assert_eq!(
            QueryError::BranchLimit { limit: 10 }.to_string(),
            "query exceeded the limit of 10 candidate branches"
        );
        assert_eq!(
            QueryError::from(StoreError::Backend("disk".to_owned())).to_string(),
            "store backend error: disk"
        );
    }
}
