//! Backend errors

use thiserror::Error;

/// Error surfaced through the [`crate::Backend`] trait
#[derive(Debug, Error)]
pub enum Error {
    /// Error of the node implementation
    #[error(transparent)]
    Lightning(Box<dyn std::error::Error + Send + Sync>),
    /// Custom
    #[error("`{0}`")]
    Custom(String),
}
