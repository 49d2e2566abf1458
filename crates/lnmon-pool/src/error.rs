//! Pool errors

use std::time::Duration;

use thiserror::Error;

/// Pool error
#[derive(Debug, Error)]
pub enum Error {
    /// Pool was configured without any slot
    #[error("Pool capacity must be greater than zero")]
    InvalidCapacity,
    /// No slot was freed before the acquire deadline
    #[error("No connection available after waiting {waited:?}")]
    Unavailable {
        /// How long the caller waited for a slot
        waited: Duration,
    },
    /// A slot was free but no connection could be dialed
    #[error("Could not dial a new connection: {0}")]
    Exhausted(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// Mutex Poison Error
    #[error("Internal: PoisonError")]
    Poison,
}
