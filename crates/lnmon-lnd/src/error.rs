//! LND Errors

use std::path::PathBuf;

use thiserror::Error;

/// LND Error
#[derive(Debug, Error)]
pub enum Error {
    /// Could not lease a connection
    #[error(transparent)]
    Pool(#[from] lnmon_pool::Error),
    /// Remote call failed
    #[error("LND {call} failed ({context}): {source}")]
    Rpc {
        /// Name of the remote call
        call: &'static str,
        /// Key arguments of the call
        context: String,
        /// Status returned by the node
        #[source]
        source: tonic::Status,
    },
    /// The node closed the invoice stream
    #[error("LND invoice stream closed")]
    StreamClosed,
    /// The subscription was cancelled by its owner
    #[error("Invoice subscription cancelled")]
    Cancelled,
    /// The receiving side of the invoice channel was dropped
    #[error("Invoice subscriber is gone")]
    SubscriberGone,
    /// Could not read a credential file
    #[error("Could not read {0}: {1}")]
    ReadFile(PathBuf, #[source] std::io::Error),
    /// Invalid configuration
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    pub(crate) fn rpc(call: &'static str, context: impl Into<String>, source: tonic::Status) -> Self {
        Self::Rpc {
            call,
            context: context.into(),
            source,
        }
    }
}

impl From<Error> for lnmon_common::Error {
    fn from(e: Error) -> Self {
        Self::Lightning(Box::new(e))
    }
}
