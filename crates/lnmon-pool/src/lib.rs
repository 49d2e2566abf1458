//! Bounded pool of transport connections to a single remote endpoint.
//!
//! The pool hands out [`PooledConnection`] leases. A lease is returned either explicitly with
//! [`PooledConnection::release`] or implicitly when it is dropped, so a connection can never be
//! released twice nor leaked on an early return.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod error;
mod pool;

pub use error::Error;
pub use pool::{Dialer, Pool, PoolConfig, PooledConnection, Transport};
