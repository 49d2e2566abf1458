//! Lightning node monitoring shared types.
//!
//! This crate holds the backend-agnostic domain models, the channel filter options and the
//! [`Backend`] trait that every node implementation exposes to the presentation layers.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

pub mod backend;
pub mod error;
pub mod models;
pub mod options;

pub use backend::Backend;
pub use error::Error;
pub use models::{
    Channel, ChannelBalance, ChannelStatus, Hop, HopHint, Htlc, Invoice, InvoiceState, PayReq,
    Payment, Route, RouteHint, WalletBalance,
};
pub use options::{ChannelOption, ChannelOptions};
