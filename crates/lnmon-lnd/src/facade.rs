//! Client facade: a remote stub paired with the pooled connection it runs on.

use std::sync::Arc;

use lnmon_pool::{Dialer, Pool, PooledConnection};
use tonic::{Code, Status};

use crate::rpc::{InvoiceStream, LightningConnection, LightningRpc};
use crate::{lnrpc, Error};

/// Codes meaning the transport itself failed rather than the call
fn is_transport_failure(status: &Status) -> bool {
    matches!(
        status.code(),
        Code::Unavailable | Code::Unknown | Code::Internal | Code::DeadlineExceeded | Code::Cancelled
    )
}

macro_rules! forward {
    ($(#[$meta:meta])* $name:ident($request:ty) -> $response:ty) => {
        $(#[$meta])*
        pub async fn $name(&mut self, request: $request) -> Result<$response, Status> {
            let result = self.stub.$name(request).await;
            self.inspect(result)
        }
    };
}

/// Leases one connection for the lifetime of an operation or a subscription.
///
/// The connection goes back to the pool exactly once, through [`Client::release`] or on drop.
pub struct Client<D>
where
    D: Dialer,
    D::Connection: LightningConnection,
{
    stub: <D::Connection as LightningConnection>::Stub,
    connection: PooledConnection<D>,
}

impl<D> std::fmt::Debug for Client<D>
where
    D: Dialer,
    D::Connection: LightningConnection,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("connection", &self.connection)
            .finish()
    }
}

impl<D> Client<D>
where
    D: Dialer,
    D::Connection: LightningConnection,
{
    /// Lease a connection from `pool` and bind a stub to it
    pub async fn acquire(pool: &Arc<Pool<D>>) -> Result<Self, Error> {
        let connection = pool.acquire().await?;
        let stub = connection.stub();

        tracing::debug!(endpoint = %connection.target(), "Acquired lnd client");

        Ok(Self { stub, connection })
    }

    /// Endpoint of the leased connection
    pub fn target(&self) -> String {
        self.connection.target()
    }

    /// Give the connection back to the pool
    pub fn release(self) -> Result<(), Error> {
        self.connection.release().map_err(Error::from)
    }

    fn inspect<T>(&mut self, result: Result<T, Status>) -> Result<T, Status> {
        if let Err(status) = &result {
            self.observe_status(status);
        }
        result
    }

    /// Stop reusing the connection if `status` reports a transport failure
    pub fn observe_status(&mut self, status: &Status) {
        if is_transport_failure(status) {
            tracing::warn!(
                endpoint = %self.connection.target(),
                code = ?status.code(),
                "Transport failure, connection will not be reused"
            );
            self.connection.mark_stale();
        }
    }

    forward!(
        /// `WalletBalance`
        wallet_balance(lnrpc::WalletBalanceRequest) -> lnrpc::WalletBalanceResponse
    );
    forward!(
        /// `ChannelBalance`
        channel_balance(lnrpc::ChannelBalanceRequest) -> lnrpc::ChannelBalanceResponse
    );
    forward!(
        /// `ListChannels`
        list_channels(lnrpc::ListChannelsRequest) -> lnrpc::ListChannelsResponse
    );
    forward!(
        /// `AddInvoice`
        add_invoice(lnrpc::Invoice) -> lnrpc::AddInvoiceResponse
    );
    forward!(
        /// `LookupInvoice`
        lookup_invoice(lnrpc::PaymentHash) -> lnrpc::Invoice
    );
    forward!(
        /// `SendPaymentSync`
        send_payment_sync(lnrpc::SendRequest) -> lnrpc::SendResponse
    );
    forward!(
        /// `DecodePayReq`
        decode_pay_req(lnrpc::PayReqString) -> lnrpc::PayReq
    );
    forward!(
        /// `SubscribeInvoices`
        subscribe_invoices(lnrpc::InvoiceSubscription) -> InvoiceStream
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transport_failures() {
        assert!(is_transport_failure(&Status::unavailable("connection refused")));
        assert!(is_transport_failure(&Status::deadline_exceeded("slow")));
        assert!(!is_transport_failure(&Status::not_found("unable to locate invoice")));
        assert!(!is_transport_failure(&Status::invalid_argument("bad hash")));
    }
}
