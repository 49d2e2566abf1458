//! lnmon backend for LND
//!
//! Every operation leases a [`Client`] from the pool, issues one call, translates the response
//! and gives the connection back. The invoice subscription keeps its client for as long as the
//! stream lives.

#![warn(missing_docs)]
#![warn(rustdoc::bare_urls)]

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use futures::StreamExt;
use lnmon_common::{
    Backend, Channel, ChannelBalance, ChannelOption, ChannelOptions, Invoice, PayReq, Payment,
    WalletBalance,
};
use lnmon_pool::{Dialer, Pool, PoolConfig};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::instrument;

pub mod client;
pub mod error;
pub mod facade;
pub mod rpc;
pub mod translate;

pub use client::{LndConnection, LndDialer};
pub use error::Error;
pub use facade::Client;
pub use rpc::{InvoiceStream, LightningConnection, LightningRpc, LndStub};

/// Generated lnrpc types
pub mod lnrpc {
    tonic::include_proto!("lnrpc");
}

/// Seconds an invoice created by [`Lnd::create_invoice`] stays payable
pub const DEFAULT_INVOICE_EXPIRY: i64 = 3600;

fn unix_time() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_secs() as i64)
        .unwrap_or_default()
}

/// Lnd backend
pub struct Lnd<D = LndDialer>
where
    D: Dialer,
    D::Connection: LightningConnection,
{
    name: String,
    pool: Arc<Pool<D>>,
}

impl<D> std::fmt::Debug for Lnd<D>
where
    D: Dialer,
    D::Connection: LightningConnection,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lnd")
            .field("name", &self.name)
            .field("pool", &self.pool)
            .finish()
    }
}

impl Lnd<LndDialer> {
    /// Create new [`Lnd`]
    pub fn new(name: impl Into<String>, dialer: LndDialer, config: PoolConfig) -> Result<Self, Error> {
        Self::with_dialer(name, dialer, config)
    }
}

impl<D> Lnd<D>
where
    D: Dialer,
    D::Connection: LightningConnection,
{
    /// Create new [`Lnd`] over any [`Dialer`]
    pub fn with_dialer(
        name: impl Into<String>,
        dialer: D,
        config: PoolConfig,
    ) -> Result<Self, Error> {
        Ok(Self {
            name: name.into(),
            pool: Pool::new(dialer, config)?,
        })
    }

    /// Connection pool of the node
    pub fn pool(&self) -> &Arc<Pool<D>> {
        &self.pool
    }

    /// Lease a client from the pool
    pub async fn client(&self) -> Result<Client<D>, Error> {
        Client::acquire(&self.pool).await
    }

    /// Give the client back and return the outcome of the call it served
    fn finish<T>(client: Client<D>, result: Result<T, Error>) -> Result<T, Error> {
        let released = client.release();
        if let Err(err) = &released {
            tracing::error!("Could not release lnd client: {}", err);
        }

        let value = result?;
        released?;
        Ok(value)
    }

    /// On-chain wallet balance
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn get_wallet_balance(&self) -> Result<WalletBalance, Error> {
        let mut client = self.client().await?;

        tracing::debug!("Getting wallet balance");

        let result = client
            .wallet_balance(lnrpc::WalletBalanceRequest {})
            .await
            .map_err(|status| Error::rpc("WalletBalance", "", status));

        let balance = WalletBalance::from(Self::finish(client, result)?);

        tracing::debug!(
            total = balance.total_balance,
            confirmed = balance.confirmed_balance,
            "Wallet balance retrieved"
        );

        Ok(balance)
    }

    /// Balance locked in channels
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn get_channel_balance(&self) -> Result<ChannelBalance, Error> {
        let mut client = self.client().await?;

        tracing::debug!("Getting channel balance");

        let result = client
            .channel_balance(lnrpc::ChannelBalanceRequest {})
            .await
            .map_err(|status| Error::rpc("ChannelBalance", "", status));

        let balance = ChannelBalance::from(Self::finish(client, result)?);

        tracing::debug!(balance = balance.balance, "Channel balance retrieved");

        Ok(balance)
    }

    /// Channels matching every given filter
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn list_channels(&self, options: &[ChannelOption]) -> Result<Vec<Channel>, Error> {
        let options = ChannelOptions::new(options);
        let mut client = self.client().await?;

        tracing::debug!(?options, "Listing channels");

        let request = lnrpc::ListChannelsRequest {
            active_only: options.active,
            inactive_only: options.inactive,
            public_only: options.public,
            private_only: options.private,
            peer: Vec::new(),
        };

        let result = client
            .list_channels(request)
            .await
            .map_err(|status| {
                Error::rpc(
                    "ListChannels",
                    format!(
                        "active={}, inactive={}, public={}, private={}",
                        options.active, options.inactive, options.public, options.private
                    ),
                    status,
                )
            });

        let channels: Vec<Channel> = Self::finish(client, result)?
            .channels
            .into_iter()
            .map(Channel::from)
            .collect();

        tracing::debug!(count = channels.len(), "Channels listed");

        Ok(channels)
    }

    /// Create an invoice payable for [`DEFAULT_INVOICE_EXPIRY`] seconds
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn create_invoice(&self, amount: i64, description: &str) -> Result<Invoice, Error> {
        let mut client = self.client().await?;

        tracing::debug!(amount, description, "Creating invoice");

        let request = lnrpc::Invoice {
            value: amount,
            memo: description.to_string(),
            creation_date: unix_time(),
            expiry: DEFAULT_INVOICE_EXPIRY,
            ..Default::default()
        };

        let result = client.add_invoice(request.clone()).await.map_err(|status| {
            Error::rpc(
                "AddInvoice",
                format!("amount={amount}, description={description}"),
                status,
            )
        });

        let invoice = translate::invoice_from_add(request, Self::finish(client, result)?);

        tracing::debug!(
            r_hash = %invoice.r_hash,
            payment_request = %invoice.payment_request,
            "Invoice created"
        );

        Ok(invoice)
    }

    /// Look up an invoice by its hex payment hash
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn get_invoice(&self, r_hash: &str) -> Result<Invoice, Error> {
        let mut client = self.client().await?;

        tracing::debug!(r_hash, "Getting invoice");

        let request = lnrpc::PaymentHash {
            r_hash_str: r_hash.to_string(),
            ..Default::default()
        };

        let result = client
            .lookup_invoice(request)
            .await
            .map_err(|status| Error::rpc("LookupInvoice", format!("r_hash={r_hash}"), status));

        let invoice = Invoice::from(Self::finish(client, result)?);

        tracing::debug!(r_hash, state = ?invoice.state, "Invoice retrieved");

        Ok(invoice)
    }

    /// Pay a decoded payment request, only its encoded form is sent to the node
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn send_payment(&self, pay_req: &PayReq) -> Result<Payment, Error> {
        let mut client = self.client().await?;

        tracing::debug!(
            destination = %pay_req.destination,
            amount = pay_req.amount,
            "Sending payment"
        );

        let request = lnrpc::SendRequest {
            payment_request: pay_req.raw.clone(),
            ..Default::default()
        };

        let result = client.send_payment_sync(request).await.map_err(|status| {
            Error::rpc(
                "SendPaymentSync",
                format!(
                    "destination={}, amount={}",
                    pay_req.destination, pay_req.amount
                ),
                status,
            )
        });

        let payment = translate::payment_from_send(pay_req, Self::finish(client, result)?);

        match &payment.payment_error {
            None => tracing::debug!(payment_hash = %payment.payment_hash, "Payment sent"),
            Some(err) => tracing::warn!(payment_hash = %payment.payment_hash, "Payment failed: {}", err),
        }

        Ok(payment)
    }

    /// Decode a BOLT11 payment request
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn decode_pay_req(&self, pay_req: &str) -> Result<PayReq, Error> {
        let mut client = self.client().await?;

        tracing::debug!(pay_req, "Decoding payment request");

        let request = lnrpc::PayReqString {
            pay_req: pay_req.to_string(),
        };

        let result = client
            .decode_pay_req(request)
            .await
            .map_err(|status| Error::rpc("DecodePayReq", format!("pay_req={pay_req}"), status));

        let decoded = translate::pay_req_from_proto(Self::finish(client, result)?, pay_req);

        tracing::info!(
            destination = %decoded.destination,
            amount = decoded.amount,
            description = %decoded.description,
            "Payment request decoded"
        );

        Ok(decoded)
    }

    /// Forward invoice updates to `sender` until the stream ends, fails or `cancel` fires.
    ///
    /// One client is leased for the whole subscription and released when the loop exits. The
    /// returned error tells why the subscription stopped, there is no resubscription.
    #[instrument(skip_all, fields(node = %self.name))]
    pub async fn subscribe_invoice(
        &self,
        cancel: CancellationToken,
        sender: mpsc::Sender<Invoice>,
    ) -> Result<(), Error> {
        let mut client = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(Error::Cancelled),
            client = self.client() => client?,
        };

        let reason = Self::stream_invoices(&mut client, &cancel, &sender).await;

        match &reason {
            Error::Cancelled | Error::SubscriberGone => {
                tracing::info!("Invoice subscription stopped: {}", reason)
            }
            _ => tracing::warn!("Invoice subscription ended: {}", reason),
        }

        Self::finish(client, Err(reason))
    }

    async fn stream_invoices(
        client: &mut Client<D>,
        cancel: &CancellationToken,
        sender: &mpsc::Sender<Invoice>,
    ) -> Error {
        let subscribed = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Error::Cancelled,
            stream = client.subscribe_invoices(lnrpc::InvoiceSubscription::default()) => stream,
        };

        let mut stream = match subscribed {
            Ok(stream) => stream,
            Err(status) => return Error::rpc("SubscribeInvoices", "", status),
        };

        tracing::info!(endpoint = %client.target(), "Subscribed to invoices");

        loop {
            // Wait for room in the channel before pulling the next update
            let permit = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Error::Cancelled,
                permit = sender.reserve() => match permit {
                    Ok(permit) => permit,
                    Err(_) => return Error::SubscriberGone,
                },
            };

            let message = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Error::Cancelled,
                message = stream.next() => message,
            };

            let invoice = match message {
                Some(Ok(invoice)) => Invoice::from(invoice),
                Some(Err(status)) => {
                    client.observe_status(&status);
                    return Error::rpc("SubscribeInvoices", "receive", status);
                }
                None => return Error::StreamClosed,
            };

            tracing::debug!(
                r_hash = %invoice.r_hash,
                state = ?invoice.state,
                "Invoice update"
            );

            permit.send(invoice);
        }
    }
}

#[async_trait]
impl<D> Backend for Lnd<D>
where
    D: Dialer,
    D::Connection: LightningConnection,
{
    type Err = lnmon_common::Error;

    fn node_name(&self) -> &str {
        &self.name
    }

    async fn get_wallet_balance(&self) -> Result<WalletBalance, Self::Err> {
        Ok(Lnd::<D>::get_wallet_balance(self).await?)
    }

    async fn get_channel_balance(&self) -> Result<ChannelBalance, Self::Err> {
        Ok(Lnd::<D>::get_channel_balance(self).await?)
    }

    async fn list_channels(&self, options: &[ChannelOption]) -> Result<Vec<Channel>, Self::Err> {
        Ok(Lnd::<D>::list_channels(self, options).await?)
    }

    async fn create_invoice(&self, amount: i64, description: &str) -> Result<Invoice, Self::Err> {
        Ok(Lnd::<D>::create_invoice(self, amount, description).await?)
    }

    async fn get_invoice(&self, r_hash: &str) -> Result<Invoice, Self::Err> {
        Ok(Lnd::<D>::get_invoice(self, r_hash).await?)
    }

    async fn send_payment(&self, pay_req: &PayReq) -> Result<Payment, Self::Err> {
        Ok(Lnd::<D>::send_payment(self, pay_req).await?)
    }

    async fn decode_pay_req(&self, pay_req: &str) -> Result<PayReq, Self::Err> {
        Ok(Lnd::<D>::decode_pay_req(self, pay_req).await?)
    }

    async fn subscribe_invoice(
        &self,
        cancel: CancellationToken,
        sender: mpsc::Sender<Invoice>,
    ) -> Result<(), Self::Err> {
        Ok(Lnd::<D>::subscribe_invoice(self, cancel, sender).await?)
    }
}
