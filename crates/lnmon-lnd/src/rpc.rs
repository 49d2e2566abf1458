//! Remote stub
//!
//! [`LightningRpc`] is the call surface the backend needs from lnd. [`LndStub`] forwards it to the
//! generated tonic client; tests substitute their own implementation.

use std::pin::Pin;

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use lnmon_pool::Transport;
use tonic::{Response, Status};

use crate::client::LightningClient;
use crate::lnrpc;

/// Server stream of invoice updates
pub type InvoiceStream = Pin<Box<dyn Stream<Item = Result<lnrpc::Invoice, Status>> + Send>>;

/// Calls issued against a node
#[async_trait]
pub trait LightningRpc: Send {
    /// `WalletBalance`
    async fn wallet_balance(
        &mut self,
        request: lnrpc::WalletBalanceRequest,
    ) -> Result<lnrpc::WalletBalanceResponse, Status>;

    /// `ChannelBalance`
    async fn channel_balance(
        &mut self,
        request: lnrpc::ChannelBalanceRequest,
    ) -> Result<lnrpc::ChannelBalanceResponse, Status>;

    /// `ListChannels`
    async fn list_channels(
        &mut self,
        request: lnrpc::ListChannelsRequest,
    ) -> Result<lnrpc::ListChannelsResponse, Status>;

    /// `AddInvoice`
    async fn add_invoice(
        &mut self,
        request: lnrpc::Invoice,
    ) -> Result<lnrpc::AddInvoiceResponse, Status>;

    /// `LookupInvoice`
    async fn lookup_invoice(
        &mut self,
        request: lnrpc::PaymentHash,
    ) -> Result<lnrpc::Invoice, Status>;

    /// `SendPaymentSync`
    async fn send_payment_sync(
        &mut self,
        request: lnrpc::SendRequest,
    ) -> Result<lnrpc::SendResponse, Status>;

    /// `DecodePayReq`
    async fn decode_pay_req(
        &mut self,
        request: lnrpc::PayReqString,
    ) -> Result<lnrpc::PayReq, Status>;

    /// `SubscribeInvoices`
    async fn subscribe_invoices(
        &mut self,
        request: lnrpc::InvoiceSubscription,
    ) -> Result<InvoiceStream, Status>;
}

/// A pooled transport able to build stubs bound to itself
pub trait LightningConnection: Transport {
    /// Stub type
    type Stub: LightningRpc;

    /// New call proxy over this connection
    fn stub(&self) -> Self::Stub;
}

/// [`LightningRpc`] over the generated tonic client
#[derive(Clone)]
pub struct LndStub {
    inner: LightningClient,
}

impl std::fmt::Debug for LndStub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LndStub").finish_non_exhaustive()
    }
}

impl LndStub {
    /// Create new [`LndStub`]
    pub fn new(inner: LightningClient) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl LightningRpc for LndStub {
    async fn wallet_balance(
        &mut self,
        request: lnrpc::WalletBalanceRequest,
    ) -> Result<lnrpc::WalletBalanceResponse, Status> {
        self.inner
            .wallet_balance(request)
            .await
            .map(Response::into_inner)
    }

    async fn channel_balance(
        &mut self,
        request: lnrpc::ChannelBalanceRequest,
    ) -> Result<lnrpc::ChannelBalanceResponse, Status> {
        self.inner
            .channel_balance(request)
            .await
            .map(Response::into_inner)
    }

    async fn list_channels(
        &mut self,
        request: lnrpc::ListChannelsRequest,
    ) -> Result<lnrpc::ListChannelsResponse, Status> {
        self.inner
            .list_channels(request)
            .await
            .map(Response::into_inner)
    }

    async fn add_invoice(
        &mut self,
        request: lnrpc::Invoice,
    ) -> Result<lnrpc::AddInvoiceResponse, Status> {
        self.inner
            .add_invoice(request)
            .await
            .map(Response::into_inner)
    }

    async fn lookup_invoice(
        &mut self,
        request: lnrpc::PaymentHash,
    ) -> Result<lnrpc::Invoice, Status> {
        self.inner
            .lookup_invoice(request)
            .await
            .map(Response::into_inner)
    }

    async fn send_payment_sync(
        &mut self,
        request: lnrpc::SendRequest,
    ) -> Result<lnrpc::SendResponse, Status> {
        self.inner
            .send_payment_sync(request)
            .await
            .map(Response::into_inner)
    }

    async fn decode_pay_req(
        &mut self,
        request: lnrpc::PayReqString,
    ) -> Result<lnrpc::PayReq, Status> {
        self.inner
            .decode_pay_req(request)
            .await
            .map(Response::into_inner)
    }

    async fn subscribe_invoices(
        &mut self,
        request: lnrpc::InvoiceSubscription,
    ) -> Result<InvoiceStream, Status> {
        let stream = self.inner.subscribe_invoices(request).await?.into_inner();
        Ok(stream.boxed())
    }
}
