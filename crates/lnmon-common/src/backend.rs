//! Node backend trait

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::models::{Channel, ChannelBalance, Invoice, PayReq, Payment, WalletBalance};
use crate::options::ChannelOption;

/// Operations a monitored Lightning node exposes
#[async_trait]
pub trait Backend {
    /// Backend Error
    type Err: Into<Error> + From<Error>;

    /// Configured name of the node
    fn node_name(&self) -> &str;

    /// On-chain wallet balance
    async fn get_wallet_balance(&self) -> Result<WalletBalance, Self::Err>;

    /// Balance locked in channels
    async fn get_channel_balance(&self) -> Result<ChannelBalance, Self::Err>;

    /// Channels matching every given filter
    async fn list_channels(&self, options: &[ChannelOption]) -> Result<Vec<Channel>, Self::Err>;

    /// Create a new invoice
    async fn create_invoice(&self, amount: i64, description: &str) -> Result<Invoice, Self::Err>;

    /// Look up an invoice by its hex payment hash
    async fn get_invoice(&self, r_hash: &str) -> Result<Invoice, Self::Err>;

    /// Pay a decoded payment request
    async fn send_payment(&self, pay_req: &PayReq) -> Result<Payment, Self::Err>;

    /// Decode a BOLT11 payment request
    async fn decode_pay_req(&self, pay_req: &str) -> Result<PayReq, Self::Err>;

    /// Forward invoice updates to `sender` until the stream ends, fails or `cancel` fires.
    ///
    /// This never returns `Ok`: the error tells why the subscription stopped and the caller
    /// decides whether to subscribe again.
    async fn subscribe_invoice(
        &self,
        cancel: CancellationToken,
        sender: mpsc::Sender<Invoice>,
    ) -> Result<(), Self::Err>;
}
