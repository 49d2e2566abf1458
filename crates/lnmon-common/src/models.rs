//! Domain models
//!
//! Value objects built from node responses. Amounts are signed satoshis unless the field name
//! ends in `_msat`; hashes and preimages are lowercase hex strings.

use serde::{Deserialize, Serialize};

/// On-chain wallet balance
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WalletBalance {
    /// Confirmed and unconfirmed funds
    pub total_balance: i64,
    /// Funds with at least one confirmation
    pub confirmed_balance: i64,
    /// Funds with zero confirmations
    pub unconfirmed_balance: i64,
    /// Funds reserved by the wallet for pending transactions
    pub locked_balance: i64,
}

/// Funds locked in channels
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChannelBalance {
    /// Sum of local balances of open channels
    pub balance: i64,
    /// Sum of local balances of channels waiting to be opened
    pub pending_open_balance: i64,
}

/// Channel status
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelStatus {
    /// Peer is online and the channel can route
    Active,
    /// Peer is offline
    #[default]
    Inactive,
}

/// Pending HTLC on a channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Htlc {
    /// Whether the HTLC is incoming
    pub incoming: bool,
    /// Amount in satoshis
    pub amount: i64,
    /// Payment hash locking the HTLC
    pub hashlock: String,
    /// Block height at which the HTLC expires
    pub expiration_height: u32,
}

/// Open channel
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Channel {
    /// Short channel id
    pub id: u64,
    /// Funding outpoint `txid:index`
    pub channel_point: String,
    /// Status
    pub status: ChannelStatus,
    /// Raw status flags reported by the node, e.g. `ChanStatusDefault`
    pub status_flags: String,
    /// Public key of the peer
    pub remote_pubkey: String,
    /// Total capacity
    pub capacity: i64,
    /// Our side of the channel
    pub local_balance: i64,
    /// Peer side of the channel
    pub remote_balance: i64,
    /// Fee paid for the commitment transaction
    pub commit_fee: i64,
    /// Weight of the commitment transaction
    pub commit_weight: i64,
    /// Fee rate of the commitment transaction in sat/kw
    pub fee_per_kw: i64,
    /// Funds in pending HTLCs
    pub unsettled_balance: i64,
    /// Total sent over the channel lifetime
    pub total_amount_sent: i64,
    /// Total received over the channel lifetime
    pub total_amount_received: i64,
    /// Number of commitment updates
    pub updates_count: u64,
    /// CSV delay applied to our outputs
    pub csv_delay: u32,
    /// Channel is not announced
    pub private: bool,
    /// We opened the channel
    pub initiator: bool,
    /// HTLCs in flight
    pub pending_htlcs: Vec<Htlc>,
}

/// Invoice state
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceState {
    /// Waiting for payment
    #[default]
    Open,
    /// Paid
    Settled,
    /// Cancelled before being paid
    Canceled,
    /// HTLCs accepted, not yet settled
    Accepted,
}

/// Hop of a private route hint
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HopHint {
    /// Public key of the node at the start of the channel
    pub node_id: String,
    /// Short channel id
    pub chan_id: u64,
    /// Base fee in msat
    pub fee_base_msat: u32,
    /// Proportional fee
    pub fee_proportional_millionths: u32,
    /// CLTV delta of the channel
    pub cltv_expiry_delta: u32,
}

/// Private route to reach the payee
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RouteHint {
    /// Hops of the route
    pub hop_hints: Vec<HopHint>,
}

/// Incoming payment request created by the node
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Invoice {
    /// Add index
    pub index: u64,
    /// Settle index, zero while unpaid
    pub settle_index: u64,
    /// Memo
    pub description: String,
    /// Requested amount in satoshis
    pub amount: i64,
    /// Requested amount in millisatoshis
    pub amount_msat: i64,
    /// Amount paid in satoshis
    pub amount_paid: i64,
    /// Amount paid in millisatoshis
    pub amount_paid_msat: i64,
    /// Preimage
    pub r_preimage: String,
    /// Payment hash
    pub r_hash: String,
    /// BOLT11 encoded request
    pub payment_request: String,
    /// Hash of a long description
    pub description_hash: String,
    /// Payment address, only known for invoices created through this backend
    pub payment_addr: String,
    /// Unix creation time
    pub creation_date: i64,
    /// Unix settle time
    pub settle_date: i64,
    /// Seconds after creation before the invoice expires
    pub expiry: i64,
    /// On-chain fallback address
    pub fallback_addr: String,
    /// Final CLTV delta
    pub cltv_expiry: u64,
    /// Includes private route hints
    pub private: bool,
    /// State
    pub state: InvoiceState,
    /// Whether the invoice was paid
    pub settled: bool,
    /// Route hints
    pub route_hints: Vec<RouteHint>,
}

/// Decoded BOLT11 payment request
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PayReq {
    /// Payee public key
    pub destination: String,
    /// Payment hash
    pub payment_hash: String,
    /// Amount in satoshis
    pub amount: i64,
    /// Amount in millisatoshis
    pub amount_msat: i64,
    /// Unix creation time
    pub timestamp: i64,
    /// Seconds after creation before the request expires
    pub expiry: i64,
    /// Description
    pub description: String,
    /// Hash of a long description
    pub description_hash: String,
    /// On-chain fallback address
    pub fallback_addr: String,
    /// Final CLTV delta
    pub cltv_expiry: i64,
    /// Route hints
    pub route_hints: Vec<RouteHint>,
    /// Payment address
    pub payment_addr: String,
    /// Encoded request
    pub raw: String,
}

/// Hop of a payment route
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hop {
    /// Short channel id
    pub chan_id: u64,
    /// Public key of the next node
    pub pub_key: String,
    /// Capacity of the channel
    pub chan_capacity: i64,
    /// Amount forwarded in satoshis
    pub amount_to_forward: i64,
    /// Amount forwarded in millisatoshis
    pub amount_to_forward_msat: i64,
    /// Fee in satoshis
    pub fee: i64,
    /// Fee in millisatoshis
    pub fee_msat: i64,
    /// CLTV expiry
    pub expiry: u32,
}

/// Route taken by a payment
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Route {
    /// Total time lock
    pub time_lock: u32,
    /// Total fees in satoshis
    pub fees: i64,
    /// Total fees in millisatoshis
    pub fees_msat: i64,
    /// Total amount including fees in satoshis
    pub amount: i64,
    /// Total amount including fees in millisatoshis
    pub amount_msat: i64,
    /// Hops
    pub hops: Vec<Hop>,
}

/// Outgoing payment attempt
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Payment {
    /// Request that was paid, as provided by the caller
    pub pay_req: PayReq,
    /// Payment hash reported by the node
    pub payment_hash: String,
    /// Preimage, empty if the payment failed
    pub payment_preimage: String,
    /// Failure reason reported by the node
    pub payment_error: Option<String>,
    /// Route of the successful attempt
    pub route: Option<Route>,
}

impl Payment {
    /// The node reported no failure
    pub fn is_success(&self) -> bool {
        self.payment_error.is_none()
    }
}
