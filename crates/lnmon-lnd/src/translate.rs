//! Conversions from lnd wire messages to domain models

use lnmon_common::{
    Channel, ChannelBalance, ChannelStatus, Hop, HopHint, Htlc, Invoice, InvoiceState, PayReq,
    Payment, Route, RouteHint, WalletBalance,
};

use crate::lnrpc;
use crate::lnrpc::invoice::InvoiceState as WireInvoiceState;

const MSAT_IN_SAT: i64 = 1000;

impl From<lnrpc::WalletBalanceResponse> for WalletBalance {
    fn from(value: lnrpc::WalletBalanceResponse) -> Self {
        Self {
            total_balance: value.total_balance,
            confirmed_balance: value.confirmed_balance,
            unconfirmed_balance: value.unconfirmed_balance,
            locked_balance: value.locked_balance,
        }
    }
}

impl From<lnrpc::ChannelBalanceResponse> for ChannelBalance {
    fn from(value: lnrpc::ChannelBalanceResponse) -> Self {
        Self {
            balance: value.balance,
            pending_open_balance: value.pending_open_balance,
        }
    }
}

impl From<lnrpc::Htlc> for Htlc {
    fn from(value: lnrpc::Htlc) -> Self {
        Self {
            incoming: value.incoming,
            amount: value.amount,
            hashlock: hex::encode(value.hashlock),
            expiration_height: value.expiration_height,
        }
    }
}

impl From<lnrpc::Channel> for Channel {
    fn from(value: lnrpc::Channel) -> Self {
        let status = match value.active {
            true => ChannelStatus::Active,
            false => ChannelStatus::Inactive,
        };

        Self {
            id: value.chan_id,
            channel_point: value.channel_point,
            status,
            status_flags: value.chan_status_flags,
            remote_pubkey: value.remote_pubkey,
            capacity: value.capacity,
            local_balance: value.local_balance,
            remote_balance: value.remote_balance,
            commit_fee: value.commit_fee,
            commit_weight: value.commit_weight,
            fee_per_kw: value.fee_per_kw,
            unsettled_balance: value.unsettled_balance,
            total_amount_sent: value.total_satoshis_sent,
            total_amount_received: value.total_satoshis_received,
            updates_count: value.num_updates,
            csv_delay: value.csv_delay,
            private: value.private,
            initiator: value.initiator,
            pending_htlcs: value.pending_htlcs.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<lnrpc::HopHint> for HopHint {
    fn from(value: lnrpc::HopHint) -> Self {
        Self {
            node_id: value.node_id,
            chan_id: value.chan_id,
            fee_base_msat: value.fee_base_msat,
            fee_proportional_millionths: value.fee_proportional_millionths,
            cltv_expiry_delta: value.cltv_expiry_delta,
        }
    }
}

impl From<lnrpc::RouteHint> for RouteHint {
    fn from(value: lnrpc::RouteHint) -> Self {
        Self {
            hop_hints: value.hop_hints.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<WireInvoiceState> for InvoiceState {
    fn from(value: WireInvoiceState) -> Self {
        match value {
            WireInvoiceState::Open => Self::Open,
            WireInvoiceState::Settled => Self::Settled,
            WireInvoiceState::Canceled => Self::Canceled,
            WireInvoiceState::Accepted => Self::Accepted,
        }
    }
}

impl From<lnrpc::Invoice> for Invoice {
    fn from(value: lnrpc::Invoice) -> Self {
        // Unknown enum values decode as `Open`
        let state = value.state().into();

        Self {
            index: value.add_index,
            settle_index: value.settle_index,
            description: value.memo,
            amount: value.value,
            amount_msat: value.value_msat,
            amount_paid: value.amt_paid_sat,
            amount_paid_msat: value.amt_paid_msat,
            r_preimage: hex::encode(value.r_preimage),
            r_hash: hex::encode(value.r_hash),
            payment_request: value.payment_request,
            description_hash: hex::encode(value.description_hash),
            payment_addr: String::new(),
            creation_date: value.creation_date,
            settle_date: value.settle_date,
            expiry: value.expiry,
            fallback_addr: value.fallback_addr,
            cltv_expiry: value.cltv_expiry,
            private: value.private,
            state,
            settled: value.settled,
            route_hints: value.route_hints.into_iter().map(Into::into).collect(),
        }
    }
}

impl From<lnrpc::Hop> for Hop {
    fn from(value: lnrpc::Hop) -> Self {
        Self {
            chan_id: value.chan_id,
            pub_key: value.pub_key,
            chan_capacity: value.chan_capacity,
            amount_to_forward: value.amt_to_forward,
            amount_to_forward_msat: value.amt_to_forward_msat,
            fee: value.fee,
            fee_msat: value.fee_msat,
            expiry: value.expiry,
        }
    }
}

impl From<lnrpc::Route> for Route {
    fn from(value: lnrpc::Route) -> Self {
        Self {
            time_lock: value.total_time_lock,
            fees: value.total_fees,
            fees_msat: value.total_fees_msat,
            amount: value.total_amt,
            amount_msat: value.total_amt_msat,
            hops: value.hops.into_iter().map(Into::into).collect(),
        }
    }
}

/// Invoice created by `AddInvoice`.
///
/// lnd only answers with the hash, the encoded request and the add index, everything else comes
/// from the request that was sent.
pub fn invoice_from_add(request: lnrpc::Invoice, response: lnrpc::AddInvoiceResponse) -> Invoice {
    let mut invoice = Invoice::from(request);

    if invoice.amount_msat == 0 {
        invoice.amount_msat = invoice.amount.saturating_mul(MSAT_IN_SAT);
    }
    invoice.r_hash = hex::encode(response.r_hash);
    invoice.payment_request = response.payment_request;
    invoice.index = response.add_index;
    invoice.payment_addr = hex::encode(response.payment_addr);

    invoice
}

/// Payment made by `SendPaymentSync` for `pay_req`
pub fn payment_from_send(pay_req: &PayReq, response: lnrpc::SendResponse) -> Payment {
    let payment_error = Some(response.payment_error).filter(|err| !err.is_empty());

    Payment {
        pay_req: pay_req.clone(),
        payment_hash: hex::encode(response.payment_hash),
        payment_preimage: hex::encode(response.payment_preimage),
        payment_error,
        route: response.payment_route.map(Into::into),
    }
}

/// Payment request decoded by `DecodePayReq`, `raw` is the string that was decoded
pub fn pay_req_from_proto(value: lnrpc::PayReq, raw: &str) -> PayReq {
    PayReq {
        destination: value.destination,
        payment_hash: value.payment_hash,
        amount: value.num_satoshis,
        amount_msat: value.num_msat,
        timestamp: value.timestamp,
        expiry: value.expiry,
        description: value.description,
        description_hash: value.description_hash,
        fallback_addr: value.fallback_addr,
        cltv_expiry: value.cltv_expiry,
        route_hints: value.route_hints.into_iter().map(Into::into).collect(),
        payment_addr: hex::encode(value.payment_addr),
        raw: raw.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_invoice() -> lnrpc::Invoice {
        lnrpc::Invoice {
            memo: "coffee".to_string(),
            r_preimage: vec![0xab; 32],
            r_hash: vec![0x01, 0x02, 0xff],
            value: 50_000,
            value_msat: 50_000_000,
            settled: true,
            creation_date: 1_700_000_000,
            settle_date: 1_700_000_100,
            payment_request: "lnbc500u1test".to_string(),
            description_hash: vec![0xaa; 32],
            expiry: 3600,
            add_index: 7,
            settle_index: 3,
            amt_paid_sat: 50_000,
            amt_paid_msat: 50_000_000,
            route_hints: vec![lnrpc::RouteHint {
                hop_hints: vec![lnrpc::HopHint {
                    node_id: "02aa".to_string(),
                    chan_id: 42,
                    fee_base_msat: 1000,
                    fee_proportional_millionths: 1,
                    cltv_expiry_delta: 40,
                }],
            }],
            state: WireInvoiceState::Settled as i32,
            ..Default::default()
        }
    }

    #[test]
    fn test_invoice_translation() {
        let invoice = Invoice::from(wire_invoice());

        assert_eq!(invoice.index, 7);
        assert_eq!(invoice.settle_index, 3);
        assert_eq!(invoice.description, "coffee");
        assert_eq!(invoice.amount, 50_000);
        assert_eq!(invoice.amount_paid_msat, 50_000_000);
        assert_eq!(invoice.r_hash, "0102ff");
        assert_eq!(invoice.description_hash, "aa".repeat(32));
        assert_eq!(invoice.payment_addr, "");
        assert_eq!(invoice.state, InvoiceState::Settled);
        assert!(invoice.settled);
        assert_eq!(invoice.route_hints[0].hop_hints[0].chan_id, 42);
    }

    #[test]
    fn test_wallet_balance_translation() {
        let balance = WalletBalance::from(lnrpc::WalletBalanceResponse {
            total_balance: 10,
            confirmed_balance: 8,
            unconfirmed_balance: 2,
            locked_balance: 7,
        });

        assert_eq!(
            balance,
            WalletBalance {
                total_balance: 10,
                confirmed_balance: 8,
                unconfirmed_balance: 2,
                locked_balance: 7,
            }
        );
    }

    #[test]
    fn test_translation_is_idempotent() {
        let wire = wire_invoice();
        assert_eq!(Invoice::from(wire.clone()), Invoice::from(wire));

        let channel = lnrpc::Channel {
            active: true,
            chan_id: 1,
            capacity: 1_000_000,
            pending_htlcs: vec![lnrpc::Htlc {
                incoming: true,
                amount: 10,
                hashlock: vec![0xde, 0xad],
                expiration_height: 800_000,
            }],
            ..Default::default()
        };
        assert_eq!(Channel::from(channel.clone()), Channel::from(channel));
    }

    #[test]
    fn test_unknown_invoice_state_falls_back_to_open() {
        let wire = lnrpc::Invoice {
            state: 42,
            ..Default::default()
        };
        assert_eq!(Invoice::from(wire).state, InvoiceState::Open);
    }

    #[test]
    fn test_channel_translation() {
        let channel = Channel::from(lnrpc::Channel {
            active: false,
            chan_id: 9,
            total_satoshis_sent: 5,
            total_satoshis_received: 6,
            num_updates: 11,
            chan_status_flags: "ChanStatusDefault".to_string(),
            pending_htlcs: vec![lnrpc::Htlc {
                hashlock: vec![0xde, 0xad],
                ..Default::default()
            }],
            ..Default::default()
        });

        assert_eq!(channel.id, 9);
        assert_eq!(channel.status, ChannelStatus::Inactive);
        assert_eq!(channel.total_amount_sent, 5);
        assert_eq!(channel.total_amount_received, 6);
        assert_eq!(channel.updates_count, 11);
        assert_eq!(channel.status_flags, "ChanStatusDefault");
        assert_eq!(channel.pending_htlcs[0].hashlock, "dead");
    }

    #[test]
    fn test_invoice_from_add_keeps_request_fields() {
        let request = lnrpc::Invoice {
            memo: "coffee".to_string(),
            value: 50_000,
            creation_date: 1_700_000_000,
            expiry: 3600,
            ..Default::default()
        };
        let response = lnrpc::AddInvoiceResponse {
            r_hash: vec![0x0a],
            payment_request: "lnbc500u1test".to_string(),
            add_index: 12,
            payment_addr: vec![0xbe, 0xef],
        };

        let invoice = invoice_from_add(request, response);

        assert_eq!(invoice.amount, 50_000);
        assert_eq!(invoice.amount_msat, 50_000_000);
        assert_eq!(invoice.description, "coffee");
        assert_eq!(invoice.expiry, 3600);
        assert_eq!(invoice.creation_date, 1_700_000_000);
        assert_eq!(invoice.r_hash, "0a");
        assert_eq!(invoice.index, 12);
        assert_eq!(invoice.payment_addr, "beef");
        assert_eq!(invoice.state, InvoiceState::Open);
    }

    #[test]
    fn test_invoice_from_add_saturates_amount_msat() {
        let request = lnrpc::Invoice {
            value: i64::MAX / 10,
            ..Default::default()
        };

        let invoice = invoice_from_add(request, lnrpc::AddInvoiceResponse::default());

        assert_eq!(invoice.amount, i64::MAX / 10);
        assert_eq!(invoice.amount_msat, i64::MAX);
    }

    #[test]
    fn test_payment_from_send() {
        let pay_req = PayReq {
            destination: "02dest".to_string(),
            amount: 100,
            raw: "lnbc1test".to_string(),
            ..Default::default()
        };

        let payment = payment_from_send(
            &pay_req,
            lnrpc::SendResponse {
                payment_error: String::new(),
                payment_preimage: vec![0x11],
                payment_route: Some(lnrpc::Route {
                    total_fees: 1,
                    hops: vec![lnrpc::Hop {
                        chan_id: 3,
                        chan_capacity: 2_000_000,
                        ..Default::default()
                    }],
                    ..Default::default()
                }),
                payment_hash: vec![0x22],
            },
        );

        assert_eq!(payment.pay_req, pay_req);
        assert_eq!(payment.payment_preimage, "11");
        assert_eq!(payment.payment_hash, "22");
        assert!(payment.is_success());
        let hop = payment.route.map(|r| r.hops[0].clone()).unwrap_or_default();
        assert_eq!(hop.chan_id, 3);
        assert_eq!(hop.chan_capacity, 2_000_000);

        let failed = payment_from_send(
            &pay_req,
            lnrpc::SendResponse {
                payment_error: "unable to find a path".to_string(),
                ..Default::default()
            },
        );
        assert_eq!(
            failed.payment_error.as_deref(),
            Some("unable to find a path")
        );
        assert!(failed.route.is_none());
    }

    #[test]
    fn test_pay_req_keeps_raw() {
        let pay_req = pay_req_from_proto(
            lnrpc::PayReq {
                destination: "02dest".to_string(),
                num_satoshis: 100,
                num_msat: 100_000,
                payment_addr: vec![0x01, 0x02],
                ..Default::default()
            },
            "lnbc1test",
        );

        assert_eq!(pay_req.destination, "02dest");
        assert_eq!(pay_req.amount, 100);
        assert_eq!(pay_req.amount_msat, 100_000);
        assert_eq!(pay_req.payment_addr, "0102");
        assert_eq!(pay_req.raw, "lnbc1test");
    }
}
