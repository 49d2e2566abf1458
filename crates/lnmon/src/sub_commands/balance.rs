use anyhow::Result;
use lnmon_common::{Backend, ChannelBalance, WalletBalance};
use serde::Serialize;

use super::print_json;

#[derive(Serialize)]
struct Balances {
    node: String,
    wallet: WalletBalance,
    channels: ChannelBalance,
}

pub async fn balance<B>(backend: &B) -> Result<()>
where
    B: Backend + Sync,
    B::Err: std::error::Error + Send + Sync + 'static,
{
    let wallet = backend.get_wallet_balance().await?;
    let channels = backend.get_channel_balance().await?;

    print_json(&Balances {
        node: backend.node_name().to_string(),
        wallet,
        channels,
    })
}
