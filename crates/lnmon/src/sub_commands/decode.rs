use anyhow::Result;
use clap::Args;
use lnmon_common::Backend;

use super::print_json;

#[derive(Args)]
pub struct DecodeSubCommand {
    /// BOLT11 payment request
    pay_req: String,
}

pub async fn decode<B>(backend: &B, sub_command_args: &DecodeSubCommand) -> Result<()>
where
    B: Backend + Sync,
    B::Err: std::error::Error + Send + Sync + 'static,
{
    let pay_req = backend.decode_pay_req(&sub_command_args.pay_req).await?;

    print_json(&pay_req)
}
