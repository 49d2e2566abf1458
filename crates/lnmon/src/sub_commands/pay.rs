use anyhow::{bail, Result};
use clap::Args;
use lnmon_common::Backend;

use super::print_json;

#[derive(Args)]
pub struct PaySubCommand {
    /// BOLT11 payment request
    pay_req: String,
}

pub async fn pay<B>(backend: &B, sub_command_args: &PaySubCommand) -> Result<()>
where
    B: Backend + Sync,
    B::Err: std::error::Error + Send + Sync + 'static,
{
    let pay_req = backend.decode_pay_req(&sub_command_args.pay_req).await?;

    tracing::info!(
        destination = %pay_req.destination,
        amount = pay_req.amount,
        "Paying"
    );

    let payment = backend.send_payment(&pay_req).await?;
    print_json(&payment)?;

    if let Some(err) = &payment.payment_error {
        bail!("Payment failed: {err}");
    }

    Ok(())
}
