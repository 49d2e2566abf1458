use anyhow::Result;
use clap::{Args, Subcommand};
use lnmon_common::Backend;

use super::print_json;

#[derive(Args)]
pub struct InvoiceSubCommand {
    #[command(subcommand)]
    command: InvoiceCommand,
}

#[derive(Subcommand)]
enum InvoiceCommand {
    /// Create an invoice
    Create {
        /// Amount in satoshis
        amount: i64,
        /// Memo
        description: String,
    },
    /// Look up an invoice by payment hash
    Get {
        /// Hex payment hash
        r_hash: String,
    },
}

pub async fn invoice<B>(backend: &B, sub_command_args: &InvoiceSubCommand) -> Result<()>
where
    B: Backend + Sync,
    B::Err: std::error::Error + Send + Sync + 'static,
{
    let invoice = match &sub_command_args.command {
        InvoiceCommand::Create {
            amount,
            description,
        } => backend.create_invoice(*amount, description).await?,
        InvoiceCommand::Get { r_hash } => backend.get_invoice(r_hash).await?,
    };

    print_json(&invoice)
}
