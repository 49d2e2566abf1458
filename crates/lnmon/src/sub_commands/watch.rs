use anyhow::Result;
use clap::Args;
use lnmon_common::Backend;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::print_json;

#[derive(Args)]
pub struct WatchSubCommand {
    /// Invoice updates buffered before the subscription waits for the output
    #[arg(long, default_value_t = 16)]
    buffer: usize,
}

/// Print invoice updates until Ctrl-C or until the node ends the stream
pub async fn watch<B>(backend: &B, sub_command_args: &WatchSubCommand) -> Result<()>
where
    B: Backend + Sync,
    B::Err: std::error::Error + Send + Sync + 'static,
{
    let cancel = CancellationToken::new();
    let (sender, mut receiver) = mpsc::channel(sub_command_args.buffer.max(1));

    let ctrl_c = tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                tracing::info!("Ctrl-C received, stopping");
                cancel.cancel();
            }
        }
    });

    let printer = async {
        while let Some(invoice) = receiver.recv().await {
            print_json(&invoice)?;
        }
        Ok::<_, anyhow::Error>(())
    };

    let (subscription, printed) =
        tokio::join!(backend.subscribe_invoice(cancel.clone(), sender), printer);
    ctrl_c.abort();
    printed?;

    match subscription {
        Err(_) if cancel.is_cancelled() => Ok(()),
        Err(err) => Err(anyhow::Error::from(err)),
        Ok(()) => Ok(()),
    }
}
