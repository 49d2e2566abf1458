use anyhow::Result;
use clap::Args;
use lnmon_common::{Backend, ChannelOption};

use super::print_json;

#[derive(Args)]
pub struct ChannelsSubCommand {
    /// Only channels whose peer is online
    #[arg(long, conflicts_with = "inactive")]
    active: bool,
    /// Only channels whose peer is offline
    #[arg(long)]
    inactive: bool,
    /// Only announced channels
    #[arg(long, conflicts_with = "private")]
    public: bool,
    /// Only unannounced channels
    #[arg(long)]
    private: bool,
}

impl ChannelsSubCommand {
    fn options(&self) -> Vec<ChannelOption> {
        [
            (self.active, ChannelOption::ActiveOnly),
            (self.inactive, ChannelOption::InactiveOnly),
            (self.public, ChannelOption::PublicOnly),
            (self.private, ChannelOption::PrivateOnly),
        ]
        .into_iter()
        .filter_map(|(set, option)| set.then_some(option))
        .collect()
    }
}

pub async fn channels<B>(backend: &B, sub_command_args: &ChannelsSubCommand) -> Result<()>
where
    B: Backend + Sync,
    B::Err: std::error::Error + Send + Sync + 'static,
{
    let channels = backend.list_channels(&sub_command_args.options()).await?;

    print_json(&channels)
}
