pub mod balance;
pub mod channels;
pub mod decode;
pub mod invoice;
pub mod pay;
pub mod watch;

use anyhow::Result;
use serde::Serialize;

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
