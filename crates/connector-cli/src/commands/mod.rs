pub mod forward;
pub mod init;
pub mod quote;

use serde::Serialize;

/// Print `value` as pretty JSON.
pub(crate) fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
