use std::path::PathBuf;

use clap::Args;
use serde::de::DeserializeOwned;

/// Arguments every streaming binary takes.
#[derive(Args, Debug, Clone, Default)]
pub struct CommonArgs {
    /// Context URI (e.g. ip:192.168.2.1). Local discovery when omitted.
    #[arg(value_name = "URI")]
    pub uri: Option<String>,

    /// JSON file overriding the board configuration.
    #[arg(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Write a JSON summary of the session here on exit.
    #[arg(long, value_name = "FILE")]
    pub summary: Option<PathBuf>,
}

/// Parses a flag value by its serde name, e.g. `avg30_or_sync`.
pub fn parse_variant<T: DeserializeOwned>(s: &str) -> Result<T, String> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|_| format!("unknown value {:?}", s))
}

/// Milliseconds in `secs` seconds. Saturates; config validation rejects
/// anything that large.
pub fn secs_to_ms(secs: u64) -> u64 {
    secs.saturating_mul(1000)
}
