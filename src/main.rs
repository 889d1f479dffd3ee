//! Runs one hook through the built-in handlers.
//!
//! Reads a host input tree (JSON) from stdin and prints the result tree.
//! An optional first argument names a YAML configuration file.
//!
//! ```text
//! hookrelay hookrelay.example.yaml < delivery.json
//! ```

use std::error::Error;
use std::io::Read;

use hookrelay::{builtin_dispatcher, process_entry, Entry, HookRelayConfig, Services};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let config = match std::env::args().nth(1) {
        Some(path) => HookRelayConfig::from_file(path)?,
        None => HookRelayConfig::default(),
    };

    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let entry: Entry = serde_json::from_str(&input)?;

    let services = Services::from_config(&config.dispatch)?;
    let dispatcher = builtin_dispatcher(config.handlers, services, config.dispatch);
    let result = process_entry(&dispatcher, &entry, &config.ingest).await?;

    println!("{}", serde_json::to_string_pretty(&result.to_entry())?);
    Ok(())
}
