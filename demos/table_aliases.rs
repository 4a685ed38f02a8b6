//! Alias table - answers alias lookups from an in-memory map.
//!
//! The map is loaded from the JSON object file named by the first
//! argument, e.g. `{"postmaster": "root", "abuse": "root"}`. Without an
//! argument a small built-in map is used.
//!
//! # Running under the daemon
//!
//! ```text
//! table aliases proc:/path/to/target/debug/examples/table_aliases /etc/mail/aliases.json
//! ```

use std::collections::HashMap;

use smtpd_proc::{EngineConfig, Error, Services, Table};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn load_aliases(path: Option<&str>) -> Result<HashMap<String, String>, Box<dyn std::error::Error>> {
    let Some(path) = path else {
        return Ok(HashMap::from([
            ("postmaster".to_string(), "root".to_string()),
            ("abuse".to_string(), "root".to_string()),
        ]));
    };

    let raw = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&raw)?)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let path = std::env::args().nth(1);
    let aliases = load_aliases(path.as_deref())?;
    tracing::info!("loaded {} aliases", aliases.len());
    let known = aliases.clone();

    Table::builder()
        .config(EngineConfig::from_env())
        .on_check(move |service, _params, key| {
            if !service.contains(Services::ALIAS) {
                return Ok(-1);
            }
            Ok(i32::from(known.contains_key(key)))
        })
        .on_lookup(move |service, _params, key| {
            if !service.contains(Services::ALIAS) {
                return Err(Error::handler(format!(
                    "unsupported service {} for key {:?}",
                    service, key
                )));
            }
            Ok(aliases.get(key).cloned())
        })
        .build()
        .run()
        .await?;

    Ok(())
}
