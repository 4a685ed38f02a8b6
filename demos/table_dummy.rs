//! Dummy table - logs every request and knows a single test key.
//!
//! Useful to watch what the daemon asks a table for. Looking up
//! `table-dummy-test` answers `maze@maze.io`; everything else is not found.

use smtpd_proc::{EngineConfig, Table};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const TEST_KEY: &str = "table-dummy-test";
const TEST_VALUE: &str = "maze@maze.io";

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::new("debug"))
        .init();

    Table::builder()
        .config(EngineConfig::from_env().with_debug(true))
        .on_update(|| {
            tracing::info!("update");
            Ok(1)
        })
        .on_check(|service, params, key| {
            tracing::info!("check service={} params={:?} key={:?}", service, params, key);
            Ok(0)
        })
        .on_lookup(|service, params, key| {
            tracing::info!("lookup service={} params={:?} key={:?}", service, params, key);
            Ok((key == TEST_KEY).then(|| TEST_VALUE.to_string()))
        })
        .on_fetch(|service, params| {
            tracing::info!("fetch service={} params={:?}", service, params);
            Ok(None)
        })
        .on_close(|| {
            tracing::info!("close");
            Ok(())
        })
        .build()
        .run()
        .await?;

    Ok(())
}
