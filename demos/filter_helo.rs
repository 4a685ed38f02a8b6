//! HELO/MAIL filter - rejects suspicious greetings and one sender domain.
//!
//! This example demonstrates:
//! - Building a filter with only the hooks it needs
//! - Rejecting with and without a custom reply line
//! - Tracking sessions through the disconnect event
//!
//! # Running under the daemon
//!
//! ```text
//! filter helo "/path/to/target/debug/examples/filter_helo"
//! listen on lo0 filter helo
//! ```
//!
//! Logs go to stderr; set `RUST_LOG=debug` or `SMTPD_PROC_DEBUG=1` for more.

use smtpd_proc::{EngineConfig, Filter, Status};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const BLOCKED_SENDER_DOMAIN: &str = "example.org";

fn init_logging() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,smtpd_proc=info"));

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr).with_target(true))
        .with(filter)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    Filter::builder()
        .config(EngineConfig::from_env())
        .on_helo(|ctx, helo| {
            if helo == "test" {
                tracing::info!("session {:#x}: rejecting HELO {:?}", ctx.session_id(), helo);
                return ctx.reject(Status::Fail, 0);
            }
            ctx.accept()
        })
        .on_mail(|ctx, from| {
            if from.domain == BLOCKED_SENDER_DOMAIN {
                tracing::info!("session {:#x}: rejecting MAIL FROM <{}>", ctx.session_id(), from);
                return ctx.reject_code(Status::Fail, 550, "sender domain refused");
            }
            ctx.accept()
        })
        .on_disconnect(|session| {
            tracing::debug!("session {:#x} closed", session.id);
            Ok(())
        })
        .build()
        .run()
        .await?;

    Ok(())
}
