//! # smtpd-proc
//!
//! Rust SDK for writing mail daemon plugins that speak the imsg protocol.
//!
//! The daemon starts each plugin as a child process and talks to it over a
//! socket it leaves on descriptor 0. Two kinds of plugin exist:
//!
//! - **Filters** ([`Filter`]): receive session events and answer queries for
//!   the SMTP stages they hook (HELO, MAIL, RCPT, ...)
//! - **Tables** ([`Table`]): answer key lookups (aliases, domains,
//!   credentials, ...)
//!
//! ## Architecture
//!
//! - [`protocol`]: 16-byte frame header and frame reassembly
//! - [`codec`]: positional, optionally tagged payload values
//! - [`transport`]: frame I/O over any async byte stream
//! - [`filter`] / [`table`]: the two engines
//!
//! ## Example
//!
//! ```ignore
//! use smtpd_proc::{Filter, Status};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> smtpd_proc::Result<()> {
//!     Filter::builder()
//!         .on_mail(|ctx, from| {
//!             if from.domain == "example.org" {
//!                 return ctx.reject_code(Status::Fail, 550, "sender refused");
//!             }
//!             ctx.accept()
//!         })
//!         .build()
//!         .run()
//!         .await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod error;
pub mod filter;
pub mod protocol;
pub mod table;
pub mod transport;

pub use codec::{MailAddr, Sockaddr};
pub use config::EngineConfig;
pub use error::{Error, Result};
pub use filter::{ConnectQuery, Filter, FilterBuilder, Session, SessionContext, Status};
pub use table::{Dict, Services, Table, TableBuilder};
pub use transport::Connection;
