//! Table face: key lookups on behalf of the daemon.
//!
//! Unlike the filter face, table values are sent bare, without type tags,
//! and there are no sessions: every request stands alone.

mod engine;
mod kinds;
mod service;

pub use engine::{
    CheckHandler, CloseHandler, FetchHandler, LookupHandler, Table, TableBuilder, TableState,
    UpdateHandler,
};
pub use kinds::{command, TABLE_VERSION};
pub use service::{Dict, Services};
