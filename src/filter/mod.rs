//! Filter face: intercepting SMTP transaction stages.
//!
//! The daemon sends two kinds of frames once a filter has registered:
//!
//! - **events**: one-way lifecycle notifications (connect, reset,
//!   disconnect, transaction begin/commit/rollback)
//! - **queries**: one per SMTP stage the filter hooked; the daemon blocks
//!   that session until the query is answered
//!
//! Handlers are plain closures installed through [`FilterBuilder`]. Query
//! handlers answer through [`SessionContext`]; a stage without a handler is
//! accepted automatically, except CONNECT, which is never answered by
//! default.

mod context;
mod engine;
mod handlers;
mod kinds;
mod query;
mod session;

pub use context::SessionContext;
pub use engine::{Filter, FilterBuilder, Registration};
pub use handlers::{
    AddressHandler, ConnectHandler, EomHandler, EventHandler, FilterHandlers, HandlerResult,
    LineHandler, QueryHandler,
};
pub use kinds::{command, hooks, EventKind, QueryKind, Status, FILTER_VERSION};
pub use query::ConnectQuery;
pub use session::{PendingQuery, Session, SessionRegistry};
