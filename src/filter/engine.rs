//! Filter builder and serve loop.
//!
//! The [`FilterBuilder`] collects one optional handler per SMTP stage. The
//! built [`Filter`] then:
//! 1. Answers the daemon's REGISTER with the hooks it wants
//! 2. Tracks sessions from EVENT frames
//! 3. Dispatches QUERY frames to handlers and writes their responses
//!
//! # Example
//!
//! ```ignore
//! use smtpd_proc::filter::{Filter, Status};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> smtpd_proc::Result<()> {
//!     Filter::builder()
//!         .on_helo(|ctx, helo| {
//!             if helo == "test" {
//!                 return ctx.reject(Status::Fail, 0);
//!             }
//!             ctx.accept()
//!         })
//!         .build()
//!         .run()
//!         .await
//! }
//! ```

use tokio::io::{AsyncRead, AsyncWrite};

use super::context::SessionContext;
use super::handlers::{EventHandler, FilterHandlers};
use super::kinds::{command, hooks, EventKind, QueryKind, FILTER_VERSION};
use super::query::ConnectQuery;
use super::session::{PendingQuery, Session, SessionRegistry};
use crate::codec::{MailAddr, PayloadWriter};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::protocol::Frame;
use crate::transport::Connection;

/// What the daemon announced in its REGISTER frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Registration {
    pub version: u32,
    pub name: String,
}

/// Builder for a [`Filter`].
///
/// Every `on_*` method fills one handler slot. Only stages with a handler
/// are requested from the daemon.
#[derive(Default)]
pub struct FilterBuilder {
    handlers: FilterHandlers,
    config: EngineConfig,
}

impl FilterBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle the CONNECT query.
    ///
    /// Without this handler CONNECT queries are left unanswered.
    pub fn on_connect<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SessionContext, &ConnectQuery) -> Result<()> + Send + 'static,
    {
        self.handlers.connect = Some(Box::new(f));
        self
    }

    pub fn on_helo<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SessionContext, &str) -> Result<()> + Send + 'static,
    {
        self.handlers.helo = Some(Box::new(f));
        self
    }

    pub fn on_mail<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SessionContext, &MailAddr) -> Result<()> + Send + 'static,
    {
        self.handlers.mail = Some(Box::new(f));
        self
    }

    pub fn on_rcpt<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SessionContext, &MailAddr) -> Result<()> + Send + 'static,
    {
        self.handlers.rcpt = Some(Box::new(f));
        self
    }

    pub fn on_data<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SessionContext) -> Result<()> + Send + 'static,
    {
        self.handlers.data = Some(Box::new(f));
        self
    }

    /// Handle each line of message content.
    pub fn on_data_line<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SessionContext, &str) -> Result<()> + Send + 'static,
    {
        self.handlers.data_line = Some(Box::new(f));
        self
    }

    /// Handle end of message. The handler receives the message size.
    pub fn on_eom<F>(mut self, f: F) -> Self
    where
        F: FnMut(&mut SessionContext, u32) -> Result<()> + Send + 'static,
    {
        self.handlers.eom = Some(Box::new(f));
        self
    }

    pub fn on_reset<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Session) -> Result<()> + Send + 'static,
    {
        self.handlers.reset = Some(Box::new(f));
        self
    }

    /// Handle session teardown. Runs before the session is forgotten.
    pub fn on_disconnect<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Session) -> Result<()> + Send + 'static,
    {
        self.handlers.disconnect = Some(Box::new(f));
        self
    }

    pub fn on_commit<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Session) -> Result<()> + Send + 'static,
    {
        self.handlers.commit = Some(Box::new(f));
        self
    }

    pub fn on_rollback<F>(mut self, f: F) -> Self
    where
        F: FnMut(&Session) -> Result<()> + Send + 'static,
    {
        self.handlers.rollback = Some(Box::new(f));
        self
    }

    /// Replace the engine configuration.
    ///
    /// Default: [`EngineConfig::default()`]
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Filter {
        Filter {
            sessions: SessionRegistry::new(self.config.session_capacity),
            handlers: self.handlers,
            config: self.config,
            registration: None,
        }
    }
}

/// A filter plugin: session tracking plus handler dispatch.
pub struct Filter {
    handlers: FilterHandlers,
    config: EngineConfig,
    sessions: SessionRegistry,
    registration: Option<Registration>,
}

impl Filter {
    pub fn builder() -> FilterBuilder {
        FilterBuilder::new()
    }

    /// Hook bitmask this filter announces.
    pub fn hooks(&self) -> u32 {
        self.handlers.hooks()
    }

    /// The daemon's registration, once [`register`](Self::register) succeeded.
    pub fn registration(&self) -> Option<&Registration> {
        self.registration.as_ref()
    }

    /// Tracked sessions.
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Perform the registration handshake.
    ///
    /// Reads exactly one frame, which must be REGISTER carrying a supported
    /// API version, and answers with the hook bitmask.
    pub async fn register<R, W>(&mut self, conn: &mut Connection<R, W>) -> Result<Registration>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let frame = conn.next_frame().await?.ok_or(Error::ConnectionClosed)?;
        if frame.kind() != command::REGISTER {
            return Err(Error::UnexpectedFrame {
                face: "filter",
                kind: command::name(frame.kind()),
            });
        }

        let mut r = frame.reader();
        let version = r.get_typed_uint32()?;
        let name = r.get_typed_string()?;
        if version != FILTER_VERSION {
            return Err(Error::VersionMismatch {
                face: "filter",
                expected: FILTER_VERSION,
                actual: version,
            });
        }

        let mask = self.hooks();
        let mut w = PayloadWriter::new();
        w.put_typed_int(mask as i32);
        w.put_typed_int(0);
        let reply = Frame::outgoing(
            command::REGISTER,
            self.config.peer_id,
            self.config.pid,
            w.freeze(),
        );
        conn.write_frame(&reply).await?;

        tracing::info!(
            "filter: registered {:?} (API version {}) hooks=[{}]",
            name,
            version,
            hooks::names(mask)
        );

        let registration = Registration { version, name };
        self.registration = Some(registration.clone());
        Ok(registration)
    }

    /// Register if needed, then dispatch frames until the daemon hangs up.
    ///
    /// Returns `Ok(())` when the stream ends cleanly between frames. Any
    /// other failure, including a handler error, ends the loop with that
    /// error.
    pub async fn serve<R, W>(&mut self, conn: &mut Connection<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if self.registration.is_none() {
            if let Err(e) = self.register(conn).await {
                tracing::error!("filter: registration failed: {}", e);
                return Err(e);
            }
        }

        loop {
            let frame = match conn.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("filter: daemon closed the connection");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!("filter: read failed: {}", e);
                    return Err(e);
                }
            };

            if let Err(e) = self.dispatch(&frame, conn).await {
                tracing::error!("filter: {} failed: {}", command::name(frame.kind()), e);
                return Err(e);
            }
        }
    }

    /// Serve the daemon on the inherited descriptor.
    #[cfg(unix)]
    pub async fn run(mut self) -> Result<()> {
        let mut conn = crate::transport::InheritedConnection::inherited()?;
        self.serve(&mut conn).await
    }

    async fn dispatch<R, W>(&mut self, frame: &Frame, conn: &mut Connection<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        if self.config.debug {
            tracing::debug!(
                "filter: {} with {} byte payload",
                command::name(frame.kind()),
                frame.payload_len()
            );
        }

        match frame.kind() {
            command::EVENT => self.handle_event(frame),
            command::QUERY => {
                if let Some(reply) = self.handle_query(frame)? {
                    conn.write_frame(&reply).await?;
                }
                Ok(())
            }
            other => {
                tracing::warn!("filter: ignoring {}", command::name(other));
                Ok(())
            }
        }
    }

    fn handle_event(&mut self, frame: &Frame) -> Result<()> {
        let mut r = frame.reader();
        let id = r.get_typed_id()?;
        let raw = r.get_typed_int()?;
        let Some(kind) = EventKind::from_wire(raw) else {
            tracing::warn!("filter: unknown event kind {} for session {:#x}", raw, id);
            return Ok(());
        };

        tracing::debug!("filter: {} session={:#x}", kind, id);

        match kind {
            EventKind::Connect => self.sessions.insert(id),
            EventKind::Disconnect => {
                let session = self.snapshot(id);
                fire(&mut self.handlers.disconnect, &session)?;
                self.sessions.remove(id);
            }
            EventKind::Reset => {
                let session = self.snapshot(id);
                fire(&mut self.handlers.reset, &session)?;
            }
            EventKind::TxCommit => {
                let session = self.snapshot(id);
                fire(&mut self.handlers.commit, &session)?;
            }
            EventKind::TxRollback => {
                let session = self.snapshot(id);
                fire(&mut self.handlers.rollback, &session)?;
            }
            EventKind::TxBegin => {}
        }
        Ok(())
    }

    /// Decode a query, run its handler and return the response to write.
    fn handle_query(&mut self, frame: &Frame) -> Result<Option<Frame>> {
        let mut r = frame.reader();
        let id = r.get_typed_id()?;
        let qid = r.get_typed_id()?;
        let raw = r.get_typed_int()?;
        let Some(kind) = QueryKind::from_wire(raw) else {
            tracing::warn!(
                "filter: unknown query kind {} ({:#x}) for session {:#x}",
                raw,
                qid,
                id
            );
            return Ok(None);
        };

        let query = PendingQuery { kind, id: qid };
        let session = {
            // Queries may arrive for sessions whose CONNECT event we never saw
            let session = self.sessions.get_or_create(id);
            session.query = Some(query);
            *session
        };
        let mut ctx = SessionContext::new(session, query, &self.config);
        let handlers = &mut self.handlers;

        match kind {
            QueryKind::Connect => {
                let local = r.get_typed_sockaddr()?;
                let remote = r.get_typed_sockaddr()?;
                let hostname = r.get_typed_string()?;
                let connect = ConnectQuery {
                    local,
                    remote,
                    hostname,
                };
                tracing::debug!("filter: {} session={:#x} {}", kind, id, connect);
                if let Some(f) = handlers.connect.as_mut() {
                    f(&mut ctx, &connect)?;
                }
            }
            QueryKind::Helo => {
                let helo = r.get_typed_string()?;
                tracing::debug!("filter: {} session={:#x} {:?}", kind, id, helo);
                match handlers.helo.as_mut() {
                    Some(f) => f(&mut ctx, &helo)?,
                    None => ctx.accept()?,
                }
            }
            QueryKind::Mail | QueryKind::Rcpt => {
                let addr = r.get_typed_mailaddr()?;
                tracing::debug!("filter: {} session={:#x} <{}>", kind, id, addr);
                let slot = if kind == QueryKind::Mail {
                    handlers.mail.as_mut()
                } else {
                    handlers.rcpt.as_mut()
                };
                match slot {
                    Some(f) => f(&mut ctx, &addr)?,
                    None => ctx.accept()?,
                }
            }
            QueryKind::Data => {
                tracing::debug!("filter: {} session={:#x}", kind, id);
                match handlers.data.as_mut() {
                    Some(f) => f(&mut ctx)?,
                    None => ctx.accept()?,
                }
            }
            QueryKind::Eom => {
                let size = r.get_typed_uint32()?;
                tracing::debug!("filter: {} session={:#x} size={}", kind, id, size);
                match handlers.eom.as_mut() {
                    Some(f) => f(&mut ctx, size)?,
                    None => ctx.accept()?,
                }
            }
            QueryKind::DataLine => {
                let line = r.get_typed_string()?;
                match handlers.data_line.as_mut() {
                    Some(f) => f(&mut ctx, &line)?,
                    None => ctx.accept()?,
                }
            }
        }

        if !ctx.is_answered() {
            tracing::warn!(
                "filter: {} {:#x} for session {:#x} left unanswered",
                kind,
                qid,
                id
            );
        }
        Ok(ctx.into_reply())
    }

    /// Current state of `id`, or a fresh session if it is not tracked.
    fn snapshot(&self, id: u64) -> Session {
        self.sessions
            .peek(id)
            .copied()
            .unwrap_or_else(|| Session::new(id))
    }
}

fn fire(slot: &mut Option<EventHandler>, session: &Session) -> Result<()> {
    match slot.as_mut() {
        Some(f) => f(session),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::tags;
    use crate::filter::Status;

    fn event(id: u64, kind: i32) -> Frame {
        let mut w = PayloadWriter::new();
        w.put_typed_id(id);
        w.put_typed_int(kind);
        Frame::outgoing(command::EVENT, 14, 1, w.freeze())
    }

    fn helo_query(id: u64, qid: u64, helo: &str) -> Frame {
        let mut w = PayloadWriter::new();
        w.put_typed_id(id);
        w.put_typed_id(qid);
        w.put_typed_int(QueryKind::Helo.to_wire());
        w.put_typed_string(helo);
        Frame::outgoing(command::QUERY, 14, 1, w.freeze())
    }

    #[test]
    fn test_builder_hooks() {
        let filter = Filter::builder()
            .on_helo(|ctx, _| ctx.accept())
            .on_mail(|ctx, _| ctx.accept())
            .build();
        assert_eq!(filter.hooks(), hooks::HELO | hooks::MAIL);
        assert!(filter.registration().is_none());
    }

    #[test]
    fn test_builder_config() {
        let config = EngineConfig::default().with_pid(99).with_debug(true);
        let filter = Filter::builder().config(config.clone()).build();
        assert_eq!(filter.config(), &config);
        assert_eq!(filter.sessions().capacity(), config.session_capacity.get());
    }

    #[test]
    fn test_connect_and_disconnect_events() {
        let mut filter = Filter::builder().build();
        filter.handle_event(&event(7, 0)).unwrap();
        assert!(filter.sessions().contains(7));

        filter.handle_event(&event(7, 2)).unwrap();
        assert!(!filter.sessions().contains(7));
    }

    #[test]
    fn test_disconnect_sees_session_before_removal() {
        let mut filter = Filter::builder()
            .on_disconnect(|session| {
                assert_eq!(session.id, 7);
                assert_eq!(session.query.map(|q| q.id), Some(3));
                Ok(())
            })
            .build();

        filter.handle_event(&event(7, 0)).unwrap();
        filter.handle_query(&helo_query(7, 3, "mx")).unwrap();
        filter.handle_event(&event(7, 2)).unwrap();
        assert!(filter.sessions().is_empty());
    }

    #[test]
    fn test_unknown_event_kind_ignored() {
        let mut filter = Filter::builder().build();
        filter.handle_event(&event(1, 42)).unwrap();
        assert!(filter.sessions().is_empty());
    }

    #[test]
    fn test_query_creates_missing_session() {
        let mut filter = Filter::builder().build();
        let reply = filter.handle_query(&helo_query(9, 4, "mx")).unwrap();
        assert!(reply.is_some());

        let session = filter.sessions().peek(9).unwrap();
        assert_eq!(
            session.query,
            Some(PendingQuery {
                kind: QueryKind::Helo,
                id: 4
            })
        );
    }

    #[test]
    fn test_helo_handler_reject() {
        let mut filter = Filter::builder()
            .on_helo(|ctx, helo| {
                assert_eq!(helo, "example.com");
                ctx.reject(Status::Fail, 0)
            })
            .build();

        let reply = filter
            .handle_query(&helo_query(7, 3, "example.com"))
            .unwrap()
            .unwrap();
        let mut r = reply.reader();
        assert_eq!(r.get_typed_id().unwrap(), 3);
        assert_eq!(r.get_typed_int().unwrap(), QueryKind::Helo.to_wire());
        assert_eq!(r.get_typed_int().unwrap(), Status::Fail.to_wire());
    }

    #[test]
    fn test_handler_error_propagates() {
        let mut filter = Filter::builder()
            .on_helo(|_, _| Err(Error::handler("boom")))
            .build();
        assert!(matches!(
            filter.handle_query(&helo_query(1, 1, "mx")),
            Err(Error::Handler(_))
        ));
    }

    #[test]
    fn test_query_tag_mismatch() {
        let mut w = PayloadWriter::new();
        w.put_typed_id(1);
        w.put_typed_int(1);
        let frame = Frame::outgoing(command::QUERY, 14, 1, w.freeze());

        let mut filter = Filter::builder().build();
        match filter.handle_query(&frame) {
            Err(Error::TypeMismatch { expected, actual }) => {
                assert_eq!(expected, tags::M_ID);
                assert_eq!(actual, tags::M_INT);
            }
            other => panic!("expected tag mismatch, got {:?}", other.map(|_| ())),
        }
    }
}
