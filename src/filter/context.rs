//! Session context for query handlers.
//!
//! Provides methods for answering the query in flight:
//! - `accept` / `accept_code` - let the SMTP stage proceed
//! - `reject` / `reject_code` - refuse it, optionally with a reply line
//! - `respond` - send an arbitrary status
//!
//! A query must be answered exactly once; the daemon blocks the SMTP session
//! until it is.
//!
//! # Example
//!
//! ```ignore
//! fn on_helo(ctx: &mut SessionContext, helo: &str) -> Result<()> {
//!     if helo == "localhost" {
//!         return ctx.reject_code(Status::Fail, 550, "go away");
//!     }
//!     ctx.accept()
//! }
//! ```

use super::kinds::{command, QueryKind, Status};
use super::session::{PendingQuery, Session};
use crate::codec::PayloadWriter;
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::protocol::Frame;

/// Context passed to query handlers.
///
/// Collects the handler's answer; the engine writes it once the handler
/// returns.
#[derive(Debug)]
pub struct SessionContext {
    session: Session,
    query: PendingQuery,
    peer_id: u32,
    pid: u32,
    reply: Option<Frame>,
    answered: bool,
}

impl SessionContext {
    pub(crate) fn new(session: Session, query: PendingQuery, config: &EngineConfig) -> Self {
        Self {
            session,
            query,
            peer_id: config.peer_id,
            pid: config.pid,
            reply: None,
            answered: false,
        }
    }

    /// The session the query belongs to.
    #[inline]
    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Daemon-assigned session id.
    #[inline]
    pub fn session_id(&self) -> u64 {
        self.session.id
    }

    /// The query being answered.
    #[inline]
    pub fn query(&self) -> PendingQuery {
        self.query
    }

    /// Whether a response has already been produced.
    #[inline]
    pub fn is_answered(&self) -> bool {
        self.answered
    }

    /// Accept with code 0 and no reply line.
    pub fn accept(&mut self) -> Result<()> {
        self.respond(Status::Ok, 0, "")
    }

    /// Accept with a custom SMTP code and reply line.
    pub fn accept_code(&mut self, code: i32, line: &str) -> Result<()> {
        self.respond(Status::Ok, code, line)
    }

    /// Reject. `Status::Ok` is promoted to `Status::Fail`.
    pub fn reject(&mut self, status: Status, code: i32) -> Result<()> {
        self.respond(reject_status(status), code, "")
    }

    /// Reject with a reply line. `Status::Ok` is promoted to `Status::Fail`.
    pub fn reject_code(&mut self, status: Status, code: i32, line: &str) -> Result<()> {
        self.respond(reject_status(status), code, line)
    }

    /// Answer the query with `status`, `code` and an optional reply line.
    ///
    /// EOM queries cannot be answered yet: their response layout differs and
    /// is not implemented. The call is logged and otherwise ignored.
    pub fn respond(&mut self, status: Status, code: i32, line: &str) -> Result<()> {
        if self.answered {
            return Err(Error::Protocol(format!(
                "{} {:#x} already answered",
                self.query.kind, self.query.id
            )));
        }
        self.answered = true;

        tracing::debug!(
            "filter: {} {} [code={},line={:?}]",
            command::name(command::RESPONSE),
            status,
            code,
            line
        );

        if self.query.kind == QueryKind::Eom {
            tracing::warn!(
                "filter: EOM responses are not supported, query {:#x} left unanswered",
                self.query.id
            );
            return Ok(());
        }

        let mut w = PayloadWriter::new();
        w.put_typed_id(self.query.id);
        w.put_typed_int(self.query.kind.to_wire());
        w.put_typed_int(status.to_wire());
        w.put_typed_int(code);
        if !line.is_empty() {
            w.put_typed_string(line);
        }

        self.reply = Some(Frame::outgoing(
            command::RESPONSE,
            self.peer_id,
            self.pid,
            w.freeze(),
        ));
        Ok(())
    }

    /// Response frame to write, if the handler produced one.
    pub(crate) fn into_reply(self) -> Option<Frame> {
        self.reply
    }
}

fn reject_status(status: Status) -> Status {
    match status {
        Status::Ok => Status::Fail,
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context(kind: QueryKind, qid: u64) -> SessionContext {
        let config = EngineConfig::default().with_pid(4242);
        let query = PendingQuery { kind, id: qid };
        let session = Session {
            id: 7,
            query: Some(query),
        };
        SessionContext::new(session, query, &config)
    }

    fn decode(frame: &Frame) -> (u64, i32, i32, i32, Option<String>) {
        let mut r = frame.reader();
        let qid = r.get_typed_id().unwrap();
        let kind = r.get_typed_int().unwrap();
        let status = r.get_typed_int().unwrap();
        let code = r.get_typed_int().unwrap();
        let line = if r.is_empty() {
            None
        } else {
            Some(r.get_typed_string().unwrap())
        };
        (qid, kind, status, code, line)
    }

    #[test]
    fn test_accept() {
        let mut ctx = context(QueryKind::Helo, 3);
        ctx.accept().unwrap();
        let frame = ctx.into_reply().unwrap();

        assert_eq!(frame.kind(), command::RESPONSE);
        assert_eq!(frame.pid(), 4242);
        assert_eq!(decode(&frame), (3, 1, 0, 0, None));
    }

    #[test]
    fn test_reject_promotes_ok() {
        let mut ctx = context(QueryKind::Mail, 11);
        ctx.reject(Status::Ok, 550).unwrap();
        let frame = ctx.into_reply().unwrap();
        assert_eq!(decode(&frame), (11, 2, 1, 550, None));
    }

    #[test]
    fn test_reject_keeps_close() {
        let mut ctx = context(QueryKind::Data, 5);
        ctx.reject_code(Status::Close, 421, "listed").unwrap();
        let frame = ctx.into_reply().unwrap();
        assert_eq!(decode(&frame), (5, 4, 2, 421, Some("listed".to_string())));
    }

    #[test]
    fn test_accept_code_with_line() {
        let mut ctx = context(QueryKind::Rcpt, 8);
        ctx.accept_code(250, "welcome").unwrap();
        let frame = ctx.into_reply().unwrap();
        assert_eq!(decode(&frame), (8, 3, 0, 250, Some("welcome".to_string())));
    }

    #[test]
    fn test_eom_response_is_noop() {
        let mut ctx = context(QueryKind::Eom, 1);
        ctx.accept().unwrap();
        assert!(ctx.is_answered());
        assert!(ctx.into_reply().is_none());
    }

    #[test]
    fn test_second_answer_rejected() {
        let mut ctx = context(QueryKind::Helo, 1);
        ctx.accept().unwrap();
        assert!(matches!(ctx.reject(Status::Fail, 0), Err(Error::Protocol(_))));
    }

    #[test]
    fn test_unanswered_has_no_reply() {
        let ctx = context(QueryKind::Helo, 1);
        assert!(!ctx.is_answered());
        assert!(ctx.into_reply().is_none());
    }
}
