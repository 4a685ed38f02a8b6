//! Table builder and serve loop.
//!
//! A table answers key lookups for the daemon (aliases, credentials,
//! domains, ...). Requests are strictly sequential: each one is read,
//! handled and answered before the next is read.
//!
//! # Example
//!
//! ```ignore
//! use smtpd_proc::table::{Services, Table};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> smtpd_proc::Result<()> {
//!     Table::builder()
//!         .on_lookup(|service, _params, key| {
//!             if service.contains(Services::ALIAS) && key == "postmaster" {
//!                 return Ok(Some("root".to_string()));
//!             }
//!             Ok(None)
//!         })
//!         .build()
//!         .run()
//!         .await
//! }
//! ```

use tokio::io::{AsyncRead, AsyncWrite};

use super::kinds::{command, TABLE_VERSION};
use super::service::{Dict, Services};
use crate::codec::{PayloadReader, PayloadWriter};
use crate::config::EngineConfig;
use crate::error::{Error, Result};
use crate::protocol::Frame;
use crate::transport::Connection;

/// UPDATE handler. Returns the refresh status (1 on success).
pub type UpdateHandler = Box<dyn FnMut() -> Result<i32> + Send>;

/// CHECK handler. Returns 1 for a match, 0 for no match, -1 for no opinion.
pub type CheckHandler = Box<dyn FnMut(Services, &Dict, &str) -> Result<i32> + Send>;

/// LOOKUP handler. `None` or an empty string means not found.
pub type LookupHandler = Box<dyn FnMut(Services, &Dict, &str) -> Result<Option<String>> + Send>;

/// FETCH handler. `None` or an empty string means nothing to fetch.
pub type FetchHandler = Box<dyn FnMut(Services, &Dict) -> Result<Option<String>> + Send>;

/// CLOSE handler.
pub type CloseHandler = Box<dyn FnMut() -> Result<()> + Send>;

/// Table lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableState {
    /// Waiting for OPEN.
    Unopened,
    /// Serving requests.
    Open,
    /// CLOSE received; nothing more is read.
    Closed,
}

#[derive(Default)]
struct TableHandlers {
    update: Option<UpdateHandler>,
    check: Option<CheckHandler>,
    lookup: Option<LookupHandler>,
    fetch: Option<FetchHandler>,
    close: Option<CloseHandler>,
}

/// Builder for a [`Table`].
#[derive(Default)]
pub struct TableBuilder {
    handlers: TableHandlers,
    config: EngineConfig,
}

impl TableBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Handle UPDATE. Without a handler every update reports success.
    pub fn on_update<F>(mut self, f: F) -> Self
    where
        F: FnMut() -> Result<i32> + Send + 'static,
    {
        self.handlers.update = Some(Box::new(f));
        self
    }

    /// Handle CHECK. Without a handler every check answers -1.
    pub fn on_check<F>(mut self, f: F) -> Self
    where
        F: FnMut(Services, &Dict, &str) -> Result<i32> + Send + 'static,
    {
        self.handlers.check = Some(Box::new(f));
        self
    }

    pub fn on_lookup<F>(mut self, f: F) -> Self
    where
        F: FnMut(Services, &Dict, &str) -> Result<Option<String>> + Send + 'static,
    {
        self.handlers.lookup = Some(Box::new(f));
        self
    }

    pub fn on_fetch<F>(mut self, f: F) -> Self
    where
        F: FnMut(Services, &Dict) -> Result<Option<String>> + Send + 'static,
    {
        self.handlers.fetch = Some(Box::new(f));
        self
    }

    pub fn on_close<F>(mut self, f: F) -> Self
    where
        F: FnMut() -> Result<()> + Send + 'static,
    {
        self.handlers.close = Some(Box::new(f));
        self
    }

    /// Replace the engine configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Table {
        Table {
            handlers: self.handlers,
            config: self.config,
            state: TableState::Unopened,
            name: None,
        }
    }
}

/// A table plugin.
pub struct Table {
    handlers: TableHandlers,
    config: EngineConfig,
    state: TableState,
    name: Option<String>,
}

impl Table {
    pub fn builder() -> TableBuilder {
        TableBuilder::new()
    }

    pub fn state(&self) -> TableState {
        self.state
    }

    /// Table name announced by the daemon in OPEN.
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Answer requests until CLOSE or until the daemon hangs up.
    ///
    /// Both end the loop with `Ok(())`. Any other failure, including a
    /// handler error, ends it with that error.
    pub async fn serve<R, W>(&mut self, conn: &mut Connection<R, W>) -> Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        while self.state != TableState::Closed {
            let frame = match conn.next_frame().await {
                Ok(Some(frame)) => frame,
                Ok(None) => {
                    tracing::info!("table: daemon closed the connection");
                    return Ok(());
                }
                Err(e) => {
                    tracing::error!("table: read failed: {}", e);
                    return Err(e);
                }
            };

            tracing::debug!("table: {}", command::name(frame.kind()));

            let reply = match self.dispatch(&frame) {
                Ok(reply) => reply,
                Err(e) => {
                    tracing::error!("table: {} failed: {}", command::name(frame.kind()), e);
                    return Err(e);
                }
            };
            if let Some(reply) = reply {
                conn.write_frame(&reply).await?;
            }
        }
        Ok(())
    }

    /// Serve the daemon on the inherited descriptor.
    #[cfg(unix)]
    pub async fn run(mut self) -> Result<()> {
        let mut conn = crate::transport::InheritedConnection::inherited()?;
        self.serve(&mut conn).await
    }

    /// Handle one request and return the frame to answer with.
    fn dispatch(&mut self, frame: &Frame) -> Result<Option<Frame>> {
        let kind = frame.kind();
        let mut r = frame.reader();

        if self.state == TableState::Unopened && kind != command::OPEN {
            return Err(Error::UnexpectedFrame {
                face: "table",
                kind: command::name(kind),
            });
        }

        match kind {
            command::OPEN => {
                if self.state != TableState::Unopened {
                    return Err(Error::UnexpectedFrame {
                        face: "table",
                        kind: command::name(kind),
                    });
                }
                self.open(&mut r)?;
                Ok(Some(self.reply(PayloadWriter::new())))
            }
            command::UPDATE => {
                let result = match self.handlers.update.as_mut() {
                    Some(f) => f()?,
                    None => 1,
                };
                tracing::debug!("table: update result={}", result);
                Ok(Some(self.int_reply(result)))
            }
            command::CLOSE => {
                if let Some(f) = self.handlers.close.as_mut() {
                    f()?;
                }
                self.state = TableState::Closed;
                tracing::info!("table: {:?} closed", self.name.as_deref().unwrap_or(""));
                Ok(None)
            }
            command::CHECK => {
                let service = Services::from_wire(r.get_int()?);
                let params = self.params(&mut r)?;
                let key = r.get_string()?;
                self.trace_request("check", service, &params, Some(&key));

                let result = match self.handlers.check.as_mut() {
                    Some(f) => f(service, &params, &key)?,
                    None => -1,
                };
                tracing::debug!("table: check result={}", result);
                Ok(Some(self.int_reply(result)))
            }
            command::LOOKUP => {
                let service = Services::from_wire(r.get_int()?);
                let params = self.params(&mut r)?;
                let key = r.get_string()?;
                self.trace_request("lookup", service, &params, Some(&key));

                let value = match self.handlers.lookup.as_mut() {
                    Some(f) => f(service, &params, &key)?,
                    None => None,
                };
                Ok(Some(self.value_reply(value)))
            }
            command::FETCH => {
                let service = Services::from_wire(r.get_int()?);
                let params = self.params(&mut r)?;
                self.trace_request("fetch", service, &params, None);

                let value = match self.handlers.fetch.as_mut() {
                    Some(f) => f(service, &params)?,
                    None => None,
                };
                Ok(Some(self.value_reply(value)))
            }
            other => {
                tracing::warn!("table: ignoring {}", command::name(other));
                Ok(None)
            }
        }
    }

    fn open(&mut self, r: &mut PayloadReader<'_>) -> Result<()> {
        let version = r.get_uint32()?;
        if version != TABLE_VERSION {
            return Err(Error::VersionMismatch {
                face: "table",
                expected: TABLE_VERSION,
                actual: version,
            });
        }

        let name = r.get_string()?;
        if name.is_empty() {
            return Err(Error::Protocol("table: no name supplied by smtpd".into()));
        }

        tracing::info!("table: opened {:?} (API version {})", name, version);
        self.name = Some(name);
        self.state = TableState::Open;
        Ok(())
    }

    /// Decode the parameter dictionary: a pair count, then key/value strings.
    fn params(&self, r: &mut PayloadReader<'_>) -> Result<Dict> {
        let count = r.get_size()?;
        if self.config.debug {
            tracing::debug!("table: params: {} pairs", count);
        }

        // Each pair needs at least two bytes
        let mut params = Dict::with_capacity((count as usize).min(r.remaining() / 2));
        for _ in 0..count {
            let key = r.get_string()?;
            let value = r.get_string()?;
            params.insert(key, value);
        }
        Ok(params)
    }

    fn trace_request(&self, op: &str, service: Services, params: &Dict, key: Option<&str>) {
        if !self.config.debug {
            return;
        }
        match key {
            Some(key) => tracing::debug!(
                "table_{}: service={},params={:?},key={:?}",
                op,
                service,
                params,
                key
            ),
            None => tracing::debug!("table_{}: service={},params={:?}", op, service, params),
        }
    }

    fn int_reply(&self, value: i32) -> Frame {
        let mut w = PayloadWriter::new();
        w.put_int(value);
        self.reply(w)
    }

    fn value_reply(&self, value: Option<String>) -> Frame {
        let mut w = PayloadWriter::new();
        match value.filter(|v| !v.is_empty()) {
            Some(v) => {
                w.put_int(1);
                w.put_string(&v);
            }
            None => w.put_int(-1),
        }
        self.reply(w)
    }

    fn reply(&self, payload: PayloadWriter) -> Frame {
        Frame::outgoing(
            command::OK,
            self.config.peer_id,
            self.config.pid,
            payload.freeze(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(kind: u32, build: impl FnOnce(&mut PayloadWriter)) -> Frame {
        let mut w = PayloadWriter::new();
        build(&mut w);
        Frame::outgoing(kind, 14, 1, w.freeze())
    }

    fn open(name: &str) -> Frame {
        request(command::OPEN, |w| {
            w.put_uint32(TABLE_VERSION);
            w.put_string(name);
        })
    }

    fn lookup(service: Services, params: &[(&str, &str)], key: &str) -> Frame {
        request(command::LOOKUP, |w| {
            w.put_int(service.bits() as i32);
            w.put_size(params.len() as u64);
            for (k, v) in params {
                w.put_string(k);
                w.put_string(v);
            }
            w.put_string(key);
        })
    }

    fn opened(table: &mut Table) {
        table.dispatch(&open("aliases")).unwrap();
        assert_eq!(table.state(), TableState::Open);
    }

    #[test]
    fn test_open() {
        let mut table = Table::builder()
            .config(EngineConfig::default().with_pid(321))
            .build();
        let reply = table.dispatch(&open("aliases")).unwrap().unwrap();

        assert_eq!(reply.kind(), command::OK);
        assert_eq!(reply.pid(), 321);
        assert!(reply.payload().is_empty());
        assert_eq!(table.name(), Some("aliases"));
    }

    #[test]
    fn test_open_version_mismatch() {
        let mut table = Table::builder().build();
        let frame = request(command::OPEN, |w| {
            w.put_uint32(1);
            w.put_string("aliases");
        });
        assert!(matches!(
            table.dispatch(&frame),
            Err(Error::VersionMismatch {
                expected: 2,
                actual: 1,
                ..
            })
        ));
    }

    #[test]
    fn test_open_requires_name() {
        let mut table = Table::builder().build();
        assert!(matches!(
            table.dispatch(&open("")),
            Err(Error::Protocol(_))
        ));
        assert_eq!(table.state(), TableState::Unopened);
    }

    #[test]
    fn test_request_before_open() {
        let mut table = Table::builder().build();
        let frame = lookup(Services::ALIAS, &[], "root");
        assert!(matches!(
            table.dispatch(&frame),
            Err(Error::UnexpectedFrame { face: "table", .. })
        ));
    }

    #[test]
    fn test_update_default_and_handler() {
        let mut table = Table::builder().build();
        opened(&mut table);
        let reply = table.dispatch(&request(command::UPDATE, |_| {})).unwrap().unwrap();
        assert_eq!(reply.reader().get_int().unwrap(), 1);

        let mut table = Table::builder().on_update(|| Ok(0)).build();
        opened(&mut table);
        let reply = table.dispatch(&request(command::UPDATE, |_| {})).unwrap().unwrap();
        assert_eq!(reply.reader().get_int().unwrap(), 0);
    }

    #[test]
    fn test_lookup_passes_params() {
        let mut table = Table::builder()
            .on_lookup(|service, params, key| {
                assert_eq!(service, Services::ALIAS);
                assert_eq!(params.get("a").map(String::as_str), Some("2"));
                assert_eq!(params.len(), 1);
                Ok(Some(format!("{}@example.org", key)))
            })
            .build();
        opened(&mut table);

        // Duplicate keys: last one wins
        let frame = lookup(Services::ALIAS, &[("a", "1"), ("a", "2")], "root");
        let reply = table.dispatch(&frame).unwrap().unwrap();
        let mut r = reply.reader();
        assert_eq!(r.get_int().unwrap(), 1);
        assert_eq!(r.get_string().unwrap(), "root@example.org");
        assert!(r.is_empty());
    }

    #[test]
    fn test_lookup_empty_is_not_found() {
        let mut table = Table::builder()
            .on_lookup(|_, _, _| Ok(Some(String::new())))
            .build();
        opened(&mut table);

        let reply = table
            .dispatch(&lookup(Services::DOMAIN, &[], "x"))
            .unwrap()
            .unwrap();
        let mut r = reply.reader();
        assert_eq!(r.get_int().unwrap(), -1);
        assert!(r.is_empty());
    }

    #[test]
    fn test_fetch() {
        let mut table = Table::builder()
            .on_fetch(|service, _| {
                assert_eq!(service, Services::SOURCE);
                Ok(Some("192.0.2.1".to_string()))
            })
            .build();
        opened(&mut table);

        let frame = request(command::FETCH, |w| {
            w.put_int(Services::SOURCE.bits() as i32);
            w.put_size(0);
        });
        let reply = table.dispatch(&frame).unwrap().unwrap();
        let mut r = reply.reader();
        assert_eq!(r.get_int().unwrap(), 1);
        assert_eq!(r.get_string().unwrap(), "192.0.2.1");
    }

    #[test]
    fn test_close_runs_handler() {
        let mut table = Table::builder()
            .on_close(|| Err(Error::handler("close failed")))
            .build();
        opened(&mut table);
        assert!(matches!(
            table.dispatch(&request(command::CLOSE, |_| {})),
            Err(Error::Handler(_))
        ));

        let mut table = Table::builder().build();
        opened(&mut table);
        assert!(table
            .dispatch(&request(command::CLOSE, |_| {}))
            .unwrap()
            .is_none());
        assert_eq!(table.state(), TableState::Closed);
    }

    #[test]
    fn test_unknown_command_ignored() {
        let mut table = Table::builder().build();
        opened(&mut table);
        assert!(table.dispatch(&request(42, |_| {})).unwrap().is_none());
        assert_eq!(table.state(), TableState::Open);
    }

    #[test]
    fn test_truncated_params() {
        let mut table = Table::builder().build();
        opened(&mut table);
        let frame = request(command::CHECK, |w| {
            w.put_int(1);
            w.put_size(3);
            w.put_string("only-a-key");
        });
        assert!(table.dispatch(&frame).is_err());
    }
}
