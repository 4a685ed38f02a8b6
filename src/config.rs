//! Engine configuration.
//!
//! Process identity and verbosity are passed in explicitly instead of living
//! in process-wide globals.

use std::num::NonZeroUsize;

use crate::protocol::IMSG_VERSION;

/// Default capacity of the filter session registry.
pub const DEFAULT_SESSION_CAPACITY: usize = 1024;

/// Environment variable enabling verbose request tracing.
pub const ENV_DEBUG: &str = "SMTPD_PROC_DEBUG";

/// Environment variable overriding the session registry capacity.
pub const ENV_SESSIONS: &str = "SMTPD_PROC_SESSIONS";

/// Settings shared by the filter and table engines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Trace decoded request details (table parameters, payload sizes).
    pub debug: bool,
    /// Process id stamped on outgoing frames.
    pub pid: u32,
    /// Peer id stamped on outgoing frames.
    pub peer_id: u32,
    /// Maximum number of tracked filter sessions.
    pub session_capacity: NonZeroUsize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debug: false,
            pid: std::process::id(),
            peer_id: IMSG_VERSION,
            session_capacity: NonZeroUsize::new(DEFAULT_SESSION_CAPACITY)
                .unwrap_or(NonZeroUsize::MIN),
        }
    }
}

impl EngineConfig {
    /// Defaults overlaid with `SMTPD_PROC_DEBUG` and `SMTPD_PROC_SESSIONS`.
    ///
    /// Unparseable values are ignored with a warning.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(value) = lookup(ENV_DEBUG) {
            config.debug = matches!(
                value.trim().to_ascii_lowercase().as_str(),
                "1" | "true" | "yes" | "on"
            );
        }

        if let Some(value) = lookup(ENV_SESSIONS) {
            match value.trim().parse::<NonZeroUsize>() {
                Ok(capacity) => config.session_capacity = capacity,
                Err(e) => tracing::warn!("ignoring {}={:?}: {}", ENV_SESSIONS, value, e),
            }
        }

        config
    }

    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn with_pid(mut self, pid: u32) -> Self {
        self.pid = pid;
        self
    }

    pub fn with_session_capacity(mut self, capacity: NonZeroUsize) -> Self {
        self.session_capacity = capacity;
        self
    }
}
