//! Decoded query arguments.

use std::fmt;

use crate::codec::Sockaddr;

/// Arguments of a CONNECT query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectQuery {
    /// Address the client connected to.
    pub local: Sockaddr,
    /// Address the client connected from.
    pub remote: Sockaddr,
    /// Hostname the daemon resolved for `remote`.
    pub hostname: String,
}

impl fmt::Display for ConnectQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} -> {} [hostname={}]",
            self.remote, self.local, self.hostname
        )
    }
}
