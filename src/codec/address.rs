//! Socket and mail address values carried in daemon payloads.

use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr, SocketAddr};

use bytes::Bytes;

/// Size of the local-part field of a mail address, NUL padding included.
pub const LOCAL_PART_SIZE: usize = 256;

/// Size of the domain field of a mail address, NUL padding included.
pub const DOMAIN_PART_SIZE: usize = 256;

/// Fixed wire size of a mail address.
pub const MAILADDR_SIZE: usize = LOCAL_PART_SIZE + DOMAIN_PART_SIZE;

const SOCKADDR_IN_LEN: usize = 16;
const SOCKADDR_IN6_LEN: usize = 28;

/// Raw `sockaddr` blob as copied out of the daemon.
///
/// The layout is recognized by length only: 16 bytes is `sockaddr_in`,
/// 28 bytes is `sockaddr_in6`. Anything else is kept verbatim but yields
/// no address or port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Sockaddr(Bytes);

impl Sockaddr {
    pub fn from_bytes(raw: &[u8]) -> Self {
        Self(Bytes::copy_from_slice(raw))
    }

    /// Raw bytes as received.
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn ip(&self) -> Option<IpAddr> {
        let raw = &self.0[..];
        match raw.len() {
            SOCKADDR_IN_LEN => {
                let octets: [u8; 4] = raw[4..8].try_into().ok()?;
                Some(IpAddr::V4(Ipv4Addr::from(octets)))
            }
            SOCKADDR_IN6_LEN => {
                let octets: [u8; 16] = raw[8..24].try_into().ok()?;
                Some(IpAddr::V6(Ipv6Addr::from(octets)))
            }
            _ => None,
        }
    }

    /// Port at offset 2, little-endian like every other payload field.
    pub fn port(&self) -> Option<u16> {
        match self.0.len() {
            SOCKADDR_IN_LEN | SOCKADDR_IN6_LEN => Some(u16::from_le_bytes([self.0[2], self.0[3]])),
            _ => None,
        }
    }

    pub fn socket_addr(&self) -> Option<SocketAddr> {
        Some(SocketAddr::new(self.ip()?, self.port()?))
    }
}

impl fmt::Display for Sockaddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.socket_addr() {
            Some(addr) => write!(f, "{}", addr),
            None => write!(f, "<sockaddr len={}>", self.0.len()),
        }
    }
}

/// Envelope address split into local part and domain.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MailAddr {
    pub user: String,
    pub domain: String,
}

impl MailAddr {
    pub fn new(user: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            domain: domain.into(),
        }
    }

    /// Decode the fixed 512-byte window; each half is cut at its first NUL.
    pub(crate) fn from_wire(window: &[u8]) -> Self {
        debug_assert_eq!(window.len(), MAILADDR_SIZE);
        let (local, domain) = window.split_at(LOCAL_PART_SIZE);
        Self {
            user: nul_trimmed(local),
            domain: nul_trimmed(domain),
        }
    }
}

impl fmt::Display for MailAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.domain.is_empty() {
            write!(f, "{}", self.user)
        } else {
            write!(f, "{}@{}", self.user, self.domain)
        }
    }
}

fn nul_trimmed(field: &[u8]) -> String {
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    String::from_utf8_lossy(&field[..end]).into_owned()
}
