//! Table service sets.
//!
//! The daemon tells a table which kind of lookup it wants as a bitmask. The
//! engine never interprets it; handlers can.

use std::collections::HashMap;
use std::fmt;

/// Request parameters sent along with CHECK, LOOKUP and FETCH.
pub type Dict = HashMap<String, String>;

/// A set of table services.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Services(pub u32);

impl Services {
    pub const NONE: Self = Self(0);
    pub const ALIAS: Self = Self(0x001);
    pub const DOMAIN: Self = Self(0x002);
    pub const CREDENTIALS: Self = Self(0x004);
    pub const NETADDR: Self = Self(0x008);
    pub const USERINFO: Self = Self(0x010);
    pub const SOURCE: Self = Self(0x020);
    pub const MAILADDR: Self = Self(0x040);
    pub const ADDRNAME: Self = Self(0x080);
    pub const MAILADDR_MAP: Self = Self(0x100);
    pub const RELAYHOST: Self = Self(0x200);
    pub const STRING: Self = Self(0x400);
    pub const ANY: Self = Self(0xfff);

    const NAMED: [(Self, &'static str); 11] = [
        (Self::ALIAS, "alias"),
        (Self::DOMAIN, "domain"),
        (Self::CREDENTIALS, "credentials"),
        (Self::NETADDR, "netaddr"),
        (Self::USERINFO, "userinfo"),
        (Self::SOURCE, "source"),
        (Self::MAILADDR, "mailaddr"),
        (Self::ADDRNAME, "addrname"),
        (Self::MAILADDR_MAP, "maddrmap"),
        (Self::RELAYHOST, "relayhost"),
        (Self::STRING, "string"),
    ];

    /// Build from the wire value. Unknown bits are kept.
    pub fn from_wire(value: i32) -> Self {
        Self(value as u32)
    }

    #[inline]
    pub fn bits(self) -> u32 {
        self.0
    }

    /// Whether every service in `other` is in `self`.
    #[inline]
    pub fn contains(self, other: Self) -> bool {
        self.0 & other.0 == other.0
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl std::ops::BitOr for Services {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        Self(self.0 | rhs.0)
    }
}

impl fmt::Display for Services {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = Self::NAMED
            .iter()
            .filter(|(service, _)| self.contains(*service))
            .map(|(_, name)| *name)
            .collect();

        if names.is_empty() {
            write!(f, "{:#x}", self.0)
        } else {
            f.write_str(&names.join(","))
        }
    }
}
