//! Filter protocol constants.

use std::fmt;

/// Filter API version this crate speaks.
pub const FILTER_VERSION: u32 = 52;

/// Frame types on the filter face.
pub mod command {
    pub const REGISTER: u32 = 0;
    pub const EVENT: u32 = 1;
    pub const QUERY: u32 = 2;
    pub const PIPE: u32 = 3;
    pub const RESPONSE: u32 = 4;

    /// Printable name of a filter frame type.
    pub fn name(kind: u32) -> String {
        let name = match kind {
            REGISTER => "IMSG_FILTER_REGISTER",
            EVENT => "IMSG_FILTER_EVENT",
            QUERY => "IMSG_FILTER_QUERY",
            PIPE => "IMSG_FILTER_PIPE",
            RESPONSE => "IMSG_FILTER_RESPONSE",
            other => return format!("UNKNOWN {}", other),
        };
        name.to_string()
    }
}

/// Hook bits announced at registration.
pub mod hooks {
    pub const CONNECT: u32 = 1 << 0;
    pub const HELO: u32 = 1 << 1;
    pub const MAIL: u32 = 1 << 2;
    pub const RCPT: u32 = 1 << 3;
    pub const DATA: u32 = 1 << 4;
    pub const EOM: u32 = 1 << 5;
    pub const RESET: u32 = 1 << 6;
    pub const DISCONNECT: u32 = 1 << 7;
    pub const COMMIT: u32 = 1 << 8;
    pub const ROLLBACK: u32 = 1 << 9;
    pub const DATALINE: u32 = 1 << 10;

    const NAMES: [&str; 11] = [
        "HOOK_CONNECT",
        "HOOK_HELO",
        "HOOK_MAIL",
        "HOOK_RCPT",
        "HOOK_DATA",
        "HOOK_EOM",
        "HOOK_RESET",
        "HOOK_DISCONNECT",
        "HOOK_COMMIT",
        "HOOK_ROLLBACK",
        "HOOK_DATALINE",
    ];

    /// Comma-separated names of the bits set in `mask`.
    pub fn names(mask: u32) -> String {
        NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| mask & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect::<Vec<_>>()
            .join(",")
    }
}

/// Asynchronous lifecycle notifications. Never answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    Connect,
    Reset,
    Disconnect,
    TxBegin,
    TxCommit,
    TxRollback,
}

impl EventKind {
    pub fn from_wire(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Connect,
            1 => Self::Reset,
            2 => Self::Disconnect,
            3 => Self::TxBegin,
            4 => Self::TxCommit,
            5 => Self::TxRollback,
            _ => return None,
        })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "EVENT_CONNECT",
            Self::Reset => "EVENT_RESET",
            Self::Disconnect => "EVENT_DISCONNECT",
            Self::TxBegin => "EVENT_TX_BEGIN",
            Self::TxCommit => "EVENT_TX_COMMIT",
            Self::TxRollback => "EVENT_TX_ROLLBACK",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Synchronous per-transaction queries. The daemon blocks until answered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueryKind {
    Connect,
    Helo,
    Mail,
    Rcpt,
    Data,
    Eom,
    DataLine,
}

impl QueryKind {
    pub fn from_wire(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Connect,
            1 => Self::Helo,
            2 => Self::Mail,
            3 => Self::Rcpt,
            4 => Self::Data,
            5 => Self::Eom,
            6 => Self::DataLine,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> i32 {
        match self {
            Self::Connect => 0,
            Self::Helo => 1,
            Self::Mail => 2,
            Self::Rcpt => 3,
            Self::Data => 4,
            Self::Eom => 5,
            Self::DataLine => 6,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "QUERY_CONNECT",
            Self::Helo => "QUERY_HELO",
            Self::Mail => "QUERY_MAIL",
            Self::Rcpt => "QUERY_RCPT",
            Self::Data => "QUERY_DATA",
            Self::Eom => "QUERY_EOM",
            Self::DataLine => "QUERY_DATALINE",
        }
    }
}

impl fmt::Display for QueryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Verdict carried in a response frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Status {
    Ok,
    Fail,
    Close,
}

impl Status {
    pub fn from_wire(value: i32) -> Option<Self> {
        Some(match value {
            0 => Self::Ok,
            1 => Self::Fail,
            2 => Self::Close,
            _ => return None,
        })
    }

    pub fn to_wire(self) -> i32 {
        match self {
            Self::Ok => 0,
            Self::Fail => 1,
            Self::Close => 2,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ok => "FILTER_OK",
            Self::Fail => "FILTER_FAIL",
            Self::Close => "FILTER_CLOSE",
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hook_bits_follow_wire_order() {
        assert_eq!(hooks::CONNECT, 0x001);
        assert_eq!(hooks::HELO, 0x002);
        assert_eq!(hooks::EOM, 0x020);
        assert_eq!(hooks::DATALINE, 0x400);
    }

    #[test]
    fn test_hook_names() {
        assert_eq!(hooks::names(hooks::HELO | hooks::MAIL), "HOOK_HELO,HOOK_MAIL");
        assert_eq!(hooks::names(0), "");
        assert_eq!(hooks::names(hooks::DATALINE), "HOOK_DATALINE");
    }

    #[test]
    fn test_query_kind_wire_values() {
        for value in 0..=6 {
            let kind = QueryKind::from_wire(value).unwrap();
            assert_eq!(kind.to_wire(), value);
        }
        assert!(QueryKind::from_wire(7).is_none());
        assert!(QueryKind::from_wire(-1).is_none());
    }

    #[test]
    fn test_event_kind_wire_values() {
        assert_eq!(EventKind::from_wire(0), Some(EventKind::Connect));
        assert_eq!(EventKind::from_wire(2), Some(EventKind::Disconnect));
        assert_eq!(EventKind::from_wire(5), Some(EventKind::TxRollback));
        assert!(EventKind::from_wire(6).is_none());
    }

    #[test]
    fn test_command_names() {
        assert_eq!(command::name(command::QUERY), "IMSG_FILTER_QUERY");
        assert_eq!(command::name(42), "UNKNOWN 42");
    }

    #[test]
    fn test_status_display() {
        assert_eq!(Status::Fail.to_string(), "FILTER_FAIL");
        assert_eq!(Status::from_wire(2), Some(Status::Close));
    }
}
