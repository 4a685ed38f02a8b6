//! Table protocol constants.

/// Table API version this crate speaks.
pub const TABLE_VERSION: u32 = 2;

/// Frame types on the table face.
pub mod command {
    pub const OK: u32 = 0;
    pub const FAIL: u32 = 1;
    pub const OPEN: u32 = 2;
    pub const CLOSE: u32 = 3;
    pub const UPDATE: u32 = 4;
    pub const CHECK: u32 = 5;
    pub const LOOKUP: u32 = 6;
    pub const FETCH: u32 = 7;

    /// Printable name of a table frame type.
    pub fn name(kind: u32) -> String {
        let name = match kind {
            OK => "PROC_TABLE_OK",
            FAIL => "PROC_TABLE_FAIL",
            OPEN => "PROC_TABLE_OPEN",
            CLOSE => "PROC_TABLE_CLOSE",
            UPDATE => "PROC_TABLE_UPDATE",
            CHECK => "PROC_TABLE_CHECK",
            LOOKUP => "PROC_TABLE_LOOKUP",
            FETCH => "PROC_TABLE_FETCH",
            other => return format!("UNKNOWN {}", other),
        };
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_names() {
        assert_eq!(command::name(command::LOOKUP), "PROC_TABLE_LOOKUP");
        assert_eq!(command::name(command::OK), "PROC_TABLE_OK");
        assert_eq!(command::name(99), "UNKNOWN 99");
    }
}
