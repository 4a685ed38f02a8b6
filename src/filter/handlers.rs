//! Handler slots for the filter face.
//!
//! One optional slot per protocol stage. The hook bitmask announced at
//! registration is derived purely from which slots are filled.

use super::context::SessionContext;
use super::kinds::hooks;
use super::query::ConnectQuery;
use super::session::Session;
use crate::codec::MailAddr;
use crate::error::Result;

/// Result type for handler functions.
pub type HandlerResult = Result<()>;

/// CONNECT query handler.
pub type ConnectHandler =
    Box<dyn FnMut(&mut SessionContext, &ConnectQuery) -> HandlerResult + Send>;

/// Handler for queries carrying one line of text (HELO, DATA lines).
pub type LineHandler = Box<dyn FnMut(&mut SessionContext, &str) -> HandlerResult + Send>;

/// Handler for queries carrying an envelope address (MAIL, RCPT).
pub type AddressHandler = Box<dyn FnMut(&mut SessionContext, &MailAddr) -> HandlerResult + Send>;

/// Handler for queries with no arguments (DATA).
pub type QueryHandler = Box<dyn FnMut(&mut SessionContext) -> HandlerResult + Send>;

/// End-of-message handler, given the message size.
pub type EomHandler = Box<dyn FnMut(&mut SessionContext, u32) -> HandlerResult + Send>;

/// Lifecycle event handler. Events are never answered.
pub type EventHandler = Box<dyn FnMut(&Session) -> HandlerResult + Send>;

/// The full set of filter handler slots.
#[derive(Default)]
pub struct FilterHandlers {
    pub connect: Option<ConnectHandler>,
    pub helo: Option<LineHandler>,
    pub mail: Option<AddressHandler>,
    pub rcpt: Option<AddressHandler>,
    pub data: Option<QueryHandler>,
    pub data_line: Option<LineHandler>,
    pub eom: Option<EomHandler>,
    pub reset: Option<EventHandler>,
    pub disconnect: Option<EventHandler>,
    pub commit: Option<EventHandler>,
    pub rollback: Option<EventHandler>,
}

impl FilterHandlers {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hook bitmask announcing the filled slots.
    pub fn hooks(&self) -> u32 {
        [
            (self.connect.is_some(), hooks::CONNECT),
            (self.helo.is_some(), hooks::HELO),
            (self.mail.is_some(), hooks::MAIL),
            (self.rcpt.is_some(), hooks::RCPT),
            (self.data.is_some(), hooks::DATA),
            (self.eom.is_some(), hooks::EOM),
            (self.reset.is_some(), hooks::RESET),
            (self.disconnect.is_some(), hooks::DISCONNECT),
            (self.commit.is_some(), hooks::COMMIT),
            (self.rollback.is_some(), hooks::ROLLBACK),
            (self.data_line.is_some(), hooks::DATALINE),
        ]
        .iter()
        .filter(|(set, _)| *set)
        .fold(0, |mask, (_, bit)| mask | bit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_has_no_hooks() {
        assert_eq!(FilterHandlers::new().hooks(), 0);
    }

    #[test]
    fn test_hooks_from_filled_slots() {
        let mut handlers = FilterHandlers::new();
        handlers.helo = Some(Box::new(|ctx, _| ctx.accept()));
        handlers.mail = Some(Box::new(|ctx, _| ctx.accept()));
        assert_eq!(handlers.hooks(), hooks::HELO | hooks::MAIL);

        handlers.disconnect = Some(Box::new(|_| Ok(())));
        handlers.data_line = Some(Box::new(|ctx, _| ctx.accept()));
        assert_eq!(
            handlers.hooks(),
            hooks::HELO | hooks::MAIL | hooks::DISCONNECT | hooks::DATALINE
        );
    }

    #[test]
    fn test_all_slots() {
        let handlers = FilterHandlers {
            connect: Some(Box::new(|ctx, _| ctx.accept())),
            helo: Some(Box::new(|ctx, _| ctx.accept())),
            mail: Some(Box::new(|ctx, _| ctx.accept())),
            rcpt: Some(Box::new(|ctx, _| ctx.accept())),
            data: Some(Box::new(|ctx| ctx.accept())),
            data_line: Some(Box::new(|ctx, _| ctx.accept())),
            eom: Some(Box::new(|ctx, _| ctx.accept())),
            reset: Some(Box::new(|_| Ok(()))),
            disconnect: Some(Box::new(|_| Ok(()))),
            commit: Some(Box::new(|_| Ok(()))),
            rollback: Some(Box::new(|_| Ok(()))),
        };
        assert_eq!(handlers.hooks(), 0x7FF);
    }
}
