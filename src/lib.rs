//! Library core for RustyMail actions: IMAP mailbox and email operations run
//! item by item over a single session.

// --- Modules ---
pub mod actions;
pub mod capture;
pub mod config;
pub mod error;
pub mod imap;
pub mod mime;
pub mod node;

pub mod prelude {
    // Config
    pub use crate::config::{ImapCredentials, Settings};

    // Errors
    pub use crate::error::{ComposedError, HandlerError, NodeError};
    pub use crate::imap::error::ImapError;

    // IMAP
    pub use crate::capture::{ErrorCapture, ImapLogger};
    pub use crate::imap::client::{ImapConnector, SessionConnector};
    pub use crate::imap::session::ImapOps;

    // Execution
    pub use crate::node::{ExecutionLoop, InputItem, Invocation, OperationRegistry, ResultItem};
}
