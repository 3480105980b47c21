pub mod client;
pub mod error;
pub mod session;
pub mod structure;
pub mod types;

pub use client::{ImapConnector, ImapStream, SessionConnector};
pub use error::ImapError;
pub use session::{AsyncImapSessionWrapper, ImapOps, ImapSession};
pub use types::{
    AppendResult, FetchQuery, FetchedMessage, Flag, MailboxEntry, MailboxInfo, MailboxStatus,
    QuotaInfo, QuotaUsage, SearchCriteria, StatusField, UidSet,
};
