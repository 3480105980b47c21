// Unit tests for rustymail-actions
// Handlers run against an in-memory IMAP session through the execution loop.

pub mod mock_imap;

pub mod config;
pub mod execution;
pub mod registry;
