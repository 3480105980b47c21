// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::imap::error::ImapError;

/// An error that already carries everything an operator needs to see.
///
/// `message` is the primary text; `description` holds the extended details
/// (the rendered diagnostics captured while the command ran, or whatever the
/// raising handler chose to attach).
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComposedError {
    pub message: String,
    pub description: Option<String>,
    pub item_index: Option<usize>,
}

impl ComposedError {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), description: None, item_index: None }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_item_index(mut self, index: usize) -> Self {
        self.item_index = Some(index);
        self
    }
}

impl fmt::Display for ComposedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)?;
        if let Some(index) = self.item_index {
            write!(f, " [item {}]", index)?;
        }
        Ok(())
    }
}

impl std::error::Error for ComposedError {}

/// What a handler fails with.
///
/// `Composed` is forwarded as is. `Raw` still needs the diagnostics captured
/// during the command before anyone sees it.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    Composed(ComposedError),

    #[error("{message}")]
    Raw { message: String },
}

impl HandlerError {
    pub fn raw(message: impl Into<String>) -> Self {
        HandlerError::Raw { message: message.into() }
    }

    pub fn composed(message: impl Into<String>, description: impl Into<String>) -> Self {
        HandlerError::Composed(ComposedError::new(message).with_description(description))
    }
}

impl From<ComposedError> for HandlerError {
    fn from(err: ComposedError) -> Self {
        HandlerError::Composed(err)
    }
}

impl From<ImapError> for HandlerError {
    fn from(err: ImapError) -> Self {
        HandlerError::raw(err.to_string())
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::raw(err.to_string())
    }
}

impl From<lettre::error::Error> for HandlerError {
    fn from(err: lettre::error::Error) -> Self {
        HandlerError::raw(err.to_string())
    }
}

impl From<lettre::address::AddressError> for HandlerError {
    fn from(err: lettre::address::AddressError) -> Self {
        HandlerError::raw(format!("Invalid address: {}", err))
    }
}

/// Failure of a whole invocation.
#[derive(Debug, Error)]
pub enum NodeError {
    #[error("The operation \"{operation}\" is not known for resource \"{resource}\"")]
    UnknownOperation { resource: String, operation: String },

    #[error("Could not connect to the IMAP server: {0}")]
    Connection(#[source] ImapError),

    #[error("{0}")]
    Item(ComposedError),
}
