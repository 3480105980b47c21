// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use serde_json::json;

use super::open_mailbox;
use crate::actions::{email_uid_param, mailbox_path_param, parse_uid_set};
use crate::error::HandlerError;
use crate::node::context::ExecutionContext;
use crate::node::item::ResultItem;
use crate::node::params::{OperationSchema, ParameterDescriptor};
use crate::node::registry::{Operation, OperationHandler};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TransferMode {
    Move,
    Copy,
}

/// Moves or copies messages from `mailboxPath` into `destinationMailboxPath`.
pub struct TransferEmail {
    mode: TransferMode,
}

impl TransferEmail {
    pub fn moving() -> Self {
        Self { mode: TransferMode::Move }
    }

    pub fn copying() -> Self {
        Self { mode: TransferMode::Copy }
    }
}

#[async_trait]
impl OperationHandler for TransferEmail {
    fn operation(&self) -> Operation {
        match self.mode {
            TransferMode::Move => Operation::MoveEmail,
            TransferMode::Copy => Operation::CopyEmail,
        }
    }

    fn display_name(&self) -> &'static str {
        match self.mode {
            TransferMode::Move => "Move",
            TransferMode::Copy => "Copy",
        }
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema
            .parameter(mailbox_path_param())
            .parameter(email_uid_param())
            .parameter(
                ParameterDescriptor::resource_locator("destinationMailboxPath", "Destination Mailbox")
                    .required(),
            )
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let uids = parse_uid_set(&ctx.get_string("emailUid")?)?;
        let destination = ctx.get_string("destinationMailboxPath")?;
        let source = open_mailbox(ctx, false).await?;

        match self.mode {
            TransferMode::Move => ctx.session().message_move(&uids, &destination).await?,
            TransferMode::Copy => ctx.session().message_copy(&uids, &destination).await?,
        }

        Ok(vec![ResultItem::new(json!({
            "uid": uids.as_str(),
            "sourceMailbox": source,
            "destinationMailbox": destination,
        }))])
    }
}
