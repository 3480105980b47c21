// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use serde_json::{json, Value};

use super::open_mailbox;
use crate::actions::{email_uid_param, include_inline_param, mailbox_path_param, parse_single_uid};
use crate::error::{ComposedError, HandlerError};
use crate::imap::error::ImapError;
use crate::imap::types::FetchQuery;
use crate::mime::decoder::decode_transfer_encoding;
use crate::mime::{walk, AttachmentInfo, MessageStructure, WalkOptions};
use crate::node::context::ExecutionContext;
use crate::node::item::ResultItem;
use crate::node::params::{OperationSchema, ParameterDescriptor};
use crate::node::registry::{Operation, OperationHandler};

/// Picks the attachments named in `requested`, or all of them when empty.
fn select_attachments<'s>(
    structure: &'s MessageStructure,
    requested: &[String],
    uid: u32,
) -> Result<Vec<&'s AttachmentInfo>, HandlerError> {
    if requested.is_empty() {
        return Ok(structure.attachments.iter().collect());
    }
    requested
        .iter()
        .map(|part_id| {
            structure.attachment(part_id).ok_or_else(|| {
                HandlerError::Composed(ComposedError::new("Attachment info missing").with_description(format!(
                    "Part \"{}\" of message {} is not an attachment (known attachments: {})",
                    part_id,
                    uid,
                    known_ids(structure)
                )))
            })
        })
        .collect()
}

fn known_ids(structure: &MessageStructure) -> String {
    if structure.attachments.is_empty() {
        return "none".to_string();
    }
    structure
        .attachments
        .iter()
        .map(|a| a.part_id.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

pub struct DownloadAttachment;

#[async_trait]
impl OperationHandler for DownloadAttachment {
    fn operation(&self) -> Operation {
        Operation::DownloadAttachment
    }

    fn display_name(&self) -> &'static str {
        "Download Attachment"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema
            .parameter(mailbox_path_param())
            .parameter(email_uid_param())
            .parameter(
                ParameterDescriptor::string("partId", "Part ID")
                    .description("Comma-separated part ids; leave empty to download every attachment"),
            )
            .parameter(include_inline_param())
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let uid = parse_single_uid(&ctx.get_string("emailUid")?)?;
        let requested = ctx.get_string_list("partId")?;
        let options = WalkOptions { include_inline: ctx.get_bool("includeInlineAttachments")? };
        let path = open_mailbox(ctx, true).await?;
        let session = ctx.session();

        let query = FetchQuery { body_structure: true, ..Default::default() };
        let message = session
            .fetch_one(uid, query)
            .await?
            .ok_or_else(|| ImapError::EmailNotFound(format!("UID {} in {}", uid, path)))?;
        let root = message
            .body_structure
            .ok_or_else(|| ImapError::MissingData(format!("Body structure for UID {}", uid)))?;

        let structure = walk(&root, options);
        let selected = select_attachments(&structure, &requested, uid)?;

        let mut item = ResultItem::default();
        let mut described = Vec::with_capacity(selected.len());
        for (index, info) in selected.into_iter().enumerate() {
            let raw = session.download(uid, &info.part_id).await?;
            let bytes = decode_transfer_encoding(&raw, info.encoding.as_deref());
            let field = format!("attachment_{}", index);
            let binary = ctx.sink().prepare(bytes, &info.filename, &info.mime_type)?;

            let mut entry = serde_json::to_value(info)?;
            if let Value::Object(map) = &mut entry {
                map.insert("binaryField".to_string(), Value::from(field.clone()));
            }
            described.push(entry);
            item = item.with_binary(field, binary);
        }

        item.json = json!({ "uid": uid, "mailboxPath": path, "attachments": described });
        Ok(vec![item])
    }
}
