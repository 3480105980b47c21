// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use super::{mailbox_path_param, parse_status_fields, status_fields_param};
use crate::error::HandlerError;
use crate::imap::session::ImapOps;
use crate::imap::types::{MailboxEntry, QuotaUsage, StatusField};
use crate::node::context::ExecutionContext;
use crate::node::item::ResultItem;
use crate::node::params::{OperationSchema, ParameterDescriptor};
use crate::node::registry::{Operation, OperationHandler};

const DEFAULT_DELIMITER: &str = "/";

fn is_selectable(entry: &MailboxEntry) -> bool {
    !entry.flags.iter().any(|f| f.to_ascii_lowercase().contains("noselect"))
}

/// Hierarchy delimiter the server reports for `path`.
async fn delimiter_for(session: &dyn ImapOps, path: &str) -> Result<String, HandlerError> {
    let entries = session.list_mailboxes().await?;
    Ok(entries
        .iter()
        .find(|e| e.path == path)
        .or_else(|| entries.iter().find(|e| e.delimiter.is_some()))
        .and_then(|e| e.delimiter.clone())
        .unwrap_or_else(|| DEFAULT_DELIMITER.to_string()))
}

pub struct LoadMailboxList;

#[async_trait]
impl OperationHandler for LoadMailboxList {
    fn operation(&self) -> Operation {
        Operation::LoadMailboxList
    }

    fn display_name(&self) -> &'static str {
        "Get Many"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema.parameter(status_fields_param(&[]))
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let fields = parse_status_fields(&ctx.get_string_list("includeStatusFields")?)?;
        let session = ctx.session();
        let mailboxes = session.list_mailboxes().await?;

        let mut items = Vec::with_capacity(mailboxes.len());
        for entry in mailboxes {
            let mut json = Map::new();
            json.insert("path".to_string(), Value::from(entry.path.clone()));
            json.insert("name".to_string(), Value::from(entry.name.clone()));
            if !fields.is_empty() && is_selectable(&entry) {
                let status = session.status(&entry.path, &fields).await?;
                json.insert("status".to_string(), status.to_json(&fields));
            }
            items.push(ResultItem::new(Value::Object(json)));
        }
        Ok(items)
    }
}

pub struct GetStatus;

#[async_trait]
impl OperationHandler for GetStatus {
    fn operation(&self) -> Operation {
        Operation::GetStatus
    }

    fn display_name(&self) -> &'static str {
        "Get Status"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema
            .parameter(mailbox_path_param())
            .parameter(status_fields_param(&["messages", "unseen"]))
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let path = ctx.get_string("mailboxPath")?;
        let mut fields = parse_status_fields(&ctx.get_string_list("includeStatusFields")?)?;
        if fields.is_empty() {
            fields = StatusField::DEFAULT.to_vec();
        }
        let status = ctx.session().status(&path, &fields).await?;
        Ok(vec![ResultItem::new(json!({ "path": path, "status": status.to_json(&fields) }))])
    }
}

pub struct GetQuota;

fn usage_json(usage: Option<QuotaUsage>) -> Option<Value> {
    usage.map(|u| json!({ "usage": u.usage, "limit": u.limit }))
}

#[async_trait]
impl OperationHandler for GetQuota {
    fn operation(&self) -> Operation {
        Operation::GetQuota
    }

    fn display_name(&self) -> &'static str {
        "Get Quota"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema.parameter(mailbox_path_param())
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let path = ctx.get_string("mailboxPath")?;
        let quota = ctx.session().get_quota(&path).await?;

        let mut json = Map::new();
        json.insert("path".to_string(), Value::from(quota.path));
        json.insert("root".to_string(), Value::from(quota.root));
        if let Some(storage) = usage_json(quota.storage) {
            json.insert("storage".to_string(), storage);
        }
        if let Some(messages) = usage_json(quota.messages) {
            json.insert("messages".to_string(), messages);
        }
        Ok(vec![ResultItem::new(Value::Object(json))])
    }
}

pub struct CreateMailbox;

#[async_trait]
impl OperationHandler for CreateMailbox {
    fn operation(&self) -> Operation {
        Operation::CreateMailbox
    }

    fn display_name(&self) -> &'static str {
        "Create"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema
            .parameter(
                ParameterDescriptor::resource_locator("mailboxPath", "Parent Mailbox")
                    .description("Leave empty to create a top-level mailbox"),
            )
            .parameter(ParameterDescriptor::string("mailboxName", "Mailbox Name").required())
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let parent = ctx.get_optional_string("mailboxPath")?;
        let name = ctx.get_string("mailboxName")?;
        let session = ctx.session();

        let path = match parent {
            Some(parent) => {
                let delimiter = delimiter_for(session, &parent).await?;
                format!("{}{}{}", parent, delimiter, name)
            }
            None => name,
        };
        session.create_mailbox(&path).await?;
        Ok(vec![ResultItem::new(json!({ "path": path, "created": true }))])
    }
}

pub struct RenameMailbox;

#[async_trait]
impl OperationHandler for RenameMailbox {
    fn operation(&self) -> Operation {
        Operation::RenameMailbox
    }

    fn display_name(&self) -> &'static str {
        "Rename"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema
            .parameter(mailbox_path_param())
            .parameter(
                ParameterDescriptor::string("newMailboxName", "New Name")
                    .required()
                    .description("New name within the same parent mailbox"),
            )
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let path = ctx.get_string("mailboxPath")?;
        let new_name = ctx.get_string("newMailboxName")?;
        let session = ctx.session();

        let delimiter = delimiter_for(session, &path).await?;
        let new_path = match path.rsplit_once(delimiter.as_str()) {
            Some((parent, _)) => format!("{}{}{}", parent, delimiter, new_name),
            None => new_name,
        };
        session.rename_mailbox(&path, &new_path).await?;
        Ok(vec![ResultItem::new(json!({ "path": path, "newPath": new_path }))])
    }
}
