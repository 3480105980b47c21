// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate};
use serde_json::{json, Map, Value};

use super::{fetch_text_part, open_mailbox};
use crate::actions::{include_inline_param, mailbox_path_param, parse_uid_set};
use crate::error::HandlerError;
use crate::imap::types::{FetchQuery, SearchCriteria, UidSet};
use crate::mime::{walk, WalkOptions};
use crate::node::context::ExecutionContext;
use crate::node::item::ResultItem;
use crate::node::params::{OperationSchema, ParameterDescriptor};
use crate::node::registry::{Operation, OperationHandler};

const PART_OPTIONS: [(&str, &str); 6] = [
    ("Text Content", "textContent"),
    ("HTML Content", "htmlContent"),
    ("Attachments Info", "attachmentsInfo"),
    ("Flags", "flags"),
    ("Size", "size"),
    ("Body Structure", "bodyStructure"),
];

#[derive(Debug, Default, Clone, Copy)]
struct IncludeParts {
    text: bool,
    html: bool,
    attachments: bool,
    flags: bool,
    size: bool,
    body_structure: bool,
}

impl IncludeParts {
    fn from_names(names: &[String]) -> Self {
        let has = |n: &str| names.iter().any(|name| name == n);
        Self {
            text: has("textContent"),
            html: has("htmlContent"),
            attachments: has("attachmentsInfo"),
            flags: has("flags"),
            size: has("size"),
            body_structure: has("bodyStructure"),
        }
    }

    fn needs_structure(&self) -> bool {
        self.text || self.html || self.attachments || self.body_structure
    }
}

fn parse_date(raw: &str, field: &str) -> Result<NaiveDate, HandlerError> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| DateTime::parse_from_rfc3339(raw).map(|dt| dt.date_naive()))
        .map_err(|_| {
            HandlerError::composed(
                format!("Invalid date \"{}\" for {}", raw, field),
                "Use YYYY-MM-DD or an RFC 3339 timestamp",
            )
        })
}

fn string_field(map: &Map<String, Value>, key: &str) -> Option<String> {
    match map.get(key) {
        Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    }
}

fn bool_field(map: &Map<String, Value>, key: &str) -> Option<bool> {
    match map.get(key) {
        Some(Value::Bool(b)) => Some(*b),
        Some(Value::String(s)) => s.trim().parse::<bool>().ok(),
        _ => None,
    }
}

/// Combines the date range, flag and header filters into one UID SEARCH.
fn build_criteria(
    date_range: &Map<String, Value>,
    flags: &Map<String, Value>,
    filters: &Map<String, Value>,
) -> Result<SearchCriteria, HandlerError> {
    let mut criteria = Vec::new();

    if let Some(since) = string_field(date_range, "since") {
        criteria.push(SearchCriteria::Since(parse_date(&since, "since")?));
    }
    if let Some(before) = string_field(date_range, "before") {
        criteria.push(SearchCriteria::Before(parse_date(&before, "before")?));
    }

    let flag_filters: [(&str, fn(bool) -> SearchCriteria); 5] = [
        ("seen", SearchCriteria::Seen),
        ("answered", SearchCriteria::Answered),
        ("flagged", SearchCriteria::Flagged),
        ("deleted", SearchCriteria::Deleted),
        ("draft", SearchCriteria::Draft),
    ];
    for (key, make) in flag_filters {
        if let Some(on) = bool_field(flags, key) {
            criteria.push(make(on));
        }
    }

    let text_filters: [(&str, fn(String) -> SearchCriteria); 6] = [
        ("from", SearchCriteria::From),
        ("to", SearchCriteria::To),
        ("cc", SearchCriteria::Cc),
        ("bcc", SearchCriteria::Bcc),
        ("subject", SearchCriteria::Subject),
        ("text", SearchCriteria::Text),
    ];
    for (key, make) in text_filters {
        if let Some(value) = string_field(filters, key) {
            criteria.push(make(value));
        }
    }
    if let Some(uid) = string_field(filters, "uid") {
        criteria.push(SearchCriteria::Uid(parse_uid_set(&uid)?));
    }

    Ok(if criteria.is_empty() { SearchCriteria::All } else { SearchCriteria::And(criteria) })
}

pub struct GetEmailsList;

#[async_trait]
impl OperationHandler for GetEmailsList {
    fn operation(&self) -> Operation {
        Operation::GetEmailsList
    }

    fn display_name(&self) -> &'static str {
        "Get Many"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema
            .parameter(mailbox_path_param())
            .parameter(ParameterDescriptor::collection(
                "emailDateRange",
                "Date Range",
                vec![
                    ParameterDescriptor::string("since", "Since"),
                    ParameterDescriptor::string("before", "Before"),
                ],
            ))
            .parameter(ParameterDescriptor::collection(
                "emailFlags",
                "Flags",
                vec![
                    ParameterDescriptor::boolean("seen", "Is Seen"),
                    ParameterDescriptor::boolean("answered", "Is Answered"),
                    ParameterDescriptor::boolean("flagged", "Is Flagged"),
                    ParameterDescriptor::boolean("deleted", "Is Deleted"),
                    ParameterDescriptor::boolean("draft", "Is Draft"),
                ],
            ))
            .parameter(ParameterDescriptor::collection(
                "emailSearchFilters",
                "Search Filters",
                vec![
                    ParameterDescriptor::string("from", "From"),
                    ParameterDescriptor::string("to", "To"),
                    ParameterDescriptor::string("cc", "CC"),
                    ParameterDescriptor::string("bcc", "BCC"),
                    ParameterDescriptor::string("subject", "Subject"),
                    ParameterDescriptor::string("text", "Text"),
                    ParameterDescriptor::string("uid", "UID"),
                ],
            ))
            .parameter(ParameterDescriptor::multi_options("includeParts", "Include Parts", &PART_OPTIONS))
            .parameter(include_inline_param())
            .parameter(
                ParameterDescriptor::number("limit", "Limit")
                    .default_value(50.into())
                    .description("Newest messages to return; 0 returns every match"),
            )
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let criteria = build_criteria(
            &ctx.get_object("emailDateRange")?,
            &ctx.get_object("emailFlags")?,
            &ctx.get_object("emailSearchFilters")?,
        )?;
        let parts = IncludeParts::from_names(&ctx.get_string_list("includeParts")?);
        let options = WalkOptions { include_inline: ctx.get_bool("includeInlineAttachments")? };
        let limit = ctx.get_u64("limit")? as usize;

        let path = open_mailbox(ctx, true).await?;
        let session = ctx.session();
        let mut uids = session.search(&criteria).await?;
        if limit > 0 && uids.len() > limit {
            uids = uids.split_off(uids.len() - limit);
        }
        if uids.is_empty() {
            return Ok(Vec::new());
        }

        let query = FetchQuery {
            envelope: true,
            flags: parts.flags,
            size: parts.size,
            body_structure: parts.needs_structure(),
            source: false,
        };
        let messages = session.fetch(&UidSet::from_uids(&uids)?, query).await?;

        let mut items = Vec::with_capacity(messages.len());
        for message in messages {
            let mut json = Map::new();
            json.insert("uid".to_string(), Value::from(message.uid));
            json.insert("mailboxPath".to_string(), Value::from(path.clone()));
            json.insert("envelope".to_string(), serde_json::to_value(&message.envelope)?);
            if parts.flags {
                json.insert("flags".to_string(), serde_json::to_value(&message.flags)?);
            }
            if parts.size {
                json.insert("size".to_string(), json!(message.size));
            }

            if let Some(root) = &message.body_structure {
                let structure = walk(root, options);
                if parts.attachments {
                    json.insert("attachmentsInfo".to_string(), serde_json::to_value(&structure.attachments)?);
                }
                if parts.body_structure {
                    json.insert("bodyStructure".to_string(), serde_json::to_value(root)?);
                }
                if parts.text {
                    if let Some(text_part) = &structure.text_part {
                        let text = fetch_text_part(ctx, message.uid, text_part).await?;
                        json.insert("textContent".to_string(), Value::from(text));
                    }
                }
                if parts.html {
                    if let Some(html_part) = &structure.html_part {
                        let html = fetch_text_part(ctx, message.uid, html_part).await?;
                        json.insert("htmlContent".to_string(), Value::from(html));
                    }
                }
            }
            items.push(ResultItem::new(Value::Object(json)));
        }
        Ok(items)
    }
}
