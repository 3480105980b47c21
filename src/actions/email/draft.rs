// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use async_trait::async_trait;
use lettre::message::{Mailbox, Mailboxes, MultiPart, SinglePart};
use lettre::Message;
use serde_json::json;

use crate::error::HandlerError;
use crate::imap::types::Flag;
use crate::node::context::ExecutionContext;
use crate::node::item::ResultItem;
use crate::node::params::{OperationSchema, ParameterDescriptor};
use crate::node::registry::{Operation, OperationHandler};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DraftFields {
    pub subject: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
    pub cc: Option<String>,
    pub bcc: Option<String>,
    pub text: Option<String>,
    pub html: Option<String>,
}

fn parse_mailboxes(raw: &str) -> Result<Mailboxes, HandlerError> {
    Ok(raw.parse::<Mailboxes>()?)
}

/// Builds an RFC 822 message from individual fields.
pub fn compose_draft(fields: &DraftFields) -> Result<Vec<u8>, HandlerError> {
    let from = fields.from.as_deref().ok_or_else(|| {
        HandlerError::composed(
            "A sender address is required to compose a draft",
            "Set the \"from\" field or use the RFC822 input format",
        )
    })?;

    let mut builder = Message::builder()
        .from(from.parse::<Mailbox>()?)
        .subject(fields.subject.clone().unwrap_or_default());
    if let Some(to) = &fields.to {
        for mailbox in parse_mailboxes(to)? {
            builder = builder.to(mailbox);
        }
    }
    if let Some(cc) = &fields.cc {
        for mailbox in parse_mailboxes(cc)? {
            builder = builder.cc(mailbox);
        }
    }
    if let Some(bcc) = &fields.bcc {
        for mailbox in parse_mailboxes(bcc)? {
            builder = builder.bcc(mailbox);
        }
    }

    // Bcc must survive into the stored draft.
    builder = builder.keep_bcc();

    let message = match (&fields.text, &fields.html) {
        (Some(text), Some(html)) => {
            builder.multipart(MultiPart::alternative_plain_html(text.clone(), html.clone()))?
        }
        (None, Some(html)) => builder.singlepart(SinglePart::html(html.clone()))?,
        (text, None) => builder.singlepart(SinglePart::plain(text.clone().unwrap_or_default()))?,
    };
    Ok(message.formatted())
}

/// Line endings normalised to CRLF, as APPEND expects.
pub fn normalize_line_endings(raw: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len() + raw.len() / 32);
    let mut previous = 0u8;
    for &byte in raw.as_bytes() {
        if byte == b'\n' && previous != b'\r' {
            out.push(b'\r');
        }
        out.push(byte);
        previous = byte;
    }
    out
}

pub struct CreateDraft;

#[async_trait]
impl OperationHandler for CreateDraft {
    fn operation(&self) -> Operation {
        Operation::CreateDraft
    }

    fn display_name(&self) -> &'static str {
        "Create Draft"
    }

    fn schema(&self, schema: OperationSchema) -> OperationSchema {
        schema
            .parameter(
                ParameterDescriptor::resource_locator("mailboxPath", "Drafts Mailbox")
                    .default_value("Drafts".into())
                    .required(),
            )
            .parameter(ParameterDescriptor::options(
                "inputFormat",
                "Input Format",
                &[("Fields", "fields"), ("RFC822 Content", "rfc822")],
            ))
            .parameter(ParameterDescriptor::string("subject", "Subject"))
            .parameter(ParameterDescriptor::string("from", "From"))
            .parameter(ParameterDescriptor::string("to", "To"))
            .parameter(ParameterDescriptor::string("cc", "CC"))
            .parameter(ParameterDescriptor::string("bcc", "BCC"))
            .parameter(ParameterDescriptor::string("text", "Text"))
            .parameter(ParameterDescriptor::string("html", "HTML"))
            .parameter(
                ParameterDescriptor::string("rfc822Content", "RFC822 Content")
                    .description("Complete message source, used when the input format is RFC822"),
            )
    }

    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError> {
        let path = ctx.get_string("mailboxPath")?;
        let content = match ctx.get_string("inputFormat")?.as_str() {
            "rfc822" => {
                let raw = ctx.get_optional_string("rfc822Content")?.ok_or_else(|| {
                    HandlerError::composed(
                        "RFC822 content is empty",
                        "Provide the full message source in \"rfc822Content\"",
                    )
                })?;
                normalize_line_endings(&raw)
            }
            "fields" => compose_draft(&DraftFields {
                subject: ctx.get_optional_string("subject")?,
                from: ctx.get_optional_string("from")?,
                to: ctx.get_optional_string("to")?,
                cc: ctx.get_optional_string("cc")?,
                bcc: ctx.get_optional_string("bcc")?,
                text: ctx.get_optional_string("text")?,
                html: ctx.get_optional_string("html")?,
            })?,
            other => {
                return Err(HandlerError::composed(
                    format!("Unknown input format \"{}\"", other),
                    "Use \"fields\" or \"rfc822\"",
                ))
            }
        };

        let appended = ctx.session().append(&path, &content, &[Flag::Draft]).await?;
        if appended.uid.is_none() {
            log::warn!("Server did not report a UID for the draft appended to {}", path);
        }
        Ok(vec![ResultItem::new(json!({ "uid": appended.uid, "mailboxPath": path }))])
    }
}
