// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Built-in operation handlers and the parameters they share.

pub mod email;
pub mod mailbox;

use crate::error::HandlerError;
use crate::imap::types::{StatusField, UidSet};
use crate::node::params::ParameterDescriptor;
use crate::node::registry::OperationRegistry;

pub fn default_registry() -> OperationRegistry {
    OperationRegistry::builder()
        .register(email::list::GetEmailsList)
        .register(email::download::DownloadEml)
        .register(email::transfer::TransferEmail::moving())
        .register(email::transfer::TransferEmail::copying())
        .register(email::flags::SetEmailFlags)
        .register(email::draft::CreateDraft)
        .register(email::attachment::DownloadAttachment)
        .register(mailbox::LoadMailboxList)
        .register(mailbox::GetStatus)
        .register(mailbox::GetQuota)
        .register(mailbox::CreateMailbox)
        .register(mailbox::RenameMailbox)
        .build()
}

// Shared parameter constructors. Each call returns a fresh descriptor.

pub fn mailbox_path_param() -> ParameterDescriptor {
    ParameterDescriptor::resource_locator("mailboxPath", "Mailbox Path")
        .default_value("INBOX".into())
        .required()
}

pub fn email_uid_param() -> ParameterDescriptor {
    ParameterDescriptor::string("emailUid", "Email UID")
        .required()
        .description("UID of the message, or a UID set such as 1,5 or 3:9 where supported")
}

pub fn include_inline_param() -> ParameterDescriptor {
    ParameterDescriptor::boolean("includeInlineAttachments", "Include Inline Attachments")
        .description("Treat parts with an inline disposition as attachments")
}

const STATUS_FIELD_OPTIONS: [(&str, &str); 6] = [
    ("Messages", "messages"),
    ("Recent", "recent"),
    ("Unseen", "unseen"),
    ("UID Next", "uidNext"),
    ("UID Validity", "uidValidity"),
    ("Highest Modseq", "highestModseq"),
];

pub fn status_fields_param(default: &[&str]) -> ParameterDescriptor {
    ParameterDescriptor::multi_options("includeStatusFields", "Include Status Fields", &STATUS_FIELD_OPTIONS)
        .default_value(default.iter().map(|f| serde_json::Value::from(*f)).collect())
}

pub fn parse_uid_set(raw: &str) -> Result<UidSet, HandlerError> {
    raw.parse::<UidSet>().map_err(|_| {
        HandlerError::composed(
            format!("Invalid email UID \"{}\"", raw),
            "Expected a UID or a UID set such as 42, 1,5 or 3:9",
        )
    })
}

pub fn parse_single_uid(raw: &str) -> Result<u32, HandlerError> {
    match raw.trim().parse::<u32>() {
        Ok(uid) if uid > 0 => Ok(uid),
        _ => Err(HandlerError::composed(
            format!("Invalid email UID \"{}\"", raw),
            "Expected a single positive UID",
        )),
    }
}

pub fn parse_status_fields(names: &[String]) -> Result<Vec<StatusField>, HandlerError> {
    names
        .iter()
        .map(|name| {
            name.parse::<StatusField>()
                .map_err(|e| HandlerError::composed(e, "Valid fields: messages, recent, unseen, uidNext, uidValidity, highestModseq"))
        })
        .collect()
}
