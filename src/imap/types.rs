// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::imap::error::ImapError;
use crate::mime::BodyPart;

/// A message flag as understood by the IMAP server.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Flag {
    Seen,
    Answered,
    Flagged,
    Deleted,
    Draft,
    Recent,
    Custom(String),
}

impl Flag {
    /// Parses either the bare keyword (`Seen`) or the system flag form (`\Seen`).
    pub fn from_name(name: &str) -> Flag {
        let bare = name.trim_start_matches('\\');
        match bare.to_ascii_lowercase().as_str() {
            "seen" => Flag::Seen,
            "answered" => Flag::Answered,
            "flagged" => Flag::Flagged,
            "deleted" => Flag::Deleted,
            "draft" => Flag::Draft,
            "recent" => Flag::Recent,
            _ => Flag::Custom(name.to_string()),
        }
    }
}

impl fmt::Display for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flag::Seen => write!(f, "\\Seen"),
            Flag::Answered => write!(f, "\\Answered"),
            Flag::Flagged => write!(f, "\\Flagged"),
            Flag::Deleted => write!(f, "\\Deleted"),
            Flag::Draft => write!(f, "\\Draft"),
            Flag::Recent => write!(f, "\\Recent"),
            Flag::Custom(name) => write!(f, "{}", name),
        }
    }
}

impl Serialize for Flag {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// A validated UID set such as `42`, `1,5,9` or `3:*`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UidSet(String);

impl UidSet {
    pub fn single(uid: u32) -> Self {
        UidSet(uid.to_string())
    }

    pub fn from_uids(uids: &[u32]) -> Result<Self, ImapError> {
        if uids.is_empty() {
            return Err(ImapError::InvalidUidSet("empty UID list".to_string()));
        }
        Ok(UidSet(
            uids.iter().map(|uid| uid.to_string()).collect::<Vec<_>>().join(","),
        ))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for UidSet {
    type Err = ImapError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(ImapError::InvalidUidSet(s.to_string()));
        }
        for range in compact.split(',') {
            let mut bounds = range.split(':');
            let valid = match (bounds.next(), bounds.next(), bounds.next()) {
                (Some(a), None, None) => is_uid_bound(a),
                (Some(a), Some(b), None) => is_uid_bound(a) && is_uid_bound(b),
                _ => false,
            };
            if !valid {
                return Err(ImapError::InvalidUidSet(s.to_string()));
            }
        }
        Ok(UidSet(compact))
    }
}

fn is_uid_bound(bound: &str) -> bool {
    bound == "*" || (!bound.is_empty() && bound.chars().all(|c| c.is_ascii_digit()) && bound != "0")
}

impl fmt::Display for UidSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Mailbox status attributes that can be requested with STATUS.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusField {
    Messages,
    Recent,
    Unseen,
    UidNext,
    UidValidity,
    HighestModseq,
}

impl StatusField {
    /// Requested when the caller names no fields.
    pub const DEFAULT: [StatusField; 2] = [StatusField::Messages, StatusField::Unseen];

    pub const ALL: [StatusField; 6] = [
        StatusField::Messages,
        StatusField::Recent,
        StatusField::Unseen,
        StatusField::UidNext,
        StatusField::UidValidity,
        StatusField::HighestModseq,
    ];

    pub fn imap_name(&self) -> &'static str {
        match self {
            StatusField::Messages => "MESSAGES",
            StatusField::Recent => "RECENT",
            StatusField::Unseen => "UNSEEN",
            StatusField::UidNext => "UIDNEXT",
            StatusField::UidValidity => "UIDVALIDITY",
            StatusField::HighestModseq => "HIGHESTMODSEQ",
        }
    }

    /// Key used for this field in result items.
    pub fn key(&self) -> &'static str {
        match self {
            StatusField::Messages => "messages",
            StatusField::Recent => "recent",
            StatusField::Unseen => "unseen",
            StatusField::UidNext => "uidNext",
            StatusField::UidValidity => "uidValidity",
            StatusField::HighestModseq => "highestModseq",
        }
    }
}

impl FromStr for StatusField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StatusField::ALL
            .iter()
            .find(|field| field.key().eq_ignore_ascii_case(s) || field.imap_name().eq_ignore_ascii_case(s))
            .copied()
            .ok_or_else(|| format!("Unknown status field '{}'", s))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MailboxStatus {
    pub path: String,
    pub messages: Option<u32>,
    pub recent: Option<u32>,
    pub unseen: Option<u32>,
    pub uid_next: Option<u32>,
    pub uid_validity: Option<u32>,
    pub highest_modseq: Option<u64>,
}

impl MailboxStatus {
    /// Renders only the requested fields, in request order.
    pub fn to_json(&self, fields: &[StatusField]) -> Value {
        let mut status = Map::new();
        for field in fields {
            let value = match field {
                StatusField::Messages => self.messages.map(Value::from),
                StatusField::Recent => self.recent.map(Value::from),
                StatusField::Unseen => self.unseen.map(Value::from),
                StatusField::UidNext => self.uid_next.map(Value::from),
                StatusField::UidValidity => self.uid_validity.map(Value::from),
                StatusField::HighestModseq => self.highest_modseq.map(Value::from),
            };
            status.insert(field.key().to_string(), value.unwrap_or(Value::Null));
        }
        Value::Object(status)
    }
}

/// One entry of a LIST response.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MailboxEntry {
    pub path: String,
    pub name: String,
    pub delimiter: Option<String>,
    pub flags: Vec<String>,
}

/// State reported when a mailbox is opened (SELECT/EXAMINE).
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailboxInfo {
    pub path: String,
    pub exists: u32,
    pub uid_validity: Option<u32>,
    pub uid_next: Option<u32>,
    pub read_only: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct QuotaUsage {
    pub usage: u64,
    pub limit: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QuotaInfo {
    pub path: String,
    pub root: String,
    pub storage: Option<QuotaUsage>,
    pub messages: Option<QuotaUsage>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Address {
    pub name: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub date: Option<String>,
    pub subject: Option<String>,
    pub from: Vec<Address>,
    pub sender: Vec<Address>,
    pub reply_to: Vec<Address>,
    pub to: Vec<Address>,
    pub cc: Vec<Address>,
    pub bcc: Vec<Address>,
    pub in_reply_to: Option<String>,
    pub message_id: Option<String>,
}

/// Which attributes a FETCH should return. UID is always requested.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchQuery {
    pub envelope: bool,
    pub flags: bool,
    pub size: bool,
    pub body_structure: bool,
    pub source: bool,
}

impl FetchQuery {
    pub fn to_imap_string(&self) -> String {
        let mut items = vec!["UID"];
        if self.envelope {
            items.push("ENVELOPE");
        }
        if self.flags {
            items.push("FLAGS");
        }
        if self.size {
            items.push("RFC822.SIZE");
        }
        if self.body_structure {
            items.push("BODYSTRUCTURE");
        }
        if self.source {
            items.push("BODY.PEEK[]");
        }
        format!("({})", items.join(" "))
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FetchedMessage {
    pub uid: u32,
    pub envelope: Option<Envelope>,
    pub flags: Vec<Flag>,
    pub size: Option<u32>,
    pub body_structure: Option<BodyPart>,
    pub source: Option<Vec<u8>>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AppendResult {
    pub uid: Option<u32>,
    pub uid_validity: Option<u32>,
}

/// UID SEARCH criteria.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchCriteria {
    All,
    Uid(UidSet),
    Since(NaiveDate),
    Before(NaiveDate),
    From(String),
    To(String),
    Cc(String),
    Bcc(String),
    Subject(String),
    Text(String),
    Seen(bool),
    Answered(bool),
    Flagged(bool),
    Deleted(bool),
    Draft(bool),
    And(Vec<SearchCriteria>),
}

impl SearchCriteria {
    pub fn to_imap_string(&self) -> String {
        match self {
            SearchCriteria::All => "ALL".to_string(),
            SearchCriteria::Uid(set) => format!("UID {}", set),
            SearchCriteria::Since(date) => format!("SINCE {}", imap_date(date)),
            SearchCriteria::Before(date) => format!("BEFORE {}", imap_date(date)),
            SearchCriteria::From(s) => format!("FROM {}", quote(s)),
            SearchCriteria::To(s) => format!("TO {}", quote(s)),
            SearchCriteria::Cc(s) => format!("CC {}", quote(s)),
            SearchCriteria::Bcc(s) => format!("BCC {}", quote(s)),
            SearchCriteria::Subject(s) => format!("SUBJECT {}", quote(s)),
            SearchCriteria::Text(s) => format!("TEXT {}", quote(s)),
            SearchCriteria::Seen(on) => flag_criterion(*on, "SEEN", "UNSEEN"),
            SearchCriteria::Answered(on) => flag_criterion(*on, "ANSWERED", "UNANSWERED"),
            SearchCriteria::Flagged(on) => flag_criterion(*on, "FLAGGED", "UNFLAGGED"),
            SearchCriteria::Deleted(on) => flag_criterion(*on, "DELETED", "UNDELETED"),
            SearchCriteria::Draft(on) => flag_criterion(*on, "DRAFT", "UNDRAFT"),
            SearchCriteria::And(criteria) => {
                if criteria.is_empty() {
                    "ALL".to_string()
                } else {
                    criteria
                        .iter()
                        .map(|c| c.to_imap_string())
                        .collect::<Vec<_>>()
                        .join(" ")
                }
            }
        }
    }
}

fn flag_criterion(on: bool, set: &str, unset: &str) -> String {
    if on { set.to_string() } else { unset.to_string() }
}

fn imap_date(date: &NaiveDate) -> String {
    date.format("%-d-%b-%Y").to_string()
}

fn quote(s: &str) -> String {
    format!("\"{}\"", s.replace('\\', "\\\\").replace('"', "\\\""))
}
