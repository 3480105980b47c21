// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use serde_json::{json, Map, Value};

use rustymail_actions::capture::{diagnostic, ImapLogger};
use rustymail_actions::error::NodeError;
use rustymail_actions::imap::client::SessionConnector;
use rustymail_actions::imap::error::ImapError;
use rustymail_actions::imap::session::ImapOps;
use rustymail_actions::imap::types::{
    AppendResult, Envelope, FetchQuery, FetchedMessage, Flag, MailboxEntry, MailboxInfo,
    MailboxStatus, QuotaInfo, SearchCriteria, StatusField, UidSet,
};
use rustymail_actions::mime::BodyPart;
use rustymail_actions::node::{ExecutionLoop, InputItem, Invocation, OperationRegistry, ResultItem};

/// Every call the mock received, in order.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Logout,
    List,
    Status(String, Vec<StatusField>),
    Quota(String),
    Create(String),
    Rename(String, String),
    Open(String, bool),
    Search(String),
    Fetch(String),
    Download(u32, String),
    Append(String, Vec<Flag>),
    Copy(String, String),
    Move(String, String),
    FlagsAdd(String, Vec<Flag>),
    FlagsRemove(String, Vec<Flag>),
}

#[derive(Debug, Clone, Default)]
pub struct StoredMessage {
    pub envelope: Envelope,
    pub flags: Vec<Flag>,
    pub source: Vec<u8>,
    pub body_structure: Option<BodyPart>,
    /// Raw section bytes keyed by part id.
    pub parts: HashMap<String, Vec<u8>>,
}

#[derive(Debug, Default)]
struct MockState {
    calls: Vec<Call>,
    mailboxes: Vec<MailboxEntry>,
    statuses: HashMap<String, MailboxStatus>,
    quota: Option<QuotaInfo>,
    messages: BTreeMap<u32, StoredMessage>,
    /// Command name -> server text reported when it fails.
    failing_commands: HashMap<String, String>,
    failing_uids: HashMap<u32, String>,
    warning_uids: HashMap<u32, String>,
    logger: Option<ImapLogger>,
}

/// In-memory stand-in for an IMAP session that records every call.
///
/// Failures are reported the way the real session does: the server text goes
/// to the session logger and the caller only sees `<CMD> failed`.
#[derive(Debug, Clone, Default)]
pub struct MockImapSession {
    state: Arc<Mutex<MockState>>,
}

impl MockImapSession {
    pub fn new() -> Self {
        let mock = Self::default();
        {
            let mut state = mock.lock();
            state.mailboxes = vec![mailbox("INBOX"), mailbox("Archive"), mailbox("Drafts")];
        }
        mock
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    // Builder methods

    pub fn with_mailboxes(self, paths: &[&str]) -> Self {
        self.lock().mailboxes = paths.iter().map(|p| mailbox(p)).collect();
        self
    }

    pub fn with_mailbox_entry(self, entry: MailboxEntry) -> Self {
        self.lock().mailboxes.push(entry);
        self
    }

    pub fn with_status(self, status: MailboxStatus) -> Self {
        self.lock().statuses.insert(status.path.clone(), status);
        self
    }

    pub fn with_quota(self, quota: QuotaInfo) -> Self {
        self.lock().quota = Some(quota);
        self
    }

    pub fn with_message(self, uid: u32, message: StoredMessage) -> Self {
        self.lock().messages.insert(uid, message);
        self
    }

    pub fn fail_command(self, command: &str, server_text: &str) -> Self {
        self.lock().failing_commands.insert(command.to_string(), server_text.to_string());
        self
    }

    pub fn fail_for_uid(self, uid: u32, server_text: &str) -> Self {
        self.lock().failing_uids.insert(uid, server_text.to_string());
        self
    }

    /// Logs a warning for commands touching `uid` without failing them.
    pub fn warn_for_uid(self, uid: u32, server_text: &str) -> Self {
        self.lock().warning_uids.insert(uid, server_text.to_string());
        self
    }

    // Inspection

    pub fn calls(&self) -> Vec<Call> {
        self.lock().calls.clone()
    }

    pub fn count(&self, matches: impl Fn(&Call) -> bool) -> usize {
        self.lock().calls.iter().filter(|c| matches(c)).count()
    }

    pub fn message(&self, uid: u32) -> Option<StoredMessage> {
        self.lock().messages.get(&uid).cloned()
    }

    fn attach_logger(&self, logger: ImapLogger) {
        self.lock().logger = Some(logger);
    }

    fn record(&self, call: Call) {
        self.lock().calls.push(call);
    }

    /// Fails `command` if configured to, for the whole command or one of `uids`.
    fn check(&self, command: &str, uids: &[u32]) -> Result<(), ImapError> {
        let state = self.lock();
        if let (Some(logger), Some(text)) = (
            &state.logger,
            uids.iter().find_map(|uid| state.warning_uids.get(uid)),
        ) {
            logger.warn(diagnostic(
                "Untagged server warning",
                &[("command", json!(command)), ("responseText", json!(text))],
            ));
        }
        let text = state
            .failing_commands
            .get(command)
            .or_else(|| uids.iter().find_map(|uid| state.failing_uids.get(uid)))
            .cloned();
        match text {
            Some(text) => {
                if let Some(logger) = &state.logger {
                    logger.error(diagnostic(
                        "Command failed",
                        &[
                            ("command", json!(command)),
                            ("responseStatus", json!("NO")),
                            ("responseText", json!(text)),
                        ],
                    ));
                }
                Err(ImapError::Command(format!("{} failed", command)))
            }
            None => Ok(()),
        }
    }

    fn expand(&self, set: &UidSet) -> Vec<u32> {
        let known: Vec<u32> = self.lock().messages.keys().copied().collect();
        let max = known.last().copied().unwrap_or(0);
        let mut uids = Vec::new();
        for range in set.as_str().split(',') {
            let bound = |b: &str| if b == "*" { max } else { b.parse().unwrap_or(0) };
            match range.split_once(':') {
                Some((a, b)) => {
                    let (lo, hi) = (bound(a).min(bound(b)), bound(a).max(bound(b)));
                    uids.extend(known.iter().copied().filter(|u| *u >= lo && *u <= hi));
                }
                None => uids.push(bound(range)),
            }
        }
        uids
    }
}

pub fn mailbox(path: &str) -> MailboxEntry {
    MailboxEntry {
        path: path.to_string(),
        name: path.rsplit('/').next().unwrap_or(path).to_string(),
        delimiter: Some("/".to_string()),
        flags: Vec::new(),
    }
}

#[async_trait]
impl ImapOps for MockImapSession {
    async fn logout(&self) -> Result<(), ImapError> {
        self.record(Call::Logout);
        self.check("LOGOUT", &[])
    }

    async fn list_mailboxes(&self) -> Result<Vec<MailboxEntry>, ImapError> {
        self.record(Call::List);
        self.check("LIST", &[])?;
        Ok(self.lock().mailboxes.clone())
    }

    async fn status(&self, path: &str, fields: &[StatusField]) -> Result<MailboxStatus, ImapError> {
        self.record(Call::Status(path.to_string(), fields.to_vec()));
        self.check("STATUS", &[])?;
        let state = self.lock();
        let messages = state.messages.len() as u32;
        Ok(state.statuses.get(path).cloned().unwrap_or(MailboxStatus {
            path: path.to_string(),
            messages: Some(messages),
            recent: Some(0),
            unseen: Some(0),
            uid_next: Some(state.messages.keys().last().copied().unwrap_or(0) + 1),
            uid_validity: Some(1),
            highest_modseq: None,
        }))
    }

    async fn get_quota(&self, path: &str) -> Result<QuotaInfo, ImapError> {
        self.record(Call::Quota(path.to_string()));
        self.check("GETQUOTAROOT", &[])?;
        Ok(self.lock().quota.clone().unwrap_or(QuotaInfo {
            path: path.to_string(),
            root: String::new(),
            storage: None,
            messages: None,
        }))
    }

    async fn create_mailbox(&self, path: &str) -> Result<(), ImapError> {
        self.record(Call::Create(path.to_string()));
        self.check("CREATE", &[])?;
        self.lock().mailboxes.push(mailbox(path));
        Ok(())
    }

    async fn rename_mailbox(&self, from: &str, to: &str) -> Result<(), ImapError> {
        self.record(Call::Rename(from.to_string(), to.to_string()));
        self.check("RENAME", &[])
    }

    async fn mailbox_open(&self, path: &str, read_only: bool) -> Result<MailboxInfo, ImapError> {
        self.record(Call::Open(path.to_string(), read_only));
        self.check(if read_only { "EXAMINE" } else { "SELECT" }, &[])?;
        let state = self.lock();
        Ok(MailboxInfo {
            path: path.to_string(),
            exists: state.messages.len() as u32,
            uid_validity: Some(1),
            uid_next: Some(state.messages.keys().last().copied().unwrap_or(0) + 1),
            read_only,
        })
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<u32>, ImapError> {
        self.record(Call::Search(criteria.to_imap_string()));
        self.check("SEARCH", &[])?;
        Ok(self.lock().messages.keys().copied().collect())
    }

    async fn fetch(&self, uids: &UidSet, query: FetchQuery) -> Result<Vec<FetchedMessage>, ImapError> {
        self.record(Call::Fetch(uids.as_str().to_string()));
        let wanted = self.expand(uids);
        self.check("FETCH", &wanted)?;
        let state = self.lock();
        Ok(wanted
            .into_iter()
            .filter_map(|uid| state.messages.get(&uid).map(|m| (uid, m)))
            .map(|(uid, m)| FetchedMessage {
                uid,
                envelope: query.envelope.then(|| m.envelope.clone()),
                flags: if query.flags { m.flags.clone() } else { Vec::new() },
                size: query.size.then(|| m.source.len() as u32),
                body_structure: if query.body_structure { m.body_structure.clone() } else { None },
                source: query.source.then(|| m.source.clone()),
            })
            .collect())
    }

    async fn download(&self, uid: u32, part_id: &str) -> Result<Vec<u8>, ImapError> {
        self.record(Call::Download(uid, part_id.to_string()));
        self.check("FETCH", &[uid])?;
        self.lock()
            .messages
            .get(&uid)
            .and_then(|m| m.parts.get(part_id).cloned())
            .ok_or_else(|| ImapError::MissingData(format!("Part {} of message {}", part_id, uid)))
    }

    async fn append(&self, path: &str, content: &[u8], flags: &[Flag]) -> Result<AppendResult, ImapError> {
        self.record(Call::Append(path.to_string(), flags.to_vec()));
        self.check("APPEND", &[])?;
        let mut state = self.lock();
        let uid = state.messages.keys().last().copied().unwrap_or(0) + 1;
        state.messages.insert(
            uid,
            StoredMessage { flags: flags.to_vec(), source: content.to_vec(), ..Default::default() },
        );
        Ok(AppendResult { uid: Some(uid), uid_validity: Some(1) })
    }

    async fn message_copy(&self, uids: &UidSet, destination: &str) -> Result<(), ImapError> {
        self.record(Call::Copy(uids.as_str().to_string(), destination.to_string()));
        let affected = self.expand(uids);
        self.check("COPY", &affected)
    }

    async fn message_move(&self, uids: &UidSet, destination: &str) -> Result<(), ImapError> {
        self.record(Call::Move(uids.as_str().to_string(), destination.to_string()));
        let affected = self.expand(uids);
        self.check("MOVE", &affected)
    }

    async fn flags_add(&self, uids: &UidSet, flags: &[Flag]) -> Result<(), ImapError> {
        self.record(Call::FlagsAdd(uids.as_str().to_string(), flags.to_vec()));
        let affected = self.expand(uids);
        self.check("STORE", &affected)
    }

    async fn flags_remove(&self, uids: &UidSet, flags: &[Flag]) -> Result<(), ImapError> {
        self.record(Call::FlagsRemove(uids.as_str().to_string(), flags.to_vec()));
        let affected = self.expand(uids);
        self.check("STORE", &affected)
    }
}

/// Hands out the shared mock and counts connection attempts.
#[derive(Debug, Clone)]
pub struct MockConnector {
    session: MockImapSession,
    connects: Arc<AtomicUsize>,
    refuse: Option<ImapError>,
}

impl MockConnector {
    pub fn new(session: MockImapSession) -> Self {
        Self { session, connects: Arc::new(AtomicUsize::new(0)), refuse: None }
    }

    pub fn refusing(session: MockImapSession, err: ImapError) -> Self {
        Self { refuse: Some(err), ..Self::new(session) }
    }

    pub fn connects(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SessionConnector for MockConnector {
    async fn connect(&self, logger: ImapLogger) -> Result<Box<dyn ImapOps>, ImapError> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        if let Some(err) = &self.refuse {
            return Err(err.clone());
        }
        self.session.attach_logger(logger);
        Ok(Box::new(self.session.clone()))
    }
}

pub fn params(value: Value) -> Map<String, Value> {
    value.as_object().cloned().unwrap_or_default()
}

pub fn invocation(resource: &str, operation: &str, parameters: Value) -> Invocation {
    Invocation {
        resource: resource.to_string(),
        operation: operation.to_string(),
        parameters: params(parameters),
        continue_on_fail: false,
        items: vec![InputItem::default()],
    }
}

pub async fn run(connector: &MockConnector, invocation: Invocation) -> Result<Vec<ResultItem>, NodeError> {
    ExecutionLoop::new(Arc::new(connector.clone())).run(invocation).await
}

pub async fn run_with_registry(
    connector: &MockConnector,
    registry: &'static OperationRegistry,
    invocation: Invocation,
) -> Result<Vec<ResultItem>, NodeError> {
    ExecutionLoop::new(Arc::new(connector.clone()))
        .with_registry(registry)
        .run(invocation)
        .await
}

