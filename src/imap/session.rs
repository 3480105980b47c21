// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::fmt::Debug;
use std::sync::Arc;

use async_imap::error::Error as AsyncImapError;
use async_imap::types::{Fetch, Flag as AsyncImapFlag, Name, QuotaResourceName};
use async_trait::async_trait;
use futures_util::stream::TryStreamExt;
use serde_json::json;
use tokio::sync::Mutex as TokioMutex;
use tokio_util::compat::Compat;

use crate::capture::{diagnostic, ImapLogger};
use crate::imap::client::ImapStream;
use crate::imap::error::ImapError;
use crate::imap::structure::{body_part_from_structure, envelope_from_proto, section_path};
use crate::imap::types::{
    AppendResult, FetchQuery, FetchedMessage, Flag, MailboxEntry, MailboxInfo, MailboxStatus,
    QuotaInfo, QuotaUsage, SearchCriteria, StatusField, UidSet,
};

pub type ImapSession = async_imap::Session<Compat<ImapStream>>;

/// Mailbox and message commands available to action handlers.
///
/// Failures come back as terse [`ImapError`]s. Whatever the server said about
/// a failure is reported through the session's [`ImapLogger`] instead.
#[async_trait]
pub trait ImapOps: Send + Sync + Debug {
    async fn logout(&self) -> Result<(), ImapError>;

    async fn list_mailboxes(&self) -> Result<Vec<MailboxEntry>, ImapError>;

    /// Runs STATUS for `fields` only.
    async fn status(&self, path: &str, fields: &[StatusField]) -> Result<MailboxStatus, ImapError>;

    async fn get_quota(&self, path: &str) -> Result<QuotaInfo, ImapError>;

    async fn create_mailbox(&self, path: &str) -> Result<(), ImapError>;

    async fn rename_mailbox(&self, from: &str, to: &str) -> Result<(), ImapError>;

    /// Opens `path` for the commands that follow. Read-only opens use EXAMINE.
    async fn mailbox_open(&self, path: &str, read_only: bool) -> Result<MailboxInfo, ImapError>;

    /// UID SEARCH in the open mailbox; UIDs come back ascending.
    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<u32>, ImapError>;

    async fn fetch(&self, uids: &UidSet, query: FetchQuery) -> Result<Vec<FetchedMessage>, ImapError>;

    async fn fetch_one(&self, uid: u32, query: FetchQuery) -> Result<Option<FetchedMessage>, ImapError> {
        Ok(self.fetch(&UidSet::single(uid), query).await?.into_iter().find(|m| m.uid == uid))
    }

    /// Raw bytes of one body section, still in its transfer encoding.
    async fn download(&self, uid: u32, part_id: &str) -> Result<Vec<u8>, ImapError>;

    async fn append(&self, path: &str, content: &[u8], flags: &[Flag]) -> Result<AppendResult, ImapError>;

    async fn message_copy(&self, uids: &UidSet, destination: &str) -> Result<(), ImapError>;

    async fn message_move(&self, uids: &UidSet, destination: &str) -> Result<(), ImapError>;

    async fn flags_add(&self, uids: &UidSet, flags: &[Flag]) -> Result<(), ImapError>;

    async fn flags_remove(&self, uids: &UidSet, flags: &[Flag]) -> Result<(), ImapError>;
}

#[derive(Debug, Clone)]
pub struct AsyncImapSessionWrapper {
    session: Arc<TokioMutex<ImapSession>>,
    logger: ImapLogger,
}

impl AsyncImapSessionWrapper {
    pub fn new(session: ImapSession, logger: ImapLogger) -> Self {
        Self { session: Arc::new(TokioMutex::new(session)), logger }
    }

    /// Reports a failed command through the logger and returns the terse
    /// error handed back to the caller.
    fn command_failed(&self, command: &str, err: AsyncImapError) -> ImapError {
        let (status, text) = match err {
            AsyncImapError::No(text) => ("NO", text),
            AsyncImapError::Bad(text) => ("BAD", text),
            other => {
                let mapped = ImapError::from(other);
                self.logger.error(diagnostic(
                    "Command error",
                    &[("command", json!(command)), ("err", json!(mapped.to_string()))],
                ));
                return mapped;
            }
        };
        self.logger.error(diagnostic(
            "Command failed",
            &[
                ("command", json!(command)),
                ("responseStatus", json!(status)),
                ("responseText", json!(text)),
            ],
        ));
        ImapError::Command(format!("{} failed", command))
    }

    /// Logs and discards untagged data the server pushed during the last
    /// command.
    fn drain_unsolicited(&self, session: &ImapSession) {
        while let Ok(response) = session.unsolicited_responses.try_recv() {
            self.logger.debug(diagnostic(
                "Unsolicited response",
                &[("response", json!(format!("{:?}", response)))],
            ));
        }
    }

    async fn store(&self, uids: &UidSet, query: String) -> Result<(), ImapError> {
        let mut session = self.session.lock().await;
        {
            let updates = session
                .uid_store(uids.as_str(), &query)
                .await
                .map_err(|e| self.command_failed("STORE", e))?;
            updates
                .try_collect::<Vec<Fetch>>()
                .await
                .map_err(|e| self.command_failed("STORE", e))?;
        }
        self.drain_unsolicited(&session);
        Ok(())
    }
}

fn flag_list(flags: &[Flag]) -> String {
    flags.iter().map(|f| f.to_string()).collect::<Vec<_>>().join(" ")
}

fn convert_flag(flag: AsyncImapFlag<'_>) -> Flag {
    match flag {
        AsyncImapFlag::Seen => Flag::Seen,
        AsyncImapFlag::Answered => Flag::Answered,
        AsyncImapFlag::Flagged => Flag::Flagged,
        AsyncImapFlag::Deleted => Flag::Deleted,
        AsyncImapFlag::Draft => Flag::Draft,
        AsyncImapFlag::Recent => Flag::Recent,
        AsyncImapFlag::Custom(name) => Flag::from_name(&name),
        other => Flag::Custom(format!("{:?}", other)),
    }
}

fn convert_name(name: &Name) -> MailboxEntry {
    let path = name.name().to_string();
    let delimiter = name.delimiter().map(str::to_string);
    let leaf = match &delimiter {
        Some(delim) if !delim.is_empty() => path.rsplit(delim.as_str()).next().unwrap_or(&path).to_string(),
        _ => path.clone(),
    };
    MailboxEntry {
        path,
        name: leaf,
        delimiter,
        flags: name.attributes().iter().map(|attr| format!("{:?}", attr)).collect(),
    }
}

fn convert_fetch(fetch: &Fetch, uid: u32) -> FetchedMessage {
    FetchedMessage {
        uid,
        envelope: fetch.envelope().map(envelope_from_proto),
        flags: fetch.flags().map(convert_flag).collect(),
        size: fetch.size,
        body_structure: fetch.bodystructure().map(body_part_from_structure),
        source: fetch.body().map(|b| b.to_vec()),
    }
}

#[async_trait]
impl ImapOps for AsyncImapSessionWrapper {
    async fn logout(&self) -> Result<(), ImapError> {
        let mut session = self.session.lock().await;
        session.logout().await.map_err(|e| self.command_failed("LOGOUT", e))
    }

    async fn list_mailboxes(&self) -> Result<Vec<MailboxEntry>, ImapError> {
        let mut session = self.session.lock().await;
        let names = {
            let stream = session
                .list(Some(""), Some("*"))
                .await
                .map_err(|e| self.command_failed("LIST", e))?;
            stream
                .try_collect::<Vec<Name>>()
                .await
                .map_err(|e| self.command_failed("LIST", e))?
        };
        self.drain_unsolicited(&session);
        Ok(names.iter().map(convert_name).collect())
    }

    async fn status(&self, path: &str, fields: &[StatusField]) -> Result<MailboxStatus, ImapError> {
        let fields: &[StatusField] = if fields.is_empty() { &StatusField::DEFAULT } else { fields };
        let items = format!(
            "({})",
            fields.iter().map(|f| f.imap_name()).collect::<Vec<_>>().join(" ")
        );
        let mut session = self.session.lock().await;
        let mailbox = session
            .status(path, &items)
            .await
            .map_err(|e| self.command_failed("STATUS", e))?;
        self.drain_unsolicited(&session);

        let mut status = MailboxStatus { path: path.to_string(), ..Default::default() };
        for field in fields {
            match field {
                StatusField::Messages => status.messages = Some(mailbox.exists),
                StatusField::Recent => status.recent = Some(mailbox.recent),
                StatusField::Unseen => status.unseen = mailbox.unseen,
                StatusField::UidNext => status.uid_next = mailbox.uid_next,
                StatusField::UidValidity => status.uid_validity = mailbox.uid_validity,
                StatusField::HighestModseq => status.highest_modseq = mailbox.highest_modseq,
            }
        }
        Ok(status)
    }

    async fn get_quota(&self, path: &str) -> Result<QuotaInfo, ImapError> {
        let mut session = self.session.lock().await;
        let (roots, quotas) = session
            .get_quota_root(path)
            .await
            .map_err(|e| self.command_failed("GETQUOTAROOT", e))?;
        self.drain_unsolicited(&session);

        let root = roots
            .iter()
            .flat_map(|r| r.quota_root_names.iter())
            .next()
            .cloned()
            .unwrap_or_default();
        let mut info = QuotaInfo { path: path.to_string(), root: root.clone(), ..Default::default() };
        let quota = quotas
            .iter()
            .find(|q| q.root_name == root)
            .or_else(|| quotas.first());
        if let Some(quota) = quota {
            for resource in &quota.resources {
                let usage = QuotaUsage { usage: resource.usage, limit: resource.limit };
                match resource.name {
                    QuotaResourceName::Storage => info.storage = Some(usage),
                    QuotaResourceName::Message => info.messages = Some(usage),
                    _ => {}
                }
            }
        }
        Ok(info)
    }

    async fn create_mailbox(&self, path: &str) -> Result<(), ImapError> {
        let mut session = self.session.lock().await;
        session.create(path).await.map_err(|e| self.command_failed("CREATE", e))?;
        self.drain_unsolicited(&session);
        Ok(())
    }

    async fn rename_mailbox(&self, from: &str, to: &str) -> Result<(), ImapError> {
        let mut session = self.session.lock().await;
        session.rename(from, to).await.map_err(|e| self.command_failed("RENAME", e))?;
        self.drain_unsolicited(&session);
        Ok(())
    }

    async fn mailbox_open(&self, path: &str, read_only: bool) -> Result<MailboxInfo, ImapError> {
        let mut session = self.session.lock().await;
        let mailbox = if read_only {
            session.examine(path).await.map_err(|e| self.command_failed("EXAMINE", e))?
        } else {
            session.select(path).await.map_err(|e| self.command_failed("SELECT", e))?
        };
        self.drain_unsolicited(&session);
        Ok(MailboxInfo {
            path: path.to_string(),
            exists: mailbox.exists,
            uid_validity: mailbox.uid_validity,
            uid_next: mailbox.uid_next,
            read_only,
        })
    }

    async fn search(&self, criteria: &SearchCriteria) -> Result<Vec<u32>, ImapError> {
        let mut session = self.session.lock().await;
        let found = session
            .uid_search(criteria.to_imap_string())
            .await
            .map_err(|e| self.command_failed("SEARCH", e))?;
        self.drain_unsolicited(&session);
        let mut uids: Vec<u32> = found.into_iter().collect();
        uids.sort_unstable();
        Ok(uids)
    }

    async fn fetch(&self, uids: &UidSet, query: FetchQuery) -> Result<Vec<FetchedMessage>, ImapError> {
        let mut session = self.session.lock().await;
        let mut messages = Vec::new();
        {
            let mut stream = session
                .uid_fetch(uids.as_str(), query.to_imap_string())
                .await
                .map_err(|e| self.command_failed("FETCH", e))?;
            while let Some(fetch) = stream.try_next().await.map_err(|e| self.command_failed("FETCH", e))? {
                match fetch.uid {
                    Some(uid) => messages.push(convert_fetch(&fetch, uid)),
                    None => self.logger.debug(diagnostic(
                        "Ignoring FETCH response without UID",
                        &[("seq", json!(fetch.message))],
                    )),
                }
            }
        }
        self.drain_unsolicited(&session);
        Ok(messages)
    }

    async fn download(&self, uid: u32, part_id: &str) -> Result<Vec<u8>, ImapError> {
        let path = section_path(part_id)?;
        let mut session = self.session.lock().await;
        let mut content = None;
        {
            let mut stream = session
                .uid_fetch(uid.to_string(), format!("(UID BODY.PEEK[{}])", part_id))
                .await
                .map_err(|e| self.command_failed("FETCH", e))?;
            while let Some(fetch) = stream.try_next().await.map_err(|e| self.command_failed("FETCH", e))? {
                if fetch.uid == Some(uid) {
                    content = fetch.section(&path).map(|bytes| bytes.to_vec());
                }
            }
        }
        self.drain_unsolicited(&session);
        content.ok_or_else(|| ImapError::MissingData(format!("Part {} of message {}", part_id, uid)))
    }

    async fn append(&self, path: &str, content: &[u8], flags: &[Flag]) -> Result<AppendResult, ImapError> {
        let mut session = self.session.lock().await;
        // APPEND's response carries no UID here, so take UIDNEXT beforehand.
        let before = session
            .status(path, "(UIDNEXT UIDVALIDITY)")
            .await
            .map_err(|e| self.command_failed("STATUS", e))?;
        session
            .append(path, content)
            .await
            .map_err(|e| self.command_failed("APPEND", e))?;
        self.drain_unsolicited(&session);

        let result = AppendResult { uid: before.uid_next, uid_validity: before.uid_validity };
        if let (Some(uid), false) = (result.uid, flags.is_empty()) {
            session.select(path).await.map_err(|e| self.command_failed("SELECT", e))?;
            {
                let updates = session
                    .uid_store(uid.to_string(), format!("+FLAGS ({})", flag_list(flags)))
                    .await
                    .map_err(|e| self.command_failed("STORE", e))?;
                updates
                    .try_collect::<Vec<Fetch>>()
                    .await
                    .map_err(|e| self.command_failed("STORE", e))?;
            }
            self.drain_unsolicited(&session);
        }
        Ok(result)
    }

    async fn message_copy(&self, uids: &UidSet, destination: &str) -> Result<(), ImapError> {
        let mut session = self.session.lock().await;
        session
            .uid_copy(uids.as_str(), destination)
            .await
            .map_err(|e| self.command_failed("COPY", e))?;
        self.drain_unsolicited(&session);
        Ok(())
    }

    async fn message_move(&self, uids: &UidSet, destination: &str) -> Result<(), ImapError> {
        let mut session = self.session.lock().await;
        match session.uid_mv(uids.as_str(), destination).await {
            Ok(()) => {
                self.drain_unsolicited(&session);
                Ok(())
            }
            // Servers without the MOVE extension reject the command outright.
            Err(AsyncImapError::Bad(text)) => {
                self.logger.info(diagnostic(
                    "MOVE rejected, falling back to COPY and EXPUNGE",
                    &[("responseText", json!(text))],
                ));
                session
                    .uid_copy(uids.as_str(), destination)
                    .await
                    .map_err(|e| self.command_failed("COPY", e))?;
                {
                    let updates = session
                        .uid_store(uids.as_str(), "+FLAGS.SILENT (\\Deleted)")
                        .await
                        .map_err(|e| self.command_failed("STORE", e))?;
                    updates
                        .try_collect::<Vec<Fetch>>()
                        .await
                        .map_err(|e| self.command_failed("STORE", e))?;
                }
                {
                    let expunged = session
                        .uid_expunge(uids.as_str())
                        .await
                        .map_err(|e| self.command_failed("EXPUNGE", e))?;
                    expunged
                        .try_collect::<Vec<u32>>()
                        .await
                        .map_err(|e| self.command_failed("EXPUNGE", e))?;
                }
                self.drain_unsolicited(&session);
                Ok(())
            }
            Err(e) => Err(self.command_failed("MOVE", e)),
        }
    }

    async fn flags_add(&self, uids: &UidSet, flags: &[Flag]) -> Result<(), ImapError> {
        self.store(uids, format!("+FLAGS.SILENT ({})", flag_list(flags))).await
    }

    async fn flags_remove(&self, uids: &UidSet, flags: &[Flag]) -> Result<(), ImapError> {
        self.store(uids, format!("-FLAGS.SILENT ({})", flag_list(flags))).await
    }
}
