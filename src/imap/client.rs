// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use async_imap::Client as AsyncImapClient;
use async_trait::async_trait;
use log::{debug, info};
use serde_json::json;
use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_native_tls::{TlsConnector, TlsStream};
use tokio_util::compat::TokioAsyncReadCompatExt;

use crate::capture::{diagnostic, ImapLogger};
use crate::config::{ImapCredentials, StartTlsPolicy};
use crate::imap::error::ImapError;
use crate::imap::session::{AsyncImapSessionWrapper, ImapOps, ImapSession};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Transport under the IMAP session: implicit TLS or plain TCP.
pub enum ImapStream {
    Tls(TlsStream<TcpStream>),
    Plain(TcpStream),
}

impl AsyncRead for ImapStream {
    fn poll_read(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &mut ReadBuf<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ImapStream::Tls(s) => Pin::new(s).poll_read(cx, buf),
            ImapStream::Plain(s) => Pin::new(s).poll_read(cx, buf),
        }
    }
}

impl AsyncWrite for ImapStream {
    fn poll_write(self: Pin<&mut Self>, cx: &mut Context<'_>, buf: &[u8]) -> Poll<std::io::Result<usize>> {
        match self.get_mut() {
            ImapStream::Tls(s) => Pin::new(s).poll_write(cx, buf),
            ImapStream::Plain(s) => Pin::new(s).poll_write(cx, buf),
        }
    }

    fn poll_flush(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ImapStream::Tls(s) => Pin::new(s).poll_flush(cx),
            ImapStream::Plain(s) => Pin::new(s).poll_flush(cx),
        }
    }

    fn poll_shutdown(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
        match self.get_mut() {
            ImapStream::Tls(s) => Pin::new(s).poll_shutdown(cx),
            ImapStream::Plain(s) => Pin::new(s).poll_shutdown(cx),
        }
    }
}

impl std::fmt::Debug for ImapStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ImapStream::Tls(_) => write!(f, "ImapStream::Tls"),
            ImapStream::Plain(_) => write!(f, "ImapStream::Plain"),
        }
    }
}

/// Opens the one session an invocation runs against.
#[async_trait]
pub trait SessionConnector: Send + Sync {
    /// `logger` becomes the session's diagnostic channel for its whole life.
    async fn connect(&self, logger: ImapLogger) -> Result<Box<dyn ImapOps>, ImapError>;
}

#[derive(Debug, Clone)]
pub struct ImapConnector {
    credentials: ImapCredentials,
}

impl ImapConnector {
    pub fn new(credentials: ImapCredentials) -> Self {
        Self { credentials }
    }

    async fn open_stream(&self) -> Result<ImapStream, ImapError> {
        let creds = &self.credentials;
        if !creds.tls {
            match creds.start_tls_policy {
                StartTlsPolicy::Required => {
                    return Err(ImapError::Connection(
                        "STARTTLS is required but not supported; enable implicit TLS instead".to_string(),
                    ))
                }
                StartTlsPolicy::Optional => {
                    debug!("STARTTLS not attempted for {}:{}, continuing in plain text", creds.host, creds.port)
                }
                StartTlsPolicy::Disabled => {}
            }
        }

        debug!("Connecting to {}:{}", creds.host, creds.port);
        let tcp = timeout(CONNECT_TIMEOUT, TcpStream::connect((creds.host.as_str(), creds.port)))
            .await
            .map_err(|_| ImapError::Connection(format!("Timed out connecting to {}:{}", creds.host, creds.port)))??;

        if !creds.tls {
            return Ok(ImapStream::Plain(tcp));
        }

        let connector = native_tls::TlsConnector::builder()
            .danger_accept_invalid_certs(creds.allow_unauthorized_certs)
            .danger_accept_invalid_hostnames(creds.allow_unauthorized_certs)
            .build()?;
        let tls = TlsConnector::from(connector).connect(&creds.host, tcp).await?;
        debug!("TLS handshake with {} complete", creds.host);
        Ok(ImapStream::Tls(tls))
    }
}

#[async_trait]
impl SessionConnector for ImapConnector {
    async fn connect(&self, logger: ImapLogger) -> Result<Box<dyn ImapOps>, ImapError> {
        let stream = self.open_stream().await?;
        let mut client = AsyncImapClient::new(stream.compat());
        match timeout(CONNECT_TIMEOUT, client.read_response()).await {
            Ok(Some(Ok(_greeting))) => {}
            Ok(Some(Err(e))) => return Err(e.into()),
            Ok(None) => {
                return Err(ImapError::Connection("Connection closed before the server greeting".to_string()))
            }
            Err(_) => return Err(ImapError::Connection("Timed out waiting for the server greeting".to_string())),
        }

        let session: ImapSession = match timeout(
            CONNECT_TIMEOUT,
            client.login(&self.credentials.user, &self.credentials.password),
        )
        .await
        {
            Ok(Ok(session)) => session,
            Ok(Err((err, _client))) => {
                let mapped = ImapError::Auth(err.to_string());
                logger.error(diagnostic(
                    "Login failed",
                    &[("user", json!(self.credentials.user)), ("err", json!(mapped.to_string()))],
                ));
                return Err(mapped);
            }
            Err(_) => return Err(ImapError::Connection("Login timed out".to_string())),
        };

        info!(
            "[{}] Logged in to {}:{} as {}",
            logger.connection_id(),
            self.credentials.host,
            self.credentials.port,
            self.credentials.user
        );
        Ok(Box::new(AsyncImapSessionWrapper::new(session, logger)))
    }
}
