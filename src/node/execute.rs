// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::sync::Arc;

use log::{debug, error, info, warn};
use serde::Deserialize;
use serde_json::{Map, Value};

use super::context::ExecutionContext;
use super::item::{BinaryDataSink, InMemoryBinarySink, InputItem, ResultItem};
use super::registry::{OperationDescriptor, OperationRegistry};
use crate::capture::{ErrorCapture, ImapLogger};
use crate::error::{ComposedError, HandlerError, NodeError};
use crate::imap::client::SessionConnector;
use crate::imap::session::ImapOps;

/// One run of a single operation over a batch of items.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Invocation {
    pub resource: String,
    pub operation: String,
    #[serde(default)]
    pub parameters: Map<String, Value>,
    #[serde(default)]
    pub continue_on_fail: bool,
    #[serde(default)]
    pub items: Vec<InputItem>,
}

/// Drives one handler call per input item over a single IMAP session.
pub struct ExecutionLoop {
    registry: &'static OperationRegistry,
    connector: Arc<dyn SessionConnector>,
    sink: Arc<dyn BinaryDataSink>,
}

impl ExecutionLoop {
    pub fn new(connector: Arc<dyn SessionConnector>) -> Self {
        Self {
            registry: OperationRegistry::global(),
            connector,
            sink: Arc::new(InMemoryBinarySink),
        }
    }

    pub fn with_registry(mut self, registry: &'static OperationRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn BinaryDataSink>) -> Self {
        self.sink = sink;
        self
    }

    pub async fn run(&self, invocation: Invocation) -> Result<Vec<ResultItem>, NodeError> {
        // Resource and operation are fixed for the whole batch.
        let descriptor = self.registry.resolve(&invocation.resource, &invocation.operation)?;

        let capture = ErrorCapture::new();
        let logger = ImapLogger::new(capture.clone());
        let session = self.connector.connect(logger.clone()).await.map_err(|e| {
            error!("Failed to open IMAP session: {}", e);
            NodeError::Connection(e)
        })?;
        info!(
            "[{}] Running {}/{} over {} item(s)",
            logger.connection_id(),
            invocation.resource,
            invocation.operation,
            invocation.items.len()
        );

        let outcome = self
            .process_items(descriptor, &invocation, session.as_ref(), &capture, &logger)
            .await;

        if let Err(e) = session.logout().await {
            warn!("[{}] Logout failed: {}", logger.connection_id(), e);
        }
        outcome
    }

    async fn process_items(
        &self,
        descriptor: &OperationDescriptor,
        invocation: &Invocation,
        session: &dyn ImapOps,
        capture: &ErrorCapture,
        logger: &ImapLogger,
    ) -> Result<Vec<ResultItem>, NodeError> {
        let mut output = Vec::with_capacity(invocation.items.len());

        for (index, item) in invocation.items.iter().enumerate() {
            let ctx = ExecutionContext::new(
                index,
                item,
                &invocation.parameters,
                descriptor.schema(),
                session,
                self.sink.as_ref(),
                logger,
            );

            capture.start_error_catching();
            let result = descriptor.handler().execute(&ctx).await;
            let captured = capture.stop_and_get_errors_list();

            match result {
                Ok(items) => {
                    if items.is_empty() {
                        warn!("{} returned no items for item {}", invocation.operation, index);
                    }
                    if !captured.is_empty() {
                        debug!("Item {} succeeded with {} diagnostic(s) captured", index, captured.len());
                    }
                    output.extend(items.into_iter().map(|mut r| {
                        r.correlated_to = Some(index);
                        r
                    }));
                }
                Err(err) => {
                    let composed = match err {
                        // Composed errors are forwarded as the handler built them.
                        HandlerError::Composed(composed) => composed,
                        HandlerError::Raw { message } => {
                            let message = if message.trim().is_empty() {
                                "Unknown error".to_string()
                            } else {
                                message
                            };
                            ComposedError::new(message)
                                .with_description(captured.describe())
                                .with_item_index(index)
                        }
                    };
                    error!(
                        "{} failed for item {}: {} ({})",
                        invocation.operation,
                        index,
                        composed.message,
                        composed.description.as_deref().unwrap_or("")
                    );

                    if invocation.continue_on_fail {
                        output.push(ResultItem::error(&composed.message, index));
                    } else {
                        return Err(NodeError::Item(composed));
                    }
                }
            }
        }
        Ok(output)
    }
}
