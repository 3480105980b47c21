// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use lazy_static::lazy_static;
use log::warn;

use super::context::ExecutionContext;
use super::item::ResultItem;
use super::params::{DisplayOptions, OperationSchema, ParameterDescriptor};
use crate::error::{HandlerError, NodeError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Resource {
    Mailbox,
    Email,
}

impl Resource {
    pub const ALL: [Resource; 2] = [Resource::Email, Resource::Mailbox];

    pub fn as_str(&self) -> &'static str {
        match self {
            Resource::Mailbox => "mailbox",
            Resource::Email => "email",
        }
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Resource::Mailbox => "Mailbox",
            Resource::Email => "Email",
        }
    }

    pub fn parse(value: &str) -> Option<Resource> {
        Self::ALL.into_iter().find(|r| r.as_str() == value)
    }
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operation {
    LoadMailboxList,
    GetStatus,
    GetQuota,
    CreateMailbox,
    RenameMailbox,
    GetEmailsList,
    DownloadEml,
    MoveEmail,
    CopyEmail,
    SetEmailFlags,
    CreateDraft,
    DownloadAttachment,
}

impl Operation {
    pub const ALL: [Operation; 12] = [
        Operation::LoadMailboxList,
        Operation::GetStatus,
        Operation::GetQuota,
        Operation::CreateMailbox,
        Operation::RenameMailbox,
        Operation::GetEmailsList,
        Operation::DownloadEml,
        Operation::MoveEmail,
        Operation::CopyEmail,
        Operation::SetEmailFlags,
        Operation::CreateDraft,
        Operation::DownloadAttachment,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::LoadMailboxList => "loadMailboxList",
            Operation::GetStatus => "getStatus",
            Operation::GetQuota => "getQuota",
            Operation::CreateMailbox => "createMailbox",
            Operation::RenameMailbox => "renameMailbox",
            Operation::GetEmailsList => "getEmailsList",
            Operation::DownloadEml => "downloadEml",
            Operation::MoveEmail => "moveEmail",
            Operation::CopyEmail => "copyEmail",
            Operation::SetEmailFlags => "setEmailFlags",
            Operation::CreateDraft => "createDraft",
            Operation::DownloadAttachment => "downloadAttachment",
        }
    }

    /// The resource this operation is filed under.
    pub fn resource(&self) -> Resource {
        match self {
            Operation::LoadMailboxList
            | Operation::GetStatus
            | Operation::GetQuota
            | Operation::CreateMailbox
            | Operation::RenameMailbox => Resource::Mailbox,
            _ => Resource::Email,
        }
    }

    pub fn parse(value: &str) -> Option<Operation> {
        Self::ALL.into_iter().find(|o| o.as_str() == value)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub resource: Resource,
    pub operation: Operation,
}

impl From<Operation> for OperationKey {
    fn from(operation: Operation) -> Self {
        OperationKey { resource: operation.resource(), operation }
    }
}

/// Behaviour behind one resource/operation pair.
#[async_trait]
pub trait OperationHandler: Send + Sync {
    fn operation(&self) -> Operation;

    fn display_name(&self) -> &'static str;

    /// Declares the operation's parameters on an empty, already gated schema.
    fn schema(&self, schema: OperationSchema) -> OperationSchema;

    /// Runs once per input item.
    async fn execute(&self, ctx: &ExecutionContext<'_>) -> Result<Vec<ResultItem>, HandlerError>;
}

pub struct OperationDescriptor {
    key: OperationKey,
    display_name: &'static str,
    schema: OperationSchema,
    handler: Arc<dyn OperationHandler>,
}

impl OperationDescriptor {
    pub fn from_handler<H: OperationHandler + 'static>(handler: H) -> Self {
        let key = OperationKey::from(handler.operation());
        let schema = handler.schema(OperationSchema::new(key));
        Self { key, display_name: handler.display_name(), schema, handler: Arc::new(handler) }
    }

    pub fn key(&self) -> OperationKey {
        self.key
    }

    pub fn display_name(&self) -> &'static str {
        self.display_name
    }

    pub fn schema(&self) -> &OperationSchema {
        &self.schema
    }

    pub fn handler(&self) -> &dyn OperationHandler {
        self.handler.as_ref()
    }
}

impl fmt::Debug for OperationDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OperationDescriptor")
            .field("key", &self.key)
            .field("display_name", &self.display_name)
            .field("parameters", &self.schema.parameters().len())
            .finish()
    }
}

#[derive(Debug, Clone)]
pub struct ResourceDescriptor {
    pub resource: Resource,
    /// Registration order.
    pub operations: Vec<Operation>,
}

/// Immutable table from resource/operation pairs to their handlers.
#[derive(Debug, Default)]
pub struct OperationRegistry {
    resources: Vec<ResourceDescriptor>,
    operations: HashMap<OperationKey, OperationDescriptor>,
}

lazy_static! {
    static ref GLOBAL_REGISTRY: OperationRegistry = crate::actions::default_registry();
}

impl OperationRegistry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder { registry: OperationRegistry::default() }
    }

    /// The registry with every built-in operation, built on first use.
    pub fn global() -> &'static OperationRegistry {
        &GLOBAL_REGISTRY
    }

    pub fn resolve(&self, resource: &str, operation: &str) -> Result<&OperationDescriptor, NodeError> {
        let unknown = || NodeError::UnknownOperation {
            resource: resource.to_string(),
            operation: operation.to_string(),
        };
        let resource_key = Resource::parse(resource).ok_or_else(unknown)?;
        let operation_key = Operation::parse(operation).ok_or_else(unknown)?;
        self.operations
            .get(&OperationKey { resource: resource_key, operation: operation_key })
            .ok_or_else(unknown)
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Full property list: the resource selector, one operation selector per
    /// resource, then every operation's own parameters.
    pub fn node_properties(&self) -> Vec<ParameterDescriptor> {
        let resource_options: Vec<(&str, &str)> =
            self.resources.iter().map(|r| (r.resource.display_name(), r.resource.as_str())).collect();
        let mut properties = vec![ParameterDescriptor::options("resource", "Resource", &resource_options)];

        for resource in &self.resources {
            let operation_options: Vec<(&str, &str)> = resource
                .operations
                .iter()
                .filter_map(|op| self.operations.get(&OperationKey::from(*op)))
                .map(|d| (d.display_name(), d.key().operation.as_str()))
                .collect();
            properties.push(
                ParameterDescriptor::options("operation", "Operation", &operation_options)
                    .display_options(DisplayOptions::for_resource(resource.resource.as_str())),
            );
        }

        for resource in &self.resources {
            for op in &resource.operations {
                if let Some(descriptor) = self.operations.get(&OperationKey::from(*op)) {
                    properties.extend(descriptor.schema().parameters().iter().cloned());
                }
            }
        }
        properties
    }
}

pub struct RegistryBuilder {
    registry: OperationRegistry,
}

impl RegistryBuilder {
    /// Registers a handler. A second handler for the same pair is ignored.
    pub fn register<H: OperationHandler + 'static>(mut self, handler: H) -> Self {
        let descriptor = OperationDescriptor::from_handler(handler);
        let key = descriptor.key();
        if self.registry.operations.contains_key(&key) {
            warn!("Ignoring duplicate registration of {}/{}", key.resource, key.operation);
            return self;
        }

        match self.registry.resources.iter_mut().find(|r| r.resource == key.resource) {
            Some(resource) => resource.operations.push(key.operation),
            None => self.registry.resources.push(ResourceDescriptor {
                resource: key.resource,
                operations: vec![key.operation],
            }),
        }
        self.registry.operations.insert(key, descriptor);
        self
    }

    pub fn build(self) -> OperationRegistry {
        self.registry
    }
}
