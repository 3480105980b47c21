// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde_json::{Map, Value};

use super::item::{BinaryDataSink, InputItem};
use super::params::{OperationSchema, ParameterKind};
use crate::capture::ImapLogger;
use crate::error::{ComposedError, HandlerError};
use crate::imap::session::ImapOps;

/// Everything one handler call may touch, scoped to a single input item.
pub struct ExecutionContext<'a> {
    item_index: usize,
    item: &'a InputItem,
    parameters: &'a Map<String, Value>,
    schema: &'a OperationSchema,
    session: &'a dyn ImapOps,
    sink: &'a dyn BinaryDataSink,
    logger: &'a ImapLogger,
}

impl<'a> ExecutionContext<'a> {
    pub fn new(
        item_index: usize,
        item: &'a InputItem,
        parameters: &'a Map<String, Value>,
        schema: &'a OperationSchema,
        session: &'a dyn ImapOps,
        sink: &'a dyn BinaryDataSink,
        logger: &'a ImapLogger,
    ) -> Self {
        Self { item_index, item, parameters, schema, session, sink, logger }
    }

    pub fn item_index(&self) -> usize {
        self.item_index
    }

    pub fn item(&self) -> &InputItem {
        self.item
    }

    pub fn session(&self) -> &dyn ImapOps {
        self.session
    }

    pub fn sink(&self) -> &dyn BinaryDataSink {
        self.sink
    }

    pub fn logger(&self) -> &ImapLogger {
        self.logger
    }

    fn error(&self, message: String) -> HandlerError {
        HandlerError::Composed(
            ComposedError::new(message)
                .with_description(format!(
                    "Operation {}/{}",
                    self.schema.key().resource,
                    self.schema.key().operation
                ))
                .with_item_index(self.item_index),
        )
    }

    /// Resolves a declared parameter: the item's own override, then the
    /// invocation value, then the schema default.
    pub fn parameter(&self, name: &str) -> Result<Value, HandlerError> {
        let descriptor = self
            .schema
            .get(name)
            .ok_or_else(|| self.error(format!("Parameter \"{}\" is not declared for this operation", name)))?;

        let value = self
            .item
            .parameters
            .get(name)
            .or_else(|| self.parameters.get(name))
            .cloned()
            .unwrap_or_else(|| descriptor.default.clone());

        if descriptor.required && is_blank(&value) {
            return Err(self.error(format!("Missing required parameter \"{}\"", name)));
        }
        Ok(value)
    }

    pub fn get_string(&self, name: &str) -> Result<String, HandlerError> {
        let value = self.parameter(name)?;
        let kind_is_locator = matches!(
            self.schema.get(name).map(|p| &p.kind),
            Some(ParameterKind::ResourceLocator)
        );
        let value = if kind_is_locator { locator_value(value) } else { value };
        Ok(value_to_string(&value))
    }

    /// `None` for an absent or empty value.
    pub fn get_optional_string(&self, name: &str) -> Result<Option<String>, HandlerError> {
        let s = self.get_string(name)?;
        Ok(if s.trim().is_empty() { None } else { Some(s) })
    }

    pub fn get_bool(&self, name: &str) -> Result<bool, HandlerError> {
        match self.parameter(name)? {
            Value::Bool(b) => Ok(b),
            Value::Null => Ok(false),
            Value::String(s) => s
                .trim()
                .parse::<bool>()
                .map_err(|_| self.error(format!("Parameter \"{}\" must be a boolean", name))),
            _ => Err(self.error(format!("Parameter \"{}\" must be a boolean", name))),
        }
    }

    pub fn get_u64(&self, name: &str) -> Result<u64, HandlerError> {
        match self.parameter(name)? {
            Value::Number(n) => n
                .as_u64()
                .ok_or_else(|| self.error(format!("Parameter \"{}\" must be a non-negative integer", name))),
            Value::Null => Ok(0),
            Value::String(s) => s
                .trim()
                .parse::<u64>()
                .map_err(|_| self.error(format!("Parameter \"{}\" must be a non-negative integer", name))),
            _ => Err(self.error(format!("Parameter \"{}\" must be a non-negative integer", name))),
        }
    }

    /// Multi-option values; a comma-separated string is accepted as well.
    pub fn get_string_list(&self, name: &str) -> Result<Vec<String>, HandlerError> {
        match self.parameter(name)? {
            Value::Array(values) => Ok(values.iter().map(value_to_string).filter(|s| !s.is_empty()).collect()),
            Value::String(s) => Ok(s
                .split(',')
                .map(|part| part.trim().to_string())
                .filter(|part| !part.is_empty())
                .collect()),
            Value::Null => Ok(Vec::new()),
            _ => Err(self.error(format!("Parameter \"{}\" must be a list", name))),
        }
    }

    pub fn get_object(&self, name: &str) -> Result<Map<String, Value>, HandlerError> {
        match self.parameter(name)? {
            Value::Object(map) => Ok(map),
            Value::Null => Ok(Map::new()),
            _ => Err(self.error(format!("Parameter \"{}\" must be an object", name))),
        }
    }
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        Value::Object(map) => map.get("value").map(is_blank).unwrap_or(map.is_empty()),
        _ => false,
    }
}

/// Unwraps a `{mode, value}` locator into its value.
fn locator_value(value: Value) -> Value {
    match value {
        Value::Object(mut map) => map.remove("value").unwrap_or(Value::Null),
        other => other,
    }
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}
