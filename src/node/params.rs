// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Parameter schemas.
//!
//! Every operation owns fresh copies of its parameters. Two operations can
//! both declare `mailboxPath` and each copy is shown only for its own
//! resource/operation pair.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::registry::OperationKey;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ParameterOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ParameterKind {
    String,
    Number,
    Boolean,
    Options { options: Vec<ParameterOption> },
    MultiOptions { options: Vec<ParameterOption> },
    /// A group of optional named sub-values, supplied as one object.
    Collection { options: Vec<ParameterDescriptor> },
    /// A string, or `{mode, value}` as produced by a locator picker.
    ResourceLocator,
}

/// Condition under which a parameter is presented.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DisplayOptions {
    pub show: BTreeMap<String, Vec<String>>,
}

impl DisplayOptions {
    pub fn for_resource(resource: &str) -> Self {
        let mut show = BTreeMap::new();
        show.insert("resource".to_string(), vec![resource.to_string()]);
        Self { show }
    }

    pub fn for_operation(key: OperationKey) -> Self {
        let mut options = Self::for_resource(key.resource.as_str());
        options
            .show
            .insert("operation".to_string(), vec![key.operation.as_str().to_string()]);
        options
    }

    pub fn is_visible(&self, resource: &str, operation: &str) -> bool {
        self.show.iter().all(|(field, allowed)| match field.as_str() {
            "resource" => allowed.iter().any(|r| r == resource),
            "operation" => allowed.iter().any(|o| o == operation),
            _ => true,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterDescriptor {
    pub name: String,
    pub display_name: String,
    #[serde(flatten)]
    pub kind: ParameterKind,
    pub default: Value,
    pub required: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub display_options: Option<DisplayOptions>,
}

impl ParameterDescriptor {
    fn with_kind(name: &str, display_name: &str, kind: ParameterKind, default: Value) -> Self {
        Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            kind,
            default,
            required: false,
            description: None,
            display_options: None,
        }
    }

    pub fn string(name: &str, display_name: &str) -> Self {
        Self::with_kind(name, display_name, ParameterKind::String, Value::String(String::new()))
    }

    pub fn number(name: &str, display_name: &str) -> Self {
        Self::with_kind(name, display_name, ParameterKind::Number, Value::from(0))
    }

    pub fn boolean(name: &str, display_name: &str) -> Self {
        Self::with_kind(name, display_name, ParameterKind::Boolean, Value::Bool(false))
    }

    pub fn options(name: &str, display_name: &str, options: &[(&str, &str)]) -> Self {
        let default = options.first().map(|(_, v)| Value::from(*v)).unwrap_or(Value::Null);
        Self::with_kind(name, display_name, ParameterKind::Options { options: to_options(options) }, default)
    }

    pub fn multi_options(name: &str, display_name: &str, options: &[(&str, &str)]) -> Self {
        Self::with_kind(
            name,
            display_name,
            ParameterKind::MultiOptions { options: to_options(options) },
            Value::Array(Vec::new()),
        )
    }

    pub fn collection(name: &str, display_name: &str, fields: Vec<ParameterDescriptor>) -> Self {
        Self::with_kind(
            name,
            display_name,
            ParameterKind::Collection { options: fields },
            Value::Object(Default::default()),
        )
    }

    pub fn resource_locator(name: &str, display_name: &str) -> Self {
        Self::with_kind(name, display_name, ParameterKind::ResourceLocator, Value::String(String::new()))
    }

    pub fn default_value(mut self, value: Value) -> Self {
        self.default = value;
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn description(mut self, text: &str) -> Self {
        self.description = Some(text.to_string());
        self
    }

    pub fn display_options(mut self, options: DisplayOptions) -> Self {
        self.display_options = Some(options);
        self
    }
}

fn to_options(options: &[(&str, &str)]) -> Vec<ParameterOption> {
    options
        .iter()
        .map(|(name, value)| ParameterOption { name: name.to_string(), value: value.to_string() })
        .collect()
}

/// Ordered parameter list of one operation.
#[derive(Debug, Clone)]
pub struct OperationSchema {
    key: OperationKey,
    parameters: Vec<ParameterDescriptor>,
}

impl OperationSchema {
    pub fn new(key: OperationKey) -> Self {
        Self { key, parameters: Vec::new() }
    }

    /// Adds `parameter`, gated to this schema's resource/operation pair.
    pub fn parameter(mut self, parameter: ParameterDescriptor) -> Self {
        let gated = parameter.display_options(DisplayOptions::for_operation(self.key));
        self.parameters.push(gated);
        self
    }

    pub fn key(&self) -> OperationKey {
        self.key
    }

    pub fn parameters(&self) -> &[ParameterDescriptor] {
        &self.parameters
    }

    pub fn get(&self, name: &str) -> Option<&ParameterDescriptor> {
        self.parameters.iter().find(|p| p.name == name)
    }
}
