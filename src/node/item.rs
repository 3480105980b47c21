// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use std::collections::BTreeMap;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::HandlerError;

/// Binary payload attached to a result item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BinaryData {
    /// Base64 of the raw bytes.
    pub data: String,
    pub mime_type: String,
    pub file_name: String,
    pub file_extension: Option<String>,
    pub file_size: usize,
}

/// One item flowing into an invocation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InputItem {
    #[serde(default)]
    pub json: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary: BTreeMap<String, BinaryData>,
    /// Per-item parameter values that take precedence over the invocation's.
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub parameters: Map<String, Value>,
}

impl InputItem {
    pub fn new(json: Value) -> Self {
        Self { json, ..Default::default() }
    }

    pub fn with_parameter(mut self, name: &str, value: Value) -> Self {
        self.parameters.insert(name.to_string(), value);
        self
    }
}

/// One unit of output, paired with the input item that produced it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResultItem {
    pub json: Value,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub binary: BTreeMap<String, BinaryData>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlated_to: Option<usize>,
}

impl ResultItem {
    pub fn new(json: Value) -> Self {
        Self { json, ..Default::default() }
    }

    /// The item emitted in place of a failed one under continue-on-fail.
    pub fn error(message: &str, item_index: usize) -> Self {
        Self {
            json: json!({ "error": message }),
            binary: BTreeMap::new(),
            correlated_to: Some(item_index),
        }
    }

    pub fn with_binary(mut self, field: impl Into<String>, data: BinaryData) -> Self {
        self.binary.insert(field.into(), data);
        self
    }
}

/// Turns raw bytes into a handle that can ride on a result item.
pub trait BinaryDataSink: Send + Sync {
    fn prepare(&self, bytes: Vec<u8>, file_name: &str, mime_type: &str) -> Result<BinaryData, HandlerError>;
}

/// Keeps payloads inline as base64.
#[derive(Debug, Clone, Copy, Default)]
pub struct InMemoryBinarySink;

impl BinaryDataSink for InMemoryBinarySink {
    fn prepare(&self, bytes: Vec<u8>, file_name: &str, mime_type: &str) -> Result<BinaryData, HandlerError> {
        Ok(BinaryData {
            data: BASE64.encode(&bytes),
            mime_type: mime_type.to_string(),
            file_name: file_name.to_string(),
            file_extension: file_extension(file_name, mime_type),
            file_size: bytes.len(),
        })
    }
}

fn file_extension(file_name: &str, mime_type: &str) -> Option<String> {
    if let Some((stem, ext)) = file_name.rsplit_once('.') {
        if !stem.is_empty() && !ext.is_empty() {
            return Some(ext.to_ascii_lowercase());
        }
    }
    let ext = match mime_type.to_ascii_lowercase().as_str() {
        "message/rfc822" => "eml",
        "application/pdf" => "pdf",
        "text/plain" => "txt",
        "text/html" => "html",
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/gif" => "gif",
        _ => return None,
    };
    Some(ext.to_string())
}
