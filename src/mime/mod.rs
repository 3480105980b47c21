// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

pub mod decoder;
pub mod walker;

use std::collections::BTreeMap;

use serde::Serialize;

pub use walker::{walk, AttachmentInfo, MessageStructure, PartDescriptor, WalkOptions, SINGLE_PART_ID};

/// One node of a message's BODYSTRUCTURE tree.
///
/// `part` is the dot-delimited section id. The server does not address the
/// root of a single-part message, so that node has no id.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BodyPart {
    pub part: Option<String>,
    /// Lowercased `type/subtype`.
    pub mime_type: String,
    pub parameters: BTreeMap<String, String>,
    pub encoding: Option<String>,
    pub size: Option<u32>,
    pub disposition: Option<String>,
    pub disposition_parameters: BTreeMap<String, String>,
    pub child_nodes: Vec<BodyPart>,
}

impl BodyPart {
    pub fn new(part: Option<&str>, mime_type: &str) -> Self {
        BodyPart {
            part: part.map(str::to_string),
            mime_type: mime_type.to_ascii_lowercase(),
            ..Default::default()
        }
    }

    pub fn with_encoding(mut self, encoding: &str) -> Self {
        self.encoding = Some(encoding.to_ascii_lowercase());
        self
    }

    pub fn with_size(mut self, size: u32) -> Self {
        self.size = Some(size);
        self
    }

    pub fn with_parameter(mut self, key: &str, value: &str) -> Self {
        self.parameters.insert(key.to_ascii_lowercase(), value.to_string());
        self
    }

    pub fn with_disposition(mut self, disposition: &str, filename: Option<&str>) -> Self {
        self.disposition = Some(disposition.to_ascii_lowercase());
        if let Some(name) = filename {
            self.disposition_parameters.insert("filename".to_string(), name.to_string());
        }
        self
    }

    pub fn with_children(mut self, children: Vec<BodyPart>) -> Self {
        self.child_nodes = children;
        self
    }

    pub fn is_multipart(&self) -> bool {
        self.mime_type.starts_with("multipart/")
    }
}
