// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use serde::Serialize;

use super::BodyPart;

/// Section id used for a node the server did not number: the body of a
/// single-part message, fetched as `BODY[TEXT]`.
pub const SINGLE_PART_ID: &str = "TEXT";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WalkOptions {
    /// Treat `Content-Disposition: inline` parts as attachments.
    pub include_inline: bool,
}

/// Flattened view of one node.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PartDescriptor {
    pub part_id: String,
    pub mime_type: String,
    pub encoding: Option<String>,
    pub charset: Option<String>,
    pub size: Option<u32>,
    pub disposition: Option<String>,
    pub filename: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentInfo {
    pub part_id: String,
    pub filename: String,
    pub mime_type: String,
    pub encoding: Option<String>,
    pub size: Option<u32>,
    pub disposition: String,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStructure {
    /// Every node, parent before children.
    pub parts: Vec<PartDescriptor>,
    pub text_part: Option<PartDescriptor>,
    pub html_part: Option<PartDescriptor>,
    pub attachments: Vec<AttachmentInfo>,
}

impl MessageStructure {
    pub fn attachment(&self, part_id: &str) -> Option<&AttachmentInfo> {
        self.attachments.iter().find(|a| a.part_id == part_id)
    }
}

/// Walks `root` in preorder, classifying every node in a single pass.
///
/// Only identifies parts; content is fetched separately by part id.
pub fn walk(root: &BodyPart, options: WalkOptions) -> MessageStructure {
    let mut structure = MessageStructure::default();
    visit(root, options, &mut structure);
    structure
}

fn visit(node: &BodyPart, options: WalkOptions, out: &mut MessageStructure) {
    let descriptor = describe(node);
    let disposition = node.disposition.as_deref().map(str::to_ascii_lowercase);

    match disposition.as_deref() {
        Some("attachment") => out.attachments.push(attachment_info(&descriptor, node, "attachment")),
        Some("inline") if options.include_inline => {
            out.attachments.push(attachment_info(&descriptor, node, "inline"))
        }
        _ => {
            if node.mime_type == "text/plain" && out.text_part.is_none() {
                out.text_part = Some(descriptor.clone());
            } else if node.mime_type == "text/html" && out.html_part.is_none() {
                out.html_part = Some(descriptor.clone());
            }
        }
    }

    out.parts.push(descriptor);
    for child in &node.child_nodes {
        visit(child, options, out);
    }
}

fn describe(node: &BodyPart) -> PartDescriptor {
    PartDescriptor {
        part_id: node.part.clone().unwrap_or_else(|| SINGLE_PART_ID.to_string()),
        mime_type: node.mime_type.clone(),
        encoding: node.encoding.clone(),
        charset: node.parameters.get("charset").cloned(),
        size: node.size,
        disposition: node.disposition.clone(),
        filename: declared_filename(node),
    }
}

fn declared_filename(node: &BodyPart) -> Option<String> {
    node.disposition_parameters
        .get("filename")
        .or_else(|| node.parameters.get("name"))
        .cloned()
}

fn attachment_info(descriptor: &PartDescriptor, node: &BodyPart, disposition: &str) -> AttachmentInfo {
    AttachmentInfo {
        part_id: descriptor.part_id.clone(),
        filename: descriptor
            .filename
            .clone()
            .unwrap_or_else(|| derived_filename(&descriptor.part_id, &node.mime_type)),
        mime_type: node.mime_type.clone(),
        encoding: node.encoding.clone(),
        size: node.size,
        disposition: disposition.to_string(),
    }
}

fn derived_filename(part_id: &str, mime_type: &str) -> String {
    let sub_type = mime_type.split('/').nth(1).unwrap_or("");
    let ext = match sub_type {
        "pdf" => "pdf",
        "jpeg" | "jpg" => "jpg",
        "png" => "png",
        "gif" => "gif",
        "plain" => "txt",
        "html" => "html",
        "rfc822" => "eml",
        "calendar" => "ics",
        _ => "bin",
    };
    format!("part_{}.{}", part_id.replace('.', "_"), ext)
}
