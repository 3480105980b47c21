// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

//! Conversion of `imap_proto` fetch data into the crate's own types.

use std::borrow::Cow;
use std::collections::BTreeMap;

use async_imap::imap_proto::types::{
    Address as ProtoAddress, BodyContentCommon, BodyContentSinglePart, BodyStructure,
    ContentEncoding, Envelope as ProtoEnvelope, MessageSection, SectionPath,
};

use crate::imap::error::ImapError;
use crate::imap::types::{Address, Envelope};
use crate::mime::decoder::decode_mime_header;
use crate::mime::{BodyPart, SINGLE_PART_ID};

/// Builds the part tree for a BODYSTRUCTURE response.
///
/// Children of a multipart node are numbered from 1 below their parent's id;
/// the root of a single-part message stays unnumbered. The multipart body of
/// an encapsulated message numbers its children below the message part but is
/// itself addressed as `<id>.TEXT`.
pub fn body_part_from_structure(structure: &BodyStructure<'_>) -> BodyPart {
    convert(structure, None)
}

fn convert(structure: &BodyStructure<'_>, id: Option<String>) -> BodyPart {
    match structure {
        BodyStructure::Basic { common, other, .. } | BodyStructure::Text { common, other, .. } => {
            leaf(common, other, id)
        }
        BodyStructure::Message { common, other, body, .. } => {
            let inner = match body.as_ref() {
                BodyStructure::Multipart { .. } => {
                    let mut inner = convert(body, id.clone());
                    inner.part = Some(match id.as_deref() {
                        Some(id) => format!("{}.{}", id, SINGLE_PART_ID),
                        None => SINGLE_PART_ID.to_string(),
                    });
                    inner
                }
                single => convert(single, Some(child_id(id.as_deref(), 0))),
            };
            let mut node = leaf(common, other, id);
            node.child_nodes = vec![inner];
            node
        }
        BodyStructure::Multipart { common, bodies, .. } => {
            let mut node = BodyPart::new(id.as_deref(), &mime_type(common));
            node.parameters = params_map(&common.ty.params);
            apply_disposition(&mut node, common);
            node.child_nodes = bodies
                .iter()
                .enumerate()
                .map(|(i, child)| convert(child, Some(child_id(id.as_deref(), i))))
                .collect();
            node
        }
    }
}

fn child_id(parent: Option<&str>, index: usize) -> String {
    match parent {
        Some(parent) => format!("{}.{}", parent, index + 1),
        None => (index + 1).to_string(),
    }
}

fn leaf(common: &BodyContentCommon<'_>, other: &BodyContentSinglePart<'_>, id: Option<String>) -> BodyPart {
    let mut node = BodyPart::new(id.as_deref(), &mime_type(common))
        .with_encoding(&encoding_to_string(&other.transfer_encoding))
        .with_size(other.octets);
    node.parameters = params_map(&common.ty.params);
    apply_disposition(&mut node, common);
    node
}

fn mime_type(common: &BodyContentCommon<'_>) -> String {
    format!("{}/{}", common.ty.ty, common.ty.subtype).to_ascii_lowercase()
}

fn apply_disposition(node: &mut BodyPart, common: &BodyContentCommon<'_>) {
    if let Some(disposition) = &common.disposition {
        node.disposition = Some(disposition.ty.to_ascii_lowercase());
        node.disposition_parameters = params_map(&disposition.params);
    }
}

fn params_map(params: &Option<Vec<(Cow<'_, str>, Cow<'_, str>)>>) -> BTreeMap<String, String> {
    params
        .iter()
        .flatten()
        .map(|(key, value)| (key.to_ascii_lowercase(), decode_mime_header(value)))
        .collect()
}

pub fn encoding_to_string(encoding: &ContentEncoding<'_>) -> String {
    match encoding {
        ContentEncoding::SevenBit => "7bit".to_string(),
        ContentEncoding::EightBit => "8bit".to_string(),
        ContentEncoding::Binary => "binary".to_string(),
        ContentEncoding::Base64 => "base64".to_string(),
        ContentEncoding::QuotedPrintable => "quoted-printable".to_string(),
        ContentEncoding::Other(s) => s.to_ascii_lowercase(),
    }
}

/// Maps a part id from the walker onto the section path the fetch response
/// is keyed by.
pub fn section_path(part_id: &str) -> Result<SectionPath, ImapError> {
    if part_id.eq_ignore_ascii_case(SINGLE_PART_ID) {
        return Ok(SectionPath::Full(MessageSection::Text));
    }
    let (numbers, section) = match part_id.rsplit_once('.') {
        Some((prefix, last)) if last.eq_ignore_ascii_case(SINGLE_PART_ID) => (prefix, Some(MessageSection::Text)),
        _ => (part_id, None),
    };
    let numbers = numbers
        .split('.')
        .map(|n| n.parse::<u32>())
        .collect::<Result<Vec<u32>, _>>()
        .map_err(|_| ImapError::Parse(format!("Invalid part id '{}'", part_id)))?;
    Ok(SectionPath::Part(numbers, section))
}

pub fn envelope_from_proto(envelope: &ProtoEnvelope<'_>) -> Envelope {
    Envelope {
        date: envelope.date.as_deref().map(bytes_to_string),
        subject: envelope.subject.as_deref().map(header_text),
        from: addresses(&envelope.from),
        sender: addresses(&envelope.sender),
        reply_to: addresses(&envelope.reply_to),
        to: addresses(&envelope.to),
        cc: addresses(&envelope.cc),
        bcc: addresses(&envelope.bcc),
        in_reply_to: envelope.in_reply_to.as_deref().map(bytes_to_string),
        message_id: envelope.message_id.as_deref().map(bytes_to_string),
    }
}

fn addresses(list: &Option<Vec<ProtoAddress<'_>>>) -> Vec<Address> {
    list.iter()
        .flatten()
        .map(|addr| {
            let address = match (addr.mailbox.as_deref(), addr.host.as_deref()) {
                (Some(mailbox), Some(host)) => {
                    Some(format!("{}@{}", bytes_to_string(mailbox), bytes_to_string(host)))
                }
                (Some(mailbox), None) => Some(bytes_to_string(mailbox)),
                _ => None,
            };
            Address { name: addr.name.as_deref().map(header_text), address }
        })
        .collect()
}

fn bytes_to_string(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).into_owned()
}

fn header_text(bytes: &[u8]) -> String {
    decode_mime_header(&bytes_to_string(bytes))
}
