// Copyright (c) 2025 TexasFortress.AI
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at http://mozilla.org/MPL/2.0/.

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use encoding_rs::{Encoding, UTF_8};
use log::{debug, warn};
use regex::Regex;

/// Decode MIME encoded-word headers (RFC 2047)
/// Supports both Q-encoding and B-encoding
/// Format: =?charset?encoding?encoded-text?=
pub fn decode_mime_header(input: &str) -> String {
    lazy_static::lazy_static! {
        static ref ENCODED_WORD_RE: Regex = Regex::new(
            r"=\?([^?]+)\?([BbQq])\?([^?]*)\?="
        ).expect("encoded-word pattern is valid");
    }

    let mut result = String::new();
    let mut last_end = 0;

    for cap in ENCODED_WORD_RE.captures_iter(input) {
        let (full_match, [charset, encoding, encoded_text]) = cap.extract();
        let Some(whole) = cap.get(0) else { continue };

        // Whitespace between adjacent encoded words is not part of the text
        let between = &input[last_end..whole.start()];
        if last_end == 0 || !between.trim().is_empty() {
            result.push_str(between);
        }

        let bytes = match encoding.to_ascii_uppercase().as_str() {
            "B" => BASE64.decode(encoded_text).ok(),
            "Q" => Some(decode_q_word(encoded_text)),
            _ => None,
        };
        match bytes {
            Some(bytes) => result.push_str(&decode_charset(&bytes, Some(charset))),
            None => result.push_str(full_match),
        }
        last_end = whole.end();
    }

    if last_end == 0 {
        return input.to_string();
    }
    result.push_str(&input[last_end..]);
    result
}

fn decode_q_word(encoded: &str) -> Vec<u8> {
    let bytes = encoded.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'=' if i + 2 < bytes.len() => {
                match hex_pair(bytes[i + 1], bytes[i + 2]) {
                    Some(byte) => {
                        out.push(byte);
                        i += 3;
                    }
                    None => {
                        out.push(b'=');
                        i += 1;
                    }
                }
            }
            // In Q-encoding, underscore represents space
            b'_' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    out
}

fn hex_pair(high: u8, low: u8) -> Option<u8> {
    let high = (high as char).to_digit(16)?;
    let low = (low as char).to_digit(16)?;
    Some((high * 16 + low) as u8)
}

/// Undo a part's Content-Transfer-Encoding.
pub fn decode_transfer_encoding(raw: &[u8], encoding: Option<&str>) -> Vec<u8> {
    match encoding.map(str::to_ascii_lowercase).as_deref() {
        Some("base64") => {
            let cleaned: Vec<u8> = raw.iter().filter(|b| !b.is_ascii_whitespace()).copied().collect();
            match BASE64.decode(&cleaned) {
                Ok(decoded) => decoded,
                Err(e) => {
                    warn!("Invalid base64 part content, returning raw bytes: {}", e);
                    raw.to_vec()
                }
            }
        }
        Some("quoted-printable") => decode_quoted_printable(raw),
        _ => raw.to_vec(),
    }
}

fn decode_quoted_printable(raw: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(raw.len());
    let mut i = 0;
    while i < raw.len() {
        if raw[i] != b'=' {
            out.push(raw[i]);
            i += 1;
            continue;
        }
        // Soft line break
        if raw.get(i + 1) == Some(&b'\r') && raw.get(i + 2) == Some(&b'\n') {
            i += 3;
            continue;
        }
        if raw.get(i + 1) == Some(&b'\n') {
            i += 2;
            continue;
        }
        match (raw.get(i + 1), raw.get(i + 2)) {
            (Some(&h), Some(&l)) => match hex_pair(h, l) {
                Some(byte) => {
                    out.push(byte);
                    i += 3;
                }
                None => {
                    out.push(b'=');
                    i += 1;
                }
            },
            _ => {
                out.push(b'=');
                i += 1;
            }
        }
    }
    out
}

/// Render text bytes as a `String` using the part's declared charset.
///
/// Labels are resolved the way mail clients do (`latin1` and `iso-8859-1`
/// both map to windows-1252). A missing or unknown label falls back to UTF-8.
/// Malformed sequences become U+FFFD.
pub fn decode_charset(bytes: &[u8], charset: Option<&str>) -> String {
    let encoding = match charset.map(str::trim).filter(|label| !label.is_empty()) {
        Some(label) => Encoding::for_label_no_replacement(label.as_bytes()).unwrap_or_else(|| {
            warn!("Unknown charset \"{}\", decoding as UTF-8", label);
            UTF_8
        }),
        None => UTF_8,
    };
    let (text, had_errors) = encoding.decode_with_bom_removal(bytes);
    if had_errors {
        debug!("Malformed {} sequences replaced while decoding text", encoding.name());
    }
    text.into_owned()
}
