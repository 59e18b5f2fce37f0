// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Response body decoding
//!
//! Servers routinely send GBK or Shift_JIS pages with no charset in the
//! `Content-Type` header, or with the HTTP default ISO-8859-1, and declare
//! the real encoding only in a `<meta>` tag. Order of precedence:
//! byte-order mark, explicit non-Latin-1 header charset, `<meta>` charset,
//! UTF-8 if the bytes are valid UTF-8, then the header charset or
//! windows-1252.

use encoding_rs::{Encoding, UTF_8, WINDOWS_1252};
use regex::bytes::Regex;
use std::sync::OnceLock;

/// How far into the document to look for a `<meta>` charset
const META_SCAN_BYTES: usize = 4096;

fn meta_charset_pattern() -> Option<&'static Regex> {
    static META: OnceLock<Option<Regex>> = OnceLock::new();
    META.get_or_init(|| {
        Regex::new(r#"(?i)<meta[^>]*?charset\s*=\s*["']?\s*([a-z0-9_:.\-]+)"#).ok()
    })
    .as_ref()
}

/// Charset parameter of a `Content-Type` header value
pub fn charset_from_content_type(content_type: &str) -> Option<&str> {
    content_type.split(';').skip(1).find_map(|param| {
        let (name, value) = param.split_once('=')?;
        name.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches(|c| c == '"' || c == '\''))
            .filter(|v| !v.is_empty())
    })
}

/// Encoding declared by a `<meta charset>` or `http-equiv` tag near the top
pub fn meta_charset(body: &[u8]) -> Option<&'static Encoding> {
    let head = &body[..body.len().min(META_SCAN_BYTES)];
    let captures = meta_charset_pattern()?.captures(head)?;
    Encoding::for_label(captures.get(1)?.as_bytes())
}

/// Pick the encoding for a response body
pub fn detect_encoding(body: &[u8], header_charset: Option<&str>) -> &'static Encoding {
    if let Some((bom, _)) = Encoding::for_bom(body) {
        return bom;
    }

    let declared = header_charset.and_then(|label| Encoding::for_label(label.as_bytes()));
    // ISO-8859-1 is the HTTP default and usually means "not declared".
    if let Some(encoding) = declared.filter(|e| *e != WINDOWS_1252) {
        return encoding;
    }

    if let Some(encoding) = meta_charset(body) {
        return encoding;
    }

    if std::str::from_utf8(body).is_ok() {
        return UTF_8;
    }

    declared.unwrap_or(WINDOWS_1252)
}

/// Decode a response body to text, replacing malformed sequences
pub fn decode_body(body: &[u8], header_charset: Option<&str>) -> String {
    let encoding = detect_encoding(body, header_charset);
    let (text, _, _) = encoding.decode(body);
    text.into_owned()
}
