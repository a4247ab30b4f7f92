// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

//! Label escaping for Mermaid node declarations.
//!
//! User text ends up between a pair of shape delimiters (`A["..."]`). Anything that could close
//! the label early, open a new statement, or confuse the Mermaid lexer is rewritten to a Mermaid
//! entity code (`#quot;`, `#91;`, ...), which Mermaid decodes again when it renders the label.

use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

fn escape_for(ch: char) -> Option<&'static str> {
    Some(match ch {
        '"' => "#quot;",
        '[' => "#91;",
        ']' => "#93;",
        '(' => "#40;",
        ')' => "#41;",
        '{' => "#123;",
        '}' => "#125;",
        '|' => "#124;",
        '<' => "#lt;",
        '>' => "#gt;",
        ';' => "#59;",
        '#' => "#35;",
        '`' => "#96;",
        _ => return None,
    })
}

/// Byte length of the well-formed entity at the start of `text`, if there is one.
///
/// Accepts Mermaid codes (`#91;`, `#quot;`) and HTML entities (`&#91;`, `&#x5B;`, `&amp;`).
/// Named codes only count when they name a real HTML entity.
fn entity_len(text: &str) -> Option<usize> {
    let (prefix_len, body) = if let Some(rest) = text.strip_prefix("&#") {
        (2, rest)
    } else if let Some(rest) = text.strip_prefix('#').or_else(|| text.strip_prefix('&')) {
        (1, rest)
    } else {
        return None;
    };

    let end = body.find(';')?;
    let name = &body[..end];
    let numeric_html = prefix_len == 2;

    let well_formed = if let Some(hex) = name.strip_prefix(['x', 'X']).filter(|_| numeric_html) {
        (1..=6).contains(&hex.len()) && hex.chars().all(|ch| ch.is_ascii_hexdigit())
    } else if (1..=7).contains(&name.len()) && name.chars().all(|ch| ch.is_ascii_digit()) {
        true
    } else if numeric_html {
        false
    } else {
        is_named_entity(name)
    };

    well_formed.then_some(prefix_len + end + 1)
}

fn is_named_entity(name: &str) -> bool {
    if !(2..=32).contains(&name.len())
        || !name.starts_with(|ch: char| ch.is_ascii_alphabetic())
        || !name.chars().all(|ch| ch.is_ascii_alphanumeric())
    {
        return false;
    }
    let candidate = format!("&{name};");
    htmlize::unescape(candidate.as_str()) != candidate.as_str()
}

/// Make arbitrary user text safe to embed as a quoted Mermaid node label.
///
/// Line breaks, tabs and whitespace runs collapse to one space and the result is trimmed.
/// Already-escaped entities are kept, so `sanitize_label(&sanitize_label(x)) == sanitize_label(x)`.
pub fn sanitize_label(raw: &str) -> String {
    let mut collapsed = String::with_capacity(raw.len());
    for word in raw.split_whitespace() {
        if !collapsed.is_empty() {
            collapsed.push(' ');
        }
        collapsed.push_str(word);
    }

    let mut pieces = Vec::with_capacity(collapsed.len());
    let mut rest = collapsed.as_str();
    while let Some(ch) = rest.chars().next() {
        if matches!(ch, '#' | '&') {
            if let Some(len) = entity_len(rest) {
                pieces.push(Piece::Text(&rest[..len]));
                rest = &rest[len..];
                continue;
            }
        }
        pieces.push(match (ch, escape_for(ch)) {
            ('&', _) => Piece::Ampersand,
            (_, Some(code)) => Piece::Text(code),
            (_, None) => Piece::Text(&rest[..ch.len_utf8()]),
        });
        rest = &rest[ch.len_utf8()..];
    }

    // A bare `&` directly in front of a `#` code would read back as an HTML entity (`&#quot;`).
    // Resolve back to front, since `#amp;` itself starts with `#`.
    let mut resolved = Vec::with_capacity(pieces.len());
    let mut next_is_code = false;
    for piece in pieces.iter().rev() {
        let text = match piece {
            Piece::Ampersand if next_is_code => "#amp;",
            Piece::Ampersand => "&",
            Piece::Text(text) => *text,
        };
        next_is_code = text.starts_with('#');
        resolved.push(text);
    }
    resolved.iter().rev().copied().collect()
}

enum Piece<'a> {
    Ampersand,
    Text(&'a str),
}

fn mermaid_entity_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(&?)#([A-Za-z][A-Za-z0-9]{1,31}|[0-9]{1,7});")
            .expect("entity pattern must compile")
    })
}

/// Turn Mermaid `#code;` and HTML `&name;` entities back into the characters they stand for.
pub fn decode_entities(text: &str) -> Cow<'_, str> {
    if !text.contains('#') && !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let rewritten = mermaid_entity_re().replace_all(text, |caps: &regex::Captures<'_>| {
        let body = &caps[2];
        if !caps[1].is_empty() {
            return format!("&#{body};");
        }
        if body.starts_with(|ch: char| ch.is_ascii_digit()) {
            format!("&#{body};")
        } else {
            format!("&{body};")
        }
    });

    Cow::Owned(htmlize::unescape(rewritten.as_ref()).into_owned())
}
