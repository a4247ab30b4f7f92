// SPDX-FileCopyrightText: 2026 Bruno Meilick
// SPDX-License-Identifier: LicenseRef-Tessera-FreeUse-NoCopy-NoDerivatives
//
// All rights reserved.
//
// This file is part of Tessera and is proprietary software.
// Unauthorized copying, modification, or distribution is prohibited.

use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum MermaidIdentError {
    #[error("must not be empty")]
    Empty,
    #[error("must not contain whitespace")]
    ContainsWhitespace,
    #[error("must not contain '/'")]
    ContainsSlash,
    #[error("contains invalid character: '{ch}'")]
    InvalidChar { ch: char },
}

pub(crate) fn is_ident_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

pub(crate) fn validate_mermaid_ident(ident: &str) -> Result<(), MermaidIdentError> {
    if ident.is_empty() {
        return Err(MermaidIdentError::Empty);
    }
    if ident.chars().any(|c| c.is_whitespace()) {
        return Err(MermaidIdentError::ContainsWhitespace);
    }
    if ident.contains('/') {
        return Err(MermaidIdentError::ContainsSlash);
    }
    if let Some(ch) = ident.chars().find(|c| !is_ident_char(*c)) {
        return Err(MermaidIdentError::InvalidChar { ch });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{validate_mermaid_ident, MermaidIdentError};

    #[test]
    fn accepts_word_characters_only() {
        assert_eq!(validate_mermaid_ident("Auth_2"), Ok(()));
        assert_eq!(validate_mermaid_ident(""), Err(MermaidIdentError::Empty));
        assert_eq!(validate_mermaid_ident("a b"), Err(MermaidIdentError::ContainsWhitespace));
        assert_eq!(
            validate_mermaid_ident("a-b"),
            Err(MermaidIdentError::InvalidChar { ch: '-' })
        );
    }
}
