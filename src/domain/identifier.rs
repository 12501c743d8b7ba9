//! Validated page identifiers.
//!
//! A [`PageId`] names both a file inside the content directory and a row in
//! the `pages` table, so it is restricted to a conservative file-name alphabet:
//! ASCII alphanumerics, `-`, `_` and `.`, never starting with `.`. Anything
//! that could address a different directory (`/`, `\`, `..`) is rejected before
//! a store is touched.

use std::fmt;

use thiserror::Error;

const MAX_ID_BYTES: usize = 255;

/// Reasons an identifier is rejected.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum IdentifierError {
    #[error("page identifier is empty")]
    Empty,
    #[error("page identifier exceeds {MAX_ID_BYTES} bytes")]
    TooLong,
    #[error("page identifier must not start with `.`")]
    LeadingDot,
    #[error("page identifier contains disallowed character {0:?}")]
    DisallowedChar(char),
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageId(String);

impl PageId {
    pub fn parse(raw: &str) -> Result<Self, IdentifierError> {
        if raw.is_empty() {
            return Err(IdentifierError::Empty);
        }
        if raw.len() > MAX_ID_BYTES {
            return Err(IdentifierError::TooLong);
        }
        if raw.starts_with('.') {
            return Err(IdentifierError::LeadingDot);
        }
        if let Some(ch) = raw.chars().find(|ch| !is_allowed(*ch)) {
            return Err(IdentifierError::DisallowedChar(ch));
        }

        Ok(Self(raw.to_owned()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

fn is_allowed(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || matches!(ch, '-' | '_' | '.')
}

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
