//! Messages as handed over by a [`MessageService`](crate::source::MessageService).
//!
//! Whatever shape the source produces (API JSON, RFC 5322 files, ...), it is
//! normalized into a single [`RawMessage`] before the parser sees it.

use super::address::EmailAddress;

/// One message fetched from the source. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Opaque, source-assigned identifier.
    pub id: String,
    /// Raw value of the sender header.
    pub sender: String,
    /// First MIME body part.
    pub body: BodyPart,
}

/// A MIME body part whose payload is base64url text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyPart {
    pub data: String,
}

impl RawMessage {
    /// Parsed sender header.
    pub fn sender_address(&self) -> EmailAddress {
        EmailAddress::parse(&self.sender)
    }

    /// Whether the sender header names `expected` (case-insensitive).
    pub fn is_from(&self, expected: &str) -> bool {
        self.sender_address().is(expected)
    }
}

/// Listing request for one page of message ids.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ListCriteria {
    /// Source-side sender filter.
    pub sender: Option<String>,
    /// Maximum number of ids per page.
    pub max_results: u32,
    /// Continuation token from the previous page.
    pub page_token: Option<String>,
}

/// One page of a listing, in the source's order (most recent first).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagePage {
    pub ids: Vec<String>,
    pub next_page_token: Option<String>,
}
