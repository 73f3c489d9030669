//! Extracted fields and validated transaction records.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// A field the notification grammar knows how to capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Amount,
    Id,
    Date,
    Name,
    PhoneNumber,
    Content,
}

impl Field {
    /// Canonical field name.
    pub fn key(self) -> &'static str {
        match self {
            Field::Amount => "amount",
            Field::Id => "id",
            Field::Date => "date",
            Field::Name => "name",
            Field::PhoneNumber => "phoneNumber",
            Field::Content => "content",
        }
    }
}

/// Untyped field values captured by the extractor, not yet validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawFields {
    pub amount: Option<String>,
    pub id: Option<String>,
    pub date: Option<String>,
    pub name: Option<String>,
    pub phone_number: Option<String>,
    pub content: Option<String>,
}

impl RawFields {
    /// Store `value` under `field`, replacing any earlier capture.
    pub fn set(&mut self, field: Field, value: String) {
        let slot = match field {
            Field::Amount => &mut self.amount,
            Field::Id => &mut self.id,
            Field::Date => &mut self.date,
            Field::Name => &mut self.name,
            Field::PhoneNumber => &mut self.phone_number,
            Field::Content => &mut self.content,
        };
        *slot = Some(value);
    }

    pub fn get(&self, field: Field) -> Option<&str> {
        match field {
            Field::Amount => self.amount.as_deref(),
            Field::Id => self.id.as_deref(),
            Field::Date => self.date.as_deref(),
            Field::Name => self.name.as_deref(),
            Field::PhoneNumber => self.phone_number.as_deref(),
            Field::Content => self.content.as_deref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A validated payment notification.
///
/// Records are created once per message id and never mutated. A message that
/// yields no transaction is represented by `None` wherever an outcome is
/// stored or returned, never by a partially filled record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Received amount in VND.
    pub amount: i64,
    /// Transaction id assigned by the payment provider.
    pub id: String,
    /// Transaction time in the provider's civil time zone (UTC+7).
    pub date: DateTime<FixedOffset>,
    pub phone_number: String,
    /// Sender display name.
    pub name: Option<String>,
    /// Free-text note attached by the sender.
    pub content: Option<String>,
    /// Normalized lines joined with `\n`.
    pub raw_text: String,
    /// The decoded HTML document, kept for auditing.
    pub message_body: String,
}
