//! Notification parsing: body normalization, label-driven extraction, and
//! validation into [`TransactionRecord`]s.

pub mod extract;
pub mod normalize;
pub mod validate;

use tracing::debug;

use crate::error::Result;
use crate::model::message::RawMessage;
use crate::model::transaction::TransactionRecord;

use self::extract::Grammar;

/// Turns one fetched message into a transaction, or `None` if it holds none.
///
/// Injected into the [`Searcher`](crate::search::Searcher) so callers can
/// swap in their own parsing without touching the search loop.
pub trait MessageParser: Send + Sync {
    fn parse(&self, message: &RawMessage) -> Result<Option<TransactionRecord>>;
}

/// The default parser: base64url body → HTML lines → labelled fields → record.
#[derive(Debug, Clone, Default)]
pub struct NotificationParser {
    grammar: Grammar,
}

impl NotificationParser {
    pub fn new(grammar: Grammar) -> Self {
        Self { grammar }
    }

    /// Parse an already transport-decoded document.
    pub fn parse_document(&self, decoded: &str) -> Result<Option<TransactionRecord>> {
        let Some(content) = normalize::normalize(decoded) else {
            debug!("Body is not an HTML document, no transaction");
            return Ok(None);
        };

        let fields = extract::extract(&content.lines, &self.grammar);
        if fields.is_empty() {
            debug!(lines = content.lines.len(), "No labelled fields found");
            return Ok(None);
        }

        validate::validate(&fields, &content)
    }
}

impl MessageParser for NotificationParser {
    fn parse(&self, message: &RawMessage) -> Result<Option<TransactionRecord>> {
        match normalize::decode_transport(&message.body.data) {
            Some(decoded) => self.parse_document(&decoded),
            None => {
                debug!(message_id = %message.id, "Body is not valid base64, no transaction");
                Ok(None)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::message::BodyPart;

    const NOTIFICATION: &str = "<!DOCTYPE html><html><body><table>\
        <tr><td>Received amount</td><td>1.000.000</td></tr>\
        <tr><td>Transaction id</td><td>TX123</td></tr>\
        <tr><td>Time</td><td>01/02/2023 - 10:30</td></tr>\
        <tr><td>Sender phone number</td><td>0912345678</td></tr>\
        </table></body></html>";

    fn message(body: &str) -> RawMessage {
        RawMessage {
            id: "m1".to_string(),
            sender: "no-reply@momo.vn".to_string(),
            body: BodyPart {
                data: normalize::encode_transport(body),
            },
        }
    }

    #[test]
    fn test_parse_notification() {
        let record = NotificationParser::default()
            .parse(&message(NOTIFICATION))
            .unwrap()
            .unwrap();
        assert_eq!(record.amount, 1_000_000);
        assert_eq!(record.id, "TX123");
        assert_eq!(record.date.to_rfc3339(), "2023-02-01T10:30:00+07:00");
        assert_eq!(record.phone_number, "0912345678");
        assert_eq!(record.message_body, NOTIFICATION);
        assert!(record.raw_text.starts_with("Received amount\n1.000.000\n"));
    }

    #[test]
    fn test_non_html_body_is_not_a_transaction() {
        let outcome = NotificationParser::default()
            .parse(&message("Your statement is ready."))
            .unwrap();
        assert_eq!(outcome, None);
    }

    #[test]
    fn test_invalid_base64_is_not_a_transaction() {
        let mut msg = message(NOTIFICATION);
        msg.body.data = "!!not base64!!".to_string();
        assert_eq!(NotificationParser::default().parse(&msg).unwrap(), None);
    }

    #[test]
    fn test_custom_grammar() {
        use crate::model::transaction::Field;

        let grammar = Grammar::new([
            ("Amount", Field::Amount),
            ("Reference", Field::Id),
            ("Paid at", Field::Date),
            ("Payer phone", Field::PhoneNumber),
        ]);
        let body = "<!DOCTYPE html><p>Amount</p><p>20.000</p><p>Reference</p><p>R-7</p>\
                    <p>Paid at</p><p>09/09/2024 - 07:00</p><p>Payer phone</p><p>0900000000</p>";

        let custom = NotificationParser::new(grammar).parse(&message(body)).unwrap().unwrap();
        assert_eq!(custom.id, "R-7");
        assert_eq!(custom.amount, 20_000);

        // The built-in labels do not know this template.
        assert_eq!(NotificationParser::default().parse(&message(body)).unwrap(), None);
    }

    #[test]
    fn test_parsing_is_deterministic() {
        let parser = NotificationParser::default();
        let first = parser.parse(&message(NOTIFICATION)).unwrap();
        let second = parser.parse(&message(NOTIFICATION)).unwrap();
        assert_eq!(first, second);
    }
}
