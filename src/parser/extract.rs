//! Label-driven field extraction.
//!
//! Notifications render as a sequence of label lines, each followed by the
//! line holding its value:
//!
//! ```text
//! Received amount        <- label
//! 1.000.000              <- value of `amount`
//! Transaction id
//! TX123
//! Time
//! 01/02/2023 - 10:30
//! ```
//!
//! The scanner is greedy: a line matching a label consumes the next line as
//! its value, whatever that line contains. Unmatched lines are skipped.

use crate::model::transaction::{Field, RawFields};

/// English labels.
const ENGLISH_LABELS: &[(&str, Field)] = &[
    ("received amount", Field::Amount),
    ("transaction id", Field::Id),
    ("time", Field::Date),
    ("sender name", Field::Name),
    ("sender phone number", Field::PhoneNumber),
    ("note", Field::Content),
];

/// Labels of the Vietnamese notification template.
const VIETNAMESE_LABELS: &[(&str, Field)] = &[
    ("số tiền nhận được", Field::Amount),
    ("số tiền", Field::Amount),
    ("mã giao dịch", Field::Id),
    ("thời gian", Field::Date),
    ("người gửi", Field::Name),
    ("số điện thoại người gửi", Field::PhoneNumber),
    ("lời chúc", Field::Content),
];

/// Label → field table, matched case-insensitively against whole lines.
#[derive(Debug, Clone)]
pub struct Grammar {
    labels: Vec<(String, Field)>,
}

impl Grammar {
    /// Build a grammar from `(label, field)` pairs.
    pub fn new<'a>(labels: impl IntoIterator<Item = (&'a str, Field)>) -> Self {
        Self {
            labels: labels
                .into_iter()
                .map(|(label, field)| (label.trim().to_lowercase(), field))
                .collect(),
        }
    }

    /// Grammar of MoMo notifications, in both English and Vietnamese.
    pub fn momo() -> Self {
        Self::new(
            ENGLISH_LABELS
                .iter()
                .chain(VIETNAMESE_LABELS)
                .map(|&(label, field)| (label, field)),
        )
    }

    /// The field introduced by `line`, if it is a label.
    ///
    /// A trailing colon is tolerated (`"Time:"`).
    pub fn label(&self, line: &str) -> Option<Field> {
        let normalized = line.trim().trim_end_matches(':').trim_end().to_lowercase();
        self.labels
            .iter()
            .find(|(label, _)| *label == normalized)
            .map(|&(_, field)| field)
    }
}

impl Default for Grammar {
    fn default() -> Self {
        Self::momo()
    }
}

/// Scan `lines` for `(label, value)` pairs.
///
/// A label on the last line has no value and is dropped. An empty result
/// means the document holds no transaction.
pub fn extract(lines: &[String], grammar: &Grammar) -> RawFields {
    let mut fields = RawFields::default();
    let mut cursor = 0;

    while cursor < lines.len() {
        match (grammar.label(&lines[cursor]), lines.get(cursor + 1)) {
            (Some(field), Some(value)) => {
                fields.set(field, clean_value(field, value));
                cursor += 2;
            }
            _ => cursor += 1,
        }
    }

    fields
}

/// Field-specific cleanup applied at capture time.
fn clean_value(field: Field, value: &str) -> String {
    match field {
        // "1.000.000" → "1000000"
        Field::Amount => value.replace('.', ""),
        // "01/02/2023 - 10:30" → "01/02/2023 10:30"
        Field::Date => value
            .replace('-', "")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" "),
        _ => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_extract_reference_notification() {
        let input = lines(&[
            "Received amount",
            "1.000.000",
            "Transaction id",
            "TX123",
            "Time",
            "01/02/2023 - 10:30",
            "Sender phone number",
            "0912345678",
        ]);
        let fields = extract(&input, &Grammar::default());
        assert_eq!(fields.amount.as_deref(), Some("1000000"));
        assert_eq!(fields.id.as_deref(), Some("TX123"));
        assert_eq!(fields.date.as_deref(), Some("01/02/2023 10:30"));
        assert_eq!(fields.phone_number.as_deref(), Some("0912345678"));
        assert_eq!(fields.name, None);
        assert_eq!(fields.content, None);
    }

    #[test]
    fn test_extract_all_six_labels() {
        let input = lines(&[
            "RECEIVED AMOUNT",
            "50.000",
            "transaction ID",
            "987654",
            "Time",
            "5/3/2024  -  08:05",
            "Sender name",
            "NGUYEN VAN A",
            "Sender phone number",
            "0987000111",
            "Note",
            "order 42",
        ]);
        let fields = extract(&input, &Grammar::default());
        assert_eq!(
            fields,
            RawFields {
                amount: Some("50000".into()),
                id: Some("987654".into()),
                date: Some("5/3/2024 08:05".into()),
                name: Some("NGUYEN VAN A".into()),
                phone_number: Some("0987000111".into()),
                content: Some("order 42".into()),
            }
        );
    }

    #[test]
    fn test_unmatched_lines_are_skipped() {
        let input = lines(&["Hello", "Transaction id", "TX1", "Thanks for using MoMo"]);
        let fields = extract(&input, &Grammar::default());
        assert_eq!(fields.id.as_deref(), Some("TX1"));
        assert_eq!(fields.amount, None);
    }

    #[test]
    fn test_trailing_label_without_value_dropped() {
        let input = lines(&["Transaction id", "TX1", "Note"]);
        let fields = extract(&input, &Grammar::default());
        assert_eq!(fields.id.as_deref(), Some("TX1"));
        assert_eq!(fields.content, None);
    }

    #[test]
    fn test_label_consumes_next_line_greedily() {
        // "Note" is immediately followed by another label: it becomes the value.
        let input = lines(&["Note", "Time", "01/02/2023 - 10:30"]);
        let fields = extract(&input, &Grammar::default());
        assert_eq!(fields.content.as_deref(), Some("Time"));
        assert_eq!(fields.date, None);
    }

    #[test]
    fn test_vietnamese_labels() {
        let input = lines(&[
            "Số tiền nhận được",
            "20.000đ",
            "Mã giao dịch",
            "3345678901",
            "Thời gian:",
            "17/10/2026 - 21:04",
            "Số điện thoại người gửi",
            "0909123456",
            "Lời chúc",
            "Tra tien com",
        ]);
        let fields = extract(&input, &Grammar::default());
        assert_eq!(fields.amount.as_deref(), Some("20000đ"));
        assert_eq!(fields.id.as_deref(), Some("3345678901"));
        assert_eq!(fields.date.as_deref(), Some("17/10/2026 21:04"));
        assert_eq!(fields.phone_number.as_deref(), Some("0909123456"));
        assert_eq!(fields.content.as_deref(), Some("Tra tien com"));
    }

    #[test]
    fn test_no_labels_gives_empty_fields() {
        let input = lines(&["Welcome", "to", "MoMo"]);
        assert!(extract(&input, &Grammar::default()).is_empty());
        assert!(extract(&[], &Grammar::default()).is_empty());
    }

    #[test]
    fn test_custom_grammar() {
        let grammar = Grammar::new([("Ref", Field::Id)]);
        let input = lines(&["ref", "ABC", "Transaction id", "ignored"]);
        let fields = extract(&input, &grammar);
        assert_eq!(fields.id.as_deref(), Some("ABC"));
    }
}
