//! Validation and coercion of extracted fields into a [`TransactionRecord`].

use chrono::{DateTime, FixedOffset, NaiveDateTime, TimeZone};
use tracing::debug;

use crate::error::{CheckerError, Result};
use crate::model::transaction::{Field, RawFields, TransactionRecord};

use super::normalize::NormalizedContent;

/// Fields without which a notification is not a transaction.
pub const REQUIRED_FIELDS: [Field; 4] = [Field::Amount, Field::Id, Field::Date, Field::PhoneNumber];

/// Format of the transaction time after extraction cleanup.
pub const DATE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Offset of the provider's civil time zone (Asia/Ho_Chi_Minh, no DST).
const PROVIDER_OFFSET_SECS: i32 = 7 * 3600;

/// The fixed UTC+7 zone transaction times are expressed in.
///
/// `None` only if the offset constant leaves chrono's ±24h range.
pub fn provider_zone() -> Option<FixedOffset> {
    FixedOffset::east_opt(PROVIDER_OFFSET_SECS)
}

/// Turn extracted fields into a record.
///
/// Returns `Ok(None)` when a required field is missing or blank. A date or
/// amount that is present but malformed is an error: the upstream format
/// changed and silently skipping would hide it.
pub fn validate(fields: &RawFields, content: &NormalizedContent) -> Result<Option<TransactionRecord>> {
    if let Some(missing) = REQUIRED_FIELDS
        .iter()
        .find(|&&field| fields.get(field).is_none_or(|v| v.trim().is_empty()))
    {
        debug!(field = missing.key(), "Required field missing, no transaction");
        return Ok(None);
    }

    // Presence checked above.
    let required = |field: Field| fields.get(field).unwrap_or_default().trim().to_string();
    let optional = |field: Field| {
        fields
            .get(field)
            .map(str::trim)
            .filter(|v| !v.is_empty())
            .map(String::from)
    };

    Ok(Some(TransactionRecord {
        amount: parse_amount(&required(Field::Amount))?,
        id: required(Field::Id),
        date: parse_date(&required(Field::Date))?,
        phone_number: required(Field::PhoneNumber),
        name: optional(Field::Name),
        content: optional(Field::Content),
        raw_text: content.raw_text(),
        message_body: content.html.clone(),
    }))
}

/// Parse an amount whose thousands separators are already stripped, such as
/// `1000000`, `20000đ` or `1000,00`.
///
/// A trailing currency marker is ignored. A comma is the Vietnamese decimal
/// mark: its fraction must be all zeros, since đồng has no minor unit. Any
/// other non-digit is an error.
pub fn parse_amount(value: &str) -> Result<i64> {
    let invalid = || CheckerError::InvalidAmount(value.to_string());
    let number = value
        .trim()
        .trim_end_matches(|c: char| c.is_alphabetic() || c.is_whitespace());

    let (digits, fraction) = number.split_once(',').unwrap_or((number, ""));
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    if digits.is_empty() || !all_digits(digits) || !all_digits(fraction) {
        return Err(invalid());
    }
    if fraction.chars().any(|c| c != '0') {
        return Err(invalid());
    }
    digits.parse().map_err(|_| invalid())
}

/// Strictly parse `dd/mm/YYYY HH:MM` in the provider zone.
pub fn parse_date(value: &str) -> Result<DateTime<FixedOffset>> {
    let invalid = |reason: String| CheckerError::InvalidDate {
        value: value.to_string(),
        reason,
    };

    let naive =
        NaiveDateTime::parse_from_str(value, DATE_FORMAT).map_err(|e| invalid(e.to_string()))?;
    let zone = provider_zone().ok_or_else(|| invalid("provider offset out of range".to_string()))?;
    zone.from_local_datetime(&naive)
        .single()
        .ok_or_else(|| invalid("ambiguous local time".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};

    fn content() -> NormalizedContent {
        NormalizedContent {
            html: "<!DOCTYPE html><p>x</p>".to_string(),
            lines: vec!["line one".to_string(), "line two".to_string()],
        }
    }

    fn complete_fields() -> RawFields {
        RawFields {
            amount: Some("1000000".into()),
            id: Some("TX123".into()),
            date: Some("01/02/2023 10:30".into()),
            name: None,
            phone_number: Some("0912345678".into()),
            content: None,
        }
    }

    #[test]
    fn test_validate_reference_record() {
        let record = validate(&complete_fields(), &content()).unwrap().unwrap();
        assert_eq!(record.amount, 1_000_000);
        assert_eq!(record.id, "TX123");
        assert_eq!(record.phone_number, "0912345678");
        assert_eq!(record.date.year(), 2023);
        assert_eq!(record.date.month(), 2);
        assert_eq!(record.date.day(), 1);
        assert_eq!(record.date.hour(), 10);
        assert_eq!(record.date.minute(), 30);
        assert_eq!(record.date.offset().local_minus_utc(), 7 * 3600);
        assert_eq!(record.date.to_rfc3339(), "2023-02-01T10:30:00+07:00");
        assert_eq!(record.name, None);
        assert_eq!(record.raw_text, "line one\nline two");
        assert_eq!(record.message_body, "<!DOCTYPE html><p>x</p>");
    }

    #[test]
    fn test_missing_id_rejected() {
        let mut fields = complete_fields();
        fields.id = None;
        assert_eq!(validate(&fields, &content()).unwrap(), None);
    }

    #[test]
    fn test_blank_required_field_rejected() {
        let mut fields = complete_fields();
        fields.phone_number = Some("   ".into());
        assert_eq!(validate(&fields, &content()).unwrap(), None);
    }

    #[test]
    fn test_empty_fields_rejected() {
        assert_eq!(validate(&RawFields::default(), &content()).unwrap(), None);
    }

    #[test]
    fn test_optional_fields_kept() {
        let mut fields = complete_fields();
        fields.name = Some("NGUYEN VAN A".into());
        fields.content = Some(" ".into());
        let record = validate(&fields, &content()).unwrap().unwrap();
        assert_eq!(record.name.as_deref(), Some("NGUYEN VAN A"));
        assert_eq!(record.content, None);
    }

    #[test]
    fn test_malformed_date_is_an_error() {
        let mut fields = complete_fields();
        fields.date = Some("2023-02-01 10:30".into());
        let err = validate(&fields, &content()).unwrap_err();
        assert!(matches!(err, CheckerError::InvalidDate { .. }));
    }

    #[test]
    fn test_impossible_date_is_an_error() {
        assert!(parse_date("31/02/2023 10:30").is_err());
        assert!(parse_date("01/02/2023 25:00").is_err());
    }

    #[test]
    fn test_single_digit_day_and_month() {
        let date = parse_date("5/3/2024 08:05").unwrap();
        assert_eq!(date.to_rfc3339(), "2024-03-05T08:05:00+07:00");
    }

    #[test]
    fn test_provider_zone_is_utc_plus_seven() {
        let zone = provider_zone().unwrap();
        assert_eq!(zone.local_minus_utc(), 7 * 3600);
    }

    #[test]
    fn test_comma_is_a_decimal_mark() {
        // "1.000,00" after thousands separators are stripped
        assert_eq!(parse_amount("1000,00").unwrap(), 1_000);
        assert_eq!(parse_amount("1,000").unwrap(), 1);
        assert_eq!(parse_amount("50000,đ").unwrap(), 50_000);
        assert!(matches!(
            parse_amount("1000,50"),
            Err(CheckerError::InvalidAmount(_))
        ));
        assert!(parse_amount("1,0,0").is_err());
        assert!(parse_amount(",00").is_err());
    }

    #[test]
    fn test_parse_amount() {
        assert_eq!(parse_amount("1000000").unwrap(), 1_000_000);
        assert_eq!(parse_amount("20000đ").unwrap(), 20_000);
        assert_eq!(parse_amount("20000 VND").unwrap(), 20_000);
        assert!(matches!(
            parse_amount("12a34"),
            Err(CheckerError::InvalidAmount(_))
        ));
        assert!(parse_amount("VND").is_err());
        assert!(parse_amount("").is_err());
    }
}
