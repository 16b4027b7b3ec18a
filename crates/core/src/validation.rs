use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::errors::ValidationError;

/// Basic `local-part@domain` shape check. The domain must be dotted and free
/// of whitespace; this is deliberately not a full RFC 5322 parser.
pub fn require_email(field: &'static str, value: &str) -> Result<(), ValidationError> {
    let mut parts = value.splitn(2, '@');
    let local = parts.next().unwrap_or_default();
    let domain = parts.next();

    let shape_ok = match domain {
        Some(domain) => {
            !local.is_empty()
                && !domain.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !value.chars().any(char::is_whitespace)
        }
        None => false,
    };

    if shape_ok {
        Ok(())
    } else {
        Err(ValidationError::new(field, format!("`{value}` is not a valid email address")))
    }
}

pub fn require_positive_price(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value > Decimal::ZERO {
        Ok(())
    } else {
        Err(ValidationError::new(field, "must be greater than zero"))
    }
}

/// Strict ISO-8601 calendar date (`YYYY-MM-DD`). Impossible dates such as
/// `2025-13-45` are rejected.
pub fn parse_closing_date(field: &'static str, value: &str) -> Result<NaiveDate, ValidationError> {
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| {
        ValidationError::new(field, format!("`{value}` is not a valid ISO date (YYYY-MM-DD)"))
    })
}
