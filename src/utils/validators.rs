use std::borrow::Cow;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use validator::ValidationError;

use crate::models::rental::parse_date;

static PHONE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9]{10,15}$").expect("phone pattern compiles"));

pub fn validate_phone(phone: &str) -> bool {
    let compact: String = phone.chars().filter(|c| !matches!(c, ' ' | '-')).collect();
    PHONE_REGEX.is_match(&compact)
}

pub fn sanitize_string(input: &str) -> String {
    input.trim().to_string()
}

/// Escapes `%`, `_` and `\` so user input is matched literally by `ILIKE`.
pub fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// `%term%` pattern for a case-insensitive substring search, or `None` when
/// the term is blank.
pub fn search_pattern(term: Option<&str>) -> Option<String> {
    term.map(str::trim)
        .filter(|t| !t.is_empty())
        .map(|t| format!("%{}%", escape_like(t)))
}

fn error(code: &'static str, message: &'static str) -> ValidationError {
    let mut err = ValidationError::new(code);
    err.message = Some(Cow::Borrowed(message));
    err
}

pub fn phone_number(value: &str) -> Result<(), ValidationError> {
    if validate_phone(value) {
        Ok(())
    } else {
        Err(error("phone", "must be a phone number with at least 10 digits"))
    }
}

pub fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        Err(error("range", "must be greater than or equal to 0"))
    } else {
        Ok(())
    }
}

pub fn positive_amount(value: &Decimal) -> Result<(), ValidationError> {
    if *value > Decimal::ZERO {
        Ok(())
    } else {
        Err(error("range", "must be greater than 0"))
    }
}

pub fn latitude(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::from(-90) && *value <= Decimal::from(90) {
        Ok(())
    } else {
        Err(error("range", "must be between -90 and 90"))
    }
}

pub fn longitude(value: &Decimal) -> Result<(), ValidationError> {
    if *value >= Decimal::from(-180) && *value <= Decimal::from(180) {
        Ok(())
    } else {
        Err(error("range", "must be between -180 and 180"))
    }
}

pub fn date_string(value: &str) -> Result<(), ValidationError> {
    match parse_date(value) {
        Some(_) => Ok(()),
        None => Err(error("date", "must be a date in YYYY-MM-DD format")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_phone() {
        assert!(validate_phone("+260700000000"));
        assert!(validate_phone("0977123456"));
        assert!(validate_phone("+260 97 712-3456"));
        assert!(!validate_phone("12345"));
        assert!(!validate_phone("+26070000000a"));
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like(r"a\b"), r"a\\b");
        assert_eq!(escape_like("plain"), "plain");
    }

    #[test]
    fn test_search_pattern() {
        assert_eq!(search_pattern(Some("  villa ")), Some("%villa%".to_string()));
        assert_eq!(search_pattern(Some("   ")), None);
        assert_eq!(search_pattern(None), None);
    }

    #[test]
    fn test_coordinate_bounds() {
        assert!(latitude(&Decimal::from(90)).is_ok());
        assert!(latitude(&Decimal::from(-91)).is_err());
        assert!(longitude(&Decimal::from(-180)).is_ok());
        assert!(longitude(&Decimal::from(181)).is_err());
    }

    #[test]
    fn test_amount_bounds() {
        assert!(non_negative(&Decimal::ZERO).is_ok());
        assert!(non_negative(&Decimal::new(-1, 2)).is_err());
        assert!(positive_amount(&Decimal::ZERO).is_err());
        assert!(positive_amount(&Decimal::new(1, 2)).is_ok());
    }

    #[test]
    fn test_date_string() {
        assert!(date_string("2025-01-31").is_ok());
        assert!(date_string("2025-02-30").is_err());
        assert!(date_string("31-01-2025").is_err());
    }
}
