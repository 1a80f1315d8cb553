use std::fmt;

use chrono::{DateTime, Duration, Utc};
use serde_json::Value;

/// A value type a quantitative scale can use as its domain.
///
/// Every implementation maps onto `f64` so padding, nice rounding and
/// interpolation can run in a single numeric space.
pub trait QuantitativeValue: Copy + PartialEq + PartialOrd + fmt::Debug + 'static {
    /// Numeric representation used by transforms.
    fn to_number(self) -> f64;

    /// Inverse of [`QuantitativeValue::to_number`]; `None` when the number
    /// does not map onto a representable value.
    fn from_number(value: f64) -> Option<Self>;

    /// Domain used when no extent has been registered.
    fn default_domain() -> (Self, Self);

    /// Unit a degenerate `[v, v]` domain is widened by on each side.
    fn single_value_expansion(self) -> (Self, Self);

    /// Reads a datum field.
    fn from_json(value: &Value) -> Option<Self>;

    fn is_valid(self) -> bool {
        self.to_number().is_finite()
    }
}

impl QuantitativeValue for f64 {
    fn to_number(self) -> f64 {
        self
    }

    fn from_number(value: f64) -> Option<Self> {
        Some(value)
    }

    fn default_domain() -> (Self, Self) {
        (0.0, 1.0)
    }

    fn single_value_expansion(self) -> (Self, Self) {
        (self - 1.0, self + 1.0)
    }

    fn from_json(value: &Value) -> Option<Self> {
        let number = match value {
            Value::Number(number) => number.as_f64()?,
            Value::String(text) => text.trim().parse::<f64>().ok()?,
            Value::Bool(flag) => f64::from(u8::from(*flag)),
            _ => return None,
        };
        number.is_finite().then_some(number)
    }
}

impl QuantitativeValue for DateTime<Utc> {
    fn to_number(self) -> f64 {
        self.timestamp_millis() as f64
    }

    fn from_number(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis(value.round() as i64)
    }

    fn default_domain() -> (Self, Self) {
        let start = DateTime::UNIX_EPOCH;
        (start, start + Duration::days(1))
    }

    fn single_value_expansion(self) -> (Self, Self) {
        let day = Duration::days(1);
        (
            self.checked_sub_signed(day).unwrap_or(self),
            self.checked_add_signed(day).unwrap_or(self),
        )
    }

    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(text) => DateTime::parse_from_rfc3339(text)
                .ok()
                .map(|parsed| parsed.with_timezone(&Utc)),
            Value::Number(number) => number.as_f64().and_then(Self::from_number),
            _ => None,
        }
    }
}

/// Stringified form of a datum key; numbers and strings with the same text
/// collapse onto the same key.
#[must_use]
pub fn normalize_key(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => "null".to_owned(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    use super::{QuantitativeValue, normalize_key};

    #[test]
    fn numbers_expand_by_one() {
        assert_eq!(5.0f64.single_value_expansion(), (4.0, 6.0));
    }

    #[test]
    fn dates_expand_by_one_day() {
        let day = Utc.with_ymd_and_hms(2000, 6, 5, 0, 0, 0).unwrap();
        let (before, after) = day.single_value_expansion();
        assert_eq!(before, Utc.with_ymd_and_hms(2000, 6, 4, 0, 0, 0).unwrap());
        assert_eq!(after, Utc.with_ymd_and_hms(2000, 6, 6, 0, 0, 0).unwrap());
    }

    #[test]
    fn json_numbers_and_numeric_strings_parse() {
        assert_eq!(f64::from_json(&json!(3)), Some(3.0));
        assert_eq!(f64::from_json(&json!("2.5")), Some(2.5));
        assert_eq!(f64::from_json(&json!("abc")), None);
        assert_eq!(f64::from_json(&json!(null)), None);
    }

    #[test]
    fn keys_normalize_to_strings() {
        assert_eq!(normalize_key(&json!("Fred")), "Fred");
        assert_eq!(normalize_key(&json!(3)), "3");
    }
}
