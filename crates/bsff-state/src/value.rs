//! # Field Values
//!
//! A uniform view of any ruled field, used for presence checks (required
//! rules) and equality (sealed-field diff). Presence means a value that is
//! not null, not blank text, and not an empty list.

use serde::Serialize;

use bsff_core::Timestamp;

/// The value of one ruled field.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FieldValue {
    /// No value.
    Absent,
    /// Text, enum names and identifiers.
    Text(String),
    /// Quantities.
    Number(f64),
    /// Booleans.
    Flag(bool),
    /// Dates.
    Date(Timestamp),
    /// Lists, compared element by element in order.
    List(Vec<String>),
}

impl FieldValue {
    /// Whether the value satisfies a required rule.
    pub fn is_present(&self) -> bool {
        match self {
            FieldValue::Absent => false,
            FieldValue::Text(s) => !s.trim().is_empty(),
            FieldValue::List(items) => !items.is_empty(),
            FieldValue::Number(_) | FieldValue::Flag(_) | FieldValue::Date(_) => true,
        }
    }

    /// Equality after treating blank text and empty lists as absent, so
    /// that `None` and `""` never count as a modification.
    pub fn same_as(&self, other: &FieldValue) -> bool {
        match (self.is_present(), other.is_present()) {
            (false, false) => true,
            (true, true) => self == other,
            _ => false,
        }
    }

    /// Text from an optional string-like value.
    pub fn text<S: AsRef<str>>(value: Option<S>) -> Self {
        value.map_or(FieldValue::Absent, |s| FieldValue::Text(s.as_ref().to_string()))
    }

    /// Number from an optional quantity.
    pub fn number(value: Option<f64>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Number)
    }

    /// Flag from an optional boolean.
    pub fn flag(value: Option<bool>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Flag)
    }

    /// Date from an optional timestamp.
    pub fn date(value: Option<Timestamp>) -> Self {
        value.map_or(FieldValue::Absent, FieldValue::Date)
    }

    /// List of displayable items.
    pub fn list<I, D>(items: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: std::fmt::Display,
    {
        FieldValue::List(items.into_iter().map(|i| i.to_string()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presence() {
        assert!(!FieldValue::Absent.is_present());
        assert!(!FieldValue::text(Some("  ")).is_present());
        assert!(FieldValue::text(Some("x")).is_present());
        assert!(!FieldValue::list(Vec::<String>::new()).is_present());
        assert!(FieldValue::Number(0.0).is_present());
        assert!(FieldValue::Flag(false).is_present());
    }

    #[test]
    fn test_blank_text_same_as_absent() {
        assert_eq!(FieldValue::text(None::<&str>), FieldValue::Absent);
        assert!(FieldValue::text(Some("")).same_as(&FieldValue::Absent));
        assert!(!FieldValue::text(Some("a")).same_as(&FieldValue::Absent));
        assert!(!FieldValue::Number(1.0).same_as(&FieldValue::Number(2.0)));
        assert!(FieldValue::list(["a", "b"]).same_as(&FieldValue::list(["a", "b"])));
    }
}
