use chrono::NaiveDateTime;
use serde::{Serialize, Serializer};
use serde_json::Value as JsonValue;

/// Values that can be stored in a database row or used as query parameters.
///
/// The same enum is used for every driver so query helpers never branch on driver types:
/// ```rust
/// use sql_scope::RowValues;
///
/// let params: Vec<RowValues> = vec![1_i64.into(), "alice".into(), true.into()];
/// assert_eq!(params[1], RowValues::Text("alice".into()));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum RowValues {
    /// Integer value (64-bit)
    Int(i64),
    /// Floating point value (64-bit)
    Float(f64),
    /// Text/string value
    Text(String),
    /// Boolean value
    Bool(bool),
    /// Timestamp value
    Timestamp(NaiveDateTime),
    /// NULL value
    Null,
    /// JSON value
    JSON(JsonValue),
    /// Binary data
    Blob(Vec<u8>),
}

impl RowValues {
    /// Check if this value is NULL
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub fn as_int(&self) -> Option<&i64> {
        if let RowValues::Int(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        if let RowValues::Text(value) = self {
            Some(value)
        } else {
            None
        }
    }

    #[must_use]
    pub fn as_bool(&self) -> Option<&bool> {
        if let RowValues::Bool(value) = self {
            return Some(value);
        } else if let Some(i) = self.as_int() {
            if *i == 1 {
                return Some(&true);
            } else if *i == 0 {
                return Some(&false);
            }
        }
        None
    }

    #[must_use]
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        if let RowValues::Timestamp(value) = self {
            return Some(*value);
        } else if let Some(s) = self.as_text() {
            // Try "YYYY-MM-DD HH:MM:SS"
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
                return Some(dt);
            }
            // Try "YYYY-MM-DD HH:MM:SS.fff" with any fractional precision
            if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f") {
                return Some(dt);
            }
        }
        None
    }

    /// Floats, and integers widened to floats.
    #[must_use]
    pub fn as_float(&self) -> Option<f64> {
        match self {
            RowValues::Float(value) => Some(*value),
            #[allow(clippy::cast_precision_loss)]
            RowValues::Int(value) => Some(*value as f64),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_blob(&self) -> Option<&[u8]> {
        if let RowValues::Blob(bytes) = self {
            Some(bytes)
        } else {
            None
        }
    }
}

impl From<i64> for RowValues {
    fn from(value: i64) -> Self {
        RowValues::Int(value)
    }
}

impl From<i32> for RowValues {
    fn from(value: i32) -> Self {
        RowValues::Int(i64::from(value))
    }
}

impl From<f64> for RowValues {
    fn from(value: f64) -> Self {
        RowValues::Float(value)
    }
}

impl From<bool> for RowValues {
    fn from(value: bool) -> Self {
        RowValues::Bool(value)
    }
}

impl From<&str> for RowValues {
    fn from(value: &str) -> Self {
        RowValues::Text(value.to_string())
    }
}

impl From<String> for RowValues {
    fn from(value: String) -> Self {
        RowValues::Text(value)
    }
}

impl From<Vec<u8>> for RowValues {
    fn from(value: Vec<u8>) -> Self {
        RowValues::Blob(value)
    }
}

impl From<NaiveDateTime> for RowValues {
    fn from(value: NaiveDateTime) -> Self {
        RowValues::Timestamp(value)
    }
}

impl From<JsonValue> for RowValues {
    fn from(value: JsonValue) -> Self {
        RowValues::JSON(value)
    }
}

impl<T: Into<RowValues>> From<Option<T>> for RowValues {
    fn from(value: Option<T>) -> Self {
        value.map_or(RowValues::Null, Into::into)
    }
}

impl Serialize for RowValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            RowValues::Int(i) => serializer.serialize_i64(*i),
            RowValues::Float(f) => serializer.serialize_f64(*f),
            RowValues::Text(s) => serializer.serialize_str(s),
            RowValues::Bool(b) => serializer.serialize_bool(*b),
            RowValues::Timestamp(dt) => dt.serialize(serializer),
            RowValues::Null => serializer.serialize_none(),
            RowValues::JSON(json) => json.serialize(serializer),
            RowValues::Blob(bytes) => serializer.serialize_bytes(bytes),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn option_none_becomes_null() {
        let missing: Option<&str> = None;
        assert_eq!(RowValues::from(missing), RowValues::Null);
        assert_eq!(RowValues::from(Some(7_i64)), RowValues::Int(7));
    }

    #[test]
    fn bool_accessor_accepts_sqlite_integers() {
        assert_eq!(RowValues::Int(1).as_bool(), Some(&true));
        assert_eq!(RowValues::Int(0).as_bool(), Some(&false));
        assert_eq!(RowValues::Int(2).as_bool(), None);
    }

    #[test]
    fn timestamp_accessor_parses_text() {
        let expected = NaiveDate::from_ymd_opt(2024, 3, 1)
            .unwrap()
            .and_hms_milli_opt(12, 30, 5, 250)
            .unwrap();
        let stored = RowValues::Text("2024-03-01 12:30:05.250".into());
        assert_eq!(stored.as_timestamp(), Some(expected));
        assert_eq!(RowValues::Text("yesterday".into()).as_timestamp(), None);
    }

    #[test]
    fn serializes_to_plain_json() {
        let values = vec![
            RowValues::Int(3),
            RowValues::Text("x".into()),
            RowValues::Null,
            RowValues::Bool(false),
        ];
        let json = serde_json::to_string(&values).unwrap();
        assert_eq!(json, r#"[3,"x",null,false]"#);
    }
}
