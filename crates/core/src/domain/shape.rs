use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Top-level JSON kind a generation call must produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JsonShape {
    Object,
    Array,
}

impl JsonShape {
    /// Opening and closing characters the trimmed reply must carry.
    pub fn delimiters(self) -> (char, char) {
        match self {
            Self::Object => ('{', '}'),
            Self::Array => ('[', ']'),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Object => "object",
            Self::Array => "array",
        }
    }

    pub fn matches(self, value: &Value) -> bool {
        match self {
            Self::Object => value.is_object(),
            Self::Array => value.is_array(),
        }
    }
}

impl fmt::Display for JsonShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{value_kind, JsonShape};

    #[test]
    fn shape_matches_only_its_own_kind() {
        assert!(JsonShape::Object.matches(&json!({"a": 1})));
        assert!(!JsonShape::Object.matches(&json!([1, 2])));
        assert!(JsonShape::Array.matches(&json!([])));
        assert!(!JsonShape::Array.matches(&json!("[]")));
    }

    #[test]
    fn value_kind_names_scalars() {
        assert_eq!(value_kind(&json!(12.5)), "number");
        assert_eq!(value_kind(&json!("text")), "string");
        assert_eq!(value_kind(&json!(null)), "null");
    }
}
