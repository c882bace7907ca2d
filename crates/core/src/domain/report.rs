use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::shape::value_kind;
use crate::errors::StageError;

pub const REPORT_ENTITY: &str = "optimization_report";

/// Recommendations document returned by the final stage.
///
/// Only the top level is constrained (a keyed structure); its contents are free-form.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OptimizationReport(Map<String, Value>);

impl OptimizationReport {
    pub fn from_extracted(value: Value) -> Result<Self, StageError> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(StageError::schema(
                REPORT_ENTITY,
                format!("expected an object, received {}", value_kind(&other)),
            )),
        }
    }

    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Length of the first list whose key mentions recommendations, if any.
    pub fn recommendation_count(&self) -> Option<usize> {
        self.0
            .iter()
            .filter(|(key, _)| key.to_ascii_lowercase().contains("recommend"))
            .find_map(|(_, value)| value.as_array().map(Vec::len))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::OptimizationReport;

    #[test]
    fn list_top_level_is_rejected() {
        let error = OptimizationReport::from_extracted(json!([{"title": "rightsize"}]))
            .expect_err("array report must fail");
        assert_eq!(error.error_class(), "schema_violation");
    }

    #[test]
    fn recommendation_count_is_best_effort() {
        let report = OptimizationReport::from_extracted(json!({
            "summary": "ok",
            "recommendations": [{"title": "a"}, {"title": "b"}, {"title": "c"}, {"title": "d"}]
        }))
        .expect("object report");
        assert_eq!(report.recommendation_count(), Some(4));

        let bare = OptimizationReport::from_extracted(json!({"summary": "ok"})).expect("object");
        assert_eq!(bare.recommendation_count(), None);
    }
}
