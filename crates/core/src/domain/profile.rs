use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::shape::value_kind;
use crate::errors::StageError;

pub const PROFILE_ENTITY: &str = "project_profile";

pub const REQUIRED_PROFILE_FIELDS: [&str; 5] =
    ["name", "budget_per_month", "description", "tech_stack", "non_functional_requirements"];

/// Structured description of the project under analysis.
///
/// `tech_stack` is an open component -> choice mapping and is kept as raw JSON.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProjectProfile {
    pub name: String,
    pub budget_per_month: f64,
    pub description: String,
    pub tech_stack: Map<String, Value>,
    pub non_functional_requirements: Vec<String>,
}

impl ProjectProfile {
    /// Builds a profile from an extracted JSON object.
    ///
    /// Every required field must be present and non-null. Extra fields are dropped.
    pub fn from_extracted(value: Value) -> Result<Self, StageError> {
        let object = match value {
            Value::Object(object) => object,
            other => {
                return Err(StageError::schema(
                    PROFILE_ENTITY,
                    format!("expected an object, received {}", value_kind(&other)),
                ));
            }
        };

        let missing = REQUIRED_PROFILE_FIELDS
            .iter()
            .filter(|field| object.get(**field).map_or(true, Value::is_null))
            .copied()
            .collect::<Vec<_>>();
        if !missing.is_empty() {
            return Err(StageError::schema(
                PROFILE_ENTITY,
                format!("missing required field(s): {}", missing.join(", ")),
            ));
        }

        serde_json::from_value(Value::Object(object))
            .map_err(|error| StageError::schema(PROFILE_ENTITY, error.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use crate::errors::StageError;

    use super::ProjectProfile;

    #[test]
    fn missing_budget_is_named_in_the_violation() {
        let error = ProjectProfile::from_extracted(json!({
            "name": "Ledgerly",
            "description": "bookkeeping SaaS",
            "tech_stack": {"backend": "rust"},
            "non_functional_requirements": ["99.9% uptime"]
        }))
        .expect_err("profile without budget must fail");

        assert!(matches!(
            error,
            StageError::SchemaViolation { ref detail, .. } if detail.contains("budget_per_month")
        ));
    }

    #[test]
    fn null_field_counts_as_missing() {
        let error = ProjectProfile::from_extracted(json!({
            "name": null,
            "budget_per_month": 1000,
            "description": "d",
            "tech_stack": {},
            "non_functional_requirements": []
        }))
        .expect_err("null name must fail");

        assert!(matches!(
            error,
            StageError::SchemaViolation { ref detail, .. } if detail.contains("name")
        ));
    }

    #[test]
    fn wrongly_typed_field_is_a_schema_violation() {
        let error = ProjectProfile::from_extracted(json!({
            "name": "n",
            "budget_per_month": "a lot",
            "description": "d",
            "tech_stack": {},
            "non_functional_requirements": []
        }))
        .expect_err("string budget must fail");

        assert_eq!(error.error_class(), "schema_violation");
    }

    #[test]
    fn tech_stack_is_kept_verbatim() {
        let profile = ProjectProfile::from_extracted(json!({
            "name": "n",
            "budget_per_month": 1000,
            "description": "d",
            "tech_stack": {"database": {"engine": "postgres", "replicas": 2}},
            "non_functional_requirements": []
        }))
        .expect("valid profile");

        assert_eq!(profile.tech_stack["database"], json!({"engine": "postgres", "replicas": 2}));
    }
}
