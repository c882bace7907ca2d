use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::domain::shape::value_kind;
use crate::errors::StageError;

pub const BILLING_ENTITY: &str = "billing_record";

/// Number of ledger lines requested per synthesis call.
pub const BILLING_RECORD_COUNT: usize = 6;

/// One synthetic usage/cost line.
///
/// Only `cost` is typed. The other fields keep whatever JSON the model produced, and keys
/// outside the requested schema ride along in `extra` so they persist unchanged.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BillingRecord {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage_quantity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<Value>,
    pub cost: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl BillingRecord {
    pub fn new(service: impl Into<String>, cost: f64) -> Self {
        Self {
            month: None,
            service: Some(Value::String(service.into())),
            resource_id: None,
            region: None,
            usage_quantity: None,
            unit: None,
            cost,
            description: None,
            extra: Map::new(),
        }
    }

    /// Grouping key for per-service subtotals. Strings are used verbatim; any other JSON
    /// value is keyed by its compact JSON text.
    pub fn service_key(&self) -> Option<String> {
        match self.service.as_ref()? {
            Value::String(service) => Some(service.clone()),
            other => Some(other.to_string()),
        }
    }

    /// Converts a generated batch, failing the whole batch on the first element without `cost`.
    pub fn from_batch(values: Vec<Value>) -> Result<Vec<Self>, StageError> {
        values
            .into_iter()
            .enumerate()
            .map(|(index, value)| {
                let has_cost = value.get("cost").is_some_and(|cost| !cost.is_null());
                if !value.is_object() {
                    return Err(StageError::schema(
                        BILLING_ENTITY,
                        format!("element {index} is a {}, not an object", value_kind(&value)),
                    ));
                }
                if !has_cost {
                    return Err(StageError::schema(
                        BILLING_ENTITY,
                        format!("element {index} has no `cost` field"),
                    ));
                }

                serde_json::from_value(value).map_err(|error| {
                    StageError::schema(BILLING_ENTITY, format!("element {index}: {error}"))
                })
            })
            .collect()
    }
}
