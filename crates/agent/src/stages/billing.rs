use costpilot_core::domain::billing::{BillingRecord, BILLING_ENTITY, BILLING_RECORD_COUNT};
use costpilot_core::domain::profile::ProjectProfile;
use costpilot_core::domain::shape::{value_kind, JsonShape};
use costpilot_core::errors::StageError;
use serde_json::Value;
use tracing::warn;

use crate::llm::LlmClient;
use crate::prompts::{billing_prompt, BILLING_SYSTEM_PROMPT};
use crate::structured::StructuredLlmClient;

/// Produces a synthetic ledger for a profile in a single generation call.
///
/// Only `cost` is enforced per element. Count and the other fields are taken as generated.
pub struct BillingSynthesizer<'a, C> {
    client: &'a StructuredLlmClient<C>,
}

impl<'a, C> BillingSynthesizer<'a, C>
where
    C: LlmClient,
{
    pub fn new(client: &'a StructuredLlmClient<C>) -> Self {
        Self { client }
    }

    pub async fn synthesize(
        &self,
        profile: &ProjectProfile,
    ) -> Result<Vec<BillingRecord>, StageError> {
        let value = self
            .client
            .query(BILLING_SYSTEM_PROMPT, &billing_prompt(profile), JsonShape::Array)
            .await?;

        let items = match value {
            Value::Array(items) => items,
            other => {
                return Err(StageError::schema(
                    BILLING_ENTITY,
                    format!("expected an array, received {}", value_kind(&other)),
                ));
            }
        };

        let records = BillingRecord::from_batch(items)?;
        if records.len() != BILLING_RECORD_COUNT {
            warn!(
                event_name = "billing.synthesis.count_mismatch",
                expected = BILLING_RECORD_COUNT,
                received = records.len(),
                "billing batch size differs from the requested count"
            );
        }
        Ok(records)
    }
}
