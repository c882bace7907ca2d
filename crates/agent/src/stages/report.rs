use costpilot_core::domain::billing::BillingRecord;
use costpilot_core::domain::profile::ProjectProfile;
use costpilot_core::domain::report::OptimizationReport;
use costpilot_core::domain::shape::JsonShape;
use costpilot_core::errors::StageError;
use costpilot_core::spending::SpendingSummary;
use tracing::info;

use crate::llm::LlmClient;
use crate::prompts::{report_prompt, REPORT_SYSTEM_PROMPT};
use crate::structured::StructuredLlmClient;

/// Ledger lines shown to the model; the full ledger only feeds the local summary.
pub const REPORT_SAMPLE_SIZE: usize = 5;

pub struct ReportGenerator<'a, C> {
    client: &'a StructuredLlmClient<C>,
}

impl<'a, C> ReportGenerator<'a, C>
where
    C: LlmClient,
{
    pub fn new(client: &'a StructuredLlmClient<C>) -> Self {
        Self { client }
    }

    pub async fn generate(
        &self,
        profile: &ProjectProfile,
        records: &[BillingRecord],
    ) -> Result<OptimizationReport, StageError> {
        self.generate_with_summary(profile, records).await.map(|(_, report)| report)
    }

    /// Aggregates locally, then asks for recommendations conditioned on the aggregate.
    pub async fn generate_with_summary(
        &self,
        profile: &ProjectProfile,
        records: &[BillingRecord],
    ) -> Result<(SpendingSummary, OptimizationReport), StageError> {
        let summary = SpendingSummary::compute(profile.budget_per_month, records)?;
        info!(
            event_name = "report.summary.computed",
            total_cost = summary.total_cost,
            budget_variance = summary.budget_variance,
            over_budget = summary.over_budget,
            services = summary.service_costs.len(),
            "spending summary computed"
        );

        let sample = &records[..records.len().min(REPORT_SAMPLE_SIZE)];
        let value = self
            .client
            .query(
                REPORT_SYSTEM_PROMPT,
                &report_prompt(profile, &summary, sample),
                JsonShape::Object,
            )
            .await?;
        let report = OptimizationReport::from_extracted(value)?;
        Ok((summary, report))
    }
}
