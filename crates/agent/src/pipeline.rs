use costpilot_core::domain::billing::BillingRecord;
use costpilot_core::domain::profile::ProjectProfile;
use costpilot_core::domain::report::OptimizationReport;
use costpilot_core::errors::{PipelineError, PipelineStage, StageError};
use costpilot_core::spending::SpendingSummary;
use serde::Serialize;
use tracing::{info, warn, Instrument};
use uuid::Uuid;

use crate::llm::LlmClient;
use crate::stages::{BillingSynthesizer, ProfileExtractor, ReportGenerator};
use crate::structured::StructuredLlmClient;

#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AnalysisOutcome {
    pub profile: ProjectProfile,
    pub billing: Vec<BillingRecord>,
    pub summary: SpendingSummary,
    pub report: OptimizationReport,
}

/// Profile extraction -> billing synthesis -> report generation, stopping at the first failure.
pub struct Pipeline<C> {
    client: StructuredLlmClient<C>,
}

impl<C> Pipeline<C>
where
    C: LlmClient,
{
    pub fn new(client: StructuredLlmClient<C>) -> Self {
        Self { client }
    }

    pub async fn extract_profile(&self, text: &str) -> Result<ProjectProfile, PipelineError> {
        let stage = PipelineStage::ProfileExtraction;
        let result = ProfileExtractor::new(&self.client).extract(text).await;
        finish_stage(stage, result)
    }

    pub async fn synthesize_billing(
        &self,
        profile: &ProjectProfile,
    ) -> Result<Vec<BillingRecord>, PipelineError> {
        let stage = PipelineStage::BillingSynthesis;
        let result = BillingSynthesizer::new(&self.client).synthesize(profile).await;
        finish_stage(stage, result)
    }

    pub async fn build_report(
        &self,
        profile: &ProjectProfile,
        records: &[BillingRecord],
    ) -> Result<OptimizationReport, PipelineError> {
        self.build_report_with_summary(profile, records).await.map(|(_, report)| report)
    }

    pub async fn build_report_with_summary(
        &self,
        profile: &ProjectProfile,
        records: &[BillingRecord],
    ) -> Result<(SpendingSummary, OptimizationReport), PipelineError> {
        let stage = PipelineStage::ReportGeneration;
        let result =
            ReportGenerator::new(&self.client).generate_with_summary(profile, records).await;
        finish_stage(stage, result)
    }

    pub async fn run(&self, text: &str) -> Result<AnalysisOutcome, PipelineError> {
        let correlation_id = Uuid::new_v4();
        let span = tracing::info_span!("analysis", correlation_id = %correlation_id);

        async {
            info!(event_name = "pipeline.run.start", "starting cost analysis");
            let profile = self.extract_profile(text).await?;
            let billing = self.synthesize_billing(&profile).await?;
            let (summary, report) = self.build_report_with_summary(&profile, &billing).await?;
            info!(event_name = "pipeline.run.completed", "cost analysis completed");
            Ok::<_, PipelineError>(AnalysisOutcome { profile, billing, summary, report })
        }
        .instrument(span)
        .await
    }
}

fn finish_stage<T, E>(stage: PipelineStage, result: Result<T, E>) -> Result<T, PipelineError>
where
    E: Into<StageError>,
{
    match result {
        Ok(value) => {
            info!(
                event_name = "pipeline.stage.completed",
                stage = stage.as_str(),
                "stage completed"
            );
            Ok(value)
        }
        Err(error) => {
            let error = PipelineError::new(stage, error);
            warn!(
                event_name = "pipeline.stage.failed",
                stage = stage.as_str(),
                error_class = error.error_class(),
                error = %error.source,
                "stage failed"
            );
            Err(error)
        }
    }
}
