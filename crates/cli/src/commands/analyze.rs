use costpilot_agent::llm::{ChatCompletionsClient, LlmClient, LlmSetupError};
use costpilot_agent::pipeline::Pipeline;
use costpilot_agent::structured::{StructuredLlmClient, StructuredSettings};
use costpilot_core::artifacts::ArtifactStore;
use costpilot_core::config::LoadOptions;
use costpilot_core::errors::PipelineError;
use costpilot_core::spending::SpendingSummary;
use tracing::{info, Instrument};
use uuid::Uuid;

use crate::commands::{
    artifact_failure, load_config, CommandResult, EXIT_CONFIG, EXIT_MISSING, EXIT_RUNTIME,
    EXIT_STAGE,
};

const COMMAND: &str = "analyze";

pub fn run(options: &LoadOptions) -> CommandResult {
    let config = match load_config(COMMAND, options) {
        Ok(config) => config,
        Err(failure) => return failure,
    };

    let client = match ChatCompletionsClient::from_config(&config.llm) {
        Ok(client) => client,
        Err(LlmSetupError::Config(error)) => {
            return CommandResult::failure(
                COMMAND,
                "config_validation",
                format!("configuration issue: {error}"),
                EXIT_CONFIG,
            );
        }
        Err(error) => {
            return CommandResult::failure(COMMAND, "runtime_init", error.to_string(), EXIT_RUNTIME);
        }
    };

    let settings = StructuredSettings::from_config(&config.llm);
    let pipeline = Pipeline::new(StructuredLlmClient::new(client, settings));
    execute(&ArtifactStore::new(config.workspace.dir), &pipeline)
}

/// Runs every stage against the stored description, saving each artifact as soon as its
/// stage succeeds. Artifacts from earlier stages survive a later failure.
pub fn execute<C>(store: &ArtifactStore, pipeline: &Pipeline<C>) -> CommandResult
where
    C: LlmClient,
{
    let text = match store.load_description() {
        Ok(text) if !text.trim().is_empty() => text,
        Ok(_) => {
            return CommandResult::failure(
                COMMAND,
                "empty_input",
                "stored project description is empty; run `costpilot describe` first",
                EXIT_MISSING,
            );
        }
        Err(error) if error.is_missing() => {
            return CommandResult::failure(
                COMMAND,
                "missing_artifact",
                format!("{error}; run `costpilot describe` first"),
                EXIT_MISSING,
            );
        }
        Err(error) => return artifact_failure(COMMAND, &error),
    };

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "runtime_init",
                format!("failed to initialize async runtime: {error}"),
                EXIT_RUNTIME,
            );
        }
    };

    let span = tracing::info_span!("analysis", correlation_id = %Uuid::new_v4());
    match runtime.block_on(run_stages(store, pipeline, &text).instrument(span)) {
        Ok(message) => CommandResult::success(COMMAND, message),
        Err(failure) => failure,
    }
}

async fn run_stages<C>(
    store: &ArtifactStore,
    pipeline: &Pipeline<C>,
    text: &str,
) -> Result<String, CommandResult>
where
    C: LlmClient,
{
    let profile = pipeline.extract_profile(text).await.map_err(stage_failure)?;
    store.save_profile(&profile).map_err(|error| artifact_failure(COMMAND, &error))?;

    let billing = pipeline.synthesize_billing(&profile).await.map_err(stage_failure)?;
    store.save_billing(&billing).map_err(|error| artifact_failure(COMMAND, &error))?;

    let (summary, report) =
        pipeline.build_report_with_summary(&profile, &billing).await.map_err(stage_failure)?;
    let report_path =
        store.save_report(&report).map_err(|error| artifact_failure(COMMAND, &error))?;

    info!(
        event_name = "cli.analyze.completed",
        report_path = %report_path.display(),
        records = billing.len(),
        "analysis artifacts saved"
    );

    let recommendations = match report.recommendation_count() {
        Some(count) => format!("{count} recommendations"),
        None => "no recommendation list".to_string(),
    };
    Ok(format!(
        "analysis complete for `{}`: {}; {recommendations}; report saved to {}",
        profile.name,
        budget_line(&summary),
        report_path.display()
    ))
}

fn budget_line(summary: &SpendingSummary) -> String {
    let standing = if summary.over_budget {
        format!("over budget by {:.2}", summary.budget_variance)
    } else {
        format!("within budget by {:.2}", summary.budget - summary.total_cost)
    };
    format!(
        "total cost {:.2} against budget {:.2} ({standing})",
        summary.total_cost, summary.budget
    )
}

fn stage_failure(error: PipelineError) -> CommandResult {
    CommandResult::failure(COMMAND, error.error_class(), error.to_string(), EXIT_STAGE)
}
