use clap::ValueEnum;
use costpilot_core::artifacts::{ArtifactError, ArtifactStore};
use costpilot_core::config::LoadOptions;
use costpilot_core::spending::SpendingSummary;
use serde::Serialize;

use crate::commands::{artifact_failure, workspace_store, CommandResult, EXIT_IO, EXIT_STAGE};

const COMMAND: &str = "show";

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum ShowTarget {
    Profile,
    Billing,
    Summary,
    Report,
}

pub fn run(options: &LoadOptions, target: ShowTarget) -> CommandResult {
    let store = match workspace_store(COMMAND, options) {
        Ok(store) => store,
        Err(failure) => return failure,
    };

    let document = match target {
        ShowTarget::Profile => load(store.load_profile()).and_then(|profile| render(&profile)),
        ShowTarget::Billing => load(store.load_billing()).and_then(|records| render(&records)),
        ShowTarget::Summary => summarize(&store).and_then(|summary| render(&summary)),
        ShowTarget::Report => load(store.load_report()).and_then(|report| render(&report)),
    };

    match document {
        Ok(document) => CommandResult::document(document),
        Err(failure) => failure,
    }
}

/// Recomputed from the stored profile and ledger; the summary itself is never persisted.
fn summarize(store: &ArtifactStore) -> Result<SpendingSummary, CommandResult> {
    let profile = load(store.load_profile())?;
    let billing = load(store.load_billing())?;
    SpendingSummary::compute(profile.budget_per_month, &billing).map_err(|error| {
        CommandResult::failure(COMMAND, "aggregation", error.to_string(), EXIT_STAGE)
    })
}

fn load<T>(result: Result<T, ArtifactError>) -> Result<T, CommandResult> {
    result.map_err(|error| artifact_failure(COMMAND, &error))
}

fn render<T: Serialize + ?Sized>(value: &T) -> Result<String, CommandResult> {
    serde_json::to_string_pretty(value).map_err(|error| {
        CommandResult::failure(COMMAND, "serialization", error.to_string(), EXIT_IO)
    })
}
