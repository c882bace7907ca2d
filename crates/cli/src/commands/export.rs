use costpilot_core::config::LoadOptions;
use tracing::info;

use crate::commands::{artifact_failure, workspace_store, CommandResult};

const COMMAND: &str = "export";

pub fn run(options: &LoadOptions) -> CommandResult {
    let store = match workspace_store(COMMAND, options) {
        Ok(store) => store,
        Err(failure) => return failure,
    };

    match store.export_report() {
        Ok(path) => {
            info!(event_name = "cli.export.completed", path = %path.display(), "report exported");
            CommandResult::success(COMMAND, format!("report exported to {}", path.display()))
        }
        Err(error) => artifact_failure(COMMAND, &error),
    }
}
