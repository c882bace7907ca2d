pub mod analyze;
pub mod config;
pub mod describe;
pub mod doctor;
pub mod export;
pub mod show;

use costpilot_core::artifacts::{ArtifactError, ArtifactStore};
use costpilot_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_RUNTIME: u8 = 3;
pub const EXIT_MISSING: u8 = 4;
pub const EXIT_STAGE: u8 = 5;
pub const EXIT_IO: u8 = 6;

#[derive(Debug, Clone)]
pub struct CommandResult {
    pub exit_code: u8,
    pub output: String,
}

#[derive(Debug, Serialize)]
struct CommandOutcome {
    command: String,
    status: String,
    error_class: Option<String>,
    message: String,
}

impl CommandResult {
    pub fn success(command: &str, message: impl Into<String>) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "ok".to_string(),
            error_class: None,
            message: message.into(),
        };
        Self { exit_code: 0, output: serialize_payload(payload) }
    }

    pub fn failure(
        command: &str,
        error_class: &str,
        message: impl Into<String>,
        exit_code: u8,
    ) -> Self {
        let payload = CommandOutcome {
            command: command.to_string(),
            status: "error".to_string(),
            error_class: Some(error_class.to_string()),
            message: message.into(),
        };
        Self { exit_code, output: serialize_payload(payload) }
    }

    /// Raw document output for commands that print an artifact instead of an outcome line.
    pub fn document(output: String) -> Self {
        Self { exit_code: 0, output }
    }
}

pub(crate) fn load_config(
    command: &str,
    options: &LoadOptions,
) -> Result<AppConfig, CommandResult> {
    AppConfig::load(options.clone()).map_err(|error| {
        CommandResult::failure(
            command,
            "config_validation",
            format!("configuration issue: {error}"),
            EXIT_CONFIG,
        )
    })
}

pub(crate) fn workspace_store(
    command: &str,
    options: &LoadOptions,
) -> Result<ArtifactStore, CommandResult> {
    load_config(command, options).map(|config| ArtifactStore::new(config.workspace.dir))
}

pub(crate) fn artifact_failure(command: &str, error: &ArtifactError) -> CommandResult {
    if error.is_missing() {
        CommandResult::failure(command, "missing_artifact", error.to_string(), EXIT_MISSING)
    } else {
        CommandResult::failure(command, "artifact_io", error.to_string(), EXIT_IO)
    }
}

fn serialize_payload(payload: CommandOutcome) -> String {
    serde_json::to_string(&payload).unwrap_or_else(|error| {
        format!(
            "{{\"command\":\"unknown\",\"status\":\"error\",\"error_class\":\"serialization\",\"message\":\"{}\"}}",
            error.to_string().replace('\\', "\\\\").replace('"', "\\\"")
        )
    })
}
