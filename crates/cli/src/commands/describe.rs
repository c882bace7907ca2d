use std::fs;
use std::io::{self, Read};
use std::path::PathBuf;

use anyhow::Context;
use costpilot_core::config::LoadOptions;

use crate::commands::{artifact_failure, workspace_store, CommandResult, EXIT_IO, EXIT_MISSING};

const COMMAND: &str = "describe";

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum DescriptionSource {
    Text(String),
    File(PathBuf),
    Stdin,
}

pub fn run(options: &LoadOptions, source: DescriptionSource) -> CommandResult {
    let store = match workspace_store(COMMAND, options) {
        Ok(store) => store,
        Err(failure) => return failure,
    };

    let text = match read_description(source) {
        Ok(text) => text,
        Err(error) => {
            return CommandResult::failure(COMMAND, "input_read", format!("{error:#}"), EXIT_IO);
        }
    };

    if text.trim().is_empty() {
        return CommandResult::failure(
            COMMAND,
            "empty_input",
            "project description is empty; nothing was saved",
            EXIT_MISSING,
        );
    }

    match store.save_description(&text) {
        Ok(path) => CommandResult::success(
            COMMAND,
            format!("saved {} characters to {}", text.chars().count(), path.display()),
        ),
        Err(error) => artifact_failure(COMMAND, &error),
    }
}

fn read_description(source: DescriptionSource) -> anyhow::Result<String> {
    match source {
        DescriptionSource::Text(text) => Ok(text),
        DescriptionSource::File(path) => fs::read_to_string(&path)
            .with_context(|| format!("failed to read description file `{}`", path.display())),
        DescriptionSource::Stdin => {
            let mut text = String::new();
            io::stdin().read_to_string(&mut text).context("failed to read description from stdin")?;
            Ok(text)
        }
    }
}
