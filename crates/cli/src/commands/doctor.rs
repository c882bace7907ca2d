use costpilot_core::artifacts::{ArtifactKind, ArtifactStore};
use costpilot_core::config::{AppConfig, LoadOptions};
use serde::Serialize;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
enum CheckStatus {
    Pass,
    Fail,
    Skipped,
}

#[derive(Debug, Serialize)]
struct DoctorCheck {
    name: &'static str,
    status: CheckStatus,
    details: String,
}

#[derive(Debug, Serialize)]
struct DoctorReport {
    overall_status: CheckStatus,
    summary: String,
    checks: Vec<DoctorCheck>,
}

pub fn run(options: &LoadOptions, json_output: bool) -> String {
    let report = build_report(options);

    if json_output {
        return serde_json::to_string_pretty(&report).unwrap_or_else(|error| {
            format!(
                "{{\"overall_status\":\"fail\",\"summary\":\"doctor serialization failed\",\"error\":\"{}\"}}",
                escape_json(&error.to_string())
            )
        });
    }

    render_human(&report)
}

fn build_report(options: &LoadOptions) -> DoctorReport {
    let mut checks = Vec::new();

    match AppConfig::load(options.clone()) {
        Ok(config) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Pass,
                details: "configuration loaded and validated".to_string(),
            });
            checks.push(check_credential(&config));
            checks.push(check_artifacts(&ArtifactStore::new(config.workspace.dir.clone())));
        }
        Err(error) => {
            checks.push(DoctorCheck {
                name: "config_validation",
                status: CheckStatus::Fail,
                details: error.to_string(),
            });
            for name in ["llm_credential", "workspace_artifacts"] {
                checks.push(DoctorCheck {
                    name,
                    status: CheckStatus::Skipped,
                    details: "skipped because configuration did not load".to_string(),
                });
            }
        }
    }

    let all_pass = checks.iter().all(|check| check.status == CheckStatus::Pass);
    let overall_status = if all_pass { CheckStatus::Pass } else { CheckStatus::Fail };
    let summary = if all_pass {
        "doctor: all readiness checks passed".to_string()
    } else {
        "doctor: one or more readiness checks failed".to_string()
    };

    DoctorReport { overall_status, summary, checks }
}

fn check_credential(config: &AppConfig) -> DoctorCheck {
    if config.llm.has_api_key() {
        DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Pass,
            details: format!(
                "credential present for `{}` ({} candidate model(s))",
                config.llm.endpoint,
                config.llm.models.len()
            ),
        }
    } else {
        DoctorCheck {
            name: "llm_credential",
            status: CheckStatus::Fail,
            details: "no credential; set COSTPILOT_LLM_API_KEY or HF_API_TOKEN".to_string(),
        }
    }
}

/// Inventory only: a fresh workspace with nothing stored yet still passes.
fn check_artifacts(store: &ArtifactStore) -> DoctorCheck {
    let (present, missing): (Vec<ArtifactKind>, Vec<ArtifactKind>) =
        ArtifactKind::ALL.into_iter().partition(|kind| store.exists(*kind));
    let names = |kinds: &[ArtifactKind]| {
        if kinds.is_empty() {
            "none".to_string()
        } else {
            kinds.iter().map(|kind| kind.as_str()).collect::<Vec<_>>().join(", ")
        }
    };

    DoctorCheck {
        name: "workspace_artifacts",
        status: CheckStatus::Pass,
        details: format!(
            "workspace `{}`: present [{}], missing [{}]",
            store.root().display(),
            names(&present),
            names(&missing)
        ),
    }
}

fn render_human(report: &DoctorReport) -> String {
    let mut lines = Vec::new();
    lines.push(report.summary.clone());

    for check in &report.checks {
        let marker = match check.status {
            CheckStatus::Pass => "ok",
            CheckStatus::Fail => "fail",
            CheckStatus::Skipped => "skip",
        };
        lines.push(format!("- [{marker}] {}: {}", check.name, check.details));
    }

    lines.join("\n")
}

fn escape_json(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}
