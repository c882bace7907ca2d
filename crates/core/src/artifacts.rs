//! On-disk artifacts produced across analysis runs.
//!
//! Every artifact lives directly under the workspace directory; exports go to `exports/`.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDateTime};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use crate::domain::billing::BillingRecord;
use crate::domain::profile::ProjectProfile;
use crate::domain::report::OptimizationReport;

pub const EXPORTS_DIR: &str = "exports";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    Description,
    Profile,
    Billing,
    Report,
}

impl ArtifactKind {
    pub const ALL: [ArtifactKind; 4] =
        [Self::Description, Self::Profile, Self::Billing, Self::Report];

    pub fn file_name(&self) -> &'static str {
        match self {
            Self::Description => "project_description.txt",
            Self::Profile => "project_profile.json",
            Self::Billing => "mock_billing.json",
            Self::Report => "cost_optimization_report.json",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Description => "description",
            Self::Profile => "profile",
            Self::Billing => "billing",
            Self::Report => "report",
        }
    }
}

#[derive(Debug, Error)]
pub enum ArtifactError {
    #[error("artifact `{0}` does not exist yet")]
    Missing(PathBuf),
    #[error("could not read `{path}`: {source}")]
    Read { path: PathBuf, source: io::Error },
    #[error("could not write `{path}`: {source}")]
    Write { path: PathBuf, source: io::Error },
    #[error("could not decode `{path}`: {source}")]
    Decode { path: PathBuf, source: serde_json::Error },
    #[error("could not encode `{path}`: {source}")]
    Encode { path: PathBuf, source: serde_json::Error },
}

impl ArtifactError {
    pub fn is_missing(&self) -> bool {
        matches!(self, Self::Missing(_))
    }
}

#[derive(Clone, Debug)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn path_of(&self, kind: ArtifactKind) -> PathBuf {
        self.root.join(kind.file_name())
    }

    pub fn exists(&self, kind: ArtifactKind) -> bool {
        self.path_of(kind).is_file()
    }

    pub fn save_description(&self, text: &str) -> Result<PathBuf, ArtifactError> {
        let path = self.path_of(ArtifactKind::Description);
        self.write_bytes(&path, text.as_bytes())?;
        Ok(path)
    }

    pub fn load_description(&self) -> Result<String, ArtifactError> {
        let path = self.path_of(ArtifactKind::Description);
        read_existing(&path)
    }

    pub fn save_profile(&self, profile: &ProjectProfile) -> Result<PathBuf, ArtifactError> {
        self.write_json(ArtifactKind::Profile, profile)
    }

    pub fn load_profile(&self) -> Result<ProjectProfile, ArtifactError> {
        self.read_json(ArtifactKind::Profile)
    }

    pub fn save_billing(&self, records: &[BillingRecord]) -> Result<PathBuf, ArtifactError> {
        self.write_json(ArtifactKind::Billing, records)
    }

    pub fn load_billing(&self) -> Result<Vec<BillingRecord>, ArtifactError> {
        self.read_json(ArtifactKind::Billing)
    }

    pub fn save_report(&self, report: &OptimizationReport) -> Result<PathBuf, ArtifactError> {
        self.write_json(ArtifactKind::Report, report)
    }

    pub fn load_report(&self) -> Result<OptimizationReport, ArtifactError> {
        self.read_json(ArtifactKind::Report)
    }

    pub fn export_report(&self) -> Result<PathBuf, ArtifactError> {
        self.export_report_at(Local::now().naive_local())
    }

    /// Copies the stored report to `exports/cost_optimization_report_<YYYYmmdd_HHMMSS>.json`.
    pub fn export_report_at(&self, timestamp: NaiveDateTime) -> Result<PathBuf, ArtifactError> {
        let source = self.path_of(ArtifactKind::Report);
        if !source.is_file() {
            return Err(ArtifactError::Missing(source));
        }

        let exports = self.root.join(EXPORTS_DIR);
        fs::create_dir_all(&exports)
            .map_err(|source| ArtifactError::Write { path: exports.clone(), source })?;

        let destination = exports
            .join(format!("cost_optimization_report_{}.json", timestamp.format("%Y%m%d_%H%M%S")));
        fs::copy(&source, &destination)
            .map_err(|source| ArtifactError::Write { path: destination.clone(), source })?;
        Ok(destination)
    }

    fn write_json<T: Serialize + ?Sized>(
        &self,
        kind: ArtifactKind,
        value: &T,
    ) -> Result<PathBuf, ArtifactError> {
        let path = self.path_of(kind);
        let body = serde_json::to_string_pretty(value)
            .map_err(|source| ArtifactError::Encode { path: path.clone(), source })?;
        self.write_bytes(&path, body.as_bytes())?;
        Ok(path)
    }

    fn read_json<T: DeserializeOwned>(&self, kind: ArtifactKind) -> Result<T, ArtifactError> {
        let path = self.path_of(kind);
        let raw = read_existing(&path)?;
        serde_json::from_str(&raw).map_err(|source| ArtifactError::Decode { path, source })
    }

    fn write_bytes(&self, path: &Path, bytes: &[u8]) -> Result<(), ArtifactError> {
        fs::create_dir_all(&self.root)
            .map_err(|source| ArtifactError::Write { path: self.root.clone(), source })?;
        fs::write(path, bytes)
            .map_err(|source| ArtifactError::Write { path: path.to_path_buf(), source })
    }
}

fn read_existing(path: &Path) -> Result<String, ArtifactError> {
    match fs::read_to_string(path) {
        Ok(raw) => Ok(raw),
        Err(error) if error.kind() == io::ErrorKind::NotFound => {
            Err(ArtifactError::Missing(path.to_path_buf()))
        }
        Err(source) => Err(ArtifactError::Read { path: path.to_path_buf(), source }),
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::{json, Map};
    use tempfile::TempDir;

    use crate::domain::billing::BillingRecord;
    use crate::domain::profile::ProjectProfile;
    use crate::domain::report::OptimizationReport;

    use super::{ArtifactError, ArtifactKind, ArtifactStore};

    fn sample_profile() -> ProjectProfile {
        let mut tech_stack = Map::new();
        tech_stack.insert("frontend".to_string(), json!("react"));
        tech_stack.insert("database".to_string(), json!({"engine": "postgres", "ha": true}));
        ProjectProfile {
            name: "Clinic Scheduler".to_string(),
            budget_per_month: 45_000.5,
            description: "appointment booking for small clinics".to_string(),
            tech_stack,
            non_functional_requirements: vec!["HIPAA".to_string(), "p95 < 300ms".to_string()],
        }
    }

    fn sample_billing() -> Vec<BillingRecord> {
        vec![
            BillingRecord {
                month: Some(json!("2024-06")),
                service: Some(json!("compute")),
                resource_id: Some(json!("vm-web-01")),
                region: Some(json!("eu-west-1")),
                usage_quantity: Some(json!(720.0)),
                unit: Some(json!("hours")),
                cost: 12_400.25,
                description: Some(json!("web tier")),
                extra: Map::from_iter([("currency".to_string(), json!("INR"))]),
            },
            BillingRecord::new("storage", 800.0),
        ]
    }

    #[test]
    fn json_artifacts_round_trip_exactly() {
        let dir = TempDir::new().expect("temp dir");
        let store = ArtifactStore::new(dir.path());
        let profile = sample_profile();
        let billing = sample_billing();
        let report = OptimizationReport::from_extracted(json!({
            "recommendations": [{"title": "reserved instances", "estimated_savings": 3100.5}],
            "notes": null
        }))
        .expect("object report");

        store.save_profile(&profile).expect("save profile");
        store.save_billing(&billing).expect("save billing");
        store.save_report(&report).expect("save report");

        assert_eq!(store.load_profile().expect("load profile"), profile);
        assert_eq!(store.load_billing().expect("load billing"), billing);
        assert_eq!(store.load_report().expect("load report"), report);
    }

    #[test]
    fn missing_artifact_is_typed() {
        let dir = TempDir::new().expect("temp dir");
        let store = ArtifactStore::new(dir.path());

        let error = store.load_profile().expect_err("nothing stored yet");
        assert!(error.is_missing());
        assert!(!store.exists(ArtifactKind::Profile));
    }

    #[test]
    fn description_is_stored_verbatim_in_nested_workspace() {
        let dir = TempDir::new().expect("temp dir");
        let store = ArtifactStore::new(dir.path().join("nested").join("ws"));
        let text = "A food delivery app.\nBudget: 50k/month\n";

        store.save_description(text).expect("save description");
        assert_eq!(store.load_description().expect("load description"), text);
    }

    #[test]
    fn export_copies_report_with_timestamped_name() {
        let dir = TempDir::new().expect("temp dir");
        let store = ArtifactStore::new(dir.path());
        let report = OptimizationReport::from_extracted(json!({"recommendations": []}))
            .expect("object report");
        store.save_report(&report).expect("save report");

        let at = NaiveDate::from_ymd_opt(2024, 3, 9)
            .and_then(|date| date.and_hms_opt(14, 5, 7))
            .expect("valid timestamp");
        let exported = store.export_report_at(at).expect("export");

        assert!(exported.ends_with("exports/cost_optimization_report_20240309_140507.json"));
        let copied = std::fs::read_to_string(&exported).expect("read export");
        let original = std::fs::read_to_string(store.path_of(ArtifactKind::Report)).expect("read");
        assert_eq!(copied, original);
    }

    #[test]
    fn export_without_report_fails() {
        let dir = TempDir::new().expect("temp dir");
        let store = ArtifactStore::new(dir.path());

        assert!(matches!(store.export_report(), Err(ArtifactError::Missing(_))));
    }
}
