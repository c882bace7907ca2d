mod billing;
mod profile;
mod report;

pub use billing::BillingSynthesizer;
pub use profile::ProfileExtractor;
pub use report::{ReportGenerator, REPORT_SAMPLE_SIZE};
