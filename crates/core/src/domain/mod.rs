pub mod billing;
pub mod profile;
pub mod report;
pub mod shape;
