//! Cost-analysis agent: structured LLM calls and the three-stage pipeline.
//!
//! The crate turns free-form project text into a cost-optimization report:
//! 1. **Profile extraction** (`ProfileExtractor`) - description -> `ProjectProfile`
//! 2. **Billing synthesis** (`BillingSynthesizer`) - profile -> synthetic billing ledger
//! 3. **Report generation** (`ReportGenerator`) - local aggregation, then recommendations
//!
//! # Key Types
//!
//! - `LlmClient` - Pluggable chat-completion backend (HTTPS or scripted)
//! - `StructuredLlmClient` - Shape-checked JSON queries with model fallback and retries
//! - `Pipeline` - Chains the stages and attributes failures to the stage that raised them
//!
//! # Safety Principle
//!
//! Arithmetic never goes through the model. Totals, variance and per-service costs
//! are computed locally from the ledger before the report prompt is built.

pub mod llm;
pub mod pipeline;
pub mod prompts;
pub mod stages;
pub mod structured;

pub use llm::{ChatCompletionsClient, ChatRequest, LlmClient, LlmSetupError, ScriptedLlmClient};
pub use pipeline::{AnalysisOutcome, Pipeline};
pub use structured::{StructuredLlmClient, StructuredSettings};
