//! Strict structured-output gate over an [`LlmClient`].
//!
//! A reply is accepted only when its trimmed text is bracketed by the expected shape's
//! delimiters, parses as JSON, and decodes to that shape. Nothing is repaired or extracted
//! from surrounding prose; a rejected reply costs one attempt and the next one starts fresh.

use costpilot_core::config::LlmConfig;
use costpilot_core::domain::shape::{value_kind, JsonShape};
use costpilot_core::errors::{AttemptError, ExtractionError};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::llm::{preview, ChatRequest, LlmClient};

pub const DEFAULT_MAX_TOKENS: u32 = 1500;

const RAW_PREVIEW_CHARS: usize = 300;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StructuredSettings {
    pub candidates: Vec<String>,
    pub max_attempts: u32,
    pub max_tokens: u32,
}

impl StructuredSettings {
    pub fn new(candidates: Vec<String>, max_attempts: u32) -> Self {
        Self { candidates, max_attempts, max_tokens: DEFAULT_MAX_TOKENS }
    }

    pub fn from_config(config: &LlmConfig) -> Self {
        Self {
            candidates: config.models.clone(),
            max_attempts: config.max_attempts,
            max_tokens: config.max_tokens,
        }
    }
}

/// Every attempt for the first candidate, then every attempt for the next, and so on.
pub fn attempt_schedule(
    candidates: &[String],
    max_attempts: u32,
) -> impl Iterator<Item = (&str, u32)> + '_ {
    candidates
        .iter()
        .flat_map(move |candidate| {
            (1..=max_attempts).map(move |attempt| (candidate.as_str(), attempt))
        })
}

pub fn output_guard(shape: JsonShape) -> String {
    format!(
        "You are a strict JSON generator.\n\
         Return ONLY a valid JSON {}.\n\
         No markdown.\n\
         No explanations.\n\
         No trailing commas.\n\
         No comments.\n",
        shape.as_str().to_ascii_uppercase()
    )
}

/// Surface check, strict parse, then kind check.
pub fn parse_structured(raw: &str, shape: JsonShape) -> Result<Value, AttemptError> {
    let text = raw.trim();
    let (open, close) = shape.delimiters();
    if !(text.starts_with(open) && text.ends_with(close)) {
        return Err(AttemptError::malformed(format!(
            "reply is not bracketed as a JSON {shape} (truncated or wrapped output)"
        )));
    }

    let value = serde_json::from_str::<Value>(text)
        .map_err(|error| AttemptError::malformed(format!("invalid JSON: {error}")))?;
    check_kind(value, shape)
}

pub fn check_kind(value: Value, shape: JsonShape) -> Result<Value, AttemptError> {
    if shape.matches(&value) {
        Ok(value)
    } else {
        Err(AttemptError::KindMismatch { expected: shape, found: value_kind(&value) })
    }
}

pub struct StructuredLlmClient<C> {
    client: C,
    settings: StructuredSettings,
}

impl<C> StructuredLlmClient<C>
where
    C: LlmClient,
{
    pub fn new(client: C, settings: StructuredSettings) -> Self {
        Self { client, settings }
    }

    pub async fn query(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        shape: JsonShape,
    ) -> Result<Value, ExtractionError> {
        self.query_with_attempts(system_prompt, user_prompt, shape, self.settings.max_attempts)
            .await
    }

    /// Walks the candidate x attempt schedule until one reply passes the gate.
    pub async fn query_with_attempts(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        shape: JsonShape,
        max_attempts: u32,
    ) -> Result<Value, ExtractionError> {
        let system = format!("{}\n{}", output_guard(shape), system_prompt);
        let mut attempts = 0;
        let mut last_failure = None;

        for (model, attempt) in attempt_schedule(&self.settings.candidates, max_attempts) {
            attempts += 1;
            let request =
                ChatRequest::new(model, system.as_str(), user_prompt, self.settings.max_tokens);
            debug!(
                event_name = "llm.attempt.start",
                model,
                attempt,
                shape = %shape,
                "requesting structured output"
            );

            match self.attempt(&request, shape).await {
                Ok(value) => {
                    info!(
                        event_name = "llm.attempt.succeeded",
                        model,
                        attempt,
                        "structured output accepted"
                    );
                    return Ok(value);
                }
                Err(failure) => {
                    warn!(
                        event_name = "llm.attempt.failed",
                        model,
                        attempt,
                        failure_kind = failure.kind(),
                        error = %failure,
                        "attempt rejected"
                    );
                    last_failure = Some(failure);
                }
            }
        }

        warn!(event_name = "llm.retries.exhausted", attempts, "no viable structured response");
        Err(ExtractionError::ExhaustedRetries { attempts, last_failure })
    }

    async fn attempt(
        &self,
        request: &ChatRequest,
        shape: JsonShape,
    ) -> Result<Value, AttemptError> {
        let raw = self.client.complete(request).await?;
        debug!(
            event_name = "llm.attempt.raw_output",
            model = %request.model,
            preview = %preview(raw.trim(), RAW_PREVIEW_CHARS),
            "raw model output"
        );
        parse_structured(&raw, shape)
    }
}
