use costpilot_core::domain::profile::ProjectProfile;
use costpilot_core::domain::shape::JsonShape;
use costpilot_core::errors::StageError;

use crate::llm::LlmClient;
use crate::prompts::{profile_prompt, PROFILE_SYSTEM_PROMPT};
use crate::structured::StructuredLlmClient;

/// Turns free-text project descriptions into a [`ProjectProfile`].
///
/// A missing field is a hard failure; the client's retry budget is not spent again on it.
pub struct ProfileExtractor<'a, C> {
    client: &'a StructuredLlmClient<C>,
}

impl<'a, C> ProfileExtractor<'a, C>
where
    C: LlmClient,
{
    pub fn new(client: &'a StructuredLlmClient<C>) -> Self {
        Self { client }
    }

    pub async fn extract(&self, description: &str) -> Result<ProjectProfile, StageError> {
        let value = self
            .client
            .query(PROFILE_SYSTEM_PROMPT, &profile_prompt(description), JsonShape::Object)
            .await?;
        ProjectProfile::from_extracted(value)
    }
}
