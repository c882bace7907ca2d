use costpilot_core::domain::billing::{BillingRecord, BILLING_RECORD_COUNT};
use costpilot_core::domain::profile::ProjectProfile;
use costpilot_core::spending::SpendingSummary;
use serde::Serialize;

pub const PROFILE_SYSTEM_PROMPT: &str =
    "You are a Cloud Architect. Extract project details into a STRICT JSON object. \
     Return ONLY valid JSON. No markdown. No explanations.";

pub const BILLING_SYSTEM_PROMPT: &str = "You are a Cloud Billing Generator.\n\
Return ONLY a valid JSON ARRAY.\n\
Do NOT truncate output.";

pub const REPORT_SYSTEM_PROMPT: &str =
    "You are a Senior FinOps Consultant. Return STRICT JSON only.";

pub fn profile_prompt(description: &str) -> String {
    format!(
        "Analyze the following project description and extract these fields:\n\
         - name (string)\n\
         - budget_per_month (number)\n\
         - description (cleaned string)\n\
         - tech_stack (object mapping component to technology choice)\n\
         - non_functional_requirements (array of strings)\n\
         \n\
         Input Text:\n\
         \"{description}\"\n"
    )
}

pub fn billing_prompt(profile: &ProjectProfile) -> String {
    format!(
        "Generate EXACTLY {BILLING_RECORD_COUNT} billing records.\n\
         \n\
         Tech Stack: {tech_stack}\n\
         Monthly Budget: {budget}\n\
         \n\
         Each record MUST follow this schema:\n\
         {{\n\
         \x20 \"month\": \"YYYY-MM\",\n\
         \x20 \"service\": \"string\",\n\
         \x20 \"resource_id\": \"string\",\n\
         \x20 \"region\": \"string\",\n\
         \x20 \"usage_quantity\": number,\n\
         \x20 \"unit\": \"string\",\n\
         \x20 \"cost\": number,\n\
         \x20 \"description\": \"string\"\n\
         }}\n\
         \n\
         Return ONLY the JSON array.\n",
        tech_stack = compact(&profile.tech_stack),
        budget = profile.budget_per_month,
    )
}

pub fn report_prompt(
    profile: &ProjectProfile,
    summary: &SpendingSummary,
    sample: &[BillingRecord],
) -> String {
    format!(
        "Project Profile:\n{profile}\n\n\
         Spending Analysis:\n{summary}\n\n\
         Billing Sample:\n{sample}\n\n\
         Generate a Cost Optimization Report with 4-6 recommendations.\n",
        profile = pretty(profile),
        summary = pretty(summary),
        sample = pretty(sample),
    )
}

fn compact<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|error| format!("<unserializable: {error}>"))
}

fn pretty<T: Serialize + ?Sized>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|error| format!("<unserializable: {error}>"))
}
