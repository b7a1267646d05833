//! System prompt assembly for the expatriation assistant.
//!
//! The prompt is rebuilt for every exchange so a country switch mid-session
//! shows up on the next message. Missing onboarding answers degrade to
//! placeholders; building a prompt never fails.

use crate::profile::{SelectedCategory, SelectedCountry, SessionContext, UserProfile};

/// Suggestions offered when no topic was chosen.
pub const FALLBACK_SUGGESTED_QUESTIONS: [&str; 3] = [
    "What should I know about this topic?",
    "What are the main challenges?",
    "What are the best resources for more information?",
];

const ASSISTANT_ROLE: &str = "You are an expert expatriation assistant.";
const GENERIC_TOPIC: &str = "general expatriation questions";
const UNKNOWN_COUNTRY: &str = "your destination country";
const UNKNOWN_PROFILE: &str = "not provided";

/// Build the system instruction from whatever onboarding produced.
pub fn build_system_prompt(
    profile: Option<&UserProfile>,
    country: Option<&SelectedCountry>,
    category: Option<&SelectedCategory>,
) -> String {
    let topic = category
        .map(|c| c.label.trim())
        .filter(|label| !label.is_empty())
        .unwrap_or(GENERIC_TOPIC);

    let destination = country
        .map(|c| c.name.trim())
        .filter(|name| !name.is_empty())
        .unwrap_or(UNKNOWN_COUNTRY);

    format!(
        "{ASSISTANT_ROLE} The user is interested in {topic} in {destination}.\n\
         Their profile: {}",
        render_profile(profile)
    )
}

/// Convenience wrapper over [`build_system_prompt`] for a whole context.
pub fn build_for_context(context: &SessionContext) -> String {
    build_system_prompt(
        context.profile.as_ref(),
        context.country.as_ref(),
        context.category.as_ref(),
    )
}

/// Suggestions for the active topic, or the generic fallback.
pub fn suggested_questions(category: Option<&SelectedCategory>) -> Vec<String> {
    match category {
        Some(c) if !c.suggested_questions.is_empty() => c.suggested_questions.clone(),
        _ => FALLBACK_SUGGESTED_QUESTIONS
            .iter()
            .map(|q| (*q).to_owned())
            .collect(),
    }
}

fn render_profile(profile: Option<&UserProfile>) -> String {
    let Some(profile) = profile.filter(|p| !p.is_blank()) else {
        return UNKNOWN_PROFILE.to_owned();
    };
    serde_json::to_string(profile).unwrap_or_else(|_| UNKNOWN_PROFILE.to_owned())
}
