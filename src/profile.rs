//! Onboarding answers and selections carried into a chat session.
//!
//! The JSON shapes here are the persisted layout: camelCase profile keys,
//! `label_en` on categories, and `""` for a questionnaire answer the user
//! skipped.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Profile answers
// ---------------------------------------------------------------------------

/// Age bracket chosen in the profile questionnaire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgeGroup {
    /// 18 to 24.
    #[serde(rename = "18-24")]
    From18To24,
    /// 25 to 34.
    #[serde(rename = "25-34")]
    From25To34,
    /// 35 to 44.
    #[serde(rename = "35-44")]
    From35To44,
    /// 45 to 60.
    #[serde(rename = "45-60")]
    From45To60,
    /// Over 60.
    #[serde(rename = "60+")]
    Over60,
}

/// Household the user is moving with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PersonalSituation {
    /// Moving alone.
    Single,
    /// Moving as a couple.
    Couple,
    /// Moving with a family.
    Family,
}

/// Working status at the destination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProfessionalStatus {
    /// Student.
    Student,
    /// Salaried employee.
    Employed,
    /// Freelancer or business owner.
    #[serde(rename = "Self-employed")]
    SelfEmployed,
    /// Retired.
    Retired,
}

/// How long the user plans to stay abroad.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlannedDuration {
    /// A temporary assignment.
    #[serde(rename = "Short-term")]
    ShortTerm,
    /// Several years.
    #[serde(rename = "Long-term")]
    LongTerm,
    /// No plan to return.
    Permanent,
}

/// Questionnaire answers from profile setup.
///
/// Every field may be absent: the questionnaire lets users continue without
/// answering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Age bracket.
    #[serde(default, with = "blank_as_none")]
    pub age_group: Option<AgeGroup>,
    /// Household situation.
    #[serde(default, with = "blank_as_none")]
    pub personal_situation: Option<PersonalSituation>,
    /// Working status.
    #[serde(default, with = "blank_as_none")]
    pub professional_status: Option<ProfessionalStatus>,
    /// Planned length of stay.
    #[serde(default, with = "blank_as_none")]
    pub duration: Option<PlannedDuration>,
    /// Free-text concerns; empty when not provided.
    #[serde(default)]
    pub main_concerns: String,
}

impl UserProfile {
    /// Whether no question was answered.
    pub fn is_blank(&self) -> bool {
        self.age_group.is_none()
            && self.personal_situation.is_none()
            && self.professional_status.is_none()
            && self.duration.is_none()
            && self.main_concerns.trim().is_empty()
    }
}

/// Serde adapter mapping the questionnaire's `""` (skipped) to `None`.
mod blank_as_none {
    use serde::de::value::StringDeserializer;
    use serde::de::{DeserializeOwned, IntoDeserializer};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<T, S>(value: &Option<T>, serializer: S) -> Result<S::Ok, S::Error>
    where
        T: Serialize,
        S: Serializer,
    {
        match value {
            Some(inner) => inner.serialize(serializer),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
    where
        T: DeserializeOwned,
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw {
            None => Ok(None),
            Some(s) if s.trim().is_empty() => Ok(None),
            Some(s) => {
                let de: StringDeserializer<D::Error> = s.into_deserializer();
                T::deserialize(de).map(Some)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Selections
// ---------------------------------------------------------------------------

/// Destination country picked by the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedCountry {
    /// ISO 3166-1 alpha-2 code.
    pub code: String,
    /// Display name.
    pub name: String,
    /// Flag emoji.
    pub flag: String,
}

/// Topic picked for the chat, with its suggestion shortcuts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedCategory {
    /// Stable catalog key (e.g. `cost_of_living`).
    pub key: String,
    /// English label.
    #[serde(rename = "label_en")]
    pub label: String,
    /// Icon emoji.
    pub icon: String,
    /// Suggested questions, in display order.
    #[serde(rename = "suggestedQuestions", default)]
    pub suggested_questions: Vec<String>,
}

// ---------------------------------------------------------------------------
// Session context
// ---------------------------------------------------------------------------

/// Everything the assistant knows about the user when a chat starts.
///
/// Built once (usually from [`crate::store::load_context`]) and moved into
/// [`crate::session::AssistantSession::new`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionContext {
    /// Questionnaire answers, if onboarding got that far.
    pub profile: Option<UserProfile>,
    /// Destination country.
    pub country: Option<SelectedCountry>,
    /// Chat topic.
    pub category: Option<SelectedCategory>,
}
