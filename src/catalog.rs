//! Static destination and topic catalogs.
//!
//! Both tables are fixed configuration, not user data. The category texts
//! are user-facing and must stay verbatim.

use crate::profile::{SelectedCategory, SelectedCountry};

// ---------------------------------------------------------------------------
// Countries
// ---------------------------------------------------------------------------

/// A destination the app supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CountryEntry {
    /// ISO 3166-1 alpha-2 code.
    pub code: &'static str,
    /// Display name.
    pub name: &'static str,
    /// Flag emoji.
    pub flag: &'static str,
}

impl CountryEntry {
    /// Owned selection value for persisting or starting a session.
    pub fn to_selection(&self) -> SelectedCountry {
        SelectedCountry {
            code: self.code.to_owned(),
            name: self.name.to_owned(),
            flag: self.flag.to_owned(),
        }
    }
}

/// Supported destinations, in display order.
pub const COUNTRIES: &[CountryEntry] = &[
    CountryEntry {
        code: "US",
        name: "United States",
        flag: "🇺🇸",
    },
    CountryEntry {
        code: "GB",
        name: "United Kingdom",
        flag: "🇬🇧",
    },
    CountryEntry {
        code: "CN",
        name: "China",
        flag: "🇨🇳",
    },
    CountryEntry {
        code: "NL",
        name: "Netherlands",
        flag: "🇳🇱",
    },
    CountryEntry {
        code: "ID",
        name: "Indonesia",
        flag: "🇮🇩",
    },
];

/// Look a destination up by its code (case-insensitive).
pub fn country_by_code(code: &str) -> Option<&'static CountryEntry> {
    let code = code.trim();
    COUNTRIES.iter().find(|c| c.code.eq_ignore_ascii_case(code))
}

/// Destinations whose name contains `query`, ignoring case.
///
/// An empty query matches everything.
pub fn search_countries(query: &str) -> Vec<&'static CountryEntry> {
    let needle = query.trim().to_lowercase();
    COUNTRIES
        .iter()
        .filter(|c| c.name.to_lowercase().contains(&needle))
        .collect()
}

// ---------------------------------------------------------------------------
// Categories
// ---------------------------------------------------------------------------

/// A chat topic with its three suggestion shortcuts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CategoryEntry {
    /// Stable key, also the persisted identifier.
    pub key: &'static str,
    /// English label.
    pub label: &'static str,
    /// Icon emoji.
    pub icon: &'static str,
    /// Suggested questions, in display order.
    pub suggested_questions: [&'static str; 3],
}

impl CategoryEntry {
    /// Owned selection value for persisting or starting a session.
    pub fn to_selection(&self) -> SelectedCategory {
        SelectedCategory {
            key: self.key.to_owned(),
            label: self.label.to_owned(),
            icon: self.icon.to_owned(),
            suggested_questions: self
                .suggested_questions
                .iter()
                .map(|q| (*q).to_owned())
                .collect(),
        }
    }
}

/// All chat topics, in display order.
pub const CATEGORIES: &[CategoryEntry] = &[
    CategoryEntry {
        key: "everything",
        label: "Everything",
        icon: "🌍",
        suggested_questions: [
            "Tell me everything I need to know about moving here",
            "What are the main challenges I should prepare for?",
            "What's the first thing I should do after arriving?",
        ],
    },
    CategoryEntry {
        key: "cost_of_living",
        label: "Cost of Living",
        icon: "💰",
        suggested_questions: [
            "What's the average monthly cost for a family?",
            "How much should I budget for housing?",
            "What are typical utility costs?",
        ],
    },
    CategoryEntry {
        key: "climate",
        label: "Climate",
        icon: "☀️",
        suggested_questions: [
            "What's the weather like throughout the year?",
            "When is the best time to visit?",
            "How severe are the seasons?",
        ],
    },
    CategoryEntry {
        key: "internet_quality",
        label: "Internet Quality",
        icon: "🌐",
        suggested_questions: [
            "What's the average internet speed?",
            "Which are the best internet providers?",
            "How much does good internet cost?",
        ],
    },
    CategoryEntry {
        key: "safety",
        label: "Safety",
        icon: "🛡️",
        suggested_questions: [
            "Which are the safest neighborhoods?",
            "How's the crime rate in different areas?",
            "What safety precautions should I take?",
        ],
    },
    CategoryEntry {
        key: "visa_administration",
        label: "Visa / Administration",
        icon: "📝",
        suggested_questions: [
            "What type of visa do I need?",
            "How long does the visa process take?",
            "What documents are required?",
        ],
    },
    CategoryEntry {
        key: "schooling",
        label: "Schooling",
        icon: "🎓",
        suggested_questions: [
            "What are the best international schools?",
            "How does the local education system work?",
            "What are the school fees like?",
        ],
    },
    CategoryEntry {
        key: "health",
        label: "Health",
        icon: "🏥",
        suggested_questions: [
            "How does the healthcare system work?",
            "What insurance do I need?",
            "Where are the best hospitals?",
        ],
    },
    CategoryEntry {
        key: "taxes",
        label: "Taxes & Fiscality",
        icon: "📊",
        suggested_questions: [
            "What's the tax system like?",
            "Do I need to pay taxes in both countries?",
            "Are there any tax benefits for expats?",
        ],
    },
    CategoryEntry {
        key: "employment",
        label: "Employment",
        icon: "💼",
        suggested_questions: [
            "How's the job market for expats?",
            "What's the average salary in my field?",
            "Do I need a work permit?",
        ],
    },
    CategoryEntry {
        key: "housing_availability",
        label: "Housing",
        icon: "🏠",
        suggested_questions: [
            "What are the best areas to live in?",
            "How does the rental process work?",
            "What documents do I need to rent?",
        ],
    },
];

/// Look a topic up by its key.
pub fn category_by_key(key: &str) -> Option<&'static CategoryEntry> {
    let key = key.trim();
    CATEGORIES.iter().find(|c| c.key == key)
}
