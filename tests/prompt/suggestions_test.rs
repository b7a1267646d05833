//! Suggested-question lookup.

use superexpat::catalog;
use superexpat::profile::SelectedCategory;
use superexpat::prompt::suggested_questions;

#[test]
fn no_category_returns_fallback() {
    assert_eq!(
        suggested_questions(None),
        vec![
            "What should I know about this topic?",
            "What are the main challenges?",
            "What are the best resources for more information?",
        ]
    );
}

#[test]
fn category_questions_are_returned_verbatim() {
    let category = catalog::category_by_key("employment")
        .expect("catalog has employment")
        .to_selection();
    assert_eq!(
        suggested_questions(Some(&category)),
        vec![
            "How's the job market for expats?",
            "What's the average salary in my field?",
            "Do I need a work permit?",
        ]
    );
}

#[test]
fn category_without_questions_returns_fallback() {
    let category = SelectedCategory {
        key: "custom".to_owned(),
        label: "Custom".to_owned(),
        icon: "❓".to_owned(),
        suggested_questions: vec![],
    };
    assert_eq!(suggested_questions(Some(&category)).len(), 3);
    assert_eq!(
        suggested_questions(Some(&category))[0],
        "What should I know about this topic?"
    );
}
