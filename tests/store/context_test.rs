//! Building a session context from stored onboarding answers.

use serde_json::json;

use superexpat::profile::{PersonalSituation, SelectedCountry};
use superexpat::store::{
    load_context, read_entry, write_entry, FileStore, MemoryStore, ProfileStore,
    SELECTED_CATEGORY_KEY, SELECTED_COUNTRY_KEY, USER_PROFILE_KEY,
};

#[tokio::test]
async fn empty_store_gives_empty_context() {
    let store = MemoryStore::new();
    let context = load_context(&store).await;
    assert!(context.profile.is_none());
    assert!(context.country.is_none());
    assert!(context.category.is_none());
}

#[tokio::test]
async fn reads_the_persisted_layout() {
    let store = MemoryStore::new();
    store
        .set(
            SELECTED_COUNTRY_KEY,
            json!({"code": "ID", "name": "Indonesia", "flag": "🇮🇩"}),
        )
        .await
        .expect("write ok");
    store
        .set(
            SELECTED_CATEGORY_KEY,
            json!({
                "key": "climate",
                "label_en": "Climate",
                "icon": "☀️",
                "suggestedQuestions": ["a", "b", "c"]
            }),
        )
        .await
        .expect("write ok");
    store
        .set(
            USER_PROFILE_KEY,
            json!({
                "ageGroup": "",
                "personalSituation": "Single",
                "professionalStatus": "",
                "duration": "",
                "mainConcerns": ""
            }),
        )
        .await
        .expect("write ok");

    let context = load_context(&store).await;
    assert_eq!(context.country.as_ref().map(|c| c.code.as_str()), Some("ID"));
    let category = context.category.expect("category loaded");
    assert_eq!(category.label, "Climate");
    assert_eq!(category.suggested_questions, vec!["a", "b", "c"]);
    let profile = context.profile.expect("profile loaded");
    assert_eq!(profile.personal_situation, Some(PersonalSituation::Single));
    assert!(profile.age_group.is_none());
}

#[tokio::test]
async fn undecodable_entries_degrade_to_absent() {
    let store = MemoryStore::new();
    store
        .set(SELECTED_COUNTRY_KEY, json!("just a string"))
        .await
        .expect("write ok");
    store
        .set(USER_PROFILE_KEY, json!({"ageGroup": "unknown bracket"}))
        .await
        .expect("write ok");

    let context = load_context(&store).await;
    assert!(context.country.is_none());
    assert!(context.profile.is_none());
}

#[tokio::test]
async fn unreadable_file_degrades_to_empty_context() {
    let tmp = tempfile::tempdir().expect("should create temp dir");
    let path = tmp.path().join("state.json");
    std::fs::write(&path, "garbage").expect("seed file");

    let context = load_context(&FileStore::new(path)).await;
    assert_eq!(context, Default::default());
}

#[tokio::test]
async fn typed_round_trip_through_helpers() {
    let store = MemoryStore::new();
    let country = SelectedCountry {
        code: "GB".to_owned(),
        name: "United Kingdom".to_owned(),
        flag: "🇬🇧".to_owned(),
    };
    write_entry(&store, SELECTED_COUNTRY_KEY, &country)
        .await
        .expect("write ok");

    let read: Option<SelectedCountry> = read_entry(&store, SELECTED_COUNTRY_KEY).await;
    assert_eq!(read, Some(country));
}
