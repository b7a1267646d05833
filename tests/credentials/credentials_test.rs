//! Coverage for credential loading, permission checks and key resolution.

use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;

use superexpat::credentials::{
    enforce_private_file_permissions, load_credentials, ApiKey, CredentialSecrets, Credentials,
    SecretProvider, OPENROUTER_API_KEY,
};

fn temp_env_path() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("superexpat_test_{}", uuid::Uuid::new_v4()));
    let create = fs::create_dir_all(&dir);
    assert!(create.is_ok());
    dir.join(".env")
}

fn credentials_with(key: &str) -> Credentials {
    let mut vars = BTreeMap::new();
    vars.insert(OPENROUTER_API_KEY.to_owned(), key.to_owned());
    Credentials::from_map(vars)
}

#[test]
fn loads_env_credentials() {
    let env_path = temp_env_path();
    let write = fs::write(&env_path, "OPENROUTER_API_KEY=sk-or-v1-test\nOTHER=value\n");
    assert!(write.is_ok());
    assert!(enforce_private_file_permissions(&env_path).is_ok());

    let credentials = match load_credentials(&env_path) {
        Ok(credentials) => credentials,
        Err(err) => panic!("credentials should load: {err}"),
    };
    assert_eq!(credentials.get(OPENROUTER_API_KEY), Some("sk-or-v1-test"));
    assert_eq!(credentials.get("OTHER"), Some("value"));
    assert_eq!(credentials.get("MISSING"), None);
}

#[test]
fn missing_file_is_an_error() {
    let env_path = temp_env_path();
    assert!(load_credentials(&env_path).is_err());
}

#[cfg(unix)]
#[test]
fn rejects_world_readable_env_file() {
    use std::os::unix::fs::PermissionsExt;

    let env_path = temp_env_path();
    assert!(fs::write(&env_path, "OPENROUTER_API_KEY=sk-or-v1-test\n").is_ok());
    assert!(fs::set_permissions(&env_path, fs::Permissions::from_mode(0o644)).is_ok());

    assert!(load_credentials(&env_path).is_err());
}

#[test]
fn dotenv_value_wins_over_environment() {
    let secrets = CredentialSecrets::with_env(credentials_with("from-file"), |_key: &str| {
        Some("from-env".to_owned())
    });
    let key = secrets.api_key().expect("key resolved");
    assert_eq!(key.expose(), "from-file");
}

#[test]
fn blank_dotenv_value_falls_back_to_environment() {
    let secrets = CredentialSecrets::with_env(credentials_with("   "), |key: &str| {
        (key == OPENROUTER_API_KEY).then(|| "from-env".to_owned())
    });
    let key = secrets.api_key().expect("key resolved");
    assert_eq!(key.expose(), "from-env");
}

#[test]
fn no_key_anywhere_resolves_to_none() {
    let secrets = CredentialSecrets::with_env(Credentials::default(), |_key: &str| {
        Some(String::new())
    });
    assert!(secrets.api_key().is_none());
}

#[test]
fn debug_output_never_contains_secrets() {
    let key = ApiKey::new("sk-or-v1-supersecret");
    assert!(!format!("{key:?}").contains("supersecret"));

    let credentials = credentials_with("sk-or-v1-supersecret");
    let rendered = format!("{credentials:?}");
    assert!(rendered.contains(OPENROUTER_API_KEY));
    assert!(!rendered.contains("supersecret"));
}
