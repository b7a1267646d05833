//! Credential loading from the runtime `.env` file and the process environment.
//!
//! API keys reach the transport only through a [`SecretProvider`]; nothing is
//! compiled into the binary.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use anyhow::Context;
use tracing::debug;

use crate::config::runtime_paths;

/// Credential key holding the OpenRouter API key.
pub const OPENROUTER_API_KEY: &str = "OPENROUTER_API_KEY";

/// Runtime credentials loaded from the `.env` file.
#[derive(Clone, Default)]
pub struct Credentials {
    vars: BTreeMap<String, String>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("keys", &self.vars.keys().collect::<Vec<_>>())
            .field("values", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// Build credentials from a key-value map.
    pub fn from_map(vars: BTreeMap<String, String>) -> Self {
        Self { vars }
    }

    /// Returns a credential value for a key, if present and non-blank.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }
}

/// Load credentials from a specific `.env` path.
///
/// # Errors
///
/// Returns an error if the file does not exist, permissions are too broad,
/// or parsing fails.
pub fn load_credentials(path: &Path) -> anyhow::Result<Credentials> {
    if !path.exists() {
        return Err(anyhow::anyhow!(
            "credentials file does not exist: {}",
            path.display()
        ));
    }

    validate_private_permissions(path)?;

    let mut vars = BTreeMap::new();
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("failed to read credentials at {}", path.display()))?;

    for item in iter {
        let (key, value) = item.with_context(|| {
            format!(
                "failed to parse key-value entry in credentials file {}",
                path.display()
            )
        })?;
        vars.insert(key, value);
    }

    Ok(Credentials { vars })
}

/// Load credentials from `~/.superexpat/.env`, or empty ones if the file is absent.
///
/// # Errors
///
/// Returns an error when runtime paths cannot be resolved or an existing
/// credentials file is invalid.
pub fn load_default_credentials() -> anyhow::Result<Credentials> {
    let paths = runtime_paths()?;
    if !paths.env_file.exists() {
        debug!(path = %paths.env_file.display(), "no credentials file, relying on environment");
        return Ok(Credentials::default());
    }
    load_credentials(&paths.env_file)
}

/// Restrict a file to owner read/write when supported.
///
/// # Errors
///
/// Returns an error if permissions cannot be updated.
pub fn enforce_private_file_permissions(path: &Path) -> anyhow::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;

        let perms = fs::Permissions::from_mode(0o600);
        fs::set_permissions(path, perms)
            .with_context(|| format!("failed to set permissions on {}", path.display()))?;
    }

    Ok(())
}

#[cfg(unix)]
fn validate_private_permissions(path: &Path) -> anyhow::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let metadata = fs::metadata(path)
        .with_context(|| format!("failed to inspect credentials file {}", path.display()))?;
    let mode = metadata.permissions().mode() & 0o777;

    if mode & 0o077 != 0 {
        return Err(anyhow::anyhow!(
            "credentials file {} must be 0600, found {:o}",
            path.display(),
            mode
        ));
    }

    Ok(())
}

#[cfg(not(unix))]
fn validate_private_permissions(_path: &Path) -> anyhow::Result<()> {
    Ok(())
}

// ---------------------------------------------------------------------------
// API keys
// ---------------------------------------------------------------------------

/// A bearer API key. `Debug` never prints the value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap a raw key.
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    /// The raw key, for building the `Authorization` header.
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ApiKey").field(&"[REDACTED]").finish()
    }
}

/// Source of secrets injected into the transport.
pub trait SecretProvider: Send + Sync {
    /// The completions API key, if one is configured.
    fn api_key(&self) -> Option<ApiKey>;
}

/// Resolves the API key from loaded `.env` credentials, then an environment
/// lookup.
pub struct CredentialSecrets<F = fn(&str) -> Option<String>> {
    credentials: Credentials,
    env: F,
}

impl CredentialSecrets {
    /// Resolve against `credentials`, falling back to the process environment.
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            env: |key| std::env::var(key).ok(),
        }
    }
}

impl<F> CredentialSecrets<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    /// Resolve against `credentials`, falling back to a custom lookup.
    pub fn with_env(credentials: Credentials, env: F) -> Self {
        Self { credentials, env }
    }
}

impl<F> std::fmt::Debug for CredentialSecrets<F> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialSecrets")
            .field("credentials", &self.credentials)
            .finish_non_exhaustive()
    }
}

impl<F> SecretProvider for CredentialSecrets<F>
where
    F: Fn(&str) -> Option<String> + Send + Sync,
{
    fn api_key(&self) -> Option<ApiKey> {
        if let Some(key) = self.credentials.get(OPENROUTER_API_KEY) {
            debug!("using {OPENROUTER_API_KEY} from .env");
            return Some(ApiKey::new(key));
        }

        (self.env)(OPENROUTER_API_KEY)
            .filter(|key| !key.trim().is_empty())
            .map(|key| {
                debug!("using {OPENROUTER_API_KEY} from environment");
                ApiKey::new(key)
            })
    }
}
