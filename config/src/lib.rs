//! Configuration loading and resolution.
//!
//! Raw TOML lands in [`FinapticoConfig`] (every field optional); the CLI
//! resolves it against environment overrides into a [`ResolvedConfig`] whose
//! existence proves the required pieces are present. Secrets (anon key,
//! password) never appear in `Debug` output, and the password is accepted
//! from the environment only, never from the file.
//!
//! ```toml
//! # ~/.finaptico/config.toml
//! [supabase]
//! url = "https://abc.supabase.co"
//! anon_key = "sb_publishable_..."
//!
//! [auth]
//! email = "ana@finaptico.example"
//!
//! [app]
//! high_contrast = false
//! ascii_only = false
//! refresh_secs = 60
//! client = "CLIENT_001"
//! ```

use std::{
    env, fs,
    path::{Path, PathBuf},
};

use serde::Deserialize;

use finaptico_types::ClientCode;

pub const ENV_SUPABASE_URL: &str = "FINAPTICO_SUPABASE_URL";
pub const ENV_SUPABASE_ANON_KEY: &str = "FINAPTICO_SUPABASE_ANON_KEY";
pub const ENV_EMAIL: &str = "FINAPTICO_EMAIL";
pub const ENV_PASSWORD: &str = "FINAPTICO_PASSWORD";

/// Cards refetch no more often than this unless forced.
const DEFAULT_REFRESH_SECS: u64 = 60;

#[derive(Debug, Default, Deserialize)]
pub struct FinapticoConfig {
    pub supabase: Option<SupabaseSection>,
    pub app: Option<AppSection>,
    pub auth: Option<AuthSection>,
}

#[derive(Default, Deserialize)]
pub struct SupabaseSection {
    pub url: Option<String>,
    pub anon_key: Option<String>,
}

// Manual Debug impl to prevent leaking the anon key in logs.
impl std::fmt::Debug for SupabaseSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let key = if self.anon_key.is_some() { "[REDACTED]" } else { "None" };
        f.debug_struct("SupabaseSection")
            .field("url", &self.url)
            .field("anon_key", &key)
            .finish()
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppSection {
    /// Use a high-contrast palette.
    #[serde(default)]
    pub high_contrast: bool,
    /// ASCII-only glyphs for terminals without good unicode fonts.
    #[serde(default)]
    pub ascii_only: bool,
    /// Card staleness window in seconds.
    pub refresh_secs: Option<u64>,
    /// Client to select at startup (advisors only; clients get their own).
    pub client: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AuthSection {
    pub email: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl FinapticoConfig {
    /// `~/.finaptico/config.toml`.
    #[must_use]
    pub fn path() -> Option<PathBuf> {
        Some(data_dir()?.join("config.toml"))
    }

    /// Load the config file. `Ok(None)` when it doesn't exist.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let Some(path) = Self::path() else {
            return Ok(None);
        };
        Self::load_from(&path)
    }

    pub fn load_from(path: &Path) -> Result<Option<Self>, ConfigError> {
        let contents = match fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        let config = toml::from_str(&contents).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(Some(config))
    }
}

/// `~/.finaptico`.
#[must_use]
pub fn data_dir() -> Option<PathBuf> {
    Some(dirs::home_dir()?.join(".finaptico"))
}

/// Where the auth session is cached between runs.
#[must_use]
pub fn session_path() -> Option<PathBuf> {
    Some(data_dir()?.join("session.json"))
}

#[derive(Debug, thiserror::Error)]
pub enum ResolveError {
    #[error("supabase url missing: set [supabase].url or {ENV_SUPABASE_URL}")]
    MissingUrl,
    #[error("supabase anon key missing: set [supabase].anon_key or {ENV_SUPABASE_ANON_KEY}")]
    MissingAnonKey,
}

/// Fully-resolved runtime settings: file values overridden by environment.
pub struct ResolvedConfig {
    pub supabase_url: String,
    pub anon_key: String,
    pub email: Option<String>,
    pub password: Option<String>,
    pub high_contrast: bool,
    pub ascii_only: bool,
    pub refresh_secs: u64,
    pub default_client: Option<ClientCode>,
}

// Manual Debug impl: the anon key and password stay out of logs.
impl std::fmt::Debug for ResolvedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn mask(opt: Option<&String>) -> &'static str {
            if opt.is_some() { "[REDACTED]" } else { "None" }
        }
        f.debug_struct("ResolvedConfig")
            .field("supabase_url", &self.supabase_url)
            .field("anon_key", &"[REDACTED]")
            .field("email", &self.email)
            .field("password", &mask(self.password.as_ref()))
            .field("high_contrast", &self.high_contrast)
            .field("ascii_only", &self.ascii_only)
            .field("refresh_secs", &self.refresh_secs)
            .field("default_client", &self.default_client)
            .finish()
    }
}

impl ResolvedConfig {
    /// Merge file config and environment. Environment wins.
    pub fn resolve(config: Option<&FinapticoConfig>) -> Result<Self, ResolveError> {
        let supabase = config.and_then(|c| c.supabase.as_ref());
        let app = config.and_then(|c| c.app.as_ref());
        let auth = config.and_then(|c| c.auth.as_ref());

        let supabase_url = env_non_empty(ENV_SUPABASE_URL)
            .or_else(|| supabase.and_then(|s| s.url.clone()))
            .ok_or(ResolveError::MissingUrl)?;
        let anon_key = env_non_empty(ENV_SUPABASE_ANON_KEY)
            .or_else(|| supabase.and_then(|s| s.anon_key.clone()))
            .ok_or(ResolveError::MissingAnonKey)?;

        let email = env_non_empty(ENV_EMAIL).or_else(|| auth.and_then(|a| a.email.clone()));
        let password = env_non_empty(ENV_PASSWORD);

        Ok(Self {
            supabase_url,
            anon_key,
            email,
            password,
            high_contrast: app.is_some_and(|a| a.high_contrast),
            ascii_only: app.is_some_and(|a| a.ascii_only),
            refresh_secs: app
                .and_then(|a| a.refresh_secs)
                .unwrap_or(DEFAULT_REFRESH_SECS),
            default_client: app
                .and_then(|a| a.client.as_deref())
                .map(ClientCode::new),
        })
    }
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::{ConfigError, FinapticoConfig, ResolveError, ResolvedConfig};

    fn write_config(contents: &str) -> (tempfile::TempDir, std::path::PathBuf) {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).expect("create");
        file.write_all(contents.as_bytes()).expect("write");
        (dir, path)
    }

    #[test]
    fn missing_file_is_none() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("nope.toml");
        let config = FinapticoConfig::load_from(&path).expect("load");
        assert!(config.is_none());
    }

    #[test]
    fn full_file_parses() {
        let (_dir, path) = write_config(
            r#"
            [supabase]
            url = "https://abc.supabase.co"
            anon_key = "sb_publishable_x"

            [auth]
            email = "ana@finaptico.example"

            [app]
            high_contrast = true
            refresh_secs = 120
            client = "CLIENT_002"
            "#,
        );

        let config = FinapticoConfig::load_from(&path).expect("load").expect("some");
        let resolved = ResolvedConfig::resolve(Some(&config)).expect("resolve");

        assert_eq!(resolved.supabase_url, "https://abc.supabase.co");
        assert_eq!(resolved.email.as_deref(), Some("ana@finaptico.example"));
        assert!(resolved.high_contrast);
        assert!(!resolved.ascii_only);
        assert_eq!(resolved.refresh_secs, 120);
        assert_eq!(
            resolved.default_client.as_ref().map(|c| c.as_str()),
            Some("CLIENT_002")
        );
    }

    #[test]
    fn invalid_toml_reports_path() {
        let (_dir, path) = write_config("[supabase\nurl = ");
        let err = FinapticoConfig::load_from(&path).unwrap_err();
        match err {
            ConfigError::Parse { path: p, .. } => assert_eq!(p, path),
            other => panic!("expected Parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_url_fails_resolution() {
        let config = FinapticoConfig::default();
        // Env may carry real coordinates on a dev box; only assert when clean.
        if std::env::var(super::ENV_SUPABASE_URL).is_err() {
            let err = ResolvedConfig::resolve(Some(&config)).unwrap_err();
            assert!(matches!(err, ResolveError::MissingUrl));
        }
    }

    #[test]
    fn defaults_apply_without_app_section() {
        let (_dir, path) = write_config(
            r#"
            [supabase]
            url = "https://abc.supabase.co"
            anon_key = "k"
            "#,
        );
        let config = FinapticoConfig::load_from(&path).expect("load").expect("some");
        let resolved = ResolvedConfig::resolve(Some(&config)).expect("resolve");
        assert_eq!(resolved.refresh_secs, 60);
        assert!(resolved.default_client.is_none());
    }

    #[test]
    fn debug_masks_secrets() {
        let (_dir, path) = write_config(
            r#"
            [supabase]
            url = "https://abc.supabase.co"
            anon_key = "sb_secret_value"
            "#,
        );
        let config = FinapticoConfig::load_from(&path).expect("load").expect("some");
        let rendered = format!("{config:?}");
        assert!(!rendered.contains("sb_secret_value"));

        let resolved = ResolvedConfig::resolve(Some(&config)).expect("resolve");
        let rendered = format!("{resolved:?}");
        assert!(!rendered.contains("sb_secret_value"));
    }
}
