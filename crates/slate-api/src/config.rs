//! Server configuration from the environment.
use slate_quality::{ProfileError, QualityProfile};

pub const DEFAULT_ADDR: &str = "0.0.0.0:8787";
pub const DEFAULT_ANCHOR_SET_VERSION: &str = "andronoma-2024-10-01";
pub const DEFAULT_MODEL_REVISION: &str = "responses-2024-09-30";

#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `SLATE_ADDR`
    pub addr: String,
    /// `ANCHOR_SET_VERSION`, used when a run request names none
    pub anchor_set_version: String,
    /// `MODEL_REVISION`, used when a run request names none
    pub model_revision: String,
    /// Loaded from the YAML file at `SLATE_PROFILE`, else the standard profile
    pub profile: QualityProfile,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            anchor_set_version: DEFAULT_ANCHOR_SET_VERSION.to_string(),
            model_revision: DEFAULT_MODEL_REVISION.to_string(),
            profile: QualityProfile::standard(),
        }
    }
}

impl ServerConfig {
    pub fn from_env() -> Result<Self, ProfileError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ProfileError> {
        let defaults = Self::default();
        let profile = match lookup("SLATE_PROFILE") {
            Some(path) => QualityProfile::load(path)?,
            None => defaults.profile,
        };
        Ok(Self {
            addr: lookup("SLATE_ADDR").unwrap_or(defaults.addr),
            anchor_set_version: lookup("ANCHOR_SET_VERSION").unwrap_or(defaults.anchor_set_version),
            model_revision: lookup("MODEL_REVISION").unwrap_or(defaults.model_revision),
            profile,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_defaults_without_env() {
        let config = ServerConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.addr, DEFAULT_ADDR);
        assert_eq!(config.profile, QualityProfile::standard());
    }

    #[test]
    fn test_overrides() {
        let env: HashMap<&str, &str> = [("SLATE_ADDR", "127.0.0.1:9000"), ("MODEL_REVISION", "rev-7")]
            .into_iter()
            .collect();
        let config = ServerConfig::from_lookup(|key| env.get(key).map(|v| v.to_string())).unwrap();
        assert_eq!(config.addr, "127.0.0.1:9000");
        assert_eq!(config.model_revision, "rev-7");
        assert_eq!(config.anchor_set_version, DEFAULT_ANCHOR_SET_VERSION);
    }

    #[test]
    fn test_missing_profile_file_is_an_error() {
        let result = ServerConfig::from_lookup(|key| {
            (key == "SLATE_PROFILE").then(|| "/nonexistent/slate-profile.yaml".to_string())
        });
        assert!(matches!(result, Err(ProfileError::Io(_))));
    }
}
