//! Configuration service implementation.
//!
//! Loads the root configuration from `~/.config/chorus/config.toml`.
//! A missing file is not an error: every setting has a default.

use crate::dto::RootConfig;
use crate::paths::ChorusPaths;
use chorus_core::error::{ChorusError, Result};
use chorus_core::persona::PersonaRegistry;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Environment variable consulted when the config file has no API key.
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Configuration service that loads, validates and caches the root configuration.
#[derive(Debug, Clone)]
pub struct ConfigService {
    path: PathBuf,
    /// Cached configuration loaded from file.
    config: Arc<RwLock<Option<RootConfig>>>,
}

impl ConfigService {
    /// Creates a service for the default config path (`~/.config/chorus/config.toml`).
    pub fn new() -> Result<Self> {
        let path = ChorusPaths::config_file().map_err(|e| ChorusError::config(e.to_string()))?;
        Ok(Self::with_path(path))
    }

    /// Creates a service for a custom config path (for testing)
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            config: Arc::new(RwLock::new(None)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gets the root configuration, loading it from file if not cached.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed or validated.
    pub fn get_config(&self) -> Result<RootConfig> {
        {
            let read_lock = self
                .config
                .read()
                .map_err(|_| ChorusError::internal("config cache lock poisoned"))?;
            if let Some(ref cached) = *read_lock {
                return Ok(cached.clone());
            }
        }

        let loaded = self.load()?;

        let mut write_lock = self
            .config
            .write()
            .map_err(|_| ChorusError::internal("config cache lock poisoned"))?;
        *write_lock = Some(loaded.clone());

        Ok(loaded)
    }

    /// Invalidates the cache, forcing a reload on next access.
    pub fn invalidate_cache(&self) {
        if let Ok(mut write_lock) = self.config.write() {
            *write_lock = None;
        }
    }

    fn load(&self) -> Result<RootConfig> {
        if !self.path.exists() {
            tracing::debug!(path = %self.path.display(), "No config file, using defaults");
            return Ok(RootConfig::default());
        }

        let content = fs::read_to_string(&self.path)?;
        let config: RootConfig = toml::from_str(&content)?;
        validate(&config)?;

        tracing::info!(path = %self.path.display(), "Loaded configuration");
        Ok(config)
    }
}

/// Checks value ranges that serde cannot express.
pub fn validate(config: &RootConfig) -> Result<()> {
    if config.self_engagement.max_messages == 0 {
        return Err(ChorusError::config(
            "self_engagement.max_messages must be at least 1",
        ));
    }
    if config.pacing.min_delay_ms > config.pacing.max_delay_ms {
        return Err(ChorusError::config(
            "pacing.min_delay_ms must not exceed pacing.max_delay_ms",
        ));
    }
    for (field, value) in [
        ("decider.temperature", config.decider.temperature),
        ("completion.temperature", config.completion.temperature),
    ] {
        if !(0.0..=1.0).contains(&value) {
            return Err(ChorusError::config(format!(
                "{field} must be between 0.0 and 1.0 (got {value})"
            )));
        }
    }
    if config.completion.max_tokens == 0 {
        return Err(ChorusError::config("completion.max_tokens must be positive"));
    }
    if !config.personas.is_empty() {
        persona_registry(config)?;
    }
    Ok(())
}

/// Builds the persona registry: configured personas when present, the
/// built-in presets otherwise.
pub fn persona_registry(config: &RootConfig) -> Result<PersonaRegistry> {
    if config.personas.is_empty() {
        return Ok(PersonaRegistry::with_defaults());
    }
    PersonaRegistry::new(config.personas.iter().cloned().map(Into::into).collect())
}

/// Resolves the Anthropic API key.
///
/// Priority:
/// 1. `[anthropic] api_key` in config.toml
/// 2. `ANTHROPIC_API_KEY` environment variable
pub fn resolve_api_key(config: &RootConfig) -> Option<String> {
    config
        .anthropic
        .api_key
        .clone()
        .filter(|key| !key.trim().is_empty())
        .or_else(|| env::var(API_KEY_ENV).ok().filter(|key| !key.trim().is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorus_core::engagement::DecisionFailurePolicy;
    use tempfile::TempDir;

    fn write_config(dir: &TempDir, content: &str) -> ConfigService {
        let path = dir.path().join("config.toml");
        fs::write(&path, content).unwrap();
        ConfigService::with_path(path)
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = ConfigService::with_path(temp_dir.path().join("config.toml"));

        let config = service.get_config().expect("defaults");
        assert_eq!(config, RootConfig::default());
        assert_eq!(config.self_engagement.max_messages, 10);
        assert_eq!(config.pacing.start_delay_ms, 500);
        assert_eq!(persona_registry(&config).unwrap().all().len(), 4);
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let temp_dir = TempDir::new().unwrap();
        let service = write_config(
            &temp_dir,
            r#"
[self_engagement]
max_messages = 4

[decider]
on_failure = "end"
"#,
        );

        let config = service.get_config().unwrap();
        assert_eq!(config.self_engagement.max_messages, 4);
        assert_eq!(config.decider.on_failure, DecisionFailurePolicy::EndConversation);
        assert_eq!(config.decider.model, "claude-3-haiku-20240307");
        assert_eq!(config.completion.max_tokens, 1024);
    }

    #[test]
    fn test_personas_replace_registry() {
        let temp_dir = TempDir::new().unwrap();
        let service = write_config(
            &temp_dir,
            r#"
[[persona]]
id = "p-1"
name = "Mai"
model = "claude-3-5-haiku-20241022"
system_prompt = "You are Mai.\nBe kind."

[[persona]]
id = "p-2"
name = "Yui"
avatar = "🛠"
model = "claude-3-5-haiku-20241022"
system_prompt = "You are Yui."
"#,
        );

        let config = service.get_config().unwrap();
        let registry = persona_registry(&config).unwrap();
        let names: Vec<_> = registry.all().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Mai", "Yui"]);
        assert_eq!(registry.find("p-1").unwrap().instructions_summary(), "You are Mai.");
    }

    #[test]
    fn test_invalid_values_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let service = write_config(&temp_dir, "[self_engagement]\nmax_messages = 0\n");
        assert!(service.get_config().unwrap_err().is_config());

        let service = write_config(
            &temp_dir,
            "[pacing]\nmin_delay_ms = 5000\nmax_delay_ms = 10\n",
        );
        assert!(service.get_config().unwrap_err().is_config());

        let service = write_config(&temp_dir, "[decider]\ntemperature = 3.5\n");
        assert!(service.get_config().unwrap_err().is_config());
    }

    #[test]
    fn test_malformed_toml_is_a_serialization_error() {
        let temp_dir = TempDir::new().unwrap();
        let service = write_config(&temp_dir, "[self_engagement\n");
        assert!(matches!(
            service.get_config(),
            Err(ChorusError::Serialization { .. })
        ));
    }

    #[test]
    fn test_cache_and_invalidate() {
        let temp_dir = TempDir::new().unwrap();
        let service = write_config(&temp_dir, "[self_engagement]\nmax_messages = 2\n");
        assert_eq!(service.get_config().unwrap().self_engagement.max_messages, 2);

        fs::write(service.path(), "[self_engagement]\nmax_messages = 7\n").unwrap();
        assert_eq!(service.get_config().unwrap().self_engagement.max_messages, 2);

        service.invalidate_cache();
        assert_eq!(service.get_config().unwrap().self_engagement.max_messages, 7);
    }

    #[test]
    fn test_api_key_from_config_wins() {
        let mut config = RootConfig::default();
        config.anthropic.api_key = Some("from-config".to_string());
        assert_eq!(resolve_api_key(&config).as_deref(), Some("from-config"));
    }
}
