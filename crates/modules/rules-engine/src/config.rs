use std::{
    collections::{HashMap, hash_map::Iter},
    fmt::Display,
    path::PathBuf,
    str::FromStr,
};

use secl_eval::ScalarCache;
use secl_model::EventType;
use thiserror::Error;

use crate::{DEFAULT_RULES_PATH, MODULE_NAME};

/// Raw configuration of a module: one section of the configuration file.
#[derive(Debug, Clone, Default)]
pub struct ModuleConfig {
    inner: HashMap<String, String>,
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("field {field} is required")]
    RequiredValue { field: String },
    #[error("{value} is not a valid value for field {field}: {err}")]
    InvalidValue {
        field: String,
        value: String,
        err: String,
    },
}

impl ModuleConfig {
    /// Inserts a new configuration value.
    pub fn insert(&mut self, key: String, value: String) -> Option<String> {
        self.inner.insert(key, value)
    }

    /// Returns an option of raw configuration value.
    pub fn get_raw(&self, config_name: &str) -> Option<&str> {
        self.inner.get(config_name).map(String::as_str)
    }

    /// Returns a typed configuration value.
    pub fn required<T>(&self, config_name: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        <T as FromStr>::Err: Display,
    {
        match self.inner.get(config_name) {
            None => Err(ConfigError::RequiredValue {
                field: config_name.to_string(),
            }),
            Some(value) => parse(value, config_name),
        }
    }

    /// Returns an optional typed configuration value.
    pub fn optional<T>(&self, config_name: &str) -> Result<Option<T>, ConfigError>
    where
        T: FromStr,
        <T as FromStr>::Err: Display,
    {
        self.inner
            .get(config_name)
            .map(|value| parse(value, config_name))
            .transpose()
    }

    /// Returns a typed configuration value, or `default` if the field is missing.
    pub fn with_default<T>(&self, config_name: &str, default: T) -> Result<T, ConfigError>
    where
        T: FromStr,
        <T as FromStr>::Err: Display,
    {
        Ok(self.optional(config_name)?.unwrap_or(default))
    }

    /// Return a comma separed list of values. Return empty vector if field is missing.
    pub fn get_list<T>(&self, config_name: &str) -> Result<Vec<T>, ConfigError>
    where
        T: FromStr,
        <T as FromStr>::Err: Display,
    {
        self.inner
            .get(config_name)
            .iter()
            .flat_map(|config| config.split(','))
            .map(str::trim)
            .filter(|item| !item.is_empty())
            .map(|item| parse(item, config_name))
            .collect()
    }

    /// Return an Iter to the underlying HashMap
    pub fn iter(&self) -> Iter<'_, String, String> {
        self.inner.iter()
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for ModuleConfig {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            inner: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

fn parse<T>(value: &str, config_name: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    <T as FromStr>::Err: Display,
{
    T::from_str(value).map_err(|err| ConfigError::InvalidValue {
        field: config_name.to_string(),
        value: value.to_string(),
        err: err.to_string(),
    })
}

/// Configuration of the rules engine, read from the `rules-engine` section.
///
/// | key                   | default                 |                                    |
/// |-----------------------|-------------------------|------------------------------------|
/// | `rules_path`          | `/var/lib/secl/rules`   | directory scanned for `*.yaml`     |
/// | `scalar_cache`        | `per-event`             | `per-event` or `disabled`          |
/// | `enabled_event_types` | all                     | comma separated event types        |
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub rules_path: PathBuf,
    pub scalar_cache: ScalarCache,
    /// Empty means every event type.
    pub enabled_event_types: Vec<EventType>,
}

impl Config {
    pub fn is_enabled(&self, event_type: EventType) -> bool {
        self.enabled_event_types.is_empty() || self.enabled_event_types.contains(&event_type)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            rules_path: PathBuf::from(DEFAULT_RULES_PATH),
            scalar_cache: ScalarCache::default(),
            enabled_event_types: Vec::new(),
        }
    }
}

impl TryFrom<&ModuleConfig> for Config {
    type Error = ConfigError;

    fn try_from(config: &ModuleConfig) -> Result<Self, Self::Error> {
        let rules_path = config.with_default("rules_path", PathBuf::from(DEFAULT_RULES_PATH))?;

        if !rules_path.exists() {
            return Err(ConfigError::InvalidValue {
                field: "rules_path".to_string(),
                value: rules_path.display().to_string(),
                err: format!("Directory '{}' not exists", rules_path.display()),
            });
        }

        let scalar_cache = config.with_default("scalar_cache", ScalarCache::default())?;
        let enabled_event_types = config.get_list("enabled_event_types")?;

        log::debug!(
            "{MODULE_NAME}: rules from {}, scalar cache {scalar_cache:?}",
            rules_path.display()
        );

        Ok(Self {
            rules_path,
            scalar_cache,
            enabled_event_types,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn typed_values() {
        let config: ModuleConfig = [("retries", "3"), ("name", "x"), ("list", "a, b,,c")]
            .into_iter()
            .collect();

        assert_eq!(config.required::<u32>("retries"), Ok(3));
        assert_eq!(
            config.required::<u32>("missing"),
            Err(ConfigError::RequiredValue {
                field: "missing".to_string()
            })
        );
        assert!(matches!(
            config.required::<u32>("name"),
            Err(ConfigError::InvalidValue { field, .. }) if field == "name"
        ));
        assert_eq!(config.optional::<u32>("missing"), Ok(None));
        assert_eq!(config.with_default("missing", 7u32), Ok(7));
        assert_eq!(
            config.get_list::<String>("list"),
            Ok(vec!["a".to_string(), "b".to_string(), "c".to_string()])
        );
        assert_eq!(config.get_list::<String>("missing"), Ok(vec![]));
    }

    #[test]
    fn rules_engine_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().display().to_string();

        let config: ModuleConfig = [
            ("rules_path", path.as_str()),
            ("scalar_cache", "disabled"),
            ("enabled_event_types", "open, exec"),
        ]
        .into_iter()
        .collect();
        let config = Config::try_from(&config).unwrap();

        assert_eq!(config.rules_path, dir.path());
        assert_eq!(config.scalar_cache, ScalarCache::Disabled);
        assert_eq!(
            config.enabled_event_types,
            vec![EventType::Open, EventType::Exec]
        );
        assert!(config.is_enabled(EventType::Exec));
        assert!(!config.is_enabled(EventType::Chmod));
    }

    #[test]
    fn invalid_rules_engine_config() {
        let config: ModuleConfig = [("rules_path", "/this/path/does/not/exist")]
            .into_iter()
            .collect();
        assert!(matches!(
            Config::try_from(&config),
            Err(ConfigError::InvalidValue { field, .. }) if field == "rules_path"
        ));

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().display().to_string();
        for (key, value) in [("scalar_cache", "always"), ("enabled_event_types", "open,fork")] {
            let config: ModuleConfig = [("rules_path", path.as_str()), (key, value)]
                .into_iter()
                .collect();
            assert!(matches!(
                Config::try_from(&config),
                Err(ConfigError::InvalidValue { field, .. }) if field == key
            ));
        }
    }
}
