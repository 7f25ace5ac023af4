use std::{
    collections::HashMap,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use rules_engine::ModuleConfig;

const DEFAULT_CONFIG_FILE: &str = "/var/lib/secl/secl.ini";

/// Agent configuration, one [ModuleConfig] for each section of an `INI` file.
#[derive(Debug, Clone, Default)]
pub struct AgentConfig {
    config_file: Option<PathBuf>,
    configs: HashMap<String, ModuleConfig>,
}

impl AgentConfig {
    /// Loads the default file, or an empty configuration if it does not exist.
    pub fn new() -> Result<Self> {
        let config_file = Path::new(DEFAULT_CONFIG_FILE);
        if !config_file.exists() {
            log::debug!("{DEFAULT_CONFIG_FILE} not found, using defaults");
            return Ok(Self::default());
        }
        Self::from_config_file(config_file)
    }

    /// Loads a custom file, which must exist.
    pub fn with_custom_file(config_file: &str) -> Result<Self> {
        let config_file = Path::new(config_file);
        if !config_file.exists() {
            bail!("Configuration file {} not found", config_file.display());
        }
        Self::from_config_file(config_file)
    }

    fn from_config_file(config_file: &Path) -> Result<Self> {
        let mut configs: HashMap<String, ModuleConfig> = HashMap::new();

        let conf = ini::Ini::load_from_file(config_file)
            .with_context(|| format!("Error loading configuration from {config_file:?}"))?;

        for (section, prop) in &conf {
            if let Some(section) = section {
                let mod_config = configs.entry(section.to_string()).or_default();
                for (key, value) in prop.iter() {
                    log::debug!("{}.{}={}", section, key, value);
                    mod_config.insert(key.to_string(), value.to_string());
                }
            }
        }

        Ok(Self {
            config_file: Some(config_file.to_path_buf()),
            configs,
        })
    }

    pub fn config_file(&self) -> Option<&Path> {
        self.config_file.as_deref()
    }

    /// Configuration of `module`, empty if the file has no such section.
    pub fn get_module_config(&self, module: &str) -> ModuleConfig {
        self.configs.get(module).cloned().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn sections_become_module_configs() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "global_key=ignored\n\n[rules-engine]\nrules_path=/tmp\nscalar_cache = disabled\n\n[other]\nkey=value"
        )
        .unwrap();

        let config = AgentConfig::with_custom_file(&file.path().display().to_string()).unwrap();
        assert_eq!(config.config_file(), Some(file.path()));

        let rules_engine = config.get_module_config("rules-engine");
        assert_eq!(rules_engine.get_raw("rules_path"), Some("/tmp"));
        assert_eq!(rules_engine.get_raw("scalar_cache"), Some("disabled"));
        assert_eq!(rules_engine.get_raw("global_key"), None);

        assert_eq!(config.get_module_config("other").get_raw("key"), Some("value"));
        assert_eq!(config.get_module_config("missing").iter().count(), 0);
    }

    #[test]
    fn missing_custom_file() {
        assert!(AgentConfig::with_custom_file("/this/file/does/not/exist.ini").is_err());
    }
}
