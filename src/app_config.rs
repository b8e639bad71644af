use anyhow::{Context, Result, anyhow};
use log::LevelFilter;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::database::DatabaseConnection;
use crate::language_utils;
use crate::models::ModelMeta;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Config {
    /// Language used when a request does not set one (ISO)
    #[serde(default = "default_language")]
    pub default_language: String,

    /// Languages accepted for translations (ISO)
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,

    /// SQLite database file, defaults to the user data directory
    #[serde(default)]
    pub database_path: Option<PathBuf>,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Translatable models
    #[serde(default)]
    pub models: Vec<ModelMeta>,
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl From<LogLevel> for LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => LevelFilter::Error,
            LogLevel::Warn => LevelFilter::Warn,
            LogLevel::Info => LevelFilter::Info,
            LogLevel::Debug => LevelFilter::Debug,
            LogLevel::Trace => LevelFilter::Trace,
        }
    }
}

fn default_language() -> String {
    "en".to_string()
}

fn default_languages() -> Vec<String> {
    vec![default_language()]
}

impl Config {
    /// Load a configuration file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).with_context(|| format!("Failed to open config file: {:?}", path))?;

        let reader = BufReader::new(file);
        let config: Config =
            serde_json::from_reader(reader).with_context(|| format!("Failed to parse config file: {:?}", path))?;
        Ok(config)
    }

    /// Write the configuration as pretty-printed JSON
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let config_json = serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?;

        std::fs::write(path, config_json).with_context(|| format!("Failed to write config to file: {:?}", path))?;
        Ok(())
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        // Validate languages
        language_utils::validate_language_code(&self.default_language)
            .with_context(|| format!("Invalid default language: {}", self.default_language))?;
        for language in &self.languages {
            language_utils::validate_language_code(language)
                .with_context(|| format!("Invalid language: {}", language))?;
        }
        for (index, language) in self.languages.iter().enumerate() {
            if let Some(other) = self.languages[..index]
                .iter()
                .find(|other| language_utils::language_codes_match(other, language))
            {
                return Err(anyhow!("Language '{}' is listed more than once (as '{}')", language, other));
            }
        }
        if !self.languages.is_empty() && !self.languages.contains(&self.default_language) {
            return Err(anyhow!(
                "Default language '{}' is not one of the configured languages",
                self.default_language
            ));
        }

        // Validate models
        let mut names = HashSet::new();
        for model in &self.models {
            model.validate()?;
            if !names.insert(model.name.to_lowercase()) {
                return Err(anyhow!("Model '{}' is declared more than once", model.name));
            }
        }

        Ok(())
    }

    /// Database file to open
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => DatabaseConnection::default_database_path(),
        }
    }

    /// Look up a model by name, case-insensitively
    pub fn model(&self, name: &str) -> Result<Arc<ModelMeta>> {
        let model = self
            .models
            .iter()
            .find(|m| m.name.eq_ignore_ascii_case(name))
            .ok_or_else(|| anyhow!("Model '{}' is not declared in the configuration", name))?;
        Ok(model.clone().build()?)
    }
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            default_language: default_language(),
            languages: default_languages(),
            database_path: None,
            log_level: LogLevel::default(),
            models: Vec::new(),
        }
    }
}
