// Copyright 2025 Sushanth (https://github.com/sushanthpy)
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Configuration for judge and target deployments
//!
//! Built once at process start and passed by reference into the constructors
//! that need it. Values are layered: environment > TOML file > defaults.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// API version used when none is configured
pub const DEFAULT_API_VERSION: &str = "2024-06-01";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required setting: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {key}: {value}")]
    Invalid { key: &'static str, value: String },

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Toml(#[from] toml::de::Error),
}

/// Top-level settings for an evaluation run
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct EvalSettings {
    /// Deployment used as the judge (and, by default, as the target endpoint)
    #[serde(default)]
    pub model: ModelConfig,

    /// Project the run belongs to
    #[serde(default)]
    pub project: ProjectConfig,

    /// Deployments whose answers are evaluated
    #[serde(default)]
    pub target: TargetConfig,

    #[serde(default)]
    pub run: RunConfig,
}

/// Connection settings for a chat-completion deployment
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ModelConfig {
    /// Resource endpoint, e.g. "https://my-resource.openai.azure.com"
    #[serde(default)]
    pub azure_endpoint: String,

    #[serde(default)]
    pub api_key: String,

    /// Deployment name the requests are routed to
    #[serde(default)]
    pub azure_deployment: String,

    #[serde(default = "default_api_version")]
    pub api_version: String,
}

/// Project identifiers, used only to label results
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct ProjectConfig {
    pub subscription_id: Option<String>,
    pub resource_group_name: Option<String>,
    pub project_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TargetConfig {
    /// Deployment names of the models that generate candidate responses
    #[serde(default = "default_target_models")]
    pub models: Vec<String>,

    /// Replaces the built-in email assistant system prompt when set
    #[serde(default)]
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct RunConfig {
    /// Timeout the caller imposes around each model call. None = wait forever.
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

fn default_api_version() -> String {
    DEFAULT_API_VERSION.to_string()
}

fn default_target_models() -> Vec<String> {
    vec!["gpt-4".to_string(), "gpt-4o".to_string()]
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            azure_endpoint: String::new(),
            api_key: String::new(),
            azure_deployment: String::new(),
            api_version: default_api_version(),
        }
    }
}

impl Default for TargetConfig {
    fn default() -> Self {
        Self {
            models: default_target_models(),
            system_prompt: None,
        }
    }
}

impl ModelConfig {
    /// Check that the fields needed to reach the deployment are present
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.azure_endpoint.trim().is_empty() {
            return Err(ConfigError::Missing("azure_endpoint"));
        }
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Missing("api_key"));
        }
        if self.azure_deployment.trim().is_empty() {
            return Err(ConfigError::Missing("azure_deployment"));
        }
        Ok(())
    }

    /// Same connection, different deployment
    pub fn for_deployment(&self, deployment: &str) -> Self {
        Self {
            azure_deployment: deployment.to_string(),
            ..self.clone()
        }
    }
}

impl EvalSettings {
    /// Load settings from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&content)?)
    }

    /// Load settings from environment variables
    ///
    /// Supported environment variables:
    /// - AZURE_OPENAI_ENDPOINT, AZURE_OPENAI_API_KEY, AZURE_OPENAI_DEPLOYMENT,
    ///   AZURE_OPENAI_API_VERSION: judge deployment
    /// - AZURE_SUBSCRIPTION_ID, AZURE_RESOURCE_GROUP, AZURE_PROJECT_NAME: project labels
    /// - INBOXEVAL_TARGET_MODELS: comma-separated target deployments
    /// - INBOXEVAL_TIMEOUT_SECS: per-call timeout in seconds
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut settings = Self::default();
        settings.apply_vars(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Load settings with priority: env > file > defaults
    pub fn load(config_file: Option<&Path>) -> Result<Self, ConfigError> {
        let mut settings = match config_file {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from file: {:?}", path);
                Self::from_file(path)?
            }
            Some(path) => {
                tracing::warn!("Config file not found: {:?}, using defaults", path);
                Self::default()
            }
            None => Self::default(),
        };

        settings.apply_vars(|key| std::env::var(key).ok())?;
        Ok(settings)
    }

    /// Override fields from a variable lookup. Unset or empty variables leave
    /// the current value untouched.
    pub fn apply_vars<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(endpoint) = get("AZURE_OPENAI_ENDPOINT") {
            self.model.azure_endpoint = endpoint;
        }
        if let Some(key) = get("AZURE_OPENAI_API_KEY") {
            self.model.api_key = key;
        }
        if let Some(deployment) = get("AZURE_OPENAI_DEPLOYMENT") {
            self.model.azure_deployment = deployment;
        }
        if let Some(version) = get("AZURE_OPENAI_API_VERSION") {
            self.model.api_version = version;
        }

        if let Some(id) = get("AZURE_SUBSCRIPTION_ID") {
            self.project.subscription_id = Some(id);
        }
        if let Some(group) = get("AZURE_RESOURCE_GROUP") {
            self.project.resource_group_name = Some(group);
        }
        if let Some(name) = get("AZURE_PROJECT_NAME") {
            self.project.project_name = Some(name);
        }

        if let Some(models) = get("INBOXEVAL_TARGET_MODELS") {
            self.target.models = models
                .split(',')
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty())
                .collect();
        }
        if let Some(timeout) = get("INBOXEVAL_TIMEOUT_SECS") {
            let secs = timeout.trim().parse().map_err(|_| ConfigError::Invalid {
                key: "INBOXEVAL_TIMEOUT_SECS",
                value: timeout.clone(),
            })?;
            self.run.timeout_secs = Some(secs);
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_settings() {
        let settings = EvalSettings::default();
        assert_eq!(settings.model.api_version, DEFAULT_API_VERSION);
        assert_eq!(settings.target.models, vec!["gpt-4", "gpt-4o"]);
        assert!(settings.run.timeout_secs.is_none());
        assert!(settings.model.validate().is_err());
    }

    #[test]
    fn test_apply_vars() {
        let mut settings = EvalSettings::default();
        settings
            .apply_vars(lookup(&[
                ("AZURE_OPENAI_ENDPOINT", "https://example.openai.azure.com"),
                ("AZURE_OPENAI_API_KEY", "secret"),
                ("AZURE_OPENAI_DEPLOYMENT", "judge"),
                ("AZURE_PROJECT_NAME", "mail-eval"),
                ("INBOXEVAL_TARGET_MODELS", "gpt-4o, gpt-4o-mini,"),
                ("INBOXEVAL_TIMEOUT_SECS", "45"),
            ]))
            .unwrap();

        assert_eq!(settings.model.azure_endpoint, "https://example.openai.azure.com");
        assert_eq!(settings.model.azure_deployment, "judge");
        assert_eq!(settings.model.api_version, DEFAULT_API_VERSION);
        assert_eq!(settings.project.project_name.as_deref(), Some("mail-eval"));
        assert_eq!(settings.target.models, vec!["gpt-4o", "gpt-4o-mini"]);
        assert_eq!(settings.run.timeout_secs, Some(45));
        assert!(settings.model.validate().is_ok());
    }

    #[test]
    fn test_empty_vars_are_ignored() {
        let mut settings = EvalSettings::default();
        settings.model.api_key = "from-file".to_string();
        settings
            .apply_vars(lookup(&[("AZURE_OPENAI_API_KEY", "  ")]))
            .unwrap();
        assert_eq!(settings.model.api_key, "from-file");
    }

    #[test]
    fn test_invalid_timeout() {
        let mut settings = EvalSettings::default();
        let err = settings
            .apply_vars(lookup(&[("INBOXEVAL_TIMEOUT_SECS", "soon")]))
            .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Invalid {
                key: "INBOXEVAL_TIMEOUT_SECS",
                ..
            }
        ));
    }

    #[test]
    fn test_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
[model]
azure_endpoint = "https://example.openai.azure.com"
api_key = "secret"
azure_deployment = "judge"

[target]
models = ["gpt-4o"]

[run]
timeout_secs = 10
"#
        )
        .unwrap();

        let settings = EvalSettings::from_file(file.path()).unwrap();
        assert_eq!(settings.model.azure_deployment, "judge");
        assert_eq!(settings.model.api_version, DEFAULT_API_VERSION);
        assert_eq!(settings.target.models, vec!["gpt-4o"]);
        assert_eq!(settings.run.timeout_secs, Some(10));
        assert!(settings.project.project_name.is_none());
    }

    #[test]
    fn test_missing_fields() {
        let config = ModelConfig {
            azure_endpoint: "https://example.openai.azure.com".to_string(),
            api_key: String::new(),
            azure_deployment: "judge".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        };
        assert!(matches!(config.validate(), Err(ConfigError::Missing("api_key"))));
    }

    #[test]
    fn test_for_deployment() {
        let config = ModelConfig {
            azure_endpoint: "https://example.openai.azure.com".to_string(),
            api_key: "secret".to_string(),
            azure_deployment: "judge".to_string(),
            api_version: DEFAULT_API_VERSION.to_string(),
        };
        let target = config.for_deployment("gpt-4o");
        assert_eq!(target.azure_deployment, "gpt-4o");
        assert_eq!(target.api_key, "secret");
    }
}
