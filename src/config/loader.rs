//! Reading and rendering mapping-configuration templates

use std::fs;
use std::path::Path;

use crate::dataset::EpisodeId;
use crate::error::ConfigError;

use super::model::ConversionConfig;
use super::template::TemplateContext;

/// Name of the variable a template may reference
pub const EPISODE_VAR: &str = "episode_id";

/// Packaged default mapping configuration
pub const DEFAULT_CONFIG: &str = include_str!("../../configs/config.yaml");

/// A mapping-configuration template: raw text plus where it came from.
///
/// The text is read once and kept for the whole run; rendering happens
/// again for every episode because the document is designed to vary per
/// episode (a topic or path segment keyed by the episode stem).
#[derive(Debug, Clone)]
pub struct ConfigTemplate {
    origin: String,
    text: String,
}

impl ConfigTemplate {
    /// Read a template file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            origin: origin.clone(),
            source,
        })?;
        Ok(Self { origin, text })
    }

    /// Build a template from literal text.
    pub fn from_text(origin: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            origin: origin.into(),
            text: text.into(),
        }
    }

    /// The packaged default template.
    pub fn builtin_default() -> Self {
        Self::from_text("<builtin config>", DEFAULT_CONFIG)
    }

    /// Where this template came from, for error messages.
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Render the configuration for one episode.
    ///
    /// Substitutes `{{ episode_id }}` with the canonical stem, parses the
    /// rendered YAML and validates the result. Every failure carries the
    /// template origin.
    pub fn render(&self, episode: EpisodeId) -> Result<ConversionConfig, ConfigError> {
        let rendered = TemplateContext::new()
            .with_var(EPISODE_VAR, &episode.stem())
            .substitute(&self.text)
            .map_err(|message| ConfigError::render(&self.origin, message))?;

        let config: ConversionConfig = serde_yaml::from_str(&rendered)
            .map_err(|e| ConfigError::parse(&self.origin, e.to_string()))?;

        config
            .validate()
            .map_err(|violation| violation.into_config_error(&self.origin))?;

        Ok(config)
    }
}
