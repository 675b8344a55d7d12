//! Typed mapping-configuration model
//!
//! The shape of the per-episode mapping document: where frame time comes
//! from and how source columns feed output channels.

use std::collections::BTreeSet;

use serde::Deserialize;

use crate::error::ConfigError;

fn default_message_encoding() -> String {
    "json".to_string()
}

fn default_schema_encoding() -> String {
    "jsonschema".to_string()
}

/// How input tabular columns map onto output channels
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConversionConfig {
    /// Profile string recorded in the output log header
    #[serde(default)]
    pub profile: String,
    pub time: TimeSpec,
    pub channels: Vec<ChannelSpec>,
}

/// Where per-frame time comes from
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TimeSpec {
    pub column: String,
    #[serde(default)]
    pub unit: TimeUnit,
}

/// Unit of the time column's values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeUnit {
    #[default]
    Seconds,
    Milliseconds,
    Microseconds,
    Nanoseconds,
}

impl TimeUnit {
    /// Convert a value in this unit to nanoseconds
    pub fn to_nanos(&self, value: f64) -> u64 {
        let factor = match self {
            TimeUnit::Seconds => 1e9,
            TimeUnit::Milliseconds => 1e6,
            TimeUnit::Microseconds => 1e3,
            TimeUnit::Nanoseconds => 1.0,
        };
        (value * factor).round().max(0.0) as u64
    }
}

/// One output channel fed from a set of source columns
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ChannelSpec {
    pub topic: String,
    #[serde(default = "default_message_encoding")]
    pub message_encoding: String,
    #[serde(default)]
    pub schema: Option<SchemaSpec>,
    /// Name of a function from the converter-functions document
    pub converter: String,
    pub columns: Vec<String>,
}

/// Schema attached to a channel; omitted channels are written schemaless
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchemaSpec {
    pub name: String,
    #[serde(default = "default_schema_encoding")]
    pub encoding: String,
    /// Inline schema document, serialized verbatim into the output
    #[serde(default)]
    pub definition: Option<serde_json::Value>,
}

/// A violated configuration constraint, pointing at the field path
#[derive(Debug, Clone)]
pub struct ConstraintViolation {
    pub field: String,
    pub constraint: String,
}

impl ConstraintViolation {
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
        }
    }

    /// Attach the template origin, producing the user-facing error.
    pub fn into_config_error(self, origin: &str) -> ConfigError {
        ConfigError::invalid(origin, self.field, self.constraint)
    }
}

impl ConversionConfig {
    /// Check structural constraints, naming the offending field path.
    pub fn validate(&self) -> Result<(), ConstraintViolation> {
        if self.time.column.trim().is_empty() {
            return Err(ConstraintViolation::new(
                "time.column",
                "must name a source column",
            ));
        }
        if self.channels.is_empty() {
            return Err(ConstraintViolation::new(
                "channels",
                "at least one channel is required",
            ));
        }
        let mut topics = BTreeSet::new();
        for (i, channel) in self.channels.iter().enumerate() {
            if !channel.topic.starts_with('/') {
                return Err(ConstraintViolation::new(
                    format!("channels[{i}].topic"),
                    "topic must start with '/'",
                ));
            }
            if !topics.insert(channel.topic.as_str()) {
                return Err(ConstraintViolation::new(
                    format!("channels[{i}].topic"),
                    "duplicate topic",
                ));
            }
            if channel.converter.trim().is_empty() {
                return Err(ConstraintViolation::new(
                    format!("channels[{i}].converter"),
                    "must name a converter function",
                ));
            }
            if channel.columns.is_empty() {
                return Err(ConstraintViolation::new(
                    format!("channels[{i}].columns"),
                    "at least one source column is required",
                ));
            }
            if channel.message_encoding != "json" {
                return Err(ConstraintViolation::new(
                    format!("channels[{i}].message_encoding"),
                    "only 'json' message encoding is supported",
                ));
            }
        }
        Ok(())
    }
}
