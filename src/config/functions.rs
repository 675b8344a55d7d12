//! Named transform functions referenced by channel specs
//!
//! The converter-functions document is the second half of a mapping
//! configuration: a dictionary of named transforms a channel can apply to
//! its source columns. It is loaded once per run and never templated.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::{Map, Value};

use crate::error::{ConfigError, ConversionError};

/// Packaged default converter functions
pub const DEFAULT_CONVERTER_FUNCTIONS: &str = include_str!("../../configs/converter_functions.yaml");

/// The converter-functions document
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConverterFunctions {
    pub functions: BTreeMap<String, FunctionSpec>,
}

impl ConverterFunctions {
    /// Load the document from a YAML file.
    pub fn from_path(path: &Path) -> Result<Self, ConfigError> {
        let origin = path.display().to_string();
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            origin: origin.clone(),
            source,
        })?;
        Self::from_text(&text, &origin)
    }

    /// Parse the document from text, labelling errors with `origin`.
    pub fn from_text(text: &str, origin: &str) -> Result<Self, ConfigError> {
        let parsed: Self =
            serde_yaml::from_str(text).map_err(|e| ConfigError::parse(origin, e.to_string()))?;
        if parsed.functions.is_empty() {
            return Err(ConfigError::invalid(
                origin,
                "functions",
                "at least one function is required",
            ));
        }
        Ok(parsed)
    }

    /// The packaged default document.
    pub fn builtin_default() -> Self {
        Self::from_text(DEFAULT_CONVERTER_FUNCTIONS, "<builtin converter functions>")
            .expect("packaged converter functions are valid")
    }

    pub fn get(&self, name: &str) -> Option<&FunctionSpec> {
        self.functions.get(name)
    }
}

/// One named transform: how selected columns become a message payload
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FunctionSpec {
    /// Emit an object keyed by column name, optionally renamed
    Record {
        #[serde(default)]
        rename: BTreeMap<String, String>,
    },
    /// Flatten the selected columns into one numeric array field
    Array {
        #[serde(default = "default_array_field")]
        field: String,
    },
    /// Emit a single scaled numeric field from exactly one column
    Scalar {
        #[serde(default = "default_scalar_field")]
        field: String,
        #[serde(default = "default_scale")]
        scale: f64,
    },
}

fn default_array_field() -> String {
    "data".to_string()
}

fn default_scalar_field() -> String {
    "value".to_string()
}

fn default_scale() -> f64 {
    1.0
}

impl FunctionSpec {
    /// Constraint on how many columns a channel may feed this function.
    pub fn check_arity(&self, columns: usize) -> Result<(), String> {
        match self {
            FunctionSpec::Scalar { .. } if columns != 1 => Err(format!(
                "scalar functions take exactly one column, got {columns}"
            )),
            _ => Ok(()),
        }
    }

    /// Build one message payload from a source row.
    pub fn apply(
        &self,
        columns: &[String],
        row: &Map<String, Value>,
        row_index: u64,
    ) -> Result<Value, ConversionError> {
        match self {
            FunctionSpec::Record { rename } => {
                let mut object = Map::new();
                for column in columns {
                    let value = lookup(row, column, row_index)?;
                    let key = rename.get(column).unwrap_or(column);
                    object.insert(key.clone(), value.clone());
                }
                Ok(Value::Object(object))
            }
            FunctionSpec::Array { field } => {
                let mut data = Vec::new();
                for column in columns {
                    push_numbers(lookup(row, column, row_index)?, column, row_index, &mut data)?;
                }
                let mut object = Map::new();
                object.insert(field.clone(), Value::Array(data));
                Ok(Value::Object(object))
            }
            FunctionSpec::Scalar { field, scale } => {
                // arity is checked at converter construction
                let column = &columns[0];
                let value = lookup(row, column, row_index)?;
                let number = value.as_f64().ok_or_else(|| ConversionError::NotNumeric {
                    column: column.clone(),
                    row: row_index,
                })?;
                let mut object = Map::new();
                object.insert(field.clone(), json_number(number * scale));
                Ok(Value::Object(object))
            }
        }
    }
}

fn lookup<'a>(
    row: &'a Map<String, Value>,
    column: &str,
    row_index: u64,
) -> Result<&'a Value, ConversionError> {
    row.get(column).ok_or_else(|| ConversionError::MissingColumn {
        column: column.to_string(),
        row: row_index,
    })
}

fn push_numbers(
    value: &Value,
    column: &str,
    row_index: u64,
    out: &mut Vec<Value>,
) -> Result<(), ConversionError> {
    match value {
        Value::Number(_) => {
            out.push(value.clone());
            Ok(())
        }
        Value::Array(items) => {
            for item in items {
                push_numbers(item, column, row_index, out)?;
            }
            Ok(())
        }
        _ => Err(ConversionError::NotNumeric {
            column: column.to_string(),
            row: row_index,
        }),
    }
}

fn json_number(value: f64) -> Value {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}
