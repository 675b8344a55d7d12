//! Row-to-message conversion engine: tabular frames in, MCAP messages out

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use mcap::records::MessageHeader;
use parquet::file::reader::{FileReader, SerializedFileReader};
use serde_json::{Map, Value};

use crate::config::{ChannelSpec, ConstraintViolation, ConversionConfig, ConverterFunctions, FunctionSpec, TimeSpec};
use crate::error::ConversionError;

/// What one episode conversion produced
#[derive(Debug, Clone, Copy)]
pub struct ConversionMetadata {
    pub rows: u64,
    pub messages: u64,
    pub output_bytes: u64,
}

/// A channel spec paired with its resolved transform
#[derive(Debug)]
struct BoundChannel {
    spec: ChannelSpec,
    function: FunctionSpec,
    schema_bytes: Option<Vec<u8>>,
}

/// Converts one episode's tabular source file into one MCAP log file.
///
/// The mapping configuration is a required construction argument; a
/// converter never carries a default configuration that later gets
/// replaced.
#[derive(Debug)]
pub struct McapConverter {
    profile: String,
    time: TimeSpec,
    channels: Vec<BoundChannel>,
}

impl McapConverter {
    /// Bind a validated configuration to the run's converter functions.
    ///
    /// Resolves every channel's named function and checks it accepts the
    /// channel's column count.
    pub fn new(
        config: ConversionConfig,
        functions: &ConverterFunctions,
    ) -> Result<Self, ConstraintViolation> {
        let ConversionConfig {
            profile,
            time,
            channels,
        } = config;

        let mut bound = Vec::with_capacity(channels.len());
        for (i, spec) in channels.into_iter().enumerate() {
            let function = match functions.get(&spec.converter) {
                Some(function) => function.clone(),
                None => {
                    return Err(ConstraintViolation::new(
                        format!("channels[{i}].converter"),
                        format!("unknown converter function '{}'", spec.converter),
                    ))
                }
            };
            function.check_arity(spec.columns.len()).map_err(|constraint| {
                ConstraintViolation::new(format!("channels[{i}].columns"), constraint)
            })?;
            let schema_bytes = match &spec.schema {
                Some(schema) => Some(match &schema.definition {
                    Some(definition) => serde_json::to_vec(definition).map_err(|e| {
                        ConstraintViolation::new(
                            format!("channels[{i}].schema.definition"),
                            format!("not serializable: {e}"),
                        )
                    })?,
                    None => br#"{"type":"object"}"#.to_vec(),
                }),
                None => None,
            };
            bound.push(BoundChannel {
                spec,
                function,
                schema_bytes,
            });
        }

        Ok(Self {
            profile,
            time,
            channels: bound,
        })
    }

    /// Convert `source` into the log file at `dest`.
    ///
    /// The output is written to a sibling `.part` file and renamed into
    /// place only after the writer has been finalized, so a failed
    /// conversion never leaves a partial log file behind. An existing
    /// `dest` is overwritten.
    pub fn convert(&self, source: &Path, dest: &Path) -> Result<ConversionMetadata, ConversionError> {
        let file =
            File::open(source).map_err(|e| ConversionError::io(source, e))?;
        let reader = SerializedFileReader::new(file)
            .map_err(|e| ConversionError::parquet(source, e))?;

        let part = part_path(dest);
        match self.write_log(&reader, source, &part) {
            Ok(metadata) => {
                fs::rename(&part, dest).map_err(|e| ConversionError::io(dest, e))?;
                Ok(metadata)
            }
            Err(error) => {
                let _ = fs::remove_file(&part);
                Err(error)
            }
        }
    }

    fn write_log(
        &self,
        reader: &SerializedFileReader<File>,
        source: &Path,
        part: &Path,
    ) -> Result<ConversionMetadata, ConversionError> {
        let out = File::create(part).map_err(|e| ConversionError::io(part, e))?;
        let mut writer = mcap::WriteOptions::new()
            .profile(self.profile.as_str())
            .create(BufWriter::new(out))?;

        // Channel ids are registered up front and stable for the file
        let mut channel_ids = Vec::with_capacity(self.channels.len());
        for channel in &self.channels {
            let schema = match (&channel.spec.schema, &channel.schema_bytes) {
                (Some(schema), Some(bytes)) => Some(std::sync::Arc::new(mcap::Schema {
                    name: schema.name.clone(),
                    encoding: schema.encoding.clone(),
                    data: std::borrow::Cow::Owned(bytes.clone()),
                })),
                _ => None,
            };
            let id = writer.add_channel(&mcap::Channel {
                topic: channel.spec.topic.clone(),
                schema,
                message_encoding: channel.spec.message_encoding.clone(),
                metadata: BTreeMap::new(),
            })?;
            channel_ids.push(id);
        }

        let mut rows = 0u64;
        let mut messages = 0u64;
        let iter = reader
            .get_row_iter(None)
            .map_err(|e| ConversionError::parquet(source, e))?;
        for (index, row) in iter.enumerate() {
            let row = row.map_err(|e| ConversionError::parquet(source, e))?;
            let row_index = index as u64;
            let Value::Object(fields) = row.to_json_value() else {
                return Err(ConversionError::parquet(
                    source,
                    parquet::errors::ParquetError::General(
                        "row did not decode to an object".to_string(),
                    ),
                ));
            };

            let log_time = self.row_time(&fields, row_index)?;
            for (channel, &channel_id) in self.channels.iter().zip(&channel_ids) {
                let payload = channel
                    .function
                    .apply(&channel.spec.columns, &fields, row_index)?;
                let data = serde_json::to_vec(&payload)?;
                writer.write_to_known_channel(
                    &MessageHeader {
                        channel_id,
                        sequence: row_index as u32,
                        log_time,
                        publish_time: log_time,
                    },
                    &data,
                )?;
                messages += 1;
            }
            rows += 1;
        }
        writer.finish()?;

        let output_bytes = fs::metadata(part).map(|m| m.len()).unwrap_or(0);
        Ok(ConversionMetadata {
            rows,
            messages,
            output_bytes,
        })
    }

    fn row_time(&self, fields: &Map<String, Value>, row_index: u64) -> Result<u64, ConversionError> {
        let column = &self.time.column;
        let value = fields
            .get(column)
            .ok_or_else(|| ConversionError::MissingColumn {
                column: column.clone(),
                row: row_index,
            })?;
        let raw = value.as_f64().ok_or_else(|| ConversionError::BadTimestamp {
            column: column.clone(),
            row: row_index,
        })?;
        if !raw.is_finite() || raw < 0.0 {
            return Err(ConversionError::BadTimestamp {
                column: column.clone(),
                row: row_index,
            });
        }
        Ok(self.time.unit.to_nanos(raw))
    }
}

fn part_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    dest.with_file_name(name)
}
