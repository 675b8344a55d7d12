//! Mapping-configuration loading, templating and validation
//!
//! Two documents drive a conversion run: the templated mapping
//! configuration (rendered once per episode) and the converter-functions
//! dictionary (loaded once, constant for the run).

pub mod functions;
pub mod loader;
pub mod model;
pub mod template;

pub use functions::{ConverterFunctions, FunctionSpec};
pub use loader::{ConfigTemplate, DEFAULT_CONFIG, EPISODE_VAR};
pub use model::{
    ChannelSpec, ConstraintViolation, ConversionConfig, SchemaSpec, TimeSpec, TimeUnit,
};
pub use template::TemplateContext;
