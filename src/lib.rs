pub mod adapters;
pub mod config;
pub mod core;
pub mod domain;
pub mod utils;

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use adapters::mistral::{MistralClient, ModelSettings};
pub use config::{cli::LocalStorage, toml_config::TomlConfig};
pub use core::{etl::EtlEngine, pipeline::ExtractionPipeline, retry::RetryPolicy};
pub use domain::model::{ExtractionReport, OutputFiles, PcbCharacteristics, SheetText, FIELDS};
pub use utils::error::{EtlError, Result};
