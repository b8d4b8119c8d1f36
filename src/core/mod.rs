pub mod etl;
pub mod pipeline;
pub mod retry;

pub use crate::domain::model::{OutputFiles, PcbCharacteristics, SheetText};
pub use crate::domain::ports::{ConfigProvider, LanguageModel, Pipeline, Storage};
pub use crate::utils::error::Result;
