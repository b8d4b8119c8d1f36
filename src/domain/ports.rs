use crate::domain::model::{OutputFiles, PcbCharacteristics, SheetText};
use crate::utils::error::Result;
use async_trait::async_trait;
use std::time::Duration;

pub trait Storage: Send + Sync {
    fn read_file(&self, path: &str) -> impl std::future::Future<Output = Result<Vec<u8>>> + Send;
    fn write_file(
        &self,
        path: &str,
        data: &[u8],
    ) -> impl std::future::Future<Output = Result<()>> + Send;
}

pub trait ConfigProvider: Send + Sync {
    fn input_path(&self) -> &str;
    /// Directory for the output files; `None` means next to the input.
    fn output_dir(&self) -> Option<&str>;
    fn api_endpoint(&self) -> &str;
    fn api_key(&self) -> &str;
    fn model_name(&self) -> &str;
    fn temperature(&self) -> f32;
    fn request_timeout(&self) -> Duration;
    fn max_attempts(&self) -> usize;
    fn retry_base_delay(&self) -> Duration;
    fn bundle_outputs(&self) -> bool;
}

/// A model able to fill the characteristics schema from sheet text.
pub trait LanguageModel: Send + Sync {
    fn extract_characteristics(
        &self,
        sheet_text: &str,
    ) -> impl std::future::Future<Output = Result<PcbCharacteristics>> + Send;
}

#[async_trait]
pub trait Pipeline: Send + Sync {
    async fn extract(&self) -> Result<SheetText>;
    async fn transform(&self, data: SheetText) -> Result<PcbCharacteristics>;
    async fn load(&self, record: &PcbCharacteristics) -> Result<OutputFiles>;
}
