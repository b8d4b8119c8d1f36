use crate::adapters::excel::workbook_to_text;
use crate::adapters::mistral::{MistralClient, ModelSettings};
use crate::adapters::output::{output_names, render_bundle, render_csv, render_json, render_xlsx};
use crate::core::retry::RetryPolicy;
use crate::core::{ConfigProvider, LanguageModel, Pipeline, Storage};
use crate::domain::model::{OutputFiles, PcbCharacteristics, SheetText};
use crate::utils::error::{EtlError, Result};
use std::path::{Path, PathBuf};

/// Spreadsheet in, characteristics files out.
pub struct ExtractionPipeline<S: Storage, C: ConfigProvider, M: LanguageModel> {
    storage: S,
    config: C,
    model: M,
    retry: RetryPolicy,
}

impl<S: Storage, C: ConfigProvider, M: LanguageModel> ExtractionPipeline<S, C, M> {
    pub fn new(storage: S, config: C, model: M) -> Self {
        let retry = RetryPolicy::new(config.max_attempts(), config.retry_base_delay());
        Self {
            storage,
            config,
            model,
            retry,
        }
    }

    fn source_name(&self) -> String {
        Path::new(self.config.input_path())
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.config.input_path().to_string())
    }

    fn output_dir(&self) -> PathBuf {
        match self.config.output_dir() {
            Some(dir) => PathBuf::from(dir),
            None => Path::new(self.config.input_path())
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_default(),
        }
    }

    async fn write_output(&self, file_name: &str, data: &[u8]) -> Result<PathBuf> {
        let path = self.output_dir().join(file_name);
        self.storage
            .write_file(&path.to_string_lossy(), data)
            .await?;
        tracing::debug!("💾 Saved {}", path.display());
        Ok(path)
    }
}

impl<S: Storage, C: ConfigProvider> ExtractionPipeline<S, C, MistralClient> {
    /// Pipeline backed by the Mistral API configured from `config`.
    pub fn with_mistral(storage: S, config: C) -> Result<Self> {
        let model = MistralClient::new(ModelSettings::from_config(&config))?;
        Ok(Self::new(storage, config, model))
    }
}

#[async_trait::async_trait]
impl<S: Storage, C: ConfigProvider, M: LanguageModel> Pipeline for ExtractionPipeline<S, C, M> {
    async fn extract(&self) -> Result<SheetText> {
        tracing::info!(
            "📄 Extracting data from the Excel file: {}",
            self.config.input_path()
        );
        let bytes = self.storage.read_file(self.config.input_path()).await?;
        let source_name = self.source_name();

        let sheet_text = tokio::task::spawn_blocking(move || workbook_to_text(bytes, &source_name))
            .await
            .map_err(|e| EtlError::ProcessingError {
                message: format!("Spreadsheet parsing task failed: {}", e),
            })??;

        if sheet_text.is_empty() {
            tracing::warn!("⚠️ No cell content found in {}", sheet_text.source_name);
        }

        Ok(sheet_text)
    }

    async fn transform(&self, data: SheetText) -> Result<PcbCharacteristics> {
        let model = &self.model;
        let text = data.text.as_str();

        let record = self
            .retry
            .run(move || model.extract_characteristics(text))
            .await?;

        tracing::info!("✅ Successfully processed PCB data");
        tracing::debug!("Parsed PCB characteristics: {:?}", record);
        Ok(record)
    }

    async fn load(&self, record: &PcbCharacteristics) -> Result<OutputFiles> {
        let names = output_names(self.config.input_path());

        let csv_data = render_csv(record)?;
        let csv = self.write_output(&names.csv, &csv_data).await?;

        let xlsx_data = render_xlsx(record)?;
        let xlsx = self.write_output(&names.xlsx, &xlsx_data).await?;

        let json_data = render_json(record)?;
        let json = self.write_output(&names.json, &json_data).await?;

        let bundle = if self.config.bundle_outputs() {
            let archive = render_bundle(&[
                (names.csv.as_str(), csv_data.as_slice()),
                (names.xlsx.as_str(), xlsx_data.as_slice()),
                (names.json.as_str(), json_data.as_slice()),
            ])?;
            Some(self.write_output(&names.bundle, &archive).await?)
        } else {
            None
        };

        Ok(OutputFiles {
            csv,
            xlsx,
            json,
            bundle,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::sync::Mutex;

    #[derive(Clone)]
    pub(crate) struct MockStorage {
        files: Arc<Mutex<HashMap<String, Vec<u8>>>>,
    }

    impl MockStorage {
        pub(crate) fn new() -> Self {
            Self {
                files: Arc::new(Mutex::new(HashMap::new())),
            }
        }

        pub(crate) async fn put_file(&self, path: &str, data: Vec<u8>) {
            self.files.lock().await.insert(path.to_string(), data);
        }

        pub(crate) async fn get_file(&self, path: &str) -> Option<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned()
        }
    }

    impl Storage for MockStorage {
        async fn read_file(&self, path: &str) -> Result<Vec<u8>> {
            let files = self.files.lock().await;
            files.get(path).cloned().ok_or_else(|| {
                EtlError::IoError(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("File not found: {}", path),
                ))
            })
        }

        async fn write_file(&self, path: &str, data: &[u8]) -> Result<()> {
            let mut files = self.files.lock().await;
            files.insert(path.to_string(), data.to_vec());
            Ok(())
        }
    }

    pub(crate) struct MockConfig {
        pub(crate) input_path: String,
        pub(crate) output_dir: Option<String>,
        pub(crate) max_attempts: usize,
        pub(crate) bundle: bool,
    }

    impl MockConfig {
        pub(crate) fn new(input_path: &str) -> Self {
            Self {
                input_path: input_path.to_string(),
                output_dir: None,
                max_attempts: 3,
                bundle: false,
            }
        }
    }

    impl ConfigProvider for MockConfig {
        fn input_path(&self) -> &str {
            &self.input_path
        }

        fn output_dir(&self) -> Option<&str> {
            self.output_dir.as_deref()
        }

        fn api_endpoint(&self) -> &str {
            "http://localhost"
        }

        fn api_key(&self) -> &str {
            "test-key"
        }

        fn model_name(&self) -> &str {
            "mistral-medium-latest"
        }

        fn temperature(&self) -> f32 {
            0.1
        }

        fn request_timeout(&self) -> Duration {
            Duration::from_secs(5)
        }

        fn max_attempts(&self) -> usize {
            self.max_attempts
        }

        fn retry_base_delay(&self) -> Duration {
            Duration::from_millis(1)
        }

        fn bundle_outputs(&self) -> bool {
            self.bundle
        }
    }

    /// Fails with the scripted errors first, then answers with `record`.
    pub(crate) struct MockModel {
        failures: std::sync::Mutex<Vec<EtlError>>,
        record: PcbCharacteristics,
        calls: AtomicUsize,
    }

    impl MockModel {
        pub(crate) fn answering(record: PcbCharacteristics) -> Self {
            Self::failing_then(Vec::new(), record)
        }

        pub(crate) fn failing_then(failures: Vec<EtlError>, record: PcbCharacteristics) -> Self {
            Self {
                failures: std::sync::Mutex::new(failures),
                record,
                calls: AtomicUsize::new(0),
            }
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl LanguageModel for MockModel {
        async fn extract_characteristics(&self, _sheet_text: &str) -> Result<PcbCharacteristics> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let next_failure = {
                let mut failures = self.failures.lock().unwrap();
                if failures.is_empty() {
                    None
                } else {
                    Some(failures.remove(0))
                }
            };
            match next_failure {
                Some(err) => Err(err),
                None => Ok(self.record.clone()),
            }
        }
    }

    pub(crate) fn sample_workbook() -> Vec<u8> {
        let mut workbook = rust_xlsxwriter::Workbook::new();
        let sheet = workbook.add_worksheet();
        sheet.write_string(0, 0, "Заказчик").unwrap();
        sheet.write_string(0, 1, "ООО Плата").unwrap();
        sheet.write_string(1, 0, "Кол-во слоев").unwrap();
        sheet.write_number(1, 1, 4.0).unwrap();
        workbook.save_to_buffer().unwrap()
    }

    fn sample_record() -> PcbCharacteristics {
        PcbCharacteristics {
            company_name: "ООО Плата".to_string(),
            layer_count: 4,
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_extract_reads_workbook_through_storage() {
        let storage = MockStorage::new();
        storage.put_file("uploads/board.xlsx", sample_workbook()).await;

        let pipeline = ExtractionPipeline::new(
            storage,
            MockConfig::new("uploads/board.xlsx"),
            MockModel::answering(sample_record()),
        );

        let sheet_text = pipeline.extract().await.unwrap();
        assert_eq!(sheet_text.source_name, "board.xlsx");
        assert_eq!(sheet_text.sheet_count, 1);
        assert!(sheet_text.text.starts_with("Sheet: Sheet1\n"));
        assert!(sheet_text.text.contains("ООО Плата"));
    }

    #[tokio::test]
    async fn test_extract_missing_file_propagates() {
        let pipeline = ExtractionPipeline::new(
            MockStorage::new(),
            MockConfig::new("missing.xlsx"),
            MockModel::answering(sample_record()),
        );

        assert!(matches!(
            pipeline.extract().await,
            Err(EtlError::IoError(_))
        ));
    }

    #[tokio::test]
    async fn test_transform_retries_rate_limits() {
        let model = MockModel::failing_then(
            vec![EtlError::ModelApiError {
                status: 429,
                body: "rate limited".to_string(),
            }],
            sample_record(),
        );
        let pipeline = ExtractionPipeline::new(MockStorage::new(), MockConfig::new("a.xlsx"), model);

        let record = pipeline
            .transform(SheetText {
                source_name: "a.xlsx".to_string(),
                text: "Sheet: Sheet1\nx".to_string(),
                sheet_count: 1,
            })
            .await
            .unwrap();

        assert_eq!(record, sample_record());
        assert_eq!(pipeline.model.calls(), 2);
    }

    #[tokio::test]
    async fn test_transform_stops_on_other_errors() {
        let model = MockModel::failing_then(
            vec![EtlError::ProcessingError {
                message: "bad json".to_string(),
            }],
            sample_record(),
        );
        let pipeline = ExtractionPipeline::new(MockStorage::new(), MockConfig::new("a.xlsx"), model);

        let err = pipeline
            .transform(SheetText {
                source_name: "a.xlsx".to_string(),
                text: String::new(),
                sheet_count: 0,
            })
            .await
            .unwrap_err();

        assert_eq!(err.to_string(), "Data processing error: bad json");
        assert_eq!(pipeline.model.calls(), 1);
    }

    #[tokio::test]
    async fn test_load_writes_three_files_next_to_input() {
        let storage = MockStorage::new();
        let pipeline = ExtractionPipeline::new(
            storage.clone(),
            MockConfig::new("uploads/board.v1.xlsx"),
            MockModel::answering(sample_record()),
        );

        let files = pipeline.load(&sample_record()).await.unwrap();

        assert_eq!(files.csv, PathBuf::from("uploads/board_pcb_parsed.csv"));
        assert_eq!(files.xlsx, PathBuf::from("uploads/board_pcb_parsed.xlsx"));
        assert_eq!(files.json, PathBuf::from("uploads/board_pcb_parsed.json"));
        assert!(files.bundle.is_none());

        let csv = storage.get_file("uploads/board_pcb_parsed.csv").await.unwrap();
        assert!(String::from_utf8(csv).unwrap().contains("layer_count,4"));
        assert!(storage.get_file("uploads/board_pcb_parsed.xlsx").await.is_some());
        assert!(storage.get_file("uploads/board_pcb_parsed.json").await.is_some());
        assert!(storage.get_file("uploads/board_pcb_parsed.zip").await.is_none());
    }

    #[tokio::test]
    async fn test_load_honours_output_dir_and_bundle() {
        let storage = MockStorage::new();
        let mut config = MockConfig::new("board.xlsx");
        config.output_dir = Some("out".to_string());
        config.bundle = true;
        let pipeline =
            ExtractionPipeline::new(storage.clone(), config, MockModel::answering(sample_record()));

        let files = pipeline.load(&sample_record()).await.unwrap();

        assert_eq!(files.bundle, Some(PathBuf::from("out/board_pcb_parsed.zip")));
        let archive = storage.get_file("out/board_pcb_parsed.zip").await.unwrap();
        let archive = zip::ZipArchive::new(std::io::Cursor::new(archive)).unwrap();
        assert_eq!(archive.len(), 3);
    }
}
