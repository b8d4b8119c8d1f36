use crate::core::Pipeline;
use crate::domain::model::{ExtractionReport, SheetText};
use crate::utils::error::Result;
use crate::utils::monitor::SystemMonitor;

pub struct EtlEngine<P: Pipeline> {
    pipeline: P,
    monitor: SystemMonitor,
}

impl<P: Pipeline> EtlEngine<P> {
    pub fn new(pipeline: P) -> Self {
        Self::new_with_monitoring(pipeline, false)
    }

    pub fn new_with_monitoring(pipeline: P, monitor_enabled: bool) -> Self {
        Self {
            pipeline,
            monitor: SystemMonitor::new(monitor_enabled),
        }
    }

    /// Runs extract, transform and load.
    ///
    /// Failures are logged, then rate-limit errors are replaced by the
    /// user-facing "service unavailable" error; anything else is returned as is.
    pub async fn run(&self) -> Result<ExtractionReport> {
        match self.run_stages().await {
            Ok(report) => {
                self.monitor.log_final_stats();
                Ok(report)
            }
            Err(e) => {
                tracing::error!("❌ An error occurred while parsing the Excel file: {}", e);
                Err(e.into_user_facing())
            }
        }
    }

    /// Extract stage only, for dry runs.
    pub async fn preview(&self) -> Result<SheetText> {
        let sheet_text = self.pipeline.extract().await.inspect_err(|e| {
            tracing::error!("❌ An error occurred while reading the Excel file: {}", e);
        })?;
        self.monitor.log_stats("Extract");
        Ok(sheet_text)
    }

    async fn run_stages(&self) -> Result<ExtractionReport> {
        tracing::info!("🚀 Starting PCB characteristics extraction");
        self.monitor.log_stats("Start");

        let sheet_text = self.pipeline.extract().await?;
        tracing::debug!(
            "Extracted {} non-empty sheet(s) from {}",
            sheet_text.sheet_count,
            sheet_text.source_name
        );
        self.monitor.log_stats("Extract");

        let characteristics = self.pipeline.transform(sheet_text).await?;
        self.monitor.log_stats("Transform");

        let files = self.pipeline.load(&characteristics).await?;
        self.monitor.log_stats("Load");
        tracing::info!("✅ Processing done, {} file(s) written", files.paths().len());

        Ok(ExtractionReport {
            characteristics,
            files,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::pipeline::tests::{sample_workbook, MockConfig, MockModel, MockStorage};
    use crate::core::pipeline::ExtractionPipeline;
    use crate::domain::model::PcbCharacteristics;
    use crate::utils::error::{EtlError, SERVICE_UNAVAILABLE_MESSAGE};

    async fn engine_with(
        model: MockModel,
        max_attempts: usize,
    ) -> (EtlEngine<ExtractionPipeline<MockStorage, MockConfig, MockModel>>, MockStorage) {
        let storage = MockStorage::new();
        storage.put_file("board.xlsx", sample_workbook()).await;
        let mut config = MockConfig::new("board.xlsx");
        config.max_attempts = max_attempts;
        let pipeline = ExtractionPipeline::new(storage.clone(), config, model);
        (EtlEngine::new(pipeline), storage)
    }

    #[tokio::test]
    async fn test_run_produces_report() {
        let record = PcbCharacteristics {
            board_name: "MB-01".to_string(),
            ..Default::default()
        };
        let (engine, storage) = engine_with(MockModel::answering(record.clone()), 3).await;

        let report = engine.run().await.unwrap();

        assert_eq!(report.characteristics, record);
        assert_eq!(report.files.paths().len(), 3);
        assert!(storage.get_file("board_pcb_parsed.json").await.is_some());
    }

    #[tokio::test]
    async fn test_run_translates_exhausted_rate_limit() {
        let failures = (0..2)
            .map(|_| EtlError::ProcessingError {
                message: "Service tier capacity exceeded for this model".to_string(),
            })
            .collect();
        let (engine, storage) =
            engine_with(MockModel::failing_then(failures, PcbCharacteristics::default()), 2).await;

        let err = engine.run().await.unwrap_err();

        assert!(matches!(err, EtlError::ServiceUnavailable));
        assert_eq!(err.to_string(), SERVICE_UNAVAILABLE_MESSAGE);
        assert!(storage.get_file("board_pcb_parsed.csv").await.is_none());
    }

    #[tokio::test]
    async fn test_run_passes_other_errors_through() {
        let failures = vec![EtlError::ModelApiError {
            status: 500,
            body: "internal error".to_string(),
        }];
        let (engine, _) =
            engine_with(MockModel::failing_then(failures, PcbCharacteristics::default()), 3).await;

        let err = engine.run().await.unwrap_err();
        assert_eq!(err.to_string(), "Model API returned status 500: internal error");
    }

    #[tokio::test]
    async fn test_preview_only_extracts() {
        let (engine, storage) =
            engine_with(MockModel::answering(PcbCharacteristics::default()), 1).await;

        let sheet_text = engine.preview().await.unwrap();
        assert!(sheet_text.text.contains("Кол-во слоев"));
        assert!(storage.get_file("board_pcb_parsed.csv").await.is_none());
    }
}
