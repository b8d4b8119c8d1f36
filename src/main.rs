use clap::Parser;
use pcb_extract::utils::{logger, validation::Validate};
use pcb_extract::{CliConfig, EtlEngine, EtlError, ExtractionPipeline, LocalStorage};

fn fail(e: &EtlError) -> ! {
    tracing::error!(
        "❌ Extraction failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(e.exit_code());
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = CliConfig::parse();

    if config.json_logs {
        logger::init_json_logger(config.verbose);
    } else {
        logger::init_cli_logger(config.verbose);
    }

    tracing::info!("Starting pcb-extract");
    tracing::debug!("CLI config: {:?}", config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        fail(&e);
    }

    let monitor_enabled = config.monitor;
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }
    let dry_run = config.dry_run;

    let pipeline = match ExtractionPipeline::with_mistral(LocalStorage::default(), config) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(&e),
    };
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    if dry_run {
        tracing::info!("🔍 DRY RUN MODE - the model will not be called");
        match engine.preview().await {
            Ok(sheet_text) => {
                println!(
                    "📄 {} ({} sheet(s), {} words)",
                    sheet_text.source_name,
                    sheet_text.sheet_count,
                    sheet_text.word_count()
                );
                println!("{}", sheet_text.text);
            }
            Err(e) => fail(&e),
        }
        return Ok(());
    }

    match engine.run().await {
        Ok(report) => {
            println!("✅ PCB characteristics extracted:");
            print!("{}", report.characteristics);
            for path in report.files.paths() {
                println!("📁 {}", path.display());
            }
        }
        Err(e) => fail(&e),
    }

    Ok(())
}
