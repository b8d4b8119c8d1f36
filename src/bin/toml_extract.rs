use anyhow::Context;
use clap::Parser;
use pcb_extract::core::ConfigProvider;
use pcb_extract::utils::{logger, validation::Validate};
use pcb_extract::{EtlEngine, EtlError, ExtractionPipeline, LocalStorage, TomlConfig};

#[derive(Parser)]
#[command(name = "toml-extract")]
#[command(about = "PCB characteristics extraction driven by a TOML configuration file")]
struct Args {
    /// Excel file (.xlsx or .xls) to parse
    input: String,

    /// Path to TOML configuration file
    #[arg(short, long, default_value = "pcb-extract.toml")]
    config: String,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Override monitoring setting from config
    #[arg(long)]
    monitor: Option<bool>,

    /// Only extract and print the spreadsheet text
    #[arg(long)]
    dry_run: bool,
}

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

fn display_config_summary(config: &TomlConfig, args: &Args) {
    println!("📋 Configuration Summary:");
    println!("  Input: {}", config.input_path());
    println!("  Model: {} @ {}", config.model_name(), config.api_endpoint());
    println!("  Temperature: {}", config.temperature());
    println!(
        "  Retry: {} attempt(s), base delay {:?}",
        config.max_attempts(),
        config.retry_base_delay()
    );
    println!(
        "  Output: {}",
        config.output_dir().unwrap_or("(next to input)")
    );
    println!("  Bundle: {}", config.bundle_outputs());

    if args.dry_run {
        println!("  🔍 DRY RUN MODE ENABLED");
    }

    println!();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    logger::init_cli_logger(args.verbose);

    tracing::info!("🚀 Starting TOML-based PCB extraction");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("Failed to load config file '{}'", args.config))?
        .with_input(args.input.clone());

    if !args.dry_run {
        if let Err(e) = config.validate() {
            tracing::error!("❌ Configuration validation failed: {}", e);
            fail(&e);
        }
    }

    tracing::info!("✅ Configuration loaded");
    display_config_summary(&config, &args);

    let monitor_enabled = args.monitor.unwrap_or_else(|| config.monitoring_enabled());
    if monitor_enabled {
        tracing::info!("🔍 System monitoring enabled");
    }

    let pipeline = match ExtractionPipeline::with_mistral(LocalStorage::default(), config) {
        Ok(pipeline) => pipeline,
        Err(e) => fail(&e),
    };
    let engine = EtlEngine::new_with_monitoring(pipeline, monitor_enabled);

    if args.dry_run {
        match engine.preview().await {
            Ok(sheet_text) => println!("{}", sheet_text.text),
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
