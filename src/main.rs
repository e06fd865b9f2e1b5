use clap::Parser;
use chrono::Local;
use scholarship_etl::config::RunArgs;
use scholarship_etl::core::discovery::AnnouncementDiscoverer;
use scholarship_etl::domain::ports::ScholarshipStore;
use scholarship_etl::utils::{logger, validation::Validate};
use scholarship_etl::{
    open_store, EtlEngine, EtlError, HttpFetcher, OpenAiAnalyzer, ScholarshipPipeline, TomlConfig,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = RunArgs::parse();

    if args.log_json {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting scholarship ETL");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let mut config = match TomlConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    args.apply_overrides(&mut config);

    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    tracing::info!("✅ Configuration loaded and validated successfully");
    display_config_summary(&config);

    let outcome = if args.stats {
        print_statistics(&config).await
    } else if args.dry_run {
        tracing::info!("🔍 DRY RUN MODE - discovery only, nothing is analyzed or stored");
        perform_dry_run(&config).await
    } else {
        run(&config).await
    };

    if let Err(e) = outcome {
        report_failure(&e);
        let exit_code = e.exit_code();
        if exit_code > 0 {
            std::process::exit(exit_code);
        }
    }

    Ok(())
}

fn display_config_summary(config: &TomlConfig) {
    tracing::info!("📋 Configuration Summary:");
    tracing::info!("  Listing: {}", config.source.listing_url);
    tracing::info!("  Max items: {}", config.source.max_items);
    tracing::info!("  Model: {}", config.analysis.model);
    tracing::info!("  Store: {:?}", config.store.backend);
    tracing::info!("  Delay between items: {}s", config.pipeline.delay_seconds);
}

async fn run(config: &TomlConfig) -> scholarship_etl::Result<()> {
    let today = Local::now().date_naive();
    let store = open_store(config)?;

    let before = store.statistics(today).await?;
    tracing::info!(
        total = before.total,
        active = before.active,
        expired = before.expired,
        "📊 Store before run"
    );

    let fetcher = HttpFetcher::new(&config.source)?;
    let analyzer = OpenAiAnalyzer::new(
        &config.analysis,
        config.analysis_api_key()?,
        config.analysis_timeout(),
    )?;
    let pipeline = ScholarshipPipeline::new(config, fetcher, analyzer, store.clone())?;
    let summary = EtlEngine::new(pipeline).run().await?;

    let after = store.statistics(today).await?;
    tracing::info!(
        total = after.total,
        active = after.active,
        expired = after.expired,
        "📊 Store after run"
    );

    println!("✅ ETL process completed");
    println!(
        "📄 {} discovered, {} stored ({} image, {} text), {} skipped",
        summary.discovered, summary.succeeded, summary.via_image, summary.via_text, summary.failed
    );
    println!(
        "📊 {} total, {} active, {} expired",
        after.total, after.active, after.expired
    );
    Ok(())
}

async fn print_statistics(config: &TomlConfig) -> scholarship_etl::Result<()> {
    let store = open_store(config)?;
    let stats = store.statistics(Local::now().date_naive()).await?;
    println!("Total: {}", stats.total);
    println!("Active: {}", stats.active);
    println!("Expired: {}", stats.expired);
    Ok(())
}

async fn perform_dry_run(config: &TomlConfig) -> scholarship_etl::Result<()> {
    let fetcher = HttpFetcher::new(&config.source)?;
    let mut discoverer = AnnouncementDiscoverer::new(&config.source)?;
    let items = discoverer
        .discover(&fetcher, &config.source.listing_url, config.source.max_items)
        .await?;

    println!("🔍 {} announcements would be processed:", items.len());
    for (index, item) in items.iter().enumerate() {
        println!("  {:>3}. {}", index + 1, item.title);
        println!("       {}", item.link);
    }
    Ok(())
}

fn report_failure(e: &EtlError) {
    tracing::error!(
        "❌ ETL process failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 Suggestion: {}", e.recovery_suggestion());
}
