use anyhow::Context;
use chrono::Local;
use clap::Parser;
use scholarship_etl::config::EligibleArgs;
use scholarship_etl::domain::model::NO_INCOME_LIMIT;
use scholarship_etl::domain::ports::ScholarshipStore;
use scholarship_etl::utils::logger;
use scholarship_etl::{open_store, TomlConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = EligibleArgs::parse();
    logger::init_cli_logger(args.verbose);

    let config = TomlConfig::from_file(&args.config)
        .with_context(|| format!("failed to load config file '{}'", args.config))?;
    let store = open_store(&config).context("failed to open scholarship store")?;

    let filter = args.filter();
    tracing::debug!(?filter, "querying eligible scholarships");

    let records = store
        .eligible(&filter, Local::now().date_naive())
        .await
        .context("eligibility query failed")?;

    if args.json {
        for record in &records {
            println!("{}", serde_json::to_string(record)?);
        }
        return Ok(());
    }

    if records.is_empty() {
        println!("No active scholarships match.");
        return Ok(());
    }

    for record in &records {
        println!(
            "{}  {}  (GPA ≥ {:.1}, income ≤ {}, {})",
            record.due_date,
            record.title,
            record.min_gpa,
            if record.max_income == NO_INCOME_LIMIT {
                "any".to_string()
            } else {
                record.max_income.to_string()
            },
            record.residence
        );
        println!("            {}", record.link);
    }
    println!("{} scholarships", records.len());
    Ok(())
}
