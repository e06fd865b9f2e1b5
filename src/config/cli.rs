use crate::config::toml_config::TomlConfig;
use crate::domain::model::EligibilityFilter;
use clap::Parser;

#[derive(Debug, Clone, Parser)]
#[command(name = "scholarship-etl")]
#[command(about = "Collect scholarship announcements and extract eligibility criteria")]
pub struct RunArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "scholarship-etl.toml")]
    pub config: String,

    /// Override source.max_items
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Override pipeline.delay_seconds
    #[arg(long)]
    pub delay_seconds: Option<u64>,

    /// Discover announcements only; no analysis or persistence
    #[arg(long)]
    pub dry_run: bool,

    /// Print store statistics and exit
    #[arg(long)]
    pub stats: bool,

    /// Emit logs as JSON
    #[arg(long)]
    pub log_json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl RunArgs {
    pub fn apply_overrides(&self, config: &mut TomlConfig) {
        if let Some(max_items) = self.max_items {
            config.source.max_items = max_items;
            tracing::info!("🔧 source.max_items overridden to: {}", max_items);
        }
        if let Some(delay) = self.delay_seconds {
            config.pipeline.delay_seconds = delay;
            tracing::info!("🔧 pipeline.delay_seconds overridden to: {}", delay);
        }
    }
}

#[derive(Debug, Clone, Parser)]
#[command(name = "eligible")]
#[command(about = "List active scholarships a student qualifies for")]
pub struct EligibleArgs {
    /// Path to TOML configuration file
    #[arg(short, long, default_value = "scholarship-etl.toml")]
    pub config: String,

    /// Student GPA
    #[arg(long)]
    pub gpa: Option<f64>,

    /// Student income bracket (0-10)
    #[arg(long)]
    pub income: Option<i64>,

    /// Student residence, e.g. 서울
    #[arg(long)]
    pub residence: Option<String>,

    /// Print records as JSON lines
    #[arg(long)]
    pub json: bool,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,
}

impl EligibleArgs {
    pub fn filter(&self) -> EligibilityFilter {
        EligibilityFilter {
            gpa: self.gpa,
            income: self.income,
            residence: self
                .residence
                .as_ref()
                .map(|r| r.trim().to_string())
                .filter(|r| !r.is_empty()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eligible_args_build_filter() {
        let args = EligibleArgs::parse_from([
            "eligible",
            "--gpa",
            "3.4",
            "--income",
            "5",
            "--residence",
            " 서울 ",
        ]);
        let filter = args.filter();
        assert_eq!(filter.gpa, Some(3.4));
        assert_eq!(filter.income, Some(5));
        assert_eq!(filter.residence.as_deref(), Some("서울"));
    }

    #[test]
    fn test_run_args_defaults() {
        let args = RunArgs::parse_from(["scholarship-etl"]);
        assert_eq!(args.config, "scholarship-etl.toml");
        assert!(!args.dry_run);
        assert!(args.max_items.is_none());
    }
}
