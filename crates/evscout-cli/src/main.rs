mod crawl;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use evscout_core::Period;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "evscout")]
#[command(about = "Crawl event listings into JSON artifacts")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Crawl every profile target (or a single --url) and write one artifact per target
    Crawl {
        /// Crawl only this listing URL instead of the profile targets
        #[arg(long)]
        url: Option<String>,
        /// Period tag for --url (past, upcoming or unknown)
        #[arg(long, requires = "url")]
        period: Option<Period>,
        /// Directory for artifacts (overrides EVSCOUT_OUTPUT_DIR)
        #[arg(long)]
        output_dir: Option<PathBuf>,
        /// Skip detail-page enrichment
        #[arg(long)]
        no_enrich: bool,
    },
    /// Validate configuration and the extraction profile
    CheckProfile,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = evscout_core::load_app_config()?;
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.log_level.clone()))?;
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Crawl {
            url,
            period,
            output_dir,
            no_enrich,
        } => {
            let args = crawl::CrawlArgs {
                url,
                period: period.unwrap_or_default(),
                output_dir,
                no_enrich,
            };
            crawl::run_crawl(&config, args).await?;
        }
        Commands::CheckProfile => crawl::check_profile(&config)?,
    }

    Ok(())
}
