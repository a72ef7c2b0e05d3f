use std::{num::NonZeroUsize, path::PathBuf};

use clap::Parser;
use enrich_core::{Config, OutputFormat, enrich_all, enricher_from_config, io};
use tracing::{debug, info};

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(
    name = "enrich",
    version,
    about = "Enrich expense rows with geolocation, current weather and USD conversion"
)]
pub struct Cli {
    /// Input CSV with columns city,country_code,local_currency,amount.
    #[arg(short, long, default_value = "expenses.csv")]
    pub input: PathBuf,

    /// Output file path.
    #[arg(short, long, default_value = "enriched.json")]
    pub output: PathBuf,

    /// Output format: json or csv.
    #[arg(long, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output.
    #[arg(long)]
    pub pretty: bool,

    /// Parallel workers (default: config value, else max(4, CPU count)).
    #[arg(short, long)]
    pub workers: Option<NonZeroUsize>,

    /// Print per-row progress.
    #[arg(short, long)]
    pub verbose: bool,

    /// Config file (default: platform config directory, if present).
    #[arg(long)]
    pub config: Option<PathBuf>,
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        let config = match &self.config {
            Some(path) => Config::load_from(path)?,
            None => Config::load()?,
        };
        debug!(?config, "loaded configuration");

        let rows = io::read_rows(&self.input)?;
        let workers = config.worker_count(self.workers.map(NonZeroUsize::get));
        let enricher = enricher_from_config(&config)?;

        info!(rows = rows.len(), workers, input = %self.input.display(), "enriching");
        let report = enrich_all(&enricher, rows, workers).await?;

        io::write_output(&report.rows, &self.output, self.format, self.pretty)?;

        if report.stats.partial > 0 {
            info!(
                partial = report.stats.partial,
                total = report.stats.total,
                "some rows have null field groups"
            );
        }
        info!("Wrote {} rows to {}", report.rows.len(), self.output.display());

        Ok(())
    }
}
