use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};
use genius_harvest::clients::{
    Credential, GeniusClient,
    errors::Result,
    genius::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT},
};
use genius_harvest::harvester::{ConfigBuilder, DEFAULT_PER_PAGE, Harvester, RetryPolicy};
use log::{error, info, warn};
use tokio::io::AsyncWriteExt;

#[derive(Parser)]
#[command(name = "genius-harvest")]
#[command(version, about = "Search Genius for many terms and export the hits as CSV", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search each term and write the flattened hits of all terms as one CSV
    Search(SearchArgs),
}

#[derive(Args)]
struct SearchArgs {
    /// Artists, albums or tracks to search for
    #[arg(required = true, value_parser = parse_term)]
    terms: Vec<String>,

    /// Hits requested per term
    #[arg(long, default_value_t = DEFAULT_PER_PAGE, value_parser = clap::value_parser!(u32).range(1..))]
    per_page: u32,

    /// Searches kept in flight at once, 0 runs terms one by one
    #[arg(short = 'j', long, default_value_t = 0)]
    parallelism: usize,

    /// CSV file to write, stdout when omitted
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Also save each term's hits as genius-<index>-<term>.csv in this directory
    #[arg(long)]
    per_term_dir: Option<PathBuf>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs(), value_parser = clap::value_parser!(u64).range(1..))]
    timeout_secs: u64,

    /// Extra attempts for rate-limited, timed-out or network-failed searches
    #[arg(long, default_value_t = 0)]
    retries: u32,

    /// Pause between attempts in milliseconds
    #[arg(long, default_value_t = 1000)]
    retry_delay_ms: u64,

    /// Genius API root the search endpoint is resolved against
    #[arg(long, default_value = DEFAULT_BASE_URL)]
    base_url: String,

    /// Restore input term order when searching concurrently
    #[arg(long)]
    ordered: bool,
}

fn parse_term(raw: &str) -> std::result::Result<String, String> {
    if raw.trim().is_empty() {
        Err("search terms must not be empty".into())
    } else {
        Ok(raw.to_string())
    }
}

pub async fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Search(args) => search(args).await,
    }
}

async fn search(args: SearchArgs) -> Result<ExitCode> {
    // A missing token aborts before any request is sent
    let credential = Credential::from_env()?;
    let client = GeniusClient::new(
        credential,
        &args.base_url,
        Duration::from_secs(args.timeout_secs),
    )?;
    info!("Using Genius API at {}", client.base_url());

    if let Some(dir) = &args.per_term_dir {
        tokio::fs::create_dir_all(dir).await?;
    }

    let config = ConfigBuilder::new()
        .client(client)
        .per_page(args.per_page)
        .parallelism(args.parallelism)
        .retry(RetryPolicy::fixed(
            args.retries,
            Duration::from_millis(args.retry_delay_ms),
        ))
        .per_term_dir(args.per_term_dir)
        .build()?;

    let mut report = Harvester::new(config).run(&args.terms).await;
    if report.all_failed() {
        error!("Every search failed, nothing to write");
        return Ok(ExitCode::FAILURE);
    }
    if args.ordered {
        report.sort_by_input_order();
    }

    let failed = report.failures().count();
    let table = report.into_table();
    match &args.output {
        Some(path) => {
            table.save_csv(path).await?;
            info!("Saved {} rows to {path:?}", table.len());
        }
        None => {
            let mut stdout = tokio::io::stdout();
            stdout.write_all(&table.to_csv_bytes()?).await?;
            stdout.flush().await?;
        }
    }
    if failed > 0 {
        warn!(
            "{failed} of {} terms failed, the output is partial",
            args.terms.len()
        );
    }

    Ok(ExitCode::SUCCESS)
}
