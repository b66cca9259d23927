use std::env;
use std::process::ExitCode;
use std::time::{Duration, Instant};

use tracing_subscriber::EnvFilter;

use filingsmith::{FilingPipeline, PipelineConfig, PipelineError};

const DEFAULT_QUERY: &str = "price target raised or lowered";

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let mut args = env::args().skip(1);
    let Some(cik) = args.next() else {
        eprintln!("usage: filingsmith <CIK> [query...]");
        return ExitCode::from(2);
    };
    let rest: Vec<String> = args.collect();
    let query = if rest.is_empty() {
        DEFAULT_QUERY.to_string()
    } else {
        rest.join(" ")
    };

    match run(&query, &cik).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("error: {err}");
            ExitCode::FAILURE
        }
    }
}

async fn run(query: &str, cik: &str) -> Result<(), PipelineError> {
    let config = PipelineConfig::from_env()?;
    let pipeline = FilingPipeline::new(config)?;

    let start = Instant::now();
    let outcome = pipeline.run(query, cik).await?;
    let duration = start.elapsed();

    println!("{}", outcome.table);
    println!("✓ Run complete");
    println!("  filings discovered : {}", outcome.stats.filings_discovered);
    println!("  filings fetched    : {}", outcome.stats.filings_fetched);
    println!("  filings skipped    : {}", outcome.stats.filings_skipped);
    println!("  chunks indexed     : {}", outcome.stats.chunks_indexed);
    println!("  chunks retrieved   : {}", outcome.stats.chunks_retrieved);
    println!("  rows extracted     : {}", outcome.stats.rows_extracted);
    println!("  duration           : {}", format_duration(duration));
    Ok(())
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn format_duration(duration: Duration) -> String {
    let secs = duration.as_secs();
    format!("{}m {}.{:03}s", secs / 60, secs % 60, duration.subsec_millis())
}
