use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::Parser;
use dotenv::dotenv;
use review_service_cli::{config::PipelineConfig, utils, PageRequest, ReviewPipeline};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(author, version, about = "Extract reviews from a rendered web page", long_about = None)]
struct Args {
    /// Page to extract reviews from
    #[arg(short, long)]
    url: String,

    /// Write the report here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum characters per chunk sent to the model (overrides CHUNK_SIZE)
    #[arg(long)]
    chunk_size: Option<NonZeroUsize>,

    /// Chunks extracted concurrently (overrides EXTRACT_CONCURRENCY)
    #[arg(short, long)]
    concurrency: Option<NonZeroUsize>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "review_service_cli=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();

    let mut config = PipelineConfig::from_env()?;
    if let Some(chunk_size) = args.chunk_size {
        config.chunk_size = chunk_size;
    }
    if let Some(concurrency) = args.concurrency {
        config.concurrency = concurrency;
    }

    let request = PageRequest::new(args.url)?;
    let pipeline = ReviewPipeline::from_config(config)?;
    let report = pipeline.run(&request).await?;

    match args.output {
        Some(path) => utils::save_json(&report, &path)?,
        None => println!("{}", utils::to_pretty_json(&report)?),
    }

    Ok(())
}
