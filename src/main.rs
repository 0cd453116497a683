mod assembler;
mod client;
mod config;
mod error;
mod markdown;
mod output;
mod pipeline;
mod sitemap;
mod validate;

use std::process::ExitCode;
use std::time::Instant;

use clap::Parser;
use tracing::{error, info};

use crate::config::Settings;
use crate::output::OutputFormats;
use crate::pipeline::RunOptions;
use crate::validate::SitemapUrl;

#[derive(Parser, Debug)]
#[command(
    name = "sitemap_openapi",
    about = "Extract OpenAPI documentation from sitemap URLs",
    after_help = "Examples:\n  sitemap_openapi https://docs.bey.dev/sitemap.xml\n  sitemap_openapi docs.example.com/sitemap.xml\n  sitemap_openapi https://api-docs.company.com/sitemap.xml --output my_api"
)]
struct Cli {
    /// URL of the sitemap XML file
    #[arg(value_parser = validate::parse_sitemap_url)]
    sitemap_url: SitemapUrl,

    /// Output filename prefix (default: derived from the sitemap host)
    #[arg(short, long)]
    output: Option<String>,

    /// Save only JSON format (skip YAML)
    #[arg(long)]
    json_only: bool,

    /// Save only YAML format (skip JSON)
    #[arg(long)]
    yaml_only: bool,

    /// Print one line per URL with its status
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let cli = Cli::parse();
    ExitCode::from(run(cli).await)
}

/// Returns the process exit status.
async fn run(cli: Cli) -> u8 {
    // Checked before any network or filesystem work.
    let formats = match OutputFormats::from_flags(cli.json_only, cli.yaml_only) {
        Ok(formats) => formats,
        Err(e) => {
            println!("❌ Error: {}", e);
            return 1;
        }
    };

    let settings = match Settings::load() {
        Ok(settings) => settings,
        Err(e) => {
            error!("invalid settings: {:#}", e);
            return 1;
        }
    };

    let opts = RunOptions {
        sitemap: cli.sitemap_url,
        output: cli.output,
        formats,
        verbose: cli.verbose,
    };

    let t0 = Instant::now();
    match pipeline::run(&opts, &settings).await {
        Ok(summary) => {
            info!(
                total = summary.total_urls,
                valid = summary.valid_urls,
                errors = summary.failed_urls,
                operations = summary.document.operation_count(),
                files = summary.saved.len(),
                "Done in {:.1}s",
                t0.elapsed().as_secs_f64()
            );
            0
        }
        Err(e) => {
            println!("❌ {}", e);
            1
        }
    }
}
