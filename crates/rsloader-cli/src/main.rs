//! rsloader binary
//!
//! Runs the loader walkthrough against a JSONPlaceholder-style REST API.
//!
//! # Usage
//!
//! ```bash
//! # Defaults: posts from jsonplaceholder.typicode.com
//! rsloader
//!
//! # With config file and overrides
//! rsloader --config rsloader.yaml --resource users --max-batch-size 2
//!
//! # Watch batches form
//! RUST_LOG=rsloader_core=debug rsloader --no-cache
//! ```

use clap::Parser;
use tracing::info;

use rsloader_cli::config::{AppConfig, RESOURCES};
use rsloader_cli::demo::run_walkthrough;
use rsloader_cli::observability::init_logging;
use rsloader_cli::HttpBatchFn;
use rsloader_core::{register_loader_metrics, BatchLoader};

/// rsloader - batching and caching loader walkthrough
#[derive(Parser, Debug)]
#[command(name = "rsloader")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file (YAML)
    #[arg(short, long)]
    config: Option<String>,

    /// Resource to load (posts, users, todos, comments)
    #[arg(short, long, value_parser = clap::builder::PossibleValuesParser::new(RESOURCES))]
    resource: Option<String>,

    /// Disable the loader cache
    #[arg(long)]
    no_cache: bool,

    /// Flush batches early once they hold this many keys
    #[arg(long)]
    max_batch_size: Option<usize>,
}

impl Args {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(resource) = &self.resource {
            config.api.resource = resource.clone();
        }
        if self.no_cache {
            config.loader.cache_enabled = false;
        }
        if self.max_batch_size.is_some() {
            config.loader.max_batch_size = self.max_batch_size;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut config = if let Some(config_path) = &args.config {
        AppConfig::load(config_path)?
    } else {
        AppConfig::from_env()?
    };
    args.apply(&mut config);
    config.validate()?;

    init_logging(&config.logging)?;
    register_loader_metrics();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        base_url = %config.api.base_url,
        resource = %config.api.resource,
        cache = config.loader.cache_enabled,
        "Starting rsloader walkthrough"
    );

    let fetcher = HttpBatchFn::from_settings(&config.api)?;
    let loader = BatchLoader::with_config(fetcher, config.loader.clone())?;

    for step in run_walkthrough(&loader).await {
        println!("== {}", step.title);
        for result in step.results {
            match result {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(message) => println!("error: {message}"),
            }
        }
        println!();
    }

    Ok(())
}
