//! Extract UI components from a page and print them as JSON.
//!
//! Logs go to stderr (`RUST_LOG` overrides the default filter); the result
//! goes to stdout.

use std::error::Error;
use std::io::{self, Write};
use std::path::PathBuf;

use clap::Parser;
use component_extractor::{ChromiumBackend, ChromiumConfig, ExtractionOptions, Extractor, ExtractorConfig};
use tracing_subscriber::EnvFilter;

/// Extract UI components from a web page
#[derive(Parser, Debug)]
#[command(name = "extract-components")]
#[command(version)]
struct Args {
    /// Page to extract from (http or https)
    url: String,

    /// Maximum number of components
    #[arg(long, default_value_t = 50)]
    max_components: usize,

    /// Restrict to these component types (comma-separated, e.g. hero,buttons)
    #[arg(long, value_delimiter = ',')]
    types: Vec<String>,

    /// Skip per-component screenshots
    #[arg(long)]
    skip_screenshots: bool,

    /// Depth bound for the main-content pass
    #[arg(long, default_value_t = 3)]
    max_depth: usize,

    /// Wall-clock budget in milliseconds
    #[arg(long, default_value_t = 60_000)]
    timeout: u64,

    /// Skip the main-content pass
    #[arg(long)]
    no_main_content: bool,

    /// Keep traversal order and leave scores at zero
    #[arg(long)]
    no_scoring: bool,

    /// Omit matched stylesheet rules from fragments
    #[arg(long)]
    no_stylesheet_rules: bool,

    /// Pretty-print the JSON output
    #[arg(long)]
    pretty: bool,

    /// Print only the metrics
    #[arg(long)]
    metrics_only: bool,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Path to the Chrome/Chromium executable
    #[arg(long)]
    chrome_path: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

impl Args {
    fn options(&self) -> ExtractionOptions {
        ExtractionOptions {
            max_components: self.max_components,
            component_types: (!self.types.is_empty()).then(|| self.types.clone()),
            skip_screenshots: self.skip_screenshots,
            max_depth: self.max_depth,
            timeout_ms: self.timeout,
            extract_main_content: !self.no_main_content,
            dynamic_scoring: !self.no_scoring,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();

    let default_filter = if args.verbose {
        "component_extractor=debug"
    } else {
        "component_extractor=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let chromium = ChromiumConfig {
        headless: !args.headful,
        executable: args.chrome_path.clone(),
        ..ChromiumConfig::default()
    };
    let config = ExtractorConfig {
        include_stylesheet_rules: !args.no_stylesheet_rules,
        ..ExtractorConfig::default()
    };

    let backend = std::sync::Arc::new(ChromiumBackend::launch(chromium).await?);
    let extractor = Extractor::from_shared(std::sync::Arc::clone(&backend), config);
    let outcome = extractor.extract(&args.url, &args.options()).await;
    if let Err(err) = backend.shutdown().await {
        tracing::warn!(error = %err, "browser shutdown failed");
    }
    let result = outcome?;

    let json = match (args.metrics_only, args.pretty) {
        (true, true) => serde_json::to_string_pretty(&result.metrics)?,
        (true, false) => serde_json::to_string(&result.metrics)?,
        (false, true) => serde_json::to_string_pretty(&result)?,
        (false, false) => serde_json::to_string(&result)?,
    };

    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{json}")?;
    Ok(())
}
