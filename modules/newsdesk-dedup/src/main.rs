use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use ai_client::Claude;
use newsdesk_common::{load_config, AppConfig, DedupSettings, PromptRegistry};
use newsdesk_dedup::{run_dedup_pass, DuplicateDetector, PgDuplicateStore};

const DEFAULT_DEDUP_MODEL: &str = "claude-haiku-4-5-20251001";

#[derive(Parser)]
#[command(name = "newsdesk-dedup", about = "Cross-source duplicate detection for collected articles")]
struct Cli {
    /// Path to config TOML file (defaults to NEWSDESK_CONFIG or config/newsdesk.toml)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Detect and log groups without writing them
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("newsdesk=info".parse()?))
        .init();

    let cli = Cli::parse();
    let app = AppConfig::from_env()?;
    let config_path = cli.config.unwrap_or_else(|| app.config_path.clone());

    let (model, settings, prompts) = match load_config(&config_path) {
        Ok(file_config) => {
            let config_dir = config_path.parent().unwrap_or_else(|| Path::new("."));
            let prompts = PromptRegistry::load_or_default(&file_config, config_dir);
            (file_config.models.dedup, file_config.dedup, prompts)
        }
        Err(e) => {
            warn!(
                path = %config_path.display(),
                error = %e,
                "Config unavailable, using default dedup settings and built-in prompts"
            );
            (
                DEFAULT_DEDUP_MODEL.to_string(),
                DedupSettings::default(),
                PromptRegistry::builtin(),
            )
        }
    };

    info!(
        model = %model,
        threshold = settings.confidence_threshold,
        window_hours = settings.time_window_hours,
        max_concurrent = settings.max_concurrent,
        dry_run = cli.dry_run,
        "Starting duplicate detection"
    );

    let oracle = Arc::new(Claude::new(&app.anthropic_api_key, model));
    let detector = DuplicateDetector::new(oracle, settings, prompts)?;

    let store = PgDuplicateStore::connect(&app.database_url).await?;
    store.migrate().await?;

    let result = run_dedup_pass(&store, &detector, cli.dry_run).await?;
    println!("{}", result.stats);

    Ok(())
}
