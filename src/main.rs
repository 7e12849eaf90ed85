use anyhow::{Context, Result};
use tracing::info;
use tracing_subscriber::EnvFilter;

use nhl_team_stats::config::Config;
use nhl_team_stats::http_client::build_http_client;
use nhl_team_stats::ingest::{IngestOptions, run_ingest};
use nhl_team_stats::nhl_api::NhlApi;
use nhl_team_stats::season::resolve_season;
use nhl_team_stats::stats_store;

fn main() -> Result<()> {
    init_logging();

    let config = Config::load()?;
    let season = resolve_season(config.season_override.as_deref(), None);
    info!(%season, db = %config.db_path.display(), api = %config.api_base, "starting team stats ingest");

    let client = build_http_client(config.http_timeout)?;
    let api = NhlApi::new(&client, config.api_base.clone());

    let mut conn = stats_store::open_db(&config.db_path)
        .with_context(|| format!("open database {}", config.db_path.display()))?;
    let summary = run_ingest(
        &mut conn,
        &api,
        &IngestOptions {
            season,
            delay: config.request_delay,
        },
    )?;

    println!("{}", summary.summary_line());
    Ok(())
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
