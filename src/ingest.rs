use std::thread;
use std::time::Duration;

use rusqlite::Connection;
use tracing::{debug, info};

use crate::error::{PersistContext, Result};
use crate::nhl_api::StatsSource;
use crate::stats_store::{TeamSeasonStats, install_unaccent, upsert_team_stats};
use crate::team_id::team_id_from_db_or_slug;

#[derive(Debug, Clone)]
pub struct IngestOptions {
    pub season: String,
    /// Pause after each upsert so the upstream API is not hammered.
    pub delay: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestSummary {
    pub season: String,
    pub teams_seen: usize,
    pub teams_skipped: usize,
    pub upserted: usize,
}

impl IngestSummary {
    pub fn summary_line(&self) -> String {
        format!(
            "Upserted stats for {} teams for season {}",
            self.upserted, self.season
        )
    }
}

/// Fetches every active team's aggregates and upserts them inside one
/// transaction. Any error drops the transaction, rolling back the whole run.
pub fn run_ingest<S: StatsSource>(
    conn: &mut Connection,
    source: &S,
    opts: &IngestOptions,
) -> Result<IngestSummary> {
    let season = opts.season.as_str();
    install_unaccent(conn)?;
    let tx = conn.transaction().persist("begin ingest transaction")?;

    let teams = source.fetch_teams()?;
    info!(season, teams = teams.len(), "fetched team directory");

    let mut teams_skipped = 0usize;
    let mut upserted = 0usize;
    for team in &teams {
        let Some(stats) = source.fetch_team_stats(&team.code, season)? else {
            debug!(team = %team.code, "no stats yet, skipping");
            teams_skipped += 1;
            continue;
        };

        let team_id = team_id_from_db_or_slug(&tx, &team.name)?;
        let record = TeamSeasonStats {
            team_id,
            season: season.to_string(),
            stats,
            source: source.source_label(&team.code, season),
        };
        upsert_team_stats(&tx, &record)?;
        upserted += 1;
        debug!(team = %team.code, team_id = %record.team_id, "upserted team stats");

        if !opts.delay.is_zero() {
            thread::sleep(opts.delay);
        }
    }

    tx.commit().persist("commit ingest transaction")?;
    info!(season, upserted, skipped = teams_skipped, "ingest committed");

    Ok(IngestSummary {
        season: season.to_string(),
        teams_seen: teams.len(),
        teams_skipped,
        upserted,
    })
}
