use std::path::Path;

use chrono::{SecondsFormat, Utc};
use rusqlite::functions::FunctionFlags;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

use crate::error::{PersistContext, Result};
use crate::nhl_api::TeamStatLine;
use crate::team_id::fold_name;

/// One row of `nhl_team_stats`, keyed by `(team_id, season)`.
#[derive(Debug, Clone, PartialEq)]
pub struct TeamSeasonStats {
    pub team_id: String,
    pub season: String,
    pub stats: TeamStatLine,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StoredTeamStats {
    pub record: TeamSeasonStats,
    pub ingested_at: String,
}

pub fn open_db(path: &Path) -> Result<Connection> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).ok();
    }
    let conn = Connection::open(path).persist("open sqlite database")?;
    conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get::<_, String>(0))
        .persist("enable wal journal")?;
    prepare_connection(&conn)?;
    Ok(conn)
}

/// Installs `unaccent` and makes sure both tables exist.
pub fn prepare_connection(conn: &Connection) -> Result<()> {
    install_unaccent(conn)?;
    init_schema(conn)
}

/// Registers the `unaccent(text)` SQL function, which strips accents and folds
/// case (SQLite's `lower()` only folds ASCII). Registering again replaces the
/// previous definition, so calling this more than once is harmless.
pub fn install_unaccent(conn: &Connection) -> Result<()> {
    conn.create_scalar_function(
        "unaccent",
        1,
        FunctionFlags::SQLITE_UTF8 | FunctionFlags::SQLITE_DETERMINISTIC,
        |ctx| {
            let raw = ctx.get::<Option<String>>(0)?;
            Ok(raw.map(|s| fold_name(&s)))
        },
    )
    .persist("install unaccent function")
}

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS nhl_teams (
            team_id TEXT PRIMARY KEY,
            team_name TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS nhl_team_stats (
            team_id TEXT NOT NULL,
            season TEXT NOT NULL,
            gp INTEGER NULL,
            w INTEGER NULL,
            l INTEGER NULL,
            ties INTEGER NULL,
            ot INTEGER NULL,
            points INTEGER NULL,
            points_pct REAL NULL,
            rw INTEGER NULL,
            "row" INTEGER NULL,
            so_wins INTEGER NULL,
            gf INTEGER NULL,
            ga INTEGER NULL,
            gf_per_gp REAL NULL,
            ga_per_gp REAL NULL,
            pp_pct REAL NULL,
            pk_pct REAL NULL,
            net_pp_pct REAL NULL,
            net_pk_pct REAL NULL,
            shots_per_gp REAL NULL,
            sa_per_gp REAL NULL,
            fow_pct REAL NULL,
            source TEXT NOT NULL,
            ingested_at TEXT NOT NULL,
            PRIMARY KEY (team_id, season)
        );
        CREATE INDEX IF NOT EXISTS idx_team_stats_season ON nhl_team_stats(season);
        "#,
    )
    .persist("create sqlite schema")
}

pub fn upsert_team_stats(tx: &Transaction<'_>, rec: &TeamSeasonStats) -> Result<()> {
    let s = &rec.stats;
    tx.execute(
        r#"
        INSERT INTO nhl_team_stats (
            team_id, season, gp, w, l, ties, ot, points, points_pct,
            rw, "row", so_wins, gf, ga, gf_per_gp, ga_per_gp,
            pp_pct, pk_pct, net_pp_pct, net_pk_pct, shots_per_gp, sa_per_gp, fow_pct,
            source, ingested_at
        ) VALUES (
            ?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9,
            ?10, ?11, ?12, ?13, ?14, ?15, ?16,
            ?17, ?18, ?19, ?20, ?21, ?22, ?23,
            ?24, ?25
        )
        ON CONFLICT(team_id, season) DO UPDATE SET
            gp = excluded.gp,
            w = excluded.w,
            l = excluded.l,
            ties = excluded.ties,
            ot = excluded.ot,
            points = excluded.points,
            points_pct = excluded.points_pct,
            rw = excluded.rw,
            "row" = excluded."row",
            so_wins = excluded.so_wins,
            gf = excluded.gf,
            ga = excluded.ga,
            gf_per_gp = excluded.gf_per_gp,
            ga_per_gp = excluded.ga_per_gp,
            pp_pct = excluded.pp_pct,
            pk_pct = excluded.pk_pct,
            net_pp_pct = excluded.net_pp_pct,
            net_pk_pct = excluded.net_pk_pct,
            shots_per_gp = excluded.shots_per_gp,
            sa_per_gp = excluded.sa_per_gp,
            fow_pct = excluded.fow_pct,
            source = excluded.source,
            ingested_at = excluded.ingested_at
        "#,
        params![
            rec.team_id,
            rec.season,
            s.gp,
            s.w,
            s.l,
            s.ties,
            s.ot,
            s.points,
            s.points_pct,
            s.rw,
            s.row,
            s.so_wins,
            s.gf,
            s.ga,
            s.gf_per_gp,
            s.ga_per_gp,
            s.pp_pct,
            s.pk_pct,
            s.net_pp_pct,
            s.net_pk_pct,
            s.shots_per_gp,
            s.sa_per_gp,
            s.fow_pct,
            rec.source,
            now_timestamp(),
        ],
    )
    .persist("upsert team stats")?;
    Ok(())
}

pub fn load_team_stats(
    conn: &Connection,
    team_id: &str,
    season: &str,
) -> Result<Option<StoredTeamStats>> {
    conn.query_row(
        r#"
        SELECT
            team_id, season, gp, w, l, ties, ot, points, points_pct,
            rw, "row", so_wins, gf, ga, gf_per_gp, ga_per_gp,
            pp_pct, pk_pct, net_pp_pct, net_pk_pct, shots_per_gp, sa_per_gp, fow_pct,
            source, ingested_at
        FROM nhl_team_stats
        WHERE team_id = ?1 AND season = ?2
        "#,
        params![team_id, season],
        stored_from_row,
    )
    .optional()
    .persist("load team stats")
}

fn stored_from_row(row: &Row<'_>) -> rusqlite::Result<StoredTeamStats> {
    Ok(StoredTeamStats {
        record: TeamSeasonStats {
            team_id: row.get(0)?,
            season: row.get(1)?,
            stats: TeamStatLine {
                gp: row.get(2)?,
                w: row.get(3)?,
                l: row.get(4)?,
                ties: row.get(5)?,
                ot: row.get(6)?,
                points: row.get(7)?,
                points_pct: row.get(8)?,
                rw: row.get(9)?,
                row: row.get(10)?,
                so_wins: row.get(11)?,
                gf: row.get(12)?,
                ga: row.get(13)?,
                gf_per_gp: row.get(14)?,
                ga_per_gp: row.get(15)?,
                pp_pct: row.get(16)?,
                pk_pct: row.get(17)?,
                net_pp_pct: row.get(18)?,
                net_pk_pct: row.get(19)?,
                shots_per_gp: row.get(20)?,
                sa_per_gp: row.get(21)?,
                fow_pct: row.get(22)?,
            },
            source: row.get(23)?,
        },
        ingested_at: row.get(24)?,
    })
}

fn now_timestamp() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true)
}
