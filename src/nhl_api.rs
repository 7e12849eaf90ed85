use anyhow::anyhow;
use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::error::{IngestError, Result};
use crate::http_client::get_json;

/// Game-type selector for regular-season aggregates (3 would be playoffs).
pub const REGULAR_SEASON_GAME_TYPE: u8 = 2;
const SOURCE_HOST: &str = "api-web.nhle.com";

const TEAM_CODE_FIELDS: &[&str] = &["triCode", "abbrev", "teamAbbrev"];
const TEAM_NAME_FIELDS: &[&str] = &["fullName", "name", "teamName"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Team {
    /// Lowercased tri-code, e.g. `bos`.
    pub code: String,
    pub name: String,
}

/// Season-to-date aggregates for one club. Every field is optional because the
/// upstream payload omits whatever it has not computed yet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TeamStatLine {
    pub gp: Option<i64>,
    pub w: Option<i64>,
    pub l: Option<i64>,
    pub ties: Option<i64>,
    pub ot: Option<i64>,
    pub points: Option<i64>,
    pub points_pct: Option<f64>,
    pub rw: Option<i64>,
    pub row: Option<i64>,
    pub so_wins: Option<i64>,
    pub gf: Option<i64>,
    pub ga: Option<i64>,
    pub gf_per_gp: Option<f64>,
    pub ga_per_gp: Option<f64>,
    pub pp_pct: Option<f64>,
    pub pk_pct: Option<f64>,
    pub net_pp_pct: Option<f64>,
    pub net_pk_pct: Option<f64>,
    pub shots_per_gp: Option<f64>,
    pub sa_per_gp: Option<f64>,
    pub fow_pct: Option<f64>,
}

impl TeamStatLine {
    pub fn is_empty(&self) -> bool {
        *self == TeamStatLine::default()
    }
}

/// Where teams and their aggregates come from.
pub trait StatsSource {
    fn fetch_teams(&self) -> Result<Vec<Team>>;

    /// `Ok(None)` means the upstream has nothing for this team and season yet.
    fn fetch_team_stats(&self, team_code: &str, season: &str) -> Result<Option<TeamStatLine>>;

    fn source_label(&self, team_code: &str, season: &str) -> String {
        source_label(team_code, season)
    }
}

pub struct NhlApi<'a> {
    client: &'a Client,
    base_url: String,
}

impl<'a> NhlApi<'a> {
    pub fn new(client: &'a Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn teams_url(&self) -> String {
        format!("{}/teams", self.base_url)
    }

    pub fn club_stats_url(&self, team_code: &str, season: &str) -> String {
        format!(
            "{}/club-stats/{}/{}/{}",
            self.base_url,
            team_code.to_ascii_uppercase(),
            season,
            REGULAR_SEASON_GAME_TYPE
        )
    }
}

impl StatsSource for NhlApi<'_> {
    fn fetch_teams(&self) -> Result<Vec<Team>> {
        let url = self.teams_url();
        let value = get_json(self.client, &url)?;
        teams_from_value(&value).ok_or(IngestError::UnexpectedShape {
            url,
            expected: "array of teams",
        })
    }

    fn fetch_team_stats(&self, team_code: &str, season: &str) -> Result<Option<TeamStatLine>> {
        let url = self.club_stats_url(team_code, season);
        match get_json(self.client, &url) {
            Ok(value) => Ok(team_stats_from_value(&value)),
            Err(err) if err.is_client_error() => {
                debug!(%url, error = %err, "no club stats published yet");
                Ok(None)
            }
            Err(err) => Err(err),
        }
    }
}

pub fn source_label(team_code: &str, season: &str) -> String {
    format!("{SOURCE_HOST}/{team_code}/{season}")
}

pub fn parse_teams_json(raw: &str) -> anyhow::Result<Vec<Team>> {
    let value = serde_json::from_str::<Value>(raw.trim())?;
    teams_from_value(&value).ok_or_else(|| anyhow!("team directory is not an array"))
}

/// `None` when the payload carries no team array, either bare or under `data`.
pub fn teams_from_value(value: &Value) -> Option<Vec<Team>> {
    let entries = value
        .as_array()
        .or_else(|| value.get("data").and_then(Value::as_array))?;
    Some(entries.iter().filter_map(team_from_value).collect())
}

pub fn team_from_value(v: &Value) -> Option<Team> {
    let code = first_text(v, TEAM_CODE_FIELDS)?;
    let name = first_text(v, TEAM_NAME_FIELDS)?;
    Some(Team {
        code: code.to_lowercase(),
        name,
    })
}

pub fn parse_team_stats_json(raw: &str) -> serde_json::Result<Option<TeamStatLine>> {
    let value = serde_json::from_str::<Value>(raw.trim())?;
    Ok(team_stats_from_value(&value))
}

/// Maps a club-stats payload onto [`TeamStatLine`]. Returns `None` for
/// non-object payloads and for payloads carrying none of the known fields.
pub fn team_stats_from_value(v: &Value) -> Option<TeamStatLine> {
    if !v.is_object() {
        return None;
    }
    let line = TeamStatLine {
        gp: int_field(v, &["gamesPlayed"]),
        w: int_field(v, &["wins"]),
        l: int_field(v, &["losses"]),
        // No tied outcomes since the shootout era; column kept for old rows.
        ties: None,
        ot: int_field(v, &["otLosses", "overtimeLosses"]),
        points: int_field(v, &["points"]),
        points_pct: float_field(v, &["pointsPct"]),
        rw: int_field(v, &["regulationWins"]),
        row: int_field(v, &["regulationPlusOtWins", "row"]),
        so_wins: int_field(v, &["shootoutWins"]),
        gf: int_field(v, &["goalsFor"]),
        ga: int_field(v, &["goalsAgainst"]),
        gf_per_gp: float_field(v, &["goalsForPerGame"]),
        ga_per_gp: float_field(v, &["goalsAgainstPerGame"]),
        pp_pct: float_field(v, &["powerPlayPct"]),
        pk_pct: float_field(v, &["penaltyKillPct"]),
        net_pp_pct: float_field(v, &["netPowerPlayPct"]),
        net_pk_pct: float_field(v, &["netPenaltyKillPct"]),
        shots_per_gp: float_field(v, &["shotsForPerGame"]),
        sa_per_gp: float_field(v, &["shotsAgainstPerGame"]),
        fow_pct: float_field(v, &["faceoffWinPct"]),
    };
    if line.is_empty() { None } else { Some(line) }
}

fn first_text(v: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let field = v.get(*key)?;
        let text = field
            .as_str()
            .or_else(|| field.get("default").and_then(Value::as_str))?
            .trim();
        (!text.is_empty()).then(|| text.to_string())
    })
}

fn int_field(v: &Value, keys: &[&str]) -> Option<i64> {
    keys.iter().find_map(|key| v.get(*key).and_then(as_i64_any))
}

fn float_field(v: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|key| v.get(*key).and_then(as_f64_any))
}

fn as_i64_any(v: &Value) -> Option<i64> {
    if let Some(n) = v.as_i64() {
        return Some(n);
    }
    if let Some(f) = v.as_f64()
        && f.fract() == 0.0
    {
        return Some(f as i64);
    }
    v.as_str()?.trim().parse::<i64>().ok()
}

fn as_f64_any(v: &Value) -> Option<f64> {
    if let Some(n) = v.as_f64() {
        return Some(n);
    }
    v.as_str()?.trim().parse::<f64>().ok()
}
