use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::America::New_York;

/// Month from which a new season is considered current (July).
const SEASON_ROLLOVER_MONTH: u32 = 7;

/// Returns the season id (`"20252026"`) to ingest. A non-blank override wins
/// unchanged; otherwise the season is inferred from `as_of`, or today in US Eastern.
pub fn resolve_season(override_season: Option<&str>, as_of: Option<NaiveDate>) -> String {
    if let Some(season) = override_season
        && !season.is_empty()
    {
        return season.to_string();
    }
    let today = as_of.unwrap_or_else(today_eastern);
    season_for_date(today)
}

pub fn season_for_date(date: NaiveDate) -> String {
    let year = date.year();
    let start_year = if date.month() < SEASON_ROLLOVER_MONTH {
        year - 1
    } else {
        year
    };
    format!("{}{}", start_year, start_year + 1)
}

fn today_eastern() -> NaiveDate {
    Utc::now().with_timezone(&New_York).date_naive()
}
