use rusqlite::{Connection, OptionalExtension, params};
use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::canonical_combining_class;

use crate::error::{PersistContext, Result};

/// Compatibility-decomposes `raw` and drops every char with a non-zero canonical
/// combining class, so `"Montréal"` becomes `"Montreal"`.
pub fn strip_diacritics(raw: &str) -> String {
    raw.nfkd()
        .filter(|ch| canonical_combining_class(*ch) == 0)
        .collect()
}

/// Accent- and case-folded form used to compare team names.
pub fn fold_name(raw: &str) -> String {
    strip_diacritics(raw).to_lowercase()
}

pub fn slug_from_name(name: &str) -> String {
    let folded = fold_name(name);
    let mut out = String::with_capacity(folded.len());
    let mut pending_sep = false;
    for ch in folded.chars() {
        if ch.is_ascii_lowercase() || ch.is_ascii_digit() {
            if pending_sep && !out.is_empty() {
                out.push('_');
            }
            pending_sep = false;
            out.push(ch);
        } else {
            pending_sep = true;
        }
    }
    out
}

/// Picks the reference-table id when the lookup found one, else the name slug.
pub fn resolve_team_id(looked_up: Option<String>, name: &str) -> String {
    looked_up.unwrap_or_else(|| slug_from_name(name))
}

pub fn lookup_team_id(conn: &Connection, name: &str) -> Result<Option<String>> {
    conn.query_row(
        "SELECT team_id
         FROM nhl_teams
         WHERE unaccent(team_name) = unaccent(?1)
         LIMIT 1",
        params![name],
        |row| row.get::<_, String>(0),
    )
    .optional()
    .persist("look up team id")
}

pub fn team_id_from_db_or_slug(conn: &Connection, name: &str) -> Result<String> {
    let looked_up = lookup_team_id(conn, name)?;
    Ok(resolve_team_id(looked_up, name))
}
