use std::collections::HashMap;
use std::io::{BufRead, BufReader, Write};
use std::net::TcpListener;
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use reqwest::StatusCode;
use rusqlite::Connection;

use nhl_team_stats::error::IngestError;
use nhl_team_stats::http_client::{LOADER_USER_AGENT, build_http_client};
use nhl_team_stats::ingest::{IngestOptions, run_ingest};
use nhl_team_stats::nhl_api::{NhlApi, StatsSource};
use nhl_team_stats::stats_store::{load_team_stats, prepare_connection};

const SEASON: &str = "20252026";

/// Canned HTTP/1.1 server on a random local port. Unknown paths get a 404.
struct CannedServer {
    base_url: String,
    requests: Arc<Mutex<Vec<(String, Option<String>)>>>,
}

impl CannedServer {
    fn start(routes: &[(&str, u16, &str)]) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind local port");
        let addr = listener.local_addr().expect("local addr");
        let routes = routes
            .iter()
            .map(|(path, status, body)| (path.to_string(), (*status, body.to_string())))
            .collect::<HashMap<_, _>>();
        let requests = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&requests);

        thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(mut stream) = stream else {
                    continue;
                };
                let mut reader = BufReader::new(stream.try_clone().expect("clone stream"));
                let mut request_line = String::new();
                if reader.read_line(&mut request_line).is_err() {
                    continue;
                }
                let mut user_agent = None;
                loop {
                    let mut line = String::new();
                    match reader.read_line(&mut line) {
                        Ok(0) | Err(_) => break,
                        Ok(_) if line == "\r\n" => break,
                        Ok(_) => {
                            if let Some((name, value)) = line.split_once(':')
                                && name.eq_ignore_ascii_case("user-agent")
                            {
                                user_agent = Some(value.trim().to_string());
                            }
                        }
                    }
                }
                let path = request_line
                    .split_whitespace()
                    .nth(1)
                    .unwrap_or_default()
                    .to_string();
                seen.lock().expect("requests lock").push((path.clone(), user_agent));

                let (status, body) = routes
                    .get(&path)
                    .cloned()
                    .unwrap_or((404, r#"{"message":"not found"}"#.to_string()));
                let response = format!(
                    "HTTP/1.1 {status} Canned\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(response.as_bytes());
                let _ = stream.flush();
            }
        });

        CannedServer {
            base_url: format!("http://{addr}/v1"),
            requests,
        }
    }

    fn paths(&self) -> Vec<String> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|(path, _)| path.clone())
            .collect()
    }

    fn user_agents(&self) -> Vec<Option<String>> {
        self.requests
            .lock()
            .expect("requests lock")
            .iter()
            .map(|(_, ua)| ua.clone())
            .collect()
    }
}

fn client() -> reqwest::blocking::Client {
    build_http_client(Duration::from_secs(5)).expect("http client")
}

#[test]
fn club_stats_not_found_means_no_data() {
    let server = CannedServer::start(&[]);
    let client = client();
    let api = NhlApi::new(&client, server.base_url.clone());

    let stats = api.fetch_team_stats("bos", SEASON).expect("404 is not fatal");
    assert!(stats.is_none());
    assert_eq!(server.paths(), vec!["/v1/club-stats/BOS/20252026/2"]);
    assert_eq!(
        server.user_agents(),
        vec![Some(LOADER_USER_AGENT.to_string())]
    );
}

#[test]
fn club_stats_server_error_aborts() {
    let server = CannedServer::start(&[("/v1/club-stats/TOR/20252026/2", 503, "{}")]);
    let client = client();
    let api = NhlApi::new(&client, server.base_url.clone());

    let err = api.fetch_team_stats("tor", SEASON).unwrap_err();
    assert!(matches!(
        err,
        IngestError::HttpStatus { status, .. } if status == StatusCode::SERVICE_UNAVAILABLE
    ));
}

#[test]
fn club_stats_invalid_json_aborts() {
    let server = CannedServer::start(&[("/v1/club-stats/TOR/20252026/2", 200, "{not json")]);
    let client = client();
    let api = NhlApi::new(&client, server.base_url.clone());

    let err = api.fetch_team_stats("tor", SEASON).unwrap_err();
    assert!(matches!(err, IngestError::Decode { .. }));
}

#[test]
fn club_stats_success_is_mapped() {
    let server = CannedServer::start(&[(
        "/v1/club-stats/BOS/20252026/2",
        200,
        r#"{"gamesPlayed":10,"wins":7,"losses":3,"points":14,"overtimeLosses":0}"#,
    )]);
    let client = client();
    let api = NhlApi::new(&client, server.base_url.clone());

    let line = api
        .fetch_team_stats("bos", SEASON)
        .expect("fetch")
        .expect("stats present");
    assert_eq!(line.gp, Some(10));
    assert_eq!(line.ot, Some(0));
}

#[test]
fn directory_server_error_aborts() {
    let server = CannedServer::start(&[("/v1/teams", 500, "{}")]);
    let client = client();
    let api = NhlApi::new(&client, server.base_url.clone());

    let err = api.fetch_teams().unwrap_err();
    assert!(matches!(err, IngestError::HttpStatus { .. }));
}

#[test]
fn directory_not_found_aborts() {
    let server = CannedServer::start(&[]);
    let client = client();
    let api = NhlApi::new(&client, server.base_url.clone());

    let err = api.fetch_teams().unwrap_err();
    assert!(matches!(
        err,
        IngestError::HttpStatus { status, .. } if status == StatusCode::NOT_FOUND
    ));
}

#[test]
fn directory_error_object_aborts_run_without_writes() {
    let server = CannedServer::start(&[(
        "/v1/teams",
        200,
        r#"{"error":"upstream changed","teams":[{"triCode":"BOS","fullName":"Boston Bruins"}]}"#,
    )]);
    let client = client();
    let api = NhlApi::new(&client, server.base_url.clone());
    let mut conn = Connection::open_in_memory().expect("in-memory db");
    prepare_connection(&conn).expect("schema");

    let err = run_ingest(
        &mut conn,
        &api,
        &IngestOptions {
            season: SEASON.to_string(),
            delay: Duration::ZERO,
        },
    )
    .unwrap_err();
    assert!(matches!(err, IngestError::UnexpectedShape { .. }));
    let rows: i64 = conn
        .query_row("SELECT COUNT(*) FROM nhl_team_stats", [], |r| r.get(0))
        .expect("count");
    assert_eq!(rows, 0);
}

#[test]
fn full_run_over_http_persists_one_team() {
    let server = CannedServer::start(&[
        (
            "/v1/teams",
            200,
            r#"[{"triCode":"BOS","fullName":"Boston Bruins"},{"triCode":"SEA","fullName":"Seattle Kraken"}]"#,
        ),
        (
            "/v1/club-stats/BOS/20252026/2",
            200,
            r#"{"gamesPlayed":10,"wins":7,"losses":3,"points":14}"#,
        ),
    ]);
    let client = client();
    let api = NhlApi::new(&client, server.base_url.clone());
    let mut conn = Connection::open_in_memory().expect("in-memory db");
    prepare_connection(&conn).expect("schema");

    let summary = run_ingest(
        &mut conn,
        &api,
        &IngestOptions {
            season: SEASON.to_string(),
            delay: Duration::ZERO,
        },
    )
    .expect("ingest");

    assert_eq!(summary.upserted, 1);
    assert_eq!(summary.teams_skipped, 1);
    assert_eq!(
        server.paths(),
        vec![
            "/v1/teams",
            "/v1/club-stats/BOS/20252026/2",
            "/v1/club-stats/SEA/20252026/2",
        ]
    );
    let stored = load_team_stats(&conn, "boston_bruins", SEASON)
        .expect("load")
        .expect("row");
    assert_eq!(stored.record.stats.gp, Some(10));
    assert_eq!(stored.record.stats.w, Some(7));
    assert_eq!(stored.record.stats.l, Some(3));
    assert_eq!(stored.record.stats.points, Some(14));
    assert_eq!(stored.record.stats.gf, None);
    assert_eq!(stored.record.source, "api-web.nhle.com/bos/20252026");
}
