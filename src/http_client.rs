use std::time::Duration;

use anyhow::Context;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;

use crate::error::{IngestError, Result};

pub const LOADER_USER_AGENT: &str = "nhl-stats-loader/1.0 (+automation)";

pub fn build_http_client(timeout: Duration) -> anyhow::Result<Client> {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(LOADER_USER_AGENT));
    headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
    let client = Client::builder()
        .default_headers(headers)
        .timeout(timeout)
        .build()
        .context("failed to build http client")?;
    Ok(client)
}

pub fn get_json(client: &Client, url: &str) -> Result<Value> {
    let resp = client.get(url).send().map_err(|source| IngestError::Transport {
        url: url.to_string(),
        source,
    })?;
    let status = resp.status();
    if !status.is_success() {
        return Err(IngestError::HttpStatus {
            url: url.to_string(),
            status,
        });
    }
    let body = resp.text().map_err(|source| IngestError::Transport {
        url: url.to_string(),
        source,
    })?;
    serde_json::from_str::<Value>(body.trim()).map_err(|source| IngestError::Decode {
        url: url.to_string(),
        source,
    })
}
