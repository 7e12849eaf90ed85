pub mod config;
pub mod error;
pub mod http_client;
pub mod ingest;
pub mod nhl_api;
pub mod season;
pub mod stats_store;
pub mod team_id;
