pub mod config;
pub mod demo_feed;
pub mod event_cache;
pub mod feed;
pub mod http_client;
pub mod metrics;
pub mod model;
pub mod opr;
pub mod provider;
pub mod ratings_export;
pub mod state;
pub mod statbotics_fetch;
pub mod tba_fetch;

use std::sync::Arc;

use crate::config::{AppConfig, DataSource};
use crate::demo_feed::DemoProvider;
use crate::event_cache::EventCache;
use crate::metrics::MetricsEngine;
use crate::statbotics_fetch::StatboticsClient;
use crate::tba_fetch::TbaClient;

/// Wires the configured providers into an engine with a fresh cache.
pub fn build_engine(cfg: &AppConfig) -> MetricsEngine {
    let cache = Arc::new(EventCache::new());
    let engine = match cfg.data_source {
        DataSource::Demo => {
            let demo = Arc::new(DemoProvider::new(cfg.today - chrono::Duration::days(14)));
            MetricsEngine::new(demo.clone(), demo, cache)
        }
        DataSource::Tba => MetricsEngine::new(
            Arc::new(TbaClient::new(
                cfg.tba_base_url.clone(),
                cfg.tba_api_key.clone(),
                cfg.http_timeout_secs,
                cfg.breakdown_fields.clone(),
            )),
            Arc::new(StatboticsClient::new(
                cfg.statbotics_base_url.clone(),
                cfg.http_timeout_secs,
            )),
            cache,
        ),
    };
    engine
        .with_policy(cfg.unknown_team_policy)
        .with_fetch_parallelism(cfg.fetch_parallelism)
}

pub fn source_label(cfg: &AppConfig) -> &'static str {
    match cfg.data_source {
        DataSource::Demo => "DEMO",
        DataSource::Tba => "TBA+STATBOTICS",
    }
}
