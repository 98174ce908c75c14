#![allow(dead_code)]

pub mod portal_server;

use bidradar_core::config::CollectorConfig;
use std::path::Path;

/// Config pointing both listings at `base_url`, writing into `dir`, with no
/// courtesy delay between pages.
pub fn config_for(base_url: &str, dir: &Path) -> CollectorConfig {
    let mut cfg = CollectorConfig {
        output_dir: dir.to_path_buf(),
        inter_page_delay_ms: 0,
        ..CollectorConfig::default()
    };
    cfg.upstream.bids_base_url = base_url.to_string();
    cfg.upstream.awards_base_url = base_url.to_string();
    cfg.upstream.connect_timeout_secs = 2;
    cfg.upstream.timeout_secs = 2;
    cfg
}
