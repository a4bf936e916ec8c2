// Shared test helpers
#![allow(dead_code)]

use chrono::{DateTime, NaiveDateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;
use trafficstore::traffic_repo::{StoreOptions, TrafficRepo};

/// Options whose space check always passes.
pub fn options(create_if_missing: bool) -> StoreOptions {
    StoreOptions::new(create_if_missing, Arc::new(|_: &Path| true))
}

/// Options whose space check always fails.
pub fn options_without_space(create_if_missing: bool) -> StoreOptions {
    StoreOptions::new(create_if_missing, Arc::new(|_: &Path| false))
}

pub fn db_path(dir: &TempDir) -> PathBuf {
    dir.path().join("traffic.db")
}

/// Fresh store in a temp dir. Keep the `TempDir` alive for the test.
pub async fn fresh_repo() -> (TempDir, TrafficRepo) {
    let dir = TempDir::new().unwrap();
    let repo = TrafficRepo::open(&db_path(&dir), &options(true))
        .await
        .unwrap();
    (dir, repo)
}

/// UTC instant from `YYYY-MM-DD HH:MM:SS`.
pub fn at(s: &str) -> DateTime<Utc> {
    NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .unwrap()
        .and_utc()
}
