// Bucket rows and sampler output

use serde::Serialize;

use super::{InterfaceId, Resolution};

/// Accumulated rx/tx for one interface over one period at one resolution.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Bucket {
    pub id: i64,
    pub interface: InterfaceId,
    pub resolution: Resolution,
    /// Period key, see [`Resolution::period_key`].
    pub date: String,
    pub rx: u64,
    pub tx: u64,
}

/// Bytes moved on one interface since the previous sample.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrafficSample {
    pub interface: String,
    pub rx: u64,
    pub tx: u64,
}
