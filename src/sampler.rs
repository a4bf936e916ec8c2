// Interface byte counters via sysinfo. Each sample is the delta since the
// previous refresh; wraparound is handled by sysinfo.

use crate::models::TrafficSample;
use std::sync::Arc;
use sysinfo::Networks;
use tracing::instrument;

pub struct NetworkSampler {
    networks: Arc<std::sync::Mutex<Networks>>,
}

impl Default for NetworkSampler {
    fn default() -> Self {
        Self::new()
    }
}

impl NetworkSampler {
    pub fn new() -> Self {
        Self {
            networks: Arc::new(std::sync::Mutex::new(Networks::new_with_refreshed_list())),
        }
    }

    /// One sample per interface currently present, sorted by name.
    #[instrument(skip(self), fields(repo = "sysinfo", operation = "sample"))]
    pub async fn sample(&self) -> anyhow::Result<Vec<TrafficSample>> {
        let networks = self.networks.clone();
        tokio::task::spawn_blocking(move || {
            let mut guard = networks
                .lock()
                .map_err(|e| anyhow::anyhow!("sysinfo networks lock poisoned: {}", e))?;
            guard.refresh(true);
            let mut samples: Vec<TrafficSample> = guard
                .list()
                .iter()
                .map(|(name, data)| TrafficSample {
                    interface: name.clone(),
                    rx: data.received(),
                    tx: data.transmitted(),
                })
                .collect();
            samples.sort_by(|a, b| a.interface.cmp(&b.interface));
            Ok(samples)
        })
        .await
        .map_err(|e| anyhow::anyhow!("sysinfo task join: {}", e))?
    }
}
