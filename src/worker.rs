// Sampling worker: every tick, read interface deltas and account them.
// A failed write is kept and added onto the next cycle's delta; shutdown
// takes one last sample and flushes what is still owed.

use crate::models::TrafficSample;
use crate::sampler::NetworkSampler;
use crate::traffic_repo::TrafficRepo;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use tokio::time::{Duration, interval};
use tracing::Instrument;

pub struct WorkerDeps {
    pub sampler: Arc<NetworkSampler>,
    pub repo: Arc<TrafficRepo>,
    pub shutdown_rx: tokio::sync::oneshot::Receiver<()>,
}

pub struct WorkerConfig {
    pub sample_interval_secs: u64,
    /// How often to log worker stats (real seconds).
    pub stats_log_interval_secs: u64,
    /// Interfaces to account; empty means all.
    pub interfaces: Vec<String>,
}

/// Whether `name` passes the configured interface filter.
pub fn is_tracked(interfaces: &[String], name: &str) -> bool {
    interfaces.is_empty() || interfaces.iter().any(|i| i == name)
}

/// Interfaces seen last cycle that are gone now.
pub fn vanished<'a>(previous: &'a HashSet<String>, current: &'a HashSet<String>) -> Vec<&'a str> {
    let mut out: Vec<&str> = previous
        .difference(current)
        .map(String::as_str)
        .collect();
    out.sort_unstable();
    out
}

/// Adds deltas that failed to persist onto the fresh samples.
pub fn merge_pending(
    samples: Vec<TrafficSample>,
    pending: &mut HashMap<String, (u64, u64)>,
) -> Vec<TrafficSample> {
    let mut out: Vec<TrafficSample> = samples
        .into_iter()
        .map(|mut s| {
            if let Some((rx, tx)) = pending.remove(&s.interface) {
                s.rx = s.rx.saturating_add(rx);
                s.tx = s.tx.saturating_add(tx);
            }
            s
        })
        .collect();
    // Interfaces that vanished still owe their last delta.
    out.extend(pending.drain().map(|(interface, (rx, tx))| TrafficSample { interface, rx, tx }));
    out
}

#[derive(Debug, Default)]
struct WorkerStats {
    samples_written: u64,
    write_failures: u64,
}

/// Accounting state carried from one sampling cycle to the next: the
/// interfaces present last cycle and the deltas still owed to the store.
pub struct TrafficRecorder {
    repo: Arc<TrafficRepo>,
    interfaces: Vec<String>,
    present: HashSet<String>,
    pending: HashMap<String, (u64, u64)>,
    stats: WorkerStats,
}

impl TrafficRecorder {
    pub fn new(repo: Arc<TrafficRepo>, interfaces: Vec<String>) -> Self {
        Self {
            repo,
            interfaces,
            present: HashSet::new(),
            pending: HashMap::new(),
            stats: WorkerStats::default(),
        }
    }

    /// Deltas whose write failed and will be retried.
    pub fn pending(&self) -> &HashMap<String, (u64, u64)> {
        &self.pending
    }

    /// One sampling cycle: write the tracked samples plus anything
    /// pending, then mark interfaces that are no longer present inactive.
    pub async fn record(&mut self, samples: Vec<TrafficSample>) {
        let samples = self.tracked(samples);
        let current: HashSet<String> = samples.iter().map(|s| s.interface.clone()).collect();
        let written = self.write(samples).await;

        // A retried delta for a vanished interface reactivates it.
        let mut gone: BTreeSet<String> = vanished(&self.present, &current)
            .into_iter()
            .map(str::to_owned)
            .collect();
        gone.extend(written.into_iter().filter(|name| !current.contains(name)));

        for name in gone {
            match self.repo.set_interface_active(&name, false).await {
                Ok(()) => tracing::info!(interface = %name, "interface gone, marked inactive"),
                Err(e) => tracing::debug!(
                    error = %e,
                    interface = %name,
                    operation = "set_interface_active",
                    "could not mark interface inactive"
                ),
            }
        }
        self.present = current;
    }

    /// Last write before shutdown. Interfaces keep their active flag.
    pub async fn finish(&mut self, samples: Vec<TrafficSample>) {
        let samples = self.tracked(samples);
        self.write(samples).await;
        if !self.pending.is_empty() {
            tracing::warn!(
                interfaces = self.pending.len(),
                "final flush failed, pending deltas lost"
            );
        }
    }

    fn tracked(&self, samples: Vec<TrafficSample>) -> Vec<TrafficSample> {
        samples
            .into_iter()
            .filter(|s| is_tracked(&self.interfaces, &s.interface))
            .collect()
    }

    /// Writes samples merged with pending deltas; returns the interfaces written.
    async fn write(&mut self, samples: Vec<TrafficSample>) -> Vec<String> {
        let mut written = Vec::new();
        for s in merge_pending(samples, &mut self.pending) {
            let result = self.repo.add_traffic(&s.interface, s.rx, s.tx).await;
            match result {
                Ok(()) => {
                    self.stats.samples_written += 1;
                    written.push(s.interface);
                }
                Err(e) if !e.is_retryable() => {
                    self.stats.write_failures += 1;
                    tracing::warn!(
                        error = %e,
                        interface = %s.interface,
                        operation = "add_traffic",
                        "traffic write rejected, delta dropped"
                    );
                }
                Err(e) => {
                    self.stats.write_failures += 1;
                    tracing::warn!(
                        error = %e,
                        interface = %s.interface,
                        operation = "add_traffic",
                        "traffic write failed, retrying next cycle"
                    );
                    self.pending.insert(s.interface, (s.rx, s.tx));
                }
            }
        }
        written
    }

    fn log_stats(&self) {
        tracing::info!(
            interfaces = self.present.len(),
            samples_written = self.stats.samples_written,
            write_failures = self.stats.write_failures,
            pending = self.pending.len(),
            "worker stats"
        );
    }
}

pub fn spawn(deps: WorkerDeps, config: WorkerConfig) -> tokio::task::JoinHandle<()> {
    let WorkerDeps {
        sampler,
        repo,
        mut shutdown_rx,
    } = deps;
    let WorkerConfig {
        sample_interval_secs,
        stats_log_interval_secs,
        interfaces,
    } = config;

    let worker_span = tracing::span!(tracing::Level::DEBUG, "worker", sample_interval_secs);

    tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(sample_interval_secs));
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
        let mut stats_log_tick = interval(Duration::from_secs(stats_log_interval_secs));
        stats_log_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        let mut recorder = TrafficRecorder::new(repo, interfaces);

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    match sampler.sample().await {
                        Ok(samples) => recorder.record(samples).await,
                        Err(e) => {
                            tracing::warn!(error = %e, operation = "sample", "interface sampling failed");
                        }
                    }
                }
                _ = &mut shutdown_rx => {
                    tracing::debug!("Worker shutting down");
                    break;
                }
                _ = stats_log_tick.tick() => recorder.log_stats(),
            }
        }

        // Traffic since the last tick, plus anything still pending.
        let samples = match sampler.sample().await {
            Ok(samples) => samples,
            Err(e) => {
                tracing::warn!(error = %e, operation = "sample", "final interface sampling failed");
                Vec::new()
            }
        };
        recorder.finish(samples).await;
        recorder.log_stats();
    }.instrument(worker_span))
}
