use anyhow::Result;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;
use trafficstore::spacecheck::DiskSpaceCheck;
use trafficstore::traffic_repo::{INFO_SCHEMA_VERSION, StoreOptions, TrafficRepo};
use trafficstore::*;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let app_config = config::AppConfig::load()?;

    let default_level = if app_config.debug { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    let db_file = app_config.database_file();
    let mut options = StoreOptions::new(
        app_config.database.create_if_missing,
        Arc::new(DiskSpaceCheck::from_mib(
            app_config.database.min_free_space_mib,
        )),
    );
    options.max_connections = app_config.database.max_pool_size;

    let repo = match TrafficRepo::open(&db_file, &options).await {
        Ok(repo) => Arc::new(repo),
        Err(e) if e.is_fatal() => {
            tracing::error!(error = %e, "Database unusable, exiting");
            std::process::exit(1);
        }
        Err(e) => return Err(e.into()),
    };
    tracing::info!(
        version = version::VERSION,
        schema = repo.get_info(INFO_SCHEMA_VERSION).await?.as_deref().unwrap_or("unknown"),
        path = %db_file.display(),
        "{} started",
        version::NAME
    );

    let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
    let worker_handle = worker::spawn(
        worker::WorkerDeps {
            sampler: Arc::new(sampler::NetworkSampler::new()),
            repo: repo.clone(),
            shutdown_rx,
        },
        worker::WorkerConfig {
            sample_interval_secs: app_config.monitoring.sample_interval_secs,
            stats_log_interval_secs: app_config.monitoring.stats_log_interval_secs,
            interfaces: app_config.monitoring.interfaces.clone(),
        },
    );

    #[cfg(unix)]
    {
        let mut sigterm =
            tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    tokio::signal::ctrl_c().await?;

    tracing::info!("Received shutdown signal");
    let _ = shutdown_tx.send(());
    let _ = worker_handle.await;
    repo.close().await;

    Ok(())
}
