// SQLite traffic store. One data file holds the interface registry, the
// info table and five bucket tables (fiveminute, hour, day, month, year).
// The pool is the only connection to the file; nothing is cached between
// calls.

mod exec;
mod info;
mod interface;
mod schema;
mod traffic;

pub use info::{INFO_SCHEMA_VERSION, INFO_SOFTWARE_VERSION};

use crate::error::StoreError;
use crate::spacecheck::SpaceCheck;
use crate::version::{SCHEMA_VERSION, VERSION};
use chrono::{DateTime, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, instrument};

/// How [`TrafficRepo::open`] treats a missing store.
#[derive(Clone)]
pub struct StoreOptions {
    /// Create the file and schema when absent or empty.
    pub create_if_missing: bool,
    pub max_connections: u32,
    /// Consulted once, before a new store is created.
    pub space_check: Arc<dyn SpaceCheck>,
}

impl StoreOptions {
    pub fn new(create_if_missing: bool, space_check: Arc<dyn SpaceCheck>) -> Self {
        Self {
            create_if_missing,
            max_connections: 1,
            space_check,
        }
    }
}

pub struct TrafficRepo {
    pool: SqlitePool,
    path: PathBuf,
}

impl TrafficRepo {
    /// Open the store at `path`.
    ///
    /// A missing file is created only with `create_if_missing`, otherwise
    /// [`StoreError::NotFound`]. A 0-byte file is treated as uninitialized:
    /// recreated with `create_if_missing`, otherwise the fatal
    /// [`StoreError::EmptyDatabase`]. Creating a store requires the space
    /// check to pass ([`StoreError::InsufficientSpace`] is fatal too).
    #[instrument(skip(options), fields(repo = "traffic", operation = "open", path = %path.display()))]
    pub async fn open(path: &Path, options: &StoreOptions) -> Result<Self, StoreError> {
        let create = match std::fs::metadata(path) {
            Ok(meta) if meta.len() > 0 => false,
            Ok(_) if options.create_if_missing => true,
            Ok(_) => {
                return Err(StoreError::EmptyDatabase {
                    path: path.to_path_buf(),
                });
            }
            Err(e) if e.kind() == ErrorKind::NotFound && options.create_if_missing => true,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("database not found");
                return Err(StoreError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        if create {
            let dir = data_dir(path);
            std::fs::create_dir_all(&dir)?;
            let check = options.space_check.clone();
            let check_dir = dir.clone();
            let has_space = tokio::task::spawn_blocking(move || check.has_free_space(&check_dir))
                .await
                .map_err(|e| StoreError::Io(std::io::Error::other(e)))?;
            if !has_space {
                return Err(StoreError::InsufficientSpace { dir });
            }
        }

        let opts = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(create)
            .foreign_keys(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .busy_timeout(Duration::from_secs(5))
            .synchronous(sqlx::sqlite::SqliteSynchronous::Normal);
        let pool = SqlitePoolOptions::new()
            .max_connections(options.max_connections.max(1))
            .connect_with(opts)
            .await?;
        debug!("database open");

        let repo = Self {
            pool,
            path: path.to_path_buf(),
        };

        if create {
            repo.create_schema().await?;
            debug!("database structure created");
            repo.set_info(INFO_SCHEMA_VERSION, SCHEMA_VERSION, true)
                .await?;
        }
        if options.create_if_missing {
            repo.set_info(INFO_SOFTWARE_VERSION, VERSION, true).await?;
        }

        Ok(repo)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Run one unparameterized statement. Returns rows affected.
    pub async fn exec(&self, sql: &str) -> Result<u64, StoreError> {
        let mut conn = self.pool.acquire().await?;
        exec::exec(&mut conn, sql).await
    }

    /// Close the connection. Further calls fail.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Directory holding the data file; the free-space check runs against it.
fn data_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

/// `created`/`updated` column format.
fn timestamp(now: DateTime<Utc>) -> String {
    now.format("%Y-%m-%d %H:%M:%S").to_string()
}
