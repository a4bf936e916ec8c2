// Traffic accounting: one (rx, tx) delta lands on the interface's lifetime
// totals and on the current bucket of every resolution, atomically.

use chrono::{DateTime, Utc};
use sqlx::{Row, SqliteConnection};
use tracing::{debug, instrument, warn};

use super::exec::statement_failed;
use super::interface::{ensure, require_id, validate_name};
use super::schema::bucket_sql;
use super::{TrafficRepo, timestamp};
use crate::error::StoreError;
use crate::models::{Bucket, InterfaceId, Resolution};

// Matches no row when either total would leave the INTEGER range. Every
// bucket is bounded by the totals, so this guards the bucket adds too.
const UPDATE_TOTALS: &str = "UPDATE interface SET rxtotal = rxtotal + $1, txtotal = txtotal + $2, updated = $3, active = 1 WHERE id = $4 AND rxtotal <= 9223372036854775807 - $1 AND txtotal <= 9223372036854775807 - $2";

impl TrafficRepo {
    /// Account `rx`/`tx` bytes to `interface` at the current time.
    /// See [`TrafficRepo::add_traffic_at`].
    pub async fn add_traffic(&self, interface: &str, rx: u64, tx: u64) -> Result<(), StoreError> {
        self.add_traffic_at(interface, rx, tx, Utc::now()).await
    }

    /// Account `rx`/`tx` bytes to `interface` as of `now`.
    ///
    /// A zero delta is a no-op. Otherwise the interface is created if
    /// unseen, its totals are bumped and each resolution's bucket for the
    /// period containing `now` is created (if absent) and incremented, all
    /// in one transaction. On failure nothing is written.
    #[instrument(skip(self), fields(repo = "traffic", operation = "add_traffic"))]
    pub async fn add_traffic_at(
        &self,
        interface: &str,
        rx: u64,
        tx: u64,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        if rx == 0 && tx == 0 {
            return Ok(());
        }
        validate_name(interface)?;
        let rx = to_sql_integer(rx)?;
        let tx = to_sql_integer(tx)?;

        let mut transaction = self.pool.begin().await?;
        match apply_traffic(&mut transaction, interface, rx, tx, now).await {
            Ok(()) => transaction
                .commit()
                .await
                .map_err(|e| StoreError::Transaction(Box::new(e.into()))),
            Err(e) => {
                if let Err(rollback) = transaction.rollback().await {
                    warn!(error = %rollback, "rollback failed");
                }
                Err(StoreError::Transaction(Box::new(e)))
            }
        }
    }

    /// Buckets of one resolution for `interface`, oldest period first.
    pub async fn get_buckets(
        &self,
        interface: &str,
        resolution: Resolution,
    ) -> Result<Vec<Bucket>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        let id = require_id(&mut conn, interface).await?;
        let sql = bucket_sql(resolution).select;
        let rows = sqlx::query(sql)
            .bind(id.0)
            .fetch_all(&mut *conn)
            .await
            .map_err(statement_failed(sql))?;

        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let rx: i64 = row.try_get("rx")?;
            let tx: i64 = row.try_get("tx")?;
            out.push(Bucket {
                id: row.try_get("id")?,
                interface: InterfaceId(row.try_get("interface")?),
                resolution,
                date: row.try_get("date")?,
                rx: rx as u64,
                tx: tx as u64,
            });
        }
        Ok(out)
    }
}

async fn apply_traffic(
    conn: &mut SqliteConnection,
    interface: &str,
    rx: i64,
    tx: i64,
    now: DateTime<Utc>,
) -> Result<(), StoreError> {
    let stamp = timestamp(now);
    let id = ensure(conn, interface, &stamp).await?;
    debug!(interface, %id, rx, tx, "add traffic");

    let r = sqlx::query(UPDATE_TOTALS)
        .bind(rx)
        .bind(tx)
        .bind(&stamp)
        .bind(id.0)
        .execute(&mut *conn)
        .await
        .map_err(statement_failed(UPDATE_TOTALS))?;
    if r.rows_affected() == 0 {
        // The row exists: `ensure` created or found it in this transaction.
        warn!(interface, rx, tx, "traffic total would overflow, delta rejected");
        return Err(StoreError::DeltaOutOfRange {
            value: rx.max(tx) as u64,
        });
    }

    for resolution in Resolution::ALL {
        let sql = bucket_sql(resolution);
        let period = resolution.period_key(now);
        sqlx::query(sql.insert)
            .bind(id.0)
            .bind(&period)
            .execute(&mut *conn)
            .await
            .map_err(statement_failed(sql.insert))?;
        sqlx::query(sql.add)
            .bind(rx)
            .bind(tx)
            .bind(id.0)
            .bind(&period)
            .execute(&mut *conn)
            .await
            .map_err(statement_failed(sql.add))?;
    }
    Ok(())
}

fn to_sql_integer(value: u64) -> Result<i64, StoreError> {
    i64::try_from(value).map_err(|_| StoreError::DeltaOutOfRange { value })
}
