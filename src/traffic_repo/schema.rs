// Schema: info + interface registry + one bucket table per resolution.
// The five bucket tables share one layout; their statements are generated
// from the table name so no resolution has a hand-written code path.

use tracing::instrument;

use super::TrafficRepo;
use super::exec::exec;
use crate::error::StoreError;
use crate::models::Resolution;

pub(crate) const INFO_TABLE_DDL: &str = r#"
CREATE TABLE info (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    value TEXT NOT NULL
)
"#;

pub(crate) const INTERFACE_TABLE_DDL: &str = r#"
CREATE TABLE interface (
    id INTEGER PRIMARY KEY,
    name TEXT UNIQUE NOT NULL,
    alias TEXT,
    active INTEGER NOT NULL,
    created DATE NOT NULL,
    updated DATE NOT NULL,
    rxcounter INTEGER NOT NULL,
    txcounter INTEGER NOT NULL,
    rxtotal INTEGER NOT NULL,
    txtotal INTEGER NOT NULL
)
"#;

/// Statements for one bucket table.
pub(crate) struct BucketSql {
    pub create: &'static str,
    /// Zero-valued row for (interface, date) unless one exists. Binds: interface, date.
    pub insert: &'static str,
    /// Adds onto the (interface, date) row. Binds: rx, tx, interface, date.
    pub add: &'static str,
    /// All rows for one interface, oldest period first. Binds: interface.
    pub select: &'static str,
}

macro_rules! bucket_sql {
    ($table:literal) => {
        BucketSql {
            create: concat!(
                "CREATE TABLE ",
                $table,
                " (
    id INTEGER PRIMARY KEY,
    interface INTEGER REFERENCES interface(id) ON DELETE CASCADE,
    date DATE NOT NULL,
    rx INTEGER NOT NULL,
    tx INTEGER NOT NULL,
    CONSTRAINT u UNIQUE (interface, date)
)"
            ),
            insert: concat!(
                "INSERT OR IGNORE INTO ",
                $table,
                " (interface, date, rx, tx) VALUES ($1, $2, 0, 0)"
            ),
            add: concat!(
                "UPDATE ",
                $table,
                " SET rx = rx + $1, tx = tx + $2 WHERE interface = $3 AND date = $4"
            ),
            select: concat!(
                "SELECT id, interface, date, rx, tx FROM ",
                $table,
                " WHERE interface = $1 ORDER BY date ASC"
            ),
        }
    };
}

static FIVEMINUTE_SQL: BucketSql = bucket_sql!("fiveminute");
static HOUR_SQL: BucketSql = bucket_sql!("hour");
static DAY_SQL: BucketSql = bucket_sql!("day");
static MONTH_SQL: BucketSql = bucket_sql!("month");
static YEAR_SQL: BucketSql = bucket_sql!("year");

pub(crate) fn bucket_sql(resolution: Resolution) -> &'static BucketSql {
    match resolution {
        Resolution::FiveMinute => &FIVEMINUTE_SQL,
        Resolution::Hour => &HOUR_SQL,
        Resolution::Day => &DAY_SQL,
        Resolution::Month => &MONTH_SQL,
        Resolution::Year => &YEAR_SQL,
    }
}

impl TrafficRepo {
    /// Creates every table in one transaction. Not idempotent: fails on a
    /// store that already has a schema, leaving it untouched.
    #[instrument(skip(self), fields(repo = "traffic", operation = "create_schema"))]
    pub async fn create_schema(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        exec(&mut tx, INFO_TABLE_DDL).await?;
        exec(&mut tx, INTERFACE_TABLE_DDL).await?;
        for resolution in Resolution::ALL {
            exec(&mut tx, bucket_sql(resolution).create).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}
