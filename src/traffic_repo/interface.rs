// Interface registry: name -> id resolution with create-on-first-sight,
// plus the explicit add/remove/active/alias operations.

use chrono::Utc;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};
use tracing::instrument;

use super::exec::statement_failed;
use super::{TrafficRepo, timestamp};
use crate::error::StoreError;
use crate::models::{Interface, InterfaceId};

const SELECT_ID: &str = "SELECT id FROM interface WHERE name = $1";
const INSERT_INTERFACE: &str = "INSERT INTO interface (name, active, created, updated, rxcounter, txcounter, rxtotal, txtotal) VALUES ($1, 1, $2, $3, 0, 0, 0, 0)";
const INSERT_INTERFACE_IF_ABSENT: &str = "INSERT OR IGNORE INTO interface (name, active, created, updated, rxcounter, txcounter, rxtotal, txtotal) VALUES ($1, 1, $2, $3, 0, 0, 0, 0)";
const DELETE_INTERFACE: &str = "DELETE FROM interface WHERE name = $1";
const UPDATE_ACTIVE: &str = "UPDATE interface SET active = $1 WHERE id = $2";
const UPDATE_ALIAS: &str = "UPDATE interface SET alias = $1 WHERE id = $2";
const SELECT_INTERFACE: &str = "SELECT id, name, alias, active, created, updated, rxcounter, txcounter, rxtotal, txtotal FROM interface WHERE name = $1";
const SELECT_INTERFACES: &str = "SELECT id, name, alias, active, created, updated, rxcounter, txcounter, rxtotal, txtotal FROM interface ORDER BY name ASC";

pub(super) fn validate_name(name: &str) -> Result<(), StoreError> {
    if name.is_empty() {
        return Err(StoreError::InvalidInterfaceName);
    }
    Ok(())
}

/// Like [`lookup_id`], but an unknown name is an error.
pub(super) async fn require_id(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<InterfaceId, StoreError> {
    validate_name(name)?;
    lookup_id(conn, name)
        .await?
        .ok_or_else(|| StoreError::UnknownInterface(name.to_string()))
}

pub(super) async fn lookup_id(
    conn: &mut SqliteConnection,
    name: &str,
) -> Result<Option<InterfaceId>, StoreError> {
    let id = sqlx::query_scalar::<_, i64>(SELECT_ID)
        .bind(name)
        .fetch_optional(&mut *conn)
        .await
        .map_err(statement_failed(SELECT_ID))?;
    Ok(id.map(InterfaceId))
}

/// Id for `name`, inserting a fresh active row with zero counters when
/// missing and `create_if_missing`. The insert ignores a row created
/// concurrently, so both callers resolve to the same id.
pub(super) async fn resolve_or_create(
    conn: &mut SqliteConnection,
    name: &str,
    create_if_missing: bool,
    now: &str,
) -> Result<Option<InterfaceId>, StoreError> {
    validate_name(name)?;
    if let Some(id) = lookup_id(conn, name).await? {
        return Ok(Some(id));
    }
    if !create_if_missing {
        return Ok(None);
    }
    ensure(conn, name, now).await.map(Some)
}

/// Id for `name`, inserting it first if absent. Inside a transaction the
/// leading insert takes the write lock before anything is read.
pub(super) async fn ensure(
    conn: &mut SqliteConnection,
    name: &str,
    now: &str,
) -> Result<InterfaceId, StoreError> {
    validate_name(name)?;
    sqlx::query(INSERT_INTERFACE_IF_ABSENT)
        .bind(name)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .map_err(statement_failed(INSERT_INTERFACE_IF_ABSENT))?;
    require_id(conn, name).await
}

impl TrafficRepo {
    /// `None` means no such interface (only possible without `create_if_missing`).
    #[instrument(skip(self), fields(repo = "traffic", operation = "get_or_create_interface_id"))]
    pub async fn get_or_create_interface_id(
        &self,
        name: &str,
        create_if_missing: bool,
    ) -> Result<Option<InterfaceId>, StoreError> {
        let mut conn = self.pool.acquire().await?;
        resolve_or_create(&mut conn, name, create_if_missing, &timestamp(Utc::now())).await
    }

    #[instrument(skip(self), fields(repo = "traffic", operation = "add_interface"))]
    pub async fn add_interface(&self, name: &str) -> Result<InterfaceId, StoreError> {
        validate_name(name)?;
        let mut conn = self.pool.acquire().await?;
        if lookup_id(&mut conn, name).await?.is_some() {
            return Err(StoreError::InterfaceExists(name.to_string()));
        }
        let now = timestamp(Utc::now());
        let r = sqlx::query(INSERT_INTERFACE)
            .bind(name)
            .bind(&now)
            .bind(&now)
            .execute(&mut *conn)
            .await
            .map_err(statement_failed(INSERT_INTERFACE))?;
        Ok(InterfaceId(r.last_insert_rowid()))
    }

    /// Deletes the interface and, through the foreign key, all its buckets.
    #[instrument(skip(self), fields(repo = "traffic", operation = "remove_interface"))]
    pub async fn remove_interface(&self, name: &str) -> Result<(), StoreError> {
        let r = sqlx::query(DELETE_INTERFACE)
            .bind(name)
            .execute(&self.pool)
            .await
            .map_err(statement_failed(DELETE_INTERFACE))?;
        if r.rows_affected() == 0 {
            return Err(StoreError::UnknownInterface(name.to_string()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(repo = "traffic", operation = "set_interface_active"))]
    pub async fn set_interface_active(&self, name: &str, active: bool) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let id = require_id(&mut conn, name).await?;
        sqlx::query(UPDATE_ACTIVE)
            .bind(active)
            .bind(id.0)
            .execute(&mut *conn)
            .await
            .map_err(statement_failed(UPDATE_ACTIVE))?;
        Ok(())
    }

    /// Sets the display alias. An empty alias clears it.
    #[instrument(skip(self), fields(repo = "traffic", operation = "set_interface_alias"))]
    pub async fn set_interface_alias(&self, name: &str, alias: &str) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let id = require_id(&mut conn, name).await?;
        let alias = (!alias.is_empty()).then_some(alias);
        sqlx::query(UPDATE_ALIAS)
            .bind(alias)
            .bind(id.0)
            .execute(&mut *conn)
            .await
            .map_err(statement_failed(UPDATE_ALIAS))?;
        Ok(())
    }

    pub async fn get_interface(&self, name: &str) -> Result<Option<Interface>, StoreError> {
        let row = sqlx::query(SELECT_INTERFACE)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(statement_failed(SELECT_INTERFACE))?;
        let Some(row) = row else {
            return Ok(None);
        };
        Ok(Some(parse_interface_row(&row)?))
    }

    pub async fn list_interfaces(&self) -> Result<Vec<Interface>, StoreError> {
        let rows = sqlx::query(SELECT_INTERFACES)
            .fetch_all(&self.pool)
            .await
            .map_err(statement_failed(SELECT_INTERFACES))?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(parse_interface_row(&row)?);
        }
        Ok(out)
    }
}

fn parse_interface_row(row: &SqliteRow) -> Result<Interface, sqlx::Error> {
    let rxcounter: i64 = row.try_get("rxcounter")?;
    let txcounter: i64 = row.try_get("txcounter")?;
    let rxtotal: i64 = row.try_get("rxtotal")?;
    let txtotal: i64 = row.try_get("txtotal")?;
    let active: i64 = row.try_get("active")?;
    Ok(Interface {
        id: InterfaceId(row.try_get("id")?),
        name: row.try_get("name")?,
        alias: row.try_get("alias")?,
        active: active != 0,
        created: row.try_get("created")?,
        updated: row.try_get("updated")?,
        rxcounter: rxcounter as u64,
        txcounter: txcounter as u64,
        rxtotal: rxtotal as u64,
        txtotal: txtotal as u64,
    })
}
