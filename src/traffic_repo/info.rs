// Key/value info table (version stamps).

use sqlx::Row;
use tracing::instrument;

use super::TrafficRepo;
use super::exec::statement_failed;
use crate::error::StoreError;
use crate::models::InfoEntry;

/// Schema layout version, written once at creation.
pub const INFO_SCHEMA_VERSION: &str = "dbversion";
/// Software version, refreshed on every creating open.
pub const INFO_SOFTWARE_VERSION: &str = "softwareversion";

const UPDATE_INFO: &str = "UPDATE info SET value = $1 WHERE name = $2";
const INSERT_INFO: &str = "INSERT INTO info (name, value) VALUES ($1, $2)";
const SELECT_INFO: &str = "SELECT value FROM info WHERE name = $1";
const SELECT_ALL_INFO: &str = "SELECT name, value FROM info ORDER BY name ASC";

impl TrafficRepo {
    /// Update `name`; insert it instead when absent and `create_if_missing`.
    #[instrument(skip(self), fields(repo = "traffic", operation = "set_info"))]
    pub async fn set_info(
        &self,
        name: &str,
        value: &str,
        create_if_missing: bool,
    ) -> Result<(), StoreError> {
        let mut conn = self.pool.acquire().await?;
        let updated = sqlx::query(UPDATE_INFO)
            .bind(value)
            .bind(name)
            .execute(&mut *conn)
            .await
            .map_err(statement_failed(UPDATE_INFO))?
            .rows_affected();
        if updated == 0 && create_if_missing {
            sqlx::query(INSERT_INFO)
                .bind(name)
                .bind(value)
                .execute(&mut *conn)
                .await
                .map_err(statement_failed(INSERT_INFO))?;
        }
        Ok(())
    }

    pub async fn get_info(&self, name: &str) -> Result<Option<String>, StoreError> {
        let value = sqlx::query_scalar::<_, String>(SELECT_INFO)
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(statement_failed(SELECT_INFO))?;
        Ok(value)
    }

    pub async fn list_info(&self) -> Result<Vec<InfoEntry>, StoreError> {
        let rows = sqlx::query(SELECT_ALL_INFO)
            .fetch_all(&self.pool)
            .await
            .map_err(statement_failed(SELECT_ALL_INFO))?;
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            out.push(InfoEntry {
                name: row.try_get("name")?,
                value: row.try_get("value")?,
            });
        }
        Ok(out)
    }
}
