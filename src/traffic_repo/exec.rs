// Statement executor: single unparameterized statements plus the failure
// mapping every statement in the repo goes through.

use sqlx::SqliteConnection;

use crate::error::StoreError;

/// Wraps a failed statement as [`StoreError::Statement`]. The SQL text and
/// driver error only reach the debug log.
pub(crate) fn statement_failed(sql: &str) -> impl FnOnce(sqlx::Error) -> StoreError + '_ {
    move |source| {
        tracing::debug!(sql, error = %source, "statement failed");
        StoreError::Statement {
            sql: sql.to_string(),
            source,
        }
    }
}

/// Prepare, run and finalize one statement. Returns rows affected.
pub(crate) async fn exec(conn: &mut SqliteConnection, sql: &str) -> Result<u64, StoreError> {
    let r = sqlx::query(sql)
        .execute(&mut *conn)
        .await
        .map_err(statement_failed(sql))?;
    Ok(r.rows_affected())
}
