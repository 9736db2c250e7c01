/*!
 * Transaction Helper Utilities
 *
 * Document headers and their line items are written through these helpers so that a
 * failure on any line rolls the whole document back.
 */

use crate::errors::ServiceError;
use metrics::{counter, histogram};
use sea_orm::{DatabaseConnection, DatabaseTransaction, TransactionTrait};
use std::future::Future;
use std::pin::Pin;
use tracing::{debug, warn};

/// Type alias for boxed future used in transactions
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Execute a function within a database transaction
///
/// Commits when `f` returns `Ok`, rolls back otherwise. The error produced inside the
/// transaction is returned as is, so constraint violations keep their variant.
///
/// # Example
///
/// ```rust,ignore
/// let venta = with_transaction(&db, move |txn| {
///     Box::pin(async move {
///         let venta = header.into_active_model().insert(txn).await?;
///         for line in lines {
///             line.into_active_model(venta.idventa).insert(txn).await?;
///         }
///         Ok(venta)
///     })
/// })
/// .await?;
/// ```
pub async fn with_transaction<F, T>(db: &DatabaseConnection, f: F) -> Result<T, ServiceError>
where
    F: for<'c> FnOnce(&'c DatabaseTransaction) -> BoxFuture<'c, Result<T, ServiceError>> + Send,
    T: Send,
{
    let start = std::time::Instant::now();
    counter!("ventas_db.transaction.started", 1);

    let result = db
        .transaction::<F, T, ServiceError>(f)
        .await
        .map_err(ServiceError::from);

    let elapsed = start.elapsed();
    histogram!("ventas_db.transaction.duration", elapsed);

    match &result {
        Ok(_) => {
            counter!("ventas_db.transaction.committed", 1);
            debug!("Transaction committed in {:?}", elapsed);
        }
        Err(e) => {
            counter!("ventas_db.transaction.rolled_back", 1);
            warn!(error = %e, "Transaction rolled back after {:?}", elapsed);
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use sea_orm::{ConnectOptions, ConnectionTrait, Database, DbBackend, Statement};

    async fn memory_db() -> DatabaseConnection {
        let mut opt = ConnectOptions::new("sqlite::memory:");
        opt.max_connections(1).min_connections(1);
        let db = Database::connect(opt).await.unwrap();
        db.execute(Statement::from_string(
            DbBackend::Sqlite,
            "CREATE TABLE t (v INTEGER NOT NULL)".to_string(),
        ))
        .await
        .unwrap();
        db
    }

    async fn count(db: &DatabaseConnection) -> i64 {
        let row = db
            .query_one(Statement::from_string(
                DbBackend::Sqlite,
                "SELECT COUNT(*) FROM t".to_string(),
            ))
            .await
            .unwrap()
            .unwrap();
        row.try_get_by_index::<i64>(0).unwrap()
    }

    #[tokio::test]
    async fn commits_on_success() {
        let db = memory_db().await;
        let value = with_transaction(&db, |txn| {
            Box::pin(async move {
                txn.execute(Statement::from_string(
                    DbBackend::Sqlite,
                    "INSERT INTO t (v) VALUES (1)".to_string(),
                ))
                .await?;
                Ok(42)
            })
        })
        .await
        .unwrap();

        assert_eq!(value, 42);
        assert_eq!(count(&db).await, 1);
    }

    #[tokio::test]
    async fn rolls_back_and_keeps_error_variant() {
        let db = memory_db().await;
        let result: Result<(), ServiceError> = with_transaction(&db, |txn| {
            Box::pin(async move {
                txn.execute(Statement::from_string(
                    DbBackend::Sqlite,
                    "INSERT INTO t (v) VALUES (1)".to_string(),
                ))
                .await?;
                Err(ServiceError::not_found("producto", 7))
            })
        })
        .await;

        assert!(matches!(result, Err(ServiceError::NotFound(_))));
        assert_eq!(count(&db).await, 0);
    }
}
