/*!
 * Catalog-driven constraint checks
 *
 * Foreign-key existence, uniqueness and "still referenced" checks are answered from
 * the static catalog, so every repository reports violations the same way before
 * the database gets a chance to reject the statement.
 */

use crate::catalog::{Catalog, ForeignKeyDef, TableDef};
use crate::errors::ServiceError;
use metrics::counter;
use sea_orm::sea_query::{Alias, Asterisk, Condition, Expr, Func, Query};
use sea_orm::ConnectionTrait;
use tracing::debug;

/// `SELECT COUNT(*) FROM table WHERE condition`
pub async fn count_rows<C: ConnectionTrait>(
    conn: &C,
    table: &str,
    condition: Condition,
) -> Result<i64, ServiceError> {
    let query = Query::select()
        .expr(Func::count(Expr::col(Asterisk)))
        .from(Alias::new(table))
        .cond_where(condition)
        .to_owned();

    let statement = conn.get_database_backend().build(&query);
    match conn
        .query_one(statement)
        .await
        .map_err(ServiceError::from_db)?
    {
        Some(row) => row
            .try_get_by_index::<i64>(0)
            .map_err(ServiceError::from_db),
        None => Ok(0),
    }
}

/// Fails with `NotFound` unless `table` has a row with primary key `id`.
pub async fn ensure_exists<C: ConnectionTrait>(
    conn: &C,
    catalog: &Catalog,
    table: &str,
    id: i32,
) -> Result<(), ServiceError> {
    let def = catalog.require(table)?;
    let found = count_rows(
        conn,
        def.name,
        Condition::all().add(Expr::col(Alias::new(def.primary_key)).eq(id)),
    )
    .await?;

    if found == 0 {
        counter!("ventas_db.constraint_violations", 1, "kind" => "not_found");
        return Err(ServiceError::not_found(def.name, id));
    }
    Ok(())
}

fn foreign_key<'a>(def: &'a TableDef, column: &str) -> Result<&'a ForeignKeyDef, ServiceError> {
    def.foreign_keys
        .iter()
        .find(|fk| fk.column == column)
        .ok_or_else(|| {
            ServiceError::InternalError(format!("{}.{} is not a foreign key", def.name, column))
        })
}

/// Checks that every `(column, id)` pair of `table` points at an existing parent row.
pub async fn ensure_foreign_keys<C: ConnectionTrait>(
    conn: &C,
    catalog: &Catalog,
    table: &str,
    values: &[(&str, i32)],
) -> Result<(), ServiceError> {
    let def = catalog.require(table)?;

    for (column, id) in values {
        let fk = foreign_key(def, column)?;
        let found = count_rows(
            conn,
            fk.references,
            Condition::all().add(Expr::col(Alias::new(fk.referenced_column)).eq(*id)),
        )
        .await?;

        if found == 0 {
            debug!(table = def.name, column, id, "Foreign key target missing");
            counter!("ventas_db.constraint_violations", 1, "kind" => "not_found");
            return Err(ServiceError::NotFound(format!(
                "{}.{} = {} references a missing {} row",
                def.name, column, id, fk.references
            )));
        }
    }
    Ok(())
}

/// Checks that no other row of `table` already holds any of the given values in a
/// unique column. `exclude_id` skips the row being updated.
pub async fn ensure_unique<C: ConnectionTrait>(
    conn: &C,
    catalog: &Catalog,
    table: &str,
    values: &[(&str, String)],
    exclude_id: Option<i32>,
) -> Result<(), ServiceError> {
    let def = catalog.require(table)?;

    for (column, value) in values {
        match def.column(column) {
            Some(field) if field.unique => {}
            _ => {
                return Err(ServiceError::InternalError(format!(
                    "{}.{} is not a unique column",
                    def.name, column
                )))
            }
        }

        let mut condition =
            Condition::all().add(Expr::col(Alias::new(*column)).eq(value.as_str()));
        if let Some(id) = exclude_id {
            condition = condition.add(Expr::col(Alias::new(def.primary_key)).ne(id));
        }

        if count_rows(conn, def.name, condition).await? > 0 {
            counter!("ventas_db.constraint_violations", 1, "kind" => "unique");
            return Err(ServiceError::UniqueConstraint(format!(
                "{}.{} = '{}' already exists",
                def.name, column, value
            )));
        }
    }
    Ok(())
}

/// Fails with `IntegrityError` while any foreign key in the catalog still points at
/// row `id` of `table`.
pub async fn ensure_unreferenced<C: ConnectionTrait>(
    conn: &C,
    catalog: &Catalog,
    table: &str,
    id: i32,
) -> Result<(), ServiceError> {
    let def = catalog.require(table)?;

    for reference in catalog.references_to(def.name) {
        let count = count_rows(
            conn,
            reference.table,
            Condition::all().add(Expr::col(Alias::new(reference.column)).eq(id)),
        )
        .await?;

        if count > 0 {
            counter!("ventas_db.constraint_violations", 1, "kind" => "integrity");
            return Err(ServiceError::IntegrityError(format!(
                "{} {} is still referenced by {} {} row(s) through {}",
                def.name, id, count, reference.table, reference.column
            )));
        }
    }
    Ok(())
}
