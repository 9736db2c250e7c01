use metrics::counter;
use sea_orm::{
    sea_query::Expr, ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, ConnectionTrait,
    DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use validator::Validate;

use crate::catalog::Catalog;
use crate::db::with_transaction;
use crate::dto::NewProducto;
use crate::entities::categoria::{self, Entity as Categoria};
use crate::entities::producto::{self, Column, Entity as Producto, Model as ProductoModel};
use crate::entities::scale::Normalize;
use crate::errors::ServiceError;
use crate::repositories::constraints::{
    ensure_exists, ensure_foreign_keys, ensure_unique, ensure_unreferenced,
};
use crate::repositories::{BaseRepository, Page, Paging, Repository};

const TABLE: &str = "producto";

/// Adds `delta` units to the stock of product `idproducto` with a single conditional
/// `UPDATE`, so concurrent callers never lose an update and the stock never goes
/// negative.
///
/// Takes any connection so it can run inside a caller's transaction, e.g. next to
/// [`insert_venta`](super::venta_repository::insert_venta).
///
/// # Errors
/// `NotFound` when the product does not exist, `InsufficientStock` when the
/// adjustment would leave it below zero and `ValidationError` when it would push
/// the stock past `i32::MAX`. A rejected adjustment writes nothing.
pub async fn adjust_stock<C: ConnectionTrait>(
    conn: &C,
    idproducto: i32,
    delta: i32,
) -> Result<ProductoModel, ServiceError> {
    // bounds are computed here so the database never evaluates an overflowing sum
    let update = Producto::update_many()
        .col_expr(Column::Stock, Expr::col(Column::Stock).add(delta))
        .filter(Column::Idproducto.eq(idproducto));
    let update = if delta >= 0 {
        update.filter(Column::Stock.lte(i32::MAX - delta))
    } else {
        update.filter(Column::Stock.gte(-i64::from(delta)))
    };
    let result = update.exec(conn).await.map_err(ServiceError::from_db)?;

    let current = Producto::find_by_id(idproducto)
        .one(conn)
        .await
        .map_err(ServiceError::from_db)?
        .ok_or_else(|| ServiceError::not_found(TABLE, idproducto))?
        .normalize();

    if result.rows_affected == 0 {
        counter!("ventas_db.stock.rejected", 1);
        warn!(
            idproducto,
            stock = current.stock,
            delta,
            "Stock adjustment rejected"
        );
        if delta > 0 {
            return Err(ServiceError::ValidationError(format!(
                "producto {} has {} units, adding {} exceeds the stock limit",
                idproducto, current.stock, delta
            )));
        }
        return Err(ServiceError::InsufficientStock(format!(
            "producto {} has {} units, cannot apply {}",
            idproducto, current.stock, delta
        )));
    }

    counter!("ventas_db.stock.adjusted", 1);
    debug!(idproducto, delta, stock = current.stock, "Stock adjusted");
    Ok(current)
}

/// Repository for the product master
#[derive(Debug, Clone)]
pub struct ProductoRepository {
    base: BaseRepository,
}

impl ProductoRepository {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Catalog, paging: Paging) -> Self {
        Self {
            base: BaseRepository::new(db, catalog, paging),
        }
    }

    /// Create a product. The category must exist and `nombre` must not be taken.
    #[instrument(skip(self, input), fields(nombre = %input.nombre, idcategoria = input.idcategoria))]
    pub async fn create(&self, input: NewProducto) -> Result<ProductoModel, ServiceError> {
        input.validate()?;
        let catalog = self.base.catalog();

        let created = with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_foreign_keys(txn, &catalog, TABLE, &[("idcategoria", input.idcategoria)])
                    .await?;
                ensure_unique(txn, &catalog, TABLE, &[("nombre", input.nombre.clone())], None)
                    .await?;
                input
                    .into_active_model()
                    .insert(txn)
                    .await
                    .map(Normalize::normalize)
                    .map_err(ServiceError::from_write)
            })
        })
        .await?;

        info!(idproducto = created.idproducto, "Producto created");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<ProductoModel>, ServiceError> {
        Producto::find_by_id(id)
            .one(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)
    }

    pub async fn get(&self, id: i32) -> Result<ProductoModel, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TABLE, id))
    }

    pub async fn find_by_nombre(&self, nombre: &str) -> Result<Option<ProductoModel>, ServiceError> {
        Producto::find()
            .filter(Column::Nombre.eq(nombre))
            .one(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)
    }

    /// `codigo` is optional and not unique; every match is returned.
    pub async fn find_by_codigo(&self, codigo: &str) -> Result<Vec<ProductoModel>, ServiceError> {
        Producto::find()
            .filter(Column::Codigo.eq(codigo))
            .order_by_asc(Column::Idproducto)
            .all(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)
    }

    pub async fn find_with_categoria(
        &self,
        id: i32,
    ) -> Result<Option<(ProductoModel, categoria::Model)>, ServiceError> {
        let found = Producto::find_by_id(id)
            .find_also_related(Categoria)
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)?;

        match found {
            None => Ok(None),
            Some((producto, Some(categoria))) => Ok(Some((producto.normalize(), categoria))),
            Some((producto, None)) => Err(ServiceError::IntegrityError(format!(
                "producto {} points at missing categoria {}",
                producto.idproducto, producto.idcategoria
            ))),
        }
    }

    pub async fn by_categoria(
        &self,
        idcategoria: i32,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<ProductoModel>, ServiceError> {
        let select = Producto::find()
            .filter(Column::Idcategoria.eq(idcategoria))
            .order_by_asc(Column::Nombre);
        self.base.paginate(select, page, per_page).await
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: NewProducto) -> Result<ProductoModel, ServiceError> {
        input.validate()?;
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                ensure_foreign_keys(txn, &catalog, TABLE, &[("idcategoria", input.idcategoria)])
                    .await?;
                ensure_unique(
                    txn,
                    &catalog,
                    TABLE,
                    &[("nombre", input.nombre.clone())],
                    Some(id),
                )
                .await?;

                let mut model = input.into_active_model();
                model.idproducto = Unchanged(id);
                model
                    .update(txn)
                    .await
                    .map(Normalize::normalize)
                    .map_err(ServiceError::from_write)
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn set_estado(
        &self,
        id: i32,
        estado: Option<String>,
    ) -> Result<ProductoModel, ServiceError> {
        let mut model: producto::ActiveModel = self.get(id).await?.into();
        model.estado = Set(estado);
        model
            .update(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_write)
    }

    /// See [`adjust_stock`].
    #[instrument(skip(self))]
    pub async fn adjust_stock(&self, id: i32, delta: i32) -> Result<ProductoModel, ServiceError> {
        self::adjust_stock(self.get_db(), id, delta).await
    }

    /// Products with `stock` at or below `threshold`, lowest first.
    pub async fn low_stock(&self, threshold: i32) -> Result<Vec<ProductoModel>, ServiceError> {
        Producto::find()
            .filter(Column::Stock.lte(threshold))
            .order_by_asc(Column::Stock)
            .order_by_asc(Column::Nombre)
            .all(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)
    }

    /// Fails with `IntegrityError` once the product appears on any purchase or sale line.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                ensure_unreferenced(txn, &catalog, TABLE, id).await?;
                Producto::delete_by_id(id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::from_db)?;
                Ok(())
            })
        })
        .await?;

        info!(idproducto = id, "Producto deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<ProductoModel>, ServiceError> {
        self.base
            .paginate(Producto::find().order_by_asc(Column::Idproducto), page, per_page)
            .await
    }
}

impl Repository for ProductoRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
