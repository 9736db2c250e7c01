use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, EntityTrait,
    ModelTrait, QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::catalog::Catalog;
use crate::db::with_transaction;
use crate::dto::NewCategoria;
use crate::entities::categoria::{self, Column, Entity as Categoria, Model as CategoriaModel};
use crate::entities::producto::{self, Entity as Producto};
use crate::entities::scale::Normalize;
use crate::errors::ServiceError;
use crate::repositories::constraints::{ensure_exists, ensure_unique, ensure_unreferenced};
use crate::repositories::{BaseRepository, Page, Paging, Repository};

const TABLE: &str = "categoria";

/// Repository for product categories
#[derive(Debug, Clone)]
pub struct CategoriaRepository {
    base: BaseRepository,
}

impl CategoriaRepository {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Catalog, paging: Paging) -> Self {
        Self {
            base: BaseRepository::new(db, catalog, paging),
        }
    }

    /// Create a category. `nombre` must not be taken.
    #[instrument(skip(self, input), fields(nombre = %input.nombre))]
    pub async fn create(&self, input: NewCategoria) -> Result<CategoriaModel, ServiceError> {
        input.validate()?;
        let catalog = self.base.catalog();

        let created = with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_unique(txn, &catalog, TABLE, &[("nombre", input.nombre.clone())], None)
                    .await?;
                input
                    .into_active_model()
                    .insert(txn)
                    .await
                    .map_err(ServiceError::from_write)
            })
        })
        .await?;

        info!(idcategoria = created.idcategoria, "Categoria created");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<CategoriaModel>, ServiceError> {
        Categoria::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)
    }

    /// Like [`find_by_id`](Self::find_by_id) but a missing row is `NotFound`.
    pub async fn get(&self, id: i32) -> Result<CategoriaModel, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TABLE, id))
    }

    pub async fn find_by_nombre(
        &self,
        nombre: &str,
    ) -> Result<Option<CategoriaModel>, ServiceError> {
        Categoria::find()
            .filter(Column::Nombre.eq(nombre))
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)
    }

    /// Replace every non-key attribute of category `id`.
    #[instrument(skip(self, input))]
    pub async fn update(
        &self,
        id: i32,
        input: NewCategoria,
    ) -> Result<CategoriaModel, ServiceError> {
        input.validate()?;
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                ensure_unique(
                    txn,
                    &catalog,
                    TABLE,
                    &[("nombre", input.nombre.clone())],
                    Some(id),
                )
                .await?;

                let mut model = input.into_active_model();
                model.idcategoria = Unchanged(id);
                model.update(txn).await.map_err(ServiceError::from_write)
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn set_estado(
        &self,
        id: i32,
        estado: Option<String>,
    ) -> Result<CategoriaModel, ServiceError> {
        let mut model: categoria::ActiveModel = self.get(id).await?.into();
        model.estado = Set(estado);
        model.update(self.get_db()).await.map_err(ServiceError::from_write)
    }

    /// Delete category `id`. Fails with `IntegrityError` while products still use it.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                ensure_unreferenced(txn, &catalog, TABLE, id).await?;
                Categoria::delete_by_id(id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::from_db)?;
                Ok(())
            })
        })
        .await?;

        info!(idcategoria = id, "Categoria deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<CategoriaModel>, ServiceError> {
        self.base
            .paginate(
                Categoria::find().order_by_asc(Column::Idcategoria),
                page,
                per_page,
            )
            .await
    }

    /// Products filed under category `id`.
    pub async fn productos(&self, id: i32) -> Result<Vec<producto::Model>, ServiceError> {
        let categoria = self.get(id).await?;
        categoria
            .find_related(Producto)
            .order_by_asc(producto::Column::Nombre)
            .all(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)
    }
}

impl Repository for CategoriaRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
