use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, DatabaseConnection, EntityTrait, ModelTrait,
    QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::catalog::Catalog;
use crate::db::with_transaction;
use crate::dto::NewRol;
use crate::entities::rol::{self, Column, Entity as Rol, Model as RolModel};
use crate::entities::usuario::{self, Entity as Usuario};
use crate::errors::ServiceError;
use crate::repositories::constraints::{ensure_exists, ensure_unreferenced};
use crate::repositories::{BaseRepository, Page, Paging, Repository};

const TABLE: &str = "rol";

#[derive(Debug, Clone)]
pub struct RolRepository {
    base: BaseRepository,
}

impl RolRepository {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Catalog, paging: Paging) -> Self {
        Self {
            base: BaseRepository::new(db, catalog, paging),
        }
    }

    #[instrument(skip(self, input), fields(nombre = %input.nombre))]
    pub async fn create(&self, input: NewRol) -> Result<RolModel, ServiceError> {
        input.validate()?;
        let created = input
            .into_active_model()
            .insert(self.get_db())
            .await
            .map_err(ServiceError::from_write)?;

        info!(idrol = created.idrol, "Rol created");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<RolModel>, ServiceError> {
        Rol::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)
    }

    pub async fn get(&self, id: i32) -> Result<RolModel, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TABLE, id))
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: NewRol) -> Result<RolModel, ServiceError> {
        input.validate()?;
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                let mut model = input.into_active_model();
                model.idrol = Unchanged(id);
                model.update(txn).await.map_err(ServiceError::from_write)
            })
        })
        .await
    }

    #[instrument(skip(self))]
    pub async fn set_estado(&self, id: i32, estado: Option<String>) -> Result<RolModel, ServiceError> {
        let mut model: rol::ActiveModel = self.get(id).await?.into();
        model.estado = Set(estado);
        model.update(self.get_db()).await.map_err(ServiceError::from_write)
    }

    /// Fails with `IntegrityError` while users hold this role.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                ensure_unreferenced(txn, &catalog, TABLE, id).await?;
                Rol::delete_by_id(id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::from_db)?;
                Ok(())
            })
        })
        .await?;

        info!(idrol = id, "Rol deleted");
        Ok(())
    }

    pub async fn list(&self, page: u64, per_page: Option<u64>) -> Result<Page<RolModel>, ServiceError> {
        self.base
            .paginate(Rol::find().order_by_asc(Column::Idrol), page, per_page)
            .await
    }

    /// Users holding role `id`.
    pub async fn usuarios(&self, id: i32) -> Result<Vec<usuario::Model>, ServiceError> {
        self.get(id)
            .await?
            .find_related(Usuario)
            .order_by_asc(usuario::Column::Idusuario)
            .all(self.get_db())
            .await
            .map_err(ServiceError::from_db)
    }
}

impl Repository for RolRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
