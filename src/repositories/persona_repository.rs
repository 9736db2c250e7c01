use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder,
};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::catalog::Catalog;
use crate::db::with_transaction;
use crate::dto::NewPersona;
use crate::entities::persona::{Column, Entity as Persona, Model as PersonaModel};
use crate::errors::ServiceError;
use crate::repositories::constraints::{ensure_exists, ensure_unreferenced};
use crate::repositories::{BaseRepository, Page, Paging, Repository};

const TABLE: &str = "persona";

/// Repository for customers and suppliers
#[derive(Debug, Clone)]
pub struct PersonaRepository {
    base: BaseRepository,
}

impl PersonaRepository {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Catalog, paging: Paging) -> Self {
        Self {
            base: BaseRepository::new(db, catalog, paging),
        }
    }

    #[instrument(skip(self, input), fields(tipo_persona = %input.tipo_persona))]
    pub async fn create(&self, input: NewPersona) -> Result<PersonaModel, ServiceError> {
        input.validate()?;
        let created = input
            .into_active_model()
            .insert(self.get_db())
            .await
            .map_err(ServiceError::from_write)?;

        info!(idpersona = created.idpersona, "Persona created");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<PersonaModel>, ServiceError> {
        Persona::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)
    }

    pub async fn get(&self, id: i32) -> Result<PersonaModel, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TABLE, id))
    }

    /// Customers or suppliers, by `tipo_persona` (see [`crate::entities::tipo_persona`]).
    pub async fn find_by_tipo(
        &self,
        tipo_persona: &str,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<PersonaModel>, ServiceError> {
        let select = Persona::find()
            .filter(Column::TipoPersona.eq(tipo_persona))
            .order_by_asc(Column::Nombre);
        self.base.paginate(select, page, per_page).await
    }

    /// Document numbers are not unique, so this can return several rows.
    pub async fn find_by_documento(
        &self,
        tipo_documento: &str,
        num_documento: &str,
    ) -> Result<Vec<PersonaModel>, ServiceError> {
        Persona::find()
            .filter(Column::TipoDocumento.eq(tipo_documento))
            .filter(Column::NumDocumento.eq(num_documento))
            .order_by_asc(Column::Idpersona)
            .all(self.get_db())
            .await
            .map_err(ServiceError::from_db)
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: NewPersona) -> Result<PersonaModel, ServiceError> {
        input.validate()?;
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                let mut model = input.into_active_model();
                model.idpersona = Unchanged(id);
                model.update(txn).await.map_err(ServiceError::from_write)
            })
        })
        .await
    }

    /// Fails with `IntegrityError` while purchases or sales name this persona.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                ensure_unreferenced(txn, &catalog, TABLE, id).await?;
                Persona::delete_by_id(id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::from_db)?;
                Ok(())
            })
        })
        .await?;

        info!(idpersona = id, "Persona deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<PersonaModel>, ServiceError> {
        self.base
            .paginate(Persona::find().order_by_asc(Column::Idpersona), page, per_page)
            .await
    }
}

impl Repository for PersonaRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
