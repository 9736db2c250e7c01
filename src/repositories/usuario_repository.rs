use sea_orm::{
    ActiveModelTrait, ActiveValue::Unchanged, ColumnTrait, DatabaseConnection, EntityTrait,
    QueryFilter, QueryOrder, Set,
};
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::catalog::Catalog;
use crate::db::with_transaction;
use crate::dto::NewUsuario;
use crate::entities::rol::{self, Entity as Rol};
use crate::entities::usuario::{self, Column, Entity as Usuario, Model as UsuarioModel};
use crate::errors::ServiceError;
use crate::repositories::constraints::{
    ensure_exists, ensure_foreign_keys, ensure_unique, ensure_unreferenced,
};
use crate::repositories::{BaseRepository, Page, Paging, Repository};

const TABLE: &str = "usuario";

/// Repository for system users
#[derive(Debug, Clone)]
pub struct UsuarioRepository {
    base: BaseRepository,
}

impl UsuarioRepository {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Catalog, paging: Paging) -> Self {
        Self {
            base: BaseRepository::new(db, catalog, paging),
        }
    }

    /// Create a user. The role must exist and the email must not be taken.
    #[instrument(skip(self, input), fields(email = %input.email, idrol = input.idrol))]
    pub async fn create(&self, input: NewUsuario) -> Result<UsuarioModel, ServiceError> {
        input.validate()?;
        let catalog = self.base.catalog();

        let created = with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_foreign_keys(txn, &catalog, TABLE, &[("idrol", input.idrol)]).await?;
                ensure_unique(txn, &catalog, TABLE, &[("email", input.email.clone())], None)
                    .await?;
                input
                    .into_active_model()
                    .insert(txn)
                    .await
                    .map_err(ServiceError::from_write)
            })
        })
        .await?;

        info!(idusuario = created.idusuario, "Usuario created");
        Ok(created)
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<UsuarioModel>, ServiceError> {
        Usuario::find_by_id(id)
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)
    }

    pub async fn get(&self, id: i32) -> Result<UsuarioModel, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TABLE, id))
    }

    /// Exact, case-sensitive match on the login email.
    pub async fn find_by_email(&self, email: &str) -> Result<Option<UsuarioModel>, ServiceError> {
        Usuario::find()
            .filter(Column::Email.eq(email))
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)
    }

    /// User `id` together with its role.
    pub async fn find_with_rol(
        &self,
        id: i32,
    ) -> Result<Option<(UsuarioModel, rol::Model)>, ServiceError> {
        let found = Usuario::find_by_id(id)
            .find_also_related(Rol)
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)?;

        match found {
            None => Ok(None),
            Some((usuario, Some(rol))) => Ok(Some((usuario, rol))),
            Some((usuario, None)) => Err(ServiceError::IntegrityError(format!(
                "usuario {} points at missing rol {}",
                usuario.idusuario, usuario.idrol
            ))),
        }
    }

    #[instrument(skip(self, input))]
    pub async fn update(&self, id: i32, input: NewUsuario) -> Result<UsuarioModel, ServiceError> {
        input.validate()?;
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                ensure_foreign_keys(txn, &catalog, TABLE, &[("idrol", input.idrol)]).await?;
                ensure_unique(
                    txn,
                    &catalog,
                    TABLE,
                    &[("email", input.email.clone())],
                    Some(id),
                )
                .await?;

                let mut model = input.into_active_model();
                model.idusuario = Unchanged(id);
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
    ) -> Result<UsuarioModel, ServiceError> {
        let mut model: usuario::ActiveModel = self.get(id).await?.into();
        model.estado = Set(estado);
        model.update(self.get_db()).await.map_err(ServiceError::from_write)
    }

    /// Fails with `IntegrityError` once the user has registered a purchase or sale.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: i32) -> Result<(), ServiceError> {
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                ensure_unreferenced(txn, &catalog, TABLE, id).await?;
                Usuario::delete_by_id(id)
                    .exec(txn)
                    .await
                    .map_err(ServiceError::from_db)?;
                Ok(())
            })
        })
        .await?;

        info!(idusuario = id, "Usuario deleted");
        Ok(())
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<UsuarioModel>, ServiceError> {
        self.base
            .paginate(Usuario::find().order_by_asc(Column::Idusuario), page, per_page)
            .await
    }
}

impl Repository for UsuarioRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
