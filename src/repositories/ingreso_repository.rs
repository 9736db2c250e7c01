use chrono::NaiveDateTime;
use metrics::counter;
use rust_decimal::Decimal;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, ModelTrait,
    QueryFilter, QueryOrder, Set,
};
use serde::Serialize;
use std::sync::Arc;
use tracing::{info, instrument};
use validator::Validate;

use crate::catalog::Catalog;
use crate::db::with_transaction;
use crate::dto::{NewDetalleIngreso, NewIngreso};
use crate::entities::detalle_ingreso::{self, Entity as DetalleIngreso};
use crate::entities::estado;
use crate::entities::ingreso::{self, Column, Entity as Ingreso, Model as IngresoModel};
use crate::entities::persona::{self, Entity as Persona};
use crate::entities::scale::Normalize;
use crate::errors::ServiceError;
use crate::repositories::constraints::{ensure_exists, ensure_foreign_keys};
use crate::repositories::{check_document_estado, BaseRepository, Page, Paging, Repository};

const TABLE: &str = "ingreso";
const LINE_TABLE: &str = "detalle_ingreso";

/// A purchase header with its lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IngresoCompleto {
    pub ingreso: IngresoModel,
    pub detalles: Vec<detalle_ingreso::Model>,
}

impl IngresoCompleto {
    /// Sum of `cantidad * precio` over the lines. Not compared with `ingreso.total`,
    /// which is stored as given.
    pub fn lines_total(&self) -> Decimal {
        self.detalles
            .iter()
            .map(|d| crate::dto::line_subtotal(d.cantidad, d.precio, Decimal::ZERO))
            .sum()
    }
}

fn validate_document(
    header: &NewIngreso,
    lines: &[NewDetalleIngreso],
) -> Result<(), ServiceError> {
    header.validate()?;
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "ingreso requires at least one detalle_ingreso line".to_string(),
        ));
    }
    for (i, line) in lines.iter().enumerate() {
        line.validate()
            .map_err(|e| ServiceError::ValidationError(format!("line {}: {}", i + 1, e)))?;
    }
    Ok(())
}

/// Inserts a purchase and its lines on `conn`. Callers own the transaction; use
/// [`IngresoRepository::create`] for the self-contained version.
pub async fn insert_ingreso<C: ConnectionTrait>(
    conn: &C,
    catalog: &Catalog,
    header: NewIngreso,
    lines: Vec<NewDetalleIngreso>,
) -> Result<IngresoCompleto, ServiceError> {
    validate_document(&header, &lines)?;
    ensure_foreign_keys(
        conn,
        catalog,
        TABLE,
        &[("idproveedor", header.idproveedor), ("idusuario", header.idusuario)],
    )
    .await?;

    let ingreso = header
        .into_active_model()
        .insert(conn)
        .await
        .map(Normalize::normalize)
        .map_err(ServiceError::from_write)?;

    let mut detalles = Vec::with_capacity(lines.len());
    for line in lines {
        ensure_foreign_keys(conn, catalog, LINE_TABLE, &[("idproducto", line.idproducto)]).await?;
        let detalle = line
            .into_active_model(ingreso.idingreso)
            .insert(conn)
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_write)?;
        detalles.push(detalle);
    }

    Ok(IngresoCompleto { ingreso, detalles })
}

/// Repository for purchase (stock-in) documents. Purchases are never deleted; void
/// them with [`anular`](IngresoRepository::anular).
#[derive(Debug, Clone)]
pub struct IngresoRepository {
    base: BaseRepository,
}

impl IngresoRepository {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Catalog, paging: Paging) -> Self {
        Self {
            base: BaseRepository::new(db, catalog, paging),
        }
    }

    /// Record a purchase and all its lines atomically. Any failing line rolls back the
    /// header and every line before it.
    #[instrument(skip(self, header, lines), fields(idproveedor = header.idproveedor, lines = lines.len()))]
    pub async fn create(
        &self,
        header: NewIngreso,
        lines: Vec<NewDetalleIngreso>,
    ) -> Result<IngresoCompleto, ServiceError> {
        validate_document(&header, &lines)?;
        let catalog = self.base.catalog();

        let created = with_transaction(self.get_db(), move |txn| {
            Box::pin(async move { insert_ingreso(txn, &catalog, header, lines).await })
        })
        .await?;

        counter!("ventas_db.documents.created", 1, "table" => TABLE);
        info!(
            idingreso = created.ingreso.idingreso,
            total = %created.ingreso.total,
            "Ingreso created"
        );
        Ok(created)
    }

    /// Append a line to existing purchase `id`.
    #[instrument(skip(self, line), fields(idproducto = line.idproducto))]
    pub async fn add_detalle(
        &self,
        id: i32,
        line: NewDetalleIngreso,
    ) -> Result<detalle_ingreso::Model, ServiceError> {
        line.validate()?;
        let catalog = self.base.catalog();

        with_transaction(self.get_db(), move |txn| {
            Box::pin(async move {
                ensure_exists(txn, &catalog, TABLE, id).await?;
                ensure_foreign_keys(txn, &catalog, LINE_TABLE, &[("idproducto", line.idproducto)])
                    .await?;
                line.into_active_model(id)
                    .insert(txn)
                    .await
                    .map(Normalize::normalize)
                    .map_err(ServiceError::from_write)
            })
        })
        .await
    }

    pub async fn find_by_id(&self, id: i32) -> Result<Option<IngresoModel>, ServiceError> {
        Ingreso::find_by_id(id)
            .one(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)
    }

    pub async fn get(&self, id: i32) -> Result<IngresoModel, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TABLE, id))
    }

    pub async fn find_with_detalles(
        &self,
        id: i32,
    ) -> Result<Option<IngresoCompleto>, ServiceError> {
        let Some(ingreso) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let detalles = ingreso
            .find_related(DetalleIngreso)
            .order_by_asc(detalle_ingreso::Column::IddetalleIngreso)
            .all(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)?;
        Ok(Some(IngresoCompleto { ingreso, detalles }))
    }

    /// Lines of purchase `id`, in insertion order.
    pub async fn detalles(&self, id: i32) -> Result<Vec<detalle_ingreso::Model>, ServiceError> {
        self.find_with_detalles(id)
            .await?
            .map(|v| v.detalles)
            .ok_or_else(|| ServiceError::not_found(TABLE, id))
    }

    /// Purchase `id` with its supplier.
    pub async fn find_with_proveedor(
        &self,
        id: i32,
    ) -> Result<Option<(IngresoModel, persona::Model)>, ServiceError> {
        let found = Ingreso::find_by_id(id)
            .find_also_related(Persona)
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)?;

        match found {
            None => Ok(None),
            Some((ingreso, Some(proveedor))) => Ok(Some((ingreso.normalize(), proveedor))),
            Some((ingreso, None)) => Err(ServiceError::IntegrityError(format!(
                "ingreso {} points at missing persona {}",
                ingreso.idingreso, ingreso.idproveedor
            ))),
        }
    }

    #[instrument(skip(self))]
    pub async fn set_estado(&self, id: i32, estado: &str) -> Result<IngresoModel, ServiceError> {
        check_document_estado(estado)?;
        let mut model: ingreso::ActiveModel = self.get(id).await?.into();
        model.estado = Set(estado.to_string());
        model
            .update(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_write)
    }

    /// Marks purchase `id` as voided. Lines are kept.
    pub async fn anular(&self, id: i32) -> Result<IngresoModel, ServiceError> {
        self.set_estado(id, estado::ANULADO).await
    }

    /// Purchases from supplier `idproveedor`, newest first.
    pub async fn by_persona(
        &self,
        idproveedor: i32,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<IngresoModel>, ServiceError> {
        let select = Ingreso::find()
            .filter(Column::Idproveedor.eq(idproveedor))
            .order_by_desc(Column::Fecha);
        self.base.paginate(select, page, per_page).await
    }

    pub async fn by_usuario(
        &self,
        idusuario: i32,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<IngresoModel>, ServiceError> {
        let select = Ingreso::find()
            .filter(Column::Idusuario.eq(idusuario))
            .order_by_desc(Column::Fecha);
        self.base.paginate(select, page, per_page).await
    }

    /// Purchases with `fecha` in `[desde, hasta]`, oldest first.
    pub async fn between(
        &self,
        desde: NaiveDateTime,
        hasta: NaiveDateTime,
    ) -> Result<Vec<IngresoModel>, ServiceError> {
        Ingreso::find()
            .filter(Column::Fecha.between(desde, hasta))
            .order_by_asc(Column::Fecha)
            .order_by_asc(Column::Idingreso)
            .all(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<IngresoModel>, ServiceError> {
        let select = Ingreso::find()
            .order_by_desc(Column::Fecha)
            .order_by_desc(Column::Idingreso);
        self.base.paginate(select, page, per_page).await
    }
}

impl Repository for IngresoRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
