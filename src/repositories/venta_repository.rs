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
use crate::dto::{NewDetalleVenta, NewVenta};
use crate::entities::detalle_venta::{self, Entity as DetalleVenta};
use crate::entities::estado;
use crate::entities::persona::{self, Entity as Persona};
use crate::entities::venta::{self, Column, Entity as Venta, Model as VentaModel};
use crate::entities::scale::Normalize;
use crate::errors::ServiceError;
use crate::repositories::constraints::{ensure_exists, ensure_foreign_keys};
use crate::repositories::{check_document_estado, BaseRepository, Page, Paging, Repository};

const TABLE: &str = "venta";
const LINE_TABLE: &str = "detalle_venta";

/// A sale header with its lines.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VentaCompleta {
    pub venta: VentaModel,
    pub detalles: Vec<detalle_venta::Model>,
}

impl VentaCompleta {
    /// Sum of `cantidad * precio - descuento` over the lines. Not compared with
    /// `venta.total`, which is stored as given.
    pub fn lines_total(&self) -> Decimal {
        self.detalles
            .iter()
            .map(|d| crate::dto::line_subtotal(d.cantidad, d.precio, d.descuento))
            .sum()
    }
}

fn validate_document(header: &NewVenta, lines: &[NewDetalleVenta]) -> Result<(), ServiceError> {
    header.validate()?;
    if lines.is_empty() {
        return Err(ServiceError::ValidationError(
            "venta requires at least one detalle_venta line".to_string(),
        ));
    }
    for (i, line) in lines.iter().enumerate() {
        line.validate()
            .map_err(|e| ServiceError::ValidationError(format!("line {}: {}", i + 1, e)))?;
    }
    Ok(())
}

/// Inserts a sale and its lines on `conn`. Callers own the transaction; use
/// [`VentaRepository::create`] for the self-contained version.
pub async fn insert_venta<C: ConnectionTrait>(
    conn: &C,
    catalog: &Catalog,
    header: NewVenta,
    lines: Vec<NewDetalleVenta>,
) -> Result<VentaCompleta, ServiceError> {
    validate_document(&header, &lines)?;
    ensure_foreign_keys(
        conn,
        catalog,
        TABLE,
        &[("idcliente", header.idcliente), ("idusuario", header.idusuario)],
    )
    .await?;

    let venta = header
        .into_active_model()
        .insert(conn)
        .await
        .map(Normalize::normalize)
        .map_err(ServiceError::from_write)?;

    let mut detalles = Vec::with_capacity(lines.len());
    for line in lines {
        ensure_foreign_keys(conn, catalog, LINE_TABLE, &[("idproducto", line.idproducto)]).await?;
        let detalle = line
            .into_active_model(venta.idventa)
            .insert(conn)
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_write)?;
        detalles.push(detalle);
    }

    Ok(VentaCompleta { venta, detalles })
}

/// Repository for sales documents. Sales are never deleted; void them with
/// [`anular`](VentaRepository::anular).
#[derive(Debug, Clone)]
pub struct VentaRepository {
    base: BaseRepository,
}

impl VentaRepository {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Catalog, paging: Paging) -> Self {
        Self {
            base: BaseRepository::new(db, catalog, paging),
        }
    }

    /// Record a sale and all its lines atomically. Any failing line rolls back the
    /// header and every line before it.
    #[instrument(skip(self, header, lines), fields(idcliente = header.idcliente, lines = lines.len()))]
    pub async fn create(
        &self,
        header: NewVenta,
        lines: Vec<NewDetalleVenta>,
    ) -> Result<VentaCompleta, ServiceError> {
        validate_document(&header, &lines)?;
        let catalog = self.base.catalog();

        let created = with_transaction(self.get_db(), move |txn| {
            Box::pin(async move { insert_venta(txn, &catalog, header, lines).await })
        })
        .await?;

        counter!("ventas_db.documents.created", 1, "table" => TABLE);
        info!(
            idventa = created.venta.idventa,
            total = %created.venta.total,
            "Venta created"
        );
        Ok(created)
    }

    /// Append a line to existing sale `id`.
    #[instrument(skip(self, line), fields(idproducto = line.idproducto))]
    pub async fn add_detalle(
        &self,
        id: i32,
        line: NewDetalleVenta,
    ) -> Result<detalle_venta::Model, ServiceError> {
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

    pub async fn find_by_id(&self, id: i32) -> Result<Option<VentaModel>, ServiceError> {
        Venta::find_by_id(id)
            .one(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)
    }

    pub async fn get(&self, id: i32) -> Result<VentaModel, ServiceError> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| ServiceError::not_found(TABLE, id))
    }

    pub async fn find_with_detalles(
        &self,
        id: i32,
    ) -> Result<Option<VentaCompleta>, ServiceError> {
        let Some(venta) = self.find_by_id(id).await? else {
            return Ok(None);
        };
        let detalles = venta
            .find_related(DetalleVenta)
            .order_by_asc(detalle_venta::Column::IddetalleVenta)
            .all(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)?;
        Ok(Some(VentaCompleta { venta, detalles }))
    }

    /// Lines of sale `id`, in insertion order.
    pub async fn detalles(&self, id: i32) -> Result<Vec<detalle_venta::Model>, ServiceError> {
        self.find_with_detalles(id)
            .await?
            .map(|v| v.detalles)
            .ok_or_else(|| ServiceError::not_found(TABLE, id))
    }

    /// Sale `id` with its customer.
    pub async fn find_with_cliente(
        &self,
        id: i32,
    ) -> Result<Option<(VentaModel, persona::Model)>, ServiceError> {
        let found = Venta::find_by_id(id)
            .find_also_related(Persona)
            .one(self.get_db())
            .await
            .map_err(ServiceError::from_db)?;

        match found {
            None => Ok(None),
            Some((venta, Some(cliente))) => Ok(Some((venta.normalize(), cliente))),
            Some((venta, None)) => Err(ServiceError::IntegrityError(format!(
                "venta {} points at missing persona {}",
                venta.idventa, venta.idcliente
            ))),
        }
    }

    #[instrument(skip(self))]
    pub async fn set_estado(&self, id: i32, estado: &str) -> Result<VentaModel, ServiceError> {
        check_document_estado(estado)?;
        let mut model: venta::ActiveModel = self.get(id).await?.into();
        model.estado = Set(estado.to_string());
        model
            .update(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_write)
    }

    /// Marks sale `id` as voided. Lines are kept.
    pub async fn anular(&self, id: i32) -> Result<VentaModel, ServiceError> {
        self.set_estado(id, estado::ANULADO).await
    }

    /// Sales to customer `idcliente`, newest first.
    pub async fn by_persona(
        &self,
        idcliente: i32,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<VentaModel>, ServiceError> {
        let select = Venta::find()
            .filter(Column::Idcliente.eq(idcliente))
            .order_by_desc(Column::FechaHora);
        self.base.paginate(select, page, per_page).await
    }

    pub async fn by_usuario(
        &self,
        idusuario: i32,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<VentaModel>, ServiceError> {
        let select = Venta::find()
            .filter(Column::Idusuario.eq(idusuario))
            .order_by_desc(Column::FechaHora);
        self.base.paginate(select, page, per_page).await
    }

    /// Sales with `fecha_hora` in `[desde, hasta]`, oldest first.
    pub async fn between(
        &self,
        desde: NaiveDateTime,
        hasta: NaiveDateTime,
    ) -> Result<Vec<VentaModel>, ServiceError> {
        Venta::find()
            .filter(Column::FechaHora.between(desde, hasta))
            .order_by_asc(Column::FechaHora)
            .order_by_asc(Column::Idventa)
            .all(self.get_db())
            .await
            .map(Normalize::normalize)
            .map_err(ServiceError::from_db)
    }

    pub async fn list(
        &self,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<VentaModel>, ServiceError> {
        let select = Venta::find()
            .order_by_desc(Column::FechaHora)
            .order_by_desc(Column::Idventa);
        self.base.paginate(select, page, per_page).await
    }
}

impl Repository for VentaRepository {
    fn get_db(&self) -> &DatabaseConnection {
        self.base.get_db()
    }
}
