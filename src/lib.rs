//! Sistema de Ventas persistence layer
//!
//! Relational data model for a retail inventory and sales system: product
//! categories and products, customers and suppliers, users and roles, and the
//! purchase (`ingreso`) and sale (`venta`) documents with their line items.
//!
//! Tables are registered explicitly through [`catalog::Catalog`]; the catalog drives
//! the migrations and the constraint checks done by the repositories.
//!
//! # Money on SQLite
//!
//! Postgres stores money in exact `NUMERIC(p, 2)` columns. SQLite has no exact
//! decimal type: the driver hands `DECIMAL` values back as `f64`, so they are
//! only exact up to 15 significant digits, which covers the `DECIMAL(11, 2)`
//! range. Repositories pin every loaded amount back to two fraction digits with
//! [`entities::scale::Normalize`], so `50.00` stays `50.00` on both backends.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

pub mod catalog;
pub mod config;
pub mod db;
pub mod dto;
pub mod entities;
pub mod errors;
pub mod migrator;
pub mod repositories;

use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::errors::ServiceError;
use crate::repositories::{
    categoria_repository::CategoriaRepository, ingreso_repository::IngresoRepository,
    persona_repository::PersonaRepository, producto_repository::ProductoRepository,
    rol_repository::RolRepository, usuario_repository::UsuarioRepository,
    venta_repository::VentaRepository, Paging,
};
use sea_orm::DatabaseConnection;
use std::sync::Arc;
use tracing::info;

/// Connection pool plus the table catalog it was initialized with. Hands out one
/// repository per aggregate.
#[derive(Debug, Clone)]
pub struct DataStore {
    db: Arc<DatabaseConnection>,
    catalog: Catalog,
    paging: Paging,
}

impl DataStore {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Catalog) -> Self {
        Self {
            db,
            catalog,
            paging: Paging::default(),
        }
    }

    pub fn with_paging(mut self, paging: Paging) -> Self {
        self.paging = paging;
        self
    }

    /// Connects with the pool settings from `cfg`, runs pending migrations when
    /// `auto_migrate` is set, and checks that every catalog table exists.
    pub async fn connect(cfg: &AppConfig) -> Result<Self, ServiceError> {
        let pool = db::establish_connection_from_app_config(cfg).await?;
        let catalog = Catalog::standard();

        if cfg.auto_migrate {
            db::run_migrations(&pool).await?;
        }
        db::verify_schema(&pool, &catalog).await?;

        info!(
            environment = %cfg.environment,
            tables = catalog.tables().len(),
            "Data store ready"
        );
        Ok(Self::new(Arc::new(pool), catalog).with_paging(Paging::from(cfg)))
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn categorias(&self) -> CategoriaRepository {
        CategoriaRepository::new(self.db.clone(), self.catalog, self.paging)
    }

    pub fn personas(&self) -> PersonaRepository {
        PersonaRepository::new(self.db.clone(), self.catalog, self.paging)
    }

    pub fn roles(&self) -> RolRepository {
        RolRepository::new(self.db.clone(), self.catalog, self.paging)
    }

    pub fn usuarios(&self) -> UsuarioRepository {
        UsuarioRepository::new(self.db.clone(), self.catalog, self.paging)
    }

    pub fn productos(&self) -> ProductoRepository {
        ProductoRepository::new(self.db.clone(), self.catalog, self.paging)
    }

    pub fn ingresos(&self) -> IngresoRepository {
        IngresoRepository::new(self.db.clone(), self.catalog, self.paging)
    }

    pub fn ventas(&self) -> VentaRepository {
        VentaRepository::new(self.db.clone(), self.catalog, self.paging)
    }
}
