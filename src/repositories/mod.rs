use crate::catalog::Catalog;
use crate::config::AppConfig;
use crate::entities::scale::Normalize;
use crate::errors::ServiceError;
use sea_orm::{DatabaseConnection, EntityTrait, PaginatorTrait, Select};
use serde::Serialize;
use std::sync::Arc;

pub mod categoria_repository;
pub mod constraints;
pub mod ingreso_repository;
pub mod persona_repository;
pub mod producto_repository;
pub mod rol_repository;
pub mod usuario_repository;
pub mod venta_repository;

/// Repository trait for common database operations
pub trait Repository {
    fn get_db(&self) -> &DatabaseConnection;
}

/// Page-size policy shared by every `list`-style query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Paging {
    pub default_page_size: u64,
    pub max_page_size: u64,
}

impl Default for Paging {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

impl From<&AppConfig> for Paging {
    fn from(cfg: &AppConfig) -> Self {
        Self {
            default_page_size: cfg.default_page_size,
            max_page_size: cfg.max_page_size,
        }
    }
}

impl Paging {
    /// Effective page size for a request, clamped to `1..=max_page_size`.
    pub fn limit(&self, requested: Option<u64>) -> u64 {
        requested
            .unwrap_or(self.default_page_size)
            .clamp(1, self.max_page_size.max(1))
    }
}

/// Document `estado` is a required `VARCHAR(20)`; any value within that is accepted.
pub(crate) fn check_document_estado(estado: &str) -> Result<(), ServiceError> {
    let len = estado.chars().count();
    if len == 0 || len > 20 {
        return Err(ServiceError::ValidationError(format!(
            "estado must be 1 to 20 characters, got {}",
            len
        )));
    }
    Ok(())
}

/// One page of results. Pages are numbered from 1.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
    pub total_pages: u64,
}

#[derive(Debug, Clone)]
pub struct BaseRepository {
    db: Arc<DatabaseConnection>,
    catalog: Catalog,
    paging: Paging,
}

impl BaseRepository {
    pub fn new(db: Arc<DatabaseConnection>, catalog: Catalog, paging: Paging) -> Self {
        Self {
            db,
            catalog,
            paging,
        }
    }

    pub fn catalog(&self) -> Catalog {
        self.catalog
    }

    pub fn paging(&self) -> Paging {
        self.paging
    }

    /// Runs `select` as page `page` (1-based) with the clamped page size. A page
    /// past the last one comes back empty without querying rows.
    pub(crate) async fn paginate<E>(
        &self,
        select: Select<E>,
        page: u64,
        per_page: Option<u64>,
    ) -> Result<Page<E::Model>, ServiceError>
    where
        E: EntityTrait,
        E::Model: Normalize + Send + Sync + 'static,
    {
        let per_page = self.paging.limit(per_page);
        let page = page.max(1);
        let paginator = select.paginate(self.get_db(), per_page);

        let counts = paginator
            .num_items_and_pages()
            .await
            .map_err(ServiceError::from_db)?;
        // fetch_page multiplies by per_page, so never hand it a page past the end
        let items = if page > counts.number_of_pages {
            Vec::new()
        } else {
            paginator
                .fetch_page(page - 1)
                .await
                .map_err(ServiceError::from_db)?
                .normalize()
        };

        Ok(Page {
            items,
            total: counts.number_of_items,
            page,
            per_page,
            total_pages: counts.number_of_pages,
        })
    }
}

impl Repository for BaseRepository {
    fn get_db(&self) -> &DatabaseConnection {
        &self.db
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_size_is_clamped() {
        let paging = Paging {
            default_page_size: 20,
            max_page_size: 50,
        };
        assert_eq!(paging.limit(None), 20);
        assert_eq!(paging.limit(Some(0)), 1);
        assert_eq!(paging.limit(Some(10)), 10);
        assert_eq!(paging.limit(Some(500)), 50);
    }
}
