use crate::catalog::Catalog;
use sea_orm_migration::prelude::*;
use tracing::info;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        let catalog = Catalog::standard();
        vec![
            Box::new(m20240101_000001_create_catalog_tables::Migration { catalog }),
            Box::new(m20240101_000002_create_foreign_key_indexes::Migration { catalog }),
        ]
    }
}

fn catalog_order(catalog: &Catalog) -> Result<Vec<&'static crate::catalog::TableDef>, DbErr> {
    catalog
        .dependency_order()
        .map_err(|e| DbErr::Migration(e.to_string()))
}

mod m20240101_000001_create_catalog_tables {
    use super::*;

    pub struct Migration {
        pub catalog: Catalog,
    }

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000001_create_catalog_tables"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            // parents before children so every FOREIGN KEY target exists
            for table in catalog_order(&self.catalog)? {
                info!(table = table.name, "Creating table");
                manager
                    .create_table(Catalog::create_table_statement(table))
                    .await?;
            }
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in catalog_order(&self.catalog)?.into_iter().rev() {
                info!(table = table.name, "Dropping table");
                manager
                    .drop_table(Catalog::drop_table_statement(table))
                    .await?;
            }
            Ok(())
        }
    }
}

mod m20240101_000002_create_foreign_key_indexes {
    use super::*;

    pub struct Migration {
        pub catalog: Catalog,
    }

    impl MigrationName for Migration {
        fn name(&self) -> &str {
            "m20240101_000002_create_foreign_key_indexes"
        }
    }

    #[async_trait::async_trait]
    impl MigrationTrait for Migration {
        async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in self.catalog.tables() {
                for index in Catalog::create_index_statements(table) {
                    manager.create_index(index).await?;
                }
            }
            Ok(())
        }

        async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
            for table in self.catalog.tables() {
                for fk in table.foreign_keys {
                    manager
                        .drop_index(
                            Index::drop()
                                .name(format!("idx_{}_{}", table.name, fk.column))
                                .table(Alias::new(table.name))
                                .to_owned(),
                        )
                        .await?;
                }
            }
            Ok(())
        }
    }
}
