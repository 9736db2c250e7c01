/*!
 * Static table catalog
 *
 * Every table the persistence layer knows about is listed here explicitly, with its
 * columns, nullability, uniqueness and foreign keys. The catalog is handed to the
 * migrator and to the repositories when the store is built; nothing is discovered
 * at runtime.
 */

use crate::errors::ServiceError;
use sea_orm::sea_query::{
    Alias, ColumnDef, ForeignKey, ForeignKeyAction, Index, IndexCreateStatement, Table,
    TableCreateStatement, TableDropStatement,
};
use std::collections::{HashMap, HashSet, VecDeque};

/// Storage type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// Auto-incrementing integer surrogate key.
    Serial,
    Integer,
    Varchar(u32),
    Text,
    /// Fixed-point decimal with total digits and fraction digits.
    Decimal { precision: u32, scale: u32 },
    DateTime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: ColumnKind,
    pub nullable: bool,
    pub unique: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ForeignKeyDef {
    pub column: &'static str,
    pub references: &'static str,
    pub referenced_column: &'static str,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableDef {
    pub name: &'static str,
    pub primary_key: &'static str,
    pub columns: &'static [FieldDef],
    pub foreign_keys: &'static [ForeignKeyDef],
}

/// A foreign key on another table pointing at the table being inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomingReference {
    pub table: &'static str,
    pub column: &'static str,
}

impl TableDef {
    pub fn column(&self, name: &str) -> Option<&'static FieldDef> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&'static str> {
        self.columns.iter().map(|c| c.name).collect()
    }

    pub fn unique_columns(&self) -> impl Iterator<Item = &'static FieldDef> {
        self.columns.iter().filter(|c| c.unique)
    }
}

const MONEY: ColumnKind = ColumnKind::Decimal {
    precision: 11,
    scale: 2,
};
const TAX_RATE: ColumnKind = ColumnKind::Decimal {
    precision: 4,
    scale: 2,
};

const fn field(name: &'static str, kind: ColumnKind) -> FieldDef {
    FieldDef {
        name,
        kind,
        nullable: false,
        unique: false,
    }
}

const fn optional(name: &'static str, kind: ColumnKind) -> FieldDef {
    FieldDef {
        name,
        kind,
        nullable: true,
        unique: false,
    }
}

const fn unique(name: &'static str, kind: ColumnKind) -> FieldDef {
    FieldDef {
        name,
        kind,
        nullable: false,
        unique: true,
    }
}

const fn fk(
    column: &'static str,
    references: &'static str,
    referenced_column: &'static str,
) -> ForeignKeyDef {
    ForeignKeyDef {
        column,
        references,
        referenced_column,
    }
}

static STANDARD_TABLES: [TableDef; 9] = [
    TableDef {
        name: "categoria",
        primary_key: "idcategoria",
        columns: &[
            field("idcategoria", ColumnKind::Serial),
            unique("nombre", ColumnKind::Varchar(50)),
            optional("descripcion", ColumnKind::Varchar(256)),
            optional("estado", ColumnKind::Text),
        ],
        foreign_keys: &[],
    },
    TableDef {
        name: "persona",
        primary_key: "idpersona",
        columns: &[
            field("idpersona", ColumnKind::Serial),
            field("tipo_persona", ColumnKind::Varchar(20)),
            field("nombre", ColumnKind::Varchar(100)),
            optional("tipo_documento", ColumnKind::Varchar(20)),
            optional("num_documento", ColumnKind::Varchar(20)),
            optional("direccion", ColumnKind::Varchar(70)),
            optional("telefono", ColumnKind::Varchar(20)),
            optional("email", ColumnKind::Varchar(50)),
        ],
        foreign_keys: &[],
    },
    TableDef {
        name: "rol",
        primary_key: "idrol",
        columns: &[
            field("idrol", ColumnKind::Serial),
            field("nombre", ColumnKind::Varchar(30)),
            optional("descripcion", ColumnKind::Varchar(100)),
            optional("estado", ColumnKind::Text),
        ],
        foreign_keys: &[],
    },
    TableDef {
        name: "usuario",
        primary_key: "idusuario",
        columns: &[
            field("idusuario", ColumnKind::Serial),
            field("idrol", ColumnKind::Integer),
            field("nombre", ColumnKind::Varchar(100)),
            optional("tipo_documento", ColumnKind::Varchar(20)),
            optional("num_documento", ColumnKind::Varchar(20)),
            optional("direccion", ColumnKind::Varchar(70)),
            optional("telefono", ColumnKind::Varchar(20)),
            unique("email", ColumnKind::Varchar(50)),
            field("password", ColumnKind::Varchar(256)),
            optional("estado", ColumnKind::Text),
        ],
        foreign_keys: &[fk("idrol", "rol", "idrol")],
    },
    TableDef {
        name: "producto",
        primary_key: "idproducto",
        columns: &[
            field("idproducto", ColumnKind::Serial),
            field("idcategoria", ColumnKind::Integer),
            optional("codigo", ColumnKind::Varchar(50)),
            unique("nombre", ColumnKind::Varchar(100)),
            field("precio_venta", MONEY),
            field("stock", ColumnKind::Integer),
            optional("descripcion", ColumnKind::Varchar(256)),
            optional("estado", ColumnKind::Text),
        ],
        foreign_keys: &[fk("idcategoria", "categoria", "idcategoria")],
    },
    TableDef {
        name: "ingreso",
        primary_key: "idingreso",
        columns: &[
            field("idingreso", ColumnKind::Serial),
            field("idproveedor", ColumnKind::Integer),
            field("idusuario", ColumnKind::Integer),
            field("tipo_comprobante", ColumnKind::Varchar(20)),
            optional("serie_comprobante", ColumnKind::Varchar(7)),
            field("num_comprobante", ColumnKind::Varchar(10)),
            field("fecha", ColumnKind::DateTime),
            field("impuesto", TAX_RATE),
            field("total", MONEY),
            field("estado", ColumnKind::Varchar(20)),
        ],
        foreign_keys: &[
            fk("idproveedor", "persona", "idpersona"),
            fk("idusuario", "usuario", "idusuario"),
        ],
    },
    TableDef {
        name: "detalle_ingreso",
        primary_key: "iddetalle_ingreso",
        columns: &[
            field("iddetalle_ingreso", ColumnKind::Serial),
            field("idingreso", ColumnKind::Integer),
            field("idproducto", ColumnKind::Integer),
            field("cantidad", ColumnKind::Integer),
            field("precio", MONEY),
        ],
        foreign_keys: &[
            fk("idingreso", "ingreso", "idingreso"),
            fk("idproducto", "producto", "idproducto"),
        ],
    },
    TableDef {
        name: "venta",
        primary_key: "idventa",
        columns: &[
            field("idventa", ColumnKind::Serial),
            field("idcliente", ColumnKind::Integer),
            field("idusuario", ColumnKind::Integer),
            field("tipo_comprobante", ColumnKind::Varchar(20)),
            optional("serie_comprobante", ColumnKind::Varchar(7)),
            field("num_comprobante", ColumnKind::Varchar(10)),
            field("fecha_hora", ColumnKind::DateTime),
            field("impuesto", TAX_RATE),
            field("total", MONEY),
            field("estado", ColumnKind::Varchar(20)),
        ],
        foreign_keys: &[
            fk("idcliente", "persona", "idpersona"),
            fk("idusuario", "usuario", "idusuario"),
        ],
    },
    TableDef {
        name: "detalle_venta",
        primary_key: "iddetalle_venta",
        columns: &[
            field("iddetalle_venta", ColumnKind::Serial),
            field("idventa", ColumnKind::Integer),
            field("idproducto", ColumnKind::Integer),
            field("cantidad", ColumnKind::Integer),
            field("precio", MONEY),
            field("descuento", MONEY),
        ],
        foreign_keys: &[
            fk("idventa", "venta", "idventa"),
            fk("idproducto", "producto", "idproducto"),
        ],
    },
];

/// Explicit set of table definitions used by the persistence layer.
#[derive(Debug, Clone, Copy)]
pub struct Catalog {
    tables: &'static [TableDef],
}

impl Default for Catalog {
    fn default() -> Self {
        Self::standard()
    }
}

impl Catalog {
    pub const fn new(tables: &'static [TableDef]) -> Self {
        Self { tables }
    }

    /// The nine tables of the inventory and sales schema.
    pub fn standard() -> Self {
        Self::new(&STANDARD_TABLES)
    }

    pub fn tables(&self) -> &'static [TableDef] {
        self.tables
    }

    pub fn table(&self, name: &str) -> Option<&'static TableDef> {
        self.tables.iter().find(|t| t.name == name)
    }

    /// Looks a table up, treating an unknown name as a programming error.
    pub fn require(&self, name: &str) -> Result<&'static TableDef, ServiceError> {
        self.table(name).ok_or_else(|| {
            ServiceError::InternalError(format!("table {} is not in the catalog", name))
        })
    }

    /// Every foreign key, on any table, that targets `table`.
    pub fn references_to(&self, table: &str) -> Vec<IncomingReference> {
        self.tables
            .iter()
            .flat_map(|t| {
                t.foreign_keys
                    .iter()
                    .filter(move |fk| fk.references == table)
                    .map(move |fk| IncomingReference {
                        table: t.name,
                        column: fk.column,
                    })
            })
            .collect()
    }

    /// Tables ordered so that every referenced table precedes the tables pointing
    /// at it. Fails if a foreign key targets an unknown table or column, or if the
    /// graph contains a cycle.
    pub fn dependency_order(&self) -> Result<Vec<&'static TableDef>, ServiceError> {
        let mut indegree: HashMap<&'static str, usize> = HashMap::new();
        let mut dependents: HashMap<&'static str, Vec<&'static str>> = HashMap::new();

        for table in self.tables {
            indegree.entry(table.name).or_insert(0);
            let mut parents = HashSet::new();
            for fk in table.foreign_keys {
                let target = self.table(fk.references).ok_or_else(|| {
                    ServiceError::InternalError(format!(
                        "{}.{} references unknown table {}",
                        table.name, fk.column, fk.references
                    ))
                })?;
                if target.column(fk.referenced_column).is_none() {
                    return Err(ServiceError::InternalError(format!(
                        "{}.{} references unknown column {}.{}",
                        table.name, fk.column, fk.references, fk.referenced_column
                    )));
                }
                // self references do not constrain creation order
                if fk.references != table.name && parents.insert(fk.references) {
                    *indegree.entry(table.name).or_insert(0) += 1;
                    dependents.entry(fk.references).or_default().push(table.name);
                }
            }
        }

        let mut ready: VecDeque<&'static str> = self
            .tables
            .iter()
            .filter(|t| indegree.get(t.name).copied() == Some(0))
            .map(|t| t.name)
            .collect();
        let mut ordered = Vec::with_capacity(self.tables.len());

        while let Some(name) = ready.pop_front() {
            if let Some(table) = self.table(name) {
                ordered.push(table);
            }
            for child in dependents.get(name).into_iter().flatten() {
                if let Some(degree) = indegree.get_mut(child) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push_back(*child);
                    }
                }
            }
        }

        if ordered.len() != self.tables.len() {
            return Err(ServiceError::InternalError(
                "foreign key graph contains a cycle".to_string(),
            ));
        }
        Ok(ordered)
    }

    pub fn create_table_statement(table: &TableDef) -> TableCreateStatement {
        let mut stmt = Table::create();
        stmt.table(Alias::new(table.name)).if_not_exists();

        for field in table.columns {
            let mut column = ColumnDef::new(Alias::new(field.name));
            match field.kind {
                ColumnKind::Serial => {
                    column.integer().not_null().auto_increment().primary_key();
                }
                ColumnKind::Integer => {
                    column.integer();
                }
                ColumnKind::Varchar(len) => {
                    column.string_len(len);
                }
                ColumnKind::Text => {
                    column.text();
                }
                ColumnKind::Decimal { precision, scale } => {
                    column.decimal_len(precision, scale);
                }
                ColumnKind::DateTime => {
                    column.date_time();
                }
            }
            if field.kind != ColumnKind::Serial {
                if field.nullable {
                    column.null();
                } else {
                    column.not_null();
                }
            }
            if field.unique {
                column.unique_key();
            }
            stmt.col(&mut column);
        }

        for fk in table.foreign_keys {
            stmt.foreign_key(
                ForeignKey::create()
                    .name(format!("fk_{}_{}", table.name, fk.column))
                    .from(Alias::new(table.name), Alias::new(fk.column))
                    .to(Alias::new(fk.references), Alias::new(fk.referenced_column))
                    .on_delete(ForeignKeyAction::Restrict)
                    .on_update(ForeignKeyAction::Restrict),
            );
        }

        stmt.to_owned()
    }

    /// One index per foreign-key column.
    pub fn create_index_statements(table: &TableDef) -> Vec<IndexCreateStatement> {
        table
            .foreign_keys
            .iter()
            .map(|fk| {
                Index::create()
                    .name(format!("idx_{}_{}", table.name, fk.column))
                    .table(Alias::new(table.name))
                    .col(Alias::new(fk.column))
                    .if_not_exists()
                    .to_owned()
            })
            .collect()
    }

    pub fn drop_table_statement(table: &TableDef) -> TableDropStatement {
        Table::drop()
            .table(Alias::new(table.name))
            .if_exists()
            .to_owned()
    }
}
