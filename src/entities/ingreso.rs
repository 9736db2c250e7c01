use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Purchase (stock-in) document header.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "ingreso")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub idingreso: i32,
    /// Supplier, a `persona` row.
    pub idproveedor: i32,
    pub idusuario: i32,
    pub tipo_comprobante: String,
    pub serie_comprobante: Option<String>,
    pub num_comprobante: String,
    pub fecha: DateTime,
    #[sea_orm(column_type = "Decimal(Some((4, 2)))")]
    pub impuesto: Decimal,
    #[sea_orm(column_type = "Decimal(Some((11, 2)))")]
    pub total: Decimal,
    pub estado: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::persona::Entity",
        from = "Column::Idproveedor",
        to = "super::persona::Column::Idpersona"
    )]
    Proveedor,
    #[sea_orm(
        belongs_to = "super::usuario::Entity",
        from = "Column::Idusuario",
        to = "super::usuario::Column::Idusuario"
    )]
    Usuario,
    #[sea_orm(has_many = "super::detalle_ingreso::Entity")]
    Detalles,
}

impl Related<super::persona::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Proveedor.def()
    }
}

impl Related<super::usuario::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usuario.def()
    }
}

impl Related<super::detalle_ingreso::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Detalles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
