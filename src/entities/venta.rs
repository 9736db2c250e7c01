use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sales document header.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "venta")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub idventa: i32,
    /// Customer, a `persona` row.
    pub idcliente: i32,
    pub idusuario: i32,
    pub tipo_comprobante: String,
    pub serie_comprobante: Option<String>,
    pub num_comprobante: String,
    pub fecha_hora: DateTime,
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
        from = "Column::Idcliente",
        to = "super::persona::Column::Idpersona"
    )]
    Cliente,
    #[sea_orm(
        belongs_to = "super::usuario::Entity",
        from = "Column::Idusuario",
        to = "super::usuario::Column::Idusuario"
    )]
    Usuario,
    #[sea_orm(has_many = "super::detalle_venta::Entity")]
    Detalles,
}

impl Related<super::persona::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Cliente.def()
    }
}

impl Related<super::usuario::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Usuario.def()
    }
}

impl Related<super::detalle_venta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Detalles.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
