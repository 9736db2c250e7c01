use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sales line item. `descuento` is an absolute amount, never more than
/// `cantidad * precio`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "detalle_venta")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub iddetalle_venta: i32,
    pub idventa: i32,
    pub idproducto: i32,
    pub cantidad: i32,
    #[sea_orm(column_type = "Decimal(Some((11, 2)))")]
    pub precio: Decimal,
    #[sea_orm(column_type = "Decimal(Some((11, 2)))")]
    pub descuento: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::venta::Entity",
        from = "Column::Idventa",
        to = "super::venta::Column::Idventa"
    )]
    Venta,
    #[sea_orm(
        belongs_to = "super::producto::Entity",
        from = "Column::Idproducto",
        to = "super::producto::Column::Idproducto"
    )]
    Producto,
}

impl Related<super::venta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Venta.def()
    }
}

impl Related<super::producto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Producto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
