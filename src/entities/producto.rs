use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// Sellable item.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "producto")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub idproducto: i32,
    pub idcategoria: i32,
    pub codigo: Option<String>,
    #[sea_orm(unique)]
    pub nombre: String,
    #[sea_orm(column_type = "Decimal(Some((11, 2)))")]
    pub precio_venta: Decimal,
    /// Units on hand. Kept non-negative by [`crate::repositories::producto_repository::adjust_stock`].
    pub stock: i32,
    pub descripcion: Option<String>,
    #[sea_orm(column_type = "Text", nullable)]
    pub estado: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::categoria::Entity",
        from = "Column::Idcategoria",
        to = "super::categoria::Column::Idcategoria"
    )]
    Categoria,
    #[sea_orm(has_many = "super::detalle_ingreso::Entity")]
    DetallesIngreso,
    #[sea_orm(has_many = "super::detalle_venta::Entity")]
    DetallesVenta,
}

impl Related<super::categoria::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Categoria.def()
    }
}

impl Related<super::detalle_ingreso::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DetallesIngreso.def()
    }
}

impl Related<super::detalle_venta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::DetallesVenta.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
