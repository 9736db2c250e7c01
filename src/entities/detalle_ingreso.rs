use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "detalle_ingreso")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub iddetalle_ingreso: i32,
    pub idingreso: i32,
    pub idproducto: i32,
    pub cantidad: i32,
    #[sea_orm(column_type = "Decimal(Some((11, 2)))")]
    pub precio: Decimal,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::ingreso::Entity",
        from = "Column::Idingreso",
        to = "super::ingreso::Column::Idingreso"
    )]
    Ingreso,
    #[sea_orm(
        belongs_to = "super::producto::Entity",
        from = "Column::Idproducto",
        to = "super::producto::Column::Idproducto"
    )]
    Producto,
}

impl Related<super::ingreso::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingreso.def()
    }
}

impl Related<super::producto::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Producto.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
