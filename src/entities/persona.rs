use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// A counterparty. `tipo_persona` tells suppliers ("Proveedor") from customers
/// ("Cliente"); the same table backs both `ingreso.idproveedor` and
/// `venta.idcliente`.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "persona")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub idpersona: i32,
    pub tipo_persona: String,
    pub nombre: String,
    pub tipo_documento: Option<String>,
    pub num_documento: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    pub email: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::ingreso::Entity")]
    Ingresos,
    #[sea_orm(has_many = "super::venta::Entity")]
    Ventas,
}

impl Related<super::ingreso::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ingresos.def()
    }
}

impl Related<super::venta::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Ventas.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
