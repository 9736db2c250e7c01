use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// System user. `password` holds whatever credential the authentication layer
/// stores (normally a hash); it is never interpreted here.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "usuario")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub idusuario: i32,
    pub idrol: i32,
    pub nombre: String,
    pub tipo_documento: Option<String>,
    pub num_documento: Option<String>,
    pub direccion: Option<String>,
    pub telefono: Option<String>,
    #[sea_orm(unique)]
    pub email: String,
    pub password: String,
    #[sea_orm(column_type = "Text", nullable)]
    pub estado: Option<String>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::rol::Entity",
        from = "Column::Idrol",
        to = "super::rol::Column::Idrol"
    )]
    Rol,
    #[sea_orm(has_many = "super::ingreso::Entity")]
    Ingresos,
    #[sea_orm(has_many = "super::venta::Entity")]
    Ventas,
}

impl Related<super::rol::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Rol.def()
    }
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
