pub mod categoria;
pub mod detalle_ingreso;
pub mod detalle_venta;
pub mod ingreso;
pub mod persona;
pub mod producto;
pub mod rol;
pub mod scale;
pub mod usuario;
pub mod venta;

pub mod prelude {
    pub use super::categoria::Entity as Categoria;
    pub use super::detalle_ingreso::Entity as DetalleIngreso;
    pub use super::detalle_venta::Entity as DetalleVenta;
    pub use super::ingreso::Entity as Ingreso;
    pub use super::persona::Entity as Persona;
    pub use super::producto::Entity as Producto;
    pub use super::rol::Entity as Rol;
    pub use super::usuario::Entity as Usuario;
    pub use super::venta::Entity as Venta;
}

/// Conventional values for the free-text `estado` columns.
///
/// The database accepts any string; these are the values the existing
/// application writes. Nothing here restricts transitions between them.
pub mod estado {
    /// Master data (categoria, producto, rol, usuario) in use.
    pub const ACTIVO: &str = "1";
    /// Master data disabled but kept for history.
    pub const INACTIVO: &str = "0";
    /// Issued document.
    pub const ACEPTADO: &str = "Aceptado";
    /// Voided document.
    pub const ANULADO: &str = "Anulado";
}

/// Conventional values for `persona.tipo_persona`.
pub mod tipo_persona {
    pub const CLIENTE: &str = "Cliente";
    pub const PROVEEDOR: &str = "Proveedor";
}
