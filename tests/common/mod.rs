#![allow(dead_code)]

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use sistema_ventas::{
    config::AppConfig,
    dto::{
        NewCategoria, NewDetalleIngreso, NewDetalleVenta, NewIngreso, NewPersona, NewProducto,
        NewRol, NewUsuario, NewVenta,
    },
    entities::{estado, tipo_persona},
    DataStore,
};

/// A migrated store over a private in-memory SQLite database.
///
/// The pool is pinned to a single connection: every new connection to
/// `sqlite::memory:` would otherwise open a fresh, empty database.
pub async fn store() -> DataStore {
    let mut cfg = AppConfig::new("sqlite::memory:".to_string(), "test".to_string());
    cfg.auto_migrate = true;
    cfg.db_max_connections = 1;
    cfg.db_min_connections = 1;

    DataStore::connect(&cfg)
        .await
        .expect("failed to create test database")
}

/// Ids of one row per master table, enough to hang documents off.
#[derive(Debug, Clone, Copy)]
pub struct Seed {
    pub idcategoria: i32,
    pub idcliente: i32,
    pub idproveedor: i32,
    pub idrol: i32,
    pub idusuario: i32,
    pub idproducto: i32,
}

pub async fn seed(store: &DataStore) -> Seed {
    let categoria = store
        .categorias()
        .create(categoria("Abarrotes"))
        .await
        .expect("seed categoria");
    let cliente = store
        .personas()
        .create(persona(tipo_persona::CLIENTE, "Lucia Quispe"))
        .await
        .expect("seed cliente");
    let proveedor = store
        .personas()
        .create(persona(tipo_persona::PROVEEDOR, "Distribuidora Andina SAC"))
        .await
        .expect("seed proveedor");
    let rol = store
        .roles()
        .create(NewRol {
            nombre: "Vendedor".into(),
            descripcion: Some("Registra ventas".into()),
            estado: Some(estado::ACTIVO.into()),
        })
        .await
        .expect("seed rol");
    let usuario = store
        .usuarios()
        .create(usuario(rol.idrol, "caja1@tienda.pe"))
        .await
        .expect("seed usuario");
    let producto = store
        .productos()
        .create(producto(categoria.idcategoria, "Arroz extra 1kg", dec!(4.50), 100))
        .await
        .expect("seed producto");

    Seed {
        idcategoria: categoria.idcategoria,
        idcliente: cliente.idpersona,
        idproveedor: proveedor.idpersona,
        idrol: rol.idrol,
        idusuario: usuario.idusuario,
        idproducto: producto.idproducto,
    }
}

pub fn fecha(year: i32, month: u32, day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, month, day)
        .and_then(|d| d.and_hms_opt(hour, 0, 0))
        .expect("valid date")
}

pub fn categoria(nombre: &str) -> NewCategoria {
    NewCategoria {
        nombre: nombre.into(),
        descripcion: None,
        estado: Some(estado::ACTIVO.into()),
    }
}

pub fn persona(tipo: &str, nombre: &str) -> NewPersona {
    NewPersona {
        tipo_persona: tipo.into(),
        nombre: nombre.into(),
        tipo_documento: Some("DNI".into()),
        num_documento: Some("45879632".into()),
        direccion: Some("Av. Grau 123".into()),
        telefono: Some("987654321".into()),
        email: None,
    }
}

pub fn usuario(idrol: i32, email: &str) -> NewUsuario {
    NewUsuario {
        idrol,
        nombre: "Carlos Ramos".into(),
        tipo_documento: Some("DNI".into()),
        num_documento: Some("40123456".into()),
        direccion: None,
        telefono: None,
        email: email.into(),
        password: "$2b$12$placeholderhash".into(),
        estado: Some(estado::ACTIVO.into()),
    }
}

pub fn producto(idcategoria: i32, nombre: &str, precio: Decimal, stock: i32) -> NewProducto {
    NewProducto {
        idcategoria,
        codigo: Some("7751234000017".into()),
        nombre: nombre.into(),
        precio_venta: precio,
        stock,
        descripcion: None,
        estado: Some(estado::ACTIVO.into()),
    }
}

pub fn venta(seed: &Seed, total: Decimal, impuesto: Decimal) -> NewVenta {
    NewVenta {
        idcliente: seed.idcliente,
        idusuario: seed.idusuario,
        tipo_comprobante: "Boleta".into(),
        serie_comprobante: Some("B001".into()),
        num_comprobante: "0000123".into(),
        fecha_hora: fecha(2024, 3, 15, 10),
        impuesto,
        total,
        estado: estado::ACEPTADO.into(),
    }
}

pub fn linea_venta(
    idproducto: i32,
    cantidad: i32,
    precio: Decimal,
    descuento: Decimal,
) -> NewDetalleVenta {
    NewDetalleVenta {
        idproducto,
        cantidad,
        precio,
        descuento,
    }
}

pub fn ingreso(seed: &Seed, total: Decimal) -> NewIngreso {
    NewIngreso {
        idproveedor: seed.idproveedor,
        idusuario: seed.idusuario,
        tipo_comprobante: "Factura".into(),
        serie_comprobante: Some("F001".into()),
        num_comprobante: "0004567".into(),
        fecha: fecha(2024, 3, 1, 9),
        impuesto: dec!(18.00),
        total,
        estado: estado::ACEPTADO.into(),
    }
}

pub fn linea_ingreso(idproducto: i32, cantidad: i32, precio: Decimal) -> NewDetalleIngreso {
    NewDetalleIngreso {
        idproducto,
        cantidad,
        precio,
    }
}
