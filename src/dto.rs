//! Validated inputs for every table.
//!
//! Each `New*` struct carries all non-key attributes of one row. `validate()` checks
//! the column-level rules (required fields present, lengths, decimal
//! precision/scale); the repositories add the checks that need the database
//! (foreign keys, uniqueness) before converting with `into_active_model`.

use crate::entities::{
    categoria, detalle_ingreso, detalle_venta, ingreso, persona, producto, rol, usuario, venta,
};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sea_orm::ActiveValue::{NotSet, Set};
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const MONEY_PRECISION: u32 = 11;
pub const MONEY_SCALE: u32 = 2;
pub const TAX_RATE_PRECISION: u32 = 4;
pub const TAX_RATE_SCALE: u32 = 2;

/// Checks that `value` fits a `DECIMAL(precision, scale)` column without rounding.
pub fn check_decimal(value: &Decimal, precision: u32, scale: u32) -> Result<(), ValidationError> {
    if value.normalize().scale() > scale {
        let mut err = ValidationError::new("decimal_scale");
        err.message = Some(format!("{} has more than {} fraction digits", value, scale).into());
        return Err(err);
    }
    let limit = Decimal::from(10i64.pow(precision - scale));
    if value.trunc().abs() >= limit {
        let mut err = ValidationError::new("decimal_precision");
        err.message =
            Some(format!("{} does not fit in {} total digits", value, precision).into());
        return Err(err);
    }
    Ok(())
}

fn validate_money(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_amount"));
    }
    check_decimal(value, MONEY_PRECISION, MONEY_SCALE)
}

fn validate_tax_rate(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_tax_rate"));
    }
    check_decimal(value, TAX_RATE_PRECISION, TAX_RATE_SCALE)
}

/// `cantidad * precio - descuento` for one line.
pub fn line_subtotal(cantidad: i32, precio: Decimal, descuento: Decimal) -> Decimal {
    Decimal::from(cantidad) * precio - descuento
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewCategoria {
    #[validate(length(min = 1, max = 50))]
    pub nombre: String,
    #[validate(length(max = 256))]
    pub descripcion: Option<String>,
    pub estado: Option<String>,
}

impl NewCategoria {
    pub fn into_active_model(self) -> categoria::ActiveModel {
        categoria::ActiveModel {
            idcategoria: NotSet,
            nombre: Set(self.nombre),
            descripcion: Set(self.descripcion),
            estado: Set(self.estado),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewPersona {
    #[validate(length(min = 1, max = 20))]
    pub tipo_persona: String,
    #[validate(length(min = 1, max = 100))]
    pub nombre: String,
    #[validate(length(max = 20))]
    pub tipo_documento: Option<String>,
    #[validate(length(max = 20))]
    pub num_documento: Option<String>,
    #[validate(length(max = 70))]
    pub direccion: Option<String>,
    #[validate(length(max = 20))]
    pub telefono: Option<String>,
    #[validate(length(max = 50))]
    pub email: Option<String>,
}

impl NewPersona {
    pub fn into_active_model(self) -> persona::ActiveModel {
        persona::ActiveModel {
            idpersona: NotSet,
            tipo_persona: Set(self.tipo_persona),
            nombre: Set(self.nombre),
            tipo_documento: Set(self.tipo_documento),
            num_documento: Set(self.num_documento),
            direccion: Set(self.direccion),
            telefono: Set(self.telefono),
            email: Set(self.email),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewRol {
    #[validate(length(min = 1, max = 30))]
    pub nombre: String,
    #[validate(length(max = 100))]
    pub descripcion: Option<String>,
    pub estado: Option<String>,
}

impl NewRol {
    pub fn into_active_model(self) -> rol::ActiveModel {
        rol::ActiveModel {
            idrol: NotSet,
            nombre: Set(self.nombre),
            descripcion: Set(self.descripcion),
            estado: Set(self.estado),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewUsuario {
    pub idrol: i32,
    #[validate(length(min = 1, max = 100))]
    pub nombre: String,
    #[validate(length(max = 20))]
    pub tipo_documento: Option<String>,
    #[validate(length(max = 20))]
    pub num_documento: Option<String>,
    #[validate(length(max = 70))]
    pub direccion: Option<String>,
    #[validate(length(max = 20))]
    pub telefono: Option<String>,
    /// Login key. Only the length is checked, as on the existing column.
    #[validate(length(min = 1, max = 50))]
    pub email: String,
    /// Stored as given; hashing belongs to the authentication layer.
    #[validate(length(min = 1, max = 256))]
    pub password: String,
    pub estado: Option<String>,
}

impl NewUsuario {
    pub fn into_active_model(self) -> usuario::ActiveModel {
        usuario::ActiveModel {
            idusuario: NotSet,
            idrol: Set(self.idrol),
            nombre: Set(self.nombre),
            tipo_documento: Set(self.tipo_documento),
            num_documento: Set(self.num_documento),
            direccion: Set(self.direccion),
            telefono: Set(self.telefono),
            email: Set(self.email),
            password: Set(self.password),
            estado: Set(self.estado),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewProducto {
    pub idcategoria: i32,
    #[validate(length(max = 50))]
    pub codigo: Option<String>,
    #[validate(length(min = 1, max = 100))]
    pub nombre: String,
    #[validate(custom = "validate_money")]
    pub precio_venta: Decimal,
    #[validate(range(min = 0))]
    pub stock: i32,
    #[validate(length(max = 256))]
    pub descripcion: Option<String>,
    pub estado: Option<String>,
}

impl NewProducto {
    pub fn into_active_model(self) -> producto::ActiveModel {
        producto::ActiveModel {
            idproducto: NotSet,
            idcategoria: Set(self.idcategoria),
            codigo: Set(self.codigo),
            nombre: Set(self.nombre),
            precio_venta: Set(self.precio_venta),
            stock: Set(self.stock),
            descripcion: Set(self.descripcion),
            estado: Set(self.estado),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewIngreso {
    pub idproveedor: i32,
    pub idusuario: i32,
    #[validate(length(min = 1, max = 20))]
    pub tipo_comprobante: String,
    #[validate(length(max = 7))]
    pub serie_comprobante: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub num_comprobante: String,
    pub fecha: NaiveDateTime,
    #[validate(custom = "validate_tax_rate")]
    pub impuesto: Decimal,
    #[validate(custom = "validate_money")]
    pub total: Decimal,
    #[validate(length(min = 1, max = 20))]
    pub estado: String,
}

impl NewIngreso {
    pub fn into_active_model(self) -> ingreso::ActiveModel {
        ingreso::ActiveModel {
            idingreso: NotSet,
            idproveedor: Set(self.idproveedor),
            idusuario: Set(self.idusuario),
            tipo_comprobante: Set(self.tipo_comprobante),
            serie_comprobante: Set(self.serie_comprobante),
            num_comprobante: Set(self.num_comprobante),
            fecha: Set(self.fecha),
            impuesto: Set(self.impuesto),
            total: Set(self.total),
            estado: Set(self.estado),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewDetalleIngreso {
    pub idproducto: i32,
    #[validate(range(min = 1))]
    pub cantidad: i32,
    #[validate(custom = "validate_money")]
    pub precio: Decimal,
}

impl NewDetalleIngreso {
    pub fn into_active_model(self, idingreso: i32) -> detalle_ingreso::ActiveModel {
        detalle_ingreso::ActiveModel {
            iddetalle_ingreso: NotSet,
            idingreso: Set(idingreso),
            idproducto: Set(self.idproducto),
            cantidad: Set(self.cantidad),
            precio: Set(self.precio),
        }
    }

    pub fn subtotal(&self) -> Decimal {
        line_subtotal(self.cantidad, self.precio, Decimal::ZERO)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
pub struct NewVenta {
    pub idcliente: i32,
    pub idusuario: i32,
    #[validate(length(min = 1, max = 20))]
    pub tipo_comprobante: String,
    #[validate(length(max = 7))]
    pub serie_comprobante: Option<String>,
    #[validate(length(min = 1, max = 10))]
    pub num_comprobante: String,
    pub fecha_hora: NaiveDateTime,
    #[validate(custom = "validate_tax_rate")]
    pub impuesto: Decimal,
    #[validate(custom = "validate_money")]
    pub total: Decimal,
    #[validate(length(min = 1, max = 20))]
    pub estado: String,
}

impl NewVenta {
    pub fn into_active_model(self) -> venta::ActiveModel {
        venta::ActiveModel {
            idventa: NotSet,
            idcliente: Set(self.idcliente),
            idusuario: Set(self.idusuario),
            tipo_comprobante: Set(self.tipo_comprobante),
            serie_comprobante: Set(self.serie_comprobante),
            num_comprobante: Set(self.num_comprobante),
            fecha_hora: Set(self.fecha_hora),
            impuesto: Set(self.impuesto),
            total: Set(self.total),
            estado: Set(self.estado),
        }
    }
}

fn validate_descuento(line: &NewDetalleVenta) -> Result<(), ValidationError> {
    if line.descuento > Decimal::from(line.cantidad) * line.precio {
        let mut err = ValidationError::new("descuento_exceeds_line");
        err.message = Some(
            format!(
                "descuento {} exceeds cantidad x precio ({} x {})",
                line.descuento, line.cantidad, line.precio
            )
            .into(),
        );
        return Err(err);
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize, Validate)]
#[validate(schema(function = "validate_descuento"))]
pub struct NewDetalleVenta {
    pub idproducto: i32,
    #[validate(range(min = 1))]
    pub cantidad: i32,
    #[validate(custom = "validate_money")]
    pub precio: Decimal,
    #[validate(custom = "validate_money")]
    pub descuento: Decimal,
}

impl NewDetalleVenta {
    pub fn into_active_model(self, idventa: i32) -> detalle_venta::ActiveModel {
        detalle_venta::ActiveModel {
            iddetalle_venta: NotSet,
            idventa: Set(idventa),
            idproducto: Set(self.idproducto),
            cantidad: Set(self.cantidad),
            precio: Set(self.precio),
            descuento: Set(self.descuento),
        }
    }

    pub fn subtotal(&self) -> Decimal {
        line_subtotal(self.cantidad, self.precio, self.descuento)
    }
}
