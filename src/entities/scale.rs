use rust_decimal::Decimal;

/// Fraction digits of every `DECIMAL` column in the schema.
pub const MONEY_SCALE: u32 = 2;

/// Rounds `value` to `scale` fraction digits and pins its scale, so `50` reads
/// back as `50.00`.
pub fn with_scale(value: Decimal, scale: u32) -> Decimal {
    let mut value = value.round_dp(scale);
    value.rescale(scale);
    value
}

/// Restores the declared scale of decimal fields on a loaded model.
///
/// SQLite has no exact decimal storage. sea-orm binds the value as text, the
/// column's NUMERIC affinity turns it into a number and the driver reads it back
/// as `f64`, dropping trailing zeros. Postgres `NUMERIC` already keeps the
/// scale, so there this is a no-op. Every repository read passes through it.
pub trait Normalize: Sized {
    fn normalize(self) -> Self;
}

impl<T: Normalize> Normalize for Option<T> {
    fn normalize(self) -> Self {
        self.map(Normalize::normalize)
    }
}

impl<T: Normalize> Normalize for Vec<T> {
    fn normalize(self) -> Self {
        self.into_iter().map(Normalize::normalize).collect()
    }
}

impl<A: Normalize, B: Normalize> Normalize for (A, B) {
    fn normalize(self) -> Self {
        (self.0.normalize(), self.1.normalize())
    }
}

macro_rules! no_decimals {
    ($($model:path),+ $(,)?) => {
        $(impl Normalize for $model {
            fn normalize(self) -> Self {
                self
            }
        })+
    };
}

no_decimals!(
    super::categoria::Model,
    super::persona::Model,
    super::rol::Model,
    super::usuario::Model,
);

impl Normalize for super::producto::Model {
    fn normalize(mut self) -> Self {
        self.precio_venta = with_scale(self.precio_venta, MONEY_SCALE);
        self
    }
}

impl Normalize for super::ingreso::Model {
    fn normalize(mut self) -> Self {
        self.impuesto = with_scale(self.impuesto, MONEY_SCALE);
        self.total = with_scale(self.total, MONEY_SCALE);
        self
    }
}

impl Normalize for super::detalle_ingreso::Model {
    fn normalize(mut self) -> Self {
        self.precio = with_scale(self.precio, MONEY_SCALE);
        self
    }
}

impl Normalize for super::venta::Model {
    fn normalize(mut self) -> Self {
        self.impuesto = with_scale(self.impuesto, MONEY_SCALE);
        self.total = with_scale(self.total, MONEY_SCALE);
        self
    }
}

impl Normalize for super::detalle_venta::Model {
    fn normalize(mut self) -> Self {
        self.precio = with_scale(self.precio, MONEY_SCALE);
        self.descuento = with_scale(self.descuento, MONEY_SCALE);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn scale_is_pinned() {
        assert_eq!(with_scale(dec!(50), 2).to_string(), "50.00");
        assert_eq!(with_scale(dec!(0.1), 2).to_string(), "0.10");
        assert_eq!(with_scale(dec!(19.990000000000002), 2).to_string(), "19.99");
    }

    #[test]
    fn every_decimal_column_uses_money_scale() {
        for table in crate::catalog::Catalog::standard().tables() {
            for column in table.columns {
                if let crate::catalog::ColumnKind::Decimal { scale, .. } = column.kind {
                    assert_eq!(scale, MONEY_SCALE, "{}.{}", table.name, column.name);
                }
            }
        }
    }

    #[test]
    fn detalle_keeps_cents_after_normalize() {
        let detalle = crate::entities::detalle_venta::Model {
            iddetalle_venta: 1,
            idventa: 1,
            idproducto: 1,
            cantidad: 2,
            precio: dec!(50),
            descuento: dec!(0),
        }
        .normalize();
        assert_eq!(detalle.precio.to_string(), "50.00");
        assert_eq!(detalle.descuento.to_string(), "0.00");
    }
}
