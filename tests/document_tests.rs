mod common;

use assert_matches::assert_matches;
use common::{fecha, ingreso, linea_ingreso, linea_venta, producto, seed, store, venta};
use rust_decimal_macros::dec;
use sistema_ventas::entities::estado;
use sistema_ventas::errors::ServiceError;

#[tokio::test]
async fn venta_with_one_line_persists_exactly() {
    let store = store().await;
    let seed = seed(&store).await;

    let created = store
        .ventas()
        .create(
            venta(&seed, dec!(100.00), dec!(18.00)),
            vec![linea_venta(seed.idproducto, 2, dec!(50.00), dec!(0.00))],
        )
        .await
        .unwrap();

    let loaded = store
        .ventas()
        .find_with_detalles(created.venta.idventa)
        .await
        .unwrap()
        .expect("venta was stored");

    assert_eq!(loaded, created);
    assert_eq!(loaded.venta.total, dec!(100.00));
    assert_eq!(loaded.venta.impuesto, dec!(18.00));
    assert_eq!(loaded.venta.estado, estado::ACEPTADO);
    assert_eq!(loaded.detalles.len(), 1);

    let linea = &loaded.detalles[0];
    assert_eq!(linea.idventa, created.venta.idventa);
    assert_eq!(linea.cantidad, 2);
    assert_eq!(linea.precio, dec!(50.00));
    assert_eq!(linea.descuento, dec!(0.00));
    assert_eq!(loaded.lines_total(), dec!(100.00));
}

#[tokio::test]
async fn totals_are_stored_as_given() {
    let store = store().await;
    let seed = seed(&store).await;

    let created = store
        .ventas()
        .create(
            venta(&seed, dec!(999.99), dec!(18.00)),
            vec![linea_venta(seed.idproducto, 1, dec!(4.50), dec!(0.50))],
        )
        .await
        .unwrap();

    assert_eq!(created.venta.total, dec!(999.99));
    assert_eq!(created.lines_total(), dec!(4.00));
}

#[tokio::test]
async fn ingreso_with_several_lines() {
    let store = store().await;
    let seed = seed(&store).await;
    let azucar = store
        .productos()
        .create(producto(seed.idcategoria, "Azucar rubia 1kg", dec!(3.80), 0))
        .await
        .unwrap();

    let created = store
        .ingresos()
        .create(
            ingreso(&seed, dec!(195.00)),
            vec![
                linea_ingreso(seed.idproducto, 30, dec!(3.50)),
                linea_ingreso(azucar.idproducto, 30, dec!(3.00)),
            ],
        )
        .await
        .unwrap();

    assert_eq!(created.detalles.len(), 2);
    assert_eq!(created.lines_total(), dec!(195.00));

    let detalles = store
        .ingresos()
        .detalles(created.ingreso.idingreso)
        .await
        .unwrap();
    assert_eq!(detalles, created.detalles);

    let (_, proveedor) = store
        .ingresos()
        .find_with_proveedor(created.ingreso.idingreso)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(proveedor.idpersona, seed.idproveedor);
}

#[tokio::test]
async fn add_detalle_appends_to_an_existing_document() {
    let store = store().await;
    let seed = seed(&store).await;
    let ventas = store.ventas();

    let created = ventas
        .create(
            venta(&seed, dec!(9.00), dec!(18.00)),
            vec![linea_venta(seed.idproducto, 1, dec!(4.50), dec!(0.00))],
        )
        .await
        .unwrap();

    let extra = ventas
        .add_detalle(
            created.venta.idventa,
            linea_venta(seed.idproducto, 1, dec!(4.50), dec!(0.00)),
        )
        .await
        .unwrap();
    assert_eq!(extra.idventa, created.venta.idventa);

    let detalles = ventas.detalles(created.venta.idventa).await.unwrap();
    assert_eq!(detalles.len(), 2);
    assert_eq!(detalles[1], extra);

    assert_matches!(
        ventas
            .add_detalle(404, linea_venta(seed.idproducto, 1, dec!(4.50), dec!(0.00)))
            .await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(ventas.detalles(404).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn anular_changes_only_the_estado() {
    let store = store().await;
    let seed = seed(&store).await;
    let ventas = store.ventas();

    let created = ventas
        .create(
            venta(&seed, dec!(100.00), dec!(18.00)),
            vec![linea_venta(seed.idproducto, 2, dec!(50.00), dec!(0.00))],
        )
        .await
        .unwrap();

    let anulada = ventas.anular(created.venta.idventa).await.unwrap();
    assert_eq!(anulada.estado, estado::ANULADO);
    assert_eq!(anulada.total, created.venta.total);
    assert_eq!(ventas.detalles(anulada.idventa).await.unwrap().len(), 1);

    // any label is accepted, no transition table
    let reabierta = ventas
        .set_estado(anulada.idventa, estado::ACEPTADO)
        .await
        .unwrap();
    assert_eq!(reabierta.estado, estado::ACEPTADO);

    assert_matches!(
        ventas.set_estado(anulada.idventa, "").await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        ventas.set_estado(anulada.idventa, &"x".repeat(21)).await,
        Err(ServiceError::ValidationError(_))
    );
}

#[tokio::test]
async fn reporting_queries_filter_by_date_and_party() {
    let store = store().await;
    let seed = seed(&store).await;
    let ventas = store.ventas();

    for (dia, total) in [(1, dec!(10.00)), (10, dec!(20.00)), (20, dec!(30.00))] {
        let mut header = venta(&seed, total, dec!(18.00));
        header.fecha_hora = fecha(2024, 4, dia, 12);
        ventas
            .create(
                header,
                vec![linea_venta(seed.idproducto, 1, total, dec!(0.00))],
            )
            .await
            .unwrap();
    }

    let abril = ventas
        .between(fecha(2024, 4, 5, 0), fecha(2024, 4, 20, 12))
        .await
        .unwrap();
    let totals: Vec<_> = abril.iter().map(|v| v.total).collect();
    assert_eq!(totals, vec![dec!(20.00), dec!(30.00)]);

    let page = ventas.by_persona(seed.idcliente, 1, Some(2)).await.unwrap();
    assert_eq!(page.total, 3);
    assert_eq!(page.total_pages, 2);
    assert_eq!(page.items.len(), 2);
    assert_eq!(page.items[0].total, dec!(30.00), "newest first");

    let page = ventas.by_usuario(seed.idusuario, 2, Some(2)).await.unwrap();
    assert_eq!(page.items.len(), 1);
    assert_eq!(page.items[0].total, dec!(10.00));

    assert_eq!(ventas.by_persona(seed.idproveedor, 1, None).await.unwrap().total, 0);
}

#[tokio::test]
async fn venta_joins_its_cliente() {
    let store = store().await;
    let seed = seed(&store).await;

    let created = store
        .ventas()
        .create(
            venta(&seed, dec!(4.50), dec!(18.00)),
            vec![linea_venta(seed.idproducto, 1, dec!(4.50), dec!(0.00))],
        )
        .await
        .unwrap();

    let (found, cliente) = store
        .ventas()
        .find_with_cliente(created.venta.idventa)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(found, created.venta);
    assert_eq!(cliente.nombre, "Lucia Quispe");

    assert!(store.ventas().find_with_cliente(999).await.unwrap().is_none());
}

#[tokio::test]
async fn pages_past_the_end_are_empty() {
    let store = store().await;
    let seed = seed(&store).await;
    store
        .ventas()
        .create(
            venta(&seed, dec!(4.50), dec!(18.00)),
            vec![linea_venta(seed.idproducto, 1, dec!(4.50), dec!(0.00))],
        )
        .await
        .unwrap();

    let page = store.productos().list(u64::MAX, None).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 1);
    assert_eq!(page.page, u64::MAX);
    assert_eq!(page.total_pages, 1);

    let page = store.ventas().list(2, Some(1)).await.unwrap();
    assert!(page.items.is_empty());
    assert_eq!(page.total, 1);

    let page = store
        .ventas()
        .by_usuario(seed.idusuario, u64::MAX, Some(100))
        .await
        .unwrap();
    assert!(page.items.is_empty());

    // page 0 reads as the first page
    assert_eq!(store.ventas().list(0, None).await.unwrap().items.len(), 1);
}
