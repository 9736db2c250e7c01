mod common;

use assert_matches::assert_matches;
use common::{linea_venta, producto, seed, store, venta};
use rust_decimal_macros::dec;
use sistema_ventas::db::with_transaction;
use sistema_ventas::errors::ServiceError;
use sistema_ventas::repositories::producto_repository::adjust_stock;
use sistema_ventas::repositories::venta_repository::insert_venta;

#[tokio::test]
async fn stock_moves_both_ways() {
    let store = store().await;
    let seed = seed(&store).await;
    let productos = store.productos();

    assert_eq!(productos.adjust_stock(seed.idproducto, 25).await.unwrap().stock, 125);
    assert_eq!(productos.adjust_stock(seed.idproducto, -125).await.unwrap().stock, 0);
}

#[tokio::test]
async fn stock_never_goes_negative() {
    let store = store().await;
    let seed = seed(&store).await;
    let productos = store.productos();

    let result = productos.adjust_stock(seed.idproducto, -101).await;
    assert_matches!(result, Err(ServiceError::InsufficientStock(msg)) if msg.contains("100 units"));
    assert_eq!(productos.get(seed.idproducto).await.unwrap().stock, 100);

    assert_matches!(
        productos.adjust_stock(9999, 1).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn stock_is_capped_at_the_column_limit() {
    let store = store().await;
    let seed = seed(&store).await;
    let productos = store.productos();

    let result = productos.adjust_stock(seed.idproducto, i32::MAX).await;
    assert_matches!(result, Err(ServiceError::ValidationError(msg)) if msg.contains("stock limit"));

    // nothing was written, the row still decodes
    assert_eq!(productos.get(seed.idproducto).await.unwrap().stock, 100);
    assert_eq!(productos.list(1, None).await.unwrap().items[0].stock, 100);

    let lleno = productos
        .adjust_stock(seed.idproducto, i32::MAX - 100)
        .await
        .unwrap();
    assert_eq!(lleno.stock, i32::MAX);
    assert_matches!(
        productos.adjust_stock(seed.idproducto, 1).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        productos.adjust_stock(seed.idproducto, i32::MIN).await,
        Err(ServiceError::InsufficientStock(_))
    );
    assert_eq!(productos.get(seed.idproducto).await.unwrap().stock, i32::MAX);
}

#[tokio::test]
async fn concurrent_sales_do_not_lose_updates() {
    let store = store().await;
    let seed = seed(&store).await;
    let limitado = store
        .productos()
        .create(producto(seed.idcategoria, "Panetón edición limitada", dec!(25.90), 10))
        .await
        .unwrap();

    let mut tasks = vec![];
    for _ in 0..20 {
        let productos = store.productos();
        let id = limitado.idproducto;
        tasks.push(tokio::spawn(async move {
            productos.adjust_stock(id, -1).await.is_ok()
        }));
    }

    let mut success = 0;
    for task in tasks {
        if task.await.unwrap_or(false) {
            success += 1;
        }
    }

    assert_eq!(success, 10, "exactly 10 decrements should succeed; got {}", success);
    assert_eq!(
        store.productos().get(limitado.idproducto).await.unwrap().stock,
        0
    );
}

#[tokio::test]
async fn sale_and_stock_movement_commit_together() {
    let store = store().await;
    let seed = seed(&store).await;
    let catalog = *store.catalog();

    let header = venta(&seed, dec!(45.00), dec!(18.00));
    let lines = vec![linea_venta(seed.idproducto, 10, dec!(4.50), dec!(0.00))];

    let registrada = with_transaction(store.db(), move |txn| {
        Box::pin(async move {
            let venta = insert_venta(txn, &catalog, header, lines).await?;
            for linea in &venta.detalles {
                adjust_stock(txn, linea.idproducto, -linea.cantidad).await?;
            }
            Ok(venta)
        })
    })
    .await
    .unwrap();

    assert_eq!(registrada.detalles.len(), 1);
    assert_eq!(store.productos().get(seed.idproducto).await.unwrap().stock, 90);
}

#[tokio::test]
async fn insufficient_stock_rolls_back_the_sale() {
    let store = store().await;
    let seed = seed(&store).await;
    let catalog = *store.catalog();

    let header = venta(&seed, dec!(675.00), dec!(18.00));
    let lines = vec![linea_venta(seed.idproducto, 150, dec!(4.50), dec!(0.00))];

    let result = with_transaction(store.db(), move |txn| {
        Box::pin(async move {
            let venta = insert_venta(txn, &catalog, header, lines).await?;
            for linea in &venta.detalles {
                adjust_stock(txn, linea.idproducto, -linea.cantidad).await?;
            }
            Ok(venta)
        })
    })
    .await;

    assert_matches!(result, Err(ServiceError::InsufficientStock(_)));
    assert_eq!(store.ventas().list(1, None).await.unwrap().total, 0);
    assert_eq!(store.productos().get(seed.idproducto).await.unwrap().stock, 100);
}

#[tokio::test]
async fn low_stock_lists_lowest_first() {
    let store = store().await;
    let seed = seed(&store).await;
    let productos = store.productos();

    productos
        .create(producto(seed.idcategoria, "Sal de mesa 1kg", dec!(1.20), 2))
        .await
        .unwrap();
    productos
        .create(producto(seed.idcategoria, "Vinagre blanco", dec!(2.30), 5))
        .await
        .unwrap();

    let bajos = productos.low_stock(5).await.unwrap();
    let nombres: Vec<_> = bajos.iter().map(|p| p.nombre.as_str()).collect();
    assert_eq!(nombres, vec!["Sal de mesa 1kg", "Vinagre blanco"]);
}
