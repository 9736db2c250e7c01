mod common;

use assert_matches::assert_matches;
use common::{categoria, linea_venta, persona, producto, seed, store, usuario, venta};
use rust_decimal_macros::dec;
use sea_orm::{ActiveModelTrait, EntityTrait};
use sistema_ventas::entities::categoria::Entity as CategoriaEntity;
use sistema_ventas::entities::tipo_persona;
use sistema_ventas::errors::ServiceError;

#[tokio::test]
async fn duplicate_producto_nombre_is_a_unique_violation() {
    let store = store().await;
    let seed = seed(&store).await;

    let result = store
        .productos()
        .create(producto(seed.idcategoria, "Arroz extra 1kg", dec!(5.00), 3))
        .await;

    assert_matches!(result, Err(ServiceError::UniqueConstraint(msg)) if msg.contains("producto.nombre"));
    assert_eq!(store.productos().list(1, None).await.unwrap().total, 1);
}

#[tokio::test]
async fn unique_checks_are_case_sensitive() {
    let store = store().await;
    let seed = seed(&store).await;

    store
        .productos()
        .create(producto(seed.idcategoria, "ARROZ EXTRA 1KG", dec!(5.00), 3))
        .await
        .expect("different case is a different name");
}

#[tokio::test]
async fn duplicate_categoria_and_email_are_rejected() {
    let store = store().await;
    let seed = seed(&store).await;

    assert_matches!(
        store.categorias().create(categoria("Abarrotes")).await,
        Err(ServiceError::UniqueConstraint(_))
    );
    assert_matches!(
        store
            .usuarios()
            .create(usuario(seed.idrol, "caja1@tienda.pe"))
            .await,
        Err(ServiceError::UniqueConstraint(_))
    );
}

#[tokio::test]
async fn update_keeps_own_name_but_not_anothers() {
    let store = store().await;
    let seed = seed(&store).await;
    let productos = store.productos();

    let otro = productos
        .create(producto(seed.idcategoria, "Azucar rubia 1kg", dec!(3.80), 40))
        .await
        .unwrap();

    let renamed = productos
        .update(
            otro.idproducto,
            producto(seed.idcategoria, "Azucar rubia 1kg", dec!(3.90), 40),
        )
        .await
        .unwrap();
    assert_eq!(renamed.precio_venta, dec!(3.90));

    assert_matches!(
        productos
            .update(
                otro.idproducto,
                producto(seed.idcategoria, "Arroz extra 1kg", dec!(3.90), 40),
            )
            .await,
        Err(ServiceError::UniqueConstraint(_))
    );
}

#[tokio::test]
async fn producto_with_missing_categoria_is_not_found() {
    let store = store().await;

    let result = store
        .productos()
        .create(producto(999, "Aceite vegetal 1L", dec!(9.90), 5))
        .await;

    assert_matches!(result, Err(ServiceError::NotFound(msg)) if msg.contains("idcategoria"));
}

#[tokio::test]
async fn usuario_with_missing_rol_is_not_found() {
    let store = store().await;
    assert_matches!(
        store.usuarios().create(usuario(42, "nuevo@tienda.pe")).await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn detalle_venta_with_missing_producto_is_not_found_and_rolls_back() {
    let store = store().await;
    let seed = seed(&store).await;

    let result = store
        .ventas()
        .create(
            venta(&seed, dec!(110.00), dec!(18.00)),
            vec![
                linea_venta(seed.idproducto, 2, dec!(50.00), dec!(0.00)),
                linea_venta(4040, 1, dec!(10.00), dec!(0.00)),
            ],
        )
        .await;

    assert_matches!(result, Err(ServiceError::NotFound(msg)) if msg.contains("idproducto"));

    let ventas = store.ventas().list(1, None).await.unwrap();
    assert_eq!(ventas.total, 0, "header must not survive a failed line");
}

#[tokio::test]
async fn venta_with_missing_cliente_is_not_found() {
    let store = store().await;
    let seed = seed(&store).await;
    let mut header = venta(&seed, dec!(100.00), dec!(18.00));
    header.idcliente = 777;

    assert_matches!(
        store
            .ventas()
            .create(
                header,
                vec![linea_venta(seed.idproducto, 1, dec!(100.00), dec!(0.00))]
            )
            .await,
        Err(ServiceError::NotFound(_))
    );
}

#[tokio::test]
async fn deleting_a_referenced_categoria_is_an_integrity_error() {
    let store = store().await;
    let seed = seed(&store).await;

    let result = store.categorias().delete(seed.idcategoria).await;
    assert_matches!(result, Err(ServiceError::IntegrityError(msg)) if msg.contains("producto"));
    assert!(store
        .categorias()
        .find_by_id(seed.idcategoria)
        .await
        .unwrap()
        .is_some());

    store.productos().delete(seed.idproducto).await.unwrap();
    store.categorias().delete(seed.idcategoria).await.unwrap();
    assert!(store
        .categorias()
        .find_by_id(seed.idcategoria)
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn referenced_master_rows_cannot_be_deleted() {
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

    assert_matches!(
        store.personas().delete(seed.idcliente).await,
        Err(ServiceError::IntegrityError(_))
    );
    assert_matches!(
        store.usuarios().delete(seed.idusuario).await,
        Err(ServiceError::IntegrityError(_))
    );
    assert_matches!(
        store.productos().delete(seed.idproducto).await,
        Err(ServiceError::IntegrityError(_))
    );
    assert_matches!(
        store.roles().delete(seed.idrol).await,
        Err(ServiceError::IntegrityError(_))
    );

    // the supplier has no documents yet
    store.personas().delete(seed.idproveedor).await.unwrap();
}

#[tokio::test]
async fn deleting_a_missing_row_is_not_found() {
    let store = store().await;
    assert_matches!(
        store.categorias().delete(12).await,
        Err(ServiceError::NotFound(_))
    );
    assert_matches!(store.personas().get(12).await, Err(ServiceError::NotFound(_)));
}

#[tokio::test]
async fn invalid_inputs_are_validation_errors() {
    let store = store().await;
    let seed = seed(&store).await;

    assert_matches!(
        store.categorias().create(categoria("")).await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        store
            .personas()
            .create(persona(tipo_persona::CLIENTE, &"x".repeat(101)))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        store
            .productos()
            .create(producto(seed.idcategoria, "Fideos 500g", dec!(2.555), 1))
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        store
            .ventas()
            .create(venta(&seed, dec!(100.00), dec!(18.00)), vec![])
            .await,
        Err(ServiceError::ValidationError(_))
    );
    assert_matches!(
        store
            .ventas()
            .create(
                venta(&seed, dec!(100.00), dec!(18.00)),
                vec![linea_venta(seed.idproducto, 1, dec!(10.00), dec!(10.01))]
            )
            .await,
        Err(ServiceError::ValidationError(msg)) if msg.starts_with("line 1")
    );
}

#[tokio::test]
async fn constraint_errors_belong_to_the_violation_family() {
    let store = store().await;
    let seed = seed(&store).await;

    let err = store
        .categorias()
        .delete(seed.idcategoria)
        .await
        .unwrap_err();
    assert!(err.is_constraint_violation());
}

#[tokio::test]
async fn driver_foreign_key_errors_depend_on_the_write() {
    let store = store().await;
    let seed = seed(&store).await;

    // straight to the database, skipping the repository pre-checks
    let err = producto(999, "Fideos canuto", dec!(2.10), 5)
        .into_active_model()
        .insert(store.db())
        .await
        .unwrap_err();
    assert_matches!(ServiceError::from_write(err), ServiceError::NotFound(_));

    let err = CategoriaEntity::delete_by_id(seed.idcategoria)
        .exec(store.db())
        .await
        .unwrap_err();
    assert_matches!(ServiceError::from_db(err), ServiceError::IntegrityError(_));
    assert_eq!(store.productos().list(1, None).await.unwrap().total, 1);
}

#[tokio::test]
async fn driver_unique_errors_are_unique_violations() {
    let store = store().await;
    seed(&store).await;

    let err = categoria("Abarrotes")
        .into_active_model()
        .insert(store.db())
        .await
        .unwrap_err();
    assert_matches!(ServiceError::from_write(err), ServiceError::UniqueConstraint(_));
}
