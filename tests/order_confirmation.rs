// tests/order_confirmation.rs

mod common;

use chrono::NaiveDate;
use uuid::Uuid;

use common::spawn_app;
use lotes_backend::{
    common::error::AppError,
    models::{
        auth::{Actor, Role},
        inventory::{NewLot, NewProduct, StockMovementType},
        operations::{NewOrderLine, OrderState},
    },
};

fn actor(role: Role) -> Actor {
    Actor { id: Uuid::new_v4(), role, active_context: None }
}

fn lot(boxes: i64, loose_units: i64, day: u32) -> NewLot {
    NewLot {
        boxes,
        loose_units,
        production_date: NaiveDate::from_ymd_opt(2026, 3, day).unwrap(),
        expiry_date: NaiveDate::from_ymd_opt(2026, 9, day),
        reason: Some("Recebimento".into()),
    }
}

// Vários pedidos e retiradas manuais disputando o mesmo produto: o saldo
// final bate com o livro-razão e nunca fica negativo.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_orders_and_withdrawals_conserve_units() {
    let app = spawn_app();
    let inventory = app.state.inventory_service.clone();
    let operations = app.state.operations_service.clone();

    let product = inventory
        .create_product(NewProduct {
            sku: "AZ".into(),
            name: "Azeite".into(),
            variant: None,
            presentation: "500ml".into(),
            units_per_box: 12,
            stock_minimum: 0,
        })
        .await
        .unwrap();
    let admin = Uuid::new_v4();
    for day in 1..=4 {
        inventory.add_lot(product.id, admin, lot(3, 0, day)).await.unwrap();
    }
    let initial = inventory.get_product(product.id).await.unwrap().stock.total_units;
    assert_eq!(initial, 144);

    let vendor = actor(Role::Vendor);
    let mut tasks = Vec::new();
    for _ in 0..8 {
        let operations = operations.clone();
        let assembler = actor(Role::Assembler);
        let order = operations
            .create_order(
                &vendor,
                Uuid::new_v4(),
                vec![NewOrderLine { product_id: product.id, boxes: 1, loose_units: 7 }],
                None,
            )
            .await
            .unwrap();
        operations.take_order(order.id, &assembler).await.unwrap();
        tasks.push(tokio::spawn(async move {
            operations.confirm_order(order.id, &assembler).await.map(|_| 19)
        }));
    }
    for _ in 0..4 {
        let inventory = inventory.clone();
        let product_id = product.id;
        tasks.push(tokio::spawn(async move {
            let current = inventory.get_product(product_id).await?;
            let lot_number = current
                .lots
                .last()
                .map(|l| l.number.clone())
                .ok_or(AppError::NoStockAvailable { product: current.sku.clone() })?;
            inventory
                .remove_stock_from_lot(product_id, &lot_number, 0, 2, "Avaria", Uuid::new_v4())
                .await
                .map(|_| 2)
        }));
    }

    let mut consumed = 0;
    for task in tasks {
        if let Ok(units) = task.await.unwrap() {
            consumed += units;
        }
    }

    let product = inventory.get_product(product.id).await.unwrap();
    assert!(product.stock.total_units >= 0);
    assert_eq!(product.stock.total_units, initial - consumed);
    assert_eq!(
        product.stock.total_units,
        product.lots.iter().map(|l| l.total_units).sum::<i64>()
    );
    let mut orders: Vec<u32> = product.lots.iter().map(|l| l.order).collect();
    orders.sort_unstable();
    assert_eq!(orders, (1..=product.lots.len() as u32).collect::<Vec<_>>());

    let ledger = inventory.list_movements(product.id).await.unwrap();
    let net: i64 = ledger.iter().map(|m| m.units_delta).sum();
    assert_eq!(net, product.stock.total_units);
}

#[tokio::test]
async fn cancelled_approved_order_puts_exhausted_lot_back_first() {
    let app = spawn_app();
    let inventory = &app.state.inventory_service;
    let operations = &app.state.operations_service;

    let product = inventory
        .create_product(NewProduct {
            sku: "OL".into(),
            name: "Azeitona".into(),
            variant: Some("Preta".into()),
            presentation: "1kg".into(),
            units_per_box: 10,
            stock_minimum: 0,
        })
        .await
        .unwrap();
    let admin = Uuid::new_v4();
    inventory.add_lot(product.id, admin, lot(2, 0, 1)).await.unwrap();
    inventory.add_lot(product.id, admin, lot(5, 0, 2)).await.unwrap();

    let assembler = actor(Role::Assembler);
    let order = operations
        .create_order(
            &actor(Role::Vendor),
            Uuid::new_v4(),
            vec![NewOrderLine { product_id: product.id, boxes: 2, loose_units: 5 }],
            None,
        )
        .await
        .unwrap();
    operations.take_order(order.id, &assembler).await.unwrap();
    operations.confirm_order(order.id, &assembler).await.unwrap();

    // Entrada nova depois da aprovação
    inventory.add_lot(product.id, admin, lot(1, 0, 3)).await.unwrap();

    let admin_actor = Actor { id: admin, role: Role::Admin, active_context: None };
    let cancelled = operations.cancel_order(order.id, &admin_actor, None).await.unwrap();
    assert_eq!(cancelled.state, OrderState::Cancelled);

    let product = inventory.get_product(product.id).await.unwrap();
    let view: Vec<_> = product
        .lots
        .iter()
        .map(|l| (l.number.as_str(), l.order, l.total_units))
        .collect();
    assert_eq!(view, vec![("OL0001", 1, 20), ("OL0002", 2, 50), ("OL0003", 3, 10)]);

    let reversals: Vec<_> = inventory
        .list_movements(product.id)
        .await
        .unwrap()
        .into_iter()
        .filter(|m| m.movement_type == StockMovementType::OrderReversal)
        .collect();
    assert_eq!(reversals.len(), 2);
    assert!(reversals.iter().all(|m| m.order_id == Some(order.id)));
}
