// tests/api.rs

mod common;

use axum::http::{Method, StatusCode};
use serde_json::json;

use common::spawn_app;
use lotes_backend::models::auth::Role;

#[tokio::test]
async fn health_is_public() {
    let app = spawn_app();
    let (status, _) = app.request(Method::GET, "/api/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn requests_without_token_are_rejected() {
    let app = spawn_app();
    let (status, body) = app.request(Method::GET, "/api/products", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Token de autenticação inválido ou ausente.");
}

#[tokio::test]
async fn vendor_cannot_write_inventory() {
    let app = spawn_app();
    let (_, vendor) = app.token(Role::Vendor, None);
    let (status, body) = app
        .request(
            Method::POST,
            "/api/products",
            Some(&vendor),
            Some(json!({ "sku": "OL", "name": "Azeitona", "presentation": "500g", "unitsPerBox": 10 })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("inventory:write"));
}

#[tokio::test]
async fn invalid_payload_returns_field_details() {
    let app = spawn_app();
    let (_, admin) = app.token(Role::Admin, None);
    let (status, body) = app
        .request(
            Method::POST,
            "/api/products",
            Some(&admin),
            Some(json!({ "sku": "O-L", "name": "", "presentation": "500g", "unitsPerBox": 0 })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let details = body["details"].as_object().unwrap();
    assert!(details.contains_key("sku"));
    assert!(details.contains_key("name"));
    assert!(details.contains_key("units_per_box"));
}

#[tokio::test]
async fn order_payload_limits_are_validated() {
    let app = spawn_app();
    let (_, vendor) = app.token(Role::Vendor, None);

    for lines in [
        json!([]),
        json!([{ "productId": uuid::Uuid::new_v4(), "boxes": 4611686018427387903i64 }]),
    ] {
        let (status, _) = app
            .request(
                Method::POST,
                "/api/orders",
                Some(&vendor),
                Some(json!({ "customerId": uuid::Uuid::new_v4(), "lines": lines })),
            )
            .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }
}

#[tokio::test]
async fn full_order_flow_over_http() {
    let app = spawn_app();
    let (_, admin) = app.token(Role::Admin, None);
    let (_, vendor) = app.token(Role::Vendor, None);
    let (_, assembler) = app.token(Role::Assembler, None);

    let (status, product) = app
        .request(
            Method::POST,
            "/api/products",
            Some(&admin),
            Some(json!({
                "sku": "ol",
                "name": "Azeitona",
                "variant": "Verde",
                "presentation": "500g",
                "unitsPerBox": 10,
                "stockMinimum": 50
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let product_id = product["id"].as_str().unwrap().to_string();

    for boxes in [2, 5] {
        let (status, _) = app
            .request(
                Method::POST,
                &format!("/api/products/{product_id}/lots"),
                Some(&admin),
                Some(json!({ "boxes": boxes, "productionDate": "2026-03-01", "expiryDate": "2026-12-01" })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, order) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(&vendor),
            Some(json!({
                "customerId": uuid::Uuid::new_v4(),
                "lines": [{ "productId": product_id, "boxes": 2, "looseUnits": 5 }]
            })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(order["state"], "pending");
    assert_eq!(order["number"], "PED-000001");
    let order_id = order["id"].as_str().unwrap().to_string();

    // Vendedor não separa pedidos
    let (status, _) = app
        .request(Method::POST, &format!("/api/orders/{order_id}/take"), Some(&vendor), None)
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, taken) = app
        .request(Method::POST, &format!("/api/orders/{order_id}/take"), Some(&assembler), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(taken["state"], "in_preparation");

    let (status, approved) = app
        .request(Method::POST, &format!("/api/orders/{order_id}/confirm"), Some(&assembler), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["state"], "approved");
    assert_eq!(approved["lines"][0]["lotsAssigned"][0]["lotNumber"], "OL0001");
    assert_eq!(approved["lines"][0]["lotsAssigned"][1]["units"], 5);

    let (_, product) = app
        .request(Method::GET, &format!("/api/products/{product_id}"), Some(&vendor), None)
        .await;
    assert_eq!(product["stock"]["totalUnits"], 45);
    assert_eq!(product["stock"]["boxes"], 4);
    assert_eq!(product["stock"]["looseUnits"], 5);
    assert_eq!(product["lots"][0]["number"], "OL0002");
    assert_eq!(product["lots"][0]["order"], 1);

    let (status, body) = app
        .request(Method::POST, &format!("/api/orders/{order_id}/confirm"), Some(&assembler), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["state"], "approved");

    let (_, low) = app
        .request(Method::GET, "/api/products/low-stock", Some(&admin), None)
        .await;
    assert_eq!(low.as_array().unwrap().len(), 1);

    let (_, movements) = app
        .request(Method::GET, &format!("/api/products/{product_id}/movements"), Some(&admin), None)
        .await;
    let kinds: Vec<_> = movements
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["movementType"].as_str().unwrap().to_string())
        .collect();
    assert_eq!(kinds, vec!["INTAKE", "INTAKE", "ORDER_DEDUCTION", "ORDER_DEDUCTION"]);
}

#[tokio::test]
async fn insufficient_stock_is_reported_in_the_client_language() {
    let app = spawn_app();
    let (_, admin) = app.token(Role::Admin, None);
    let (_, vendor) = app.token(Role::Vendor, None);
    let (_, assembler) = app.token(Role::Assembler, None);

    let (_, product) = app
        .request(
            Method::POST,
            "/api/products",
            Some(&admin),
            Some(json!({ "sku": "QJ", "name": "Queijo", "presentation": "1kg", "unitsPerBox": 10 })),
        )
        .await;
    let product_id = product["id"].as_str().unwrap().to_string();
    app.request(
        Method::POST,
        &format!("/api/products/{product_id}/lots"),
        Some(&admin),
        Some(json!({ "looseUnits": 3, "productionDate": "2026-03-01" })),
    )
    .await;

    let (_, order) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(&vendor),
            Some(json!({
                "customerId": uuid::Uuid::new_v4(),
                "lines": [{ "productId": product_id, "looseUnits": 5 }]
            })),
        )
        .await;
    assert_eq!(order["stockInsufficient"], true);
    let order_id = order["id"].as_str().unwrap().to_string();

    app.request(Method::POST, &format!("/api/orders/{order_id}/take"), Some(&assembler), None)
        .await;
    let (status, body) = app
        .request(Method::POST, &format!("/api/orders/{order_id}/confirm"), Some(&assembler), None)
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["details"]["required"], 5);
    assert_eq!(body["details"]["available"], 3);
    assert!(body["error"].as_str().unwrap().starts_with("Estoque insuficiente"));
}

#[tokio::test]
async fn admin_acting_as_assembler_can_take_orders_but_not_create_them() {
    let app = spawn_app();
    let (_, acting) = app.token(Role::Admin, Some(Role::Assembler));

    let (status, _) = app
        .request(
            Method::POST,
            "/api/orders",
            Some(&acting),
            Some(json!({ "customerId": uuid::Uuid::new_v4(), "lines": [] })),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = app
        .request(Method::GET, "/api/products", Some(&acting), None)
        .await;
    assert_eq!(status, StatusCode::OK);
}
