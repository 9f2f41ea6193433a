// src/routes.rs

use axum::{
    routing::{get, post, put},
    Router,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::{config::AppState, docs::ApiDoc, handlers};

// Monta o router principal. A autenticação e as permissões são checadas
// pelos extratores de cada handler.
pub fn build_router(app_state: AppState) -> Router {
    let product_routes = Router::new()
        .route(
            "/",
            post(handlers::inventory::create_product).get(handlers::inventory::list_products),
        )
        .route("/low-stock", get(handlers::inventory::list_low_stock))
        .route("/{id}", get(handlers::inventory::get_product))
        .route("/{id}/movements", get(handlers::inventory::list_movements))
        .route("/{id}/lots", post(handlers::inventory::add_lot))
        .route(
            "/{id}/lots/{lot}",
            put(handlers::inventory::edit_lot).delete(handlers::inventory::delete_lot),
        )
        .route(
            "/{id}/lots/{lot}/withdrawals",
            post(handlers::inventory::withdraw_from_lot),
        );

    let order_routes = Router::new()
        .route("/", post(handlers::operations::create_order))
        .route("/{id}", get(handlers::operations::get_order))
        .route("/{id}/take", post(handlers::operations::take_order))
        .route("/{id}/confirm", post(handlers::operations::confirm_order))
        .route("/{id}/ready", post(handlers::operations::mark_ready))
        .route("/{id}/cancel", post(handlers::operations::cancel_order));

    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .route("/api/health", get(|| async { "OK" }))
        .nest("/api/products", product_routes)
        .nest("/api/orders", order_routes)
        .route("/api/lots/expiring", get(handlers::inventory::list_expiring_lots))
        .with_state(app_state)
}
