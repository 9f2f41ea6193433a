// src/docs.rs

use utoipa::OpenApi;
use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use crate::handlers;
use crate::models;

#[derive(OpenApi)]
#[openapi(
    paths(
        // --- INVENTORY ---
        handlers::inventory::create_product,
        handlers::inventory::list_products,
        handlers::inventory::list_low_stock,
        handlers::inventory::get_product,
        handlers::inventory::list_movements,
        handlers::inventory::add_lot,
        handlers::inventory::edit_lot,
        handlers::inventory::delete_lot,
        handlers::inventory::withdraw_from_lot,
        handlers::inventory::list_expiring_lots,

        // --- OPERATIONS ---
        handlers::operations::create_order,
        handlers::operations::get_order,
        handlers::operations::take_order,
        handlers::operations::confirm_order,
        handlers::operations::mark_ready,
        handlers::operations::cancel_order,
    ),
    components(
        schemas(
            // --- Inventory ---
            models::inventory::StockInfo,
            models::inventory::Lot,
            models::inventory::Product,
            models::inventory::StockMovementType,
            models::inventory::StockMovement,
            models::inventory::ExpiringLot,

            // --- Operations ---
            models::operations::OrderState,
            models::operations::LotAssignment,
            models::operations::OrderLine,
            models::operations::Order,

            // --- RBAC ---
            models::auth::Role,
            models::rbac::Permission,

            // --- Payloads ---
            handlers::inventory::CreateProductPayload,
            handlers::inventory::AddLotPayload,
            handlers::inventory::EditLotPayload,
            handlers::inventory::WithdrawPayload,
            handlers::operations::OrderLinePayload,
            handlers::operations::CreateOrderPayload,
            handlers::operations::CancelOrderPayload,
        )
    ),
    tags(
        (name = "Inventory", description = "Produtos, lotes e movimentações de estoque"),
        (name = "Operations", description = "Pedidos: separação, aprovação com baixa FIFO e cancelamento"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "api_jwt",
            SecurityScheme::Http(
                Http::new(HttpAuthScheme::Bearer)
            ),
        );
    }
}
