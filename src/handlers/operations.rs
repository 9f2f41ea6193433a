// src/handlers/operations.rs

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermInventoryRead, PermOrdersAssemble, PermOrdersCancel, PermOrdersCreate, RequirePermission},
    },
    models::operations::{NewOrderLine, Order},
};

// =============================================================================
//  1. CRIAÇÃO
// =============================================================================

#[derive(Debug, Deserialize, Serialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct OrderLinePayload {
    pub product_id: Uuid,

    #[validate(range(min = 0, max = 1000000, message = "A quantidade de caixas deve estar entre 0 e 1000000."))]
    #[serde(default)]
    #[schema(example = 2)]
    pub boxes: i64,

    #[validate(range(min = 0, max = 1000000, message = "A quantidade de unidades deve estar entre 0 e 1000000."))]
    #[serde(default)]
    #[schema(example = 5)]
    pub loose_units: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderPayload {
    pub customer_id: Uuid,

    #[validate(length(min = 1, message = "O pedido precisa de ao menos uma linha."), nested)]
    pub lines: Vec<OrderLinePayload>,

    pub notes: Option<String>,
}

// POST /api/orders
#[utoipa::path(
    post,
    path = "/api/orders",
    tag = "Operations",
    request_body = CreateOrderPayload,
    responses(
        (status = 201, description = "Pedido criado (pendente)", body = Order),
        (status = 400, description = "Linhas inválidas")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_order(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermOrdersCreate>,
    Json(payload): Json<CreateOrderPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let lines = payload
        .lines
        .into_iter()
        .map(|line| NewOrderLine {
            product_id: line.product_id,
            boxes: line.boxes,
            loose_units: line.loose_units,
        })
        .collect();

    let order = app_state
        .operations_service
        .create_order(&guard.actor(), payload.customer_id, lines, payload.notes)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(order)))
}

// GET /api/orders/{id}
#[utoipa::path(
    get,
    path = "/api/orders/{id}",
    tag = "Operations",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido com os lotes atribuídos", body = Order),
        (status = 404, description = "Pedido não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_order(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .operations_service
        .get_order(order_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// =============================================================================
//  2. TRANSIÇÕES
// =============================================================================

// POST /api/orders/{id}/take
#[utoipa::path(
    post,
    path = "/api/orders/{id}/take",
    tag = "Operations",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido em preparação", body = Order),
        (status = 409, description = "O pedido não está pendente")
    ),
    security(("api_jwt" = []))
)]
pub async fn take_order(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermOrdersAssemble>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .operations_service
        .take_order(order_id, &guard.actor())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// POST /api/orders/{id}/confirm
#[utoipa::path(
    post,
    path = "/api/orders/{id}/confirm",
    tag = "Operations",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido aprovado e estoque baixado (FIFO)", body = Order),
        (status = 403, description = "Quem confirma não é o separador do pedido"),
        (status = 409, description = "Estoque insuficiente ou estado inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn confirm_order(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermOrdersAssemble>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .operations_service
        .confirm_order(order_id, &guard.actor())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

// POST /api/orders/{id}/ready
#[utoipa::path(
    post,
    path = "/api/orders/{id}/ready",
    tag = "Operations",
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido pronto", body = Order),
        (status = 409, description = "O pedido não está aprovado")
    ),
    security(("api_jwt" = []))
)]
pub async fn mark_ready(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermOrdersAssemble>,
    Path(order_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let order = app_state
        .operations_service
        .mark_ready(order_id, &guard.actor())
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}

#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CancelOrderPayload {
    #[validate(length(max = 500, message = "Motivo muito longo."))]
    #[schema(example = "Cliente desistiu")]
    pub reason: Option<String>,
}

// POST /api/orders/{id}/cancel
#[utoipa::path(
    post,
    path = "/api/orders/{id}/cancel",
    tag = "Operations",
    request_body = CancelOrderPayload,
    params(("id" = Uuid, Path, description = "ID do pedido")),
    responses(
        (status = 200, description = "Pedido cancelado; se estava aprovado, o estoque volta aos lotes", body = Order),
        (status = 409, description = "O pedido já está pronto ou cancelado")
    ),
    security(("api_jwt" = []))
)]
pub async fn cancel_order(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermOrdersCancel>,
    Path(order_id): Path<Uuid>,
    payload: Option<Json<CancelOrderPayload>>,
) -> Result<impl IntoResponse, ApiError> {
    let payload = payload.map(|Json(p)| p).unwrap_or_default();
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let order = app_state
        .operations_service
        .cancel_order(order_id, &guard.actor(), payload.reason)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(order)))
}
