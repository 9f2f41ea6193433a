// src/handlers/inventory.rs

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{
        i18n::Locale,
        rbac::{PermInventoryRead, PermInventoryWrite, RequirePermission},
    },
    models::inventory::{ExpiringLot, LotEdit, NewLot, NewProduct, Product, StockMovement},
};

// ---
// Validação Customizada
// ---
fn validate_sku(sku: &str) -> Result<(), ValidationError> {
    if sku.trim().is_empty() || !sku.trim().chars().all(|c| c.is_ascii_alphanumeric()) {
        let mut err = ValidationError::new("sku");
        err.message = Some("O SKU deve conter apenas letras e números.".into());
        return Err(err);
    }
    Ok(())
}

fn validation_error(field: &'static str, code: &'static str, message: &'static str) -> AppError {
    let mut err = ValidationError::new(code);
    err.message = Some(message.into());
    let mut errors = validator::ValidationErrors::new();
    errors.add(field, err);
    AppError::ValidationError(errors)
}

// ---
// Payloads
// ---

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductPayload {
    #[validate(custom(function = "validate_sku"))]
    #[schema(example = "OL")]
    pub sku: String,

    #[validate(length(min = 1, message = "O nome é obrigatório."))]
    #[schema(example = "Azeitona")]
    pub name: String,

    #[schema(example = "Verde")]
    pub variant: Option<String>,

    #[validate(length(min = 1, message = "A apresentação é obrigatória."))]
    #[schema(example = "500g")]
    pub presentation: String,

    #[validate(range(min = 1, max = 100000, message = "Unidades por caixa deve estar entre 1 e 100000."))]
    #[schema(example = 10)]
    pub units_per_box: i64,

    #[validate(range(min = 0, message = "O estoque mínimo não pode ser negativo."))]
    #[serde(default)]
    #[schema(example = 20)]
    pub stock_minimum: i64,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct AddLotPayload {
    #[validate(range(min = 0, max = 1000000, message = "A quantidade de caixas deve estar entre 0 e 1000000."))]
    #[serde(default)]
    #[schema(example = 5)]
    pub boxes: i64,

    #[validate(range(min = 0, max = 1000000, message = "A quantidade de unidades deve estar entre 0 e 1000000."))]
    #[serde(default)]
    #[schema(example = 0)]
    pub loose_units: i64,

    #[schema(example = "2026-03-01")]
    pub production_date: NaiveDate,

    #[schema(example = "2026-09-01")]
    pub expiry_date: Option<NaiveDate>,

    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct EditLotPayload {
    #[validate(range(min = 0, max = 1000000, message = "A quantidade de caixas deve estar entre 0 e 1000000."))]
    pub boxes: i64,

    #[validate(range(min = 0, max = 1000000, message = "A quantidade de unidades deve estar entre 0 e 1000000."))]
    pub loose_units: i64,

    pub production_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,

    /// Remove a validade do lote.
    #[serde(default)]
    pub clear_expiry: bool,

    #[validate(length(min = 1, message = "Informe o motivo do ajuste."))]
    #[schema(example = "Recontagem")]
    pub reason: String,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct WithdrawPayload {
    #[validate(range(min = 0, max = 1000000, message = "A quantidade de caixas deve estar entre 0 e 1000000."))]
    #[serde(default)]
    pub boxes: i64,

    #[validate(range(min = 0, max = 1000000, message = "A quantidade de unidades deve estar entre 0 e 1000000."))]
    #[serde(default)]
    #[schema(example = 4)]
    pub loose_units: i64,

    #[validate(length(min = 1, message = "Informe o motivo da retirada."))]
    #[schema(example = "Avaria")]
    pub reason: String,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct DeleteLotQuery {
    /// Motivo registrado na movimentação
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ExpiringQuery {
    /// Janela em dias a partir de hoje (padrão 30)
    pub days: Option<i64>,
}

// ---
// PRODUTOS
// ---

#[utoipa::path(
    post,
    path = "/api/products",
    tag = "Inventory",
    request_body = CreateProductPayload,
    responses(
        (status = 201, description = "Produto cadastrado", body = Product),
        (status = 400, description = "Dados inválidos")
    ),
    security(("api_jwt" = []))
)]
pub async fn create_product(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryWrite>,
    Json(payload): Json<CreateProductPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .inventory_service
        .create_product(NewProduct {
            sku: payload.sku,
            name: payload.name,
            variant: payload.variant,
            presentation: payload.presentation,
            units_per_box: payload.units_per_box,
            stock_minimum: payload.stock_minimum,
        })
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/products",
    tag = "Inventory",
    responses(
        (status = 200, description = "Produtos com lotes e saldo", body = Vec<Product>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_products(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .inventory_service
        .list_products()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/low-stock",
    tag = "Inventory",
    responses(
        (status = 200, description = "Produtos abaixo do estoque mínimo", body = Vec<Product>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_low_stock(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
) -> Result<impl IntoResponse, ApiError> {
    let products = app_state
        .inventory_service
        .list_low_stock()
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(products)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Produto", body = Product),
        (status = 404, description = "Produto não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn get_product(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = app_state
        .inventory_service
        .get_product(product_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/products/{id}/movements",
    tag = "Inventory",
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 200, description = "Movimentações do produto, mais antigas primeiro", body = Vec<StockMovement>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_movements(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let movements = app_state
        .inventory_service
        .list_movements(product_id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(movements)))
}

// ---
// LOTES
// ---

#[utoipa::path(
    post,
    path = "/api/products/{id}/lots",
    tag = "Inventory",
    request_body = AddLotPayload,
    params(("id" = Uuid, Path, description = "ID do produto")),
    responses(
        (status = 201, description = "Lote criado; devolve o produto atualizado", body = Product),
        (status = 400, description = "Lote inválido")
    ),
    security(("api_jwt" = []))
)]
pub async fn add_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermInventoryWrite>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<AddLotPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    if payload.boxes == 0 && payload.loose_units == 0 {
        return Err(validation_error("boxes", "range", "O lote precisa de ao menos uma unidade.")
            .to_api_error(&locale, &app_state.i18n_store));
    }

    let product = app_state
        .inventory_service
        .add_lot(
            product_id,
            guard.actor().id,
            NewLot {
                boxes: payload.boxes,
                loose_units: payload.loose_units,
                production_date: payload.production_date,
                expiry_date: payload.expiry_date,
                reason: payload.reason,
            },
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::CREATED, Json(product)))
}

#[utoipa::path(
    put,
    path = "/api/products/{id}/lots/{lot}",
    tag = "Inventory",
    request_body = EditLotPayload,
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("lot" = String, Path, description = "Número do lote")
    ),
    responses(
        (status = 200, description = "Lote ajustado", body = Product),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn edit_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermInventoryWrite>,
    Path((product_id, lot_number)): Path<(Uuid, String)>,
    Json(payload): Json<EditLotPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .inventory_service
        .edit_lot(
            product_id,
            &lot_number,
            LotEdit {
                boxes: payload.boxes,
                loose_units: payload.loose_units,
                production_date: payload.production_date,
                expiry_date: payload.expiry_date,
                clear_expiry: payload.clear_expiry,
                reason: payload.reason,
            },
            guard.actor().id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(product)))
}

#[utoipa::path(
    delete,
    path = "/api/products/{id}/lots/{lot}",
    tag = "Inventory",
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("lot" = String, Path, description = "Número do lote"),
        DeleteLotQuery
    ),
    responses(
        (status = 200, description = "Lote removido", body = Product),
        (status = 404, description = "Lote não encontrado")
    ),
    security(("api_jwt" = []))
)]
pub async fn delete_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermInventoryWrite>,
    Path((product_id, lot_number)): Path<(Uuid, String)>,
    Query(query): Query<DeleteLotQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let reason = query.reason.unwrap_or_else(|| "Exclusão manual de lote".to_string());

    let product = app_state
        .inventory_service
        .delete_lot(product_id, &lot_number, &reason, guard.actor().id)
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(product)))
}

#[utoipa::path(
    post,
    path = "/api/products/{id}/lots/{lot}/withdrawals",
    tag = "Inventory",
    request_body = WithdrawPayload,
    params(
        ("id" = Uuid, Path, description = "ID do produto"),
        ("lot" = String, Path, description = "Número do lote")
    ),
    responses(
        (status = 200, description = "Retirada registrada", body = Product),
        (status = 409, description = "O lote não tem saldo suficiente")
    ),
    security(("api_jwt" = []))
)]
pub async fn withdraw_from_lot(
    State(app_state): State<AppState>,
    locale: Locale,
    guard: RequirePermission<PermInventoryWrite>,
    Path((product_id, lot_number)): Path<(Uuid, String)>,
    Json(payload): Json<WithdrawPayload>,
) -> Result<impl IntoResponse, ApiError> {
    payload
        .validate()
        .map_err(|e| AppError::ValidationError(e).to_api_error(&locale, &app_state.i18n_store))?;

    let product = app_state
        .inventory_service
        .remove_stock_from_lot(
            product_id,
            &lot_number,
            payload.boxes,
            payload.loose_units,
            &payload.reason,
            guard.actor().id,
        )
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(product)))
}

#[utoipa::path(
    get,
    path = "/api/lots/expiring",
    tag = "Inventory",
    params(ExpiringQuery),
    responses(
        (status = 200, description = "Lotes que vencem dentro da janela", body = Vec<ExpiringLot>)
    ),
    security(("api_jwt" = []))
)]
pub async fn list_expiring_lots(
    State(app_state): State<AppState>,
    locale: Locale,
    _guard: RequirePermission<PermInventoryRead>,
    Query(query): Query<ExpiringQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let today = Utc::now().date_naive();

    let lots = app_state
        .inventory_service
        .expiring_lots(today, query.days.unwrap_or(30))
        .await
        .map_err(|app_err| app_err.to_api_error(&locale, &app_state.i18n_store))?;

    Ok((StatusCode::OK, Json(lots)))
}
