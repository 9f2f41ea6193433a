// src/common/error.rs

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use serde_json::{json, Value};
use thiserror::Error;

use crate::{
    common::i18n::I18nStore,
    middleware::i18n::Locale,
    models::operations::{OrderAction, OrderState},
    services::fifo::AllocationError,
};

// Erro de domínio. Tudo que um serviço pode devolver passa por aqui.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Requisição inválida: {0}")]
    InvalidRequest(String),

    #[error("Erro de validação")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("{entity} não encontrado: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("O produto '{product}' não possui lotes em estoque")]
    NoStockAvailable { product: String },

    #[error("Estoque insuficiente para '{product}': necessário {required}, disponível {available}")]
    InsufficientStock {
        product: String,
        required: i64,
        available: i64,
    },

    #[error("O pedido {order} está '{state}' e não aceita a ação '{action}'")]
    StateTransition {
        order: String,
        state: OrderState,
        action: OrderAction,
    },

    #[error("Apenas o separador que assumiu o pedido pode confirmá-lo")]
    NotOrderAssembler,

    #[error("Permissão '{0}' necessária")]
    Forbidden(String),

    #[error("Conflito de concorrência em {entity} {id}")]
    PersistenceConflict { entity: &'static str, id: String },

    #[error("O lote {lot} ficaria com saldo negativo")]
    InconsistentLot { lot: String },

    #[error("Pedido {order} cancelado, mas o estoque não voltou para: {}", .products.join(", "))]
    RestockIncomplete { order: String, products: Vec<String> },

    #[error("Token inválido")]
    InvalidToken,

    #[error("Erro de banco de dados")]
    DatabaseError(#[from] sqlx::Error),

    #[error("Erro de serialização: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Erro interno do servidor")]
    InternalServerError(#[from] anyhow::Error),
}

impl AppError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        AppError::NotFound { entity, id: id.to_string() }
    }

    /// Anexa o nome do produto a uma falha do alocador FIFO.
    pub fn from_allocation(product: &str, err: AllocationError) -> Self {
        match err {
            AllocationError::InvalidRequest(msg) => AppError::InvalidRequest(msg),
            AllocationError::NoStockAvailable => AppError::NoStockAvailable {
                product: product.to_string(),
            },
            AllocationError::InsufficientStock { required, available } => {
                AppError::InsufficientStock {
                    product: product.to_string(),
                    required,
                    available,
                }
            }
            AllocationError::InconsistentLot { lot } => AppError::InconsistentLot { lot },
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InvalidRequest(_) | AppError::ValidationError(_) => StatusCode::BAD_REQUEST,
            AppError::InvalidToken => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::NotOrderAssembler => StatusCode::FORBIDDEN,
            AppError::NotFound { .. } => StatusCode::NOT_FOUND,
            AppError::NoStockAvailable { .. }
            | AppError::InsufficientStock { .. }
            | AppError::StateTransition { .. }
            | AppError::PersistenceConflict { .. } => StatusCode::CONFLICT,
            AppError::InconsistentLot { .. }
            | AppError::RestockIncomplete { .. }
            | AppError::DatabaseError(_)
            | AppError::Serialization(_)
            | AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn message_key(&self) -> &'static str {
        match self {
            AppError::InvalidRequest(_) => "invalid_request",
            AppError::ValidationError(_) => "validation",
            AppError::NotFound { .. } => "not_found",
            AppError::NoStockAvailable { .. } => "no_stock",
            AppError::InsufficientStock { .. } => "insufficient_stock",
            AppError::StateTransition { .. } => "state_transition",
            AppError::NotOrderAssembler => "not_assembler",
            AppError::Forbidden(_) => "forbidden",
            AppError::PersistenceConflict { .. } => "conflict",
            AppError::InvalidToken => "invalid_token",
            AppError::RestockIncomplete { .. } => "restock_incomplete",
            _ => "internal",
        }
    }

    fn message_params(&self) -> Vec<(&'static str, String)> {
        match self {
            AppError::InvalidRequest(detail) => vec![("detail", detail.clone())],
            AppError::NotFound { entity, id } => {
                vec![("entity", entity.to_string()), ("id", id.clone())]
            }
            AppError::NoStockAvailable { product } => vec![("product", product.clone())],
            AppError::InsufficientStock { product, required, available } => vec![
                ("product", product.clone()),
                ("required", required.to_string()),
                ("available", available.to_string()),
            ],
            AppError::StateTransition { order, state, action } => vec![
                ("order", order.clone()),
                ("state", state.to_string()),
                ("action", action.to_string()),
            ],
            AppError::Forbidden(permission) => vec![("permission", permission.clone())],
            AppError::PersistenceConflict { entity, id } => {
                vec![("entity", entity.to_string()), ("id", id.clone())]
            }
            AppError::RestockIncomplete { order, products } => {
                vec![("order", order.clone()), ("products", products.join(", "))]
            }
            _ => Vec::new(),
        }
    }

    fn details(&self) -> Option<Value> {
        match self {
            AppError::ValidationError(errors) => {
                let mut details = serde_json::Map::new();
                for (field, field_errors) in errors.field_errors() {
                    let messages: Vec<String> = field_errors
                        .iter()
                        .map(|e| {
                            e.message
                                .as_ref()
                                .map(|m| m.to_string())
                                .unwrap_or_else(|| e.code.to_string())
                        })
                        .collect();
                    details.insert(field.to_string(), json!(messages));
                }
                Some(Value::Object(details))
            }
            AppError::InsufficientStock { product, required, available } => Some(json!({
                "product": product,
                "required": required,
                "available": available,
            })),
            AppError::StateTransition { state, action, .. } => Some(json!({
                "state": state,
                "action": action,
            })),
            AppError::RestockIncomplete { order, products } => Some(json!({
                "order": order,
                "cancelled": true,
                "productsNotRestocked": products,
            })),
            _ => None,
        }
    }

    /// Converte o erro na resposta HTTP, traduzida para o idioma do cliente.
    pub fn to_api_error(&self, locale: &Locale, store: &I18nStore) -> ApiError {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }

        let error = store
            .translate(&locale.0, self.message_key(), &self.message_params())
            .unwrap_or_else(|| self.to_string());

        ApiError {
            status,
            error,
            details: self.details(),
        }
    }
}

// Formato de erro que vai para o cliente.
#[derive(Debug, Serialize)]
pub struct ApiError {
    #[serde(skip)]
    pub status: StatusCode,
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status;
        (status, Json(self)).into_response()
    }
}

// Usado pelos extratores, que não têm acesso ao idioma.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Erro Interno do Servidor: {:?}", self);
        }
        ApiError {
            status,
            error: self.to_string(),
            details: self.details(),
        }
        .into_response()
    }
}
