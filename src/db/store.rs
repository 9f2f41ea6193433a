// src/db/store.rs

use async_trait::async_trait;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    models::{
        inventory::{Product, StockMovement},
        operations::Order,
    },
};

/// Armazenamento de documentos com escrita atômica por documento.
///
/// `save_*` só grava se a `version` do documento ainda for a do banco;
/// caso contrário devolve `AppError::PersistenceConflict`. A versão gravada
/// volta incrementada no documento retornado.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn insert_product(&self, product: &Product) -> Result<(), AppError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, AppError>;
    async fn list_products(&self) -> Result<Vec<Product>, AppError>;
    async fn save_product(&self, product: &Product) -> Result<Product, AppError>;

    async fn insert_order(&self, order: &Order) -> Result<(), AppError>;
    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError>;
    async fn save_order(&self, order: &Order) -> Result<Order, AppError>;
    async fn next_order_sequence(&self) -> Result<i64, AppError>;

    async fn append_movement(&self, movement: &StockMovement) -> Result<(), AppError>;
    async fn list_movements(&self, product_id: Uuid) -> Result<Vec<StockMovement>, AppError>;
}
