// src/db/memory_store.rs

use std::{
    collections::HashMap,
    sync::atomic::{AtomicI64, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::DocumentStore,
    models::{
        inventory::{Product, StockMovement},
        operations::Order,
    },
};

// Store em memória. Usado quando não há DATABASE_URL e em todos os testes.
#[derive(Default)]
pub struct InMemoryStore {
    products: RwLock<HashMap<Uuid, Product>>,
    orders: RwLock<HashMap<Uuid, Order>>,
    movements: RwLock<Vec<StockMovement>>,
    order_sequence: AtomicI64,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn insert_product(&self, product: &Product) -> Result<(), AppError> {
        let mut products = self.products.write().await;
        if products.values().any(|p| p.sku.eq_ignore_ascii_case(&product.sku)) {
            return Err(AppError::InvalidRequest(format!("SKU '{}' já cadastrado", product.sku)));
        }
        products.insert(product.id, product.clone());
        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        Ok(self.products.read().await.get(&id).cloned())
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let mut products: Vec<Product> = self.products.read().await.values().cloned().collect();
        products.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.sku.cmp(&b.sku)));
        Ok(products)
    }

    async fn save_product(&self, product: &Product) -> Result<Product, AppError> {
        let mut products = self.products.write().await;
        let current = products
            .get(&product.id)
            .ok_or_else(|| AppError::not_found("Produto", product.id))?;

        if current.version != product.version {
            return Err(AppError::PersistenceConflict {
                entity: "Produto",
                id: product.id.to_string(),
            });
        }

        let mut saved = product.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();
        products.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), AppError> {
        self.orders.write().await.insert(order.id, order.clone());
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        Ok(self.orders.read().await.get(&id).cloned())
    }

    async fn save_order(&self, order: &Order) -> Result<Order, AppError> {
        let mut orders = self.orders.write().await;
        let current = orders
            .get(&order.id)
            .ok_or_else(|| AppError::not_found("Pedido", order.id))?;

        if current.version != order.version {
            return Err(AppError::PersistenceConflict {
                entity: "Pedido",
                id: order.id.to_string(),
            });
        }

        let mut saved = order.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();
        orders.insert(saved.id, saved.clone());
        Ok(saved)
    }

    async fn next_order_sequence(&self) -> Result<i64, AppError> {
        Ok(self.order_sequence.fetch_add(1, Ordering::SeqCst) + 1)
    }

    async fn append_movement(&self, movement: &StockMovement) -> Result<(), AppError> {
        self.movements.write().await.push(movement.clone());
        Ok(())
    }

    async fn list_movements(&self, product_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        Ok(self
            .movements
            .read()
            .await
            .iter()
            .filter(|m| m.product_id == product_id)
            .cloned()
            .collect())
    }
}
