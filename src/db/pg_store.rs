// src/db/pg_store.rs

// Store em Postgres: cada produto/pedido é um documento JSONB com uma coluna
// `version` para o controle otimista.

use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use sqlx::{postgres::PgPoolOptions, types::Json, PgPool};
use uuid::Uuid;

use crate::{
    common::error::AppError,
    db::store::DocumentStore,
    models::{
        inventory::{Product, StockMovement},
        operations::Order,
    },
};

#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub async fn connect(database_url: &str, max_connections: u32) -> anyhow::Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(3))
            .connect(database_url)
            .await?;
        tracing::info!("✅ Conexão com o banco de dados estabelecida com sucesso!");

        sqlx::migrate!().run(&pool).await?;
        tracing::info!("✅ Migrações do banco de dados executadas com sucesso!");

        Ok(Self { pool })
    }

    // Distingue "alguém gravou antes" de "documento não existe".
    async fn conflict_or_missing(
        &self,
        table: &'static str,
        entity: &'static str,
        id: Uuid,
    ) -> AppError {
        let query = format!("SELECT EXISTS (SELECT 1 FROM {table} WHERE id = $1)");
        match sqlx::query_scalar::<_, bool>(&query).bind(id).fetch_one(&self.pool).await {
            Ok(true) => AppError::PersistenceConflict { entity, id: id.to_string() },
            Ok(false) => AppError::not_found(entity, id),
            Err(e) => e.into(),
        }
    }
}

#[async_trait]
impl DocumentStore for PgStore {
    async fn insert_product(&self, product: &Product) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO products (id, sku, version, doc, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(product.id)
        .bind(&product.sku)
        .bind(product.version)
        .bind(Json(product))
        .bind(product.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return AppError::InvalidRequest(format!("SKU '{}' já cadastrado", product.sku));
                }
            }
            e.into()
        })?;
        Ok(())
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, AppError> {
        let row = sqlx::query_as::<_, (Json<Product>,)>("SELECT doc FROM products WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(product),)| product))
    }

    async fn list_products(&self) -> Result<Vec<Product>, AppError> {
        let rows = sqlx::query_as::<_, (Json<Product>,)>(
            "SELECT doc FROM products ORDER BY doc->>'name' ASC, sku ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(Json(product),)| product).collect())
    }

    async fn save_product(&self, product: &Product) -> Result<Product, AppError> {
        let mut saved = product.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE products
            SET doc = $1, version = $2, updated_at = $3
            WHERE id = $4 AND version = $5
            "#,
        )
        .bind(Json(&saved))
        .bind(saved.version)
        .bind(saved.updated_at)
        .bind(saved.id)
        .bind(product.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.conflict_or_missing("products", "Produto", product.id).await);
        }
        Ok(saved)
    }

    async fn insert_order(&self, order: &Order) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO orders (id, number, version, doc, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(order.id)
        .bind(&order.number)
        .bind(order.version)
        .bind(Json(order))
        .bind(order.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_order(&self, id: Uuid) -> Result<Option<Order>, AppError> {
        let row = sqlx::query_as::<_, (Json<Order>,)>("SELECT doc FROM orders WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(Json(order),)| order))
    }

    async fn save_order(&self, order: &Order) -> Result<Order, AppError> {
        let mut saved = order.clone();
        saved.version += 1;
        saved.updated_at = Utc::now();

        let result = sqlx::query(
            r#"
            UPDATE orders
            SET doc = $1, version = $2, updated_at = $3
            WHERE id = $4 AND version = $5
            "#,
        )
        .bind(Json(&saved))
        .bind(saved.version)
        .bind(saved.updated_at)
        .bind(saved.id)
        .bind(order.version)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(self.conflict_or_missing("orders", "Pedido", order.id).await);
        }
        Ok(saved)
    }

    async fn next_order_sequence(&self) -> Result<i64, AppError> {
        let next = sqlx::query_scalar::<_, i64>("SELECT nextval('order_number_seq')")
            .fetch_one(&self.pool)
            .await?;
        Ok(next)
    }

    async fn append_movement(&self, movement: &StockMovement) -> Result<(), AppError> {
        sqlx::query(
            r#"
            INSERT INTO stock_movements (id, product_id, order_id, created_at, doc)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(movement.id)
        .bind(movement.product_id)
        .bind(movement.order_id)
        .bind(movement.created_at)
        .bind(Json(movement))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn list_movements(&self, product_id: Uuid) -> Result<Vec<StockMovement>, AppError> {
        let rows = sqlx::query_as::<_, (Json<StockMovement>,)>(
            "SELECT doc FROM stock_movements WHERE product_id = $1 ORDER BY created_at ASC",
        )
        .bind(product_id)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(|(Json(movement),)| movement).collect())
    }
}
