// src/config.rs

use std::{env, sync::Arc};

use anyhow::Context;

use crate::{
    common::i18n::I18nStore,
    db::{DocumentStore, InMemoryStore, PgStore},
    services::{auth::AuthService, locks::EntityLocks, InventoryService, OperationsService},
};

// Configuração lida do ambiente (.env opcional)
#[derive(Debug, Clone)]
pub struct Config {
    pub jwt_secret: String,
    pub database_url: Option<String>,
    pub bind_addr: String,
    pub db_max_connections: u32,
    pub conflict_retries: u32,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let jwt_secret = env::var("JWT_SECRET").context("JWT_SECRET deve ser definido")?;
        let database_url = env::var("DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());

        Ok(Self {
            jwt_secret,
            database_url,
            bind_addr,
            db_max_connections: parse_var("DB_MAX_CONNECTIONS", 5)?,
            conflict_retries: parse_var("CONFLICT_RETRIES", 3)?,
        })
    }
}

fn parse_var(name: &str, default: u32) -> anyhow::Result<u32> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse()
            .with_context(|| format!("{name} deve ser um número inteiro positivo")),
        Err(_) => Ok(default),
    }
}

// O estado compartilhado que será acessível em toda a aplicação
#[derive(Clone)]
pub struct AppState {
    pub inventory_service: InventoryService,
    pub operations_service: OperationsService,
    pub auth_service: AuthService,
    pub i18n_store: Arc<I18nStore>,
}

impl AppState {
    pub async fn new(config: &Config) -> anyhow::Result<Self> {
        let store: Arc<dyn DocumentStore> = match &config.database_url {
            Some(url) => {
                Arc::new(PgStore::connect(url, config.db_max_connections).await?)
            }
            None => {
                tracing::warn!("⚠️ DATABASE_URL não definida, usando armazenamento em memória");
                Arc::new(InMemoryStore::new())
            }
        };

        Ok(Self::with_store(store, config))
    }

    // --- Monta o gráfico de dependências ---
    pub fn with_store(store: Arc<dyn DocumentStore>, config: &Config) -> Self {
        let locks = EntityLocks::new();
        let inventory_service =
            InventoryService::new(store.clone(), locks.clone(), config.conflict_retries);
        let operations_service =
            OperationsService::new(store, locks, inventory_service.clone());

        Self {
            inventory_service,
            operations_service,
            auth_service: AuthService::new(config.jwt_secret.clone()),
            i18n_store: Arc::new(I18nStore::default()),
        }
    }
}
