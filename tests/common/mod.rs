// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use axum::{
    body::Body,
    http::{header, Method, Request, StatusCode},
    Router,
};
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use uuid::Uuid;

use lotes_backend::{
    config::{AppState, Config},
    db::InMemoryStore,
    models::auth::Role,
    routes::build_router,
};

pub struct TestApp {
    pub state: AppState,
    pub router: Router,
}

pub fn test_config() -> Config {
    Config {
        jwt_secret: "segredo-de-teste".into(),
        database_url: None,
        bind_addr: "127.0.0.1:0".into(),
        db_max_connections: 1,
        conflict_retries: 3,
    }
}

pub fn spawn_app() -> TestApp {
    let state = AppState::with_store(Arc::new(InMemoryStore::new()), &test_config());
    let router = build_router(state.clone());
    TestApp { state, router }
}

impl TestApp {
    pub fn token(&self, role: Role, context: Option<Role>) -> (Uuid, String) {
        let id = Uuid::new_v4();
        let token = self.state.auth_service.issue_token(id, role, context).unwrap();
        (id, token)
    }

    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(header::ACCEPT_LANGUAGE, "pt-BR");
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, json)
    }
}
