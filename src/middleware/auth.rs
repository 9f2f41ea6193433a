// src/middleware/auth.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::{header, request::Parts},
};

use crate::{common::error::AppError, config::AppState, models::auth::Actor};

// Extrator para obter o ator autenticado diretamente nos handlers.
// Lê o "Authorization: Bearer <jwt>" e valida com o AuthService do estado.
pub struct AuthenticatedUser(pub Actor);

impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        // Outro extrator da mesma requisição já validou o token
        if let Some(actor) = parts.extensions.get::<Actor>() {
            return Ok(AuthenticatedUser(*actor));
        }

        let app_state = AppState::from_ref(state);

        let token = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(AppError::InvalidToken)?;

        let actor = app_state.auth_service.validate_token(token.trim())?;
        parts.extensions.insert(actor);

        Ok(AuthenticatedUser(actor))
    }
}
