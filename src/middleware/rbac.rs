// src/middleware/rbac.rs

use axum::{
    extract::{FromRef, FromRequestParts},
    http::request::Parts,
};
use std::marker::PhantomData;

use crate::{
    common::error::{ApiError, AppError},
    config::AppState,
    middleware::{auth::AuthenticatedUser, i18n::Locale},
    models::{auth::Actor, rbac::Permission},
    services::rbac_service::has_permission,
};

/// 1. O Trait que define o que é uma Permissão
pub trait PermissionDef: Send + Sync + 'static {
    const PERMISSION: Permission;
}

/// 2. O Extractor (Guardião). Também entrega o ator autenticado.
pub struct RequirePermission<T>(pub AuthenticatedUser, pub PhantomData<T>);

impl<T> RequirePermission<T> {
    pub fn actor(&self) -> Actor {
        self.0 .0
    }
}

// 3. Implementação do FromRequestParts
impl<T, S> FromRequestParts<S> for RequirePermission<T>
where
    T: PermissionDef,
    S: Send + Sync,
    AppState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let app_state = AppState::from_ref(state);
        let locale = Locale::from_request_parts(parts, state)
            .await
            .unwrap_or_default();

        // A. Extrai o ator do token
        let user = AuthenticatedUser::from_request_parts(parts, state)
            .await
            .map_err(|e| e.to_api_error(&locale, &app_state.i18n_store))?;

        // B. Papel + contexto ativo -> permissões
        let actor = user.0;
        if !has_permission(actor.role, actor.active_context, T::PERMISSION) {
            tracing::debug!(
                "Ator {} ({:?}) sem a permissão {}",
                actor.id,
                actor.role,
                T::PERMISSION
            );
            return Err(AppError::Forbidden(T::PERMISSION.slug().to_string())
                .to_api_error(&locale, &app_state.i18n_store));
        }

        Ok(RequirePermission(user, PhantomData))
    }
}

// ---
// DEFINIÇÃO DAS PERMISSÕES (TIPOS)
// ---

pub struct PermInventoryRead;
impl PermissionDef for PermInventoryRead {
    const PERMISSION: Permission = Permission::InventoryRead;
}

pub struct PermInventoryWrite;
impl PermissionDef for PermInventoryWrite {
    const PERMISSION: Permission = Permission::InventoryWrite;
}

pub struct PermOrdersCreate;
impl PermissionDef for PermOrdersCreate {
    const PERMISSION: Permission = Permission::OrdersCreate;
}

pub struct PermOrdersAssemble;
impl PermissionDef for PermOrdersAssemble {
    const PERMISSION: Permission = Permission::OrdersAssemble;
}

pub struct PermOrdersCancel;
impl PermissionDef for PermOrdersCancel {
    const PERMISSION: Permission = Permission::OrdersCancel;
}
