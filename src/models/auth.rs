// src/models/auth.rs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Vendor,
    Assembler,
}

// Estrutura de dados ("claims") dentro do JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,             // ID do usuário
    pub role: Role,            // Papel fixo do usuário
    pub ctx: Option<Role>,     // Contexto ativo (admin atuando como vendedor/separador)
    pub exp: usize,
    pub iat: usize,
}

/// Quem está executando a ação. Vem do token, já validado.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Actor {
    pub id: Uuid,
    pub role: Role,
    pub active_context: Option<Role>,
}

impl From<Claims> for Actor {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            role: claims.role,
            active_context: claims.ctx,
        }
    }
}
