// src/services/rbac_service.rs

use std::collections::BTreeSet;

use crate::models::{auth::Role, rbac::Permission};

fn role_permissions(role: Role) -> BTreeSet<Permission> {
    use Permission::*;
    match role {
        Role::Admin => Permission::ALL.into_iter().collect(),
        Role::Vendor => [InventoryRead, OrdersCreate, OrdersCancel].into_iter().collect(),
        Role::Assembler => [InventoryRead, OrdersAssemble].into_iter().collect(),
    }
}

/// Permissões efetivas para o papel e o contexto ativo.
///
/// Só o admin troca de contexto: atuando como vendedor ou separador ele fica
/// com as permissões daquele papel (mais leitura de estoque).
pub fn permissions_for(role: Role, active_context: Option<Role>) -> BTreeSet<Permission> {
    match (role, active_context) {
        (Role::Admin, Some(context)) if context != Role::Admin => {
            let mut permissions = role_permissions(context);
            permissions.insert(Permission::InventoryRead);
            permissions
        }
        (role, Some(context)) if role != Role::Admin && context != role => {
            tracing::warn!("⚠️ Contexto {:?} ignorado para o papel {:?}", context, role);
            role_permissions(role)
        }
        (role, _) => role_permissions(role),
    }
}

pub fn has_permission(role: Role, active_context: Option<Role>, permission: Permission) -> bool {
    permissions_for(role, active_context).contains(&permission)
}
