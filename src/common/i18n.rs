// src/common/i18n.rs

use std::collections::HashMap;

const DEFAULT_LANG: &str = "pt";

// Mensagens de erro por idioma. Os marcadores `{nome}` são trocados pelos
// parâmetros do erro.
const PT: &[(&str, &str)] = &[
    ("invalid_request", "Requisição inválida: {detail}"),
    ("validation", "Um ou mais campos são inválidos."),
    ("not_found", "{entity} não encontrado: {id}"),
    ("no_stock", "O produto '{product}' não possui lotes em estoque."),
    (
        "insufficient_stock",
        "Estoque insuficiente para '{product}': necessário {required}, disponível {available}.",
    ),
    ("state_transition", "O pedido {order} está '{state}' e não aceita a ação '{action}'."),
    ("not_assembler", "Apenas o separador que assumiu o pedido pode confirmá-lo."),
    ("forbidden", "Você precisa da permissão '{permission}' para realizar esta ação."),
    ("conflict", "O registro {entity} {id} foi alterado por outra operação. Tente novamente."),
    ("invalid_token", "Token de autenticação inválido ou ausente."),
    (
        "restock_incomplete",
        "O pedido {order} foi cancelado, mas o estoque não foi devolvido para: {products}. Ajuste manual necessário.",
    ),
    ("internal", "Ocorreu um erro inesperado."),
];

const EN: &[(&str, &str)] = &[
    ("invalid_request", "Invalid request: {detail}"),
    ("validation", "One or more fields are invalid."),
    ("not_found", "{entity} not found: {id}"),
    ("no_stock", "Product '{product}' has no lots in stock."),
    (
        "insufficient_stock",
        "Insufficient stock for '{product}': required {required}, available {available}.",
    ),
    ("state_transition", "Order {order} is '{state}' and does not accept '{action}'."),
    ("not_assembler", "Only the assembler who took the order can confirm it."),
    ("forbidden", "You need the '{permission}' permission to perform this action."),
    ("conflict", "{entity} {id} was changed by another operation. Please retry."),
    ("invalid_token", "Invalid or missing authentication token."),
    (
        "restock_incomplete",
        "Order {order} was cancelled, but stock was not returned for: {products}. Manual adjustment required.",
    ),
    ("internal", "An unexpected error occurred."),
];

const ES: &[(&str, &str)] = &[
    ("invalid_request", "Solicitud inválida: {detail}"),
    ("validation", "Uno o más campos son inválidos."),
    ("not_found", "{entity} no encontrado: {id}"),
    ("no_stock", "El producto '{product}' no tiene lotes en stock."),
    (
        "insufficient_stock",
        "Stock insuficiente para '{product}': requerido {required}, disponible {available}.",
    ),
    ("state_transition", "El pedido {order} está '{state}' y no admite '{action}'."),
    ("not_assembler", "Solo el armador que tomó el pedido puede confirmarlo."),
    ("forbidden", "Necesita el permiso '{permission}' para realizar esta acción."),
    ("conflict", "{entity} {id} fue modificado por otra operación. Intente de nuevo."),
    ("invalid_token", "Token de autenticación inválido o ausente."),
    (
        "restock_incomplete",
        "El pedido {order} fue cancelado, pero el stock no fue devuelto para: {products}. Se requiere ajuste manual.",
    ),
    ("internal", "Ocurrió un error inesperado."),
];

#[derive(Debug, Clone)]
pub struct I18nStore {
    messages: HashMap<&'static str, HashMap<&'static str, &'static str>>,
}

impl Default for I18nStore {
    fn default() -> Self {
        let mut messages = HashMap::new();
        for (lang, table) in [("pt", PT), ("en", EN), ("es", ES)] {
            messages.insert(lang, table.iter().copied().collect());
        }
        Self { messages }
    }
}

impl I18nStore {
    /// Busca a mensagem no idioma pedido, caindo para português.
    pub fn translate(&self, lang: &str, key: &str, params: &[(&str, String)]) -> Option<String> {
        let template = self
            .messages
            .get(lang)
            .and_then(|table| table.get(key))
            .or_else(|| self.messages.get(DEFAULT_LANG).and_then(|table| table.get(key)))?;

        let mut message = template.to_string();
        for (name, value) in params {
            message = message.replace(&format!("{{{name}}}"), value);
        }
        Some(message)
    }
}
