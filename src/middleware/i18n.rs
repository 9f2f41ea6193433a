// src/middleware/i18n.rs

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts};

const SUPPORTED: &[&str] = &["pt", "en", "es"];
const DEFAULT_LANG: &str = "pt";

// Idioma das mensagens de erro, vindo do Accept-Language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Locale(pub String);

impl Default for Locale {
    fn default() -> Self {
        Locale(DEFAULT_LANG.to_string())
    }
}

impl Locale {
    /// Primeiro idioma suportado do cabeçalho, respeitando os pesos ("q").
    pub fn from_header(value: &str) -> Self {
        accept_language::parse(value)
            .iter()
            // "pt-BR" -> "pt"
            .filter_map(|tag| tag.split('-').next())
            .map(|lang| lang.to_ascii_lowercase())
            .find(|lang| SUPPORTED.contains(&lang.as_str()))
            .map(Locale)
            .unwrap_or_default()
    }
}

impl<S> FromRequestParts<S> for Locale
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let locale = parts
            .headers
            .get(header::ACCEPT_LANGUAGE)
            .and_then(|value| value.to_str().ok())
            .map(Locale::from_header)
            .unwrap_or_default();

        Ok(locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn picks_first_supported_language() {
        assert_eq!(Locale::from_header("pt-BR,pt;q=0.9").0, "pt");
        assert_eq!(Locale::from_header("de-DE, es;q=0.8, en;q=0.5").0, "es");
        assert_eq!(Locale::from_header("EN-us").0, "en");
    }

    #[test]
    fn unsupported_or_empty_header_falls_back_to_portuguese() {
        assert_eq!(Locale::from_header("fr-FR").0, "pt");
        assert_eq!(Locale::from_header("").0, "pt");
    }
}
