//! Localized message lookup
//!
//! Resolution order for [`MessageCatalog::lookup`]:
//!
//! 1. the requested language's catalog,
//! 2. the default language's catalog,
//! 3. [`UNKNOWN_MESSAGE`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::Result;

/// Returned when a key is missing from both the requested and the default catalog
pub const UNKNOWN_MESSAGE: &str = "Unknown message";

/// Language used when none is configured
pub const DEFAULT_LANGUAGE: &str = "en";

/// Messages keyed by language code, then by message key
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageCatalog {
    /// Fallback language code
    #[serde(default = "default_language")]
    pub default_language: String,
    /// language → (message key → text)
    #[serde(default)]
    pub messages: HashMap<String, HashMap<String, String>>,
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Default for MessageCatalog {
    fn default() -> Self {
        Self::new(DEFAULT_LANGUAGE)
    }
}

impl MessageCatalog {
    /// Empty catalog with the given fallback language
    pub fn new(default_language: impl Into<String>) -> Self {
        Self {
            default_language: default_language.into(),
            messages: HashMap::new(),
        }
    }

    /// Catalog with the stock English and Spanish API messages
    #[must_use]
    pub fn builtin() -> Self {
        let mut catalog = Self::default();
        for (key, en, es) in BUILTIN_MESSAGES {
            catalog.insert("en", *key, *en);
            catalog.insert("es", *key, *es);
        }
        catalog
    }

    /// Parse a catalog from YAML (JSON is valid YAML too)
    ///
    /// ```
    /// use webapp_kit::i18n::MessageCatalog;
    /// let catalog = MessageCatalog::from_yaml_str("
    /// default_language: en
    /// messages:
    ///   en: { greeting: Hello }
    ///   fr: { greeting: Bonjour }
    /// ").unwrap();
    /// assert_eq!(catalog.lookup("greeting", "fr"), "Bonjour");
    /// ```
    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Add or replace one message
    pub fn insert(
        &mut self,
        language: impl Into<String>,
        key: impl Into<String>,
        text: impl Into<String>,
    ) {
        self.messages
            .entry(language.into())
            .or_default()
            .insert(key.into(), text.into());
    }

    /// Resolve `key` for `language`, falling back to the default language, then to [`UNKNOWN_MESSAGE`]
    #[must_use]
    pub fn lookup(&self, key: &str, language: &str) -> &str {
        if let Some(text) = self.find(language, key) {
            return text;
        }
        if let Some(text) = self.find(&self.default_language, key) {
            debug!(key = %key, language = %language, fallback = %self.default_language, "Message fell back to default language");
            return text;
        }
        debug!(key = %key, language = %language, "Unknown message key");
        UNKNOWN_MESSAGE
    }

    /// Languages with at least one message, sorted
    #[must_use]
    pub fn languages(&self) -> Vec<&str> {
        let mut langs: Vec<&str> = self.messages.keys().map(String::as_str).collect();
        langs.sort_unstable();
        langs
    }

    fn find(&self, language: &str, key: &str) -> Option<&str> {
        self.messages
            .get(language)
            .and_then(|m| m.get(key))
            .map(String::as_str)
    }
}

const BUILTIN_MESSAGES: &[(&str, &str, &str)] = &[
    ("success", "Operation completed successfully", "Operación completada con éxito"),
    ("created", "Resource created", "Recurso creado"),
    ("not_found", "Resource not found", "Recurso no encontrado"),
    ("unauthorized", "Authentication required", "Autenticación requerida"),
    ("forbidden", "You do not have permission to perform this action", "No tiene permiso para realizar esta acción"),
    ("invalid_input", "Invalid input", "Entrada no válida"),
    ("invalid_email", "Invalid email address", "Correo electrónico no válido"),
    ("invalid_phone", "Invalid phone number", "Número de teléfono no válido"),
    ("server_error", "Internal server error", "Error interno del servidor"),
    ("network_error", "Unable to reach the server", "No se puede conectar con el servidor"),
    ("timeout", "The request timed out", "La solicitud ha excedido el tiempo de espera"),
    ("logged_out", "You have been logged out", "Ha cerrado la sesión"),
];
