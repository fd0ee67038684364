//! Identifikationstypen fuer Relais
//!
//! Verbindungs-IDs sind auf dem Draht einfache Strings. Clients adressieren
//! sich gegenseitig ueber diese Strings, deshalb kann eine `ConnectionId`
//! auch aus beliebigem Client-Input entstehen (z.B. `"ghost"`).

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use uuid::Uuid;

/// Eindeutige ID einer Verbindung
///
/// Wird genau einmal beim Annehmen der Verbindung vergeben und danach nie
/// wieder geaendert. Serialisiert transparent als String.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Erstellt eine neue zufaellige ConnectionId (UUID v4)
    pub fn zufaellig() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Gibt die ID als String-Slice zurueck
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<String> for ConnectionId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for ConnectionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

// Erlaubt DashMap-Lookups direkt mit `&str` ohne Allokation
impl Borrow<str> for ConnectionId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl AsRef<str> for ConnectionId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
