//! Fehlertypen fuer Relais
//!
//! Zentraler Fehler-Enum fuer crate-uebergreifende Fehlerzustaende.
//! Andere Crates definieren eigene Fehler und konvertieren via `#[from]`.

use thiserror::Error;

/// Globaler Result-Alias fuer Relais
pub type Result<T> = std::result::Result<T, RelaisError>;

/// Crate-uebergreifende Fehler
#[derive(Debug, Error)]
pub enum RelaisError {
    #[error("Konfigurationsfehler: {0}")]
    Konfiguration(String),
}

impl RelaisError {
    /// Erstellt einen Konfigurationsfehler
    pub fn konfiguration(msg: impl Into<String>) -> Self {
        Self::Konfiguration(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fehler_anzeige() {
        let e = RelaisError::konfiguration("send_queue_groesse darf nicht 0 sein");
        assert_eq!(
            e.to_string(),
            "Konfigurationsfehler: send_queue_groesse darf nicht 0 sein"
        );
    }
}
