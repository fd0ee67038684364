//! Fehlertypen fuer den Signaling-Service
//!
//! Routing-Fehler (unbekannter Empfaenger, kaputtes JSON) sind keine
//! Fehler im Sinne dieses Typs: sie werden geloggt oder als Protokoll-
//! Antwort an den Absender gemeldet. `SignalingError` deckt nur den
//! Server-Betrieb ab.

use relais_core::RelaisError;
use thiserror::Error;

/// Fehlertyp fuer den Signaling-Service
#[derive(Debug, Error)]
pub enum SignalingError {
    /// IO-Fehler (Listener, Socket)
    #[error("IO-Fehler: {0}")]
    Io(#[from] std::io::Error),

    /// Ungueltige Konfiguration
    #[error(transparent)]
    Konfiguration(#[from] RelaisError),

    /// Senden an Client fehlgeschlagen (Queue voll oder geschlossen)
    #[error("Senden fehlgeschlagen")]
    SendFehler,
}

/// Result-Typ fuer den Signaling-Service
pub type SignalingResult<T> = Result<T, SignalingError>;
