//! Typisierte Ereignisse (Client -> Server und Server -> Client)
//!
//! ## Design
//! - Eingehende Umschlaege werden an der Grenze genau einmal in ein
//!   `ClientEvent` uebersetzt; der Router sieht nie rohes `data`.
//! - Adress-Felder (`to`, `id`) sind optional. Fehlen sie oder sind sie
//!   keine Strings, gilt der Empfaenger als unbekannt.
//! - Weitergeleitete Nutzdaten bleiben unveraendert (`Value`).
//! - `ServerEvent` ist ein adjazent getaggter Enum und serialisiert direkt
//!   in die Umschlag-Form.

use relais_core::ConnectionId;
use serde::Serialize;
use serde_json::Value;

use crate::envelope::{DecodeError, Envelope};

/// Event-Namen mit Sonderbehandlung
pub mod namen {
    pub const LOGON: &str = "logon";
    pub const LOGOFF: &str = "logoff";
    pub const UPDATE: &str = "update";
    pub const CONNECT_TO_PEER: &str = "connectToPeer";
}

/// Fehlertext wenn ein `logon`/`logoff`-Empfaenger nicht registriert ist
pub const EMPFAENGER_UNBEKANNT: &str = "Does not exist on server.";

// ---------------------------------------------------------------------------
// Client -> Server
// ---------------------------------------------------------------------------

/// Adressierte Nachricht (`logon`, `logoff`)
#[derive(Debug, Clone, PartialEq)]
pub struct Adressiert {
    /// Empfaenger aus `data.to`
    pub to: Option<ConnectionId>,
    /// Vollstaendiges `data`, wird unveraendert weitergeleitet
    pub daten: Value,
}

/// Peer-Abonnement (`connectToPeer`)
#[derive(Debug, Clone, PartialEq)]
pub struct PeerAnfrage {
    /// Verbindung deren `update`-Broadcasts der Absender erhalten will
    pub id: Option<ConnectionId>,
}

/// Generische Relay-Nachricht (jeder andere Event-Name)
#[derive(Debug, Clone, PartialEq)]
pub struct RelayNachricht {
    /// Original-Event-Name (nur fuer Logging)
    pub event_name: String,
    /// Empfaenger aus `data.to`
    pub to: Option<ConnectionId>,
    /// Absender-Angabe aus `data.from`, `null` wenn nicht vorhanden
    pub from: Value,
    /// Vollstaendiges `data`
    pub daten: Value,
}

/// Dekodiertes eingehendes Ereignis
#[derive(Debug, Clone, PartialEq)]
pub enum ClientEvent {
    Logon(Adressiert),
    Logoff(Adressiert),
    ConnectToPeer(PeerAnfrage),
    /// Beliebige Nutzdaten fuer alle Peers des Absenders
    Update(Value),
    Relay(RelayNachricht),
}

impl ClientEvent {
    /// Dekodiert und validiert einen rohen Frame
    pub fn dekodieren(roh: &[u8]) -> Result<Self, DecodeError> {
        Ok(Self::aus_umschlag(Envelope::dekodieren(roh)?))
    }

    /// Uebersetzt einen bereits geparsten Umschlag
    pub fn aus_umschlag(umschlag: Envelope) -> Self {
        let Envelope { event_name, data } = umschlag;

        match event_name.as_str() {
            namen::LOGON => Self::Logon(Adressiert::aus_daten(data)),
            namen::LOGOFF => Self::Logoff(Adressiert::aus_daten(data)),
            namen::CONNECT_TO_PEER => Self::ConnectToPeer(PeerAnfrage {
                id: string_feld(&data, "id"),
            }),
            namen::UPDATE => Self::Update(data),
            _ => Self::Relay(RelayNachricht {
                to: string_feld(&data, "to"),
                from: data.get("from").cloned().unwrap_or(Value::Null),
                daten: data,
                event_name,
            }),
        }
    }

    /// Event-Name fuer Logging und Metriken
    pub fn name(&self) -> &str {
        match self {
            Self::Logon(_) => namen::LOGON,
            Self::Logoff(_) => namen::LOGOFF,
            Self::ConnectToPeer(_) => namen::CONNECT_TO_PEER,
            Self::Update(_) => namen::UPDATE,
            Self::Relay(r) => &r.event_name,
        }
    }
}

impl Adressiert {
    fn aus_daten(daten: Value) -> Self {
        Self {
            to: string_feld(&daten, "to"),
            daten,
        }
    }
}

/// Liest ein String-Feld aus einem JSON-Objekt; alles andere ergibt `None`
fn string_feld(daten: &Value, feld: &str) -> Option<ConnectionId> {
    daten
        .get(feld)
        .and_then(Value::as_str)
        .map(ConnectionId::from)
}

// ---------------------------------------------------------------------------
// Server -> Client
// ---------------------------------------------------------------------------

/// Ausgehendes Ereignis, serialisiert als `{ "eventName", "data" }`
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "eventName", content = "data")]
pub enum ServerEvent {
    /// Zugewiesene ID, immer die erste Nachricht einer Verbindung
    #[serde(rename = "socket_id")]
    SocketId(ConnectionId),
    /// IDs aller anderen verbundenen Clients
    #[serde(rename = "connections")]
    Connections(Vec<ConnectionId>),
    #[serde(rename = "logon")]
    Logon(Value),
    #[serde(rename = "logoff")]
    Logoff(Value),
    #[serde(rename = "update")]
    Update(Value),
    #[serde(rename = "message")]
    Message(Value),
    /// Menschenlesbare Fehlermeldung
    #[serde(rename = "error")]
    Error(String),
    /// Empfaenger einer Relay-Nachricht ist weg; traegt `from` zurueck
    #[serde(rename = "disconnected")]
    Disconnected(Value),
}

impl ServerEvent {
    /// Event-Name auf dem Draht
    pub fn name(&self) -> &'static str {
        match self {
            Self::SocketId(_) => "socket_id",
            Self::Connections(_) => "connections",
            Self::Logon(_) => "logon",
            Self::Logoff(_) => "logoff",
            Self::Update(_) => "update",
            Self::Message(_) => "message",
            Self::Error(_) => "error",
            Self::Disconnected(_) => "disconnected",
        }
    }

    /// Serialisiert das Ereignis als JSON-Text
    pub fn kodieren(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
