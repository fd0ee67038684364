//! relais-signaling – Verbindungs-Registry und Nachrichten-Routing
//!
//! Dieser Crate implementiert den Kern des Relais: die Tabelle aller
//! lebenden Verbindungen, die ID-Vergabe beim Connect, das Peer-Abonnement
//! und das Routing jedes eingehenden Ereignisses.
//!
//! ## Architektur
//!
//! ```text
//! WebSocket Listener (SignalingServer)
//!     |
//!     v
//! ClientConnection (pro Verbindung ein Task + Schreib-Task)
//!     |  Verbindend -> Offen -> Schliessend -> Geschlossen
//!     |
//!     v
//! Router
//!     |
//!     +-- logon / logoff   (adressierte Weiterleitung)
//!     +-- connectToPeer    (Peer-Abonnement)
//!     +-- update           (Fan-out an Peers)
//!     +-- *                (generisches Relay)
//!
//! VerbindungsRegistry – ID -> Handle + Peer-Liste
//! VerbindungsHandle   – Send-Queue und Zustand einer Verbindung
//! ```

pub mod connection;
pub mod error;
pub mod handle;
pub mod registry;
pub mod router;
pub mod server;
pub mod server_state;

// Bequeme Re-Exporte
pub use connection::ClientConnection;
pub use error::{SignalingError, SignalingResult};
pub use handle::{VerbindungsHandle, VerbindungsZustand};
pub use registry::VerbindungsRegistry;
pub use router::Router;
pub use server::SignalingServer;
pub use server_state::{SignalingConfig, SignalingState, VerbindungsPlatz};
