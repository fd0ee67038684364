//! relais-protocol – Draht-Protokoll
//!
//! Definiert den JSON-Umschlag und die typisierten Ereignisse, die zwischen
//! Client und Relais-Server ausgetauscht werden.

pub mod envelope;
pub mod events;

pub use envelope::{DecodeError, Envelope};
pub use events::{Adressiert, ClientEvent, PeerAnfrage, RelayNachricht, ServerEvent};
