//! relais-core – Gemeinsame Typen und Fehlertypen
//!
//! Stellt die Verbindungs-ID, die ID-Vergabe und den zentralen Fehlertyp
//! bereit, die von allen anderen Relais-Crates genutzt werden.

pub mod error;
pub mod ids;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{RelaisError, Result};
pub use ids::{FesteIds, IdGenerator, UuidGenerator};
pub use types::ConnectionId;
