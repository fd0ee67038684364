//! ID-Vergabe fuer neue Verbindungen
//!
//! Der Router bekommt einen `IdGenerator` injiziert. Im Betrieb ist das der
//! `UuidGenerator`; Tests koennen mit `FesteIds` vorhersagbare IDs vergeben.

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::types::ConnectionId;

/// Erzeugt IDs fuer neu angenommene Verbindungen
pub trait IdGenerator: Send + Sync {
    /// Liefert eine neue, prozessweit eindeutige ID
    fn neue_id(&self) -> ConnectionId;
}

/// Standard-Generator: zufaellige UUID v4 (122 Zufallsbits)
#[derive(Debug, Clone, Copy, Default)]
pub struct UuidGenerator;

impl IdGenerator for UuidGenerator {
    fn neue_id(&self) -> ConnectionId {
        ConnectionId::zufaellig()
    }
}

/// Vergibt IDs aus einer festen Liste, danach zufaellige UUIDs
///
/// Gedacht fuer Tests und Szenarien mit bekannten IDs (`"a1"`, `"b1"`, ...).
#[derive(Debug, Default)]
pub struct FesteIds {
    vorrat: Mutex<VecDeque<ConnectionId>>,
}

impl FesteIds {
    /// Erstellt einen Generator der zuerst die gegebenen IDs ausgibt
    pub fn neu<I, S>(ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<ConnectionId>,
    {
        Self {
            vorrat: Mutex::new(ids.into_iter().map(Into::into).collect()),
        }
    }
}

impl IdGenerator for FesteIds {
    fn neue_id(&self) -> ConnectionId {
        let naechste = match self.vorrat.lock() {
            Ok(mut vorrat) => vorrat.pop_front(),
            Err(vergiftet) => vergiftet.into_inner().pop_front(),
        };
        naechste.unwrap_or_else(ConnectionId::zufaellig)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn uuid_generator_ohne_wiederholung() {
        let gen = UuidGenerator;
        let ids: HashSet<_> = (0..1000).map(|_| gen.neue_id()).collect();
        assert_eq!(ids.len(), 1000);
    }

    #[test]
    fn feste_ids_in_reihenfolge() {
        let gen = FesteIds::neu(["a1", "b1"]);
        assert_eq!(gen.neue_id().as_str(), "a1");
        assert_eq!(gen.neue_id().as_str(), "b1");
    }

    #[test]
    fn feste_ids_fallen_auf_uuid_zurueck() {
        let gen = FesteIds::neu(Vec::<String>::new());
        let id = gen.neue_id();
        assert!(uuid::Uuid::parse_str(id.as_str()).is_ok());
    }
}
