//! Verbindungs-Registry – Die einzige Tabelle aller lebenden Verbindungen
//!
//! Bildet `ConnectionId -> (VerbindungsHandle, Peer-Liste)` ab. Alle anderen
//! Komponenten lesen und schreiben ausschliesslich hierueber. Die Registry
//! sendet selbst nie Nachrichten.
//!
//! ## Invarianten
//! - Eine ID ist genau so lange eingetragen, bis ihr Disconnect verarbeitet
//!   wurde; `entfernen` ist idempotent.
//! - Peer-Listen duerfen auf bereits entfernte IDs zeigen. Aufloesung
//!   gegen die Registry behandelt fehlende IDs als No-op.
//! - Lesende Abfragen liefern Snapshots, nie Live-Referenzen in die Map.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use relais_core::ConnectionId;
use std::sync::Arc;

use crate::handle::{VerbindungsHandle, VerbindungsZustand};

/// Registry-Eintrag einer Verbindung
struct Eintrag {
    handle: VerbindungsHandle,
    /// Verbindungen die `update`-Broadcasts dieser Verbindung erhalten
    peers: Vec<ConnectionId>,
}

/// Registry aller verbundenen Clients
///
/// Thread-safe via Arc + DashMap. Clone der Registry teilt den inneren
/// Zustand; mehrere unabhaengige Registries koennen parallel existieren.
#[derive(Clone, Default)]
pub struct VerbindungsRegistry {
    inner: Arc<DashMap<ConnectionId, Eintrag>>,
}

impl VerbindungsRegistry {
    /// Erstellt eine leere Registry
    pub fn neu() -> Self {
        Self::default()
    }

    /// Traegt eine Verbindung ein oder ueberschreibt einen vorhandenen Eintrag
    ///
    /// Gibt das ersetzte Handle zurueck. Beim Annehmen neuer Verbindungen
    /// nutzt der Router `registrieren_falls_frei`.
    pub fn registrieren(
        &self,
        id: ConnectionId,
        handle: VerbindungsHandle,
    ) -> Option<VerbindungsHandle> {
        tracing::debug!(connection_id = %id, "Verbindung registriert");
        self.inner
            .insert(
                id,
                Eintrag {
                    handle,
                    peers: Vec::new(),
                },
            )
            .map(|alt| alt.handle)
    }

    /// Traegt eine Verbindung nur ein, wenn `id` noch frei ist
    ///
    /// Pruefung und Eintrag passieren atomar unter dem Shard-Lock.
    /// `vor_eintrag` laeuft unter diesem Lock, bevor der Eintrag sichtbar
    /// wird, und darf die Registry nicht benutzen. Ist `id` belegt, kommt
    /// das Handle unveraendert zurueck.
    pub fn registrieren_falls_frei(
        &self,
        id: ConnectionId,
        handle: VerbindungsHandle,
        vor_eintrag: impl FnOnce(&ConnectionId, &VerbindungsHandle),
    ) -> Result<(), VerbindungsHandle> {
        match self.inner.entry(id) {
            Entry::Occupied(_) => Err(handle),
            Entry::Vacant(frei) => {
                vor_eintrag(frei.key(), &handle);
                tracing::debug!(connection_id = %frei.key(), "Verbindung registriert");
                frei.insert(Eintrag {
                    handle,
                    peers: Vec::new(),
                });
                Ok(())
            }
        }
    }

    /// Sucht das Handle einer Verbindung; `None` wenn unbekannt oder entfernt
    pub fn nachschlagen(&self, id: &str) -> Option<VerbindungsHandle> {
        self.inner.get(id).map(|e| e.handle.clone())
    }

    /// Entfernt eine Verbindung. Mehrfacher Aufruf ist ein No-op.
    ///
    /// Gibt `true` zurueck wenn tatsaechlich ein Eintrag entfernt wurde.
    pub fn entfernen(&self, id: &str) -> bool {
        match self.inner.remove(id) {
            Some((id, _)) => {
                tracing::debug!(connection_id = %id, "Verbindung aus Registry entfernt");
                true
            }
            None => false,
        }
    }

    /// Snapshot aller IDs ausser der angegebenen (Reihenfolge beliebig)
    pub fn alle_ids_ausser(&self, ausgeschlossen: &str) -> Vec<ConnectionId> {
        self.inner
            .iter()
            .filter(|e| e.key().as_str() != ausgeschlossen)
            .map(|e| e.key().clone())
            .collect()
    }

    /// Haengt `peer` an die Peer-Liste von `besitzer` an
    ///
    /// No-op wenn Besitzer oder Peer nicht registriert sind. Doppelte
    /// Abonnements werden nicht zusammengefasst.
    pub fn peer_hinzufuegen(&self, besitzer: &str, peer: &ConnectionId) -> bool {
        // Peer zuerst pruefen: get_mut haelt den Shard-Lock des Besitzers
        if !self.inner.contains_key(peer.as_str()) {
            return false;
        }

        match self.inner.get_mut(besitzer) {
            Some(mut eintrag) => {
                eintrag.peers.push(peer.clone());
                tracing::debug!(besitzer = %besitzer, peer = %peer, "Peer abonniert");
                true
            }
            None => false,
        }
    }

    /// Snapshot der Peer-Liste einer Verbindung (leer wenn unbekannt)
    pub fn peers_von(&self, id: &str) -> Vec<ConnectionId> {
        self.inner
            .get(id)
            .map(|e| e.peers.clone())
            .unwrap_or_default()
    }

    /// Snapshot aller Eintraege als (ID, Handle)-Paare
    pub fn alle_handles(&self) -> Vec<(ConnectionId, VerbindungsHandle)> {
        self.inner
            .iter()
            .map(|e| (e.key().clone(), e.handle.clone()))
            .collect()
    }

    /// Setzt den Zustand einer registrierten Verbindung
    pub fn zustand_setzen(&self, id: &str, zustand: VerbindungsZustand) -> bool {
        match self.inner.get(id) {
            Some(e) => {
                e.handle.zustand_setzen(zustand);
                true
            }
            None => false,
        }
    }

    /// Prueft ob eine ID registriert ist
    pub fn ist_registriert(&self, id: &str) -> bool {
        self.inner.contains_key(id)
    }

    /// Anzahl der registrierten Verbindungen
    pub fn anzahl(&self) -> usize {
        self.inner.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
