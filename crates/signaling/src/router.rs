//! Router – Entscheidet fuer jedes eingehende Ereignis, wer es erhaelt
//!
//! ## Dispatch-Tabelle
//! - `logon` / `logoff`: an `data.to` weiterleiten, sonst `error` an Absender
//! - `connectToPeer`: Absender abonniert die `update`s von `data.id`
//! - `update`: an alle offenen Peers des Absenders
//! - alles andere: Relay an `data.to` als `message`, sonst `disconnected`
//!
//! Kein Routing-Fehler beendet eine Verbindung. Unbekannte Empfaenger
//! werden dem Absender als Protokoll-Antwort gemeldet, kaputte Frames
//! geloggt und verworfen.

use relais_core::{ConnectionId, IdGenerator, UuidGenerator};
use relais_observability::RelaisMetrics;
use relais_protocol::events::EMPFAENGER_UNBEKANNT;
use relais_protocol::{Adressiert, ClientEvent, PeerAnfrage, RelayNachricht, ServerEvent};
use serde_json::Value;
use std::sync::Arc;

use crate::handle::{VerbindungsHandle, VerbindungsZustand};
use crate::registry::VerbindungsRegistry;

/// Zentraler Nachrichten-Router
///
/// Besitzt keine eigene Tabelle, sondern arbeitet auf der injizierten
/// `VerbindungsRegistry`.
pub struct Router {
    registry: VerbindungsRegistry,
    ids: Arc<dyn IdGenerator>,
    metriken: Option<RelaisMetrics>,
    verbindungen_ankuendigen: bool,
}

impl Router {
    /// Erstellt einen Router auf der gegebenen Registry
    pub fn neu(registry: VerbindungsRegistry, ids: Arc<dyn IdGenerator>) -> Self {
        Self {
            registry,
            ids,
            metriken: None,
            verbindungen_ankuendigen: false,
        }
    }

    /// Router mit eigener Registry und UUID-Vergabe
    pub fn standard() -> Self {
        Self::neu(VerbindungsRegistry::neu(), Arc::new(UuidGenerator))
    }

    /// Zaehlt Verbindungen, Ereignisse und Zustellungen in `metriken`
    pub fn mit_metriken(mut self, metriken: RelaisMetrics) -> Self {
        self.metriken = Some(metriken);
        self
    }

    /// Verteilt nach jedem Connect/Disconnect ein `connections`-Ereignis
    pub fn mit_verbindungs_ankuendigung(mut self, aktiv: bool) -> Self {
        self.verbindungen_ankuendigen = aktiv;
        self
    }

    pub fn registry(&self) -> &VerbindungsRegistry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Lebenszyklus
    // -----------------------------------------------------------------------

    /// Nimmt eine neue Verbindung an
    ///
    /// Zieht IDs bis eine frei ist. `socket_id` wird unter dem Shard-Lock
    /// eingereiht, bevor der Eintrag sichtbar wird; anderer Verkehr kann
    /// die Verbindung erst danach erreichen.
    pub fn verbindung_annehmen(&self, handle: VerbindungsHandle) -> ConnectionId {
        let mut handle = handle;
        let id = loop {
            let kandidat = self.ids.neue_id();
            let ergebnis = self
                .registry
                .registrieren_falls_frei(kandidat.clone(), handle, |id, h| {
                    self.an_handle_senden(id, h, &ServerEvent::SocketId(id.clone()));
                });
            match ergebnis {
                Ok(()) => break kandidat,
                Err(zurueck) => {
                    tracing::warn!(connection_id = %kandidat, "ID bereits vergeben – neue ID wird erzeugt");
                    handle = zurueck;
                }
            }
        };

        if let Some(m) = &self.metriken {
            m.connections_accepted_total.inc();
            m.connected_clients.set(self.registry.anzahl() as i64);
        }
        tracing::info!(connection_id = %id, "Verbindung angenommen");

        if self.verbindungen_ankuendigen {
            self.verbindungen_verteilen();
        }

        id
    }

    /// Verarbeitet den Disconnect einer Verbindung (idempotent)
    pub fn verbindung_getrennt(&self, id: &ConnectionId) {
        self.registry
            .zustand_setzen(id.as_str(), VerbindungsZustand::Geschlossen);

        if !self.registry.entfernen(id.as_str()) {
            tracing::trace!(connection_id = %id, "Disconnect fuer bereits entfernte Verbindung");
            return;
        }

        if let Some(m) = &self.metriken {
            m.connected_clients.set(self.registry.anzahl() as i64);
        }
        tracing::info!(connection_id = %id, "Verbindung entfernt");

        if self.verbindungen_ankuendigen {
            self.verbindungen_verteilen();
        }
    }

    /// Sendet jeder Verbindung die IDs aller anderen Verbindungen
    ///
    /// Verbindungen die dabei als Schliessend/Geschlossen auffallen, werden
    /// stattdessen aus der Registry entfernt.
    pub fn verbindungen_verteilen(&self) {
        let mut veraltet = Vec::new();

        for (id, handle) in self.registry.alle_handles() {
            if !handle.zustand().ist_zustellbar() {
                veraltet.push(id);
                continue;
            }
            let andere = self.registry.alle_ids_ausser(id.as_str());
            self.an_handle_senden(&id, &handle, &ServerEvent::Connections(andere));
        }

        for id in veraltet {
            if self.registry.entfernen(id.as_str()) {
                tracing::debug!(connection_id = %id, "Geschlossene Verbindung beim Verteilen entfernt");
            }
        }

        if let Some(m) = &self.metriken {
            m.connected_clients.set(self.registry.anzahl() as i64);
        }
    }

    // -----------------------------------------------------------------------
    // Dispatch
    // -----------------------------------------------------------------------

    /// Verarbeitet einen rohen Frame von `absender`
    pub fn nachricht_verarbeiten(&self, absender: &ConnectionId, roh: &[u8]) {
        match ClientEvent::dekodieren(roh) {
            Ok(ereignis) => self.ereignis_verarbeiten(absender, ereignis),
            Err(e) => {
                tracing::warn!(
                    connection_id = %absender,
                    fehler = %e,
                    "Nicht dekodierbarer Frame verworfen"
                );
                if let Some(m) = &self.metriken {
                    m.decode_errors_total.inc();
                }
            }
        }
    }

    /// Verarbeitet ein bereits dekodiertes Ereignis
    pub fn ereignis_verarbeiten(&self, absender: &ConnectionId, ereignis: ClientEvent) {
        tracing::trace!(
            connection_id = %absender,
            event = %ereignis.name(),
            "Ereignis empfangen"
        );

        match ereignis {
            ClientEvent::Logon(nachricht) => {
                self.zaehlen("logon");
                self.adressiert_weiterleiten(absender, nachricht, ServerEvent::Logon);
            }
            ClientEvent::Logoff(nachricht) => {
                self.zaehlen("logoff");
                self.adressiert_weiterleiten(absender, nachricht, ServerEvent::Logoff);
            }
            ClientEvent::ConnectToPeer(anfrage) => {
                self.zaehlen("connectToPeer");
                self.peer_abonnieren(absender, anfrage);
            }
            ClientEvent::Update(daten) => {
                self.zaehlen("update");
                self.an_peers_verteilen(absender, daten);
            }
            ClientEvent::Relay(nachricht) => {
                self.zaehlen("relay");
                self.relay(absender, nachricht);
            }
        }
    }

    /// `logon`/`logoff`: unveraendert an `to`, sonst `error` an den Absender
    fn adressiert_weiterleiten(
        &self,
        absender: &ConnectionId,
        nachricht: Adressiert,
        verpacken: fn(Value) -> ServerEvent,
    ) {
        let Adressiert { to, daten } = nachricht;

        match to.and_then(|to| self.registry.nachschlagen(to.as_str()).map(|h| (to, h))) {
            Some((to, handle)) => {
                self.an_handle_senden(&to, &handle, &verpacken(daten));
            }
            None => {
                tracing::debug!(connection_id = %absender, "Empfaenger nicht registriert");
                self.an_id_senden(absender, &ServerEvent::Error(EMPFAENGER_UNBEKANNT.into()));
            }
        }
    }

    /// `connectToPeer`: Absender in die Peer-Liste von `id` eintragen
    fn peer_abonnieren(&self, absender: &ConnectionId, anfrage: PeerAnfrage) {
        let Some(ziel) = anfrage.id else {
            tracing::debug!(connection_id = %absender, "connectToPeer ohne gueltige id ignoriert");
            return;
        };

        if !self.registry.peer_hinzufuegen(ziel.as_str(), absender) {
            tracing::debug!(
                connection_id = %absender,
                ziel = %ziel,
                "connectToPeer fuer unbekannte Verbindung ignoriert"
            );
        }
    }

    /// `update`: an jeden offenen Peer des Absenders, fehlende still ueberspringen
    fn an_peers_verteilen(&self, absender: &ConnectionId, daten: Value) {
        let peers = self.registry.peers_von(absender.as_str());
        if peers.is_empty() {
            return;
        }

        let text = match ServerEvent::Update(daten).kodieren() {
            Ok(t) => t,
            Err(e) => {
                tracing::error!(fehler = %e, "update konnte nicht serialisiert werden");
                return;
            }
        };

        for peer in &peers {
            let Some(handle) = self.registry.nachschlagen(peer.as_str()) else {
                continue;
            };
            if !handle.ist_offen() {
                continue;
            }
            self.text_senden(peer, &handle, text.clone());
        }
    }

    /// Generisches Relay: als `message` an `to`, sonst `disconnected` mit `from`
    fn relay(&self, absender: &ConnectionId, nachricht: RelayNachricht) {
        let RelayNachricht {
            event_name,
            to,
            from,
            daten,
        } = nachricht;

        match to.and_then(|to| self.registry.nachschlagen(to.as_str()).map(|h| (to, h))) {
            Some((to, handle)) => {
                self.an_handle_senden(&to, &handle, &ServerEvent::Message(daten));
            }
            None => {
                tracing::debug!(
                    connection_id = %absender,
                    event = %event_name,
                    "Relay-Empfaenger nicht registriert"
                );
                self.an_id_senden(absender, &ServerEvent::Disconnected(from));
            }
        }
    }

    // -----------------------------------------------------------------------
    // Senden
    // -----------------------------------------------------------------------

    fn an_id_senden(&self, id: &ConnectionId, ereignis: &ServerEvent) {
        if let Some(handle) = self.registry.nachschlagen(id.as_str()) {
            self.an_handle_senden(id, &handle, ereignis);
        }
    }

    fn an_handle_senden(&self, id: &ConnectionId, handle: &VerbindungsHandle, ereignis: &ServerEvent) {
        match ereignis.kodieren() {
            Ok(text) => self.text_senden(id, handle, text),
            Err(e) => {
                tracing::error!(
                    connection_id = %id,
                    event = ereignis.name(),
                    fehler = %e,
                    "Ereignis konnte nicht serialisiert werden"
                );
            }
        }
    }

    fn text_senden(&self, id: &ConnectionId, handle: &VerbindungsHandle, text: String) {
        let ergebnis = handle.senden(text);
        if let Err(e) = &ergebnis {
            tracing::debug!(connection_id = %id, fehler = %e, "Zustellung verworfen");
        }
        if let Some(m) = &self.metriken {
            m.zustellung_zaehlen(ergebnis.is_ok());
        }
    }

    fn zaehlen(&self, event: &str) {
        if let Some(m) = &self.metriken {
            m.ereignis_zaehlen(event);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
