//! Gemeinsamer Server-Zustand fuer den Signaling-Service
//!
//! Haelt Konfiguration, Router und Registry als Arc-Referenzen, die sicher
//! zwischen tokio-Tasks geteilt werden koennen. Wird beim Serverstart
//! erzeugt und beim Shutdown verworfen; es gibt keinen globalen Zustand.

use relais_core::{IdGenerator, RelaisError, UuidGenerator};
use relais_observability::RelaisMetrics;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crate::registry::VerbindungsRegistry;
use crate::router::Router;

/// Konfiguration fuer den Signaling-Service
#[derive(Debug, Clone)]
pub struct SignalingConfig {
    /// Maximale gleichzeitige Verbindungen
    pub max_verbindungen: usize,
    /// Groesse der Send-Queue pro Verbindung
    pub send_queue_groesse: usize,
    /// Keepalive-Intervall (WebSocket-Ping) in Sekunden
    pub keepalive_sek: u64,
    /// Timeout fuer inaktive Verbindungen in Sekunden
    pub verbindungs_timeout_sek: u64,
    /// `connections`-Ereignis nach jedem Connect/Disconnect verteilen
    pub verbindungen_ankuendigen: bool,
}

impl Default for SignalingConfig {
    fn default() -> Self {
        Self {
            max_verbindungen: 1024,
            send_queue_groesse: 64,
            keepalive_sek: 30,
            verbindungs_timeout_sek: 90,
            verbindungen_ankuendigen: false,
        }
    }
}

impl SignalingConfig {
    /// Prueft die Werte auf Konsistenz
    pub fn validieren(&self) -> relais_core::Result<()> {
        if self.send_queue_groesse == 0 {
            return Err(RelaisError::konfiguration(
                "send_queue_groesse muss groesser als 0 sein",
            ));
        }
        if self.max_verbindungen == 0 {
            return Err(RelaisError::konfiguration(
                "max_verbindungen muss groesser als 0 sein",
            ));
        }
        if self.keepalive_sek == 0 {
            return Err(RelaisError::konfiguration(
                "keepalive_sek muss groesser als 0 sein",
            ));
        }
        if self.verbindungs_timeout_sek <= self.keepalive_sek {
            return Err(RelaisError::konfiguration(
                "verbindungs_timeout_sek muss groesser als keepalive_sek sein",
            ));
        }
        Ok(())
    }
}

/// Gemeinsamer Server-Zustand (thread-safe, Arc-geteilt)
pub struct SignalingState {
    /// Signaling-Konfiguration
    pub config: Arc<SignalingConfig>,
    /// Router (haelt die Registry)
    pub router: Arc<Router>,
    /// Startzeitpunkt des Servers
    pub start_time: Instant,
    /// Belegte Verbindungsplaetze (inklusive laufender Upgrades)
    plaetze: Arc<AtomicUsize>,
}

/// Reservierter Verbindungsplatz, wird beim Drop freigegeben
#[derive(Debug)]
pub struct VerbindungsPlatz {
    plaetze: Arc<AtomicUsize>,
}

impl Drop for VerbindungsPlatz {
    fn drop(&mut self) {
        self.plaetze.fetch_sub(1, Ordering::AcqRel);
    }
}

impl SignalingState {
    /// Erstellt einen neuen SignalingState mit UUID-Vergabe
    pub fn neu(config: SignalingConfig, metriken: Option<RelaisMetrics>) -> Arc<Self> {
        Self::mit_id_generator(config, metriken, Arc::new(UuidGenerator))
    }

    /// Erstellt einen SignalingState mit eigenem ID-Generator
    pub fn mit_id_generator(
        config: SignalingConfig,
        metriken: Option<RelaisMetrics>,
        ids: Arc<dyn IdGenerator>,
    ) -> Arc<Self> {
        let mut router = Router::neu(VerbindungsRegistry::neu(), ids)
            .mit_verbindungs_ankuendigung(config.verbindungen_ankuendigen);
        if let Some(m) = metriken {
            router = router.mit_metriken(m);
        }

        Arc::new(Self {
            config: Arc::new(config),
            router: Arc::new(router),
            start_time: Instant::now(),
            plaetze: Arc::new(AtomicUsize::new(0)),
        })
    }

    /// Registry des Routers
    pub fn registry(&self) -> &VerbindungsRegistry {
        self.router.registry()
    }

    /// Reserviert einen Platz fuer eine neue Verbindung
    ///
    /// `None` wenn `max_verbindungen` Plaetze belegt sind. Der Platz gilt
    /// ab dem Upgrade-Request bis zum Ende des Verbindungs-Tasks.
    pub fn platz_reservieren(&self) -> Option<VerbindungsPlatz> {
        let max = self.config.max_verbindungen;
        self.plaetze
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |belegt| {
                (belegt < max).then_some(belegt + 1)
            })
            .ok()
            .map(|_| VerbindungsPlatz {
                plaetze: Arc::clone(&self.plaetze),
            })
    }

    /// Anzahl belegter Verbindungsplaetze
    pub fn belegte_plaetze(&self) -> usize {
        self.plaetze.load(Ordering::Acquire)
    }

    /// Gibt die Uptime in Sekunden zurueck
    pub fn uptime_sek(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        assert!(SignalingConfig::default().validieren().is_ok());
    }

    #[test]
    fn leere_queue_ist_ungueltig() {
        let config = SignalingConfig {
            send_queue_groesse: 0,
            ..Default::default()
        };
        assert!(config.validieren().is_err());
    }

    #[test]
    fn timeout_muss_groesser_als_keepalive_sein() {
        let config = SignalingConfig {
            keepalive_sek: 30,
            verbindungs_timeout_sek: 30,
            ..Default::default()
        };
        let fehler = config.validieren().unwrap_err();
        assert!(fehler.to_string().contains("verbindungs_timeout_sek"));
    }

    #[test]
    fn plaetze_sind_begrenzt_und_werden_freigegeben() {
        let config = SignalingConfig {
            max_verbindungen: 2,
            ..Default::default()
        };
        let state = SignalingState::neu(config, None);

        let erster = state.platz_reservieren().expect("Platz 1");
        let _zweiter = state.platz_reservieren().expect("Platz 2");
        assert!(state.platz_reservieren().is_none());
        assert_eq!(state.belegte_plaetze(), 2);

        drop(erster);
        assert_eq!(state.belegte_plaetze(), 1);
        assert!(state.platz_reservieren().is_some());
    }

    #[test]
    fn parallele_reservierungen_ueberschreiten_limit_nicht() {
        let config = SignalingConfig {
            max_verbindungen: 8,
            ..Default::default()
        };
        let state = SignalingState::neu(config, None);

        let plaetze: Vec<_> = std::thread::scope(|s| {
            let threads: Vec<_> = (0..32)
                .map(|_| s.spawn(|| state.platz_reservieren()))
                .collect();
            threads.into_iter().map(|t| t.join().unwrap()).collect()
        });

        assert_eq!(plaetze.iter().filter(|p| p.is_some()).count(), 8);
        assert_eq!(state.belegte_plaetze(), 8);
        drop(plaetze);
        assert_eq!(state.belegte_plaetze(), 0);
    }

    #[test]
    fn zustand_hat_leere_registry() {
        let state = SignalingState::neu(SignalingConfig::default(), None);
        assert_eq!(state.registry().anzahl(), 0);
        assert!(state.uptime_sek() < 5);
    }
}
