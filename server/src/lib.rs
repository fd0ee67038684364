//! relais-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Signaling-Server und Observability und stellt
//! den oeffentlichen Einstiegspunkt fuer den Binary bereit.

pub mod config;

use anyhow::{Context, Result};
use config::ServerConfig;
use relais_observability::{observability_server_starten, HealthState, RelaisMetrics};
use relais_signaling::{SignalingServer, SignalingState};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::watch;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet alle Server-Subsysteme und laeuft bis zum Shutdown-Signal
    ///
    /// Reihenfolge:
    /// 1. Konfiguration pruefen
    /// 2. Metriken und Signaling-Zustand anlegen
    /// 3. Observability-Server starten (falls aktiviert)
    /// 4. WebSocket-Listener starten
    /// 5. Auf Ctrl-C warten, dann alle Verbindungen schliessen
    pub async fn starten(self) -> Result<()> {
        self.config
            .validieren()
            .context("Ungueltige Konfiguration")?;
        let signaling_config = self.config.signaling_config();

        let ws_addr: SocketAddr = self
            .config
            .ws_bind_adresse()
            .parse()
            .context("Ungueltige WebSocket-Bind-Adresse")?;

        let metriken = RelaisMetrics::neu()?;
        let state = SignalingState::neu(signaling_config, Some(metriken.clone()));

        let registry = state.registry().clone();
        let health = HealthState::neu(move || registry.anzahl());

        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let observability = if self.config.observability.aktiviert {
            let obs_addr: SocketAddr = self
                .config
                .observability_bind_adresse()
                .parse()
                .context("Ungueltige Observability-Bind-Adresse")?;
            let health = health.clone();
            let rx = shutdown_rx.clone();
            Some(tokio::spawn(async move {
                if let Err(e) = observability_server_starten(obs_addr, metriken, health, rx).await
                {
                    tracing::error!(fehler = %e, "Observability-Server beendet");
                }
            }))
        } else {
            tracing::info!("Observability-Server deaktiviert");
            None
        };

        tracing::info!(
            ws = %ws_addr,
            max_verbindungen = state.config.max_verbindungen,
            "Server startet"
        );

        let mut signaling = tokio::spawn(
            SignalingServer::neu(Arc::clone(&state), ws_addr).starten(shutdown_rx),
        );

        let vorzeitig = tokio::select! {
            ergebnis = tokio::signal::ctrl_c() => {
                ergebnis?;
                tracing::info!("Shutdown-Signal empfangen, Server wird beendet");
                None
            }
            ende = &mut signaling => {
                tracing::warn!("Signaling-Server hat sich vorzeitig beendet");
                Some(ende)
            }
        };

        health.annahme_setzen(false);
        let _ = shutdown_tx.send(true);

        let ende = match vorzeitig {
            Some(ende) => ende,
            None => signaling.await,
        };
        ende.context("Signaling-Task abgebrochen")?
            .context("Signaling-Server fehlgeschlagen")?;

        if let Some(obs) = observability {
            let _ = obs.await;
        }

        tracing::info!(uptime_sek = state.uptime_sek(), "Server beendet");
        Ok(())
    }
}
