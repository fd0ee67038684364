//! Prometheus-kompatible Metriken fuer Relais
//!
//! Registrierte Metriken:
//! - `relais_connected_clients` – Gauge: Aktuell registrierte Verbindungen
//! - `relais_connections_accepted_total` – Counter: Angenommene Verbindungen
//! - `relais_events_total` – Counter: Eingehende Ereignisse (event)
//! - `relais_deliveries_total` – Counter: Eingereihte ausgehende Nachrichten
//! - `relais_dropped_deliveries_total` – Counter: Verworfene Zustellungen
//! - `relais_decode_errors_total` – Counter: Nicht dekodierbare Frames

use anyhow::Result;
use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Router};
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder};
use std::sync::Arc;

/// Alle Relais-Prometheus-Metriken
///
/// Clone teilt die Registry; alle Klone zaehlen in dieselben Metriken.
#[derive(Clone)]
pub struct RelaisMetrics {
    pub registry: Arc<Registry>,

    pub connected_clients: IntGauge,
    pub connections_accepted_total: IntCounter,
    pub events_total: IntCounterVec,
    pub deliveries_total: IntCounter,
    pub dropped_deliveries_total: IntCounter,
    pub decode_errors_total: IntCounter,
}

impl RelaisMetrics {
    /// Erstellt und registriert alle Metriken in einer neuen Registry
    pub fn neu() -> Result<Self> {
        let registry = Registry::new();

        let connected_clients = IntGauge::with_opts(Opts::new(
            "relais_connected_clients",
            "Anzahl aktuell registrierter Verbindungen",
        ))?;
        registry.register(Box::new(connected_clients.clone()))?;

        let connections_accepted_total = IntCounter::with_opts(Opts::new(
            "relais_connections_accepted_total",
            "Gesamtanzahl angenommener Verbindungen",
        ))?;
        registry.register(Box::new(connections_accepted_total.clone()))?;

        // Label-Werte: logon, logoff, connectToPeer, update, relay
        let events_total = IntCounterVec::new(
            Opts::new("relais_events_total", "Eingehende Ereignisse nach Typ"),
            &["event"],
        )?;
        registry.register(Box::new(events_total.clone()))?;

        let deliveries_total = IntCounter::with_opts(Opts::new(
            "relais_deliveries_total",
            "Erfolgreich eingereihte ausgehende Nachrichten",
        ))?;
        registry.register(Box::new(deliveries_total.clone()))?;

        let dropped_deliveries_total = IntCounter::with_opts(Opts::new(
            "relais_dropped_deliveries_total",
            "Verworfene Zustellungen (Queue voll oder Verbindung geschlossen)",
        ))?;
        registry.register(Box::new(dropped_deliveries_total.clone()))?;

        let decode_errors_total = IntCounter::with_opts(Opts::new(
            "relais_decode_errors_total",
            "Nicht dekodierbare eingehende Frames",
        ))?;
        registry.register(Box::new(decode_errors_total.clone()))?;

        Ok(Self {
            registry: Arc::new(registry),
            connected_clients,
            connections_accepted_total,
            events_total,
            deliveries_total,
            dropped_deliveries_total,
            decode_errors_total,
        })
    }

    /// Zaehlt ein eingehendes Ereignis
    pub fn ereignis_zaehlen(&self, event: &str) {
        self.events_total.with_label_values(&[event]).inc();
    }

    /// Zaehlt eine Zustellung, erfolgreich oder verworfen
    pub fn zustellung_zaehlen(&self, erfolgreich: bool) {
        if erfolgreich {
            self.deliveries_total.inc();
        } else {
            self.dropped_deliveries_total.inc();
        }
    }

    /// Exportiert alle Metriken im Prometheus-Textformat
    pub fn exportieren(&self) -> Result<String> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}

/// Axum-Router fuer den `/metrics`-Endpunkt
pub fn metrics_router(metriken: RelaisMetrics) -> Router {
    Router::new()
        .route("/metrics", get(metrics_handler))
        .with_state(metriken)
}

async fn metrics_handler(State(metriken): State<RelaisMetrics>) -> impl IntoResponse {
    match metriken.exportieren() {
        Ok(text) => (
            StatusCode::OK,
            [(axum::http::header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!("Metriken-Export fehlgeschlagen: {err}");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn metriken_erstellen_erfolgreich() {
        let metriken = RelaisMetrics::neu().unwrap();
        assert!(!metriken.registry.gather().is_empty());
    }

    #[test]
    fn zustellungen_zaehlen() {
        let metriken = RelaisMetrics::neu().unwrap();
        metriken.zustellung_zaehlen(true);
        metriken.zustellung_zaehlen(true);
        metriken.zustellung_zaehlen(false);
        assert_eq!(metriken.deliveries_total.get(), 2);
        assert_eq!(metriken.dropped_deliveries_total.get(), 1);
    }

    #[test]
    fn ereignisse_mit_labels() {
        let metriken = RelaisMetrics::neu().unwrap();
        metriken.ereignis_zaehlen("update");
        metriken.ereignis_zaehlen("update");
        let wert = metriken.events_total.with_label_values(&["update"]).get();
        assert_eq!(wert, 2);
    }

    #[test]
    fn klone_teilen_zaehler() {
        let a = RelaisMetrics::neu().unwrap();
        let b = a.clone();
        a.connected_clients.inc();
        assert_eq!(b.connected_clients.get(), 1);
    }

    #[test]
    fn export_prometheus_format() {
        let metriken = RelaisMetrics::neu().unwrap();
        metriken.connected_clients.set(3);
        metriken.decode_errors_total.inc();

        let output = metriken.exportieren().unwrap();
        assert!(output.contains("relais_connected_clients 3"));
        assert!(output.contains("relais_decode_errors_total 1"));
        assert!(output.contains("# HELP"));
        assert!(output.contains("# TYPE"));
    }
}
