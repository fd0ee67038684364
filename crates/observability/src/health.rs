//! Health-Check-Endpunkt fuer Relais
//!
//! Endpoint: `GET /health`
//! Response: JSON mit Status, Version, Uptime und Anzahl der Verbindungen

use axum::{extract::State, http::StatusCode, response::IntoResponse, routing::get, Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;

/// Status des Health-Checks
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

/// Antwort des Health-Check-Endpunkts
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: String,
    pub started_at: DateTime<Utc>,
    pub uptime_seconds: u64,
    pub connections: usize,
}

type VerbindungsZaehler = Arc<dyn Fn() -> usize + Send + Sync>;

/// Geteilter Zustand fuer den Health-Check-Handler
#[derive(Clone)]
pub struct HealthState {
    start_time: Instant,
    started_at: DateTime<Utc>,
    verbindungen: VerbindungsZaehler,
    angenommen: Arc<std::sync::atomic::AtomicBool>,
}

impl HealthState {
    /// Erstellt den Zustand; `verbindungen` liefert die aktuelle Anzahl
    /// registrierter Verbindungen
    pub fn neu(verbindungen: impl Fn() -> usize + Send + Sync + 'static) -> Self {
        Self {
            start_time: Instant::now(),
            started_at: Utc::now(),
            verbindungen: Arc::new(verbindungen),
            angenommen: Arc::new(std::sync::atomic::AtomicBool::new(true)),
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Nimmt der Server noch Verbindungen an? (false waehrend Shutdown)
    pub fn nimmt_an(&self) -> bool {
        self.angenommen.load(std::sync::atomic::Ordering::Relaxed)
    }

    pub fn annahme_setzen(&self, aktiv: bool) {
        self.angenommen
            .store(aktiv, std::sync::atomic::Ordering::Relaxed);
    }

    /// Baut die aktuelle Health-Antwort
    pub fn antwort(&self) -> HealthResponse {
        let status = if self.nimmt_an() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        };

        HealthResponse {
            status,
            version: env!("CARGO_PKG_VERSION").to_string(),
            started_at: self.started_at,
            uptime_seconds: self.uptime_seconds(),
            connections: (self.verbindungen)(),
        }
    }
}

/// Axum-Router fuer den `/health`-Endpunkt
pub fn health_router(state: HealthState) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .with_state(state)
}

/// `GET /health` – gibt den Serverstatus zurueck
async fn health_handler(State(state): State<HealthState>) -> impl IntoResponse {
    let response = state.antwort();
    let http_status = match response.status {
        HealthStatus::Healthy => StatusCode::OK,
        HealthStatus::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
    };
    (http_status, Json(response))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn health_state_frisch() {
        let state = HealthState::neu(|| 0);
        assert!(state.uptime_seconds() < 5);
        assert!(state.nimmt_an());
    }

    #[test]
    fn antwort_liest_verbindungszahl() {
        let zaehler = Arc::new(AtomicUsize::new(0));
        let z = Arc::clone(&zaehler);
        let state = HealthState::neu(move || z.load(Ordering::Relaxed));

        zaehler.store(7, Ordering::Relaxed);
        let antwort = state.antwort();
        assert_eq!(antwort.connections, 7);
        assert_eq!(antwort.status, HealthStatus::Healthy);
    }

    #[test]
    fn shutdown_ist_unhealthy() {
        let state = HealthState::neu(|| 0);
        state.annahme_setzen(false);
        assert_eq!(state.antwort().status, HealthStatus::Unhealthy);
    }

    #[test]
    fn health_response_serialisierung() {
        let state = HealthState::neu(|| 2);
        let json = serde_json::to_string(&state.antwort()).unwrap();
        assert!(json.contains("\"status\":\"healthy\""));
        assert!(json.contains("\"connections\":2"));
        assert!(json.contains("\"started_at\""));
    }
}
