//! WebSocket-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `SignalingServer` bedient `GET /` und `GET /ws` mit einem
//! WebSocket-Upgrade. Jede angenommene Verbindung laeuft als eigener
//! tokio-Task in einer `ClientConnection`.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tower_http::trace::TraceLayer;

use crate::connection::ClientConnection;
use crate::error::SignalingResult;
use crate::server_state::SignalingState;

/// Axum-State fuer den Upgrade-Handler
#[derive(Clone)]
struct UpgradeState {
    state: Arc<SignalingState>,
    shutdown_rx: watch::Receiver<bool>,
}

/// WebSocket-Signaling-Server
pub struct SignalingServer {
    state: Arc<SignalingState>,
    bind_addr: SocketAddr,
}

impl SignalingServer {
    /// Erstellt einen neuen SignalingServer
    pub fn neu(state: Arc<SignalingState>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    /// Bindet den Listener und bedient Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(self, shutdown_rx: watch::Receiver<bool>) -> SignalingResult<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        Self::mit_listener(self.state, listener, shutdown_rx).await
    }

    /// Bedient Verbindungen auf einem bereits gebundenen Listener
    pub async fn mit_listener(
        state: Arc<SignalingState>,
        listener: TcpListener,
        shutdown_rx: watch::Receiver<bool>,
    ) -> SignalingResult<()> {
        state.config.validieren()?;
        let lokale_addr = listener.local_addr()?;
        tracing::info!(adresse = %lokale_addr, "WebSocket Signaling-Server gestartet");

        let app = router(state, shutdown_rx.clone());
        let mut shutdown = shutdown_rx;

        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(async move {
            while shutdown.changed().await.is_ok() {
                if *shutdown.borrow() {
                    tracing::info!("Signaling-Server: Shutdown-Signal empfangen");
                    break;
                }
            }
        })
        .await?;

        tracing::info!("WebSocket Signaling-Server gestoppt");
        Ok(())
    }
}

/// Baut den axum-Router mit den Upgrade-Routen
fn router(state: Arc<SignalingState>, shutdown_rx: watch::Receiver<bool>) -> axum::Router {
    axum::Router::new()
        .route("/", get(upgrade_handler))
        .route("/ws", get(upgrade_handler))
        .layer(TraceLayer::new_for_http())
        .with_state(UpgradeState { state, shutdown_rx })
}

/// `GET /` – WebSocket-Upgrade, 503 wenn der Server voll ist
///
/// Der Verbindungsplatz wird vor dem Upgrade reserviert, damit auch noch
/// laufende Upgrades auf `max_verbindungen` angerechnet werden.
async fn upgrade_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(peer_addr): ConnectInfo<SocketAddr>,
    State(upgrade): State<UpgradeState>,
) -> Response {
    let Some(platz) = upgrade.state.platz_reservieren() else {
        let max = upgrade.state.config.max_verbindungen;
        tracing::warn!(peer = %peer_addr, max, "Server voll – Verbindung abgelehnt");
        return (StatusCode::SERVICE_UNAVAILABLE, "Server voll").into_response();
    };

    tracing::debug!(peer = %peer_addr, "Upgrade akzeptiert");

    let UpgradeState { state, shutdown_rx } = upgrade;
    ws.on_upgrade(move |socket| async move {
        ClientConnection::neu(state, peer_addr)
            .verarbeiten(socket, shutdown_rx)
            .await;
        drop(platz);
    })
}
