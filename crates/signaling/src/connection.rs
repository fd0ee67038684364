//! Client-Connection – Verwaltet eine einzelne WebSocket-Verbindung
//!
//! Jede Verbindung laeuft in einem eigenen tokio-Task. Der Lese-Loop gibt
//! Frames an den Router, ein separater Schreib-Task leert die Send-Queue
//! des `VerbindungsHandle` in den WebSocket.
//!
//! ## Lebenszyklus
//! ```text
//! Verbindend -> Offen -> Schliessend -> Geschlossen
//!                  |                        ^
//!                  +---- Disconnect --------+
//! ```
//!
//! ## Keepalive
//! - Schreib-Task sendet alle `keepalive_sek` einen WebSocket-Ping
//! - Kommt innerhalb von `verbindungs_timeout_sek` kein Frame (auch kein
//!   Pong), wird die Verbindung getrennt

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::time::Instant;

use crate::handle::{VerbindungsHandle, VerbindungsZustand};
use crate::server_state::SignalingState;

/// Maximale Wartezeit auf den Schreib-Task nach Verbindungsende
const SCHREIBER_NACHLAUF: Duration = Duration::from_secs(2);

/// Verarbeitet eine einzelne WebSocket-Verbindung
pub struct ClientConnection {
    state: Arc<SignalingState>,
    peer_addr: SocketAddr,
}

impl ClientConnection {
    /// Erstellt eine neue ClientConnection
    pub fn neu(state: Arc<SignalingState>, peer_addr: SocketAddr) -> Self {
        Self { state, peer_addr }
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis der Client trennt, der Timeout greift oder ein
    /// Shutdown-Signal eingeht. Danach ist die Verbindung aus der Registry
    /// entfernt.
    pub async fn verarbeiten(self, socket: WebSocket, mut shutdown_rx: watch::Receiver<bool>) {
        let peer_addr = self.peer_addr;
        let config = Arc::clone(&self.state.config);
        let router = Arc::clone(&self.state.router);
        let timeout_dauer = Duration::from_secs(config.verbindungs_timeout_sek);

        let (sink, mut stream) = socket.split();
        let (handle, sende_rx) = VerbindungsHandle::kanal(config.send_queue_groesse);

        let (stopp_tx, stopp_rx) = watch::channel(false);
        let mut schreiber = tokio::spawn(schreib_loop(
            sink,
            sende_rx,
            Duration::from_secs(config.keepalive_sek),
            stopp_rx,
        ));

        handle.zustand_setzen(VerbindungsZustand::Offen);
        let id = router.verbindung_annehmen(handle.clone());
        tracing::info!(peer = %peer_addr, connection_id = %id, "Neue Verbindung");

        let mut letzter_empfang = Instant::now();

        loop {
            let frist = letzter_empfang + timeout_dauer;

            tokio::select! {
                frame = stream.next() => {
                    match frame {
                        Some(Ok(Message::Text(text))) => {
                            letzter_empfang = Instant::now();
                            router.nachricht_verarbeiten(&id, text.as_bytes());
                        }
                        Some(Ok(Message::Binary(daten))) => {
                            letzter_empfang = Instant::now();
                            router.nachricht_verarbeiten(&id, &daten);
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {
                            // Pong-Antworten erledigt axum beim naechsten Schreiben
                            letzter_empfang = Instant::now();
                        }
                        Some(Ok(Message::Close(frame))) => {
                            tracing::info!(connection_id = %id, grund = ?frame, "Client hat Verbindung geschlossen");
                            break;
                        }
                        Some(Err(e)) => {
                            tracing::warn!(connection_id = %id, fehler = %e, "WebSocket-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(connection_id = %id, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                _ = tokio::time::sleep_until(frist) => {
                    tracing::warn!(connection_id = %id, "Verbindungs-Timeout");
                    break;
                }

                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(connection_id = %id, "Shutdown-Signal – Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup beim Verbindungsende
        handle.zustand_setzen(VerbindungsZustand::Schliessend);
        router.verbindung_getrennt(&id);
        drop(handle);

        let _ = stopp_tx.send(true);
        if tokio::time::timeout(SCHREIBER_NACHLAUF, &mut schreiber)
            .await
            .is_err()
        {
            tracing::debug!(connection_id = %id, "Schreib-Task haengt – wird abgebrochen");
            schreiber.abort();
        }

        tracing::info!(connection_id = %id, "Verbindungs-Task beendet");
    }
}

/// Leert die Send-Queue in den WebSocket und sendet Keepalive-Pings
///
/// Nach dem Stopp-Signal werden bereits eingereihte Nachrichten noch
/// geschrieben, dann folgt ein Close-Frame.
async fn schreib_loop(
    mut sink: SplitSink<WebSocket, Message>,
    mut sende_rx: mpsc::Receiver<String>,
    keepalive: Duration,
    mut stopp_rx: watch::Receiver<bool>,
) {
    let mut ping = tokio::time::interval_at(Instant::now() + keepalive, keepalive);

    loop {
        tokio::select! {
            ausgehend = sende_rx.recv() => {
                let Some(text) = ausgehend else { break };
                if let Err(e) = sink.send(Message::Text(text)).await {
                    tracing::debug!(fehler = %e, "Senden fehlgeschlagen");
                    return;
                }
            }

            _ = ping.tick() => {
                if let Err(e) = sink.send(Message::Ping(Vec::new())).await {
                    tracing::debug!(fehler = %e, "Ping-Senden fehlgeschlagen");
                    return;
                }
            }

            Ok(()) = stopp_rx.changed() => {
                if *stopp_rx.borrow() {
                    break;
                }
            }
        }
    }

    // Rest der Queue noch zustellen
    while let Ok(text) = sende_rx.try_recv() {
        if sink.send(Message::Text(text)).await.is_err() {
            return;
        }
    }
    let _ = sink.send(Message::Close(None)).await;
    let _ = sink.close().await;
}
