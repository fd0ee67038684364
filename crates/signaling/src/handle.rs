//! Verbindungs-Handle – Send-Queue und Lebenszyklus einer Verbindung
//!
//! Die Registry haelt pro Verbindung ein `VerbindungsHandle`. Der Router
//! reiht darueber serialisierte Umschlaege ein, der Schreib-Task der
//! `ClientConnection` leert die Queue in den WebSocket.
//!
//! Senden ist fire-and-forget: `try_send`, keine Wiederholung.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::{SignalingError, SignalingResult};

// ---------------------------------------------------------------------------
// Verbindungszustand
// ---------------------------------------------------------------------------

/// Lebenszyklus einer Verbindung, gespiegelt vom Transport
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum VerbindungsZustand {
    Verbindend = 0,
    Offen = 1,
    Schliessend = 2,
    Geschlossen = 3,
}

impl VerbindungsZustand {
    fn aus_u8(wert: u8) -> Self {
        match wert {
            0 => Self::Verbindend,
            1 => Self::Offen,
            2 => Self::Schliessend,
            _ => Self::Geschlossen,
        }
    }

    /// Schliessend/Geschlossen nehmen keine Nachrichten mehr an
    pub fn ist_zustellbar(self) -> bool {
        matches!(self, Self::Verbindend | Self::Offen)
    }
}

// ---------------------------------------------------------------------------
// VerbindungsHandle
// ---------------------------------------------------------------------------

/// Handle auf die Send-Queue und den Zustand einer Verbindung
///
/// Clone teilt Queue und Zustand.
#[derive(Clone, Debug)]
pub struct VerbindungsHandle {
    tx: mpsc::Sender<String>,
    zustand: Arc<AtomicU8>,
}

impl VerbindungsHandle {
    /// Erstellt ein Handle im Zustand `Verbindend`
    pub fn neu(tx: mpsc::Sender<String>) -> Self {
        Self {
            tx,
            zustand: Arc::new(AtomicU8::new(VerbindungsZustand::Verbindend as u8)),
        }
    }

    /// Erstellt Handle und zugehoerige Empfangs-Queue
    pub fn kanal(groesse: usize) -> (Self, mpsc::Receiver<String>) {
        let (tx, rx) = mpsc::channel(groesse);
        (Self::neu(tx), rx)
    }

    pub fn zustand(&self) -> VerbindungsZustand {
        VerbindungsZustand::aus_u8(self.zustand.load(Ordering::Acquire))
    }

    pub fn zustand_setzen(&self, zustand: VerbindungsZustand) {
        self.zustand.store(zustand as u8, Ordering::Release);
    }

    pub fn ist_offen(&self) -> bool {
        self.zustand() == VerbindungsZustand::Offen
    }

    /// Reiht einen serialisierten Umschlag nicht-blockierend ein
    pub fn senden(&self, text: String) -> SignalingResult<()> {
        if !self.zustand().ist_zustellbar() {
            return Err(SignalingError::SendFehler);
        }

        match self.tx.try_send(text) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!("Send-Queue voll – Nachricht verworfen");
                Err(SignalingError::SendFehler)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                tracing::debug!("Send-Queue geschlossen (Client getrennt)");
                Err(SignalingError::SendFehler)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn neues_handle_ist_verbindend() {
        let (handle, _rx) = VerbindungsHandle::kanal(4);
        assert_eq!(handle.zustand(), VerbindungsZustand::Verbindend);
        assert!(!handle.ist_offen());
    }

    #[test]
    fn zustand_wird_zwischen_klonen_geteilt() {
        let (handle, _rx) = VerbindungsHandle::kanal(4);
        let klon = handle.clone();
        handle.zustand_setzen(VerbindungsZustand::Offen);
        assert!(klon.ist_offen());
    }

    #[test]
    fn senden_reiht_ein() {
        let (handle, mut rx) = VerbindungsHandle::kanal(4);
        handle.senden("hallo".into()).unwrap();
        assert_eq!(rx.try_recv().unwrap(), "hallo");
    }

    #[test]
    fn volle_queue_verwirft() {
        let (handle, _rx) = VerbindungsHandle::kanal(1);
        assert!(handle.senden("eins".into()).is_ok());
        assert!(handle.senden("zwei".into()).is_err());
    }

    #[test]
    fn geschlossene_verbindung_nimmt_nichts_an() {
        let (handle, mut rx) = VerbindungsHandle::kanal(4);
        handle.zustand_setzen(VerbindungsZustand::Schliessend);
        assert!(handle.senden("x".into()).is_err());
        handle.zustand_setzen(VerbindungsZustand::Geschlossen);
        assert!(handle.senden("x".into()).is_err());
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn verworfene_queue_ist_fehler() {
        let (handle, rx) = VerbindungsHandle::kanal(4);
        drop(rx);
        assert!(handle.senden("x".into()).is_err());
    }
}
