//! Integration-Tests fuer Router + Registry (ohne Netzwerk)
//!
//! Clients werden durch `VerbindungsHandle`-Queues simuliert.

use relais_core::{ConnectionId, FesteIds, UuidGenerator};
use relais_protocol::Envelope;
use relais_signaling::{Router, VerbindungsHandle, VerbindungsRegistry, VerbindungsZustand};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::mpsc;

struct Client {
    id: ConnectionId,
    rx: mpsc::Receiver<String>,
}

impl Client {
    fn naechste(&mut self) -> Option<Envelope> {
        self.rx
            .try_recv()
            .ok()
            .map(|t| Envelope::dekodieren(t.as_bytes()).expect("gueltiger Umschlag"))
    }
}

fn verbinden(router: &Router) -> Client {
    let (handle, mut rx) = VerbindungsHandle::kanal(32);
    handle.zustand_setzen(VerbindungsZustand::Offen);
    let id = router.verbindung_annehmen(handle);

    let begruessung = rx.try_recv().expect("socket_id muss zuerst kommen");
    let env = Envelope::dekodieren(begruessung.as_bytes()).unwrap();
    assert_eq!(env, Envelope::neu("socket_id", json!(id.as_str())));
    Client { id, rx }
}

fn senden(router: &Router, von: &Client, event: &str, data: Value) {
    let text = Envelope::neu(event, data).kodieren().unwrap();
    router.nachricht_verarbeiten(&von.id, text.as_bytes());
}

#[test]
fn szenario_update_nur_an_abonnenten() {
    let router = Router::neu(
        VerbindungsRegistry::neu(),
        Arc::new(FesteIds::neu(["a1", "b1", "c1"])),
    );
    let mut a = verbinden(&router);
    let mut b = verbinden(&router);
    let mut c = verbinden(&router);

    senden(&router, &a, "connectToPeer", json!({ "id": "b1" }));
    senden(&router, &b, "update", json!({ "x": 1 }));

    assert_eq!(a.naechste(), Some(Envelope::neu("update", json!({ "x": 1 }))));
    assert_eq!(a.naechste(), None);
    assert_eq!(b.naechste(), None);
    assert_eq!(c.naechste(), None);
}

#[test]
fn webrtc_handshake_ueber_relay() {
    let router = Router::neu(
        VerbindungsRegistry::neu(),
        Arc::new(FesteIds::neu(["anrufer", "angerufener"])),
    );
    let mut a = verbinden(&router);
    let mut b = verbinden(&router);

    senden(&router, &a, "logon", json!({ "to": "angerufener", "from": "anrufer" }));
    assert_eq!(b.naechste().unwrap().event_name, "logon");

    let angebot = json!({ "to": "angerufener", "from": "anrufer", "sdp": "offer" });
    senden(&router, &a, "offer", angebot.clone());
    assert_eq!(b.naechste(), Some(Envelope::neu("message", angebot)));

    let antwort = json!({ "to": "anrufer", "from": "angerufener", "sdp": "answer" });
    senden(&router, &b, "answer", antwort.clone());
    assert_eq!(a.naechste(), Some(Envelope::neu("message", antwort)));

    senden(&router, &a, "logoff", json!({ "to": "angerufener" }));
    assert_eq!(b.naechste().unwrap().event_name, "logoff");
}

#[test]
fn nach_disconnect_liefert_relay_disconnected() {
    let router = Router::neu(
        VerbindungsRegistry::neu(),
        Arc::new(FesteIds::neu(["a1", "b1"])),
    );
    let mut a = verbinden(&router);
    let b = verbinden(&router);

    router.verbindung_getrennt(&b.id);
    router.verbindung_getrennt(&b.id);

    senden(&router, &a, "chat", json!({ "to": "b1", "from": "a1" }));
    assert_eq!(a.naechste(), Some(Envelope::neu("disconnected", json!("a1"))));

    senden(&router, &a, "logon", json!({ "to": "b1" }));
    assert_eq!(
        a.naechste(),
        Some(Envelope::neu("error", json!("Does not exist on server.")))
    );
}

#[test]
fn kaputte_frames_beeinflussen_andere_nicht() {
    let router = Router::neu(
        VerbindungsRegistry::neu(),
        Arc::new(FesteIds::neu(["a1", "b1"])),
    );
    let mut a = verbinden(&router);
    let mut b = verbinden(&router);
    senden(&router, &a, "connectToPeer", json!({ "id": "b1" }));

    for kaputt in [&b"nicht json"[..], b"{}", b"{\"eventName\":null}", b"\xc3\x28"] {
        router.nachricht_verarbeiten(&b.id, kaputt);
    }
    assert_eq!(a.naechste(), None);
    assert_eq!(b.naechste(), None);
    assert_eq!(router.registry().peers_von("b1"), vec![a.id.clone()]);

    senden(&router, &b, "update", json!("weiter"));
    assert_eq!(a.naechste(), Some(Envelope::neu("update", json!("weiter"))));
}

#[test]
fn reihenfolge_pro_absender_bleibt_erhalten() {
    let router = Router::neu(
        VerbindungsRegistry::neu(),
        Arc::new(FesteIds::neu(["a1", "b1"])),
    );
    let a = verbinden(&router);
    let mut b = verbinden(&router);

    for i in 0..10 {
        senden(&router, &a, "seq", json!({ "to": "b1", "from": "a1", "n": i }));
    }
    for i in 0..10 {
        let env = b.naechste().expect("Nachricht fehlt");
        assert_eq!(env.data["n"], json!(i));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn parallele_connects_bekommen_eindeutige_ids() {
    let router = Arc::new(Router::neu(
        VerbindungsRegistry::neu(),
        Arc::new(UuidGenerator),
    ));

    let mut tasks = Vec::new();
    for _ in 0..100 {
        let router = Arc::clone(&router);
        tasks.push(tokio::spawn(async move {
            let (handle, mut rx) = VerbindungsHandle::kanal(4);
            handle.zustand_setzen(VerbindungsZustand::Offen);
            let id = router.verbindung_annehmen(handle);
            let env = Envelope::dekodieren(rx.try_recv().unwrap().as_bytes()).unwrap();
            assert_eq!(env.event_name, "socket_id");
            assert_eq!(env.data, json!(id.as_str()));
            id
        }));
    }

    let mut ids = HashSet::new();
    for t in tasks {
        assert!(ids.insert(t.await.unwrap()), "ID doppelt vergeben");
    }
    assert_eq!(router.registry().anzahl(), 100);

    for id in &ids {
        router.verbindung_getrennt(id);
    }
    assert_eq!(router.registry().anzahl(), 0);
}

#[test]
fn gleichzeitig_gezogene_id_wird_nur_einmal_vergeben() {
    // Die ersten acht gezogenen IDs sind identisch
    let router = Router::neu(
        VerbindungsRegistry::neu(),
        Arc::new(FesteIds::neu(vec!["doppelt"; 8])),
    );

    let clients: Vec<Client> = std::thread::scope(|s| {
        let threads: Vec<_> = (0..8)
            .map(|_| {
                s.spawn(|| {
                    let (handle, rx) = VerbindungsHandle::kanal(4);
                    handle.zustand_setzen(VerbindungsZustand::Offen);
                    let id = router.verbindung_annehmen(handle);
                    Client { id, rx }
                })
            })
            .collect();
        threads.into_iter().map(|t| t.join().unwrap()).collect()
    });

    let ids: HashSet<_> = clients.iter().map(|c| c.id.clone()).collect();
    assert_eq!(ids.len(), 8, "ID doppelt vergeben");
    assert_eq!(router.registry().anzahl(), 8);

    for mut client in clients {
        assert_eq!(
            client.naechste(),
            Some(Envelope::neu("socket_id", json!(client.id.as_str())))
        );
        assert_eq!(client.naechste(), None);
        assert!(router
            .registry()
            .nachschlagen(client.id.as_str())
            .expect("eigener Eintrag")
            .ist_offen());
        router.verbindung_getrennt(&client.id);
    }
    assert_eq!(router.registry().anzahl(), 0);
}
