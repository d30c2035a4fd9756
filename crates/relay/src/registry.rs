//! Verbindungs-Registry – Verwaltet alle lebenden Verbindungen
//!
//! Jede Verbindung hinterlegt beim Aufbau einen mpsc-Sender, ueber den
//! Dispatcher und Ledger Ereignisse in die Verbindungs-Loop schieben.
//! Die Registry ist zugleich der Presence-Zaehler: wer registriert ist,
//! ist online.
//!
//! Die Zustellung ist nicht-blockierend: ein voller Kanal verwirft das
//! Ereignis mit einer Warnung statt den Absender aufzuhalten. Innerhalb
//! einer Verbindung bleibt die Reihenfolge durch den Kanal erhalten.

use dashmap::DashMap;
use parking_lot::Mutex;
use rendezvous_core::ConnectionId;
use rendezvous_protocol::ServerEvent;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Kapazitaet der Ausgangs-Queue pro Verbindung
pub const SENDE_QUEUE_GROESSE: usize = 64;

/// Kommandos an die Verbindungs-Loop
#[derive(Debug)]
pub enum ClientCommand {
    /// Ereignis an den Client senden
    Senden(ServerEvent),
    /// Verbindung serverseitig schliessen (Zwangstrennung)
    Schliessen,
}

/// Registry aller lebenden Verbindungen
///
/// Thread-safe via Arc + DashMap. Clone teilt den inneren Zustand.
#[derive(Clone)]
pub struct ConnectionRegistry {
    inner: Arc<RegistryInner>,
}

struct RegistryInner {
    verbindungen: DashMap<ConnectionId, mpsc::Sender<ClientCommand>>,
    /// Serialisiert Presence-Mutation und zugehoerigen Broadcast, damit
    /// jede Verbindung eine Zaehler-Sequenz sieht, die einer tatsaechlichen
    /// Abfolge der Verbindungsereignisse entspricht
    presence_sperre: Mutex<()>,
}

impl ConnectionRegistry {
    pub fn neu() -> Self {
        Self {
            inner: Arc::new(RegistryInner {
                verbindungen: DashMap::new(),
                presence_sperre: Mutex::new(()),
            }),
        }
    }

    /// Registriert eine Verbindung und broadcastet den neuen Presence-Zaehler
    ///
    /// Eintrag und Broadcast laufen atomar unter der Presence-Sperre.
    pub fn registrieren(&self, handle: ConnectionId, tx: mpsc::Sender<ClientCommand>) {
        let _sperre = self.inner.presence_sperre.lock();
        self.inner.verbindungen.insert(handle, tx);
        tracing::info!(handle = %handle, online = self.online_anzahl(), "Verbindung registriert");
        self.online_anzahl_broadcasten();
    }

    /// Entfernt eine Verbindung und broadcastet den neuen Presence-Zaehler
    ///
    /// Gibt `true` zurueck wenn sie registriert war; nur dann geht ein
    /// Broadcast raus.
    pub fn entfernen(&self, handle: &ConnectionId) -> bool {
        let _sperre = self.inner.presence_sperre.lock();
        let entfernt = self.inner.verbindungen.remove(handle).is_some();
        if entfernt {
            tracing::info!(handle = %handle, online = self.online_anzahl(), "Verbindung entfernt");
            self.online_anzahl_broadcasten();
        }
        entfernt
    }

    pub fn ist_registriert(&self, handle: &ConnectionId) -> bool {
        self.inner.verbindungen.contains_key(handle)
    }

    /// Anzahl der aktuell registrierten Verbindungen (Presence-Zaehler)
    pub fn online_anzahl(&self) -> usize {
        self.inner.verbindungen.len()
    }

    /// Sendet ein Ereignis an eine Verbindung
    ///
    /// Gibt `false` zurueck, wenn die Verbindung unbekannt ist oder ihre
    /// Queue voll/geschlossen war. Das Ereignis ist dann verloren.
    pub fn senden(&self, handle: &ConnectionId, event: ServerEvent) -> bool {
        let Some(tx) = self.inner.verbindungen.get(handle) else {
            tracing::debug!(handle = %handle, "Senden an unbekanntes Handle verworfen");
            return false;
        };

        match tx.try_send(ClientCommand::Senden(event)) {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(handle = %handle, fehler = %e, "Sende-Queue nicht erreichbar");
                false
            }
        }
    }

    /// Weist die Verbindungs-Loop eines Handles an, die Verbindung zu schliessen
    pub fn schliessen(&self, handle: &ConnectionId) {
        if let Some(tx) = self.inner.verbindungen.get(handle) {
            if let Err(e) = tx.try_send(ClientCommand::Schliessen) {
                tracing::warn!(handle = %handle, fehler = %e, "Schliessen-Kommando nicht zustellbar");
            }
        }
    }

    /// Broadcastet den aktuellen Presence-Zaehler an alle Verbindungen
    ///
    /// Laeuft stets unter der Presence-Sperre des Aufrufers.
    fn online_anzahl_broadcasten(&self) {
        let n = self.online_anzahl();
        for eintrag in self.inner.verbindungen.iter() {
            let _ = eintrag
                .value()
                .try_send(ClientCommand::Senden(ServerEvent::OnlineCount { n }));
        }
        tracing::debug!(n, "Online-Zaehler gebroadcastet");
    }
}

impl Default for ConnectionRegistry {
    fn default() -> Self {
        Self::neu()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn verbinden(registry: &ConnectionRegistry) -> (ConnectionId, mpsc::Receiver<ClientCommand>) {
        let handle = ConnectionId::new();
        let (tx, rx) = mpsc::channel(SENDE_QUEUE_GROESSE);
        registry.registrieren(handle, tx);
        (handle, rx)
    }

    /// Leert die Queue und gibt die Online-Zaehler-Werte zurueck
    fn online_counts(rx: &mut mpsc::Receiver<ClientCommand>) -> Vec<usize> {
        let mut zaehler = Vec::new();
        while let Ok(kommando) = rx.try_recv() {
            if let ClientCommand::Senden(ServerEvent::OnlineCount { n }) = kommando {
                zaehler.push(n);
            }
        }
        zaehler
    }

    #[tokio::test]
    async fn registrieren_und_entfernen() {
        let registry = ConnectionRegistry::neu();
        let (handle, _rx) = verbinden(&registry);

        assert!(registry.ist_registriert(&handle));
        assert_eq!(registry.online_anzahl(), 1);

        assert!(registry.entfernen(&handle));
        assert!(!registry.entfernen(&handle));
        assert_eq!(registry.online_anzahl(), 0);
    }

    #[tokio::test]
    async fn senden_erreicht_die_queue() {
        let registry = ConnectionRegistry::neu();
        let (handle, mut rx) = verbinden(&registry);
        online_counts(&mut rx);

        assert!(registry.senden(&handle, ServerEvent::PartnerLeft));
        let kommando = rx.try_recv().expect("Kommando erwartet");
        assert!(matches!(
            kommando,
            ClientCommand::Senden(ServerEvent::PartnerLeft)
        ));
    }

    #[tokio::test]
    async fn senden_an_unbekanntes_handle_schlaegt_fehl() {
        let registry = ConnectionRegistry::neu();
        assert!(!registry.senden(&ConnectionId::new(), ServerEvent::PartnerLeft));
    }

    #[tokio::test]
    async fn presence_aenderungen_werden_gebroadcastet() {
        let registry = ConnectionRegistry::neu();
        let (_a, mut rx_a) = verbinden(&registry);
        let (b, mut rx_b) = verbinden(&registry);

        assert_eq!(online_counts(&mut rx_a), vec![1, 2]);
        assert_eq!(online_counts(&mut rx_b), vec![2]);

        registry.entfernen(&b);
        assert_eq!(online_counts(&mut rx_a), vec![1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn gleichzeitige_verbindungen_zaehlen_streng_monoton() {
        // Eintrag und Broadcast muessen atomar sein: jede Verbindung sieht
        // eine streng steigende Zaehler-Sequenz, keine Doppelwerte.
        let registry = ConnectionRegistry::neu();
        let (_erste, mut rx) = verbinden(&registry);

        let mut tasks = Vec::new();
        for _ in 0..16 {
            let registry = registry.clone();
            tasks.push(tokio::spawn(async move {
                let (tx, rx) = mpsc::channel(SENDE_QUEUE_GROESSE);
                registry.registrieren(ConnectionId::new(), tx);
                rx
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }

        let gesehen = online_counts(&mut rx);
        assert_eq!(*gesehen.last().unwrap(), 17);
        for paar in gesehen.windows(2) {
            assert!(paar[0] < paar[1], "Zaehler-Sequenz {gesehen:?} nicht streng steigend");
        }
    }

    #[tokio::test]
    async fn schliessen_kommando_kommt_an() {
        let registry = ConnectionRegistry::neu();
        let (handle, mut rx) = verbinden(&registry);
        online_counts(&mut rx);

        registry.schliessen(&handle);
        assert!(matches!(
            rx.try_recv().expect("Kommando erwartet"),
            ClientCommand::Schliessen
        ));
    }
}
