//! Geteilter Relay-Zustand
//!
//! Buendelt Registry, Vermittlungs-Zustand und Report-Komponenten fuer
//! Dispatcher, Verbindungs-Loops und TCP-Listener.
//!
//! Warteschlange und Sitzungen liegen gemeinsam hinter einer Sperre:
//! Matching-Entscheidungen muessen atomar gegenueber gleichzeitigen
//! Trennungen sein. Ein Handle, das bereits getrennt ist, darf nie mehr
//! in ein frisch erstelltes Match geraten.

use dashmap::DashMap;
use parking_lot::Mutex;
use std::sync::Arc;

use rendezvous_core::ConnectionId;
use rendezvous_matchmaking::MatchQueue;
use rendezvous_reports::{AdmissionController, ReportLedger, ReportStore};
use rendezvous_session::SessionManager;

use crate::registry::ConnectionRegistry;

/// Laufzeit-Konfiguration des Relays
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Report-Anzahl ab der eine Identitaet blockiert wird
    pub report_schwelle: u32,
    /// Unterstuetzte Gruppengroessen
    pub gruppen_groessen: Vec<u8>,
    /// Filter auch fuer Gruppengroessen > 1 pruefen
    pub filter_ueber_eins: bool,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_clients: u32,
    /// Trennung nach so vielen Sekunden ohne eingehenden Frame
    pub verbindungs_timeout_sek: u64,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            report_schwelle: 3,
            gruppen_groessen: vec![1, 2, 3],
            filter_ueber_eins: false,
            max_clients: 10_000,
            verbindungs_timeout_sek: 60,
        }
    }
}

/// Warteschlange und Sitzungen hinter einer gemeinsamen Sperre
///
/// Die Sperre ist der einzige Serialisierungs-Mechanismus des Relays.
/// Sie darf nie ueber einen await-Punkt gehalten werden.
pub struct Vermittlung {
    pub queue: MatchQueue,
    pub sitzungen: SessionManager,
}

/// Geteilter Zustand aller Relay-Komponenten
pub struct RelayState<S: ReportStore> {
    pub config: RelayConfig,
    pub registry: ConnectionRegistry,
    pub vermittlung: Mutex<Vermittlung>,
    pub admission: AdmissionController<S>,
    pub ledger: ReportLedger<S>,
    /// Handle -> dauerhafte Identitaet (gesetzt beim ersten Join)
    pub identitaeten: DashMap<ConnectionId, String>,
}

impl<S: ReportStore> RelayState<S> {
    /// Erstellt den Relay-Zustand aus Konfiguration und Report-Store
    pub fn neu(config: RelayConfig, store: Arc<S>) -> Self {
        let ledger = ReportLedger::neu(store, config.report_schwelle);
        let admission = AdmissionController::neu(ledger.clone());
        let vermittlung = Mutex::new(Vermittlung {
            queue: MatchQueue::neu(&config.gruppen_groessen, config.filter_ueber_eins),
            sitzungen: SessionManager::neu(),
        });

        Self {
            config,
            registry: ConnectionRegistry::neu(),
            vermittlung,
            admission,
            ledger,
            identitaeten: DashMap::new(),
        }
    }

    /// Dauerhafte Identitaet eines Handles
    ///
    /// Faellt auf den Handle-Schluessel zurueck, solange kein Join mit
    /// eigener Identitaet verarbeitet wurde.
    pub fn identitaet_von(&self, handle: &ConnectionId) -> String {
        self.identitaeten
            .get(handle)
            .map(|e| e.clone())
            .unwrap_or_else(|| handle.identity_key())
    }
}
