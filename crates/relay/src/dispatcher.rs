//! Event-Dispatcher – Verarbeitet Client-Ereignisse
//!
//! Der Dispatcher ist die einzige Stelle, die Warteschlange, Sitzungen
//! und Report-Ledger mutiert. Jedes eingehende Ereignis ist eine
//! abgeschlossene Arbeitseinheit; die Vermittlungs-Sperre wird nur fuer
//! die synchronen Mutationen gehalten und nie ueber einen await-Punkt.
//!
//! ## Fehlersemantik
//! Ereignis-Fehler (ungueltiges Ziel, ungueltige Groesse) verwerfen nur
//! das Ereignis; die Verbindung lebt weiter und der Sender bekommt keine
//! Fehlermeldung. Terminale Fehler (`Blockiert`) beenden die Verbindung.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use rendezvous_core::{ConnectionId, RendezvousError, Result};
use rendezvous_protocol::events::{
    ChatText, JoinRequest, ReportRequest, SignalForward, SignalPayload,
};
use rendezvous_protocol::{ClientEvent, ServerEvent};
use rendezvous_reports::ReportStore;

use crate::registry::ClientCommand;
use crate::state::{RelayState, Vermittlung};

/// Unix-Zeit in Millisekunden
fn jetzt_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Zentraler Event-Dispatcher
pub struct EventDispatcher<S: ReportStore> {
    state: Arc<RelayState<S>>,
}

impl<S: ReportStore> Clone for EventDispatcher<S> {
    fn clone(&self) -> Self {
        Self {
            state: Arc::clone(&self.state),
        }
    }
}

impl<S: ReportStore> EventDispatcher<S> {
    pub fn neu(state: Arc<RelayState<S>>) -> Self {
        Self { state }
    }

    /// Registriert eine neue Verbindung (broadcastet den Presence-Zaehler)
    pub fn verbinden(&self, handle: ConnectionId, tx: mpsc::Sender<ClientCommand>) {
        self.state.registry.registrieren(handle, tx);
    }

    /// Verarbeitet ein Client-Ereignis
    pub async fn dispatch(&self, handle: ConnectionId, event: ClientEvent) -> Result<()> {
        match event {
            ClientEvent::Join(req) => self.beitreten(handle, req).await,
            ClientEvent::Signal(payload) => self.signal_weiterleiten(&handle, payload),
            ClientEvent::ChatMessage(text) => self.chat_weiterleiten(&handle, text),
            ClientEvent::ReportUser(req) => self.melden(&handle, req),
            ClientEvent::Ping(ping) => {
                self.state
                    .registry
                    .senden(&handle, ServerEvent::pong(ping.timestamp_ms, jetzt_ms()));
                Ok(())
            }
        }
    }

    /// Join: Zulassung pruefen, einreihen, Match versuchen
    ///
    /// Die Zulassungspruefung laeuft vor der Sperre; Einreihen, Matching,
    /// Sitzungserstellung und Benachrichtigung bilden danach einen
    /// atomaren Block. Damit kann kein bereits getrenntes Handle in ein
    /// frisches Match geraten und kein `PartnerLeft` eine noch nicht
    /// zugestellte Match-Benachrichtigung ueberholen.
    async fn beitreten(&self, handle: ConnectionId, req: JoinRequest) -> Result<()> {
        let identitaet = req
            .identity
            .clone()
            .unwrap_or_else(|| handle.identity_key());
        self.state.identitaeten.insert(handle, identitaet.clone());

        if let Err(e) = self.state.admission.pruefen(&identitaet).await {
            self.state.registry.senden(&handle, ServerEvent::Blocked);
            self.state.registry.schliessen(&handle);
            return Err(e);
        }

        let mut v = self.state.vermittlung.lock();
        if v.sitzungen.hat_sitzung(&handle) {
            return Err(RendezvousError::UngueltigeNachricht(
                "Join mit aktiver Sitzung".into(),
            ));
        }

        v.queue.einreihen(handle, req.filter, req.group_size)?;
        self.match_vermitteln(&mut v, req.group_size);

        Ok(())
    }

    /// Versucht ein Match fuer eine Groesse und benachrichtigt beide Seiten
    ///
    /// Laeuft unter der Vermittlungs-Sperre des Aufrufers: `senden` ist
    /// nicht-blockierendes `try_send`, die Zustellreihenfolge pro
    /// Empfaenger folgt damit der Sperr-Reihenfolge. Gibt `true` zurueck
    /// wenn ein Match zustande kam.
    fn match_vermitteln(&self, v: &mut Vermittlung, groesse: u8) -> bool {
        let Some((erste, zweite)) = v.queue.match_versuchen(groesse) else {
            return false;
        };

        let a = erste.handles();
        let b = zweite.handles();
        v.sitzungen.sitzung_erstellen(&a, &b);

        info!(
            initiator_gruppe = a.len(),
            gegner_gruppe = b.len(),
            "Match vermittelt"
        );
        // Die laenger wartende Gruppe ist die Initiator-Seite
        for mitglied in &a {
            self.state
                .registry
                .senden(mitglied, ServerEvent::gematcht(b.clone(), true));
        }
        for mitglied in &b {
            self.state
                .registry
                .senden(mitglied, ServerEvent::gematcht(a.clone(), false));
        }
        true
    }

    /// Leitet eine Signaling-Payload an einen Gegner weiter
    ///
    /// Ziele ausserhalb der Gegnermenge werden verworfen und geloggt,
    /// ohne Rueckmeldung an den Sender.
    fn signal_weiterleiten(&self, handle: &ConnectionId, payload: SignalPayload) -> Result<()> {
        let erlaubt = self
            .state
            .vermittlung
            .lock()
            .sitzungen
            .ist_gegner(handle, &payload.to);

        if !erlaubt {
            debug!(von = %handle, ziel = %payload.to, "Signal an fremdes Handle verworfen");
            return Err(RendezvousError::UngueltigesZiel(payload.to.to_string()));
        }

        self.state.registry.senden(
            &payload.to,
            ServerEvent::Signal(SignalForward {
                from: *handle,
                data: payload.data,
            }),
        );
        Ok(())
    }

    /// Leitet Chat-Text an alle aktuellen Gegner weiter (kein Echo)
    fn chat_weiterleiten(&self, handle: &ConnectionId, text: ChatText) -> Result<()> {
        let gegner = self
            .state
            .vermittlung
            .lock()
            .sitzungen
            .gegner(handle)
            .map(<[ConnectionId]>::to_vec);

        let Some(gegner) = gegner else {
            debug!(von = %handle, "Chat ohne aktive Sitzung verworfen");
            return Err(RendezvousError::UngueltigesZiel(
                "keine aktive Sitzung".into(),
            ));
        };

        for ziel in &gegner {
            self.state
                .registry
                .senden(ziel, ServerEvent::ChatMessage(text.clone()));
        }
        Ok(())
    }

    /// Verarbeitet eine Meldung gegen ein anderes Handle
    ///
    /// Der Zaehler laeuft gegen die dauerhafte Identitaet des Ziels.
    /// Erreicht genau dieses Inkrement die Schwelle, wird das Ziel
    /// zwangsgetrennt; weitere Meldungen loesen keine zweite Trennung aus.
    fn melden(&self, handle: &ConnectionId, req: ReportRequest) -> Result<()> {
        if !self.state.registry.ist_registriert(&req.target) {
            debug!(von = %handle, ziel = %req.target, "Meldung gegen unbekanntes Handle verworfen");
            return Err(RendezvousError::UngueltigesZiel(req.target.to_string()));
        }

        let identitaet = self.state.identitaet_von(&req.target);
        let stand = self.state.ledger.melden(&identitaet);
        info!(von = %handle, ziel = %req.target, stand, "Meldung verarbeitet");

        if self.state.ledger.hat_schwelle_erreicht(stand) {
            warn!(ziel = %req.target, stand, "Report-Schwelle erreicht, Zwangstrennung");
            self.state.registry.senden(&req.target, ServerEvent::Blocked);
            self.state.registry.schliessen(&req.target);
        }
        Ok(())
    }

    /// Bereinigt eine getrennte Verbindung
    ///
    /// Entfernt das Handle atomar aus Warteschlange und Sitzung; danach
    /// kann kein Matching-Versuch es mehr sehen. Ueberlebende der
    /// aufgeloesten Sitzung bekommen genau ein `PartnerLeft`, noch unter
    /// derselben Sperre, damit es keine spaeter erstellte
    /// Match-Benachrichtigung ueberholen kann.
    pub fn getrennt(&self, handle: &ConnectionId) {
        let ueberlebende = {
            let mut v = self.state.vermittlung.lock();

            if v.queue.entfernen(handle) {
                // Der Austritt kann eine Restgruppe wieder aufgefuellt
                // haben; neu gebildete volle Gruppen sofort vermitteln
                for groesse in v.queue.groessen() {
                    while self.match_vermitteln(&mut v, groesse) {}
                }
            }

            let ueberlebende = v.sitzungen.aufloesen(handle);
            for mitglied in &ueberlebende {
                self.state.registry.senden(mitglied, ServerEvent::PartnerLeft);
            }
            ueberlebende
        };

        self.state.identitaeten.remove(handle);
        self.state.registry.entfernen(handle);

        debug!(handle = %handle, ueberlebende = ueberlebende.len(), "Verbindung bereinigt");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
