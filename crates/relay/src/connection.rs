//! Client-Connection – Verwaltet eine einzelne TCP-Verbindung
//!
//! Jede Verbindung bekommt ein frisches Handle und laeuft in einem
//! eigenen tokio-Task. Als erstes Ereignis geht `Welcome` mit dem
//! Handle raus, danach uebernimmt die Select-Loop: eingehende Frames,
//! ausgehende Kommandos aus der Registry, Idle-Timeout und Shutdown.
//!
//! ## Keepalive
//! Der Client haelt die Verbindung mit `Ping` am Leben; das Relay
//! antwortet mit `Pong`. Kommt laenger als `verbindungs_timeout_sek`
//! kein Frame an, wird die Verbindung getrennt.

use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::Framed;

use rendezvous_core::ConnectionId;
use rendezvous_protocol::{RelayCodec, ServerEvent};
use rendezvous_reports::ReportStore;

use crate::dispatcher::EventDispatcher;
use crate::registry::{ClientCommand, SENDE_QUEUE_GROESSE};
use crate::state::RelayState;

/// Verarbeitet eine einzelne TCP-Verbindung
pub struct ClientConnection<S: ReportStore> {
    state: Arc<RelayState<S>>,
    handle: ConnectionId,
    peer_addr: SocketAddr,
}

impl<S: ReportStore> ClientConnection<S> {
    pub fn neu(state: Arc<RelayState<S>>, peer_addr: SocketAddr) -> Self {
        Self {
            state,
            handle: ConnectionId::new(),
            peer_addr,
        }
    }

    pub fn handle(&self) -> ConnectionId {
        self.handle
    }

    /// Startet die Verbindungs-Verarbeitungsschleife
    ///
    /// Laeuft bis die Verbindung getrennt wird, das Idle-Timeout
    /// zuschlaegt oder ein Shutdown-Signal eingeht.
    pub async fn verarbeiten(
        self,
        stream: TcpStream,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) {
        let handle = self.handle;
        let peer_addr = self.peer_addr;
        let timeout_dauer = Duration::from_secs(self.state.config.verbindungs_timeout_sek);

        tracing::info!(peer = %peer_addr, handle = %handle, "Neue Verbindung");

        let mut framed = Framed::new(stream, RelayCodec::neu());

        // Handle zuteilen, bevor irgendein anderes Ereignis rausgeht
        if let Err(e) = framed.send(ServerEvent::Welcome { handle }).await {
            tracing::warn!(peer = %peer_addr, fehler = %e, "Welcome-Senden fehlgeschlagen");
            return;
        }

        let dispatcher = EventDispatcher::neu(Arc::clone(&self.state));
        let (sende_tx, mut sende_rx) = mpsc::channel::<ClientCommand>(SENDE_QUEUE_GROESSE);
        dispatcher.verbinden(handle, sende_tx);

        let mut letzter_empfang = Instant::now();

        loop {
            let verbleibend = timeout_dauer
                .checked_sub(letzter_empfang.elapsed())
                .unwrap_or(Duration::ZERO);

            tokio::select! {
                // Eingehendes Ereignis vom Client
                frame = framed.next() => {
                    match frame {
                        Some(Ok(event)) => {
                            letzter_empfang = Instant::now();
                            if let Err(e) = dispatcher.dispatch(handle, event).await {
                                if e.ist_terminal() {
                                    tracing::info!(
                                        handle = %handle,
                                        grund = %e,
                                        "Verbindung wird beendet"
                                    );
                                    // Bereits eingereihte Ereignisse (z. B. Blocked)
                                    // noch zustellen, bevor der Stream zugeht
                                    while let Ok(ClientCommand::Senden(event)) = sende_rx.try_recv() {
                                        if framed.send(event).await.is_err() {
                                            break;
                                        }
                                    }
                                    break;
                                }
                                // Ereignis-Fehler: verwerfen, Verbindung lebt weiter
                                tracing::debug!(handle = %handle, fehler = %e, "Ereignis verworfen");
                            }
                        }
                        Some(Err(e)) => {
                            tracing::warn!(peer = %peer_addr, fehler = %e, "Frame-Lesefehler");
                            break;
                        }
                        None => {
                            tracing::info!(peer = %peer_addr, handle = %handle, "Verbindung vom Client getrennt");
                            break;
                        }
                    }
                }

                // Ausgehendes Kommando aus Dispatcher oder Ledger
                Some(kommando) = sende_rx.recv() => {
                    match kommando {
                        ClientCommand::Senden(event) => {
                            if let Err(e) = framed.send(event).await {
                                tracing::warn!(peer = %peer_addr, fehler = %e, "Senden fehlgeschlagen");
                                break;
                            }
                        }
                        ClientCommand::Schliessen => {
                            tracing::info!(handle = %handle, "Zwangstrennung");
                            break;
                        }
                    }
                }

                // Idle-Timeout
                _ = tokio::time::sleep(verbleibend) => {
                    tracing::warn!(peer = %peer_addr, handle = %handle, "Verbindungs-Timeout");
                    break;
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!(handle = %handle, "Shutdown-Signal, Verbindung wird getrennt");
                        break;
                    }
                }
            }
        }

        // Cleanup: Queue, Sitzung, Registry, Presence-Broadcast
        dispatcher.getrennt(&handle);
        tracing::info!(peer = %peer_addr, handle = %handle, "Verbindungs-Task beendet");
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
