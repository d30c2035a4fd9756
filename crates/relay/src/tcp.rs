//! TCP-Listener – Bindet Socket, akzeptiert Verbindungen
//!
//! Der `RelayServer` bindet einen TCP-Socket und startet fuer jede
//! eingehende Verbindung einen eigenen tokio-Task mit einer
//! `ClientConnection`. Das Client-Limit wird vor dem Task-Start
//! geprueft; abgelehnte Verbindungen werden kommentarlos geschlossen.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;

use rendezvous_reports::ReportStore;

use crate::connection::ClientConnection;
use crate::state::RelayState;

/// TCP-Relay-Server
pub struct RelayServer<S: ReportStore> {
    state: Arc<RelayState<S>>,
    bind_addr: SocketAddr,
}

impl<S: ReportStore> RelayServer<S> {
    pub fn neu(state: Arc<RelayState<S>>, bind_addr: SocketAddr) -> Self {
        Self { state, bind_addr }
    }

    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Startet den TCP-Listener und akzeptiert Verbindungen
    ///
    /// Laeuft bis `shutdown_rx` ein `true`-Signal empfaengt.
    pub async fn starten(
        self,
        mut shutdown_rx: tokio::sync::watch::Receiver<bool>,
    ) -> std::io::Result<()> {
        let listener = TcpListener::bind(self.bind_addr).await?;
        let lokale_addr = listener.local_addr()?;

        tracing::info!(adresse = %lokale_addr, "TCP-Relay gestartet");

        loop {
            tokio::select! {
                // Neue eingehende Verbindung
                result = listener.accept() => {
                    match result {
                        Ok((stream, peer_addr)) => {
                            let online = self.state.registry.online_anzahl() as u32;
                            if online >= self.state.config.max_clients {
                                tracing::warn!(
                                    peer = %peer_addr,
                                    max = self.state.config.max_clients,
                                    "Server voll, Verbindung abgelehnt"
                                );
                                drop(stream);
                                continue;
                            }

                            tracing::debug!(peer = %peer_addr, "Verbindung akzeptiert");

                            let verbindung =
                                ClientConnection::neu(Arc::clone(&self.state), peer_addr);
                            let shutdown_rx_clone = shutdown_rx.clone();

                            tokio::spawn(async move {
                                verbindung.verarbeiten(stream, shutdown_rx_clone).await;
                            });
                        }
                        Err(e) => {
                            tracing::error!(fehler = %e, "TCP-Accept-Fehler");
                            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                        }
                    }
                }

                // Shutdown-Signal
                Ok(()) = shutdown_rx.changed() => {
                    if *shutdown_rx.borrow() {
                        tracing::info!("Relay: Shutdown-Signal empfangen");
                        break;
                    }
                }
            }
        }

        tracing::info!("TCP-Relay gestoppt");
        Ok(())
    }
}
