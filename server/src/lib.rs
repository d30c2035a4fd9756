//! rendezvous-server – Bibliotheks-Root
//!
//! Verdrahtet Konfiguration, Report-Store und TCP-Relay und stellt den
//! Einstiegspunkt fuer Integrationstests bereit.

pub mod config;

use anyhow::Result;
use std::net::SocketAddr;
use std::sync::Arc;

use rendezvous_relay::{RelayServer, RelayState};
use rendezvous_reports::MemoryReportStore;

use config::ServerConfig;

/// Haelt den laufenden Server-Zustand zusammen
pub struct Server {
    pub config: ServerConfig,
}

impl Server {
    /// Erstellt einen neuen Server aus der gegebenen Konfiguration
    pub fn neu(config: ServerConfig) -> Self {
        Self { config }
    }

    /// Startet das Relay und laeuft bis zum Shutdown-Signal
    pub async fn starten(self) -> Result<()> {
        tracing::info!(
            server_name = %self.config.server.name,
            tcp = %self.config.tcp_bind_adresse(),
            report_schwelle = self.config.vermittlung.report_schwelle,
            gruppen_groessen = ?self.config.vermittlung.gruppen_groessen,
            "Server startet"
        );

        // Einziger eingebauter Store; ein externer Store haengt sich
        // ueber den ReportStore-Trait ein
        if self.config.speicher.typ != "memory" {
            anyhow::bail!(
                "Unbekannter Speicher-Typ '{}'",
                self.config.speicher.typ
            );
        }
        let store = Arc::new(MemoryReportStore::neu());

        let state = Arc::new(RelayState::neu(self.config.relay_config(), store));
        let bind_addr: SocketAddr = self
            .config
            .tcp_bind_adresse()
            .parse()
            .map_err(|e| anyhow::anyhow!("Ungueltige Bind-Adresse: {e}"))?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

        let relay = RelayServer::neu(state, bind_addr);
        let relay_task = tokio::spawn(relay.starten(shutdown_rx));

        tracing::info!("Server laeuft. Warte auf Shutdown-Signal (Ctrl-C)...");
        tokio::signal::ctrl_c().await?;
        tracing::info!("Shutdown-Signal empfangen, Server wird beendet");

        let _ = shutdown_tx.send(true);
        relay_task.await??;

        tracing::info!("Server beendet");
        Ok(())
    }
}
