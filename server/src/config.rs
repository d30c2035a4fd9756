//! Server-Konfiguration
//!
//! Wird beim Start aus einer TOML-Datei geladen. Alle Felder haben
//! sinnvolle Standardwerte, sodass das Relay ohne Konfigurationsdatei
//! lauffaehig ist.

use rendezvous_relay::RelayConfig;
use serde::{Deserialize, Serialize};

/// Vollstaendige Server-Konfiguration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
#[derive(Default)]
pub struct ServerConfig {
    /// Allgemeine Server-Einstellungen
    pub server: ServerEinstellungen,
    /// Netzwerk-Einstellungen
    pub netzwerk: NetzwerkEinstellungen,
    /// Matchmaking- und Report-Einstellungen
    pub vermittlung: VermittlungsEinstellungen,
    /// Speicher-Einstellungen fuer den Report-Ledger
    pub speicher: SpeicherEinstellungen,
    /// Logging-Einstellungen
    pub logging: LoggingEinstellungen,
}

/// Allgemeine Server-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerEinstellungen {
    /// Anzeigename des Servers
    pub name: String,
    /// Maximale Anzahl gleichzeitiger Verbindungen
    pub max_clients: u32,
    /// Trennung nach so vielen Sekunden ohne eingehenden Frame
    pub verbindungs_timeout_sek: u64,
}

impl Default for ServerEinstellungen {
    fn default() -> Self {
        Self {
            name: "Rendezvous Relay".into(),
            max_clients: 10_000,
            verbindungs_timeout_sek: 60,
        }
    }
}

/// Netzwerk-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetzwerkEinstellungen {
    /// Bind-Adresse fuer den TCP-Listener
    pub bind_adresse: String,
    /// Port fuer den TCP-Listener
    pub tcp_port: u16,
}

impl Default for NetzwerkEinstellungen {
    fn default() -> Self {
        Self {
            bind_adresse: "0.0.0.0".into(),
            tcp_port: 7447,
        }
    }
}

/// Matchmaking- und Report-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VermittlungsEinstellungen {
    /// Report-Anzahl ab der eine Identitaet blockiert wird (mindestens 1)
    pub report_schwelle: u32,
    /// Unterstuetzte Gruppengroessen
    pub gruppen_groessen: Vec<u8>,
    /// Filter auch fuer Gruppengroessen > 1 pruefen
    pub filter_ueber_eins: bool,
}

impl Default for VermittlungsEinstellungen {
    fn default() -> Self {
        Self {
            report_schwelle: 3,
            gruppen_groessen: vec![1, 2, 3],
            filter_ueber_eins: false,
        }
    }
}

/// Speicher-Einstellungen fuer den Report-Ledger
///
/// "memory" ist der einzige eingebaute Typ; ein externer Store haengt
/// sich ueber den `ReportStore`-Trait ein.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeicherEinstellungen {
    /// Speicher-Typ: "memory"
    pub typ: String,
}

impl Default for SpeicherEinstellungen {
    fn default() -> Self {
        Self { typ: "memory".into() }
    }
}

/// Logging-Einstellungen
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingEinstellungen {
    /// Log-Level: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Format: "json" oder "text"
    pub format: String,
}

impl Default for LoggingEinstellungen {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: "text".into(),
        }
    }
}

impl ServerConfig {
    /// Laedt die Konfiguration aus einer TOML-Datei.
    /// Gibt die Standardkonfiguration zurueck wenn die Datei nicht existiert.
    pub fn laden(pfad: &str) -> anyhow::Result<Self> {
        match std::fs::read_to_string(pfad) {
            Ok(inhalt) => {
                let config: Self = toml::from_str(&inhalt)
                    .map_err(|e| anyhow::anyhow!("Konfigurationsfehler in '{pfad}': {e}"))?;
                Ok(config)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(
                    pfad = pfad,
                    "Konfigurationsdatei nicht gefunden, verwende Standardwerte"
                );
                Ok(Self::default())
            }
            Err(e) => Err(anyhow::anyhow!(
                "Konfigurationsdatei '{pfad}' nicht lesbar: {e}"
            )),
        }
    }

    /// Gibt die vollstaendige Bind-Adresse fuer TCP zurueck
    pub fn tcp_bind_adresse(&self) -> String {
        format!("{}:{}", self.netzwerk.bind_adresse, self.netzwerk.tcp_port)
    }

    /// Uebersetzt die Konfiguration in die Relay-Laufzeit-Konfiguration
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig {
            report_schwelle: self.vermittlung.report_schwelle,
            gruppen_groessen: self.vermittlung.gruppen_groessen.clone(),
            filter_ueber_eins: self.vermittlung.filter_ueber_eins,
            max_clients: self.server.max_clients,
            verbindungs_timeout_sek: self.server.verbindungs_timeout_sek,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standard_config_ist_valide() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.server.max_clients, 10_000);
        assert_eq!(cfg.netzwerk.tcp_port, 7447);
        assert_eq!(cfg.vermittlung.report_schwelle, 3);
        assert_eq!(cfg.vermittlung.gruppen_groessen, vec![1, 2, 3]);
        assert_eq!(cfg.speicher.typ, "memory");
        assert_eq!(cfg.logging.level, "info");
    }

    #[test]
    fn bind_adresse() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.tcp_bind_adresse(), "0.0.0.0:7447");
    }

    #[test]
    fn config_aus_toml_string() {
        let toml = r#"
            [server]
            name = "Mein Relay"
            max_clients = 100

            [netzwerk]
            tcp_port = 10000

            [vermittlung]
            report_schwelle = 5
            gruppen_groessen = [1, 2]
        "#;
        let cfg: ServerConfig = toml::from_str(toml).unwrap();
        assert_eq!(cfg.server.name, "Mein Relay");
        assert_eq!(cfg.server.max_clients, 100);
        assert_eq!(cfg.netzwerk.tcp_port, 10000);
        assert_eq!(cfg.vermittlung.report_schwelle, 5);
        assert_eq!(cfg.vermittlung.gruppen_groessen, vec![1, 2]);
        // Nicht angegebene Felder behalten Standardwerte
        assert!(!cfg.vermittlung.filter_ueber_eins);
        assert_eq!(cfg.netzwerk.bind_adresse, "0.0.0.0");
    }

    #[test]
    fn relay_config_uebernimmt_werte() {
        let mut cfg = ServerConfig::default();
        cfg.vermittlung.report_schwelle = 7;
        cfg.vermittlung.filter_ueber_eins = true;

        let relay = cfg.relay_config();
        assert_eq!(relay.report_schwelle, 7);
        assert!(relay.filter_ueber_eins);
        assert_eq!(relay.max_clients, 10_000);
    }
}
