//! Ereignis-Definitionen (Client <-> Relay)
//!
//! Alle Ereignisse werden als JSON mit einem `type`-Tag uebertragen.
//! Client -> Relay: `ClientEvent`, Relay -> Client: `ServerEvent`.
//!
//! Signaling-Daten (`data`) und Chat-Texte werden unveraendert
//! durchgereicht; das Relay erzwingt kein Payload-Schema.

use rendezvous_core::{ConnectionId, Filter};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Client -> Relay
// ---------------------------------------------------------------------------

/// Warteschlange betreten
///
/// Muss das erste Ereignis nach dem Verbindungsaufbau sein. Nach einem
/// `PartnerLeft` darf der Client erneut joinen (kein Auto-Requeue).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JoinRequest {
    /// Gewuenschte Gruppengroesse (1 = klassischer 1:1-Chat)
    pub group_size: u8,
    /// Matching-Filter (fehlende Felder = Wildcard)
    #[serde(default)]
    pub filter: Filter,
    /// Optionale dauerhafte Identitaet fuer den Report-Ledger.
    /// Fehlt sie, zaehlt der Ledger gegen das Verbindungs-Handle.
    #[serde(default)]
    pub identity: Option<String>,
}

/// Opake Signaling-Payload an einen bestimmten Gegner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalPayload {
    /// Ziel-Handle (muss in der Gegnermenge des Senders liegen)
    pub to: ConnectionId,
    /// Unveraendert durchgereichte Verbindungs-Negotiation
    pub data: serde_json::Value,
}

/// Chat-Text an alle aktuellen Gegner
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatText {
    pub text: String,
}

/// Eine andere Verbindung melden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportRequest {
    pub target: ConnectionId,
}

/// Keepalive-Ping vom Client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingMessage {
    /// Unix-Timestamp in Millisekunden fuer RTT-Messung
    pub timestamp_ms: u64,
}

/// Alle Ereignisse die ein Client senden kann
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientEvent {
    Join(JoinRequest),
    Signal(SignalPayload),
    ChatMessage(ChatText),
    ReportUser(ReportRequest),
    Ping(PingMessage),
}

// ---------------------------------------------------------------------------
// Relay -> Client
// ---------------------------------------------------------------------------

/// Match gefunden
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchNotification {
    /// Handles der Gegner-Gruppe
    pub opponents: Vec<ConnectionId>,
    /// Genau eine Seite eines Paares ist Initiator (die zuerst wartende
    /// Gruppe). Das Relay propagiert das Flag nur; die Bedeutung gehoert
    /// der Peer-Transport-Schicht.
    pub initiator: bool,
}

/// Weitergeleitetes Signal eines Gegners
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignalForward {
    pub from: ConnectionId,
    pub data: serde_json::Value,
}

/// Pong-Antwort (spiegelt den Timestamp zurueck)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PongMessage {
    pub echo_timestamp_ms: u64,
    pub server_timestamp_ms: u64,
}

/// Alle Ereignisse die das Relay an einen Client sendet
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerEvent {
    /// Zugewiesenes Verbindungs-Handle, direkt nach dem Verbindungsaufbau
    Welcome { handle: ConnectionId },
    Match(MatchNotification),
    Signal(SignalForward),
    /// Chat-Text eines Gegners (kein Echo an den Sender)
    ChatMessage(ChatText),
    /// Der Gegner bzw. die gesamte Sitzung ist weg
    PartnerLeft,
    /// Aktueller Online-Zaehler, an alle bei jeder Aenderung
    OnlineCount { n: usize },
    Pong(PongMessage),
    /// Zulassung verweigert – die Verbindung wird anschliessend getrennt
    Blocked,
}

impl ServerEvent {
    /// Erstellt eine Pong-Antwort auf einen Client-Ping
    pub fn pong(echo_timestamp_ms: u64, server_timestamp_ms: u64) -> Self {
        Self::Pong(PongMessage {
            echo_timestamp_ms,
            server_timestamp_ms,
        })
    }

    /// Erstellt eine Match-Benachrichtigung
    pub fn gematcht(opponents: Vec<ConnectionId>, initiator: bool) -> Self {
        Self::Match(MatchNotification {
            opponents,
            initiator,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
