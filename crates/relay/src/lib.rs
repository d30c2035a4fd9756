//! rendezvous-relay – Verbindungs-Registry, Event-Dispatcher und TCP-Server
//!
//! Das Relay verbindet die zustandslosen Bausteine (Warteschlange,
//! Sitzungen, Report-Ledger) mit echten TCP-Verbindungen. Jede Verbindung
//! laeuft in einem eigenen tokio-Task; alle Mutationen an Warteschlange
//! und Sitzungen laufen hinter einer gemeinsamen Sperre, damit "Match
//! gefunden" und "Gegner gerade getrennt" sich nie ueberholen.

pub mod connection;
pub mod dispatcher;
pub mod registry;
pub mod state;
pub mod tcp;

pub use connection::ClientConnection;
pub use dispatcher::EventDispatcher;
pub use registry::{ClientCommand, ConnectionRegistry};
pub use state::{RelayConfig, RelayState};
pub use tcp::RelayServer;
