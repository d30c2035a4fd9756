//! rendezvous-protocol – Ereignis-Protokoll zwischen Client und Relay
//!
//! Definiert die typsicheren Ereignis-Enums in beide Richtungen sowie das
//! Frame-Format fuer die TCP-Verbindung.
//!
//! ## Design
//! - Tagged Enums (`#[serde(tag = "type")]`) statt string-basiertem
//!   Event-Dispatch: das Protokoll wird erschoepfend gematcht und neue
//!   Varianten fallen zur Compilezeit auf.
//! - Signaling-Payloads bleiben opake JSON-Werte – das Relay interpretiert
//!   sie nie.

pub mod events;
pub mod wire;

// Re-Exporte fuer bequemen Zugriff
pub use events::{ClientEvent, ServerEvent};
pub use wire::{ClientCodec, RelayCodec};
