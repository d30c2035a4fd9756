//! rendezvous-core – Gemeinsame Typen und Fehlertypen
//!
//! Dieses Crate stellt die fundamentalen Bausteine bereit, die von allen
//! anderen Rendezvous-Crates gemeinsam genutzt werden: Verbindungs-Handles,
//! Matching-Filter und den zentralen Fehler-Enum.

pub mod error;
pub mod types;

// Re-Exporte fuer bequemen Zugriff
pub use error::{RendezvousError, Result};
pub use types::{ConnectionId, Filter};
