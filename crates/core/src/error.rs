//! Fehlertypen fuer Rendezvous
//!
//! Zentraler Fehler-Enum der alle moeglichen Fehlerzustaende abdeckt.
//! Untermodule koennen eigene Fehler definieren und via `#[from]`
//! konvertieren. Kein Fehler eines einzelnen Clients darf den Prozess
//! beenden – im schlimmsten Fall wird die betroffene Verbindung getrennt.

use thiserror::Error;

/// Globaler Result-Alias fuer Rendezvous
pub type Result<T> = std::result::Result<T, RendezvousError>;

/// Alle moeglichen Fehler im Rendezvous-System
#[derive(Debug, Error)]
pub enum RendezvousError {
    // --- Zulassung ---
    /// Zulassung verweigert – Report-Schwelle erreicht. Terminal fuer die
    /// Verbindung, kein Retry.
    #[error("Verbindung blockiert: Report-Schwelle erreicht")]
    Blockiert,

    // --- Relay ---
    /// Signal oder Chat an ein Handle ohne aktive Beziehung. Wird verworfen
    /// und geloggt, nicht an den Sender gemeldet.
    #[error("Ungueltiges Ziel: {0}")]
    UngueltigesZiel(String),

    /// Client-Event ohne erforderliche Felder oder im falschen Zustand.
    /// Das Event wird verworfen.
    #[error("Ungueltige Nachricht: {0}")]
    UngueltigeNachricht(String),

    #[error("Nicht unterstuetzte Gruppengroesse: {0}")]
    UngueltigeGruppenGroesse(u8),

    // --- Speicher ---
    /// Persistenter Report-Schreibvorgang fehlgeschlagen. Wird geloggt;
    /// der In-Memory-Zaehler bleibt fuehrend.
    #[error("Speicher nicht verfuegbar: {0}")]
    SpeicherNichtVerfuegbar(String),

    // --- Verbindung ---
    #[error("Verbindung getrennt")]
    Getrennt,

    // --- Intern ---
    #[error("Interner Fehler: {0}")]
    Intern(String),

    #[error(transparent)]
    Anyhow(#[from] anyhow::Error),
}

impl RendezvousError {
    /// Erstellt einen internen Fehler aus einer beliebigen Nachricht
    pub fn intern(msg: impl Into<String>) -> Self {
        Self::Intern(msg.into())
    }

    /// Gibt true zurueck wenn die Verbindung nach diesem Fehler beendet wird
    pub fn ist_terminal(&self) -> bool {
        matches!(self, Self::Blockiert | Self::Getrennt)
    }
}
