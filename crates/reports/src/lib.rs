//! rendezvous-reports – Report-Ledger und Zulassungskontrolle
//!
//! Zaehlt Meldungen pro dauerhafter Identitaet und blockiert Verbindungen,
//! deren Zaehler die konfigurierte Schwelle erreicht hat.
//!
//! Der Ledger ist ein Write-Through-Cache mit dokumentiert best-effort
//! Konsistenz: der In-Memory-Zaehler ist fuehrend, der persistente Store
//! wird asynchron nachgezogen. Ein Speicherfehler blockiert nie den
//! Hot-Path und verliert nie ein Inkrement im laufenden Prozess.

pub mod admission;
pub mod ledger;
pub mod store;

pub use admission::AdmissionController;
pub use ledger::ReportLedger;
pub use store::{MemoryReportStore, ReportRecord, ReportStore};
