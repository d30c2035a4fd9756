//! Persistente Speicher-Schnittstelle fuer Report-Zaehler
//!
//! Das Repository-Pattern entkoppelt den Ledger von der konkreten
//! Speicher-Implementierung. Fuer Single-Instance-Betrieb und Tests
//! reicht der In-Memory-Store; ein externer Store (Datenbank,
//! Backend-as-a-Service) haengt sich ueber denselben Trait ein.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use rendezvous_core::Result;

/// Persistierter Datensatz pro dauerhafter Identitaet
#[derive(Debug, Clone)]
pub struct ReportRecord {
    pub identity: String,
    pub count: u32,
    pub aktualisiert_am: DateTime<Utc>,
}

/// Speicher-Schnittstelle fuer Report-Zaehler
///
/// Implementierungen muessen `speichern` als Upsert behandeln: ein
/// Datensatz pro Identitaet, ueberschrieben mit dem neuesten Stand.
#[async_trait]
pub trait ReportStore: Send + Sync + 'static {
    /// Laedt den gespeicherten Zaehler einer Identitaet
    async fn laden(&self, identity: &str) -> Result<Option<ReportRecord>>;

    /// Upsert des Zaehlers nach einem Inkrement
    async fn speichern(&self, identity: &str, count: u32) -> Result<()>;
}

/// In-Memory-Store – Standard fuer Single-Instance-Betrieb und Tests
#[derive(Debug, Default)]
pub struct MemoryReportStore {
    records: DashMap<String, ReportRecord>,
}

impl MemoryReportStore {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Anzahl der gespeicherten Datensaetze (fuer Tests)
    pub fn anzahl(&self) -> usize {
        self.records.len()
    }
}

#[async_trait]
impl ReportStore for MemoryReportStore {
    async fn laden(&self, identity: &str) -> Result<Option<ReportRecord>> {
        Ok(self.records.get(identity).map(|r| r.clone()))
    }

    async fn speichern(&self, identity: &str, count: u32) -> Result<()> {
        self.records.insert(
            identity.to_string(),
            ReportRecord {
                identity: identity.to_string(),
                count,
                aktualisiert_am: Utc::now(),
            },
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn speichern_und_laden() {
        let store = MemoryReportStore::neu();
        store.speichern("ident-1", 2).await.unwrap();

        let record = store.laden("ident-1").await.unwrap().expect("Datensatz erwartet");
        assert_eq!(record.count, 2);
        assert_eq!(record.identity, "ident-1");
    }

    #[tokio::test]
    async fn speichern_ist_upsert() {
        let store = MemoryReportStore::neu();
        store.speichern("ident-1", 1).await.unwrap();
        store.speichern("ident-1", 2).await.unwrap();

        assert_eq!(store.anzahl(), 1);
        let record = store.laden("ident-1").await.unwrap().unwrap();
        assert_eq!(record.count, 2);
    }

    #[tokio::test]
    async fn unbekannte_identitaet_ist_none() {
        let store = MemoryReportStore::neu();
        assert!(store.laden("niemand").await.unwrap().is_none());
    }
}
