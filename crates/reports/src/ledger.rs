//! Report-Ledger
//!
//! Write-Through-Zaehler: das Inkrement landet synchron im In-Memory-Cache
//! und wird asynchron in den Store nachgezogen. Der Cache ist fuehrend,
//! ein Speicherfehler wird geloggt und verwirft nie ein Inkrement im
//! laufenden Prozess.

use dashmap::DashMap;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::store::ReportStore;

/// Zaehlt Meldungen pro dauerhafter Identitaet
///
/// Klonbar und thread-sicher; alle Klone teilen denselben Zustand.
pub struct ReportLedger<S: ReportStore> {
    inner: Arc<LedgerInner<S>>,
}

struct LedgerInner<S> {
    zaehler: DashMap<String, u32>,
    store: Arc<S>,
    schwelle: u32,
}

impl<S: ReportStore> Clone for ReportLedger<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: ReportStore> ReportLedger<S> {
    /// Erstellt einen Ledger mit Store und Blockier-Schwelle
    ///
    /// Eine Schwelle von 0 wird auf 1 angehoben, sonst waere jede
    /// Identitaet sofort blockiert.
    pub fn neu(store: Arc<S>, schwelle: u32) -> Self {
        Self {
            inner: Arc::new(LedgerInner {
                zaehler: DashMap::new(),
                store,
                schwelle: schwelle.max(1),
            }),
        }
    }

    pub fn schwelle(&self) -> u32 {
        self.inner.schwelle
    }

    /// Registriert eine Meldung gegen die Identitaet
    ///
    /// Gibt den neuen Zaehlerstand zurueck. Die Persistierung laeuft
    /// fire-and-forget im Hintergrund; der In-Memory-Zaehler bleibt
    /// fuehrend, auch wenn der Store ausfaellt.
    pub fn melden(&self, identity: &str) -> u32 {
        let neuer_stand = {
            let mut eintrag = self
                .inner
                .zaehler
                .entry(identity.to_string())
                .or_insert(0);
            *eintrag += 1;
            *eintrag
        };

        debug!(identity = %identity, stand = neuer_stand, "Meldung registriert");

        let store = Arc::clone(&self.inner.store);
        let identity = identity.to_string();
        tokio::spawn(async move {
            if let Err(e) = store.speichern(&identity, neuer_stand).await {
                warn!(
                    identity = %identity,
                    fehler = %e,
                    "Persistierung des Report-Zaehlers fehlgeschlagen, In-Memory-Zaehler bleibt fuehrend"
                );
            }
        });

        neuer_stand
    }

    /// Aktueller Zaehlerstand einer Identitaet
    ///
    /// Liest zuerst den Cache; nur fuer unbekannte Identitaeten wird der
    /// Store befragt und das Ergebnis in den Cache uebernommen. Ein
    /// Store-Fehler zaehlt als 0, neue Verbindungen duerfen nicht an
    /// einem Speicherausfall scheitern.
    pub async fn anzahl(&self, identity: &str) -> u32 {
        if let Some(stand) = self.inner.zaehler.get(identity) {
            return *stand;
        }

        match self.inner.store.laden(identity).await {
            Ok(Some(record)) => {
                self.inner
                    .zaehler
                    .entry(identity.to_string())
                    .or_insert(record.count);
                record.count
            }
            Ok(None) => 0,
            Err(e) => {
                warn!(
                    identity = %identity,
                    fehler = %e,
                    "Report-Store nicht erreichbar, Zaehler gilt als 0"
                );
                0
            }
        }
    }

    /// Prueft ob die Identitaet die Schwelle erreicht oder ueberschritten hat
    pub async fn ist_blockiert(&self, identity: &str) -> bool {
        self.anzahl(identity).await >= self.inner.schwelle
    }

    /// Prueft ob genau dieses Inkrement die Schwelle erreicht hat
    ///
    /// Vergleich auf Gleichheit statt >=, damit die Zwangstrennung pro
    /// Identitaet genau einmal ausgeloest wird.
    pub fn hat_schwelle_erreicht(&self, stand: u32) -> bool {
        stand == self.inner.schwelle
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryReportStore, ReportRecord};
    use async_trait::async_trait;
    use rendezvous_core::{RendezvousError, Result};

    /// Store-Double, bei dem jede Operation fehlschlaegt
    struct FailingStore;

    #[async_trait]
    impl ReportStore for FailingStore {
        async fn laden(&self, _identity: &str) -> Result<Option<ReportRecord>> {
            Err(RendezvousError::SpeicherNichtVerfuegbar(
                "laden fehlgeschlagen".into(),
            ))
        }

        async fn speichern(&self, _identity: &str, _count: u32) -> Result<()> {
            Err(RendezvousError::SpeicherNichtVerfuegbar(
                "speichern fehlgeschlagen".into(),
            ))
        }
    }

    #[tokio::test]
    async fn melden_inkrementiert() {
        let ledger = ReportLedger::neu(Arc::new(MemoryReportStore::neu()), 3);

        assert_eq!(ledger.melden("ident-1"), 1);
        assert_eq!(ledger.melden("ident-1"), 2);
        assert_eq!(ledger.anzahl("ident-1").await, 2);
        assert_eq!(ledger.anzahl("ident-2").await, 0);
    }

    #[tokio::test]
    async fn blockiert_ab_schwelle() {
        let ledger = ReportLedger::neu(Arc::new(MemoryReportStore::neu()), 3);

        ledger.melden("ident-1");
        ledger.melden("ident-1");
        assert!(!ledger.ist_blockiert("ident-1").await);

        ledger.melden("ident-1");
        assert!(ledger.ist_blockiert("ident-1").await);
    }

    #[tokio::test]
    async fn schwelle_wird_genau_einmal_erreicht() {
        let ledger = ReportLedger::neu(Arc::new(MemoryReportStore::neu()), 3);

        assert!(!ledger.hat_schwelle_erreicht(ledger.melden("ident-1")));
        assert!(!ledger.hat_schwelle_erreicht(ledger.melden("ident-1")));
        assert!(ledger.hat_schwelle_erreicht(ledger.melden("ident-1")));
        assert!(!ledger.hat_schwelle_erreicht(ledger.melden("ident-1")));
    }

    #[tokio::test]
    async fn zaehler_wird_aus_store_geladen() {
        let store = Arc::new(MemoryReportStore::neu());
        store.speichern("ident-1", 5).await.unwrap();

        let ledger = ReportLedger::neu(store, 3);
        assert_eq!(ledger.anzahl("ident-1").await, 5);
        assert!(ledger.ist_blockiert("ident-1").await);
    }

    #[tokio::test]
    async fn store_ausfall_blockiert_nicht_den_ledger() {
        let ledger = ReportLedger::neu(Arc::new(FailingStore), 2);

        // Laden schlaegt fehl -> Zaehler gilt als 0, keine Blockade
        assert!(!ledger.ist_blockiert("ident-1").await);

        // Inkremente funktionieren trotz fehlschlagender Persistierung
        ledger.melden("ident-1");
        ledger.melden("ident-1");
        assert!(ledger.ist_blockiert("ident-1").await);
    }

    #[tokio::test]
    async fn schwelle_null_wird_angehoben() {
        let ledger = ReportLedger::neu(Arc::new(MemoryReportStore::neu()), 0);
        assert_eq!(ledger.schwelle(), 1);
        assert!(!ledger.ist_blockiert("ident-1").await);
    }

    #[tokio::test]
    async fn persistierung_landet_im_store() {
        let store = Arc::new(MemoryReportStore::neu());
        let ledger = ReportLedger::neu(Arc::clone(&store), 3);

        ledger.melden("ident-1");
        // Die Hintergrund-Task laeuft auf demselben Runtime-Thread weiter
        tokio::task::yield_now().await;

        let record = store.laden("ident-1").await.unwrap();
        assert_eq!(record.map(|r| r.count), Some(1));
    }
}
