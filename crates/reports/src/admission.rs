//! Zulassungskontrolle
//!
//! Prueft beim Beitritt, ob die dauerhafte Identitaet einer Verbindung
//! die Report-Schwelle erreicht hat. Blockierte Identitaeten kommen nie
//! in die Warteschlange.

use std::sync::Arc;
use tracing::info;

use rendezvous_core::{RendezvousError, Result};

use crate::ledger::ReportLedger;
use crate::store::ReportStore;

/// Entscheidet ueber die Zulassung einer Identitaet
pub struct AdmissionController<S: ReportStore> {
    ledger: ReportLedger<S>,
}

impl<S: ReportStore> Clone for AdmissionController<S> {
    fn clone(&self) -> Self {
        Self {
            ledger: self.ledger.clone(),
        }
    }
}

impl<S: ReportStore> AdmissionController<S> {
    pub fn neu(ledger: ReportLedger<S>) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &ReportLedger<S> {
        &self.ledger
    }

    /// Prueft die Zulassung einer Identitaet
    ///
    /// Gibt `Err(Blockiert)` zurueck, wenn der Report-Zaehler die
    /// Schwelle erreicht hat.
    pub async fn pruefen(&self, identity: &str) -> Result<()> {
        if self.ledger.ist_blockiert(identity).await {
            info!(identity = %identity, "Zulassung verweigert, Report-Schwelle erreicht");
            return Err(RendezvousError::Blockiert);
        }
        Ok(())
    }
}
