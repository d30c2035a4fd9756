//! Sitzungs-Manager
//!
//! Eine Sitzung ist die bidirektionale Beziehung zweier gematchter
//! Gruppen: fuer jedes Handle aus Gruppe A ist die Gegnermenge ganz
//! Gruppe B und umgekehrt. Ein Handle hat hoechstens eine aktive Sitzung.
//!
//! Verlaesst ein Mitglied die Sitzung, wird die gesamte Sitzung
//! aufgeloest – es gibt keine Teil-Sitzungen. Die Aufloesung entfernt
//! beide Seiten der Zuordnung atomar, damit Ueberlebende genau einmal
//! benachrichtigt werden.

use rendezvous_core::ConnectionId;
use std::collections::HashMap;

/// Verwaltet die Gegner-Zuordnung aller aktiven Sitzungen
#[derive(Debug, Default)]
pub struct SessionManager {
    /// Handle -> Handles der Gegner-Gruppe
    gegner: HashMap<ConnectionId, Vec<ConnectionId>>,
}

impl SessionManager {
    pub fn neu() -> Self {
        Self::default()
    }

    /// Erstellt eine Sitzung zwischen zwei Gruppen
    ///
    /// Setzt die Gegnermengen symmetrisch: jedes Mitglied von `a` bekommt
    /// ganz `b` als Gegner und umgekehrt. Die Aufrufstelle stellt sicher,
    /// dass kein Mitglied bereits eine Sitzung hat.
    pub fn sitzung_erstellen(&mut self, a: &[ConnectionId], b: &[ConnectionId]) {
        for handle in a {
            self.gegner.insert(*handle, b.to_vec());
        }
        for handle in b {
            self.gegner.insert(*handle, a.to_vec());
        }

        tracing::debug!(
            gruppe_a = ?a.iter().map(ToString::to_string).collect::<Vec<_>>(),
            gruppe_b = ?b.iter().map(ToString::to_string).collect::<Vec<_>>(),
            "Sitzung erstellt"
        );
    }

    /// Gibt die Gegnermenge eines Handles zurueck
    pub fn gegner(&self, handle: &ConnectionId) -> Option<&[ConnectionId]> {
        self.gegner.get(handle).map(Vec::as_slice)
    }

    /// Prueft ob `ziel` in der Gegnermenge von `von` liegt
    pub fn ist_gegner(&self, von: &ConnectionId, ziel: &ConnectionId) -> bool {
        self.gegner
            .get(von)
            .is_some_and(|g| g.contains(ziel))
    }

    pub fn hat_sitzung(&self, handle: &ConnectionId) -> bool {
        self.gegner.contains_key(handle)
    }

    /// Loest die gesamte Sitzung eines Handles auf
    ///
    /// Gibt die ueberlebenden Mitglieder (eigene Gruppe ohne das Handle
    /// plus die komplette Gegner-Gruppe) genau einmal zurueck. Ein
    /// zweiter Aufruf fuer dieselbe Sitzung – etwa wenn beide Seiten
    /// gleichzeitig trennen – liefert eine leere Liste; doppelte
    /// Benachrichtigung ist damit ausgeschlossen.
    pub fn aufloesen(&mut self, handle: &ConnectionId) -> Vec<ConnectionId> {
        let gegner_gruppe = match self.gegner.remove(handle) {
            Some(g) => g,
            None => return Vec::new(),
        };

        // Die eigene Gruppe ergibt sich aus der Gegnermenge eines Gegners
        let eigene_gruppe = gegner_gruppe
            .first()
            .and_then(|g| self.gegner.get(g))
            .cloned()
            .unwrap_or_default();

        for mitglied in gegner_gruppe.iter().chain(eigene_gruppe.iter()) {
            self.gegner.remove(mitglied);
        }

        let mut ueberlebende: Vec<ConnectionId> = eigene_gruppe
            .into_iter()
            .filter(|h| h != handle)
            .collect();
        ueberlebende.extend(gegner_gruppe);

        tracing::debug!(
            handle = %handle,
            ueberlebende = ueberlebende.len(),
            "Sitzung aufgeloest"
        );
        ueberlebende
    }

    /// Anzahl der Handles mit aktiver Sitzung
    pub fn aktive_handles(&self) -> usize {
        self.gegner.len()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
