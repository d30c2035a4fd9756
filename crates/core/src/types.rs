//! Verbindungs-Handles und Matching-Filter
//!
//! `ConnectionId` verwendet das Newtype-Pattern um Verwechslungen mit
//! anderen IDs zur Compilezeit auszuschliessen. Handles sind an die
//! Lebensdauer einer Transport-Verbindung gebunden und werden nie
//! persistiert.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Eindeutiges, verbindungs-gebundenes Handle
///
/// Wird vom Relay beim Verbindungsaufbau vergeben und gilt nur fuer die
/// Lebensdauer dieser einen Verbindung. Eigentuemer ist die Connection-
/// Registry; alle anderen Komponenten referenzieren das Handle nur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionId(pub Uuid);

impl ConnectionId {
    /// Erstellt ein neues zufaelliges Handle
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Gibt die innere UUID zurueck
    pub fn inner(&self) -> Uuid {
        self.0
    }

    /// Standard-Identitaet fuer den Report-Ledger
    ///
    /// Verbindungen sind anonym; ohne client-seitige Identitaet zaehlt der
    /// Ledger gegen das Handle selbst.
    pub fn identity_key(&self) -> String {
        self.0.to_string()
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conn:{}", self.0)
    }
}

/// Matching-Filter einer Verbindung
///
/// Wird beim Join vom Client mitgeliefert und ist fuer die Lebensdauer der
/// Verbindung unveraenderlich. Ein nicht gesetztes Feld ist ein Wildcard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Filter {
    /// Gewuenschtes Land des Gegenuebers
    pub country: Option<String>,
    /// Gewuenschtes Geschlecht des Gegenuebers
    pub gender: Option<String>,
}

impl Filter {
    /// Prueft gegenseitige Kompatibilitaet zweier Filter
    ///
    /// Sind `country` bzw. `gender` auf beiden Seiten gesetzt, muessen sie
    /// uebereinstimmen. Eine nicht gesetzte Seite akzeptiert alles.
    pub fn ist_kompatibel(&self, other: &Filter) -> bool {
        fn passt(a: &Option<String>, b: &Option<String>) -> bool {
            match (a, b) {
                (Some(x), Some(y)) => x == y,
                _ => true,
            }
        }

        passt(&self.country, &other.country) && passt(&self.gender, &other.gender)
    }

    /// Erstellt einen Filter ohne Kriterien (Wildcard)
    pub fn leer() -> Self {
        Self::default()
    }
}
