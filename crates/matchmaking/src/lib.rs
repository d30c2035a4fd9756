//! rendezvous-matchmaking – Warteschlange und Gruppenbildung
//!
//! Haelt wartende Verbindungen gruppiert nach gewuenschter Gruppengroesse
//! und findet kompatible Gegner-Gruppen. Der Zustand ist rein in-memory und
//! bewusst ohne eigene Synchronisation gehalten: der Besitzer (das Relay)
//! serialisiert alle Mutationen hinter einer einzigen Sperre, damit
//! Match-Entscheidungen atomar gegenueber parallelen Joins und Disconnects
//! sind. Die Struktur ist dadurch isoliert testbar und bei Bedarf gegen
//! eine verteilte Implementierung austauschbar.

pub mod queue;

pub use queue::{MatchQueue, WaitingGroup};
