//! rendezvous-session – Pairing- und Sitzungs-Verwaltung
//!
//! Besitzt die Zuordnung Verbindung -> Gegnermenge. Wie die Warteschlange
//! ist der Zustand in-memory und ohne eigene Synchronisation; das Relay
//! serialisiert alle Mutationen hinter derselben Sperre wie das
//! Matchmaking, damit "Match gefunden" und "Gegner gerade getrennt"
//! deterministisch aufgeloest werden.

pub mod manager;

pub use manager::SessionManager;
