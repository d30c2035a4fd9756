//! Wire-Format fuer die TCP-Verbindung
//!
//! Frame-basiertes Protokoll: Laenge (u32 big-endian) + JSON-Payload.
//!
//! ```text
//! +--------+--------+--------+--------+----...----+
//! | Laenge (u32 BE) | 4 Bytes        | Payload    |
//! +--------+--------+--------+--------+----...----+
//! ```
//!
//! Die Laenge gibt die Anzahl der Payload-Bytes an (ohne die 4
//! Laengen-Bytes). Maximale Frame-Groesse ist konfigurierbar.
//!
//! Ein korrekt gerahmter Frame mit ungueltigem JSON wird verworfen und
//! geloggt, nicht als fataler Fehler behandelt – die Frame-Grenzen bleiben
//! intakt und die Verbindung laeuft weiter. Nur Rahmen-Verletzungen
//! (Frame zu gross) trennen die Verbindung.

use bytes::{Buf, BufMut, BytesMut};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::io;
use std::marker::PhantomData;
use tokio_util::codec::{Decoder, Encoder};

use crate::events::{ClientEvent, ServerEvent};

// ---------------------------------------------------------------------------
// Konstanten
// ---------------------------------------------------------------------------

/// Standard-maximale Frame-Groesse (64 KB – Signaling und Chat sind klein)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 64 * 1024;

/// Groesse des Laengen-Felds in Bytes
pub const LENGTH_FIELD_SIZE: usize = 4;

// ---------------------------------------------------------------------------
// FrameCodec
// ---------------------------------------------------------------------------

/// tokio-util Codec fuer frame-basierte JSON-Ereignisse
///
/// Generisch ueber die Empfangs- und Senderichtung; die beiden Aliase
/// [`RelayCodec`] (Server-Seite) und [`ClientCodec`] (Client-Seite und
/// Tests) legen die Richtungen fest.
#[derive(Debug)]
pub struct FrameCodec<In, Out> {
    /// Maximale erlaubte Frame-Groesse in Bytes
    max_frame_size: usize,
    _richtung: PhantomData<fn() -> (In, Out)>,
}

/// Codec der Server-Seite: liest `ClientEvent`, schreibt `ServerEvent`
pub type RelayCodec = FrameCodec<ClientEvent, ServerEvent>;

/// Codec der Client-Seite: liest `ServerEvent`, schreibt `ClientEvent`
pub type ClientCodec = FrameCodec<ServerEvent, ClientEvent>;

impl<In, Out> FrameCodec<In, Out> {
    /// Erstellt einen neuen Codec mit Standard-Limits
    pub fn neu() -> Self {
        Self {
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            _richtung: PhantomData,
        }
    }

    /// Erstellt einen Codec mit benutzerdefinierter maximaler Frame-Groesse
    pub fn mit_max_groesse(max_frame_size: usize) -> Self {
        Self {
            max_frame_size,
            _richtung: PhantomData,
        }
    }

    /// Gibt die konfigurierte maximale Frame-Groesse zurueck
    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

impl<In, Out> Default for FrameCodec<In, Out> {
    fn default() -> Self {
        Self::neu()
    }
}

impl<In, Out> Clone for FrameCodec<In, Out> {
    fn clone(&self) -> Self {
        Self {
            max_frame_size: self.max_frame_size,
            _richtung: PhantomData,
        }
    }
}

// ---------------------------------------------------------------------------
// Decoder-Implementierung
// ---------------------------------------------------------------------------

impl<In: DeserializeOwned, Out> Decoder for FrameCodec<In, Out> {
    type Item = In;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            // Warte auf mindestens 4 Bytes fuer das Laengen-Feld
            if src.len() < LENGTH_FIELD_SIZE {
                return Ok(None);
            }

            // Laenge lesen (big-endian u32) ohne den Buffer zu veraendern
            let length = u32::from_be_bytes([src[0], src[1], src[2], src[3]]) as usize;

            // Rahmen-Verletzung: Frame zu gross
            if length > self.max_frame_size {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidData,
                    format!(
                        "Frame zu gross: {} Bytes (Maximum: {} Bytes)",
                        length, self.max_frame_size
                    ),
                ));
            }

            // Pruefen ob der vollstaendige Frame bereits im Buffer ist
            let total_size = LENGTH_FIELD_SIZE + length;
            if src.len() < total_size {
                src.reserve(total_size - src.len());
                return Ok(None);
            }

            // Laengen-Feld verbrauchen, Payload extrahieren
            src.advance(LENGTH_FIELD_SIZE);
            let payload = src.split_to(length);

            // Ungueltiges JSON: Frame verwerfen, naechsten Frame versuchen
            match serde_json::from_slice(&payload) {
                Ok(event) => return Ok(Some(event)),
                Err(e) => {
                    tracing::debug!(fehler = %e, "Ungueltiger Frame verworfen");
                    continue;
                }
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Encoder-Implementierung
// ---------------------------------------------------------------------------

impl<In, Out: Serialize> Encoder<Out> for FrameCodec<In, Out> {
    type Error = io::Error;

    fn encode(&mut self, item: Out, dst: &mut BytesMut) -> Result<(), Self::Error> {
        let json = serde_json::to_vec(&item).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("JSON-Serialisierung fehlgeschlagen: {}", e),
            )
        })?;

        if json.len() > self.max_frame_size {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Nachricht zu gross: {} Bytes (Maximum: {} Bytes)",
                    json.len(),
                    self.max_frame_size
                ),
            ));
        }

        dst.reserve(LENGTH_FIELD_SIZE + json.len());
        dst.put_u32(json.len() as u32);
        dst.put_slice(&json);

        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
