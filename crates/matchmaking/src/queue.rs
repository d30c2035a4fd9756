//! Matchmaking-Warteschlange
//!
//! Pro unterstuetzter Gruppengroesse existieren (a) eine "building"-Gruppe,
//! die neue Verbindungen sammelt bis sie voll ist, und (b) eine FIFO-Liste
//! voller Gruppen, die auf eine Gegner-Gruppe warten. Erreicht die
//! building-Gruppe ihre Zielgroesse, wandert sie atomar in die FIFO-Liste.
//!
//! Matching ist gierig und nicht-praeemptiv: das aelteste kompatible Paar
//! gewinnt (first-eligible-wins), es gibt keine Prioritaeten und kein
//! Umsortieren. Filter werden standardmaessig nur fuer 1:1-Matches
//! geprueft; ein Policy-Flag schaltet sie fuer groessere Gruppen zu.

use rendezvous_core::{ConnectionId, Filter, RendezvousError, Result};
use std::collections::VecDeque;

// ---------------------------------------------------------------------------
// WaitingGroup
// ---------------------------------------------------------------------------

/// Eine Gruppe von Verbindungen, die zusammen eine Partei bilden
///
/// Mitglieder sind geordnet (Ankunftsreihenfolge). Eine Gruppe ist erst
/// match-faehig, wenn sie ihre Zielgroesse erreicht hat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitingGroup {
    mitglieder: Vec<(ConnectionId, Filter)>,
}

impl WaitingGroup {
    fn neu() -> Self {
        Self {
            mitglieder: Vec::new(),
        }
    }

    /// Gibt die Handles aller Mitglieder in Ankunftsreihenfolge zurueck
    pub fn handles(&self) -> Vec<ConnectionId> {
        self.mitglieder.iter().map(|(h, _)| *h).collect()
    }

    pub fn len(&self) -> usize {
        self.mitglieder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mitglieder.is_empty()
    }

    pub fn enthaelt(&self, handle: &ConnectionId) -> bool {
        self.mitglieder.iter().any(|(h, _)| h == handle)
    }

    /// Zwei Gruppen sind kompatibel, wenn jedes Mitgliederpaar kompatibel ist
    fn ist_kompatibel(&self, other: &WaitingGroup) -> bool {
        self.mitglieder.iter().all(|(_, f)| {
            other
                .mitglieder
                .iter()
                .all(|(_, g)| f.ist_kompatibel(g))
        })
    }
}

// ---------------------------------------------------------------------------
// MatchQueue
// ---------------------------------------------------------------------------

/// Warteschlangen-Zustand fuer eine einzelne Gruppengroesse
#[derive(Debug)]
struct SizeQueue {
    groesse: usize,
    /// Sammelt neue Verbindungen bis zur Zielgroesse
    building: WaitingGroup,
    /// Volle Gruppen in Ankunftsreihenfolge, warten auf eine Gegner-Gruppe
    wartend: VecDeque<WaitingGroup>,
}

impl SizeQueue {
    fn neu(groesse: usize) -> Self {
        Self {
            groesse,
            building: WaitingGroup::neu(),
            wartend: VecDeque::new(),
        }
    }

    /// Verschiebt volle building-Praefixe in die Warteliste
    fn volle_gruppen_ausgliedern(&mut self) {
        while self.building.mitglieder.len() >= self.groesse {
            let voll: Vec<_> = self.building.mitglieder.drain(..self.groesse).collect();
            self.wartend.push_back(WaitingGroup { mitglieder: voll });
        }
    }
}

/// Matchmaking-Warteschlange ueber alle unterstuetzten Gruppengroessen
///
/// Invariante: ein Handle steht zu jedem Zeitpunkt in hoechstens einem
/// Eintrag (building oder wartend, ueber alle Groessen hinweg).
#[derive(Debug)]
pub struct MatchQueue {
    queues: Vec<SizeQueue>,
    /// Filter auch fuer Gruppengroessen > 1 pruefen (Policy-Flag)
    filter_ueber_eins: bool,
}

impl MatchQueue {
    /// Erstellt eine Warteschlange fuer die angegebenen Gruppengroessen
    pub fn neu(groessen: &[u8], filter_ueber_eins: bool) -> Self {
        let mut queues: Vec<SizeQueue> = groessen
            .iter()
            .filter(|g| **g >= 1)
            .map(|g| SizeQueue::neu(*g as usize))
            .collect();
        queues.sort_by_key(|q| q.groesse);
        queues.dedup_by_key(|q| q.groesse);

        Self {
            queues,
            filter_ueber_eins,
        }
    }

    /// Gibt die unterstuetzten Gruppengroessen zurueck
    pub fn groessen(&self) -> Vec<u8> {
        self.queues.iter().map(|q| q.groesse as u8).collect()
    }

    pub fn unterstuetzt(&self, groesse: u8) -> bool {
        self.queues.iter().any(|q| q.groesse == groesse as usize)
    }

    /// Reiht eine Verbindung in die building-Gruppe ihrer Groesse ein
    ///
    /// Bereits eingereihte Handles werden ignoriert (Invariante: hoechstens
    /// ein Eintrag pro Handle). Nicht unterstuetzte Groessen sind ein
    /// Fehler des Clients.
    pub fn einreihen(&mut self, handle: ConnectionId, filter: Filter, groesse: u8) -> Result<()> {
        if self.ist_eingereiht(&handle) {
            tracing::warn!(handle = %handle, "Handle bereits eingereiht – Join ignoriert");
            return Ok(());
        }

        let queue = self
            .queues
            .iter_mut()
            .find(|q| q.groesse == groesse as usize)
            .ok_or(RendezvousError::UngueltigeGruppenGroesse(groesse))?;

        queue.building.mitglieder.push((handle, filter));
        queue.volle_gruppen_ausgliedern();

        tracing::debug!(handle = %handle, groesse, "Verbindung eingereiht");
        Ok(())
    }

    /// Sucht das aelteste kompatible Gruppenpaar einer Groesse
    ///
    /// First-eligible-wins: die Warteliste wird paarweise in
    /// Ankunftsreihenfolge durchsucht; das erste kompatible Paar wird
    /// entnommen. Die zuerst zurueckgegebene Gruppe ist die laenger
    /// wartende (Initiator-Seite).
    pub fn match_versuchen(&mut self, groesse: u8) -> Option<(WaitingGroup, WaitingGroup)> {
        let filter_pruefen = groesse == 1 || self.filter_ueber_eins;
        let queue = self
            .queues
            .iter_mut()
            .find(|q| q.groesse == groesse as usize)?;

        if queue.wartend.len() < 2 {
            return None;
        }

        let mut paar = None;
        'aussen: for i in 0..queue.wartend.len() {
            for j in (i + 1)..queue.wartend.len() {
                if !filter_pruefen || queue.wartend[i].ist_kompatibel(&queue.wartend[j]) {
                    paar = Some((i, j));
                    break 'aussen;
                }
            }
        }

        let (i, j) = paar?;
        // Hoeheren Index zuerst entfernen, sonst verschiebt sich i
        let b = queue.wartend.remove(j)?;
        let a = queue.wartend.remove(i)?;
        Some((a, b))
    }

    /// Entfernt ein Handle aus der Warteschlange (idempotent)
    ///
    /// Verliert eine bereits volle Gruppe ein Mitglied, kehren ihre
    /// verbleibenden Mitglieder an den Anfang der building-Gruppe zurueck
    /// und bilden dort ggf. sofort wieder eine volle Gruppe. Gibt `true`
    /// zurueck, wenn das Handle eingereiht war.
    pub fn entfernen(&mut self, handle: &ConnectionId) -> bool {
        for queue in &mut self.queues {
            let vorher = queue.building.mitglieder.len();
            queue.building.mitglieder.retain(|(h, _)| h != handle);
            if queue.building.mitglieder.len() < vorher {
                return true;
            }

            if let Some(pos) = queue.wartend.iter().position(|g| g.enthaelt(handle)) {
                let mut gruppe = match queue.wartend.remove(pos) {
                    Some(g) => g,
                    None => continue,
                };
                gruppe.mitglieder.retain(|(h, _)| h != handle);

                // Rest der Gruppe behaelt seine Senioritaet vor neuen Joins
                let mut rest = gruppe.mitglieder;
                rest.append(&mut queue.building.mitglieder);
                queue.building.mitglieder = rest;
                queue.volle_gruppen_ausgliedern();
                return true;
            }
        }
        false
    }

    /// Prueft ob ein Handle aktuell eingereiht ist (building oder wartend)
    pub fn ist_eingereiht(&self, handle: &ConnectionId) -> bool {
        self.queues.iter().any(|q| {
            q.building.enthaelt(handle) || q.wartend.iter().any(|g| g.enthaelt(handle))
        })
    }

    /// Gesamtzahl der aktuell eingereihten Handles
    pub fn wartende_anzahl(&self) -> usize {
        self.queues
            .iter()
            .map(|q| {
                q.building.len() + q.wartend.iter().map(WaitingGroup::len).sum::<usize>()
            })
            .sum()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(country: Option<&str>) -> Filter {
        Filter {
            country: country.map(String::from),
            gender: None,
        }
    }

    fn standard_queue() -> MatchQueue {
        MatchQueue::neu(&[1, 2, 3], false)
    }

    #[test]
    fn einzelne_verbindung_matcht_nicht() {
        let mut q = standard_queue();
        q.einreihen(ConnectionId::new(), Filter::leer(), 1).unwrap();
        assert!(q.match_versuchen(1).is_none());
        assert_eq!(q.wartende_anzahl(), 1);
    }

    #[test]
    fn zwei_wildcards_matchen() {
        let mut q = standard_queue();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        q.einreihen(a, Filter::leer(), 1).unwrap();
        q.einreihen(b, Filter::leer(), 1).unwrap();

        let (erste, zweite) = q.match_versuchen(1).expect("Match erwartet");
        // Die laenger wartende Gruppe kommt zuerst (Initiator-Seite)
        assert_eq!(erste.handles(), vec![a]);
        assert_eq!(zweite.handles(), vec![b]);
        assert_eq!(q.wartende_anzahl(), 0);
    }

    #[test]
    fn gleiches_land_matcht_vor_aelterem_inkompatiblen() {
        // Z (DE) wartet zuerst, dann X (SK) und Y (SK):
        // X und Y matchen, Z bleibt wartend.
        let mut q = standard_queue();
        let z = ConnectionId::new();
        let x = ConnectionId::new();
        let y = ConnectionId::new();

        q.einreihen(z, filter(Some("DE")), 1).unwrap();
        q.einreihen(x, filter(Some("SK")), 1).unwrap();
        assert!(q.match_versuchen(1).is_none(), "DE und SK duerfen nicht matchen");

        q.einreihen(y, filter(Some("SK")), 1).unwrap();
        let (erste, zweite) = q.match_versuchen(1).expect("SK-Paar erwartet");
        assert_eq!(erste.handles(), vec![x]);
        assert_eq!(zweite.handles(), vec![y]);

        assert!(q.ist_eingereiht(&z), "Z muss weiter warten");
        assert!(q.match_versuchen(1).is_none());
    }

    #[test]
    fn wildcard_matcht_gefilterte_verbindung() {
        let mut q = standard_queue();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        q.einreihen(a, filter(Some("SK")), 1).unwrap();
        q.einreihen(b, Filter::leer(), 1).unwrap();
        assert!(q.match_versuchen(1).is_some());
    }

    #[test]
    fn gruppen_werden_erst_bei_zielgroesse_voll() {
        let mut q = standard_queue();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let c = ConnectionId::new();

        q.einreihen(a, Filter::leer(), 2).unwrap();
        q.einreihen(b, Filter::leer(), 2).unwrap();
        // Eine volle 2er-Gruppe, aber noch kein Gegner
        assert!(q.match_versuchen(2).is_none());

        q.einreihen(c, Filter::leer(), 2).unwrap();
        assert!(q.match_versuchen(2).is_none(), "Halbe Gruppe darf nicht matchen");

        let d = ConnectionId::new();
        q.einreihen(d, Filter::leer(), 2).unwrap();
        let (erste, zweite) = q.match_versuchen(2).expect("2v2-Match erwartet");
        assert_eq!(erste.handles(), vec![a, b]);
        assert_eq!(zweite.handles(), vec![c, d]);
    }

    #[test]
    fn filter_gelten_standardmaessig_nicht_ueber_groesse_eins() {
        let mut q = MatchQueue::neu(&[2], false);
        q.einreihen(ConnectionId::new(), filter(Some("SK")), 2).unwrap();
        q.einreihen(ConnectionId::new(), filter(Some("SK")), 2).unwrap();
        q.einreihen(ConnectionId::new(), filter(Some("DE")), 2).unwrap();
        q.einreihen(ConnectionId::new(), filter(Some("DE")), 2).unwrap();

        assert!(
            q.match_versuchen(2).is_some(),
            "Ohne Policy-Flag matchen auch inkompatible Gruppen"
        );
    }

    #[test]
    fn policy_flag_schaltet_filter_fuer_gruppen_zu() {
        let mut q = MatchQueue::neu(&[2], true);
        q.einreihen(ConnectionId::new(), filter(Some("SK")), 2).unwrap();
        q.einreihen(ConnectionId::new(), filter(Some("SK")), 2).unwrap();
        q.einreihen(ConnectionId::new(), filter(Some("DE")), 2).unwrap();
        q.einreihen(ConnectionId::new(), filter(Some("DE")), 2).unwrap();
        assert!(q.match_versuchen(2).is_none());

        q.einreihen(ConnectionId::new(), filter(Some("SK")), 2).unwrap();
        q.einreihen(ConnectionId::new(), filter(Some("SK")), 2).unwrap();
        let (erste, zweite) = q.match_versuchen(2).expect("SK-Gruppenpaar erwartet");
        assert_eq!(erste.len(), 2);
        assert_eq!(zweite.len(), 2);
    }

    #[test]
    fn ungueltige_groesse_ist_fehler() {
        let mut q = standard_queue();
        let result = q.einreihen(ConnectionId::new(), Filter::leer(), 7);
        assert!(matches!(
            result,
            Err(RendezvousError::UngueltigeGruppenGroesse(7))
        ));
    }

    #[test]
    fn doppeltes_einreihen_wird_ignoriert() {
        let mut q = standard_queue();
        let a = ConnectionId::new();
        q.einreihen(a, Filter::leer(), 1).unwrap();
        q.einreihen(a, Filter::leer(), 2).unwrap();

        assert_eq!(q.wartende_anzahl(), 1, "Ein Handle, ein Eintrag");
    }

    #[test]
    fn entfernen_aus_building_gruppe() {
        let mut q = standard_queue();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        q.einreihen(a, Filter::leer(), 3).unwrap();
        q.einreihen(b, Filter::leer(), 3).unwrap();

        assert!(q.entfernen(&a));
        assert!(!q.ist_eingereiht(&a));
        assert!(q.ist_eingereiht(&b));
        assert_eq!(q.wartende_anzahl(), 1);
    }

    #[test]
    fn entfernen_ist_idempotent() {
        let mut q = standard_queue();
        let a = ConnectionId::new();
        q.einreihen(a, Filter::leer(), 1).unwrap();

        assert!(q.entfernen(&a));
        assert!(!q.entfernen(&a));
        assert!(!q.entfernen(&ConnectionId::new()));
    }

    #[test]
    fn entfernen_aus_voller_gruppe_erhaelt_restmitglieder() {
        let mut q = standard_queue();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let c = ConnectionId::new();
        q.einreihen(a, Filter::leer(), 3).unwrap();
        q.einreihen(b, Filter::leer(), 3).unwrap();
        q.einreihen(c, Filter::leer(), 3).unwrap();

        // Volle 3er-Gruppe; b steigt aus
        assert!(q.entfernen(&b));
        assert!(q.ist_eingereiht(&a));
        assert!(q.ist_eingereiht(&c));
        assert_eq!(q.wartende_anzahl(), 2);

        // Ein Nachzuegler fuellt die Gruppe wieder auf
        let d = ConnectionId::new();
        q.einreihen(d, Filter::leer(), 3).unwrap();
        let e: Vec<ConnectionId> = (0..3).map(|_| ConnectionId::new()).collect();
        for h in &e {
            q.einreihen(*h, Filter::leer(), 3).unwrap();
        }
        let (erste, _zweite) = q.match_versuchen(3).expect("3v3-Match erwartet");
        assert_eq!(erste.handles(), vec![a, c, d], "Restmitglieder behalten Senioritaet");
    }

    #[test]
    fn handle_steht_nie_in_zwei_eintraegen() {
        // Beliebige Join/Entfernen-Verschraenkung: nach jedem Schritt darf
        // ein Handle hoechstens einmal vorkommen.
        let mut q = standard_queue();
        let handles: Vec<ConnectionId> = (0..8).map(|_| ConnectionId::new()).collect();

        for (i, h) in handles.iter().enumerate() {
            let groesse = [1u8, 2, 3][i % 3];
            q.einreihen(*h, Filter::leer(), groesse).unwrap();
            if i % 2 == 1 {
                q.entfernen(&handles[i / 2]);
            }

            for h in &handles {
                let vorkommen = q
                    .queues
                    .iter()
                    .map(|sq| {
                        let im_building =
                            sq.building.mitglieder.iter().filter(|(x, _)| x == h).count();
                        let im_wartend: usize = sq
                            .wartend
                            .iter()
                            .map(|g| g.mitglieder.iter().filter(|(x, _)| x == h).count())
                            .sum();
                        im_building + im_wartend
                    })
                    .sum::<usize>();
                assert!(vorkommen <= 1, "Handle {h} kommt {vorkommen}-mal vor");
            }
        }
    }

    #[test]
    fn first_eligible_wins_bei_mehreren_kandidaten() {
        let mut q = standard_queue();
        let a = ConnectionId::new();
        let b = ConnectionId::new();
        let c = ConnectionId::new();
        q.einreihen(a, filter(Some("SK")), 1).unwrap();
        q.einreihen(b, filter(Some("SK")), 1).unwrap();
        q.einreihen(c, filter(Some("SK")), 1).unwrap();

        // Das aelteste Paar (a, b) gewinnt, nicht (a, c) oder (b, c)
        let (erste, zweite) = q.match_versuchen(1).expect("Match erwartet");
        assert_eq!(erste.handles(), vec![a]);
        assert_eq!(zweite.handles(), vec![b]);
        assert!(q.ist_eingereiht(&c));
    }
}
