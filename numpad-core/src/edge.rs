//! Edge detection between consecutive scans.

use crate::session::{KeySet, ScanSession};

/// Report whether anything moved since the last call and roll `previous`
/// forward. Pulse sets are left alone.
pub fn detect_changes(session: &mut ScanSession) -> bool {
    let changed = session.current != session.previous;
    session.previous = session.current;
    changed
}

/// Compute the one-shot pressed and released sets and roll `previous`
/// forward. Returns whether either set is non-empty.
///
/// Pulses are cycle-local: an edge the dispatcher did not consume before the
/// next call is overwritten.
pub fn detect_edges(session: &mut ScanSession) -> bool {
    let cur = session.current.raw();
    let prev = session.previous.raw();

    // Inverted polarity: high -> low is a press.
    let pressed = KeySet::from_bits(!cur & prev);
    let released = KeySet::from_bits(cur & !prev);

    if !pressed.is_empty() || !released.is_empty() {
        trace!(
            "edges: pressed={:06x} released={:06x}",
            pressed.bits(),
            released.bits()
        );
    }

    session.pressed = pressed;
    session.released = released;
    session.previous = session.current;

    !pressed.is_empty() || !released.is_empty()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{KeyBits, KeyIndex};
    use crate::NUM_KEYS;

    fn hold(keys: &[u8]) -> KeyBits {
        let mut bits = KeyBits::ALL_RELEASED;
        for &k in keys {
            bits.set_level(KeyIndex::new(k), false);
        }
        bits
    }

    #[test]
    fn test_press_and_release_pulses() {
        let mut session = ScanSession::new();

        session.current = hold(&[7]);
        assert!(detect_edges(&mut session));
        assert_eq!(session.pressed().bits(), 1 << 7);
        assert!(session.released().is_empty());

        session.take_pulses();
        session.current = KeyBits::ALL_RELEASED;
        assert!(detect_edges(&mut session));
        assert!(session.pressed().is_empty());
        assert_eq!(session.released().bits(), 1 << 7);
    }

    #[test]
    fn test_held_key_pulses_once() {
        let mut session = ScanSession::new();
        session.current = hold(&[2]);
        assert!(detect_edges(&mut session));
        session.take_pulses();

        // Still held on the next scan.
        assert!(!detect_edges(&mut session));
        assert!(session.pressed().is_empty());
    }

    #[test]
    fn test_previous_tracks_current() {
        let mut session = ScanSession::new();
        session.current = hold(&[0, 23]);
        detect_edges(&mut session);
        assert_eq!(session.previous(), session.current());
    }

    #[test]
    fn test_pulses_are_disjoint_and_bounded() {
        let mut session = ScanSession::new();
        session.current = hold(&[1, 2, 3]);
        detect_edges(&mut session);
        session.take_pulses();

        session.current = hold(&[3, 4]);
        detect_edges(&mut session);
        assert_eq!(session.pressed().bits() & session.released().bits(), 0);
        assert_eq!(session.pressed().bits() >> NUM_KEYS, 0);
        assert_eq!(session.released().bits() >> NUM_KEYS, 0);
        assert_eq!(session.pressed().bits(), 1 << 4);
        assert_eq!(session.released().bits(), (1 << 1) | (1 << 2));
    }

    #[test]
    fn test_pulses_disjoint_across_patterns() {
        const MASK: u32 = (1 << NUM_KEYS) - 1;
        let patterns = [
            0,
            MASK,
            0x55_5555,
            0xAA_AAAA,
            1,
            1 << (NUM_KEYS - 1),
            MASK & !1,
            MASK & !(1 << 12),
        ];

        for &prev in &patterns {
            for &cur in &patterns {
                let mut session = ScanSession::new();
                session.previous = KeyBits::from_raw(prev);
                session.current = KeyBits::from_raw(cur);

                let changed = detect_edges(&mut session);
                let pressed = session.pressed().bits();
                let released = session.released().bits();
                assert_eq!(pressed & released, 0, "{:06x} -> {:06x}", prev, cur);
                assert_eq!(pressed, !cur & prev & MASK, "{:06x} -> {:06x}", prev, cur);
                assert_eq!(released, cur & !prev & MASK, "{:06x} -> {:06x}", prev, cur);
                assert_eq!(changed, prev != cur);

                assert!(!detect_edges(&mut session), "{:06x} -> {:06x}", prev, cur);
                assert!(session.pressed().is_empty());
                assert!(session.released().is_empty());
            }
        }
    }

    #[test]
    fn test_undispatched_edges_are_dropped() {
        let mut session = ScanSession::new();
        session.current = hold(&[9]);
        detect_edges(&mut session);
        session.current = hold(&[9, 10]);
        detect_edges(&mut session);
        assert_eq!(session.pressed().bits(), 1 << 10);
    }

    #[test]
    fn test_second_call_without_scan_is_quiet() {
        let mut session = ScanSession::new();
        session.current = hold(&[6]);
        assert!(detect_edges(&mut session));
        assert!(!detect_edges(&mut session));
        assert!(session.pressed().is_empty());
        assert!(session.released().is_empty());
    }

    #[test]
    fn test_detect_changes() {
        let mut session = ScanSession::new();
        assert!(!detect_changes(&mut session));

        session.current = hold(&[12]);
        assert!(detect_changes(&mut session));
        assert!(!detect_changes(&mut session));
        assert!(session.pressed().is_empty());
    }
}
