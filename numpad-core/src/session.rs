//! Key state and the per-scan session that owns it.
//!
//! The matrix reads a column high while its switch is open, so the raw state
//! is kept inverted: a set bit is a released key. That polarity is confined
//! to [`KeyBits`]; everything downstream works with the positive-polarity
//! [`KeySet`].

use core::fmt;
use core::fmt::Write as _;

use crate::NUM_KEYS;

const KEY_MASK: u32 = (1 << NUM_KEYS) - 1;

/// Logical key number, `0..NUM_KEYS`.
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct KeyIndex(u8);

impl KeyIndex {
    /// Panics (at compile time in constants) if `index` is out of range.
    pub const fn new(index: u8) -> Self {
        assert!((index as usize) < NUM_KEYS, "key index out of range");
        Self(index)
    }

    pub const fn try_new(index: u8) -> Option<Self> {
        if (index as usize) < NUM_KEYS {
            Some(Self(index))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }

    const fn bit(self) -> u32 {
        1 << self.0
    }

    /// All keys in ascending order.
    pub fn all() -> impl Iterator<Item = KeyIndex> {
        (0..NUM_KEYS as u8).map(KeyIndex)
    }
}

impl fmt::Display for KeyIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Raw sampled levels, one bit per key. Clear bit = key held down.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct KeyBits(u32);

impl KeyBits {
    /// Every switch open. Used as the power-on state.
    pub const ALL_RELEASED: Self = Self(KEY_MASK);

    pub const fn from_raw(raw: u32) -> Self {
        Self(raw & KEY_MASK)
    }

    pub const fn raw(self) -> u32 {
        self.0
    }

    pub const fn is_pressed(self, key: KeyIndex) -> bool {
        self.0 & key.bit() == 0
    }

    /// Store the level read on the key's column. `high` means open.
    pub fn set_level(&mut self, key: KeyIndex, high: bool) {
        if high {
            self.0 |= key.bit();
        } else {
            self.0 &= !key.bit();
        }
    }

    /// Keys currently held down, in positive polarity.
    pub const fn pressed_set(self) -> KeySet {
        KeySet(!self.0 & KEY_MASK)
    }
}

impl Default for KeyBits {
    fn default() -> Self {
        Self::ALL_RELEASED
    }
}

/// A set of keys, one bit per key. Set bit = member.
#[derive(Copy, Clone, PartialEq, Eq, Default, Debug)]
pub struct KeySet(u32);

impl KeySet {
    pub const EMPTY: Self = Self(0);

    pub const fn from_bits(bits: u32) -> Self {
        Self(bits & KEY_MASK)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, key: KeyIndex) -> bool {
        self.0 & key.bit() != 0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn len(self) -> u32 {
        self.0.count_ones()
    }

    pub fn insert(&mut self, key: KeyIndex) {
        self.0 |= key.bit();
    }

    /// Members in ascending index order.
    pub fn iter(self) -> Iter {
        Iter { remaining: self.0 }
    }
}

impl IntoIterator for KeySet {
    type Item = KeyIndex;
    type IntoIter = Iter;

    fn into_iter(self) -> Iter {
        self.iter()
    }
}

impl FromIterator<KeyIndex> for KeySet {
    fn from_iter<I: IntoIterator<Item = KeyIndex>>(iter: I) -> Self {
        let mut set = KeySet::EMPTY;
        for key in iter {
            set.insert(key);
        }
        set
    }
}

pub struct Iter {
    remaining: u32,
}

impl Iterator for Iter {
    type Item = KeyIndex;

    fn next(&mut self) -> Option<KeyIndex> {
        if self.remaining == 0 {
            return None;
        }
        let index = self.remaining.trailing_zeros() as u8;
        self.remaining &= self.remaining - 1;
        Some(KeyIndex(index))
    }
}

/// State carried from one polling tick to the next.
///
/// `pressed` and `released` are one-shot pulses: the edge detector sets them
/// and the dispatcher consumes them.
#[derive(Clone, PartialEq, Eq, Debug)]
pub struct ScanSession {
    pub(crate) current: KeyBits,
    pub(crate) previous: KeyBits,
    pub(crate) pressed: KeySet,
    pub(crate) released: KeySet,
}

impl ScanSession {
    pub const fn new() -> Self {
        Self {
            current: KeyBits::ALL_RELEASED,
            previous: KeyBits::ALL_RELEASED,
            pressed: KeySet::EMPTY,
            released: KeySet::EMPTY,
        }
    }

    pub fn current(&self) -> KeyBits {
        self.current
    }

    pub fn previous(&self) -> KeyBits {
        self.previous
    }

    pub fn pressed(&self) -> KeySet {
        self.pressed
    }

    pub fn released(&self) -> KeySet {
        self.released
    }

    pub fn is_pressed(&self, key: KeyIndex) -> bool {
        self.current.is_pressed(key)
    }

    pub(crate) fn record_level(&mut self, key: KeyIndex, high: bool) {
        self.current.set_level(key, high);
    }

    /// Hand out both pulse sets and leave them empty.
    pub fn take_pulses(&mut self) -> (KeySet, KeySet) {
        (
            core::mem::take(&mut self.pressed),
            core::mem::take(&mut self.released),
        )
    }
}

impl Default for ScanSession {
    fn default() -> Self {
        Self::new()
    }
}

const SYMBOLS: &[u8; NUM_KEYS] = b"0123456789ABCDEFGHIJKLMN";

/// One character per key: its symbol while held, `.` otherwise.
pub struct KeyStates(pub KeyBits);

impl fmt::Display for KeyStates {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in KeyIndex::all() {
            let c = if self.0.is_pressed(key) {
                SYMBOLS[key.as_usize()] as char
            } else {
                '.'
            };
            f.write_char(c)?;
        }
        Ok(())
    }
}
