//! What each key does.
//!
//! [`ACTIONS`] is indexed by logical key number. Being a fixed-size array it
//! binds exactly one action to every key; adding a key without an action
//! does not compile.

use crate::consumer::ConsumerCode;
use crate::keycode::Keycode;
use crate::session::KeyIndex;
use crate::NUM_KEYS;

/// The transition an action fires on.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Edge {
    Pressed,
    Released,
}

#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub enum Action {
    /// Hold every key in `chord`, release everything, then tap each key in
    /// `then`. Fires on press.
    ModifierShortcut {
        chord: &'static [Keycode],
        then: &'static [Keycode],
    },
    /// Send one consumer-control usage. Fires on press, once per press.
    Consumer(ConsumerCode),
    /// Type an ASCII string one character at a time. Fires on release so a
    /// held or aborted gesture never produces partial text.
    Text(&'static str),
}

impl Action {
    pub const fn trigger(&self) -> Edge {
        match self {
            Action::ModifierShortcut { .. } | Action::Consumer(_) => Edge::Pressed,
            Action::Text(_) => Edge::Released,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Action::ModifierShortcut { .. } => "shortcut",
            Action::Consumer(_) => "consumer",
            Action::Text(_) => "text",
        }
    }
}

/// An action plus a short human label for renderings.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct Binding {
    pub label: &'static str,
    pub action: Action,
}

impl Binding {
    const fn new(label: &'static str, action: Action) -> Self {
        Self { label, action }
    }
}

const fn shortcut(
    label: &'static str,
    chord: &'static [Keycode],
    then: &'static [Keycode],
) -> Binding {
    Binding::new(label, Action::ModifierShortcut { chord, then })
}

const fn consumer(label: &'static str, code: ConsumerCode) -> Binding {
    Binding::new(label, Action::Consumer(code))
}

const fn text(label: &'static str, s: &'static str) -> Binding {
    Binding::new(label, Action::Text(s))
}

const RGUI: Keycode = Keycode::RGui;

/// Action table, logical key order.
///
/// Win+X opens the power-user menu; U then U/S picks shut down / sleep.
pub static ACTIONS: [Binding; NUM_KEYS] = [
    shortcut("Shut down", &[RGUI, Keycode::X], &[Keycode::U, Keycode::U]),
    shortcut("Sleep", &[RGUI, Keycode::X], &[Keycode::U, Keycode::S]),
    consumer("Calc", ConsumerCode::Calculator),
    shortcut("Desktop", &[RGUI, Keycode::D], &[]),
    text("\u{2714}", ":heavy_check_mark:"),
    text("\u{2764}", ":heart:"),
    text("\u{1f4a2}", ":anger:"),
    text("\u{2728}", ":sparkles:"),
    text("\u{267f}", ":wheelchair:"),
    text("\u{2623}", ":biohazard:"),
    text("\u{2b50}", ":star:"),
    text("\u{1f483}", ":dancer:"),
    text("\u{1f422}", ":turtle:"),
    text("\u{1f41e}", ":beetle:"),
    text("\u{1f98b}", ":butterfly:"),
    text("\u{1f9da}", ":fairy:"),
    text("\u{1f40c}", ":snail:"),
    text("\u{1f41b}", ":bug:"),
    text("\u{1f338}", ":cherry_blossom:"),
    text("\u{1f380}", ":ribbon:"),
    consumer("Play/Pause", ConsumerCode::PlayPause),
    consumer("Prev", ConsumerCode::ScanPreviousTrack),
    consumer("Next", ConsumerCode::ScanNextTrack),
    consumer("Mute", ConsumerCode::Mute),
];

pub fn binding(key: KeyIndex) -> &'static Binding {
    &ACTIONS[key.as_usize()]
}
