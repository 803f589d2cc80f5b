//! USB HID keyboard usages and the ASCII-to-keystroke table used for
//! typing text macros.

/// USB HID keycodes.
/// See USB HID Usage Tables, Section 10 (Keyboard/Keypad Page 0x07).
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
#[repr(u8)]
pub enum Keycode {
    // Letters
    A = 0x04,
    B = 0x05,
    C = 0x06,
    D = 0x07,
    E = 0x08,
    F = 0x09,
    G = 0x0A,
    H = 0x0B,
    I = 0x0C,
    J = 0x0D,
    K = 0x0E,
    L = 0x0F,
    M = 0x10,
    N = 0x11,
    O = 0x12,
    P = 0x13,
    Q = 0x14,
    R = 0x15,
    S = 0x16,
    T = 0x17,
    U = 0x18,
    V = 0x19,
    W = 0x1A,
    X = 0x1B,
    Y = 0x1C,
    Z = 0x1D,

    // Digits
    N1 = 0x1E,
    N2 = 0x1F,
    N3 = 0x20,
    N4 = 0x21,
    N5 = 0x22,
    N6 = 0x23,
    N7 = 0x24,
    N8 = 0x25,
    N9 = 0x26,
    N0 = 0x27,

    // Control and punctuation
    Enter = 0x28,
    Escape = 0x29,
    Backspace = 0x2A,
    Tab = 0x2B,
    Space = 0x2C,
    Minus = 0x2D,
    Equal = 0x2E,
    LBracket = 0x2F,
    RBracket = 0x30,
    Backslash = 0x31,
    Semicolon = 0x33,
    Quote = 0x34,
    Grave = 0x35,
    Comma = 0x36,
    Dot = 0x37,
    Slash = 0x38,

    F1 = 0x3A,
    F2 = 0x3B,
    F3 = 0x3C,
    F4 = 0x3D,
    F5 = 0x3E,
    F6 = 0x3F,
    F7 = 0x40,
    F8 = 0x41,
    F9 = 0x42,
    F10 = 0x43,
    F11 = 0x44,
    F12 = 0x45,

    // Navigation
    Delete = 0x4C,
    Right = 0x4F,
    Left = 0x50,
    Down = 0x51,
    Up = 0x52,

    // Modifiers (go in the modifier byte, not the key array)
    LCtrl = 0xE0,
    LShift = 0xE1,
    LAlt = 0xE2,
    LGui = 0xE3,
    RCtrl = 0xE4,
    RShift = 0xE5,
    RAlt = 0xE6,
    RGui = 0xE7,
}

impl Keycode {
    pub fn is_modifier(self) -> bool {
        (0xE0..=0xE7).contains(&(self as u8))
    }

    /// Modifier byte mask (bit 0 = LCtrl, bit 7 = RGui), 0 for other keys.
    pub fn modifier_bit(self) -> u8 {
        if self.is_modifier() {
            1 << (self as u8 - 0xE0)
        } else {
            0
        }
    }

    /// Short label for layout renderings and simulator output.
    pub fn display_name(self) -> &'static str {
        match self {
            Keycode::A => "A",
            Keycode::B => "B",
            Keycode::C => "C",
            Keycode::D => "D",
            Keycode::E => "E",
            Keycode::F => "F",
            Keycode::G => "G",
            Keycode::H => "H",
            Keycode::I => "I",
            Keycode::J => "J",
            Keycode::K => "K",
            Keycode::L => "L",
            Keycode::M => "M",
            Keycode::N => "N",
            Keycode::O => "O",
            Keycode::P => "P",
            Keycode::Q => "Q",
            Keycode::R => "R",
            Keycode::S => "S",
            Keycode::T => "T",
            Keycode::U => "U",
            Keycode::V => "V",
            Keycode::W => "W",
            Keycode::X => "X",
            Keycode::Y => "Y",
            Keycode::Z => "Z",
            Keycode::N1 => "1",
            Keycode::N2 => "2",
            Keycode::N3 => "3",
            Keycode::N4 => "4",
            Keycode::N5 => "5",
            Keycode::N6 => "6",
            Keycode::N7 => "7",
            Keycode::N8 => "8",
            Keycode::N9 => "9",
            Keycode::N0 => "0",
            Keycode::Enter => "Ent",
            Keycode::Escape => "Esc",
            Keycode::Backspace => "Bksp",
            Keycode::Tab => "Tab",
            Keycode::Space => "Spc",
            Keycode::Minus => "-",
            Keycode::Equal => "=",
            Keycode::LBracket => "[",
            Keycode::RBracket => "]",
            Keycode::Backslash => "\\",
            Keycode::Semicolon => ";",
            Keycode::Quote => "'",
            Keycode::Grave => "`",
            Keycode::Comma => ",",
            Keycode::Dot => ".",
            Keycode::Slash => "/",
            Keycode::F1 => "F1",
            Keycode::F2 => "F2",
            Keycode::F3 => "F3",
            Keycode::F4 => "F4",
            Keycode::F5 => "F5",
            Keycode::F6 => "F6",
            Keycode::F7 => "F7",
            Keycode::F8 => "F8",
            Keycode::F9 => "F9",
            Keycode::F10 => "F10",
            Keycode::F11 => "F11",
            Keycode::F12 => "F12",
            Keycode::Delete => "Del",
            Keycode::Right => "\u{2192}",
            Keycode::Left => "\u{2190}",
            Keycode::Down => "\u{2193}",
            Keycode::Up => "\u{2191}",
            Keycode::LCtrl => "Ctrl",
            Keycode::LShift => "Shft",
            Keycode::LAlt => "Alt",
            Keycode::LGui => "Gui",
            Keycode::RCtrl => "RCtl",
            Keycode::RShift => "RSft",
            Keycode::RAlt => "RAlt",
            Keycode::RGui => "RGui",
        }
    }
}

/// One key, optionally shifted, that types a character on a US layout.
#[derive(Copy, Clone, PartialEq, Eq, Debug)]
pub struct KeyStroke {
    pub key: Keycode,
    pub shift: bool,
}

impl KeyStroke {
    const fn plain(key: Keycode) -> Self {
        Self { key, shift: false }
    }

    const fn shifted(key: Keycode) -> Self {
        Self { key, shift: true }
    }

    /// Keystroke for an ASCII byte, or `None` if the byte has no key on a US
    /// layout (control characters other than `\n`, `\t` and backspace, or
    /// anything above 0x7E).
    pub fn from_ascii(c: u8) -> Option<Self> {
        use Keycode::*;

        const LETTERS: [Keycode; 26] = [
            A, B, C, D, E, F, G, H, I, J, K, L, M, N, O, P, Q, R, S, T, U, V, W, X, Y, Z,
        ];
        const DIGITS: [Keycode; 10] = [N0, N1, N2, N3, N4, N5, N6, N7, N8, N9];

        let stroke = match c {
            b'a'..=b'z' => Self::plain(LETTERS[(c - b'a') as usize]),
            b'A'..=b'Z' => Self::shifted(LETTERS[(c - b'A') as usize]),
            b'0'..=b'9' => Self::plain(DIGITS[(c - b'0') as usize]),
            b'\n' => Self::plain(Enter),
            b'\t' => Self::plain(Tab),
            0x08 => Self::plain(Backspace),
            b' ' => Self::plain(Space),
            b'!' => Self::shifted(N1),
            b'@' => Self::shifted(N2),
            b'#' => Self::shifted(N3),
            b'$' => Self::shifted(N4),
            b'%' => Self::shifted(N5),
            b'^' => Self::shifted(N6),
            b'&' => Self::shifted(N7),
            b'*' => Self::shifted(N8),
            b'(' => Self::shifted(N9),
            b')' => Self::shifted(N0),
            b'-' => Self::plain(Minus),
            b'_' => Self::shifted(Minus),
            b'=' => Self::plain(Equal),
            b'+' => Self::shifted(Equal),
            b'[' => Self::plain(LBracket),
            b'{' => Self::shifted(LBracket),
            b']' => Self::plain(RBracket),
            b'}' => Self::shifted(RBracket),
            b'\\' => Self::plain(Backslash),
            b'|' => Self::shifted(Backslash),
            b';' => Self::plain(Semicolon),
            b':' => Self::shifted(Semicolon),
            b'\'' => Self::plain(Quote),
            b'"' => Self::shifted(Quote),
            b'`' => Self::plain(Grave),
            b'~' => Self::shifted(Grave),
            b',' => Self::plain(Comma),
            b'<' => Self::shifted(Comma),
            b'.' => Self::plain(Dot),
            b'>' => Self::shifted(Dot),
            b'/' => Self::plain(Slash),
            b'?' => Self::shifted(Slash),
            _ => return None,
        };
        Some(stroke)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_modifier_bits() {
        assert_eq!(Keycode::LCtrl.modifier_bit(), 0x01);
        assert_eq!(Keycode::RGui.modifier_bit(), 0x80);
        assert_eq!(Keycode::X.modifier_bit(), 0);
        assert!(Keycode::RGui.is_modifier());
        assert!(!Keycode::U.is_modifier());
    }

    #[test]
    fn test_ascii_letters_and_shift() {
        assert_eq!(KeyStroke::from_ascii(b'h').unwrap(), KeyStroke::plain(Keycode::H));
        assert_eq!(KeyStroke::from_ascii(b'H').unwrap(), KeyStroke::shifted(Keycode::H));
        assert_eq!(KeyStroke::from_ascii(b'0').unwrap().key, Keycode::N0);
        assert_eq!(KeyStroke::from_ascii(b'9').unwrap().key, Keycode::N9);
    }

    #[test]
    fn test_macro_punctuation() {
        assert_eq!(KeyStroke::from_ascii(b':').unwrap(), KeyStroke::shifted(Keycode::Semicolon));
        assert_eq!(KeyStroke::from_ascii(b'_').unwrap(), KeyStroke::shifted(Keycode::Minus));
    }

    #[test]
    fn test_every_macro_character_is_typeable() {
        for binding in crate::ACTIONS.iter() {
            if let crate::Action::Text(text) = binding.action {
                for c in text.bytes() {
                    assert!(KeyStroke::from_ascii(c).is_some(), "{:?} in {}", c as char, text);
                }
            }
        }
    }

    #[test]
    fn test_unmapped_bytes() {
        assert!(KeyStroke::from_ascii(0x00).is_none());
        assert!(KeyStroke::from_ascii(0x7F).is_none());
        assert!(KeyStroke::from_ascii(0xC3).is_none());
    }
}
