use serde::{Deserialize, Serialize};

/// USB HID usage id (keyboard page) key identifier.
///
/// Ids above [`keys::SYNTHETIC_BASE`] are synthetic keys that exist only
/// inside this core (repeat/select triggers) and are never sent on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct KeyId(pub u16);

impl KeyId {
    pub const fn new(usage: u16) -> Self {
        Self(usage)
    }

    /// True for the dedicated modifier usages (LeftCtrl..RightGui).
    pub const fn is_modifier(self) -> bool {
        self.0 >= keys::LCTRL.0 && self.0 <= keys::RGUI.0
    }

    pub const fn is_shift(self) -> bool {
        self.0 == keys::LSHIFT.0 || self.0 == keys::RSHIFT.0
    }

    pub const fn is_letter(self) -> bool {
        self.0 >= keys::A.0 && self.0 <= keys::Z.0
    }

    pub const fn is_synthetic(self) -> bool {
        self.0 >= keys::SYNTHETIC_BASE
    }
}

/// Named key constants for the usages the default tables refer to.
pub mod keys {
    use super::KeyId;

    pub const A: KeyId = KeyId(0x04);
    pub const B: KeyId = KeyId(0x05);
    pub const C: KeyId = KeyId(0x06);
    pub const D: KeyId = KeyId(0x07);
    pub const E: KeyId = KeyId(0x08);
    pub const F: KeyId = KeyId(0x09);
    pub const G: KeyId = KeyId(0x0A);
    pub const H: KeyId = KeyId(0x0B);
    pub const I: KeyId = KeyId(0x0C);
    pub const J: KeyId = KeyId(0x0D);
    pub const K: KeyId = KeyId(0x0E);
    pub const L: KeyId = KeyId(0x0F);
    pub const M: KeyId = KeyId(0x10);
    pub const N: KeyId = KeyId(0x11);
    pub const O: KeyId = KeyId(0x12);
    pub const P: KeyId = KeyId(0x13);
    pub const Q: KeyId = KeyId(0x14);
    pub const R: KeyId = KeyId(0x15);
    pub const S: KeyId = KeyId(0x16);
    pub const T: KeyId = KeyId(0x17);
    pub const U: KeyId = KeyId(0x18);
    pub const V: KeyId = KeyId(0x19);
    pub const W: KeyId = KeyId(0x1A);
    pub const X: KeyId = KeyId(0x1B);
    pub const Y: KeyId = KeyId(0x1C);
    pub const Z: KeyId = KeyId(0x1D);

    pub const N1: KeyId = KeyId(0x1E);
    pub const N0: KeyId = KeyId(0x27);

    pub const ENTER: KeyId = KeyId(0x28);
    pub const ESC: KeyId = KeyId(0x29);
    pub const BACKSPACE: KeyId = KeyId(0x2A);
    pub const TAB: KeyId = KeyId(0x2B);
    pub const SPACE: KeyId = KeyId(0x2C);
    pub const MINUS: KeyId = KeyId(0x2D);
    pub const EQUAL: KeyId = KeyId(0x2E);
    pub const QUOTE: KeyId = KeyId(0x34);
    pub const COMMA: KeyId = KeyId(0x36);
    pub const DOT: KeyId = KeyId(0x37);
    pub const SLASH: KeyId = KeyId(0x38);

    pub const HOME: KeyId = KeyId(0x4A);
    pub const DELETE: KeyId = KeyId(0x4C);
    pub const END: KeyId = KeyId(0x4D);
    pub const RIGHT: KeyId = KeyId(0x4F);
    pub const LEFT: KeyId = KeyId(0x50);
    pub const DOWN: KeyId = KeyId(0x51);
    pub const UP: KeyId = KeyId(0x52);

    pub const LCTRL: KeyId = KeyId(0xE0);
    pub const LSHIFT: KeyId = KeyId(0xE1);
    pub const LALT: KeyId = KeyId(0xE2);
    pub const LGUI: KeyId = KeyId(0xE3);
    pub const RCTRL: KeyId = KeyId(0xE4);
    pub const RSHIFT: KeyId = KeyId(0xE5);
    pub const RALT: KeyId = KeyId(0xE6);
    pub const RGUI: KeyId = KeyId(0xE7);

    /// First id of the synthetic (in-core only) range.
    pub const SYNTHETIC_BASE: u16 = 0x0100;

    pub const REPEAT: KeyId = KeyId(0x0101);
    pub const ALT_REPEAT: KeyId = KeyId(0x0102);
    pub const SELECT_WORD: KeyId = KeyId(0x0103);
}

/// Press or release edge of a physical transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyEdge {
    Down,
    Up,
}

/// Wrapping millisecond timestamp from the scan clock.
///
/// The counter is fixed-width and wraps; comparisons go through
/// [`Tick::since`], which returns a signed distance, so deadlines stay
/// valid across the wrap point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick(pub u32);

impl Tick {
    pub const fn new(ms: u32) -> Self {
        Self(ms)
    }

    /// Signed milliseconds from `earlier` to `self`.
    pub const fn since(self, earlier: Tick) -> i32 {
        self.0.wrapping_sub(earlier.0) as i32
    }

    pub const fn advance(self, ms: u32) -> Tick {
        Tick(self.0.wrapping_add(ms))
    }
}

/// Row and column in the scan matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MatrixPos {
    pub row: u8,
    pub col: u8,
}

impl MatrixPos {
    pub const fn new(row: u8, col: u8) -> Self {
        Self { row, col }
    }
}

/// Modifier keys applied to a keystroke.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Modifiers {
    pub ctrl: bool,
    pub shift: bool,
    pub alt: bool,
    pub gui: bool,
}

impl Modifiers {
    pub const fn none() -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: false,
            gui: false,
        }
    }

    pub const fn ctrl() -> Self {
        Self {
            ctrl: true,
            shift: false,
            alt: false,
            gui: false,
        }
    }

    pub const fn shift() -> Self {
        Self {
            ctrl: false,
            shift: true,
            alt: false,
            gui: false,
        }
    }

    pub const fn alt() -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: true,
            gui: false,
        }
    }

    pub const fn gui() -> Self {
        Self {
            ctrl: false,
            shift: false,
            alt: false,
            gui: true,
        }
    }

    pub const fn is_empty(self) -> bool {
        !(self.ctrl || self.shift || self.alt || self.gui)
    }

    /// True when shift is the only set bit.
    pub const fn only_shift(self) -> bool {
        self.shift && !self.ctrl && !self.alt && !self.gui
    }

    pub const fn union(self, other: Modifiers) -> Modifiers {
        Modifiers {
            ctrl: self.ctrl || other.ctrl,
            shift: self.shift || other.shift,
            alt: self.alt || other.alt,
            gui: self.gui || other.gui,
        }
    }

    /// Bits of `self` not set in `other`.
    pub const fn difference(self, other: Modifiers) -> Modifiers {
        Modifiers {
            ctrl: self.ctrl && !other.ctrl,
            shift: self.shift && !other.shift,
            alt: self.alt && !other.alt,
            gui: self.gui && !other.gui,
        }
    }
}

/// Held plus one-shot modifiers, as fed back by the action dispatcher.
///
/// One-shot clearing is the dispatcher's job; the core reads one
/// consistent snapshot per event and never re-reads mid-decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ModifierState {
    pub held: Modifiers,
    pub oneshot: Modifiers,
}

impl ModifierState {
    pub const fn effective(self) -> Modifiers {
        self.held.union(self.oneshot)
    }
}

/// A single physical key transition from the matrix scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyEvent {
    pub key: KeyId,
    pub pos: MatrixPos,
    pub edge: KeyEdge,
    pub t: Tick,
}

/// A keystroke with its complete modifier context.
///
/// The `mods` of an emitted keystroke are authoritative: the dispatcher
/// applies exactly these modifiers for the stroke, masking physically held
/// ones if they differ.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Keystroke {
    pub key: KeyId,
    #[serde(default)]
    pub mods: Modifiers,
}

impl Keystroke {
    pub const fn plain(key: KeyId) -> Self {
        Self {
            key,
            mods: Modifiers::none(),
        }
    }

    pub const fn with(key: KeyId, mods: Modifiers) -> Self {
        Self { key, mods }
    }
}

/// Resolved output command for the action dispatcher / HID layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Press a key under the given modifier context and keep it held.
    KeyDown(Keystroke),
    /// Release a previously pressed key.
    KeyUp(Keystroke),
    /// Press-and-release in one go (macro taps).
    Tap(Keystroke),
    /// Literal text for the macro layer to type out.
    Text(String),
    LayerOn(u8),
    LayerOff(u8),
    /// Activate modifiers without a key (resolved holds).
    ModsDown(Modifiers),
    ModsUp(Modifiers),
}
