use crate::types::{keys, KeyId, MatrixPos};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Which half of a split board a position belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Left,
    Right,
}

/// Row-split matrix geometry.
///
/// The scan matrix stacks the two halves: the left half occupies rows
/// `0..half_rows`, the right half `half_rows..2*half_rows`. Within each
/// half, rows at `thumb_row_start` and beyond sit below the alphas
/// (thumb clusters, bottom rows).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Geometry {
    pub half_rows: u8,
    pub thumb_row_start: u8,
}

impl Default for Geometry {
    fn default() -> Self {
        Self {
            half_rows: 4,
            thumb_row_start: 3,
        }
    }
}

impl Geometry {
    pub fn hand_of(&self, pos: MatrixPos) -> Hand {
        if pos.row < self.half_rows {
            Hand::Left
        } else {
            Hand::Right
        }
    }

    pub fn same_hand(&self, a: MatrixPos, b: MatrixPos) -> bool {
        self.hand_of(a) == self.hand_of(b)
    }

    /// True when the position is in a row below the alpha block of its half.
    pub fn is_below_alphas(&self, pos: MatrixPos) -> bool {
        pos.row % self.half_rows >= self.thumb_row_start
    }
}

/// Key positions for the default 3x5+3 split layout (Colemak-DH).
/// Rows 0-2 / 4-6 are the alpha blocks, rows 3 / 7 the thumb clusters.
pub const DEFAULT_MATRIX: &[(KeyId, MatrixPos)] = &[
    // Left hand.
    (keys::Q, MatrixPos::new(0, 0)),
    (keys::W, MatrixPos::new(0, 1)),
    (keys::F, MatrixPos::new(0, 2)),
    (keys::P, MatrixPos::new(0, 3)),
    (keys::B, MatrixPos::new(0, 4)),
    (keys::A, MatrixPos::new(1, 0)),
    (keys::R, MatrixPos::new(1, 1)),
    (keys::S, MatrixPos::new(1, 2)),
    (keys::T, MatrixPos::new(1, 3)),
    (keys::G, MatrixPos::new(1, 4)),
    (keys::Z, MatrixPos::new(2, 0)),
    (keys::X, MatrixPos::new(2, 1)),
    (keys::C, MatrixPos::new(2, 2)),
    (keys::D, MatrixPos::new(2, 3)),
    (keys::V, MatrixPos::new(2, 4)),
    (keys::ESC, MatrixPos::new(3, 0)),
    (keys::SPACE, MatrixPos::new(3, 1)),
    (keys::TAB, MatrixPos::new(3, 2)),
    // Right hand.
    (keys::J, MatrixPos::new(4, 0)),
    (keys::L, MatrixPos::new(4, 1)),
    (keys::U, MatrixPos::new(4, 2)),
    (keys::Y, MatrixPos::new(4, 3)),
    (keys::QUOTE, MatrixPos::new(4, 4)),
    (keys::M, MatrixPos::new(5, 0)),
    (keys::N, MatrixPos::new(5, 1)),
    (keys::E, MatrixPos::new(5, 2)),
    (keys::I, MatrixPos::new(5, 3)),
    (keys::O, MatrixPos::new(5, 4)),
    (keys::K, MatrixPos::new(6, 0)),
    (keys::H, MatrixPos::new(6, 1)),
    (keys::COMMA, MatrixPos::new(6, 2)),
    (keys::DOT, MatrixPos::new(6, 3)),
    (keys::SLASH, MatrixPos::new(6, 4)),
    (keys::ENTER, MatrixPos::new(7, 0)),
    (keys::BACKSPACE, MatrixPos::new(7, 1)),
    (keys::DELETE, MatrixPos::new(7, 2)),
    (keys::ALT_REPEAT, MatrixPos::new(7, 3)),
    (keys::SELECT_WORD, MatrixPos::new(7, 4)),
    (keys::REPEAT, MatrixPos::new(7, 5)),
];

lazy_static::lazy_static! {
    static ref MATRIX_INDEX: HashMap<KeyId, MatrixPos> =
        DEFAULT_MATRIX.iter().copied().collect();
}

/// Position of a key in the default matrix, if it is mapped there.
pub fn position_of(key: KeyId) -> Option<MatrixPos> {
    MATRIX_INDEX.get(&key).copied()
}

/// Readable name for logs and diagnostics.
pub fn name_of(key: KeyId) -> Option<&'static str> {
    match key {
        keys::A => Some("a"),
        keys::B => Some("b"),
        keys::C => Some("c"),
        keys::D => Some("d"),
        keys::E => Some("e"),
        keys::F => Some("f"),
        keys::G => Some("g"),
        keys::H => Some("h"),
        keys::I => Some("i"),
        keys::J => Some("j"),
        keys::K => Some("k"),
        keys::L => Some("l"),
        keys::M => Some("m"),
        keys::N => Some("n"),
        keys::O => Some("o"),
        keys::P => Some("p"),
        keys::Q => Some("q"),
        keys::R => Some("r"),
        keys::S => Some("s"),
        keys::T => Some("t"),
        keys::U => Some("u"),
        keys::V => Some("v"),
        keys::W => Some("w"),
        keys::X => Some("x"),
        keys::Y => Some("y"),
        keys::Z => Some("z"),
        keys::ENTER => Some("enter"),
        keys::ESC => Some("esc"),
        keys::BACKSPACE => Some("backspace"),
        keys::TAB => Some("tab"),
        keys::SPACE => Some("space"),
        keys::COMMA => Some(","),
        keys::DOT => Some("."),
        keys::SLASH => Some("/"),
        keys::QUOTE => Some("'"),
        keys::HOME => Some("home"),
        keys::END => Some("end"),
        keys::DELETE => Some("delete"),
        keys::LEFT => Some("left"),
        keys::RIGHT => Some("right"),
        keys::UP => Some("up"),
        keys::DOWN => Some("down"),
        keys::REPEAT => Some("repeat"),
        keys::ALT_REPEAT => Some("alt-repeat"),
        keys::SELECT_WORD => Some("select-word"),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hands_split_by_row_half() {
        let g = Geometry::default();
        assert_eq!(g.hand_of(MatrixPos::new(1, 3)), Hand::Left);
        assert_eq!(g.hand_of(MatrixPos::new(5, 1)), Hand::Right);
        assert!(g.same_hand(MatrixPos::new(0, 0), MatrixPos::new(2, 4)));
        assert!(!g.same_hand(MatrixPos::new(0, 0), MatrixPos::new(4, 0)));
    }

    #[test]
    fn thumb_rows_are_below_alphas_on_both_halves() {
        let g = Geometry::default();
        assert!(g.is_below_alphas(MatrixPos::new(3, 1)));
        assert!(g.is_below_alphas(MatrixPos::new(7, 0)));
        assert!(!g.is_below_alphas(MatrixPos::new(2, 0)));
        assert!(!g.is_below_alphas(MatrixPos::new(6, 4)));
    }

    #[test]
    fn default_matrix_lookup() {
        assert_eq!(position_of(keys::T), Some(MatrixPos::new(1, 3)));
        assert_eq!(position_of(keys::N), Some(MatrixPos::new(5, 1)));
        assert_eq!(position_of(keys::HOME), None);
        assert_eq!(name_of(keys::T), Some("t"));
    }
}
