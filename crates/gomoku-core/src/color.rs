//! Stone color representation.

/// Represents the two players in gomoku.
///
/// Black always moves first from an empty board. The discriminants double as
/// the slot index used by per-color statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum Color {
    Black = 0,
    White = 1,
}

impl Color {
    /// Both colors, in index order.
    pub const ALL: [Color; 2] = [Color::Black, Color::White];

    /// Returns the opposite color.
    #[inline]
    pub const fn opposite(self) -> Self {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
        }
    }

    /// Returns the index (0 for Black, 1 for White).
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Returns the stone symbol used in position notation.
    #[inline]
    pub const fn to_char(self) -> char {
        match self {
            Color::Black => 'X',
            Color::White => 'O',
        }
    }

    /// Parses a stone symbol (`X` or `O`).
    #[inline]
    pub const fn from_char(c: char) -> Option<Self> {
        match c {
            'X' => Some(Color::Black),
            'O' => Some(Color::White),
            _ => None,
        }
    }

    /// Lowercase name used on the wire (`black` / `white`).
    #[inline]
    pub const fn protocol_name(self) -> &'static str {
        match self {
            Color::Black => "black",
            Color::White => "white",
        }
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Black => write!(f, "Black"),
            Color::White => write!(f, "White"),
        }
    }
}
