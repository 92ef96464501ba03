use std::fmt;

use serde::{Deserialize, Serialize};

pub mod agent;
pub mod environment;
pub mod knowledge;
pub mod map;
pub mod strategy;

/// Represents a 2D grid coordinate as (row, column).
///
/// Rows grow downwards and columns grow to the right. Both are signed so that
/// offsets past the edge of a maze are still representable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Position {
    pub row: isize,
    pub col: isize,
}

impl Position {
    pub const fn new(row: isize, col: isize) -> Self {
        Self { row, col }
    }

    /// Returns the position one cell away in the given direction.
    pub fn offset(self, direction: Direction) -> Position {
        let (dr, dc) = direction.delta();
        Position {
            row: self.row + dr,
            col: self.col + dc,
        }
    }

    /// Returns manhattan distance between two positions
    pub fn manhattan_distance(self, other: Position) -> usize {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

/// One of the four cardinal directions the keeper can look or move in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    /// All directions, in the order the keeper looks around.
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    /// (row, col) increment for one step in this direction.
    pub fn delta(self) -> (isize, isize) {
        match self {
            Direction::Up => (-1, 0),
            Direction::Down => (1, 0),
            Direction::Left => (0, -1),
            Direction::Right => (0, 1),
        }
    }

    /// Direction of a single step from `src` to `dst`.
    ///
    /// Returns `None` unless the two positions are grid-adjacent.
    pub fn between(src: Position, dst: Position) -> Option<Direction> {
        match (dst.row - src.row, dst.col - src.col) {
            (-1, 0) => Some(Direction::Up),
            (1, 0) => Some(Direction::Down),
            (0, -1) => Some(Direction::Left),
            (0, 1) => Some(Direction::Right),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use proptest::prelude::*;

    use super::*;

    #[test]
    fn offset_follows_row_col_convention() {
        let origin = Position::new(2, 2);
        assert_eq!(origin.offset(Direction::Up), Position::new(1, 2));
        assert_eq!(origin.offset(Direction::Down), Position::new(3, 2));
        assert_eq!(origin.offset(Direction::Left), Position::new(2, 1));
        assert_eq!(origin.offset(Direction::Right), Position::new(2, 3));
    }

    #[test]
    fn between_rejects_non_adjacent_cells() {
        let origin = Position::new(0, 0);
        assert_eq!(Direction::between(origin, origin), None);
        assert_eq!(Direction::between(origin, Position::new(1, 1)), None);
        assert_eq!(Direction::between(origin, Position::new(0, 2)), None);
    }

    proptest! {
        #[test]
        fn positions_compare_and_hash_by_value(row in -1000isize..1000, col in -1000isize..1000) {
            let a = Position::new(row, col);
            let b = Position { row, col };
            prop_assert_eq!(a, b);

            let mut set = HashSet::new();
            set.insert(a);
            prop_assert!(set.contains(&b));
            prop_assert!(!set.insert(b));
        }

        #[test]
        fn between_inverts_offset(row in -50isize..50, col in -50isize..50, idx in 0usize..4) {
            let src = Position::new(row, col);
            let direction = Direction::ALL[idx];
            prop_assert_eq!(Direction::between(src, src.offset(direction)), Some(direction));
        }
    }
}
