use std::ops::{Index, IndexMut};

use serde::{Deserialize, Serialize};

use crate::Position;

/// Represents errors that can occur within the grid operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GridError {
    #[error("Position {position} is out of bounds for grid size ({width}, {height})")]
    OutOfBounds {
        position: Position,
        width: usize,
        height: usize,
    },
}

/// A generic 2D grid structure.
///
/// Stores elements of type `T` in a flat vector using row-major order.
/// Cells are addressed by [`Position`]; negative or oversized coordinates
/// are simply outside the grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Grid<T> {
    width: usize,
    height: usize,
    cells: Vec<T>,
}

impl<T> Grid<T> {
    /// Creates a new grid with the specified dimensions, filled with default values.
    ///
    /// # Panics
    ///
    /// Panics if `width * height` overflows `usize`.
    pub fn new(width: usize, height: usize) -> Self
    where
        T: Default + Clone,
    {
        let size = width.checked_mul(height).expect("Grid size overflow");
        Grid {
            width,
            height,
            cells: vec![T::default(); size],
        }
    }

    /// Returns the width of the grid.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns the height of the grid.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Converts a position to a flat vector index.
    ///
    /// Returns `None` if the position is outside the grid.
    #[inline]
    pub fn position_to_index(&self, position: Position) -> Option<usize> {
        let row = usize::try_from(position.row).ok()?;
        let col = usize::try_from(position.col).ok()?;
        if row < self.height && col < self.width {
            Some(row * self.width + col)
        } else {
            None
        }
    }

    /// Converts a flat vector index back to a position.
    #[inline]
    fn index_to_position(width: usize, index: usize) -> Position {
        Position::new((index / width) as isize, (index % width) as isize)
    }

    /// Gets an immutable reference to the cell at the given position.
    pub fn get(&self, position: Position) -> Option<&T> {
        self.cells.get(self.position_to_index(position)?)
    }

    /// Gets a mutable reference to the cell at the given position.
    pub fn get_mut(&mut self, position: Position) -> Option<&mut T> {
        let index = self.position_to_index(position)?;
        self.cells.get_mut(index)
    }

    /// Sets the value of the cell at the given position.
    pub fn set(&mut self, position: Position, value: T) -> Result<(), GridError> {
        let index = self
            .position_to_index(position)
            .ok_or(GridError::OutOfBounds {
                position,
                width: self.width,
                height: self.height,
            })?;
        self.cells[index] = value;
        Ok(())
    }

    /// Returns an iterator that yields `(Position, &T)` for each cell in row-major order.
    pub fn enumerate(&self) -> impl Iterator<Item = (Position, &T)> {
        let width = self.width;
        self.cells
            .iter()
            .enumerate()
            .map(move |(index, cell)| (Self::index_to_position(width, index), cell))
    }
}

impl<T> Index<Position> for Grid<T> {
    type Output = T;

    #[inline]
    fn index(&self, position: Position) -> &Self::Output {
        match self.position_to_index(position) {
            Some(idx) => &self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, self.width, self.height
            ),
        }
    }
}

impl<T> IndexMut<Position> for Grid<T> {
    #[inline]
    fn index_mut(&mut self, position: Position) -> &mut Self::Output {
        let width = self.width;
        let height = self.height;
        match self.position_to_index(position) {
            Some(idx) => &mut self.cells[idx],
            None => panic!(
                "Grid index {} out of bounds for grid size ({}, {})",
                position, width, height
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_and_oversized_positions_are_outside() {
        let grid: Grid<u8> = Grid::new(3, 2);
        assert!(grid.get(Position::new(-1, 0)).is_none());
        assert!(grid.get(Position::new(0, -1)).is_none());
        assert!(grid.get(Position::new(2, 0)).is_none());
        assert!(grid.get(Position::new(0, 3)).is_none());
        assert_eq!(grid.get(Position::new(1, 2)), Some(&0));
    }

    #[test]
    fn set_reports_out_of_bounds() {
        let mut grid: Grid<u8> = Grid::new(2, 2);
        assert!(grid.set(Position::new(1, 1), 7).is_ok());
        assert_eq!(grid[Position::new(1, 1)], 7);
        assert_eq!(
            grid.set(Position::new(5, 0), 1),
            Err(GridError::OutOfBounds {
                position: Position::new(5, 0),
                width: 2,
                height: 2,
            })
        );
    }

    #[test]
    fn enumerate_is_row_major() {
        let mut grid: Grid<u8> = Grid::new(2, 2);
        grid[Position::new(1, 0)] = 3;
        let cells: Vec<_> = grid.enumerate().map(|(p, v)| (p, *v)).collect();
        assert_eq!(
            cells,
            vec![
                (Position::new(0, 0), 0),
                (Position::new(0, 1), 0),
                (Position::new(1, 0), 3),
                (Position::new(1, 1), 0),
            ]
        );
    }
}
