use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Direction, Position,
    agent::Agent,
    map::{Grid, GridError},
};

/// What the keeper senses when it looks at a neighboring cell.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CellKind {
    #[default]
    Wall,
    Path,
    Key,
    Door,
}

/// Represents actions an agent can decide to take.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Action {
    Wait,
    Move(Direction),
}

/// Represents the outcome of applying an agent's action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ActionResult {
    Waited,
    Moved,
    /// The move pointed into a wall; the keeper stays put.
    Blocked,
    /// The keeper stepped onto the door holding every key.
    Completed,
    /// The mission is already over.
    Ignored,
}

/// The only window the keeper has onto the maze.
///
/// Looking is always relative to the keeper's current position.
pub trait Surroundings {
    fn look(&self, direction: Direction) -> CellKind;

    fn look_up(&self) -> CellKind {
        self.look(Direction::Up)
    }

    fn look_down(&self) -> CellKind {
        self.look(Direction::Down)
    }

    fn look_left(&self) -> CellKind {
        self.look(Direction::Left)
    }

    fn look_right(&self) -> CellKind {
        self.look(Direction::Right)
    }

    fn total_keys(&self) -> usize;

    fn keys_found(&self) -> usize;

    fn is_mission_complete(&self) -> bool;

    fn keeper_position(&self) -> Position;
}

/// Errors raised while loading a maze from its textual form.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MazeError {
    #[error("Map string is empty.")]
    Empty,
    #[error("Map has zero width.")]
    ZeroWidth,
    #[error("Inconsistent width at row {row}: expected {expected}, found {found}")]
    InconsistentWidth {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("Unknown map code '{code}' at {position}.")]
    UnknownCode { code: String, position: Position },
    #[error("No start position ('ST') found in map.")]
    MissingStart,
    #[error("Multiple start positions ('ST') found.")]
    MultipleStarts,
    #[error("No door ('DR') found in map.")]
    MissingDoor,
    #[error("Multiple doors ('DR') found.")]
    MultipleDoors,
    #[error(transparent)]
    Grid(#[from] GridError),
}

/// Summary of one mission, suitable for printing or serializing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MissionReport {
    pub steps: usize,
    pub keys_found: usize,
    pub total_keys: usize,
    pub completed: bool,
    pub final_position: Position,
}

/// A maze with one keeper, some keys and a single door.
#[derive(Debug, Clone)]
pub struct Maze {
    cells: Grid<CellKind>,
    keeper: Position,
    door: Position,
    total_keys: usize,
    collected_keys: Vec<Position>,
    completed: bool,
}

impl Maze {
    pub fn door_position(&self) -> Position {
        self.door
    }

    /// Keys still lying in the maze.
    pub fn key_positions(&self) -> Vec<Position> {
        self.cells
            .enumerate()
            .filter_map(|(position, cell)| (*cell == CellKind::Key).then_some(position))
            .collect()
    }

    /// Keys picked up so far, in pickup order.
    pub fn collected_key_positions(&self) -> &[Position] {
        &self.collected_keys
    }

    fn cell_at(&self, position: Position) -> CellKind {
        self.cells.get(position).copied().unwrap_or(CellKind::Wall)
    }

    /// Applies a single action for the keeper.
    pub fn apply(&mut self, action: Action) -> ActionResult {
        if self.completed {
            return ActionResult::Ignored;
        }
        let Action::Move(direction) = action else {
            return ActionResult::Waited;
        };

        let target = self.keeper.offset(direction);
        match self.cell_at(target) {
            CellKind::Wall => return ActionResult::Blocked,
            CellKind::Key => {
                // Key found, collect it and clear the cell
                if let Some(cell) = self.cells.get_mut(target) {
                    *cell = CellKind::Path;
                }
                self.collected_keys.push(target);
                debug!(at = %target, found = self.collected_keys.len(), "key collected");
            }
            CellKind::Door if self.collected_keys.len() == self.total_keys => {
                self.completed = true;
            }
            CellKind::Door | CellKind::Path => {}
        }

        self.keeper = target;
        if self.completed {
            ActionResult::Completed
        } else {
            ActionResult::Moved
        }
    }

    /// Runs the simulation loop until the mission completes or `max_steps`
    /// actions have been applied.
    pub fn run_mission(&mut self, agent: &mut dyn Agent, max_steps: usize) -> MissionReport {
        let mut steps = 0;
        while !self.completed && steps < max_steps {
            let action = agent.act(&*self);
            self.apply(action);
            steps += 1;
        }
        info!(
            steps,
            completed = self.completed,
            keys = self.collected_keys.len(),
            "mission finished"
        );
        MissionReport {
            steps,
            keys_found: self.collected_keys.len(),
            total_keys: self.total_keys,
            completed: self.completed,
            final_position: self.keeper,
        }
    }
}

impl Surroundings for Maze {
    fn look(&self, direction: Direction) -> CellKind {
        self.cell_at(self.keeper.offset(direction))
    }

    fn total_keys(&self) -> usize {
        self.total_keys
    }

    fn keys_found(&self) -> usize {
        self.collected_keys.len()
    }

    fn is_mission_complete(&self) -> bool {
        self.completed
    }

    fn keeper_position(&self) -> Position {
        self.keeper
    }
}

/// Loads a maze from whitespace-separated map codes, one row per line.
///
/// `WL` wall, `BL` path, `ST` start (a path cell), `KY` key, `DR` door.
pub fn load_maze_from_string(map_string: &str) -> Result<Maze, MazeError> {
    let lines: Vec<&str> = map_string.trim().lines().collect();
    if lines.is_empty() {
        return Err(MazeError::Empty);
    }

    let height = lines.len();
    let mut width = 0;
    let mut parsed_rows: Vec<Vec<&str>> = Vec::with_capacity(height);

    for (row, line) in lines.iter().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if row == 0 {
            width = tokens.len();
            if width == 0 {
                return Err(MazeError::ZeroWidth);
            }
        } else if tokens.len() != width {
            return Err(MazeError::InconsistentWidth {
                row,
                expected: width,
                found: tokens.len(),
            });
        }
        parsed_rows.push(tokens);
    }

    let mut cells = Grid::new(width, height);
    let mut start: Option<Position> = None;
    let mut door: Option<Position> = None;
    let mut total_keys = 0;

    for (row, tokens) in parsed_rows.iter().enumerate() {
        for (col, token) in tokens.iter().enumerate() {
            let position = Position::new(row as isize, col as isize);
            let kind = match *token {
                "ST" => {
                    if start.replace(position).is_some() {
                        return Err(MazeError::MultipleStarts);
                    }
                    CellKind::Path
                }
                "BL" => CellKind::Path,
                "WL" => CellKind::Wall,
                "KY" => {
                    total_keys += 1;
                    CellKind::Key
                }
                "DR" => {
                    if door.replace(position).is_some() {
                        return Err(MazeError::MultipleDoors);
                    }
                    CellKind::Door
                }
                unknown => {
                    return Err(MazeError::UnknownCode {
                        code: unknown.to_string(),
                        position,
                    });
                }
            };
            cells.set(position, kind)?;
        }
    }

    Ok(Maze {
        cells,
        keeper: start.ok_or(MazeError::MissingStart)?,
        door: door.ok_or(MazeError::MissingDoor)?,
        total_keys,
        collected_keys: Vec::new(),
        completed: false,
    })
}
