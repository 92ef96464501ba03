use tracing::{info, warn};

use crate::{
    Direction,
    environment::{Action, CellKind, Surroundings},
    knowledge::{ExplorationNode, KnowledgeGraph},
    strategy::{GoToDoor, SeekDoor, SeekKeys, Strategy},
};

/// Trait defining the behavior of an agent.
/// Agents decide which action to take based on what they can sense.
pub trait Agent {
    /// Determines the action the agent wants to perform.
    /// `&mut self` allows the agent to maintain internal state between cycles.
    fn act(&mut self, view: &dyn Surroundings) -> Action;
}

/// An agent that maps the maze as it goes, collects every key and then heads
/// for the door.
#[derive(Debug, Default)]
pub struct KeeperAgent {
    knowledge: KnowledgeGraph,
    active_strategy: Option<&'static str>,
}

impl KeeperAgent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn knowledge(&self) -> &KnowledgeGraph {
        &self.knowledge
    }

    /// Turns the four looks around the keeper into neighbor nodes.
    ///
    /// Walls are dropped. Seeing the door for the first time records it.
    fn observe_neighbors(&mut self, view: &dyn Surroundings) -> Vec<ExplorationNode> {
        let current = view.keeper_position();
        let mut neighbors = Vec::with_capacity(Direction::ALL.len());
        for direction in Direction::ALL {
            let kind = view.look(direction);
            if kind == CellKind::Wall {
                continue;
            }
            let position = current.offset(direction);
            if kind == CellKind::Door && self.knowledge.door().is_none() {
                info!(door = %position, "door located");
                self.knowledge.set_door(position);
            }
            neighbors.push(ExplorationNode {
                has_key: kind == CellKind::Key,
                ..ExplorationNode::new(position)
            });
        }
        neighbors
    }

    fn select_strategy(&self, view: &dyn Surroundings) -> &'static dyn Strategy {
        let missing_keys = view.total_keys().saturating_sub(view.keys_found());
        if missing_keys > 0 {
            &SeekKeys
        } else if self.knowledge.door().is_none() {
            &SeekDoor
        } else {
            &GoToDoor
        }
    }
}

impl Agent for KeeperAgent {
    fn act(&mut self, view: &dyn Surroundings) -> Action {
        // Standing on a cell picks up whatever key was there.
        let current = ExplorationNode::visited(view.keeper_position());
        let neighbors = self.observe_neighbors(view);
        self.knowledge.record_observation(current, &neighbors);

        let strategy = self.select_strategy(view);
        if self.active_strategy != Some(strategy.name()) {
            info!(
                strategy = strategy.name(),
                keys_found = view.keys_found(),
                total_keys = view.total_keys(),
                "switching strategy"
            );
            self.active_strategy = Some(strategy.name());
        }

        match strategy.next_move(&mut self.knowledge) {
            Ok(action) => action,
            Err(error) => {
                warn!(%error, at = %current.position, "no move decided, waiting");
                Action::Wait
            }
        }
    }
}
