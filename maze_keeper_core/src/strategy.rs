use std::{
    cmp::Ordering,
    collections::{BinaryHeap, HashMap, VecDeque, hash_map::Entry},
};

use tracing::debug;

use crate::{Direction, Position, environment::Action, knowledge::KnowledgeGraph};

/// Reasons a strategy could not come up with a move.
///
/// None of these are fatal; the keeper waits a cycle and tries again with
/// fresh observations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    #[error("the keeper does not know its current position")]
    UnknownPosition,
    #[error("the door location is not known yet")]
    DoorUnknown,
    #[error("no known route from {from} to the door at {door}")]
    UnreachableDoor { from: Position, door: Position },
    #[error("cannot step from {from} to non-adjacent {to}")]
    NotAdjacent { from: Position, to: Position },
    #[error("dead end at {at} with nothing left to backtrack to")]
    HistoryExhausted { at: Position },
    #[error("no visited neighbor of {at} remains in the backtrack history")]
    NoBacktrackTarget { at: Position },
}

/// A policy that turns the current knowledge into exactly one move.
pub trait Strategy {
    fn name(&self) -> &'static str;

    /// Decides the next move. May pop the knowledge history while backtracking.
    fn next_move(&self, knowledge: &mut KnowledgeGraph) -> Result<Action, StrategyError>;
}

fn current_position(knowledge: &KnowledgeGraph) -> Result<Position, StrategyError> {
    knowledge
        .current_position()
        .ok_or(StrategyError::UnknownPosition)
}

/// Converts a move between two adjacent positions into an Action
pub fn step_toward(src: Position, dst: Position) -> Result<Action, StrategyError> {
    Direction::between(src, dst)
        .map(Action::Move)
        .ok_or(StrategyError::NotAdjacent { from: src, to: dst })
}

/// Heads for unexplored territory, backtracking when none is adjacent.
///
/// Dead ends (one known neighbor, nothing unvisited) are dropped from the
/// history for good. Otherwise the keeper returns to the visited neighbor
/// that has been in the history longest.
///
/// When the history has nothing left to offer, which happens once the keeper
/// closes a loop, it walks the shortest known route towards the nearest
/// unvisited cell and starts a fresh history from there.
pub fn advance_to_unexplored(
    knowledge: &mut KnowledgeGraph,
    current: Position,
) -> Result<Action, StrategyError> {
    if let Some(unvisited) = knowledge.any_unvisited_neighbor(current) {
        debug!(from = %current, to = %unvisited, "moving to unvisited neighbor");
        return step_toward(current, unvisited);
    }

    let exhausted =
        if knowledge.neighbor_count(current) == 1 && !knowledge.has_unvisited_neighbor(current) {
            if knowledge.history().len() < 2 {
                StrategyError::HistoryExhausted { at: current }
            } else {
                let popped = knowledge.pop_history();
                debug_assert_eq!(popped, Some(current));
                match knowledge.pop_history() {
                    Some(previous) if Direction::between(current, previous).is_some() => {
                        debug!(from = %current, to = %previous, "backing out of dead end");
                        return step_toward(current, previous);
                    }
                    _ => StrategyError::HistoryExhausted { at: current },
                }
            }
        } else if let Some(target) = knowledge.farthest_visited_neighbor_in_history(current) {
            knowledge.rollback_until(target);
            debug!(from = %current, to = %target, "backtracking to farthest visited neighbor");
            return step_toward(current, target);
        } else {
            StrategyError::NoBacktrackTarget { at: current }
        };

    let Some(route) = route_to_nearest_unvisited(knowledge, current) else {
        return Err(exhausted);
    };
    let Some(&next) = route.get(1) else {
        return Err(exhausted);
    };
    knowledge.clear_history();
    debug!(
        from = %current,
        to = %next,
        remaining = route.len() - 1,
        "history exhausted, routing to nearest unvisited cell"
    );
    step_toward(current, next)
}

/// Breadth-first search over the discovered routes for the closest cell the
/// keeper has not stood on yet.
///
/// The returned route starts at `start` and ends at the unvisited cell.
fn route_to_nearest_unvisited(
    knowledge: &KnowledgeGraph,
    start: Position,
) -> Option<Vec<Position>> {
    let routes = knowledge.route_map();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut queue = VecDeque::from([start]);
    came_from.insert(start, start);

    while let Some(current) = queue.pop_front() {
        if current != start && knowledge.node(current).is_some_and(|node| !node.visited) {
            let mut route = vec![current];
            let mut at = current;
            while at != start {
                at = *came_from.get(&at)?;
                route.push(at);
            }
            route.reverse();
            return Some(route);
        }
        for &neighbor in routes.get(&current).into_iter().flatten() {
            if let Entry::Vacant(entry) = came_from.entry(neighbor) {
                entry.insert(current);
                queue.push_back(neighbor);
            }
        }
    }
    None
}

/// Grabs adjacent keys, exploring otherwise.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeekKeys;

impl Strategy for SeekKeys {
    fn name(&self) -> &'static str {
        "seek-keys"
    }

    fn next_move(&self, knowledge: &mut KnowledgeGraph) -> Result<Action, StrategyError> {
        let current = current_position(knowledge)?;
        if let Some(key) = knowledge.any_key_neighbor(current) {
            debug!(from = %current, to = %key, "moving to key neighbor");
            return step_toward(current, key);
        }
        advance_to_unexplored(knowledge, current)
    }
}

/// Explores until the door shows up next to the keeper.
#[derive(Debug, Clone, Copy, Default)]
pub struct SeekDoor;

impl Strategy for SeekDoor {
    fn name(&self) -> &'static str {
        "seek-door"
    }

    fn next_move(&self, knowledge: &mut KnowledgeGraph) -> Result<Action, StrategyError> {
        let current = current_position(knowledge)?;
        if let Some(door) = knowledge.any_door_neighbor(current) {
            debug!(from = %current, to = %door, "moving to door neighbor");
            return step_toward(current, door);
        }
        advance_to_unexplored(knowledge, current)
    }
}

/// Walks the shortest known route to a door whose location is known.
#[derive(Debug, Clone, Copy, Default)]
pub struct GoToDoor;

impl Strategy for GoToDoor {
    fn name(&self) -> &'static str {
        "go-to-door"
    }

    fn next_move(&self, knowledge: &mut KnowledgeGraph) -> Result<Action, StrategyError> {
        let current = current_position(knowledge)?;
        if let Some(door) = knowledge.any_door_neighbor(current) {
            debug!(from = %current, to = %door, "moving to door neighbor");
            return step_toward(current, door);
        }

        let door = knowledge.door().ok_or(StrategyError::DoorUnknown)?;
        if current == door {
            return Ok(Action::Wait);
        }
        let routes = knowledge.route_map();
        let path = a_star_path(current, door, &routes).ok_or(StrategyError::UnreachableDoor {
            from: current,
            door,
        })?;
        let next = path
            .get(1)
            .copied()
            .ok_or(StrategyError::UnreachableDoor {
                from: current,
                door,
            })?;
        debug!(from = %current, to = %next, remaining = path.len() - 1, "following route to door");
        step_toward(current, next)
    }
}

/// A* over the discovered routes. Every edge costs one step.
///
/// The returned path starts at `start` and ends at `goal`.
fn a_star_path(
    start: Position,
    goal: Position,
    routes: &HashMap<Position, Vec<Position>>,
) -> Option<Vec<Position>> {
    // For priority queue
    #[derive(Clone, Eq, PartialEq)]
    struct PrioritizedItem {
        priority: usize,
        position: Position,
    }

    impl Ord for PrioritizedItem {
        fn cmp(&self, other: &Self) -> Ordering {
            // Reverse ordering for min-heap behavior
            other.priority.cmp(&self.priority)
        }
    }

    impl PartialOrd for PrioritizedItem {
        fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
            Some(self.cmp(other))
        }
    }

    let mut frontier = BinaryHeap::new();
    let mut came_from: HashMap<Position, Position> = HashMap::new();
    let mut cost_so_far: HashMap<Position, usize> = HashMap::new();

    frontier.push(PrioritizedItem {
        priority: 0,
        position: start,
    });
    cost_so_far.insert(start, 0);

    let mut goal_reached = false;

    while let Some(PrioritizedItem {
        position: current, ..
    }) = frontier.pop()
    {
        if current == goal {
            goal_reached = true;
            break;
        }

        let Some(neighbors) = routes.get(&current) else {
            continue;
        };
        let new_cost = cost_so_far.get(&current).copied().unwrap_or(usize::MAX - 1) + 1;

        for &neighbor in neighbors {
            if cost_so_far
                .get(&neighbor)
                .is_none_or(|&known| new_cost < known)
            {
                cost_so_far.insert(neighbor, new_cost);
                frontier.push(PrioritizedItem {
                    priority: new_cost + neighbor.manhattan_distance(goal),
                    position: neighbor,
                });
                came_from.insert(neighbor, current);
            }
        }
    }

    if !goal_reached {
        return None;
    }

    // Reconstruct path
    let mut path = vec![goal];
    let mut current = goal;
    while current != start {
        current = *came_from.get(&current)?;
        path.push(current);
    }

    path.reverse();
    Some(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::knowledge::ExplorationNode;

    fn pos(row: isize, col: isize) -> Position {
        Position::new(row, col)
    }

    #[test]
    fn step_toward_maps_row_and_column_changes() {
        let origin = pos(2, 2);
        assert_eq!(step_toward(origin, pos(1, 2)), Ok(Action::Move(Direction::Up)));
        assert_eq!(step_toward(origin, pos(3, 2)), Ok(Action::Move(Direction::Down)));
        assert_eq!(step_toward(origin, pos(2, 1)), Ok(Action::Move(Direction::Left)));
        assert_eq!(step_toward(origin, pos(2, 3)), Ok(Action::Move(Direction::Right)));
        assert_eq!(
            step_toward(origin, pos(3, 3)),
            Err(StrategyError::NotAdjacent {
                from: origin,
                to: pos(3, 3)
            })
        );
    }

    #[test]
    fn every_strategy_needs_a_current_position() {
        let mut k = KnowledgeGraph::new();
        let strategies: [&dyn Strategy; 3] = [&SeekKeys, &SeekDoor, &GoToDoor];
        for strategy in strategies {
            assert_eq!(
                strategy.next_move(&mut k),
                Err(StrategyError::UnknownPosition),
                "{}",
                strategy.name()
            );
        }
    }

    #[test]
    fn dead_end_with_short_history_leaves_history_alone() {
        let mut k = KnowledgeGraph::new();
        k.record_observation(
            ExplorationNode::visited(pos(0, 0)),
            &[ExplorationNode::visited(pos(0, 1))],
        );
        assert_eq!(
            SeekKeys.next_move(&mut k),
            Err(StrategyError::HistoryExhausted { at: pos(0, 0) })
        );
        assert_eq!(k.history().len(), 1);
    }

    #[test]
    fn no_backtrack_target_is_reported() {
        let mut k = KnowledgeGraph::new();
        k.record_observation(
            ExplorationNode::visited(pos(0, 0)),
            &[
                ExplorationNode::visited(pos(0, 1)),
                ExplorationNode::visited(pos(1, 0)),
            ],
        );
        assert_eq!(
            SeekDoor.next_move(&mut k),
            Err(StrategyError::NoBacktrackTarget { at: pos(0, 0) })
        );
    }

    #[test]
    fn closed_loop_routes_to_nearest_unvisited_cell() {
        // (0,0) - (0,1)
        //   |       |
        // (1,0) - (1,1)
        //   |
        // (2,0) unvisited
        let mut k = KnowledgeGraph::new();
        let n = ExplorationNode::new;
        k.record_observation(
            ExplorationNode::visited(pos(1, 0)),
            &[n(pos(0, 0)), n(pos(2, 0))],
        );
        k.record_observation(
            ExplorationNode::visited(pos(1, 1)),
            &[n(pos(1, 0)), n(pos(0, 1))],
        );
        k.record_observation(
            ExplorationNode::visited(pos(0, 1)),
            &[n(pos(1, 1)), n(pos(0, 0))],
        );
        k.rollback_until(pos(1, 0));
        k.record_observation(
            ExplorationNode::visited(pos(0, 0)),
            &[n(pos(0, 1)), n(pos(1, 0))],
        );
        assert_eq!(k.farthest_visited_neighbor_in_history(pos(0, 0)), None);

        assert_eq!(SeekKeys.next_move(&mut k), Ok(Action::Move(Direction::Down)));
        assert_eq!(k.history().len(), 0);

        // One step later the route is still followed rather than undone.
        k.record_observation(
            ExplorationNode::visited(pos(1, 0)),
            &[n(pos(0, 0)), n(pos(2, 0))],
        );
        assert_eq!(SeekKeys.next_move(&mut k), Ok(Action::Move(Direction::Down)));
    }

    #[test]
    fn route_to_nearest_unvisited_walks_known_cells() {
        let mut k = KnowledgeGraph::new();
        let n = ExplorationNode::new;
        k.record_observation(ExplorationNode::visited(pos(0, 0)), &[n(pos(0, 1))]);
        k.record_observation(
            ExplorationNode::visited(pos(0, 1)),
            &[n(pos(0, 0)), n(pos(0, 2))],
        );
        k.record_observation(
            ExplorationNode::visited(pos(0, 2)),
            &[n(pos(0, 1)), n(pos(0, 3))],
        );

        assert_eq!(
            route_to_nearest_unvisited(&k, pos(0, 0)),
            Some(vec![pos(0, 0), pos(0, 1), pos(0, 2), pos(0, 3)])
        );
        k.record_observation(ExplorationNode::visited(pos(0, 3)), &[n(pos(0, 2))]);
        assert_eq!(route_to_nearest_unvisited(&k, pos(0, 0)), None);
    }

    #[test]
    fn non_adjacent_neighbor_is_flagged() {
        let mut k = KnowledgeGraph::new();
        k.record_observation(
            ExplorationNode::visited(pos(0, 0)),
            &[ExplorationNode::new(pos(5, 5))],
        );
        assert_eq!(
            SeekKeys.next_move(&mut k),
            Err(StrategyError::NotAdjacent {
                from: pos(0, 0),
                to: pos(5, 5)
            })
        );
    }

    #[test]
    fn seek_door_steps_onto_adjacent_door() {
        let mut k = KnowledgeGraph::new();
        k.set_door(pos(1, 0));
        k.record_observation(
            ExplorationNode::visited(pos(0, 0)),
            &[ExplorationNode::new(pos(0, 1)), ExplorationNode::new(pos(1, 0))],
        );
        assert_eq!(SeekDoor.next_move(&mut k), Ok(Action::Move(Direction::Down)));
    }

    #[test]
    fn go_to_door_without_door_fails() {
        let mut k = KnowledgeGraph::new();
        k.record_observation(ExplorationNode::visited(pos(0, 0)), &[]);
        assert_eq!(GoToDoor.next_move(&mut k), Err(StrategyError::DoorUnknown));
    }

    #[test]
    fn go_to_door_reports_disconnected_door() {
        let mut k = KnowledgeGraph::new();
        k.set_door(pos(4, 4));
        k.record_observation(
            ExplorationNode::visited(pos(0, 0)),
            &[ExplorationNode::new(pos(0, 1))],
        );
        assert_eq!(
            GoToDoor.next_move(&mut k),
            Err(StrategyError::UnreachableDoor {
                from: pos(0, 0),
                door: pos(4, 4)
            })
        );
    }

    #[test]
    fn a_star_finds_shortest_route_around_a_loop() {
        // 0,0 - 0,1 - 0,2
        //  |           |
        // 1,0         1,2
        //  |           |
        // 2,0 - 2,1 - 2,2
        let edges = [
            (pos(0, 0), pos(0, 1)),
            (pos(0, 1), pos(0, 2)),
            (pos(0, 2), pos(1, 2)),
            (pos(1, 2), pos(2, 2)),
            (pos(0, 0), pos(1, 0)),
            (pos(1, 0), pos(2, 0)),
            (pos(2, 0), pos(2, 1)),
            (pos(2, 1), pos(2, 2)),
        ];
        let mut routes: HashMap<Position, Vec<Position>> = HashMap::new();
        for (a, b) in edges {
            routes.entry(a).or_default().push(b);
            routes.entry(b).or_default().push(a);
        }
        let path = a_star_path(pos(0, 1), pos(1, 2), &routes).expect("connected");
        assert_eq!(path, vec![pos(0, 1), pos(0, 2), pos(1, 2)]);
        assert_eq!(a_star_path(pos(0, 0), pos(9, 9), &routes), None);
    }
}
