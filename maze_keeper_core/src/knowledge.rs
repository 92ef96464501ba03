use std::{
    collections::HashMap,
    hash::{Hash, Hasher},
};

use crate::Position;

/// Index of a canonical node inside the [`KnowledgeGraph`] arena.
pub type NodeId = usize;

/// A grid cell as the keeper knows it: a position plus what has been
/// discovered about it so far.
///
/// Equality and hashing only look at the position, so two nodes for the same
/// cell are the same node whatever their flags say.
#[derive(Debug, Clone, Copy)]
pub struct ExplorationNode {
    pub position: Position,
    /// The keeper has physically stood on this cell.
    pub visited: bool,
    /// A key is currently known to lie on this cell.
    pub has_key: bool,
}

impl ExplorationNode {
    /// An unvisited, key-less node.
    pub fn new(position: Position) -> Self {
        Self {
            position,
            visited: false,
            has_key: false,
        }
    }

    pub fn visited(position: Position) -> Self {
        Self {
            visited: true,
            ..Self::new(position)
        }
    }

    pub fn with_key(position: Position) -> Self {
        Self {
            has_key: true,
            ..Self::new(position)
        }
    }
}

impl PartialEq for ExplorationNode {
    fn eq(&self, other: &Self) -> bool {
        self.position == other.position
    }
}

impl Eq for ExplorationNode {}

impl Hash for ExplorationNode {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.position.hash(state);
    }
}

/// Everything the keeper has learned about the maze.
///
/// Nodes live in an arena and every coordinate maps to exactly one canonical
/// [`NodeId`]. Adjacency lists and the history stack store ids, so updating a
/// node's flags is observed through every list that mentions it.
#[derive(Debug, Default)]
pub struct KnowledgeGraph {
    nodes: Vec<ExplorationNode>,
    index: HashMap<Position, NodeId>,
    /// Only nodes that were recorded directly have an entry here.
    adjacency: HashMap<NodeId, Vec<NodeId>>,
    history: Vec<NodeId>,
    door: Option<NodeId>,
}

impl KnowledgeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolves a position to its canonical node, creating a provisional one
    /// with the given flags if the position was never seen.
    fn intern(&mut self, node: ExplorationNode) -> NodeId {
        if let Some(&id) = self.index.get(&node.position) {
            return id;
        }
        let id = self.nodes.len();
        self.nodes.push(node);
        self.index.insert(node.position, id);
        id
    }

    fn id_of(&self, position: Position) -> Option<NodeId> {
        self.index.get(&position).copied()
    }

    /// Records an observation of `node` and its open neighbors.
    ///
    /// The canonical node for `node.position` takes the supplied flags.
    /// Neighbors already known keep their own flags; unseen ones are added as
    /// provisional nodes. The neighbor list replaces any previous one, and the
    /// node is pushed onto the history stack.
    pub fn record_observation(
        &mut self,
        node: ExplorationNode,
        neighbors: &[ExplorationNode],
    ) -> NodeId {
        let id = self.intern(node);
        let canonical = &mut self.nodes[id];
        canonical.visited = node.visited;
        canonical.has_key = node.has_key;

        let known_neighbors = neighbors
            .iter()
            .map(|neighbor| self.intern(*neighbor))
            .collect();
        self.adjacency.insert(id, known_neighbors);
        self.history.push(id);
        id
    }

    /// Returns the canonical node at `position`, if it has been observed.
    pub fn node(&self, position: Position) -> Option<&ExplorationNode> {
        self.id_of(position).map(|id| &self.nodes[id])
    }

    /// Whether `position` has been recorded with its own neighbor list.
    pub fn is_recorded(&self, position: Position) -> bool {
        self.id_of(position)
            .is_some_and(|id| self.adjacency.contains_key(&id))
    }

    /// Known neighbors of `position` in discovery order.
    ///
    /// Empty for positions that were never recorded.
    pub fn neighbors(&self, position: Position) -> impl Iterator<Item = &ExplorationNode> + '_ {
        self.id_of(position)
            .and_then(|id| self.adjacency.get(&id))
            .into_iter()
            .flatten()
            .map(|&id| &self.nodes[id])
    }

    pub fn neighbor_count(&self, position: Position) -> usize {
        self.neighbors(position).count()
    }

    fn find_neighbor<P>(&self, position: Position, predicate: P) -> Option<Position>
    where
        P: Fn(&ExplorationNode) -> bool,
    {
        self.neighbors(position)
            .find(|neighbor| predicate(*neighbor))
            .map(|neighbor| neighbor.position)
    }

    pub fn has_unvisited_neighbor(&self, position: Position) -> bool {
        self.neighbors(position).any(|neighbor| !neighbor.visited)
    }

    pub fn any_unvisited_neighbor(&self, position: Position) -> Option<Position> {
        self.find_neighbor(position, |neighbor| !neighbor.visited)
    }

    pub fn any_key_neighbor(&self, position: Position) -> Option<Position> {
        self.find_neighbor(position, |neighbor| neighbor.has_key)
    }

    pub fn any_door_neighbor(&self, position: Position) -> Option<Position> {
        let door = self.door()?;
        self.find_neighbor(position, |neighbor| neighbor.position == door)
    }

    /// Distance of the most recent occurrence of `id` from the top of the
    /// history stack, where the top is 1.
    fn history_depth(&self, id: NodeId) -> Option<usize> {
        self.history
            .iter()
            .rposition(|&entry| entry == id)
            .map(|index| self.history.len() - index)
    }

    /// Picks the visited neighbor of `position` that was reached longest ago
    /// among those still in the history stack.
    ///
    /// Ties keep the neighbor found first.
    pub fn farthest_visited_neighbor_in_history(&self, position: Position) -> Option<Position> {
        let id = self.id_of(position)?;
        let mut farthest: Option<(NodeId, usize)> = None;
        for &neighbor in self.adjacency.get(&id)? {
            if !self.nodes[neighbor].visited {
                continue;
            }
            let Some(depth) = self.history_depth(neighbor) else {
                continue;
            };
            if farthest.is_none_or(|(_, best)| depth > best) {
                farthest = Some((neighbor, depth));
            }
        }
        farthest.map(|(neighbor, _)| self.nodes[neighbor].position)
    }

    /// Pops the history stack until `position` no longer appears in it.
    pub fn rollback_until(&mut self, position: Position) {
        let Some(id) = self.id_of(position) else {
            return;
        };
        if let Some(earliest) = self.history.iter().position(|&entry| entry == id) {
            self.history.truncate(earliest);
        }
    }

    /// Top of the history stack.
    pub fn current_position(&self) -> Option<Position> {
        self.history.last().map(|&id| self.nodes[id].position)
    }

    pub fn pop_history(&mut self) -> Option<Position> {
        self.history.pop().map(|id| self.nodes[id].position)
    }

    /// Forgets the whole backtrack trail.
    pub fn clear_history(&mut self) {
        self.history.clear();
    }

    /// History stack from bottom to top.
    pub fn history(&self) -> impl ExactSizeIterator<Item = Position> + '_ {
        self.history.iter().map(|&id| self.nodes[id].position)
    }

    pub fn history_contains(&self, position: Position) -> bool {
        self.id_of(position)
            .is_some_and(|id| self.history.contains(&id))
    }

    pub fn door(&self) -> Option<Position> {
        self.door.map(|id| self.nodes[id].position)
    }

    /// Marks `position` as the door. Callers only do this while the door is
    /// still unknown.
    pub fn set_door(&mut self, position: Position) {
        let id = self.intern(ExplorationNode::new(position));
        self.door = Some(id);
    }

    /// Every node that has been recorded with its own neighbor list.
    pub fn known_nodes(&self) -> impl Iterator<Item = &ExplorationNode> + '_ {
        self.adjacency.keys().map(|&id| &self.nodes[id])
    }

    /// Undirected adjacency over every recorded node and its neighbors.
    ///
    /// An edge listed by either endpoint appears in both directions, once.
    pub fn route_map(&self) -> HashMap<Position, Vec<Position>> {
        let mut routes: HashMap<Position, Vec<Position>> = HashMap::new();
        for (&id, neighbors) in &self.adjacency {
            let position = self.nodes[id].position;
            routes.entry(position).or_default();
            for &neighbor in neighbors {
                let other = self.nodes[neighbor].position;
                let forward = routes.entry(position).or_default();
                if !forward.contains(&other) {
                    forward.push(other);
                }
                let backward = routes.entry(other).or_default();
                if !backward.contains(&position) {
                    backward.push(position);
                }
            }
        }
        routes
    }
}
