//! Navigation graph for ground movement
//!
//! A static directed graph over aerodrome positions. Each position has at most
//! one outgoing edge definition: a single successor, or a branch whose target
//! is picked uniformly at random every time it is traversed.

use anyhow::{Context, Result};
use ordered_float::OrderedFloat;
use petgraph::algo::{has_path_connecting, is_cyclic_directed};
use petgraph::graph::{DiGraph, NodeIndex};
use rand::seq::IndexedRandom;
use rand::Rng;
use std::collections::{HashMap, HashSet};

use super::types::{NodeId, Point, Waypoint};

/// Outgoing edge definition of a position
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Successors {
    Single(Waypoint),
    Branch(Vec<Waypoint>),
}

/// A walk from a position to the exit marker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WalkedRoute {
    /// Positions visited, starting at the origin. The exit follows the last one.
    pub positions: Vec<NodeId>,
    /// Branch decisions taken on the way, as (branch point, chosen successor)
    pub branch_choices: Vec<(NodeId, Waypoint)>,
}

impl WalkedRoute {
    /// Whether the walk took `toward` when leaving branch point `at`
    pub fn took(&self, at: NodeId, toward: Waypoint) -> bool {
        self.branch_choices
            .iter()
            .any(|&(node, choice)| node == at && choice == toward)
    }
}

/// Standalone navigation graph
#[derive(Debug, Clone)]
pub struct NavigationGraph {
    /// Mirror of the edge table as a petgraph graph, used for validation
    graph: DiGraph<Waypoint, ()>,

    /// Maps waypoints to their node indices in the graph
    waypoint_to_node: HashMap<Waypoint, NodeIndex>,

    /// Presentation coordinates, indexed by `NodeId`
    points: Vec<Point>,

    /// Exact coordinate lookup used when building from coordinate tables
    point_lookup: HashMap<(OrderedFloat<f32>, OrderedFloat<f32>), NodeId>,

    /// Outgoing edge definition per position
    successors: HashMap<NodeId, Successors>,
}

impl Default for NavigationGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl NavigationGraph {
    pub fn new() -> Self {
        let mut graph = DiGraph::new();
        let mut waypoint_to_node = HashMap::new();
        waypoint_to_node.insert(Waypoint::Exit, graph.add_node(Waypoint::Exit));

        Self {
            graph,
            waypoint_to_node,
            points: Vec::new(),
            point_lookup: HashMap::new(),
            successors: HashMap::new(),
        }
    }

    /// Adds a position, or returns the existing one at the same coordinates
    pub fn add_position(&mut self, point: Point) -> NodeId {
        if let Some(existing) = self.point_lookup.get(&point.key()) {
            return *existing;
        }

        let id = NodeId(self.points.len());
        self.points.push(point);
        self.point_lookup.insert(point.key(), id);
        let index = self.graph.add_node(Waypoint::Node(id));
        self.waypoint_to_node.insert(Waypoint::Node(id), index);
        id
    }

    /// Finds the position at exactly these coordinates
    pub fn position_at(&self, point: Point) -> Option<NodeId> {
        self.point_lookup.get(&point.key()).copied()
    }

    /// Gets the coordinates of a position
    pub fn point(&self, node: NodeId) -> Option<Point> {
        self.points.get(node.0).copied()
    }

    /// Gets the coordinates of a waypoint; the exit marker has none
    pub fn point_of(&self, waypoint: Waypoint) -> Option<Point> {
        waypoint.node().and_then(|node| self.point(node))
    }

    pub fn position_count(&self) -> usize {
        self.points.len()
    }

    pub fn contains(&self, waypoint: Waypoint) -> bool {
        self.waypoint_to_node.contains_key(&waypoint)
    }

    /// Adds an ordinary edge `from -> to`
    pub fn connect(&mut self, from: NodeId, to: impl Into<Waypoint>) -> Result<()> {
        self.define_successors(from, Successors::Single(to.into()))
    }

    /// Adds a branching edge; one target is chosen per traversal
    pub fn connect_branch(&mut self, from: NodeId, targets: Vec<Waypoint>) -> Result<()> {
        if targets.is_empty() {
            anyhow::bail!("Branch from node {} has no targets", from.0);
        }
        self.define_successors(from, Successors::Branch(targets))
    }

    fn define_successors(&mut self, from: NodeId, successors: Successors) -> Result<()> {
        let from_node = *self
            .waypoint_to_node
            .get(&Waypoint::Node(from))
            .with_context(|| format!("Position {} not found", from.0))?;

        if self.successors.contains_key(&from) {
            anyhow::bail!("Position {} already has an outgoing edge", from.0);
        }

        let targets = match &successors {
            Successors::Single(target) => std::slice::from_ref(target),
            Successors::Branch(targets) => targets.as_slice(),
        };

        for target in targets {
            let to_node = *self
                .waypoint_to_node
                .get(target)
                .with_context(|| format!("Edge target {} not found", target))?;
            self.graph.add_edge(from_node, to_node, ());
        }

        self.successors.insert(from, successors);
        Ok(())
    }

    /// Gets the outgoing edge definition of a position
    pub fn successors(&self, from: NodeId) -> Option<&Successors> {
        self.successors.get(&from)
    }

    /// Resolves the next waypoint after `from`, drawing from `rng` at branches
    pub fn next<R: Rng + ?Sized>(&self, from: NodeId, rng: &mut R) -> Option<Waypoint> {
        match self.successors.get(&from)? {
            Successors::Single(target) => Some(*target),
            Successors::Branch(targets) => targets.choose(rng).copied(),
        }
    }

    /// Walks forward from `from` until the exit, recording branch choices
    pub fn walk_to_exit<R: Rng + ?Sized>(&self, from: NodeId, rng: &mut R) -> Result<WalkedRoute> {
        let mut route = WalkedRoute::default();
        let mut current = from;

        loop {
            if route.positions.len() > self.points.len() {
                anyhow::bail!("Walk from node {} does not terminate", from.0);
            }
            route.positions.push(current);

            let next = self
                .next(current, &mut *rng)
                .with_context(|| format!("Position {} has no outgoing edge", current.0))?;

            if let Some(Successors::Branch(_)) = self.successors.get(&current) {
                route.branch_choices.push((current, next));
            }

            match next {
                Waypoint::Exit => return Ok(route),
                Waypoint::Node(node) => current = node,
            }
        }
    }

    /// Enumerates every route from `from` to the exit, one per branch combination
    pub fn routes_to_exit(&self, from: NodeId) -> Vec<WalkedRoute> {
        let mut routes = Vec::new();
        self.collect_routes(from, WalkedRoute::default(), &mut routes);
        routes
    }

    fn collect_routes(&self, current: NodeId, mut prefix: WalkedRoute, routes: &mut Vec<WalkedRoute>) {
        // Validation rejects cycles first, this only guards against misuse
        if prefix.positions.len() > self.points.len() {
            return;
        }
        prefix.positions.push(current);

        match self.successors.get(&current) {
            None => {}
            Some(Successors::Single(Waypoint::Exit)) => routes.push(prefix),
            Some(Successors::Single(Waypoint::Node(next))) => {
                self.collect_routes(*next, prefix, routes)
            }
            Some(Successors::Branch(targets)) => {
                for target in targets {
                    let mut branch = prefix.clone();
                    branch.branch_choices.push((current, *target));
                    match target {
                        Waypoint::Exit => routes.push(branch),
                        Waypoint::Node(next) => self.collect_routes(*next, branch, routes),
                    }
                }
            }
        }
    }

    /// Whether any walk from `from` can reach the exit
    pub fn reaches_exit(&self, from: NodeId) -> bool {
        let (Some(start), Some(exit)) = (
            self.waypoint_to_node.get(&Waypoint::Node(from)),
            self.waypoint_to_node.get(&Waypoint::Exit),
        ) else {
            return false;
        };
        has_path_connecting(&self.graph, *start, *exit, None)
    }

    /// Finds a position reachable from `from` that has no outgoing edge
    pub fn dead_end_from(&self, from: NodeId) -> Option<NodeId> {
        let mut visited = HashSet::new();
        let mut stack = vec![from];

        while let Some(node) = stack.pop() {
            if !visited.insert(node) {
                continue;
            }
            let targets = match self.successors.get(&node) {
                None => return Some(node),
                Some(Successors::Single(target)) => std::slice::from_ref(target),
                Some(Successors::Branch(targets)) => targets.as_slice(),
            };
            stack.extend(targets.iter().filter_map(|target| target.node()));
        }
        None
    }

    /// Rejects graphs with cycles, which would let routes run forever
    pub fn validate(&self) -> Result<()> {
        if is_cyclic_directed(&self.graph) {
            anyhow::bail!("Navigation graph contains a cycle");
        }
        Ok(())
    }
}
