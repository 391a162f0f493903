use crate::di::DependencyType;
use std::collections::{HashMap, HashSet};

/// A cycle found by [`TypeGraph::detect_cycle`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cycle {
    node: DependencyType,
    path: Vec<DependencyType>,
}

impl Cycle {
    /// The node reached twice on the current DFS path.
    pub fn node(&self) -> DependencyType {
        self.node
    }

    /// Every node of the cycle in edge order, starting and ending with
    /// [`Cycle::node`].
    pub fn path(&self) -> &[DependencyType] {
        &self.path
    }

    pub fn into_path(self) -> Vec<DependencyType> {
        self.path
    }
}

/// Adjacency from a produced type to the types it requires.
#[derive(Debug, Default, Clone)]
pub struct TypeGraph {
    deps: HashMap<DependencyType, Vec<DependencyType>>,
}

impl TypeGraph {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds the edge `from -> to`. With `to = None` only reserves `from`.
    pub fn add_dependency(&mut self, from: DependencyType, to: Option<DependencyType>) {
        let edges = self.deps.entry(from).or_default();
        if let Some(to) = to {
            edges.push(to);
        }
    }

    pub fn dependencies_of(&self, ty: &DependencyType) -> &[DependencyType] {
        self.deps.get(ty).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, ty: &DependencyType) -> bool {
        self.deps.contains_key(ty)
    }

    pub fn len(&self) -> usize {
        self.deps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.deps.is_empty()
    }

    /// Depth-first search over every node. Returns the first cycle found;
    /// which one is reported when several exist depends on map iteration
    /// order.
    pub fn detect_cycle(&self) -> Option<Cycle> {
        let mut visited = HashSet::new();
        let mut stack = Vec::new();
        let mut on_stack = HashSet::new();

        for &node in self.deps.keys() {
            if let Some(cycle) = self.visit(node, &mut visited, &mut stack, &mut on_stack) {
                return Some(cycle);
            }
        }
        None
    }

    fn visit(
        &self,
        node: DependencyType,
        visited: &mut HashSet<DependencyType>,
        stack: &mut Vec<DependencyType>,
        on_stack: &mut HashSet<DependencyType>,
    ) -> Option<Cycle> {
        if on_stack.contains(&node) {
            let start = stack.iter().position(|ty| *ty == node).unwrap_or(0);
            let mut path = stack[start..].to_vec();
            path.push(node);
            return Some(Cycle { node, path });
        }
        if !visited.insert(node) {
            return None;
        }

        stack.push(node);
        on_stack.insert(node);

        for &dep in self.dependencies_of(&node) {
            if let Some(cycle) = self.visit(dep, visited, stack, on_stack) {
                return Some(cycle);
            }
        }

        on_stack.remove(&node);
        stack.pop();
        None
    }

    /// Every reachable node with dependencies ordered before their
    /// dependents. Only meaningful on an acyclic graph; back edges are
    /// ignored.
    pub fn topological_order(&self) -> Vec<DependencyType> {
        let mut visited = HashSet::new();
        let mut order = Vec::with_capacity(self.deps.len());

        for &node in self.deps.keys() {
            self.post_order(node, &mut visited, &mut order);
        }
        order
    }

    fn post_order(
        &self,
        node: DependencyType,
        visited: &mut HashSet<DependencyType>,
        order: &mut Vec<DependencyType>,
    ) {
        if !visited.insert(node) {
            return;
        }
        for &dep in self.dependencies_of(&node) {
            self.post_order(dep, visited, order);
        }
        order.push(node);
    }
}
