//! Skill dependency graph
//!
//! Nodes are skill ids in insertion order, edges are `depends_on`
//! references resolved to indices. References that resolve to nothing are
//! kept aside and reported by [`DependencyGraph::validate`].

use skillreg_types::SkillMetadata;
use std::collections::HashMap;

use crate::error::{Relation, Result, SkillError};

/// Id-indexed adjacency list over `depends_on` edges
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    edges: Vec<Vec<usize>>,
    dangling: Vec<(usize, String, Relation)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mark {
    Unvisited,
    InProgress,
    Done,
}

/// Depth-first walk with three-coloring
///
/// Iterative: each stack frame is a node plus the index of its next
/// unexplored edge, so chain depth is bounded by memory, not the call stack.
struct Walk<'g> {
    graph: &'g DependencyGraph,
    marks: Vec<Mark>,
    stack: Vec<(usize, usize)>,
    order: Vec<usize>,
    cycles: Vec<Vec<String>>,
    fail_fast: bool,
}

/// What to do after reaching a node along an edge
enum Step {
    Skip,
    Descend,
    Stop,
}

impl<'g> Walk<'g> {
    fn new(graph: &'g DependencyGraph, fail_fast: bool) -> Self {
        Self {
            graph,
            marks: vec![Mark::Unvisited; graph.ids.len()],
            stack: Vec::new(),
            order: Vec::new(),
            cycles: Vec::new(),
            fail_fast,
        }
    }

    /// Walk everything reachable from `root`; returns `false` once the walk must stop
    fn visit(&mut self, root: usize) -> bool {
        if matches!(self.reach(root), Step::Stop) {
            return false;
        }

        let graph = self.graph;
        while let Some(frame) = self.stack.last_mut() {
            let (node, next) = *frame;
            if let Some(&dep) = graph.edges[node].get(next) {
                frame.1 += 1;
                if matches!(self.reach(dep), Step::Stop) {
                    return false;
                }
            } else {
                self.stack.pop();
                self.marks[node] = Mark::Done;
                self.order.push(node);
            }
        }
        true
    }

    fn reach(&mut self, node: usize) -> Step {
        match self.marks[node] {
            Mark::Done => Step::Skip,
            Mark::InProgress => {
                let start = self
                    .stack
                    .iter()
                    .position(|&(n, _)| n == node)
                    .unwrap_or(0);
                let mut path: Vec<String> = self.stack[start..]
                    .iter()
                    .map(|&(n, _)| self.graph.ids[n].clone())
                    .collect();
                path.push(self.graph.ids[node].clone());
                self.cycles.push(path);
                if self.fail_fast {
                    Step::Stop
                } else {
                    Step::Skip
                }
            }
            Mark::Unvisited => {
                self.marks[node] = Mark::InProgress;
                self.stack.push((node, 0));
                Step::Descend
            }
        }
    }

    fn into_result(mut self) -> Result<Vec<usize>> {
        match self.cycles.pop() {
            Some(path) => Err(SkillError::CircularDependency { path }),
            None => Ok(self.order),
        }
    }
}

impl DependencyGraph {
    /// Build the graph: one edge per `depends_on` entry
    ///
    /// When ids repeat, the first record wins; duplicates are a structural
    /// error reported by the registry, not here.
    #[must_use]
    pub fn build(skills: &[SkillMetadata]) -> Self {
        let mut index = HashMap::with_capacity(skills.len());
        let mut ids = Vec::with_capacity(skills.len());
        for skill in skills {
            if !index.contains_key(&skill.id) {
                index.insert(skill.id.clone(), ids.len());
                ids.push(skill.id.clone());
            }
        }

        let mut edges = vec![Vec::new(); ids.len()];
        let mut built = vec![false; ids.len()];
        let mut dangling = Vec::new();
        for skill in skills {
            let from = index[&skill.id];
            if built[from] {
                continue;
            }
            built[from] = true;
            for dep in &skill.depends_on {
                match index.get(dep) {
                    Some(&to) if !edges[from].contains(&to) => edges[from].push(to),
                    Some(_) => {}
                    None => dangling.push((from, dep.clone(), Relation::DependsOn)),
                }
            }
            for target in skill.delegates_to.keys() {
                if !index.contains_key(target) {
                    dangling.push((from, target.clone(), Relation::DelegatesTo));
                }
            }
        }

        Self {
            ids,
            index,
            edges,
            dangling,
        }
    }

    /// One `MissingDependency` per reference to an unknown skill
    #[must_use]
    pub fn validate(&self) -> Vec<SkillError> {
        self.dangling
            .iter()
            .map(|(from, missing, relation)| SkillError::MissingDependency {
                skill_id: self.ids[*from].clone(),
                missing_id: missing.clone(),
                relation: *relation,
            })
            .collect()
    }

    /// Every skill, dependencies first
    ///
    /// Independent subgraphs keep skill insertion order.
    ///
    /// # Errors
    /// Returns [`SkillError::CircularDependency`] with the first cycle found
    pub fn topological_order(&self) -> Result<Vec<String>> {
        let mut walk = Walk::new(self, true);
        for node in 0..self.ids.len() {
            if !walk.visit(node) {
                break;
            }
        }
        Ok(self.names(&walk.into_result()?))
    }

    /// Transitive dependencies of `id` in load order, ending with `id` itself
    ///
    /// # Errors
    /// Returns [`SkillError::SkillNotFound`] for an unknown id and
    /// [`SkillError::CircularDependency`] if the closure contains a cycle
    pub fn dependency_order(&self, id: &str) -> Result<Vec<String>> {
        let node = self
            .index_of(id)
            .ok_or_else(|| SkillError::SkillNotFound(id.to_string()))?;
        Ok(self.names(&self.closure_order(node)?))
    }

    /// Every cycle reachable in one full walk, for exhaustive validation
    #[must_use]
    pub fn cycles(&self) -> Vec<Vec<String>> {
        let mut walk = Walk::new(self, false);
        for node in 0..self.ids.len() {
            walk.visit(node);
        }
        walk.cycles
    }

    /// Direct dependencies of `id`, in declaration order
    #[must_use]
    pub fn dependencies_of(&self, id: &str) -> Option<Vec<&str>> {
        let node = self.index_of(id)?;
        Some(
            self.edges[node]
                .iter()
                .map(|&n| self.ids[n].as_str())
                .collect(),
        )
    }

    /// Number of nodes
    #[must_use]
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether the graph has no nodes
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub(crate) fn index_of(&self, id: &str) -> Option<usize> {
        self.index.get(id).copied()
    }

    pub(crate) fn id(&self, node: usize) -> &str {
        &self.ids[node]
    }

    pub(crate) fn closure_order(&self, node: usize) -> Result<Vec<usize>> {
        let mut walk = Walk::new(self, true);
        walk.visit(node);
        walk.into_result()
    }

    fn names(&self, nodes: &[usize]) -> Vec<String> {
        nodes.iter().map(|&n| self.ids[n].clone()).collect()
    }
}
