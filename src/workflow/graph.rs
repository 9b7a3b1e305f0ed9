//! Execution graph queries.
//!
//! Nodes live in an arena indexed by position in the definition; edges
//! are integer index pairs. Ids only appear at the API boundary, which
//! keeps the structure serializable-friendly and trivially comparable
//! in tests.

use std::collections::{HashMap, HashSet, VecDeque};

use super::types::WorkflowDefinition;
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct ExecutionGraph {
    ids: Vec<String>,
    index: HashMap<String, usize>,
    /// Tie-break key per node: explicit ordering hint, then definition
    /// position.
    order_keys: Vec<(u32, usize)>,
    successors: Vec<Vec<usize>>,
    predecessors: Vec<Vec<usize>>,
}

impl ExecutionGraph {
    /// Index a validated workflow. Parallel edges between the same node
    /// pair (distinct ports) collapse into one graph edge.
    pub fn build(workflow: &WorkflowDefinition) -> Result<Self> {
        let ids: Vec<String> = workflow.nodes.iter().map(|n| n.id.clone()).collect();
        let index: HashMap<String, usize> = ids
            .iter()
            .enumerate()
            .map(|(i, id)| (id.clone(), i))
            .collect();
        let order_keys = workflow
            .nodes
            .iter()
            .enumerate()
            .map(|(i, n)| (n.execution_order.unwrap_or(u32::MAX), i))
            .collect();

        let mut successors = vec![Vec::new(); ids.len()];
        let mut predecessors = vec![Vec::new(); ids.len()];
        for connection in &workflow.connections {
            let source = *index.get(&connection.source).ok_or_else(|| {
                Error::Validation(format!("unknown source node: {}", connection.source))
            })?;
            let target = *index.get(&connection.target).ok_or_else(|| {
                Error::Validation(format!("unknown target node: {}", connection.target))
            })?;
            if !successors[source].contains(&target) {
                successors[source].push(target);
                predecessors[target].push(source);
            }
        }

        Ok(Self {
            ids,
            index,
            order_keys,
            successors,
            predecessors,
        })
    }

    fn resolve(&self, id: &str) -> Result<usize> {
        self.index
            .get(id)
            .copied()
            .ok_or_else(|| Error::Validation(format!("unknown node: {id}")))
    }

    /// Node ids with no inbound edge.
    pub fn entry_nodes(&self) -> Vec<&str> {
        (0..self.ids.len())
            .filter(|&i| self.predecessors[i].is_empty())
            .map(|i| self.ids[i].as_str())
            .collect()
    }

    /// Deterministic topological order (Kahn). Among ready nodes, the
    /// explicit ordering hint wins, then definition position. A cycle is
    /// a hard validation error.
    pub fn execution_order(&self) -> Result<Vec<String>> {
        let mut indegree: Vec<usize> = self.predecessors.iter().map(Vec::len).collect();
        let mut ready: Vec<usize> = (0..self.ids.len()).filter(|&i| indegree[i] == 0).collect();
        let mut order = Vec::with_capacity(self.ids.len());

        while !ready.is_empty() {
            let pick = ready
                .iter()
                .enumerate()
                .min_by_key(|(_, &i)| self.order_keys[i])
                .map(|(pos, _)| pos)
                .unwrap_or(0);
            let node = ready.swap_remove(pick);
            order.push(self.ids[node].clone());

            for &next in &self.successors[node] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(next);
                }
            }
        }

        if order.len() != self.ids.len() {
            return Err(Error::Validation("Workflow graph has a cycle".into()));
        }
        Ok(order)
    }

    /// Direct predecessors in definition-edge order.
    pub fn direct_predecessors(&self, id: &str) -> Result<Vec<&str>> {
        let node = self.resolve(id)?;
        Ok(self.predecessors[node]
            .iter()
            .map(|&i| self.ids[i].as_str())
            .collect())
    }

    pub fn direct_successors(&self, id: &str) -> Result<Vec<&str>> {
        let node = self.resolve(id)?;
        Ok(self.successors[node]
            .iter()
            .map(|&i| self.ids[i].as_str())
            .collect())
    }

    /// Full transitive predecessor set, discovered breadth-first.
    pub fn transitive_predecessors(&self, id: &str) -> Result<HashSet<String>> {
        let start = self.resolve(id)?;
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from_iter(self.predecessors[start].iter().copied());

        while let Some(node) = queue.pop_front() {
            if seen.insert(node) {
                queue.extend(self.predecessors[node].iter().copied());
            }
        }

        Ok(seen.into_iter().map(|i| self.ids[i].clone()).collect())
    }

    /// Transitive successor set.
    pub fn transitive_successors(&self, id: &str) -> Result<HashSet<String>> {
        let start = self.resolve(id)?;
        let mut seen = HashSet::new();
        let mut queue = VecDeque::from_iter(self.successors[start].iter().copied());

        while let Some(node) = queue.pop_front() {
            if seen.insert(node) {
                queue.extend(self.successors[node].iter().copied());
            }
        }

        Ok(seen.into_iter().map(|i| self.ids[i].clone()).collect())
    }

    /// Shortest hop distance from `from` to `to` along directed edges.
    /// `None` means no path exists.
    pub fn hop_distance(&self, from: &str, to: &str) -> Result<Option<usize>> {
        let from = self.resolve(from)?;
        let to = self.resolve(to)?;
        if from == to {
            return Ok(Some(0));
        }

        let mut dist: HashMap<usize, usize> = HashMap::from([(from, 0)]);
        let mut queue = VecDeque::from([from]);

        while let Some(node) = queue.pop_front() {
            let next_dist = dist[&node] + 1;
            for &next in &self.successors[node] {
                if next == to {
                    return Ok(Some(next_dist));
                }
                if !dist.contains_key(&next) {
                    dist.insert(next, next_dist);
                    queue.push_back(next);
                }
            }
        }

        Ok(None)
    }

    /// Ids reachable from the entry nodes, entries included.
    pub fn reachable_from_entries(&self) -> HashSet<String> {
        let mut seen: HashSet<usize> = HashSet::new();
        let mut queue: VecDeque<usize> = (0..self.ids.len())
            .filter(|&i| self.predecessors[i].is_empty())
            .collect();

        while let Some(node) = queue.pop_front() {
            if seen.insert(node) {
                queue.extend(self.successors[node].iter().copied());
            }
        }

        seen.into_iter().map(|i| self.ids[i].clone()).collect()
    }
}
