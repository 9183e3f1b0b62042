//! Level scheduler over statically validated node descriptors.
//!
//! [`GraphBuilder::build`] checks the whole merge contract up front:
//!
//! - node ids are unique and every dependency names a known node;
//! - the dependency relation is acyclic;
//! - no key is produced by two nodes, and the read-only transcript is
//!   produced by none;
//! - every key a node reads is the transcript or is produced somewhere in
//!   that node's dependency closure.
//!
//! The topological levels are computed once. [`Graph::invoke`] then runs
//! each level's nodes concurrently against the same snapshot and merges
//! their patches, in declaration order, once the whole level has finished.
//! The first node failure or timeout aborts the invocation; the partially
//! merged state is dropped.

use crate::{GraphError, ProcessingState, StateKey, StatePatch};
use async_trait::async_trait;
use callpilot_capability::CapabilityError;
use futures_util::future::try_join_all;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// One unit of work in the graph.
#[async_trait]
pub trait GraphNode: Send + Sync {
    /// Reads the level snapshot and returns only the fields it writes.
    async fn run(&self, state: &ProcessingState) -> Result<StatePatch, CapabilityError>;
}

/// Static description of a node: what it reads, what it writes, and which
/// nodes must finish first.
#[derive(Clone)]
pub struct NodeDescriptor {
    pub id: String,
    pub inputs: Vec<StateKey>,
    pub outputs: Vec<StateKey>,
    pub depends_on: Vec<String>,
    pub node: Arc<dyn GraphNode>,
}

impl NodeDescriptor {
    pub fn new(id: impl Into<String>, node: Arc<dyn GraphNode>) -> Self {
        Self {
            id: id.into(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            depends_on: Vec::new(),
            node,
        }
    }

    pub fn reads(mut self, keys: &[StateKey]) -> Self {
        self.inputs.extend_from_slice(keys);
        self
    }

    pub fn writes(mut self, keys: &[StateKey]) -> Self {
        self.outputs.extend_from_slice(keys);
        self
    }

    pub fn after(mut self, ids: &[&str]) -> Self {
        self.depends_on.extend(ids.iter().map(|id| id.to_string()));
        self
    }
}

impl std::fmt::Debug for NodeDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NodeDescriptor")
            .field("id", &self.id)
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .field("depends_on", &self.depends_on)
            .finish_non_exhaustive()
    }
}

/// Collects descriptors and validates them into a [`Graph`].
#[derive(Debug, Default)]
pub struct GraphBuilder {
    nodes: Vec<NodeDescriptor>,
    node_timeout: Option<Duration>,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn node(mut self, descriptor: NodeDescriptor) -> Self {
        self.nodes.push(descriptor);
        self
    }

    /// Bounded wait applied to every node run. `None` disables it.
    pub fn node_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.node_timeout = timeout;
        self
    }

    pub fn build(self) -> Result<Graph, GraphError> {
        let nodes = self.nodes;
        if nodes.is_empty() {
            return Err(GraphError::Empty);
        }

        let mut index: HashMap<&str, usize> = HashMap::with_capacity(nodes.len());
        for (idx, node) in nodes.iter().enumerate() {
            if index.insert(node.id.as_str(), idx).is_some() {
                return Err(GraphError::DuplicateNode(node.id.clone()));
            }
        }

        let mut deps: Vec<Vec<usize>> = Vec::with_capacity(nodes.len());
        for node in &nodes {
            let mut resolved = Vec::with_capacity(node.depends_on.len());
            for dep in &node.depends_on {
                let dep_idx = *index.get(dep.as_str()).ok_or_else(|| {
                    GraphError::UnknownDependency {
                        node: node.id.clone(),
                        dependency: dep.clone(),
                    }
                })?;
                if !resolved.contains(&dep_idx) {
                    resolved.push(dep_idx);
                }
            }
            deps.push(resolved);
        }

        let mut producer: HashMap<StateKey, usize> = HashMap::new();
        for (idx, node) in nodes.iter().enumerate() {
            for key in &node.outputs {
                if key.is_read_only() {
                    return Err(GraphError::ReadOnlyKey {
                        node: node.id.clone(),
                        key: *key,
                    });
                }
                match producer.get(key) {
                    Some(&other) if other != idx => {
                        return Err(GraphError::OverlappingOutputs {
                            key: *key,
                            first: nodes[other].id.clone(),
                            second: node.id.clone(),
                        });
                    }
                    _ => {
                        producer.insert(*key, idx);
                    }
                }
            }
        }

        let levels = layer(&nodes, &deps)?;

        // Transitive dependency closure, filled in topological order.
        let mut ancestors: Vec<HashSet<usize>> = vec![HashSet::new(); nodes.len()];
        for level in &levels {
            for &idx in level {
                let mut closure = HashSet::new();
                for &dep in &deps[idx] {
                    closure.insert(dep);
                    closure.extend(ancestors[dep].iter().copied());
                }
                ancestors[idx] = closure;
            }
        }

        for (idx, node) in nodes.iter().enumerate() {
            for key in &node.inputs {
                if key.is_read_only() {
                    continue;
                }
                let satisfied = producer
                    .get(key)
                    .is_some_and(|p| ancestors[idx].contains(p));
                if !satisfied {
                    return Err(GraphError::UnsatisfiedInput {
                        node: node.id.clone(),
                        key: *key,
                    });
                }
            }
        }

        tracing::debug!(
            nodes = nodes.len(),
            levels = levels.len(),
            "orchestration graph built"
        );

        Ok(Graph {
            nodes,
            levels,
            node_timeout: self.node_timeout,
        })
    }
}

/// Kahn-style layering. Within a level, nodes keep declaration order.
fn layer(nodes: &[NodeDescriptor], deps: &[Vec<usize>]) -> Result<Vec<Vec<usize>>, GraphError> {
    let mut remaining: Vec<usize> = deps.iter().map(Vec::len).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); nodes.len()];
    for (idx, node_deps) in deps.iter().enumerate() {
        for &dep in node_deps {
            dependents[dep].push(idx);
        }
    }

    let mut levels = Vec::new();
    let mut placed = 0;
    let mut current: Vec<usize> = (0..nodes.len()).filter(|&i| remaining[i] == 0).collect();

    while !current.is_empty() {
        placed += current.len();
        let mut next = Vec::new();
        for &idx in &current {
            for &dependent in &dependents[idx] {
                remaining[dependent] -= 1;
                if remaining[dependent] == 0 {
                    next.push(dependent);
                }
            }
        }
        next.sort_unstable();
        levels.push(current);
        current = next;
    }

    if placed < nodes.len() {
        let stuck = (0..nodes.len())
            .filter(|&i| remaining[i] > 0)
            .map(|i| nodes[i].id.clone())
            .collect();
        return Err(GraphError::Cycle(stuck));
    }
    Ok(levels)
}

/// A validated graph, ready to be invoked any number of times.
#[derive(Debug)]
pub struct Graph {
    nodes: Vec<NodeDescriptor>,
    levels: Vec<Vec<usize>>,
    node_timeout: Option<Duration>,
}

impl Graph {
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Node ids grouped by execution level.
    pub fn levels(&self) -> Vec<Vec<&str>> {
        self.levels
            .iter()
            .map(|level| level.iter().map(|&i| self.nodes[i].id.as_str()).collect())
            .collect()
    }

    /// Runs every node exactly once and returns the merged state.
    pub async fn invoke(&self, initial: ProcessingState) -> Result<ProcessingState, GraphError> {
        let started = Instant::now();
        let mut state = initial;

        for (depth, level) in self.levels.iter().enumerate() {
            let patches = {
                let snapshot = &state;
                try_join_all(level.iter().map(|&idx| self.run_node(idx, snapshot))).await?
            };
            for patch in patches {
                for value in patch {
                    state.apply(value);
                }
            }
            tracing::trace!(level = depth, "graph level merged");
        }

        tracing::debug!(
            elapsed_ms = started.elapsed().as_millis() as u64,
            "graph invocation complete"
        );
        Ok(state)
    }

    async fn run_node(
        &self,
        idx: usize,
        state: &ProcessingState,
    ) -> Result<StatePatch, GraphError> {
        let descriptor = &self.nodes[idx];
        let started = Instant::now();

        let outcome = match self.node_timeout {
            Some(limit) => match tokio::time::timeout(limit, descriptor.node.run(state)).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    let elapsed_ms = limit.as_millis() as u64;
                    tracing::warn!(node = %descriptor.id, elapsed_ms, "graph node timed out");
                    return Err(GraphError::NodeTimeout {
                        node: descriptor.id.clone(),
                        elapsed_ms,
                    });
                }
            },
            None => descriptor.node.run(state).await,
        };

        let patch = outcome.map_err(|source| {
            tracing::warn!(
                node = %descriptor.id,
                error = %source,
                transient = source.is_transient(),
                "graph node failed"
            );
            GraphError::NodeFailed {
                node: descriptor.id.clone(),
                source,
            }
        })?;

        if let Some(value) = patch
            .values()
            .iter()
            .find(|v| !descriptor.outputs.contains(&v.key()))
        {
            return Err(GraphError::UndeclaredWrite {
                node: descriptor.id.clone(),
                key: value.key(),
            });
        }

        tracing::debug!(
            node = %descriptor.id,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "graph node completed"
        );
        Ok(patch)
    }
}
