use crate::StateKey;
use callpilot_capability::CapabilityError;

/// Errors raised while building or invoking a graph.
#[derive(Debug, thiserror::Error)]
pub enum GraphError {
    #[error("graph has no nodes")]
    Empty,

    #[error("duplicate node id `{0}`")]
    DuplicateNode(String),

    #[error("node `{node}` depends on unknown node `{dependency}`")]
    UnknownDependency { node: String, dependency: String },

    #[error("dependency cycle among nodes: {}", .0.join(", "))]
    Cycle(Vec<String>),

    #[error("key `{key}` is produced by both `{first}` and `{second}`")]
    OverlappingOutputs {
        key: StateKey,
        first: String,
        second: String,
    },

    #[error("node `{node}` declares read-only key `{key}` as an output")]
    ReadOnlyKey { node: String, key: StateKey },

    #[error("node `{node}` reads `{key}` but no upstream node produces it")]
    UnsatisfiedInput { node: String, key: StateKey },

    #[error("node `{node}` failed: {source}")]
    NodeFailed {
        node: String,
        #[source]
        source: CapabilityError,
    },

    #[error("node `{node}` timed out after {elapsed_ms} ms")]
    NodeTimeout { node: String, elapsed_ms: u64 },

    #[error("node `{node}` wrote undeclared key `{key}`")]
    UndeclaredWrite { node: String, key: StateKey },
}

impl GraphError {
    /// The node an invocation error is attributed to.
    pub fn node(&self) -> Option<&str> {
        match self {
            Self::NodeFailed { node, .. }
            | Self::NodeTimeout { node, .. }
            | Self::UndeclaredWrite { node, .. } => Some(node),
            _ => None,
        }
    }
}
