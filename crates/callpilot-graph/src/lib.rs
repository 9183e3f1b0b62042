//! Orchestration graph for call assist.
//!
//! A graph is a set of [`NodeDescriptor`]s, each declaring the state keys it
//! reads and writes and the nodes it runs after. [`GraphBuilder`] validates
//! the declarations and computes execution levels once; [`Graph::invoke`]
//! runs every level concurrently and merges the results at level
//! boundaries.
//!
//! [`pipeline::assist_graph`] wires the call-assist capabilities into the
//! concrete intent / entity / member / knowledge / compliance / suggestion
//! graph; [`pipeline::context_graph`] is the same graph without the
//! suggestion node.

mod engine;
mod error;
pub mod pipeline;
mod state;

pub use engine::{Graph, GraphBuilder, GraphNode, NodeDescriptor};
pub use error::GraphError;
pub use pipeline::{assist_graph, context_graph, suggestion_context, PipelineSettings};
pub use state::{ProcessingState, StateKey, StatePatch, StateValue};
