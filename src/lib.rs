//! # Stochgraph - Stochastic Dependency Graph and Container Kernel
//!
//! Stochgraph is the performance-sensitive kernel of a probabilistic-modeling
//! toolkit: a dependency graph of random and derived variables, and a
//! container abstraction that presents many such variables (plus ordinary
//! constants) as a single, always-consistent composite value.
//!
//! ## Architecture
//!
//! The system is organized into one module tree:
//!
//! - **engine::graph**: stochastic/deterministic variables, parent/child
//!   edges, value caching and staleness propagation
//! - **engine::container**: the four structural containers (sequence,
//!   mapping, object, array) with one-time partitioning and in-place
//!   snapshot refresh
//! - **engine::value**: the opaque value payload moved through the graph
//! - **engine::errors**: the error taxonomy surfaced to callers
//!
//! Sampling and inference algorithms are external: they mutate stochastic
//! variables through [`ModelGraph::set_value`], then ask containers to
//! [`Container::refresh`] and read the assembled [`Container::snapshot`].
//!
//! ## Usage
//!
//! ```rust,ignore
//! use stochgraph::{Container, Member, Members, ModelGraph, Value};
//! use std::collections::HashMap;
//!
//! let mut graph = ModelGraph::default();
//! let mu = graph.add_stochastic("mu", Value::Real(0.0), false, HashMap::new())?;
//!
//! let mut prior = Container::construct(
//!     Members::Sequence(vec![
//!         Member::Variable(mu),
//!         Member::Constant(Value::Real(1.0)),
//!     ]),
//!     &mut graph,
//! )?;
//!
//! graph.set_value(mu, Value::Real(0.5))?;
//! prior.refresh(&mut graph)?;
//! ```

#![forbid(unsafe_code)]

pub mod engine;

// Re-export commonly used types
pub use engine::container::{
    ravel_index, unravel_index, ArrayContainer, Container, MappingContainer, Member, Members,
    ObjectContainer, SequenceContainer, SnapshotRef,
};
pub use engine::errors::ModelError;
pub use engine::graph::{EvalFn, ModelGraph, Parent, VariableData, VariableId, VariableKind};
pub use engine::value::Value;
