//! # Stochastic dependency graph
//!
//! This module implements the variable dependency graph at the heart of the
//! kernel.
//!
//! ## Key Components
//!
//! - **VariableId**: stable handle identifying a variable; identity is the
//!   graph key, values are never compared for identity
//!
//! - **Parent**: one parent slot of a variable, either another variable or a
//!   plain constant payload
//!
//! - **ModelGraph**: arena of stochastic and deterministic variables with
//!   parent/child edges, demand-driven recomputation and staleness
//!   propagation
//!
//! ## Design
//!
//! Stochastic variables hold a value assigned by an external driver (a
//! sampler); deterministic variables cache a value computed from their
//! parents by a pure eval function. `set_value` marks every transitive
//! deterministic child stale; `value` recomputes on demand. A monotonically
//! increasing change clock (`tick`) records when each variable last changed,
//! which containers use to answer freshness queries without recomputing.
//!
//! ## Example
//!
//! ```rust,ignore
//! use stochgraph::engine::graph::*;
//! use std::collections::HashMap;
//!
//! let mut graph = ModelGraph::default();
//! let mu = graph.add_stochastic("mu", Value::Real(0.0), false, HashMap::new())?;
//! let double = graph.add_deterministic("double", eval_fn, parents_of(mu))?;
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use rustc_hash::{FxHashMap, FxHashSet};
use smallvec::SmallVec;

use crate::engine::errors::ModelError;
use crate::engine::value::Value;

/// A unique identifier for a variable in the model graph.
///
/// VariableId implements Ord/PartialOrd for stable, deterministic iteration.
/// Uses u32 internally for efficient storage and indexing.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Ord, PartialOrd)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct VariableId(pub u32);

/// One parent slot of a variable: another variable, or a plain constant.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Parent {
    /// The parent is a live variable in the same graph
    Var(VariableId),
    /// The parent is a constant payload
    Const(Value),
}

/// The eval function of a deterministic variable.
///
/// Receives the current values of the variable's parents keyed by role name.
/// Must be pure: deterministic in its inputs and free of side effects on
/// graph state. A returned error aborts the recompute and leaves the
/// previously cached value untouched.
pub type EvalFn = Arc<dyn Fn(&HashMap<String, Value>) -> Result<Value, String> + Send + Sync>;

/// The kind-specific state of a variable.
#[derive(Clone)]
pub enum VariableKind {
    /// A variable whose value is assigned externally, by sampling or by data.
    Stochastic {
        /// The current realized value
        value: Value,
        /// True if the value is fixed by observed data and must not be
        /// resampled
        observed: bool,
        /// The value held before the most recent assignment, kept so a
        /// sampler can reject a jump
        last_value: Option<Value>,
    },
    /// A variable whose value is a pure function of its parents' values.
    Deterministic {
        /// The eval function invoked on recompute
        eval: EvalFn,
        /// The cached value from the last successful recompute
        cache: Option<Value>,
        /// True if a transitive parent changed since the cache was filled
        stale: bool,
    },
}

impl std::fmt::Debug for VariableKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VariableKind::Stochastic {
                value,
                observed,
                last_value,
            } => f
                .debug_struct("Stochastic")
                .field("value", value)
                .field("observed", observed)
                .field("last_value", last_value)
                .finish(),
            VariableKind::Deterministic { cache, stale, .. } => f
                .debug_struct("Deterministic")
                .field("cache", cache)
                .field("stale", stale)
                .finish_non_exhaustive(),
        }
    }
}

/// A variable in the model graph.
#[derive(Debug, Clone)]
pub struct VariableData {
    /// The unique variable identifier
    pub id: VariableId,
    /// Human-readable name, used in error reports
    pub name: String,
    /// Stochastic or deterministic state
    pub kind: VariableKind,
    /// Parents keyed by role name (e.g. "mu", "tau")
    pub parents: HashMap<String, Parent>,
    /// Dependent variables, back-references maintained by the graph
    pub children: SmallVec<[VariableId; 4]>,
    /// Change-clock reading at the last value change
    pub last_changed: u64,
}

impl VariableData {
    /// True for stochastic variables.
    pub fn is_stochastic(&self) -> bool {
        matches!(self.kind, VariableKind::Stochastic { .. })
    }

    /// True for stochastic variables whose value is fixed by data.
    pub fn is_observed(&self) -> bool {
        matches!(self.kind, VariableKind::Stochastic { observed: true, .. })
    }

    /// True if the variable's cached value no longer reflects its parents.
    ///
    /// Stochastic variables are never stale.
    pub fn is_stale(&self) -> bool {
        matches!(self.kind, VariableKind::Deterministic { stale: true, .. })
    }
}

/// DFS visit state used by the acyclicity check.
#[derive(Clone, Copy, PartialEq)]
enum Mark {
    InProgress,
    Done,
}

/// A dependency graph of stochastic and deterministic variables.
///
/// This is the core data structure of the kernel, maintaining:
/// - Variables in a contiguous arena with O(1) id lookups
/// - Parent/child edges, with child back-references kept consistent by
///   every mutating operation
/// - Demand-driven recomputation with per-variable staleness flags
/// - A change clock for cheap freshness queries by containers
///
/// The graph is acyclic: no variable may appear as its own transitive
/// parent. Edge-creating operations reject cycles before mutating anything.
#[derive(Debug, Clone, Default)]
pub struct ModelGraph {
    /// All variables in the graph
    variables: Vec<VariableData>,
    /// Index mapping VariableId to position in the variables vector
    var_index: FxHashMap<VariableId, usize>,
    /// Monotonically increasing change clock
    tick: u64,
}

impl ModelGraph {
    /// Looks up a variable by id.
    pub fn variable(&self, id: VariableId) -> Option<&VariableData> {
        self.var_index.get(&id).and_then(|&idx| self.variables.get(idx))
    }

    /// Looks up a variable by id with mutable access.
    pub fn variable_mut(&mut self, id: VariableId) -> Option<&mut VariableData> {
        self.var_index
            .get(&id)
            .and_then(|&idx| self.variables.get_mut(idx))
    }

    /// All variables, in insertion order.
    pub fn variables(&self) -> &[VariableData] {
        &self.variables
    }

    /// Number of variables in the graph.
    pub fn len(&self) -> usize {
        self.variables.len()
    }

    /// True if the graph holds no variables.
    pub fn is_empty(&self) -> bool {
        self.variables.is_empty()
    }

    /// Current reading of the change clock.
    ///
    /// Advances whenever any variable's value changes. Containers record the
    /// reading at refresh time and compare it against member variables'
    /// `last_changed` to answer freshness queries.
    pub fn tick(&self) -> u64 {
        self.tick
    }

    /// Adds a stochastic variable and returns its id.
    ///
    /// All `Parent::Var` references must name existing variables; the new
    /// variable is registered in each parent's child list. A cycle cannot
    /// form here because the new variable does not exist yet.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable name, used in error reports
    /// * `value` - The initial realized value
    /// * `observed` - True if the value is fixed by data
    /// * `parents` - Parents keyed by role name
    pub fn add_stochastic(
        &mut self,
        name: impl Into<String>,
        value: Value,
        observed: bool,
        parents: HashMap<String, Parent>,
    ) -> Result<VariableId, ModelError> {
        self.add_variable(
            name.into(),
            VariableKind::Stochastic {
                value,
                observed,
                last_value: None,
            },
            parents,
        )
    }

    /// Adds a deterministic variable and returns its id.
    ///
    /// The first value computation happens lazily, on the first demand for
    /// the variable's value.
    ///
    /// # Arguments
    ///
    /// * `name` - Human-readable name, used in error reports
    /// * `eval` - Pure function computing the value from parent values
    /// * `parents` - Parents keyed by role name
    pub fn add_deterministic(
        &mut self,
        name: impl Into<String>,
        eval: EvalFn,
        parents: HashMap<String, Parent>,
    ) -> Result<VariableId, ModelError> {
        self.add_variable(
            name.into(),
            VariableKind::Deterministic {
                eval,
                cache: None,
                stale: true,
            },
            parents,
        )
    }

    fn add_variable(
        &mut self,
        name: String,
        kind: VariableKind,
        parents: HashMap<String, Parent>,
    ) -> Result<VariableId, ModelError> {
        for parent in parents.values() {
            if let Parent::Var(pid) = parent {
                if !self.var_index.contains_key(pid) {
                    return Err(ModelError::Internal(format!(
                        "parent variable {:?} of '{}' does not exist",
                        pid, name
                    )));
                }
            }
        }

        let id = VariableId(self.variables.len() as u32);
        let idx = self.variables.len();
        let last_changed = self.tick;
        self.variables.push(VariableData {
            id,
            name,
            kind,
            parents,
            children: SmallVec::new(),
            last_changed,
        });
        self.var_index.insert(id, idx);

        let parent_ids: SmallVec<[VariableId; 4]> = self.variables[idx]
            .parents
            .values()
            .filter_map(|p| match p {
                Parent::Var(pid) => Some(*pid),
                Parent::Const(_) => None,
            })
            .collect();
        for pid in parent_ids {
            if let Some(parent) = self.variable_mut(pid) {
                if !parent.children.contains(&id) {
                    parent.children.push(id);
                }
            }
        }

        Ok(id)
    }

    /// Internal helper to add a variable with a specific id and update the
    /// index. Used for testing and deserialization. Caller must ensure id
    /// uniqueness and consistent child back-references.
    ///
    /// # Warning
    /// This is an internal API and should not be used in production code.
    /// Use `add_stochastic()`/`add_deterministic()` instead; those maintain
    /// graph invariants, including acyclicity.
    pub fn insert_variable(&mut self, variable: VariableData) {
        let idx = self.variables.len();
        self.var_index.insert(variable.id, idx);
        self.variables.push(variable);
    }

    /// Returns the current value of a variable, recomputing first if stale.
    ///
    /// Stochastic variables return their stored value directly.
    /// Deterministic variables recompute from their parents' current values
    /// when stale; a failing eval function surfaces
    /// [`ModelError::Computation`] naming the variable and leaves the
    /// previously cached value untouched.
    pub fn value(&mut self, id: VariableId) -> Result<Value, ModelError> {
        let mut visiting = Vec::new();
        self.compute_value(id, &mut visiting)
    }

    fn compute_value(
        &mut self,
        id: VariableId,
        visiting: &mut Vec<VariableId>,
    ) -> Result<Value, ModelError> {
        let idx = *self
            .var_index
            .get(&id)
            .ok_or_else(|| ModelError::Internal(format!("variable {:?} does not exist", id)))?;

        match &self.variables[idx].kind {
            VariableKind::Stochastic { value, .. } => return Ok(value.clone()),
            VariableKind::Deterministic {
                cache: Some(v),
                stale: false,
                ..
            } => return Ok(v.clone()),
            VariableKind::Deterministic { .. } => {}
        }

        // A revisit while this variable's own recompute is in progress means
        // it is its own transitive parent.
        if visiting.contains(&id) {
            return Err(ModelError::GraphCycle {
                variable: self.variables[idx].name.clone(),
            });
        }
        visiting.push(id);

        #[cfg(feature = "tracing")]
        tracing::debug!(variable = %self.variables[idx].name, "recomputing deterministic variable");

        // Gather parent values in role order so any observable effects of
        // nested recomputes are reproducible.
        let mut roles: Vec<(String, Parent)> = self.variables[idx]
            .parents
            .iter()
            .map(|(role, parent)| (role.clone(), parent.clone()))
            .collect();
        roles.sort_by(|a, b| a.0.cmp(&b.0));

        let mut arguments = HashMap::with_capacity(roles.len());
        for (role, parent) in roles {
            let value = match parent {
                Parent::Const(v) => v,
                Parent::Var(pid) => match self.compute_value(pid, visiting) {
                    Ok(v) => v,
                    Err(e) => {
                        visiting.pop();
                        return Err(e);
                    }
                },
            };
            arguments.insert(role, value);
        }

        let eval = match &self.variables[idx].kind {
            VariableKind::Deterministic { eval, .. } => Arc::clone(eval),
            VariableKind::Stochastic { .. } => unreachable!(),
        };
        let result = eval(&arguments);
        visiting.pop();

        let name = self.variables[idx].name.clone();
        let value = result.map_err(|reason| ModelError::Computation {
            variable: name,
            reason,
        })?;

        // Only advance the change clock when the payload really changed, so
        // an idempotent recompute keeps containers fresh.
        let changed = match &self.variables[idx].kind {
            VariableKind::Deterministic { cache, .. } => cache.as_ref() != Some(&value),
            VariableKind::Stochastic { .. } => unreachable!(),
        };
        if changed {
            self.tick += 1;
            self.variables[idx].last_changed = self.tick;
        }
        if let VariableKind::Deterministic { cache, stale, .. } = &mut self.variables[idx].kind {
            *cache = Some(value.clone());
            *stale = false;
        }

        Ok(value)
    }

    /// Peeks at a variable's current payload without recomputing.
    ///
    /// For deterministic variables this is the possibly-stale cache; `None`
    /// if the variable has never been computed.
    pub fn cached_value(&self, id: VariableId) -> Option<&Value> {
        match &self.variable(id)?.kind {
            VariableKind::Stochastic { value, .. } => Some(value),
            VariableKind::Deterministic { cache, .. } => cache.as_ref(),
        }
    }

    /// Assigns a new value to a non-observed stochastic variable.
    ///
    /// Saves the previous value (see [`revert_value`](Self::revert_value)),
    /// stores `value`, advances the change clock and marks every transitive
    /// deterministic child stale. Rejected with
    /// [`ModelError::ImmutableValue`] for observed or deterministic
    /// variables.
    pub fn set_value(&mut self, id: VariableId, value: Value) -> Result<(), ModelError> {
        let idx = *self
            .var_index
            .get(&id)
            .ok_or_else(|| ModelError::Internal(format!("variable {:?} does not exist", id)))?;
        let var = &mut self.variables[idx];
        match &mut var.kind {
            VariableKind::Deterministic { .. } => {
                return Err(ModelError::ImmutableValue {
                    variable: var.name.clone(),
                    reason: "it is deterministic".into(),
                })
            }
            VariableKind::Stochastic { observed: true, .. } => {
                return Err(ModelError::ImmutableValue {
                    variable: var.name.clone(),
                    reason: "it is observed data".into(),
                })
            }
            VariableKind::Stochastic {
                value: current,
                last_value,
                ..
            } => {
                *last_value = Some(std::mem::replace(current, value));
            }
        }
        self.tick += 1;
        self.variables[idx].last_changed = self.tick;
        self.invalidate_children(id);
        Ok(())
    }

    /// Restores a stochastic variable's previous value.
    ///
    /// Supports a sampler's reject step after a trial `set_value`. Fails
    /// with [`ModelError::Internal`] if no previous value is recorded.
    pub fn revert_value(&mut self, id: VariableId) -> Result<(), ModelError> {
        let idx = *self
            .var_index
            .get(&id)
            .ok_or_else(|| ModelError::Internal(format!("variable {:?} does not exist", id)))?;
        let var = &mut self.variables[idx];
        let name = var.name.clone();
        match &mut var.kind {
            VariableKind::Stochastic {
                value, last_value, ..
            } => {
                let prev = last_value.take().ok_or_else(|| {
                    ModelError::Internal(format!(
                        "variable '{}' has no previous value to revert to",
                        name
                    ))
                })?;
                *value = prev;
            }
            VariableKind::Deterministic { .. } => {
                return Err(ModelError::ImmutableValue {
                    variable: name,
                    reason: "it is deterministic".into(),
                })
            }
        }
        self.tick += 1;
        self.variables[idx].last_changed = self.tick;
        self.invalidate_children(id);
        Ok(())
    }

    /// Signals that a stochastic variable's payload was mutated in place.
    ///
    /// In-place mutation bypasses `set_value`, so the change clock and the
    /// staleness of dependents would otherwise not notice. Call this
    /// immediately after such a mutation.
    pub fn touch(&mut self, id: VariableId) -> Result<(), ModelError> {
        let idx = *self
            .var_index
            .get(&id)
            .ok_or_else(|| ModelError::Internal(format!("variable {:?} does not exist", id)))?;
        if !self.variables[idx].is_stochastic() {
            return Err(ModelError::ImmutableValue {
                variable: self.variables[idx].name.clone(),
                reason: "it is deterministic".into(),
            });
        }
        self.tick += 1;
        self.variables[idx].last_changed = self.tick;
        self.invalidate_children(id);
        Ok(())
    }

    /// Marks every transitive deterministic child of `id` stale.
    ///
    /// Propagation stops at stochastic children: their stored value does not
    /// depend on the parent's value, so nothing below them is affected.
    fn invalidate_children(&mut self, id: VariableId) {
        let mut stack: SmallVec<[VariableId; 8]> = match self.variable(id) {
            Some(var) => SmallVec::from_slice(&var.children),
            None => return,
        };
        while let Some(cid) = stack.pop() {
            if let Some(child) = self.variable_mut(cid) {
                if let VariableKind::Deterministic { stale, .. } = &mut child.kind {
                    if !*stale {
                        *stale = true;
                        let grandchildren = child.children.clone();
                        stack.extend(grandchildren);
                    }
                }
            }
        }
    }

    /// Re-points one parent edge of `child` at a new parent.
    ///
    /// Maintains child back-references on both the old and new parent: the
    /// child is removed from the old parent's child list only if no other
    /// role still references that parent. Rejects with
    /// [`ModelError::GraphCycle`] before any mutation if the new edge would
    /// make `child` its own transitive parent.
    pub fn rewire_parent(
        &mut self,
        child: VariableId,
        role: &str,
        new_parent: Parent,
    ) -> Result<(), ModelError> {
        let child_idx = *self
            .var_index
            .get(&child)
            .ok_or_else(|| ModelError::Internal(format!("variable {:?} does not exist", child)))?;
        if !self.variables[child_idx].parents.contains_key(role) {
            return Err(ModelError::Internal(format!(
                "variable '{}' has no parent role '{}'",
                self.variables[child_idx].name, role
            )));
        }

        if let Parent::Var(pid) = &new_parent {
            let pid = *pid;
            if !self.var_index.contains_key(&pid) {
                return Err(ModelError::Internal(format!(
                    "parent variable {:?} does not exist",
                    pid
                )));
            }
            // The edge closes a cycle iff `child` is an ancestor of the new
            // parent (or the new parent itself).
            if pid == child || self.ancestors_contain(pid, child) {
                return Err(ModelError::GraphCycle {
                    variable: self.variables[child_idx].name.clone(),
                });
            }
        }

        let old_parent = self.variables[child_idx]
            .parents
            .insert(role.to_string(), new_parent.clone());

        // Possibly remove the child from the old parent's child list.
        if let Some(Parent::Var(old_pid)) = old_parent {
            let still_referenced = self.variables[child_idx]
                .parents
                .values()
                .any(|p| matches!(p, Parent::Var(pid) if *pid == old_pid));
            if !still_referenced {
                if let Some(old) = self.variable_mut(old_pid) {
                    old.children.retain(|c| *c != child);
                }
            }
        }

        if let Parent::Var(new_pid) = new_parent {
            if let Some(new) = self.variable_mut(new_pid) {
                if !new.children.contains(&child) {
                    new.children.push(child);
                }
            }
        }

        self.tick += 1;
        if let VariableKind::Deterministic { stale, .. } = &mut self.variables[child_idx].kind {
            *stale = true;
        }
        self.invalidate_children(child);
        Ok(())
    }

    /// True if `target` appears among the transitive parents of `id`.
    fn ancestors_contain(&self, id: VariableId, target: VariableId) -> bool {
        let mut stack: SmallVec<[VariableId; 8]> = SmallVec::new();
        stack.push(id);
        let mut seen: FxHashSet<VariableId> = FxHashSet::default();
        while let Some(vid) = stack.pop() {
            if !seen.insert(vid) {
                continue;
            }
            if let Some(var) = self.variable(vid) {
                for parent in var.parents.values() {
                    if let Parent::Var(pid) = parent {
                        if *pid == target {
                            return true;
                        }
                        stack.push(*pid);
                    }
                }
            }
        }
        false
    }

    /// Checks that no variable reachable from `roots` along parent edges is
    /// its own transitive parent.
    ///
    /// Containers run this over their member variables before pulling any
    /// value, so a cyclic graph is rejected before computation starts.
    pub fn check_acyclic_from(&self, roots: &[VariableId]) -> Result<(), ModelError> {
        let mut marks: FxHashMap<VariableId, Mark> = FxHashMap::default();
        for root in roots {
            self.visit_parents(*root, &mut marks)?;
        }
        Ok(())
    }

    /// Checks the entire graph for dependency cycles.
    pub fn validate_acyclic(&self) -> Result<(), ModelError> {
        let mut marks: FxHashMap<VariableId, Mark> = FxHashMap::default();
        for var in &self.variables {
            self.visit_parents(var.id, &mut marks)?;
        }
        Ok(())
    }

    fn visit_parents(
        &self,
        id: VariableId,
        marks: &mut FxHashMap<VariableId, Mark>,
    ) -> Result<(), ModelError> {
        match marks.get(&id) {
            Some(Mark::Done) => return Ok(()),
            Some(Mark::InProgress) => {
                let name = self
                    .variable(id)
                    .map(|v| v.name.clone())
                    .unwrap_or_else(|| format!("{:?}", id));
                return Err(ModelError::GraphCycle { variable: name });
            }
            None => {}
        }
        let var = self
            .variable(id)
            .ok_or_else(|| ModelError::Internal(format!("variable {:?} does not exist", id)))?;
        marks.insert(id, Mark::InProgress);
        for parent in var.parents.values() {
            if let Parent::Var(pid) = parent {
                self.visit_parents(*pid, marks)?;
            }
        }
        marks.insert(id, Mark::Done);
        Ok(())
    }
}
