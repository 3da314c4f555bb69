//! # Containers
//!
//! Aggregates of variables and constants that present themselves as one
//! composite value matching an original structural shape.
//!
//! ## Key Components
//!
//! - **Member**: capability tag classifying one container slot as a live
//!   variable or a plain constant
//!
//! - **SequenceContainer / MappingContainer / ObjectContainer /
//!   ArrayContainer**: the four structural shapes (ordered sequence, keyed
//!   mapping, attribute-bearing object, dense row-major array)
//!
//! - **Container**: enum unifying the four shapes behind one
//!   construct/refresh/snapshot surface
//!
//! ## Design
//!
//! Construction scans the member collection exactly once, in a fixed
//! deterministic order, partitioning positions into value-bearing
//! (`val_ind`/`val_keys`) and constant (`nonval_ind`/`nonval_keys`), and
//! builds a snapshot of the same shape from construction-time values.
//! Refresh revisits only the recorded positions: variable slots are staged
//! from the graph first and committed only once every pull succeeded, so a
//! failed refresh leaves the previous snapshot intact. Constant slots are
//! re-read from the backing members on every refresh; this supports
//! replacing a constant in place without reconstructing the container.
//!
//! The partition is fixed for the container's lifetime. If the *set* of
//! variables occupying a container changes, the container must be rebuilt,
//! not refreshed.

use std::collections::HashMap;

use rustc_hash::FxHashMap;

use crate::engine::errors::ModelError;
use crate::engine::graph::{ModelGraph, VariableId};
use crate::engine::value::Value;

/// One container slot: a live variable or a plain constant.
///
/// Classification is by capability tag, never by probing: a `Variable`
/// member exposes a live value through the graph, a `Constant` member is
/// copied as-is.
#[derive(Debug, Clone)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Member {
    /// A plain constant payload
    Constant(Value),
    /// A live variable, resolved against the graph on every refresh
    Variable(VariableId),
}

impl Member {
    /// True if this member exposes a live value.
    pub fn is_variable(&self) -> bool {
        matches!(self, Member::Variable(_))
    }
}

/// Result of the one-time partitioning scan.
struct Partition<P> {
    val: Vec<P>,
    nonval: Vec<P>,
}

/// Splits positions into value-bearing and constant, preserving scan order.
fn partition_positions<P>(positions: impl Iterator<Item = (P, bool)>) -> Partition<P> {
    let mut val = Vec::new();
    let mut nonval = Vec::new();
    for (position, is_variable) in positions {
        if is_variable {
            val.push(position);
        } else {
            nonval.push(position);
        }
    }
    Partition { val, nonval }
}

/// Collects member variable ids in scan order.
fn member_variables<'a>(members: impl Iterator<Item = &'a Member>) -> Vec<VariableId> {
    members
        .filter_map(|m| match m {
            Member::Variable(id) => Some(*id),
            Member::Constant(_) => None,
        })
        .collect()
}

/// True if every listed variable is non-stale and unchanged since `synced_at`.
fn members_unchanged_since(graph: &ModelGraph, ids: &[VariableId], synced_at: u64) -> bool {
    ids.iter().all(|id| {
        graph
            .variable(*id)
            .map_or(false, |v| !v.is_stale() && v.last_changed <= synced_at)
    })
}

/// A container over an ordered sequence of members.
///
/// The snapshot is a `Vec<Value>` with the same layout as the member
/// sequence.
#[derive(Debug, Clone)]
pub struct SequenceContainer {
    /// The backing member sequence
    members: Vec<Member>,
    /// Indices whose member is a variable, ascending
    val_ind: Vec<usize>,
    /// Indices whose member is a constant, ascending
    nonval_ind: Vec<usize>,
    /// The snapshot, rebuilt in place on refresh
    value: Vec<Value>,
    /// Staging buffer reused across refreshes
    scratch: Vec<Value>,
    /// Change-clock reading at the last snapshot rebuild
    synced_at: u64,
}

impl SequenceContainer {
    /// Builds a sequence container, partitioning members by index order.
    ///
    /// Runs the acyclicity check over the member variables' ancestry before
    /// any value is computed, then fills the initial snapshot from
    /// construction-time values.
    pub fn new(members: Vec<Member>, graph: &mut ModelGraph) -> Result<Self, ModelError> {
        let ids = member_variables(members.iter());
        graph.check_acyclic_from(&ids)?;

        let partition =
            partition_positions(members.iter().enumerate().map(|(i, m)| (i, m.is_variable())));

        let mut value = Vec::with_capacity(members.len());
        for member in &members {
            value.push(match member {
                Member::Constant(v) => v.clone(),
                Member::Variable(id) => graph.value(*id)?,
            });
        }

        Ok(Self {
            members,
            val_ind: partition.val,
            nonval_ind: partition.nonval,
            value,
            scratch: Vec::new(),
            synced_at: graph.tick(),
        })
    }

    /// Number of value-bearing positions.
    pub fn n_val(&self) -> usize {
        self.val_ind.len()
    }

    /// Number of constant positions.
    pub fn n_nonval(&self) -> usize {
        self.nonval_ind.len()
    }

    /// Total number of members.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// True if the container has no members.
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// The backing members, in sequence order.
    pub fn members(&self) -> &[Member] {
        &self.members
    }

    /// Mutable access to the backing members.
    ///
    /// Escape hatch for replacing constants in place. The partition is fixed
    /// at construction: changing which positions hold variables, or removing
    /// positions, violates the usage contract and surfaces as
    /// `IndexOutOfRange` or an internal error on the next refresh.
    pub fn members_mut(&mut self) -> &mut Vec<Member> {
        &mut self.members
    }

    /// Replaces the constant at `position` without reconstructing.
    ///
    /// The next refresh re-reads constant slots from the backing members,
    /// so the replacement shows up then.
    pub fn replace_constant(&mut self, position: usize, value: Value) -> Result<(), ModelError> {
        match self.members.get_mut(position) {
            None => Err(ModelError::IndexOutOfRange {
                position: position.to_string(),
            }),
            Some(Member::Variable(_)) => Err(ModelError::Internal(format!(
                "position {} holds a variable, not a constant",
                position
            ))),
            Some(slot @ Member::Constant(_)) => {
                *slot = Member::Constant(value);
                Ok(())
            }
        }
    }

    /// Member variable ids, in sequence order.
    pub fn variable_ids(&self) -> Vec<VariableId> {
        member_variables(self.members.iter())
    }

    /// Rebuilds the snapshot in place from current variable values.
    ///
    /// Variable slots are visited first, then constant slots, each in
    /// ascending index order. All variable pulls are staged before the
    /// snapshot is touched; on failure the previous snapshot is intact.
    pub fn refresh(&mut self, graph: &mut ModelGraph) -> Result<(), ModelError> {
        self.scratch.clear();
        for &ind in &self.val_ind {
            match self.members.get(ind) {
                None => {
                    return Err(ModelError::IndexOutOfRange {
                        position: ind.to_string(),
                    })
                }
                Some(Member::Constant(_)) => {
                    return Err(ModelError::Internal(format!(
                        "position {} no longer holds a variable",
                        ind
                    )))
                }
                Some(Member::Variable(id)) => {
                    let id = *id;
                    self.scratch.push(graph.value(id)?);
                }
            }
        }
        for &ind in &self.nonval_ind {
            if self.members.get(ind).is_none() {
                return Err(ModelError::IndexOutOfRange {
                    position: ind.to_string(),
                });
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            n_val = self.val_ind.len(),
            n_nonval = self.nonval_ind.len(),
            "refreshing sequence container"
        );

        for (&ind, v) in self.val_ind.iter().zip(self.scratch.drain(..)) {
            self.value[ind] = v;
        }
        for &ind in &self.nonval_ind {
            if let Some(Member::Constant(v)) = self.members.get(ind) {
                self.value[ind] = v.clone();
            }
        }
        self.synced_at = graph.tick();
        Ok(())
    }

    /// Read-only view of the current (possibly stale) snapshot.
    pub fn snapshot(&self) -> &[Value] {
        &self.value
    }

    /// True if the snapshot still matches every member variable's value.
    pub fn is_fresh(&self, graph: &ModelGraph) -> bool {
        members_unchanged_since(graph, &self.variable_ids(), self.synced_at)
    }
}

/// A container over an insertion-ordered keyed mapping.
///
/// The snapshot is a `HashMap<String, Value>` with the same key set as the
/// backing entries.
#[derive(Debug, Clone)]
pub struct MappingContainer {
    /// The backing entries, in insertion order
    entries: Vec<(String, Member)>,
    /// Index mapping key to position in entries
    key_index: FxHashMap<String, usize>,
    /// Keys whose member is a variable, in insertion order
    val_keys: Vec<String>,
    /// Keys whose member is a constant, in insertion order
    nonval_keys: Vec<String>,
    /// The snapshot, rebuilt in place on refresh
    value: HashMap<String, Value>,
    /// Staging buffer reused across refreshes
    scratch: Vec<Value>,
    /// Change-clock reading at the last snapshot rebuild
    synced_at: u64,
}

impl MappingContainer {
    /// Builds a mapping container, partitioning entries by insertion order.
    ///
    /// Fails with [`ModelError::ContainerShape`] on duplicate keys. Runs the
    /// acyclicity check before any value is computed.
    pub fn new(entries: Vec<(String, Member)>, graph: &mut ModelGraph) -> Result<Self, ModelError> {
        let mut key_index = FxHashMap::default();
        for (pos, (key, _)) in entries.iter().enumerate() {
            if key_index.insert(key.clone(), pos).is_some() {
                return Err(ModelError::ContainerShape(format!(
                    "duplicate key '{}'",
                    key
                )));
            }
        }

        let ids = member_variables(entries.iter().map(|(_, m)| m));
        graph.check_acyclic_from(&ids)?;

        let partition = partition_positions(
            entries
                .iter()
                .map(|(key, m)| (key.clone(), m.is_variable())),
        );

        let mut value = HashMap::with_capacity(entries.len());
        for (key, member) in &entries {
            let v = match member {
                Member::Constant(v) => v.clone(),
                Member::Variable(id) => graph.value(*id)?,
            };
            value.insert(key.clone(), v);
        }

        Ok(Self {
            entries,
            key_index,
            val_keys: partition.val,
            nonval_keys: partition.nonval,
            value,
            scratch: Vec::new(),
            synced_at: graph.tick(),
        })
    }

    /// Number of value-bearing keys.
    pub fn n_val(&self) -> usize {
        self.val_keys.len()
    }

    /// Number of constant keys.
    pub fn n_nonval(&self) -> usize {
        self.nonval_keys.len()
    }

    /// Total number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the container has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The backing entries, in insertion order.
    pub fn entries(&self) -> &[(String, Member)] {
        &self.entries
    }

    /// Replaces the constant under `key` without reconstructing.
    pub fn replace_constant(&mut self, key: &str, value: Value) -> Result<(), ModelError> {
        let pos = *self
            .key_index
            .get(key)
            .ok_or_else(|| ModelError::IndexOutOfRange {
                position: format!("'{}'", key),
            })?;
        match self.entries.get_mut(pos) {
            None => Err(ModelError::IndexOutOfRange {
                position: format!("'{}'", key),
            }),
            Some((_, Member::Variable(_))) => Err(ModelError::Internal(format!(
                "key '{}' holds a variable, not a constant",
                key
            ))),
            Some((_, slot @ Member::Constant(_))) => {
                *slot = Member::Constant(value);
                Ok(())
            }
        }
    }

    /// Member variable ids, in insertion order.
    pub fn variable_ids(&self) -> Vec<VariableId> {
        member_variables(self.entries.iter().map(|(_, m)| m))
    }

    /// Rebuilds the snapshot in place from current variable values.
    ///
    /// Identical to the sequence refresh, indexed by key rather than
    /// position: value keys first, then constant keys, in insertion order.
    pub fn refresh(&mut self, graph: &mut ModelGraph) -> Result<(), ModelError> {
        self.scratch.clear();
        for key in &self.val_keys {
            let member = self
                .key_index
                .get(key)
                .and_then(|&pos| self.entries.get(pos))
                .map(|(_, m)| m);
            match member {
                None => {
                    return Err(ModelError::IndexOutOfRange {
                        position: format!("'{}'", key),
                    })
                }
                Some(Member::Constant(_)) => {
                    return Err(ModelError::Internal(format!(
                        "key '{}' no longer holds a variable",
                        key
                    )))
                }
                Some(Member::Variable(id)) => {
                    let id = *id;
                    self.scratch.push(graph.value(id)?);
                }
            }
        }
        for key in &self.nonval_keys {
            let present = self
                .key_index
                .get(key)
                .and_then(|&pos| self.entries.get(pos))
                .is_some();
            if !present {
                return Err(ModelError::IndexOutOfRange {
                    position: format!("'{}'", key),
                });
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            n_val = self.val_keys.len(),
            n_nonval = self.nonval_keys.len(),
            "refreshing mapping container"
        );

        for (key, v) in self.val_keys.iter().zip(self.scratch.drain(..)) {
            self.value.insert(key.clone(), v);
        }
        for key in &self.nonval_keys {
            if let Some(Member::Constant(v)) = self
                .key_index
                .get(key)
                .and_then(|&pos| self.entries.get(pos))
                .map(|(_, m)| m)
            {
                self.value.insert(key.clone(), v.clone());
            }
        }
        self.synced_at = graph.tick();
        Ok(())
    }

    /// Read-only view of the current (possibly stale) snapshot.
    pub fn snapshot(&self) -> &HashMap<String, Value> {
        &self.value
    }

    /// The snapshot entry under `key`.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.value.get(key)
    }

    /// True if the snapshot still matches every member variable's value.
    pub fn is_fresh(&self, graph: &ModelGraph) -> bool {
        members_unchanged_since(graph, &self.variable_ids(), self.synced_at)
    }
}

/// A container over an attribute-bearing object.
///
/// Composition over a [`MappingContainer`]: the attribute mapping in
/// declaration order is the backing collection, and the snapshot *is* the
/// inner mapping snapshot. Attributes project straight onto it, with no
/// second copy layered on top.
#[derive(Debug, Clone)]
pub struct ObjectContainer {
    /// The nested mapping container over the attribute mapping
    attrs: MappingContainer,
}

impl ObjectContainer {
    /// Builds an object container over attributes in declaration order.
    pub fn new(
        attributes: Vec<(String, Member)>,
        graph: &mut ModelGraph,
    ) -> Result<Self, ModelError> {
        Ok(Self {
            attrs: MappingContainer::new(attributes, graph)?,
        })
    }

    /// Number of value-bearing attributes.
    pub fn n_val(&self) -> usize {
        self.attrs.n_val()
    }

    /// Number of constant attributes.
    pub fn n_nonval(&self) -> usize {
        self.attrs.n_nonval()
    }

    /// Total number of attributes.
    pub fn len(&self) -> usize {
        self.attrs.len()
    }

    /// True if the object has no attributes.
    pub fn is_empty(&self) -> bool {
        self.attrs.is_empty()
    }

    /// Attribute names in declaration order.
    pub fn attribute_names(&self) -> impl Iterator<Item = &str> {
        self.attrs.entries().iter().map(|(name, _)| name.as_str())
    }

    /// The nested mapping container refresh is delegated to.
    pub fn inner(&self) -> &MappingContainer {
        &self.attrs
    }

    /// Replaces the constant attribute `name` without reconstructing.
    pub fn replace_constant(&mut self, name: &str, value: Value) -> Result<(), ModelError> {
        self.attrs.replace_constant(name, value)
    }

    /// Member variable ids, in declaration order.
    pub fn variable_ids(&self) -> Vec<VariableId> {
        self.attrs.variable_ids()
    }

    /// Rebuilds the snapshot by delegating to the nested mapping container.
    pub fn refresh(&mut self, graph: &mut ModelGraph) -> Result<(), ModelError> {
        self.attrs.refresh(graph)
    }

    /// Read-only view of the attribute mapping.
    ///
    /// This is the nested mapping container's snapshot itself, not a copy.
    pub fn snapshot(&self) -> &HashMap<String, Value> {
        self.attrs.snapshot()
    }

    /// The snapshot value of attribute `name`.
    pub fn attr(&self, name: &str) -> Option<&Value> {
        self.attrs.get(name)
    }

    /// True if the snapshot still matches every member variable's value.
    pub fn is_fresh(&self, graph: &ModelGraph) -> bool {
        self.attrs.is_fresh(graph)
    }
}

/// Row-major flat index for `index` under `shape`.
///
/// Returns `None` if the rank differs or any coordinate is out of range.
pub fn ravel_index(shape: &[usize], index: &[usize]) -> Option<usize> {
    if index.len() != shape.len() {
        return None;
    }
    let mut flat = 0usize;
    for (&coord, &dim) in index.iter().zip(shape.iter()) {
        if coord >= dim {
            return None;
        }
        flat = flat * dim + coord;
    }
    Some(flat)
}

/// Row-major coordinates for `flat` under `shape`.
///
/// Returns `None` if `flat` is outside the shape's element count.
pub fn unravel_index(shape: &[usize], flat: usize) -> Option<Vec<usize>> {
    let count: usize = shape.iter().product();
    if flat >= count {
        return None;
    }
    let mut index = vec![0usize; shape.len()];
    let mut rest = flat;
    for (slot, &dim) in index.iter_mut().zip(shape.iter()).rev() {
        *slot = rest % dim;
        rest /= dim;
    }
    Some(index)
}

/// A container over a dense multi-dimensional array.
///
/// Operates purely in ravelled (row-major flattened) coordinate space: the
/// source members and the snapshot are both flat buffers, and a shape
/// descriptor plus the pure [`ravel_index`]/[`unravel_index`] mapping
/// recover multi-dimensional indexing. No aliasing between shaped and flat
/// views exists.
#[derive(Debug, Clone)]
pub struct ArrayContainer {
    /// The array shape, row-major
    shape: Vec<usize>,
    /// The backing members, ravelled
    ravelled_data: Vec<Member>,
    /// Flat indices whose member is a variable, ascending
    val_ind: Vec<usize>,
    /// Flat indices whose member is a constant, ascending
    nonval_ind: Vec<usize>,
    /// The ravelled snapshot, rebuilt in place on refresh
    ravelled_value: Vec<Value>,
    /// Staging buffer reused across refreshes
    scratch: Vec<Value>,
    /// Change-clock reading at the last snapshot rebuild
    synced_at: u64,
}

impl ArrayContainer {
    /// Builds an array container over ravelled members under `shape`.
    ///
    /// Fails with [`ModelError::ContainerShape`] if the shape's element
    /// count does not match the data length. Partitioning runs over flat
    /// indices in row-major order.
    pub fn new(
        shape: Vec<usize>,
        data: Vec<Member>,
        graph: &mut ModelGraph,
    ) -> Result<Self, ModelError> {
        let expected: usize = shape.iter().product();
        if expected != data.len() {
            return Err(ModelError::ContainerShape(format!(
                "shape {:?} holds {} elements but {} members were given",
                shape,
                expected,
                data.len()
            )));
        }

        let ids = member_variables(data.iter());
        graph.check_acyclic_from(&ids)?;

        let partition =
            partition_positions(data.iter().enumerate().map(|(i, m)| (i, m.is_variable())));

        let mut ravelled_value = Vec::with_capacity(data.len());
        for member in &data {
            ravelled_value.push(match member {
                Member::Constant(v) => v.clone(),
                Member::Variable(id) => graph.value(*id)?,
            });
        }

        Ok(Self {
            shape,
            ravelled_data: data,
            val_ind: partition.val,
            nonval_ind: partition.nonval,
            ravelled_value,
            scratch: Vec::new(),
            synced_at: graph.tick(),
        })
    }

    /// Number of value-bearing flat positions.
    pub fn n_val(&self) -> usize {
        self.val_ind.len()
    }

    /// Number of constant flat positions.
    pub fn n_nonval(&self) -> usize {
        self.nonval_ind.len()
    }

    /// Total number of elements.
    pub fn len(&self) -> usize {
        self.ravelled_data.len()
    }

    /// True if the array has no elements.
    pub fn is_empty(&self) -> bool {
        self.ravelled_data.is_empty()
    }

    /// The array shape, row-major.
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// The backing members, ravelled.
    pub fn members(&self) -> &[Member] {
        &self.ravelled_data
    }

    /// Mutable access to the ravelled backing members.
    ///
    /// Escape hatch for replacing constants in place; the partition is fixed
    /// at construction (see [`SequenceContainer::members_mut`]).
    pub fn members_mut(&mut self) -> &mut Vec<Member> {
        &mut self.ravelled_data
    }

    /// Replaces the constant at flat position `position` without
    /// reconstructing.
    pub fn replace_constant(&mut self, position: usize, value: Value) -> Result<(), ModelError> {
        match self.ravelled_data.get_mut(position) {
            None => Err(ModelError::IndexOutOfRange {
                position: position.to_string(),
            }),
            Some(Member::Variable(_)) => Err(ModelError::Internal(format!(
                "position {} holds a variable, not a constant",
                position
            ))),
            Some(slot @ Member::Constant(_)) => {
                *slot = Member::Constant(value);
                Ok(())
            }
        }
    }

    /// Member variable ids, in ravelled order.
    pub fn variable_ids(&self) -> Vec<VariableId> {
        member_variables(self.ravelled_data.iter())
    }

    /// Rebuilds the ravelled snapshot in place from current variable values.
    ///
    /// Variable flat indices first, then constant flat indices, ascending.
    /// All variable pulls are staged before the snapshot is touched.
    pub fn refresh(&mut self, graph: &mut ModelGraph) -> Result<(), ModelError> {
        self.scratch.clear();
        for &ind in &self.val_ind {
            match self.ravelled_data.get(ind) {
                None => {
                    return Err(ModelError::IndexOutOfRange {
                        position: ind.to_string(),
                    })
                }
                Some(Member::Constant(_)) => {
                    return Err(ModelError::Internal(format!(
                        "position {} no longer holds a variable",
                        ind
                    )))
                }
                Some(Member::Variable(id)) => {
                    let id = *id;
                    self.scratch.push(graph.value(id)?);
                }
            }
        }
        for &ind in &self.nonval_ind {
            if self.ravelled_data.get(ind).is_none() {
                return Err(ModelError::IndexOutOfRange {
                    position: ind.to_string(),
                });
            }
        }

        #[cfg(feature = "tracing")]
        tracing::debug!(
            n_val = self.val_ind.len(),
            n_nonval = self.nonval_ind.len(),
            "refreshing array container"
        );

        for (&ind, v) in self.val_ind.iter().zip(self.scratch.drain(..)) {
            self.ravelled_value[ind] = v;
        }
        for &ind in &self.nonval_ind {
            if let Some(Member::Constant(v)) = self.ravelled_data.get(ind) {
                self.ravelled_value[ind] = v.clone();
            }
        }
        self.synced_at = graph.tick();
        Ok(())
    }

    /// Read-only view of the ravelled snapshot.
    pub fn ravelled(&self) -> &[Value] {
        &self.ravelled_value
    }

    /// The snapshot element at multi-dimensional `index`.
    pub fn get(&self, index: &[usize]) -> Option<&Value> {
        let flat = ravel_index(&self.shape, index)?;
        self.ravelled_value.get(flat)
    }

    /// True if the snapshot still matches every member variable's value.
    pub fn is_fresh(&self, graph: &ModelGraph) -> bool {
        members_unchanged_since(graph, &self.variable_ids(), self.synced_at)
    }
}

/// Typed description of a member collection in one of the four shapes.
#[derive(Debug, Clone)]
pub enum Members {
    /// An ordered sequence
    Sequence(Vec<Member>),
    /// A keyed mapping in insertion order
    Mapping(Vec<(String, Member)>),
    /// An attribute mapping in declaration order
    Object(Vec<(String, Member)>),
    /// A dense row-major array
    Array {
        /// The array shape
        shape: Vec<usize>,
        /// The ravelled members; length must equal the shape's element count
        data: Vec<Member>,
    },
}

/// A container in one of the four structural shapes.
#[derive(Debug, Clone)]
pub enum Container {
    /// Ordered sequence shape
    Sequence(SequenceContainer),
    /// Keyed mapping shape
    Mapping(MappingContainer),
    /// Attribute-bearing object shape
    Object(ObjectContainer),
    /// Dense array shape
    Array(ArrayContainer),
}

/// Borrowed view of a container snapshot, matching the container's shape.
#[derive(Debug, Clone, Copy)]
pub enum SnapshotRef<'a> {
    /// Sequence snapshot
    Sequence(&'a [Value]),
    /// Mapping snapshot
    Mapping(&'a HashMap<String, Value>),
    /// Object snapshot: the attribute mapping itself
    Object(&'a HashMap<String, Value>),
    /// Array snapshot: shape plus ravelled values
    Array {
        /// The array shape
        shape: &'a [usize],
        /// The ravelled snapshot values
        data: &'a [Value],
    },
}

impl Container {
    /// One-time partition and snapshot build over a member collection.
    ///
    /// Fails with [`ModelError::ContainerShape`] on a malformed collection
    /// and [`ModelError::GraphCycle`] if a member variable is its own
    /// transitive parent (checked before any value computation).
    pub fn construct(members: Members, graph: &mut ModelGraph) -> Result<Self, ModelError> {
        match members {
            Members::Sequence(members) => {
                Ok(Container::Sequence(SequenceContainer::new(members, graph)?))
            }
            Members::Mapping(entries) => {
                Ok(Container::Mapping(MappingContainer::new(entries, graph)?))
            }
            Members::Object(attributes) => {
                Ok(Container::Object(ObjectContainer::new(attributes, graph)?))
            }
            Members::Array { shape, data } => {
                Ok(Container::Array(ArrayContainer::new(shape, data, graph)?))
            }
        }
    }

    /// Rebuilds the snapshot in place from current variable values.
    pub fn refresh(&mut self, graph: &mut ModelGraph) -> Result<(), ModelError> {
        match self {
            Container::Sequence(c) => c.refresh(graph),
            Container::Mapping(c) => c.refresh(graph),
            Container::Object(c) => c.refresh(graph),
            Container::Array(c) => c.refresh(graph),
        }
    }

    /// Read-only view of the current (possibly stale) snapshot.
    pub fn snapshot(&self) -> SnapshotRef<'_> {
        match self {
            Container::Sequence(c) => SnapshotRef::Sequence(c.snapshot()),
            Container::Mapping(c) => SnapshotRef::Mapping(c.snapshot()),
            Container::Object(c) => SnapshotRef::Object(c.snapshot()),
            Container::Array(c) => SnapshotRef::Array {
                shape: c.shape(),
                data: c.ravelled(),
            },
        }
    }

    /// Number of value-bearing positions.
    pub fn n_val(&self) -> usize {
        match self {
            Container::Sequence(c) => c.n_val(),
            Container::Mapping(c) => c.n_val(),
            Container::Object(c) => c.n_val(),
            Container::Array(c) => c.n_val(),
        }
    }

    /// Number of constant positions.
    pub fn n_nonval(&self) -> usize {
        match self {
            Container::Sequence(c) => c.n_nonval(),
            Container::Mapping(c) => c.n_nonval(),
            Container::Object(c) => c.n_nonval(),
            Container::Array(c) => c.n_nonval(),
        }
    }

    /// Total number of members.
    pub fn len(&self) -> usize {
        match self {
            Container::Sequence(c) => c.len(),
            Container::Mapping(c) => c.len(),
            Container::Object(c) => c.len(),
            Container::Array(c) => c.len(),
        }
    }

    /// True if the container has no members.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Member variable ids, in scan order.
    pub fn variable_ids(&self) -> Vec<VariableId> {
        match self {
            Container::Sequence(c) => c.variable_ids(),
            Container::Mapping(c) => c.variable_ids(),
            Container::Object(c) => c.variable_ids(),
            Container::Array(c) => c.variable_ids(),
        }
    }

    /// True if the snapshot still matches every member variable's value.
    ///
    /// There is no automatic transition back to fresh; only an explicit
    /// [`refresh`](Self::refresh) performs it.
    pub fn is_fresh(&self, graph: &ModelGraph) -> bool {
        match self {
            Container::Sequence(c) => c.is_fresh(graph),
            Container::Mapping(c) => c.is_fresh(graph),
            Container::Object(c) => c.is_fresh(graph),
            Container::Array(c) => c.is_fresh(graph),
        }
    }
}
