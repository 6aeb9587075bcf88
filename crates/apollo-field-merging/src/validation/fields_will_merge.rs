//! The memoized checker of [field merging](https://spec.graphql.org/October2021/#sec-Field-Selection-Merging)
//!
//! Work is organized around sets of fields: the fields of a root selection set,
//! the fields in it that share a response key, the merged sub-selections of those, etc.
//! Each distinct set gets one cache entry, so a set reached many times
//! (for example through a fragment spread in many places) is only grouped and checked once.

use crate::validation::selection_field::FieldId;
use crate::validation::selection_field::FieldNameAndArguments;
use crate::validation::selection_field::SelectionField;
use crate::validation::selection_graph::SelectionGraph;
use crate::validation::type_shape::Shape;
use crate::validation::ConflictReason;
use crate::validation::FieldConflict;
use crate::validation::InvariantError;
use apollo_compiler::Name;
use indexmap::IndexMap;
use std::collections::HashMap;
use std::collections::HashSet;
use std::rc::Rc;

/// Index of a field set in the cache
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct FieldSetId(usize);

/// Cache entry for a sorted, deduplicated set of fields
struct FieldSet {
    fields: Rc<[FieldId]>,
    by_output_name: Option<Rc<[FieldSetId]>>,
    by_common_parents: Option<Rc<[FieldSetId]>>,
    merged_children: Option<FieldSetId>,
    same_response_shape_checked: bool,
    same_fields_checked: bool,
    /// Set once the fields of this set were compared with each other as one group
    same_response_shape_required: bool,
    same_name_and_arguments_required: bool,
}

pub(crate) struct FieldsWillMerge<'g, 'a> {
    graph: &'g SelectionGraph<'a>,
    sets: Vec<FieldSet>,
    index: HashMap<Rc<[FieldId]>, FieldSetId>,
    /// Pairs passed to `check_conflict`, smallest ID first
    checked_pairs: HashSet<(FieldId, FieldId)>,
    conflicts: Vec<((FieldId, FieldId), FieldConflict)>,
    hits: usize,
    misses: usize,
    groups_compared: usize,
}

impl<'g, 'a> FieldsWillMerge<'g, 'a> {
    pub(crate) fn new(graph: &'g SelectionGraph<'a>) -> Self {
        Self {
            graph,
            sets: Vec::new(),
            index: HashMap::new(),
            checked_pairs: HashSet::new(),
            conflicts: Vec::new(),
            hits: 0,
            misses: 0,
            groups_compared: 0,
        }
    }

    /// Returns the cache entry for `fields`, which must be sorted and deduplicated
    pub(crate) fn lookup(&mut self, fields: Box<[FieldId]>) -> FieldSetId {
        if let Some(&id) = self.index.get(&*fields) {
            self.hits += 1;
            return id;
        }
        self.misses += 1;
        let id = FieldSetId(self.sets.len());
        let fields: Rc<[FieldId]> = fields.into();
        self.sets.push(FieldSet {
            fields: fields.clone(),
            by_output_name: None,
            by_common_parents: None,
            merged_children: None,
            same_response_shape_checked: false,
            same_fields_checked: false,
            same_response_shape_required: false,
            same_name_and_arguments_required: false,
        });
        self.index.insert(fields, id);
        id
    }

    pub(crate) fn log_stats(&self) {
        log::debug!(
            "field set cache: {} entries, {} hits, {} misses, {} groups and {} field pairs compared",
            self.sets.len(),
            self.hits,
            self.misses,
            self.groups_compared,
            self.checked_pairs.len(),
        );
    }

    pub(crate) fn into_conflicts(self) -> Vec<FieldConflict> {
        self.conflicts
            .into_iter()
            .map(|(_, conflict)| conflict)
            .collect()
    }

    /// Checks a root selection set.
    ///
    /// Conflicts found in this call are ordered by the source order of their fields.
    pub(crate) fn fields_in_set_can_merge(&mut self, set: FieldSetId) -> Result<(), InvariantError> {
        let start = self.conflicts.len();
        self.same_response_shape(set)?;
        self.same_fields_for_coincident_parent_types(set)?;
        self.conflicts[start..].sort_by_key(|(pair, _)| *pair);
        Ok(())
    }

    fn same_response_shape(&mut self, set: FieldSetId) -> Result<(), InvariantError> {
        if self.sets[set.0].same_response_shape_checked {
            return Ok(());
        }
        self.sets[set.0].same_response_shape_checked = true;
        for &group in self.group_by_output_name(set).iter() {
            self.require_same_response_shape(group)?;
            let children = self.merge_child_selections(group);
            self.same_response_shape(children)?;
        }
        Ok(())
    }

    fn same_fields_for_coincident_parent_types(
        &mut self,
        set: FieldSetId,
    ) -> Result<(), InvariantError> {
        if self.sets[set.0].same_fields_checked {
            return Ok(());
        }
        self.sets[set.0].same_fields_checked = true;
        for &group in self.group_by_output_name(set).iter() {
            for &common in self.group_by_common_parents(group).iter() {
                self.require_same_name_and_arguments(common);
                let children = self.merge_child_selections(common);
                self.same_fields_for_coincident_parent_types(children)?;
            }
        }
        Ok(())
    }

    /// Fields with different shapes are sorted next to each other,
    /// so comparing neighbors covers every shape difference in the group.
    fn require_same_response_shape(&mut self, group: FieldSetId) -> Result<(), InvariantError> {
        if self.sets[group.0].same_response_shape_required {
            return Ok(());
        }
        self.sets[group.0].same_response_shape_required = true;
        self.groups_compared += 1;
        let graph = self.graph;
        let mut by_shape = IndexMap::<Option<&Shape>, Vec<FieldId>>::new();
        for &id in self.sets[group.0].fields.iter() {
            let shape = graph.field(id).type_shape()?;
            by_shape.entry(shape).or_default().push(id);
        }
        if by_shape.len() < 2 {
            return Ok(());
        }
        let ordered: Vec<_> = by_shape.into_values().flatten().collect();
        for pair in ordered.windows(2) {
            let (a, b) = (graph.field(pair[0]), graph.field(pair[1]));
            match (a.type_shape()?, b.type_shape()?) {
                (Some(shape_a), Some(shape_b)) if shape_a != shape_b => self.check_conflict(a, b),
                _ => {}
            }
        }
        Ok(())
    }

    fn require_same_name_and_arguments(&mut self, group: FieldSetId) {
        if self.sets[group.0].same_name_and_arguments_required {
            return;
        }
        self.sets[group.0].same_name_and_arguments_required = true;
        self.groups_compared += 1;
        let graph = self.graph;
        let mut by_key = IndexMap::<&FieldNameAndArguments, Vec<FieldId>>::new();
        for &id in self.sets[group.0].fields.iter() {
            by_key
                .entry(graph.field(id).name_and_arguments())
                .or_default()
                .push(id);
        }
        let ordered: Vec<_> = by_key.into_values().flatten().collect();
        for pair in ordered.windows(2) {
            self.check_conflict(graph.field(pair[0]), graph.field(pair[1]))
        }
    }

    /// Returns the fields of the sub-selections of every field in `set`, as one set
    fn merge_child_selections(&mut self, set: FieldSetId) -> FieldSetId {
        if let Some(children) = self.sets[set.0].merged_children {
            return children;
        }
        let graph = self.graph;
        let children = self.lookup(graph.children(&self.sets[set.0].fields));
        self.sets[set.0].merged_children = Some(children);
        children
    }

    /// Groups fields by response key, in order of first appearance
    fn group_by_output_name(&mut self, set: FieldSetId) -> Rc<[FieldSetId]> {
        if let Some(groups) = &self.sets[set.0].by_output_name {
            return groups.clone();
        }
        let graph = self.graph;
        let mut by_name = IndexMap::<&Name, Vec<FieldId>>::new();
        for &id in self.sets[set.0].fields.iter() {
            by_name
                .entry(graph.field(id).output_name())
                .or_default()
                .push(id);
        }
        let groups: Rc<[FieldSetId]> = by_name
            .into_values()
            .map(|fields| self.lookup(fields.into_boxed_slice()))
            .collect();
        self.sets[set.0].by_output_name = Some(groups.clone());
        groups
    }

    /// Groups fields that can apply to the same runtime object.
    ///
    /// Fields selected on an object type go in one group per object type.
    /// Fields selected on an interface, a union or a type missing from the schema
    /// may apply to any object type, so they join every one of those groups,
    /// or form their own group if there is none.
    fn group_by_common_parents(&mut self, set: FieldSetId) -> Rc<[FieldSetId]> {
        if let Some(groups) = &self.sets[set.0].by_common_parents {
            return groups.clone();
        }
        let graph = self.graph;
        let mut abstract_fields = Vec::new();
        let mut by_concrete_parent = IndexMap::<&Name, Vec<FieldId>>::new();
        for &id in self.sets[set.0].fields.iter() {
            match graph.field(id).parent_type {
                Some(parent) if parent.is_object() => by_concrete_parent
                    .entry(parent.name())
                    .or_default()
                    .push(id),
                Some(_) | None => abstract_fields.push(id),
            }
        }
        let groups: Vec<Vec<FieldId>> = if by_concrete_parent.is_empty() {
            if abstract_fields.is_empty() {
                Vec::new()
            } else {
                vec![abstract_fields]
            }
        } else {
            by_concrete_parent
                .into_values()
                .map(|mut fields| {
                    fields.extend_from_slice(&abstract_fields);
                    fields.sort_unstable();
                    fields
                })
                .collect()
        };
        let groups: Rc<[FieldSetId]> = groups
            .into_iter()
            .map(|fields| self.lookup(fields.into_boxed_slice()))
            .collect();
        self.sets[set.0].by_common_parents = Some(groups.clone());
        groups
    }

    /// Compares two fields of one response key, at most once per pair
    fn check_conflict(&mut self, a: &SelectionField<'a>, b: &SelectionField<'a>) {
        let (first, second) = if a.id <= b.id { (a, b) } else { (b, a) };
        if first.id == second.id || !self.checked_pairs.insert((first.id, second.id)) {
            return;
        }
        if let Some(reason) = conflict_reason(first, second) {
            log::trace!(
                "conflict on `{}`: {reason} between fields {:?} and {:?}",
                first.output_name(),
                first.id,
                second.id,
            );
            let conflict = FieldConflict {
                response_key: first.output_name().clone(),
                reason,
                first: first.to_conflicting(),
                second: second.to_conflicting(),
            };
            self.conflicts.push(((first.id, second.id), conflict))
        }
    }
}

/// The first rule that applies wins.
/// Rules that need a type are skipped when the type is unknown.
fn conflict_reason(a: &SelectionField<'_>, b: &SelectionField<'_>) -> Option<ConflictReason> {
    if let (Some(parent_a), Some(parent_b)) = (a.parent_type, b.parent_type) {
        // Never selected on the same object
        if parent_a.is_object() && parent_b.is_object() && parent_a.name() != parent_b.name() {
            return None;
        }
    }
    if let (Some(ty_a), Some(ty_b)) = (a.ty, b.ty) {
        let (def_a, def_b) = (ty_a.definition, ty_b.definition);
        if def_a.is_leaf() && def_b.is_leaf() && def_a.is_scalar() != def_b.is_scalar() {
            return Some(ConflictReason::LeafKindMismatch);
        }
    }
    if a.node.name != b.node.name {
        return Some(ConflictReason::DifferentFieldName);
    }
    if let (Some(ty_a), Some(ty_b)) = (a.ty, b.ty) {
        if ty_a.ty.inner_named_type() != ty_b.ty.inner_named_type() {
            return Some(ConflictReason::TypeMismatch);
        }
    }
    if a.name_and_arguments().arguments != b.name_and_arguments().arguments {
        return Some(ConflictReason::ArgumentMismatch);
    }
    None
}
