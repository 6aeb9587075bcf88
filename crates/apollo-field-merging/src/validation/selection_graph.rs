//! Selection containers and their fragment-expanded field sets
//!
//! Every operation, fragment definition, inline fragment, and field with a sub-selection
//! gets a container in an arena. A container records the fields selected directly in it,
//! and "spreads" to other containers whose fields apply at the same level:
//! inline fragments and named fragments.
//!
//! The effective set of a container is the container itself plus everything reachable
//! through spreads. Named fragments can spread each other in cycles,
//! so effective sets are computed per strongly connected component of the spread graph.

use crate::validation::selection_field::FieldId;
use crate::validation::selection_field::SelectionField;
use crate::validation::InvariantError;
use crate::validation::Visit;
use crate::validation::Visitor;
use apollo_compiler::ast;
use apollo_compiler::Name;
use indexmap::IndexSet;
use std::collections::HashMap;
use std::rc::Rc;

/// Index of a container in its selection graph
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct ContainerId(usize);

#[derive(Debug, Default)]
struct SelectionContainer {
    fields: Vec<FieldId>,
    spreads: Vec<ContainerId>,
}

#[derive(Debug, Clone)]
enum Resolution {
    Unvisited,
    /// On the component stack, with the bookkeeping of Tarjan's algorithm
    InProgress {
        order: usize,
        low_link: usize,
    },
    Done {
        effective: Rc<[ContainerId]>,
    },
}

/// Containers and fields of every operation and fragment definition of one document
pub(crate) struct SelectionGraph<'a> {
    containers: Vec<SelectionContainer>,
    /// Parallel to `containers`
    resolution: Vec<Resolution>,
    fields: Vec<SelectionField<'a>>,
    roots: IndexSet<ContainerId>,
    fragments: HashMap<Name, ContainerId>,
}

/// Builds a [`SelectionGraph`] from the events of [`walk_document`][crate::validation::walk_document]
pub(crate) struct SelectionBuilder<'a> {
    graph: SelectionGraph<'a>,
    stack: Vec<ContainerId>,
}

impl<'a> SelectionGraph<'a> {
    fn new() -> Self {
        Self {
            containers: Vec::new(),
            resolution: Vec::new(),
            fields: Vec::new(),
            roots: IndexSet::new(),
            fragments: HashMap::new(),
        }
    }

    fn new_container(&mut self) -> ContainerId {
        let id = ContainerId(self.containers.len());
        self.containers.push(SelectionContainer::default());
        self.resolution.push(Resolution::Unvisited);
        id
    }

    /// Returns the container for a named fragment, creating it on first reference.
    ///
    /// A fragment spread before its definition, or never defined, gets an empty container
    /// that the definition fills in later, if any.
    fn fragment(&mut self, name: &Name) -> ContainerId {
        if let Some(&id) = self.fragments.get(name) {
            return id;
        }
        let id = self.new_container();
        self.fragments.insert(name.clone(), id);
        id
    }

    /// Operations and fragment definitions, in document order
    pub(crate) fn roots(&self) -> impl Iterator<Item = ContainerId> + '_ {
        self.roots.iter().copied()
    }

    pub(crate) fn container_count(&self) -> usize {
        self.containers.len()
    }

    pub(crate) fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub(crate) fn field(&self, id: FieldId) -> &SelectionField<'a> {
        &self.fields[id.0]
    }

    /// Resolves the effective sets of `root` and of every field container nested in it.
    pub(crate) fn resolve(&mut self, root: ContainerId) {
        let mut worklist = vec![root];
        while let Some(container) = worklist.pop() {
            if !matches!(self.resolution[container.0], Resolution::Unvisited) {
                continue;
            }
            self.strong_connect(container);
            for member in self.effective_set(container).iter() {
                for field in &self.containers[member.0].fields {
                    let Some(nested) = self.fields[field.0].selection_container else {
                        continue;
                    };
                    if matches!(self.resolution[nested.0], Resolution::Unvisited) {
                        worklist.push(nested)
                    }
                }
            }
        }
    }

    /// Tarjan's strongly connected components over spreads, without recursion.
    ///
    /// When a component is complete, every other container it spreads to is done,
    /// so its members share one effective set: themselves plus those effective sets.
    fn strong_connect(&mut self, start: ContainerId) {
        let mut next_order = 0;
        let mut component_stack = Vec::new();
        // (container, index of the next spread to follow)
        let mut call_stack = vec![(start, 0)];
        self.resolution[start.0] = Resolution::InProgress {
            order: next_order,
            low_link: next_order,
        };
        next_order += 1;
        component_stack.push(start);

        while let Some(&(container, next_spread)) = call_stack.last() {
            if let Some(&target) = self.containers[container.0].spreads.get(next_spread) {
                if let Some(top) = call_stack.last_mut() {
                    top.1 += 1;
                }
                match self.resolution[target.0] {
                    Resolution::Unvisited => {
                        self.resolution[target.0] = Resolution::InProgress {
                            order: next_order,
                            low_link: next_order,
                        };
                        next_order += 1;
                        component_stack.push(target);
                        call_stack.push((target, 0));
                    }
                    Resolution::InProgress { order, .. } => self.lower_link(container, order),
                    Resolution::Done { .. } => {}
                }
                continue;
            }

            call_stack.pop();
            let Resolution::InProgress { order, low_link } = self.resolution[container.0] else {
                continue;
            };
            if let Some(&(caller, _)) = call_stack.last() {
                self.lower_link(caller, low_link);
            }
            if low_link != order {
                continue;
            }

            let mut members = Vec::new();
            while let Some(member) = component_stack.pop() {
                members.push(member);
                if member == container {
                    break;
                }
            }
            let mut effective = members.clone();
            for member in &members {
                for target in &self.containers[member.0].spreads {
                    if let Resolution::Done { effective: done } = &self.resolution[target.0] {
                        effective.extend(done.iter().copied())
                    }
                }
            }
            effective.sort_unstable();
            effective.dedup();
            let effective: Rc<[ContainerId]> = effective.into();
            for member in members {
                self.resolution[member.0] = Resolution::Done {
                    effective: effective.clone(),
                };
            }
        }
    }

    fn lower_link(&mut self, container: ContainerId, value: usize) {
        if let Resolution::InProgress { low_link, .. } = &mut self.resolution[container.0] {
            *low_link = (*low_link).min(value)
        }
    }

    /// Containers whose fields apply at the level of `container`, itself included.
    ///
    /// A container that was not resolved only sees its own direct fields.
    fn effective_set(&self, container: ContainerId) -> Rc<[ContainerId]> {
        match &self.resolution[container.0] {
            Resolution::Done { effective } => effective.clone(),
            Resolution::Unvisited | Resolution::InProgress { .. } => Rc::new([container]),
        }
    }

    /// Sorted and deduplicated fields of the effective set of `container`
    pub(crate) fn field_set(&self, container: ContainerId) -> Box<[FieldId]> {
        self.fields_of(self.effective_set(container).iter().copied())
    }

    /// Sorted and deduplicated fields selected in the sub-selections of `fields`
    pub(crate) fn children(&self, fields: &[FieldId]) -> Box<[FieldId]> {
        let mut containers: Vec<ContainerId> = fields
            .iter()
            .filter_map(|field| self.fields[field.0].selection_container)
            .flat_map(|nested| self.effective_set(nested).to_vec())
            .collect();
        containers.sort_unstable();
        containers.dedup();
        self.fields_of(containers.into_iter())
    }

    fn fields_of(&self, containers: impl Iterator<Item = ContainerId>) -> Box<[FieldId]> {
        let mut fields: Vec<FieldId> = containers
            .flat_map(|container| self.containers[container.0].fields.iter().copied())
            .collect();
        fields.sort_unstable();
        fields.dedup();
        fields.into_boxed_slice()
    }

    #[cfg(test)]
    fn fragment_container(&self, name: &str) -> Option<ContainerId> {
        self.fragments.get(name).copied()
    }
}

impl<'a> SelectionBuilder<'a> {
    pub(crate) fn new() -> Self {
        Self {
            graph: SelectionGraph::new(),
            stack: Vec::new(),
        }
    }

    /// Returns the graph, once every container entered was left
    pub(crate) fn finish(self) -> Result<SelectionGraph<'a>, InvariantError> {
        if !self.stack.is_empty() {
            return Err(InvariantError::UnclosedContainers {
                count: self.stack.len(),
            });
        }
        Ok(self.graph)
    }

    fn top(&self, event: &'static str) -> Result<ContainerId, InvariantError> {
        self.stack
            .last()
            .copied()
            .ok_or(InvariantError::MissingContainer { event })
    }

    fn pop(&mut self, event: &'static str) -> Result<(), InvariantError> {
        self.stack
            .pop()
            .map(drop)
            .ok_or(InvariantError::MissingContainer { event })
    }

    /// Push a container that is either a root or applies at the level of the current container
    fn push_spread_or_root(&mut self, container: ContainerId) {
        match self.stack.last() {
            Some(top) => self.graph.containers[top.0].spreads.push(container),
            None => {
                self.graph.roots.insert(container);
            }
        }
        self.stack.push(container)
    }
}

fn has_sub_selection(field: &ast::Field) -> bool {
    !field.selection_set.is_empty()
}

impl<'a> Visitor<'a> for SelectionBuilder<'a> {
    fn enter(&mut self, visit: Visit<'a>) -> Result<(), InvariantError> {
        match visit {
            Visit::Field {
                node,
                ty,
                parent_type,
            } => {
                let top = self.top("field")?;
                let nested = has_sub_selection(node).then(|| self.graph.new_container());
                let id = FieldId(self.graph.fields.len());
                self.graph
                    .fields
                    .push(SelectionField::new(id, node, ty, parent_type, nested));
                self.graph.containers[top.0].fields.push(id);
                if let Some(nested) = nested {
                    self.stack.push(nested)
                }
            }
            Visit::Operation(_) | Visit::InlineFragment(_) => {
                let container = self.graph.new_container();
                self.push_spread_or_root(container)
            }
            Visit::FragmentDefinition(definition) => {
                let container = self.graph.fragment(&definition.name);
                if self.stack.is_empty() {
                    self.graph.roots.insert(container);
                }
                self.stack.push(container)
            }
            Visit::FragmentSpread(spread) => {
                let top = self.top("fragment spread")?;
                let container = self.graph.fragment(&spread.fragment_name);
                self.graph.containers[top.0].spreads.push(container)
            }
        }
        Ok(())
    }

    fn leave(&mut self, visit: Visit<'a>) -> Result<(), InvariantError> {
        match visit {
            Visit::Field { node, .. } if has_sub_selection(node) => self.pop("end of field"),
            Visit::Field { .. } | Visit::FragmentSpread(_) => Ok(()),
            Visit::Operation(_) => self.pop("end of operation"),
            Visit::FragmentDefinition(_) => self.pop("end of fragment definition"),
            Visit::InlineFragment(_) => self.pop("end of inline fragment"),
        }
    }
}
