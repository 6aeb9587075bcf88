//! Validation that fields in a selection set can merge
//!
//! Two fields selected into the same response key, possibly through
//! fragment spreads and inline fragments, must be mergeable into one response value:
//! they need the same response shape, and when they can apply to the same runtime object,
//! the same field name and arguments.
//! See [`validate_field_merging`].
//!
//! Fragment spreads may form cycles. Validation still terminates and
//! does not report them: that is the job of fragment usage validation.

use crate::diagnostic::DiagnosticList;
use apollo_compiler::ast;
use apollo_compiler::parser::SourceSpan;
use apollo_compiler::Name;
use apollo_compiler::Node;
use apollo_compiler::Schema;
use std::fmt;

mod fields_will_merge;
mod selection_field;
mod selection_graph;
mod type_shape;
mod visitor;

pub use self::selection_field::FieldNameAndArguments;
pub use self::type_shape::Shape;
pub use self::visitor::walk_document;
pub use self::visitor::FieldType;
pub use self::visitor::Visit;
pub use self::visitor::Visitor;

/// Checks that fields with the same response key can merge, in every operation
/// and fragment definition of `document`.
///
/// Conflicts are collected into the returned list, in a deterministic order:
/// roots in document order, and within one root in the source order of the fields.
/// Type system definitions in `document` are ignored.
///
/// `Err` is only returned if an internal invariant is violated,
/// for example a field whose output type is an input object.
/// Such a failure is not a property of the query and is never mixed with conflicts.
pub fn validate_field_merging(
    schema: &Schema,
    document: &ast::Document,
) -> Result<DiagnosticList, InvariantError> {
    let mut builder = selection_graph::SelectionBuilder::new();
    walk_document(schema, document, &mut builder)?;
    let mut graph = builder.finish()?;

    let roots: Vec<_> = graph.roots().collect();
    for &root in &roots {
        graph.resolve(root);
    }
    log::debug!(
        "field merging: {} roots, {} selection containers, {} fields",
        roots.len(),
        graph.container_count(),
        graph.field_count(),
    );

    let mut checker = fields_will_merge::FieldsWillMerge::new(&graph);
    for &root in &roots {
        log::trace!("checking fields of {root:?}");
        let set = checker.lookup(graph.field_set(root));
        checker.fields_in_set_can_merge(set)?;
    }
    checker.log_stats();

    let mut errors = DiagnosticList::new(document.sources.clone());
    for conflict in checker.into_conflicts() {
        errors.push(conflict)
    }
    Ok(errors)
}

/// A defect in the data handed to field merging validation, as opposed to a user error
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum InvariantError {
    #[error("input object type `{type_name}` cannot be the output type of a field")]
    UnexpectedTypeKind { type_name: Name },

    #[error("no selection container is open when visiting {event}")]
    MissingContainer { event: &'static str },

    #[error("{count} selection container(s) left open at the end of the document")]
    UnclosedContainers { count: usize },
}

/// Why two fields selected into the same response key cannot merge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConflictReason {
    /// One field has a scalar type and the other an enum type
    LeafKindMismatch,
    /// The two fields alias different schema fields
    DifferentFieldName,
    /// The named types of the two fields differ
    TypeMismatch,
    /// The two fields are selected with different arguments
    ArgumentMismatch,
}

/// One side of a [`FieldConflict`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConflictingField {
    pub node: Node<ast::Field>,
    /// The field's output type, if it could be resolved in the schema
    pub ty: Option<ast::Type>,
}

/// Two fields selected into the same response key that cannot merge
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("{reason} for response key `{response_key}`")]
pub struct FieldConflict {
    pub response_key: Name,
    pub reason: ConflictReason,
    /// The field that comes first in the document
    pub first: ConflictingField,
    pub second: ConflictingField,
}

impl ConflictReason {
    /// Machine-readable tag, as found in the `reason` extension of JSON errors
    pub fn tag(self) -> &'static str {
        match self {
            ConflictReason::LeafKindMismatch => "LEAF_KIND_MISMATCH",
            ConflictReason::DifferentFieldName => "DIFFERENT_FIELD_NAME",
            ConflictReason::TypeMismatch => "TYPE_MISMATCH",
            ConflictReason::ArgumentMismatch => "ARGUMENT_MISMATCH",
        }
    }
}

impl fmt::Display for ConflictReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConflictReason::LeafKindMismatch => "scalar and enum types mixed",
            ConflictReason::DifferentFieldName => "different field name",
            ConflictReason::TypeMismatch => "type mismatch",
            ConflictReason::ArgumentMismatch => "argument mismatch",
        })
    }
}

impl ConflictingField {
    pub(crate) fn label(&self, reason: ConflictReason) -> String {
        let field = &self.node;
        let response_key = selection_field::response_key(field);
        match reason {
            ConflictReason::DifferentFieldName => {
                format!("`{response_key}` is selected from `{}` here", field.name)
            }
            ConflictReason::ArgumentMismatch if field.arguments.is_empty() => {
                format!("`{}` is selected without arguments here", field.name)
            }
            ConflictReason::ArgumentMismatch => {
                let arguments = field
                    .arguments
                    .iter()
                    .map(|arg| selection_field::print_argument(arg))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("`{}` is selected with arguments `{arguments}` here", field.name)
            }
            ConflictReason::LeafKindMismatch | ConflictReason::TypeMismatch => match &self.ty {
                Some(ty) => format!("`{response_key}` has type `{ty}` here"),
                None => format!("`{response_key}` is selected here"),
            },
        }
    }
}

impl FieldConflict {
    /// The location of the field that comes second in the document
    pub fn location(&self) -> Option<SourceSpan> {
        self.second.node.location()
    }

    pub(crate) fn help(&self) -> &'static str {
        match self.reason {
            ConflictReason::DifferentFieldName => {
                "Both fields may be present on the schema type, \
                 so it's not clear which one should be used to fill the response"
            }
            ConflictReason::ArgumentMismatch => {
                "The same field cannot be selected into one response key with different arguments"
            }
            ConflictReason::LeafKindMismatch | ConflictReason::TypeMismatch => {
                "Use different aliases to select values of different types"
            }
        }
    }
}
