//! Depth-first traversal of executable definitions, with schema types resolved along the way

use crate::validation::InvariantError;
use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Node;
use apollo_compiler::Schema;

/// A node being entered or left by [`walk_document`]
#[derive(Debug, Clone, Copy)]
pub enum Visit<'a> {
    Operation(&'a Node<ast::OperationDefinition>),
    FragmentDefinition(&'a Node<ast::FragmentDefinition>),
    InlineFragment(&'a Node<ast::InlineFragment>),
    FragmentSpread(&'a Node<ast::FragmentSpread>),
    Field {
        node: &'a Node<ast::Field>,
        /// The output type of the field, if the schema defines it
        ty: Option<FieldType<'a>>,
        /// The type the field is selected on, if the schema defines it
        parent_type: Option<&'a ExtendedType>,
    },
}

/// The output type of a field together with the definition of its inner named type
#[derive(Debug, Clone, Copy)]
pub struct FieldType<'a> {
    pub ty: &'a ast::Type,
    pub definition: &'a ExtendedType,
}

/// Receives traversal events from [`walk_document`].
///
/// Every `enter` is matched by a `leave` of the same node,
/// after the events of everything nested in that node.
pub trait Visitor<'a> {
    fn enter(&mut self, visit: Visit<'a>) -> Result<(), InvariantError>;

    fn leave(&mut self, visit: Visit<'a>) -> Result<(), InvariantError> {
        let _ = visit;
        Ok(())
    }
}

/// Walks every operation and fragment definition of `document` in source order.
///
/// Types are resolved from operation root types, fragment type conditions and
/// inline fragment type conditions. An inline fragment without a type condition keeps
/// the enclosing type. Names missing from `schema` resolve to `None` and the walk continues.
/// Fragment spreads are not followed.
pub fn walk_document<'a>(
    schema: &'a Schema,
    document: &'a ast::Document,
    visitor: &mut impl Visitor<'a>,
) -> Result<(), InvariantError> {
    for definition in &document.definitions {
        match definition {
            ast::Definition::OperationDefinition(operation) => {
                let ty = schema
                    .root_operation(operation.operation_type)
                    .and_then(|name| schema.types.get(name));
                let visit = Visit::Operation(operation);
                visitor.enter(visit)?;
                walk_selection_set(schema, ty, &operation.selection_set, visitor)?;
                visitor.leave(visit)?;
            }
            ast::Definition::FragmentDefinition(fragment) => {
                let ty = schema.types.get(&fragment.type_condition);
                let visit = Visit::FragmentDefinition(fragment);
                visitor.enter(visit)?;
                walk_selection_set(schema, ty, &fragment.selection_set, visitor)?;
                visitor.leave(visit)?;
            }
            _ => {}
        }
    }
    Ok(())
}

fn walk_selection_set<'a>(
    schema: &'a Schema,
    parent_type: Option<&'a ExtendedType>,
    selection_set: &'a [ast::Selection],
    visitor: &mut impl Visitor<'a>,
) -> Result<(), InvariantError> {
    for selection in selection_set {
        match selection {
            ast::Selection::Field(node) => {
                let ty = parent_type
                    .and_then(|parent| schema.type_field(parent.name(), &node.name).ok())
                    .and_then(|def| {
                        let definition = schema.types.get(def.ty.inner_named_type())?;
                        Some(FieldType {
                            ty: &def.ty,
                            definition,
                        })
                    });
                let visit = Visit::Field {
                    node,
                    ty,
                    parent_type,
                };
                visitor.enter(visit)?;
                walk_selection_set(
                    schema,
                    ty.map(|ty| ty.definition),
                    &node.selection_set,
                    visitor,
                )?;
                visitor.leave(visit)?;
            }
            ast::Selection::InlineFragment(inline) => {
                let ty = match &inline.type_condition {
                    Some(condition) => schema.types.get(condition),
                    None => parent_type,
                };
                let visit = Visit::InlineFragment(inline);
                visitor.enter(visit)?;
                walk_selection_set(schema, ty, &inline.selection_set, visitor)?;
                visitor.leave(visit)?;
            }
            ast::Selection::FragmentSpread(spread) => {
                let visit = Visit::FragmentSpread(spread);
                visitor.enter(visit)?;
                visitor.leave(visit)?;
            }
        }
    }
    Ok(())
}
