use crate::validation::selection_graph::ContainerId;
use crate::validation::type_shape::Shape;
use crate::validation::ConflictingField;
use crate::validation::FieldType;
use crate::validation::InvariantError;
use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Name;
use apollo_compiler::Node;
use std::cell::OnceCell;
use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;

/// Index of a field in its selection graph, in the order fields were visited
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub(crate) struct FieldId(pub(crate) usize);

/// A field selection, with the types it was resolved against
///
/// Identity, equality and ordering only consider [`FieldId`]:
/// selecting the same field twice yields two distinct descriptors.
pub(crate) struct SelectionField<'a> {
    pub(crate) id: FieldId,
    pub(crate) node: &'a Node<ast::Field>,
    pub(crate) ty: Option<FieldType<'a>>,
    pub(crate) parent_type: Option<&'a ExtendedType>,
    /// The container for the field's own selection set, if it has one
    pub(crate) selection_container: Option<ContainerId>,
    shape: OnceCell<Option<Shape>>,
    name_and_arguments: OnceCell<FieldNameAndArguments>,
}

/// The field name and arguments of a selection, independent of argument order
///
/// Two fields selected into the same response key from the same object
/// must have equal `FieldNameAndArguments`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FieldNameAndArguments {
    pub name: Name,
    /// Each argument printed as `name: value`
    pub arguments: BTreeSet<String>,
}

impl<'a> SelectionField<'a> {
    pub(crate) fn new(
        id: FieldId,
        node: &'a Node<ast::Field>,
        ty: Option<FieldType<'a>>,
        parent_type: Option<&'a ExtendedType>,
        selection_container: Option<ContainerId>,
    ) -> Self {
        Self {
            id,
            node,
            ty,
            parent_type,
            selection_container,
            shape: OnceCell::new(),
            name_and_arguments: OnceCell::new(),
        }
    }

    pub(crate) fn output_name(&self) -> &Name {
        response_key(self.node)
    }

    /// Returns `None` if the field's type is unknown to the schema
    pub(crate) fn type_shape(&self) -> Result<Option<&Shape>, InvariantError> {
        if let Some(shape) = self.shape.get() {
            return Ok(shape.as_ref());
        }
        let shape = match self.ty {
            Some(ty) => Some(Shape::of(ty.ty, ty.definition)?),
            None => None,
        };
        Ok(self.shape.get_or_init(|| shape).as_ref())
    }

    pub(crate) fn name_and_arguments(&self) -> &FieldNameAndArguments {
        self.name_and_arguments
            .get_or_init(|| FieldNameAndArguments::new(self.node))
    }

    pub(crate) fn to_conflicting(&self) -> ConflictingField {
        ConflictingField {
            node: self.node.clone(),
            ty: self.ty.map(|ty| ty.ty.clone()),
        }
    }
}

/// The alias if any, or the field name
pub(crate) fn response_key(field: &ast::Field) -> &Name {
    field.alias.as_ref().unwrap_or(&field.name)
}

/// Prints `name: value` without line breaks
pub(crate) fn print_argument(argument: &ast::Argument) -> String {
    format!(
        "{}: {}",
        argument.name,
        argument.value.serialize().no_indent()
    )
}

impl PartialEq for SelectionField<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for SelectionField<'_> {}

impl PartialOrd for SelectionField<'_> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SelectionField<'_> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.id.cmp(&other.id)
    }
}

impl fmt::Debug for SelectionField<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SelectionField")
            .field("id", &self.id.0)
            .field("output_name", self.output_name())
            .field("ty", &self.ty.map(|ty| ty.ty))
            .field("parent_type", &self.parent_type.map(|ty| ty.name()))
            .finish()
    }
}

impl FieldNameAndArguments {
    pub fn new(field: &ast::Field) -> Self {
        Self {
            name: field.name.clone(),
            arguments: field
                .arguments
                .iter()
                .map(|arg| print_argument(arg))
                .collect(),
        }
    }
}

impl fmt::Display for FieldNameAndArguments {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if !self.arguments.is_empty() {
            let arguments: Vec<_> = self.arguments.iter().map(String::as_str).collect();
            write!(f, "({})", arguments.join(", "))?;
        }
        Ok(())
    }
}
