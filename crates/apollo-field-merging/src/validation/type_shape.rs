use crate::validation::InvariantError;
use apollo_compiler::ast;
use apollo_compiler::schema::ExtendedType;
use apollo_compiler::Name;
use std::fmt;

/// The structure of a response value produced by a field, ignoring which composite type it is.
///
/// Two fields selected into the same response key must have equal shapes.
/// All object, interface and union types have the same [`Shape::Composite`] shape:
/// whether their sub-selections can merge is checked separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    /// A scalar or enum type, by name
    Leaf(Name),
    List(Box<Shape>),
    NonNull(Box<Shape>),
    Composite,
}

impl Shape {
    /// Returns the shape of a field's output type `ty`,
    /// where `definition` is the definition of the inner named type of `ty`.
    ///
    /// Input object types cannot be output types; finding one is an internal error.
    pub fn of(ty: &ast::Type, definition: &ExtendedType) -> Result<Self, InvariantError> {
        let named = match definition {
            ExtendedType::Scalar(_) | ExtendedType::Enum(_) => {
                Shape::Leaf(definition.name().clone())
            }
            ExtendedType::Object(_) | ExtendedType::Interface(_) | ExtendedType::Union(_) => {
                Shape::Composite
            }
            ExtendedType::InputObject(def) => {
                return Err(InvariantError::UnexpectedTypeKind {
                    type_name: def.name.clone(),
                })
            }
        };
        Ok(Self::wrap(ty, named))
    }

    fn wrap(ty: &ast::Type, named: Shape) -> Self {
        match ty {
            ast::Type::Named(_) => named,
            ast::Type::NonNullNamed(_) => Shape::NonNull(Box::new(named)),
            ast::Type::List(inner) => Shape::List(Box::new(Self::wrap(inner, named))),
            ast::Type::NonNullList(inner) => Shape::NonNull(Box::new(Shape::List(Box::new(
                Self::wrap(inner, named),
            )))),
        }
    }

    /// Returns true for the shape of a scalar or enum type, possibly wrapped
    pub fn is_leaf(&self) -> bool {
        match self {
            Shape::Leaf(_) => true,
            Shape::List(inner) | Shape::NonNull(inner) => inner.is_leaf(),
            Shape::Composite => false,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Shape::Leaf(name) => write!(f, "{name}"),
            Shape::List(inner) => write!(f, "[{inner}]"),
            Shape::NonNull(inner) => write!(f, "{inner}!"),
            Shape::Composite => f.write_str("{...}"),
        }
    }
}
