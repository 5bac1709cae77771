//! Declarations, parameters and captured-local references.

use declower_core::{Modifiers, Span};
use petgraph::graph::NodeIndex;

use crate::{SourceBody, SourceExpr, TypeParam, TypeRef};

/// Handle to a declaration stored in a [`DeclarationModel`](crate::DeclarationModel).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DeclId(pub NodeIndex);

impl DeclId {
    #[inline]
    pub fn index(self) -> usize {
        self.0.index()
    }
}

/// Declaration variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DeclKind {
    Class,
    Interface,
    ClassAlias,
    InterfaceAlias,
    Function,
    Value,
    TypeAlias,
}

impl DeclKind {
    /// Class, interface, or an alias of either.
    pub fn is_class_or_interface(self) -> bool {
        matches!(
            self,
            DeclKind::Class | DeclKind::Interface | DeclKind::ClassAlias | DeclKind::InterfaceAlias
        )
    }

    pub fn is_class(self) -> bool {
        matches!(self, DeclKind::Class | DeclKind::ClassAlias)
    }

    pub fn is_interface(self) -> bool {
        matches!(self, DeclKind::Interface | DeclKind::InterfaceAlias)
    }

    pub fn is_alias(self) -> bool {
        matches!(
            self,
            DeclKind::ClassAlias | DeclKind::InterfaceAlias | DeclKind::TypeAlias
        )
    }

    /// Declarations that own parameter lists.
    pub fn is_functional(self) -> bool {
        matches!(self, DeclKind::Function | DeclKind::Class | DeclKind::ClassAlias)
    }
}

/// Where a declaration lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Container {
    /// Toplevel declaration of a package.
    Package,
    /// Member of a class or interface.
    Member(DeclId),
    /// Declared inside the body of a function, value or class initializer.
    Local(DeclId),
}

impl Container {
    /// The enclosing declaration, if not toplevel.
    pub fn decl(self) -> Option<DeclId> {
        match self {
            Container::Package => None,
            Container::Member(d) | Container::Local(d) => Some(d),
        }
    }
}

/// Reference to one parameter: `index` within parameter list `list` of `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ParamRef {
    pub owner: DeclId,
    pub list: usize,
    pub index: usize,
}

impl ParamRef {
    pub fn new(owner: DeclId, index: usize) -> Self {
        Self {
            owner,
            list: 0,
            index,
        }
    }
}

/// A local captured by a nested declaration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocalRef {
    /// A local value or function.
    Decl(DeclId),
    /// A parameter of an enclosing function or class.
    Param(ParamRef),
}

/// A declared parameter.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
    /// Default expression; `Some` means the parameter is defaulted.
    pub default: Option<SourceExpr>,
    /// Variadic.
    pub sequenced: bool,
    /// Variadic parameter that requires at least one element.
    pub at_least_one: bool,
    /// Callable-typed parameter that needs a wrapper at the target.
    pub functional: bool,
    /// Class parameter that is also a visible attribute of the class.
    pub promoted: bool,
    /// Promoted parameter that may be reassigned.
    pub variable: bool,
    pub span: Span,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            sequenced: false,
            at_least_one: false,
            functional: false,
            promoted: false,
            variable: false,
            span: Span::default(),
        }
    }

    pub fn with_default(mut self, expr: SourceExpr) -> Self {
        self.default = Some(expr);
        self
    }

    /// Make this a variadic parameter of `ty` elements.
    pub fn with_sequenced(mut self, at_least_one: bool) -> Self {
        self.ty = TypeRef::sequential(self.ty);
        self.sequenced = true;
        self.at_least_one = at_least_one;
        self
    }

    pub fn with_functional(mut self) -> Self {
        self.functional = true;
        self
    }

    pub fn with_promoted(mut self, variable: bool) -> Self {
        self.promoted = true;
        self.variable = variable;
        self
    }

    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn is_defaulted(&self) -> bool {
        self.default.is_some()
    }
}

/// A user-facing annotation, copied verbatim onto the target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Annotation {
    pub name: String,
    pub args: Vec<String>,
}

impl Annotation {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }
}

/// A resolved declaration.
///
/// `value_type` is the result type of a function, the type of a value, or
/// the aliased type of a type alias. Class and interface aliases keep the
/// aliased type in `extended_type`.
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub kind: DeclKind,
    pub container: Container,
    pub modifiers: Modifiers,
    pub span: Span,
    pub type_parameters: Vec<TypeParam>,
    pub extended_type: Option<TypeRef>,
    pub satisfied_types: Vec<TypeRef>,
    pub case_types: Vec<TypeRef>,
    pub parameter_lists: Vec<Vec<Parameter>>,
    pub value_type: TypeRef,
    pub captured_locals: Vec<LocalRef>,
    /// Body supplied later by assignment.
    pub deferred: bool,
    /// The declaration this one directly refines.
    pub refines: Option<DeclId>,
    pub body: SourceBody,
    pub annotations: Vec<Annotation>,
    /// Upstream reported an unrecoverable error on this declaration.
    pub erroneous: bool,
}

impl Declaration {
    pub fn new(name: impl Into<String>, kind: DeclKind, container: Container) -> Self {
        Self {
            name: name.into(),
            kind,
            container,
            modifiers: Modifiers::empty(),
            span: Span::default(),
            type_parameters: Vec::new(),
            extended_type: None,
            satisfied_types: Vec::new(),
            case_types: Vec::new(),
            parameter_lists: Vec::new(),
            value_type: TypeRef::Void,
            captured_locals: Vec::new(),
            deferred: false,
            refines: None,
            body: SourceBody::None,
            annotations: Vec::new(),
            erroneous: false,
        }
    }

    pub fn is_shared(&self) -> bool {
        self.modifiers.is_shared()
    }

    pub fn is_formal(&self) -> bool {
        self.modifiers.is_formal()
    }

    pub fn is_default(&self) -> bool {
        self.modifiers.is_default()
    }

    pub fn is_actual(&self) -> bool {
        self.modifiers.is_actual()
    }

    pub fn is_abstract(&self) -> bool {
        self.modifiers.contains(Modifiers::ABSTRACT)
    }

    pub fn is_variable(&self) -> bool {
        self.modifiers.contains(Modifiers::VARIABLE)
    }

    pub fn is_transient(&self) -> bool {
        self.modifiers.contains(Modifiers::TRANSIENT)
    }

    /// The first parameter list; empty for declarations without one.
    pub fn parameters(&self) -> &[Parameter] {
        self.parameter_lists.first().map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_generic(&self) -> bool {
        !self.type_parameters.is_empty()
    }
}
