//! Target declarations: single-inheritance classes, fixed-arity methods,
//! erased generics with explicit descriptors.

use bitflags::bitflags;
use declower_core::QualifiedName;

bitflags! {
    /// Target-level modifiers.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct TargetModifiers: u16 {
        const PUBLIC = 1 << 0;
        const PROTECTED = 1 << 1;
        const PRIVATE = 1 << 2;
        const STATIC = 1 << 3;
        const FINAL = 1 << 4;
        const ABSTRACT = 1 << 5;
        /// Compiler-generated; not visible to source-level reflection.
        const SYNTHETIC = 1 << 6;
    }
}

impl TargetModifiers {
    pub fn visibility(self) -> TargetModifiers {
        self & (TargetModifiers::PUBLIC | TargetModifiers::PROTECTED | TargetModifiers::PRIVATE)
    }

    /// Replace the visibility bits, keeping everything else.
    pub fn with_visibility(self, visibility: TargetModifiers) -> TargetModifiers {
        (self - (TargetModifiers::PUBLIC | TargetModifiers::PROTECTED | TargetModifiers::PRIVATE))
            | visibility
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetKind {
    Class,
    Interface,
}

/// An erased target type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TargetType {
    Void,
    Object,
    /// A class or interface, with type arguments.
    Named { name: String, args: Vec<TargetType> },
    /// A type variable of the enclosing method or class.
    Var(String),
    /// Runtime type descriptor.
    Descriptor,
    /// Erased callable object.
    Callable(Box<TargetType>),
    /// Erased sequence.
    Sequence(Box<TargetType>),
}

impl TargetType {
    pub fn named(name: impl Into<String>) -> Self {
        TargetType::Named {
            name: name.into(),
            args: Vec::new(),
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TargetType::Void)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetLiteral {
    Integer(i64),
    String(String),
    Boolean(bool),
    Null,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetExpr {
    Ident(String),
    This,
    Super,
    /// `Outer.this`
    OuterThis(String),
    /// Static qualifier.
    TypeName(String),
    Literal(TargetLiteral),
    Field {
        target: Box<TargetExpr>,
        name: String,
    },
    /// Method invocation; `target: None` is an unqualified call.
    Call {
        target: Option<Box<TargetExpr>>,
        method: String,
        args: Vec<TargetExpr>,
    },
    /// `this(...)` constructor delegation.
    ThisCall(Vec<TargetExpr>),
    /// `super(...)` constructor delegation.
    SuperCall(Vec<TargetExpr>),
    New {
        ty: TargetType,
        args: Vec<TargetExpr>,
    },
    Cast {
        ty: TargetType,
        expr: Box<TargetExpr>,
    },
    Assign {
        target: Box<TargetExpr>,
        value: Box<TargetExpr>,
    },
    /// The empty sequence.
    EmptySequence,
    Sequence(Vec<TargetExpr>),
    /// Runtime descriptor of a type.
    TypeDescriptor(TargetType),
    /// Sequential local bindings, each visible to the next and to `body`.
    Let {
        bindings: Vec<LetBinding>,
        body: Box<TargetExpr>,
    },
    Lambda {
        params: Vec<TargetParam>,
        body: Vec<TargetStmt>,
    },
    /// Placeholder for a construct that could not be lowered.
    Erroneous(String),
}

impl TargetExpr {
    pub fn ident(name: impl Into<String>) -> Self {
        TargetExpr::Ident(name.into())
    }

    pub fn field(target: TargetExpr, name: impl Into<String>) -> Self {
        TargetExpr::Field {
            target: Box::new(target),
            name: name.into(),
        }
    }

    pub fn call(target: Option<TargetExpr>, method: impl Into<String>, args: Vec<TargetExpr>) -> Self {
        TargetExpr::Call {
            target: target.map(Box::new),
            method: method.into(),
            args,
        }
    }

    pub fn cast(ty: TargetType, expr: TargetExpr) -> Self {
        TargetExpr::Cast {
            ty,
            expr: Box::new(expr),
        }
    }

    pub fn string(value: impl Into<String>) -> Self {
        TargetExpr::Literal(TargetLiteral::String(value.into()))
    }

    pub fn is_erroneous(&self) -> bool {
        matches!(self, TargetExpr::Erroneous(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LetBinding {
    pub name: String,
    pub ty: TargetType,
    pub value: TargetExpr,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TargetStmt {
    Expr(TargetExpr),
    Return(Option<TargetExpr>),
    Local {
        name: String,
        ty: TargetType,
        init: Option<TargetExpr>,
    },
    Throw(TargetExpr),
}

/// Why a parameter exists when it has no source counterpart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImplicitKind {
    /// The instance of the enclosing interface (`$this`).
    OuterThis,
    /// A captured local.
    Captured,
    /// A type descriptor from an enclosing generic scope.
    OuterDescriptor,
    /// A type descriptor for the callable's own type parameter.
    OwnDescriptor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetParam {
    pub name: String,
    pub ty: TargetType,
    pub implicit: Option<ImplicitKind>,
}

impl TargetParam {
    pub fn explicit(name: impl Into<String>, ty: TargetType) -> Self {
        Self {
            name: name.into(),
            ty,
            implicit: None,
        }
    }

    pub fn implicit(name: impl Into<String>, ty: TargetType, kind: ImplicitKind) -> Self {
        Self {
            name: name.into(),
            ty,
            implicit: Some(kind),
        }
    }

    pub fn is_implicit(&self) -> bool {
        self.implicit.is_some()
    }
}

/// What produced a synthesized method.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MethodOrigin {
    /// The full-arity public form of a source declaration.
    Ultimate,
    /// The single body-holding form of a `default` declaration.
    Canonical,
    /// Overload supplying defaults from parameter `cut` onwards.
    Overload { cut: usize },
    /// Computes the default value of parameter `param`.
    DefaultValue { param: usize },
    /// Forwards to a companion on behalf of the implementing class.
    CompanionDelegate { interface: String },
    Instantiator,
    AliasInstantiator,
    Getter,
    Setter,
    /// Invokes a callable stored for a functional parameter.
    FunctionalParameter,
    /// Runtime type descriptor accessor.
    GetType,
    Main,
    /// Stands in for a member that could not be lowered.
    Placeholder,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMethod {
    pub name: String,
    pub modifiers: TargetModifiers,
    pub type_params: Vec<String>,
    pub params: Vec<TargetParam>,
    pub ret: TargetType,
    /// `None` for abstract declarations.
    pub body: Option<Vec<TargetStmt>>,
    pub origin: MethodOrigin,
}

impl TargetMethod {
    pub fn new(name: impl Into<String>, origin: MethodOrigin) -> Self {
        Self {
            name: name.into(),
            modifiers: TargetModifiers::empty(),
            type_params: Vec::new(),
            params: Vec::new(),
            ret: TargetType::Void,
            body: None,
            origin,
        }
    }

    pub fn is_abstract(&self) -> bool {
        self.body.is_none()
    }

    /// Number of parameters with a source counterpart.
    pub fn explicit_arity(&self) -> usize {
        self.params.iter().filter(|p| !p.is_implicit()).count()
    }

    /// Parameters without a source counterpart, in order.
    pub fn implicit_params(&self) -> impl Iterator<Item = &TargetParam> {
        self.params.iter().filter(|p| p.is_implicit())
    }
}

/// A constructor; `cut` is set on defaulted-argument overloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetConstructor {
    pub modifiers: TargetModifiers,
    pub params: Vec<TargetParam>,
    pub body: Vec<TargetStmt>,
    pub cut: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetField {
    pub name: String,
    pub ty: TargetType,
    pub modifiers: TargetModifiers,
    pub init: Option<TargetExpr>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetAnnotation {
    pub name: String,
    pub values: Vec<String>,
}

impl TargetAnnotation {
    pub fn new(name: impl Into<String>, values: Vec<String>) -> Self {
        Self {
            name: name.into(),
            values,
        }
    }
}

/// A rendered target class or interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetTypeDecl {
    pub name: QualifiedName,
    pub kind: TargetKind,
    pub modifiers: TargetModifiers,
    pub type_params: Vec<String>,
    pub extends: Option<TargetType>,
    pub implements: Vec<TargetType>,
    pub fields: Vec<TargetField>,
    pub constructors: Vec<TargetConstructor>,
    pub methods: Vec<TargetMethod>,
    pub annotations: Vec<TargetAnnotation>,
    pub nested: Vec<TargetTypeDecl>,
}

impl TargetTypeDecl {
    pub fn simple_name(&self) -> &str {
        &self.name.name
    }

    pub fn methods_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TargetMethod> {
        self.methods.iter().filter(move |m| m.name == name)
    }

    pub fn field(&self, name: &str) -> Option<&TargetField> {
        self.fields.iter().find(|f| f.name == name)
    }

    pub fn annotation(&self, name: &str) -> Option<&TargetAnnotation> {
        self.annotations.iter().find(|a| a.name == name)
    }

    pub fn nested_type(&self, simple: &str) -> Option<&TargetTypeDecl> {
        self.nested.iter().find(|n| n.name.name == simple)
    }

    /// This declaration and every nested one, depth-first.
    pub fn walk(&self) -> Vec<&TargetTypeDecl> {
        let mut out = vec![self];
        for nested in &self.nested {
            out.extend(nested.walk());
        }
        out
    }
}
