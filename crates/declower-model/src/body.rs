//! Source bodies and default-value expressions.
//!
//! These are opaque to the lowering core: it only decides where a body or
//! default expression ends up and hands it to a body-lowering service.

use declower_core::Span;

use crate::{DeclId, ParamRef, TypeRef};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Literal {
    Integer(i64),
    String(String),
    Boolean(bool),
    Null,
}

/// What a name in a body refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reference {
    Param(ParamRef),
    /// A value or function declaration (local, member or toplevel).
    Decl(DeclId),
    /// The current instance.
    This,
    /// The instance of an enclosing class or interface.
    Outer(DeclId),
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceExpr {
    Literal(Literal),
    Ref(Reference),
    Invoke {
        callee: DeclId,
        receiver: Option<Box<SourceExpr>>,
        args: Vec<SourceExpr>,
    },
    Instantiate {
        class: DeclId,
        args: Vec<SourceExpr>,
    },
    Sequence(Vec<SourceExpr>),
    /// A runtime descriptor of a type, e.g. for a type test.
    Reify(TypeRef),
    /// A term shape the direct lowering has no rule for.
    Other { term: String, span: Span },
}

impl SourceExpr {
    pub fn int(value: i64) -> Self {
        SourceExpr::Literal(Literal::Integer(value))
    }

    pub fn string(value: impl Into<String>) -> Self {
        SourceExpr::Literal(Literal::String(value.into()))
    }

    pub fn param(owner: DeclId, index: usize) -> Self {
        SourceExpr::Ref(Reference::Param(ParamRef::new(owner, index)))
    }

    pub fn decl(decl: DeclId) -> Self {
        SourceExpr::Ref(Reference::Decl(decl))
    }

    pub fn invoke(callee: DeclId, args: Vec<SourceExpr>) -> Self {
        SourceExpr::Invoke {
            callee,
            receiver: None,
            args,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SourceStmt {
    Expr(SourceExpr),
    Return(Option<SourceExpr>),
    /// Declaration site of a local value; its initializer is the value's body.
    Declare(DeclId),
    Assign { target: Reference, value: SourceExpr },
}

#[derive(Debug, Clone, PartialEq, Default)]
pub enum SourceBody {
    /// Formal declarations and deferred functions.
    #[default]
    None,
    /// `=> expr` form.
    Expr(SourceExpr),
    Block(Vec<SourceStmt>),
}

impl SourceBody {
    pub fn is_none(&self) -> bool {
        matches!(self, SourceBody::None)
    }
}
