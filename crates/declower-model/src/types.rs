//! Type references as the type checker resolved them.

use declower_core::Span;
use rustc_hash::FxHashMap;

use crate::DeclId;

/// Reference to the `index`th type parameter declared by `owner`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeParamRef {
    pub owner: DeclId,
    pub index: usize,
}

impl TypeParamRef {
    pub fn new(owner: DeclId, index: usize) -> Self {
        Self { owner, index }
    }
}

/// A declared type parameter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeParam {
    pub name: String,
    pub span: Span,
}

impl TypeParam {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            span: Span::default(),
        }
    }
}

/// Type arguments keyed by the parameter they instantiate.
pub type TypeArgs = FxHashMap<TypeParamRef, TypeRef>;

/// A fully resolved type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeRef {
    /// The universal object type.
    Object,
    /// No value (function results only).
    Void,
    /// A language-provided type such as `String` or `Integer`.
    Basic(String),
    /// A declared class or interface, with type arguments in declaration order.
    Named { decl: DeclId, args: Vec<TypeRef> },
    /// A type parameter in scope.
    Param(TypeParamRef),
    /// A possibly-empty sequence of elements.
    Sequential(Box<TypeRef>),
    /// A first-class function type.
    Callable {
        ret: Box<TypeRef>,
        params: Vec<TypeRef>,
    },
    /// A union; the target erases unions to the object type.
    Union(Vec<TypeRef>),
}

impl TypeRef {
    pub fn basic(name: impl Into<String>) -> Self {
        TypeRef::Basic(name.into())
    }

    /// A non-generic declared type.
    pub fn named(decl: DeclId) -> Self {
        TypeRef::Named {
            decl,
            args: Vec::new(),
        }
    }

    /// A declared type applied to arguments.
    pub fn generic(decl: DeclId, args: Vec<TypeRef>) -> Self {
        TypeRef::Named { decl, args }
    }

    pub fn param(owner: DeclId, index: usize) -> Self {
        TypeRef::Param(TypeParamRef::new(owner, index))
    }

    pub fn sequential(elem: TypeRef) -> Self {
        TypeRef::Sequential(Box::new(elem))
    }

    pub fn callable(ret: TypeRef, params: Vec<TypeRef>) -> Self {
        TypeRef::Callable {
            ret: Box::new(ret),
            params,
        }
    }

    /// The declaration this type names, if it names one.
    pub fn decl(&self) -> Option<DeclId> {
        match self {
            TypeRef::Named { decl, .. } => Some(*decl),
            _ => None,
        }
    }

    /// Type arguments of a named type; empty otherwise.
    pub fn args(&self) -> &[TypeRef] {
        match self {
            TypeRef::Named { args, .. } => args,
            _ => &[],
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, TypeRef::Void)
    }

    pub fn is_type_parameter(&self) -> bool {
        matches!(self, TypeRef::Param(_))
    }

    /// Whether the target erases this type to the universal object type.
    pub fn erases_to_object(&self) -> bool {
        matches!(self, TypeRef::Object | TypeRef::Union(_))
    }

    /// Replace type parameters bound in `args`, leaving free ones untouched.
    pub fn substitute(&self, args: &TypeArgs) -> TypeRef {
        if args.is_empty() {
            return self.clone();
        }
        match self {
            TypeRef::Param(p) => args.get(p).cloned().unwrap_or(TypeRef::Param(*p)),
            TypeRef::Named { decl, args: own } => TypeRef::Named {
                decl: *decl,
                args: own.iter().map(|a| a.substitute(args)).collect(),
            },
            TypeRef::Sequential(elem) => TypeRef::Sequential(Box::new(elem.substitute(args))),
            TypeRef::Callable { ret, params } => TypeRef::Callable {
                ret: Box::new(ret.substitute(args)),
                params: params.iter().map(|p| p.substitute(args)).collect(),
            },
            TypeRef::Union(members) => {
                TypeRef::Union(members.iter().map(|m| m.substitute(args)).collect())
            }
            TypeRef::Object | TypeRef::Void | TypeRef::Basic(_) => self.clone(),
        }
    }

    /// Collect every type parameter this type mentions, in first-seen order.
    pub fn type_parameters(&self, out: &mut Vec<TypeParamRef>) {
        match self {
            TypeRef::Param(p) => {
                if !out.contains(p) {
                    out.push(*p);
                }
            }
            TypeRef::Named { args, .. } => args.iter().for_each(|a| a.type_parameters(out)),
            TypeRef::Sequential(elem) => elem.type_parameters(out),
            TypeRef::Callable { ret, params } => {
                ret.type_parameters(out);
                params.iter().for_each(|p| p.type_parameters(out));
            }
            TypeRef::Union(members) => members.iter().for_each(|m| m.type_parameters(out)),
            TypeRef::Object | TypeRef::Void | TypeRef::Basic(_) => {}
        }
    }
}

/// Bind `owner`'s type parameters to `args`, position by position.
pub fn bind_type_args(owner: DeclId, args: &[TypeRef]) -> TypeArgs {
    args.iter()
        .enumerate()
        .map(|(index, arg)| (TypeParamRef::new(owner, index), arg.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use petgraph::graph::NodeIndex;

    fn id(n: u32) -> DeclId {
        DeclId(NodeIndex::new(n as usize))
    }

    #[test]
    fn substitute_replaces_bound_parameters_only() {
        let list = id(1);
        let owner = id(2);
        let t = TypeRef::param(owner, 0);
        let u = TypeRef::param(owner, 1);
        let ty = TypeRef::generic(list, vec![t.clone(), u.clone()]);

        let args = bind_type_args(owner, &[TypeRef::basic("String")]);
        let out = ty.substitute(&args);

        assert_eq!(out, TypeRef::generic(list, vec![TypeRef::basic("String"), u]));
    }

    #[test]
    fn substitute_descends_into_callables_and_sequences() {
        let owner = id(3);
        let ty = TypeRef::callable(
            TypeRef::sequential(TypeRef::param(owner, 0)),
            vec![TypeRef::param(owner, 0)],
        );
        let args = bind_type_args(owner, &[TypeRef::basic("Integer")]);
        let expected = TypeRef::callable(
            TypeRef::sequential(TypeRef::basic("Integer")),
            vec![TypeRef::basic("Integer")],
        );
        assert_eq!(ty.substitute(&args), expected);
    }

    #[test]
    fn erasure_to_object() {
        assert!(TypeRef::Object.erases_to_object());
        assert!(TypeRef::Union(vec![TypeRef::basic("A"), TypeRef::basic("B")]).erases_to_object());
        assert!(!TypeRef::param(id(0), 0).erases_to_object());
        assert!(!TypeRef::basic("String").erases_to_object());
    }

    #[test]
    fn type_parameters_first_seen_order() {
        let owner = id(4);
        let ty = TypeRef::callable(
            TypeRef::param(owner, 1),
            vec![TypeRef::param(owner, 0), TypeRef::param(owner, 1)],
        );
        let mut out = Vec::new();
        ty.type_parameters(&mut out);
        assert_eq!(out, vec![TypeParamRef::new(owner, 1), TypeParamRef::new(owner, 0)]);
    }
}
