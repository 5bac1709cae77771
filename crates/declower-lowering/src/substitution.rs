//! Scoped rename bindings.
//!
//! While a declaration is lowered, references in its body may have to be
//! rewritten: a captured local becomes an implicit parameter or a field, a
//! class type parameter becomes a `$reified$` field, `this` inside a companion
//! becomes `$this`. [`Substitutions`] tracks these rewrites with nested scopes:
//! - a binding made in a scope is visible until that scope is popped
//! - rebinding a key shadows the outer binding, which is restored on pop
//!
//! Scopes are opened through [`LoweringContext::open_scope`](crate::LoweringContext::open_scope),
//! whose guard pops on drop, so early returns via `?` cannot leak bindings.

use declower_model::{DeclId, ParamRef, TypeParamRef};
use rustc_hash::FxHashMap;

use crate::target::TargetExpr;

// ============================================================================
// Types
// ============================================================================

/// What a binding rewrites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SubstKey {
    Param(ParamRef),
    /// A local value or function declaration.
    Local(DeclId),
    /// Runtime descriptor of a type parameter.
    TypeParam(TypeParamRef),
    /// The instance of an enclosing class or interface.
    Outer(DeclId),
    This,
}

#[derive(Debug, Clone)]
struct Binding {
    expr: TargetExpr,
    depth: u32,
}

// ============================================================================
// Substitutions
// ============================================================================

#[derive(Debug, Default)]
pub struct Substitutions {
    bindings: FxHashMap<SubstKey, Binding>,

    /// Current scope depth (0 = no scope open).
    depth: u32,

    /// Bindings hidden by a rebinding, with the depth the rebinding happened at.
    shadowed: Vec<(u32, SubstKey, Binding)>,
}

impl Substitutions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_scope(&mut self) {
        self.depth += 1;
    }

    /// Drop every binding made in the current scope and restore what it shadowed.
    pub fn pop_scope(&mut self) {
        if self.depth == 0 {
            return;
        }
        let depth = self.depth;
        self.bindings.retain(|_, b| b.depth < depth);

        while self.shadowed.last().is_some_and(|(d, _, _)| *d == depth) {
            if let Some((_, key, binding)) = self.shadowed.pop() {
                self.bindings.insert(key, binding);
            }
        }

        self.depth -= 1;
    }

    pub fn depth(&self) -> u32 {
        self.depth
    }

    /// Bind `key` in the current scope.
    pub fn bind(&mut self, key: SubstKey, expr: TargetExpr) {
        let binding = Binding {
            expr,
            depth: self.depth,
        };
        if let Some(previous) = self.bindings.insert(key, binding)
            && previous.depth < self.depth
        {
            self.shadowed.push((self.depth, key, previous));
        }
    }

    pub fn resolve(&self, key: &SubstKey) -> Option<&TargetExpr> {
        self.bindings.get(key).map(|b| &b.expr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declower_model::ModelBuilder;

    fn ids(n: usize) -> Vec<DeclId> {
        let mut b = ModelBuilder::new();
        (0..n).map(|i| b.function(&format!("d{i}")).build()).collect()
    }

    #[test]
    fn binding_is_dropped_with_its_scope() {
        let d = ids(1);
        let mut subst = Substitutions::new();
        subst.push_scope();
        subst.bind(SubstKey::Local(d[0]), TargetExpr::ident("$capture$a"));
        assert!(subst.resolve(&SubstKey::Local(d[0])).is_some());
        subst.pop_scope();
        assert_eq!(subst.resolve(&SubstKey::Local(d[0])), None);
        assert_eq!(subst.depth(), 0);
    }

    #[test]
    fn shadowed_binding_is_restored() {
        let mut subst = Substitutions::new();
        subst.push_scope();
        subst.bind(SubstKey::This, TargetExpr::This);
        subst.push_scope();
        subst.bind(SubstKey::This, TargetExpr::ident("$this"));
        assert_eq!(subst.resolve(&SubstKey::This), Some(&TargetExpr::ident("$this")));
        subst.pop_scope();
        assert_eq!(subst.resolve(&SubstKey::This), Some(&TargetExpr::This));
        subst.pop_scope();
        assert_eq!(subst.resolve(&SubstKey::This), None);
    }

    #[test]
    fn rebinding_in_same_scope_replaces() {
        let d = ids(1);
        let key = SubstKey::Outer(d[0]);
        let mut subst = Substitutions::new();
        subst.push_scope();
        subst.bind(key, TargetExpr::ident("a"));
        subst.bind(key, TargetExpr::ident("b"));
        subst.pop_scope();
        assert_eq!(subst.resolve(&key), None);
    }

    #[test]
    fn pop_without_scope_is_harmless() {
        let mut subst = Substitutions::new();
        subst.pop_scope();
        assert_eq!(subst.depth(), 0);
    }
}
