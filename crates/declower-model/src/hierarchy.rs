//! Type hierarchy and refinement queries.
//!
//! Every walk here is guarded by a visited set so that a malformed model
//! with an inheritance cycle terminates instead of looping.

use rustc_hash::FxHashSet;

use crate::{DeclId, DeclKind, DeclarationModel, TypeRef, bind_type_args};

impl DeclarationModel {
    /// Follow alias declarations to the type they stand for.
    pub fn resolve_alias(&self, ty: &TypeRef) -> TypeRef {
        let mut current = ty.clone();
        let mut seen = FxHashSet::default();
        while let TypeRef::Named { decl, args } = &current
            && matches!(
                self.decl(*decl).kind,
                DeclKind::ClassAlias | DeclKind::InterfaceAlias
            )
            && seen.insert(*decl)
            && let Some(aliased) = &self.decl(*decl).extended_type
        {
            let next = aliased.substitute(&bind_type_args(*decl, args));
            current = next;
        }
        current
    }

    /// Superclass of `ty`, instantiated with `ty`'s type arguments.
    pub fn extended_type_of(&self, ty: &TypeRef) -> Option<TypeRef> {
        let TypeRef::Named { decl, args } = ty else {
            return None;
        };
        let extended = self.decl(*decl).extended_type.as_ref()?;
        let bound = bind_type_args(*decl, args);
        Some(self.resolve_alias(&extended.substitute(&bound)))
    }

    /// Satisfied interfaces of `ty`, instantiated with `ty`'s type arguments.
    pub fn satisfied_types_of(&self, ty: &TypeRef) -> Vec<TypeRef> {
        let TypeRef::Named { decl, args } = ty else {
            return Vec::new();
        };
        let bound = bind_type_args(*decl, args);
        self.decl(*decl)
            .satisfied_types
            .iter()
            .map(|s| self.resolve_alias(&s.substitute(&bound)))
            .collect()
    }

    /// Superclass chain of a class, nearest first, excluding the class itself.
    pub fn extended_chain(&self, class: DeclId) -> Vec<DeclId> {
        let mut chain = Vec::new();
        let mut seen = FxHashSet::default();
        seen.insert(class);
        let mut current = self.self_type(class);

        while let Some(extended) = self.extended_type_of(&current)
            && let Some(decl) = extended.decl()
            && seen.insert(decl)
        {
            chain.push(decl);
            current = extended;
        }

        chain
    }

    /// Interfaces reachable from `decl` through satisfied types only,
    /// depth-first in declaration order, each listed once.
    pub fn satisfied_closure(&self, decl: DeclId) -> Vec<DeclId> {
        let mut out = Vec::new();
        let mut seen = FxHashSet::default();
        self.collect_satisfied(decl, &mut seen, &mut out);
        out
    }

    fn collect_satisfied(&self, decl: DeclId, seen: &mut FxHashSet<DeclId>, out: &mut Vec<DeclId>) {
        for satisfied in self.satisfied_types_of(&self.self_type(decl)) {
            if let Some(iface) = satisfied.decl()
                && seen.insert(iface)
            {
                out.push(iface);
                self.collect_satisfied(iface, seen, out);
            }
        }
    }

    /// Whether `sub` is `sup` or inherits from it.
    pub fn inherits(&self, sub: DeclId, sup: DeclId) -> bool {
        if sub == sup {
            return true;
        }
        if self.satisfied_closure(sub).contains(&sup) {
            return true;
        }
        self.extended_chain(sub)
            .into_iter()
            .any(|ancestor| ancestor == sup || self.satisfied_closure(ancestor).contains(&sup))
    }

    /// The topmost declaration in `id`'s refinement chain (itself if it refines nothing).
    pub fn root_refined(&self, id: DeclId) -> DeclId {
        let mut current = id;
        let mut seen = FxHashSet::default();
        while let Some(refined) = self.decl(current).refines
            && seen.insert(refined)
        {
            current = refined;
        }
        current
    }

    /// Whether `a` is `b` or (transitively) refines it.
    pub fn refines(&self, a: DeclId, b: DeclId) -> bool {
        let mut current = Some(a);
        let mut seen = FxHashSet::default();
        while let Some(d) = current {
            if d == b {
                return true;
            }
            if !seen.insert(d) {
                return false;
            }
            current = self.decl(d).refines;
        }
        false
    }

    /// The most refined member named `name` visible on type `ty`.
    ///
    /// Own members win; otherwise candidates from the superclass and the
    /// satisfied interfaces are compared by refinement, and the first found
    /// wins a tie.
    pub fn get_member(&self, ty: DeclId, name: &str) -> Option<DeclId> {
        let mut seen = FxHashSet::default();
        self.find_member(ty, name, &mut seen)
    }

    fn find_member(&self, ty: DeclId, name: &str, seen: &mut FxHashSet<DeclId>) -> Option<DeclId> {
        if !seen.insert(ty) {
            return None;
        }
        if let Some(own) = self.direct_member(ty, name) {
            return Some(own);
        }

        let self_type = self.self_type(ty);
        let supers = self
            .extended_type_of(&self_type)
            .into_iter()
            .chain(self.satisfied_types_of(&self_type))
            .filter_map(|t| t.decl());

        let mut best: Option<DeclId> = None;
        for sup in supers {
            if let Some(candidate) = self.find_member(sup, name, seen) {
                best = match best {
                    Some(current) if !self.refines(candidate, current) => Some(current),
                    _ => Some(candidate),
                };
            }
        }
        best
    }

    /// The instantiation of `iface` found first from `ty`: `ty` itself, then
    /// the superclass chain, then satisfied interfaces depth-first in
    /// declaration order.
    pub fn first_satisfied_type(&self, ty: &TypeRef, iface: DeclId) -> Option<TypeRef> {
        let mut seen = FxHashSet::default();
        self.first_satisfied(&self.resolve_alias(ty), iface, &mut seen)
    }

    fn first_satisfied(
        &self,
        ty: &TypeRef,
        iface: DeclId,
        seen: &mut FxHashSet<TypeRef>,
    ) -> Option<TypeRef> {
        if ty.decl() == Some(iface) {
            return Some(ty.clone());
        }
        if !seen.insert(ty.clone()) {
            return None;
        }
        if let Some(extended) = self.extended_type_of(ty)
            && let Some(found) = self.first_satisfied(&extended, iface, seen)
        {
            return Some(found);
        }
        self.satisfied_types_of(ty)
            .iter()
            .find_map(|satisfied| self.first_satisfied(satisfied, iface, seen))
    }

    /// The instantiation of `iface` reached through `class`'s own declared
    /// interfaces, ignoring the superclass path.
    pub fn principal_satisfied_type(&self, class: DeclId, iface: DeclId) -> Option<TypeRef> {
        let mut seen = FxHashSet::default();
        self.satisfied_types_of(&self.self_type(class))
            .iter()
            .find_map(|satisfied| self.first_satisfied(satisfied, iface, &mut seen))
    }

    /// An interface has a companion iff it owns at least one concrete member.
    ///
    /// A default-value computation is concrete code too, so a formal member
    /// with a defaulted parameter also counts.
    pub fn has_companion(&self, iface: DeclId) -> bool {
        self.decl(iface).kind == DeclKind::Interface
            && self.members(iface).into_iter().any(|m| {
                let member = self.decl(m);
                matches!(
                    member.kind,
                    DeclKind::Function | DeclKind::Value | DeclKind::Class
                ) && (!member.is_formal()
                    || member.parameters().iter().any(|p| p.is_defaulted()))
            })
    }
}
