//! Target AST builder.
//!
//! Lowering never constructs [`TargetTypeDecl`]s directly. It opens a shell
//! with [`TargetAstBuilder::new_type`], accumulates members through the
//! returned handle, and renders with [`TargetAstBuilder::build`]. A shell can
//! be dropped with [`TargetAstBuilder::discard`] when lowering of its
//! declaration is abandoned, so no partial declaration leaks out.

use declower_core::QualifiedName;

use super::{
    TargetAnnotation, TargetConstructor, TargetField, TargetKind, TargetMethod, TargetModifiers,
    TargetType, TargetTypeDecl,
};

/// Handle to an open type shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TypeHandle(usize);

#[derive(Debug)]
struct Shell {
    decl: TargetTypeDecl,
    nested: Vec<TypeHandle>,
    siblings: Vec<TypeHandle>,
}

/// Accumulates target declarations.
#[derive(Debug, Default)]
pub struct TargetAstBuilder {
    shells: Vec<Option<Shell>>,
}

impl TargetAstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Open an empty shell.
    pub fn new_type(&mut self, kind: TargetKind, name: QualifiedName) -> TypeHandle {
        let handle = TypeHandle(self.shells.len());
        self.shells.push(Some(Shell {
            decl: TargetTypeDecl {
                name,
                kind,
                modifiers: TargetModifiers::empty(),
                type_params: Vec::new(),
                extends: None,
                implements: Vec::new(),
                fields: Vec::new(),
                constructors: Vec::new(),
                methods: Vec::new(),
                annotations: Vec::new(),
                nested: Vec::new(),
            },
            nested: Vec::new(),
            siblings: Vec::new(),
        }));
        handle
    }

    fn shell(&self, handle: TypeHandle) -> Option<&Shell> {
        self.shells.get(handle.0).and_then(Option::as_ref)
    }

    fn shell_mut(&mut self, handle: TypeHandle) -> Option<&mut Shell> {
        self.shells.get_mut(handle.0).and_then(Option::as_mut)
    }

    pub fn is_open(&self, handle: TypeHandle) -> bool {
        self.shell(handle).is_some()
    }

    pub fn name(&self, handle: TypeHandle) -> Option<&QualifiedName> {
        self.shell(handle).map(|s| &s.decl.name)
    }

    pub fn kind(&self, handle: TypeHandle) -> Option<TargetKind> {
        self.shell(handle).map(|s| s.decl.kind)
    }

    pub fn set_modifiers(&mut self, handle: TypeHandle, modifiers: TargetModifiers) {
        if let Some(shell) = self.shell_mut(handle) {
            shell.decl.modifiers = modifiers;
        }
    }

    pub fn set_extends(&mut self, handle: TypeHandle, ty: TargetType) {
        if let Some(shell) = self.shell_mut(handle) {
            shell.decl.extends = Some(ty);
        }
    }

    /// Add an implemented interface; duplicates are ignored.
    pub fn add_implements(&mut self, handle: TypeHandle, ty: TargetType) {
        if let Some(shell) = self.shell_mut(handle)
            && !shell.decl.implements.contains(&ty)
        {
            shell.decl.implements.push(ty);
        }
    }

    /// Declare a type parameter; a name already declared is ignored.
    pub fn add_type_param(&mut self, handle: TypeHandle, name: impl Into<String>) {
        let name = name.into();
        if let Some(shell) = self.shell_mut(handle)
            && !shell.decl.type_params.contains(&name)
        {
            shell.decl.type_params.push(name);
        }
    }

    /// Add a field. Returns `false` if a field of that name already exists.
    pub fn add_field(&mut self, handle: TypeHandle, field: TargetField) -> bool {
        match self.shell_mut(handle) {
            Some(shell) if shell.decl.fields.iter().all(|f| f.name != field.name) => {
                shell.decl.fields.push(field);
                true
            }
            _ => false,
        }
    }

    pub fn add_method(&mut self, handle: TypeHandle, method: TargetMethod) {
        if let Some(shell) = self.shell_mut(handle) {
            shell.decl.methods.push(method);
        }
    }

    pub fn add_constructor(&mut self, handle: TypeHandle, constructor: TargetConstructor) {
        if let Some(shell) = self.shell_mut(handle) {
            shell.decl.constructors.push(constructor);
        }
    }

    pub fn add_annotation(&mut self, handle: TypeHandle, annotation: TargetAnnotation) {
        if let Some(shell) = self.shell_mut(handle) {
            shell.decl.annotations.push(annotation);
        }
    }

    /// Run `f` over every constructor already added to `handle`.
    pub fn update_constructors(
        &mut self,
        handle: TypeHandle,
        mut f: impl FnMut(&mut TargetConstructor),
    ) {
        if let Some(shell) = self.shell_mut(handle) {
            shell.decl.constructors.iter_mut().for_each(&mut f);
        }
    }

    pub fn has_field(&self, handle: TypeHandle, name: &str) -> bool {
        self.shell(handle)
            .is_some_and(|s| s.decl.fields.iter().any(|f| f.name == name))
    }

    /// Whether a method with this name and explicit arity was already added.
    pub fn has_method(&self, handle: TypeHandle, name: &str, explicit_arity: usize) -> bool {
        self.shell(handle).is_some_and(|s| {
            s.decl
                .methods
                .iter()
                .any(|m| m.name == name && m.explicit_arity() == explicit_arity)
        })
    }

    pub fn method_count(&self, handle: TypeHandle) -> usize {
        self.shell(handle).map_or(0, |s| s.decl.methods.len())
    }

    /// Render `child` inside `parent`.
    pub fn nest(&mut self, parent: TypeHandle, child: TypeHandle) {
        if let Some(shell) = self.shell_mut(parent) {
            shell.nested.push(child);
        }
    }

    /// Render `other` next to `handle` (e.g. a toplevel interface's companion).
    pub fn add_sibling(&mut self, handle: TypeHandle, other: TypeHandle) {
        if let Some(shell) = self.shell_mut(handle) {
            shell.siblings.push(other);
        }
    }

    /// Drop a shell together with everything nested in it or attached to it.
    pub fn discard(&mut self, handle: TypeHandle) {
        if let Some(shell) = self.shells.get_mut(handle.0).and_then(Option::take) {
            for child in shell.nested.into_iter().chain(shell.siblings) {
                self.discard(child);
            }
        }
    }

    /// The handle the next [`new_type`](Self::new_type) call returns.
    pub fn next_handle(&self) -> TypeHandle {
        TypeHandle(self.shells.len())
    }

    /// Drop every shell opened at or after `first`.
    pub fn discard_from(&mut self, first: TypeHandle) {
        for shell in self.shells.iter_mut().skip(first.0) {
            *shell = None;
        }
    }

    /// Render a shell. The result holds the declaration itself, with nested
    /// types inside it, followed by its siblings. Rendering consumes the
    /// shell; building the same handle twice yields nothing the second time.
    pub fn build(&mut self, handle: TypeHandle) -> Vec<TargetTypeDecl> {
        let Some(shell) = self.shells.get_mut(handle.0).and_then(Option::take) else {
            return Vec::new();
        };
        let Shell {
            mut decl,
            nested,
            siblings,
        } = shell;

        for child in nested {
            for built in self.build(child) {
                decl.nested.push(built);
            }
        }

        let mut out = vec![decl];
        for sibling in siblings {
            out.extend(self.build(sibling));
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::MethodOrigin;

    fn name(s: &str) -> QualifiedName {
        QualifiedName::from_dotted(s)
    }

    #[test]
    fn build_renders_nested_inside_and_siblings_after() {
        let mut b = TargetAstBuilder::new();
        let outer = b.new_type(TargetKind::Interface, name("pkg.I"));
        let inner = b.new_type(TargetKind::Class, name("pkg.I.Inner"));
        let companion = b.new_type(TargetKind::Class, name("pkg.I$impl"));
        b.nest(outer, inner);
        b.add_sibling(outer, companion);

        let built = b.build(outer);
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].simple_name(), "I");
        assert_eq!(built[0].nested.len(), 1);
        assert_eq!(built[0].nested[0].simple_name(), "Inner");
        assert_eq!(built[1].simple_name(), "I$impl");
        assert!(!b.is_open(inner));
        assert!(b.build(outer).is_empty());
    }

    #[test]
    fn discard_drops_everything_attached() {
        let mut b = TargetAstBuilder::new();
        let outer = b.new_type(TargetKind::Class, name("C"));
        let inner = b.new_type(TargetKind::Class, name("C.D"));
        b.nest(outer, inner);
        b.discard(outer);
        assert!(!b.is_open(outer));
        assert!(!b.is_open(inner));
        assert!(b.build(outer).is_empty());
    }

    #[test]
    fn duplicate_fields_are_rejected() {
        let mut b = TargetAstBuilder::new();
        let c = b.new_type(TargetKind::Class, name("C"));
        let field = TargetField {
            name: "x".into(),
            ty: TargetType::Object,
            modifiers: TargetModifiers::PRIVATE,
            init: None,
        };
        assert!(b.add_field(c, field.clone()));
        assert!(!b.add_field(c, field));
        assert!(b.has_field(c, "x"));
    }

    #[test]
    fn has_method_distinguishes_arity() {
        let mut b = TargetAstBuilder::new();
        let c = b.new_type(TargetKind::Class, name("C"));
        let mut m = TargetMethod::new("m", MethodOrigin::Ultimate);
        m.params.push(crate::target::TargetParam::explicit("a", TargetType::Object));
        b.add_method(c, m);
        assert!(b.has_method(c, "m", 1));
        assert!(!b.has_method(c, "m", 0));
        assert_eq!(b.method_count(c), 1);
    }

    #[test]
    fn implements_and_type_params_are_deduplicated() {
        let mut b = TargetAstBuilder::new();
        let c = b.new_type(TargetKind::Class, name("C"));
        b.add_implements(c, TargetType::named("I"));
        b.add_implements(c, TargetType::named("I"));
        b.add_type_param(c, "T");
        b.add_type_param(c, "T");
        let built = b.build(c);
        assert_eq!(built[0].implements.len(), 1);
        assert_eq!(built[0].type_params, vec!["T".to_string()]);
    }
}
