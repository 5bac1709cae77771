//! Capture and reification threading.
//!
//! A declaration lowered into a synthesized method or constructor may need
//! implicit parameters in front of its explicit ones:
//!
//! ```text
//!   ( $this? , captured locals... , outer descriptors... , own descriptors... , explicit... )
//!     │         │                    │                      │
//!     │         │                    │                      └─ the callable's own type parameters
//!     │         │                    └─ enclosing generic scopes, outer to inner
//!     │         └─ in declaration (span) order
//!     └─ instance of the interface whose companion hosts the declaration
//! ```
//!
//! The prefix is computed once per declaration ([`LoweringContext::capture`])
//! and every site renders it from the same value: the declaration itself,
//! each overload the DAO engine derives from it, and each call into it from a
//! companion forwarder or a body.

use declower_core::{LoweringError, Span};
use declower_model::{Container, DeclId, DeclKind, LocalRef, TypeParamRef, TypeRef};
use rustc_hash::FxHashSet;

use crate::context::{Host, LoweringContext};
use crate::naming::NameKind;
use crate::substitution::SubstKey;
use crate::target::{ImplicitKind, TargetExpr, TargetParam, TargetType};

/// One entry of an implicit-parameter prefix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImplicitParam {
    /// The instance of this interface, for declarations hosted on its companion.
    OuterThis(DeclId),
    Captured(LocalRef),
    Descriptor(TypeParamRef),
}

/// The ordered implicit parameters of one declaration.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CaptureEnvironment {
    implicit: Vec<ImplicitParam>,
    own_descriptors: Vec<TypeParamRef>,
}

impl CaptureEnvironment {
    /// Compute the environment of `decl`. Use [`LoweringContext::capture`]
    /// instead, which caches the result.
    pub fn compute(cx: &LoweringContext<'_>, decl: DeclId) -> Result<Self, LoweringError> {
        let model = cx.model();
        let d = model.get(decl)?;
        let mut implicit = Vec::new();

        if let Some(iface) = companion_host(cx, decl) {
            implicit.push(ImplicitParam::OuterThis(iface));
        }

        if model.is_local(decl) {
            for local in captured_locals(cx, decl)? {
                implicit.push(ImplicitParam::Captured(local));
            }
        }

        let mut own_descriptors = Vec::new();
        if cx.options().reified_generics {
            let mut outer = Vec::new();
            outer_descriptors(cx, decl, &mut outer);
            implicit.extend(outer.into_iter().map(ImplicitParam::Descriptor));
            if matches!(d.kind, DeclKind::Function | DeclKind::Class) {
                own_descriptors = model.type_parameter_refs(decl);
            }
        }

        Ok(Self {
            implicit,
            own_descriptors,
        })
    }

    /// Implicit entries, excluding own descriptors.
    pub fn implicit(&self) -> &[ImplicitParam] {
        &self.implicit
    }

    pub fn own_descriptors(&self) -> &[TypeParamRef] {
        &self.own_descriptors
    }

    /// Every entry in prefix order, own descriptors last.
    pub fn entries(&self) -> impl Iterator<Item = (ImplicitParam, ImplicitKind)> + '_ {
        self.implicit
            .iter()
            .map(|p| {
                let kind = match p {
                    ImplicitParam::OuterThis(_) => ImplicitKind::OuterThis,
                    ImplicitParam::Captured(_) => ImplicitKind::Captured,
                    ImplicitParam::Descriptor(_) => ImplicitKind::OuterDescriptor,
                };
                (*p, kind)
            })
            .chain(
                self.own_descriptors
                    .iter()
                    .map(|tp| (ImplicitParam::Descriptor(*tp), ImplicitKind::OwnDescriptor)),
            )
    }

    pub fn len(&self) -> usize {
        self.implicit.len() + self.own_descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn has_outer_this(&self) -> bool {
        self.implicit
            .iter()
            .any(|p| matches!(p, ImplicitParam::OuterThis(_)))
    }

    /// The environment as seen through an instance receiver. The receiver
    /// supplies the outer instance and knows its own type arguments, so
    /// `$this` and the outer descriptors are dropped.
    pub fn surface(&self) -> CaptureEnvironment {
        CaptureEnvironment {
            implicit: self
                .implicit
                .iter()
                .filter(|p| matches!(p, ImplicitParam::Captured(_)))
                .copied()
                .collect(),
            own_descriptors: self.own_descriptors.clone(),
        }
    }

    /// Parameter name of one entry.
    pub fn param_name(cx: &LoweringContext<'_>, param: ImplicitParam) -> String {
        match param {
            ImplicitParam::OuterThis(iface) => cx.name(iface, NameKind::OuterThis),
            ImplicitParam::Captured(LocalRef::Decl(d)) => cx.name(d, NameKind::CapturedValue),
            ImplicitParam::Captured(LocalRef::Param(p)) => cx.name(
                p.owner,
                NameKind::CapturedParam {
                    list: p.list,
                    index: p.index,
                },
            ),
            ImplicitParam::Descriptor(tp) => cx.name(tp.owner, NameKind::TypeDescriptor(tp.index)),
        }
    }

    fn param_type(cx: &LoweringContext<'_>, param: ImplicitParam) -> TargetType {
        let model = cx.model();
        match param {
            ImplicitParam::OuterThis(iface) => cx.self_target_type(iface),
            ImplicitParam::Captured(LocalRef::Decl(d)) => {
                let decl = model.decl(d);
                match decl.kind {
                    DeclKind::Function => {
                        TargetType::Callable(Box::new(cx.target_type(&decl.value_type)))
                    }
                    _ => cx.target_type(&decl.value_type),
                }
            }
            ImplicitParam::Captured(LocalRef::Param(p)) => model
                .parameter(p)
                .map(|param| cx.target_type(&param.ty))
                .unwrap_or(TargetType::Object),
            ImplicitParam::Descriptor(_) => TargetType::Descriptor,
        }
    }

    /// Declaration-site rendering: one implicit parameter per entry.
    pub fn declare(&self, cx: &LoweringContext<'_>) -> Vec<TargetParam> {
        self.entries()
            .map(|(p, kind)| {
                TargetParam::implicit(Self::param_name(cx, p), Self::param_type(cx, p), kind)
            })
            .collect()
    }

    /// Same-scope rendering: pass each implicit parameter on unchanged.
    pub fn forward(&self, cx: &LoweringContext<'_>) -> Vec<TargetExpr> {
        self.entries()
            .map(|(p, _)| TargetExpr::ident(Self::param_name(cx, p)))
            .collect()
    }

    /// Call-site rendering with a caller-supplied resolver.
    pub fn arguments_with(
        &self,
        mut resolve: impl FnMut(ImplicitParam) -> TargetExpr,
    ) -> Vec<TargetExpr> {
        self.entries().map(|(p, _)| resolve(p)).collect()
    }

    /// Call-site rendering from the caller's substitution scope.
    pub fn arguments(&self, cx: &LoweringContext<'_>) -> Vec<TargetExpr> {
        self.arguments_with(|p| resolve_in_scope(cx, p))
    }

    /// Bind every entry to its parameter name in the current scope.
    pub fn bind_params(&self, cx: &LoweringContext<'_>) {
        for (p, _) in self.entries() {
            bind_entry(cx, p, TargetExpr::ident(Self::param_name(cx, p)));
        }
    }

    /// Bind every entry to the field of `receiver` that stores it. Classes
    /// keep their whole prefix in fields.
    pub fn bind_fields(&self, cx: &LoweringContext<'_>, receiver: &TargetExpr) {
        for (p, _) in self.entries() {
            let field = TargetExpr::field(receiver.clone(), Self::param_name(cx, p));
            bind_entry(cx, p, field);
        }
    }
}

fn bind_entry(cx: &LoweringContext<'_>, param: ImplicitParam, expr: TargetExpr) {
    match param {
        ImplicitParam::OuterThis(iface) => {
            cx.bind(SubstKey::Outer(iface), expr);
        }
        ImplicitParam::Captured(LocalRef::Decl(d)) => cx.bind(SubstKey::Local(d), expr),
        ImplicitParam::Captured(LocalRef::Param(p)) => cx.bind(SubstKey::Param(p), expr),
        ImplicitParam::Descriptor(tp) => cx.bind(SubstKey::TypeParam(tp), expr),
    }
}

/// Resolve one entry in the caller's scope. Unbound entries fall back to the
/// name the entity has where it was declared.
pub fn resolve_in_scope(cx: &LoweringContext<'_>, param: ImplicitParam) -> TargetExpr {
    let model = cx.model();
    match param {
        ImplicitParam::OuterThis(iface) => cx
            .resolve(SubstKey::Outer(iface))
            .or_else(|| cx.resolve(SubstKey::This))
            .unwrap_or(TargetExpr::This),
        ImplicitParam::Captured(LocalRef::Decl(d)) => cx
            .resolve(SubstKey::Local(d))
            .unwrap_or_else(|| TargetExpr::ident(model.decl(d).name.clone())),
        ImplicitParam::Captured(LocalRef::Param(p)) => cx
            .resolve(SubstKey::Param(p))
            .unwrap_or_else(|| match model.parameter(p) {
                Ok(param) => TargetExpr::ident(param.name.clone()),
                Err(e) => TargetExpr::Erroneous(e.to_string()),
            }),
        ImplicitParam::Descriptor(tp) => cx.descriptor(&TypeRef::Param(tp)),
    }
}

/// The interface whose companion hosts `decl`, if any.
fn companion_host(cx: &LoweringContext<'_>, decl: DeclId) -> Option<DeclId> {
    let model = cx.model();
    let d = model.decl(decl);
    match d.container {
        Container::Member(owner) if model.decl(owner).kind == DeclKind::Interface => {
            matches!(
                d.kind,
                DeclKind::Function | DeclKind::Value | DeclKind::Class | DeclKind::ClassAlias
            )
            .then_some(owner)
        }
        Container::Local(container) => match cx.host_of_local(container) {
            Host::Companion(iface) => Some(iface),
            _ => None,
        },
        _ => None,
    }
}

/// Captured locals of a local declaration, in declaration order.
///
/// Own parameters and transient values are excluded. A captured local
/// function or class contributes what it captures itself, since it is
/// called or instantiated directly rather than passed around.
fn captured_locals(cx: &LoweringContext<'_>, decl: DeclId) -> Result<Vec<LocalRef>, LoweringError> {
    let model = cx.model();
    let mut out: Vec<(Span, LocalRef)> = Vec::new();
    let mut seen = FxHashSet::default();
    let mut visited = FxHashSet::default();
    let mut pending: Vec<(DeclId, LocalRef)> = model
        .get(decl)?
        .captured_locals
        .iter()
        .map(|l| (decl, *l))
        .collect();
    visited.insert(decl);

    while let Some((origin, local)) = pending.pop() {
        match local {
            LocalRef::Param(p) if p.owner == decl || p.owner == origin => continue,
            LocalRef::Param(p) => {
                let span = model.parameter(p)?.span;
                if seen.insert(local) {
                    out.push((span, local));
                }
            }
            LocalRef::Decl(d) if d == decl => continue,
            LocalRef::Decl(d) => {
                let captured = model.get(d)?;
                match captured.kind {
                    DeclKind::Value if captured.is_transient() => {}
                    DeclKind::Function | DeclKind::Class if model.is_local(d) => {
                        if visited.insert(d) {
                            pending.extend(captured.captured_locals.iter().map(|l| (d, *l)));
                        }
                    }
                    _ => {
                        if seen.insert(local) {
                            out.push((captured.span, local));
                        }
                    }
                }
            }
        }
    }

    out.sort_by_key(|(span, _)| *span);
    Ok(out.into_iter().map(|(_, l)| l).collect())
}

/// Descriptors of enclosing generic scopes whose runtime context is not
/// reachable from where `decl` is hoisted, outer to inner.
fn outer_descriptors(cx: &LoweringContext<'_>, decl: DeclId, out: &mut Vec<TypeParamRef>) {
    let model = cx.model();
    match model.container(decl) {
        Container::Package => {}
        Container::Member(owner) => {
            if model.decl(owner).kind == DeclKind::Interface {
                // Companions hold no descriptor fields of their own.
                outer_descriptors(cx, owner, out);
                push_unique(out, model.type_parameter_refs(owner));
            }
        }
        Container::Local(container) => {
            let c = model.decl(container);
            if c.kind.is_class() {
                // Classes keep their descriptors in fields.
                return;
            }
            outer_descriptors(cx, container, out);
            push_unique(out, model.type_parameter_refs(container));
        }
    }
}

fn push_unique(out: &mut Vec<TypeParamRef>, refs: Vec<TypeParamRef>) {
    for tp in refs {
        if !out.contains(&tp) {
            out.push(tp);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declower_model::{ModelBuilder, ParamRef, Parameter};

    #[test]
    fn local_class_prefix_is_captures_then_outer_descriptors() {
        let mut b = ModelBuilder::new();
        let f_id = b.next_id();
        let f = b
            .function("f")
            .type_param("T")
            .param(Parameter::new("a", TypeRef::param(f_id, 0)))
            .param(Parameter::new("b", TypeRef::basic("Integer")))
            .build();
        let local = b
            .class("L")
            .local_to(f)
            .captures(LocalRef::Param(ParamRef::new(f, 1)))
            .captures(LocalRef::Param(ParamRef::new(f, 0)))
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let env = cx.capture(local).unwrap();
        let names: Vec<String> = env.declare(&cx).into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["$capture$a", "$capture$b", "$reified$T"]);
        assert_eq!(env.implicit().len(), 3);
        assert!(env.own_descriptors().is_empty());
    }

    #[test]
    fn interface_members_take_this_and_interface_descriptors() {
        let mut b = ModelBuilder::new();
        let i = b.interface("I").type_param("E").build();
        let m = b.function("m").member_of(i).default_().type_param("X").build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let env = cx.capture(m).unwrap();
        let params = env.declare(&cx);
        let kinds: Vec<_> = params.iter().map(|p| p.implicit).collect();
        assert_eq!(
            kinds,
            vec![
                Some(ImplicitKind::OuterThis),
                Some(ImplicitKind::OuterDescriptor),
                Some(ImplicitKind::OwnDescriptor)
            ]
        );
        assert_eq!(params[0].name, "$this");
        let surface = env.surface();
        assert_eq!(surface.len(), 1);
        assert!(!surface.has_outer_this());
        assert_eq!(surface.declare(&cx)[0].name, "$reified$X");
    }

    #[test]
    fn class_members_capture_nothing() {
        let mut b = ModelBuilder::new();
        let c = b.class("C").type_param("T").build();
        let m = b.function("m").member_of(c).build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);
        assert!(cx.capture(m).unwrap().is_empty());
    }

    #[test]
    fn captured_local_function_contributes_its_own_captures() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("x", TypeRef::basic("Integer")))
            .build();
        let counter = b
            .value("counter", TypeRef::basic("Integer"))
            .local_to(f)
            .build();
        let helper = b
            .function("helper")
            .local_to(f)
            .captures(LocalRef::Param(ParamRef::new(f, 0)))
            .build();
        let pure = b.function("pure").local_to(f).build();
        let getter = b
            .value("derived", TypeRef::basic("Integer"))
            .local_to(f)
            .transient()
            .build();
        let user = b
            .function("user")
            .local_to(f)
            .captures(LocalRef::Decl(helper))
            .captures(LocalRef::Decl(pure))
            .captures(LocalRef::Decl(counter))
            .captures(LocalRef::Decl(getter))
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let env = cx.capture(user).unwrap();
        assert_eq!(
            env.implicit(),
            &[
                ImplicitParam::Captured(LocalRef::Param(ParamRef::new(f, 0))),
                ImplicitParam::Captured(LocalRef::Decl(counter)),
            ]
        );
    }

    #[test]
    fn descriptors_are_dropped_without_reified_generics() {
        let mut b = ModelBuilder::new();
        let f = b.function("f").type_param("T").build();
        let g = b.function("g").local_to(f).type_param("U").build();
        let model = b.finish();
        let cx = LoweringContext::new(&model).with_options(
            crate::LoweringOptions::default().with_reified_generics(false),
        );
        assert!(cx.capture(g).unwrap().is_empty());
    }

    #[test]
    fn forward_and_arguments_agree_in_order() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("a", TypeRef::basic("Integer")))
            .param(Parameter::new("b", TypeRef::basic("Integer")))
            .build();
        let g = b
            .function("g")
            .local_to(f)
            .captures(LocalRef::Param(ParamRef::new(f, 1)))
            .captures(LocalRef::Param(ParamRef::new(f, 0)))
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let env = cx.capture(g).unwrap();
        assert_eq!(
            env.forward(&cx),
            vec![TargetExpr::ident("$capture$a"), TargetExpr::ident("$capture$b")]
        );
        assert_eq!(
            env.arguments(&cx),
            vec![TargetExpr::ident("a"), TargetExpr::ident("b")]
        );
    }
}
