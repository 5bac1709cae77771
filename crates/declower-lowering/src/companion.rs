//! Mixin delegation.
//!
//! A class satisfying an interface with concrete members holds one instance
//! of the interface's companion and forwards each inherited concrete member
//! to it, passing itself as the companion's `$this`. Interfaces already
//! mixed in by a superclass are skipped, and every interface of a diamond is
//! visited once.

use declower_core::LoweringError;
use declower_model::{
    DeclId, DeclKind, Declaration, DeclarationModel, TypeArgs, TypeRef, bind_type_args,
};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::capture::{CaptureEnvironment, ImplicitParam, resolve_in_scope};
use crate::context::LoweringContext;
use crate::dao::{self, Ladder, LadderTarget, explicit_params, forward, own_type_params, result_stmt};
use crate::members::return_type;
use crate::naming::NameKind;
use crate::strategy::{
    Functional, LadderSite, generates_instantiator, has_default_value_method, needs_canonical,
    needs_companion_delegate, only_on_companion,
};
use crate::target::{
    MethodOrigin, TargetAstBuilder, TargetExpr, TargetField, TargetMethod, TargetModifiers,
    TargetParam, TargetStmt, TargetType, TypeHandle,
};

/// Forwarders of members a subclass may not refine are final.
fn forwarder_modifiers(d: &Declaration) -> TargetModifiers {
    if d.is_default() {
        TargetModifiers::PUBLIC
    } else {
        TargetModifiers::PUBLIC | TargetModifiers::FINAL
    }
}

/// Add companion fields and forwarders to `h` for every interface `class`
/// newly satisfies.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn apply_mixins(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    class: DeclId,
    h: TypeHandle,
) -> Result<(), LoweringError> {
    let model = cx.model();
    let mut handled: FxHashSet<DeclId> = FxHashSet::default();
    for ancestor in model.extended_chain(class) {
        handled.extend(model.satisfied_closure(ancestor));
    }
    for satisfied in &model.get(class)?.satisfied_types {
        visit(cx, b, class, h, &model.resolve_alias(satisfied), &mut handled)?;
    }
    Ok(())
}

fn visit(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    class: DeclId,
    h: TypeHandle,
    ty: &TypeRef,
    handled: &mut FxHashSet<DeclId>,
) -> Result<(), LoweringError> {
    let model = cx.model();
    let Some(iface) = ty.decl() else {
        return Ok(());
    };
    if !handled.insert(iface) {
        return Ok(());
    }
    if model.has_companion(iface) {
        Mixin::new(cx, class, iface).apply(b, h)?;
    }
    for satisfied in &model.get(iface)?.satisfied_types {
        visit(cx, b, class, h, &model.resolve_alias(satisfied), handled)?;
    }
    Ok(())
}

/// The instantiation of `iface` a companion call on `class` is typed
/// against.
///
/// The first instantiation found wins, unless the class's own declared
/// supertypes reach one that keeps a free type parameter where the first
/// has one erased to the object type.
pub fn best_satisfied_type(model: &DeclarationModel, class: DeclId, iface: DeclId) -> TypeRef {
    let first = model.first_satisfied_type(&model.self_type(class), iface);
    let principal = model.principal_satisfied_type(class, iface);
    match (first, principal) {
        (Some(first), Some(principal)) if keeps_free_parameter(&first, &principal) => principal,
        (Some(first), _) => first,
        (None, Some(principal)) => principal,
        (None, None) => TypeRef::named(iface),
    }
}

fn keeps_free_parameter(current: &TypeRef, candidate: &TypeRef) -> bool {
    current
        .args()
        .iter()
        .zip(candidate.args())
        .any(|(c, n)| c.erases_to_object() && n.is_type_parameter())
}

struct Mixin<'c, 'm> {
    cx: &'c LoweringContext<'m>,
    class: DeclId,
    iface: DeclId,
    best: TypeRef,
    args: TypeArgs,
    /// `this.$I$impl`
    receiver: TargetExpr,
    /// `this`, narrowed to the interface when it is generic.
    this_arg: TargetExpr,
}

impl<'c, 'm> Mixin<'c, 'm> {
    fn new(cx: &'c LoweringContext<'m>, class: DeclId, iface: DeclId) -> Self {
        let model = cx.model();
        let best = best_satisfied_type(model, class, iface);
        let args = bind_type_args(iface, best.args());
        let receiver =
            TargetExpr::field(TargetExpr::This, cx.name(iface, NameKind::CompanionField));
        let this_arg = if model.decl(iface).is_generic() {
            TargetExpr::cast(cx.target_type(&best), TargetExpr::This)
        } else {
            TargetExpr::This
        };
        Self {
            cx,
            class,
            iface,
            best,
            args,
            receiver,
            this_arg,
        }
    }

    fn apply(&self, b: &mut TargetAstBuilder, h: TypeHandle) -> Result<(), LoweringError> {
        let cx = self.cx;
        let model = cx.model();
        self.add_companion_field(b, h);

        let mut delegated = 0usize;
        for member in model.members(self.iface) {
            let d = model.get(member)?;
            if d.kind == DeclKind::TypeAlias || only_on_companion(model, member) {
                continue;
            }
            match d.kind {
                DeclKind::Class => {
                    if generates_instantiator(model, member)
                        && !d.is_formal()
                        && model.direct_member(self.class, &d.name).is_none()
                    {
                        self.instantiator_delegate(b, h, member)?;
                        delegated += 1;
                    }
                }
                DeclKind::Function if needs_companion_delegate(model, self.class, member) => {
                    self.function_delegate(b, h, member)?;
                    delegated += 1;
                }
                DeclKind::Value if needs_companion_delegate(model, self.class, member) => {
                    self.value_delegate(b, h, member)?;
                    delegated += 1;
                }
                DeclKind::Function | DeclKind::Value => {}
                _ if needs_companion_delegate(model, self.class, member) => {
                    self.placeholder(
                        b,
                        h,
                        member,
                        cx.name(member, NameKind::AliasInstantiator),
                        Vec::new(),
                        TargetType::Object,
                        &format!("{:?}", d.kind),
                    );
                }
                _ => {}
            }
            if matches!(d.kind, DeclKind::Function | DeclKind::Class) {
                self.default_value_delegates(b, h, member)?;
            }
        }

        cx.bump(|s| s.companion_delegates += delegated);
        debug!(
            target: "declower::companion",
            class = %cx.type_name(self.class),
            interface = %model.qualified_name(self.iface),
            via = %cx.describe(&self.best),
            delegated,
            "mixin applied"
        );
        Ok(())
    }

    /// `private final I$impl<..> $I$impl`, created right after the super
    /// call of every full constructor.
    fn add_companion_field(&self, b: &mut TargetAstBuilder, h: TypeHandle) {
        let cx = self.cx;
        let name = cx.name(self.iface, NameKind::CompanionField);
        let ty = TargetType::Named {
            name: cx.companion_name(self.iface).to_string(),
            args: self.best.args().iter().map(|a| cx.target_type(a)).collect(),
        };
        let added = b.add_field(
            h,
            TargetField {
                name: name.clone(),
                ty: ty.clone(),
                modifiers: TargetModifiers::PRIVATE | TargetModifiers::FINAL,
                init: None,
            },
        );
        if !added {
            return;
        }
        let init = TargetStmt::Expr(TargetExpr::Assign {
            target: Box::new(TargetExpr::field(TargetExpr::This, name)),
            value: Box::new(TargetExpr::New {
                ty,
                args: Vec::new(),
            }),
        });
        b.update_constructors(h, |ctor| {
            if ctor.cut.is_some() {
                return;
            }
            let at = usize::from(matches!(
                ctor.body.first(),
                Some(TargetStmt::Expr(TargetExpr::SuperCall(_)))
            ));
            ctor.body.insert(at, init.clone());
        });
    }

    /// Arguments for the companion's implicit prefix of `member`, resolved
    /// from inside the class.
    fn companion_arguments(&self, env: &CaptureEnvironment) -> Vec<TargetExpr> {
        let cx = self.cx;
        let own = env.own_descriptors();
        env.arguments_with(|p| match p {
            ImplicitParam::OuterThis(_) => self.this_arg.clone(),
            ImplicitParam::Descriptor(tp) if tp.owner == self.iface => {
                let arg = self.args.get(&tp).cloned().unwrap_or(TypeRef::Param(tp));
                cx.descriptor(&arg)
            }
            ImplicitParam::Descriptor(tp) if own.contains(&tp) => {
                TargetExpr::ident(CaptureEnvironment::param_name(cx, p))
            }
            other => resolve_in_scope(cx, other),
        })
    }

    fn origin(&self) -> MethodOrigin {
        MethodOrigin::CompanionDelegate {
            interface: self.cx.companion_name(self.iface).to_string(),
        }
    }

    fn function_delegate(
        &self,
        b: &mut TargetAstBuilder,
        h: TypeHandle,
        member: DeclId,
    ) -> Result<(), LoweringError> {
        let cx = self.cx;
        let model = cx.model();
        let modifiers = forwarder_modifiers(model.get(member)?);
        let env = cx.capture(member)?;
        let prefix = env.surface().declare(cx);
        let explicit = explicit_params(cx, member, &self.args)?;
        let name = cx.name(member, NameKind::Member);

        let mut args = self.companion_arguments(&env);
        args.extend(forward(&explicit));
        let ret = return_type(cx, member, &self.args);

        let mut method = TargetMethod::new(name.clone(), self.origin());
        method.modifiers = modifiers;
        method.type_params = own_type_params(cx, member);
        method.params = prefix.clone();
        method.params.extend(explicit.iter().cloned());
        method.body = Some(vec![result_stmt(
            &ret,
            TargetExpr::call(Some(self.receiver.clone()), name.clone(), args),
        )]);
        method.ret = ret.clone();

        let mut target = name.clone();
        if needs_canonical(model, cx.options(), member) {
            let canonical = dao::split_canonical(cx, member, &mut method);
            target = canonical.name.clone();
            dao::trace_method(&canonical);
            b.add_method(h, canonical);
        }
        let type_params = method.type_params.clone();
        dao::trace_method(&method);
        b.add_method(h, method);

        let ladder = Ladder::method(member, name, prefix, explicit, ret)
            .with_body(LadderSite::Forwarder.body(model, cx.options(), member))
            .with_modifiers(modifiers)
            .with_type_params(type_params)
            .with_target(LadderTarget::Method {
                target: None,
                name: target,
            });
        dao::emit_ladder(cx, b, h, &ladder)?;
        Ok(())
    }

    fn value_delegate(
        &self,
        b: &mut TargetAstBuilder,
        h: TypeHandle,
        member: DeclId,
    ) -> Result<(), LoweringError> {
        let cx = self.cx;
        let d = cx.model().get(member)?;
        let env = cx.capture(member)?;
        let name = cx.name(member, NameKind::Getter);
        let ty = cx.target_type(&d.value_type.substitute(&self.args));

        let mut method = TargetMethod::new(name.clone(), self.origin());
        method.modifiers = forwarder_modifiers(d);
        method.params = env.surface().declare(cx);
        method.body = Some(vec![TargetStmt::Return(Some(TargetExpr::call(
            Some(self.receiver.clone()),
            name,
            self.companion_arguments(&env),
        )))]);
        method.ret = ty.clone();
        dao::trace_method(&method);
        b.add_method(h, method);

        // The surface declares a setter, but a computed value has nothing
        // for the companion to assign.
        if d.is_variable() {
            self.placeholder(
                b,
                h,
                member,
                cx.name(member, NameKind::Setter),
                vec![TargetParam::explicit(d.name.clone(), ty)],
                TargetType::Void,
                "setter of variable value",
            );
        }
        Ok(())
    }

    fn instantiator_delegate(
        &self,
        b: &mut TargetAstBuilder,
        h: TypeHandle,
        member: DeclId,
    ) -> Result<(), LoweringError> {
        let cx = self.cx;
        let model = cx.model();
        let modifiers = forwarder_modifiers(model.get(member)?);
        let env = cx.capture(member)?;
        let prefix = env.surface().declare(cx);
        let explicit = explicit_params(cx, member, &self.args)?;
        let name = cx.name(member, NameKind::Instantiator);
        let ret = cx.self_target_type(member);

        let mut args = self.companion_arguments(&env);
        args.extend(forward(&explicit));

        let mut method = TargetMethod::new(name.clone(), self.origin());
        method.modifiers = modifiers;
        method.type_params = own_type_params(cx, member);
        method.params = prefix.clone();
        method.params.extend(explicit.iter().cloned());
        method.ret = ret.clone();
        method.body = Some(vec![TargetStmt::Return(Some(TargetExpr::call(
            Some(self.receiver.clone()),
            name.clone(),
            args,
        )))]);
        let type_params = method.type_params.clone();
        dao::trace_method(&method);
        b.add_method(h, method);

        let ladder = Ladder::method(member, name, prefix, explicit, ret)
            .with_functional(Functional::Instantiator)
            .with_body(LadderSite::Forwarder.body(model, cx.options(), member))
            .with_modifiers(modifiers)
            .with_type_params(type_params);
        dao::emit_ladder(cx, b, h, &ladder)?;
        Ok(())
    }

    /// Forward each default-value method `member` owns to the companion, so
    /// overloads on the class reach it unqualified.
    fn default_value_delegates(
        &self,
        b: &mut TargetAstBuilder,
        h: TypeHandle,
        member: DeclId,
    ) -> Result<usize, LoweringError> {
        let cx = self.cx;
        let model = cx.model();
        if !model.get(member)?.is_shared() {
            return Ok(0);
        }
        let env = cx.capture(member)?;
        let prefix = env.surface().declare(cx);
        let explicit = explicit_params(cx, member, &self.args)?;
        let mut emitted = 0;
        for index in 0..explicit.len() {
            if !has_default_value_method(model, member, index) {
                continue;
            }
            let name = cx.name(member, NameKind::DefaultValue(index));
            if b.has_method(h, &name, index) {
                continue;
            }
            let mut args = self.companion_arguments(&env);
            args.extend(forward(&explicit[..index]));

            let mut method =
                TargetMethod::new(name.clone(), MethodOrigin::DefaultValue { param: index });
            method.modifiers = TargetModifiers::PUBLIC;
            method.type_params = own_type_params(cx, member);
            method.params = prefix.iter().chain(&explicit[..index]).cloned().collect();
            method.ret = explicit[index].ty.clone();
            method.body = Some(vec![TargetStmt::Return(Some(TargetExpr::call(
                Some(self.receiver.clone()),
                name,
                args,
            )))]);
            dao::trace_method(&method);
            b.add_method(h, method);
            emitted += 1;
        }
        cx.bump(|s| s.default_value_methods += emitted);
        Ok(emitted)
    }

    /// Report `member` as impossible to delegate and add `name` as a
    /// throwing stand-in, so the class still implements its surface and the
    /// rest of it lowers.
    #[allow(clippy::too_many_arguments)]
    fn placeholder(
        &self,
        b: &mut TargetAstBuilder,
        h: TypeHandle,
        member: DeclId,
        name: String,
        params: Vec<TargetParam>,
        ret: TargetType,
        what: &str,
    ) {
        let cx = self.cx;
        let model = cx.model();
        let d = model.decl(member);
        let error = LoweringError::compiler_bug(
            format!(
                "{what} `{}` of `{}` cannot be delegated to its companion",
                model.qualified_name(member),
                model.qualified_name(self.iface)
            ),
            d.span,
        );
        cx.report(&error, member);

        let mut method = TargetMethod::new(name, MethodOrigin::Placeholder);
        method.modifiers = TargetModifiers::PUBLIC;
        method.params = params;
        method.ret = ret;
        method.body = Some(vec![TargetStmt::Throw(TargetExpr::Erroneous(
            error.message(),
        ))]);
        b.add_method(h, method);
    }
}
