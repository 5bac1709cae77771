//! Function and value members.
//!
//! One source function becomes, depending on where it is placed, an ultimate
//! form, an optional private canonical form, an overload ladder and its
//! default-value methods. Values become a field with accessors, or just
//! accessors when they have no storage. Locals declared inside a body are
//! hoisted onto the host type afterwards.

use std::rc::Rc;

use declower_core::{LoweringError, Modifiers};
use declower_model::{DeclId, DeclKind, Declaration, SourceBody, TypeArgs};
use tracing::debug;

use crate::capture::CaptureEnvironment;
use crate::classes;
use crate::context::{Host, LoweringContext};
use crate::dao::{
    self, Ladder, LadderTarget, bind_outer_this, emit_default_value_methods, emit_ladder,
    explicit_params, forward, own_type_params, result_stmt, split_canonical,
};
use crate::naming::NameKind;
use crate::strategy::{DaoBody, DefaultValueOwner, LadderSite, is_optional, needs_canonical};
use crate::target::{
    MethodOrigin, TargetAstBuilder, TargetExpr, TargetField, TargetMethod, TargetModifiers,
    TargetParam, TargetStmt, TargetType, TypeHandle,
};

/// Where a member is being placed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Site {
    /// On the class that declares it.
    Class,
    /// Declared abstract on the interface that declares it.
    Surface,
    /// Implemented on the companion of the interface that declares it.
    Companion,
    /// Static on the wrapper of a toplevel declaration.
    Wrapper,
    /// A local hoisted onto `Host`.
    Hoisted(Host),
}

impl Site {
    fn is_static(self) -> bool {
        match self {
            Site::Wrapper => true,
            Site::Hoisted(host) => host.is_static(),
            Site::Class | Site::Surface | Site::Companion => false,
        }
    }

    fn is_concrete(self) -> bool {
        self != Site::Surface
    }
}

fn visibility(d: &Declaration) -> TargetModifiers {
    if d.is_shared() {
        TargetModifiers::PUBLIC
    } else {
        TargetModifiers::PRIVATE
    }
}

fn site_modifiers(d: &Declaration, site: Site) -> TargetModifiers {
    match site {
        Site::Class if d.is_formal() => visibility(d) | TargetModifiers::ABSTRACT,
        Site::Class => visibility(d),
        Site::Surface => TargetModifiers::PUBLIC | TargetModifiers::ABSTRACT,
        Site::Companion => TargetModifiers::PUBLIC,
        Site::Wrapper if d.is_shared() => TargetModifiers::PUBLIC | TargetModifiers::STATIC,
        Site::Wrapper => TargetModifiers::STATIC,
        Site::Hoisted(host) if host.is_static() => {
            TargetModifiers::PRIVATE | TargetModifiers::STATIC
        }
        Site::Hoisted(_) => TargetModifiers::PRIVATE,
    }
}

/// Result type of a function; every parameter list after the first wraps
/// it in a callable.
pub fn return_type(cx: &LoweringContext<'_>, decl: DeclId, args: &TypeArgs) -> TargetType {
    let d = cx.model().decl(decl);
    let mut ret = cx.target_type(&d.value_type.substitute(args));
    for _ in d.parameter_lists.iter().skip(1) {
        ret = TargetType::Callable(Box::new(ret));
    }
    ret
}

/// Lower the body of `decl` with `env` bound as parameters.
fn lower_body_with(
    cx: &LoweringContext<'_>,
    decl: DeclId,
    env: &CaptureEnvironment,
    returns_value: bool,
) -> Result<Vec<TargetStmt>, LoweringError> {
    let d = cx.model().get(decl)?;
    let _scope = cx.open_scope();
    env.bind_params(cx);
    bind_outer_this(cx, env);
    let lowered = cx.lower_body(&d.body, returns_value);
    cx.recover_body(decl, lowered)
}

/// Wrap the innermost statements in one lambda per trailing parameter list.
fn curry(cx: &LoweringContext<'_>, d: &Declaration, mut stmts: Vec<TargetStmt>) -> Vec<TargetStmt> {
    for list in d.parameter_lists.iter().skip(1).rev() {
        let params = list
            .iter()
            .map(|p| TargetParam::explicit(p.name.clone(), cx.target_type(&p.ty)))
            .collect();
        stmts = vec![TargetStmt::Return(Some(TargetExpr::Lambda {
            params,
            body: stmts,
        }))];
    }
    stmts
}

/// Receiver of fields placed on the host of `site`.
fn field_owner(cx: &LoweringContext<'_>, decl: DeclId, site: Site) -> TargetExpr {
    match site {
        Site::Wrapper => TargetExpr::TypeName(cx.wrapper_name(decl).to_string()),
        Site::Hoisted(host) if host.is_static() => TargetExpr::TypeName(cx.host_name(host).to_string()),
        _ => TargetExpr::This,
    }
}

// ============================================================================
// Functions
// ============================================================================

/// Lower function `func` onto `h` at `site`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lower_function(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    h: TypeHandle,
    func: DeclId,
    site: Site,
) -> Result<(), LoweringError> {
    let model = cx.model();
    let d = model.get(func)?;
    let full = cx.capture(func)?;
    let env = match site {
        Site::Surface => Rc::new(full.surface()),
        _ => Rc::clone(&full),
    };

    let name = cx.name(func, NameKind::Member);
    let modifiers = site_modifiers(d, site);
    let prefix = env.declare(cx);
    let explicit = explicit_params(cx, func, &TypeArgs::default())?;
    let ret = return_type(cx, func, &TypeArgs::default());
    let type_params = own_type_params(cx, func);

    let mut ultimate = TargetMethod::new(name.clone(), MethodOrigin::Ultimate);
    ultimate.modifiers = modifiers;
    ultimate.type_params = type_params.clone();
    ultimate.params = prefix.iter().cloned().chain(explicit.iter().cloned()).collect();
    ultimate.ret = ret.clone();

    let concrete = site.is_concrete() && !(site == Site::Class && d.is_formal());
    if concrete {
        ultimate.body = Some(if d.deferred {
            deferred_body(cx, b, h, func, site, &ultimate)
        } else {
            let stmts = lower_body_with(cx, func, &env, !d.value_type.is_void())?;
            curry(cx, d, stmts)
        });
    }

    let mut delegate = name.clone();
    if site == Site::Class && concrete && needs_canonical(model, cx.options(), func) {
        let canonical = split_canonical(cx, func, &mut ultimate);
        delegate = canonical.name.clone();
        dao::trace_method(&canonical);
        b.add_method(h, canonical);
    }
    dao::trace_method(&ultimate);
    b.add_method(h, ultimate);

    let ladder_site = match site {
        Site::Surface => Some(LadderSite::InterfaceSurface),
        Site::Companion => None,
        Site::Class | Site::Wrapper | Site::Hoisted(_) => Some(LadderSite::Home),
    };
    if let Some(ladder_site) = ladder_site {
        let body = ladder_site.body(model, cx.options(), func);
        let target = match body {
            DaoBody::DelegateToSuper => LadderTarget::Super { name: name.clone() },
            DaoBody::Abstract | DaoBody::DelegateToCanonical => LadderTarget::Method {
                target: None,
                name: delegate,
            },
        };
        let ladder_modifiers = match site {
            Site::Surface => modifiers,
            _ => modifiers - TargetModifiers::ABSTRACT,
        };
        let ladder = Ladder::method(func, name, prefix, explicit, ret)
            .with_body(body)
            .with_modifiers(ladder_modifiers)
            .with_type_params(type_params)
            .with_target(target);
        emit_ladder(cx, b, h, &ladder)?;
    }

    let dpm_modifiers = match site {
        Site::Class => visibility(d),
        Site::Surface | Site::Companion => TargetModifiers::PUBLIC,
        Site::Wrapper | Site::Hoisted(_) => modifiers,
    };
    emit_default_value_methods(cx, b, h, func, &env, dpm_modifiers, site.is_concrete())?;

    if concrete {
        hoist_locals(cx, b, h, cx.host_of_local(func), func)?;
    }
    Ok(())
}

/// A deferred function stores its callable in a field and invokes it.
fn deferred_body(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    h: TypeHandle,
    func: DeclId,
    site: Site,
    ultimate: &TargetMethod,
) -> Vec<TargetStmt> {
    let field_name = cx.name(func, NameKind::DeferredField);
    let mut modifiers = TargetModifiers::PRIVATE;
    if site.is_static() {
        modifiers |= TargetModifiers::STATIC;
    }
    b.add_field(
        h,
        TargetField {
            name: field_name.clone(),
            ty: TargetType::Callable(Box::new(ultimate.ret.clone())),
            modifiers,
            init: None,
        },
    );
    let receiver = TargetExpr::field(field_owner(cx, func, site), field_name);
    let call = TargetExpr::call(Some(receiver), "$call$", forward(&ultimate.params));
    vec![result_stmt(&ultimate.ret, call)]
}

// ============================================================================
// Values
// ============================================================================

fn getter(
    cx: &LoweringContext<'_>,
    value: DeclId,
    modifiers: TargetModifiers,
    params: Vec<TargetParam>,
    ty: &TargetType,
    body: Option<Vec<TargetStmt>>,
) -> TargetMethod {
    let mut method = TargetMethod::new(cx.name(value, NameKind::Getter), MethodOrigin::Getter);
    method.modifiers = if body.is_none() {
        modifiers | TargetModifiers::ABSTRACT
    } else {
        modifiers
    };
    method.params = params;
    method.ret = ty.clone();
    method.body = body;
    method
}

fn setter(
    cx: &LoweringContext<'_>,
    value: DeclId,
    modifiers: TargetModifiers,
    ty: &TargetType,
    field: Option<TargetExpr>,
) -> TargetMethod {
    let name = &cx.model().decl(value).name;
    let mut method = TargetMethod::new(cx.name(value, NameKind::Setter), MethodOrigin::Setter);
    method.params = vec![TargetParam::explicit(name.clone(), ty.clone())];
    match field {
        Some(field) => {
            method.modifiers = modifiers;
            method.body = Some(vec![TargetStmt::Expr(TargetExpr::Assign {
                target: Box::new(field),
                value: Box::new(TargetExpr::ident(name.clone())),
            })]);
        }
        None => method.modifiers = modifiers | TargetModifiers::ABSTRACT,
    }
    method
}

/// Lower value `value` onto `h` at `site`.
pub fn lower_value(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    h: TypeHandle,
    value: DeclId,
    site: Site,
) -> Result<(), LoweringError> {
    let model = cx.model();
    let d = model.get(value)?;
    let env = cx.capture(value)?;
    let ty = cx.target_type(&d.value_type);
    let modifiers = site_modifiers(d, site) - TargetModifiers::ABSTRACT;

    match site {
        Site::Surface => {
            let surface = env.surface();
            b.add_method(h, getter(cx, value, modifiers, surface.declare(cx), &ty, None));
            if d.is_variable() {
                b.add_method(h, setter(cx, value, modifiers, &ty, None));
            }
        }
        Site::Companion | Site::Hoisted(_) => {
            let body = lower_body_with(cx, value, &env, true)?;
            b.add_method(h, getter(cx, value, modifiers, env.declare(cx), &ty, Some(body)));
            hoist_locals(cx, b, h, cx.host_of_local(value), value)?;
        }
        Site::Class | Site::Wrapper if d.is_formal() => {
            b.add_method(h, getter(cx, value, modifiers, Vec::new(), &ty, None));
            if d.is_variable() {
                b.add_method(h, setter(cx, value, modifiers, &ty, None));
            }
        }
        Site::Class | Site::Wrapper if d.is_transient() => {
            let body = lower_body_with(cx, value, &env, true)?;
            b.add_method(h, getter(cx, value, modifiers, Vec::new(), &ty, Some(body)));
            hoist_locals(cx, b, h, cx.host_of_local(value), value)?;
        }
        Site::Class | Site::Wrapper => {
            let field_name = cx.name(value, NameKind::Member);
            let mut field_modifiers = TargetModifiers::PRIVATE;
            if site.is_static() {
                field_modifiers |= TargetModifiers::STATIC;
            }
            if !d.is_variable() {
                field_modifiers |= TargetModifiers::FINAL;
            }
            let init = match &d.body {
                SourceBody::Expr(expr) => Some(cx.recover(value, cx.lower_expr(expr))?),
                SourceBody::None | SourceBody::Block(_) => None,
            };
            b.add_field(
                h,
                TargetField {
                    name: field_name.clone(),
                    ty: ty.clone(),
                    modifiers: field_modifiers,
                    init,
                },
            );
            let field = TargetExpr::field(field_owner(cx, value, site), field_name);
            let body = vec![TargetStmt::Return(Some(field.clone()))];
            b.add_method(h, getter(cx, value, modifiers, Vec::new(), &ty, Some(body)));
            if d.is_variable() {
                b.add_method(h, setter(cx, value, modifiers, &ty, Some(field)));
            }
        }
    }
    Ok(())
}

// ============================================================================
// Hoisting
// ============================================================================

/// Hoist the declarations local to the body of `container` onto `h`, the
/// handle of `host`.
pub fn hoist_locals(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    h: TypeHandle,
    host: Host,
    container: DeclId,
) -> Result<(), LoweringError> {
    let model = cx.model();
    for local in model.locals(container) {
        let d = model.get(local)?;
        if d.erroneous {
            debug!(target: "declower::lowering", local = %model.qualified_name(local), "skipped");
            cx.report_skipped(local);
            continue;
        }
        match d.kind {
            DeclKind::Function => lower_function(cx, b, h, local, Site::Hoisted(host))?,
            DeclKind::Value if d.is_transient() => lower_value(cx, b, h, local, Site::Hoisted(host))?,
            DeclKind::Value => {}
            DeclKind::Class => {
                let nested = classes::lower_class(cx, b, local)?;
                b.nest(h, nested);
                if DefaultValueOwner::classify(model, local) == DefaultValueOwner::InitCompanion {
                    let env = cx.capture(local)?;
                    emit_default_value_methods(
                        cx,
                        b,
                        h,
                        local,
                        &env,
                        TargetModifiers::PRIVATE | TargetModifiers::STATIC,
                        true,
                    )?;
                }
            }
            DeclKind::Interface => {
                let (nested, companion) = classes::lower_interface(cx, b, local)?;
                b.nest(h, nested);
                if let Some(companion) = companion {
                    b.nest(h, companion);
                }
            }
            DeclKind::ClassAlias | DeclKind::InterfaceAlias | DeclKind::TypeAlias => {}
        }
    }
    Ok(())
}

// ============================================================================
// Entry point
// ============================================================================

/// `public static main(String[] args)` for a toplevel declaration that can be
/// invoked without arguments.
pub fn main_method(cx: &LoweringContext<'_>, decl: DeclId) -> Option<TargetMethod> {
    let model = cx.model();
    let d = model.decl(decl);
    let eligible = cx.options().generate_main
        && model.is_toplevel(decl)
        && matches!(d.kind, DeclKind::Class | DeclKind::Function)
        && d.is_shared()
        && !d.is_generic()
        && !d.is_abstract()
        && !d.is_formal()
        && !d.modifiers.contains(Modifiers::NO_MAIN)
        && d.parameter_lists.len() <= 1
        && (0..d.parameters().len()).all(|index| is_optional(model, decl, index));
    if !eligible {
        return None;
    }

    let invocation = match d.kind {
        DeclKind::Class => TargetExpr::New {
            ty: cx.self_target_type(decl),
            args: Vec::new(),
        },
        _ => TargetExpr::call(None, cx.name(decl, NameKind::Member), Vec::new()),
    };
    let mut method = TargetMethod::new("main", MethodOrigin::Main);
    method.modifiers = TargetModifiers::PUBLIC | TargetModifiers::STATIC;
    method.params = vec![TargetParam::explicit(
        "args",
        TargetType::Sequence(Box::new(TargetType::named("String"))),
    )];
    method.body = Some(vec![TargetStmt::Expr(invocation)]);
    Some(method)
}

#[cfg(test)]
mod tests {
    use super::*;
    use declower_model::{LocalRef, ModelBuilder, ParamRef, Parameter, SourceExpr, TypeRef};

    use crate::target::{ImplicitKind, TargetKind, TargetTypeDecl};

    fn int() -> TypeRef {
        TypeRef::basic("Integer")
    }

    fn lower_at(
        model: &declower_model::DeclarationModel,
        decl: DeclId,
        site: Site,
    ) -> (TargetTypeDecl, LoweringContext<'_>) {
        let cx = LoweringContext::new(model);
        let mut b = TargetAstBuilder::new();
        let h = b.new_type(TargetKind::Class, declower_core::QualifiedName::global("Host"));
        match model.decl(decl).kind {
            DeclKind::Value => lower_value(&cx, &mut b, h, decl, site).unwrap(),
            _ => lower_function(&cx, &mut b, h, decl, site).unwrap(),
        }
        assert_eq!(cx.scope_depth(), 0);
        (b.build(h).remove(0), cx)
    }

    #[test]
    fn default_member_splits_canonical_and_builds_ladder() {
        let mut b = ModelBuilder::new();
        let c = b.class("C").shared().build();
        let m_id = b.next_id();
        let m = b
            .function("m")
            .member_of(c)
            .default_()
            .returns(int())
            .param(Parameter::new("a", int()))
            .param(Parameter::new("b", int()).with_default(SourceExpr::param(m_id, 0)))
            .returning(SourceExpr::param(m_id, 1))
            .build();
        let model = b.finish();
        let (decl, _) = lower_at(&model, m, Site::Class);

        let canonical: Vec<_> = decl.methods_named("m$canonical$").collect();
        assert_eq!(canonical.len(), 1);
        assert!(canonical[0].modifiers.contains(TargetModifiers::PRIVATE));
        assert_eq!(canonical[0].body, Some(vec![TargetStmt::Return(Some(TargetExpr::ident("b")))]));

        let forms: Vec<_> = decl.methods_named("m").collect();
        assert_eq!(forms.len(), 2);
        assert_eq!(forms[0].origin, MethodOrigin::Ultimate);
        assert_eq!(forms[1].origin, MethodOrigin::Overload { cut: 1 });
        assert_eq!(decl.methods_named("m$default$b").count(), 1);
    }

    #[test]
    fn refinement_gets_ladder_into_its_own_body() {
        let mut b = ModelBuilder::new();
        let s = b.class("S").shared().build();
        let base = b
            .function("m")
            .member_of(s)
            .shared()
            .default_()
            .param(Parameter::new("a", int()))
            .param(Parameter::new("b", int()).with_default(SourceExpr::int(1)))
            .returns(int())
            .returning(SourceExpr::int(0))
            .build();
        let c = b.class("C").shared().extends(TypeRef::named(s)).build();
        let refined = b
            .function("m")
            .member_of(c)
            .shared()
            .actual()
            .refines(base)
            .param(Parameter::new("a", int()))
            .param(Parameter::new("b", int()))
            .returns(int())
            .returning(SourceExpr::int(2))
            .build();
        let model = b.finish();
        let (decl, _) = lower_at(&model, refined, Site::Class);

        let overload = decl.methods_named("m").find(|m| m.explicit_arity() == 1).unwrap();
        assert_eq!(overload.origin, MethodOrigin::Overload { cut: 1 });
        let Some([TargetStmt::Return(Some(TargetExpr::Let { body, .. }))]) = overload.body.as_deref()
        else {
            panic!("expected a let-bound delegation");
        };
        assert!(matches!(&**body, TargetExpr::Call { method, .. } if method == "m"));
    }

    #[test]
    fn formal_class_method_ladder_is_abstract() {
        let mut b = ModelBuilder::new();
        let c = b.class("C").shared().abstract_().build();
        let m = b
            .function("m")
            .member_of(c)
            .shared()
            .formal()
            .param(Parameter::new("b", int()).with_default(SourceExpr::int(1)))
            .returns(int())
            .build();
        let model = b.finish();
        let (decl, _) = lower_at(&model, m, Site::Class);

        assert_eq!(decl.methods_named("m").count(), 2);
        assert!(decl.methods_named("m").all(TargetMethod::is_abstract));
        assert!(decl.methods_named("m$default$b").next().unwrap().body.is_some());
    }

    #[test]
    fn surface_declares_everything_abstract() {
        let mut b = ModelBuilder::new();
        let i = b.interface("I").type_param("E").build();
        let m = b
            .function("m")
            .member_of(i)
            .default_()
            .param(Parameter::new("a", int()).with_default(SourceExpr::int(1)))
            .build();
        let model = b.finish();
        let (decl, _) = lower_at(&model, m, Site::Surface);

        assert!(decl.methods.iter().all(TargetMethod::is_abstract));
        assert_eq!(decl.methods_named("m").count(), 2);
        assert_eq!(decl.methods_named("m$default$a").count(), 1);
        assert!(decl.methods.iter().all(|m| m.implicit_params().count() == 0));
    }

    #[test]
    fn companion_form_takes_outer_instance_and_binds_this() {
        let mut b = ModelBuilder::new();
        let i = b.interface("Greeter").build();
        let name = b.value("name", TypeRef::basic("String")).member_of(i).formal().build();
        let greet = b
            .function("greet")
            .member_of(i)
            .default_()
            .returns(TypeRef::basic("String"))
            .returning(SourceExpr::Invoke {
                callee: name,
                receiver: Some(Box::new(SourceExpr::Ref(declower_model::Reference::This))),
                args: Vec::new(),
            })
            .build();
        let model = b.finish();
        let (decl, _) = lower_at(&model, greet, Site::Companion);

        let forms: Vec<_> = decl.methods_named("greet").collect();
        assert_eq!(forms.len(), 1);
        assert_eq!(forms[0].params[0].implicit, Some(ImplicitKind::OuterThis));
        let Some([TargetStmt::Return(Some(TargetExpr::Call { target, .. }))]) =
            forms[0].body.as_deref()
        else {
            panic!("expected a returned call");
        };
        assert_eq!(target.as_deref(), Some(&TargetExpr::ident("$this")));
    }

    #[test]
    fn multiple_parameter_lists_return_nested_lambdas() {
        let mut b = ModelBuilder::new();
        let f_id = b.next_id();
        let f = b
            .function("add")
            .shared()
            .returns(int())
            .param(Parameter::new("a", int()))
            .param_list()
            .param(Parameter::new("b", int()))
            .returning(SourceExpr::param(f_id, 0))
            .build();
        let model = b.finish();
        let (decl, _) = lower_at(&model, f, Site::Wrapper);

        let add = decl.methods_named("add").next().unwrap();
        assert_eq!(add.ret, TargetType::Callable(Box::new(TargetType::named("Integer"))));
        assert!(add.modifiers.contains(TargetModifiers::STATIC));
        assert!(matches!(
            add.body.as_deref(),
            Some([TargetStmt::Return(Some(TargetExpr::Lambda { .. }))])
        ));
    }

    #[test]
    fn deferred_function_calls_stored_callable() {
        let mut b = ModelBuilder::new();
        let c = b.class("C").build();
        let f = b.function("later").member_of(c).deferred().returns(int()).build();
        let model = b.finish();
        let (decl, _) = lower_at(&model, f, Site::Class);

        assert!(decl.field("later$deferred$").is_some());
        let later = decl.methods_named("later").next().unwrap();
        assert!(matches!(
            later.body.as_deref(),
            Some([TargetStmt::Return(Some(TargetExpr::Call { method, .. }))]) if method == "$call$"
        ));
    }

    #[test]
    fn variable_value_gets_field_and_accessors() {
        let mut b = ModelBuilder::new();
        let c = b.class("C").build();
        let v = b
            .value("count", int())
            .member_of(c)
            .shared()
            .variable()
            .returning(SourceExpr::int(0))
            .build();
        let model = b.finish();
        let (decl, _) = lower_at(&model, v, Site::Class);

        let field = decl.field("count").unwrap();
        assert!(!field.modifiers.contains(TargetModifiers::FINAL));
        assert!(field.init.is_some());
        assert_eq!(decl.methods_named("getCount").count(), 1);
        assert_eq!(decl.methods_named("setCount").count(), 1);
    }

    #[test]
    fn hoisted_local_function_keeps_capture_prefix_on_every_overload() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("a", int()))
            .build();
        let g_id = b.next_id();
        b.function("g")
            .local_to(f)
            .captures(LocalRef::Param(ParamRef::new(f, 0)))
            .param(Parameter::new("x", int()).with_default(SourceExpr::param(f, 0)))
            .returning(SourceExpr::param(g_id, 0))
            .build();
        let model = b.finish();
        let (decl, _) = lower_at(&model, f, Site::Wrapper);

        let hoisted: Vec<_> = decl.methods.iter().filter(|m| m.name.starts_with("f$1g")).collect();
        assert_eq!(hoisted.len(), 3);
        for method in hoisted {
            assert_eq!(method.params[0].name, "$capture$a");
            assert!(method.modifiers.contains(TargetModifiers::PRIVATE | TargetModifiers::STATIC));
        }
    }

    #[test]
    fn main_requires_callable_without_arguments() {
        let mut b = ModelBuilder::new();
        let run = b.function("run").shared().build();
        let needs_arg = b
            .function("needsArg")
            .shared()
            .param(Parameter::new("a", int()))
            .build();
        let generic = b.class("Box").shared().type_param("T").build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let main = main_method(&cx, run).unwrap();
        assert_eq!(main.origin, MethodOrigin::Main);
        assert!(main_method(&cx, needs_arg).is_none());
        assert!(main_method(&cx, generic).is_none());

        let off = LoweringContext::new(&model)
            .with_options(crate::LoweringOptions::default().with_generate_main(false));
        assert!(main_method(&off, run).is_none());
    }
}
