//! Initializer and constructor strategies.
//!
//! A class initializer becomes one full constructor:
//!
//! ```text
//!   C(prefix..., explicit...) {
//!       super(<superclass prefix>);
//!       this.<prefix entry> = <prefix entry>;     // captured values, descriptors
//!       this.<promoted> = <promoted>;
//!       <initializer body>
//!   }
//! ```
//!
//! plus a constructor ladder for its optional parameters. Member classes
//! additionally get an instantiator `C$new$` on their container, which is the
//! only creation point the rest of the program uses. Class aliases get an
//! alias instantiator that always throws.

use declower_core::LoweringError;
use declower_model::{DeclId, DeclKind, ParamRef, TypeArgs, TypeRef};

use crate::capture::{CaptureEnvironment, ImplicitParam, resolve_in_scope};
use crate::context::LoweringContext;
use crate::dao::{
    self, Ladder, LadderTarget, emit_default_value_methods, emit_ladder, explicit_params, forward,
    own_type_params, result_stmt,
};
use crate::naming::NameKind;
use crate::strategy::{DaoBody, DefaultValueOwner, Functional, generates_instantiator};
use crate::substitution::SubstKey;
use crate::target::{
    MethodOrigin, TargetAstBuilder, TargetConstructor, TargetExpr, TargetField, TargetMethod,
    TargetModifiers, TargetParam, TargetStmt, TargetType, TypeHandle,
};

const UNSUPPORTED_OPERATION: &str = "UnsupportedOperationException";

/// Lower the initializer of `class` into constructors, fields and accessors on `h`.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lower_initializer(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    class: DeclId,
    h: TypeHandle,
) -> Result<(), LoweringError> {
    let model = cx.model();
    let d = model.get(class)?;
    let env = cx.capture(class)?;
    let prefix = env.declare(cx);
    let explicit = explicit_params(cx, class, &TypeArgs::default())?;

    let _scope = cx.open_scope();
    env.bind_params(cx);

    let mut body = vec![TargetStmt::Expr(TargetExpr::SuperCall(super_arguments(
        cx, class,
    )?))];

    for param in &prefix {
        b.add_field(
            h,
            TargetField {
                name: param.name.clone(),
                ty: param.ty.clone(),
                modifiers: TargetModifiers::PRIVATE | TargetModifiers::FINAL,
                init: None,
            },
        );
        body.push(assign_field(&param.name));
    }

    let accessor_visibility = if d.is_shared() {
        TargetModifiers::PUBLIC
    } else {
        TargetModifiers::PRIVATE
    };
    for (index, param) in d.parameters().iter().enumerate() {
        if !param.promoted {
            continue;
        }
        let ty = cx.target_type(&param.ty);
        let mut modifiers = TargetModifiers::PRIVATE;
        if !param.variable {
            modifiers |= TargetModifiers::FINAL;
        }
        b.add_field(
            h,
            TargetField {
                name: param.name.clone(),
                ty: ty.clone(),
                modifiers,
                init: None,
            },
        );
        body.push(assign_field(&param.name));

        let mut getter = TargetMethod::new(
            cx.name(class, NameKind::PromotedGetter(index)),
            MethodOrigin::Getter,
        );
        getter.modifiers = accessor_visibility;
        getter.ret = ty.clone();
        getter.body = Some(vec![TargetStmt::Return(Some(this_field(&param.name)))]);
        b.add_method(h, getter);

        if param.variable {
            let mut setter = TargetMethod::new(
                cx.name(class, NameKind::PromotedSetter(index)),
                MethodOrigin::Setter,
            );
            setter.modifiers = accessor_visibility;
            setter.params = vec![TargetParam::explicit(param.name.clone(), ty.clone())];
            setter.body = Some(vec![assign_field(&param.name)]);
            b.add_method(h, setter);
        }

        if param.functional
            && let TypeRef::Callable { ret, params } = &param.ty
        {
            b.add_method(
                h,
                functional_forward(cx, &param.name, ret, params, accessor_visibility),
            );
        }
        cx.bind(SubstKey::Param(ParamRef::new(class, index)), this_field(&param.name));
    }

    let lowered = cx.lower_body(&d.body, false);
    body.extend(cx.recover_body(class, lowered)?);

    let modifiers = constructor_visibility(cx, class);
    b.add_constructor(
        h,
        TargetConstructor {
            modifiers,
            params: prefix.iter().cloned().chain(explicit.iter().cloned()).collect(),
            body,
            cut: None,
        },
    );

    let (target, defaults_prefix) = constructor_defaults(cx, class, &env);
    let ladder = Ladder::constructor(class, prefix, explicit)
        .with_modifiers(modifiers)
        .with_defaults(target, defaults_prefix);
    emit_ladder(cx, b, h, &ladder)?;

    if DefaultValueOwner::classify(model, class) == DefaultValueOwner::Static {
        emit_default_value_methods(
            cx,
            b,
            h,
            class,
            &env,
            accessor_visibility | TargetModifiers::STATIC,
            true,
        )?;
    }
    Ok(())
}

fn this_field(name: &str) -> TargetExpr {
    TargetExpr::field(TargetExpr::This, name)
}

/// `this.name = name`
fn assign_field(name: &str) -> TargetStmt {
    TargetStmt::Expr(TargetExpr::Assign {
        target: Box::new(this_field(name)),
        value: Box::new(TargetExpr::ident(name)),
    })
}

/// A method with the parameter's name that invokes the stored callable.
fn functional_forward(
    cx: &LoweringContext<'_>,
    name: &str,
    ret: &TypeRef,
    params: &[TypeRef],
    visibility: TargetModifiers,
) -> TargetMethod {
    let mut method = TargetMethod::new(name, MethodOrigin::FunctionalParameter);
    method.modifiers = visibility;
    method.ret = cx.target_type(ret);
    method.params = params
        .iter()
        .enumerate()
        .map(|(i, ty)| TargetParam::explicit(format!("arg{i}"), cx.target_type(ty)))
        .collect();
    let call = TargetExpr::call(Some(this_field(name)), "$call$", forward(&method.params));
    method.body = Some(vec![result_stmt(&method.ret, call)]);
    method
}

/// Arguments for the superclass constructor's implicit prefix. Descriptors
/// of the superclass's own type parameters come from the extended type.
fn super_arguments(
    cx: &LoweringContext<'_>,
    class: DeclId,
) -> Result<Vec<TargetExpr>, LoweringError> {
    let model = cx.model();
    let Some(extended) = model.extended_type_of(&model.self_type(class)) else {
        return Ok(Vec::new());
    };
    let Some(sup) = extended.decl() else {
        return Ok(Vec::new());
    };
    let env = cx.capture(sup)?;
    Ok(env.arguments_with(|p| match p {
        ImplicitParam::Descriptor(tp) if tp.owner == sup => extended
            .args()
            .get(tp.index)
            .map(|arg| cx.descriptor(arg))
            .unwrap_or(TargetExpr::TypeDescriptor(TargetType::Object)),
        other => resolve_in_scope(cx, other),
    }))
}

/// Classes with an instantiator hide their constructor behind it.
fn constructor_visibility(cx: &LoweringContext<'_>, class: DeclId) -> TargetModifiers {
    let model = cx.model();
    if generates_instantiator(model, class) {
        TargetModifiers::PROTECTED
    } else if model.decl(class).is_shared() {
        TargetModifiers::PUBLIC
    } else {
        TargetModifiers::empty()
    }
}

/// Where the constructor ladder of `class` finds its default-value methods.
pub fn constructor_defaults(
    cx: &LoweringContext<'_>,
    class: DeclId,
    env: &CaptureEnvironment,
) -> (Option<TargetExpr>, Vec<TargetExpr>) {
    let model = cx.model();
    let target = match DefaultValueOwner::classify(model, class) {
        DefaultValueOwner::Static | DefaultValueOwner::SelfType => None,
        DefaultValueOwner::Outer => model
            .container(class)
            .decl()
            .map(|outer| TargetExpr::OuterThis(cx.type_name(outer).to_string())),
        DefaultValueOwner::OuterCompanion => model
            .container(class)
            .decl()
            .map(|iface| TargetExpr::OuterThis(cx.companion_name(iface).to_string())),
        DefaultValueOwner::InitCompanion => model.container(class).decl().map(|container| {
            TargetExpr::TypeName(cx.host_name(cx.host_of_local(container)).to_string())
        }),
    };
    (target, env.forward(cx))
}

// ============================================================================
// Instantiators
// ============================================================================

/// `C$new$(prefix..., explicit...)` returning `new C(..)`, or its abstract
/// declaration.
pub fn instantiator(
    cx: &LoweringContext<'_>,
    class: DeclId,
    env: &CaptureEnvironment,
    modifiers: TargetModifiers,
    concrete: bool,
) -> Result<TargetMethod, LoweringError> {
    let explicit = explicit_params(cx, class, &TypeArgs::default())?;
    let mut method = TargetMethod::new(
        cx.name(class, NameKind::Instantiator),
        MethodOrigin::Instantiator,
    );
    method.modifiers = modifiers;
    method.type_params = own_type_params(cx, class);
    method.params = env.declare(cx);
    method.params.extend(explicit.iter().cloned());
    method.ret = cx.self_target_type(class);
    if concrete {
        let mut args = env.forward(cx);
        args.extend(forward(&explicit));
        method.body = Some(vec![TargetStmt::Return(Some(TargetExpr::New {
            ty: method.ret.clone(),
            args,
        }))]);
    } else {
        method.modifiers |= TargetModifiers::ABSTRACT;
    }
    Ok(method)
}

/// Add the instantiator of `class` and its ladder to `host`.
pub fn emit_instantiator(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    host: TypeHandle,
    class: DeclId,
    env: &CaptureEnvironment,
    modifiers: TargetModifiers,
    concrete: bool,
) -> Result<(), LoweringError> {
    let method = instantiator(cx, class, env, modifiers, concrete)?;
    let ladder = Ladder::method(
        class,
        method.name.clone(),
        env.declare(cx),
        explicit_params(cx, class, &TypeArgs::default())?,
        method.ret.clone(),
    )
    .with_functional(Functional::Instantiator)
    .with_body(if concrete {
        DaoBody::DelegateToCanonical
    } else {
        DaoBody::Abstract
    })
    .with_modifiers(modifiers)
    .with_type_params(method.type_params.clone());

    dao::trace_method(&method);
    b.add_method(host, method);
    cx.bump(|s| s.instantiators += 1);
    emit_ladder(cx, b, host, &ladder)?;
    Ok(())
}

/// The instantiator of a class alias. Constructing through an alias is not
/// supported yet, so the body always throws.
pub fn alias_instantiator(
    cx: &LoweringContext<'_>,
    alias: DeclId,
) -> Result<(DefaultValueOwner, TargetMethod), LoweringError> {
    let model = cx.model();
    let d = model.get(alias)?;
    if d.kind != DeclKind::ClassAlias {
        return Err(LoweringError::compiler_bug(
            format!("`{}` is not a class alias", model.qualified_name(alias)),
            d.span,
        ));
    }
    let owner = DefaultValueOwner::classify(model, alias);
    let mut modifiers = if d.is_shared() {
        TargetModifiers::PUBLIC
    } else {
        TargetModifiers::PRIVATE
    };
    match owner {
        DefaultValueOwner::Static => modifiers |= TargetModifiers::STATIC,
        DefaultValueOwner::Outer | DefaultValueOwner::OuterCompanion => {}
        DefaultValueOwner::InitCompanion | DefaultValueOwner::SelfType => {
            return Err(LoweringError::precondition(
                format!(
                    "no owner for the instantiator of alias `{}`",
                    model.qualified_name(alias)
                ),
                d.span,
            ));
        }
    }

    let env = cx.capture(alias)?;
    let mut method = TargetMethod::new(
        cx.name(alias, NameKind::AliasInstantiator),
        MethodOrigin::AliasInstantiator,
    );
    method.modifiers = modifiers;
    method.type_params = own_type_params(cx, alias);
    method.params = env.declare(cx);
    method.params.extend(explicit_params(cx, alias, &TypeArgs::default())?);
    method.ret = d
        .extended_type
        .as_ref()
        .map(|aliased| cx.target_type(aliased))
        .unwrap_or(TargetType::Object);
    method.body = Some(vec![TargetStmt::Throw(TargetExpr::New {
        ty: TargetType::named(UNSUPPORTED_OPERATION),
        args: vec![TargetExpr::string("not yet supported")],
    })]);
    dao::trace_method(&method);
    Ok((owner, method))
}

/// Ladder of an alias instantiator placed on its owner.
pub fn alias_ladder(
    cx: &LoweringContext<'_>,
    alias: DeclId,
    method: &TargetMethod,
) -> Result<Ladder, LoweringError> {
    let explicit = explicit_params(cx, alias, &TypeArgs::default())?;
    let prefix: Vec<TargetParam> = method.params[..method.params.len() - explicit.len()].to_vec();
    Ok(Ladder::method(alias, method.name.clone(), prefix, explicit, method.ret.clone())
        .with_functional(Functional::Instantiator)
        .with_modifiers(method.modifiers)
        .with_type_params(method.type_params.clone())
        .with_target(LadderTarget::Method {
            target: None,
            name: method.name.clone(),
        }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use declower_model::{LocalRef, ModelBuilder, Parameter, SourceExpr};

    use crate::target::TargetKind;

    fn int() -> TypeRef {
        TypeRef::basic("Integer")
    }

    fn lower(model: &declower_model::DeclarationModel, class: DeclId) -> crate::target::TargetTypeDecl {
        let cx = LoweringContext::new(model);
        let mut b = TargetAstBuilder::new();
        let h = b.new_type(TargetKind::Class, cx.type_name(class));
        lower_initializer(&cx, &mut b, class, h).unwrap();
        assert_eq!(cx.scope_depth(), 0);
        b.build(h).remove(0)
    }

    #[test]
    fn toplevel_class_gets_full_constructor_ladder_and_static_default() {
        let mut b = ModelBuilder::new();
        let pair_id = b.next_id();
        let pair = b
            .class("Pair")
            .shared()
            .param(Parameter::new("x", int()))
            .param(Parameter::new("y", int()).with_default(SourceExpr::param(pair_id, 0)))
            .build();
        let model = b.finish();
        let decl = lower(&model, pair);

        assert_eq!(decl.constructors.len(), 2);
        let full = &decl.constructors[0];
        assert_eq!(full.cut, None);
        assert_eq!(full.params.len(), 2);
        assert_eq!(full.body[0], TargetStmt::Expr(TargetExpr::SuperCall(Vec::new())));
        assert_eq!(decl.constructors[1].cut, Some(1));

        let dpm: Vec<_> = decl.methods_named("Pair$default$y").collect();
        assert_eq!(dpm.len(), 1);
        assert!(dpm[0].modifiers.contains(TargetModifiers::STATIC));
    }

    #[test]
    fn local_class_stores_captures_in_private_final_fields() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("a", int()))
            .build();
        let local = b
            .class("L")
            .local_to(f)
            .captures(LocalRef::Param(ParamRef::new(f, 0)))
            .param(Parameter::new("n", int()))
            .build();
        let model = b.finish();
        let decl = lower(&model, local);

        let field = decl.field("$capture$a").unwrap();
        assert!(field.modifiers.contains(TargetModifiers::PRIVATE | TargetModifiers::FINAL));
        let ctor = &decl.constructors[0];
        let names: Vec<&str> = ctor.params.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["$capture$a", "n"]);
        assert!(ctor.params[0].is_implicit());
    }

    #[test]
    fn promoted_parameters_get_fields_and_accessors() {
        let mut b = ModelBuilder::new();
        let c = b
            .class("Counter")
            .shared()
            .param(Parameter::new("count", int()).with_promoted(true))
            .param(
                Parameter::new("step", TypeRef::callable(int(), vec![int()]))
                    .with_functional()
                    .with_promoted(false),
            )
            .build();
        let model = b.finish();
        let decl = lower(&model, c);

        assert!(decl.field("count").is_some());
        assert_eq!(decl.methods_named("getCount").count(), 1);
        assert_eq!(decl.methods_named("setCount").count(), 1);
        assert_eq!(decl.methods_named("setStep").count(), 0);
        let step: Vec<_> = decl.methods_named("step").collect();
        assert_eq!(step.len(), 1);
        assert_eq!(step[0].origin, MethodOrigin::FunctionalParameter);
        assert_eq!(step[0].params.len(), 1);
    }

    #[test]
    fn member_class_constructor_is_protected_behind_instantiator() {
        let mut b = ModelBuilder::new();
        let outer = b.class("Outer").shared().build();
        let inner = b.class("Inner").member_of(outer).shared().build();
        let model = b.finish();
        let decl = lower(&model, inner);
        assert_eq!(decl.constructors[0].modifiers, TargetModifiers::PROTECTED);

        let cx = LoweringContext::new(&model);
        let env = cx.capture(inner).unwrap();
        let method = instantiator(&cx, inner, &env, TargetModifiers::PUBLIC, true).unwrap();
        assert_eq!(method.name, "Inner$new$");
        assert!(matches!(
            method.body.as_deref(),
            Some([TargetStmt::Return(Some(TargetExpr::New { .. }))])
        ));
    }

    #[test]
    fn alias_instantiator_always_throws() {
        let mut b = ModelBuilder::new();
        let target = b.class("Target").shared().build();
        let alias = b
            .class_alias("Alias", TypeRef::named(target))
            .shared()
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let (owner, method) = alias_instantiator(&cx, alias).unwrap();
        assert_eq!(owner, DefaultValueOwner::Static);
        assert_eq!(method.name, "Alias$aliased$");
        assert!(matches!(
            method.body.as_deref(),
            Some([TargetStmt::Throw(TargetExpr::New { .. })])
        ));
    }

    #[test]
    fn local_alias_instantiator_has_no_owner() {
        let mut b = ModelBuilder::new();
        let target = b.class("Target").build();
        let f = b.function("f").build();
        let alias = b
            .class_alias("Alias", TypeRef::named(target))
            .local_to(f)
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let err = alias_instantiator(&cx, alias).unwrap_err();
        assert!(matches!(err, LoweringError::Precondition { .. }));
        assert!(err.is_fatal());
    }
}
