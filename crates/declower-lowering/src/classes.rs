//! Class and interface transformation.
//!
//! Each declaration kind is lowered by one function following the same
//! template: open a shell, copy annotations, lower members (recursing into
//! nested types), set modifiers, run the initializer strategy, register
//! supertypes (which applies mixin delegation), then register type
//! parameters with any ambient ones first.

use declower_core::{LoweringError, Modifiers};
use declower_model::{Container, DeclId, DeclKind, ParamRef, TypeRef};
use tracing::debug;

use crate::companion;
use crate::context::{Host, LoweringContext};
use crate::capture::ImplicitParam;
use crate::dao::{self, emit_default_value_methods, emit_ladder};
use crate::initializer::{self, alias_instantiator, alias_ladder, emit_instantiator};
use crate::members::{Site, hoist_locals, lower_function, lower_value, main_method};
use crate::strategy::generates_instantiator;
use crate::substitution::SubstKey;
use crate::target::{
    MethodOrigin, TargetAnnotation, TargetAstBuilder, TargetConstructor, TargetExpr, TargetKind,
    TargetMethod, TargetModifiers, TargetStmt, TargetType, TypeHandle,
};

/// Marker interface of classes that carry their own type descriptor.
pub const REIFIED_TYPE: &str = "ReifiedType";
const TYPE_DESCRIPTOR: &str = "TypeDescriptor";
const GET_TYPE: &str = "$getType$";

fn shared_visibility(shared: bool) -> TargetModifiers {
    if shared {
        TargetModifiers::PUBLIC
    } else {
        TargetModifiers::empty()
    }
}

// ============================================================================
// Annotations
// ============================================================================

/// User annotations, case types and alias targets always; the model
/// metadata annotations when enabled.
fn annotate(cx: &LoweringContext<'_>, b: &mut TargetAstBuilder, h: TypeHandle, decl: DeclId) {
    let model = cx.model();
    let d = model.decl(decl);

    for annotation in &d.annotations {
        b.add_annotation(
            h,
            TargetAnnotation::new(annotation.name.clone(), annotation.args.clone()),
        );
    }
    if !d.case_types.is_empty() {
        let cases = d.case_types.iter().map(|t| cx.describe(t)).collect();
        b.add_annotation(h, TargetAnnotation::new("CaseTypes", cases));
    }
    let aliased = match d.kind {
        DeclKind::ClassAlias | DeclKind::InterfaceAlias => d.extended_type.as_ref(),
        DeclKind::TypeAlias => Some(&d.value_type),
        _ => None,
    };
    if let Some(aliased) = aliased {
        b.add_annotation(h, TargetAnnotation::new("Alias", vec![cx.describe(aliased)]));
    }

    if !cx.options().model_annotations {
        return;
    }
    b.add_annotation(
        h,
        TargetAnnotation::new("Name", vec![model.qualified_name(decl).to_string()]),
    );
    let container = match d.container {
        Container::Package => model.package(decl).join("."),
        Container::Member(owner) | Container::Local(owner) => {
            model.qualified_name(owner).to_string()
        }
    };
    b.add_annotation(h, TargetAnnotation::new("Container", vec![container]));

    let members: Vec<String> = model
        .members(decl)
        .into_iter()
        .map(|m| model.decl(m).name.clone())
        .collect();
    if !members.is_empty() {
        b.add_annotation(h, TargetAnnotation::new("Members", members));
    }
    if !d.satisfied_types.is_empty() {
        let satisfied = d.satisfied_types.iter().map(|t| cx.describe(t)).collect();
        b.add_annotation(h, TargetAnnotation::new("SatisfiedTypes", satisfied));
    }
    if d.is_generic() {
        let params = d.type_parameters.iter().map(|tp| tp.name.clone()).collect();
        b.add_annotation(h, TargetAnnotation::new("TypeParameters", params));
    }
}

/// Type parameters from enclosing generic scopes first, then the
/// declaration's own.
fn register_type_params(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    h: TypeHandle,
    decl: DeclId,
) -> Result<(), LoweringError> {
    let model = cx.model();
    let env = cx.capture(decl)?;
    for entry in env.implicit() {
        if let ImplicitParam::Descriptor(tp) = entry {
            b.add_type_param(h, model.type_parameter(*tp)?.name.clone());
        }
    }
    for tp in &model.get(decl)?.type_parameters {
        b.add_type_param(h, tp.name.clone());
    }
    Ok(())
}

// ============================================================================
// Classes
// ============================================================================

/// Lower a class into a new shell and return its handle. Nested types are
/// already attached.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lower_class(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    class: DeclId,
) -> Result<TypeHandle, LoweringError> {
    let model = cx.model();
    let d = model.get(class)?;
    let name = cx.type_name(class);
    let h = b.new_type(TargetKind::Class, name.clone());
    let env = cx.capture(class)?;

    let _scope = cx.open_scope();
    let receiver = TargetExpr::OuterThis(name.to_string());
    env.bind_fields(cx, &receiver);
    for (index, param) in d.parameters().iter().enumerate() {
        if param.promoted {
            cx.bind(
                SubstKey::Param(ParamRef::new(class, index)),
                TargetExpr::field(receiver.clone(), param.name.clone()),
            );
        }
    }

    annotate(cx, b, h, class);

    for member in model.members(class) {
        lower_class_member(cx, b, h, member)?;
    }

    let mut modifiers = shared_visibility(d.is_shared());
    if d.is_abstract() || d.is_formal() {
        modifiers |= TargetModifiers::ABSTRACT;
    }
    if d.modifiers.contains(Modifiers::FINAL) {
        modifiers |= TargetModifiers::FINAL;
    }
    if let Container::Local(container) = d.container
        && cx.host_of_local(container).is_static()
    {
        modifiers |= TargetModifiers::STATIC;
    }
    b.set_modifiers(h, modifiers);

    initializer::lower_initializer(cx, b, class, h)?;

    if let Some(extended) = &d.extended_type {
        b.set_extends(h, cx.target_type(extended));
    }
    for satisfied in &d.satisfied_types {
        b.add_implements(h, cx.target_type(satisfied));
    }
    if cx.options().reified_generics {
        b.add_implements(h, TargetType::named(REIFIED_TYPE));
        b.add_method(h, get_type(cx, class));
    }
    companion::apply_mixins(cx, b, class, h)?;

    register_type_params(cx, b, h, class)?;

    hoist_locals(cx, b, h, Host::Type(class), class)?;
    if let Some(main) = main_method(cx, class) {
        b.add_method(h, main);
    }

    debug!(
        target: "declower::lowering",
        class = %name,
        nesting = ?d.container,
        methods = b.method_count(h),
        "class lowered"
    );
    Ok(h)
}

fn get_type(cx: &LoweringContext<'_>, class: DeclId) -> TargetMethod {
    let own = cx.model().type_parameter_refs(class);
    let descriptor = if own.is_empty() {
        TargetExpr::TypeDescriptor(cx.self_target_type(class))
    } else {
        let mut args = vec![TargetExpr::TypeDescriptor(TargetType::named(
            cx.type_name(class).to_string(),
        ))];
        args.extend(own.into_iter().map(|tp| cx.descriptor(&TypeRef::Param(tp))));
        TargetExpr::call(Some(TargetExpr::TypeName(TYPE_DESCRIPTOR.into())), "of", args)
    };
    let mut method = TargetMethod::new(GET_TYPE, MethodOrigin::GetType);
    method.modifiers = TargetModifiers::PUBLIC;
    method.ret = TargetType::Descriptor;
    method.body = Some(vec![TargetStmt::Return(Some(descriptor))]);
    method
}

fn lower_class_member(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    h: TypeHandle,
    member: DeclId,
) -> Result<(), LoweringError> {
    let model = cx.model();
    let d = model.get(member)?;
    if d.erroneous || (d.kind.is_class_or_interface() && model.has_error_markers(member)) {
        debug!(target: "declower::lowering", member = %model.qualified_name(member), "skipped");
        cx.report_skipped(member);
        return Ok(());
    }
    match d.kind {
        DeclKind::Function => lower_function(cx, b, h, member, Site::Class),
        DeclKind::Value => lower_value(cx, b, h, member, Site::Class),
        DeclKind::Class => {
            let nested = lower_class(cx, b, member)?;
            b.nest(h, nested);
            let env = cx.capture(member)?;
            if generates_instantiator(model, member) {
                let modifiers = if d.is_shared() {
                    TargetModifiers::PUBLIC
                } else {
                    TargetModifiers::PROTECTED
                };
                // A formal member class is abstract, so only subclasses of
                // the container can construct it.
                emit_instantiator(cx, b, h, member, &env, modifiers, !d.is_formal())?;
            }
            let dpm_modifiers = if d.is_shared() {
                TargetModifiers::PUBLIC
            } else {
                TargetModifiers::PRIVATE
            };
            emit_default_value_methods(cx, b, h, member, &env, dpm_modifiers, true)?;
            Ok(())
        }
        DeclKind::Interface => {
            let (nested, companion) = lower_interface(cx, b, member)?;
            b.nest(h, nested);
            if let Some(companion) = companion {
                b.nest(h, companion);
            }
            Ok(())
        }
        _ if model.is_ancestor_local(member) => Ok(()),
        DeclKind::ClassAlias => {
            let nested = lower_class_alias(cx, b, member)?;
            b.nest(h, nested);
            emit_alias_instantiator(cx, b, h, member)
        }
        DeclKind::InterfaceAlias => {
            let nested = lower_interface_alias(cx, b, member)?;
            b.nest(h, nested);
            Ok(())
        }
        DeclKind::TypeAlias => {
            let nested = lower_type_alias(cx, b, member)?;
            b.nest(h, nested);
            Ok(())
        }
    }
}

// ============================================================================
// Interfaces
// ============================================================================

/// Lower an interface into its surface and, if it has concrete members, its
/// companion. The caller decides where both are placed.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lower_interface(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    iface: DeclId,
) -> Result<(TypeHandle, Option<TypeHandle>), LoweringError> {
    let model = cx.model();
    let d = model.get(iface)?;
    let name = cx.type_name(iface);
    let h = b.new_type(TargetKind::Interface, name.clone());
    let _scope = cx.open_scope();

    annotate(cx, b, h, iface);
    b.set_modifiers(h, shared_visibility(d.is_shared()));
    for satisfied in &d.satisfied_types {
        b.add_implements(h, cx.target_type(satisfied));
    }
    register_type_params(cx, b, h, iface)?;

    let companion = if model.has_companion(iface) {
        let c = b.new_type(TargetKind::Class, cx.companion_name(iface));
        b.set_modifiers(
            c,
            TargetModifiers::PUBLIC | TargetModifiers::FINAL | TargetModifiers::SYNTHETIC,
        );
        register_type_params(cx, b, c, iface)?;
        b.add_constructor(
            c,
            TargetConstructor {
                modifiers: TargetModifiers::PUBLIC,
                params: Vec::new(),
                body: vec![TargetStmt::Expr(TargetExpr::SuperCall(Vec::new()))],
                cut: None,
            },
        );
        cx.bump(|s| s.companions += 1);
        debug!(target: "declower::companion", interface = %name, "companion created");
        Some(c)
    } else {
        None
    };

    for member in model.members(iface) {
        lower_interface_member(cx, b, h, companion, member)?;
    }

    debug!(
        target: "declower::lowering",
        interface = %name,
        nesting = ?d.container,
        methods = b.method_count(h),
        "interface lowered"
    );
    Ok((h, companion))
}

fn lower_interface_member(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    h: TypeHandle,
    companion: Option<TypeHandle>,
    member: DeclId,
) -> Result<(), LoweringError> {
    let model = cx.model();
    let d = model.get(member)?;
    if d.erroneous || (d.kind.is_class_or_interface() && model.has_error_markers(member)) {
        debug!(target: "declower::lowering", member = %model.qualified_name(member), "skipped");
        cx.report_skipped(member);
        return Ok(());
    }
    let home = companion.unwrap_or(h);
    match d.kind {
        DeclKind::Function => {
            if d.is_shared() {
                lower_function(cx, b, h, member, Site::Surface)?;
            }
            if let Some(c) = companion {
                if !d.is_formal() {
                    lower_function(cx, b, c, member, Site::Companion)?;
                } else {
                    let env = cx.capture(member)?;
                    emit_default_value_methods(cx, b, c, member, &env, TargetModifiers::PUBLIC, true)?;
                }
            }
            Ok(())
        }
        DeclKind::Value => {
            if d.is_shared() {
                lower_value(cx, b, h, member, Site::Surface)?;
            }
            if let Some(c) = companion
                && !d.is_formal()
            {
                lower_value(cx, b, c, member, Site::Companion)?;
            }
            Ok(())
        }
        DeclKind::Class => {
            let nested = lower_class(cx, b, member)?;
            b.nest(home, nested);
            let env = cx.capture(member)?;
            let surface = env.surface();
            if generates_instantiator(model, member) {
                if d.is_shared() {
                    emit_instantiator(cx, b, h, member, &surface, TargetModifiers::PUBLIC, false)?;
                }
                if let Some(c) = companion
                    && !d.is_formal()
                {
                    emit_instantiator(cx, b, c, member, &env, TargetModifiers::PUBLIC, true)?;
                }
            }
            if let Some(c) = companion {
                emit_default_value_methods(cx, b, c, member, &env, TargetModifiers::PUBLIC, true)?;
            }
            if d.is_shared() {
                emit_default_value_methods(cx, b, h, member, &surface, TargetModifiers::PUBLIC, false)?;
            }
            Ok(())
        }
        DeclKind::Interface => {
            let (nested, nested_companion) = lower_interface(cx, b, member)?;
            b.nest(h, nested);
            if let Some(nested_companion) = nested_companion {
                b.nest(h, nested_companion);
            }
            Ok(())
        }
        _ if model.is_ancestor_local(member) => Ok(()),
        DeclKind::ClassAlias => {
            let nested = lower_class_alias(cx, b, member)?;
            b.nest(home, nested);
            match companion {
                Some(c) => emit_alias_instantiator(cx, b, c, member),
                None => Ok(()),
            }
        }
        DeclKind::InterfaceAlias => {
            let nested = lower_interface_alias(cx, b, member)?;
            b.nest(h, nested);
            Ok(())
        }
        DeclKind::TypeAlias => {
            let nested = lower_type_alias(cx, b, member)?;
            b.nest(home, nested);
            Ok(())
        }
    }
}

// ============================================================================
// Aliases
// ============================================================================

pub fn lower_class_alias(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    alias: DeclId,
) -> Result<TypeHandle, LoweringError> {
    let d = cx.model().get(alias)?;
    let h = b.new_type(TargetKind::Class, cx.type_name(alias));
    annotate(cx, b, h, alias);
    b.set_modifiers(h, shared_visibility(d.is_shared()) | TargetModifiers::ABSTRACT);
    if let Some(aliased) = &d.extended_type {
        b.set_extends(h, cx.target_type(aliased));
    }
    register_type_params(cx, b, h, alias)?;
    if cx.model().is_toplevel(alias) {
        emit_alias_instantiator(cx, b, h, alias)?;
    }
    Ok(h)
}

/// Add the alias instantiator of `alias`, with its ladder and default-value
/// methods, to `owner`.
fn emit_alias_instantiator(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    owner: TypeHandle,
    alias: DeclId,
) -> Result<(), LoweringError> {
    let (_, method) = alias_instantiator(cx, alias)?;
    let modifiers = method.modifiers;
    let ladder = alias_ladder(cx, alias, &method)?;
    dao::trace_method(&method);
    b.add_method(owner, method);
    emit_ladder(cx, b, owner, &ladder)?;
    let env = cx.capture(alias)?;
    emit_default_value_methods(cx, b, owner, alias, &env, modifiers, true)?;
    Ok(())
}

pub fn lower_interface_alias(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    alias: DeclId,
) -> Result<TypeHandle, LoweringError> {
    let d = cx.model().get(alias)?;
    let h = b.new_type(TargetKind::Interface, cx.type_name(alias));
    annotate(cx, b, h, alias);
    b.set_modifiers(h, shared_visibility(d.is_shared()));
    if let Some(aliased) = &d.extended_type {
        b.add_implements(h, cx.target_type(aliased));
    }
    register_type_params(cx, b, h, alias)?;
    Ok(h)
}

/// Type aliases leave only a marker class behind.
pub fn lower_type_alias(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    alias: DeclId,
) -> Result<TypeHandle, LoweringError> {
    let d = cx.model().get(alias)?;
    let h = b.new_type(TargetKind::Class, cx.type_name(alias));
    annotate(cx, b, h, alias);
    b.set_modifiers(
        h,
        shared_visibility(d.is_shared()) | TargetModifiers::FINAL | TargetModifiers::SYNTHETIC,
    );
    Ok(h)
}

// ============================================================================
// Toplevel functions and values
// ============================================================================

/// A final holder class with a private constructor and the declaration as a
/// static member.
pub fn lower_wrapper(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    decl: DeclId,
) -> Result<TypeHandle, LoweringError> {
    let d = cx.model().get(decl)?;
    let h = b.new_type(TargetKind::Class, cx.wrapper_name(decl));
    annotate(cx, b, h, decl);
    b.set_modifiers(h, shared_visibility(d.is_shared()) | TargetModifiers::FINAL);
    b.add_constructor(
        h,
        TargetConstructor {
            modifiers: TargetModifiers::PRIVATE,
            params: Vec::new(),
            body: vec![TargetStmt::Expr(TargetExpr::SuperCall(Vec::new()))],
            cut: None,
        },
    );
    match d.kind {
        DeclKind::Function => lower_function(cx, b, h, decl, Site::Wrapper)?,
        DeclKind::Value => lower_value(cx, b, h, decl, Site::Wrapper)?,
        other => {
            return Err(LoweringError::compiler_bug(
                format!("{other:?} `{}` has no wrapper", d.name),
                d.span,
            ));
        }
    }
    if let Some(main) = main_method(cx, decl) {
        b.add_method(h, main);
    }
    Ok(h)
}
