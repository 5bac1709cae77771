//! Defaulted-argument overload (DAO) engine.
//!
//! The target only has fixed-arity callables, so a declaration with optional
//! parameters is lowered to a ladder of overloads, one per cut point, plus one
//! default-value method per parameter that introduces a default:
//!
//! ```text
//!   m(a, b = f(a), c = g(a, b))
//!
//!   m(a)          { let b = m$default$b(a); let c = m$default$c(a, b); return m$canonical$(a, b, c) }
//!   m(a, b)       { let c = m$default$c(a, b); return m$canonical$(a, b, c) }
//!   m(a, b, c)    { return m$canonical$(a, b, c) }
//!   m$canonical$  { ..the one real body.. }
//!   m$default$b(a)      { return f(a) }
//!   m$default$c(a, b)   { return g(a, b) }
//! ```
//!
//! Each overload binds the missing arguments left to right in a single
//! `let`, so every default expression runs once and later defaults see the
//! values already materialized. The implicit prefix of the declaration is
//! declared first on every overload and default-value method and forwarded
//! unchanged.

use declower_core::{LoweringError, ModelError};
use declower_model::{DeclId, DeclKind, ParamRef, Parameter, TypeArgs};
use tracing::trace;

use crate::capture::{CaptureEnvironment, ImplicitParam};
use crate::context::LoweringContext;
use crate::naming::NameKind;
use crate::strategy::{DaoBody, Functional, has_empty_default, has_default_value_method, overload_cuts};
use crate::substitution::SubstKey;
use crate::target::{
    LetBinding, MethodOrigin, TargetAstBuilder, TargetConstructor, TargetExpr, TargetMethod,
    TargetModifiers, TargetParam, TargetStmt, TargetType, TypeHandle,
};

// ============================================================================
// Ladder description
// ============================================================================

/// What an overload delegates to once its arguments are complete.
#[derive(Debug, Clone, PartialEq)]
pub enum LadderTarget {
    /// `name(..)`, on `target` or unqualified.
    Method {
        target: Option<TargetExpr>,
        name: String,
    },
    /// `this(..)`.
    Constructor,
    /// `super.name(..)` with the same cut, narrowed to the overload's return type.
    Super { name: String },
}

/// How the overloads reach the default-value methods.
#[derive(Debug, Clone, PartialEq)]
pub struct DefaultAccess {
    pub target: Option<TargetExpr>,
    /// Implicit arguments passed in front of the explicit ones.
    pub prefix: Vec<TargetExpr>,
}

/// Everything needed to generate the overloads of one callable.
#[derive(Debug, Clone)]
pub struct Ladder {
    pub decl: DeclId,
    pub functional: Functional,
    pub body: DaoBody,
    pub name: String,
    pub modifiers: TargetModifiers,
    pub type_params: Vec<String>,
    pub prefix: Vec<TargetParam>,
    pub params: Vec<TargetParam>,
    pub ret: TargetType,
    pub target: LadderTarget,
    pub defaults: DefaultAccess,
}

impl Ladder {
    /// A method ladder delegating to `name` unqualified, with default-value
    /// methods reached unqualified through the same prefix.
    pub fn method(
        decl: DeclId,
        name: impl Into<String>,
        prefix: Vec<TargetParam>,
        params: Vec<TargetParam>,
        ret: TargetType,
    ) -> Self {
        let name = name.into();
        let defaults = DefaultAccess {
            target: None,
            prefix: forward(&prefix),
        };
        Self {
            decl,
            functional: Functional::Method,
            body: DaoBody::DelegateToCanonical,
            target: LadderTarget::Method {
                target: None,
                name: name.clone(),
            },
            name,
            modifiers: TargetModifiers::empty(),
            type_params: Vec::new(),
            prefix,
            params,
            ret,
            defaults,
        }
    }

    pub fn constructor(decl: DeclId, prefix: Vec<TargetParam>, params: Vec<TargetParam>) -> Self {
        let mut ladder = Self::method(decl, String::new(), prefix, params, TargetType::Void);
        ladder.functional = Functional::Constructor;
        ladder.target = LadderTarget::Constructor;
        ladder
    }

    pub fn with_functional(mut self, functional: Functional) -> Self {
        self.functional = functional;
        self
    }

    pub fn with_body(mut self, body: DaoBody) -> Self {
        self.body = body;
        self
    }

    pub fn with_modifiers(mut self, modifiers: TargetModifiers) -> Self {
        self.modifiers = modifiers;
        self
    }

    pub fn with_type_params(mut self, type_params: Vec<String>) -> Self {
        self.type_params = type_params;
        self
    }

    pub fn with_target(mut self, target: LadderTarget) -> Self {
        self.target = target;
        self
    }

    pub fn with_defaults(mut self, target: Option<TargetExpr>, prefix: Vec<TargetExpr>) -> Self {
        self.defaults = DefaultAccess { target, prefix };
        self
    }
}

/// A synthesized overload.
#[derive(Debug, Clone, PartialEq)]
pub enum Overload {
    Method(TargetMethod),
    Constructor(TargetConstructor),
}

// ============================================================================
// Parameters
// ============================================================================

/// Target parameters of the first parameter list of `decl`, with type
/// parameters replaced per `args`.
pub fn explicit_params(
    cx: &LoweringContext<'_>,
    decl: DeclId,
    args: &TypeArgs,
) -> Result<Vec<TargetParam>, LoweringError> {
    Ok(cx
        .model()
        .get(decl)?
        .parameters()
        .iter()
        .map(|p| TargetParam::explicit(p.name.clone(), cx.target_type(&p.ty.substitute(args))))
        .collect())
}

/// Same-scope arguments for a parameter list.
pub fn forward(params: &[TargetParam]) -> Vec<TargetExpr> {
    params
        .iter()
        .map(|p| TargetExpr::ident(p.name.clone()))
        .collect()
}

/// Names of the type parameters a synthesized member of `decl` redeclares.
pub fn own_type_params(cx: &LoweringContext<'_>, decl: DeclId) -> Vec<String> {
    let d = cx.model().decl(decl);
    if matches!(d.kind, DeclKind::Function | DeclKind::Class | DeclKind::ClassAlias) {
        d.type_parameters.iter().map(|tp| tp.name.clone()).collect()
    } else {
        Vec::new()
    }
}

/// `return expr` or, for a void result, `expr`.
pub fn result_stmt(ret: &TargetType, expr: TargetExpr) -> TargetStmt {
    if ret.is_void() {
        TargetStmt::Expr(expr)
    } else {
        TargetStmt::Return(Some(expr))
    }
}

// ============================================================================
// Overloads
// ============================================================================

/// Build the overloads of one ladder, in source parameter order.
pub fn overloads(cx: &LoweringContext<'_>, ladder: &Ladder) -> Result<Vec<Overload>, LoweringError> {
    let cuts = overload_cuts(cx.model(), ladder.decl);
    let mut out = Vec::with_capacity(cuts.len());
    for cut in cuts.into_iter().filter(|cut| *cut < ladder.params.len()) {
        out.push(overload(cx, ladder, cut)?);
    }
    Ok(out)
}

fn overload(cx: &LoweringContext<'_>, ladder: &Ladder, cut: usize) -> Result<Overload, LoweringError> {
    let mut params = ladder.prefix.clone();
    params.extend(ladder.params[..cut].iter().cloned());

    if ladder.functional == Functional::Constructor {
        let delegation = match ladder.body {
            DaoBody::DelegateToCanonical => delegate_to_canonical(cx, ladder, cut)?,
            DaoBody::Abstract | DaoBody::DelegateToSuper => {
                return Err(LoweringError::compiler_bug(
                    format!("constructor overloads must delegate, found {:?}", ladder.body),
                    cx.model().span(ladder.decl),
                ));
            }
        };
        return Ok(Overload::Constructor(TargetConstructor {
            modifiers: ladder.modifiers,
            params,
            body: vec![TargetStmt::Expr(delegation)],
            cut: Some(cut),
        }));
    }

    let mut method = TargetMethod::new(ladder.name.clone(), MethodOrigin::Overload { cut });
    method.modifiers = ladder.modifiers;
    method.type_params = ladder.type_params.clone();
    method.params = params;
    method.ret = ladder.ret.clone();
    method.body = match ladder.body {
        DaoBody::Abstract => {
            method.modifiers |= TargetModifiers::ABSTRACT;
            None
        }
        DaoBody::DelegateToCanonical => {
            let expr = delegate_to_canonical(cx, ladder, cut)?;
            Some(vec![result_stmt(&ladder.ret, expr)])
        }
        DaoBody::DelegateToSuper => {
            let expr = delegate_to_super(cx, ladder, cut)?;
            Some(vec![result_stmt(&ladder.ret, expr)])
        }
    };
    Ok(Overload::Method(method))
}

fn delegate_to_canonical(
    cx: &LoweringContext<'_>,
    ladder: &Ladder,
    cut: usize,
) -> Result<TargetExpr, LoweringError> {
    let mut bindings = Vec::with_capacity(ladder.params.len() - cut);
    for index in cut..ladder.params.len() {
        let value = cx.recover(ladder.decl, default_argument(cx, ladder, index))?;
        bindings.push(LetBinding {
            name: ladder.params[index].name.clone(),
            ty: ladder.params[index].ty.clone(),
            value,
        });
    }

    let mut args = forward(&ladder.prefix);
    args.extend(forward(&ladder.params));
    let call = match &ladder.target {
        LadderTarget::Method { target, name } => TargetExpr::call(target.clone(), name.clone(), args),
        LadderTarget::Constructor => TargetExpr::ThisCall(args),
        LadderTarget::Super { name } => TargetExpr::call(Some(TargetExpr::Super), name.clone(), args),
    };
    Ok(TargetExpr::Let {
        bindings,
        body: Box::new(call),
    })
}

fn delegate_to_super(
    cx: &LoweringContext<'_>,
    ladder: &Ladder,
    cut: usize,
) -> Result<TargetExpr, LoweringError> {
    let name = match &ladder.target {
        LadderTarget::Super { name } | LadderTarget::Method { name, .. } => name.clone(),
        LadderTarget::Constructor => {
            return Err(LoweringError::compiler_bug(
                "a constructor cannot delegate to a superclass overload",
                cx.model().span(ladder.decl),
            ));
        }
    };
    let mut args = forward(&ladder.prefix);
    args.extend(forward(&ladder.params[..cut]));
    Ok(TargetExpr::cast(
        ladder.ret.clone(),
        TargetExpr::call(Some(TargetExpr::Super), name, args),
    ))
}

/// The value an overload supplies for parameter `index`.
fn default_argument(
    cx: &LoweringContext<'_>,
    ladder: &Ladder,
    index: usize,
) -> Result<TargetExpr, LoweringError> {
    let model = cx.model();
    let param = model.parameter(ParamRef::new(ladder.decl, index))?;
    let root = model.root_refined(ladder.decl);
    let inherited = model
        .decl(root)
        .parameters()
        .get(index)
        .is_some_and(Parameter::is_defaulted);

    if param.is_defaulted() || inherited {
        let mut args = ladder.defaults.prefix.clone();
        args.extend(forward(&ladder.params[..index]));
        return Ok(TargetExpr::call(
            ladder.defaults.target.clone(),
            cx.name(ladder.decl, NameKind::DefaultValue(index)),
            args,
        ));
    }
    if has_empty_default(param) {
        return Ok(TargetExpr::EmptySequence);
    }
    Err(LoweringError::compiler_bug(
        format!(
            "parameter `{}` of `{}` follows an optional parameter but has no default",
            param.name,
            model.qualified_name(ladder.decl)
        ),
        param.span,
    ))
}

/// Generate a ladder and add it to `host`. Overloads whose signature is
/// already present are skipped.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn emit_ladder(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    host: TypeHandle,
    ladder: &Ladder,
) -> Result<usize, LoweringError> {
    let mut emitted = 0;
    for overload in overloads(cx, ladder)? {
        match overload {
            Overload::Method(method) => {
                if b.has_method(host, &method.name, method.explicit_arity()) {
                    continue;
                }
                trace_method(&method);
                b.add_method(host, method);
            }
            Overload::Constructor(constructor) => {
                trace!(
                    target: "declower::dao",
                    origin = "constructor overload",
                    arity = constructor.params.len(),
                    cut = ?constructor.cut,
                    "synthesized"
                );
                b.add_constructor(host, constructor);
            }
        }
        emitted += 1;
    }
    cx.bump(|s| s.overloads += emitted);
    Ok(emitted)
}

pub(crate) fn trace_method(method: &TargetMethod) {
    trace!(
        target: "declower::dao",
        origin = ?method.origin,
        name = %method.name,
        arity = method.params.len(),
        "synthesized"
    );
}

// ============================================================================
// Default-value methods
// ============================================================================

/// The default-value method of parameter `index` of `decl`.
///
/// Its parameters are `env`'s prefix followed by the parameters before
/// `index`. When `concrete` is false the method is only declared.
pub fn default_value_method(
    cx: &LoweringContext<'_>,
    decl: DeclId,
    index: usize,
    env: &CaptureEnvironment,
    modifiers: TargetModifiers,
    concrete: bool,
) -> Result<TargetMethod, LoweringError> {
    let model = cx.model();
    let param = model.parameter(ParamRef::new(decl, index))?;
    let explicit = explicit_params(cx, decl, &TypeArgs::default())?;

    let mut method = TargetMethod::new(
        cx.name(decl, NameKind::DefaultValue(index)),
        MethodOrigin::DefaultValue { param: index },
    );
    method.modifiers = modifiers;
    method.type_params = own_type_params(cx, decl);
    method.params = env.declare(cx);
    method.params.extend(explicit[..index].iter().cloned());
    method.ret = explicit[index].ty.clone();

    if !concrete {
        method.modifiers |= TargetModifiers::ABSTRACT;
        return Ok(method);
    }

    let Some(expr) = &param.default else {
        return Err(LoweringError::Model(ModelError::NoSuchParameter {
            owner: model.decl(decl).name.clone(),
            list: 0,
            index,
            span: param.span,
        }));
    };

    let _scope = cx.open_scope();
    env.bind_params(cx);
    bind_outer_this(cx, env);
    let lowered = cx.lower_expr(expr).map_err(|err| {
        if err.is_fatal() {
            return err;
        }
        LoweringError::unsupported(
            format!(
                "parameter `{}` of `{}` has an unsupported default value: {}",
                param.name,
                model.qualified_name(decl),
                err.message()
            ),
            err.span(),
        )
    });
    let value = cx.recover(decl, lowered)?;
    method.body = Some(vec![TargetStmt::Return(Some(value))]);
    Ok(method)
}

/// Inside a companion, `this` of the source is the `$this` parameter.
pub(crate) fn bind_outer_this(cx: &LoweringContext<'_>, env: &CaptureEnvironment) {
    if let Some(outer) = env
        .implicit()
        .iter()
        .find(|p| matches!(p, ImplicitParam::OuterThis(_)))
    {
        cx.bind(
            SubstKey::This,
            TargetExpr::ident(CaptureEnvironment::param_name(cx, *outer)),
        );
    }
}

/// Add every default-value method `decl` owns to `host`.
pub fn emit_default_value_methods(
    cx: &LoweringContext<'_>,
    b: &mut TargetAstBuilder,
    host: TypeHandle,
    decl: DeclId,
    env: &CaptureEnvironment,
    modifiers: TargetModifiers,
    concrete: bool,
) -> Result<usize, LoweringError> {
    let model = cx.model();
    let mut emitted = 0;
    for index in 0..model.get(decl)?.parameters().len() {
        if !has_default_value_method(model, decl, index) {
            continue;
        }
        let method = default_value_method(cx, decl, index, env, modifiers, concrete)?;
        if b.has_method(host, &method.name, index) {
            continue;
        }
        trace_method(&method);
        b.add_method(host, method);
        emitted += 1;
    }
    cx.bump(|s| s.default_value_methods += emitted);
    Ok(emitted)
}

// ============================================================================
// Canonical split
// ============================================================================

/// Move the body of `ultimate` into a private canonical method and turn
/// `ultimate` into a forward to it. Returns the canonical method.
pub fn split_canonical(
    cx: &LoweringContext<'_>,
    decl: DeclId,
    ultimate: &mut TargetMethod,
) -> TargetMethod {
    let mut canonical = ultimate.clone();
    canonical.name = cx.name(decl, NameKind::Canonical);
    canonical.origin = MethodOrigin::Canonical;
    canonical.modifiers = canonical
        .modifiers
        .with_visibility(TargetModifiers::PRIVATE);

    let call = TargetExpr::call(None, canonical.name.clone(), forward(&ultimate.params));
    ultimate.body = Some(vec![result_stmt(&ultimate.ret, call)]);
    cx.bump(|s| s.canonical_methods += 1);
    canonical
}

#[cfg(test)]
mod tests {
    use super::*;
    use declower_core::Span;
    use declower_model::{ModelBuilder, SourceExpr, TypeRef};

    use crate::diagnostics::DiagnosticKind;

    fn int() -> TypeRef {
        TypeRef::basic("Integer")
    }

    #[test]
    fn pair_constructor_overload_materializes_y_from_x() {
        let mut b = ModelBuilder::new();
        let pair_id = b.next_id();
        let pair = b
            .class("Pair")
            .param(Parameter::new("x", int()))
            .param(Parameter::new("y", int()).with_default(SourceExpr::param(pair_id, 0)))
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let params = explicit_params(&cx, pair, &TypeArgs::default()).unwrap();
        let ladder = Ladder::constructor(pair, Vec::new(), params);
        let built = overloads(&cx, &ladder).unwrap();
        assert_eq!(built.len(), 1);

        let Overload::Constructor(ctor) = &built[0] else {
            panic!("expected a constructor overload");
        };
        assert_eq!(ctor.cut, Some(1));
        assert_eq!(ctor.params.len(), 1);
        assert_eq!(
            ctor.body,
            vec![TargetStmt::Expr(TargetExpr::Let {
                bindings: vec![LetBinding {
                    name: "y".into(),
                    ty: TargetType::named("Integer"),
                    value: TargetExpr::call(None, "Pair$default$y", vec![TargetExpr::ident("x")]),
                }],
                body: Box::new(TargetExpr::ThisCall(vec![
                    TargetExpr::ident("x"),
                    TargetExpr::ident("y")
                ])),
            })]
        );

        let env = cx.capture(pair).unwrap();
        let dpm = default_value_method(&cx, pair, 1, &env, TargetModifiers::STATIC, true).unwrap();
        assert_eq!(dpm.params.len(), 1);
        assert_eq!(
            dpm.body,
            Some(vec![TargetStmt::Return(Some(TargetExpr::ident("x")))])
        );
    }

    #[test]
    fn each_overload_binds_later_defaults_once_in_order() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("a", int()))
            .param(Parameter::new("b", int()).with_default(SourceExpr::int(1)))
            .param(Parameter::new("c", int()).with_default(SourceExpr::int(2)))
            .returns(int())
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let params = explicit_params(&cx, f, &TypeArgs::default()).unwrap();
        let ladder = Ladder::method(f, "f", Vec::new(), params, TargetType::named("Integer"));
        let built = overloads(&cx, &ladder).unwrap();
        assert_eq!(built.len(), 2);

        let Overload::Method(first) = &built[0] else {
            panic!("expected a method overload");
        };
        assert_eq!(first.explicit_arity(), 1);
        let Some(body) = &first.body else {
            panic!("overload must have a body");
        };
        let TargetStmt::Return(Some(TargetExpr::Let { bindings, .. })) = &body[0] else {
            panic!("expected a let-bound delegation");
        };
        let names: Vec<&str> = bindings.iter().map(|b| b.name.as_str()).collect();
        assert_eq!(names, vec!["b", "c"]);
        assert_eq!(
            bindings[1].value,
            TargetExpr::call(
                None,
                "f$default$c",
                vec![TargetExpr::ident("a"), TargetExpr::ident("b")]
            )
        );
    }

    #[test]
    fn empty_variadic_defaults_to_empty_sequence() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("xs", int()).with_sequenced(false))
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let params = explicit_params(&cx, f, &TypeArgs::default()).unwrap();
        let ladder = Ladder::method(f, "f", Vec::new(), params, TargetType::Void);
        let Overload::Method(method) = overloads(&cx, &ladder).unwrap().remove(0) else {
            panic!("expected a method overload");
        };
        let Some(body) = method.body else {
            panic!("overload must have a body");
        };
        let TargetStmt::Expr(TargetExpr::Let { bindings, .. }) = &body[0] else {
            panic!("void overloads delegate in statement position");
        };
        assert_eq!(bindings[0].value, TargetExpr::EmptySequence);
    }

    #[test]
    fn abstract_ladders_declare_only() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("a", int()).with_default(SourceExpr::int(1)))
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let params = explicit_params(&cx, f, &TypeArgs::default()).unwrap();
        let ladder =
            Ladder::method(f, "f", Vec::new(), params, TargetType::Void).with_body(DaoBody::Abstract);
        let Overload::Method(method) = overloads(&cx, &ladder).unwrap().remove(0) else {
            panic!("expected a method overload");
        };
        assert!(method.is_abstract());
        assert!(method.modifiers.contains(TargetModifiers::ABSTRACT));
    }

    #[test]
    fn unsupported_default_becomes_placeholder_with_diagnostic() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("a", int()).with_default(SourceExpr::Other {
                term: "comprehension".into(),
                span: Span::new(9, 3, 5),
            }))
            .build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let env = cx.capture(f).unwrap();
        let dpm = default_value_method(&cx, f, 0, &env, TargetModifiers::STATIC, true).unwrap();
        let Some(body) = dpm.body else {
            panic!("concrete default-value method must have a body");
        };
        assert!(matches!(&body[0], TargetStmt::Return(Some(e)) if e.is_erroneous()));

        let diagnostics = cx.take_diagnostics();
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].kind, DiagnosticKind::Unsupported);
        assert!(diagnostics[0].message.contains("parameter `a`"));
        assert_eq!(cx.scope_depth(), 0);
    }

    #[test]
    fn canonical_split_leaves_a_single_body() {
        let mut b = ModelBuilder::new();
        let c = b.class("C").build();
        let m = b.function("m").member_of(c).default_().build();
        let model = b.finish();
        let cx = LoweringContext::new(&model);

        let mut ultimate = TargetMethod::new("m", MethodOrigin::Ultimate);
        ultimate.modifiers = TargetModifiers::PUBLIC;
        ultimate.params = vec![TargetParam::explicit("a", TargetType::named("Integer"))];
        ultimate.body = Some(vec![TargetStmt::Expr(TargetExpr::string("body"))]);

        let canonical = split_canonical(&cx, m, &mut ultimate);
        assert_eq!(canonical.name, "m$canonical$");
        assert!(canonical.modifiers.contains(TargetModifiers::PRIVATE));
        assert_eq!(canonical.body, Some(vec![TargetStmt::Expr(TargetExpr::string("body"))]));
        assert_eq!(
            ultimate.body,
            Some(vec![TargetStmt::Expr(TargetExpr::call(
                None,
                "m$canonical$",
                vec![TargetExpr::ident("a")]
            ))])
        );
        assert_eq!(cx.stats().canonical_methods, 1);
    }
}
