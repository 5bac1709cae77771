//! LoweringContext - shared state for lowering one compilation unit.
//!
//! The context owns everything the engines consult while a declaration is
//! lowered: the model, options, the naming and body-lowering services, the
//! substitution stack, the per-declaration capture cache, and the collected
//! diagnostics. Engines take `&LoweringContext` plus `&mut TargetAstBuilder`;
//! the mutable parts of the context sit behind `RefCell` so a scope guard can
//! stay alive while the builder is mutated.

use std::cell::RefCell;
use std::rc::Rc;

use declower_core::{LoweringError, QualifiedName};
use declower_model::{
    Container, DeclId, DeclKind, DeclarationModel, SourceBody, SourceExpr, TypeRef,
    bind_type_args,
};
use rustc_hash::FxHashMap;
use tracing::warn;

use crate::body::{BodyLowering, DirectBodyLowering};
use crate::capture::CaptureEnvironment;
use crate::diagnostics::{Diagnostic, LoweringStats};
use crate::naming::{DefaultNaming, NameKind, Naming};
use crate::options::LoweringOptions;
use crate::substitution::{SubstKey, Substitutions};
use crate::target::{TargetExpr, TargetStmt, TargetType};

/// Nesting limit when expanding type aliases.
const MAX_ALIAS_DEPTH: usize = 32;

/// Target type a hoisted local declaration ends up in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Host {
    /// The lowered class or interface itself.
    Type(DeclId),
    /// The companion of an interface.
    Companion(DeclId),
    /// The static holder of a toplevel function or value.
    Wrapper(DeclId),
}

impl Host {
    /// Members placed on a wrapper are static.
    pub fn is_static(self) -> bool {
        matches!(self, Host::Wrapper(_))
    }
}

/// Pops the scope it opened when dropped.
#[must_use = "the scope closes as soon as the guard is dropped"]
pub struct ScopeGuard<'c> {
    substitutions: &'c RefCell<Substitutions>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        self.substitutions.borrow_mut().pop_scope();
    }
}

pub struct LoweringContext<'m> {
    model: &'m DeclarationModel,
    options: LoweringOptions,
    naming: Box<dyn Naming + 'm>,
    bodies: Box<dyn BodyLowering + 'm>,
    substitutions: RefCell<Substitutions>,
    captures: RefCell<FxHashMap<DeclId, Rc<CaptureEnvironment>>>,
    diagnostics: RefCell<Vec<Diagnostic>>,
    stats: RefCell<LoweringStats>,
}

impl<'m> LoweringContext<'m> {
    pub fn new(model: &'m DeclarationModel) -> Self {
        Self {
            model,
            options: LoweringOptions::default(),
            naming: Box::new(DefaultNaming),
            bodies: Box::new(DirectBodyLowering),
            substitutions: RefCell::new(Substitutions::new()),
            captures: RefCell::new(FxHashMap::default()),
            diagnostics: RefCell::new(Vec::new()),
            stats: RefCell::new(LoweringStats::default()),
        }
    }

    pub fn with_options(mut self, options: LoweringOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_naming(mut self, naming: impl Naming + 'm) -> Self {
        self.naming = Box::new(naming);
        self
    }

    pub fn with_body_lowering(mut self, bodies: impl BodyLowering + 'm) -> Self {
        self.bodies = Box::new(bodies);
        self
    }

    pub fn model(&self) -> &'m DeclarationModel {
        self.model
    }

    pub fn options(&self) -> &LoweringOptions {
        &self.options
    }

    pub fn name(&self, decl: DeclId, kind: NameKind) -> String {
        self.naming.name(self.model, decl, kind)
    }

    // ==========================================================================
    // Substitutions
    // ==========================================================================

    pub fn open_scope(&self) -> ScopeGuard<'_> {
        self.substitutions.borrow_mut().push_scope();
        ScopeGuard {
            substitutions: &self.substitutions,
        }
    }

    pub fn bind(&self, key: SubstKey, expr: TargetExpr) {
        self.substitutions.borrow_mut().bind(key, expr);
    }

    pub fn resolve(&self, key: SubstKey) -> Option<TargetExpr> {
        self.substitutions.borrow().resolve(&key).cloned()
    }

    /// Number of currently open scopes.
    pub fn scope_depth(&self) -> u32 {
        self.substitutions.borrow().depth()
    }

    // ==========================================================================
    // Services
    // ==========================================================================

    /// The capture environment of `decl`, computed on first use.
    pub fn capture(&self, decl: DeclId) -> Result<Rc<CaptureEnvironment>, LoweringError> {
        if let Some(env) = self.captures.borrow().get(&decl) {
            return Ok(Rc::clone(env));
        }
        let env = Rc::new(CaptureEnvironment::compute(self, decl)?);
        self.captures.borrow_mut().insert(decl, Rc::clone(&env));
        Ok(env)
    }

    pub fn lower_expr(&self, expr: &SourceExpr) -> Result<TargetExpr, LoweringError> {
        self.bodies.lower_expr(self, expr)
    }

    pub fn lower_body(
        &self,
        body: &SourceBody,
        returns_value: bool,
    ) -> Result<Vec<TargetStmt>, LoweringError> {
        self.bodies.lower_body(self, body, returns_value)
    }

    // ==========================================================================
    // Diagnostics
    // ==========================================================================

    /// Record a diagnostic against `decl`.
    pub fn report(&self, error: &LoweringError, decl: DeclId) {
        let declaration = self.model.qualified_name(decl);
        warn!(target: "declower::lowering", declaration = %declaration, "{error}");
        if !error.is_fatal() {
            self.bump(|s| s.placeholders += 1);
        }
        self.diagnostics
            .borrow_mut()
            .push(Diagnostic::from_error(error, declaration));
    }

    pub fn report_skipped(&self, decl: DeclId) {
        self.diagnostics.borrow_mut().push(Diagnostic::skipped(
            self.model.qualified_name(decl),
            self.model.span(decl),
        ));
    }

    /// Turn a recoverable failure into an erroneous placeholder.
    pub fn recover(
        &self,
        decl: DeclId,
        result: Result<TargetExpr, LoweringError>,
    ) -> Result<TargetExpr, LoweringError> {
        match result {
            Ok(expr) => Ok(expr),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.report(&err, decl);
                Ok(TargetExpr::Erroneous(err.message()))
            }
        }
    }

    /// Like [`recover`](Self::recover) for statement lists.
    pub fn recover_body(
        &self,
        decl: DeclId,
        result: Result<Vec<TargetStmt>, LoweringError>,
    ) -> Result<Vec<TargetStmt>, LoweringError> {
        match result {
            Ok(stmts) => Ok(stmts),
            Err(err) if err.is_fatal() => Err(err),
            Err(err) => {
                self.report(&err, decl);
                Ok(vec![TargetStmt::Throw(TargetExpr::Erroneous(err.message()))])
            }
        }
    }

    pub fn bump(&self, f: impl FnOnce(&mut LoweringStats)) {
        f(&mut self.stats.borrow_mut());
    }

    pub fn stats(&self) -> LoweringStats {
        *self.stats.borrow()
    }

    pub fn take_diagnostics(&self) -> Vec<Diagnostic> {
        std::mem::take(&mut self.diagnostics.borrow_mut())
    }

    // ==========================================================================
    // Target names
    // ==========================================================================

    /// Qualified target name of a class, interface, alias or type alias.
    pub fn type_name(&self, decl: DeclId) -> QualifiedName {
        let simple = self.name(decl, NameKind::Type);
        let d = self.model.decl(decl);
        match d.container {
            Container::Package => QualifiedName::new(simple, self.model.package(decl).to_vec()),
            Container::Member(owner) => {
                let lives_on_companion = self.model.decl(owner).kind == DeclKind::Interface
                    && matches!(
                        d.kind,
                        DeclKind::Class | DeclKind::ClassAlias | DeclKind::TypeAlias
                    );
                if lives_on_companion {
                    self.companion_name(owner).child(simple)
                } else {
                    self.type_name(owner).child(simple)
                }
            }
            Container::Local(container) => self.host_name(self.host_of_local(container)).child(simple),
        }
    }

    pub fn companion_name(&self, iface: DeclId) -> QualifiedName {
        self.type_name(iface)
            .sibling(self.name(iface, NameKind::Companion))
    }

    pub fn wrapper_name(&self, decl: DeclId) -> QualifiedName {
        QualifiedName::new(
            self.name(decl, NameKind::Wrapper),
            self.model.package(decl).to_vec(),
        )
    }

    pub fn host_name(&self, host: Host) -> QualifiedName {
        match host {
            Host::Type(decl) => self.type_name(decl),
            Host::Companion(iface) => self.companion_name(iface),
            Host::Wrapper(decl) => self.wrapper_name(decl),
        }
    }

    /// Where declarations local to the body of `container` are hoisted.
    pub fn host_of_local(&self, container: DeclId) -> Host {
        if self.model.decl(container).kind.is_class() {
            return Host::Type(container);
        }
        match self.model.container(container) {
            Container::Package => Host::Wrapper(container),
            Container::Member(owner) if self.model.decl(owner).kind.is_interface() => {
                Host::Companion(owner)
            }
            Container::Member(owner) => Host::Type(owner),
            Container::Local(outer) => self.host_of_local(outer),
        }
    }

    /// Where a function or value declaration lives after lowering.
    pub fn host_of(&self, decl: DeclId) -> Host {
        match self.model.container(decl) {
            Container::Package => Host::Wrapper(decl),
            Container::Member(owner) if self.model.decl(owner).kind.is_interface() => {
                Host::Companion(owner)
            }
            Container::Member(owner) => Host::Type(owner),
            Container::Local(container) => self.host_of_local(container),
        }
    }

    // ==========================================================================
    // Types
    // ==========================================================================

    pub fn target_type(&self, ty: &TypeRef) -> TargetType {
        self.target_type_at(ty, 0)
    }

    fn target_type_at(&self, ty: &TypeRef, depth: usize) -> TargetType {
        match ty {
            TypeRef::Object | TypeRef::Union(_) => TargetType::Object,
            TypeRef::Void => TargetType::Void,
            TypeRef::Basic(name) => TargetType::named(name.clone()),
            TypeRef::Param(tp) => TargetType::Var(
                self.model
                    .type_parameter(*tp)
                    .map(|p| p.name.clone())
                    .unwrap_or_else(|_| format!("T{}", tp.index)),
            ),
            TypeRef::Sequential(elem) => {
                TargetType::Sequence(Box::new(self.target_type_at(elem, depth)))
            }
            TypeRef::Callable { ret, .. } => {
                TargetType::Callable(Box::new(self.target_type_at(ret, depth)))
            }
            TypeRef::Named { .. } if depth >= MAX_ALIAS_DEPTH => TargetType::Object,
            TypeRef::Named { .. } => {
                let resolved = self.model.resolve_alias(ty);
                let TypeRef::Named { decl, args } = &resolved else {
                    return self.target_type_at(&resolved, depth + 1);
                };
                let d = self.model.decl(*decl);
                if d.kind == DeclKind::TypeAlias {
                    let aliased = d.value_type.substitute(&bind_type_args(*decl, args));
                    return self.target_type_at(&aliased, depth + 1);
                }
                TargetType::Named {
                    name: self.type_name(*decl).to_string(),
                    args: args.iter().map(|a| self.target_type_at(a, depth)).collect(),
                }
            }
        }
    }

    /// The type a class or interface has inside its own body.
    pub fn self_target_type(&self, decl: DeclId) -> TargetType {
        self.target_type(&self.model.self_type(decl))
    }

    /// An expression producing the runtime descriptor of `ty`.
    pub fn descriptor(&self, ty: &TypeRef) -> TargetExpr {
        if let TypeRef::Param(tp) = ty
            && let Some(bound) = self.resolve(SubstKey::TypeParam(*tp))
        {
            return bound;
        }
        TargetExpr::TypeDescriptor(self.target_type(ty))
    }

    /// Source-level rendering of a type, for metadata annotations.
    pub fn describe(&self, ty: &TypeRef) -> String {
        match ty {
            TypeRef::Object => "Object".to_string(),
            TypeRef::Void => "Anything".to_string(),
            TypeRef::Basic(name) => name.clone(),
            TypeRef::Named { decl, args } => {
                let base = self.model.qualified_name(*decl).to_string();
                if args.is_empty() {
                    base
                } else {
                    let args: Vec<String> = args.iter().map(|a| self.describe(a)).collect();
                    format!("{base}<{}>", args.join(","))
                }
            }
            TypeRef::Param(tp) => self
                .model
                .type_parameter(*tp)
                .map(|p| p.name.clone())
                .unwrap_or_else(|_| format!("T{}", tp.index)),
            TypeRef::Sequential(elem) => format!("{}[]", self.describe(elem)),
            TypeRef::Callable { ret, params } => {
                let params: Vec<String> = params.iter().map(|p| self.describe(p)).collect();
                format!("{}({})", self.describe(ret), params.join(","))
            }
            TypeRef::Union(members) => {
                let members: Vec<String> = members.iter().map(|m| self.describe(m)).collect();
                members.join("|")
            }
        }
    }
}
