//! Fluent construction of declaration models.
//!
//! Upstream front ends fill a [`DeclarationModel`] directly; this builder is
//! the convenient path for tests, benches and small embedders.
//!
//! ```
//! use declower_model::{ModelBuilder, Parameter, SourceExpr, TypeRef};
//!
//! let mut b = ModelBuilder::new().package("geometry");
//! let pair = b.next_id();
//! b.class("Pair")
//!     .shared()
//!     .param(Parameter::new("x", TypeRef::basic("Integer")))
//!     .param(Parameter::new("y", TypeRef::basic("Integer")).with_default(SourceExpr::param(pair, 0)))
//!     .build();
//! let model = b.finish();
//! assert_eq!(model.decl(pair).parameters().len(), 2);
//! ```

use declower_core::{ModelError, Modifiers, Span};
use petgraph::graph::NodeIndex;

use crate::{
    Annotation, Container, DeclId, DeclKind, Declaration, DeclarationModel, LocalRef, Parameter,
    SourceBody, SourceExpr, TypeParam, TypeRef,
};

/// Builds a [`DeclarationModel`] one declaration at a time.
#[derive(Debug, Default)]
pub struct ModelBuilder {
    model: DeclarationModel,
    package: Vec<String>,
    errors: Vec<ModelError>,
    next_line: u32,
}

impl ModelBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Package used for subsequently built toplevel declarations.
    pub fn package(mut self, dotted: &str) -> Self {
        self.package = dotted
            .split('.')
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();
        self
    }

    /// The id the next built declaration will receive.
    pub fn next_id(&self) -> DeclId {
        DeclId(NodeIndex::new(self.model.len()))
    }

    pub fn class(&mut self, name: &str) -> DeclBuilder<'_> {
        self.start(name, DeclKind::Class)
    }

    pub fn interface(&mut self, name: &str) -> DeclBuilder<'_> {
        self.start(name, DeclKind::Interface)
    }

    pub fn class_alias(&mut self, name: &str, aliased: TypeRef) -> DeclBuilder<'_> {
        self.start(name, DeclKind::ClassAlias).extends(aliased)
    }

    pub fn interface_alias(&mut self, name: &str, aliased: TypeRef) -> DeclBuilder<'_> {
        self.start(name, DeclKind::InterfaceAlias).extends(aliased)
    }

    pub fn type_alias(&mut self, name: &str, aliased: TypeRef) -> DeclBuilder<'_> {
        self.start(name, DeclKind::TypeAlias).returns(aliased)
    }

    pub fn function(&mut self, name: &str) -> DeclBuilder<'_> {
        self.start(name, DeclKind::Function)
    }

    pub fn value(&mut self, name: &str, ty: TypeRef) -> DeclBuilder<'_> {
        self.start(name, DeclKind::Value).returns(ty)
    }

    /// Mutate an already-built declaration.
    pub fn edit(&mut self, id: DeclId) -> Option<&mut Declaration> {
        self.model.get_mut(id).ok()
    }

    /// Finish building. Container errors are ignored; see `try_finish`.
    pub fn finish(self) -> DeclarationModel {
        self.model
    }

    /// Finish building, surfacing the first validation error.
    pub fn try_finish(mut self) -> Result<DeclarationModel, ModelError> {
        if self.errors.is_empty() {
            Ok(self.model)
        } else {
            Err(self.errors.swap_remove(0))
        }
    }

    fn start(&mut self, name: &str, kind: DeclKind) -> DeclBuilder<'_> {
        self.next_line += 1;
        let mut decl = Declaration::new(name, kind, Container::Package);
        decl.span = Span::new(self.next_line, 1, name.len() as u32);
        DeclBuilder {
            owner: self,
            decl,
        }
    }
}

/// Builder for one declaration; `build()` adds it to the model.
pub struct DeclBuilder<'b> {
    owner: &'b mut ModelBuilder,
    decl: Declaration,
}

impl<'b> DeclBuilder<'b> {
    pub fn member_of(mut self, container: DeclId) -> Self {
        self.decl.container = Container::Member(container);
        self
    }

    pub fn local_to(mut self, container: DeclId) -> Self {
        self.decl.container = Container::Local(container);
        self
    }

    pub fn modifiers(mut self, modifiers: Modifiers) -> Self {
        self.decl.modifiers |= modifiers;
        self
    }

    pub fn shared(self) -> Self {
        self.modifiers(Modifiers::SHARED)
    }

    pub fn formal(self) -> Self {
        self.modifiers(Modifiers::SHARED | Modifiers::FORMAL)
    }

    pub fn default_(self) -> Self {
        self.modifiers(Modifiers::SHARED | Modifiers::DEFAULT)
    }

    pub fn actual(self) -> Self {
        self.modifiers(Modifiers::SHARED | Modifiers::ACTUAL)
    }

    pub fn abstract_(self) -> Self {
        self.modifiers(Modifiers::ABSTRACT)
    }

    pub fn variable(self) -> Self {
        self.modifiers(Modifiers::VARIABLE)
    }

    pub fn transient(self) -> Self {
        self.modifiers(Modifiers::TRANSIENT)
    }

    pub fn type_param(mut self, name: &str) -> Self {
        self.decl.type_parameters.push(TypeParam::new(name));
        self
    }

    pub fn extends(mut self, ty: TypeRef) -> Self {
        self.decl.extended_type = Some(ty);
        self
    }

    pub fn satisfies(mut self, ty: TypeRef) -> Self {
        self.decl.satisfied_types.push(ty);
        self
    }

    pub fn case_type(mut self, ty: TypeRef) -> Self {
        self.decl.case_types.push(ty);
        self
    }

    /// Append a parameter to the last parameter list, opening the first one if needed.
    pub fn param(mut self, param: Parameter) -> Self {
        if self.decl.parameter_lists.is_empty() {
            self.decl.parameter_lists.push(Vec::new());
        }
        let line = self.decl.span.line;
        let index = self.decl.parameter_lists.iter().map(Vec::len).sum::<usize>() as u32;
        let param = if param.span == Span::default() {
            param.with_span(Span::new(line, 10 + index * 8, 1))
        } else {
            param
        };
        if let Some(list) = self.decl.parameter_lists.last_mut() {
            list.push(param);
        }
        self
    }

    /// Open a new (possibly empty) parameter list.
    pub fn param_list(mut self) -> Self {
        self.decl.parameter_lists.push(Vec::new());
        self
    }

    pub fn returns(mut self, ty: TypeRef) -> Self {
        self.decl.value_type = ty;
        self
    }

    pub fn captures(mut self, local: LocalRef) -> Self {
        self.decl.captured_locals.push(local);
        self
    }

    pub fn deferred(mut self) -> Self {
        self.decl.deferred = true;
        self
    }

    pub fn refines(mut self, refined: DeclId) -> Self {
        self.decl.refines = Some(refined);
        self
    }

    pub fn body(mut self, body: SourceBody) -> Self {
        self.decl.body = body;
        self
    }

    pub fn returning(self, expr: SourceExpr) -> Self {
        self.body(SourceBody::Expr(expr))
    }

    pub fn annotation(mut self, annotation: Annotation) -> Self {
        self.decl.annotations.push(annotation);
        self
    }

    pub fn erroneous(mut self) -> Self {
        self.decl.erroneous = true;
        self
    }

    pub fn span(mut self, span: Span) -> Self {
        self.decl.span = span;
        self
    }

    /// Add the declaration to the model.
    ///
    /// Class-like declarations always get a parameter list so constructors
    /// have something to lower. Invalid containers are recorded and the
    /// declaration is re-homed at package level.
    pub fn build(self) -> DeclId {
        let DeclBuilder { owner, mut decl } = self;
        if decl.kind.is_class() && decl.parameter_lists.is_empty() {
            decl.parameter_lists.push(Vec::new());
        }
        let package = owner.package.clone();
        match owner.model.add(decl.clone(), &package) {
            Ok(id) => id,
            Err(err) => {
                owner.errors.push(err);
                decl.container = Container::Package;
                match owner.model.add(decl, &package) {
                    Ok(id) => id,
                    Err(err) => {
                        owner.errors.push(err);
                        owner.next_id()
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_id_predicts_built_id() {
        let mut b = ModelBuilder::new();
        let predicted = b.next_id();
        let built = b.class("A").build();
        assert_eq!(predicted, built);
    }

    #[test]
    fn classes_always_have_a_parameter_list() {
        let mut b = ModelBuilder::new();
        let a = b.class("A").build();
        let model = b.finish();
        assert_eq!(model.decl(a).parameter_lists.len(), 1);
        assert!(model.decl(a).parameters().is_empty());
    }

    #[test]
    fn parameters_get_increasing_spans() {
        let mut b = ModelBuilder::new();
        let f = b
            .function("f")
            .param(Parameter::new("a", TypeRef::Object))
            .param(Parameter::new("b", TypeRef::Object))
            .build();
        let model = b.finish();
        let params = model.decl(f).parameters();
        assert!(params[0].span.precedes(&params[1].span));
    }

    #[test]
    fn invalid_container_surfaces_from_try_finish() {
        let mut b = ModelBuilder::new();
        let v = b.value("v", TypeRef::Object).build();
        b.function("f").member_of(v).build();
        assert!(matches!(
            b.try_finish(),
            Err(ModelError::InvalidContainer { .. })
        ));
    }

    #[test]
    fn shorthand_modifiers_imply_shared() {
        let mut b = ModelBuilder::new();
        let i = b.interface("I").shared().build();
        let m = b.function("m").member_of(i).default_().build();
        let n = b.function("n").member_of(i).formal().build();
        let model = b.finish();
        assert!(model.decl(m).is_shared() && model.decl(m).is_default());
        assert!(model.decl(n).is_shared() && model.decl(n).is_formal());
    }
}
