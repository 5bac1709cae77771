//! Lowering driver.
//!
//! Walks the toplevel declarations of a unit in order and dispatches each to
//! the transformation for its kind. A failing declaration is reported and
//! dropped; lowering continues with the next one.

use declower_core::{LoweringError, QualifiedName};
use declower_model::{DeclId, DeclKind, DeclarationModel};
use tracing::{debug, info};

use crate::body::BodyLowering;
use crate::classes::{
    lower_class, lower_class_alias, lower_interface, lower_interface_alias, lower_type_alias,
    lower_wrapper,
};
use crate::context::LoweringContext;
use crate::diagnostics::{Diagnostic, LoweringStats};
use crate::naming::Naming;
use crate::options::LoweringOptions;
use crate::target::{TargetAstBuilder, TargetTypeDecl, TypeHandle};

/// Everything one lowering run produced.
#[derive(Debug, Default)]
pub struct LoweringOutput {
    /// Lowered types in toplevel declaration order. A toplevel interface is
    /// followed by its companion.
    pub declarations: Vec<TargetTypeDecl>,
    pub diagnostics: Vec<Diagnostic>,
    /// Toplevel declarations left out because of upstream errors.
    pub skipped: Vec<QualifiedName>,
    pub stats: LoweringStats,
}

impl LoweringOutput {
    pub fn has_errors(&self) -> bool {
        self.diagnostics.iter().any(Diagnostic::is_error)
    }

    /// Every lowered type, nested ones included, depth first.
    pub fn all_types(&self) -> impl Iterator<Item = &TargetTypeDecl> {
        self.declarations.iter().flat_map(TargetTypeDecl::walk)
    }

    /// A toplevel type by qualified name.
    pub fn find(&self, name: &str) -> Option<&TargetTypeDecl> {
        self.declarations.iter().find(|d| d.name.to_string() == name)
    }
}

/// Lowers every toplevel declaration of a model.
///
/// ```
/// use declower_lowering::Lowerer;
/// use declower_model::{ModelBuilder, Parameter, SourceExpr, TypeRef};
///
/// let mut b = ModelBuilder::new();
/// let pair = b.next_id();
/// b.class("Pair")
///     .shared()
///     .param(Parameter::new("x", TypeRef::basic("Integer")))
///     .param(Parameter::new("y", TypeRef::basic("Integer")).with_default(SourceExpr::param(pair, 0)))
///     .build();
/// let model = b.finish();
///
/// let output = Lowerer::new(&model).run();
/// let pair = output.find("Pair").unwrap();
/// assert_eq!(pair.constructors.len(), 2);
/// assert!(pair.methods_named("Pair$default$y").next().is_some());
/// ```
pub struct Lowerer<'m> {
    cx: LoweringContext<'m>,
    builder: TargetAstBuilder,
}

impl<'m> Lowerer<'m> {
    pub fn new(model: &'m DeclarationModel) -> Self {
        Self {
            cx: LoweringContext::new(model),
            builder: TargetAstBuilder::new(),
        }
    }

    pub fn with_options(mut self, options: LoweringOptions) -> Self {
        self.cx = self.cx.with_options(options);
        self
    }

    pub fn with_naming(mut self, naming: impl Naming + 'm) -> Self {
        self.cx = self.cx.with_naming(naming);
        self
    }

    pub fn with_body_lowering(mut self, bodies: impl BodyLowering + 'm) -> Self {
        self.cx = self.cx.with_body_lowering(bodies);
        self
    }

    pub fn context(&self) -> &LoweringContext<'m> {
        &self.cx
    }

    /// Lower the whole unit.
    #[cfg_attr(feature = "profiling", profiling::function)]
    pub fn run(mut self) -> LoweringOutput {
        let model = self.cx.model();
        let mut output = LoweringOutput::default();

        for &decl in model.toplevel() {
            let name = model.qualified_name(decl);
            if model.has_error_markers(decl) {
                debug!(target: "declower::lowering", declaration = %name, "skipping erroneous declaration");
                self.cx.report_skipped(decl);
                self.cx.bump(|s| s.declarations_skipped += 1);
                output.skipped.push(name);
                continue;
            }

            #[cfg(feature = "profiling")]
            profiling::scope!("lower_toplevel");

            let scope_depth = self.cx.scope_depth();
            match self.lower_toplevel(decl) {
                Ok(handle) => {
                    let built = self.builder.build(handle);
                    debug!(
                        target: "declower::lowering",
                        declaration = %name,
                        kind = ?model.decl(decl).kind,
                        types = built.iter().map(|t| t.walk().len()).sum::<usize>(),
                        "lowered"
                    );
                    self.cx.bump(|s| s.declarations_lowered += 1);
                    output.declarations.extend(built);
                }
                Err(err) => {
                    self.cx.report(&err, decl);
                    self.cx.bump(|s| s.declarations_skipped += 1);
                    output.skipped.push(name);
                }
            }
            debug_assert_eq!(self.cx.scope_depth(), scope_depth);
        }

        output.diagnostics = self.cx.take_diagnostics();
        output.stats = self.cx.stats();
        info!(
            target: "declower::lowering",
            lowered = output.stats.declarations_lowered,
            skipped = output.stats.declarations_skipped,
            diagnostics = output.diagnostics.len(),
            "unit lowered"
        );
        output
    }

    /// Lower one toplevel declaration. On failure nothing it started stays
    /// in the builder.
    fn lower_toplevel(&mut self, decl: DeclId) -> Result<TypeHandle, LoweringError> {
        let cx = &self.cx;
        let b = &mut self.builder;
        let first = b.next_handle();
        let result = match cx.model().get(decl)?.kind {
            DeclKind::Class => lower_class(cx, b, decl),
            DeclKind::Interface => match lower_interface(cx, b, decl) {
                Ok((surface, Some(companion))) => {
                    b.add_sibling(surface, companion);
                    Ok(surface)
                }
                Ok((surface, None)) => Ok(surface),
                Err(err) => Err(err),
            },
            DeclKind::ClassAlias => lower_class_alias(cx, b, decl),
            DeclKind::InterfaceAlias => lower_interface_alias(cx, b, decl),
            DeclKind::TypeAlias => lower_type_alias(cx, b, decl),
            DeclKind::Function | DeclKind::Value => lower_wrapper(cx, b, decl),
        };
        if result.is_err() {
            b.discard_from(first);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use declower_model::{ModelBuilder, Parameter, SourceExpr, TypeRef};

    use crate::diagnostics::DiagnosticKind;

    #[test]
    fn interface_is_followed_by_its_companion() {
        let mut b = ModelBuilder::new().package("greet");
        let i = b.interface("Greeter").shared().build();
        b.function("greet")
            .member_of(i)
            .shared()
            .default_()
            .returns(TypeRef::basic("String"))
            .returning(SourceExpr::string("hi"))
            .build();
        let model = b.finish();
        let output = Lowerer::new(&model).run();

        let names: Vec<String> = output.declarations.iter().map(|d| d.name.to_string()).collect();
        assert_eq!(names, vec!["greet.Greeter", "greet.Greeter$impl"]);
        assert_eq!(output.stats.declarations_lowered, 1);
        assert!(!output.has_errors());
    }

    #[test]
    fn erroneous_toplevel_is_skipped_and_others_still_lower() {
        let mut b = ModelBuilder::new();
        b.class("Broken").shared().erroneous().build();
        b.class("Fine").shared().build();
        let model = b.finish();
        let output = Lowerer::new(&model).run();

        assert_eq!(output.skipped, vec![QualifiedName::global("Broken")]);
        assert!(output.find("Fine").is_some());
        assert!(output.find("Broken").is_none());
        assert_eq!(output.diagnostics[0].kind, DiagnosticKind::SkippedErroneous);
        assert_eq!(output.stats.declarations_skipped, 1);
    }

    #[test]
    fn fatal_failure_drops_only_that_declaration() {
        let mut b = ModelBuilder::new();
        let bad = b.next_id();
        b.function("bad")
            .shared()
            .returns(TypeRef::basic("Integer"))
            .returning(SourceExpr::param(bad, 3))
            .build();
        b.function("good")
            .shared()
            .param(Parameter::new("n", TypeRef::basic("Integer")))
            .build();
        let model = b.finish();
        let output = Lowerer::new(&model).run();

        assert!(output.find("bad_").is_none());
        assert!(output.find("good_").is_some());
        assert_eq!(output.skipped, vec![QualifiedName::global("bad")]);
        assert_eq!(output.diagnostics.len(), 1);
        assert_eq!(output.diagnostics[0].kind, DiagnosticKind::Precondition);
        assert!(output.has_errors());
    }

    #[test]
    fn wrapper_holds_toplevel_value() {
        let mut b = ModelBuilder::new();
        b.value("answer", TypeRef::basic("Integer"))
            .shared()
            .returning(SourceExpr::int(42))
            .build();
        let model = b.finish();
        let output = Lowerer::new(&model)
            .with_options(LoweringOptions::default().with_model_annotations(false))
            .run();

        let wrapper = output.find("answer_").unwrap();
        assert!(wrapper.annotations.is_empty());
        assert!(wrapper.methods_named("getAnswer").next().is_some());
        assert_eq!(output.all_types().count(), 1);
    }
}
