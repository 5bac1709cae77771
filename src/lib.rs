//! declower
//!
//! Lowers declarations of a language with mixin interfaces, defaulted and
//! variadic parameters, nested and local declarations and reified generics
//! into a target object model with single inheritance, abstract interfaces,
//! fixed-arity methods and erased generics.
//!
//! The workspace is split the same way the pipeline is:
//!
//! - [`core`]: spans, qualified names, modifiers, errors
//! - [`model`]: the resolved declaration model consumed by lowering
//! - [`lowering`]: the lowering passes and the target AST they produce
//!
//! ```
//! use declower::prelude::*;
//!
//! let mut b = ModelBuilder::new().package("demo");
//! let greeter = b.interface("Greeter").shared().build();
//! b.function("greet")
//!     .member_of(greeter)
//!     .shared()
//!     .default_()
//!     .returns(TypeRef::basic("String"))
//!     .returning(SourceExpr::string("hello"))
//!     .build();
//! b.class("English").shared().satisfies(TypeRef::named(greeter)).build();
//! let model = b.finish();
//!
//! let output = declower::lower_unit(&model, LoweringOptions::default());
//! let english = output.find("demo.English").unwrap();
//! assert!(english.field("$demo$Greeter$impl").is_some());
//! assert!(english.methods_named("greet").next().is_some());
//! ```

pub use declower_core as core;
pub use declower_lowering as lowering;
pub use declower_model as model;

use declower_lowering::{Lowerer, LoweringOptions, LoweringOutput};
use declower_model::DeclarationModel;

pub mod prelude {
    pub use declower_core::{LoweringError, Modifiers, QualifiedName, Span};
    pub use declower_lowering::{
        Diagnostic, DiagnosticKind, Lowerer, LoweringOptions, LoweringOutput, LoweringStats,
        MethodOrigin, TargetExpr, TargetKind, TargetMethod, TargetModifiers, TargetStmt,
        TargetType, TargetTypeDecl,
    };
    pub use declower_model::{
        DeclId, DeclKind, DeclarationModel, LocalRef, ModelBuilder, Parameter, SourceBody,
        SourceExpr, TypeRef,
    };
}

/// Lower every toplevel declaration of `model` with the default naming and
/// body lowering.
#[cfg_attr(feature = "profiling", profiling::function)]
pub fn lower_unit(model: &DeclarationModel, options: LoweringOptions) -> LoweringOutput {
    let span = tracing::info_span!("lower_unit", declarations = model.toplevel().len());
    let _enter = span.enter();
    Lowerer::new(model).with_options(options).run()
}
