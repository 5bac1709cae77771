//! Declaration lowering.
//!
//! Rewrites a resolved declaration model (mixin interfaces with concrete
//! members, defaulted and variadic parameters, nested and local
//! declarations, reified generics) into a target object model that only has
//! single-inheritance classes, abstract interfaces, fixed-arity methods and
//! erased generics.
//!
//! ## Architecture
//!
//! ```text
//! DeclarationModel ──► Lowerer ──► classes ──┬─► members ──► dao
//!                                            ├─► initializer ──► dao
//!                                            └─► companion ──► dao
//!                          │
//!                          ▼
//!                  TargetAstBuilder ──► Vec<TargetTypeDecl>
//! ```
//!
//! ## Modules
//!
//! - [`driver`]: per-unit walk over toplevel declarations
//! - [`classes`]: class, interface, alias and wrapper transformation
//! - [`members`]: methods, attributes, hoisted locals and `main`
//! - [`initializer`]: constructors, instantiators and alias placeholders
//! - [`dao`]: defaulted-argument overloads and default-value methods
//! - [`companion`]: mixin delegation to interface companions
//! - [`capture`]: implicit parameter prefixes for captures and reification
//! - [`strategy`]: predicates deciding what gets synthesized where
//! - [`context`]: naming, substitution, diagnostics and type mapping
//! - [`target`]: the target AST and its builder

mod body;
pub mod capture;
pub mod classes;
pub mod companion;
mod context;
pub mod dao;
mod diagnostics;
pub mod driver;
pub mod initializer;
pub mod members;
mod naming;
mod options;
pub mod strategy;
mod substitution;
pub mod target;

pub use body::{BodyLowering, DirectBodyLowering};
pub use capture::{CaptureEnvironment, ImplicitParam};
pub use context::{Host, LoweringContext, ScopeGuard};
pub use diagnostics::{Diagnostic, DiagnosticKind, LoweringStats, Severity};
pub use driver::{Lowerer, LoweringOutput};
pub use naming::{DefaultNaming, NameKind, Naming};
pub use options::LoweringOptions;
pub use substitution::SubstKey;
pub use target::{
    ImplicitKind, LetBinding, MethodOrigin, TargetAnnotation, TargetAstBuilder,
    TargetConstructor, TargetExpr, TargetField, TargetKind, TargetLiteral, TargetMethod,
    TargetModifiers, TargetParam, TargetStmt, TargetType, TargetTypeDecl, TypeHandle,
};

// Re-export the error type from core for convenience
pub use declower_core::LoweringError;
