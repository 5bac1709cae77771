//! Resolved declaration model consumed by the lowering core.
//!
//! The model is produced upstream (after type checking) and is read-only
//! during lowering. It answers the handful of questions lowering needs:
//! ownership and nesting, modifiers, parameter lists with their defaulted and
//! variadic flags, captured locals, type parameters, and the refinement and
//! satisfaction hierarchy.
//!
//! ```text
//!   Package ──► Class ──Member──► Function ──Local──► Class (local)
//!                 │                                     │
//!                 └─Member──► Interface                 └─Member──► Value
//! ```

mod body;
mod builder;
mod decl;
mod hierarchy;
mod model;
mod types;

pub use body::{Literal, Reference, SourceBody, SourceExpr, SourceStmt};
pub use builder::{DeclBuilder, ModelBuilder};
pub use decl::{
    Annotation, Container, DeclId, DeclKind, Declaration, LocalRef, ParamRef, Parameter,
};
pub use model::{DeclEdge, DeclarationModel};
pub use types::{TypeArgs, TypeParam, TypeParamRef, TypeRef, bind_type_args};
