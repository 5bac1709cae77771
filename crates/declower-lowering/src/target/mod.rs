//! Target representation produced by lowering.
//!
//! The target object model only has single-inheritance classes, interfaces
//! without bodies, fixed-arity methods and erased generics. Emission to text
//! or bytes happens elsewhere; this module stops at the AST.

mod ast;
mod builder;

pub use ast::{
    ImplicitKind, LetBinding, MethodOrigin, TargetAnnotation, TargetConstructor, TargetExpr,
    TargetField, TargetKind, TargetLiteral, TargetMethod, TargetModifiers, TargetParam,
    TargetStmt, TargetType, TargetTypeDecl,
};
pub use builder::{TargetAstBuilder, TypeHandle};
