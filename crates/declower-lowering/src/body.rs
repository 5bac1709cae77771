//! Source body and expression lowering.
//!
//! The declaration core only decides where a body or default expression ends
//! up and with which signature. Turning the expression itself into target
//! code is delegated to a [`BodyLowering`] service. [`DirectBodyLowering`]
//! is a straightforward structural mapping; references are rewritten through
//! the substitution stack, and calls to hoisted local functions receive their
//! capture prefix from the callee's [`CaptureEnvironment`](crate::CaptureEnvironment).

use declower_core::{LoweringError, Span};
use declower_model::{
    DeclKind, Literal, Reference, SourceBody, SourceExpr, SourceStmt,
};

use crate::context::{Host, LoweringContext};
use crate::naming::NameKind;
use crate::substitution::SubstKey;
use crate::target::{TargetExpr, TargetLiteral, TargetStmt};

/// Lowers expressions and statement bodies.
pub trait BodyLowering {
    fn lower_expr(
        &self,
        cx: &LoweringContext<'_>,
        expr: &SourceExpr,
    ) -> Result<TargetExpr, LoweringError>;

    /// Lower a body. An expression body becomes a `return` when
    /// `returns_value` is set and an expression statement otherwise.
    fn lower_body(
        &self,
        cx: &LoweringContext<'_>,
        body: &SourceBody,
        returns_value: bool,
    ) -> Result<Vec<TargetStmt>, LoweringError> {
        match body {
            SourceBody::None => Ok(Vec::new()),
            SourceBody::Expr(expr) => {
                let lowered = self.lower_expr(cx, expr)?;
                Ok(vec![if returns_value {
                    TargetStmt::Return(Some(lowered))
                } else {
                    TargetStmt::Expr(lowered)
                }])
            }
            SourceBody::Block(stmts) => {
                let mut out = Vec::with_capacity(stmts.len());
                for stmt in stmts {
                    if let Some(lowered) = self.lower_stmt(cx, stmt)? {
                        out.push(lowered);
                    }
                }
                Ok(out)
            }
        }
    }

    /// `None` for statements that leave nothing behind, such as the
    /// declaration site of a hoisted local function.
    fn lower_stmt(
        &self,
        cx: &LoweringContext<'_>,
        stmt: &SourceStmt,
    ) -> Result<Option<TargetStmt>, LoweringError> {
        Ok(Some(match stmt {
            SourceStmt::Expr(expr) => TargetStmt::Expr(self.lower_expr(cx, expr)?),
            SourceStmt::Return(expr) => TargetStmt::Return(match expr {
                Some(e) => Some(self.lower_expr(cx, e)?),
                None => None,
            }),
            SourceStmt::Declare(decl) => {
                let d = cx.model().get(*decl)?;
                if d.kind != DeclKind::Value || d.is_transient() {
                    return Ok(None);
                }
                let init = match &d.body {
                    SourceBody::Expr(expr) => Some(self.lower_expr(cx, expr)?),
                    _ => None,
                };
                TargetStmt::Local {
                    name: d.name.clone(),
                    ty: cx.target_type(&d.value_type),
                    init,
                }
            }
            SourceStmt::Assign { target, value } => {
                let value = self.lower_expr(cx, value)?;
                if let Reference::Decl(decl) = target
                    && cx.model().is_member(*decl)
                {
                    TargetStmt::Expr(TargetExpr::call(
                        None,
                        cx.name(*decl, NameKind::Setter),
                        vec![value],
                    ))
                } else {
                    TargetStmt::Expr(TargetExpr::Assign {
                        target: Box::new(self.lower_expr(cx, &SourceExpr::Ref(*target))?),
                        value: Box::new(value),
                    })
                }
            }
        }))
    }
}

/// Structural lowering with substitution-aware references.
#[derive(Debug, Default, Clone, Copy)]
pub struct DirectBodyLowering;

impl DirectBodyLowering {
    fn reference(
        &self,
        cx: &LoweringContext<'_>,
        reference: &Reference,
    ) -> Result<TargetExpr, LoweringError> {
        let model = cx.model();
        match reference {
            Reference::Param(p) => {
                if let Some(bound) = cx.resolve(SubstKey::Param(*p)) {
                    return Ok(bound);
                }
                Ok(TargetExpr::ident(model.parameter(*p)?.name.clone()))
            }
            Reference::This => Ok(cx.resolve(SubstKey::This).unwrap_or(TargetExpr::This)),
            Reference::Outer(decl) => Ok(cx
                .resolve(SubstKey::Outer(*decl))
                .unwrap_or_else(|| TargetExpr::OuterThis(cx.type_name(*decl).to_string()))),
            Reference::Decl(decl) => {
                if let Some(bound) = cx.resolve(SubstKey::Local(*decl)) {
                    return Ok(bound);
                }
                let d = model.get(*decl)?;
                if model.is_local(*decl) {
                    if d.kind == DeclKind::Value && d.is_transient() {
                        let env = cx.capture(*decl)?;
                        return Ok(TargetExpr::call(
                            None,
                            cx.name(*decl, NameKind::Getter),
                            env.arguments(cx),
                        ));
                    }
                    return Ok(TargetExpr::ident(d.name.clone()));
                }
                match d.kind {
                    DeclKind::Value => {
                        let target = match cx.host_of(*decl) {
                            Host::Wrapper(_) => Some(TargetExpr::TypeName(
                                cx.wrapper_name(*decl).to_string(),
                            )),
                            _ => None,
                        };
                        Ok(TargetExpr::call(target, cx.name(*decl, NameKind::Getter), Vec::new()))
                    }
                    _ => Ok(TargetExpr::ident(cx.name(*decl, NameKind::Member))),
                }
            }
        }
    }
}

impl BodyLowering for DirectBodyLowering {
    fn lower_expr(
        &self,
        cx: &LoweringContext<'_>,
        expr: &SourceExpr,
    ) -> Result<TargetExpr, LoweringError> {
        let model = cx.model();
        match expr {
            SourceExpr::Literal(lit) => Ok(TargetExpr::Literal(match lit {
                Literal::Integer(v) => TargetLiteral::Integer(*v),
                Literal::String(s) => TargetLiteral::String(s.clone()),
                Literal::Boolean(b) => TargetLiteral::Boolean(*b),
                Literal::Null => TargetLiteral::Null,
            })),
            SourceExpr::Ref(reference) => self.reference(cx, reference),
            SourceExpr::Invoke {
                callee,
                receiver,
                args,
            } => {
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower_expr(cx, arg)?);
                }
                let env = cx.capture(*callee)?;
                let method = cx.name(*callee, NameKind::Member);
                let target = match receiver {
                    Some(r) => Some(self.lower_expr(cx, r)?),
                    None if model.is_toplevel(*callee) => {
                        Some(TargetExpr::TypeName(cx.wrapper_name(*callee).to_string()))
                    }
                    None => None,
                };
                // Locals are hoisted with their full prefix; members are
                // reached through their receiver and only take descriptors.
                let mut full = if model.is_local(*callee) {
                    env.arguments(cx)
                } else {
                    env.surface().arguments(cx)
                };
                full.extend(lowered);
                Ok(TargetExpr::Call {
                    target: target.map(Box::new),
                    method,
                    args: full,
                })
            }
            SourceExpr::Instantiate { class, args } => {
                let mut lowered = Vec::with_capacity(args.len());
                for arg in args {
                    lowered.push(self.lower_expr(cx, arg)?);
                }
                let env = cx.capture(*class)?;
                let mut full = env.arguments(cx);
                full.extend(lowered);
                Ok(TargetExpr::New {
                    ty: cx.self_target_type(*class),
                    args: full,
                })
            }
            SourceExpr::Sequence(items) if items.is_empty() => Ok(TargetExpr::EmptySequence),
            SourceExpr::Sequence(items) => {
                let mut lowered = Vec::with_capacity(items.len());
                for item in items {
                    lowered.push(self.lower_expr(cx, item)?);
                }
                Ok(TargetExpr::Sequence(lowered))
            }
            SourceExpr::Reify(ty) => Ok(cx.descriptor(ty)),
            SourceExpr::Other { term, span } => Err(unsupported_term(term, *span)),
        }
    }
}

fn unsupported_term(term: &str, span: Span) -> LoweringError {
    LoweringError::unsupported(format!("no lowering for term `{term}`"), span)
}
