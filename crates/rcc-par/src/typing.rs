//! Type elaboration.
//!
//! A tree walk over function bodies that assigns a resolved type to every
//! expression node and resolves member accesses against their struct type.
//! Code generation relies on every expression having a type, so this pass
//! must run between parsing and lowering; the parser also invokes
//! [`TypeCtx::type_expr`] directly on `sizeof` operands.
//!
//! Rules:
//! - arithmetic, bitwise, and assignment nodes inherit the left operand's
//!   type; comparisons and logical nodes yield `int`
//! - `&x` yields pointer-to-`x` (arrays decay to pointer-to-element)
//! - `*p` yields the pointed-to (or element) type, `int` when the operand
//!   is not pointer-shaped
//! - `a.m`/`p->m` peel one pointer level off the operand, look the member
//!   up, and inherit its type; a missing member is fatal
//! - numbers, `sizeof`, and calls yield `int`

use crate::ast::{BinOp, Expr, ExprKind, MemberRef, Stmt};
use crate::error::SemError;
use crate::symbol::{Function, Global, Local, Program};
use crate::types::{TypeArena, TypeId, TypeKind};

/// Assign types throughout a parsed program.
pub fn elaborate(prog: &mut Program) -> Result<(), SemError> {
    let Program {
        types,
        functions,
        globals,
    } = prog;
    let globals: &[Global] = globals;

    for func in functions.iter_mut() {
        let Function { locals, body, .. } = func;
        if let Some(body) = body {
            let mut ctx = TypeCtx {
                types: &mut *types,
                locals,
                globals,
            };
            ctx.type_stmt(body)?;
        }
    }
    Ok(())
}

/// Borrowed view of everything the walk needs: the arena (mutably, to make
/// pointer types for `&`), and the symbol tables for variable references.
pub struct TypeCtx<'a> {
    pub types: &'a mut TypeArena,
    pub locals: &'a [Local],
    pub globals: &'a [Global],
}

impl TypeCtx<'_> {
    pub fn type_stmt(&mut self, stmt: &mut Stmt) -> Result<(), SemError> {
        match stmt {
            Stmt::Return { value } => {
                if let Some(e) = value {
                    self.type_expr(e)?;
                }
            }
            Stmt::Expr(e) => {
                self.type_expr(e)?;
            }
            Stmt::Null | Stmt::Break { .. } | Stmt::Continue { .. } => {}
            Stmt::If { cond, then, els } => {
                self.type_expr(cond)?;
                self.type_stmt(then)?;
                if let Some(els) = els {
                    self.type_stmt(els)?;
                }
            }
            Stmt::While { cond, body, .. } => {
                self.type_expr(cond)?;
                self.type_stmt(body)?;
            }
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => {
                if let Some(init) = init {
                    self.type_stmt(init)?;
                }
                if let Some(cond) = cond {
                    self.type_expr(cond)?;
                }
                if let Some(step) = step {
                    self.type_expr(step)?;
                }
                self.type_stmt(body)?;
            }
            Stmt::Block(stmts) => {
                for s in stmts {
                    self.type_stmt(s)?;
                }
            }
            Stmt::Switch { cond, body, .. } => {
                self.type_expr(cond)?;
                self.type_stmt(body)?;
            }
            Stmt::Case { body, .. } => {
                self.type_stmt(body)?;
            }
        }
        Ok(())
    }

    /// Assign and return the type of one expression (idempotent).
    pub fn type_expr(&mut self, e: &mut Expr) -> Result<TypeId, SemError> {
        if let Some(ty) = e.ty {
            return Ok(ty);
        }
        let span = e.span;

        let ty = match &mut e.kind {
            ExprKind::Num(_) => TypeArena::INT,

            ExprKind::Var(var) => match *var {
                crate::ast::VarRef::Local(i) => self.locals[i].ty,
                crate::ast::VarRef::Global(i) => self.globals[i].ty,
            },

            ExprKind::Binary { op, lhs, rhs } => {
                let lhs_ty = self.type_expr(lhs)?;
                self.type_expr(rhs)?;
                match op {
                    BinOp::Add
                    | BinOp::Sub
                    | BinOp::Mul
                    | BinOp::Div
                    | BinOp::Mod
                    | BinOp::BitAnd
                    | BinOp::BitOr
                    | BinOp::BitXor
                    | BinOp::Shl
                    | BinOp::Shr => lhs_ty,
                    BinOp::Eq
                    | BinOp::Ne
                    | BinOp::Lt
                    | BinOp::Le
                    | BinOp::Gt
                    | BinOp::Ge
                    | BinOp::LogAnd
                    | BinOp::LogOr => TypeArena::INT,
                }
            }

            ExprKind::Assign { lhs, rhs } => {
                let lhs_ty = self.type_expr(lhs)?;
                self.type_expr(rhs)?;
                lhs_ty
            }

            ExprKind::Comma { lhs, rhs } => {
                self.type_expr(lhs)?;
                self.type_expr(rhs)?
            }

            ExprKind::Cond { cond, then, els } => {
                self.type_expr(cond)?;
                let then_ty = self.type_expr(then)?;
                self.type_expr(els)?;
                then_ty
            }

            ExprKind::Cast { to, operand } => {
                self.type_expr(operand)?;
                *to
            }

            ExprKind::Addr(inner) => {
                let inner_ty = self.type_expr(inner)?;
                // Arrays decay: &arr is pointer-to-element.
                let pointee = match self.types.kind(inner_ty) {
                    TypeKind::Array { base, .. } => *base,
                    _ => inner_ty,
                };
                self.types.ptr_to(pointee)
            }

            ExprKind::Deref(inner) => {
                let inner_ty = self.type_expr(inner)?;
                self.types.base_of(inner_ty).unwrap_or(TypeArena::INT)
            }

            ExprKind::LogNot(inner) => {
                self.type_expr(inner)?;
                TypeArena::INT
            }

            ExprKind::BitNot(inner) => self.type_expr(inner)?,

            ExprKind::Member {
                base,
                name,
                resolved,
            } => {
                let base_ty = self.type_expr(base)?;
                // p->m arrives as (*p).m, but peel a pointer level anyway
                // for direct member access through a pointer value.
                let struct_ty = match self.types.kind(base_ty) {
                    TypeKind::Ptr(inner) => *inner,
                    _ => base_ty,
                };
                let TypeKind::Struct { members } = self.types.kind(struct_ty) else {
                    return Err(SemError::NotAStruct { span });
                };
                let Some(member) = members.iter().find(|m| m.name == *name) else {
                    return Err(SemError::MemberNotFound {
                        name: name.clone(),
                        span,
                    });
                };
                let mref = MemberRef {
                    offset: member.offset,
                    ty: member.ty,
                };
                *resolved = Some(mref);
                mref.ty
            }

            ExprKind::Call { args, .. } => {
                for arg in args {
                    self.type_expr(arg)?;
                }
                TypeArena::INT
            }
        };

        e.ty = Some(ty);
        Ok(ty)
    }
}
