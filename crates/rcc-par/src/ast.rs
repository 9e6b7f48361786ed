//! AST node definitions.
//!
//! Closed tagged variants with per-variant payloads; exhaustive matching
//! downstream means an unhandled node shape is a compile error in the
//! compiler, not a runtime abort. Every expression carries `ty`, filled in
//! by elaboration before code generation; loop and switch statements carry
//! the break/continue label names the code generator will emit.
//!
//! Several surface forms never reach the AST: unary `+`/`-` fold to the
//! operand and `0 - x`, array subscripts become pointer arithmetic, and
//! `x++`/`x--` lower to `(x = x ± 1) ∓ 1` at parse time.

use rcc_util::Span;

use crate::types::TypeId;

/// Binary operators.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    BitAnd,
    BitOr,
    BitXor,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    LogAnd,
    LogOr,
}

/// Reference to a named variable, resolved at parse time.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum VarRef {
    /// Index into the enclosing function's locals (parameters included).
    Local(usize),
    /// Index into the program's globals.
    Global(usize),
}

/// A resolved struct member access: byte offset and member type.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MemberRef {
    pub offset: i32,
    pub ty: TypeId,
}

/// An expression node.
#[derive(Clone, Debug)]
pub struct Expr {
    pub kind: ExprKind,
    /// Resolved type; `None` only before elaboration.
    pub ty: Option<TypeId>,
    pub span: Span,
}

#[derive(Clone, Debug)]
pub enum ExprKind {
    Num(i64),
    Var(VarRef),
    Binary {
        op: BinOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Assign {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Comma {
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Cond {
        cond: Box<Expr>,
        then: Box<Expr>,
        els: Box<Expr>,
    },
    Cast {
        to: TypeId,
        operand: Box<Expr>,
    },
    Addr(Box<Expr>),
    Deref(Box<Expr>),
    LogNot(Box<Expr>),
    BitNot(Box<Expr>),
    Member {
        base: Box<Expr>,
        name: String,
        /// Filled by elaboration.
        resolved: Option<MemberRef>,
    },
    Call {
        name: String,
        args: Vec<Expr>,
    },
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self {
            kind,
            ty: None,
            span,
        }
    }

    pub fn num(value: i64, span: Span) -> Self {
        Self::new(ExprKind::Num(value), span)
    }

    pub fn binary(op: BinOp, lhs: Expr, rhs: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Binary {
                op,
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }

    pub fn assign(lhs: Expr, rhs: Expr, span: Span) -> Self {
        Self::new(
            ExprKind::Assign {
                lhs: Box::new(lhs),
                rhs: Box::new(rhs),
            },
            span,
        )
    }
}

/// A statement node.
#[derive(Clone, Debug)]
pub enum Stmt {
    Return {
        value: Option<Expr>,
    },
    Expr(Expr),
    /// Lone `;`.
    Null,
    If {
        cond: Expr,
        then: Box<Stmt>,
        els: Option<Box<Stmt>>,
    },
    While {
        cond: Expr,
        body: Box<Stmt>,
        brk_label: String,
        cont_label: String,
    },
    For {
        init: Option<Box<Stmt>>,
        cond: Option<Expr>,
        step: Option<Expr>,
        body: Box<Stmt>,
        brk_label: String,
        cont_label: String,
    },
    Block(Vec<Stmt>),
    Switch {
        cond: Expr,
        body: Box<Stmt>,
        brk_label: String,
    },
    /// `case k:` (value `Some(k)`) or `default:` (value `None`).
    Case {
        value: Option<i64>,
        body: Box<Stmt>,
    },
    Break {
        label: String,
    },
    Continue {
        label: String,
    },
}

/// A variable initializer.
#[derive(Clone, Debug)]
pub enum Initializer {
    /// `= expr`
    Expr(Box<Expr>),
    /// `= { e1, e2, … }` for arrays and structs, recursively.
    List(Vec<Initializer>),
    /// `= {0}`; relies on zero-filled storage, generates no stores.
    Zero,
}
