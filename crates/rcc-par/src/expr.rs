//! Expression parsing: the precedence climb, postfix rewrites, and the
//! small constant evaluator used for `case` labels.
//!
//! ```text
//! expr       := assign ("," assign)*
//! assign     := conditional ("=" assign)?
//! conditional:= log_or ("?" expr ":" conditional)?
//! log_or     := log_and ("||" log_and)*
//! log_and    := bit_or ("&&" bit_or)*
//! bit_or     := bit_xor ("|" bit_xor)*
//! bit_xor    := bit_and ("^" bit_and)*
//! bit_and    := equality ("&" equality)*
//! equality   := relational (("==" | "!=") relational)*
//! relational := shift (("<"|"<="|">"|">=") shift)*
//! shift      := add (("<<"|">>") add)*
//! add        := mul (("+"|"-") mul)*
//! mul        := unary (("*"|"/"|"%") unary)*
//! unary      := ("+"|"-"|"&"|"*"|"!"|"~"|"++"|"--") unary
//!             | "sizeof" ( "(" type ")" | unary )
//!             | "(" type ")" unary
//!             | postfix
//! postfix    := primary ( "[" expr "]" | "." ident | "->" ident
//!                       | "++" | "--" )*
//! primary    := "(" expr ")" | number | char-lit | string-lit
//!             | ident ("(" args? ")")?
//! ```

use rcc_lex::TokenKind;

use crate::ast::{BinOp, Expr, ExprKind, VarRef};
use crate::error::ParseError;
use crate::symbol::Global;
use crate::typing::TypeCtx;
use crate::Parser;

impl Parser {
    /// `expr := assign ("," assign)*`
    pub(crate) fn expr(&mut self) -> Result<Expr, ParseError> {
        let node = self.assign()?;
        if self.at(TokenKind::Comma) {
            let span = self.bump().span;
            let rhs = self.expr()?;
            return Ok(Expr::new(
                ExprKind::Comma {
                    lhs: Box::new(node),
                    rhs: Box::new(rhs),
                },
                span,
            ));
        }
        Ok(node)
    }

    /// `assign := conditional ("=" assign)?`
    pub(crate) fn assign(&mut self) -> Result<Expr, ParseError> {
        let node = self.conditional()?;
        if self.at(TokenKind::Eq) {
            let span = self.bump().span;
            let rhs = self.assign()?;
            return Ok(Expr::assign(node, rhs, span));
        }
        Ok(node)
    }

    fn conditional(&mut self) -> Result<Expr, ParseError> {
        let node = self.log_or()?;
        if self.at(TokenKind::Question) {
            let span = self.bump().span;
            let then = self.expr()?;
            self.expect(TokenKind::Colon, ":")?;
            let els = self.conditional()?;
            return Ok(Expr::new(
                ExprKind::Cond {
                    cond: Box::new(node),
                    then: Box::new(then),
                    els: Box::new(els),
                },
                span,
            ));
        }
        Ok(node)
    }

    fn log_or(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.log_and()?;
        while self.at(TokenKind::OrOr) {
            let span = self.bump().span;
            let rhs = self.log_and()?;
            node = Expr::binary(BinOp::LogOr, node, rhs, span);
        }
        Ok(node)
    }

    /// Bitwise `| ^ &` bind between `&&` and equality, as in C.
    fn log_and(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.bit_or()?;
        while self.at(TokenKind::AndAnd) {
            let span = self.bump().span;
            let rhs = self.bit_or()?;
            node = Expr::binary(BinOp::LogAnd, node, rhs, span);
        }
        Ok(node)
    }

    fn bit_or(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.bit_xor()?;
        while self.at(TokenKind::Pipe) {
            let span = self.bump().span;
            let rhs = self.bit_xor()?;
            node = Expr::binary(BinOp::BitOr, node, rhs, span);
        }
        Ok(node)
    }

    fn bit_xor(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.bit_and()?;
        while self.at(TokenKind::Caret) {
            let span = self.bump().span;
            let rhs = self.bit_and()?;
            node = Expr::binary(BinOp::BitXor, node, rhs, span);
        }
        Ok(node)
    }

    fn bit_and(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.equality()?;
        while self.at(TokenKind::Ampersand) {
            let span = self.bump().span;
            let rhs = self.equality()?;
            node = Expr::binary(BinOp::BitAnd, node, rhs, span);
        }
        Ok(node)
    }

    fn equality(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.relational()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::EqEq => BinOp::Eq,
                TokenKind::NotEq => BinOp::Ne,
                _ => return Ok(node),
            };
            let span = self.bump().span;
            let rhs = self.relational()?;
            node = Expr::binary(op, node, rhs, span);
        }
    }

    fn relational(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.shift()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Lt => BinOp::Lt,
                TokenKind::LtEq => BinOp::Le,
                TokenKind::Gt => BinOp::Gt,
                TokenKind::GtEq => BinOp::Ge,
                _ => return Ok(node),
            };
            let span = self.bump().span;
            let rhs = self.shift()?;
            node = Expr::binary(op, node, rhs, span);
        }
    }

    fn shift(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.add()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Shl => BinOp::Shl,
                TokenKind::Shr => BinOp::Shr,
                _ => return Ok(node),
            };
            let span = self.bump().span;
            let rhs = self.add()?;
            node = Expr::binary(op, node, rhs, span);
        }
    }

    fn add(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.mul()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Plus => BinOp::Add,
                TokenKind::Minus => BinOp::Sub,
                _ => return Ok(node),
            };
            let span = self.bump().span;
            let rhs = self.mul()?;
            node = Expr::binary(op, node, rhs, span);
        }
    }

    fn mul(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.unary()?;
        loop {
            let op = match self.peek().kind {
                TokenKind::Star => BinOp::Mul,
                TokenKind::Slash => BinOp::Div,
                TokenKind::Percent => BinOp::Mod,
                _ => return Ok(node),
            };
            let span = self.bump().span;
            let rhs = self.unary()?;
            node = Expr::binary(op, node, rhs, span);
        }
    }

    fn unary(&mut self) -> Result<Expr, ParseError> {
        match self.peek().kind {
            TokenKind::Plus => {
                self.bump();
                self.unary()
            }
            TokenKind::Minus => {
                // -x lowers to 0 - x
                let span = self.bump().span;
                let operand = self.unary()?;
                Ok(Expr::binary(BinOp::Sub, Expr::num(0, span), operand, span))
            }
            TokenKind::Ampersand => {
                let span = self.bump().span;
                let operand = self.unary()?;
                Ok(Expr::new(ExprKind::Addr(Box::new(operand)), span))
            }
            TokenKind::Star => {
                let span = self.bump().span;
                let operand = self.unary()?;
                Ok(Expr::new(ExprKind::Deref(Box::new(operand)), span))
            }
            TokenKind::Not => {
                let span = self.bump().span;
                let operand = self.unary()?;
                Ok(Expr::new(ExprKind::LogNot(Box::new(operand)), span))
            }
            TokenKind::Tilde => {
                let span = self.bump().span;
                let operand = self.unary()?;
                Ok(Expr::new(ExprKind::BitNot(Box::new(operand)), span))
            }
            TokenKind::PlusPlus => {
                // ++x lowers to x = x + 1
                let span = self.bump().span;
                let operand = self.unary()?;
                let inc = Expr::binary(BinOp::Add, operand.clone(), Expr::num(1, span), span);
                Ok(Expr::assign(operand, inc, span))
            }
            TokenKind::MinusMinus => {
                // --x lowers to x = x - 1
                let span = self.bump().span;
                let operand = self.unary()?;
                let dec = Expr::binary(BinOp::Sub, operand.clone(), Expr::num(1, span), span);
                Ok(Expr::assign(operand, dec, span))
            }
            TokenKind::Sizeof => self.sizeof_expr(),
            TokenKind::LParen if self.is_typename(self.peek_ahead(1)) => {
                // Cast: (type) unary
                let span = self.bump().span;
                let spec = self.declspec()?;
                let to = self.declarator(spec.ty)?;
                self.expect(TokenKind::RParen, ")")?;
                let operand = self.unary()?;
                Ok(Expr::new(
                    ExprKind::Cast {
                        to,
                        operand: Box::new(operand),
                    },
                    span,
                ))
            }
            _ => self.postfix(),
        }
    }

    /// Both `sizeof` forms yield a compile-time integer constant.
    fn sizeof_expr(&mut self) -> Result<Expr, ParseError> {
        let span = self.bump().span;

        if self.at(TokenKind::LParen) && self.is_typename(self.peek_ahead(1)) {
            self.bump();
            let spec = self.declspec()?;
            let ty = self.declarator(spec.ty)?;
            self.expect(TokenKind::RParen, ")")?;
            return Ok(Expr::num(i64::from(self.types.size_of(ty)), span));
        }

        let mut operand = self.unary()?;
        let ty = {
            let mut ctx = TypeCtx {
                types: &mut self.types,
                locals: &self.locals,
                globals: &self.globals,
            };
            ctx.type_expr(&mut operand)?
        };
        Ok(Expr::num(i64::from(self.types.size_of(ty)), span))
    }

    fn postfix(&mut self) -> Result<Expr, ParseError> {
        let mut node = self.primary()?;

        loop {
            match self.peek().kind {
                TokenKind::LBracket => {
                    // a[i] desugars to *(a + i); the generator scales the
                    // index by the element size.
                    let span = self.bump().span;
                    let idx = self.expr()?;
                    self.expect(TokenKind::RBracket, "]")?;
                    let sum = Expr::binary(BinOp::Add, node, idx, span);
                    node = Expr::new(ExprKind::Deref(Box::new(sum)), span);
                }
                TokenKind::Dot => {
                    let span = self.bump().span;
                    let name = self.expect_ident("member")?;
                    node = Expr::new(
                        ExprKind::Member {
                            base: Box::new(node),
                            name: name.lexeme,
                            resolved: None,
                        },
                        span,
                    );
                }
                TokenKind::Arrow => {
                    // p->m is (*p).m
                    let span = self.bump().span;
                    let name = self.expect_ident("member")?;
                    let deref = Expr::new(ExprKind::Deref(Box::new(node)), span);
                    node = Expr::new(
                        ExprKind::Member {
                            base: Box::new(deref),
                            name: name.lexeme,
                            resolved: None,
                        },
                        span,
                    );
                }
                TokenKind::PlusPlus => {
                    // x++ lowers to (x = x + 1) - 1
                    let span = self.bump().span;
                    let inc = Expr::binary(BinOp::Add, node.clone(), Expr::num(1, span), span);
                    let assign = Expr::assign(node, inc, span);
                    node = Expr::binary(BinOp::Sub, assign, Expr::num(1, span), span);
                }
                TokenKind::MinusMinus => {
                    // x-- lowers to (x = x - 1) + 1
                    let span = self.bump().span;
                    let dec = Expr::binary(BinOp::Sub, node.clone(), Expr::num(1, span), span);
                    let assign = Expr::assign(node, dec, span);
                    node = Expr::binary(BinOp::Add, assign, Expr::num(1, span), span);
                }
                _ => return Ok(node),
            }
        }
    }

    fn primary(&mut self) -> Result<Expr, ParseError> {
        let tok = self.peek().clone();
        match tok.kind {
            TokenKind::LParen => {
                self.bump();
                let node = self.expr()?;
                self.expect(TokenKind::RParen, ")")?;
                Ok(node)
            }
            TokenKind::Number | TokenKind::CharLit => {
                self.bump();
                Ok(Expr::num(tok.value, tok.span))
            }
            TokenKind::Str => {
                self.bump();
                let bytes = tok.bytes.unwrap_or_default();
                let label = self.fresh_string_label();
                let ty = self
                    .types
                    .array_of(crate::TypeArena::CHAR, bytes.len() as i64 + 1);
                let idx = self.globals.len();
                self.globals.push(Global {
                    name: label,
                    ty,
                    init: None,
                    str_bytes: Some(bytes),
                    is_static: false,
                    is_extern: false,
                });
                Ok(Expr::new(ExprKind::Var(VarRef::Global(idx)), tok.span))
            }
            TokenKind::Ident => {
                if self.peek_ahead(1).kind == TokenKind::LParen {
                    return self.call(tok.lexeme, tok.span);
                }
                self.bump();
                if let Some(var) = self.find_var(&tok.lexeme) {
                    return Ok(Expr::new(ExprKind::Var(var), tok.span));
                }
                if let Some(&value) = self.enum_consts.get(&tok.lexeme) {
                    return Ok(Expr::num(value, tok.span));
                }
                Err(ParseError::UndefinedVariable {
                    name: tok.lexeme,
                    span: tok.span,
                })
            }
            _ => Err(ParseError::ExpectedExpression { span: tok.span }),
        }
    }

    fn call(&mut self, name: String, span: rcc_util::Span) -> Result<Expr, ParseError> {
        self.bump(); // identifier
        self.bump(); // '('
        let mut args = Vec::new();
        while !self.at(TokenKind::RParen) {
            if !args.is_empty() {
                self.expect(TokenKind::Comma, ",")?;
            }
            args.push(self.assign()?);
        }
        self.expect(TokenKind::RParen, ")")?;
        Ok(Expr::new(ExprKind::Call { name, args }, span))
    }

    /// Resolve a name against the current locals, then the globals. The
    /// most recent binding wins, so same-scope redeclaration overrides.
    fn find_var(&self, name: &str) -> Option<VarRef> {
        if let Some(i) = self.locals.iter().rposition(|l| l.name == name) {
            return Some(VarRef::Local(i));
        }
        if let Some(i) = self.globals.iter().rposition(|g| g.name == name) {
            return Some(VarRef::Global(i));
        }
        None
    }

    /// Parse an expression and require it to fold to a constant.
    pub(crate) fn const_expr(&mut self) -> Result<i64, ParseError> {
        let node = self.expr()?;
        eval_const(&node)
    }
}

/// Constant folding for `case` labels and enum references: numbers and the
/// four arithmetic operators. Enum constants were already folded to
/// numbers by `primary`.
pub(crate) fn eval_const(node: &Expr) -> Result<i64, ParseError> {
    match &node.kind {
        ExprKind::Num(value) => Ok(*value),
        ExprKind::Binary { op, lhs, rhs } => {
            let l = eval_const(lhs)?;
            let r = eval_const(rhs)?;
            match op {
                BinOp::Add => Ok(l.wrapping_add(r)),
                BinOp::Sub => Ok(l.wrapping_sub(r)),
                BinOp::Mul => Ok(l.wrapping_mul(r)),
                BinOp::Div => l
                    .checked_div(r)
                    .ok_or(ParseError::NotConstant { span: node.span }),
                _ => Err(ParseError::NotConstant { span: node.span }),
            }
        }
        _ => Err(ParseError::NotConstant { span: node.span }),
    }
}
