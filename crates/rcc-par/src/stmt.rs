//! Statement parsing: control flow, compound statements, declarations, and
//! initializers.
//!
//! Loop and switch statements allocate their break/continue label names
//! here and stash them on the node; the code generator only ever emits
//! labels the parser handed it. The current labels are saved and restored
//! around nested bodies.

use rcc_lex::TokenKind;

use crate::ast::{BinOp, Expr, ExprKind, Initializer, Stmt, VarRef};
use crate::error::ParseError;
use crate::symbol::Local;
use crate::types::{TypeId, TypeKind};
use crate::Parser;

impl Parser {
    pub(crate) fn stmt(&mut self) -> Result<Stmt, ParseError> {
        match self.peek().kind {
            TokenKind::Return => {
                self.bump();
                let value = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(TokenKind::Semicolon, ";")?;
                Ok(Stmt::Return { value })
            }

            TokenKind::If => {
                self.bump();
                self.expect(TokenKind::LParen, "(")?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen, ")")?;
                let then = Box::new(self.stmt()?);
                let els = if self.eat(TokenKind::Else) {
                    Some(Box::new(self.stmt()?))
                } else {
                    None
                };
                Ok(Stmt::If { cond, then, els })
            }

            TokenKind::While => {
                self.bump();
                self.expect(TokenKind::LParen, "(")?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen, ")")?;

                let n = self.while_count;
                self.while_count += 1;
                let brk_label = format!(".L.while.brk.{}", n);
                let cont_label = format!(".L.while.cont.{}", n);

                let old_brk = self.brk_label.replace(brk_label.clone());
                let old_cont = self.cont_label.replace(cont_label.clone());
                let body = Box::new(self.stmt()?);
                self.brk_label = old_brk;
                self.cont_label = old_cont;

                Ok(Stmt::While {
                    cond,
                    body,
                    brk_label,
                    cont_label,
                })
            }

            TokenKind::For => {
                self.bump();
                self.expect(TokenKind::LParen, "(")?;

                let init = if self.eat(TokenKind::Semicolon) {
                    None
                } else if self.is_decl_start() {
                    // C99-style declaration in the for header
                    let mut stmts = Vec::new();
                    self.declaration(&mut stmts)?;
                    Some(Box::new(Stmt::Block(stmts)))
                } else {
                    Some(Box::new(self.expr_stmt()?))
                };

                let cond = if self.at(TokenKind::Semicolon) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(TokenKind::Semicolon, ";")?;

                let step = if self.at(TokenKind::RParen) {
                    None
                } else {
                    Some(self.expr()?)
                };
                self.expect(TokenKind::RParen, ")")?;

                let n = self.for_count;
                self.for_count += 1;
                let brk_label = format!(".L.for.brk.{}", n);
                let cont_label = format!(".L.for.cont.{}", n);

                let old_brk = self.brk_label.replace(brk_label.clone());
                let old_cont = self.cont_label.replace(cont_label.clone());
                let body = Box::new(self.stmt()?);
                self.brk_label = old_brk;
                self.cont_label = old_cont;

                Ok(Stmt::For {
                    init,
                    cond,
                    step,
                    body,
                    brk_label,
                    cont_label,
                })
            }

            TokenKind::Switch => {
                self.bump();
                self.expect(TokenKind::LParen, "(")?;
                let cond = self.expr()?;
                self.expect(TokenKind::RParen, ")")?;

                let n = self.switch_count;
                self.switch_count += 1;
                let brk_label = format!(".L.switch.brk.{}", n);

                // Only the break label changes; continue still targets the
                // enclosing loop.
                let old_brk = self.brk_label.replace(brk_label.clone());
                let body = Box::new(self.stmt()?);
                self.brk_label = old_brk;

                Ok(Stmt::Switch {
                    cond,
                    body,
                    brk_label,
                })
            }

            TokenKind::Case => {
                self.bump();
                let value = self.const_expr()?;
                self.expect(TokenKind::Colon, ":")?;
                let body = Box::new(self.stmt()?);
                Ok(Stmt::Case {
                    value: Some(value),
                    body,
                })
            }

            TokenKind::Default => {
                self.bump();
                self.expect(TokenKind::Colon, ":")?;
                let body = Box::new(self.stmt()?);
                Ok(Stmt::Case { value: None, body })
            }

            TokenKind::Break => {
                let span = self.bump().span;
                self.expect(TokenKind::Semicolon, ";")?;
                match &self.brk_label {
                    Some(label) => Ok(Stmt::Break {
                        label: label.clone(),
                    }),
                    None => Err(ParseError::StrayJump {
                        keyword: "break",
                        span,
                    }),
                }
            }

            TokenKind::Continue => {
                let span = self.bump().span;
                self.expect(TokenKind::Semicolon, ";")?;
                match &self.cont_label {
                    Some(label) => Ok(Stmt::Continue {
                        label: label.clone(),
                    }),
                    None => Err(ParseError::StrayJump {
                        keyword: "continue",
                        span,
                    }),
                }
            }

            TokenKind::LBrace => self.compound_stmt(),

            _ => self.expr_stmt(),
        }
    }

    fn expr_stmt(&mut self) -> Result<Stmt, ParseError> {
        if self.eat(TokenKind::Semicolon) {
            return Ok(Stmt::Null);
        }
        let e = self.expr()?;
        self.expect(TokenKind::Semicolon, ";")?;
        Ok(Stmt::Expr(e))
    }

    /// `{ (declaration | stmt)* }`
    pub(crate) fn compound_stmt(&mut self) -> Result<Stmt, ParseError> {
        self.expect(TokenKind::LBrace, "{")?;
        let mut stmts = Vec::new();
        while !self.at(TokenKind::RBrace) {
            if self.at(TokenKind::Eof) {
                return Err(ParseError::Expected {
                    expected: "}",
                    span: self.span(),
                });
            }
            if self.is_decl_start() {
                self.declaration(&mut stmts)?;
            } else {
                stmts.push(self.stmt()?);
            }
        }
        self.bump();
        Ok(Stmt::Block(stmts))
    }

    /// Whether the current token begins a declaration.
    pub(crate) fn is_decl_start(&self) -> bool {
        match self.peek().kind {
            TokenKind::Int
            | TokenKind::Char
            | TokenKind::Void
            | TokenKind::Typedef
            | TokenKind::Static
            | TokenKind::Extern
            | TokenKind::Const
            | TokenKind::Enum
            | TokenKind::Struct => true,
            TokenKind::Ident => self.typedefs.contains_key(&self.peek().lexeme),
            _ => false,
        }
    }

    /// Parse one block-scope declaration, appending any initializer stores
    /// to `out`.
    pub(crate) fn declaration(&mut self, out: &mut Vec<Stmt>) -> Result<(), ParseError> {
        let spec = self.declspec()?;

        // Block-scope typedef: unusual but legal.
        if spec.is_typedef {
            let ty = self.declarator(spec.ty)?;
            let name = self.expect_ident("typedef")?;
            self.typedefs.insert(name.lexeme, ty);
            self.expect(TokenKind::Semicolon, ";")?;
            return Ok(());
        }

        let mut first = true;
        while !self.at(TokenKind::Semicolon) {
            if !first {
                self.expect(TokenKind::Comma, ",")?;
            }
            first = false;

            let mut ty = self.declarator(spec.ty)?;
            let name = self.expect_ident("variable")?;
            ty = self.declarator_suffix(ty)?;

            let idx = self.locals.len();
            self.locals.push(Local {
                name: name.lexeme,
                ty,
            });

            if self.eat(TokenKind::Eq) {
                let init = self.initializer(ty)?;
                let var = Expr::new(ExprKind::Var(VarRef::Local(idx)), name.span);
                self.push_init_stores(out, var, &init, ty);
            }
        }
        self.expect(TokenKind::Semicolon, ";")?;
        Ok(())
    }

    /// Parse an initializer for a variable of type `ty`.
    pub(crate) fn initializer(&mut self, ty: TypeId) -> Result<Initializer, ParseError> {
        if !self.eat(TokenKind::LBrace) {
            return Ok(Initializer::Expr(Box::new(self.assign()?)));
        }

        // {0} relies on zero-filled storage and generates nothing.
        if self.at(TokenKind::Number)
            && self.peek().value == 0
            && self.peek_ahead(1).kind == TokenKind::RBrace
        {
            self.bump();
            self.bump();
            return Ok(Initializer::Zero);
        }

        match self.types.kind(ty).clone() {
            TypeKind::Array { base, .. } => {
                let mut children = Vec::new();
                while !self.at(TokenKind::RBrace) {
                    if !children.is_empty() {
                        self.expect(TokenKind::Comma, ",")?;
                        if self.at(TokenKind::RBrace) {
                            break; // trailing comma
                        }
                    }
                    children.push(self.initializer(base)?);
                }
                self.expect(TokenKind::RBrace, "}")?;
                Ok(Initializer::List(children))
            }

            TypeKind::Struct { members } => {
                let mut children = Vec::new();
                while !self.at(TokenKind::RBrace) && children.len() < members.len() {
                    if !children.is_empty() {
                        self.expect(TokenKind::Comma, ",")?;
                        if self.at(TokenKind::RBrace) {
                            break;
                        }
                    }
                    let mem_ty = members[children.len()].ty;
                    children.push(self.initializer(mem_ty)?);
                }
                self.expect(TokenKind::RBrace, "}")?;
                Ok(Initializer::List(children))
            }

            TypeKind::Int | TypeKind::Char | TypeKind::Enum | TypeKind::Ptr(_) => {
                // A scalar in braces: one value, optional trailing comma.
                let e = self.assign()?;
                self.eat(TokenKind::Comma);
                self.expect(TokenKind::RBrace, "}")?;
                Ok(Initializer::Expr(Box::new(e)))
            }

            TypeKind::Void | TypeKind::Func { .. } => Err(ParseError::UnsupportedInitializer {
                span: self.span(),
            }),
        }
    }

    /// Lower an initializer into assignment statements against `var`.
    pub(crate) fn push_init_stores(
        &mut self,
        out: &mut Vec<Stmt>,
        var: Expr,
        init: &Initializer,
        ty: TypeId,
    ) {
        match init {
            Initializer::Zero => {}
            Initializer::Expr(e) => {
                let span = var.span;
                out.push(Stmt::Expr(Expr::assign(var, (**e).clone(), span)));
            }
            Initializer::List(children) => match self.types.kind(ty).clone() {
                TypeKind::Array { base, .. } => {
                    for (i, child) in children.iter().enumerate() {
                        let span = var.span;
                        // var[i], spelled as *(&var + i); the add scales by
                        // the element size because &var has pointer type.
                        let addr = Expr::new(ExprKind::Addr(Box::new(var.clone())), span);
                        let sum = Expr::binary(BinOp::Add, addr, Expr::num(i as i64, span), span);
                        let elem = Expr::new(ExprKind::Deref(Box::new(sum)), span);
                        self.push_init_stores(out, elem, child, base);
                    }
                }
                TypeKind::Struct { members } => {
                    for (child, member) in children.iter().zip(members.iter()) {
                        let span = var.span;
                        let access = Expr::new(
                            ExprKind::Member {
                                base: Box::new(var.clone()),
                                name: member.name.clone(),
                                resolved: None,
                            },
                            span,
                        );
                        self.push_init_stores(out, access, child, member.ty);
                    }
                }
                // The initializer parser only builds lists for aggregates.
                _ => {}
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Program;
    use rcc_util::FileId;

    fn parse_src(src: &str) -> Program {
        let tokens = rcc_lex::tokenize(src, FileId(0)).unwrap();
        crate::parse(tokens).unwrap()
    }

    fn main_stmts(prog: &Program) -> &Vec<Stmt> {
        let f = prog.functions.iter().find(|f| f.name == "main").unwrap();
        match f.body.as_ref().unwrap() {
            Stmt::Block(stmts) => stmts,
            other => panic!("expected block, got {:?}", other),
        }
    }

    #[test]
    fn test_while_labels() {
        let prog = parse_src("int main() { while (1) { break; } return 0; }");
        match &main_stmts(&prog)[0] {
            Stmt::While {
                brk_label,
                cont_label,
                body,
                ..
            } => {
                assert_eq!(brk_label, ".L.while.brk.0");
                assert_eq!(cont_label, ".L.while.cont.0");
                match &**body {
                    Stmt::Block(inner) => match &inner[0] {
                        Stmt::Break { label } => assert_eq!(label, ".L.while.brk.0"),
                        other => panic!("expected break, got {:?}", other),
                    },
                    other => panic!("expected block, got {:?}", other),
                }
            }
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_nested_loops_restore_labels() {
        let prog = parse_src(
            "int main() { while (1) { while (1) { continue; } break; } return 0; }",
        );
        match &main_stmts(&prog)[0] {
            Stmt::While { body, .. } => match &**body {
                Stmt::Block(outer) => {
                    match &outer[0] {
                        Stmt::While { body, .. } => match &**body {
                            Stmt::Block(inner) => match &inner[0] {
                                Stmt::Continue { label } => {
                                    assert_eq!(label, ".L.while.cont.1")
                                }
                                other => panic!("expected continue, got {:?}", other),
                            },
                            other => panic!("expected block, got {:?}", other),
                        },
                        other => panic!("expected inner while, got {:?}", other),
                    }
                    match &outer[1] {
                        Stmt::Break { label } => assert_eq!(label, ".L.while.brk.0"),
                        other => panic!("expected break, got {:?}", other),
                    }
                }
                other => panic!("expected block, got {:?}", other),
            },
            other => panic!("expected while, got {:?}", other),
        }
    }

    #[test]
    fn test_switch_break_does_not_capture_continue() {
        let prog = parse_src(
            "int main() { int x; x = 0; while (1) { switch (x) { case 0: continue; } break; } return 0; }",
        );
        // The continue inside the switch must target the while loop.
        fn find_continue(stmt: &Stmt) -> Option<&String> {
            match stmt {
                Stmt::Continue { label } => Some(label),
                Stmt::Block(stmts) => stmts.iter().find_map(find_continue),
                Stmt::While { body, .. }
                | Stmt::For { body, .. }
                | Stmt::Switch { body, .. }
                | Stmt::Case { body, .. } => find_continue(body),
                Stmt::If { then, els, .. } => {
                    find_continue(then).or_else(|| els.as_deref().and_then(find_continue))
                }
                _ => None,
            }
        }
        let label = main_stmts(&prog)
            .iter()
            .find_map(find_continue)
            .expect("continue somewhere");
        assert_eq!(label, ".L.while.cont.0");
    }

    #[test]
    fn test_for_header_declaration() {
        let prog = parse_src("int main() { for (int i = 0; i < 3; i = i + 1) ; return 0; }");
        match &main_stmts(&prog)[0] {
            Stmt::For {
                init, cond, step, ..
            } => {
                assert!(init.is_some());
                assert!(cond.is_some());
                assert!(step.is_some());
            }
            other => panic!("expected for, got {:?}", other),
        }
        // The loop variable lands in the function's locals.
        assert!(prog.functions[0].locals.iter().any(|l| l.name == "i"));
    }

    #[test]
    fn test_case_and_default() {
        let prog = parse_src(
            "int main() { int x; x = 1; switch (x) { case 1: return 1; default: return 9; } }",
        );
        match &main_stmts(&prog)[1] {
            Stmt::Switch { body, brk_label, .. } => {
                assert_eq!(brk_label, ".L.switch.brk.0");
                match &**body {
                    Stmt::Block(stmts) => {
                        assert!(matches!(stmts[0], Stmt::Case { value: Some(1), .. }));
                        assert!(matches!(stmts[1], Stmt::Case { value: None, .. }));
                    }
                    other => panic!("expected block, got {:?}", other),
                }
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_case_constant_arithmetic() {
        let prog = parse_src("int main() { switch (0) { case 2 + 3 * 2: return 1; } return 0; }");
        match &main_stmts(&prog)[0] {
            Stmt::Switch { body, .. } => match &**body {
                Stmt::Block(stmts) => {
                    assert!(matches!(stmts[0], Stmt::Case { value: Some(8), .. }))
                }
                other => panic!("expected block, got {:?}", other),
            },
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_scalar_initializer_becomes_store() {
        let prog = parse_src("int main() { int a = 2; return a; }");
        match &main_stmts(&prog)[0] {
            Stmt::Expr(e) => assert!(matches!(e.kind, ExprKind::Assign { .. })),
            other => panic!("expected init store, got {:?}", other),
        }
    }

    #[test]
    fn test_array_initializer_stores_each_element() {
        let prog = parse_src("int main() { int a[3] = {1, 2, 3}; return a[0]; }");
        let stores = main_stmts(&prog)
            .iter()
            .filter(|s| matches!(s, Stmt::Expr(e) if matches!(e.kind, ExprKind::Assign { .. })))
            .count();
        assert_eq!(stores, 3);
    }

    #[test]
    fn test_zero_initializer_generates_nothing() {
        let prog = parse_src("int main() { int a[4] = {0}; return 0; }");
        let stores = main_stmts(&prog)
            .iter()
            .filter(|s| matches!(s, Stmt::Expr(_)))
            .count();
        assert_eq!(stores, 0);
    }

    #[test]
    fn test_struct_initializer() {
        let prog = parse_src(
            "int main() { struct P { int x; int y; } p = {10, 20}; return p.x; }",
        );
        let stores = main_stmts(&prog)
            .iter()
            .filter(|s| matches!(s, Stmt::Expr(e) if matches!(e.kind, ExprKind::Assign { .. })))
            .count();
        assert_eq!(stores, 2);
    }

    #[test]
    fn test_multi_declarator() {
        let prog = parse_src("int main() { int a, b, *c; return 0; }");
        let names: Vec<_> = prog.functions[0]
            .locals
            .iter()
            .map(|l| l.name.as_str())
            .collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_null_statement() {
        let prog = parse_src("int main() { ;; return 0; }");
        assert!(matches!(main_stmts(&prog)[0], Stmt::Null));
        assert!(matches!(main_stmts(&prog)[1], Stmt::Null));
    }
}
