//! Top-level parsing: the function/global split, declaration specifiers,
//! declarators, struct and enum declarations, and parameter lists.

use rcc_lex::TokenKind;

use crate::error::ParseError;
use crate::symbol::{Function, Global, Local, Program};
use crate::types::{Member, TypeArena, TypeId};
use crate::Parser;

/// Parsed declaration specifiers: the base type plus storage-class flags.
/// `const` is recognized and ignored.
pub(crate) struct DeclSpec {
    pub ty: TypeId,
    pub is_typedef: bool,
    pub is_static: bool,
    pub is_extern: bool,
}

impl Parser {
    pub(crate) fn parse_program(mut self) -> Result<Program, ParseError> {
        while !self.at(TokenKind::Eof) {
            if self.looks_like_function() {
                self.function()?;
            } else {
                self.global_declaration()?;
            }
        }
        Ok(Program {
            types: self.types,
            functions: self.functions,
            globals: self.globals,
        })
    }

    /// Token-level lookahead for "declarator followed by `(`", without
    /// consuming anything: skip storage classes, a type specifier (with its
    /// struct/enum body if present), pointers, and check for `ident (`.
    fn looks_like_function(&self) -> bool {
        let kind_at = |i: usize| {
            self.tokens
                .get(i)
                .map(|t| t.kind)
                .unwrap_or(TokenKind::Eof)
        };
        let mut i = self.pos;

        while matches!(
            kind_at(i),
            TokenKind::Typedef | TokenKind::Static | TokenKind::Extern | TokenKind::Const
        ) {
            i += 1;
        }

        match kind_at(i) {
            TokenKind::Int | TokenKind::Char | TokenKind::Void | TokenKind::Ident => i += 1,
            TokenKind::Enum | TokenKind::Struct => {
                i += 1;
                if kind_at(i) == TokenKind::Ident {
                    i += 1;
                }
                if kind_at(i) == TokenKind::LBrace {
                    let mut depth = 1;
                    i += 1;
                    while depth > 0 && kind_at(i) != TokenKind::Eof {
                        match kind_at(i) {
                            TokenKind::LBrace => depth += 1,
                            TokenKind::RBrace => depth -= 1,
                            _ => {}
                        }
                        i += 1;
                    }
                }
            }
            _ => {}
        }

        while kind_at(i) == TokenKind::Star {
            i += 1;
        }

        kind_at(i) == TokenKind::Ident && kind_at(i + 1) == TokenKind::LParen
    }

    /// Parse declaration specifiers: storage classes in any order, then
    /// exactly one type specifier.
    pub(crate) fn declspec(&mut self) -> Result<DeclSpec, ParseError> {
        let mut spec = DeclSpec {
            ty: TypeArena::INT,
            is_typedef: false,
            is_static: false,
            is_extern: false,
        };

        loop {
            match self.peek().kind {
                TokenKind::Typedef => {
                    spec.is_typedef = true;
                    self.bump();
                }
                TokenKind::Static => {
                    spec.is_static = true;
                    self.bump();
                }
                TokenKind::Extern => {
                    spec.is_extern = true;
                    self.bump();
                }
                TokenKind::Const => {
                    self.bump();
                }
                _ => break,
            }
        }

        spec.ty = match self.peek().kind {
            TokenKind::Void => {
                self.bump();
                TypeArena::VOID
            }
            TokenKind::Char => {
                self.bump();
                TypeArena::CHAR
            }
            TokenKind::Int => {
                self.bump();
                TypeArena::INT
            }
            TokenKind::Enum => self.enum_decl()?,
            TokenKind::Struct => self.struct_decl()?,
            TokenKind::Ident => {
                let bound = self.typedefs.get(&self.peek().lexeme).copied();
                match bound {
                    Some(ty) => {
                        self.bump();
                        ty
                    }
                    None => {
                        return Err(ParseError::ExpectedTypeSpecifier { span: self.span() })
                    }
                }
            }
            _ => return Err(ParseError::ExpectedTypeSpecifier { span: self.span() }),
        };

        Ok(spec)
    }

    /// `enum tag? { A, B = k, C }?`: enumerators land in the flat
    /// enum-constant table, incrementing from 0 or the last explicit value.
    fn enum_decl(&mut self) -> Result<TypeId, ParseError> {
        self.bump(); // enum
        if self.at(TokenKind::Ident) {
            self.bump(); // tag, not tracked for enums
        }

        if self.eat(TokenKind::LBrace) {
            let mut value: i64 = 0;
            while !self.at(TokenKind::RBrace) {
                let name = self.expect_ident("enum constant")?;
                if self.eat(TokenKind::Eq) {
                    if !self.at(TokenKind::Number) {
                        return Err(ParseError::ExpectedEnumValue { span: self.span() });
                    }
                    value = self.bump().value;
                }
                self.enum_consts.insert(name.lexeme, value);
                value += 1;
                if !self.eat(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::RBrace, "}")?;
        }

        Ok(TypeArena::ENUM)
    }

    /// `struct tag? { members }?`: member offsets are the running sum of
    /// preceding member sizes. A bodied declaration binds its tag; a bare
    /// `struct tag` resolves through the tag table, falling back to an
    /// opaque type for unknown tags.
    fn struct_decl(&mut self) -> Result<TypeId, ParseError> {
        self.bump(); // struct
        let tag = if self.at(TokenKind::Ident) {
            Some(self.bump().lexeme)
        } else {
            None
        };

        if !self.at(TokenKind::LBrace) {
            if let Some(tag) = &tag {
                if let Some(&id) = self.struct_tags.get(tag) {
                    return Ok(id);
                }
            }
            let id = self.types.opaque_struct();
            if let Some(tag) = tag {
                self.struct_tags.insert(tag, id);
            }
            return Ok(id);
        }

        self.bump(); // '{'
        let mut members = Vec::new();
        let mut offset: i32 = 0;

        while !self.at(TokenKind::RBrace) {
            let mem_spec = self.declspec()?;
            let mut first = true;
            while !self.at(TokenKind::Semicolon) {
                if !first {
                    self.expect(TokenKind::Comma, ",")?;
                }
                first = false;

                let mut mem_ty = self.declarator(mem_spec.ty)?;
                let name = self.expect_ident("member")?;
                mem_ty = self.declarator_suffix(mem_ty)?;

                members.push(Member {
                    name: name.lexeme,
                    ty: mem_ty,
                    offset,
                });
                offset += self.types.size_of(mem_ty);
            }
            self.expect(TokenKind::Semicolon, ";")?;
        }
        self.expect(TokenKind::RBrace, "}")?;

        let id = self.types.struct_of(members, offset);
        if let Some(tag) = tag {
            self.struct_tags.insert(tag, id);
        }
        Ok(id)
    }

    /// Leading `*`s of a declarator.
    pub(crate) fn declarator(&mut self, mut ty: TypeId) -> Result<TypeId, ParseError> {
        while self.eat(TokenKind::Star) {
            ty = self.types.ptr_to(ty);
        }
        Ok(ty)
    }

    /// `[len]` suffixes after the declared name. A missing length parses
    /// as zero.
    pub(crate) fn declarator_suffix(&mut self, mut ty: TypeId) -> Result<TypeId, ParseError> {
        while self.eat(TokenKind::LBracket) {
            let mut len: i64 = 0;
            if self.at(TokenKind::Number) {
                len = self.bump().value;
            }
            self.expect(TokenKind::RBracket, "]")?;
            ty = self.types.array_of(ty, len);
        }
        Ok(ty)
    }

    /// A function definition or prototype.
    fn function(&mut self) -> Result<(), ParseError> {
        self.locals = Vec::new();

        let spec = self.declspec()?;
        let ret_ty = self.declarator(spec.ty)?;
        let name = self.expect_ident("function")?;

        let (params, param_tys, is_variadic) = self.parse_params()?;
        let fn_ty = self.types.func_of(ret_ty, param_tys, is_variadic);

        let body = if self.eat(TokenKind::Semicolon) {
            None
        } else {
            Some(self.compound_stmt()?)
        };

        let locals = std::mem::take(&mut self.locals);
        self.functions.push(Function {
            name: name.lexeme,
            ty: fn_ty,
            ret_ty,
            params,
            locals,
            body,
            is_static: spec.is_static,
            is_variadic,
        });
        Ok(())
    }

    /// `( params? )` with an optional trailing `...`. Parameters are pushed
    /// onto the current locals, so their indices are `0..n`.
    fn parse_params(&mut self) -> Result<(Vec<usize>, Vec<TypeId>, bool), ParseError> {
        self.expect(TokenKind::LParen, "(")?;

        let mut params = Vec::new();
        let mut param_tys = Vec::new();
        let mut is_variadic = false;

        if self.eat(TokenKind::RParen) {
            return Ok((params, param_tys, false));
        }

        // f(void) declares zero parameters.
        if self.at(TokenKind::Void) && self.peek_ahead(1).kind == TokenKind::RParen {
            self.bump();
            self.bump();
            return Ok((params, param_tys, false));
        }

        loop {
            if self.at(TokenKind::DotDotDot) {
                self.bump();
                is_variadic = true;
                break;
            }

            let spec = self.declspec()?;
            let ty = self.declarator(spec.ty)?;
            let name = self.expect_ident("parameter")?;

            params.push(self.locals.len());
            param_tys.push(ty);
            self.locals.push(Local {
                name: name.lexeme,
                ty,
            });

            if !self.eat(TokenKind::Comma) {
                break;
            }
        }
        self.expect(TokenKind::RParen, ")")?;
        Ok((params, param_tys, is_variadic))
    }

    /// A top-level declaration that is not a function: globals, typedefs,
    /// and bare `struct`/`enum` declarations.
    fn global_declaration(&mut self) -> Result<(), ParseError> {
        let spec = self.declspec()?;

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

            let idx = self.globals.len();
            self.globals.push(Global {
                name: name.lexeme,
                ty,
                init: None,
                str_bytes: None,
                is_static: spec.is_static,
                is_extern: spec.is_extern,
            });

            if self.eat(TokenKind::Eq) {
                let init = self.initializer(ty)?;
                self.globals[idx].init = Some(init);
            }
        }
        self.expect(TokenKind::Semicolon, ";")?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::Initializer;
    use crate::types::TypeKind;
    use crate::Program;
    use rcc_util::FileId;

    fn parse_src(src: &str) -> Program {
        let tokens = rcc_lex::tokenize(src, FileId(0)).unwrap();
        crate::parse(tokens).unwrap()
    }

    #[test]
    fn test_global_variable() {
        let prog = parse_src("int g = 10; int main() { return g; }");
        assert_eq!(prog.globals.len(), 1);
        assert_eq!(prog.globals[0].name, "g");
        assert!(matches!(
            prog.globals[0].init,
            Some(Initializer::Expr(_))
        ));
    }

    #[test]
    fn test_global_array_and_multi_declarator() {
        let prog = parse_src("int a, b[4], *c; int main() { return 0; }");
        assert_eq!(prog.globals.len(), 3);
        assert_eq!(prog.types.size_of(prog.globals[0].ty), 4);
        assert_eq!(prog.types.size_of(prog.globals[1].ty), 16);
        assert_eq!(prog.types.size_of(prog.globals[2].ty), 8);
    }

    #[test]
    fn test_extern_global() {
        let prog = parse_src("extern int errno; int main() { return 0; }");
        assert!(prog.globals[0].is_extern);
    }

    #[test]
    fn test_typedef_binding() {
        let prog = parse_src("typedef int myint; myint main() { myint x = 1; return x; }");
        assert_eq!(prog.functions[0].ret_ty, TypeArena::INT);
        assert_eq!(prog.functions[0].locals[0].ty, TypeArena::INT);
    }

    #[test]
    fn test_typedef_pointer() {
        let prog = parse_src("typedef char *string; int main() { string s; return 0; }");
        let ty = prog.functions[0].locals[0].ty;
        assert_eq!(prog.types.base_of(ty), Some(TypeArena::CHAR));
    }

    #[test]
    fn test_typedef_struct() {
        let prog = parse_src(
            "typedef struct { int x; int y; } Point; int main() { Point p; p.x = 1; return p.x; }",
        );
        let ty = prog.functions[0].locals[0].ty;
        assert_eq!(prog.types.size_of(ty), 8);
    }

    #[test]
    fn test_struct_member_offsets_run_sum() {
        let prog = parse_src(
            "int main() { struct C { char c; int value; struct C *next; } x; return 0; }",
        );
        let ty = prog.functions[0].locals[0].ty;
        match prog.types.kind(ty) {
            TypeKind::Struct { members } => {
                let offsets: Vec<_> = members.iter().map(|m| m.offset).collect();
                assert_eq!(offsets, vec![0, 1, 5]);
            }
            other => panic!("expected struct, got {:?}", other),
        }
        assert_eq!(prog.types.size_of(ty), 13);
    }

    #[test]
    fn test_struct_tag_identity() {
        let prog = parse_src(
            "struct P { int x; int y; }; int main() { struct P a; struct P b; a.x = 1; b.x = 2; return a.x; }",
        );
        let f = &prog.functions[0];
        assert_eq!(f.locals[0].ty, f.locals[1].ty);
    }

    #[test]
    fn test_enum_values() {
        let prog = parse_src(
            "enum Color { RED, GREEN = 5, BLUE }; int main() { return RED + GREEN + BLUE; }",
        );
        // RED = 0, GREEN = 5, BLUE = 6; folded during parsing, so no
        // globals and one function.
        assert!(prog.globals.is_empty());
        assert_eq!(prog.functions.len(), 1);
    }

    #[test]
    fn test_variadic_declaration() {
        let prog = parse_src("int printf(char *fmt, ...); int main() { return 0; }");
        assert!(prog.functions[0].is_variadic);
        assert_eq!(prog.functions[0].params.len(), 1);
    }

    #[test]
    fn test_void_parameter_list() {
        let prog = parse_src("int getchar(void); int main() { return 0; }");
        assert!(prog.functions[0].params.is_empty());
        assert!(!prog.functions[0].is_variadic);
    }

    #[test]
    fn test_static_function() {
        let prog = parse_src("static int helper() { return 1; } int main() { return helper(); }");
        assert!(prog.functions[0].is_static);
        assert!(!prog.functions[1].is_static);
    }

    #[test]
    fn test_pointer_return_type() {
        let prog = parse_src("char *name() { return 0; } int main() { return 0; }");
        let ret = prog.functions[0].ret_ty;
        assert_eq!(prog.types.base_of(ret), Some(TypeArena::CHAR));
    }

    #[test]
    fn test_missing_type_specifier() {
        let tokens = rcc_lex::tokenize("florb x; int main() { return 0; }", FileId(0)).unwrap();
        // `florb x` is not a function and florb is no typedef: the
        // global-declaration path reports the bad specifier.
        assert!(matches!(
            crate::parse(tokens),
            Err(ParseError::ExpectedTypeSpecifier { .. })
        ));
    }
}
