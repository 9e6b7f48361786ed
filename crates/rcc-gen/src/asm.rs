//! The assembly generator.
//!
//! Expression evaluation is stack-machine style: the right operand is
//! evaluated into `rax` and pushed, the left operand is evaluated into
//! `rax`, and the right is popped into `rdi`, so every binary op sees
//! `lhs` in `rax` and `rhs` in `rdi`. The running push depth decides
//! whether a call site needs an extra 8 bytes to keep `rsp` 16-byte
//! aligned at the `call`.
//!
//! Loads and stores are size-correct: 1-byte values move through
//! `movsx`/`al`, 4-byte through `movsxd`/`eax`, 8-byte through plain
//! `mov`/`rax`. Array-typed expressions never load; their address is their
//! value.

use rcc_par::ast::{BinOp, Expr, ExprKind, Initializer, Stmt, VarRef};
use rcc_par::{Function, Global, Program, TypeId, TypeKind};
use rcc_util::escape::escape_for_asm;

use crate::abi::SystemVAbi;
use crate::error::CodeGenError;
use crate::frame::FrameLayout;

/// Generate the full assembly text for a program.
pub fn codegen(prog: &Program) -> Result<String, CodeGenError> {
    CodeGenerator::new(prog).generate()
}

/// Generator state: output buffer, push depth, and label counters.
pub struct CodeGenerator<'a> {
    prog: &'a Program,
    out: String,
    /// Bytes pushed since the current function's prologue.
    depth: i32,
    label_count: u32,
    case_label_count: u32,
    frame: FrameLayout,
    fn_name: String,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(prog: &'a Program) -> Self {
        Self {
            prog,
            out: String::new(),
            depth: 0,
            label_count: 0,
            case_label_count: 0,
            frame: FrameLayout {
                offsets: Vec::new(),
                frame_size: 0,
            },
            fn_name: String::new(),
        }
    }

    pub fn generate(mut self) -> Result<String, CodeGenError> {
        self.directive(".intel_syntax noprefix");
        self.directive(".text");

        let prog = self.prog;
        for func in &prog.functions {
            // Only definitions are code-generated.
            if func.body.is_some() {
                self.gen_function(func)?;
            }
        }

        self.directive(".data");
        for global in &prog.globals {
            if global.is_extern {
                continue;
            }
            self.gen_global(global);
        }

        Ok(self.out)
    }

    // ------------------------------------------------------------------
    // Functions
    // ------------------------------------------------------------------

    fn gen_function(&mut self, func: &Function) -> Result<(), CodeGenError> {
        self.frame = FrameLayout::compute(&self.prog.types, &func.locals);
        self.fn_name = func.name.clone();

        if !func.is_static {
            self.directive(&format!(".globl {}", func.name));
        }
        self.label(&func.name);

        // Prologue
        self.emit("push rbp");
        self.emit("mov rbp, rsp");
        self.emit(&format!("sub rsp, {}", self.frame.frame_size));

        // Spill register parameters into their slots.
        for (i, &local_idx) in func.params.iter().take(6).enumerate() {
            let offset = self.frame.offsets[local_idx];
            self.emit(&format!(
                "mov [rbp-{}], {}",
                offset,
                SystemVAbi::ARG_REGS[i]
            ));
        }

        self.depth = 0;
        if let Some(body) = &func.body {
            self.gen_stmt(body)?;
        }

        // Epilogue: every return jumps here.
        self.label(&format!(".L.return.{}", func.name));
        self.emit("mov rsp, rbp");
        self.emit("pop rbp");
        self.emit("ret");
        Ok(())
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn gen_stmt(&mut self, stmt: &Stmt) -> Result<(), CodeGenError> {
        match stmt {
            Stmt::Return { value } => {
                if let Some(e) = value {
                    self.gen_expr(e)?;
                }
                self.emit(&format!("jmp .L.return.{}", self.fn_name));
            }

            Stmt::Expr(e) => {
                self.gen_expr(e)?;
            }

            Stmt::Null => {}

            Stmt::If { cond, then, els } => {
                let c = self.next_label();
                self.gen_expr(cond)?;
                self.emit("cmp rax, 0");
                self.emit(&format!("je .L.else.{}", c));
                self.gen_stmt(then)?;
                self.emit(&format!("jmp .L.end.{}", c));
                self.label(&format!(".L.else.{}", c));
                if let Some(els) = els {
                    self.gen_stmt(els)?;
                }
                self.label(&format!(".L.end.{}", c));
            }

            Stmt::While {
                cond,
                body,
                brk_label,
                cont_label,
            } => {
                self.label(cont_label);
                self.gen_expr(cond)?;
                self.emit("cmp rax, 0");
                self.emit(&format!("je {}", brk_label));
                self.gen_stmt(body)?;
                self.emit(&format!("jmp {}", cont_label));
                self.label(brk_label);
            }

            Stmt::For {
                init,
                cond,
                step,
                body,
                brk_label,
                cont_label,
            } => {
                if let Some(init) = init {
                    self.gen_stmt(init)?;
                }
                self.label(cont_label);
                if let Some(cond) = cond {
                    self.gen_expr(cond)?;
                    self.emit("cmp rax, 0");
                    self.emit(&format!("je {}", brk_label));
                }
                self.gen_stmt(body)?;
                if let Some(step) = step {
                    self.gen_expr(step)?;
                }
                self.emit(&format!("jmp {}", cont_label));
                self.label(brk_label);
            }

            Stmt::Block(stmts) => {
                for s in stmts {
                    self.gen_stmt(s)?;
                }
            }

            Stmt::Switch {
                cond,
                body,
                brk_label,
            } => {
                self.gen_switch(cond, body, brk_label)?;
            }

            // A case outside a switch walk: just its body (the enclosing
            // switch emits the labels).
            Stmt::Case { body, .. } => {
                self.gen_stmt(body)?;
            }

            Stmt::Break { label } | Stmt::Continue { label } => {
                self.emit(&format!("jmp {}", label));
            }
        }
        Ok(())
    }

    /// Two-pass switch lowering: assign a label to every case in source
    /// order, emit the linear compare-and-jump table, then the bodies.
    /// Fall-through is preserved; `default` is reached only after every
    /// comparison fails.
    fn gen_switch(
        &mut self,
        cond: &Expr,
        body: &Stmt,
        brk_label: &str,
    ) -> Result<(), CodeGenError> {
        let Stmt::Block(stmts) = body else {
            return Err(CodeGenError::MalformedSwitch);
        };

        self.gen_expr(cond)?;

        // First pass: a label per case, default remembered separately.
        let mut labels_by_stmt: Vec<Option<u32>> = vec![None; stmts.len()];
        let mut default_label = None;
        for (i, s) in stmts.iter().enumerate() {
            if let Stmt::Case { value, .. } = s {
                let id = self.case_label_count;
                self.case_label_count += 1;
                labels_by_stmt[i] = Some(id);
                if value.is_none() {
                    default_label = Some(id);
                }
            }
        }

        // Compare-and-jump table in source order.
        for (i, s) in stmts.iter().enumerate() {
            if let (Stmt::Case { value: Some(v), .. }, Some(id)) = (s, labels_by_stmt[i]) {
                self.emit(&format!("cmp rax, {}", v));
                self.emit(&format!("je .L.case.{}", id));
            }
        }
        match default_label {
            Some(id) => self.emit(&format!("jmp .L.case.{}", id)),
            None => self.emit(&format!("jmp {}", brk_label)),
        }

        // Second pass: bodies in source order, labels in front of cases.
        for (i, s) in stmts.iter().enumerate() {
            match s {
                Stmt::Case { body, .. } => {
                    if let Some(id) = labels_by_stmt[i] {
                        self.label(&format!(".L.case.{}", id));
                    }
                    self.gen_stmt(body)?;
                }
                other => self.gen_stmt(other)?,
            }
        }

        self.label(brk_label);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn gen_expr(&mut self, e: &Expr) -> Result<(), CodeGenError> {
        match &e.kind {
            ExprKind::Num(value) => {
                self.emit(&format!("mov rax, {}", value));
            }

            ExprKind::Var(_) => {
                self.gen_addr(e)?;
                self.load(self.expr_ty(e)?);
            }

            ExprKind::Addr(inner) => {
                self.gen_addr(inner)?;
            }

            ExprKind::Deref(inner) => {
                self.gen_expr(inner)?;
                self.load(self.expr_ty(e)?);
            }

            ExprKind::Member { .. } => {
                self.gen_addr(e)?;
                self.load(self.expr_ty(e)?);
            }

            ExprKind::LogNot(inner) => {
                self.gen_expr(inner)?;
                self.emit("cmp rax, 0");
                self.emit("sete al");
                self.emit("movzx rax, al");
            }

            ExprKind::BitNot(inner) => {
                self.gen_expr(inner)?;
                self.emit("not rax");
            }

            ExprKind::Cast { to, operand } => {
                self.gen_expr(operand)?;
                match self.prog.types.size_of(*to) {
                    1 => self.emit("movsx rax, al"),
                    4 => self.emit("movsxd rax, eax"),
                    _ => {}
                }
            }

            ExprKind::Assign { lhs, rhs } => {
                self.gen_addr(lhs)?;
                self.push("rax");
                self.gen_expr(rhs)?;
                self.pop("rdi");
                self.store(self.expr_ty(lhs)?);
            }

            ExprKind::Comma { lhs, rhs } => {
                self.gen_expr(lhs)?;
                self.gen_expr(rhs)?;
            }

            ExprKind::Cond { cond, then, els } => {
                let c = self.next_label();
                self.gen_expr(cond)?;
                self.emit("cmp rax, 0");
                self.emit(&format!("je .L.else.{}", c));
                self.gen_expr(then)?;
                self.emit(&format!("jmp .L.end.{}", c));
                self.label(&format!(".L.else.{}", c));
                self.gen_expr(els)?;
                self.label(&format!(".L.end.{}", c));
            }

            ExprKind::Call { name, args } => {
                self.gen_call(name, args)?;
            }

            ExprKind::Binary { op, lhs, rhs } => {
                self.gen_expr(rhs)?;
                self.push("rax");
                self.gen_expr(lhs)?;
                self.pop("rdi");
                self.gen_binop(*op, lhs)?;
            }
        }
        Ok(())
    }

    /// Emit the operation for a binary node; `lhs` is in `rax`, `rhs` in
    /// `rdi`.
    fn gen_binop(&mut self, op: BinOp, lhs: &Expr) -> Result<(), CodeGenError> {
        match op {
            BinOp::Add => {
                // Pointer arithmetic: scale the index by the element size.
                let lhs_ty = self.expr_ty(lhs)?;
                if self.prog.types.is_ptr_like(lhs_ty) {
                    if let Some(base) = self.prog.types.base_of(lhs_ty) {
                        let size = self.prog.types.size_of(base);
                        if size > 1 {
                            self.emit(&format!("imul rdi, {}", size));
                        }
                    }
                }
                self.emit("add rax, rdi");
            }
            BinOp::Sub => self.emit("sub rax, rdi"),
            BinOp::Mul => self.emit("imul rax, rdi"),
            BinOp::Div => {
                self.emit("cqo");
                self.emit("idiv rdi");
            }
            BinOp::Mod => {
                self.emit("cqo");
                self.emit("idiv rdi");
                self.emit("mov rax, rdx");
            }
            BinOp::Eq => self.compare("sete"),
            BinOp::Ne => self.compare("setne"),
            BinOp::Lt => self.compare("setl"),
            BinOp::Le => self.compare("setle"),
            BinOp::Gt => self.compare("setg"),
            BinOp::Ge => self.compare("setge"),
            BinOp::LogAnd => {
                self.emit("test rax, rax");
                self.emit("setne al");
                self.emit("test rdi, rdi");
                self.emit("setne dil");
                self.emit("and al, dil");
                self.emit("movzx rax, al");
            }
            BinOp::LogOr => {
                self.emit("or rax, rdi");
                self.emit("setne al");
                self.emit("movzx rax, al");
            }
            BinOp::BitAnd => self.emit("and rax, rdi"),
            BinOp::BitOr => self.emit("or rax, rdi"),
            BinOp::BitXor => self.emit("xor rax, rdi"),
            BinOp::Shl => {
                self.emit("mov rcx, rdi");
                self.emit("shl rax, cl");
            }
            BinOp::Shr => {
                self.emit("mov rcx, rdi");
                self.emit("shr rax, cl");
            }
        }
        Ok(())
    }

    fn compare(&mut self, setcc: &str) {
        self.emit("cmp rax, rdi");
        self.emit(&format!("{} al", setcc));
        self.emit("movzx rax, al");
    }

    /// Arguments are evaluated left to right and pushed, then popped into
    /// the argument registers in reverse index order. Only the first six
    /// integer arguments are handled. The stack pointer is realigned to 16
    /// bytes at the `call` when the running push depth is odd.
    fn gen_call(&mut self, name: &str, args: &[Expr]) -> Result<(), CodeGenError> {
        let nregs = args.len().min(SystemVAbi::ARG_REGS.len());
        for arg in args.iter().take(nregs) {
            self.gen_expr(arg)?;
            self.push("rax");
        }
        for i in (0..nregs).rev() {
            self.pop(SystemVAbi::ARG_REGS[i]);
        }

        let misaligned = (self.depth / 8) % 2 == 1;
        if misaligned {
            self.emit("sub rsp, 8");
            self.depth += 8;
        }
        self.emit(&format!("call {}", name));
        if misaligned {
            self.emit("add rsp, 8");
            self.depth -= 8;
        }
        Ok(())
    }

    /// Leave the address of an lvalue in `rax`.
    fn gen_addr(&mut self, e: &Expr) -> Result<(), CodeGenError> {
        match &e.kind {
            ExprKind::Var(VarRef::Local(i)) => {
                let offset = self.frame.offsets[*i];
                self.emit(&format!("lea rax, [rbp-{}]", offset));
                Ok(())
            }
            ExprKind::Var(VarRef::Global(i)) => {
                let name = &self.prog.globals[*i].name;
                self.emit(&format!("lea rax, {}[rip]", name));
                Ok(())
            }
            ExprKind::Deref(inner) => self.gen_expr(inner),
            ExprKind::Member { base, resolved, .. } => {
                self.gen_addr(base)?;
                let Some(member) = resolved else {
                    return Err(CodeGenError::UntypedExpression { span: e.span });
                };
                if member.offset > 0 {
                    self.emit(&format!("add rax, {}", member.offset));
                }
                Ok(())
            }
            _ => Err(CodeGenError::NotAnLvalue { span: e.span }),
        }
    }

    // ------------------------------------------------------------------
    // Globals
    // ------------------------------------------------------------------

    fn gen_global(&mut self, global: &Global) {
        // Synthetic string labels are not exported.
        if !global.is_string_literal() {
            self.directive(&format!(".globl {}", global.name));
        }
        self.label(&global.name);

        if let Some(bytes) = &global.str_bytes {
            self.emit_string(bytes);
            return;
        }

        match &global.init {
            Some(init) => self.emit_global_init(global.ty, init),
            None => {
                let size = self.prog.types.size_of(global.ty);
                self.emit(&format!(".zero {}", size));
            }
        }
    }

    fn emit_global_init(&mut self, ty: TypeId, init: &Initializer) {
        match self.prog.types.kind(ty) {
            TypeKind::Array { base, .. } => {
                let base = *base;
                match init {
                    Initializer::List(children) => {
                        for child in children {
                            self.emit_global_element(base, child);
                        }
                    }
                    _ => {
                        let size = self.prog.types.size_of(ty);
                        self.emit(&format!(".zero {}", size));
                    }
                }
            }
            TypeKind::Int | TypeKind::Enum => {
                self.emit(&format!(".long {}", init_int_value(init)));
            }
            TypeKind::Char => {
                self.emit(&format!(".byte {}", init_int_value(init)));
            }
            TypeKind::Ptr(_) => match self.init_global_name(init) {
                Some(name) => self.emit(&format!(".quad {}", name)),
                None => self.emit(".quad 0"),
            },
            _ => {
                let size = self.prog.types.size_of(ty);
                self.emit(&format!(".zero {}", size));
            }
        }
    }

    fn emit_global_element(&mut self, elem_ty: TypeId, init: &Initializer) {
        match self.prog.types.kind(elem_ty) {
            TypeKind::Ptr(_) | TypeKind::Array { .. } => match self.init_global_name(init) {
                Some(name) => self.emit(&format!(".quad {}", name)),
                None => self.emit(".quad 0"),
            },
            TypeKind::Int | TypeKind::Enum => {
                self.emit(&format!(".long {}", init_int_value(init)));
            }
            TypeKind::Char => {
                self.emit(&format!(".byte {}", init_int_value(init)));
            }
            _ => {
                let size = self.prog.types.size_of(elem_ty);
                self.emit(&format!(".zero {}", size));
            }
        }
    }

    /// The referenced global's name when an initializer is `&`-free
    /// reference to a global (string literals included).
    fn init_global_name(&self, init: &Initializer) -> Option<String> {
        if let Initializer::Expr(e) = init {
            if let ExprKind::Var(VarRef::Global(i)) = e.kind {
                return Some(self.prog.globals[i].name.clone());
            }
        }
        None
    }

    fn emit_string(&mut self, bytes: &[u8]) {
        let mut escaped = String::new();
        for &b in bytes {
            escaped.push_str(&escape_for_asm(b));
        }
        self.emit(&format!(".string \"{}\"", escaped));
    }

    // ------------------------------------------------------------------
    // Plumbing
    // ------------------------------------------------------------------

    fn expr_ty(&self, e: &Expr) -> Result<TypeId, CodeGenError> {
        e.ty.ok_or(CodeGenError::UntypedExpression { span: e.span })
    }

    /// Size-correct load through the address in `rax`, unless the type is
    /// an array (whose address is its value).
    fn load(&mut self, ty: TypeId) {
        if self.prog.types.is_array(ty) {
            return;
        }
        match self.prog.types.size_of(ty) {
            1 => self.emit("movsx rax, byte ptr [rax]"),
            4 => self.emit("movsxd rax, dword ptr [rax]"),
            _ => self.emit("mov rax, [rax]"),
        }
    }

    /// Size-correct store of `rax` through the address in `rdi`.
    fn store(&mut self, ty: TypeId) {
        match self.prog.types.size_of(ty) {
            1 => self.emit("mov [rdi], al"),
            4 => self.emit("mov [rdi], eax"),
            _ => self.emit("mov [rdi], rax"),
        }
    }

    fn push(&mut self, reg: &str) {
        self.emit(&format!("push {}", reg));
        self.depth += 8;
    }

    fn pop(&mut self, reg: &str) {
        self.emit(&format!("pop {}", reg));
        self.depth -= 8;
    }

    fn next_label(&mut self) -> u32 {
        let c = self.label_count;
        self.label_count += 1;
        c
    }

    fn emit(&mut self, line: &str) {
        self.out.push_str("  ");
        self.out.push_str(line);
        self.out.push('\n');
    }

    fn label(&mut self, name: &str) {
        self.out.push_str(name);
        self.out.push_str(":\n");
    }

    fn directive(&mut self, d: &str) {
        self.out.push_str(d);
        self.out.push('\n');
    }
}

/// Integer payload of a scalar initializer. Anything that is not a plain
/// number emits as zero.
fn init_int_value(init: &Initializer) -> i64 {
    if let Initializer::Expr(e) = init {
        if let ExprKind::Num(v) = e.kind {
            return v;
        }
    }
    0
}
