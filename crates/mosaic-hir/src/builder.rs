use mosaic_types::Span;

use crate::hir::*;
use crate::BinaryOp;

/// Programmatic construction of a [`Body`], standing in for the parser.
///
/// Leaves receive consecutive, non-overlapping spans sized after their text; composite nodes cover
/// their children. Build children before parents, as a parser would.
#[derive(Debug, Default)]
pub struct BodyBuilder {
    stmts: Arena<Stmt>,
    exprs: Arena<Expr>,
    cursor: usize,
}

impl BodyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    fn next_span(&mut self, len: usize) -> Span {
        let start = self.cursor;
        self.cursor += len.max(1) + 1;
        Span::new(start, start + len.max(1))
    }

    fn alloc_expr(&mut self, expr: Expr) -> ExprId {
        ExprId::from_raw(self.exprs.alloc(expr))
    }

    fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        StmtId::from_raw(self.stmts.alloc(stmt))
    }

    fn expr_range(&self, id: ExprId) -> Span {
        self.exprs[id].range()
    }

    fn stmt_range(&self, id: StmtId) -> Span {
        self.stmts[id].range()
    }

    fn cover_exprs(&self, start: Span, ids: &[ExprId]) -> Span {
        ids.iter().fold(start, |acc, id| acc.cover(self.expr_range(*id)))
    }

    // --- types ---

    pub fn ty(&mut self, name: &str) -> TypeRef {
        TypeRef {
            name: name.to_string(),
            args: Vec::new(),
            dims: 0,
            range: self.next_span(name.len()),
        }
    }

    pub fn generic_ty(&mut self, name: &str, args: Vec<TypeArgRef>) -> TypeRef {
        TypeRef {
            args,
            ..self.ty(name)
        }
    }

    pub fn array_ty(&mut self, name: &str, dims: usize) -> TypeRef {
        TypeRef {
            dims,
            ..self.ty(name)
        }
    }

    // --- expressions ---

    pub fn lit(&mut self, kind: LiteralKind, value: &str) -> ExprId {
        let range = self.next_span(value.len());
        self.alloc_expr(Expr::Literal {
            kind,
            value: value.to_string(),
            range,
        })
    }

    pub fn int(&mut self, value: i64) -> ExprId {
        self.lit(LiteralKind::Int, &value.to_string())
    }

    pub fn string(&mut self, value: &str) -> ExprId {
        self.lit(LiteralKind::String, value)
    }

    pub fn boolean(&mut self, value: bool) -> ExprId {
        self.lit(LiteralKind::Boolean, if value { "true" } else { "false" })
    }

    pub fn null(&mut self) -> ExprId {
        self.lit(LiteralKind::Null, "null")
    }

    pub fn name(&mut self, name: &str) -> ExprId {
        let range = self.next_span(name.len());
        self.alloc_expr(Expr::Name {
            name: name.to_string(),
            range,
        })
    }

    pub fn call(&mut self, name: &str, args: Vec<ExprId>) -> ExprId {
        self.generic_call(name, Vec::new(), args)
    }

    pub fn generic_call(&mut self, name: &str, type_args: Vec<TypeRef>, args: Vec<ExprId>) -> ExprId {
        let head = self.next_span(name.len());
        let range = self.cover_exprs(head, &args);
        self.alloc_expr(Expr::Call {
            name: name.to_string(),
            type_args,
            args,
            range,
        })
    }

    /// `base.sel...`; selectors are created with the `sel_*` helpers after `base`.
    pub fn select(&mut self, base: ExprId, selectors: Vec<Selector>) -> ExprId {
        let range = selectors
            .iter()
            .fold(self.expr_range(base), |acc, s| acc.cover(s.range()));
        self.alloc_expr(Expr::Selector {
            base,
            selectors,
            range,
        })
    }

    pub fn sel_field(&mut self, name: &str) -> Selector {
        Selector::Field {
            name: name.to_string(),
            range: self.next_span(name.len()),
        }
    }

    pub fn sel_call(&mut self, name: &str, args: Vec<ExprId>) -> Selector {
        self.sel_generic_call(name, Vec::new(), args)
    }

    pub fn sel_generic_call(
        &mut self,
        name: &str,
        type_args: Vec<TypeRef>,
        args: Vec<ExprId>,
    ) -> Selector {
        let head = self.next_span(name.len());
        let range = self.cover_exprs(head, &args);
        Selector::Call {
            name: name.to_string(),
            type_args,
            args,
            range,
        }
    }

    pub fn sel_index(&mut self, index: ExprId) -> Selector {
        let range = self.expr_range(index);
        Selector::Index { index, range }
    }

    pub fn sel_this(&mut self) -> Selector {
        Selector::This {
            range: self.next_span(4),
        }
    }

    pub fn sel_super(&mut self) -> Selector {
        Selector::Super {
            range: self.next_span(5),
        }
    }

    /// Flat chain `first op rhs op rhs ...` of expression operands.
    pub fn binary(&mut self, first: ExprId, rest: Vec<(BinaryOp, ExprId)>) -> ExprId {
        let operands = rest
            .into_iter()
            .map(|(op, rhs)| BinaryOperand {
                op,
                op_range: self.expr_range(rhs),
                rhs: Operand::Expr(rhs),
            })
            .collect();
        self.binary_operands(first, operands)
    }

    pub fn binary_operands(&mut self, first: ExprId, rest: Vec<BinaryOperand>) -> ExprId {
        let range = rest.iter().fold(self.expr_range(first), |acc, operand| {
            let rhs = match &operand.rhs {
                Operand::Expr(e) => self.expr_range(*e),
                Operand::Type(t) => t.range,
            };
            acc.cover(operand.op_range).cover(rhs)
        });
        self.alloc_expr(Expr::Binary { first, rest, range })
    }

    pub fn operand(&mut self, op: BinaryOp, rhs: ExprId) -> BinaryOperand {
        BinaryOperand {
            op,
            op_range: self.expr_range(rhs),
            rhs: Operand::Expr(rhs),
        }
    }

    /// `instanceof Type` operand.
    pub fn instanceof_operand(&mut self, ty: TypeRef) -> BinaryOperand {
        BinaryOperand {
            op: BinaryOp::InstanceOf,
            op_range: ty.range,
            rhs: Operand::Type(ty),
        }
    }

    pub fn new_object(&mut self, class: TypeRef, args: Vec<ExprId>) -> ExprId {
        self.alloc_new(class, false, args)
    }

    /// `new C<>(args)`
    pub fn new_diamond(&mut self, class: TypeRef, args: Vec<ExprId>) -> ExprId {
        self.alloc_new(class, true, args)
    }

    fn alloc_new(&mut self, class: TypeRef, diamond: bool, args: Vec<ExprId>) -> ExprId {
        let range = self.cover_exprs(class.range, &args);
        self.alloc_expr(Expr::New {
            class,
            diamond,
            args,
            range,
        })
    }

    pub fn param(&mut self, name: &str) -> LambdaParam {
        LambdaParam {
            name: name.to_string(),
            ty: None,
            range: self.next_span(name.len()),
        }
    }

    pub fn typed_param(&mut self, name: &str, ty: TypeRef) -> LambdaParam {
        LambdaParam {
            ty: Some(ty),
            ..self.param(name)
        }
    }

    pub fn lambda(&mut self, params: Vec<LambdaParam>, body: LambdaBody) -> ExprId {
        let body_range = match body {
            LambdaBody::Expr(e) => self.expr_range(e),
            LambdaBody::Block(s) => self.stmt_range(s),
        };
        let range = params.iter().fold(body_range, |acc, p| acc.cover(p.range));
        self.alloc_expr(Expr::Lambda {
            params,
            body,
            range,
        })
    }

    /// `(a, b) -> body` with untyped parameters; the parameters are created before `body` is
    /// built, so `make_body` receives the builder.
    pub fn lambda_expr(
        &mut self,
        names: &[&str],
        make_body: impl FnOnce(&mut BodyBuilder) -> ExprId,
    ) -> ExprId {
        let params: Vec<LambdaParam> = names.iter().map(|n| self.param(n)).collect();
        let body = make_body(self);
        self.lambda(params, LambdaBody::Expr(body))
    }

    pub fn this(&mut self) -> ExprId {
        let range = self.next_span(4);
        self.alloc_expr(Expr::This { range })
    }

    pub fn super_(&mut self) -> ExprId {
        let range = self.next_span(5);
        self.alloc_expr(Expr::Super { range })
    }

    pub fn missing(&mut self) -> ExprId {
        let range = self.next_span(0);
        self.alloc_expr(Expr::Missing { range })
    }

    // --- statements ---

    pub fn expr_stmt(&mut self, expr: ExprId) -> StmtId {
        let range = self.expr_range(expr);
        self.alloc_stmt(Stmt::Expr { expr, range })
    }

    /// `ty name = initializer;`, `var name = initializer;` when `ty` is `None`.
    pub fn let_stmt(&mut self, name: &str, ty: Option<TypeRef>, initializer: Option<ExprId>) -> StmtId {
        let name_range = self.next_span(name.len());
        let mut range = ty.as_ref().map_or(name_range, |t| t.range.cover(name_range));
        if let Some(init) = initializer {
            range = range.cover(self.expr_range(init));
        }
        self.alloc_stmt(Stmt::Let {
            name: name.to_string(),
            name_range,
            ty,
            initializer,
            range,
        })
    }

    pub fn ret(&mut self, expr: Option<ExprId>) -> StmtId {
        let keyword = self.next_span(6);
        let range = expr.map_or(keyword, |e| keyword.cover(self.expr_range(e)));
        self.alloc_stmt(Stmt::Return { expr, range })
    }

    pub fn block(&mut self, statements: Vec<StmtId>) -> StmtId {
        let open = self.next_span(1);
        let range = statements
            .iter()
            .fold(open, |acc, s| acc.cover(self.stmt_range(*s)));
        self.alloc_stmt(Stmt::Block { statements, range })
    }

    pub fn empty(&mut self) -> StmtId {
        let range = self.next_span(1);
        self.alloc_stmt(Stmt::Empty { range })
    }

    /// Wrap `statements` in a root block and compute parent links.
    pub fn finish(mut self, statements: Vec<StmtId>) -> Body {
        let root = self.block(statements);
        Body::new(root, self.stmts, self.exprs)
    }
}
