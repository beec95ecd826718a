use mosaic_types::Span;
use std::fmt;

use crate::BinaryOp;

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExprId(u32);

impl ExprId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        ExprId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for ExprId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ExprId({})", self.0)
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtId(u32);

impl StmtId {
    pub(crate) fn from_raw(raw: u32) -> Self {
        StmtId(raw)
    }

    #[must_use]
    pub fn idx(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({})", self.0)
    }
}

/// Either kind of body node; used for parent links and subtree walks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeId {
    Expr(ExprId),
    Stmt(StmtId),
}

impl From<ExprId> for NodeId {
    fn from(id: ExprId) -> Self {
        NodeId::Expr(id)
    }
}

impl From<StmtId> for NodeId {
    fn from(id: StmtId) -> Self {
        NodeId::Stmt(id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Arena<T> {
    data: Vec<T>,
}

impl<T> Arena<T> {
    pub fn alloc(&mut self, value: T) -> u32 {
        let idx = self.data.len() as u32;
        self.data.push(value);
        idx
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.data.iter().enumerate().map(|(i, v)| (i as u32, v))
    }
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Arena { data: Vec::new() }
    }
}

impl<T> std::ops::Index<ExprId> for Arena<T> {
    type Output = T;

    fn index(&self, index: ExprId) -> &Self::Output {
        &self.data[index.idx()]
    }
}

impl<T> std::ops::Index<StmtId> for Arena<T> {
    type Output = T;

    fn index(&self, index: StmtId) -> &Self::Output {
        &self.data[index.idx()]
    }
}

/// A method or lambda body: statement and expression arenas plus parent links.
///
/// Parent links are computed once when the body is assembled; nodes never move afterwards.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Body {
    pub root: StmtId,
    pub stmts: Arena<Stmt>,
    pub exprs: Arena<Expr>,
    expr_parents: Vec<Option<NodeId>>,
    stmt_parents: Vec<Option<NodeId>>,
}

impl Body {
    #[must_use]
    pub fn empty(range: Span) -> Self {
        let mut stmts = Arena::default();
        let root = StmtId::from_raw(stmts.alloc(Stmt::Block {
            statements: Vec::new(),
            range,
        }));
        Body::new(root, stmts, Arena::default())
    }

    /// Assemble a body and compute parent links for everything reachable from `root`.
    #[must_use]
    pub fn new(root: StmtId, stmts: Arena<Stmt>, exprs: Arena<Expr>) -> Self {
        let mut body = Body {
            root,
            expr_parents: vec![None; exprs.len()],
            stmt_parents: vec![None; stmts.len()],
            stmts,
            exprs,
        };
        let mut stack = vec![NodeId::Stmt(root)];
        while let Some(node) = stack.pop() {
            for child in body.children(node) {
                match child {
                    NodeId::Expr(id) => body.expr_parents[id.idx()] = Some(node),
                    NodeId::Stmt(id) => body.stmt_parents[id.idx()] = Some(node),
                }
                stack.push(child);
            }
        }
        body
    }

    #[must_use]
    pub fn expr(&self, id: ExprId) -> &Expr {
        &self.exprs[id]
    }

    #[must_use]
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id]
    }

    #[must_use]
    pub fn expr_ids(&self) -> impl Iterator<Item = ExprId> + '_ {
        self.exprs.iter().map(|(idx, _)| ExprId::from_raw(idx))
    }

    #[must_use]
    pub fn expr_parent(&self, id: ExprId) -> Option<NodeId> {
        self.expr_parents.get(id.idx()).copied().flatten()
    }

    #[must_use]
    pub fn stmt_parent(&self, id: StmtId) -> Option<NodeId> {
        self.stmt_parents.get(id.idx()).copied().flatten()
    }

    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        match node {
            NodeId::Expr(id) => self.expr_parent(id),
            NodeId::Stmt(id) => self.stmt_parent(id),
        }
    }

    /// Direct children in source order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        match node {
            NodeId::Expr(id) => match self.expr(id) {
                Expr::Call { args, .. } | Expr::New { args, .. } => {
                    out.extend(args.iter().copied().map(NodeId::Expr));
                }
                Expr::Selector {
                    base, selectors, ..
                } => {
                    out.push(NodeId::Expr(*base));
                    for selector in selectors {
                        match selector {
                            Selector::Call { args, .. } => {
                                out.extend(args.iter().copied().map(NodeId::Expr))
                            }
                            Selector::Index { index, .. } => out.push(NodeId::Expr(*index)),
                            Selector::Field { .. } | Selector::This { .. } | Selector::Super { .. } => {}
                        }
                    }
                }
                Expr::Binary { first, rest, .. } => {
                    out.push(NodeId::Expr(*first));
                    out.extend(rest.iter().filter_map(|operand| match &operand.rhs {
                        Operand::Expr(e) => Some(NodeId::Expr(*e)),
                        Operand::Type(_) => None,
                    }));
                }
                Expr::Lambda { body, .. } => out.push(match body {
                    LambdaBody::Expr(e) => NodeId::Expr(*e),
                    LambdaBody::Block(s) => NodeId::Stmt(*s),
                }),
                Expr::Literal { .. }
                | Expr::Name { .. }
                | Expr::This { .. }
                | Expr::Super { .. }
                | Expr::Missing { .. } => {}
            },
            NodeId::Stmt(id) => match self.stmt(id) {
                Stmt::Block { statements, .. } => {
                    out.extend(statements.iter().copied().map(NodeId::Stmt))
                }
                Stmt::Let { initializer, .. } => out.extend(initializer.map(NodeId::Expr)),
                Stmt::Expr { expr, .. } => out.push(NodeId::Expr(*expr)),
                Stmt::Return { expr, .. } => out.extend(expr.map(NodeId::Expr)),
                Stmt::Empty { .. } => {}
            },
        }
        out
    }

    /// Every node strictly below `node`, in pre-order.
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).into_iter().rev());
        }
        out
    }

    /// Whether `node` is `ancestor` or lies below it.
    #[must_use]
    pub fn is_within(&self, node: NodeId, ancestor: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(n) = current {
            if n == ancestor {
                return true;
            }
            current = self.parent(n);
        }
        false
    }

    /// The nearest enclosing lambda of `node`, if any.
    #[must_use]
    pub fn enclosing_lambda(&self, node: NodeId) -> Option<ExprId> {
        let mut current = self.parent(node);
        while let Some(n) = current {
            if let NodeId::Expr(id) = n {
                if matches!(self.expr(id), Expr::Lambda { .. }) {
                    return Some(id);
                }
            }
            current = self.parent(n);
        }
        None
    }

    #[must_use]
    pub fn range(&self, node: NodeId) -> Span {
        match node {
            NodeId::Expr(id) => self.expr(id).range(),
            NodeId::Stmt(id) => self.stmt(id).range(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Block {
        statements: Vec<StmtId>,
        range: Span,
    },
    /// A local declaration. `ty: None` takes the initializer's type.
    Let {
        name: String,
        name_range: Span,
        ty: Option<TypeRef>,
        initializer: Option<ExprId>,
        range: Span,
    },
    Expr {
        expr: ExprId,
        range: Span,
    },
    Return {
        expr: Option<ExprId>,
        range: Span,
    },
    Empty {
        range: Span,
    },
}

impl Stmt {
    #[must_use]
    pub fn range(&self) -> Span {
        match self {
            Stmt::Block { range, .. }
            | Stmt::Let { range, .. }
            | Stmt::Expr { range, .. }
            | Stmt::Return { range, .. }
            | Stmt::Empty { range } => *range,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LiteralKind {
    Int,
    Long,
    Float,
    Double,
    Char,
    String,
    Boolean,
    Null,
}

/// A syntactic type reference, resolved by the type checker.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeRef {
    /// Simple, qualified or primitive name (`String`, `java.util.List`, `int`).
    pub name: String,
    pub args: Vec<TypeArgRef>,
    pub dims: usize,
    pub range: Span,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum TypeArgRef {
    Type(TypeRef),
    Unbounded,
    Extends(TypeRef),
    Super(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    Field {
        name: String,
        range: Span,
    },
    Call {
        name: String,
        type_args: Vec<TypeRef>,
        args: Vec<ExprId>,
        range: Span,
    },
    Index {
        index: ExprId,
        range: Span,
    },
    /// `Outer.this`
    This {
        range: Span,
    },
    /// `Iface.super`
    Super {
        range: Span,
    },
}

impl Selector {
    #[must_use]
    pub fn range(&self) -> Span {
        match self {
            Selector::Field { range, .. }
            | Selector::Call { range, .. }
            | Selector::Index { range, .. }
            | Selector::This { range }
            | Selector::Super { range } => *range,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operand {
    Expr(ExprId),
    /// Right side of `instanceof`.
    Type(TypeRef),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryOperand {
    pub op: BinaryOp,
    pub op_range: Span,
    pub rhs: Operand,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LambdaParam {
    pub name: String,
    pub ty: Option<TypeRef>,
    pub range: Span,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LambdaBody {
    Expr(ExprId),
    Block(StmtId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    Literal {
        kind: LiteralKind,
        value: String,
        range: Span,
    },
    Name {
        name: String,
        range: Span,
    },
    /// Unqualified method call `name(args)`.
    Call {
        name: String,
        type_args: Vec<TypeRef>,
        args: Vec<ExprId>,
        range: Span,
    },
    /// `base.sel1.sel2...`
    Selector {
        base: ExprId,
        selectors: Vec<Selector>,
        range: Span,
    },
    /// Flat operator chain `first op1 rhs1 op2 rhs2 ...`; precedence is derived later.
    Binary {
        first: ExprId,
        rest: Vec<BinaryOperand>,
        range: Span,
    },
    New {
        class: TypeRef,
        diamond: bool,
        args: Vec<ExprId>,
        range: Span,
    },
    Lambda {
        params: Vec<LambdaParam>,
        body: LambdaBody,
        range: Span,
    },
    This {
        range: Span,
    },
    Super {
        range: Span,
    },
    Missing {
        range: Span,
    },
}

impl Expr {
    #[must_use]
    pub fn range(&self) -> Span {
        match self {
            Expr::Literal { range, .. }
            | Expr::Name { range, .. }
            | Expr::Call { range, .. }
            | Expr::Selector { range, .. }
            | Expr::Binary { range, .. }
            | Expr::New { range, .. }
            | Expr::Lambda { range, .. }
            | Expr::This { range }
            | Expr::Super { range }
            | Expr::Missing { range } => *range,
        }
    }
}
