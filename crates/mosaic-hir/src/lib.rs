//! Expression and statement arena for method and lambda bodies.
//!
//! Bodies are produced by the parser collaborator (or [`BodyBuilder`] in tests) and are immutable
//! afterwards: the type checker keeps all of its per-node state on the side, keyed by
//! [`ExprId`] / [`StmtId`].

mod builder;
mod hir;
mod ops;

pub use builder::BodyBuilder;
pub use hir::{
    Arena, BinaryOperand, Body, Expr, ExprId, LambdaBody, LambdaParam, LiteralKind, NodeId,
    Operand, Selector, Stmt, StmtId, TypeArgRef, TypeRef,
};
pub use ops::{BinaryOp, OperatorClass};
