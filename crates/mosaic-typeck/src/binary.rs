//! Precedence trees for flat operator chains, and operand checks per operator.

use mosaic_hir::{BinaryOp, Expr, ExprId, Operand, OperatorClass};
use mosaic_types::{
    binary_numeric_promotion, format_type, is_assignable_from, unboxed, Diagnostic, PrimitiveType,
    Type, TypeEnv,
};

use crate::Typeck;

/// An edge of the precedence tree: an operand of the flat chain or another operator node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TreeChild {
    /// Index into the chain's operands (`0` is the first operand).
    Leaf(usize),
    Node(usize),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TreeNode {
    pub op: BinaryOp,
    pub lhs: TreeChild,
    pub rhs: TreeChild,
}

/// Operator tree derived from `first op1 e1 op2 e2 ...`.
///
/// Node `i` always holds the `i`th operator of the chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecedenceTree {
    pub nodes: Vec<TreeNode>,
    pub root: TreeChild,
}

impl PrecedenceTree {
    /// Grow the tree along its right spine, one operator at a time.
    pub fn build(ops: &[BinaryOp]) -> Self {
        let mut nodes: Vec<TreeNode> = Vec::with_capacity(ops.len());
        let mut root = TreeChild::Leaf(0);
        for (i, op) in ops.iter().copied().enumerate() {
            let leaf = TreeChild::Leaf(i + 1);
            let bp = op.binding_power();
            let splice_at = match root {
                TreeChild::Node(r) if bp > nodes[r].op.binding_power() => {
                    let mut parent = r;
                    while let TreeChild::Node(child) = nodes[parent].rhs {
                        if bp > nodes[child].op.binding_power() {
                            parent = child;
                        } else {
                            break;
                        }
                    }
                    Some(parent)
                }
                _ => None,
            };
            match splice_at {
                Some(parent) => {
                    let lhs = nodes[parent].rhs;
                    nodes.push(TreeNode { op, lhs, rhs: leaf });
                    nodes[parent].rhs = TreeChild::Node(i);
                }
                None => {
                    nodes.push(TreeNode { op, lhs: root, rhs: leaf });
                    root = TreeChild::Node(i);
                }
            }
        }
        Self { nodes, root }
    }

    /// Fully parenthesized rendering, with `leaf` naming each operand.
    pub fn render(&self, leaf: &dyn Fn(usize) -> String) -> String {
        self.render_child(self.root, leaf)
    }

    fn render_child(&self, child: TreeChild, leaf: &dyn Fn(usize) -> String) -> String {
        match child {
            TreeChild::Leaf(i) => leaf(i),
            TreeChild::Node(n) => {
                let node = &self.nodes[n];
                format!(
                    "({} {} {})",
                    self.render_child(node.lhs, leaf),
                    node.op.token(),
                    self.render_child(node.rhs, leaf)
                )
            }
        }
    }

    /// Operator nodes in evaluation order (children before parents).
    pub fn post_order(&self) -> Vec<usize> {
        fn go(tree: &PrecedenceTree, child: TreeChild, out: &mut Vec<usize>) {
            if let TreeChild::Node(n) = child {
                go(tree, tree.nodes[n].lhs, out);
                go(tree, tree.nodes[n].rhs, out);
                out.push(n);
            }
        }
        let mut out = Vec::with_capacity(self.nodes.len());
        go(self, self.root, &mut out);
        out
    }
}

/// A checked operand: either a value or the type on the right of `instanceof`.
#[derive(Clone, Debug)]
enum Checked {
    Value(Type),
    TypeOperand(Type),
}

impl Checked {
    fn ty(&self) -> &Type {
        match self {
            Checked::Value(ty) | Checked::TypeOperand(ty) => ty,
        }
    }
}

fn is_string(env: &dyn TypeEnv, ty: &Type) -> bool {
    ty.class_id() == Some(env.well_known().string)
}

/// Unary numeric promotion of a shift's left operand.
fn promote_unary(p: PrimitiveType) -> PrimitiveType {
    match p {
        PrimitiveType::Byte | PrimitiveType::Short | PrimitiveType::Char => PrimitiveType::Int,
        other => other,
    }
}

/// Reference operands of `==` must be related by some conversion.
fn references_comparable(env: &dyn TypeEnv, a: &Type, b: &Type) -> bool {
    let interface_or_var = |ty: &Type| match ty {
        Type::TypeVar(_) => true,
        other => other
            .class_id()
            .and_then(|id| env.class(id))
            .is_some_and(|def| def.is_interface()),
    };
    a == b
        || is_assignable_from(env, a, b)
        || is_assignable_from(env, b, a)
        || (interface_or_var(a) && !matches!(b, Type::Array(_)))
        || (interface_or_var(b) && !matches!(a, Type::Array(_)))
}

/// Result type of `lhs op rhs`, or `None` for a mismatch.
fn operator_result(env: &dyn TypeEnv, op: BinaryOp, lhs: &Checked, rhs: &Checked) -> Option<Type> {
    let (l, r) = (lhs.ty(), rhs.ty());
    if op != BinaryOp::InstanceOf && matches!(rhs, Checked::TypeOperand(_)) {
        return None;
    }
    let lp = unboxed(env, l);
    let rp = unboxed(env, r);
    let numeric = |p: Option<PrimitiveType>| p.is_some_and(PrimitiveType::is_numeric);
    let boolean = |p: Option<PrimitiveType>| p == Some(PrimitiveType::Boolean);

    match op.class() {
        OperatorClass::InstanceOf => {
            let Checked::TypeOperand(target) = rhs else {
                return None;
            };
            (l.is_reference() && (target.is_reference() || target.is_errorish()))
                .then(Type::boolean)
        }
        OperatorClass::Arithmetic if op == BinaryOp::Add && (is_string(env, l) || is_string(env, r)) => {
            (*l != Type::Void && *r != Type::Void).then(|| Type::Declared(env.well_known().string))
        }
        OperatorClass::Arithmetic if op.is_shift() => match (lp, rp) {
            (Some(a), Some(b)) if a.is_integral() && b.is_integral() => {
                Some(Type::Primitive(promote_unary(a)))
            }
            _ => None,
        },
        OperatorClass::Arithmetic | OperatorClass::Conditional if op.is_comparison() => {
            (numeric(lp) && numeric(rp)).then(Type::boolean)
        }
        OperatorClass::Arithmetic => match (lp, rp) {
            (Some(a), Some(b)) => binary_numeric_promotion(a, b).map(Type::Primitive),
            _ => None,
        },
        OperatorClass::Bitwise => match (lp, rp) {
            (Some(PrimitiveType::Boolean), Some(PrimitiveType::Boolean)) => Some(Type::boolean()),
            (Some(a), Some(b)) if a.is_integral() && b.is_integral() => {
                binary_numeric_promotion(a, b).map(Type::Primitive)
            }
            _ => None,
        },
        OperatorClass::Conditional if op.is_logical() => (boolean(lp) && boolean(rp)).then(Type::boolean),
        OperatorClass::Conditional => {
            let ok = if l.is_primitive() || r.is_primitive() {
                (numeric(lp) && numeric(rp)) || (boolean(lp) && boolean(rp))
            } else if matches!((l, r), (Type::Null, _) | (_, Type::Null)) {
                true
            } else if l.is_reference() && r.is_reference() {
                references_comparable(env, l, r)
            } else {
                false
            };
            ok.then(Type::boolean)
        }
    }
}

/// Type assumed for a node whose operands were already in error.
fn suppressed_result(op: BinaryOp) -> Type {
    match op.class() {
        OperatorClass::InstanceOf | OperatorClass::Conditional => Type::boolean(),
        OperatorClass::Arithmetic if op.is_comparison() => Type::boolean(),
        OperatorClass::Arithmetic | OperatorClass::Bitwise => Type::Unknown,
    }
}

impl<'a> Typeck<'a> {
    /// Type the operands of a flat chain and check each operator node of its precedence tree.
    pub(crate) fn check_binary(&mut self, expr: ExprId) -> Type {
        let env = self.env;
        let body = self.body;
        let Expr::Binary { first, rest, .. } = body.expr(expr) else {
            return Type::Error;
        };
        let tree = self
            .trees
            .entry(expr)
            .or_insert_with(|| {
                let ops: Vec<BinaryOp> = rest.iter().map(|operand| operand.op).collect();
                PrecedenceTree::build(&ops)
            })
            .clone();

        let mut leaves = Vec::with_capacity(rest.len() + 1);
        leaves.push(Checked::Value(self.start_expr_in_ctx(*first)));
        for operand in rest {
            leaves.push(match &operand.rhs {
                Operand::Expr(e) => Checked::Value(self.start_expr_in_ctx(*e)),
                Operand::Type(tr) => Checked::TypeOperand(self.resolve_type_ref(expr, tr)),
            });
        }

        let mut results: Vec<Option<Checked>> = vec![None; tree.nodes.len()];
        for n in tree.post_order() {
            let node = tree.nodes[n];
            let resolve = |child: TreeChild| match child {
                TreeChild::Leaf(i) => leaves[i].clone(),
                TreeChild::Node(m) => results[m].clone().unwrap_or(Checked::Value(Type::Unknown)),
            };
            let (lhs, rhs) = (resolve(node.lhs), resolve(node.rhs));
            let ty = if lhs.ty().is_errorish() || rhs.ty().is_errorish() {
                suppressed_result(node.op)
            } else {
                match operator_result(env, node.op, &lhs, &rhs) {
                    Some(ty) => ty,
                    None => {
                        let message = format!(
                            "operator `{}` cannot be applied to `{}` and `{}`",
                            node.op.token(),
                            format_type(env, lhs.ty()),
                            format_type(env, rhs.ty())
                        );
                        let span = rest[n].op_range;
                        self.report(expr, n as u32, Diagnostic::error("type-mismatch", message, Some(span)));
                        Type::Error
                    }
                }
            };
            results[n] = Some(Checked::Value(ty));
        }

        match tree.root {
            TreeChild::Leaf(i) => leaves[i].ty().clone(),
            TreeChild::Node(n) => results[n]
                .as_ref()
                .map_or(Type::Error, |checked| checked.ty().clone()),
        }
    }
}
