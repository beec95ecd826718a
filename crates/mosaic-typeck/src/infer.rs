//! Target-type propagation between parent and child expressions.
//!
//! Every expression carries an optional inferred (target) type pushed down by its parent. A
//! tentative target may be replaced freely; a final one locks the node until the subtree is
//! cleared. The cached static type is only trusted when it was computed in a final context and
//! nothing has disturbed the node since.

use mosaic_hir::{Body, Expr, ExprId, LambdaBody, NodeId, Selector, Stmt};
use mosaic_types::Type;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum NodePhase {
    #[default]
    Idle,
    Started,
    Stopped,
}

#[derive(Clone, Debug, Default)]
pub struct ExprState {
    pub inferred: Option<Type>,
    pub inferred_final: bool,
    pub locked: bool,
    /// Last computed static type (final or provisional).
    pub ty: Option<Type>,
    pub started_final: bool,
    /// Set when the inferred type changed or the subtree was cleared since the last start.
    pub dirty: bool,
    /// The static type depends on the target rather than on the node's own operands.
    pub poly: bool,
    pub phase: NodePhase,
}

impl ExprState {
    /// Cached static type, usable without re-deriving.
    pub fn settled_type(&self) -> Option<&Type> {
        if self.started_final && !self.dirty {
            self.ty.as_ref()
        } else {
            None
        }
    }
}

#[derive(Debug, Default)]
pub struct InferState {
    exprs: Vec<ExprState>,
}

impl InferState {
    pub fn new(body: &Body) -> Self {
        Self {
            exprs: vec![ExprState::default(); body.exprs.len()],
        }
    }

    pub fn contains(&self, expr: ExprId) -> bool {
        expr.idx() < self.exprs.len()
    }

    pub fn get(&self, expr: ExprId) -> Option<&ExprState> {
        self.exprs.get(expr.idx())
    }

    pub fn get_mut(&mut self, expr: ExprId) -> Option<&mut ExprState> {
        self.exprs.get_mut(expr.idx())
    }

    pub fn inferred(&self, expr: ExprId) -> Option<&Type> {
        self.get(expr).and_then(|s| s.inferred.as_ref())
    }

    pub fn is_final(&self, expr: ExprId) -> bool {
        self.get(expr).is_some_and(|s| s.inferred_final)
    }

    /// Record `ty` as the target of `expr`.
    ///
    /// Returns `false` when the node is locked and the call is tentative. A final call always
    /// applies and locks the node. Any accepted change drops the cached static type.
    pub fn set_inferred_type(&mut self, expr: ExprId, ty: Type, is_final: bool) -> bool {
        let Some(state) = self.get_mut(expr) else {
            return false;
        };
        if state.locked && !is_final {
            tracing::trace!(target: "mosaic.typeck", ?expr, "ignored tentative target on locked node");
            return false;
        }
        let changed =
            state.inferred.as_ref() != Some(&ty) || (is_final && !state.inferred_final);
        state.inferred = Some(ty);
        if is_final {
            state.inferred_final = true;
            state.locked = true;
        }
        if changed {
            state.ty = None;
            state.started_final = false;
            state.dirty = true;
        }
        true
    }

    /// Reset `expr` and every expression below it, unlocking them.
    pub fn clear_inferred_type(&mut self, body: &Body, expr: ExprId) {
        self.clear_subtree(body, NodeId::Expr(expr));
    }

    /// Reset every expression at or below `node`.
    pub fn clear_subtree(&mut self, body: &Body, node: NodeId) {
        let nodes = std::iter::once(node).chain(body.descendants(node));
        for n in nodes {
            if let NodeId::Expr(id) = n {
                if let Some(state) = self.get_mut(id) {
                    *state = ExprState {
                        dirty: true,
                        ..ExprState::default()
                    };
                }
            }
        }
    }

    /// Mark a started node with its freshly computed type.
    pub fn record_type(&mut self, expr: ExprId, ty: Type, is_final: bool, poly: bool) {
        if let Some(state) = self.get_mut(expr) {
            state.ty = Some(ty);
            state.started_final = is_final;
            state.dirty = false;
            state.poly = poly;
            state.phase = NodePhase::Started;
        }
    }

    pub fn stop(&mut self, body: &Body, expr: ExprId) {
        let nodes = std::iter::once(NodeId::Expr(expr)).chain(body.descendants(NodeId::Expr(expr)));
        for n in nodes {
            if let NodeId::Expr(id) = n {
                if let Some(state) = self.get_mut(id) {
                    state.phase = NodePhase::Stopped;
                    state.dirty = true;
                    state.started_final = false;
                }
            }
        }
    }
}

/// Whether `parent` pushes its target types into `child`.
///
/// Call and constructor arguments, index expressions, local initializers, return values and
/// expression-bodied lambdas take part. Selector receivers and operator operands are typed on
/// their own; a chain's external target only reaches its last selector, which is not a child
/// expression.
pub fn propagates_inferred_type(body: &Body, parent: NodeId, child: ExprId) -> bool {
    match parent {
        NodeId::Expr(id) => match body.expr(id) {
            Expr::Call { args, .. } | Expr::New { args, .. } => args.contains(&child),
            Expr::Selector { selectors, .. } => selectors.iter().any(|s| match s {
                Selector::Call { args, .. } => args.contains(&child),
                Selector::Index { index, .. } => *index == child,
                Selector::Field { .. } | Selector::This { .. } | Selector::Super { .. } => false,
            }),
            Expr::Lambda { body: lambda_body, .. } => *lambda_body == LambdaBody::Expr(child),
            Expr::Binary { .. }
            | Expr::Literal { .. }
            | Expr::Name { .. }
            | Expr::This { .. }
            | Expr::Super { .. }
            | Expr::Missing { .. } => false,
        },
        NodeId::Stmt(id) => match body.stmt(id) {
            Stmt::Let { initializer, .. } => *initializer == Some(child),
            Stmt::Return { expr, .. } => *expr == Some(child),
            Stmt::Expr { .. } | Stmt::Block { .. } | Stmt::Empty { .. } => false,
        },
    }
}
