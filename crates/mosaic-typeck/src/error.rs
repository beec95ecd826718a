use mosaic_hir::{ExprId, NodeId};

/// Why a candidate was rejected during tentative exploration. Rejections never become
/// diagnostics on their own; the caller decides whether the final commit reports anything.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Rejection {
    NotFunctional,
    AmbiguousFunctional,
    Arity { expected: usize, found: usize },
    ParamMismatch { index: usize },
    /// Void body against a value-returning method, or the reverse.
    ReturnShape,
    ReturnMismatch,
    ArgumentMismatch { index: usize },
}

/// Broken engine invariants or lifecycle misuse. These abort the walk.
#[derive(Debug, thiserror::Error)]
pub enum InternalError {
    #[error("`{operation}` called in lifecycle phase {phase}")]
    Lifecycle {
        operation: &'static str,
        phase: &'static str,
    },
    #[error("{0:?} does not belong to this body")]
    UnknownExpr(ExprId),
    #[error("{node:?} has no parent but is not the body root")]
    Detached { node: NodeId },
}
