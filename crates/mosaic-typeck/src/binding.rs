//! Queries for the data-binding transform over a checked body.

use mosaic_hir::{BinaryOp, Body, Expr, ExprId, NodeId, Operand, Selector};
use mosaic_types::{FieldRef, MethodRef, Type, TypeEnv};

use crate::selector::BoundKind;
use crate::TypeckResult;

/// What a binding expression observes and calls.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BindingDescriptor {
    /// Names read as properties (locals, fields, getters), in source order.
    pub property_reads: Vec<String>,
    /// Methods and constructors invoked, in source order.
    pub method_calls: Vec<MethodRef>,
    /// Operators of every operator chain, in source order.
    pub operators: Vec<BinaryOp>,
    pub is_constant: bool,
    pub ty: Option<Type>,
}

fn is_constant_field(env: &dyn TypeEnv, field: FieldRef) -> bool {
    env.field(field).is_some_and(|def| {
        def.is_static
            && def.is_final
            && (def.ty.is_primitive() || def.ty == Type::Declared(env.well_known().string))
    })
}

/// Whether `expr` is a compile-time constant: a literal other than `null`, a static final field of
/// primitive or `String` type, or an operator chain over constants without `instanceof`.
pub fn is_constant(env: &dyn TypeEnv, body: &Body, result: &TypeckResult, expr: ExprId) -> bool {
    match body.expr(expr) {
        Expr::Literal { kind, .. } => *kind != mosaic_hir::LiteralKind::Null,
        Expr::Name { .. } => result
            .bound_field(expr)
            .is_some_and(|field| is_constant_field(env, field)),
        Expr::Selector { selectors, .. } => {
            let Some(chain) = result.selector_bindings(expr) else {
                return false;
            };
            let static_base = matches!(chain.base.kind, BoundKind::Type | BoundKind::Package);
            let fields_only = selectors.iter().all(|s| matches!(s, Selector::Field { .. }));
            static_base
                && fields_only
                && chain
                    .selectors
                    .last()
                    .and_then(|last| last.field)
                    .is_some_and(|field| is_constant_field(env, field))
        }
        Expr::Binary { first, rest, .. } => {
            is_constant(env, body, result, *first)
                && rest.iter().all(|operand| match &operand.rhs {
                    Operand::Expr(e) => is_constant(env, body, result, *e),
                    Operand::Type(_) => false,
                })
        }
        Expr::Call { .. }
        | Expr::New { .. }
        | Expr::Lambda { .. }
        | Expr::This { .. }
        | Expr::Super { .. }
        | Expr::Missing { .. } => false,
    }
}

/// Collect what `expr` depends on. Lambda bodies are not descended into.
pub fn binding_descriptor(
    env: &dyn TypeEnv,
    body: &Body,
    result: &TypeckResult,
    expr: ExprId,
) -> BindingDescriptor {
    let mut descriptor = BindingDescriptor {
        is_constant: is_constant(env, body, result, expr),
        ty: result.type_of_expr(expr).cloned(),
        ..BindingDescriptor::default()
    };
    collect(body, result, expr, &mut descriptor);
    descriptor
}

fn collect(body: &Body, result: &TypeckResult, expr: ExprId, out: &mut BindingDescriptor) {
    match body.expr(expr) {
        Expr::Name { name, .. } => out.property_reads.push(name.clone()),
        Expr::Call { .. } | Expr::New { .. } => {
            out.method_calls.extend(result.bound_method(expr));
        }
        Expr::Selector {
            base, selectors, ..
        } => {
            let chain = result.selector_bindings(expr);
            let base_kind = chain.map(|c| c.base.kind);
            if !matches!(base_kind, Some(BoundKind::Type | BoundKind::Package)) {
                collect(body, result, *base, out);
            }
            for (index, selector) in selectors.iter().enumerate() {
                let binding = chain.and_then(|c| c.selectors.get(index));
                match selector {
                    Selector::Field { name, .. } => {
                        if let Some(b) = binding {
                            match b.kind {
                                BoundKind::Field | BoundKind::Getter | BoundKind::ArrayLength => {
                                    out.property_reads.push(name.clone());
                                }
                                _ => {}
                            }
                        }
                    }
                    Selector::Call { args, .. } => {
                        out.method_calls.extend(binding.and_then(|b| b.method));
                        for arg in args {
                            collect(body, result, *arg, out);
                        }
                    }
                    Selector::Index { index, .. } => collect(body, result, *index, out),
                    Selector::This { .. } | Selector::Super { .. } => {}
                }
            }
            return;
        }
        Expr::Binary { rest, .. } => out.operators.extend(rest.iter().map(|operand| operand.op)),
        Expr::Lambda { .. } => return,
        Expr::Literal { .. } | Expr::This { .. } | Expr::Super { .. } | Expr::Missing { .. } => {}
    }
    for child in body.children(NodeId::Expr(expr)) {
        if let NodeId::Expr(child) = child {
            collect(body, result, child, out);
        }
    }
}
