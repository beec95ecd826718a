//! Binding lambdas to functional-interface targets.
//!
//! A lambda starts `Unbound`. Overload exploration probes it against candidate parameter types
//! without reporting anything; once the enclosing call commits, the lambda is bound to its final
//! target, a synthesized implementation of the functional method is recorded, and the body is
//! started with the lambda parameters in scope.

use std::collections::HashMap;

use mosaic_hir::{Body, Expr, ExprId, LambdaBody, NodeId, Selector, Stmt, StmtId};
use mosaic_types::{
    format_type, is_assignable_from, substitute, Diagnostic, FunctionalMethod, SamError, Type,
    TypeVarId,
};

use crate::error::Rejection;
use crate::{ReturnFrame, Typeck};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum LambdaState {
    #[default]
    Unbound,
    Tentative,
    Final,
    Invalid,
}

/// The statement the synthesized functional method executes.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SynthBody {
    /// `return <expr>;`
    Return(ExprId),
    /// `<expr>;`
    Expr(ExprId),
    Block(StmtId),
}

/// Anonymous implementation of the target interface generated for a lambda.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SynthesizedClass {
    pub interface: Type,
    pub method: String,
    pub params: Vec<(String, Type)>,
    pub return_type: Type,
    pub body: SynthBody,
}

#[derive(Clone, Debug, Default)]
pub struct LambdaBinding {
    pub state: LambdaState,
    /// Target the current synthesized class was built for.
    pub candidate: Option<Type>,
    pub functional: Option<FunctionalMethod>,
    pub params: Vec<Type>,
    pub synthesized: Option<SynthesizedClass>,
    /// Type of the value the body produces, fed back into the enclosing call.
    pub return_type: Option<Type>,
    /// Bumped on every rebuild of the synthesized class.
    pub generation: u32,
    bound_final: bool,
    body_dirty: bool,
}

/// Outcome of probing a lambda against one candidate parameter type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LambdaProbe {
    pub method_returns: bool,
    /// Whether the body produces a value; `None` when its type is unknown.
    pub body_returns: Option<bool>,
    /// Functional method return type, still in terms of the candidate's unsolved variables.
    pub formal_return: Type,
    pub return_type: Option<Type>,
}

/// Expressions allowed as a statement, and therefore as the body of a void lambda.
fn is_statement_expression(body: &Body, expr: ExprId) -> bool {
    match body.expr(expr) {
        Expr::Call { .. } | Expr::New { .. } => true,
        Expr::Selector { selectors, .. } => matches!(selectors.last(), Some(Selector::Call { .. })),
        _ => false,
    }
}

/// Whether a block body has a `return <expr>;` of its own (nested lambdas excluded).
fn block_returns_value(body: &Body, lambda: ExprId, block: StmtId) -> bool {
    body.descendants(NodeId::Stmt(block)).into_iter().any(|node| match node {
        NodeId::Stmt(id) => {
            matches!(body.stmt(id), Stmt::Return { expr: Some(_), .. })
                && body.enclosing_lambda(node) == Some(lambda)
        }
        NodeId::Expr(_) => false,
    })
}

fn body_node(lambda_body: LambdaBody) -> NodeId {
    match lambda_body {
        LambdaBody::Expr(e) => NodeId::Expr(e),
        LambdaBody::Block(s) => NodeId::Stmt(s),
    }
}

fn sam_rejection(err: &SamError) -> Rejection {
    match err {
        SamError::Ambiguous { .. } => Rejection::AmbiguousFunctional,
        SamError::NotAnInterface(_) | SamError::NoAbstractMethod(_) => Rejection::NotFunctional,
    }
}

impl<'a> Typeck<'a> {
    /// Check a lambda against `target` without reporting. `defaults` holds the bounds of the
    /// candidate's unsolved variables.
    pub(crate) fn probe_lambda(
        &mut self,
        expr: ExprId,
        target: &Type,
        defaults: &HashMap<TypeVarId, Type>,
    ) -> Result<LambdaProbe, Rejection> {
        let env = self.env;
        let body = self.body;
        let Expr::Lambda {
            params,
            body: lambda_body,
            ..
        } = body.expr(expr)
        else {
            return Err(Rejection::NotFunctional);
        };
        let fm = self
            .session
            .functional_method(env, target)
            .map_err(|err| sam_rejection(&err))?;
        if fm.params.len() != params.len() {
            return Err(Rejection::Arity {
                expected: fm.params.len(),
                found: params.len(),
            });
        }

        let unsolved = |ty: &Type| ty.type_vars().iter().any(|v| defaults.contains_key(v));
        let mut scope = Vec::with_capacity(params.len());
        for (index, (param, formal)) in params.iter().zip(&fm.params).enumerate() {
            let defaulted = substitute(formal, defaults);
            let ty = match &param.ty {
                Some(tr) => {
                    let declared = self.tentatively(|tc| tc.resolve_type_ref(expr, tr));
                    if !declared.is_errorish() && !unsolved(formal) && declared != defaulted {
                        return Err(Rejection::ParamMismatch { index });
                    }
                    declared
                }
                None => defaulted,
            };
            scope.push((param.name.clone(), ty));
        }

        let method_returns = fm.return_type != Type::Void;
        let return_target =
            (method_returns && !unsolved(&fm.return_type)).then(|| fm.return_type.clone());
        let lambda_body = *lambda_body;
        let value =
            self.tentatively(|tc| tc.start_lambda_body(lambda_body, scope, return_target.as_ref()));

        let (value_ok, void_ok) = match lambda_body {
            LambdaBody::Expr(e) => (
                value.as_ref().is_some_and(|ty| *ty != Type::Void),
                is_statement_expression(body, e),
            ),
            LambdaBody::Block(s) => {
                let returns = block_returns_value(body, expr, s);
                (returns, !returns)
            }
        };
        let shape_ok = if method_returns { value_ok } else { void_ok };

        let disturbed = !self.subtree_settled(body_node(lambda_body));
        let binding = self.lambdas.entry(expr).or_default();
        binding.body_dirty |= disturbed;
        if binding.state == LambdaState::Unbound {
            binding.state = LambdaState::Tentative;
        }

        if !shape_ok {
            return Err(Rejection::ReturnShape);
        }
        if let (Some(expected), Some(actual)) = (&return_target, &value) {
            if !actual.is_errorish() && !is_assignable_from(env, expected, actual) {
                return Err(Rejection::ReturnMismatch);
            }
        }

        let body_returns = match &value {
            Some(ty) if ty.is_errorish() => None,
            _ => Some(value_ok),
        };
        Ok(LambdaProbe {
            method_returns,
            body_returns,
            formal_return: fm.return_type,
            return_type: if method_returns { value } else { None },
        })
    }

    /// Bind a lambda to its inferred target and start its body. Returns the lambda's type.
    pub(crate) fn bind_lambda(&mut self, expr: ExprId) -> Type {
        let env = self.env;
        let body = self.body;
        let Expr::Lambda {
            params,
            body: lambda_body,
            range,
        } = body.expr(expr)
        else {
            return Type::Error;
        };
        let (lambda_body, range) = (*lambda_body, *range);
        let is_final = self.final_ctx;

        let target = match self.state.inferred(expr).cloned() {
            Some(ty) if ty.is_errorish() => return self.invalidate_lambda(expr),
            Some(ty) => ty,
            None => {
                self.report(
                    expr,
                    0,
                    Diagnostic::error(
                        "lambda-without-target",
                        "lambda expression not expected here",
                        Some(range),
                    ),
                );
                return self.invalidate_lambda(expr);
            }
        };

        let fm = match self.session.functional_method(env, &target) {
            Ok(fm) => fm,
            Err(err) => {
                let code = match sam_rejection(&err) {
                    Rejection::AmbiguousFunctional => "ambiguous-functional-interface",
                    _ => "not-a-functional-interface",
                };
                self.report(expr, 0, Diagnostic::error(code, err.to_string(), Some(range)));
                return self.invalidate_lambda(expr);
            }
        };
        if fm.params.len() != params.len() {
            let message = format!(
                "lambda has {} parameter(s) but `{}` expects {}",
                params.len(),
                fm.name,
                fm.params.len()
            );
            self.report(
                expr,
                0,
                Diagnostic::error("lambda-arity-mismatch", message, Some(range)),
            );
            return self.invalidate_lambda(expr);
        }

        let mut param_types = Vec::with_capacity(params.len());
        for (index, (param, formal)) in params.iter().zip(&fm.params).enumerate() {
            let ty = match &param.ty {
                Some(tr) => {
                    let declared = self.resolve_type_ref(expr, tr);
                    if !declared.is_errorish() && declared != *formal {
                        let message = format!(
                            "lambda parameter `{}` is declared `{}` but `{}` expects `{}`",
                            param.name,
                            format_type(env, &declared),
                            fm.name,
                            format_type(env, formal)
                        );
                        self.report(
                            expr,
                            1 + index as u32,
                            Diagnostic::error("lambda-param-mismatch", message, Some(param.range)),
                        );
                    }
                    declared
                }
                None => formal.clone(),
            };
            param_types.push(ty);
        }

        let rebuild = self.lambdas.get(&expr).map_or(true, |b| {
            b.body_dirty
                || b.synthesized.is_none()
                || b.candidate.as_ref() != Some(&target)
                || b.bound_final != is_final
                || matches!(b.state, LambdaState::Unbound | LambdaState::Invalid)
        });
        if rebuild {
            self.state.clear_subtree(body, body_node(lambda_body));
            self.drop_node_caches(body_node(lambda_body));
            let binding = self.lambdas.entry(expr).or_default();
            binding.generation += 1;
            tracing::debug!(
                target: "mosaic.typeck",
                ?expr,
                generation = binding.generation,
                is_final,
                "rebuilding lambda"
            );
        }

        let scope: Vec<(String, Type)> = params
            .iter()
            .map(|p| p.name.clone())
            .zip(param_types.iter().cloned())
            .collect();
        let method_returns = fm.return_type != Type::Void;
        let value = self.start_lambda_body(lambda_body, scope.clone(), Some(&fm.return_type));

        match lambda_body {
            LambdaBody::Expr(e) if method_returns => match &value {
                Some(Type::Void) => {
                    let message = format!("`{}` must return `{}`", fm.name, format_type(env, &fm.return_type));
                    self.report(expr, 8, Diagnostic::error("return-mismatch", message, Some(body.expr(e).range())));
                }
                Some(actual) if !actual.is_errorish() && !is_assignable_from(env, &fm.return_type, actual) => {
                    let message = format!(
                        "bad return type in lambda: `{}` cannot be converted to `{}`",
                        format_type(env, actual),
                        format_type(env, &fm.return_type)
                    );
                    self.report(expr, 8, Diagnostic::error("return-mismatch", message, Some(body.expr(e).range())));
                }
                _ => {}
            },
            LambdaBody::Expr(e) => {
                if !is_statement_expression(body, e) {
                    let message = format!("`{}` is void; the lambda body must be a statement", fm.name);
                    self.report(expr, 8, Diagnostic::error("return-mismatch", message, Some(body.expr(e).range())));
                }
            }
            LambdaBody::Block(s) => {
                if method_returns && !block_returns_value(body, expr, s) {
                    let message = format!("lambda body must return `{}`", format_type(env, &fm.return_type));
                    self.report(expr, 8, Diagnostic::error("return-mismatch", message, Some(range)));
                }
            }
        }

        let synth_body = match lambda_body {
            LambdaBody::Expr(e) if method_returns => SynthBody::Return(e),
            LambdaBody::Expr(e) => SynthBody::Expr(e),
            LambdaBody::Block(s) => SynthBody::Block(s),
        };
        let synthesized = SynthesizedClass {
            interface: target.clone(),
            method: fm.name.clone(),
            params: scope,
            return_type: fm.return_type.clone(),
            body: synth_body,
        };

        let binding = self.lambdas.entry(expr).or_default();
        binding.state = if is_final {
            LambdaState::Final
        } else {
            LambdaState::Tentative
        };
        binding.candidate = Some(target.clone());
        binding.functional = Some(fm);
        binding.params = param_types;
        binding.synthesized = Some(synthesized);
        binding.return_type = if method_returns { value } else { None };
        binding.bound_final = is_final;
        binding.body_dirty = false;
        target
    }

    /// Give up on a lambda without reporting; its body is still checked with unknown parameters.
    pub(crate) fn invalidate_lambda(&mut self, expr: ExprId) -> Type {
        let body = self.body;
        let Expr::Lambda {
            params,
            body: lambda_body,
            ..
        } = body.expr(expr)
        else {
            return Type::Error;
        };
        let lambda_body = *lambda_body;
        let binding = self.lambdas.entry(expr).or_default();
        let was_invalid = binding.state == LambdaState::Invalid;
        binding.state = LambdaState::Invalid;
        binding.candidate = None;
        binding.functional = None;
        binding.synthesized = None;
        binding.return_type = None;
        binding.params = vec![Type::Unknown; params.len()];
        binding.body_dirty = false;
        if !was_invalid {
            self.state.clear_subtree(body, body_node(lambda_body));
            self.drop_node_caches(body_node(lambda_body));
        }

        let scope = params
            .iter()
            .map(|p| (p.name.clone(), Type::Unknown))
            .collect();
        self.start_lambda_body(lambda_body, scope, None);
        self.state
            .record_type(expr, Type::Error, self.final_ctx, false);
        Type::Error
    }

    /// Start a lambda body with `params` in scope; returns the type of the value it produces.
    fn start_lambda_body(
        &mut self,
        lambda_body: LambdaBody,
        params: Vec<(String, Type)>,
        returns: Option<&Type>,
    ) -> Option<Type> {
        let env = self.env;
        self.scopes.push(params.into_iter().collect());
        let value = match lambda_body {
            LambdaBody::Expr(e) => {
                if let Some(target) = returns.filter(|t| **t != Type::Void) {
                    self.push_target(e, target.clone(), self.final_ctx);
                }
                Some(self.start_expr_in_ctx(e))
            }
            LambdaBody::Block(s) => {
                self.returns.push(ReturnFrame::new(returns.cloned(), true));
                self.walk_stmt(s);
                self.returns.pop().and_then(|frame| frame.value_type(env))
            }
        };
        self.scopes.pop();
        value
    }

    /// Return type recorded by the last binding, for feedback into the enclosing call.
    pub(crate) fn lambda_return_type(&self, expr: ExprId) -> Option<Type> {
        self.lambdas.get(&expr).and_then(|b| b.return_type.clone())
    }

    /// Every expression at or below `node` holds a type computed in a final context.
    pub(crate) fn subtree_settled(&self, node: NodeId) -> bool {
        std::iter::once(node)
            .chain(self.body.descendants(node))
            .all(|n| match n {
                NodeId::Expr(id) => self.state.get(id).is_some_and(|s| s.settled_type().is_some()),
                NodeId::Stmt(_) => true,
            })
    }
}
