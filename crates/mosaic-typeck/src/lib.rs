//! Semantic core: static types, call binding, lambda synthesis and operator trees for one body.
//!
//! A [`Typeck`] walks a [`Body`] through `init -> start -> validate`. While walking, parents push
//! target types into children (see [`infer`]); call sites pick an overload and solve its type
//! variables ([`method`]); lambdas are bound to functional interfaces ([`lambda`]); selector chains
//! and operator chains are resolved by [`selector`] and [`binary`]. [`Typeck::process`] runs the
//! whole lifecycle and returns a [`TypeckResult`] for the code generator.

use std::collections::{BTreeMap, HashMap};

use mosaic_hir::{Body, Expr, ExprId, LiteralKind, NodeId, Stmt, StmtId, TypeRef};
use mosaic_types::{
    format_type, is_assignable_from, lub, ClassId, Diagnostic, FieldRef, MethodRef, PrimitiveType,
    Severity, Span, Type, TypeEnv, TypeVarId,
};

pub mod binary;
pub mod binding;
mod cache;
mod config;
mod error;
pub mod infer;
pub mod lambda;
pub mod method;
mod resolve;
pub mod selector;

pub use binary::{PrecedenceTree, TreeChild, TreeNode};
pub use binding::{binding_descriptor, is_constant, BindingDescriptor};
pub use cache::Session;
pub use config::{ConfigError, TypeckConfig, UnresolvedSeverity};
pub use error::{InternalError, Rejection};
pub use infer::{propagates_inferred_type, InferState, NodePhase};
pub use lambda::{LambdaBinding, LambdaState, SynthBody, SynthesizedClass};
pub use method::{ArgType, CallKey, ParamTypedMethod};
pub use resolve::ValueRef;
pub use selector::{BoundKind, ChainBinding, SelectorBinding};

use method::CallSite;
use resolve::methods_named;

/// The declaration a body belongs to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BodyContext {
    pub class: ClassId,
    pub is_static: bool,
    pub params: Vec<(String, Type)>,
    pub return_type: Type,
    /// Type parameters of the enclosing method, visible by name.
    pub method_type_params: Vec<TypeVarId>,
}

impl BodyContext {
    /// An instance method of `class` returning `void` with no parameters.
    pub fn new(class: ClassId) -> Self {
        Self {
            class,
            is_static: false,
            params: Vec::new(),
            return_type: Type::Void,
            method_type_params: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    #[must_use]
    pub fn with_param(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.params.push((name.into(), ty));
        self
    }

    #[must_use]
    pub fn with_return_type(mut self, ty: Type) -> Self {
        self.return_type = ty;
        self
    }

    #[must_use]
    pub fn with_method_type_params(mut self, vars: Vec<TypeVarId>) -> Self {
        self.method_type_params = vars;
        self
    }

    pub fn this_type(&self, env: &dyn TypeEnv) -> Type {
        this_type(env, self.class)
    }
}

/// `C<T1..Tn>` for a class declaring `T1..Tn`, `C` otherwise.
pub(crate) fn this_type(env: &dyn TypeEnv, class: ClassId) -> Type {
    let vars = env
        .class(class)
        .map(|def| def.type_params.iter().map(|v| Type::TypeVar(*v)).collect())
        .unwrap_or_default();
    Type::class(class, vars)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Phase {
    Created,
    Initialized,
    Started,
    Validated,
}

impl Phase {
    fn name(self) -> &'static str {
        match self {
            Phase::Created => "created",
            Phase::Initialized => "initialized",
            Phase::Started => "started",
            Phase::Validated => "validated",
        }
    }
}

/// The enclosing method or lambda body of a `return` statement.
#[derive(Clone, Debug)]
pub(crate) struct ReturnFrame {
    /// Expected return type; `None` when unknown (tentative probing or an invalid lambda).
    target: Option<Type>,
    in_lambda: bool,
    seen: Vec<Type>,
}

impl ReturnFrame {
    pub(crate) fn new(target: Option<Type>, in_lambda: bool) -> Self {
        Self {
            target,
            in_lambda,
            seen: Vec::new(),
        }
    }

    /// Join of the returned value types.
    pub(crate) fn value_type(&self, env: &dyn TypeEnv) -> Option<Type> {
        let mut values = self.seen.iter().filter(|ty| !ty.is_errorish());
        let first = values.next()?.clone();
        Some(values.fold(first, |acc, ty| {
            if is_assignable_from(env, &acc, ty) {
                acc
            } else {
                lub(env, &acc, ty)
            }
        }))
    }
}

type PendingErrors = BTreeMap<NodeId, Vec<(u32, Diagnostic)>>;

/// Type checker for one body.
pub struct Typeck<'a> {
    env: &'a dyn TypeEnv,
    session: &'a mut Session,
    body: &'a Body,
    ctx: BodyContext,
    phase: Phase,
    state: InferState,
    /// Errors are only recorded while this is set.
    final_ctx: bool,
    scopes: Vec<HashMap<String, Type>>,
    returns: Vec<ReturnFrame>,
    pending: PendingErrors,
    diagnostics: Vec<Diagnostic>,
    locals: HashMap<StmtId, Type>,
    calls: HashMap<CallKey, ParamTypedMethod>,
    bound_methods: HashMap<ExprId, MethodRef>,
    bound_fields: HashMap<ExprId, FieldRef>,
    lambdas: HashMap<ExprId, LambdaBinding>,
    chains: HashMap<ExprId, ChainBinding>,
    trees: HashMap<ExprId, PrecedenceTree>,
}

impl<'a> Typeck<'a> {
    pub fn new(env: &'a dyn TypeEnv, session: &'a mut Session, body: &'a Body, ctx: BodyContext) -> Self {
        Self {
            env,
            session,
            body,
            ctx,
            phase: Phase::Created,
            state: InferState::default(),
            final_ctx: false,
            scopes: Vec::new(),
            returns: Vec::new(),
            pending: PendingErrors::new(),
            diagnostics: Vec::new(),
            locals: HashMap::new(),
            calls: HashMap::new(),
            bound_methods: HashMap::new(),
            bound_fields: HashMap::new(),
            lambdas: HashMap::new(),
            chains: HashMap::new(),
            trees: HashMap::new(),
        }
    }

    fn expect_phase(&self, operation: &'static str, allowed: &[Phase]) -> Result<(), InternalError> {
        if allowed.contains(&self.phase) {
            Ok(())
        } else {
            Err(InternalError::Lifecycle {
                operation,
                phase: self.phase.name(),
            })
        }
    }

    /// Allocate per-node state. Must be called exactly once, first.
    pub fn init(&mut self) -> Result<(), InternalError> {
        self.expect_phase("init", &[Phase::Created])?;
        self.state = InferState::new(self.body);
        self.phase = Phase::Initialized;
        tracing::debug!(
            target: "mosaic.typeck",
            exprs = self.body.exprs.len(),
            stmts = self.body.stmts.len(),
            "initialized body"
        );
        Ok(())
    }

    /// Walk the body in a final context. May be repeated; settled nodes are reused.
    pub fn start(&mut self) -> Result<(), InternalError> {
        self.expect_phase("start", &[Phase::Initialized, Phase::Started])?;
        let root = self.body.root;
        self.final_ctx = true;
        self.scopes.clear();
        self.returns.clear();
        self.returns
            .push(ReturnFrame::new(Some(self.ctx.return_type.clone()), false));
        self.walk_stmt(root);
        self.final_ctx = false;
        self.returns.clear();
        self.phase = Phase::Started;
        Ok(())
    }

    /// Move pending node errors into the diagnostic list, sorted by span.
    pub fn validate(&mut self) -> Result<(), InternalError> {
        self.expect_phase("validate", &[Phase::Started])?;
        let mut diagnostics: Vec<Diagnostic> = std::mem::take(&mut self.pending)
            .into_values()
            .flatten()
            .map(|(_, diagnostic)| diagnostic)
            .collect();
        diagnostics.sort_by(|a, b| {
            let key = |d: &Diagnostic| d.span.map(|s| (s.start, s.end));
            key(a).cmp(&key(b)).then_with(|| a.code.cmp(b.code))
        });
        tracing::debug!(target: "mosaic.typeck", count = diagnostics.len(), "validated body");
        self.diagnostics = diagnostics;
        self.phase = Phase::Validated;
        Ok(())
    }

    /// Run whatever is left of `init -> start -> validate` and export the results.
    pub fn process(mut self) -> Result<TypeckResult, InternalError> {
        if self.phase == Phase::Created {
            self.init()?;
        }
        if self.phase == Phase::Initialized {
            self.start()?;
        }
        if self.phase == Phase::Started {
            self.validate()?;
        }
        Ok(self.into_result())
    }

    fn check_expr(&self, operation: &'static str, expr: ExprId) -> Result<(), InternalError> {
        self.expect_phase(operation, &[Phase::Initialized, Phase::Started])?;
        if !self.state.contains(expr) {
            return Err(InternalError::UnknownExpr(expr));
        }
        Ok(())
    }

    /// Record a target type for `expr` (see [`InferState::set_inferred_type`]).
    pub fn set_inferred_type(&mut self, expr: ExprId, ty: Type, is_final: bool) -> Result<bool, InternalError> {
        self.check_expr("set_inferred_type", expr)?;
        Ok(self.push_target(expr, ty, is_final))
    }

    /// Reopen `expr` and its subtree.
    pub fn clear_inferred_type(&mut self, expr: ExprId) -> Result<(), InternalError> {
        self.check_expr("clear_inferred_type", expr)?;
        self.state.clear_inferred_type(self.body, expr);
        self.drop_node_caches(NodeId::Expr(expr));
        Ok(())
    }

    /// Start one expression in a final context, with the scopes of its position in the body.
    pub fn start_expr(&mut self, expr: ExprId) -> Result<Type, InternalError> {
        self.check_expr("start_expr", expr)?;
        self.rebuild_scopes(NodeId::Expr(expr))?;
        let saved = std::mem::replace(&mut self.final_ctx, true);
        let ty = self.start_expr_in_ctx(expr);
        self.final_ctx = saved;
        self.scopes.clear();
        Ok(ty)
    }

    /// Mark `expr` and its subtree stopped; the next start recomputes them.
    pub fn stop(&mut self, expr: ExprId) -> Result<(), InternalError> {
        self.check_expr("stop", expr)?;
        self.state.stop(self.body, expr);
        self.drop_node_caches(NodeId::Expr(expr));
        Ok(())
    }

    pub fn lambda_binding(&self, expr: ExprId) -> Option<&LambdaBinding> {
        self.lambdas.get(&expr)
    }

    pub fn chain_binding(&self, expr: ExprId) -> Option<&ChainBinding> {
        self.chains.get(&expr)
    }

    /// Static type of `expr` as last computed, final or not.
    pub fn provisional_type(&self, expr: ExprId) -> Option<&Type> {
        self.state.get(expr).and_then(|s| s.ty.as_ref())
    }

    /// Static type of `expr` if it was computed in a final context and is still valid.
    pub fn final_type(&self, expr: ExprId) -> Option<&Type> {
        self.state.get(expr).and_then(|s| s.settled_type())
    }

    pub fn inferred_type(&self, expr: ExprId) -> Option<&Type> {
        self.state.inferred(expr)
    }

    pub fn phase_of(&self, expr: ExprId) -> Option<NodePhase> {
        self.state.get(expr).map(|s| s.phase)
    }

    /// Call-site inference state of a plain call or constructor.
    pub fn call_inference(&self, expr: ExprId) -> Option<&ParamTypedMethod> {
        self.calls.get(&CallKey::Expr(expr))
    }

    fn into_result(self) -> TypeckResult {
        let types = self
            .body
            .expr_ids()
            .map(|id| self.state.get(id).and_then(|s| s.settled_type()).cloned())
            .collect();
        let synthesized = self
            .lambdas
            .iter()
            .filter_map(|(id, b)| {
                let synth = b.synthesized.clone()?;
                (b.state == LambdaState::Final).then_some((*id, synth))
            })
            .collect();
        TypeckResult {
            types,
            bound_methods: self.bound_methods,
            bound_fields: self.bound_fields,
            chains: self.chains,
            synthesized,
            trees: self.trees,
            locals: self.locals,
            diagnostics: self.diagnostics,
        }
    }

    // --- crate-internal protocol ---

    /// Run `f` in a non-final context: nothing is reported and nothing locks.
    pub(crate) fn tentatively<R>(&mut self, f: impl FnOnce(&mut Self) -> R) -> R {
        let saved = std::mem::replace(&mut self.final_ctx, false);
        let result = f(self);
        self.final_ctx = saved;
        result
    }

    /// Push a target type into `expr`; an accepted change drops the node's derived bindings.
    pub(crate) fn push_target(&mut self, expr: ExprId, ty: Type, is_final: bool) -> bool {
        let accepted = self.state.set_inferred_type(expr, ty, is_final);
        if accepted && self.state.get(expr).is_some_and(|s| s.dirty) {
            self.chains.remove(&expr);
            self.calls.retain(|key, _| key.expr() != expr);
        }
        accepted
    }

    fn drop_node_caches(&mut self, node: NodeId) {
        let body = self.body;
        for n in std::iter::once(node).chain(body.descendants(node)) {
            if let NodeId::Expr(id) = n {
                self.chains.remove(&id);
                self.bound_methods.remove(&id);
                self.bound_fields.remove(&id);
                self.calls.retain(|key, _| key.expr() != id);
            }
            self.pending.remove(&n);
        }
    }

    pub(crate) fn report(&mut self, node: impl Into<NodeId>, slot: u32, diagnostic: Diagnostic) {
        if !self.final_ctx {
            return;
        }
        let entry = self.pending.entry(node.into()).or_default();
        if entry
            .iter()
            .any(|(s, d)| *s == slot && d.code == diagnostic.code)
        {
            return;
        }
        entry.push((slot, diagnostic));
    }

    pub(crate) fn report_unresolved(
        &mut self,
        node: impl Into<NodeId>,
        slot: u32,
        code: &'static str,
        message: String,
        span: Span,
    ) {
        let severity = self.session.config.unresolved_severity.into();
        self.report(
            node,
            slot,
            Diagnostic::error(code, message, Some(span)).with_severity(severity),
        );
    }

    pub(crate) fn span_of(&self, node: impl Into<NodeId>) -> Span {
        self.body.range(node.into())
    }

    /// Scopes visible at `node`: lambda parameters and earlier locals of enclosing blocks.
    fn rebuild_scopes(&mut self, node: NodeId) -> Result<(), InternalError> {
        let body = self.body;
        let mut chain = vec![node];
        let mut current = node;
        while let Some(parent) = body.parent(current) {
            chain.push(parent);
            current = parent;
        }
        if current != NodeId::Stmt(body.root) {
            return Err(InternalError::Detached { node: current });
        }
        chain.reverse();

        self.scopes.clear();
        for pair in chain.windows(2) {
            let (ancestor, child) = (pair[0], pair[1]);
            match ancestor {
                NodeId::Stmt(id) => {
                    if let Stmt::Block { statements, .. } = body.stmt(id) {
                        let mut scope = HashMap::new();
                        for stmt in statements {
                            if NodeId::Stmt(*stmt) == child {
                                break;
                            }
                            if let Stmt::Let { name, .. } = body.stmt(*stmt) {
                                let ty = self.locals.get(stmt).cloned().unwrap_or(Type::Unknown);
                                scope.insert(name.clone(), ty);
                            }
                        }
                        self.scopes.push(scope);
                    }
                }
                NodeId::Expr(id) => {
                    if let Expr::Lambda { params, .. } = body.expr(id) {
                        let types = self.lambdas.get(&id).map(|b| b.params.clone()).unwrap_or_default();
                        let scope = params
                            .iter()
                            .enumerate()
                            .map(|(i, p)| (p.name.clone(), types.get(i).cloned().unwrap_or(Type::Unknown)))
                            .collect();
                        self.scopes.push(scope);
                    }
                }
            }
        }
        Ok(())
    }

    // --- the walk ---

    pub(crate) fn walk_stmt(&mut self, stmt: StmtId) {
        let env = self.env;
        let body = self.body;
        if self.final_ctx {
            self.pending.remove(&NodeId::Stmt(stmt));
        }
        match body.stmt(stmt) {
            Stmt::Block { statements, .. } => {
                self.scopes.push(HashMap::new());
                for s in statements {
                    self.walk_stmt(*s);
                }
                self.scopes.pop();
            }
            Stmt::Let {
                name,
                ty,
                initializer,
                name_range,
                ..
            } => {
                let declared = ty.as_ref().map(|tr| self.resolve_type_ref(stmt, tr));
                let actual = initializer.map(|init| {
                    if let Some(target) = declared.as_ref().filter(|t| !t.is_errorish()) {
                        self.push_target(init, target.clone(), self.final_ctx);
                    }
                    (init, self.start_expr_in_ctx(init))
                });
                let local_ty = match (&declared, &actual) {
                    (Some(declared), Some((init, actual))) => {
                        self.check_assignable(stmt, 0, declared, actual, self.span_of(*init));
                        declared.clone()
                    }
                    (Some(declared), None) => declared.clone(),
                    (None, Some((_, actual))) => match actual {
                        Type::Null | Type::Void => {
                            let message = format!(
                                "cannot infer type for local variable `{name}` from `{}`",
                                format_type(env, actual)
                            );
                            self.report(
                                stmt,
                                0,
                                Diagnostic::error("incompatible-types", message, Some(*name_range)),
                            );
                            Type::Error
                        }
                        other => other.clone(),
                    },
                    (None, None) => Type::Unknown,
                };
                self.locals.insert(stmt, local_ty.clone());
                if let Some(scope) = self.scopes.last_mut() {
                    scope.insert(name.clone(), local_ty);
                }
            }
            Stmt::Expr { expr, .. } => {
                self.start_expr_in_ctx(*expr);
            }
            Stmt::Return { expr, range } => self.walk_return(stmt, *expr, *range),
            Stmt::Empty { .. } => {}
        }
    }

    fn walk_return(&mut self, stmt: StmtId, expr: Option<ExprId>, range: Span) {
        let env = self.env;
        let (target, in_lambda) = match self.returns.last() {
            Some(frame) => (frame.target.clone(), frame.in_lambda),
            None => (None, false),
        };
        let code = if in_lambda {
            "return-mismatch"
        } else {
            "incompatible-types"
        };
        let expected = target.filter(|t| !t.is_errorish());
        match expr {
            Some(value) => {
                if let Some(t) = expected.as_ref().filter(|t| **t != Type::Void) {
                    self.push_target(value, t.clone(), self.final_ctx);
                }
                let actual = self.start_expr_in_ctx(value);
                if let Some(frame) = self.returns.last_mut() {
                    frame.seen.push(actual.clone());
                }
                match &expected {
                    Some(Type::Void) => self.report(
                        stmt,
                        0,
                        Diagnostic::error(code, "cannot return a value from a void body", Some(range)),
                    ),
                    Some(t) if !actual.is_errorish() && !is_assignable_from(env, t, &actual) => {
                        let message = format!(
                            "incompatible types: `{}` cannot be converted to `{}`",
                            format_type(env, &actual),
                            format_type(env, t)
                        );
                        self.report(stmt, 0, Diagnostic::error(code, message, Some(range)));
                    }
                    _ => {}
                }
            }
            None => {
                if let Some(t) = expected.filter(|t| *t != Type::Void) {
                    let message = format!("missing return value of type `{}`", format_type(env, &t));
                    self.report(stmt, 0, Diagnostic::error(code, message, Some(range)));
                }
            }
        }
    }

    fn check_assignable(&mut self, node: impl Into<NodeId>, slot: u32, target: &Type, actual: &Type, span: Span) {
        let env = self.env;
        if target.is_errorish() || actual.is_errorish() || is_assignable_from(env, target, actual) {
            return;
        }
        let message = format!(
            "incompatible types: `{}` cannot be converted to `{}`",
            format_type(env, actual),
            format_type(env, target)
        );
        self.report(node, slot, Diagnostic::error("incompatible-types", message, Some(span)));
    }

    /// Compute (or reuse) the static type of `expr` in the current context.
    pub(crate) fn start_expr_in_ctx(&mut self, expr: ExprId) -> Type {
        if let Some(ty) = self.state.get(expr).and_then(|s| s.settled_type()) {
            return ty.clone();
        }
        if self.final_ctx {
            self.pending.remove(&NodeId::Expr(expr));
        }
        let (ty, poly) = self.compute_expr(expr);
        tracing::trace!(
            target: "mosaic.typeck",
            ?expr,
            ty = %format_type(self.env, &ty),
            is_final = self.final_ctx,
            "started expression"
        );
        self.state.record_type(expr, ty.clone(), self.final_ctx, poly);
        ty
    }

    fn compute_expr(&mut self, expr: ExprId) -> (Type, bool) {
        let env = self.env;
        let body = self.body;
        // A recomputation may bind nothing; never leave an earlier candidate's binding behind.
        self.bound_methods.remove(&expr);
        self.bound_fields.remove(&expr);
        match body.expr(expr) {
            Expr::Literal { kind, .. } => (literal_type(env, *kind), false),
            Expr::Name { name, range } => (self.check_name(expr, name, *range), false),
            Expr::This { range } => (self.check_this(expr, *range), false),
            Expr::Super { range } => {
                if self.check_this(expr, *range).is_errorish() {
                    return (Type::Error, false);
                }
                let super_ty = env
                    .class(self.ctx.class)
                    .and_then(|def| def.super_class.clone())
                    .unwrap_or(Type::Declared(env.well_known().object));
                (super_ty, false)
            }
            Expr::Call {
                name,
                type_args,
                args,
                range,
            } => {
                let receiver = self.unqualified_receiver(name);
                let target = self.state.inferred(expr).cloned();
                let result = self.resolve_call(CallSite {
                    key: CallKey::Expr(expr),
                    expr,
                    slot: 0,
                    span: *range,
                    name,
                    receiver,
                    static_only: self.ctx.is_static,
                    type_args,
                    args,
                    target,
                    diamond: false,
                });
                if let Some(method) = result.method {
                    self.bound_methods.insert(expr, method);
                }
                (result.ty, result.poly)
            }
            Expr::New {
                class,
                diamond,
                args,
                range,
            } => self.check_new(expr, class, *diamond, args, *range),
            Expr::Selector { .. } => self.resolve_chain(expr),
            Expr::Binary { .. } => (self.check_binary(expr), false),
            Expr::Lambda { .. } => (self.bind_lambda(expr), false),
            Expr::Missing { .. } => (Type::Error, false),
        }
    }

    fn check_name(&mut self, expr: ExprId, name: &str, range: Span) -> Type {
        match self.lookup_value(name) {
            Some(ValueRef::Field {
                field,
                ty,
                is_static,
            }) => {
                if !is_static && self.ctx.is_static {
                    let message =
                        format!("non-static field `{name}` cannot be referenced from a static context");
                    self.report(expr, 1, Diagnostic::error("static-context", message, Some(range)));
                }
                self.bound_fields.insert(expr, field);
                ty
            }
            Some(value) => value.ty().clone(),
            None => {
                let message = format!("cannot find symbol `{name}`");
                self.report_unresolved(expr, 0, "unresolved-name", message, range);
                Type::Unknown
            }
        }
    }

    fn check_this(&mut self, expr: ExprId, range: Span) -> Type {
        if self.ctx.is_static {
            self.report(
                expr,
                0,
                Diagnostic::error(
                    "static-context",
                    "`this` cannot be referenced from a static context",
                    Some(range),
                ),
            );
            return Type::Error;
        }
        self.ctx.this_type(self.env)
    }

    /// The innermost class (context class first, then enclosing classes) declaring `name`.
    fn unqualified_receiver(&self, name: &str) -> Type {
        let env = self.env;
        let mut class = Some(self.ctx.class);
        while let Some(id) = class {
            if !methods_named(env, id, name).is_empty() {
                return this_type(env, id);
            }
            class = env.class(id).and_then(|def| def.enclosing);
        }
        self.ctx.this_type(env)
    }

    fn check_new(
        &mut self,
        expr: ExprId,
        class: &TypeRef,
        diamond: bool,
        args: &[ExprId],
        range: Span,
    ) -> (Type, bool) {
        let env = self.env;
        let ty = self.resolve_type_ref(expr, class);
        if ty.is_errorish() {
            self.start_args_untargeted(args);
            return (Type::Error, false);
        }
        let is_interface = ty
            .class_id()
            .and_then(|id| env.class(id))
            .is_some_and(|def| def.is_interface());
        if ty.class_id().is_none() || is_interface {
            let message = format!("`{}` cannot be instantiated", format_type(env, &ty));
            self.report(expr, 3, Diagnostic::error("abstract-instantiation", message, Some(range)));
            self.start_args_untargeted(args);
            return (Type::Error, false);
        }
        let target = self.state.inferred(expr).cloned();
        let result = self.resolve_constructor(CallSite {
            key: CallKey::Expr(expr),
            expr,
            slot: 0,
            span: range,
            name: &class.name,
            receiver: ty.clone(),
            static_only: false,
            type_args: &[],
            args,
            target,
            diamond,
        });
        if let Some(method) = result.method {
            self.bound_methods.insert(expr, method);
        }
        if diamond {
            (result.ty, result.poly)
        } else {
            (ty, false)
        }
    }
}

fn literal_type(env: &dyn TypeEnv, kind: LiteralKind) -> Type {
    match kind {
        LiteralKind::Int => Type::int(),
        LiteralKind::Long => Type::Primitive(PrimitiveType::Long),
        LiteralKind::Float => Type::Primitive(PrimitiveType::Float),
        LiteralKind::Double => Type::Primitive(PrimitiveType::Double),
        LiteralKind::Char => Type::Primitive(PrimitiveType::Char),
        LiteralKind::Boolean => Type::boolean(),
        LiteralKind::String => Type::Declared(env.well_known().string),
        LiteralKind::Null => Type::Null,
    }
}

/// Check a whole body in one go.
pub fn check_body(
    env: &dyn TypeEnv,
    session: &mut Session,
    body: &Body,
    ctx: BodyContext,
) -> Result<TypeckResult, InternalError> {
    Typeck::new(env, session, body, ctx).process()
}

/// Everything the code generator needs from a checked body.
#[derive(Clone, Debug)]
pub struct TypeckResult {
    types: Vec<Option<Type>>,
    bound_methods: HashMap<ExprId, MethodRef>,
    bound_fields: HashMap<ExprId, FieldRef>,
    chains: HashMap<ExprId, ChainBinding>,
    synthesized: HashMap<ExprId, SynthesizedClass>,
    trees: HashMap<ExprId, PrecedenceTree>,
    locals: HashMap<StmtId, Type>,
    diagnostics: Vec<Diagnostic>,
}

impl TypeckResult {
    /// Final static type of `expr`; `None` if it was never started in a final context.
    pub fn type_of_expr(&self, expr: ExprId) -> Option<&Type> {
        self.types.get(expr.idx()).and_then(Option::as_ref)
    }

    /// Method or constructor bound by a call, constructor or the last selector of a chain.
    pub fn bound_method(&self, expr: ExprId) -> Option<MethodRef> {
        self.bound_methods.get(&expr).copied()
    }

    pub fn bound_field(&self, expr: ExprId) -> Option<FieldRef> {
        self.bound_fields.get(&expr).copied()
    }

    pub fn selector_bindings(&self, expr: ExprId) -> Option<&ChainBinding> {
        self.chains.get(&expr)
    }

    pub fn synthesized_class(&self, expr: ExprId) -> Option<&SynthesizedClass> {
        self.synthesized.get(&expr)
    }

    pub fn precedence_tree(&self, expr: ExprId) -> Option<&PrecedenceTree> {
        self.trees.get(&expr)
    }

    pub fn local_type(&self, stmt: StmtId) -> Option<&Type> {
        self.locals.get(&stmt)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}
