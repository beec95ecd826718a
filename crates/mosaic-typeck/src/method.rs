//! Per-call-site inference of generic methods and constructors, and overload selection.

use std::collections::HashMap;

use mosaic_hir::{Expr, ExprId, TypeRef};
use mosaic_types::{
    boxed, erasure, format_method_signature, instantiate_as_supertype, is_assignable_from,
    is_more_specific, is_subtype, lub, substitute, Diagnostic, MethodDef, MethodKind, MethodRef,
    Span, Type, TypeEnv, TypeVarId, WildcardBound,
};

use crate::error::Rejection;
use crate::lambda::LambdaProbe;
use crate::resolve::{hierarchy, member_subst, methods_named};
use crate::Typeck;

/// What overload resolution knows about an argument before the call is committed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArgType {
    Known(Type),
    Lambda { arity: usize },
    /// Target-dependent (generic call or diamond without informative operands); compatible with
    /// any parameter until committed.
    Pending,
}

/// Where a type-variable binding came from; higher variants win.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Source {
    Target,
    Argument,
    Explicit,
}

#[derive(Clone, Debug, PartialEq, Eq)]
struct Binding {
    ty: Type,
    source: Source,
}

/// A method (or constructor) plus the inference state of one call site.
///
/// Owns every type it produces; nothing is shared with other call sites or candidates.
#[derive(Clone, Debug)]
pub struct ParamTypedMethod {
    pub method: MethodRef,
    def: MethodDef,
    /// Receiver type arguments applied to the declaring class's variables.
    class_subst: HashMap<TypeVarId, Type>,
    /// Variables solved at this call site.
    vars: Vec<TypeVarId>,
    bounds: HashMap<TypeVarId, Type>,
    bindings: HashMap<TypeVarId, Binding>,
    arg_count: usize,
    variable_arity: bool,
    target: Option<Type>,
    /// Constructed type for diamond constructor calls.
    diamond: Option<Type>,
}

impl ParamTypedMethod {
    /// Prepare `method` for a call with `arg_count` arguments on `receiver`.
    ///
    /// Class type variables are taken from the receiver; raw receivers erase them.
    pub fn new(env: &dyn TypeEnv, method: MethodRef, receiver: &Type, arg_count: usize) -> Option<Self> {
        let def = env.method(method)?.clone();
        let class_subst = member_subst(env, receiver, method.owner);
        let vars = def.type_params.clone();
        let mut ptm = Self {
            method,
            def,
            class_subst,
            vars,
            bounds: HashMap::new(),
            bindings: HashMap::new(),
            arg_count,
            variable_arity: false,
            target: None,
            diamond: None,
        };
        ptm.init_bounds(env);
        Some(ptm)
    }

    /// A constructor call written `new C<>(..)`: the class's variables are solved like method
    /// variables and the call produces `C<vars>`.
    pub fn diamond(env: &dyn TypeEnv, ctor: MethodRef, arg_count: usize) -> Option<Self> {
        let def = env.method(ctor)?.clone();
        let class = env.class(ctor.owner)?;
        let class_vars = class.type_params.clone();
        let produced = Type::class(
            ctor.owner,
            class_vars.iter().map(|v| Type::TypeVar(*v)).collect(),
        );
        let mut vars = class_vars;
        vars.extend(def.type_params.iter().copied());
        let mut ptm = Self {
            method: ctor,
            def,
            class_subst: HashMap::new(),
            vars,
            bounds: HashMap::new(),
            bindings: HashMap::new(),
            arg_count,
            variable_arity: false,
            target: None,
            diamond: Some(produced),
        };
        ptm.init_bounds(env);
        Some(ptm)
    }

    fn init_bounds(&mut self, env: &dyn TypeEnv) {
        let object = Type::Declared(env.well_known().object);
        for var in &self.vars {
            let bound = env
                .type_param(*var)
                .and_then(|tp| tp.upper_bounds.first().cloned())
                .unwrap_or_else(|| object.clone());
            // Bounds mentioning other variables (`T extends Comparable<T>`) are erased.
            let bound = if bound.type_vars().is_empty() {
                bound
            } else {
                erasure(env, &bound)
            };
            self.bounds.insert(*var, bound);
        }
    }

    pub fn def(&self) -> &MethodDef {
        &self.def
    }

    pub fn is_static(&self) -> bool {
        self.def.is_static
    }

    /// Whether the argument count fits the declared parameters.
    pub fn accepts_arity(&self) -> bool {
        let n = self.def.params.len();
        if self.def.is_varargs && n > 0 {
            self.arg_count + 1 >= n
        } else {
            self.arg_count == n
        }
    }

    /// Decide between fixed and variable arity form from the argument types.
    pub fn choose_arity_form(&mut self, env: &dyn TypeEnv, args: &[ArgType]) {
        let n = self.def.params.len();
        self.variable_arity = if !self.def.is_varargs || n == 0 {
            false
        } else if self.arg_count != n {
            true
        } else {
            match &args[n - 1] {
                ArgType::Known(ty) => {
                    let formal = self.complete(&self.def.params[n - 1]);
                    !(matches!(ty, Type::Array(_) | Type::Null) || ty.is_errorish())
                        || !is_assignable_from(env, &formal, ty)
                }
                ArgType::Lambda { .. } => true,
                ArgType::Pending => false,
            }
        };
    }

    pub fn is_variable_arity(&self) -> bool {
        self.variable_arity
    }

    /// Declared formal for argument `index`, before substitution.
    fn formal(&self, index: usize) -> Option<Type> {
        let n = self.def.params.len();
        if n == 0 {
            return None;
        }
        if self.variable_arity && index + 1 >= n {
            return self.def.params[n - 1].component().cloned();
        }
        self.def.params.get(index).cloned()
    }

    /// Substitute bound variables only; unsolved ones stay as type variables.
    pub fn partial(&self, ty: &Type) -> Type {
        let ty = substitute(ty, &self.class_subst);
        let solved: HashMap<TypeVarId, Type> = self
            .bindings
            .iter()
            .map(|(var, b)| (*var, b.ty.clone()))
            .collect();
        substitute(&ty, &solved)
    }

    /// Substitute bound variables and default the rest to their bounds.
    pub fn complete(&self, ty: &Type) -> Type {
        let partial = self.partial(ty);
        substitute(&partial, &self.defaults())
    }

    /// Bounds of the variables not solved yet.
    pub fn defaults(&self) -> HashMap<TypeVarId, Type> {
        self.vars
            .iter()
            .filter(|v| !self.bindings.contains_key(v))
            .map(|v| (*v, self.bounds.get(v).cloned().unwrap_or(Type::Unknown)))
            .collect()
    }

    /// Parameter type seen by argument `index`, with unsolved variables left in place.
    pub fn partial_param(&self, index: usize) -> Option<Type> {
        self.formal(index).map(|f| self.partial(&f))
    }

    /// Parameter type seen by argument `index`, fully substituted.
    pub fn param_type(&self, index: usize) -> Option<Type> {
        self.formal(index).map(|f| self.complete(&f))
    }

    pub fn param_types(&self) -> Vec<Type> {
        (0..self.arg_count).filter_map(|i| self.param_type(i)).collect()
    }

    /// Whether this method overrides `other` as seen through the call's receiver: its owner is
    /// a subtype of `other`'s and the parameter types agree once the receiver's type arguments
    /// are applied.
    fn overrides(&self, env: &dyn TypeEnv, other: &ParamTypedMethod) -> bool {
        if self.method.owner == other.method.owner
            || self.def.params.len() != other.def.params.len()
            || self.def.type_params.len() != other.def.type_params.len()
            || !hierarchy(env, self.method.owner).contains(&other.method.owner)
        {
            return false;
        }
        let rename: HashMap<TypeVarId, Type> = other
            .def
            .type_params
            .iter()
            .zip(&self.def.type_params)
            .map(|(theirs, mine)| (*theirs, Type::TypeVar(*mine)))
            .collect();
        self.def.params.iter().zip(&other.def.params).all(|(mine, theirs)| {
            let theirs = substitute(&substitute(theirs, &other.class_subst), &rename);
            substitute(mine, &self.class_subst) == theirs
        })
    }

    fn declared_return(&self) -> Type {
        match &self.diamond {
            Some(produced) => produced.clone(),
            None => self.def.return_type.clone(),
        }
    }

    pub fn return_type(&self) -> Type {
        self.complete(&self.declared_return())
    }

    /// Whether the result relies on the target or on defaults rather than on the call itself.
    pub fn is_poly(&self) -> bool {
        let ret = self.partial(&self.declared_return());
        ret.type_vars().iter().any(|v| self.vars.contains(v))
            || self.bindings.values().any(|b| b.source == Source::Target)
    }

    /// Solved variables; unsolved ones are absent.
    pub fn bindings(&self) -> HashMap<TypeVarId, Type> {
        self.bindings
            .iter()
            .map(|(var, b)| (*var, b.ty.clone()))
            .collect()
    }

    /// (a) Explicit type arguments. A count mismatch is ignored and reported by the caller.
    pub fn bind_explicit(&mut self, env: &dyn TypeEnv, type_args: &[Type]) -> bool {
        if type_args.len() != self.def.type_params.len() {
            return type_args.is_empty();
        }
        for (var, ty) in self.def.type_params.clone().into_iter().zip(type_args) {
            self.bind(env, var, ty.clone(), Source::Explicit);
        }
        true
    }

    /// (b) Unify each formal with its argument's type.
    pub fn bind_arguments(&mut self, env: &dyn TypeEnv, args: &[ArgType]) {
        for (index, arg) in args.iter().enumerate() {
            let ArgType::Known(actual) = arg else {
                continue;
            };
            let Some(formal) = self.formal(index) else {
                continue;
            };
            let formal = substitute(&formal, &self.class_subst);
            self.unify(env, &formal, actual, Source::Argument);
        }
    }

    /// Lambda return feedback: `formal_return` is the functional method's return type in terms of
    /// this call's variables.
    pub fn bind_lambda_return(&mut self, env: &dyn TypeEnv, formal_return: &Type, actual: &Type) -> bool {
        let before = self.bindings.clone();
        if *actual != Type::Void {
            self.unify(env, formal_return, actual, Source::Argument);
        }
        before != self.bindings
    }

    /// (c) Unify the declared return type with the known target.
    pub fn bind_target(&mut self, env: &dyn TypeEnv, target: Option<&Type>) {
        self.target = target.cloned();
        let Some(target) = target else {
            return;
        };
        if target.is_errorish() || *target == Type::Void {
            return;
        }
        let ret = substitute(&self.declared_return(), &self.class_subst);
        self.unify_target(env, &ret, target);
    }

    pub fn target(&self) -> Option<&Type> {
        self.target.as_ref()
    }

    fn bind(&mut self, env: &dyn TypeEnv, var: TypeVarId, ty: Type, source: Source) {
        if !self.vars.contains(&var) || ty.is_errorish() || ty == Type::Null || ty == Type::Void {
            return;
        }
        let ty = boxed(env, &ty);
        match self.bindings.get(&var) {
            Some(existing) if existing.source > source => {}
            Some(existing) if existing.source == source => {
                let blended = blend(env, &existing.ty, &ty);
                self.bindings.insert(var, Binding { ty: blended, source });
            }
            _ => {
                self.bindings.insert(var, Binding { ty, source });
            }
        }
    }

    fn unify(&mut self, env: &dyn TypeEnv, formal: &Type, actual: &Type, source: Source) {
        if actual.is_errorish() {
            return;
        }
        match formal {
            Type::TypeVar(var) => self.bind(env, *var, actual.clone(), source),
            Type::Array(fc) => {
                if let Type::Array(ac) = actual {
                    self.unify(env, fc, ac, source);
                }
            }
            Type::Parameterized(p) => {
                let actual = boxed(env, actual);
                let Some(Type::Parameterized(view)) = instantiate_as_supertype(env, &actual, p.base)
                else {
                    return;
                };
                for (farg, aarg) in p.args.iter().zip(&view.args) {
                    self.unify_arg(env, farg, aarg, source);
                }
            }
            Type::Wildcard(WildcardBound::Extends(b)) | Type::Wildcard(WildcardBound::Super(b)) => {
                self.unify(env, b, actual, source)
            }
            _ => {}
        }
    }

    fn unify_arg(&mut self, env: &dyn TypeEnv, formal: &Type, actual: &Type, source: Source) {
        let actual_inner = match actual {
            Type::Wildcard(WildcardBound::Extends(b)) | Type::Wildcard(WildcardBound::Super(b)) => {
                Some((**b).clone())
            }
            Type::Wildcard(WildcardBound::Unbounded) => None,
            other => Some(other.clone()),
        };
        let Some(actual_inner) = actual_inner else {
            return;
        };
        match formal {
            Type::Wildcard(WildcardBound::Extends(b)) | Type::Wildcard(WildcardBound::Super(b)) => {
                self.unify(env, b, &actual_inner, source)
            }
            Type::Wildcard(WildcardBound::Unbounded) => {}
            other => self.unify(env, other, &actual_inner, source),
        }
    }

    /// Match `formal` (a return type) against `target`, viewing the formal as the target's class.
    fn unify_target(&mut self, env: &dyn TypeEnv, formal: &Type, target: &Type) {
        match (formal, target) {
            (Type::TypeVar(var), _) => self.bind(env, *var, target.clone(), Source::Target),
            (Type::Array(fc), Type::Array(tc)) => self.unify_target(env, fc, tc),
            (_, Type::Parameterized(tp)) if formal.class_id().is_some() => {
                let Some(Type::Parameterized(view)) = instantiate_as_supertype(env, formal, tp.base)
                else {
                    return;
                };
                for (farg, targ) in view.args.iter().zip(&tp.args) {
                    let targ = match targ {
                        Type::Wildcard(WildcardBound::Extends(b))
                        | Type::Wildcard(WildcardBound::Super(b)) => (**b).clone(),
                        Type::Wildcard(WildcardBound::Unbounded) => continue,
                        other => other.clone(),
                    };
                    match farg {
                        Type::Wildcard(WildcardBound::Extends(b))
                        | Type::Wildcard(WildcardBound::Super(b)) => self.unify_target(env, b, &targ),
                        other => self.unify_target(env, other, &targ),
                    }
                }
            }
            _ => {}
        }
    }
}

/// Combine two candidate bindings: keep the more specific, or join unrelated ones.
fn blend(env: &dyn TypeEnv, a: &Type, b: &Type) -> Type {
    if a == b || is_subtype(env, a, b) {
        a.clone()
    } else if is_subtype(env, b, a) {
        b.clone()
    } else {
        lub(env, a, b)
    }
}

/// One overload after inference against a call site.
#[derive(Clone, Debug)]
pub struct Candidate {
    pub ptm: ParamTypedMethod,
    pub rejection: Option<Rejection>,
    /// Per lambda argument: whether the matched functional method returns a value, and whether
    /// the lambda body (typed tentatively) does.
    pub lambda_voidness: Vec<(bool, Option<bool>)>,
}

impl Candidate {
    pub fn is_applicable(&self) -> bool {
        self.rejection.is_none()
    }

    fn voidness_matches(&self) -> bool {
        self.lambda_voidness
            .iter()
            .all(|(method_returns, body_returns)| body_returns.map_or(true, |b| b == *method_returns))
    }
}

/// Identifies one call inside a body: a plain call or constructor, or the `n`th selector of a
/// chain.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CallKey {
    Expr(ExprId),
    Selector(ExprId, usize),
}

impl CallKey {
    pub fn expr(self) -> ExprId {
        match self {
            CallKey::Expr(expr) | CallKey::Selector(expr, _) => expr,
        }
    }
}

/// Call-site shape shared by unqualified calls, selector calls and constructors.
pub struct CallSite<'c> {
    pub key: CallKey,
    /// Node the call's own diagnostics are attached to.
    pub expr: ExprId,
    /// First diagnostic slot owned by this call on `expr`.
    pub slot: u32,
    pub span: Span,
    pub name: &'c str,
    pub receiver: Type,
    /// Only static members are eligible (type-qualified call or static context).
    pub static_only: bool,
    pub type_args: &'c [TypeRef],
    pub args: &'c [ExprId],
    pub target: Option<Type>,
    pub diamond: bool,
}

#[derive(Clone, Debug)]
pub struct CallResult {
    pub ty: Type,
    pub method: Option<MethodRef>,
    pub poly: bool,
}

impl<'a> Typeck<'a> {
    /// Resolve and commit a method call. Argument expressions are started here.
    pub(crate) fn resolve_call(&mut self, site: CallSite<'_>) -> CallResult {
        let env = self.env;
        let receiver_class = match &site.receiver {
            Type::Array(_) => Some(env.well_known().object),
            other => other.class_id(),
        };
        let methods: Vec<MethodRef> = match receiver_class {
            Some(class) => methods_named(env, class, site.name),
            None => Vec::new(),
        };
        if methods.is_empty() {
            if site.receiver.is_errorish() {
                self.start_args_untargeted(site.args);
                return CallResult {
                    ty: Type::Unknown,
                    method: None,
                    poly: false,
                };
            }
            let message = format!(
                "cannot find method `{}` in `{}`",
                site.name,
                mosaic_types::format_type(env, &site.receiver)
            );
            self.report_unresolved(site.expr, site.slot, "unresolved-method", message, site.span);
            self.start_args_untargeted(site.args);
            return CallResult {
                ty: Type::Unknown,
                method: None,
                poly: false,
            };
        }
        self.resolve_among(site, methods)
    }

    pub(crate) fn resolve_constructor(&mut self, site: CallSite<'_>) -> CallResult {
        let env = self.env;
        let Some(class) = site.receiver.class_id() else {
            self.start_args_untargeted(site.args);
            return CallResult {
                ty: Type::Error,
                method: None,
                poly: false,
            };
        };
        let count = env.class(class).map_or(0, |def| def.constructors.len());
        if count == 0 {
            // Implicit no-argument constructor.
            if !site.args.is_empty() {
                self.report(
                    site.expr,
                    site.slot,
                    Diagnostic::error(
                        "no-applicable-method",
                        format!("`{}` has no constructor taking arguments", site.name),
                        Some(site.span),
                    ),
                );
            }
            self.start_args_untargeted(site.args);
            return CallResult {
                ty: site.receiver.clone(),
                method: None,
                poly: false,
            };
        }
        let ctors = (0..count).map(|i| MethodRef::constructor(class, i)).collect();
        self.resolve_among(site, ctors)
    }

    fn resolve_among(&mut self, site: CallSite<'_>, methods: Vec<MethodRef>) -> CallResult {
        let env = self.env;
        let explicit: Vec<Type> = site.type_args.iter().map(|t| self.resolve_type_ref(site.expr, t)).collect();
        let args = self.pre_type_args(site.args);

        let mut prepared: Vec<ParamTypedMethod> = Vec::new();
        for method in methods {
            let ptm = if site.diamond {
                ParamTypedMethod::diamond(env, method, site.args.len())
            } else {
                ParamTypedMethod::new(env, method, &site.receiver, site.args.len())
            };
            let Some(ptm) = ptm else {
                continue;
            };
            if !ptm.accepts_arity() {
                continue;
            }
            prepared.push(ptm);
        }

        // Generic supertype methods the receiver's class implements are not separate overloads.
        let hidden: Vec<bool> = prepared
            .iter()
            .map(|ptm| prepared.iter().any(|other| other.overrides(env, ptm)))
            .collect();
        let mut candidates: Vec<Candidate> = Vec::new();
        for (ptm, hidden) in prepared.into_iter().zip(hidden) {
            if hidden {
                tracing::trace!(target: "mosaic.typeck", method = ?ptm.method, "overridden through receiver");
                continue;
            }
            candidates.push(self.infer_candidate(ptm, &site, &explicit, &args));
        }

        let applicable: Vec<usize> = (0..candidates.len())
            .filter(|i| candidates[*i].is_applicable())
            .collect();
        tracing::debug!(
            target: "mosaic.typeck",
            expr = ?site.expr,
            name = site.name,
            candidates = candidates.len(),
            applicable = applicable.len(),
            "overload resolution"
        );

        let chosen = match applicable.len() {
            1 => Some(applicable[0]),
            0 if candidates.len() == 1 => {
                // A sole candidate is committed anyway so argument errors surface.
                Some(0)
            }
            0 => None,
            _ => self.most_specific(&candidates, &applicable),
        };

        let Some(chosen) = chosen else {
            let code = if applicable.is_empty() {
                "no-applicable-method"
            } else {
                "ambiguous-call"
            };
            let message = if applicable.is_empty() {
                format!("no applicable overload of `{}` for these arguments", site.name)
            } else {
                let names: Vec<String> = applicable
                    .iter()
                    .take(2)
                    .map(|i| format_method_signature(env, candidates[*i].ptm.method))
                    .collect();
                format!("call to `{}` is ambiguous: {}", site.name, names.join(" and "))
            };
            self.report(site.expr, site.slot, Diagnostic::error(code, message, Some(site.span)));
            for arg in site.args {
                if matches!(self.body.expr(*arg), Expr::Lambda { .. }) {
                    self.invalidate_lambda(*arg);
                } else {
                    self.start_expr_in_ctx(*arg);
                }
            }
            return CallResult {
                ty: Type::Error,
                method: None,
                poly: false,
            };
        };

        let candidate = candidates.swap_remove(chosen);
        self.commit_call(&site, candidate.ptm, &args)
    }

    /// Type every argument standalone, tentatively, for applicability checks.
    fn pre_type_args(&mut self, args: &[ExprId]) -> Vec<ArgType> {
        args.iter()
            .map(|arg| {
                if let Expr::Lambda { params, .. } = self.body.expr(*arg) {
                    return ArgType::Lambda {
                        arity: params.len(),
                    };
                }
                let ty = self.tentatively(|tc| tc.start_expr_in_ctx(*arg));
                let poly = self.state.get(*arg).is_some_and(|s| s.poly);
                if poly {
                    ArgType::Pending
                } else {
                    ArgType::Known(ty)
                }
            })
            .collect()
    }

    fn infer_candidate(
        &mut self,
        mut ptm: ParamTypedMethod,
        site: &CallSite<'_>,
        explicit: &[Type],
        args: &[ArgType],
    ) -> Candidate {
        let env = self.env;
        let mut candidate_rejection = None;
        if !ptm.bind_explicit(env, explicit) {
            candidate_rejection = Some(Rejection::ArgumentMismatch { index: 0 });
        }
        ptm.choose_arity_form(env, args);
        ptm.bind_arguments(env, args);

        let mut lambda_voidness = Vec::new();
        for (index, arg) in args.iter().enumerate() {
            if !matches!(arg, ArgType::Lambda { .. }) {
                continue;
            }
            let Some(target) = ptm.partial_param(index) else {
                continue;
            };
            let defaults = ptm.defaults();
            match self.probe_lambda(site.args[index], &target, &defaults) {
                Ok(LambdaProbe {
                    method_returns,
                    body_returns,
                    formal_return,
                    return_type,
                }) => {
                    if let Some(actual) = &return_type {
                        ptm.bind_lambda_return(env, &formal_return, actual);
                    }
                    lambda_voidness.push((method_returns, body_returns));
                }
                Err(rejection) => {
                    candidate_rejection.get_or_insert(rejection);
                }
            }
        }

        ptm.bind_target(env, site.target.as_ref());

        if candidate_rejection.is_none() {
            for (index, arg) in args.iter().enumerate() {
                let ArgType::Known(actual) = arg else {
                    continue;
                };
                let Some(param) = ptm.param_type(index) else {
                    continue;
                };
                if !is_assignable_from(env, &param, actual) {
                    candidate_rejection = Some(Rejection::ArgumentMismatch { index });
                    break;
                }
            }
        }

        Candidate {
            ptm,
            rejection: candidate_rejection,
            lambda_voidness,
        }
    }

    /// The applicable candidate at least as specific as every other, using lambda voidness to
    /// break ties.
    fn most_specific(&self, candidates: &[Candidate], applicable: &[usize]) -> Option<usize> {
        let env = self.env;
        let maximal = |pool: &[usize]| -> Vec<usize> {
            pool.iter()
                .copied()
                .filter(|i| {
                    let mine = candidates[*i].ptm.param_types();
                    pool.iter().filter(|j| *j != i).all(|j| {
                        let theirs = candidates[*j].ptm.param_types();
                        is_more_specific(env, &mine, &theirs)
                    })
                })
                .collect()
        };

        let best = maximal(applicable);
        if best.len() == 1 {
            return Some(best[0]);
        }
        let pool: Vec<usize> = if best.is_empty() { applicable.to_vec() } else { best };
        let matching: Vec<usize> = pool
            .iter()
            .copied()
            .filter(|i| candidates[*i].voidness_matches())
            .collect();
        match matching.len() {
            1 => Some(matching[0]),
            0 => None,
            _ => {
                let narrowed = maximal(&matching);
                (narrowed.len() == 1).then(|| narrowed[0])
            }
        }
    }

    /// Push the chosen method's parameter types into the arguments and start them.
    fn commit_call(&mut self, site: &CallSite<'_>, mut ptm: ParamTypedMethod, args: &[ArgType]) -> CallResult {
        let env = self.env;
        let is_final = self.final_ctx;
        if !ptm.is_static() && site.static_only && ptm.method.kind == MethodKind::Method {
            let message = format!(
                "non-static method `{}` cannot be referenced from a static context",
                format_method_signature(env, ptm.method)
            );
            self.report(site.expr, site.slot + 1, Diagnostic::error("static-context", message, Some(site.span)));
        }
        if !site.type_args.is_empty() && site.type_args.len() != ptm.def().type_params.len() {
            let message = format!(
                "`{}` expects {} type argument(s) but {} were supplied",
                site.name,
                ptm.def().type_params.len(),
                site.type_args.len()
            );
            self.report(site.expr, site.slot + 2, Diagnostic::error("type-arg-count", message, Some(site.span)));
        }

        let passes = self.session.config.max_inference_passes.max(1);
        for pass in 0..passes {
            let mut changed = false;
            for (index, arg) in site.args.iter().enumerate() {
                let Some(param) = ptm.param_type(index) else {
                    self.start_expr_in_ctx(*arg);
                    continue;
                };
                self.push_target(*arg, param.clone(), is_final);
                let actual = self.start_expr_in_ctx(*arg);
                if matches!(args.get(index), Some(ArgType::Lambda { .. })) {
                    // Feed the committed lambda's return type back into the call.
                    if let (Some(formal), Some(ret)) =
                        (ptm.partial_param(index), self.lambda_return_type(*arg))
                    {
                        if let Ok(fm) = self.session.functional_method(env, &formal) {
                            changed |= ptm.bind_lambda_return(env, &fm.return_type, &ret);
                        }
                    }
                    continue;
                }
                if !actual.is_errorish() && !is_assignable_from(env, &param, &actual) {
                    let message = format!(
                        "incompatible types: `{}` cannot be converted to `{}`",
                        mosaic_types::format_type(env, &actual),
                        mosaic_types::format_type(env, &param)
                    );
                    self.report(*arg, 10, Diagnostic::error("incompatible-types", message, Some(self.span_of(*arg))));
                }
            }
            if !changed {
                break;
            }
            tracing::debug!(target: "mosaic.typeck", expr = ?site.expr, pass, "lambda feedback changed bindings");
        }

        let ty = ptm.return_type();
        let poly = ptm.is_poly();
        let method = ptm.method;
        self.calls.insert(site.key, ptm);
        CallResult {
            ty,
            method: Some(method),
            poly,
        }
    }

    pub(crate) fn start_args_untargeted(&mut self, args: &[ExprId]) {
        for arg in args {
            if matches!(self.body.expr(*arg), Expr::Lambda { .. }) {
                self.invalidate_lambda(*arg);
            } else {
                self.start_expr_in_ctx(*arg);
            }
        }
    }
}
