use std::collections::{HashMap, HashSet, VecDeque};

use crate::{ClassId, ParamType, Type, TypeEnv, TypeVarId, WildcardBound};

/// Replace type variables according to `subst`. Variables without an entry are kept.
pub fn substitute(ty: &Type, subst: &HashMap<TypeVarId, Type>) -> Type {
    if subst.is_empty() {
        return ty.clone();
    }
    match ty {
        Type::TypeVar(id) => subst.get(id).cloned().unwrap_or_else(|| ty.clone()),
        Type::Parameterized(ParamType { base, args }) => Type::Parameterized(ParamType {
            base: *base,
            args: args.iter().map(|a| substitute(a, subst)).collect(),
        }),
        Type::Array(component) => Type::array(substitute(component, subst)),
        Type::Wildcard(WildcardBound::Extends(b)) => {
            Type::Wildcard(WildcardBound::Extends(Box::new(substitute(b, subst))))
        }
        Type::Wildcard(WildcardBound::Super(b)) => {
            Type::Wildcard(WildcardBound::Super(Box::new(substitute(b, subst))))
        }
        Type::Void
        | Type::Primitive(_)
        | Type::Null
        | Type::Declared(_)
        | Type::Wildcard(WildcardBound::Unbounded)
        | Type::Unknown
        | Type::Error => ty.clone(),
    }
}

/// Type-erasure: drop type arguments and replace variables with their first bound.
pub fn erasure(env: &dyn TypeEnv, ty: &Type) -> Type {
    fn inner(env: &dyn TypeEnv, ty: &Type, depth: u8) -> Type {
        if depth > 16 {
            return Type::Declared(env.well_known().object);
        }
        match ty {
            Type::Parameterized(p) => Type::Declared(p.base),
            Type::Array(component) => Type::array(inner(env, component, depth + 1)),
            Type::TypeVar(id) => env
                .type_param(*id)
                .and_then(|tp| tp.upper_bounds.first())
                .map(|bound| inner(env, bound, depth + 1))
                .unwrap_or(Type::Declared(env.well_known().object)),
            Type::Wildcard(WildcardBound::Extends(b)) => inner(env, b, depth + 1),
            Type::Wildcard(_) => Type::Declared(env.well_known().object),
            other => other.clone(),
        }
    }
    inner(env, ty, 0)
}

/// Substitution mapping a class's own type parameters to the arguments of `ty`.
///
/// Raw or non-generic instantiations produce an empty map.
pub(crate) fn class_subst(env: &dyn TypeEnv, ty: &Type) -> HashMap<TypeVarId, Type> {
    let Type::Parameterized(ParamType { base, args }) = ty else {
        return HashMap::new();
    };
    let Some(def) = env.class(*base) else {
        return HashMap::new();
    };
    def.type_params
        .iter()
        .copied()
        .enumerate()
        .map(|(idx, tp)| (tp, args.get(idx).cloned().unwrap_or(Type::Unknown)))
        .collect()
}

/// Direct supertypes of a class-like type, with the instantiation's type arguments applied.
///
/// Raw instantiations yield raw supertypes. Interfaces get the implicit `Object` supertype.
pub(crate) fn direct_supertypes(env: &dyn TypeEnv, ty: &Type) -> Vec<Type> {
    let Some(id) = ty.class_id() else {
        return Vec::new();
    };
    let Some(def) = env.class(id) else {
        return Vec::new();
    };
    let raw = matches!(ty, Type::Declared(_)) && !def.type_params.is_empty();
    let subst = class_subst(env, ty);

    let mut out = Vec::with_capacity(def.interfaces.len() + 1);
    let mut push = |st: &Type| {
        if raw {
            if let Some(id) = st.class_id() {
                out.push(Type::Declared(id));
            }
        } else {
            out.push(substitute(st, &subst));
        }
    };
    if let Some(sc) = &def.super_class {
        push(sc);
    }
    for iface in &def.interfaces {
        push(iface);
    }
    if def.is_interface() || (def.super_class.is_none() && id != env.well_known().object) {
        out.push(Type::Declared(env.well_known().object));
    }
    out
}

/// Return `ty` viewed as `target` by walking the supertype graph and applying type argument
/// substitution along the way.
///
/// Example: `ArrayList<String>` instantiated as `List` returns `List<String>`. A raw `ArrayList`
/// returns the raw `List`. Missing metadata returns `None`.
pub fn instantiate_as_supertype(env: &dyn TypeEnv, ty: &Type, target: ClassId) -> Option<Type> {
    fn inner(
        env: &dyn TypeEnv,
        ty: &Type,
        target: ClassId,
        seen_type_vars: &mut HashSet<TypeVarId>,
    ) -> Option<Type> {
        if let Type::TypeVar(id) = ty {
            if !seen_type_vars.insert(*id) {
                return None;
            }
            let out = env.type_param(*id).and_then(|tp| {
                tp.upper_bounds
                    .iter()
                    .find_map(|bound| inner(env, bound, target, seen_type_vars))
            });
            seen_type_vars.remove(id);
            return out;
        }

        ty.class_id()?;
        let mut queue: VecDeque<Type> = VecDeque::new();
        let mut seen: HashSet<Type> = HashSet::new();
        queue.push_back(ty.clone());

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if current.class_id() == Some(target) {
                return Some(current);
            }
            queue.extend(direct_supertypes(env, &current));
        }
        None
    }

    let mut seen_type_vars = HashSet::new();
    inner(env, ty, target, &mut seen_type_vars)
}

/// Type arguments of `ty` viewed as `target`. Raw views produce an empty list.
pub fn type_args_as(env: &dyn TypeEnv, ty: &Type, target: ClassId) -> Option<Vec<Type>> {
    instantiate_as_supertype(env, ty, target).map(|t| t.type_args().to_vec())
}

/// Value of the class type parameter `var` (declared by `declaring`) as seen from `context`.
///
/// Walks the super/interface chain from `context` up to `declaring` and maps each hop's type
/// arguments positionally. If `context` is raw, unrelated, or `var` is not one of `declaring`'s
/// parameters, the variable itself is returned. Missing declarations yield `Type::Unknown`.
pub fn resolve_type_parameter(
    env: &dyn TypeEnv,
    declaring: ClassId,
    context: &Type,
    var: TypeVarId,
) -> Type {
    let Some(def) = env.class(declaring) else {
        return Type::Unknown;
    };
    let Some(pos) = def.type_params.iter().position(|tp| *tp == var) else {
        return Type::TypeVar(var);
    };
    match instantiate_as_supertype(env, context, declaring) {
        Some(Type::Parameterized(p)) => p.args.get(pos).cloned().unwrap_or(Type::Unknown),
        _ => Type::TypeVar(var),
    }
}

/// Least upper bound (best effort): the first supertype of `a`, in breadth-first order, that `b`
/// is also a subtype of.
pub fn lub(env: &dyn TypeEnv, a: &Type, b: &Type) -> Type {
    if a == b {
        return a.clone();
    }
    if a.is_errorish() {
        return b.clone();
    }
    if b.is_errorish() || *b == Type::Null {
        return a.clone();
    }
    if *a == Type::Null {
        return b.clone();
    }
    if let (Type::Primitive(pa), Type::Primitive(pb)) = (a, b) {
        if let Some(p) = crate::binary_numeric_promotion(*pa, *pb) {
            return Type::Primitive(p);
        }
    }
    let a = crate::boxed(env, a);
    let b = crate::boxed(env, b);
    if crate::is_subtype(env, &a, &b) {
        return b;
    }
    if crate::is_subtype(env, &b, &a) {
        return a;
    }

    // `Object` is the fallback, never a preferred join.
    let object = env.well_known().object;
    let mut queue: VecDeque<Type> = VecDeque::new();
    let mut seen: HashSet<Type> = HashSet::new();
    queue.extend(direct_supertypes(env, &a));
    while let Some(candidate) = queue.pop_front() {
        if !seen.insert(candidate.clone()) || candidate.class_id() == Some(object) {
            continue;
        }
        if crate::is_subtype(env, &b, &candidate) {
            return candidate;
        }
        if let Some(id) = candidate.class_id() {
            // Same declaration, different arguments: fall back to the raw view.
            if instantiate_as_supertype(env, &b, id).is_some() {
                return Type::Declared(id);
            }
        }
        queue.extend(direct_supertypes(env, &candidate));
    }
    Type::Declared(object)
}

#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[error("`{class}` expects {expected} type argument(s) but {found} were supplied")]
pub struct TypeArgCountMismatch {
    pub class: String,
    pub expected: usize,
    pub found: usize,
}

/// Check that every parameterized type inside `ty` supplies one argument per type parameter.
pub fn validate_type(env: &dyn TypeEnv, ty: &Type) -> Result<(), TypeArgCountMismatch> {
    match ty {
        Type::Parameterized(ParamType { base, args }) => {
            if let Some(def) = env.class(*base) {
                if def.type_params.len() != args.len() {
                    return Err(TypeArgCountMismatch {
                        class: def.name.clone(),
                        expected: def.type_params.len(),
                        found: args.len(),
                    });
                }
            }
            args.iter().try_for_each(|a| validate_type(env, a))
        }
        Type::Array(component) => validate_type(env, component),
        Type::Wildcard(WildcardBound::Extends(b)) | Type::Wildcard(WildcardBound::Super(b)) => {
            validate_type(env, b)
        }
        _ => Ok(()),
    }
}
