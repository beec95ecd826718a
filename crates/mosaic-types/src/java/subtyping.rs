use crate::java::helpers::instantiate_as_supertype;
use crate::{PrimitiveType, Type, TypeEnv, WildcardBound};

const MAX_DEPTH: u8 = 24;

/// Reference subtyping (`sub <: sup`), invariant on type arguments except through wildcards.
///
/// Raw and parameterized forms of the same declaration are mutually compatible (unchecked
/// conversion). Arrays are covariant on reference components and never related to non-arrays.
/// A type variable is a supertype only of itself, `null` and variables bounded by it.
pub fn is_subtype(env: &dyn TypeEnv, sub: &Type, sup: &Type) -> bool {
    subtype_inner(env, sub, sup, 0)
}

/// `target = source` compatibility under method-invocation conversion: identity, primitive
/// widening, boxing / unboxing and reference subtyping.
///
/// Unresolved (`Unknown`) and already-reported (`Error`) types are optimistically compatible.
/// Type variables get no special treatment: callers substitute inference variables first.
pub fn is_assignable_from(env: &dyn TypeEnv, target: &Type, source: &Type) -> bool {
    assignable_inner(env, target, source, 0)
}

fn assignable_inner(env: &dyn TypeEnv, target: &Type, source: &Type, depth: u8) -> bool {
    if target == source || target.is_errorish() || source.is_errorish() {
        return true;
    }
    if depth > MAX_DEPTH {
        return false;
    }
    match (target, source) {
        (Type::Void, _) | (_, Type::Void) => false,
        (Type::Primitive(t), Type::Primitive(s)) => is_widening(*s, *t),
        (Type::Primitive(t), _) => unboxed(env, source).is_some_and(|s| s == *t || is_widening(s, *t)),
        (_, Type::Primitive(_)) => {
            let boxed = boxed(env, source);
            subtype_inner(env, &boxed, target, depth + 1)
        }
        _ => subtype_inner(env, source, target, depth + 1),
    }
}

fn subtype_inner(env: &dyn TypeEnv, sub: &Type, sup: &Type, depth: u8) -> bool {
    if sub == sup || sub.is_errorish() || sup.is_errorish() {
        return true;
    }
    if depth > MAX_DEPTH {
        return false;
    }
    match (sub, sup) {
        (Type::Void, _) | (_, Type::Void) => false,
        (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
        (Type::Null, _) => sup.is_reference(),
        (_, Type::Null) => false,
        (Type::Array(a), Type::Array(b)) => match (a.as_ref(), b.as_ref()) {
            (Type::Primitive(pa), Type::Primitive(pb)) => pa == pb,
            (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
            _ => subtype_inner(env, a, b, depth + 1),
        },
        (Type::Array(_), _) | (_, Type::Array(_)) => false,
        (Type::Wildcard(w), _) => match w {
            WildcardBound::Extends(b) => subtype_inner(env, b, sup, depth + 1),
            _ => sup.class_id() == Some(env.well_known().object),
        },
        (Type::TypeVar(id), _) => {
            let bounds = env
                .type_param(*id)
                .map(|tp| tp.upper_bounds.clone())
                .unwrap_or_default();
            if bounds.is_empty() {
                return sup.class_id() == Some(env.well_known().object)
                    && sup.type_args().is_empty();
            }
            bounds
                .iter()
                .any(|b| subtype_inner(env, b, sup, depth + 1))
        }
        (_, Type::TypeVar(_)) | (_, Type::Wildcard(_)) => false,
        _ => {
            let Some(target) = sup.class_id() else {
                return false;
            };
            let Some(view) = instantiate_as_supertype(env, sub, target) else {
                return false;
            };
            match (&view, sup) {
                (_, Type::Declared(_)) | (Type::Declared(_), _) => true,
                (Type::Parameterized(v), Type::Parameterized(s)) => {
                    v.args.len() == s.args.len()
                        && s.args
                            .iter()
                            .zip(&v.args)
                            .all(|(s_arg, v_arg)| contains(env, s_arg, v_arg, depth + 1))
                }
                _ => false,
            }
        }
    }
}

/// Type argument containment (`arg <= target_arg`).
fn contains(env: &dyn TypeEnv, target_arg: &Type, arg: &Type, depth: u8) -> bool {
    if target_arg == arg || target_arg.is_errorish() || arg.is_errorish() {
        return true;
    }
    let object = Type::Declared(env.well_known().object);
    match target_arg {
        Type::Wildcard(WildcardBound::Unbounded) => true,
        Type::Wildcard(WildcardBound::Extends(bound)) => {
            let upper = match arg {
                Type::Wildcard(WildcardBound::Extends(b)) => (**b).clone(),
                Type::Wildcard(_) => object,
                other => other.clone(),
            };
            subtype_inner(env, &upper, bound, depth + 1)
        }
        Type::Wildcard(WildcardBound::Super(bound)) => match arg {
            Type::Wildcard(WildcardBound::Super(b)) => subtype_inner(env, bound, b, depth + 1),
            Type::Wildcard(_) => false,
            other => subtype_inner(env, bound, other, depth + 1),
        },
        _ => false,
    }
}

/// Primitive widening conversion (JLS 5.1.2).
fn is_widening(from: PrimitiveType, to: PrimitiveType) -> bool {
    use PrimitiveType::*;
    if from == to {
        return true;
    }
    match from {
        Byte => matches!(to, Short | Int | Long | Float | Double),
        Short | Char => matches!(to, Int | Long | Float | Double),
        Int => matches!(to, Long | Float | Double),
        Long => matches!(to, Float | Double),
        Float => matches!(to, Double),
        Double | Boolean => false,
    }
}

/// Box a primitive type; reference types are returned unchanged.
pub fn boxed(env: &dyn TypeEnv, ty: &Type) -> Type {
    let wk = env.well_known();
    match ty {
        Type::Primitive(p) => Type::Declared(match p {
            PrimitiveType::Boolean => wk.boolean,
            PrimitiveType::Byte => wk.byte,
            PrimitiveType::Short => wk.short,
            PrimitiveType::Char => wk.character,
            PrimitiveType::Int => wk.integer,
            PrimitiveType::Long => wk.long,
            PrimitiveType::Float => wk.float,
            PrimitiveType::Double => wk.double,
        }),
        other => other.clone(),
    }
}

/// The primitive behind a primitive or boxed type.
pub fn unboxed(env: &dyn TypeEnv, ty: &Type) -> Option<PrimitiveType> {
    let wk = env.well_known();
    match ty {
        Type::Primitive(p) => Some(*p),
        Type::Declared(id) => Some(match *id {
            id if id == wk.boolean => PrimitiveType::Boolean,
            id if id == wk.byte => PrimitiveType::Byte,
            id if id == wk.short => PrimitiveType::Short,
            id if id == wk.character => PrimitiveType::Char,
            id if id == wk.integer => PrimitiveType::Int,
            id if id == wk.long => PrimitiveType::Long,
            id if id == wk.float => PrimitiveType::Float,
            id if id == wk.double => PrimitiveType::Double,
            _ => return None,
        }),
        _ => None,
    }
}

/// Binary numeric promotion (JLS 5.6.2). `None` if either side is `boolean`.
pub fn binary_numeric_promotion(a: PrimitiveType, b: PrimitiveType) -> Option<PrimitiveType> {
    use PrimitiveType::*;
    if !a.is_numeric() || !b.is_numeric() {
        return None;
    }
    Some(if a == Double || b == Double {
        Double
    } else if a == Float || b == Float {
        Float
    } else if a == Long || b == Long {
        Long
    } else {
        Int
    })
}

/// `a` is at least as specific as `b`: every parameter of `a` is assignable to the matching
/// parameter of `b`.
pub fn is_more_specific(env: &dyn TypeEnv, a: &[Type], b: &[Type]) -> bool {
    a.len() == b.len()
        && a.iter().zip(b).all(|(pa, pb)| match (pa, pb) {
            (Type::Primitive(x), Type::Primitive(y)) => is_widening(*x, *y),
            (Type::Primitive(_), _) | (_, Type::Primitive(_)) => false,
            _ => is_subtype(env, pa, pb),
        })
}
