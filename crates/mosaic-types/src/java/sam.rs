use std::collections::{HashSet, VecDeque};

use serde::{Deserialize, Serialize};

use crate::java::helpers::{class_subst, direct_supertypes, erasure, substitute};
use crate::{ClassId, MethodRef, PrimitiveType, Type, TypeEnv, WildcardBound};

/// Policy for interfaces that declare two unrelated abstract methods (neither overrides the
/// other). Java rejects such interfaces as lambda targets; the policy lets callers pick one
/// deterministically instead.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SamTieBreak {
    /// Report the interface as ambiguous.
    #[default]
    Reject,
    /// Keep the method found first (the most derived interface wins).
    First,
    /// Keep the method found last.
    Last,
}

/// The single abstract method a lambda must implement, with the interface's type arguments
/// applied.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct FunctionalMethod {
    pub interface: ClassId,
    pub method: MethodRef,
    pub name: String,
    pub params: Vec<Type>,
    pub return_type: Type,
}

#[derive(Clone, Debug, PartialEq, Eq, Hash, thiserror::Error)]
pub enum SamError {
    #[error("`{0}` is not an interface")]
    NotAnInterface(String),
    #[error("`{0}` declares no abstract method")]
    NoAbstractMethod(String),
    #[error("`{interface}` has more than one abstract method: `{first}` and `{second}`")]
    Ambiguous {
        interface: String,
        first: String,
        second: String,
    },
}

struct Candidate {
    key: (String, Vec<Type>),
    method: MethodRef,
    params: Vec<Type>,
    return_type: Type,
}

/// Locate the functional method of `ty`.
///
/// Walks the interface graph breadth-first from `ty`, applying type argument substitution.
/// Static, default and `Object`-redeclaring methods are skipped; a method redeclared with the
/// same erased signature further down the graph collapses into the more derived declaration (the
/// more specific return type is kept); a default method in a sub-interface retires the abstract
/// one it overrides. Wildcard arguments are first replaced by their bounds (JLS 9.9).
pub fn functional_method(
    env: &dyn TypeEnv,
    ty: &Type,
    tie_break: SamTieBreak,
) -> Result<FunctionalMethod, SamError> {
    let ty = non_wildcard_parameterization(env, ty);
    let Some(root) = ty.class_id() else {
        return Err(SamError::NotAnInterface(crate::format_type(env, &ty)));
    };
    let Some(root_def) = env.class(root) else {
        return Err(SamError::NotAnInterface(crate::format_type(env, &ty)));
    };
    if !root_def.is_interface() {
        return Err(SamError::NotAnInterface(root_def.name.clone()));
    }

    let mut queue: VecDeque<Type> = VecDeque::new();
    let mut seen: HashSet<Type> = HashSet::new();
    let mut candidates: Vec<Candidate> = Vec::new();
    let mut defaulted: HashSet<(String, Vec<Type>)> = HashSet::new();
    queue.push_back(ty.clone());

    while let Some(current) = queue.pop_front() {
        if !seen.insert(current.clone()) {
            continue;
        }
        let Some(id) = current.class_id() else {
            continue;
        };
        let Some(def) = env.class(id) else {
            continue;
        };
        if !def.is_interface() {
            continue;
        }
        let subst = class_subst(env, &current);

        for (idx, m) in def.methods.iter().enumerate() {
            if m.is_static {
                continue;
            }
            let params: Vec<Type> = m.params.iter().map(|p| substitute(p, &subst)).collect();
            let return_type = substitute(&m.return_type, &subst);
            let key = (
                m.name.clone(),
                params.iter().map(|p| erasure(env, p)).collect::<Vec<_>>(),
            );
            if m.is_default || !m.is_abstract {
                defaulted.insert(key);
                continue;
            }
            if defaulted.contains(&key) || is_object_method(env, &m.name, &params, &return_type) {
                continue;
            }

            match candidates.iter_mut().find(|c| c.key == key) {
                Some(existing) => {
                    // Redeclaration: keep the more derived return type.
                    if crate::is_subtype(env, &return_type, &existing.return_type)
                        && return_type != existing.return_type
                    {
                        existing.return_type = return_type;
                    }
                }
                None => candidates.push(Candidate {
                    key,
                    method: crate::MethodRef::method(id, idx),
                    params,
                    return_type,
                }),
            }
        }

        queue.extend(direct_supertypes(env, &current));
    }

    let chosen = match candidates.len() {
        0 => return Err(SamError::NoAbstractMethod(root_def.name.clone())),
        1 => candidates.remove(0),
        _ => match tie_break {
            SamTieBreak::Reject => {
                return Err(SamError::Ambiguous {
                    interface: root_def.name.clone(),
                    first: candidates[0].key.0.clone(),
                    second: candidates[1].key.0.clone(),
                })
            }
            SamTieBreak::First => candidates.remove(0),
            SamTieBreak::Last => candidates.pop().ok_or_else(|| {
                SamError::NoAbstractMethod(root_def.name.clone())
            })?,
        },
    };

    Ok(FunctionalMethod {
        interface: root,
        method: chosen.method,
        name: chosen.key.0,
        params: chosen.params,
        return_type: chosen.return_type,
    })
}

/// Replace wildcard type arguments by the types a lambda would be typed against.
fn non_wildcard_parameterization(env: &dyn TypeEnv, ty: &Type) -> Type {
    let Type::Parameterized(p) = ty else {
        return ty.clone();
    };
    if !p.args.iter().any(|a| matches!(a, Type::Wildcard(_))) {
        return ty.clone();
    }
    let formals = env
        .class(p.base)
        .map(|def| def.type_params.clone())
        .unwrap_or_default();
    let args = p
        .args
        .iter()
        .enumerate()
        .map(|(idx, arg)| match arg {
            Type::Wildcard(WildcardBound::Extends(b)) | Type::Wildcard(WildcardBound::Super(b)) => {
                (**b).clone()
            }
            Type::Wildcard(WildcardBound::Unbounded) => formals
                .get(idx)
                .and_then(|tp| env.type_param(*tp))
                .and_then(|tp| tp.upper_bounds.first().cloned())
                .unwrap_or(Type::Declared(env.well_known().object)),
            other => other.clone(),
        })
        .collect();
    Type::class(p.base, args)
}

fn is_object_method(env: &dyn TypeEnv, name: &str, params: &[Type], return_type: &Type) -> bool {
    let object = Type::Declared(env.well_known().object);
    match name {
        "equals" => {
            params.len() == 1
                && params[0] == object
                && *return_type == Type::Primitive(PrimitiveType::Boolean)
        }
        "hashCode" => params.is_empty() && *return_type == Type::Primitive(PrimitiveType::Int),
        "toString" => params.is_empty() && *return_type == Type::Declared(env.well_known().string),
        _ => false,
    }
}
