//! Name, type-reference and member lookup.

use std::collections::{HashMap, HashSet, VecDeque};

use mosaic_hir::{NodeId, TypeArgRef, TypeRef};
use mosaic_types::{
    erasure, instantiate_as_supertype, substitute, validate_type, ClassId, Diagnostic, FieldRef,
    MethodRef, PrimitiveType, Type, TypeEnv, TypeVarId, WildcardBound,
};

use crate::Typeck;

/// The declaring class followed by all of its supertypes, breadth-first, each once.
pub(crate) fn hierarchy(env: &dyn TypeEnv, class: ClassId) -> Vec<ClassId> {
    let object = env.well_known().object;
    let mut out = Vec::new();
    let mut seen = HashSet::new();
    let mut queue = VecDeque::from([class]);
    while let Some(id) = queue.pop_front() {
        if !seen.insert(id) {
            continue;
        }
        out.push(id);
        let Some(def) = env.class(id) else {
            continue;
        };
        queue.extend(def.super_class.iter().filter_map(Type::class_id));
        queue.extend(def.interfaces.iter().filter_map(Type::class_id));
        if def.super_class.is_none() && id != object {
            queue.push_back(object);
        }
    }
    out
}

/// Substitution for members declared in `owner`, as seen through `receiver`.
///
/// Wildcard arguments are replaced by their bound; raw or unrelated receivers erase the owner's
/// variables.
pub(crate) fn member_subst(
    env: &dyn TypeEnv,
    receiver: &Type,
    owner: ClassId,
) -> HashMap<TypeVarId, Type> {
    let Some(def) = env.class(owner) else {
        return HashMap::new();
    };
    if def.type_params.is_empty() {
        return HashMap::new();
    }
    match instantiate_as_supertype(env, receiver, owner) {
        Some(Type::Parameterized(view)) => def
            .type_params
            .iter()
            .zip(view.args)
            .map(|(var, arg)| {
                let arg = match arg {
                    Type::Wildcard(WildcardBound::Extends(b))
                    | Type::Wildcard(WildcardBound::Super(b)) => *b,
                    Type::Wildcard(WildcardBound::Unbounded) => erasure(env, &Type::TypeVar(*var)),
                    other => other,
                };
                (*var, arg)
            })
            .collect(),
        _ => def
            .type_params
            .iter()
            .map(|var| (*var, erasure(env, &Type::TypeVar(*var))))
            .collect(),
    }
}

/// The type to look members up on: type variables and wildcards use their bound.
pub(crate) fn member_receiver(env: &dyn TypeEnv, ty: &Type) -> Type {
    match ty {
        Type::TypeVar(_) | Type::Wildcard(_) => erasure(env, ty),
        Type::Primitive(_) => mosaic_types::boxed(env, ty),
        other => other.clone(),
    }
}

/// Methods called `name` visible on `class`, most derived first. Overridden declarations (same
/// erased parameter list) are hidden.
pub(crate) fn methods_named(env: &dyn TypeEnv, class: ClassId, name: &str) -> Vec<MethodRef> {
    let mut out: Vec<MethodRef> = Vec::new();
    let mut signatures: Vec<Vec<Type>> = Vec::new();
    for owner in hierarchy(env, class) {
        let Some(def) = env.class(owner) else {
            continue;
        };
        for (index, method) in def.methods.iter().enumerate() {
            if method.name != name {
                continue;
            }
            let erased: Vec<Type> = method.params.iter().map(|p| erasure(env, p)).collect();
            if signatures.contains(&erased) {
                continue;
            }
            signatures.push(erased);
            out.push(MethodRef::method(owner, index));
        }
    }
    out
}

/// A field visible on `receiver`, with its type seen through the receiver's type arguments.
pub(crate) fn find_field(env: &dyn TypeEnv, receiver: &Type, name: &str) -> Option<(FieldRef, Type, bool)> {
    let class = receiver.class_id()?;
    hierarchy(env, class).into_iter().find_map(|owner| {
        let def = env.class(owner)?;
        let index = def.fields.iter().position(|f| f.name == name)?;
        let field = &def.fields[index];
        let ty = substitute(&field.ty, &member_subst(env, receiver, owner));
        Some((
            FieldRef {
                owner,
                index: index as u32,
            },
            ty,
            field.is_static,
        ))
    })
}

/// What a simple name refers to as a value.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ValueRef {
    Local(Type),
    Param(Type),
    Field {
        field: FieldRef,
        ty: Type,
        is_static: bool,
    },
}

impl ValueRef {
    pub fn ty(&self) -> &Type {
        match self {
            ValueRef::Local(ty) | ValueRef::Param(ty) => ty,
            ValueRef::Field { ty, .. } => ty,
        }
    }
}

impl<'a> Typeck<'a> {
    /// Resolve a syntactic type. Failures are reported against `at` and yield `Type::Error`.
    pub(crate) fn resolve_type_ref(&mut self, at: impl Into<NodeId>, tr: &TypeRef) -> Type {
        let at = at.into();
        let slot = 1000 + tr.range.start as u32;
        let Some(base) = self.resolve_type_name(&tr.name) else {
            let message = format!("cannot find type `{}`", tr.name);
            self.report_unresolved(at, slot, "unresolved-type", message, tr.range);
            return Type::Error;
        };

        let ty = if tr.args.is_empty() {
            base
        } else {
            let Some(class) = base.class_id() else {
                let message = format!("type `{}` does not take type arguments", tr.name);
                self.report(at, slot, Diagnostic::error("type-arg-count", message, Some(tr.range)));
                return Type::Error;
            };
            let args: Vec<Type> = tr
                .args
                .iter()
                .map(|arg| match arg {
                    TypeArgRef::Type(t) => self.resolve_type_ref(at, t),
                    TypeArgRef::Unbounded => Type::Wildcard(WildcardBound::Unbounded),
                    TypeArgRef::Extends(t) => {
                        Type::Wildcard(WildcardBound::Extends(Box::new(self.resolve_type_ref(at, t))))
                    }
                    TypeArgRef::Super(t) => {
                        Type::Wildcard(WildcardBound::Super(Box::new(self.resolve_type_ref(at, t))))
                    }
                })
                .collect();
            let ty = Type::class(class, args);
            if let Err(err) = validate_type(self.env, &ty) {
                self.report(at, slot, Diagnostic::error("type-arg-count", err.to_string(), Some(tr.range)));
                return Type::Error;
            }
            ty
        };
        Type::array_of(ty, tr.dims)
    }

    /// Primitive, type variable, class (qualified, same package, nested, or implicitly imported).
    pub(crate) fn resolve_type_name(&mut self, name: &str) -> Option<Type> {
        let env = self.env;
        if name == "void" {
            return Some(Type::Void);
        }
        if let Some(p) = PrimitiveType::from_keyword(name) {
            return Some(Type::Primitive(p));
        }
        if !name.contains('.') {
            if let Some(var) = self.type_var_named(name) {
                return Some(Type::TypeVar(var));
            }
        }
        if let Some(nested) = self.nested_class(name) {
            return Some(Type::Declared(nested));
        }
        if let Some(pkg) = self.context_package() {
            if let Some(id) = env.lookup_class(&format!("{pkg}.{name}")) {
                return Some(Type::Declared(id));
            }
        }
        if let Some(id) = self.session.resolve_class_name(env, name) {
            return Some(Type::Declared(id));
        }
        env.find_type_declaration(name)
    }

    fn type_var_named(&self, name: &str) -> Option<TypeVarId> {
        let env = self.env;
        let named = |var: &TypeVarId| env.type_param(*var).is_some_and(|tp| tp.name == name);
        if let Some(var) = self.ctx.method_type_params.iter().find(|v| named(v)) {
            return Some(*var);
        }
        let mut class = Some(self.ctx.class);
        while let Some(id) = class {
            let def = env.class(id)?;
            if let Some(var) = def.type_params.iter().find(|v| named(v)) {
                return Some(*var);
            }
            class = def.enclosing;
        }
        None
    }

    /// `Inner` declared in the context class or one of its enclosing classes.
    fn nested_class(&self, name: &str) -> Option<ClassId> {
        let env = self.env;
        let mut class = Some(self.ctx.class);
        while let Some(id) = class {
            let def = env.class(id)?;
            if def.simple_name() == name {
                return Some(id);
            }
            if let Some(found) = env.lookup_class(&format!("{}.{name}", def.name)) {
                return Some(found);
            }
            class = def.enclosing;
        }
        None
    }

    fn context_package(&self) -> Option<String> {
        let env = self.env;
        let mut id = self.ctx.class;
        while let Some(outer) = env.class(id)?.enclosing {
            id = outer;
        }
        let name = &env.class(id)?.name;
        name.rfind('.').map(|dot| name[..dot].to_string())
    }

    /// Locals (innermost scope first), then parameters, then fields of the context class and its
    /// enclosing classes.
    pub(crate) fn lookup_value(&self, name: &str) -> Option<ValueRef> {
        if let Some(ty) = self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            return Some(ValueRef::Local(ty.clone()));
        }
        if let Some((_, ty)) = self.ctx.params.iter().find(|(n, _)| n == name) {
            return Some(ValueRef::Param(ty.clone()));
        }
        let env = self.env;
        let mut class = Some(self.ctx.class);
        while let Some(id) = class {
            let this_ty = crate::this_type(env, id);
            if let Some((field, ty, is_static)) = find_field(env, &this_ty, name) {
                return Some(ValueRef::Field { field, ty, is_static });
            }
            class = env.class(id).and_then(|def| def.enclosing);
        }
        None
    }
}
