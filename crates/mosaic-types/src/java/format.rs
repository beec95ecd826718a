use crate::{MethodRef, Type, TypeEnv, WildcardBound};

/// Java-like rendering of `ty` using simple class names, for diagnostics.
pub fn format_type(env: &dyn TypeEnv, ty: &Type) -> String {
    let mut out = String::new();
    write_type(env, ty, &mut out);
    out
}

/// `name(Param, Param)` for a method or constructor handle.
pub fn format_method_signature(env: &dyn TypeEnv, method: MethodRef) -> String {
    let Some(def) = env.method(method) else {
        return "<unknown method>".to_string();
    };
    let name = match method.kind {
        crate::MethodKind::Method => def.name.clone(),
        crate::MethodKind::Constructor => env
            .class(method.owner)
            .map(|c| c.simple_name().to_string())
            .unwrap_or_else(|| def.name.clone()),
    };
    let params: Vec<String> = def.params.iter().map(|p| format_type(env, p)).collect();
    format!("{name}({})", params.join(", "))
}

fn write_type(env: &dyn TypeEnv, ty: &Type, out: &mut String) {
    match ty {
        Type::Void => out.push_str("void"),
        Type::Primitive(p) => out.push_str(p.keyword()),
        Type::Null => out.push_str("null"),
        Type::Declared(id) => match env.class(*id) {
            Some(def) => out.push_str(def.simple_name()),
            None => out.push_str("<unknown class>"),
        },
        Type::Parameterized(p) => {
            match env.class(p.base) {
                Some(def) => out.push_str(def.simple_name()),
                None => out.push_str("<unknown class>"),
            }
            out.push('<');
            for (idx, arg) in p.args.iter().enumerate() {
                if idx > 0 {
                    out.push_str(", ");
                }
                write_type(env, arg, out);
            }
            out.push('>');
        }
        Type::Array(component) => {
            write_type(env, component, out);
            out.push_str("[]");
        }
        Type::TypeVar(id) => match env.type_param(*id) {
            Some(tp) => out.push_str(&tp.name),
            None => out.push_str("<unknown type variable>"),
        },
        Type::Wildcard(WildcardBound::Unbounded) => out.push('?'),
        Type::Wildcard(WildcardBound::Extends(b)) => {
            out.push_str("? extends ");
            write_type(env, b, out);
        }
        Type::Wildcard(WildcardBound::Super(b)) => {
            out.push_str("? super ");
            write_type(env, b, out);
        }
        Type::Unknown => out.push_str("<unknown>"),
        Type::Error => out.push_str("<error>"),
    }
}
