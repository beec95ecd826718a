use mosaic_hir::{BodyBuilder, TypeArgRef};
use mosaic_typeck::BodyContext;
use mosaic_types::Type;

use pretty_assertions::assert_eq;

use crate::suite::support::{codes, Fixture};

fn util_ctx(fx: &Fixture) -> BodyContext {
    BodyContext::new(fx.util)
        .with_static(true)
        .with_param("i", fx.integer())
}

#[test]
fn identity_binds_the_argument_type_without_a_target() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let i = b.name("i");
    let call = b.call("identity", vec![i]);
    let local = b.let_stmt("r", None, Some(call));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, util_ctx(&fx));
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(result.type_of_expr(call), Some(&fx.integer()));
    assert_eq!(result.local_type(local), Some(&fx.integer()));
    assert_eq!(result.bound_method(call), Some(fx.method("com.example.Util", "identity")));
}

#[test]
fn a_wider_target_does_not_override_the_argument_binding() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let number = b.ty("Number");
    let i = b.name("i");
    let call = b.call("identity", vec![i]);
    let local = b.let_stmt("n", Some(number), Some(call));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, util_ctx(&fx));
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(result.type_of_expr(call), Some(&fx.integer()));
    assert_eq!(result.local_type(local), Some(&fx.declared("java.lang.Number")));
}

#[test]
fn argument_binding_that_misses_the_declared_type_is_incompatible() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let declared = b.ty("String");
    let i = b.name("i");
    let call = b.call("identity", vec![i]);
    let local = b.let_stmt("s", Some(declared), Some(call));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, util_ctx(&fx));
    assert_eq!(codes(&result), vec!["incompatible-types"]);
}

#[test]
fn varargs_factory_binds_the_component_type() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let list = b.name("List");
    let first = b.string("a");
    let second = b.string("b");
    let of = b.sel_call("of", vec![first, second]);
    let chain = b.select(list, vec![of]);
    let local = b.let_stmt("names", None, Some(chain));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, util_ctx(&fx));
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(
        result.type_of_expr(chain),
        Some(&fx.generic("java.util.List", vec![fx.string()]))
    );
    assert_eq!(result.type_of_expr(second), Some(&fx.string()));
}

#[test]
fn diamond_takes_its_arguments_from_the_target() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let string = b.ty("String");
    let declared = b.generic_ty("List", vec![TypeArgRef::Type(string)]);
    let array_list = b.ty("ArrayList");
    let new = b.new_diamond(array_list, vec![]);
    let local = b.let_stmt("names", Some(declared), Some(new));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, util_ctx(&fx));
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(
        result.type_of_expr(new),
        Some(&fx.generic("java.util.ArrayList", vec![fx.string()]))
    );
}

#[test]
fn generic_factory_is_solved_from_the_target() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let string = b.ty("String");
    let declared = b.generic_ty("List", vec![TypeArgRef::Type(string)]);
    let collections = b.name("Collections");
    let empty = b.sel_call("emptyList", vec![]);
    let chain = b.select(collections, vec![empty]);
    let local = b.let_stmt("names", Some(declared), Some(chain));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, util_ctx(&fx));
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(
        result.type_of_expr(chain),
        Some(&fx.generic("java.util.List", vec![fx.string()]))
    );
}

#[test]
fn explicit_type_arguments_win() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let collections = b.name("Collections");
    let integer = b.ty("Integer");
    let empty = b.sel_generic_call("emptyList", vec![integer], vec![]);
    let chain = b.select(collections, vec![empty]);
    let local = b.let_stmt("numbers", None, Some(chain));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, util_ctx(&fx));
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(
        result.local_type(local),
        Some(&fx.generic("java.util.List", vec![fx.integer()]))
    );
}

#[test]
fn interfaces_cannot_be_instantiated() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let runnable = b.ty("Runnable");
    let new = b.new_object(runnable, vec![]);
    let stmt = b.expr_stmt(new);
    let body = b.finish(vec![stmt]);

    let result = fx.check(&body, util_ctx(&fx));
    assert_eq!(codes(&result), vec!["abstract-instantiation"]);
    assert_eq!(result.type_of_expr(new), Some(&Type::Error));
}

#[test]
fn unresolved_references_degrade_to_unknown() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let missing = b.name("nowhere");
    let stmt = b.expr_stmt(missing);
    let call = b.call("frobnicate", vec![]);
    let call_stmt = b.expr_stmt(call);
    let body = b.finish(vec![stmt, call_stmt]);

    let result = fx.check(&body, util_ctx(&fx));
    assert_eq!(codes(&result), vec!["unresolved-name", "unresolved-method"]);
    assert_eq!(result.type_of_expr(missing), Some(&Type::Unknown));
    assert_eq!(result.type_of_expr(call), Some(&Type::Unknown));
}

#[test]
fn type_variables_only_accept_themselves() {
    let mut fx = Fixture::new();
    let number = fx.declared("java.lang.Number");
    let t = fx.store.add_type_param("T", vec![number]);
    let mut b = BodyBuilder::new();
    let declared = b.ty("T");
    let value = b.string("s");
    let from_string = b.let_stmt("x", Some(declared), Some(value));
    let declared = b.ty("T");
    let i = b.name("i");
    let from_bound = b.let_stmt("y", Some(declared), Some(i));
    let declared = b.ty("T");
    let param = b.name("t");
    let from_itself = b.let_stmt("z", Some(declared), Some(param));
    let declared = b.ty("T");
    let null = b.null();
    let from_null = b.let_stmt("w", Some(declared), Some(null));
    let body = b.finish(vec![from_string, from_bound, from_itself, from_null]);

    let ctx = util_ctx(&fx)
        .with_method_type_params(vec![t])
        .with_param("t", Type::TypeVar(t));
    let result = fx.check(&body, ctx);
    // `Integer` is within the bound of `T` but is still not a `T`.
    assert_eq!(codes(&result), vec!["incompatible-types", "incompatible-types"]);
    assert_eq!(result.local_type(from_itself), Some(&Type::TypeVar(t)));
}
