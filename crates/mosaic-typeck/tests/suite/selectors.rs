use mosaic_hir::{BodyBuilder, TypeArgRef};
use mosaic_typeck::{BodyContext, BoundKind, Session, TypeckConfig, Typeck};
use mosaic_types::{Severity, Type, TypeEnv};

use pretty_assertions::assert_eq;

use crate::suite::support::{codes, Fixture};

#[test]
fn qualified_this_and_super_must_name_enclosing_or_direct_supertypes() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();

    let outer = b.name("Outer");
    let this = b.sel_this();
    let outer_this = b.select(outer, vec![this]);
    let ok_this = b.expr_stmt(outer_this);

    let string = b.name("String");
    let this = b.sel_this();
    let string_this = b.select(string, vec![this]);
    let bad_this = b.expr_stmt(string_this);

    let runnable = b.name("Runnable");
    let sup = b.sel_super();
    let runnable_super = b.select(runnable, vec![sup]);
    let ok_super = b.expr_stmt(runnable_super);

    let iterable = b.name("Iterable");
    let sup = b.sel_super();
    let iterable_super = b.select(iterable, vec![sup]);
    let bad_super = b.expr_stmt(iterable_super);

    let body = b.finish(vec![ok_this, bad_this, ok_super, bad_super]);
    let result = fx.check(&body, BodyContext::new(fx.inner));

    assert_eq!(
        codes(&result),
        vec!["invalid-qualified-this", "invalid-qualified-super"]
    );
    assert_eq!(result.type_of_expr(outer_this), Some(&Type::Declared(fx.outer)));
    assert_eq!(
        result.type_of_expr(runnable_super),
        Some(&fx.declared("java.lang.Runnable"))
    );
    let chain = result.selector_bindings(outer_this).unwrap();
    assert_eq!(chain.base.kind, BoundKind::Type);
    assert_eq!(chain.selectors[0].kind, BoundKind::This);
}

#[test]
fn qualified_this_is_rejected_in_a_static_context() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let outer = b.name("Outer");
    let this = b.sel_this();
    let outer_this = b.select(outer, vec![this]);
    let stmt = b.expr_stmt(outer_this);
    let plain = b.this();
    let plain_stmt = b.expr_stmt(plain);
    let body = b.finish(vec![stmt, plain_stmt]);

    let result = fx.check(&body, BodyContext::new(fx.inner).with_static(true));
    assert_eq!(codes(&result), vec!["static-context", "static-context"]);
}

fn person_body(b: &mut BodyBuilder, member: &str) -> mosaic_hir::ExprId {
    let p = b.name("p");
    let field = b.sel_field(member);
    b.select(p, vec![field])
}

#[test]
fn properties_read_through_getters() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let name = person_body(&mut b, "name");
    let name_stmt = b.expr_stmt(name);
    let active = person_body(&mut b, "active");
    let active_stmt = b.expr_stmt(active);
    let age = person_body(&mut b, "age");
    let age_stmt = b.expr_stmt(age);
    let body = b.finish(vec![name_stmt, active_stmt, age_stmt]);

    let ctx = BodyContext::new(fx.util).with_param("p", Type::Declared(fx.person));
    let result = fx.check(&body, ctx);
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(result.type_of_expr(name), Some(&fx.string()));
    assert_eq!(result.type_of_expr(active), Some(&Type::boolean()));
    assert_eq!(result.type_of_expr(age), Some(&Type::int()));

    let getter = &result.selector_bindings(name).unwrap().selectors[0];
    assert_eq!(getter.kind, BoundKind::Getter);
    assert_eq!(getter.method, Some(fx.method("com.example.Person", "getName")));
    assert_eq!(result.bound_method(name), Some(fx.method("com.example.Person", "getName")));
    assert!(result.bound_field(age).is_some());
}

#[test]
fn getters_can_be_disabled_from_toml() {
    let fx = Fixture::new();
    let config = TypeckConfig::from_toml_str(
        r#"
            getter_properties = false
            unresolved_severity = "warning"
        "#,
    )
    .unwrap();
    let mut b = BodyBuilder::new();
    let name = person_body(&mut b, "name");
    let stmt = b.expr_stmt(name);
    let body = b.finish(vec![stmt]);

    let ctx = BodyContext::new(fx.util).with_param("p", Type::Declared(fx.person));
    let result = fx.check_with(config, &body, ctx);
    assert_eq!(codes(&result), vec!["unresolved-field"]);
    assert_eq!(result.diagnostics()[0].severity, Severity::Warning);
    assert!(!result.has_errors());
    assert_eq!(result.type_of_expr(name), Some(&Type::Unknown));
}

#[test]
fn package_qualified_static_call() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let string = b.ty("String");
    let declared = b.generic_ty("List", vec![TypeArgRef::Type(string)]);
    let java = b.name("java");
    let util = b.sel_field("util");
    let collections = b.sel_field("Collections");
    let empty = b.sel_call("emptyList", vec![]);
    let chain = b.select(java, vec![util, collections, empty]);
    let local = b.let_stmt("names", Some(declared), Some(chain));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, BodyContext::new(fx.util));
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(
        result.type_of_expr(chain),
        Some(&fx.generic("java.util.List", vec![fx.string()]))
    );
    let kinds: Vec<BoundKind> = {
        let chain = result.selector_bindings(chain).unwrap();
        std::iter::once(chain.base.kind)
            .chain(chain.selectors.iter().map(|s| s.kind))
            .collect()
    };
    assert_eq!(
        kinds,
        vec![BoundKind::Package, BoundKind::Package, BoundKind::Type, BoundKind::Method]
    );
}

#[test]
fn static_fields_and_instance_fields_through_a_type_name() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let integer = b.name("Integer");
    let max = b.sel_field("MAX_VALUE");
    let max_value = b.select(integer, vec![max]);
    let ok = b.expr_stmt(max_value);
    let person = b.name("Person");
    let age = b.sel_field("age");
    let person_age = b.select(person, vec![age]);
    let bad = b.expr_stmt(person_age);
    let body = b.finish(vec![ok, bad]);

    let result = fx.check(&body, BodyContext::new(fx.util));
    assert_eq!(codes(&result), vec!["static-context"]);
    assert_eq!(result.type_of_expr(max_value), Some(&Type::int()));
}

#[test]
fn arrays_support_index_and_length_only() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let xs = b.name("xs");
    let zero = b.int(0);
    let index = b.sel_index(zero);
    let element = b.select(xs, vec![index]);
    let element_stmt = b.expr_stmt(element);

    let xs = b.name("xs");
    let length = b.sel_field("length");
    let len = b.select(xs, vec![length]);
    let len_stmt = b.expr_stmt(len);

    let s = b.name("s");
    let zero = b.int(0);
    let index = b.sel_index(zero);
    let not_array = b.select(s, vec![index]);
    let bad_stmt = b.expr_stmt(not_array);

    let body = b.finish(vec![element_stmt, len_stmt, bad_stmt]);
    let ctx = BodyContext::new(fx.util)
        .with_param("xs", Type::array(fx.string()))
        .with_param("s", fx.string());
    let result = fx.check(&body, ctx);

    assert_eq!(codes(&result), vec!["not-an-array"]);
    assert_eq!(result.type_of_expr(element), Some(&fx.string()));
    assert_eq!(result.type_of_expr(len), Some(&Type::int()));
}

#[test]
fn chains_converge_after_an_external_target_change() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let names = b.name("names");
    let zero = b.int(0);
    let get = b.sel_call("get", vec![zero]);
    let length = b.sel_call("length", vec![]);
    let chain = b.select(names, vec![get, length]);
    let stmt = b.expr_stmt(chain);
    let body = b.finish(vec![stmt]);

    let ctx = BodyContext::new(fx.util)
        .with_param("names", fx.generic("java.util.List", vec![fx.string()]));
    let mut session = Session::default();
    let mut tc = Typeck::new(&fx.store, &mut session, &body, ctx);
    tc.init().unwrap();
    tc.start().unwrap();
    let before = tc.chain_binding(chain).unwrap().methods();
    assert_eq!(
        before,
        vec![
            fx.method("java.util.List", "get"),
            fx.method("java.lang.String", "length"),
        ]
    );

    let object = Type::Declared(fx.store.well_known().object);
    assert!(tc.set_inferred_type(chain, object, false).unwrap());
    assert!(tc.chain_binding(chain).is_none());
    assert_eq!(tc.start_expr(chain).unwrap(), Type::int());
    assert_eq!(tc.chain_binding(chain).unwrap().methods(), before);

    tc.start_expr(chain).unwrap();
    assert_eq!(tc.chain_binding(chain).unwrap().methods(), before);
    let result = tc.process().unwrap();
    assert_eq!(codes(&result), Vec::<&str>::new());
}

#[test]
fn implementing_a_generic_interface_method_is_not_an_overload() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let a = b.string("a");
    let other = b.string("b");
    let compare = b.sel_call("compareTo", vec![other]);
    let compared = b.select(a, vec![compare]);
    let first = b.expr_stmt(compared);
    let d = b.name("d");
    let one = b.int(1);
    let apply = b.sel_call("apply", vec![one]);
    let applied = b.select(d, vec![apply]);
    let second = b.expr_stmt(applied);
    let body = b.finish(vec![first, second]);

    let ctx = BodyContext::new(fx.util).with_param("d", fx.declared("com.example.Doubler"));
    let result = fx.check(&body, ctx);
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(result.type_of_expr(compared), Some(&Type::int()));
    assert_eq!(
        result.bound_method(compared),
        Some(fx.method("java.lang.String", "compareTo"))
    );
    assert_eq!(result.type_of_expr(applied), Some(&fx.integer()));
    assert_eq!(
        result.bound_method(applied),
        Some(fx.method("com.example.Doubler", "apply"))
    );
}
