use mosaic_hir::{BinaryOp, BodyBuilder};
use mosaic_typeck::{check_body, BodyContext, ConfigError, InternalError, Session, Typeck, TypeckConfig};
use mosaic_types::Type;

use pretty_assertions::assert_eq;

use crate::suite::support::{codes, Fixture};

fn lifecycle_phase(err: InternalError) -> (&'static str, &'static str) {
    match err {
        InternalError::Lifecycle { operation, phase } => (operation, phase),
        other => panic!("expected a lifecycle error, got {other}"),
    }
}

#[test]
fn lifecycle_runs_in_order_and_rejects_misuse() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let one = b.int(1);
    let stmt = b.expr_stmt(one);
    let body = b.finish(vec![stmt]);

    let mut session = Session::default();
    let mut tc = Typeck::new(&fx.store, &mut session, &body, BodyContext::new(fx.util));
    assert_eq!(lifecycle_phase(tc.start().unwrap_err()), ("start", "created"));
    assert_eq!(
        lifecycle_phase(tc.start_expr(one).unwrap_err()),
        ("start_expr", "created")
    );

    tc.init().unwrap();
    assert_eq!(lifecycle_phase(tc.init().unwrap_err()), ("init", "initialized"));
    assert_eq!(lifecycle_phase(tc.validate().unwrap_err()), ("validate", "initialized"));

    tc.start().unwrap();
    tc.start().unwrap();
    tc.validate().unwrap();
    assert_eq!(lifecycle_phase(tc.start().unwrap_err()), ("start", "validated"));
    assert_eq!(
        lifecycle_phase(tc.set_inferred_type(one, Type::int(), true).unwrap_err()),
        ("set_inferred_type", "validated")
    );

    let result = tc.process().unwrap();
    assert_eq!(result.type_of_expr(one), Some(&Type::int()));
    assert!(!result.has_errors());
}

#[test]
fn repeated_starts_do_not_duplicate_diagnostics() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let s = b.name("s");
    let one = b.int(1);
    let expr = b.binary(s, vec![(BinaryOp::Sub, one)]);
    let stmt = b.expr_stmt(expr);
    let missing = b.name("missing");
    let missing_stmt = b.expr_stmt(missing);
    let body = b.finish(vec![stmt, missing_stmt]);

    let ctx = BodyContext::new(fx.util).with_param("s", fx.string());
    let mut session = Session::default();
    let mut tc = Typeck::new(&fx.store, &mut session, &body, ctx);
    tc.init().unwrap();
    tc.start().unwrap();
    tc.start().unwrap();
    let result = tc.process().unwrap();

    assert_eq!(codes(&result), vec!["type-mismatch", "unresolved-name"]);
    assert!(result.has_errors());
}

#[test]
fn unqualified_this_in_a_static_body() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let this = b.this();
    let stmt = b.expr_stmt(this);
    let body = b.finish(vec![stmt]);

    let instance = fx.check(&body, BodyContext::new(fx.person));
    assert_eq!(codes(&instance), Vec::<&str>::new());
    assert_eq!(instance.type_of_expr(this), Some(&Type::Declared(fx.person)));

    let fixed = fx.check(&body, BodyContext::new(fx.person).with_static(true));
    assert_eq!(codes(&fixed), vec!["static-context"]);
}

#[test]
fn session_caches_are_shared_until_cleared() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let string = b.ty("String");
    let s = b.string("x");
    let local = b.let_stmt("s", Some(string), Some(s));
    let body = b.finish(vec![local]);

    let mut session = Session::default();
    assert_eq!(session.cached_entries(), 0);
    let first = check_body(&fx.store, &mut session, &body, BodyContext::new(fx.util)).unwrap();
    let cached = session.cached_entries();
    assert!(cached > 0);

    let second = check_body(&fx.store, &mut session, &body, BodyContext::new(fx.util)).unwrap();
    assert_eq!(session.cached_entries(), cached);
    assert_eq!(first.local_type(local), second.local_type(local));

    session.clear();
    assert_eq!(session.cached_entries(), 0);
}

#[test]
fn config_file_drives_unresolved_severity() {
    let fx = Fixture::new();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("typeck.toml");
    std::fs::write(&path, "unresolved_severity = \"warning\"\n").unwrap();
    let config = TypeckConfig::load(&path).unwrap();

    let mut b = BodyBuilder::new();
    let missing = b.name("missing");
    let stmt = b.expr_stmt(missing);
    let body = b.finish(vec![stmt]);

    let result = fx.check_with(config, &body, BodyContext::new(fx.util));
    assert_eq!(codes(&result), vec!["unresolved-name"]);
    assert!(!result.has_errors());

    std::fs::write(&path, "shiny = 1\n").unwrap();
    assert!(matches!(TypeckConfig::load(&path), Err(ConfigError::Toml(_))));
}
