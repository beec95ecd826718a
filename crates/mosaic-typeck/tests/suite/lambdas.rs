use mosaic_hir::{BinaryOp, BodyBuilder, LambdaBody, TypeArgRef, TypeRef};
use mosaic_typeck::{BodyContext, LambdaState, Session, SynthBody, Typeck};
use mosaic_types::Type;

use pretty_assertions::assert_eq;

use crate::suite::support::{codes, Fixture};

fn function_of(b: &mut BodyBuilder, arg: &str, ret: &str) -> TypeRef {
    let arg = b.ty(arg);
    let ret = b.ty(ret);
    b.generic_ty("Function", vec![TypeArgRef::Type(arg), TypeArgRef::Type(ret)])
}

#[test]
fn expression_lambda_synthesizes_a_returning_method() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let declared = function_of(&mut b, "Integer", "Integer");
    let mut sum = None;
    let lambda = b.lambda_expr(&["x"], |b| {
        let x = b.name("x");
        let one = b.int(1);
        let e = b.binary(x, vec![(BinaryOp::Add, one)]);
        sum = Some(e);
        e
    });
    let sum = sum.unwrap();
    let local = b.let_stmt("f", Some(declared), Some(lambda));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, BodyContext::new(fx.util));
    assert_eq!(codes(&result), Vec::<&str>::new());

    let function = fx.generic("java.util.function.Function", vec![fx.integer(), fx.integer()]);
    let synth = result.synthesized_class(lambda).unwrap();
    assert_eq!(synth.interface, function);
    assert_eq!(synth.method, "apply");
    assert_eq!(synth.params, vec![("x".to_string(), fx.integer())]);
    assert_eq!(synth.return_type, fx.integer());
    assert_eq!(synth.body, SynthBody::Return(sum));
    assert_eq!(result.type_of_expr(sum), Some(&Type::int()));
    assert_eq!(result.type_of_expr(lambda), Some(&function));
}

#[test]
fn arity_mismatch_is_silent_among_several_candidates() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let lambda = b.lambda_expr(&["s"], |b| b.name("s"));
    let call = b.call("submit", vec![lambda]);
    let stmt = b.expr_stmt(call);
    let body = b.finish(vec![stmt]);

    let result = fx.check(&body, BodyContext::new(fx.util).with_static(true));
    assert_eq!(codes(&result), Vec::<&str>::new());

    let util = fx.class("com.example.Util");
    let chosen = result.bound_method(call).unwrap();
    assert_eq!(chosen.owner, util);
    assert_eq!(chosen.index, 2);
    assert_eq!(result.synthesized_class(lambda).unwrap().method, "apply");
}

#[test]
fn arity_mismatch_is_an_error_for_a_sole_final_target() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let declared = function_of(&mut b, "Integer", "Integer");
    let lambda = b.lambda_expr(&["a", "b"], |b| b.name("a"));
    let local = b.let_stmt("f", Some(declared), Some(lambda));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, BodyContext::new(fx.util));
    assert_eq!(codes(&result), vec!["lambda-arity-mismatch"]);
    assert_eq!(result.synthesized_class(lambda), None);
    assert_eq!(result.type_of_expr(lambda), Some(&Type::Error));
}

#[test]
fn lambdas_need_a_functional_target() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let untargeted = b.lambda_expr(&["x"], |b| b.name("x"));
    let first = b.let_stmt("f", None, Some(untargeted));
    let string = b.ty("String");
    let misplaced = b.lambda_expr(&["y"], |b| b.name("y"));
    let second = b.let_stmt("s", Some(string), Some(misplaced));
    let body = b.finish(vec![first, second]);

    let result = fx.check(&body, BodyContext::new(fx.util));
    assert_eq!(
        codes(&result),
        vec!["lambda-without-target", "not-a-functional-interface"]
    );
}

#[test]
fn block_lambda_return_is_checked_against_the_functional_method() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let string = b.ty("String");
    let declared = b.generic_ty("Supplier", vec![TypeArgRef::Type(string)]);
    let one = b.int(1);
    let ret = b.ret(Some(one));
    let block = b.block(vec![ret]);
    let lambda = b.lambda(vec![], LambdaBody::Block(block));
    let local = b.let_stmt("s", Some(declared), Some(lambda));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, BodyContext::new(fx.util));
    assert_eq!(codes(&result), vec!["return-mismatch"]);
    assert_eq!(
        result.synthesized_class(lambda).unwrap().body,
        SynthBody::Block(block)
    );
}

#[test]
fn rebinding_rebuilds_only_when_the_final_target_changes() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let declared = function_of(&mut b, "Integer", "Integer");
    let lambda = b.lambda_expr(&["x"], |b| {
        let x = b.name("x");
        let one = b.int(1);
        b.binary(x, vec![(BinaryOp::Add, one)])
    });
    let local = b.let_stmt("f", Some(declared), Some(lambda));
    let body = b.finish(vec![local]);

    let mut session = Session::default();
    let mut tc = Typeck::new(&fx.store, &mut session, &body, BodyContext::new(fx.util));
    tc.init().unwrap();
    tc.start().unwrap();

    let first = tc.lambda_binding(lambda).unwrap().clone();
    assert_eq!(first.state, LambdaState::Final);

    // Same final target: nothing is rebuilt.
    let function = first.candidate.clone().unwrap();
    tc.set_inferred_type(lambda, function, true).unwrap();
    tc.start_expr(lambda).unwrap();
    let same = tc.lambda_binding(lambda).unwrap();
    assert_eq!(same.generation, first.generation);
    assert_eq!(same.synthesized, first.synthesized);

    // A different final target rebuilds once.
    let unary = fx.generic("java.util.function.UnaryOperator", vec![fx.integer()]);
    assert!(tc.set_inferred_type(lambda, unary.clone(), true).unwrap());
    assert_eq!(tc.start_expr(lambda).unwrap(), unary);
    let rebuilt = tc.lambda_binding(lambda).unwrap().clone();
    assert_eq!(rebuilt.generation, first.generation + 1);
    assert_eq!(rebuilt.synthesized.as_ref().unwrap().interface, unary);

    tc.start_expr(lambda).unwrap();
    assert_eq!(tc.lambda_binding(lambda).unwrap().generation, rebuilt.generation);

    let result = tc.process().unwrap();
    assert_eq!(codes(&result), Vec::<&str>::new());
}

#[test]
fn lambda_return_type_solves_the_call_result() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let optional = b.name("Optional");
    let one = b.int(1);
    let of = b.sel_call("of", vec![one]);
    let lambda = b.lambda_expr(&["x"], |b| {
        let x = b.name("x");
        let one = b.int(1);
        b.binary(x, vec![(BinaryOp::Add, one)])
    });
    let map = b.sel_call("map", vec![lambda]);
    let chain = b.select(optional, vec![of, map]);
    let local = b.let_stmt("r", None, Some(chain));
    let body = b.finish(vec![local]);

    let result = fx.check(&body, BodyContext::new(fx.util));
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(
        result.local_type(local),
        Some(&fx.generic("java.util.Optional", vec![fx.integer()]))
    );
    let synth = result.synthesized_class(lambda).unwrap();
    assert_eq!(synth.method, "apply");
    assert_eq!(synth.params, vec![("x".to_string(), fx.integer())]);
    assert_eq!(synth.return_type, fx.integer());
    assert_eq!(
        result.selector_bindings(chain).unwrap().methods(),
        vec![
            fx.method("java.util.Optional", "of"),
            fx.method("java.util.Optional", "map"),
        ]
    );
}

#[test]
fn value_body_prefers_the_returning_functional_interface() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let lambda = b.lambda_expr(&[], |b| b.call("name", vec![]));
    let call = b.call("exec", vec![lambda]);
    let stmt = b.expr_stmt(call);
    let body = b.finish(vec![stmt]);

    let result = fx.check(&body, BodyContext::new(fx.util).with_static(true));
    assert_eq!(codes(&result), Vec::<&str>::new());
    // Both overloads accept `() -> name()`; only `Supplier` uses the value.
    let exec = fx.overloads("com.example.Util", "exec");
    assert_eq!(result.bound_method(call), Some(exec[1]));
    assert_eq!(result.type_of_expr(call), Some(&fx.string()));
    assert_eq!(result.synthesized_class(lambda).unwrap().method, "get");
}

#[test]
fn void_body_picks_the_void_functional_interface() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let expr_lambda = b.lambda_expr(&[], |b| b.call("log", vec![]));
    let first = b.call("exec", vec![expr_lambda]);
    let first_stmt = b.expr_stmt(first);
    let log = b.call("log", vec![]);
    let log_stmt = b.expr_stmt(log);
    let block = b.block(vec![log_stmt]);
    let block_lambda = b.lambda(vec![], LambdaBody::Block(block));
    let second = b.call("exec", vec![block_lambda]);
    let second_stmt = b.expr_stmt(second);
    let body = b.finish(vec![first_stmt, second_stmt]);

    let result = fx.check(&body, BodyContext::new(fx.util).with_static(true));
    assert_eq!(codes(&result), Vec::<&str>::new());
    let exec = fx.overloads("com.example.Util", "exec");
    assert_eq!(result.bound_method(first), Some(exec[0]));
    assert_eq!(result.bound_method(second), Some(exec[0]));
    assert_eq!(result.synthesized_class(expr_lambda).unwrap().method, "run");
    assert_eq!(result.synthesized_class(block_lambda).unwrap().method, "run");
}

fn int_value_lambda(b: &mut BodyBuilder) -> (mosaic_hir::ExprId, mosaic_hir::ExprId) {
    let mut chain = None;
    let lambda = b.lambda_expr(&["x"], |b| {
        let x = b.name("x");
        let int_value = b.sel_call("intValue", vec![]);
        let e = b.select(x, vec![int_value]);
        chain = Some(e);
        e
    });
    (lambda, chain.unwrap())
}

#[test]
fn rejected_candidate_leaves_no_binding_in_the_lambda_body() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let (lambda, chain) = int_value_lambda(&mut b);
    let s = b.string("s");
    let call = b.call("convert", vec![lambda, s]);
    let stmt = b.expr_stmt(call);
    let body = b.finish(vec![stmt]);

    let result = fx.check(&body, BodyContext::new(fx.util).with_static(true));
    // `x` is a `String` in the chosen overload, so `intValue` does not resolve.
    assert_eq!(codes(&result), vec!["unresolved-method"]);
    let convert = fx.overloads("com.example.Util", "convert");
    assert_eq!(result.bound_method(call), Some(convert[1]));
    assert_eq!(result.bound_method(chain), None);
    assert_eq!(
        result.synthesized_class(lambda).unwrap().params,
        vec![("x".to_string(), fx.string())]
    );
}

#[test]
fn chosen_candidate_binds_the_lambda_body() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let (lambda, chain) = int_value_lambda(&mut b);
    let one = b.int(1);
    let call = b.call("convert", vec![lambda, one]);
    let stmt = b.expr_stmt(call);
    let body = b.finish(vec![stmt]);

    let result = fx.check(&body, BodyContext::new(fx.util).with_static(true));
    assert_eq!(codes(&result), Vec::<&str>::new());
    let convert = fx.overloads("com.example.Util", "convert");
    assert_eq!(result.bound_method(call), Some(convert[0]));
    assert_eq!(
        result.bound_method(chain),
        Some(fx.method("java.lang.Integer", "intValue"))
    );
}
