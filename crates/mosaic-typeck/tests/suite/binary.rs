use mosaic_hir::{BinaryOp, BodyBuilder, LiteralKind};
use mosaic_typeck::{BodyContext, Session, TreeChild, Typeck};
use mosaic_types::{PrimitiveType, Type};

use pretty_assertions::assert_eq;

use crate::suite::support::{codes, Fixture};

#[test]
fn precedence_tree_follows_operator_binding() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let a = b.name("a");
    let bb = b.name("b");
    let c = b.name("c");
    let d = b.name("d");
    let expr = b.binary(
        a,
        vec![(BinaryOp::Add, bb), (BinaryOp::Mul, c), (BinaryOp::Sub, d)],
    );
    let stmt = b.expr_stmt(expr);
    let body = b.finish(vec![stmt]);

    let ctx = ["a", "b", "c", "d"]
        .iter()
        .fold(BodyContext::new(fx.util), |ctx, name| ctx.with_param(*name, Type::int()));
    let result = fx.check(&body, ctx);
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(result.type_of_expr(expr), Some(&Type::int()));

    let names = ["a", "b", "c", "d"];
    let tree = result.precedence_tree(expr).unwrap();
    assert_eq!(tree.render(&|i| names[i].to_string()), "((a + (b * c)) - d)");
    assert_eq!(tree.root, TreeChild::Node(2));
}

#[test]
fn instanceof_binds_tighter_than_conditional_and() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let x = b.name("x");
    let string = b.ty("String");
    let instanceof = b.instanceof_operand(string);
    let y = b.name("y");
    let and = b.operand(BinaryOp::And, y);
    let expr = b.binary_operands(x, vec![instanceof, and]);
    let stmt = b.expr_stmt(expr);
    let body = b.finish(vec![stmt]);

    let ctx = BodyContext::new(fx.util)
        .with_param("x", fx.declared("java.lang.Object"))
        .with_param("y", Type::boolean());
    let result = fx.check(&body, ctx);
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(result.type_of_expr(expr), Some(&Type::boolean()));

    let tree = result.precedence_tree(expr).unwrap();
    assert_eq!(tree.root, TreeChild::Node(1));
    assert_eq!(tree.nodes[1].lhs, TreeChild::Node(0));
    assert_eq!(tree.nodes[0].op, BinaryOp::InstanceOf);
}

#[test]
fn string_concatenation_and_numeric_promotion() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let s = b.name("s");
    let one = b.int(1);
    let concat = b.binary(s, vec![(BinaryOp::Add, one)]);
    let concat_stmt = b.expr_stmt(concat);
    let i = b.name("i");
    let half = b.lit(LiteralKind::Double, "0.5");
    let scaled = b.binary(i, vec![(BinaryOp::Mul, half)]);
    let scaled_stmt = b.expr_stmt(scaled);
    let body = b.finish(vec![concat_stmt, scaled_stmt]);

    let ctx = BodyContext::new(fx.util)
        .with_param("s", fx.string())
        .with_param("i", fx.integer());
    let result = fx.check(&body, ctx);
    assert_eq!(codes(&result), Vec::<&str>::new());
    assert_eq!(result.type_of_expr(concat), Some(&fx.string()));
    assert_eq!(
        result.type_of_expr(scaled),
        Some(&Type::Primitive(PrimitiveType::Double))
    );
}

#[test]
fn operator_errors_are_reported_once_per_node() {
    let fx = Fixture::new();
    let mut b = BodyBuilder::new();
    let s = b.name("s");
    let one = b.int(1);
    let t = b.name("t");
    let expr = b.binary(s, vec![(BinaryOp::Sub, one), (BinaryOp::And, t)]);
    let stmt = b.expr_stmt(expr);
    let body = b.finish(vec![stmt]);

    let ctx = BodyContext::new(fx.util)
        .with_param("s", fx.string())
        .with_param("t", Type::boolean());
    let mut session = Session::default();
    let mut tc = Typeck::new(&fx.store, &mut session, &body, ctx);
    tc.init().unwrap();
    tc.start().unwrap();

    // Recomputing the chain replaces the pending error of node 0.
    tc.clear_inferred_type(expr).unwrap();
    assert_eq!(tc.start_expr(expr).unwrap(), Type::boolean());

    let result = tc.process().unwrap();
    assert_eq!(codes(&result), vec!["type-mismatch"]);
    assert_eq!(result.diagnostics()[0].span, Some(body.expr(one).range()));
    assert_eq!(result.type_of_expr(expr), Some(&Type::boolean()));
}
