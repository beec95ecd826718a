use mosaic_hir::{BinaryOp, BodyBuilder, Expr, LambdaBody, NodeId};

use pretty_assertions::assert_eq;

#[test]
fn parent_links_cover_selectors_lambdas_and_statements() {
    let mut b = BodyBuilder::new();
    let list = b.name("list");
    let x = b.name("x");
    let one = b.int(1);
    let sum = b.binary(x, vec![(BinaryOp::Add, one)]);
    let ret = b.ret(Some(sum));
    let block = b.block(vec![ret]);
    let param = b.param("x");
    let lambda = b.lambda(vec![param], LambdaBody::Block(block));
    let map = b.sel_call("map", vec![lambda]);
    let chain = b.select(list, vec![map]);
    let stmt = b.expr_stmt(chain);
    let body = b.finish(vec![stmt]);

    assert_eq!(body.expr_parent(list), Some(NodeId::Expr(chain)));
    assert_eq!(body.expr_parent(lambda), Some(NodeId::Expr(chain)));
    assert_eq!(body.stmt_parent(block), Some(NodeId::Expr(lambda)));
    assert_eq!(body.expr_parent(sum), Some(NodeId::Stmt(ret)));
    assert_eq!(body.expr_parent(one), Some(NodeId::Expr(sum)));
    assert_eq!(body.stmt_parent(stmt), Some(NodeId::Stmt(body.root)));
    assert_eq!(body.enclosing_lambda(NodeId::Expr(x)), Some(lambda));
    assert!(body.is_within(NodeId::Expr(one), NodeId::Expr(chain)));
    assert!(!body.is_within(NodeId::Expr(chain), NodeId::Expr(lambda)));
}

#[test]
fn descendants_are_pre_order() {
    let mut b = BodyBuilder::new();
    let a = b.name("a");
    let c = b.name("c");
    let d = b.name("d");
    let inner = b.call("f", vec![c, d]);
    let outer = b.call("g", vec![a, inner]);
    let body = b.finish(vec![]);

    assert_eq!(
        body.descendants(NodeId::Expr(outer)),
        vec![
            NodeId::Expr(a),
            NodeId::Expr(inner),
            NodeId::Expr(c),
            NodeId::Expr(d)
        ]
    );
    // Unreachable from the root: no parent recorded.
    assert_eq!(body.expr_parent(outer), None);
    assert!(matches!(body.expr(outer), Expr::Call { name, .. } if name == "g"));
}

#[test]
fn instanceof_operand_is_not_an_expression_child() {
    let mut b = BodyBuilder::new();
    let x = b.name("x");
    let ty = b.ty("String");
    let operand = b.instanceof_operand(ty);
    let check = b.binary_operands(x, vec![operand]);
    let stmt = b.expr_stmt(check);
    let body = b.finish(vec![stmt]);

    assert_eq!(body.children(NodeId::Expr(check)), vec![NodeId::Expr(x)]);
}
