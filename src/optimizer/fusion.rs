// In src/optimizer/fusion.rs

use super::{rewrite_tree, Pass, PassContext, Rewrite};
use crate::parser::ast::{Ast, NodeId, NodeKind};

/// 相邻循环合并：两个相邻的范围 for 循环，循环变量、条件与步进都相同时合并为一个，
/// 循环体按原顺序拼接。
pub struct LoopFusion;

impl Pass for LoopFusion {
    fn name(&self) -> &'static str {
        "loop fusion"
    }

    fn run(&self, cx: &mut PassContext<'_>) {
        rewrite_tree(cx, self.name(), |cx, id| {
            if cx.ast.sequence_start(id).is_none() {
                return Ok(Rewrite::Keep);
            }
            let statements = cx.ast.statements(id).to_vec();
            let mut out: Vec<NodeId> = Vec::with_capacity(statements.len());
            let mut changed = false;

            for statement in statements {
                match out.last() {
                    Some(&previous) if same_range(&cx.ast, previous, statement) => {
                        let fused = fuse(cx, previous, statement);
                        if let Some(last) = out.last_mut() {
                            *last = fused;
                        }
                        changed = true;
                    }
                    _ => out.push(statement),
                }
            }

            if !changed {
                return Ok(Rewrite::Keep);
            }
            Ok(Rewrite::Replace(cx.ast.with_statements(id, out)))
        });
    }
}

/// 两个范围 for 循环的变量、条件（以字面量为界）与步进运算符相同。
fn same_range(ast: &Ast, a: NodeId, b: NodeId) -> bool {
    if ast.kind(a) != NodeKind::ForRange || ast.kind(b) != NodeKind::ForRange {
        return false;
    }
    let (Some(cond_a), Some(cond_b)) = (ast.child(a, 1), ast.child(b, 1)) else {
        return false;
    };
    let bounded = ast
        .child(cond_a, 1)
        .is_some_and(|bound| ast.kind(bound).is_literal());
    ast.value(a) == ast.value(b)
        && bounded
        && ast.structurally_equal(cond_a, cond_b)
        && ast.increment_op(a) == ast.increment_op(b)
}

fn fuse(cx: &mut PassContext<'_>, first: NodeId, second: NodeId) -> NodeId {
    let (Some(block_a), Some(block_b)) = (
        cx.ast.child_of_kind(first, NodeKind::Block),
        cx.ast.child_of_kind(second, NodeKind::Block),
    ) else {
        return first;
    };
    let mut body = cx.ast.statements(block_a).to_vec();
    body.extend_from_slice(cx.ast.statements(block_b));
    let block = cx.ast.with_statements(block_a, body);

    let children: Vec<NodeId> = cx
        .ast
        .children(first)
        .iter()
        .map(|&c| if c == block_a { block } else { c })
        .collect();
    let message = format!(
        "Loop fusion: {} at lines {} and {}",
        cx.ast.value(first).unwrap_or_default(),
        cx.ast.line(first),
        cx.ast.line(second)
    );
    cx.record(message);
    cx.ast.with_children(first, children)
}
