// In src/optimizer/algebra.rs

use super::{number_value, rewrite_tree, Pass, PassContext, Rewrite};
use crate::parser::ast::{Node, NodeKind};
use crate::regen;

/// 代数化简：`x+0`、`0+x`、`x*1`、`1*x` 化为 `x`；`x*0`、`0*x` 化为 `0`。
pub struct AlgebraicSimplification;

impl Pass for AlgebraicSimplification {
    fn name(&self) -> &'static str {
        "algebraic simplification"
    }

    fn run(&self, cx: &mut PassContext<'_>) {
        rewrite_tree(cx, self.name(), |cx, id| {
            if cx.ast.kind(id) != NodeKind::Operation {
                return Ok(Rewrite::Keep);
            }
            let (Some(left), Some(right)) = (cx.ast.child(id, 0), cx.ast.child(id, 1)) else {
                return Ok(Rewrite::Keep);
            };
            let op = cx.ast.value(id).unwrap_or_default().to_string();
            let l = number_value(&cx.ast, left);
            let r = number_value(&cx.ast, right);

            let replacement = match (op.as_str(), l, r) {
                ("+", _, Some(n)) if n == 0.0 => left,
                ("+", Some(n), _) if n == 0.0 => right,
                ("*", _, Some(n)) if n == 1.0 => left,
                ("*", Some(n), _) if n == 1.0 => right,
                ("*", Some(n), _) | ("*", _, Some(n)) if n == 0.0 => {
                    let line = cx.ast.line(id);
                    let zero = Node::new(NodeKind::Number, Some("0".to_string()), Vec::new());
                    cx.ast.push(zero.with_line(line))
                }
                _ => return Ok(Rewrite::Keep),
            };
            let message = format!(
                "Algebraic simplification: {} => {}",
                regen::expression(&cx.ast, id),
                regen::expression(&cx.ast, replacement)
            );
            cx.record(message);
            Ok(Rewrite::Replace(replacement))
        });
    }
}
