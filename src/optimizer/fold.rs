// In src/optimizer/fold.rs

use super::{int_literal, number_value, rewrite_tree, Pass, PassContext, Rewrite, RewriteError};
use crate::parser::ast::{Ast, Node, NodeId, NodeKind};

/// 常量折叠：两个操作数都是数字字面量的算术运算替换为结果字面量。
///
/// 两个操作数都是整数时用精确的整数运算；除以零与整数溢出不折叠。
pub struct ConstantFolding;

impl Pass for ConstantFolding {
    fn name(&self) -> &'static str {
        "constant folding"
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
            let Some(result) = evaluate(&cx.ast, &op, left, right)? else {
                return Ok(Rewrite::Keep);
            };

            let message = format!(
                "Constant folding: {} {} {} = {}",
                cx.ast.value(left).unwrap_or_default(),
                op,
                cx.ast.value(right).unwrap_or_default(),
                result
            );
            let line = cx.ast.line(id);
            let folded = cx
                .ast
                .push(Node::new(NodeKind::Number, Some(result), Vec::new()).with_line(line));
            cx.record(message);
            Ok(Rewrite::Replace(folded))
        });
    }
}

/// 计算 `left op right`。任一边不是数字字面量时返回 `Ok(None)`。
fn evaluate(ast: &Ast, op: &str, left: NodeId, right: NodeId) -> Result<Option<String>, RewriteError> {
    if let (Some(a), Some(b)) = (int_literal(ast, left)?, int_literal(ast, right)?) {
        let overflow = || RewriteError::Overflow {
            left: a.to_string(),
            op: op.to_string(),
            right: b.to_string(),
        };
        let result = match op {
            "+" => a.checked_add(b).ok_or_else(overflow)?,
            "-" => a.checked_sub(b).ok_or_else(overflow)?,
            "*" => a.checked_mul(b).ok_or_else(overflow)?,
            "/" | "%" if b == 0 => return Err(RewriteError::DivisionByZero),
            "/" => a.checked_div(b).ok_or_else(overflow)?,
            "%" => a.checked_rem(b).ok_or_else(overflow)?,
            _ => return Ok(None),
        };
        return Ok(Some(result.to_string()));
    }

    let (Some(a), Some(b)) = (number_value(ast, left), number_value(ast, right)) else {
        return Ok(None);
    };
    let result = match op {
        "+" => a + b,
        "-" => a - b,
        "*" => a * b,
        "/" if b == 0.0 => return Err(RewriteError::DivisionByZero),
        "/" => a / b,
        // 浮点取模的结果类型是 int，留给运行时
        _ => return Ok(None),
    };
    if !result.is_finite() {
        return Err(RewriteError::Overflow {
            left: a.to_string(),
            op: op.to_string(),
            right: b.to_string(),
        });
    }
    Ok(Some(format_float(result)))
}

/// 浮点结果总是带小数点，例如 `3.0`。
pub(crate) fn format_float(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{:.1}", value)
    } else {
        value.to_string()
    }
}
