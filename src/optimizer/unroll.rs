// In src/optimizer/unroll.rs

use super::{int_literal, rewrite_tree, substitute, Pass, PassContext, Rewrite, RewriteError};
use crate::parser::ast::{Ast, Node, NodeId, NodeKind};

/// 迭代次数不超过这个值的循环才展开。
const MAX_TRIP_COUNT: i64 = 4;

/// 小常量范围循环展开。
///
/// `for i; i < 3; i++ { ... }` 展开为三份循环体的副本，每份中的 `i` 换成这一轮的值。
/// 起始值取自同一序列中最近一条写入 `i` 的前置语句（`int i = 字面量;` 或 `i = 字面量;`），
/// 没有这样的语句时为 0。循环体不能写入循环变量，也不能声明变量。
pub struct LoopUnrolling;

impl Pass for LoopUnrolling {
    fn name(&self) -> &'static str {
        "loop unrolling"
    }

    fn run(&self, cx: &mut PassContext<'_>) {
        rewrite_tree(cx, self.name(), |cx, id| {
            if cx.ast.sequence_start(id).is_none() {
                return Ok(Rewrite::Keep);
            }
            let statements = cx.ast.statements(id).to_vec();
            let mut out = Vec::with_capacity(statements.len());
            let mut changed = false;

            for (index, &statement) in statements.iter().enumerate() {
                if cx.ast.kind(statement) != NodeKind::ForRange {
                    out.push(statement);
                    continue;
                }
                let plan = match plan(&cx.ast, &statements[..index], statement) {
                    Ok(plan) => plan,
                    Err(error) => {
                        log::debug!("loop unrolling: keeping {}: {}", statement, error);
                        None
                    }
                };
                let Some(plan) = plan else {
                    out.push(statement);
                    continue;
                };
                let later = &statements[index + 1..];
                out.extend(unroll(cx, statement, &plan, later));
                changed = true;
            }

            if !changed {
                return Ok(Rewrite::Keep);
            }
            Ok(Rewrite::Replace(cx.ast.with_statements(id, out)))
        });
    }
}

/// 一个可以展开的循环。
struct Plan {
    var: String,
    /// 每一轮循环变量的值
    values: Vec<i64>,
    /// 循环结束后循环变量的值
    last: i64,
    body: Vec<NodeId>,
}

fn plan(ast: &Ast, before: &[NodeId], id: NodeId) -> Result<Option<Plan>, RewriteError> {
    let children = ast.children(id);
    let [first, condition, second, increment, block] = children[..] else {
        return Ok(None);
    };
    let Some(var) = ast.value(first) else {
        return Ok(None);
    };
    if ast.value(second) != Some(var) {
        return Ok(None);
    }

    // 条件必须是 `var 比较 整数字面量`
    if ast.kind(condition) != NodeKind::RelationalOp {
        return Ok(None);
    }
    let (Some(left), Some(right)) = (ast.child(condition, 0), ast.child(condition, 1)) else {
        return Ok(None);
    };
    if ast.kind(left) != NodeKind::Identifier || ast.value(left) != Some(var) {
        return Ok(None);
    }
    let Some(end) = int_literal(ast, right)? else {
        return Ok(None);
    };
    let op = ast.value(condition).unwrap_or_default();
    let step: i64 = match (op, ast.value(increment)) {
        ("<" | "<=", Some("++")) => 1,
        (">" | ">=", Some("--")) => -1,
        _ => return Ok(None),
    };

    let Some(start) = start_value(ast, before, var)? else {
        return Ok(None);
    };
    let overflow = || RewriteError::Overflow {
        left: var.to_string(),
        op: op.to_string(),
        right: end.to_string(),
    };
    let trips = match op {
        "<" => end.checked_sub(start),
        "<=" => end.checked_sub(start).and_then(|n| n.checked_add(1)),
        ">" => start.checked_sub(end),
        _ => start.checked_sub(end).and_then(|n| n.checked_add(1)),
    }
    .ok_or_else(overflow)?;
    if !(1..=MAX_TRIP_COUNT).contains(&trips) {
        return Ok(None);
    }

    let body = ast.statements(block).to_vec();
    if ast.written_names(block).contains(var)
        || body.iter().any(|&s| ast.kind(s) == NodeKind::VarDecl)
    {
        return Ok(None);
    }

    let last = start.checked_add(trips * step).ok_or_else(overflow)?;
    let values: Vec<i64> = (0..trips).map(|k| start + k * step).collect();
    Ok(Some(Plan {
        var: var.to_string(),
        values,
        last,
        body,
    }))
}

/// 从最近的前置语句推断循环变量的起始值。
///
/// 找到的写入不是字面量赋值时返回 `Ok(None)`；没有写入时为 0。
fn start_value(ast: &Ast, before: &[NodeId], var: &str) -> Result<Option<i64>, RewriteError> {
    for &statement in before.iter().rev() {
        if !ast.written_names(statement).contains(var) {
            continue;
        }
        let value = match ast.kind(statement) {
            NodeKind::VarDecl if ast.value(statement) == Some(var) => {
                ast.var_decl_parts(statement).and_then(|(_, _, init)| init)
            }
            NodeKind::Assignment => match ast.assignment_parts(statement) {
                Some((name, "=")) if name == var => ast.child(statement, 0),
                _ => None,
            },
            _ => None,
        };
        return match value {
            Some(value) => int_literal(ast, value),
            None => Ok(None),
        };
    }
    Ok(Some(0))
}

fn unroll(cx: &mut PassContext<'_>, id: NodeId, plan: &Plan, later: &[NodeId]) -> Vec<NodeId> {
    let line = cx.ast.line(id);
    let mut out = Vec::with_capacity(plan.values.len() * plan.body.len() + 1);
    for &value in &plan.values {
        let literal = cx
            .ast
            .push(Node::new(NodeKind::Number, Some(value.to_string()), Vec::new()).with_line(line));
        for &statement in &plan.body {
            out.push(substitute(&mut cx.ast, statement, &plan.var, literal));
        }
    }

    // 后面的语句还会读取循环变量时，补上循环结束后的值
    if later.iter().any(|&s| cx.ast.referenced_names(s).contains(&plan.var)) {
        let last = cx
            .ast
            .push(Node::new(NodeKind::Number, Some(plan.last.to_string()), Vec::new()).with_line(line));
        let assignment = Node::new(
            NodeKind::Assignment,
            Some(format!("{} =", plan.var)),
            vec![last],
        );
        out.push(cx.ast.push(assignment.with_line(line)));
    }

    cx.record(format!(
        "Loop unrolling: {} ({} iterations) at line {}",
        plan.var,
        plan.values.len(),
        line
    ));
    out
}
