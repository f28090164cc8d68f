// In src/optimizer/hoist.rs

use std::collections::BTreeSet;

use super::{is_pure, rewrite_tree, Pass, PassContext, Rewrite};
use crate::parser::ast::{Ast, NodeId, NodeKind};

/// 循环不变量外提。
///
/// 范围 for 循环体中的声明或 `=` 赋值，如果没有副作用，读取的名字既不是循环变量
/// 也没有在循环体中被写入，就移到循环之前。
///
/// 声明只外提到拥有作用域的容器（程序、函数、catch），并且它的名字不能出现在
/// 容器的其他地方（包括循环条件与函数参数），否则会遮蔽或重复声明外层的变量。
pub struct LoopInvariantHoisting;

impl Pass for LoopInvariantHoisting {
    fn name(&self) -> &'static str {
        "loop-invariant hoisting"
    }

    fn run(&self, cx: &mut PassContext<'_>) {
        rewrite_tree(cx, self.name(), |cx, id| {
            if cx.ast.sequence_start(id).is_none() {
                return Ok(Rewrite::Keep);
            }
            let statements = cx.ast.statements(id).to_vec();
            let declarations_allowed = owns_scope(cx.ast.kind(id));
            let mut out = Vec::with_capacity(statements.len());
            let mut changed = false;

            for &statement in &statements {
                if cx.ast.kind(statement) != NodeKind::ForRange {
                    out.push(statement);
                    continue;
                }
                let outside = if declarations_allowed {
                    Some(names_outside(&cx.ast, id, statement))
                } else {
                    None
                };
                match hoist(cx, statement, outside.as_ref()) {
                    Some(hoisted) => {
                        out.extend(hoisted);
                        changed = true;
                    }
                    None => out.push(statement),
                }
            }

            if !changed {
                return Ok(Rewrite::Keep);
            }
            Ok(Rewrite::Replace(cx.ast.with_statements(id, out)))
        });
    }
}

/// 外提一个循环中的不变语句，返回替换它的语句序列。
///
/// `outside` 为 `None` 时不外提声明。
fn hoist(cx: &mut PassContext<'_>, id: NodeId, outside: Option<&BTreeSet<String>>) -> Option<Vec<NodeId>> {
    let block = cx.ast.child_of_kind(id, NodeKind::Block)?;
    let var = cx.ast.value(id).unwrap_or_default().to_string();
    let body = cx.ast.statements(block).to_vec();

    let (hoisted, kept): (Vec<NodeId>, Vec<NodeId>) = body
        .iter()
        .copied()
        .partition(|&s| is_invariant(&cx.ast, s, &body, &var, outside));
    if hoisted.is_empty() {
        return None;
    }

    let line = cx.ast.line(id);
    cx.record(format!(
        "Loop-invariant hoisting: {} statement(s) out of loop over {} at line {}",
        hoisted.len(),
        var,
        line
    ));
    let new_block = cx.ast.with_statements(block, kept);
    let children: Vec<NodeId> = cx
        .ast
        .children(id)
        .iter()
        .map(|&c| if c == block { new_block } else { c })
        .collect();
    let new_loop = cx.ast.with_children(id, children);

    let mut statements = hoisted;
    statements.push(new_loop);
    Some(statements)
}

/// 语句块不单独建立作用域，if 和 else 的块属于外层。
fn owns_scope(kind: NodeKind) -> bool {
    matches!(
        kind,
        NodeKind::Program
            | NodeKind::FunctionDecl
            | NodeKind::OverrideDecl
            | NodeKind::AnonymousFunction
            | NodeKind::Catch
    )
}

/// 容器中除了循环体以外出现的所有名字。
fn names_outside(ast: &Ast, container: NodeId, for_loop: NodeId) -> BTreeSet<String> {
    let mut names = BTreeSet::new();
    if let Some(params) = ast.child_of_kind(container, NodeKind::Params) {
        names.extend(ast.children(params).iter().filter_map(|&p| ast.value(p)).map(String::from));
    }
    if let Some(name) = ast.value(container).filter(|_| ast.kind(container) == NodeKind::Catch) {
        names.insert(name.to_string());
    }
    for &statement in ast.statements(container) {
        if statement != for_loop {
            names.extend(ast.referenced_names(statement));
        }
    }
    for &part in ast.children(for_loop) {
        if ast.kind(part) != NodeKind::Block {
            names.extend(ast.referenced_names(part));
        }
    }
    names
}

fn is_invariant(
    ast: &Ast,
    statement: NodeId,
    body: &[NodeId],
    var: &str,
    outside: Option<&BTreeSet<String>>,
) -> bool {
    let (target, value) = match ast.kind(statement) {
        NodeKind::VarDecl => match (ast.value(statement), ast.var_decl_parts(statement), outside) {
            (Some(name), Some((_, _, init)), Some(outside)) if !outside.contains(name) => (name, init),
            _ => return false,
        },
        NodeKind::Assignment => match ast.assignment_parts(statement) {
            Some((name, "=")) => (name, ast.child(statement, 0)),
            _ => return false,
        },
        _ => return false,
    };
    if target == var {
        return false;
    }

    let reads = match value {
        Some(value) => {
            if !is_pure(ast, value) {
                return false;
            }
            ast.referenced_names(value)
        }
        None => BTreeSet::new(),
    };
    if reads.contains(var) || reads.contains(target) {
        return false;
    }

    // 其他语句不能写入它读取的名字或它的目标，在它之前的语句不能读取它的目标
    let position = body.iter().position(|&s| s == statement).unwrap_or(0);
    for (index, &other) in body.iter().enumerate() {
        if other == statement {
            continue;
        }
        let written = ast.written_names(other);
        if written.contains(target) || !reads.is_disjoint(&written) {
            return false;
        }
        if index < position && ast.referenced_names(other).contains(target) {
            return false;
        }
    }
    true
}
