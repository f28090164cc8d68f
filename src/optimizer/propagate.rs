// In src/optimizer/propagate.rs

use std::collections::BTreeMap;

use super::{contains_call, rewrite_tree, substitute, Pass, PassContext, Rewrite};
use crate::parser::ast::{Ast, NodeId, NodeKind};

/// 块内常量传播。
///
/// 只处理程序、函数体与模型体的直接语句序列。把字面量赋给名字之后，
/// 同一序列中随后的读取被替换为该字面量，直到名字再次被写入。
/// 循环条件与嵌套的语句体不做替换；出现用户函数调用时忘掉所有已知值。
pub struct ConstantPropagation;

impl Pass for ConstantPropagation {
    fn name(&self) -> &'static str {
        "constant propagation"
    }

    fn run(&self, cx: &mut PassContext<'_>) {
        rewrite_tree(cx, self.name(), |cx, id| {
            let is_body = matches!(
                cx.ast.kind(id),
                NodeKind::Program
                    | NodeKind::FunctionDecl
                    | NodeKind::OverrideDecl
                    | NodeKind::AnonymousFunction
                    | NodeKind::Model
            );
            if !is_body {
                return Ok(Rewrite::Keep);
            }
            let statements = propagate(cx, id);
            Ok(Rewrite::Replace(cx.ast.with_statements(id, statements)))
        });
    }
}

fn propagate(cx: &mut PassContext<'_>, body: NodeId) -> Vec<NodeId> {
    let mut known: BTreeMap<String, NodeId> = BTreeMap::new();
    let mut out = Vec::new();

    for statement in cx.ast.statements(body).to_vec() {
        if contains_call(&cx.ast, statement) {
            known.clear();
        }
        let statement = substitute_reads(cx, statement, &known);

        for name in cx.ast.written_names(statement) {
            known.remove(&name);
        }
        if let Some((name, value)) = literal_binding(&cx.ast, statement) {
            known.insert(name, value);
        }
        out.push(statement);
    }
    out
}

/// 在语句的读取位置替换已知的名字。
fn substitute_reads(cx: &mut PassContext<'_>, statement: NodeId, known: &BTreeMap<String, NodeId>) -> NodeId {
    if known.is_empty() {
        return statement;
    }
    let mut children = cx.ast.children(statement).to_vec();
    for index in read_positions(&cx.ast, statement) {
        let Some(&child) = children.get(index) else {
            continue;
        };
        // 表达式里的 `x++` 会改写 x，它不参与替换
        let written = cx.ast.written_names(child);
        let mut current = child;
        for (name, &literal) in known {
            if written.contains(name) {
                continue;
            }
            let next = substitute(&mut cx.ast, current, name, literal);
            if next != current {
                let message = format!(
                    "Constant propagation: {} = {} at line {}",
                    name,
                    cx.ast.value(literal).unwrap_or_default(),
                    cx.ast.line(statement)
                );
                cx.record(message);
                current = next;
            }
        }
        children[index] = current;
    }
    cx.ast.with_children(statement, children)
}

/// 语句中作为表达式被读取的子节点下标。
fn read_positions(ast: &Ast, statement: NodeId) -> Vec<usize> {
    let children = ast.children(statement);
    match ast.kind(statement) {
        NodeKind::VarDecl => children
            .iter()
            .position(|&c| !matches!(ast.kind(c), NodeKind::Modifiers | NodeKind::Type))
            .into_iter()
            .collect(),
        // 只替换 if 的条件，分支是嵌套的语句体
        NodeKind::Assignment | NodeKind::Return | NodeKind::If => {
            if children.is_empty() { Vec::new() } else { vec![0] }
        }
        NodeKind::Call | NodeKind::IoCall => (0..children.len()).collect(),
        _ => Vec::new(),
    }
}

/// `int x = 字面量;` 或 `x = 字面量;` 绑定的名字与字面量。
fn literal_binding(ast: &Ast, statement: NodeId) -> Option<(String, NodeId)> {
    let (name, value) = match ast.kind(statement) {
        NodeKind::VarDecl => {
            let (_, _, init) = ast.var_decl_parts(statement)?;
            (ast.value(statement)?, init?)
        }
        NodeKind::Assignment => {
            let (name, op) = ast.assignment_parts(statement)?;
            if op != "=" {
                return None;
            }
            (name, ast.child(statement, 0)?)
        }
        _ => return None,
    };
    ast.kind(value).is_literal().then(|| (name.to_string(), value))
}
