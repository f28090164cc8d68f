// In src/optimizer/dce.rs

use super::{rewrite_tree, Pass, PassContext, Rewrite};
use crate::parser::ast::{NodeId, NodeKind};

/// 死代码消除。
///
/// - 语句序列中 `return` 之后的语句被删除（顶层程序除外）。
/// - 条件为字面量假的 `if` 被删除，有 `else` 时保留 `else` 的内容。
/// - 条件为字面量真的 `if` 被替换为它的分支语句。
/// - 条件为字面量假的 `while` 被删除。
pub struct DeadCodeElimination;

impl Pass for DeadCodeElimination {
    fn name(&self) -> &'static str {
        "dead code elimination"
    }

    fn run(&self, cx: &mut PassContext<'_>) {
        rewrite_tree(cx, self.name(), |cx, id| {
            let rewrite = match cx.ast.kind(id) {
                NodeKind::If => fold_if(cx, id),
                NodeKind::While => {
                    let truth = cx.ast.child(id, 0).and_then(|c| cx.ast.literal_truth(c));
                    if truth == Some(false) {
                        let line = cx.ast.line(id);
                        cx.record(format!("Dead code: removed while loop at line {}", line));
                        Rewrite::Remove
                    } else {
                        Rewrite::Keep
                    }
                }
                NodeKind::Program => Rewrite::Keep,
                _ if cx.ast.sequence_start(id).is_some() => truncate_after_return(cx, id),
                _ => Rewrite::Keep,
            };
            Ok(rewrite)
        });
    }
}

fn fold_if(cx: &mut PassContext<'_>, id: NodeId) -> Rewrite {
    let Some(truth) = cx.ast.child(id, 0).and_then(|c| cx.ast.literal_truth(c)) else {
        return Rewrite::Keep;
    };
    let line = cx.ast.line(id);

    if truth {
        cx.record(format!("Dead code: inlined if with constant true condition at line {}", line));
        let statements = cx
            .ast
            .child(id, 1)
            .map(|block| cx.ast.statements(block).to_vec())
            .unwrap_or_default();
        return Rewrite::Splice(statements);
    }

    cx.record(format!("Dead code: removed if with constant false condition at line {}", line));
    match cx.ast.child(id, 2) {
        Some(branch) if cx.ast.kind(branch) == NodeKind::Else => {
            Rewrite::Splice(cx.ast.statements(branch).to_vec())
        }
        // else if
        Some(branch) => Rewrite::Replace(branch),
        None => Rewrite::Remove,
    }
}

fn truncate_after_return(cx: &mut PassContext<'_>, id: NodeId) -> Rewrite {
    let statements = cx.ast.statements(id);
    let Some(position) = statements.iter().position(|&s| cx.ast.kind(s) == NodeKind::Return) else {
        return Rewrite::Keep;
    };
    let dropped = statements.len() - position - 1;
    if dropped == 0 {
        return Rewrite::Keep;
    }
    let kept = statements[..=position].to_vec();
    let message = format!(
        "Dead code: removed {} statement(s) after return at line {}",
        dropped,
        cx.ast.line(statements[position])
    );
    cx.record(message);
    Rewrite::Replace(cx.ast.with_statements(id, kept))
}
