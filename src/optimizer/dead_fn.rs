// In src/optimizer/dead_fn.rs

use super::{Pass, PassContext};

/// 删除从未被引用的顶层函数声明。没有符号表时什么也不做。
pub struct DeadFunctionElimination;

impl Pass for DeadFunctionElimination {
    fn name(&self) -> &'static str {
        "dead function elimination"
    }

    fn run(&self, cx: &mut PassContext<'_>) {
        let Some(symbols) = cx.symbols else {
            return;
        };
        let root = cx.ast.root();
        let statements = cx.ast.statements(root).to_vec();
        let mut kept = Vec::with_capacity(statements.len());

        for statement in statements {
            let name = cx.ast.value(statement).unwrap_or_default().to_string();
            let unused = cx.ast.kind(statement).is_function()
                && symbols.function_references(&name) == Some(0);
            if unused {
                let line = cx.ast.line(statement);
                cx.record(format!("Dead function: removed '{}' declared at line {}", name, line));
            } else {
                kept.push(statement);
            }
        }

        let new_root = cx.ast.with_statements(root, kept);
        cx.ast.set_root(new_root);
    }
}
