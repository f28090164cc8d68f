//! src/regen/mod.rs
//!
//! 把 AST 重新生成为近似的源代码文本，只用于展示与检查优化结果。
//! 每种节点一条格式规则，缩进为四个空格。


use crate::parser::ast::{Ast, NodeId, NodeKind};

const INDENT: &str = "    ";

/// 重新生成整棵树的源代码。
pub fn regenerate(ast: &Ast) -> String {
    let mut regen = Regenerator::new(ast);
    regen.statements(ast.root());
    regen.out
}

/// 把一个表达式渲染为一行文本。二元运算总是带括号，例如 `(a + b)`。
pub fn expression(ast: &Ast, id: NodeId) -> String {
    let node = ast.node(id);
    let value = node.value.as_deref().unwrap_or_default();
    let child = |index: usize| {
        node.children
            .get(index)
            .map(|&c| expression(ast, c))
            .unwrap_or_default()
    };
    let list = |ids: &[NodeId]| {
        ids.iter()
            .map(|&c| expression(ast, c))
            .collect::<Vec<_>>()
            .join(", ")
    };

    match node.kind {
        NodeKind::Number | NodeKind::Str | NodeKind::Boolean | NodeKind::Identifier => value.to_string(),
        NodeKind::Operation | NodeKind::RelationalOp => format!("({} {} {})", child(0), value, child(1)),
        NodeKind::LogicalOp if node.children.len() == 1 => match value {
            "!" => format!("!{}", child(0)),
            _ => format!("{} {}", value, child(0)),
        },
        NodeKind::LogicalOp => format!("({} {} {})", child(0), value, child(1)),
        NodeKind::UnaryOp => format!("{}{}", value, child(0)),
        NodeKind::Call | NodeKind::IoCall => format!("{}({})", value, list(&node.children)),
        NodeKind::IndexAccess => format!("{}[{}]", value, child(0)),
        NodeKind::PostfixIncrement => format!("{}{}", value, ast.increment_op(id).unwrap_or_default()),
        NodeKind::List => format!("{{{}}}", list(&node.children)),
        NodeKind::KeyValue => format!("{}: {}", child(0), child(1)),
        NodeKind::AnonymousFunction => {
            let mut regen = Regenerator::new(ast);
            regen.anonymous_function(id);
            regen.out.trim_end().to_string()
        }
        NodeKind::Variable | NodeKind::Type | NodeKind::ReturnType => value.to_string(),
        _ => String::new(),
    }
}

struct Regenerator<'a> {
    ast: &'a Ast,
    out: String,
    depth: usize,
}

impl<'a> Regenerator<'a> {
    fn new(ast: &'a Ast) -> Self {
        Self {
            ast,
            out: String::new(),
            depth: 0,
        }
    }

    fn line(&mut self, text: &str) {
        for _ in 0..self.depth {
            self.out.push_str(INDENT);
        }
        self.out.push_str(text);
        self.out.push('\n');
    }

    fn statements(&mut self, container: NodeId) {
        for &statement in self.ast.statements(container) {
            self.statement(statement);
        }
    }

    /// `{` 之后的语句体与结尾的 `}`。
    fn body(&mut self, container: NodeId, close: &str) {
        self.depth += 1;
        self.statements(container);
        self.depth -= 1;
        self.line(close);
    }

    fn statement(&mut self, id: NodeId) {
        let ast = self.ast;
        let value = ast.value(id).unwrap_or_default();
        match ast.kind(id) {
            NodeKind::VarDecl => self.var_decl(id),
            NodeKind::FunctionDecl | NodeKind::OverrideDecl => self.function(id),
            NodeKind::Model => self.model(id),
            NodeKind::Template => self.template(id),
            NodeKind::Import => self.line(&format!("import {};", value)),
            NodeKind::FromImport => {
                let deps = ast
                    .child_of_kind(id, NodeKind::Deps)
                    .map(|d| names(ast, ast.children(d)))
                    .unwrap_or_default();
                self.line(&format!("from {} import {};", value, deps));
            }
            NodeKind::Assignment => {
                let rhs = ast.child(id, 0).map(|v| expression(ast, v)).unwrap_or_default();
                self.line(&format!("{} {};", value, rhs));
            }
            NodeKind::IncrementStmt => {
                let op = ast.increment_op(id).unwrap_or_default();
                self.line(&format!("{}{};", value, op));
            }
            NodeKind::If => self.if_statement(id, ""),
            NodeKind::While => {
                let condition = ast.child(id, 0).map(|c| expression(ast, c)).unwrap_or_default();
                self.line(&format!("while {} {{", condition));
                if let Some(block) = ast.child(id, 1) {
                    self.body(block, "}");
                }
            }
            NodeKind::ForRange => self.for_range(id),
            NodeKind::ForEach => {
                let children = ast.children(id);
                let part = |i: usize| children.get(i).map(|&c| expression(ast, c)).unwrap_or_default();
                self.line(&format!("for {} {} in {} {{", part(0), part(1), part(2)));
                if let Some(&block) = children.get(3) {
                    self.body(block, "}");
                }
            }
            NodeKind::TryCatch => {
                self.line("try {");
                if let Some(block) = ast.child(id, 0) {
                    self.body(block, "}");
                }
                if let Some(catch) = ast.child_of_kind(id, NodeKind::Catch) {
                    let name = ast.value(catch).unwrap_or_default();
                    self.line(&format!("catch ({}) {{", name));
                    self.body(catch, "}");
                }
            }
            NodeKind::Throw => self.line(&format!("throw {};", value)),
            NodeKind::Return => match ast.child(id, 0) {
                Some(v) => self.line(&format!("return {};", expression(ast, v))),
                None => self.line("return;"),
            },
            NodeKind::Block | NodeKind::Else => self.statements(id),
            NodeKind::AnonymousFunction => self.anonymous_function(id),
            _ => {
                let text = expression(ast, id);
                if !text.is_empty() {
                    self.line(&format!("{};", text));
                }
            }
        }
    }

    fn var_decl(&mut self, id: NodeId) {
        let ast = self.ast;
        let Some((modifiers, ty, init)) = ast.var_decl_parts(id) else {
            return;
        };
        let mut text = String::new();
        for modifier in modifiers {
            text.push_str(modifier);
            text.push(' ');
        }
        text.push_str(&format!("{} {}", ty, ast.value(id).unwrap_or_default()));
        if let Some(init) = init {
            text.push_str(&format!(" = {}", expression(ast, init)));
        }
        text.push(';');
        self.line(&text);
    }

    fn function(&mut self, id: NodeId) {
        let ast = self.ast;
        let ret = ast
            .child_of_kind(id, NodeKind::ReturnType)
            .and_then(|r| ast.value(r))
            .unwrap_or("void");
        let prefix = if ast.kind(id) == NodeKind::OverrideDecl { "override " } else { "" };
        self.line(&format!(
            "{}{} {}({}) {{",
            prefix,
            ret,
            ast.value(id).unwrap_or_default(),
            params(ast, id)
        ));
        self.body(id, "}");
    }

    fn anonymous_function(&mut self, id: NodeId) {
        self.line(&format!("function({}) {{", params(self.ast, id)));
        self.body(id, "}");
    }

    fn model(&mut self, id: NodeId) {
        let ast = self.ast;
        let mut header = format!("model {}", ast.value(id).unwrap_or_default());
        if let Some(base) = ast.child_of_kind(id, NodeKind::Extends).and_then(|e| ast.value(e)) {
            header.push_str(&format!(" extends {}", base));
        }
        header.push_str(" {");
        self.line(&header);
        self.body(id, "}");
    }

    fn template(&mut self, id: NodeId) {
        let ast = self.ast;
        self.line(&format!("template {} {{", ast.value(id).unwrap_or_default()));
        self.depth += 1;
        for &signature in ast.children(id) {
            let ret = ast
                .child_of_kind(signature, NodeKind::Type)
                .and_then(|t| ast.value(t))
                .unwrap_or("void");
            self.line(&format!(
                "{} {}({});",
                ret,
                ast.value(signature).unwrap_or_default(),
                params(ast, signature)
            ));
        }
        self.depth -= 1;
        self.line("}");
    }

    /// `else if` 链接在同一行的 `}` 之后。
    fn if_statement(&mut self, id: NodeId, prefix: &str) {
        let ast = self.ast;
        let condition = ast.child(id, 0).map(|c| expression(ast, c)).unwrap_or_default();
        self.line(&format!("{}if {} {{", prefix, condition));
        self.depth += 1;
        if let Some(block) = ast.child(id, 1) {
            self.statements(block);
        }
        self.depth -= 1;
        match ast.child(id, 2) {
            Some(branch) if ast.kind(branch) == NodeKind::If => self.if_statement(branch, "} else "),
            Some(branch) => {
                self.line("} else {");
                self.body(branch, "}");
            }
            None => self.line("}"),
        }
    }

    fn for_range(&mut self, id: NodeId) {
        let ast = self.ast;
        let var = ast.value(id).unwrap_or_default();
        let condition = ast.child(id, 1).map(|c| expression(ast, c)).unwrap_or_default();
        let op = ast.increment_op(id).unwrap_or_default();
        self.line(&format!("for {}; {}; {}{} {{", var, condition, var, op));
        if let Some(block) = ast.child_of_kind(id, NodeKind::Block) {
            self.body(block, "}");
        }
    }
}

fn names(ast: &Ast, ids: &[NodeId]) -> String {
    ids.iter()
        .filter_map(|&i| ast.value(i))
        .collect::<Vec<_>>()
        .join(", ")
}

/// `int a, string b` 形式的参数列表。
fn params(ast: &Ast, id: NodeId) -> String {
    let Some(params) = ast.child_of_kind(id, NodeKind::Params) else {
        return String::new();
    };
    ast.children(params)
        .iter()
        .map(|&p| {
            let ty = ast.child(p, 0).and_then(|t| ast.value(t)).unwrap_or_default();
            format!("{} {}", ty, ast.value(p).unwrap_or_default())
        })
        .collect::<Vec<_>>()
        .join(", ")
}
