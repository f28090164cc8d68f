// In src/analyzer/statement.rs

use super::types::Type;
use super::{Analyzer, SemanticError};
use crate::parser::ast::{NodeId, NodeKind};
use crate::symtab::{SymbolCategory, SymbolRecord};

impl<'a> Analyzer<'a> {
    pub(super) fn check_statements(&mut self, statements: &[NodeId]) {
        for &statement in statements {
            self.check_statement(statement);
        }
    }

    /// 按节点种类分派一条语句。
    pub(super) fn check_statement(&mut self, id: NodeId) {
        match self.ast.kind(id) {
            NodeKind::VarDecl => self.check_var_decl(id),
            NodeKind::FunctionDecl | NodeKind::OverrideDecl => self.check_function(id),
            NodeKind::Model => self.check_model(id),
            NodeKind::Template => self.check_template(id),
            NodeKind::FromImport => self.check_from_import(id),
            NodeKind::Assignment => self.check_assignment(id),
            NodeKind::IncrementStmt => {
                self.check_increment(id);
            }
            NodeKind::If => self.check_if(id),
            NodeKind::While => self.check_while(id),
            NodeKind::ForRange => self.check_for_range(id),
            NodeKind::ForEach => self.check_for_each(id),
            NodeKind::TryCatch => self.check_try(id),
            NodeKind::Throw => {
                if let Some(name) = self.ast.value(id) {
                    self.use_variable(name, id);
                }
            }
            NodeKind::Return => self.check_return(id),
            NodeKind::Block | NodeKind::Else => {
                let statements = self.ast.statements(id).to_vec();
                self.check_statements(&statements);
            }
            // `import m;` 只引入模块名，不产生符号
            NodeKind::Import => {}
            // 其余都是表达式语句，例如调用
            _ => {
                self.check_expression(id);
            }
        }
    }

    /// 变量声明：先检查初始值，再登记符号。`global` 修饰的变量总是登记在全局作用域。
    fn check_var_decl(&mut self, id: NodeId) {
        let Some(name) = self.ast.value(id) else {
            return;
        };
        let Some((modifiers, ty, init)) = self.ast.var_decl_parts(id) else {
            return;
        };
        let declared = Type::from_name(ty);
        let is_global = modifiers.contains(&"global");

        if let Some(init) = init {
            let found = self.check_expression(init);
            if !found.is_unknown() && !declared.is_compatible_with(&found) {
                self.report(
                    SemanticError::InitializerMismatch {
                        declared: declared.clone(),
                        found,
                    },
                    id,
                );
            }
        }

        let scope = if is_global { self.table.global() } else { self.scope };
        let record = SymbolRecord::new(name, SymbolCategory::Variable, ty, self.ast.line(id))
            .initialized(init.is_some())
            .with_size(declared.size());
        self.declare(scope, record, id);
    }

    /// 赋值：目标必须已声明且类型兼容；复合赋值还要求目标已初始化并且是数值。
    fn check_assignment(&mut self, id: NodeId) {
        let Some((name, op)) = self.ast.assignment_parts(id) else {
            return;
        };
        let (name, op) = (name.to_string(), op.to_string());
        let found = match self.ast.child(id, 0) {
            Some(value) => self.check_expression(value),
            None => Type::Unknown,
        };

        let Some(symbol) = self.table.resolve(self.scope, &name) else {
            self.report(SemanticError::Undeclared { name }, id);
            return;
        };
        let record = self.table.get(symbol);
        let declared = Type::from_name(&record.ty);
        let initialized = record.initialized;

        if op != "=" {
            if !initialized {
                self.report(SemanticError::Uninitialized { name: name.clone() }, id);
            }
            if !declared.is_unknown() && !declared.is_numeric() {
                self.report(
                    SemanticError::NonNumericTarget {
                        name: name.clone(),
                        op: op.clone(),
                        found: declared.clone(),
                    },
                    id,
                );
            }
        }
        if !found.is_unknown() && !declared.is_compatible_with(&found) {
            self.report(
                SemanticError::AssignmentMismatch {
                    name,
                    declared,
                    found,
                },
                id,
            );
        }

        let record = self.table.get_mut(symbol);
        record.initialized = true;
        record.references += 1;
    }

    /// `x++` 这类递增：目标必须已声明、已初始化并且是数值。返回目标的类型。
    pub(super) fn check_increment(&mut self, id: NodeId) -> Type {
        let Some(name) = self.ast.value(id) else {
            return Type::Unknown;
        };
        let op = self.ast.increment_op(id).unwrap_or("++").to_string();
        let ty = self.use_variable(name, id);
        if !ty.is_unknown() && !ty.is_numeric() {
            self.report(
                SemanticError::NonNumericTarget {
                    name: name.to_string(),
                    op,
                    found: ty.clone(),
                },
                id,
            );
        }
        ty
    }

    fn check_condition(&mut self, condition: NodeId, construct: &'static str) {
        let found = self.check_expression(condition);
        if !found.is_unknown() && found != Type::Bool {
            self.report(SemanticError::NonBooleanCondition { construct, found }, condition);
        }
    }

    /// if 的各个分支不引入新的作用域段。
    fn check_if(&mut self, id: NodeId) {
        let children = self.ast.children(id).to_vec();
        if let Some(&condition) = children.first() {
            self.check_condition(condition, "if");
        }
        for &branch in children.iter().skip(1) {
            self.check_statement(branch);
        }
    }

    fn check_while(&mut self, id: NodeId) {
        let children = self.ast.children(id).to_vec();
        if let Some(&condition) = children.first() {
            self.check_condition(condition, "while");
        }
        let previous = self.enter_scope("while");
        if let Some(&block) = children.get(1) {
            self.check_statement(block);
        }
        self.exit_scope(previous);
    }

    /// `for i; 条件; i++`：循环变量必须在外层声明过。
    fn check_for_range(&mut self, id: NodeId) {
        let children = self.ast.children(id).to_vec();
        let previous = self.enter_scope("for");
        for &child in &children {
            match self.ast.kind(child) {
                NodeKind::Variable => {
                    if let Some(name) = self.ast.value(child) {
                        self.use_variable(name, child);
                    }
                }
                NodeKind::Increment => {}
                NodeKind::Block => self.check_statement(child),
                _ => self.check_condition(child, "for"),
            }
        }
        self.exit_scope(previous);
    }

    /// `for T x in 表达式`：元素变量登记在循环自己的作用域中。
    fn check_for_each(&mut self, id: NodeId) {
        let children = self.ast.children(id).to_vec();
        let [ty, variable, iterable, block] = children[..] else {
            return;
        };
        let declared = Type::from_name(self.ast.value(ty).unwrap_or_default());
        let found = self.check_expression(iterable);
        if let Some((_, element)) = found.index_types() {
            if !declared.is_compatible_with(&element) {
                self.report(
                    SemanticError::InitializerMismatch {
                        declared: declared.clone(),
                        found: element,
                    },
                    iterable,
                );
            }
        }

        let previous = self.enter_scope("for");
        if let Some(name) = self.ast.value(variable) {
            let record = SymbolRecord::new(
                name,
                SymbolCategory::Variable,
                declared.to_string(),
                self.ast.line(variable),
            )
            .initialized(true)
            .with_size(declared.size());
            self.declare(self.scope, record, variable);
        }
        self.check_statement(block);
        self.exit_scope(previous);
    }

    /// try 块不引入作用域段；catch 块引入一个，并把错误名登记为参数。
    fn check_try(&mut self, id: NodeId) {
        let children = self.ast.children(id).to_vec();
        for &child in &children {
            if !self.is_kind(child, NodeKind::Catch) {
                self.check_statement(child);
                continue;
            }
            let previous = self.enter_scope("catch");
            if let Some(name) = self.ast.value(child) {
                let record = SymbolRecord::new(
                    name,
                    SymbolCategory::Parameter,
                    "error",
                    self.ast.line(child),
                )
                .initialized(true)
                .with_size(Type::from_name("error").size());
                self.declare(self.scope, record, child);
            }
            let statements = self.ast.statements(child).to_vec();
            self.check_statements(&statements);
            self.exit_scope(previous);
        }
    }

    fn check_return(&mut self, id: NodeId) {
        let value = self.ast.child(id, 0);
        let found = match value {
            Some(value) => self.check_expression(value),
            None => Type::Void,
        };

        let Some(function) = self.function.clone() else {
            self.report(SemanticError::ReturnOutsideFunction, id);
            return;
        };
        let expected = function.return_type;
        if expected.is_unknown() || found.is_unknown() {
            return;
        }
        if expected == Type::Void {
            if found != Type::Void {
                self.report(
                    SemanticError::UnexpectedReturnValue {
                        function: function.name,
                    },
                    id,
                );
            }
        } else if found == Type::Void {
            self.report(
                SemanticError::MissingReturnValue {
                    function: function.name,
                    expected,
                },
                id,
            );
        } else if !expected.is_compatible_with(&found) {
            self.report(SemanticError::ReturnTypeMismatch { expected, found }, id);
        }
    }

    /// 模型：`extends` 的基类必须是已声明的模型，成员登记在模型自己的作用域中。
    fn check_model(&mut self, id: NodeId) {
        let Some(name) = self.ast.value(id).map(str::to_string) else {
            return;
        };
        let record = SymbolRecord::new(&name, SymbolCategory::Model, "model", self.ast.line(id))
            .initialized(true)
            .with_size(Type::Model.size());
        self.declare(self.scope, record, id);

        if let Some(extends) = self.ast.child_of_kind(id, NodeKind::Extends) {
            if let Some(base) = self.ast.value(extends) {
                let is_model = self
                    .table
                    .resolve(self.scope, base)
                    .is_some_and(|s| self.table.get(s).category == SymbolCategory::Model);
                if is_model {
                    if let Some(symbol) = self.table.resolve(self.scope, base) {
                        self.table.get_mut(symbol).references += 1;
                    }
                } else {
                    self.report(
                        SemanticError::UnknownBaseModel {
                            model: name.clone(),
                            base: base.to_string(),
                        },
                        extends,
                    );
                }
            }
        }

        let previous = self.enter_scope(&format!("model_{}", name));
        let members = self.ast.statements(id).to_vec();
        self.check_statements(&members);
        self.exit_scope(previous);
    }

    fn check_template(&mut self, id: NodeId) {
        let Some(name) = self.ast.value(id) else {
            return;
        };
        let record = SymbolRecord::new(name, SymbolCategory::Template, "template", self.ast.line(id))
            .initialized(true)
            .with_size(Type::Template.size());
        self.declare(self.scope, record, id);
    }

    /// `from m import a, b`：导入的名字当作签名未知的函数登记。
    fn check_from_import(&mut self, id: NodeId) {
        let Some(deps) = self.ast.child_of_kind(id, NodeKind::Deps) else {
            return;
        };
        for &dep in self.ast.children(deps) {
            if let Some(name) = self.ast.value(dep) {
                let record = SymbolRecord::new(name, SymbolCategory::Function, "", self.ast.line(dep))
                    .initialized(true);
                self.declare(self.scope, record, dep);
            }
        }
    }
}
